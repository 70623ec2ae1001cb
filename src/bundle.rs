use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::coin::{coin_json, program_hex, Coin, Program};
use crate::error::{Error, Result};

/// BLS G2 point at infinity: the aggregate of zero signatures.
/// Only valid for puzzles that emit no AGG_SIG conditions.
pub const PLACEHOLDER_SIGNATURE: &str = "0xc00000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000";

/// One authorization to consume a specific coin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spend {
    #[serde(with = "coin_json")]
    pub coin: Coin,
    #[serde(with = "program_hex")]
    pub puzzle_reveal: Program,
    #[serde(with = "program_hex")]
    pub solution: Program,
}

/// The transaction envelope submitted to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendBundle {
    pub aggregated_signature: String,
    pub coin_spends: Vec<Spend>,
}

impl SpendBundle {
    /// Assembles a bundle; `spends` must be non-empty.
    pub fn assemble(spends: Vec<Spend>, signature: &str) -> Result<Self> {
        if spends.is_empty() {
            return Err(Error::encoding("spend bundle", "no coin spends"));
        }
        Ok(SpendBundle { aggregated_signature: signature.to_string(), coin_spends: spends })
    }

    pub fn is_unsigned(&self) -> bool {
        self.aggregated_signature.eq_ignore_ascii_case(PLACEHOLDER_SIGNATURE)
    }

    pub fn total_amount(&self) -> u128 {
        self.coin_spends.iter().map(|s| s.coin.amount as u128).sum()
    }

    /// Single-line JSON, as written to disk.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::encoding("spend bundle", e))
    }

    /// Short content digest used to name archived copies.
    pub fn digest(&self) -> Result<String> {
        let json = self.to_json()?;
        Ok(hex::encode(&blake3::hash(json.as_bytes()).as_bytes()[..8]))
    }
}

/// Where a bundle ended up on disk.
#[derive(Debug, Clone)]
pub struct Persisted {
    pub path: PathBuf,
    pub archive: Option<PathBuf>,
    pub json: String,
}

/// Writes the bundle to `path` (and a timestamped copy under `archive_dir`)
/// and syncs it, so a crash during broadcast leaves a resubmittable file.
pub fn persist(bundle: &SpendBundle, path: &Path, archive_dir: Option<&Path>) -> Result<Persisted> {
    let json = bundle.to_json()?;
    write_synced(path, &json)?;

    let archive = match archive_dir {
        Some(dir) => {
            fs::create_dir_all(dir).map_err(|e| persist_err(dir, e))?;
            let name = format!("{}-{}.json", chrono::Utc::now().format("%Y%m%dT%H%M%SZ"), bundle.digest()?);
            let copy = dir.join(name);
            write_synced(&copy, &json)?;
            Some(copy)
        }
        None => None,
    };
    Ok(Persisted { path: path.to_path_buf(), archive, json })
}

/// Reads a bundle previously written by `persist`.
pub fn load(path: &Path) -> Result<SpendBundle> {
    let text = fs::read_to_string(path).map_err(|e| persist_err(path, e))?;
    serde_json::from_str(&text).map_err(|e| Error::decode(format!("spend bundle {}", path.display()), e))
}

/// Writes through a sibling temp file and renames it over `path`, so a reader
/// sees either the previous bundle or the complete new one.
fn write_synced(path: &Path, json: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| persist_err(parent, e))?;
    }
    let temp_path = path.with_extension("tmp");
    let written = write_temp(&temp_path, json).and_then(|()| fs::rename(&temp_path, path));
    if let Err(e) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(persist_err(path, e));
    }
    Ok(())
}

fn write_temp(temp_path: &Path, json: &str) -> std::io::Result<()> {
    let mut file = fs::File::create(temp_path)?;
    file.write_all(json.as_bytes())?;
    file.write_all(b"\n")?;
    file.sync_all()
}

fn persist_err(path: &Path, source: std::io::Error) -> Error {
    Error::Persist { path: path.display().to_string(), source }
}
