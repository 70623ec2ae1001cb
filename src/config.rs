use serde::Deserialize;
use std::{fs, path::{Path, PathBuf}};
use anyhow::{Context, Result};

use crate::ledger::CoinSelection;
use crate::puzzle::PuzzleSource;
use crate::wallet::Mojos;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub network: Network,
    pub wallet: Wallet,
    #[serde(default)]
    pub puzzle: Puzzle,
    #[serde(default)]
    pub lock: Lock,
    #[serde(default)]
    pub unlock: Unlock,
    #[serde(default)]
    pub tools: Tools,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NetworkMode {
    #[default]
    Simulator,
    Testnet,
    Mainnet,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Network {
    #[serde(default)]
    pub mode: NetworkMode,
    /// Exported as CHIA_ROOT to child tools; selects the node the RPC talks to.
    #[serde(default)]
    pub chia_root: Option<PathBuf>,
    /// Exported as CHIA_KEYS_ROOT to child tools.
    #[serde(default)]
    pub keys_root: Option<PathBuf>,
    #[serde(default)]
    pub address_prefix: Option<String>,
}

impl Network {
    pub fn address_prefix(&self) -> &str {
        match (&self.address_prefix, self.mode) {
            (Some(p), _) => p,
            (None, NetworkMode::Mainnet) => "xch",
            (None, _) => "txch",
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Wallet {
    /// Selects which key in the wallet signs transfers and receives funds.
    pub fingerprint: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Puzzle {
    #[serde(default = "default_source")]
    pub source: PathBuf,
    #[serde(default = "default_include")]
    pub include: Vec<PathBuf>,
    #[serde(default = "default_true")]
    pub strict: bool,
}

impl Default for Puzzle {
    fn default() -> Self {
        Puzzle { source: default_source(), include: default_include(), strict: true }
    }
}

impl Puzzle {
    pub fn to_source(&self) -> PuzzleSource {
        PuzzleSource { path: self.source.clone(), include: self.include.clone(), strict: self.strict }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Lock {
    #[serde(default = "default_lock_amount")]
    pub amount_mojos: Mojos,
    #[serde(default = "default_lock_fee")]
    pub fee_mojos: Mojos,
}

impl Default for Lock {
    fn default() -> Self {
        Lock { amount_mojos: default_lock_amount(), fee_mojos: default_lock_fee() }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Unlock {
    #[serde(default = "default_bundle_path")]
    pub bundle_path: PathBuf,
    #[serde(default)]
    pub archive_dir: Option<PathBuf>,
    #[serde(default = "default_tag")]
    pub solution_tag: String,
    #[serde(default)]
    pub coin_selection: CoinSelection,
    /// The bundle carries a placeholder signature; this must be opted into.
    #[serde(default)]
    pub allow_unsigned: bool,
}

impl Default for Unlock {
    fn default() -> Self {
        Unlock {
            bundle_path: default_bundle_path(),
            archive_dir: None,
            solution_tag: default_tag(),
            coin_selection: CoinSelection::default(),
            allow_unsigned: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Tools {
    #[serde(default = "default_run")]
    pub run: String,
    #[serde(default = "default_brun")]
    pub brun: String,
    #[serde(default = "default_cdv")]
    pub cdv: String,
    #[serde(default = "default_chia")]
    pub chia: String,
}

impl Default for Tools {
    fn default() -> Self {
        Tools { run: default_run(), brun: default_brun(), cdv: default_cdv(), chia: default_chia() }
    }
}

fn default_source() -> PathBuf { PathBuf::from("main.clsp") }
fn default_include() -> Vec<PathBuf> { vec![PathBuf::from("include")] }
fn default_true() -> bool { true }
fn default_lock_amount() -> Mojos { Mojos(10_000_000_000) }   // 0.01 XCH
fn default_lock_fee() -> Mojos { Mojos(50_000_000) }          // 0.00005 XCH
fn default_bundle_path() -> PathBuf { PathBuf::from("spendbundle.json") }
fn default_tag() -> String { crate::solution::DEFAULT_TAG.into() }
fn default_run() -> String { "run".into() }
fn default_brun() -> String { "brun".into() }
fn default_cdv() -> String { "cdv".into() }
fn default_chia() -> String { "chia".into() }

/// Read the TOML file at `p` and deserialize into `Config`.
/// *Adds context* so user errors print a friendlier message.
///
/// # Errors
/// * Returns an anyhow::Error if the file cannot be read or parsed.
pub fn load<P: AsRef<Path>>(p: P) -> Result<Config> {
    let text = fs::read_to_string(&p)
        .with_context(|| format!("🗂️  couldn’t read config file {}", p.as_ref().display()))?;
    load_from_str(&text)
}

pub fn load_from_str(text: &str) -> Result<Config> {
    toml::from_str(text)
        .with_context(|| "📝  invalid TOML in config file".to_string())
}

/// One-shot environment validation, run at process entry before any workflow.
pub fn preflight(cfg: &Config) -> Result<(), crate::Error> {
    preflight_with(cfg, |k| std::env::var(k).ok())
}

/// `preflight` with an injectable environment lookup.
pub fn preflight_with(cfg: &Config, env: impl Fn(&str) -> Option<String>) -> Result<(), crate::Error> {
    use crate::Error;

    if !cfg.puzzle.source.is_file() {
        return Err(Error::Environment(format!(
            "puzzle source {} not found; run from the project root or set [puzzle] source",
            cfg.puzzle.source.display()
        )));
    }
    if cfg.unlock.solution_tag.is_empty() {
        return Err(Error::Config("[unlock] solution_tag must not be empty".into()));
    }
    if cfg.network.mode == NetworkMode::Simulator {
        let keys = cfg.network.keys_root.as_ref()
            .map(|p| p.display().to_string())
            .or_else(|| env("CHIA_KEYS_ROOT"))
            .unwrap_or_default();
        if keys.is_empty() {
            return Err(Error::Environment(format!("invalid simulator CHIA_KEYS_ROOT, or not set: '{keys}'")));
        }
        let root = cfg.network.chia_root.as_ref()
            .map(|p| p.display().to_string())
            .or_else(|| env("CHIA_ROOT"))
            .unwrap_or_default();
        if !root.contains("simulator") {
            return Err(Error::Environment(format!("invalid simulator CHIA_ROOT, or not set: '{root}'")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_takes_defaults() {
        let cfg = load_from_str("[wallet]\nfingerprint = 4150526850\n").unwrap();
        assert_eq!(cfg.wallet.fingerprint, 4_150_526_850);
        assert_eq!(cfg.network.mode, NetworkMode::Simulator);
        assert_eq!(cfg.network.address_prefix(), "txch");
        assert_eq!(cfg.lock.amount_mojos, Mojos(10_000_000_000));
        assert_eq!(cfg.lock.fee_mojos, Mojos(50_000_000));
        assert_eq!(cfg.unlock.bundle_path, PathBuf::from("spendbundle.json"));
        assert_eq!(cfg.unlock.coin_selection, CoinSelection::First);
        assert!(!cfg.unlock.allow_unsigned);
        assert_eq!(cfg.puzzle.include, vec![PathBuf::from("include")]);
    }

    #[test]
    fn mainnet_uses_xch_prefix_unless_overridden() {
        let cfg = load_from_str("[network]\nmode = \"mainnet\"\n[wallet]\nfingerprint = 1\n").unwrap();
        assert_eq!(cfg.network.address_prefix(), "xch");
        let cfg = load_from_str("[network]\nmode = \"mainnet\"\naddress_prefix = \"foo\"\n[wallet]\nfingerprint = 1\n").unwrap();
        assert_eq!(cfg.network.address_prefix(), "foo");
    }

    #[test]
    fn missing_wallet_section_is_an_error() {
        assert!(load_from_str("[network]\nmode = \"testnet\"\n").is_err());
    }
}
