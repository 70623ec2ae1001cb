// Capability implementations backed by the chia command line tools.
// Only this module spawns processes; the workflows see the traits.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use crate::coin::{Bytes32, CoinRecord};
use crate::config::{self, Config};
use crate::error::{Error, Result};
use crate::ledger::{self, LedgerClient};
use crate::puzzle::{Compiler, Executor, PuzzleSource};
use crate::wallet::{Mojos, WalletClient};

#[derive(Debug, Clone)]
pub struct ChiaTools {
    bins: config::Tools,
    chia_root: Option<PathBuf>,
    keys_root: Option<PathBuf>,
}

/// Why a tool invocation did not produce usable output.
#[derive(Debug)]
enum ToolFailure {
    Spawn(std::io::Error),
    Exit { code: Option<i32>, stdout: String, stderr: String },
}

impl std::fmt::Display for ToolFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolFailure::Spawn(e) => write!(f, "could not start: {e}"),
            ToolFailure::Exit { code, stdout, stderr } => {
                let detail = if stderr.trim().is_empty() { stdout.trim() } else { stderr.trim() };
                match code {
                    Some(c) => write!(f, "exited with status {c}: {detail}"),
                    None => write!(f, "killed by signal: {detail}"),
                }
            }
        }
    }
}

impl ChiaTools {
    pub fn new(bins: config::Tools) -> Self {
        ChiaTools { bins, chia_root: None, keys_root: None }
    }

    pub fn from_config(cfg: &Config) -> Self {
        ChiaTools {
            bins: cfg.tools.clone(),
            chia_root: cfg.network.chia_root.clone(),
            keys_root: cfg.network.keys_root.clone(),
        }
    }

    async fn output(&self, program: &str, args: &[String]) -> std::result::Result<String, ToolFailure> {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(root) = &self.chia_root {
            cmd.env("CHIA_ROOT", root);
        }
        if let Some(keys) = &self.keys_root {
            cmd.env("CHIA_KEYS_ROOT", keys);
        }
        let out = cmd.output().await.map_err(ToolFailure::Spawn)?;
        let stdout = String::from_utf8_lossy(&out.stdout).into_owned();
        if !out.status.success() {
            return Err(ToolFailure::Exit {
                code: out.status.code(),
                stdout,
                stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
            });
        }
        Ok(stdout.trim().to_string())
    }

    fn describe(program: &str, args: &[String]) -> String {
        format!("`{} {}`", program, args.join(" "))
    }
}

#[async_trait]
impl Compiler for ChiaTools {
    async fn compile(&self, source: &PuzzleSource) -> Result<String> {
        let mut args = vec![source.path.display().to_string()];
        for dir in &source.include {
            args.push("--include".into());
            args.push(dir.display().to_string());
        }
        if source.strict {
            args.push("--strict".into());
        }
        let text = self
            .output(&self.bins.run, &args)
            .await
            .map_err(|e| Error::compilation(Self::describe(&self.bins.run, &args), e))?;
        if text.is_empty() {
            return Err(Error::compilation(Self::describe(&self.bins.run, &args), "compiler printed nothing"));
        }
        Ok(text)
    }
}

#[async_trait]
impl Executor for ChiaTools {
    async fn execute(&self, program: &str, env: &str) -> Result<String> {
        let args = vec![program.to_string(), env.to_string()];
        self.output(&self.bins.brun, &args)
            .await
            .map_err(|e| Error::compilation(format!("executing puzzle with `{}`", self.bins.brun), e))
    }
}

#[async_trait]
impl LedgerClient for ChiaTools {
    async fn unspent_by_puzzle_hash(&self, puzzle_hash: &Bytes32) -> Result<Vec<CoinRecord>> {
        let args: Vec<String> = ["rpc", "coinrecords", "--only-unspent", "--by", "puzzlehash"]
            .iter()
            .map(|s| s.to_string())
            .chain(std::iter::once(puzzle_hash.to_string()))
            .collect();
        let result = self.output(&self.bins.cdv, &args).await;
        classify_coin_records(result)
    }

    async fn push_tx(&self, bundle_file: &Path) -> Result<()> {
        let args = vec!["rpc".to_string(), "pushtx".to_string(), bundle_file.display().to_string()];
        let result = self.output(&self.bins.cdv, &args).await;
        classify_push(bundle_file, result)
    }
}

/// Markers `cdv` prints when it cannot reach the full node RPC.
const TRANSPORT_MARKERS: &[&str] =
    &["connection refused", "connection error", "cannot connect", "timed out", "timeout", "connectionerror"];

fn is_transport_failure(lower: &str) -> bool {
    TRANSPORT_MARKERS.iter().any(|t| lower.contains(t))
}

/// `cdv rpc coinrecords` prints connection trouble on stdout and still exits 0,
/// so the text is checked before it is treated as JSON.
fn classify_coin_records(result: std::result::Result<String, ToolFailure>) -> Result<Vec<CoinRecord>> {
    let json = result.map_err(|e| Error::ledger("get coin records", e))?;
    if is_transport_failure(&json.to_ascii_lowercase()) {
        return Err(Error::ledger("get coin records", json.trim()));
    }
    ledger::parse_coin_records(&json)
}

/// `cdv rpc pushtx` reports node-side rejections on stdout, sometimes with a
/// zero exit status, so the outcome is read from the text.
fn classify_push(bundle_file: &Path, result: std::result::Result<String, ToolFailure>) -> Result<()> {
    let bundle = bundle_file.display().to_string();
    let (ok_exit, text) = match result {
        Ok(stdout) => (true, stdout),
        Err(ToolFailure::Spawn(e)) => return Err(Error::ledger("push spend bundle", format!("could not start: {e}"))),
        Err(ToolFailure::Exit { stdout, stderr, .. }) => (false, format!("{stdout}\n{stderr}")),
    };
    let lower = text.to_ascii_lowercase();
    if lower.contains("'success': true") || lower.contains("\"success\": true") || lower.contains("'status': 'success'") {
        return Ok(());
    }
    if is_transport_failure(&lower) {
        return Err(Error::ledger("push spend bundle", text.trim()));
    }
    if ok_exit && !(lower.contains("error") || lower.contains("fail") || lower.contains("'success': false")) {
        return Ok(());
    }
    Err(Error::BroadcastRejected { bundle, reason: text.trim().to_string() })
}

#[async_trait]
impl WalletClient for ChiaTools {
    async fn send(&self, amount: Mojos, fee: Mojos, fingerprint: u32, address: &str) -> Result<()> {
        let args = vec![
            "wallet".to_string(), "send".to_string(),
            "--amount".to_string(), amount.to_xch_string(),
            "--fee".to_string(), fee.to_xch_string(),
            "--fingerprint".to_string(), fingerprint.to_string(),
            "--address".to_string(), address.to_string(),
        ];
        let out = self
            .output(&self.bins.chia, &args)
            .await
            .map_err(|e| Error::wallet("send funds to puzzle address", e))?;
        if !out.is_empty() {
            println!("{out}");
        }
        Ok(())
    }

    async fn receive_address(&self, fingerprint: u32) -> Result<String> {
        let args = vec![
            "wallet".to_string(), "get_address".to_string(),
            "--fingerprint".to_string(), fingerprint.to_string(),
        ];
        let out = self
            .output(&self.bins.chia, &args)
            .await
            .map_err(|e| Error::wallet("get wallet address", e))?;
        // The address is the last line; earlier lines are connection chatter.
        out.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .last()
            .map(str::to_string)
            .ok_or_else(|| Error::wallet("get wallet address", "wallet printed no address"))
    }
}
