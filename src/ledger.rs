use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;

use crate::coin::{Bytes32, Coin, CoinRecord};
use crate::error::{Error, Result};

/// Full-node access: coin lookup by puzzle hash and bundle broadcast.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Unspent coin records locked under `puzzle_hash`, in ledger order.
    async fn unspent_by_puzzle_hash(&self, puzzle_hash: &Bytes32) -> Result<Vec<CoinRecord>>;

    /// Submits a persisted spend bundle file. A ledger-side rejection is
    /// `Error::BroadcastRejected`; transport trouble is `Error::LedgerUnavailable`.
    async fn push_tx(&self, bundle_file: &Path) -> Result<()>;
}

/// Looks up the coins locked under `hash`. An empty result is not an error here.
/// Records the ledger reports as spent, by flag or by spend height, are dropped.
pub async fn find_unspent_by_owner(ledger: &dyn LedgerClient, hash: &Bytes32) -> Result<Vec<CoinRecord>> {
    let records = ledger.unspent_by_puzzle_hash(hash).await?;
    Ok(records.into_iter().filter(|r| !r.is_spent()).collect())
}

/// Decodes the JSON array printed by `cdv rpc coinrecords`.
pub fn parse_coin_records(json: &str) -> Result<Vec<CoinRecord>> {
    let trimmed = json.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(trimmed).map_err(|e| Error::decode("coin records", e))
}

/// Which of the coins under one puzzle hash an unlock spends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoinSelection {
    /// Only the first record the ledger returned; others stay locked.
    #[default]
    First,
    /// Every returned record, one spend each.
    All,
}

impl CoinSelection {
    pub fn select(&self, records: &[CoinRecord]) -> Vec<Coin> {
        match self {
            CoinSelection::First => records.first().map(|r| r.coin).into_iter().collect(),
            CoinSelection::All => records.iter().map(|r| r.coin).collect(),
        }
    }
}
