use thiserror::Error;

/// Failures surfaced by the lock/unlock workflows and their building blocks.
///
/// Every variant carries the operation that failed so the operator can see
/// which step broke without re-running side-effecting steps.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to compile puzzle ({context}): {reason}")]
    Compilation { context: String, reason: String },

    #[error("failed to encode {context}: {reason}")]
    Encoding { context: String, reason: String },

    #[error("ledger unavailable while trying to {context}: {reason}")]
    LedgerUnavailable { context: String, reason: String },

    #[error("failed to decode {context}: {reason}")]
    Decode { context: String, reason: String },

    #[error("no records, no funds locked with puzzle hash {puzzle_hash}")]
    NoFundsLocked { puzzle_hash: String },

    #[error("ledger rejected spend bundle {bundle}: {reason}")]
    BroadcastRejected { bundle: String, reason: String },

    #[error("wallet unavailable while trying to {context}: {reason}")]
    WalletUnavailable { context: String, reason: String },

    #[error("failed to persist spend bundle to {path}: {source}")]
    Persist {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("refusing to build an unsigned spend bundle; set `allow_unsigned = true` under [unlock] if the puzzle accepts unsigned spends")]
    UnsignedSpendRefused,

    #[error("cancelled before {0}")]
    Cancelled(&'static str),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("environment check failed: {0}")]
    Environment(String),
}

impl Error {
    pub fn compilation(context: impl Into<String>, reason: impl ToString) -> Self {
        Error::Compilation { context: context.into(), reason: reason.to_string() }
    }

    pub fn encoding(context: impl Into<String>, reason: impl ToString) -> Self {
        Error::Encoding { context: context.into(), reason: reason.to_string() }
    }

    pub fn ledger(context: impl Into<String>, reason: impl ToString) -> Self {
        Error::LedgerUnavailable { context: context.into(), reason: reason.to_string() }
    }

    pub fn decode(context: impl Into<String>, reason: impl ToString) -> Self {
        Error::Decode { context: context.into(), reason: reason.to_string() }
    }

    pub fn wallet(context: impl Into<String>, reason: impl ToString) -> Self {
        Error::WalletUnavailable { context: context.into(), reason: reason.to_string() }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
