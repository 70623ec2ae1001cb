// Library interface for coinlock
// Lock funds behind a puzzle hash and release them later by revealing the puzzle.

pub mod error;
pub mod clvm;
pub mod coin;
pub mod address;
pub mod puzzle;
pub mod ledger;
pub mod wallet;
pub mod solution;
pub mod bundle;
pub mod workflow;
pub mod tools;
pub mod config;

pub use error::{Error, Result};
pub use coin::{Bytes32, Coin, CoinRecord, PrefixedHex, Program};
pub use address::{AddressCodec, Bech32m};
pub use puzzle::{Compiler, Executor, PuzzleCommitment, PuzzleSource};
pub use ledger::{CoinSelection, LedgerClient};
pub use wallet::{Mojos, WalletClient};
pub use solution::Solution;
pub use bundle::{Spend, SpendBundle, PLACEHOLDER_SIGNATURE};
pub use tools::ChiaTools;
