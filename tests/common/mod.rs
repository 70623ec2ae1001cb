// In-memory doubles for the workflow capabilities.
#![allow(dead_code)]

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use coinlock::{
    clvm, Bech32m, Bytes32, Coin, CoinRecord, Compiler, Error, Executor, LedgerClient, Mojos,
    PuzzleSource, Result, WalletClient,
};
use coinlock::address::AddressCodec;
use coinlock::workflow::Ctx;

/// The compiled form of a small password puzzle.
pub const PROGRAM: &str = "(a (q 2 (i (= (sha256 5) (q . 0x4963bd713a7eb1bce458868b0c8472bdc8bc5929a7892a92dd24344aea92093d)) (q 4 (c (q . 51) (c 11 (c 23 ()))) ()) (q 8)) 1) 1)";

/// Raw hash behind the wallet's receive address.
pub fn owner() -> Bytes32 {
    Bytes32::new([0xcc; 32])
}

pub fn program_hash() -> Bytes32 {
    clvm::tree_hash(&clvm::assemble(PROGRAM).unwrap()).unwrap()
}

pub fn source() -> PuzzleSource {
    PuzzleSource::new("main.clsp")
}

pub fn coin(parent: u8, amount: u64) -> Coin {
    Coin::new(Bytes32::new([parent; 32]), program_hash(), amount)
}

pub struct FakeCompiler {
    pub program: String,
    pub calls: AtomicUsize,
}

impl FakeCompiler {
    pub fn new() -> Self {
        FakeCompiler { program: PROGRAM.to_string(), calls: AtomicUsize::new(0) }
    }

    pub fn failing() -> Self {
        FakeCompiler { program: String::new(), calls: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl Compiler for FakeCompiler {
    async fn compile(&self, source: &PuzzleSource) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.program.is_empty() {
            return Err(Error::compilation(source.path.display().to_string(), "syntax error"));
        }
        Ok(self.program.clone())
    }
}

#[async_trait]
impl Executor for FakeCompiler {
    async fn execute(&self, program: &str, env: &str) -> Result<String> {
        Ok(format!("{} applied to {}", program.len(), env))
    }
}

/// What the fake node answers to `push_tx`.
#[derive(Clone)]
pub enum Push {
    Accept,
    Reject(&'static str),
    Offline,
}

/// How the fake node answers coin record queries.
#[derive(Clone, Copy)]
pub enum Query {
    /// Records under the asked-for puzzle hash.
    ByPuzzleHash,
    /// Every record, whatever it is locked under.
    Everything,
    Offline,
    Garbled,
}

pub struct FakeLedger {
    pub records: Vec<CoinRecord>,
    pub query: Query,
    pub push: Push,
    pub queries: AtomicUsize,
    pub pushed: Mutex<Vec<PathBuf>>,
    /// File contents as seen at push time.
    pub pushed_json: Mutex<Vec<String>>,
}

impl FakeLedger {
    pub fn with(records: Vec<CoinRecord>, push: Push) -> Self {
        FakeLedger {
            records,
            query: Query::ByPuzzleHash,
            push,
            queries: AtomicUsize::new(0),
            pushed: Mutex::new(Vec::new()),
            pushed_json: Mutex::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self::with(Vec::new(), Push::Accept)
    }

    pub fn push_count(&self) -> usize {
        self.pushed.lock().unwrap().len()
    }
}

#[async_trait]
impl LedgerClient for FakeLedger {
    async fn unspent_by_puzzle_hash(&self, puzzle_hash: &Bytes32) -> Result<Vec<CoinRecord>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        match self.query {
            Query::ByPuzzleHash => {
                Ok(self.records.iter().filter(|r| r.coin.puzzle_hash == *puzzle_hash).cloned().collect())
            }
            Query::Everything => Ok(self.records.clone()),
            Query::Offline => Err(Error::ledger("get coin records", "connection refused")),
            Query::Garbled => Err(Error::decode("coin records", "expected value at line 1 column 1")),
        }
    }

    async fn push_tx(&self, bundle_file: &Path) -> Result<()> {
        self.pushed.lock().unwrap().push(bundle_file.to_path_buf());
        self.pushed_json.lock().unwrap().push(std::fs::read_to_string(bundle_file).unwrap_or_default());
        match &self.push {
            Push::Accept => Ok(()),
            Push::Reject(why) => Err(Error::BroadcastRejected {
                bundle: bundle_file.display().to_string(),
                reason: why.to_string(),
            }),
            Push::Offline => Err(Error::ledger("push spend bundle", "connection refused")),
        }
    }
}

pub struct FakeWallet {
    pub address: String,
    /// Wallet service down: every call fails.
    pub offline: bool,
    pub sends: Mutex<Vec<(Mojos, Mojos, u32, String)>>,
    pub send_attempts: AtomicUsize,
    pub address_calls: AtomicUsize,
}

impl FakeWallet {
    pub fn new() -> Self {
        FakeWallet {
            address: Bech32m.encode(&owner(), "txch").unwrap(),
            offline: false,
            sends: Mutex::new(Vec::new()),
            send_attempts: AtomicUsize::new(0),
            address_calls: AtomicUsize::new(0),
        }
    }

    pub fn offline() -> Self {
        FakeWallet { offline: true, ..Self::new() }
    }
}

#[async_trait]
impl WalletClient for FakeWallet {
    async fn send(&self, amount: Mojos, fee: Mojos, fingerprint: u32, address: &str) -> Result<()> {
        self.send_attempts.fetch_add(1, Ordering::SeqCst);
        if self.offline {
            return Err(Error::wallet("send funds to puzzle address", "wallet is not running"));
        }
        self.sends.lock().unwrap().push((amount, fee, fingerprint, address.to_string()));
        Ok(())
    }

    async fn receive_address(&self, _fingerprint: u32) -> Result<String> {
        self.address_calls.fetch_add(1, Ordering::SeqCst);
        if self.offline {
            return Err(Error::wallet("get wallet address", "wallet is not running"));
        }
        Ok(self.address.clone())
    }
}

pub fn ctx<'a>(compiler: &'a FakeCompiler, ledger: &'a FakeLedger, wallet: &'a FakeWallet, codec: &'a Bech32m) -> Ctx<'a> {
    Ctx { compiler, ledger, wallet, codec }
}
