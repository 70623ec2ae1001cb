use async_trait::async_trait;
use std::path::PathBuf;

use crate::clvm;
use crate::coin::{Bytes32, Program};
use crate::error::Result;

/// Where the puzzle program lives and how to compile it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PuzzleSource {
    pub path: PathBuf,
    pub include: Vec<PathBuf>,
    pub strict: bool,
}

impl PuzzleSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        PuzzleSource { path: path.into(), include: Vec::new(), strict: true }
    }
}

/// Turns puzzle source into compiled CLVM text.
#[async_trait]
pub trait Compiler: Send + Sync {
    /// Returns the compiled program in CLVM assembly text, e.g. `(a (q 2 ...) 1)`.
    async fn compile(&self, source: &PuzzleSource) -> Result<String>;
}

/// Runs a compiled program against an environment (the `brun` tool).
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, program: &str, env: &str) -> Result<String>;
}

/// The commitment a coin is locked under, plus everything needed to reveal it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PuzzleCommitment {
    /// Compiled program text.
    pub source: String,
    /// Serialized program, disclosed at spend time.
    pub reveal: Program,
    /// Tree hash of the compiled program; the coin's puzzle hash.
    pub hash: Bytes32,
}

impl PuzzleCommitment {
    /// Compiles `source` and derives its reveal and hash.
    ///
    /// Deterministic: lock and unlock run in separate processes and must
    /// agree on the hash, so nothing here may depend on time or randomness.
    pub async fn derive(compiler: &dyn Compiler, source: &PuzzleSource) -> Result<Self> {
        let compiled = compiler.compile(source).await?;
        Self::from_compiled(compiled)
    }

    /// Derives reveal and hash from already-compiled CLVM text.
    pub fn from_compiled(compiled: String) -> Result<Self> {
        let reveal = clvm::assemble(&compiled)?;
        let hash = clvm::tree_hash(&reveal)?;
        Ok(PuzzleCommitment { source: compiled, reveal, hash })
    }

    /// Reveal as the hex the `cdv` tools and `spendbundle.json` carry.
    pub fn reveal_hex(&self) -> String {
        clvm::to_hex(&self.reveal)
    }
}
