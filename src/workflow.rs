// Lock / unlock orchestration. Every step blocks on the previous one; no state
// survives between runs except the persisted spend bundle.

use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast::{self, error::{RecvError, TryRecvError}};

use crate::address::AddressCodec;
use crate::bundle::{self, Persisted, Spend, SpendBundle, PLACEHOLDER_SIGNATURE};
use crate::clvm;
use crate::coin::{Bytes32, Coin, PrefixedHex};
use crate::error::{Error, Result};
use crate::ledger::{self, CoinSelection, LedgerClient};
use crate::puzzle::{Compiler, Executor, PuzzleCommitment, PuzzleSource};
use crate::solution::Solution;
use crate::wallet::{Mojos, WalletClient};

static QUIET: AtomicBool = AtomicBool::new(false);
/// Toggle the per-step artifact dump. Warnings still print.
pub fn set_quiet_logging(quiet: bool) {
    QUIET.store(quiet, Ordering::Relaxed);
}

macro_rules! step_log {
    ($($arg:tt)*) => {
        if !QUIET.load(Ordering::Relaxed) {
            println!($($arg)*);
        }
    };
}

/// The external capabilities a workflow runs against.
#[derive(Clone, Copy)]
pub struct Ctx<'a> {
    pub compiler: &'a dyn Compiler,
    pub ledger: &'a dyn LedgerClient,
    pub wallet: &'a dyn WalletClient,
    pub codec: &'a dyn AddressCodec,
}

#[derive(Debug, Clone)]
pub struct LockParams {
    pub source: PuzzleSource,
    pub address_prefix: String,
    pub fingerprint: u32,
    pub amount: Mojos,
    pub fee: Mojos,
}

#[derive(Debug, Clone)]
pub struct LockOutcome {
    pub commitment: PuzzleCommitment,
    pub address: String,
    pub amount: Mojos,
    pub fee: Mojos,
}

#[derive(Debug, Clone)]
pub struct UnlockParams {
    pub source: PuzzleSource,
    pub fingerprint: u32,
    pub solution_tag: String,
    pub selection: CoinSelection,
    pub bundle_path: PathBuf,
    pub archive_dir: Option<PathBuf>,
    pub allow_unsigned: bool,
}

#[derive(Debug, Clone)]
pub struct UnlockOutcome {
    pub commitment: PuzzleCommitment,
    pub wallet_address: String,
    pub wallet_hash: Bytes32,
    pub solutions: Vec<Solution>,
    pub bundle: SpendBundle,
    pub persisted: Persisted,
}

/// Compiles the puzzle and encodes its hash as an address. No ledger effect.
pub async fn describe(
    compiler: &dyn Compiler,
    codec: &dyn AddressCodec,
    source: &PuzzleSource,
    prefix: &str,
) -> Result<(PuzzleCommitment, String)> {
    let commitment = PuzzleCommitment::derive(compiler, source).await?;
    step_log!("🧩 puzzle source: {}", commitment.source);
    step_log!("🔓 puzzle reveal: {}", commitment.reveal_hex());
    step_log!("#️⃣  puzzle hash: {}", commitment.hash);

    let address = codec.encode(&commitment.hash, prefix)?;
    step_log!("📫 puzzle addr: {}", address);
    Ok((commitment, address))
}

/// Compile → derive address → transfer funds to it.
pub async fn lock(ctx: Ctx<'_>, params: &LockParams, shutdown: &mut broadcast::Receiver<()>) -> Result<LockOutcome> {
    let (commitment, address) = guarded(
        shutdown,
        "deriving the puzzle address",
        describe(ctx.compiler, ctx.codec, &params.source, &params.address_prefix),
    )
    .await?;

    // Always reported, even in quiet mode: this moves real funds.
    println!("💸 Locking {} with fee {}", params.amount, params.fee);
    println!("   from wallet fingerprint {} to {}", params.fingerprint, address);
    check_cancelled(shutdown, "sending funds")?;

    ctx.wallet
        .send(params.amount, params.fee, params.fingerprint, &address)
        .await?;
    step_log!("✅ Funds sent to puzzle address");

    Ok(LockOutcome { commitment, address, amount: params.amount, fee: params.fee })
}

/// Compile → query → select → destination → solution → bundle → persist → broadcast.
pub async fn unlock(ctx: Ctx<'_>, params: &UnlockParams, shutdown: &mut broadcast::Receiver<()>) -> Result<UnlockOutcome> {
    if !params.allow_unsigned {
        return Err(Error::UnsignedSpendRefused);
    }

    let commitment = guarded(shutdown, "compiling the puzzle", PuzzleCommitment::derive(ctx.compiler, &params.source)).await?;
    step_log!("🔓 puzzle reveal: {}", commitment.reveal_hex());
    step_log!("#️⃣  puzzle hash: {}", commitment.hash);

    let records = guarded(
        shutdown,
        "querying coin records",
        ledger::find_unspent_by_owner(ctx.ledger, &commitment.hash),
    )
    .await?;
    if records.is_empty() {
        return Err(Error::NoFundsLocked { puzzle_hash: commitment.hash.prefixed_hex() });
    }
    for (i, record) in records.iter().enumerate() {
        step_log!("--- coin #{:03} ---", i);
        step_log!("\tAmount: {}", record.coin.amount);
        step_log!("\tParent: {}", record.coin.parent_coin_info);
        step_log!("\t  Hash: {}", record.coin.puzzle_hash);
    }

    let coins = params.selection.select(&records);
    for coin in &coins {
        if coin.puzzle_hash != commitment.hash {
            return Err(Error::decode(
                "coin records",
                format!("coin {} is locked under {}, not {}", coin.coin_id(), coin.puzzle_hash, commitment.hash),
            ));
        }
    }
    if coins.len() < records.len() {
        println!("⚠️  {} more coin(s) remain locked under this puzzle hash", records.len() - coins.len());
    }

    let wallet_address = guarded(shutdown, "resolving the wallet address", ctx.wallet.receive_address(params.fingerprint)).await?;
    step_log!("👛 wallet addr: {}", wallet_address);
    let wallet_hash = ctx.codec.decode(&wallet_address)?;
    step_log!("👛 wallet hash: {}", wallet_hash);

    let (spends, solutions) = build_spends(&commitment, &coins, &params.solution_tag, &wallet_hash)?;
    let bundle = SpendBundle::assemble(spends, PLACEHOLDER_SIGNATURE)?;
    if bundle.is_unsigned() {
        println!("⚠️  Spend bundle carries a placeholder signature; the puzzle must accept unsigned spends");
    }

    check_cancelled(shutdown, "persisting the spend bundle")?;
    let persisted = bundle::persist(&bundle, &params.bundle_path, params.archive_dir.as_deref())?;
    step_log!("📦 spend bundle: {}", persisted.json);
    step_log!("💾 saved to {}", persisted.path.display());
    if let Some(copy) = &persisted.archive {
        step_log!("🗄️  archived at {}", copy.display());
    }

    // Past this point the bundle is on disk; shutdown no longer interrupts.
    ctx.ledger.push_tx(&persisted.path).await?;
    println!("🚀 Spend bundle accepted: {} mojos returned to {}", bundle.total_amount(), wallet_address);

    Ok(UnlockOutcome { commitment, wallet_address, wallet_hash, solutions, bundle, persisted })
}

fn build_spends(
    commitment: &PuzzleCommitment,
    coins: &[Coin],
    tag: &str,
    owner: &Bytes32,
) -> Result<(Vec<Spend>, Vec<Solution>)> {
    let mut spends = Vec::with_capacity(coins.len());
    let mut solutions = Vec::with_capacity(coins.len());
    for coin in coins {
        // Full-balance release: the solution moves exactly the coin's amount.
        let solution = Solution::build(tag, owner, coin.amount)?;
        step_log!("🧮 solution source: {}", solution.source);
        step_log!("🧮 solution encoded: {}", clvm::to_hex(&solution.encoded));
        spends.push(Spend {
            coin: *coin,
            puzzle_reveal: commitment.reveal.clone(),
            solution: solution.encoded.clone(),
        });
        solutions.push(solution);
    }
    Ok((spends, solutions))
}

/// Compiles the puzzle and executes it against `env`, returning the result text.
pub async fn run(compiler: &dyn Compiler, executor: &dyn Executor, source: &PuzzleSource, env: &str) -> Result<String> {
    let compiled = compiler.compile(source).await?;
    step_log!("🧩 compiled: {}", compiled);
    executor.execute(&compiled, env).await
}

async fn guarded<T>(
    shutdown: &mut broadcast::Receiver<()>,
    step: &'static str,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancelled(shutdown) => Err(Error::Cancelled(step)),
        res = fut => res,
    }
}

async fn cancelled(shutdown: &mut broadcast::Receiver<()>) {
    match shutdown.recv().await {
        Ok(()) | Err(RecvError::Lagged(_)) => {}
        // Sender gone: nobody can cancel us any more.
        Err(RecvError::Closed) => std::future::pending().await,
    }
}

fn check_cancelled(shutdown: &mut broadcast::Receiver<()>, step: &'static str) -> Result<()> {
    match shutdown.try_recv() {
        Ok(()) | Err(TryRecvError::Lagged(_)) => Err(Error::Cancelled(step)),
        Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => Ok(()),
    }
}
