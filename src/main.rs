use clap::{Parser, Subcommand};
use tokio::signal;
use tokio::sync::broadcast;
use anyhow::Context;

use coinlock::{
    address::{self, AddressCodec},
    config::{self, Config},
    workflow::{self, Ctx, LockParams, UnlockParams},
    coin::{self, PrefixedHex},
    Bech32m, ChiaTools, CoinSelection, Error, Mojos,
};

#[derive(Parser)]
#[command(author, version, about = "coinlock: lock coins behind a puzzle hash and unlock them again")]
struct Cli {
    #[arg(short, long, default_value = "coinlock.toml")]
    config: String,

    /// Only print warnings, errors and the final result
    #[arg(long, default_value_t = false)]
    quiet: bool,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Send funds from the operator wallet to the puzzle address
    Lock {
        /// Amount in XCH (overrides [lock] amount_mojos)
        #[arg(long)]
        amount: Option<Mojos>,
        /// Fee in XCH (overrides [lock] fee_mojos)
        #[arg(long)]
        fee: Option<Mojos>,
    },
    /// Reveal the puzzle and return the locked funds to the operator wallet
    Unlock {
        /// Spend every coin under the puzzle hash, not just the first
        #[arg(long)]
        all: bool,
    },
    /// Print the compiled puzzle, its reveal, hash and address
    Puzzle,
    /// Compile the puzzle and execute it against an environment
    Run {
        /// CLVM environment, e.g. "(foo2 0xcafe 100)"
        env: String,
    },
    /// Convert between puzzle hashes and addresses
    #[command(subcommand)]
    Address(AddressCmd),
}

#[derive(Subcommand)]
enum AddressCmd {
    Encode {
        hash: String,
        /// Address prefix (defaults to the configured network's)
        #[arg(long)]
        prefix: Option<String>,
    },
    Decode {
        address: String,
    },
}

fn load_config(path: &str) -> anyhow::Result<Config> {
    match config::load(path) {
        Ok(c) => Ok(c),
        Err(e1) if !std::path::Path::new(path).exists() => {
            eprintln!("⚠️  {e1:#}; using built-in defaults");
            const EMBEDDED_CONFIG: &str = include_str!("../coinlock.toml");
            config::load_from_str(EMBEDDED_CONFIG)
                .map_err(|e2| anyhow::anyhow!("failed to load configuration: {} / {}", e1, e2))
        }
        Err(e) => Err(e),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if cli.quiet { workflow::set_quiet_logging(true); }

    let cfg = load_config(&cli.config)?;
    let codec = Bech32m;

    if !matches!(cli.cmd, Cmd::Address(_)) {
        config::preflight(&cfg).context("preflight checks failed")?;
    }

    let tools = ChiaTools::from_config(&cfg);
    let ctx = Ctx { compiler: &tools, ledger: &tools, wallet: &tools, codec: &codec };
    let source = cfg.puzzle.to_source();

    let (shutdown_tx, mut shutdown_rx) = broadcast::channel::<()>(1);
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            eprintln!("\n🛑 Interrupt received, aborting before the next side effect...");
            let _ = shutdown_tx.send(());
        }
    });

    match cli.cmd {
        Cmd::Lock { amount, fee } => {
            let params = LockParams {
                source,
                address_prefix: cfg.network.address_prefix().to_string(),
                fingerprint: cfg.wallet.fingerprint,
                amount: amount.unwrap_or(cfg.lock.amount_mojos),
                fee: fee.unwrap_or(cfg.lock.fee_mojos),
            };
            let outcome = workflow::lock(ctx, &params, &mut shutdown_rx).await?;
            println!("🔒 Locked {} under puzzle hash {}", outcome.amount, outcome.commitment.hash.prefixed_hex());
        }
        Cmd::Unlock { all } => {
            let params = UnlockParams {
                source,
                fingerprint: cfg.wallet.fingerprint,
                solution_tag: cfg.unlock.solution_tag.clone(),
                selection: if all { CoinSelection::All } else { cfg.unlock.coin_selection },
                bundle_path: cfg.unlock.bundle_path.clone(),
                archive_dir: cfg.unlock.archive_dir.clone(),
                allow_unsigned: cfg.unlock.allow_unsigned,
            };
            match workflow::unlock(ctx, &params, &mut shutdown_rx).await {
                Ok(outcome) => {
                    println!("🔓 Unlocked {} coin(s) to {}", outcome.bundle.coin_spends.len(), outcome.wallet_address);
                }
                Err(e @ Error::BroadcastRejected { .. }) => {
                    eprintln!("❌ {e}");
                    eprintln!("   Spend bundle kept at {} for inspection or `cdv rpc pushtx`", params.bundle_path.display());
                    return Err(e.into());
                }
                Err(e) => return Err(e.into()),
            }
        }
        Cmd::Puzzle => {
            let (commitment, addr) = workflow::describe(&tools, &codec, &source, cfg.network.address_prefix()).await?;
            if cli.quiet {
                println!("{}\n{}", commitment.hash.prefixed_hex(), addr);
            }
        }
        Cmd::Run { env } => {
            let result = workflow::run(&tools, &tools, &source, &env).await?;
            println!("{result}");
        }
        Cmd::Address(AddressCmd::Encode { hash, prefix }) => {
            let hash = coin::parse_bytes32(&hash)?;
            let prefix = prefix.as_deref().unwrap_or(cfg.network.address_prefix());
            println!("{}", codec.encode(&hash, prefix)?);
        }
        Cmd::Address(AddressCmd::Decode { address: addr }) => {
            let (_, hash) = address::decode_address(&addr)?;
            println!("{hash}");
        }
    }

    Ok(())
}
