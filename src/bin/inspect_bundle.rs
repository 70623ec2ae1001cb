use coinlock::coin::PrefixedHex;
use coinlock::{bundle, clvm, Solution};

fn main() -> anyhow::Result<()> {
    let path = std::env::args().nth(1).unwrap_or_else(|| "spendbundle.json".to_string());
    println!("🔍 Inspecting spend bundle {path}...");

    let bundle = bundle::load(std::path::Path::new(&path))?;
    println!("✍️  Signature: {}", if bundle.is_unsigned() { "placeholder (unsigned)" } else { bundle.aggregated_signature.as_str() });
    println!("📦 Spends: {}", bundle.coin_spends.len());

    let mut problems = 0;
    for (i, spend) in bundle.coin_spends.iter().enumerate() {
        println!("\n--- spend #{i:03} ---");
        println!("   Coin id: {}", spend.coin.coin_id().prefixed_hex());
        println!("   Amount:  {}", spend.coin.amount);
        println!("   Parent:  {}", spend.coin.parent_coin_info.prefixed_hex());
        println!("   Hash:    {}", spend.coin.puzzle_hash.prefixed_hex());

        match clvm::tree_hash(&spend.puzzle_reveal) {
            Ok(revealed) if revealed == spend.coin.puzzle_hash => {
                println!("   Reveal:  ✅ hashes to the coin's puzzle hash");
            }
            Ok(revealed) => {
                println!("   Reveal:  ❌ hashes to {}", revealed.prefixed_hex());
                problems += 1;
            }
            Err(e) => {
                println!("   Reveal:  ❌ {e}");
                problems += 1;
            }
        }

        match Solution::decode(&spend.solution) {
            Ok(sol) => {
                println!("   Solution: {}", sol.source);
                if sol.amount != spend.coin.amount {
                    println!("   ⚠️  solution releases {} of {} mojos", sol.amount, spend.coin.amount);
                    problems += 1;
                }
            }
            Err(_) => match clvm::disassemble(&spend.solution) {
                Ok(text) => println!("   Solution: {text}"),
                Err(e) => {
                    println!("   Solution: ❌ {e}");
                    problems += 1;
                }
            },
        }
    }

    println!("\n📈 Summary:");
    println!("   Total amount: {} mojos", bundle.total_amount());
    if problems > 0 {
        println!("   ⚠️  {problems} problem(s) found");
        anyhow::bail!("spend bundle {path} is not spendable as written");
    }
    println!("   ✅ Bundle is well formed");
    Ok(())
}
