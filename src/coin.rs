// Ledger types. `Bytes32`, `Coin` and coin ids are the chia protocol's; this module
// adds the `0x`-hex JSON shape the node RPC and `spendbundle.json` use.

pub use chia::protocol::{Bytes32, Coin, Program};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// Hex rendering for hashes as the node RPC prints them.
pub trait PrefixedHex {
    /// `0x`-prefixed lowercase hex.
    fn prefixed_hex(&self) -> String;
}

impl PrefixedHex for Bytes32 {
    fn prefixed_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_bytes()))
    }
}

/// Accepts hex with or without a `0x` prefix; anything but 32 bytes is rejected.
pub fn parse_bytes32(s: &str) -> Result<Bytes32> {
    let s = s.trim();
    let digits = s.strip_prefix("0x").unwrap_or(s);
    let raw = hex::decode(digits).map_err(|e| Error::encoding(format!("hash {s:?}"), e))?;
    let arr: [u8; 32] = raw
        .try_into()
        .map_err(|v: Vec<u8>| Error::encoding(format!("hash {s:?}"), format!("expected 32 bytes, got {}", v.len())))?;
    Ok(Bytes32::new(arr))
}

/// Serde adapter for `Coin` in the RPC's `{amount, parent_coin_info, puzzle_hash}` form.
pub mod coin_json {
    use super::*;

    #[derive(Serialize, Deserialize)]
    struct WireCoin {
        amount: u64,
        parent_coin_info: String,
        puzzle_hash: String,
    }

    pub fn serialize<S: Serializer>(coin: &Coin, s: S) -> std::result::Result<S::Ok, S::Error> {
        WireCoin {
            amount: coin.amount,
            parent_coin_info: coin.parent_coin_info.prefixed_hex(),
            puzzle_hash: coin.puzzle_hash.prefixed_hex(),
        }
        .serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Coin, D::Error> {
        let wire = WireCoin::deserialize(d)?;
        let parent = parse_bytes32(&wire.parent_coin_info).map_err(serde::de::Error::custom)?;
        let puzzle_hash = parse_bytes32(&wire.puzzle_hash).map_err(serde::de::Error::custom)?;
        Ok(Coin::new(parent, puzzle_hash, wire.amount))
    }
}

/// Serde adapter for a serialized program as bare lowercase hex.
pub mod program_hex {
    use super::*;

    pub fn serialize<S: Serializer>(program: &Program, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(&crate::clvm::to_hex(program))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Program, D::Error> {
        let text = String::deserialize(d)?;
        crate::clvm::from_hex(&text).map_err(serde::de::Error::custom)
    }
}

/// A coin plus the ledger's metadata about it. Read-only to us.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CoinRecord {
    #[serde(with = "coin_json")]
    pub coin: Coin,
    #[serde(default)]
    pub spent: bool,
    #[serde(default)]
    pub coinbase: bool,
    #[serde(default)]
    pub confirmed_block_index: u32,
    #[serde(default)]
    pub spent_block_index: u32,
    #[serde(default)]
    pub timestamp: u64,
}

impl CoinRecord {
    pub fn unspent(coin: Coin) -> Self {
        CoinRecord {
            coin,
            spent: false,
            coinbase: false,
            confirmed_block_index: 0,
            spent_block_index: 0,
            timestamp: 0,
        }
    }

    /// Spent either by flag or by a recorded spend height; some nodes only set the latter.
    pub fn is_spent(&self) -> bool {
        self.spent || self.spent_block_index > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes32_accepts_both_hex_forms() {
        let a = parse_bytes32(&format!("0x{}", "ab".repeat(32))).unwrap();
        let b = parse_bytes32(&"ab".repeat(32)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.prefixed_hex(), format!("0x{}", "ab".repeat(32)));
        assert_eq!(a.to_string(), "ab".repeat(32));
    }

    #[test]
    fn bytes32_rejects_wrong_length() {
        assert!(matches!(parse_bytes32("0xabcd"), Err(Error::Encoding { .. })));
        assert!(matches!(parse_bytes32(&"zz".repeat(32)), Err(Error::Encoding { .. })));
    }

    #[test]
    fn coin_json_uses_ledger_field_names() {
        let record = CoinRecord::unspent(Coin::new(Bytes32::new([0xaa; 32]), Bytes32::new([0xbb; 32]), 10_000_000_000));
        let js = serde_json::to_value(&record).unwrap();
        assert_eq!(js["coin"]["amount"], 10_000_000_000u64);
        assert_eq!(js["coin"]["parent_coin_info"], format!("0x{}", "aa".repeat(32)));
        assert_eq!(js["coin"]["puzzle_hash"], format!("0x{}", "bb".repeat(32)));
        let back: CoinRecord = serde_json::from_value(js).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn coin_id_changes_with_amount() {
        let coin = Coin::new(Bytes32::new([1; 32]), Bytes32::new([2; 32]), 1);
        let other = Coin::new(Bytes32::new([1; 32]), Bytes32::new([2; 32]), 2);
        assert_ne!(coin.coin_id(), other.coin_id());
        assert_eq!(coin.coin_id(), coin.coin_id());
    }

    #[test]
    fn spend_height_alone_marks_a_record_spent() {
        let mut record = CoinRecord::unspent(Coin::new(Bytes32::new([0; 32]), Bytes32::new([0; 32]), 1));
        assert!(!record.is_spent());
        record.spent_block_index = 12;
        assert!(record.is_spent());
    }
}
