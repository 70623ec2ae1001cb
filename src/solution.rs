use crate::clvm;
use crate::coin::{Bytes32, PrefixedHex, Program};
use crate::error::{Error, Result};

pub const DEFAULT_TAG: &str = "foo2";

/// Spend-time input to the revealed puzzle: `(tag owner_hash amount)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    pub tag: String,
    pub owner: Bytes32,
    pub amount: u64,
    /// Text form, e.g. `('foo2' 0xcc.. 10000000000)`.
    pub source: String,
    /// Serialized form placed in the spend.
    pub encoded: Program,
}

impl Solution {
    /// Builds the solution releasing `amount` to the raw owner hash.
    ///
    /// `owner` must already be decoded from its address form; the puzzle
    /// compares raw commitment bytes.
    pub fn build(tag: &str, owner: &Bytes32, amount: u64) -> Result<Self> {
        if tag.is_empty() || tag.contains(['\'', '"']) || tag.chars().any(char::is_whitespace) {
            return Err(Error::encoding("solution", format!("invalid operation tag {tag:?}")));
        }
        let owner_bytes = owner.to_bytes();
        let amount_bytes = clvm::int_to_bytes(amount as i128);
        let encoded = clvm::atom_list(&[tag.as_bytes(), &owner_bytes, &amount_bytes])?;
        Ok(Solution {
            tag: tag.to_string(),
            owner: *owner,
            amount,
            source: format!("('{}' {} {})", tag, owner.prefixed_hex(), amount),
            encoded,
        })
    }

    /// Reads `(tag owner amount)` back out of an encoded solution.
    pub fn decode(encoded: &Program) -> Result<Self> {
        let bad = |why: &str| Error::decode("solution", why.to_string());
        let items = clvm::list_atoms(encoded)?.ok_or_else(|| bad("not a flat list of atoms"))?;
        let [tag, owner, amount] = items.as_slice() else {
            return Err(bad("expected (tag owner amount)"));
        };
        let tag = String::from_utf8(tag.clone()).map_err(|_| bad("tag is not utf-8"))?;
        let owner: [u8; 32] = owner.as_slice().try_into().map_err(|_| bad("owner is not a 32-byte atom"))?;
        let amount = clvm::bytes_to_int(amount)
            .and_then(|n| u64::try_from(n).ok())
            .ok_or_else(|| bad("amount is not a non-negative integer"))?;
        Solution::build(&tag, &Bytes32::new(owner), amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_and_encoding_agree() {
        let owner = Bytes32::new([0xcc; 32]);
        let sol = Solution::build(DEFAULT_TAG, &owner, 10_000_000_000).unwrap();
        assert_eq!(sol.source, format!("('foo2' 0x{} 10000000000)", "cc".repeat(32)));
        assert_eq!(clvm::assemble(&sol.source).unwrap(), sol.encoded);
    }

    #[test]
    fn decode_recovers_fields() {
        let owner = Bytes32::new([0x11; 32]);
        let sol = Solution::build("foo2", &owner, 1).unwrap();
        assert_eq!(Solution::decode(&sol.encoded).unwrap(), sol);
    }

    #[test]
    fn zero_amount_encodes_as_nil() {
        let sol = Solution::build("foo2", &Bytes32::new([1; 32]), 0).unwrap();
        assert!(clvm::to_hex(&sol.encoded).ends_with("8080"));
        assert_eq!(Solution::decode(&sol.encoded).unwrap().amount, 0);
    }

    #[test]
    fn rejects_bad_tags() {
        for tag in ["", "fo'o", "two words"] {
            assert!(matches!(Solution::build(tag, &Bytes32::new([0; 32]), 1), Err(Error::Encoding { .. })));
        }
    }
}
