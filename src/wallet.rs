use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

pub const MOJOS_PER_XCH: u64 = 1_000_000_000_000;
const XCH_DECIMALS: usize = 12;

/// The operator's wallet: sends funds and hands out receive addresses.
#[async_trait]
pub trait WalletClient: Send + Sync {
    /// Sends `amount` (plus `fee`) from the wallet selected by `fingerprint` to `address`.
    async fn send(&self, amount: Mojos, fee: Mojos, fingerprint: u32, address: &str) -> Result<()>;

    /// Current receive address of the wallet selected by `fingerprint`.
    async fn receive_address(&self, fingerprint: u32) -> Result<String>;
}

/// An amount in mojos (10^-12 XCH).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Deserialize)]
#[serde(transparent)]
pub struct Mojos(pub u64);

impl Mojos {
    /// Decimal XCH rendering without trailing zeros, e.g. `0.00005`.
    pub fn to_xch_string(&self) -> String {
        let whole = self.0 / MOJOS_PER_XCH;
        let frac = self.0 % MOJOS_PER_XCH;
        if frac == 0 {
            return whole.to_string();
        }
        let digits = format!("{:0width$}", frac, width = XCH_DECIMALS);
        format!("{}.{}", whole, digits.trim_end_matches('0'))
    }
}

impl fmt::Display for Mojos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} XCH ({} mojos)", self.to_xch_string(), self.0)
    }
}

impl FromStr for Mojos {
    type Err = Error;

    /// Parses a decimal XCH amount such as `0.01` or `2`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let bad = |why: &str| Error::Config(format!("invalid XCH amount {s:?}: {why}"));
        let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
        if whole.is_empty() && frac.is_empty() {
            return Err(bad("empty"));
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(bad("not a decimal number"));
        }
        if frac.len() > XCH_DECIMALS {
            return Err(bad("more than 12 decimal places"));
        }
        let whole: u64 = if whole.is_empty() { 0 } else { whole.parse().map_err(|_| bad("too large"))? };
        let frac_mojos: u64 = if frac.is_empty() {
            0
        } else {
            format!("{:0<width$}", frac, width = XCH_DECIMALS).parse().map_err(|_| bad("bad fraction"))?
        };
        whole
            .checked_mul(MOJOS_PER_XCH)
            .and_then(|m| m.checked_add(frac_mojos))
            .map(Mojos)
            .ok_or_else(|| bad("too large"))
    }
}
