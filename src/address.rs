// Address codec: puzzle hash <-> bech32m display address (`xch1...` / `txch1...`).

use crate::coin::Bytes32;
use crate::error::{Error, Result};

const CHARSET: &[u8] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";
const BECH32M_CONST: u32 = 0x2bc8_30a3;
const MAX_ADDRESS_LEN: usize = 90;

/// Converts between a commitment hash and its human-presentable address.
pub trait AddressCodec: Send + Sync {
    fn encode(&self, hash: &Bytes32, prefix: &str) -> Result<String>;
    fn decode(&self, address: &str) -> Result<Bytes32>;
}

/// In-process bech32m codec, byte-compatible with `cdv encode` / `cdv decode`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Bech32m;

impl AddressCodec for Bech32m {
    fn encode(&self, hash: &Bytes32, prefix: &str) -> Result<String> {
        encode_address(hash, prefix)
    }

    fn decode(&self, address: &str) -> Result<Bytes32> {
        decode_address(address).map(|(_, hash)| hash)
    }
}

pub fn encode_address(hash: &Bytes32, prefix: &str) -> Result<String> {
    if prefix.is_empty() || !prefix.bytes().all(|c| (33..=126).contains(&c)) {
        return Err(Error::encoding("address prefix", format!("invalid prefix {prefix:?}")));
    }
    let hrp = prefix.to_ascii_lowercase();
    let mut values = convert_bits(&hash.to_bytes(), 8, 5, true)?;
    let checksum = create_checksum(&hrp, &values);
    values.extend(checksum);

    let mut out = String::with_capacity(hrp.len() + 1 + values.len());
    out.push_str(&hrp);
    out.push('1');
    for v in values {
        out.push(CHARSET[v as usize] as char);
    }
    Ok(out)
}

/// Returns the prefix and the decoded hash.
pub fn decode_address(address: &str) -> Result<(String, Bytes32)> {
    let addr = address.trim();
    let ctx = || format!("address {addr:?}");
    if addr.len() > MAX_ADDRESS_LEN {
        return Err(Error::encoding(ctx(), "too long"));
    }
    let has_lower = addr.bytes().any(|c| c.is_ascii_lowercase());
    let has_upper = addr.bytes().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper {
        return Err(Error::encoding(ctx(), "mixed case"));
    }
    let addr = addr.to_ascii_lowercase();
    let pos = addr.rfind('1').ok_or_else(|| Error::encoding(ctx(), "no separator"))?;
    if pos < 1 || pos + 7 > addr.len() {
        return Err(Error::encoding(ctx(), "invalid separator position"));
    }
    let hrp = &addr[..pos];
    let mut values = Vec::with_capacity(addr.len() - pos - 1);
    for c in addr[pos + 1..].bytes() {
        let idx = CHARSET
            .iter()
            .position(|&x| x == c)
            .ok_or_else(|| Error::encoding(ctx(), format!("invalid character {:?}", c as char)))?;
        values.push(idx as u8);
    }
    if !verify_checksum(hrp, &values) {
        return Err(Error::encoding(ctx(), "invalid bech32m checksum"));
    }
    let data = convert_bits(&values[..values.len() - 6], 5, 8, false)?;
    let hash: [u8; 32] = data
        .try_into()
        .map_err(|v: Vec<u8>| Error::encoding(ctx(), format!("expected 32-byte hash, got {} bytes", v.len())))?;
    Ok((hrp.to_string(), Bytes32::new(hash)))
}

fn polymod(values: &[u8]) -> u32 {
    const GEN: [u32; 5] = [0x3b6a_57b2, 0x2650_8e6d, 0x1ea1_19fa, 0x3d42_33dd, 0x2a14_62b3];
    let mut chk: u32 = 1;
    for v in values {
        let top = chk >> 25;
        chk = ((chk & 0x1ff_ffff) << 5) ^ (*v as u32);
        for (i, g) in GEN.iter().enumerate() {
            if (top >> i) & 1 == 1 {
                chk ^= g;
            }
        }
    }
    chk
}

fn hrp_expand(hrp: &str) -> Vec<u8> {
    let mut out: Vec<u8> = hrp.bytes().map(|c| c >> 5).collect();
    out.push(0);
    out.extend(hrp.bytes().map(|c| c & 31));
    out
}

fn create_checksum(hrp: &str, data: &[u8]) -> Vec<u8> {
    let mut values = hrp_expand(hrp);
    values.extend_from_slice(data);
    values.extend_from_slice(&[0u8; 6]);
    let pm = polymod(&values) ^ BECH32M_CONST;
    (0..6).map(|i| ((pm >> (5 * (5 - i))) & 31) as u8).collect()
}

fn verify_checksum(hrp: &str, data: &[u8]) -> bool {
    let mut values = hrp_expand(hrp);
    values.extend_from_slice(data);
    polymod(&values) == BECH32M_CONST
}

fn convert_bits(data: &[u8], from: u32, to: u32, pad: bool) -> Result<Vec<u8>> {
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    let maxv: u32 = (1 << to) - 1;
    let mut out = Vec::with_capacity(data.len() * from as usize / to as usize + 1);
    for &value in data {
        let v = value as u32;
        if v >> from != 0 {
            return Err(Error::encoding("address data", "value out of range"));
        }
        acc = (acc << from) | v;
        bits += from;
        while bits >= to {
            bits -= to;
            out.push(((acc >> bits) & maxv) as u8);
        }
    }
    if pad {
        if bits > 0 {
            out.push(((acc << (to - bits)) & maxv) as u8);
        }
    } else if bits >= from || ((acc << (to - bits)) & maxv) != 0 {
        return Err(Error::encoding("address data", "invalid padding"));
    }
    Ok(out)
}
