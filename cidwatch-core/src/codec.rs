//! CID codec and digest display formatting
//!
//! Validates CID strings, re-encodes them between their v0 (base58btc) and
//! v1 (base32) forms, and renders the descriptive digest strings returned by
//! the `digest` and `checklink` report modes.

use cid::multibase::Base;
use cid::{Cid, Version};
use thiserror::Error;

/// dag-pb multicodec, the only codec a v0 CID can carry
pub const DAG_PB_CODEC: u64 = 0x70;

/// sha2-256 multihash code, the only hash a v0 CID can carry
pub const SHA256_CODE: u64 = 0x12;

/// Label prefixed to a CID by [`to_v0_description`]
pub const V0_LABEL: &str = "Base58 encoding (v0): ";

/// Label prefixed to a CID by [`to_v1_description`]
pub const V1_LABEL: &str = "Base32 encoding (v1): ";

/// Separator after which the display quirk drops one character
pub const DISPLAY_SEPARATOR: &str = ": ";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("CID {0} cannot be represented as v0 (requires dag-pb and sha2-256)")]
    NotV0Compatible(String),
}

/// Decoded view of a CID, used for validation and diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CidInfo {
    pub version: u64,
    pub codec: u64,
    pub hash_code: u64,
    pub digest_size: u8,
    pub digest_hex: String,
}

/// Parse a CID string, rejecting empty or whitespace-bearing input
pub fn parse(cid: &str) -> Result<Cid, CodecError> {
    if cid.is_empty() {
        return Err(CodecError::InvalidInput("CID is empty".to_string()));
    }
    if cid.chars().any(char::is_whitespace) {
        return Err(CodecError::InvalidInput(format!(
            "CID contains whitespace: {:?}",
            cid
        )));
    }

    Cid::try_from(cid).map_err(|e| CodecError::InvalidInput(format!("{}: {}", cid, e)))
}

/// Returns true if the string decodes as a CID
pub fn is_cid(candidate: &str) -> bool {
    parse(candidate).is_ok()
}

/// Describe a CID as a v0 / base58 identifier.
///
/// The CID is embedded verbatim after [`V0_LABEL`].
pub fn to_v0_description(cid: &str) -> Result<String, CodecError> {
    parse(cid)?;
    Ok(format!("{}{}", V0_LABEL, cid))
}

/// Relabel a v0 description (output of [`to_v0_description`]) as a v1 / base32
/// identifier, keeping the CID payload byte-for-byte.
pub fn to_v1_description(v0_description: &str) -> Result<String, CodecError> {
    let payload = v0_description.strip_prefix(V0_LABEL).ok_or_else(|| {
        CodecError::InvalidInput(format!(
            "not a v0 description: {:?}",
            v0_description
        ))
    })?;
    parse(payload)?;
    Ok(format!("{}{}", V1_LABEL, payload))
}

/// Drop the single character that immediately follows the first occurrence
/// of `separator`.
///
/// Strings without the separator, or where the separator ends the string,
/// are returned unchanged. Character-aware: a multi-byte character after the
/// separator is removed whole.
pub fn strip_after_separator(s: &str, separator: &str) -> String {
    let Some(pos) = s.find(separator) else {
        return s.to_string();
    };
    let cut = pos + separator.len();
    let mut rest = s[cut..].chars();
    if rest.next().is_none() {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len());
    out.push_str(&s[..cut]);
    out.push_str(rest.as_str());
    out
}

/// Render the display digest for a CID.
///
/// Composes [`to_v0_description`] and [`to_v1_description`], upper-cases the
/// result, and when `quirk` is set drops the first character after `": "`.
/// Existing clients expect the quirk, so callers enable it by default.
pub fn display_digest(cid: &str, quirk: bool) -> Result<String, CodecError> {
    let v0 = to_v0_description(cid)?;
    let v1 = to_v1_description(&v0)?;
    let upper = v1.to_uppercase();

    if quirk {
        Ok(strip_after_separator(&upper, DISPLAY_SEPARATOR))
    } else {
        Ok(upper)
    }
}

/// Re-encode any CID as a base32 v1 string
pub fn to_v1(cid: &str) -> Result<String, CodecError> {
    let parsed = parse(cid)?;
    let v1 = match parsed.version() {
        Version::V1 => parsed,
        Version::V0 => Cid::new_v1(parsed.codec(), *parsed.hash()),
    };

    v1.to_string_of_base(Base::Base32Lower)
        .map_err(|e| CodecError::InvalidInput(format!("{}: {}", cid, e)))
}

/// Re-encode a CID as a base58btc v0 string
pub fn to_v0(cid: &str) -> Result<String, CodecError> {
    let parsed = parse(cid)?;
    if parsed.codec() != DAG_PB_CODEC || parsed.hash().code() != SHA256_CODE {
        return Err(CodecError::NotV0Compatible(cid.to_string()));
    }

    Cid::new_v0(*parsed.hash())
        .map(|v0| v0.to_string())
        .map_err(|_| CodecError::NotV0Compatible(cid.to_string()))
}

/// Decode a CID into its version, codec and multihash parts
pub fn inspect(cid: &str) -> Result<CidInfo, CodecError> {
    let parsed = parse(cid)?;
    let mh = parsed.hash();

    Ok(CidInfo {
        version: parsed.version().into(),
        codec: parsed.codec(),
        hash_code: mh.code(),
        digest_size: mh.size(),
        digest_hex: hex::encode(mh.digest()),
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use cid::Cid;
    use multihash::Multihash;
    use sha2::{Digest, Sha256};

    use super::{DAG_PB_CODEC, SHA256_CODE};

    const RAW_CODEC: u64 = 0x55;

    fn sha256_multihash(data: &[u8]) -> Multihash<64> {
        let hash = Sha256::digest(data);
        Multihash::wrap(SHA256_CODE, &hash).expect("sha2-256 digest fits")
    }

    /// v0 (Qm...) CID for the given bytes
    pub fn v0_cid(data: &[u8]) -> String {
        Cid::new_v0(sha256_multihash(data))
            .expect("sha2-256 multihash is valid for v0")
            .to_string()
    }

    /// v1 dag-pb CID for the given bytes
    pub fn v1_cid(data: &[u8]) -> String {
        Cid::new_v1(DAG_PB_CODEC, sha256_multihash(data)).to_string()
    }

    /// v1 raw CID for the given bytes
    pub fn v1_raw_cid(data: &[u8]) -> String {
        Cid::new_v1(RAW_CODEC, sha256_multihash(data)).to_string()
    }
}
