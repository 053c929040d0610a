//! Canonical query strings and keyed-hash signatures.
//!
//! Both gateway families sign the same canonicalization: parameters sorted
//! lexicographically by key and joined as `key=value` pairs with `&`. The
//! signature field itself is excluded by the caller before canonicalizing.
//! Field values must reach this module byte-for-byte as they appeared on
//! the wire; any transformation breaks verification.

use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha512};

type HmacSha256 = Hmac<Sha256>;
type HmacSha512 = Hmac<Sha512>;

/// Keyed-hash algorithm, selected per gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    /// 256-bit keyed hash, lowercase hex, compared case-sensitively
    /// (AlphaPay).
    HmacSha256,

    /// 512-bit keyed hash, hex compared case-insensitively (BetaPay).
    /// The asymmetry with AlphaPay mirrors each gateway's documented
    /// verification behavior.
    HmacSha512,
}

/// Builds the canonical string: keys sorted lexicographically, joined as
/// `key=value` pairs with `&`.
pub fn canonical_query<'a, I>(params: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut pairs: Vec<(&str, &str)> = params.into_iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));
    pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Signs the canonical form of `params` with the gateway secret, rendered
/// as lowercase hex.
pub fn sign<'a, I>(params: I, secret: &str, algorithm: SignatureAlgorithm) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let canonical = canonical_query(params);
    match algorithm {
        SignatureAlgorithm::HmacSha256 => {
            let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
                .expect("HMAC accepts keys of any length");
            mac.update(canonical.as_bytes());
            hex::encode(mac.finalize().into_bytes())
        }
        SignatureAlgorithm::HmacSha512 => {
            let mut mac = HmacSha512::new_from_slice(secret.as_bytes())
                .expect("HMAC accepts keys of any length");
            mac.update(canonical.as_bytes());
            hex::encode(mac.finalize().into_bytes())
        }
    }
}

/// Recomputes the signature over `params` and compares with `provided`,
/// honoring the algorithm's case sensitivity.
pub fn verify<'a, I>(
    params: I,
    provided: &str,
    secret: &str,
    algorithm: SignatureAlgorithm,
) -> bool
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let expected = sign(params, secret, algorithm);
    match algorithm {
        SignatureAlgorithm::HmacSha256 => expected == provided,
        SignatureAlgorithm::HmacSha512 => expected.eq_ignore_ascii_case(provided),
    }
}
