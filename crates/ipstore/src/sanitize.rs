//! Identity sanitization: raw client identity to filesystem-safe token.
//!
//! Tokens take one of three shapes:
//!
//! - dotted-quad IPv4 addresses are used verbatim (`192.168.1.100`);
//! - IPv6 addresses are normalized to their canonical compressed form, with
//!   every `:` replaced by `-`, behind an `ipv6-` prefix
//!   (`ipv6-2001-db8-85a3--8a2e-370-7334`);
//! - anything else is hashed: `ip-` + hex of the first 16 bytes of
//!   BLAKE3(raw), always 35 characters.
//!
//! The hash shape is bounded and contains only `[0-9a-f]`, so hostnames,
//! malformed addresses, path fragments, and the empty string all map to a
//! safe file stem.

use std::net::{Ipv4Addr, Ipv6Addr};

use serde::{Deserialize, Serialize};

/// Prefix for tokens derived from IPv6 addresses.
pub const IPV6_PREFIX: &str = "ipv6-";

/// Prefix for tokens derived by hashing.
pub const HASH_PREFIX: &str = "ip-";

/// Number of digest bytes kept for hashed tokens (hex doubles it).
const HASH_BYTES: usize = 16;

/// A filesystem-safe token derived from a raw identity.
///
/// Never persisted on its own; recomputed from the raw identity on every
/// access.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityToken(pub String);

impl IdentityToken {
    /// Derive the token for `raw`. Equivalent to [`sanitize`].
    pub fn from_raw(raw: &str) -> Self {
        sanitize(raw)
    }

    /// Borrow the token text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for IdentityToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for IdentityToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Map an arbitrary identity string to a filesystem-safe token.
///
/// Pure and deterministic; never fails.
pub fn sanitize(raw: &str) -> IdentityToken {
    if raw.parse::<Ipv4Addr>().is_ok() {
        return IdentityToken(raw.to_string());
    }

    if let Ok(addr) = raw.parse::<Ipv6Addr>() {
        // Display yields the RFC 5952 compressed form.
        let canonical = addr.to_string().replace(':', "-");
        return IdentityToken(format!("{IPV6_PREFIX}{canonical}"));
    }

    IdentityToken(format!("{HASH_PREFIX}{}", hash_hex(raw)))
}

/// Hex digest of the truncated BLAKE3 hash of `raw`.
fn hash_hex(raw: &str) -> String {
    let hash = blake3::hash(raw.as_bytes());
    hex::encode(&hash.as_bytes()[..HASH_BYTES])
}
