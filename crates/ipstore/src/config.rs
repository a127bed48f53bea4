//! Store configuration and identity acquisition.
//!
//! A [`StoreConfig`] is built in code, loaded from a JSON file, or both,
//! and then optionally adjusted from the environment:
//!
//! | Variable | Field |
//! |---|---|
//! | `IPSTORE_LOCATION` | `root` |
//! | `IPSTORE_AUTO_CLEANUP` | `rotation` |
//!
//! The raw client identity comes from request metadata. Which part of the
//! request supplies it is chosen with [`IdentitySource`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// Environment variable overriding the storage root.
pub const ENV_LOCATION: &str = "IPSTORE_LOCATION";

/// Environment variable overriding the rotation flag.
pub const ENV_AUTO_CLEANUP: &str = "IPSTORE_AUTO_CLEANUP";

fn default_root() -> PathBuf {
    PathBuf::from("db").join("ip")
}

fn default_rotation() -> bool {
    true
}

/// Configuration for an [`crate::IpStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding all bucket directories.
    #[serde(default = "default_root")]
    pub root: PathBuf,
    /// Daily buckets with automatic pruning when `true`; a single
    /// `undated` bucket when `false`.
    #[serde(default = "default_rotation")]
    pub rotation: bool,
    /// Where the raw identity is read from in request metadata.
    #[serde(default)]
    pub identity_source: IdentitySource,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            rotation: default_rotation(),
            identity_source: IdentitySource::default(),
        }
    }
}

impl StoreConfig {
    /// Default configuration rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn with_rotation(mut self, rotation: bool) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_identity_source(mut self, source: IdentitySource) -> Self {
        self.identity_source = source;
        self
    }

    /// Load a configuration from a JSON file. Missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the file cannot be read, or
    /// `StoreError::Configuration` if it is not a valid configuration.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        serde_json::from_slice(&bytes).map_err(|e| {
            StoreError::Configuration(format!("invalid config file {}: {e}", path.display()))
        })
    }

    /// Apply `IPSTORE_LOCATION` and `IPSTORE_AUTO_CLEANUP` from the process
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Configuration` if `IPSTORE_AUTO_CLEANUP` is set
    /// to something other than a boolean word.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(location) = lookup(ENV_LOCATION).filter(|s| !s.trim().is_empty()) {
            self.root = PathBuf::from(location);
        }
        if let Some(flag) = lookup(ENV_AUTO_CLEANUP) {
            self.rotation = parse_flag(&flag).ok_or_else(|| {
                StoreError::Configuration(format!(
                    "{ENV_AUTO_CLEANUP} must be a boolean, got {flag:?}"
                ))
            })?;
        }
        Ok(self)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// ── Identity source ───────────────────────────────────────────────────────────

/// Which request property supplies the raw client identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "header", rename_all = "snake_case")]
pub enum IdentitySource {
    /// The address of the directly connected peer.
    #[default]
    RemoteAddr,
    /// A single-valued proxy header such as `CF-Connecting-IP` or
    /// `X-Real-IP`. Falls back to the peer address when absent.
    Header(String),
    /// The first entry of a comma-separated proxy chain header such as
    /// `X-Forwarded-For`. Falls back to the peer address when absent.
    ForwardedChain(String),
}

impl IdentitySource {
    /// Extract the raw identity from request metadata.
    ///
    /// Returns `None` if nothing non-blank is available.
    pub fn resolve(&self, meta: &RequestMeta) -> Option<String> {
        let raw = match self {
            IdentitySource::RemoteAddr => meta.remote_addr.clone(),
            IdentitySource::Header(name) => meta
                .header(name)
                .map(str::to_string)
                .or_else(|| meta.remote_addr.clone()),
            IdentitySource::ForwardedChain(name) => meta
                .header(name)
                .map(|chain| chain.split(',').next().unwrap_or_default().to_string())
                .or_else(|| meta.remote_addr.clone()),
        }?;

        let raw = raw.trim();
        if raw.is_empty() {
            None
        } else {
            Some(raw.to_string())
        }
    }
}

/// The parts of an incoming request an identity may be read from.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    /// Address of the directly connected peer.
    pub remote_addr: Option<String>,
    /// Header values keyed by lower-cased name.
    headers: HashMap<String, String>,
}

impl RequestMeta {
    pub fn new(remote_addr: impl Into<String>) -> Self {
        Self {
            remote_addr: Some(remote_addr.into()),
            headers: HashMap::new(),
        }
    }

    /// Add a header. Names are case-insensitive; a repeated name replaces
    /// the earlier value.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Look up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}
