//! On-disk response cache keyed by request signature.
//!
//! Each entry is two files in the cache directory: `<signature>.body` with the
//! raw response bytes and `<signature>.json` with the metadata. The body is
//! written first, so a metadata file always has a complete body next to it.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

/// Deterministic cache key for a request: SHA-256 of method and full URL.
pub fn signature(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update(b" ");
    hasher.update(url.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntryMeta {
    pub signature: String,
    pub url: String,
    pub fetched_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl EntryMeta {
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CachedResponse {
    pub meta: EntryMeta,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ResponseCache {
    dir: PathBuf,
    ttl: Duration,
}

impl ResponseCache {
    /// Open (creating if needed) a cache directory with the given freshness window.
    pub fn open(dir: impl Into<PathBuf>, ttl: Duration) -> std::io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, ttl })
    }

    fn meta_path(&self, signature: &str) -> PathBuf {
        self.dir.join(format!("{signature}.json"))
    }

    fn body_path(&self, signature: &str) -> PathBuf {
        self.dir.join(format!("{signature}.body"))
    }

    /// Read an entry regardless of freshness. Unreadable entries count as absent.
    pub fn read(&self, signature: &str) -> Option<CachedResponse> {
        let meta_text = match fs::read_to_string(self.meta_path(signature)) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("cache metadata for {signature} unreadable: {e}");
                return None;
            }
        };
        let meta: EntryMeta = match serde_json::from_str(&meta_text) {
            Ok(m) => m,
            Err(e) => {
                warn!("cache metadata for {signature} is corrupt: {e}");
                return None;
            }
        };
        if meta.signature != signature {
            warn!("cache entry {signature} carries signature {}", meta.signature);
            return None;
        }
        match fs::read(self.body_path(signature)) {
            Ok(body) => Some(CachedResponse { meta, body }),
            Err(e) => {
                warn!("cache body for {signature} unreadable: {e}");
                None
            }
        }
    }

    /// Fresh entry for `signature` at `now`, if any.
    pub fn lookup(&self, signature: &str, now: DateTime<Utc>) -> Option<CachedResponse> {
        let entry = self.read(signature)?;
        if entry.meta.is_fresh(now) {
            debug!("cache hit {signature} (expires {})", entry.meta.expires_at);
            Some(entry)
        } else {
            debug!("cache entry {signature} expired at {}", entry.meta.expires_at);
            None
        }
    }

    /// Store `body`, replacing any previous entry under `signature`.
    pub fn store(
        &self,
        signature: &str,
        url: &str,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> std::io::Result<EntryMeta> {
        let meta = EntryMeta {
            signature: signature.to_string(),
            url: url.to_string(),
            fetched_at: now,
            expires_at: now + self.ttl,
        };
        fs::write(self.body_path(signature), body)?;
        let text = serde_json::to_string_pretty(&meta).map_err(std::io::Error::other)?;
        fs::write(self.meta_path(signature), text)?;
        debug!("cached {url} as {signature}");
        Ok(meta)
    }
}
