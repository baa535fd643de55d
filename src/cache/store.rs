//! In-memory resolution cache backed by a JSON file

use crate::cache::entry::{CacheEntry, CacheKey, CacheRecord};
use crate::catalog::{Descriptor, Digest};
use crate::error::{CaskhashError, CaskhashResult};
use crate::persist;
use crate::resolver::{Origin, ResolutionResult};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, info};

/// Accepted cache file layouts
///
/// Records carry their own token and version, so map keys are never parsed.
#[derive(Deserialize)]
#[serde(untagged)]
enum CacheFile {
    /// `[{token, version, sha256, error?, resolved_at?}]`, written by `persist`
    Records(Vec<CacheRecord>),
    /// `{"token@version": {token, version, sha256, ...}}` from older releases
    Keyed(BTreeMap<String, CacheRecord>),
    /// A previous output artifact: an array of casks
    Catalog(Vec<Descriptor>),
}

/// Mapping `(token, version) -> CacheEntry`
///
/// Shared read-only with the workers during a run and merged with fresh
/// results once the pool has drained.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolutionCache {
    entries: HashMap<CacheKey, CacheEntry>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the cache file
    ///
    /// A missing file is an empty cache unless `require_existing` is set.
    pub async fn load(path: &Path, require_existing: bool) -> CaskhashResult<Self> {
        match persist::read_optional(path).await? {
            Some(content) => {
                let cache = Self::from_json(path, &content)?;
                debug!("Loaded {} cache entries from {}", cache.len(), path.display());
                Ok(cache)
            }
            None if require_existing => Err(CaskhashError::CacheMissing(path.to_path_buf())),
            None => {
                info!("No cache at {}, starting empty", path.display());
                Ok(Self::new())
            }
        }
    }

    /// Parse either cache layout; `path` is only used in error messages
    pub fn from_json(path: &Path, content: &str) -> CaskhashResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::new());
        }

        let file: CacheFile =
            serde_json::from_str(content).map_err(|e| CaskhashError::CacheMalformed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let entries: Vec<(CacheKey, CacheEntry)> = match file {
            CacheFile::Records(records) => {
                records.into_iter().map(CacheRecord::into_entry).collect()
            }
            CacheFile::Keyed(records) => {
                records.into_values().map(CacheRecord::into_entry).collect()
            }
            CacheFile::Catalog(descriptors) => descriptors
                .into_iter()
                .map(|descriptor| {
                    let key = CacheKey::of(&descriptor);
                    let entry = CacheEntry {
                        digest: descriptor.digest,
                        resolved_at: None,
                    };
                    (key, entry)
                })
                .collect(),
        };

        // `no_check` rows come from previous artifacts; they are misses, not entries
        let mut cache = Self::new();
        for (key, entry) in entries {
            if !entry.digest.is_unresolved() {
                cache.insert(key, entry);
            }
        }
        Ok(cache)
    }

    /// Serialize as an array of records sorted by `(token, version)`
    pub fn to_json_pretty(&self) -> CaskhashResult<String> {
        let records: Vec<CacheRecord> = self
            .sorted()
            .into_iter()
            .map(|(key, entry)| CacheRecord::from_entry(key, entry))
            .collect();
        let mut json = serde_json::to_string_pretty(&records)?;
        json.push('\n');
        Ok(json)
    }

    /// Atomically replace the cache file
    pub async fn persist(&self, path: &Path) -> CaskhashResult<()> {
        let json = self.to_json_pretty()?;
        persist::write_atomic(path, json.as_bytes()).await?;
        info!("Saved {} cache entries to {}", self.len(), path.display());
        Ok(())
    }

    pub fn get(&self, key: &CacheKey) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    /// Lookup used by the resolver; unresolved entries count as a miss
    pub fn lookup(&self, descriptor: &Descriptor) -> Option<&CacheEntry> {
        self.entries
            .get(&CacheKey::of(descriptor))
            .filter(|entry| !entry.digest.is_unresolved())
    }

    /// Insert or overwrite, returning the previous entry
    pub fn insert(&mut self, key: CacheKey, entry: CacheEntry) -> Option<CacheEntry> {
        self.entries.insert(key, entry)
    }

    /// Forget one version of a token, or every version when `version` is `None`
    pub fn remove(&mut self, identifier: &str, version: Option<&str>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| {
            key.identifier != identifier || version.is_some_and(|v| key.version != v)
        });
        before - self.entries.len()
    }

    /// Drop every sticky failure so the next run retries them
    pub fn prune_failures(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_failure());
        before - self.entries.len()
    }

    /// Record fresh oracle results; cached and upstream values are left alone
    ///
    /// Unresolved results (failures under the retry policy) are not cached.
    pub fn merge<'a>(&mut self, results: impl IntoIterator<Item = &'a ResolutionResult>) -> usize {
        let mut written = 0;
        for result in results {
            if result.origin != Origin::Oracle {
                continue;
            }
            let entry = match &result.digest {
                Digest::Resolved(hash) => CacheEntry::resolved(hash.as_str()),
                Digest::Failed(message) => CacheEntry::failed(message.as_str()),
                Digest::Unresolved => continue,
            };
            self.insert(result.key(), entry);
            written += 1;
        }
        written
    }

    /// Entries sorted by key
    pub fn sorted(&self) -> Vec<(&CacheKey, &CacheEntry)> {
        let mut entries: Vec<_> = self.entries.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }

    pub fn failure_count(&self) -> usize {
        self.entries.values().filter(|e| e.is_failure()).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
