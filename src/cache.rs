//! Compile cache for file translation. Entries are keyed by the SHA-256
//! of the source text and the serialized options, so a changed option
//! never serves a stale output.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{trace, warn};

use crate::compiler::{CompileOptions, CompileOutput};
use crate::error::CompileResult;

#[derive(Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub output: CompileOutput,
}

#[derive(Debug, Clone)]
pub struct CompileCache {
    cache_dir: PathBuf,
}

impl CompileCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> CompileResult<Self> {
        let cache_dir = cache_dir.into();
        fs::create_dir_all(&cache_dir)?;
        Ok(Self { cache_dir })
    }

    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn compute_key(source: &str, options: &CompileOptions) -> CompileResult<String> {
        let mut hasher = Sha256::new();
        hasher.update(source.as_bytes());
        hasher.update([0u8]);
        hasher.update(serde_json::to_string(options)?.as_bytes());
        Ok(format!("{:x}", hasher.finalize()))
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", key))
    }

    pub fn get(&self, source: &str, options: &CompileOptions) -> Option<CompileOutput> {
        let key = Self::compute_key(source, options).ok()?;
        let path = self.entry_path(&key);
        let data = fs::read_to_string(&path).ok()?;

        let entry: CacheEntry = match serde_json::from_str(&data) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "discarding corrupt cache entry");
                fs::remove_file(&path).ok();
                return None;
            }
        };

        if entry.key == key {
            trace!(key = %key, "cache hit");
            Some(entry.output)
        } else {
            None
        }
    }

    pub fn set(&self, source: &str, options: &CompileOptions, output: &CompileOutput) -> CompileResult<()> {
        let key = Self::compute_key(source, options)?;
        let entry = CacheEntry {
            key: key.clone(),
            output: output.clone(),
        };

        fs::write(self.entry_path(&key), serde_json::to_string(&entry)?)?;
        Ok(())
    }
}
