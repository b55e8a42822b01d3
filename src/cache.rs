use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Removes generated catalogue cache files so they are rebuilt from the store.
///
/// Catalogues are cached as `catalogue.<locale>.<hash>.php`-style files next to
/// a `.meta` companion; both share the `catalogue.<locale>.` prefix.
#[derive(Debug, Clone)]
pub struct CacheInvalidator {
    cache_dir: PathBuf,
}

impl CacheInvalidator {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Delete cached catalogues of the given locales. Returns how many files were removed.
    ///
    /// A missing cache directory or an already clean locale is not an error.
    pub fn remove_locales_cache_files(&self, locales: &[String]) -> std::io::Result<usize> {
        let entries = match std::fs::read_dir(&self.cache_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Cache directory {} does not exist", self.cache_dir.display());
                return Ok(0);
            }
            Err(e) => return Err(e),
        };

        let prefixes: Vec<String> = locales.iter().map(|l| format!("catalogue.{}.", l)).collect();
        let mut removed = 0;

        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }

            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !prefixes.iter().any(|p| name.starts_with(p.as_str())) {
                continue;
            }

            match std::fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                // Removed concurrently by another request
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }

        info!("Removed {} cached catalogue files for {:?}", removed, locales);
        Ok(removed)
    }
}
