use crate::error::{Error, Result};
use std::io::ErrorKind;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Freshness record for the embedding cache.
///
/// Holds only the knowledge file's modification time, not a content hash.
/// Touching the file without editing it forces a needless recompute, and an
/// edit that lands within the filesystem's timestamp granularity (or that
/// moves the clock backwards) goes unnoticed. Acceptable for a single local
/// writer; not a general change detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Manifest {
    /// Seconds since the Unix epoch
    pub source_mtime: f64,
}

fn to_epoch_secs(time: SystemTime) -> f64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs_f64(),
        Err(e) => -e.duration().as_secs_f64(),
    }
}

impl Manifest {
    /// Current modification time of `source`
    pub fn capture(source: &Path) -> std::io::Result<Self> {
        let modified = std::fs::metadata(source)?.modified()?;
        Ok(Self {
            source_mtime: to_epoch_secs(modified),
        })
    }

    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::CacheMissing(path.to_path_buf()),
            _ => Error::CacheCorrupt(format!("cannot read manifest: {}", e)),
        })?;

        let source_mtime: f64 = text
            .trim()
            .parse()
            .map_err(|e| Error::CacheCorrupt(format!("manifest is not a timestamp: {}", e)))?;
        if !source_mtime.is_finite() {
            return Err(Error::CacheCorrupt("manifest timestamp is not finite".to_string()));
        }

        Ok(Self { source_mtime })
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        // f64 Display is the shortest string that parses back to the same value
        std::fs::write(path, self.source_mtime.to_string())?;
        Ok(())
    }

    /// True when `current` is strictly newer than this record
    pub fn is_outdated_by(&self, current: &Manifest) -> bool {
        current.source_mtime > self.source_mtime
    }

    /// Pick the record to persist from captures taken around a read.
    ///
    /// When the file moved during the read the earlier capture wins, so the
    /// next freshness check sees the source as newer. Returns the record and
    /// whether the captures disagreed.
    pub fn settle(before: Manifest, after: Manifest) -> (Manifest, bool) {
        if after == before {
            (after, false)
        } else {
            (before, true)
        }
    }
}

/// Identity of a knowledge file as recorded next to the manifest.
///
/// The canonical path when it resolves, otherwise the path as given.
pub fn source_identity(source: &Path) -> String {
    std::fs::canonicalize(source)
        .unwrap_or_else(|_| source.to_path_buf())
        .display()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_write_read_exact() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("manifest.txt");
        let manifest = Manifest {
            source_mtime: 1_760_000_000.123_456_7,
        };

        manifest.write(&path).unwrap();
        assert_eq!(Manifest::read(&path).unwrap(), manifest);
    }

    #[test]
    fn test_capture_tracks_mtime() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("kb.txt");
        std::fs::write(&source, "# a").unwrap();

        let file = std::fs::File::options().write(true).open(&source).unwrap();
        file.set_modified(UNIX_EPOCH + Duration::from_secs(1_000)).unwrap();
        let older = Manifest::capture(&source).unwrap();
        assert_eq!(older.source_mtime, 1_000.0);

        file.set_modified(UNIX_EPOCH + Duration::from_secs(2_000)).unwrap();
        let newer = Manifest::capture(&source).unwrap();

        assert!(older.is_outdated_by(&newer));
        assert!(!newer.is_outdated_by(&older));
        assert!(!newer.is_outdated_by(&newer));
    }

    #[test]
    fn test_settle_keeps_matching_capture() {
        let m = Manifest { source_mtime: 10.0 };
        assert_eq!(Manifest::settle(m, m), (m, false));
    }

    #[test]
    fn test_settle_prefers_earlier_capture_on_change() {
        let before = Manifest { source_mtime: 10.0 };
        let after = Manifest { source_mtime: 12.5 };

        let (kept, changed) = Manifest::settle(before, after);
        assert!(changed);
        assert_eq!(kept, before);
        assert!(kept.is_outdated_by(&after));
    }

    #[test]
    fn test_source_identity_resolves_relative_forms() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("kb.txt");
        std::fs::write(&source, "# a").unwrap();

        let dotted = tmp.path().join(".").join("kb.txt");
        assert_eq!(source_identity(&source), source_identity(&dotted));
        assert_ne!(
            source_identity(&source),
            source_identity(&tmp.path().join("other.txt"))
        );
    }

    #[test]
    fn test_missing_and_garbage() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("manifest.txt");
        assert!(matches!(Manifest::read(&path), Err(Error::CacheMissing(_))));

        std::fs::write(&path, "yesterday").unwrap();
        assert!(matches!(Manifest::read(&path), Err(Error::CacheCorrupt(_))));

        std::fs::write(&path, "NaN").unwrap();
        assert!(matches!(Manifest::read(&path), Err(Error::CacheCorrupt(_))));
    }
}
