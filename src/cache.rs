use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::post::PostSummary;

/// A rendered post page, with what it was rendered from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedPage {
    pub uid: String,
    pub last_publication_date: Option<DateTime<Utc>>,
    pub previous_uid: Option<String>,
    pub next_uid: Option<String>,
    pub html: String,
    pub rendered_at: DateTime<Utc>,
}

impl CachedPage {
    /// Whether this page can be served as-is.
    ///
    /// It must belong to `uid` (sanitized file names can collide), have been
    /// rendered after `threshold`, from the same revision of the post, with
    /// the same neighbours as in the current listing.
    pub fn is_fresh(
        &self,
        uid: &str,
        threshold: DateTime<Utc>,
        last_publication_date: Option<DateTime<Utc>>,
        previous: Option<&PostSummary>,
        next: Option<&PostSummary>,
    ) -> bool {
        self.uid == uid
            && self.rendered_at > threshold
            && self.last_publication_date == last_publication_date
            && self.previous_uid.as_deref() == previous.map(|p| p.uid.as_str())
            && self.next_uid.as_deref() == next.map(|p| p.uid.as_str())
    }
}

/// File-based cache of rendered post pages.
///
/// Cache layout: `~/.cache/spacetraveling/{repository_host}/{uid}.json`
pub struct Cache {
    dir: PathBuf,
}

impl Cache {
    /// Create a new cache for the given repository host.
    pub fn new(repository_host: &str) -> Result<Self> {
        let cache_base = directories::ProjectDirs::from("", "", "spacetraveling")
            .context("Could not determine cache directory")?;
        Self::at(cache_base.cache_dir().join(repository_host))
    }

    /// Use `dir` directly as the cache directory.
    pub fn at(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create cache directory: {:?}", dir))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load a cached page by uid, if it exists.
    pub fn load(&self, uid: &str) -> Result<Option<CachedPage>> {
        let path = self.page_path(uid);
        if !path.exists() {
            return Ok(None);
        }
        let data =
            std::fs::read_to_string(&path).with_context(|| format!("Failed to read {:?}", path))?;
        let page: CachedPage =
            serde_json::from_str(&data).with_context(|| format!("Failed to parse {:?}", path))?;
        Ok(Some(page))
    }

    /// Save a page to the cache (keyed by uid).
    pub fn save(&self, page: &CachedPage) -> Result<()> {
        let path = self.page_path(&page.uid);
        let data = serde_json::to_string_pretty(page).context("Failed to serialize page")?;
        std::fs::write(&path, data).with_context(|| format!("Failed to write {:?}", path))?;
        Ok(())
    }

    fn page_path(&self, uid: &str) -> PathBuf {
        // Prismic uids are URL slugs; keep anything else out of the path
        let name: String = uid
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::post::testing::summary;
    use chrono::Duration;

    fn page(uid: &str) -> CachedPage {
        CachedPage {
            uid: uid.to_string(),
            last_publication_date: None,
            previous_uid: Some("a".to_string()),
            next_uid: None,
            html: "<p>oi</p>".to_string(),
            rendered_at: Utc::now(),
        }
    }

    #[test]
    fn test_save_and_load() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = Cache::at(tmp.path().join("nested")).unwrap();

        assert_eq!(cache.load("b").unwrap(), None);
        let saved = page("b");
        cache.save(&saved).unwrap();
        assert_eq!(cache.load("b").unwrap(), Some(saved));
    }

    #[test]
    fn test_corrupt_entry_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = Cache::at(tmp.path()).unwrap();
        std::fs::write(tmp.path().join("b.json"), "{not json").unwrap();
        assert!(cache.load("b").is_err());
    }

    #[test]
    fn test_uid_is_sanitized() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = Cache::at(tmp.path()).unwrap();
        cache.save(&page("../escape")).unwrap();
        assert!(tmp.path().join("___escape.json").exists());
        assert_eq!(cache.load("../escape").unwrap().unwrap().uid, "../escape");
    }

    #[test]
    fn test_freshness() {
        let cached = page("b");
        let threshold = Utc::now() - Duration::seconds(60);
        let a = summary("a");
        let c = summary("c");

        assert!(cached.is_fresh("b", threshold, None, Some(&a), None));
        // Rendered before the revalidation threshold
        assert!(!cached.is_fresh("b", Utc::now() + Duration::seconds(60), None, Some(&a), None));
        // Post edited since
        assert!(!cached.is_fresh("b", threshold, Some(Utc::now()), Some(&a), None));
        // Neighbours changed
        assert!(!cached.is_fresh("b", threshold, None, Some(&a), Some(&c)));
        assert!(!cached.is_fresh("b", threshold, None, None, None));

        // "a.b" and "a_b" share a file; the entry only counts for its own uid
        let dotted = page("a.b");
        assert!(dotted.is_fresh("a.b", threshold, None, Some(&a), None));
        assert!(!dotted.is_fresh("a_b", threshold, None, Some(&a), None));
    }
}
