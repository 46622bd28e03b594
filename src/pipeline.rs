//! Page generation: fetch → build view model → render → cache.
//!
//! One listing snapshot is taken per build and every post page is derived
//! from it. A post that is listed but cannot be fetched yet gets a fallback
//! page which is never cached, so the next run tries again.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::cache::{Cache, CachedPage};
use crate::navigation::resolve_adjacent;
use crate::output;
use crate::post::{ListedPost, PostRepository, PostSummary};
use crate::view_model::{build_view_model, paginate};

/// How a post page was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Served from the page cache.
    Cached,
    /// Fetched, built and rendered during this run.
    Rendered,
    /// No record yet; a loading placeholder was rendered instead.
    Fallback,
}

#[derive(Debug)]
pub struct GeneratedPage {
    pub uid: String,
    pub stage: Stage,
    pub html: String,
}

/// Totals for a whole-site build.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub listing_pages: usize,
    pub rendered: usize,
    pub cached: usize,
    pub fallback: usize,
}

pub struct Generator<'a, R: PostRepository> {
    repository: &'a R,
    cache: Option<&'a Cache>,
    /// Cached pages older than this are rendered again.
    revalidate: Duration,
}

impl<'a, R: PostRepository> Generator<'a, R> {
    pub fn new(repository: &'a R, cache: Option<&'a Cache>, revalidate: Duration) -> Self {
        Self {
            repository,
            cache,
            revalidate,
        }
    }

    /// Fetch the listing snapshot for this run.
    pub fn snapshot(&self) -> Result<Vec<ListedPost>> {
        self.repository.list_posts().context("Failed to list posts")
    }

    /// Produce the page for `uid` against `listing`.
    pub fn generate_post(&self, uid: &str, listing: &[ListedPost]) -> Result<GeneratedPage> {
        let summaries: Vec<PostSummary> = listing.iter().map(ListedPost::summary).collect();

        if let Some(html) = self.cached(uid, listing, &summaries) {
            debug!(uid, "Page cached, skipping");
            return Ok(GeneratedPage {
                uid: uid.to_string(),
                stage: Stage::Cached,
                html,
            });
        }

        let Some(record) = self.repository.post_by_uid(uid)? else {
            warn!(uid, "Post not available yet, writing fallback page");
            return Ok(GeneratedPage {
                uid: uid.to_string(),
                stage: Stage::Fallback,
                html: output::render_fallback(),
            });
        };

        let view_model = build_view_model(&record, &summaries)?;
        let html = output::render_post(&view_model);

        if let Some(cache) = self.cache {
            cache.save(&CachedPage {
                uid: uid.to_string(),
                last_publication_date: record.last_publication_date,
                previous_uid: view_model.previous_post.map(|p| p.uid),
                next_uid: view_model.next_post.map(|p| p.uid),
                html: html.clone(),
                rendered_at: Utc::now(),
            })?;
        }

        debug!(uid, "Rendered post");
        Ok(GeneratedPage {
            uid: uid.to_string(),
            stage: Stage::Rendered,
            html,
        })
    }

    /// A fresh cached page for a listed post, if there is one.
    fn cached(&self, uid: &str, listing: &[ListedPost], summaries: &[PostSummary]) -> Option<String> {
        let cache = self.cache?;
        let listed = listing.iter().find(|post| post.uid == uid)?;

        let page = match cache.load(uid) {
            Ok(page) => page?,
            Err(err) => {
                warn!(uid, "Ignoring unreadable cache entry: {:#}", err);
                return None;
            }
        };

        let adjacent = resolve_adjacent(summaries, uid);
        // An interval reaching past the calendar range never expires
        let threshold = Utc::now()
            .checked_sub_signed(self.revalidate)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        page.is_fresh(
            uid,
            threshold,
            listed.last_publication_date,
            adjacent.previous.as_ref(),
            adjacent.next.as_ref(),
        )
        .then_some(page.html)
    }

    /// Build every listing page and post page into `out_dir`.
    pub fn generate_site(&self, out_dir: &Path, page_size: usize) -> Result<BuildReport> {
        let listing = self.snapshot()?;
        info!(posts = listing.len(), "Fetched listing");

        // Reject unusable uids before anything is written
        let post_files = listing
            .iter()
            .map(|post| output::post_file(&post.uid))
            .collect::<Result<Vec<_>>>()?;

        let mut report = BuildReport::default();

        for page in paginate(&listing, page_size)? {
            write_page(out_dir, &output::listing_file(page.number), &output::render_listing(&page))?;
            report.listing_pages += 1;
        }

        let total = listing.len();
        for (i, (post, file)) in listing.iter().zip(&post_files).enumerate() {
            let page = self
                .generate_post(&post.uid, &listing)
                .with_context(|| format!("Failed to generate post {:?}", post.uid))?;
            info!("[{}/{}] {} ({:?})", i + 1, total, page.uid, page.stage);

            write_page(out_dir, file, &page.html)?;
            match page.stage {
                Stage::Cached => report.cached += 1,
                Stage::Rendered => report.rendered += 1,
                Stage::Fallback => report.fallback += 1,
            }
        }

        Ok(report)
    }
}

fn write_page(out_dir: &Path, relative: &Path, html: &str) -> Result<()> {
    let path = out_dir.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {:?}", parent))?;
    }
    std::fs::write(&path, html).with_context(|| format!("Failed to write {:?}", path))
}
