//! Display-ready views of posts and of the paginated home listing.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::dates;
use crate::navigation::resolve_adjacent;
use crate::post::{ListedPost, PostRecord, PostSummary};
use crate::reading_time::reading_time_minutes;
use crate::richtext::TrustedMarkup;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedBlock {
    pub heading: String,
    pub body: TrustedMarkup,
}

/// Everything the renderer needs for a post page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostViewModel {
    pub uid: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub banner_url: String,
    pub display_date: String,
    /// Only set when the post changed after it was first published.
    pub display_last_edited: Option<String>,
    pub reading_time_minutes: usize,
    pub content: Vec<FormattedBlock>,
    pub previous_post: Option<PostSummary>,
    pub next_post: Option<PostSummary>,
}

/// Builds the view model of `post`, with neighbours taken from `listing`.
///
/// Fails when the post has no first publication date: a published post
/// without one means the CMS data is broken, and rendering a blank date would
/// hide that.
pub fn build_view_model(post: &PostRecord, listing: &[PostSummary]) -> Result<PostViewModel> {
    let Some(published) = post.first_publication_date else {
        bail!("Post {:?} has no first publication date", post.uid);
    };

    let display_last_edited = match post.last_publication_date {
        Some(edited) if edited != published => Some(dates::format_edited(&edited)),
        _ => None,
    };

    let adjacent = resolve_adjacent(listing, &post.uid);

    let content = post
        .content
        .iter()
        .map(|block| FormattedBlock {
            heading: block.heading.clone(),
            body: block.body.as_html(),
        })
        .collect();

    Ok(PostViewModel {
        uid: post.uid.clone(),
        title: post.title.clone(),
        subtitle: post.subtitle.clone(),
        author: post.author.clone(),
        banner_url: post.banner_url.clone(),
        display_date: dates::format_published(&published),
        display_last_edited,
        reading_time_minutes: reading_time_minutes(&post.content),
        content,
        previous_post: adjacent.previous,
        next_post: adjacent.next,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub uid: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub display_date: String,
}

/// One page of the home listing. Pages are numbered from 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingPage {
    pub number: usize,
    pub entries: Vec<ListingEntry>,
    pub next_page: Option<usize>,
}

/// Splits the listing into pages of `page_size` posts, keeping its order.
///
/// An empty listing still yields one (empty) page so the home page exists.
pub fn paginate(listing: &[ListedPost], page_size: usize) -> Result<Vec<ListingPage>> {
    if page_size == 0 {
        bail!("Page size must be at least 1");
    }

    let total_pages = listing.len().div_ceil(page_size).max(1);
    let mut pages = Vec::with_capacity(total_pages);

    for number in 1..=total_pages {
        let start = (number - 1) * page_size;
        let end = (start + page_size).min(listing.len());
        let entries = listing[start..end]
            .iter()
            .map(listing_entry)
            .collect::<Result<Vec<_>>>()?;
        pages.push(ListingPage {
            number,
            entries,
            next_page: (number < total_pages).then_some(number + 1),
        });
    }

    Ok(pages)
}

fn listing_entry(post: &ListedPost) -> Result<ListingEntry> {
    let published = post
        .first_publication_date
        .with_context(|| format!("Post {:?} has no first publication date", post.uid))?;
    Ok(ListingEntry {
        uid: post.uid.clone(),
        title: post.title.clone(),
        subtitle: post.subtitle.clone(),
        author: post.author.clone(),
        display_date: dates::format_published(&published),
    })
}
