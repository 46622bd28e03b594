use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::richtext::StructuredText;

/// Lightweight listing entry used for ordering and prev/next links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostSummary {
    pub uid: String,
    pub title: String,
}

/// A post as it appears in the listing query, with the fields the home page shows.
#[derive(Debug, Clone, PartialEq)]
pub struct ListedPost {
    pub uid: String,
    pub first_publication_date: Option<DateTime<Utc>>,
    pub last_publication_date: Option<DateTime<Utc>>,
    pub title: String,
    pub subtitle: String,
    pub author: String,
}

impl ListedPost {
    pub fn summary(&self) -> PostSummary {
        PostSummary {
            uid: self.uid.clone(),
            title: self.title.clone(),
        }
    }
}

/// One section of a post: a heading followed by a rich-text body.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentBlock {
    pub heading: String,
    pub body: StructuredText,
}

/// Full post record as returned by the content API.
#[derive(Debug, Clone, PartialEq)]
pub struct PostRecord {
    pub uid: String,
    pub first_publication_date: Option<DateTime<Utc>>,
    pub last_publication_date: Option<DateTime<Utc>>,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub banner_url: String,
    pub content: Vec<ContentBlock>,
}

/// Source of posts for a build.
///
/// `list_posts` must return the whole corpus in display order (newest first).
/// Callers treat one call as the snapshot for the entire build.
pub trait PostRepository {
    fn list_posts(&self) -> Result<Vec<ListedPost>>;

    /// Returns `Ok(None)` when no post with that uid exists (yet).
    fn post_by_uid(&self, uid: &str) -> Result<Option<PostRecord>>;
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use crate::richtext::{Node, StructuredText};
    use chrono::TimeZone;
    use std::cell::Cell;
    use std::collections::HashMap;

    /// In-memory repository for pipeline tests.
    #[derive(Default)]
    pub struct MemoryRepository {
        pub listing: Vec<ListedPost>,
        pub records: HashMap<String, PostRecord>,
        pub fetches: Cell<usize>,
    }

    impl MemoryRepository {
        pub fn with_posts(records: Vec<PostRecord>) -> Self {
            let listing = records.iter().map(listed_from).collect();
            let records = records.into_iter().map(|r| (r.uid.clone(), r)).collect();
            Self {
                listing,
                records,
                fetches: Cell::new(0),
            }
        }
    }

    impl PostRepository for MemoryRepository {
        fn list_posts(&self) -> Result<Vec<ListedPost>> {
            Ok(self.listing.clone())
        }

        fn post_by_uid(&self, uid: &str) -> Result<Option<PostRecord>> {
            self.fetches.set(self.fetches.get() + 1);
            Ok(self.records.get(uid).cloned())
        }
    }

    pub fn listed_from(record: &PostRecord) -> ListedPost {
        ListedPost {
            uid: record.uid.clone(),
            first_publication_date: record.first_publication_date,
            last_publication_date: record.last_publication_date,
            title: record.title.clone(),
            subtitle: record.subtitle.clone(),
            author: record.author.clone(),
        }
    }

    pub fn paragraph(text: &str) -> StructuredText {
        StructuredText(vec![Node {
            kind: "paragraph".to_string(),
            text: text.to_string(),
            spans: Vec::new(),
            url: None,
            alt: None,
        }])
    }

    pub fn words(n: usize) -> String {
        vec!["palavra"; n].join(" ")
    }

    pub fn record(uid: &str, blocks: Vec<ContentBlock>) -> PostRecord {
        let published = Utc.with_ymd_and_hms(2021, 3, 25, 19, 25, 28).unwrap();
        PostRecord {
            uid: uid.to_string(),
            first_publication_date: Some(published),
            last_publication_date: Some(published),
            title: format!("Post {}", uid),
            subtitle: "Subtítulo".to_string(),
            author: "Joseph Oliveira".to_string(),
            banner_url: format!("https://images.example.com/{}.png", uid),
            content: blocks,
        }
    }

    pub fn summary(uid: &str) -> PostSummary {
        PostSummary {
            uid: uid.to_string(),
            title: format!("Post {}", uid),
        }
    }
}
