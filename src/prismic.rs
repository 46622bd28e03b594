use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::dates::parse_timestamp;
use crate::post::{ContentBlock, ListedPost, PostRecord, PostRepository};
use crate::richtext::StructuredText;

/// Largest page size the Prismic search endpoint accepts.
const SEARCH_PAGE_SIZE: u32 = 100;

/// Connection settings for a Prismic repository.
#[derive(Debug, Clone)]
pub struct PrismicConfig {
    /// API endpoint, e.g. `https://my-blog.cdn.prismic.io/api/v2`
    pub endpoint: String,
    pub access_token: Option<String>,
    /// Custom type holding the blog posts
    pub document_type: String,
}

/// API root response; only the refs matter here.
#[derive(Debug, Deserialize)]
struct ApiRoot {
    refs: Vec<ApiRef>,
}

#[derive(Debug, Deserialize)]
struct ApiRef {
    #[serde(rename = "ref")]
    reference: String,
    #[serde(rename = "isMasterRef", default)]
    is_master_ref: bool,
}

/// One page of search results.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<Document>,
    next_page: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Document {
    uid: Option<String>,
    first_publication_date: Option<String>,
    last_publication_date: Option<String>,
    data: PostData,
}

/// Fields of the post custom type.
#[derive(Debug, Deserialize)]
struct PostData {
    #[serde(default)]
    title: String,
    #[serde(default)]
    subtitle: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    banner: Option<Banner>,
    #[serde(default)]
    content: Vec<ContentData>,
}

#[derive(Debug, Deserialize)]
struct Banner {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentData {
    #[serde(default)]
    heading: Option<String>,
    #[serde(default)]
    body: StructuredText,
}

impl Document {
    fn uid(&self) -> Result<&str> {
        self.uid
            .as_deref()
            .context("Document has no uid; posts must define a UID field")
    }

    fn into_listed(self) -> Result<ListedPost> {
        let uid = self.uid()?.to_string();
        Ok(ListedPost {
            first_publication_date: timestamp(&uid, self.first_publication_date.as_deref())?,
            last_publication_date: timestamp(&uid, self.last_publication_date.as_deref())?,
            uid,
            title: self.data.title,
            subtitle: self.data.subtitle,
            author: self.data.author,
        })
    }

    fn into_record(self) -> Result<PostRecord> {
        let uid = self.uid()?.to_string();
        Ok(PostRecord {
            first_publication_date: timestamp(&uid, self.first_publication_date.as_deref())?,
            last_publication_date: timestamp(&uid, self.last_publication_date.as_deref())?,
            uid,
            title: self.data.title,
            subtitle: self.data.subtitle,
            author: self.data.author,
            banner_url: self.data.banner.and_then(|b| b.url).unwrap_or_default(),
            content: self
                .data
                .content
                .into_iter()
                .map(|block| ContentBlock {
                    heading: block.heading.unwrap_or_default(),
                    body: block.body,
                })
                .collect(),
        })
    }
}

fn timestamp(uid: &str, raw: Option<&str>) -> Result<Option<chrono::DateTime<chrono::Utc>>> {
    raw.map(|raw| parse_timestamp(raw).with_context(|| format!("In post {:?}", uid)))
        .transpose()
}

/// Blocking client for the Prismic REST API v2.
pub struct PrismicClient {
    config: PrismicConfig,
    http: reqwest::blocking::Client,
}

impl PrismicClient {
    pub fn new(config: PrismicConfig) -> Result<Self> {
        Url::parse(&config.endpoint)
            .with_context(|| format!("Invalid Prismic endpoint: {}", config.endpoint))?;
        let http = reqwest::blocking::Client::builder()
            .user_agent(concat!("spacetraveling/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { config, http })
    }

    /// Host name of the repository, used to namespace the page cache.
    pub fn repository_host(&self) -> String {
        Url::parse(&self.config.endpoint)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// Fetch the ref of the currently published content.
    fn master_ref(&self) -> Result<String> {
        let url = with_token(Url::parse(&self.config.endpoint)?, &self.config);
        let root: ApiRoot = self.get_json(url).context("Failed to fetch Prismic API root")?;
        master_of(root)
    }

    fn search(&self, url: Url) -> Result<SearchResponse> {
        self.get_json(url).context("Prismic search failed")
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!(%url, "GET");
        let resp = self
            .http
            .get(url.clone())
            .header("Accept", "application/json")
            .send()
            .context("HTTP request failed")?;

        if !resp.status().is_success() {
            bail!("GET {}: HTTP {}", redacted(&url), resp.status());
        }

        resp.json().context("Failed to parse response JSON")
    }
}

impl PostRepository for PrismicClient {
    fn list_posts(&self) -> Result<Vec<ListedPost>> {
        let master = self.master_ref()?;
        let first = search_url(
            &self.config,
            &master,
            &format!("[[at(document.type,\"{}\")]]", self.config.document_type),
        )?;

        let posts = collect_pages(first, &self.config, |url| self.search(url))?;
        debug!(count = posts.len(), "Listed posts");
        Ok(posts)
    }

    fn post_by_uid(&self, uid: &str) -> Result<Option<PostRecord>> {
        let master = self.master_ref()?;
        let query = format!(
            "[[at(my.{}.uid,\"{}\")]]",
            self.config.document_type,
            uid.replace('"', "\\\"")
        );
        let url = search_url(&self.config, &master, &query)?;
        let page = self
            .search(url)
            .with_context(|| format!("Failed to fetch post {:?}", uid))?;

        page.results
            .into_iter()
            .next()
            .map(Document::into_record)
            .transpose()
    }
}

fn master_of(root: ApiRoot) -> Result<String> {
    root.refs
        .into_iter()
        .find(|r| r.is_master_ref)
        .map(|r| r.reference)
        .context("Prismic API root has no master ref")
}

/// Fetch `first` and every `next_page` after it, keeping result order.
fn collect_pages(
    first: Url,
    config: &PrismicConfig,
    mut fetch: impl FnMut(Url) -> Result<SearchResponse>,
) -> Result<Vec<ListedPost>> {
    let mut url = Some(first);
    let mut posts = Vec::new();

    while let Some(page_url) = url.take() {
        let page = fetch(page_url)?;
        for doc in page.results {
            posts.push(doc.into_listed()?);
        }
        // next_page already carries ref, query and ordering
        url = match page.next_page {
            Some(next) => Some(with_token(
                Url::parse(&next).context("Invalid next_page URL")?,
                config,
            )),
            None => None,
        };
    }

    Ok(posts)
}

/// Build `{endpoint}/documents/search` for a predicate query, newest first.
fn search_url(config: &PrismicConfig, reference: &str, query: &str) -> Result<Url> {
    let base = config.endpoint.trim_end_matches('/');
    let mut url = Url::parse(&format!("{}/documents/search", base))
        .with_context(|| format!("Invalid Prismic endpoint: {}", config.endpoint))?;
    url.query_pairs_mut()
        .append_pair("ref", reference)
        .append_pair("q", query)
        .append_pair("orderings", "[document.first_publication_date desc]")
        .append_pair("pageSize", &SEARCH_PAGE_SIZE.to_string());
    Ok(with_token(url, config))
}

fn with_token(mut url: Url, config: &PrismicConfig) -> Url {
    if let Some(token) = &config.access_token {
        let has_token = url.query_pairs().any(|(k, _)| k == "access_token");
        if !has_token {
            url.query_pairs_mut().append_pair("access_token", token);
        }
    }
    url
}

/// URL without the access token, for error messages.
fn redacted(url: &Url) -> Url {
    let mut clean = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "access_token")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    clean.query_pairs_mut().clear().extend_pairs(pairs);
    clean
}
