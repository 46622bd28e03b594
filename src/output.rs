//! HTML pages for the blog.
//!
//! Plain semantic markup without styles or scripts. Text goes through maud
//! and is escaped; post bodies are [`TrustedMarkup`] and are the only thing
//! written unescaped.

use anyhow::{bail, Result};
use maud::{html, Markup, PreEscaped, DOCTYPE};
use std::path::PathBuf;

use crate::post::PostSummary;
use crate::richtext::TrustedMarkup;
use crate::view_model::{ListingPage, PostViewModel};

const SITE_NAME: &str = "spacetraveling";

/// Public path of a post page.
pub fn post_href(uid: &str) -> String {
    format!("/post/{}", uid)
}

/// Public path of a listing page; page 1 is the home page.
pub fn listing_href(number: usize) -> String {
    if number <= 1 {
        "/".to_string()
    } else {
        format!("/page/{}", number)
    }
}

/// File a post page is written to, relative to the output directory.
///
/// Uids come from the CMS and become a directory name, so only slug
/// characters (`[A-Za-z0-9_-]`) are accepted.
pub fn post_file(uid: &str) -> Result<PathBuf> {
    let is_slug = !uid.is_empty()
        && uid
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !is_slug {
        bail!("Post uid {:?} is not a valid URL slug", uid);
    }
    Ok(PathBuf::from("post").join(uid).join("index.html"))
}

pub fn listing_file(number: usize) -> PathBuf {
    if number <= 1 {
        PathBuf::from("index.html")
    } else {
        PathBuf::from("page").join(number.to_string()).join("index.html")
    }
}

fn trusted(markup: &TrustedMarkup) -> PreEscaped<&str> {
    PreEscaped(markup.as_str())
}

fn document(title: &str, body: Markup) -> String {
    html! {
        (DOCTYPE)
        html lang="pt-BR" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) }
            }
            body {
                header { a href="/" { (SITE_NAME) } }
                (body)
            }
        }
    }
    .into_string()
}

pub fn render_post(post: &PostViewModel) -> String {
    let body = html! {
        @if !post.banner_url.is_empty() {
            img.banner src=(post.banner_url) alt="";
        }
        article {
            h1 { (post.title) }
            div.info {
                time { (post.display_date) }
                span.author { (post.author) }
                span.reading-time { (post.reading_time_minutes) " min" }
            }
            @if let Some(edited) = &post.display_last_edited {
                p.edited { "* editado em " (edited) }
            }
            @for block in &post.content {
                section {
                    h2 { (block.heading) }
                    div.body { (trusted(&block.body)) }
                }
            }
        }
        (navigation(post.previous_post.as_ref(), post.next_post.as_ref()))
    };
    document(&format!("{} | {}", post.title, SITE_NAME), body)
}

fn navigation(previous: Option<&PostSummary>, next: Option<&PostSummary>) -> Markup {
    html! {
        nav.navigation {
            div.previous {
                @if let Some(post) = previous {
                    h5 { (post.title) }
                    a href=(post_href(&post.uid)) { "Post anterior" }
                }
            }
            div.next {
                @if let Some(post) = next {
                    h5 { (post.title) }
                    a href=(post_href(&post.uid)) { "Próximo post" }
                }
            }
        }
    }
}

pub fn render_listing(page: &ListingPage) -> String {
    let body = html! {
        main {
            @for entry in &page.entries {
                article {
                    a href=(post_href(&entry.uid)) { h1 { (entry.title) } }
                    h2 { (entry.subtitle) }
                    div.info {
                        time { (entry.display_date) }
                        span.author { (entry.author) }
                    }
                }
            }
            @if let Some(next) = page.next_page {
                a.load-more href=(listing_href(next)) { "Carregar mais posts" }
            }
        }
    };
    document(SITE_NAME, body)
}

/// Placeholder for a post whose content is not available yet.
pub fn render_fallback() -> String {
    document(SITE_NAME, html! { div.loading { "Carregando..." } })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::post::testing::summary;
    use crate::richtext::StructuredText;
    use crate::view_model::{FormattedBlock, ListingEntry};

    fn view_model() -> PostViewModel {
        let body: StructuredText = serde_json::from_str(
            r#"[{"type": "paragraph", "text": "Olá", "spans": [{"start": 0, "end": 3, "type": "em"}]}]"#,
        )
        .unwrap();
        PostViewModel {
            uid: "b".to_string(),
            title: "Criando um app <CRA>".to_string(),
            subtitle: "Tudo sobre".to_string(),
            author: "Danilo Vieira".to_string(),
            banner_url: "https://images.example.com/b.png".to_string(),
            display_date: "25 mar 2021".to_string(),
            display_last_edited: None,
            reading_time_minutes: 4,
            content: vec![FormattedBlock {
                heading: "Introdução".to_string(),
                body: body.as_html(),
            }],
            previous_post: Some(summary("a")),
            next_post: None,
        }
    }

    #[test]
    fn test_render_post() {
        let html = render_post(&view_model());
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<h1>Criando um app &lt;CRA&gt;</h1>"));
        assert!(html.contains("<time>25 mar 2021</time>"));
        assert!(html.contains("4 min"));
        assert!(html.contains("<p><em>Olá</em></p>"));
        assert!(html.contains(r#"<a href="/post/a">Post anterior</a>"#));
        assert!(!html.contains("Próximo post"));
        assert!(!html.contains("editado em"));
    }

    #[test]
    fn test_render_post_last_edited() {
        let mut vm = view_model();
        vm.display_last_edited = Some("26 mar 2021, às 10:00".to_string());
        let html = render_post(&vm);
        assert!(html.contains("* editado em 26 mar 2021, às 10:00"));
    }

    #[test]
    fn test_render_listing() {
        let page = ListingPage {
            number: 1,
            entries: vec![ListingEntry {
                uid: "a".to_string(),
                title: "Post a".to_string(),
                subtitle: "Sub".to_string(),
                author: "Autor".to_string(),
                display_date: "15 mar 2021".to_string(),
            }],
            next_page: Some(2),
        };
        let html = render_listing(&page);
        assert!(html.contains(r#"<a href="/post/a"><h1>Post a</h1></a>"#));
        assert!(html.contains(r#"href="/page/2">Carregar mais posts</a>"#));

        let last = ListingPage {
            next_page: None,
            ..page
        };
        assert!(!render_listing(&last).contains("Carregar mais posts"));
    }

    #[test]
    fn test_paths() {
        assert_eq!(listing_href(1), "/");
        assert_eq!(listing_href(3), "/page/3");
        assert_eq!(listing_file(1), PathBuf::from("index.html"));
        assert_eq!(listing_file(2), PathBuf::from("page/2/index.html"));
        assert_eq!(
            post_file("como-utilizar_hooks2").unwrap(),
            PathBuf::from("post/como-utilizar_hooks2/index.html")
        );
    }

    #[test]
    fn test_post_file_rejects_unsafe_uids() {
        for uid in ["../../escaped", "a/b", "a.b", "", "/etc", "ação"] {
            let err = post_file(uid).unwrap_err();
            assert!(err.to_string().contains(&format!("{:?}", uid)), "{}", err);
        }
    }

    #[test]
    fn test_render_fallback() {
        assert!(render_fallback().contains("Carregando..."));
    }
}
