//! Prismic structured text.
//!
//! The body of a content block is kept as the CMS sent it. Two things are
//! derived from it: a plain-text rendering used for word counts, and an HTML
//! rendering wrapped in [`TrustedMarkup`] for the page renderer.
//!
//! Node text is escaped while converting, but the payload is otherwise taken
//! at face value: link targets and image URLs come straight from the CMS.

use maud::{html, Markup};
use serde::{Deserialize, Serialize};

/// A rich-text field: an ordered list of block nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StructuredText(pub Vec<Node>);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub spans: Vec<Span>,
    /// Only set on `image` nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

/// Inline formatting over `[start, end)` UTF-16 offsets of a node's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<SpanData>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanData {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
}

/// HTML produced from CMS content.
///
/// Kept apart from `String` so that the only place emitting it unescaped is
/// the page renderer. Anything in here is trusted as far as the CMS is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustedMarkup(String);

impl TrustedMarkup {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl StructuredText {
    /// Plain text of every node, joined with a single space.
    pub fn as_text(&self) -> String {
        self.0
            .iter()
            .map(|node| node.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn as_html(&self) -> TrustedMarkup {
        let mut out = String::new();
        let mut nodes = self.0.iter().peekable();

        while let Some(node) = nodes.next() {
            match node.kind.as_str() {
                "list-item" | "o-list-item" => {
                    // Consecutive items of the same kind form one list
                    let mut items = vec![node];
                    while let Some(next) = nodes.peek() {
                        if next.kind != node.kind {
                            break;
                        }
                        items.push(*next);
                        nodes.next();
                    }
                    let markup = if node.kind == "list-item" {
                        html! { ul { @for item in &items { li { (inline(item)) } } } }
                    } else {
                        html! { ol { @for item in &items { li { (inline(item)) } } } }
                    };
                    out.push_str(&markup.into_string());
                }
                _ => {
                    if let Some(markup) = block(node) {
                        out.push_str(&markup.into_string());
                    }
                }
            }
        }

        TrustedMarkup(out)
    }
}

fn block(node: &Node) -> Option<Markup> {
    let markup = match node.kind.as_str() {
        "paragraph" => html! { p { (inline(node)) } },
        "heading1" => html! { h1 { (inline(node)) } },
        "heading2" => html! { h2 { (inline(node)) } },
        "heading3" => html! { h3 { (inline(node)) } },
        "heading4" => html! { h4 { (inline(node)) } },
        "heading5" => html! { h5 { (inline(node)) } },
        "heading6" => html! { h6 { (inline(node)) } },
        "preformatted" => html! { pre { (node.text) } },
        "image" => {
            let url = node.url.as_deref()?;
            html! { p.block-img { img src=(url) alt=(node.alt.as_deref().unwrap_or("")); } }
        }
        _ => return None,
    };
    Some(markup)
}

/// Renders a node's text with its spans applied.
///
/// Span offsets are UTF-16 code units, as Prismic counts them; they are mapped
/// to char positions first. The text is then cut at every span boundary and
/// each piece is wrapped in all spans covering it, outermost first.
/// Overlapping spans therefore produce repeated but well-nested tags.
fn inline(node: &Node) -> Markup {
    let chars: Vec<char> = node.text.chars().collect();
    let len = chars.len();

    // utf16_starts[i] = UTF-16 offset at which chars[i] begins
    let mut utf16_starts = Vec::with_capacity(len + 1);
    let mut offset = 0;
    for c in &chars {
        utf16_starts.push(offset);
        offset += c.len_utf16();
    }
    utf16_starts.push(offset);
    // Offsets inside a surrogate pair round up to the next char
    let to_char = |utf16: usize| utf16_starts.partition_point(|&start| start < utf16).min(len);

    let ranges: Vec<(usize, usize, &Span)> = node
        .spans
        .iter()
        .map(|span| (to_char(span.start), to_char(span.end), span))
        .filter(|(start, end, _)| start < end)
        .collect();

    let mut cuts: Vec<usize> = vec![0, len];
    for (start, end, _) in &ranges {
        cuts.push(*start);
        cuts.push(*end);
    }
    cuts.sort_unstable();
    cuts.dedup();

    html! {
        @for window in cuts.windows(2) {
            @let (start, end) = (window[0], window[1]);
            @let piece = chars[start..end].iter().collect::<String>();
            @let covering = ranges
                .iter()
                .filter(|(s, e, _)| *s <= start && *e >= end)
                .map(|(_, _, span)| *span)
                .collect::<Vec<&Span>>();
            (wrap(&covering, &piece))
        }
    }
}

fn wrap(spans: &[&Span], text: &str) -> Markup {
    let Some((span, rest)) = spans.split_first() else {
        return line_breaks(text);
    };
    let inner = wrap(rest, text);
    match span.kind.as_str() {
        "strong" => html! { strong { (inner) } },
        "em" => html! { em { (inner) } },
        "hyperlink" => {
            let data = span.data.as_ref();
            match data.and_then(|d| d.url.as_deref()) {
                Some(url) => match data.and_then(|d| d.target.as_deref()) {
                    Some(target) => html! { a href=(url) target=(target) rel="noopener" { (inner) } },
                    None => html! { a href=(url) { (inner) } },
                },
                None => inner,
            }
        }
        _ => inner,
    }
}

fn line_breaks(text: &str) -> Markup {
    html! {
        @for (i, line) in text.split('\n').enumerate() {
            @if i > 0 { br; }
            (line)
        }
    }
}
