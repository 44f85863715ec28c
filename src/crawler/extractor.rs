//! Page extraction: raw response bytes to a [`PageRecord`]
//!
//! HTML pages yield a title, the visible body text and the outbound links;
//! plain-text pages yield only their cleaned body.
//!
//! Bodies are decoded using, in order: a byte-order mark, the `charset`
//! parameter of the Content-Type, a `<meta charset>` in the first bytes of
//! the document, and finally UTF-8.

use chrono::{DateTime, Utc};
use encoding_rs::{Encoding, UTF_8};
use scraper::{ElementRef, Html, Selector};
use std::borrow::Cow;
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Elements whose text is never visible
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// How many leading bytes are inspected for binary content and meta charsets
const SNIFF_LEN: usize = 1024;

/// Why a fetched page could not be turned into a record
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),

    #[error("Content looks binary")]
    BinaryContent,

    #[error("Content could not be decoded: {0}")]
    InvalidEncoding(String),
}

/// The extracted content of one successfully fetched page
#[derive(Debug, Clone, PartialEq)]
pub struct PageRecord {
    pub url: Url,
    pub title: String,
    pub raw_content: String,
    pub cleaned_text: String,
    pub outbound_links: Vec<Url>,
    pub depth: u32,
    pub fetch_time: Duration,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContentKind {
    Html,
    Text,
}

/// Builds a [`PageRecord`] from a response body
///
/// # Arguments
///
/// * `raw_content` - The response body
/// * `content_type` - The Content-Type header value, if any
/// * `base_url` - The final URL of the response, used to resolve links
/// * `depth` - Depth of the frontier entry that produced this page
/// * `fetch_time` - How long the fetch took
/// * `fetched_at` - When the fetch completed
///
/// # Example
///
/// ```
/// use chrono::Utc;
/// use std::time::Duration;
/// use sumi_sift::crawler::extract;
/// use url::Url;
///
/// let html = br#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let record = extract(html, Some("text/html"), &base_url, 0, Duration::ZERO, Utc::now()).unwrap();
/// assert_eq!(record.title, "Test");
/// assert_eq!(record.outbound_links[0].as_str(), "https://example.com/page");
/// ```
pub fn extract(
    raw_content: &[u8],
    content_type: Option<&str>,
    base_url: &Url,
    depth: u32,
    fetch_time: Duration,
    fetched_at: DateTime<Utc>,
) -> Result<PageRecord, ExtractionError> {
    let declared = content_type.map(classify_content_type).transpose()?;

    let head = &raw_content[..raw_content.len().min(SNIFF_LEN)];
    // UTF-16 text is full of NULs; only a BOM makes that legitimate
    if Encoding::for_bom(raw_content).is_none() && head.contains(&0) {
        return Err(ExtractionError::BinaryContent);
    }

    let body = decode_body(raw_content, content_type)?;
    let body = body.as_ref();
    let kind = declared.unwrap_or_else(|| sniff_kind(body));

    let (title, cleaned_text, outbound_links) = match kind {
        ContentKind::Html => {
            let document = Html::parse_document(body);
            (
                extract_title(&document),
                clean_text(&visible_text(&document)),
                extract_links(&document, base_url),
            )
        }
        ContentKind::Text => (String::new(), clean_text(body), Vec::new()),
    };

    Ok(PageRecord {
        url: base_url.clone(),
        title,
        raw_content: body.to_string(),
        cleaned_text,
        outbound_links,
        depth,
        fetch_time,
        fetched_at,
    })
}

fn decode_body<'a>(
    raw_content: &'a [u8],
    content_type: Option<&str>,
) -> Result<Cow<'a, str>, ExtractionError> {
    let (encoding, bytes) = match Encoding::for_bom(raw_content) {
        Some((encoding, bom_len)) => (encoding, &raw_content[bom_len..]),
        None => {
            let encoding = match content_type.and_then(charset_param) {
                Some(label) => lookup_encoding(&label)?,
                None => match meta_charset(raw_content) {
                    // a meta tag can't really declare UTF-16 in an ASCII-readable head
                    Some(label) => lookup_encoding(&label)?.output_encoding(),
                    None => UTF_8,
                },
            };
            (encoding, raw_content)
        }
    };

    let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
    if had_errors {
        return Err(ExtractionError::InvalidEncoding(format!(
            "body is not valid {}",
            encoding.name()
        )));
    }
    Ok(text)
}

fn lookup_encoding(label: &str) -> Result<&'static Encoding, ExtractionError> {
    Encoding::for_label(label.as_bytes())
        .ok_or_else(|| ExtractionError::InvalidEncoding(format!("unknown charset {:?}", label)))
}

/// The `charset` parameter of a Content-Type value
fn charset_param(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        let value = value.trim().trim_matches(|c: char| c == '"' || c == '\'');
        (!value.is_empty()).then(|| value.to_string())
    })
}

/// A charset declared by a `<meta>` tag near the start of the document
fn meta_charset(raw_content: &[u8]) -> Option<String> {
    let head = &raw_content[..raw_content.len().min(SNIFF_LEN)];
    let head = String::from_utf8_lossy(head).to_ascii_lowercase();

    let mut rest = head.as_str();
    while let Some(pos) = rest.find("<meta") {
        rest = &rest[pos + "<meta".len()..];
        let tag = rest.split('>').next().unwrap_or("");
        if let Some(idx) = tag.find("charset=") {
            let value: String = tag[idx + "charset=".len()..]
                .trim_start_matches(|c: char| c == '"' || c == '\'' || c == ' ')
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
                .collect();
            if !value.is_empty() {
                return Some(value);
            }
        }
    }
    None
}

/// Collapses every run of whitespace to a single space and trims the ends
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn classify_content_type(content_type: &str) -> Result<ContentKind, ExtractionError> {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    match mime.as_str() {
        "text/html" | "application/xhtml+xml" => Ok(ContentKind::Html),
        "text/plain" => Ok(ContentKind::Text),
        _ => Err(ExtractionError::UnsupportedContentType(mime)),
    }
}

fn sniff_kind(body: &str) -> ContentKind {
    if body.trim_start().starts_with('<') {
        ContentKind::Html
    } else {
        ContentKind::Text
    }
}

fn extract_title(document: &Html) -> String {
    let Ok(selector) = Selector::parse("title") else {
        return String::new();
    };

    document
        .select(&selector)
        .next()
        .map(|element| clean_text(&element.text().collect::<String>()))
        .unwrap_or_default()
}

/// Gathers body text, skipping hidden elements
fn visible_text(document: &Html) -> String {
    let mut out = String::new();
    let root = Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next())
        .unwrap_or_else(|| document.root_element());
    collect_text(root, &mut out);
    out
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            if HIDDEN_ELEMENTS.contains(&child_element.value().name()) {
                continue;
            }
            collect_text(child_element, out);
        } else if let Some(text) = child.value().as_text() {
            out.push_str(text);
            out.push(' ');
        }
    }
}

/// Extracts followable links from `<a href>` elements
///
/// Results are absolute http(s) URLs without fragments, in first-seen order
/// with duplicates removed.
fn extract_links(document: &Html, base_url: &Url) -> Vec<Url> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&selector) {
        if element.value().attr("download").is_some() {
            continue;
        }

        let Some(link) = element
            .value()
            .attr("href")
            .and_then(|href| resolve_link(href, base_url))
        else {
            continue;
        };

        if seen.insert(link.as_str().to_string()) {
            links.push(link);
        }
    }

    links
}

/// Resolves an href against the page URL
///
/// Returns None for script/mail/phone/data links, same-page anchors,
/// unparseable hrefs, and anything that is not http(s) after resolution.
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let mut resolved = base_url.join(href).ok()?;
    if resolved.scheme() != "http" && resolved.scheme() != "https" {
        return None;
    }
    resolved.set_fragment(None);
    Some(resolved)
}
