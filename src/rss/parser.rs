//! Feed content parser.
//!
//! Structured parsing goes through `feed-rs`. Sources that serve
//! almost-but-not-quite valid XML fall back to tag extraction with
//! regular expressions, which recovers `<item>`/`<entry>` blocks from
//! documents a strict parser rejects.

use std::sync::OnceLock;

use chrono::{DateTime, SecondsFormat, Utc};
use feed_rs::parser;
use regex::Regex;
use tracing::debug;

use crate::rss::types::{
    now_iso, FeedItem, ParseOutcome, MAX_CONTENT_LENGTH, MAX_ITEMS_PER_FEED, NO_ITEMS_ERROR,
};

/// Limits applied while turning raw feed text into items.
#[derive(Debug, Clone, Copy)]
pub struct ParseLimits {
    /// Maximum items kept per feed.
    pub max_items: usize,
    /// Maximum characters kept in description/content/summary.
    pub max_content_length: usize,
}

impl Default for ParseLimits {
    fn default() -> Self {
        Self {
            max_items: MAX_ITEMS_PER_FEED,
            max_content_length: MAX_CONTENT_LENGTH,
        }
    }
}

/// Parse raw feed bytes into items.
///
/// Never fails: problems are reported through [`ParseOutcome::error`].
pub fn parse_feed(raw: &[u8], limits: &ParseLimits) -> ParseOutcome {
    let structured = match parser::parse(raw) {
        Ok(feed) => {
            let items = from_structured(feed, limits);
            if !items.is_empty() {
                return ParseOutcome { items, error: None };
            }
            None
        }
        Err(e) => Some(e.to_string()),
    };

    let text = String::from_utf8_lossy(raw);
    let items = extract_with_patterns(&text, limits);

    if items.is_empty() {
        if let Some(reason) = structured {
            debug!("Structured parse failed and no items extracted: {}", reason);
        }
        let preview: String = text.chars().take(200).collect();
        debug!("No items found, response starts with: {}", preview);
        return ParseOutcome {
            items,
            error: Some(NO_ITEMS_ERROR.to_string()),
        };
    }

    ParseOutcome { items, error: None }
}

fn from_structured(feed: feed_rs::model::Feed, limits: &ParseLimits) -> Vec<FeedItem> {
    feed.entries
        .into_iter()
        .take(limits.max_items)
        .enumerate()
        .map(|(index, entry)| {
            let title = entry
                .title
                .map(|t| strip_html(&t.content))
                .unwrap_or_default();
            let link = entry
                .links
                .first()
                .map(|l| l.href.trim().to_string())
                .unwrap_or_default();
            let pub_date = entry
                .published
                .or(entry.updated)
                .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
                .unwrap_or_else(now_iso);
            let summary = entry
                .summary
                .map(|s| clean_text(&s.content, limits.max_content_length))
                .filter(|s| !s.is_empty());
            let content = entry
                .content
                .and_then(|c| c.body)
                .map(|b| clean_text(&b, limits.max_content_length))
                .filter(|s| !s.is_empty());

            FeedItem {
                id: index,
                title,
                link,
                pub_date,
                description: summary.clone().or_else(|| content.clone()),
                content,
                summary,
            }
        })
        .collect()
}

struct Patterns {
    item: Regex,
    entry: Regex,
    title: Regex,
    link: Regex,
    link_href: Regex,
    dates: [Regex; 4],
    description: Regex,
    summary: Regex,
    content: Regex,
}

fn tag_pattern(tag: &str) -> Regex {
    // Tag text, optionally wrapped in CDATA.
    Regex::new(&format!(
        r"(?s)<{tag}(?:\s[^>]*)?>\s*(?:<!\[CDATA\[)?(.*?)(?:\]\]>)?\s*</{tag}>"
    ))
    .expect("static tag pattern")
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        item: Regex::new(r"(?s)<item\b.*?</item>").expect("static item pattern"),
        entry: Regex::new(r"(?s)<entry\b.*?</entry>").expect("static entry pattern"),
        title: tag_pattern("title"),
        link: Regex::new(r"(?s)<link>\s*(?:<!\[CDATA\[)?(.*?)(?:\]\]>)?\s*</link>")
            .expect("static link pattern"),
        link_href: Regex::new(r#"<link[^>]*href="([^"]*)"[^>]*>"#).expect("static href pattern"),
        dates: [
            tag_pattern("pubDate"),
            tag_pattern("published"),
            tag_pattern("updated"),
            tag_pattern("dc:date"),
        ],
        description: tag_pattern("description"),
        summary: tag_pattern("summary"),
        content: tag_pattern("content"),
    })
}

fn capture<'a>(re: &Regex, block: &'a str) -> Option<&'a str> {
    re.captures(block)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
}

/// Extract items from loosely structured RSS/Atom text.
fn extract_with_patterns(text: &str, limits: &ParseLimits) -> Vec<FeedItem> {
    let p = patterns();

    let mut blocks: Vec<&str> = p.item.find_iter(text).map(|m| m.as_str()).collect();
    if blocks.is_empty() {
        blocks = p.entry.find_iter(text).map(|m| m.as_str()).collect();
    }

    blocks
        .into_iter()
        .take(limits.max_items)
        .enumerate()
        .map(|(index, block)| {
            let title = capture(&p.title, block)
                .map(|t| strip_html(&unescape_xml(t)))
                .unwrap_or_default();
            let link = capture(&p.link, block)
                .or_else(|| capture(&p.link_href, block))
                .map(unescape_xml)
                .unwrap_or_default();
            let pub_date = p
                .dates
                .iter()
                .find_map(|re| capture(re, block))
                .map(normalize_date)
                .unwrap_or_else(now_iso);
            let field = |re: &Regex| {
                capture(re, block)
                    .map(|s| clean_text(&unescape_xml(s), limits.max_content_length))
                    .filter(|s| !s.is_empty())
            };

            FeedItem {
                id: index,
                title,
                link,
                pub_date,
                description: field(&p.description),
                content: field(&p.content),
                summary: field(&p.summary),
            }
        })
        .collect()
}

/// Normalize a feed date to RFC 3339, keeping the raw text if unrecognized.
pub fn normalize_date(raw: &str) -> String {
    let raw = raw.trim();
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|dt| {
            dt.with_timezone(&Utc)
                .to_rfc3339_opts(SecondsFormat::Millis, true)
        })
        .unwrap_or_else(|_| raw.to_string())
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn clean_text(html: &str, max_len: usize) -> String {
    truncate(&strip_html(html), max_len)
}

/// Strip HTML tags from text and decode common entities.
pub fn strip_html(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut in_tag = false;
    let mut in_entity = false;
    let mut entity = String::new();

    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            '&' if !in_tag => {
                if in_entity {
                    // Bare ampersand followed by another one.
                    result.push('&');
                    result.push_str(&entity);
                }
                in_entity = true;
                entity.clear();
            }
            ';' if in_entity => {
                in_entity = false;
                match entity.as_str() {
                    "amp" => result.push('&'),
                    "lt" => result.push('<'),
                    "gt" => result.push('>'),
                    "quot" => result.push('"'),
                    "apos" => result.push('\''),
                    "nbsp" => result.push(' '),
                    _ if entity.starts_with('#') => {
                        if let Some(c) = parse_numeric_entity(&entity).and_then(char::from_u32) {
                            result.push(c);
                        }
                    }
                    _ => {
                        result.push('&');
                        result.push_str(&entity);
                        result.push(';');
                    }
                }
            }
            _ if in_entity => {
                if ch.is_whitespace() || entity.len() > 10 {
                    // Not an entity after all.
                    in_entity = false;
                    result.push('&');
                    result.push_str(&entity);
                    result.push(ch);
                } else {
                    entity.push(ch);
                }
            }
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }
    if in_entity {
        result.push('&');
        result.push_str(&entity);
    }

    result.split_whitespace().collect::<Vec<&str>>().join(" ")
}

/// Parse a numeric HTML entity (e.g., "#123" or "#x7B").
fn parse_numeric_entity(entity: &str) -> Option<u32> {
    if let Some(hex) = entity
        .strip_prefix("#x")
        .or_else(|| entity.strip_prefix("#X"))
    {
        u32::from_str_radix(hex, 16).ok()
    } else {
        entity.strip_prefix('#').and_then(|d| d.parse().ok())
    }
}

fn truncate(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        text.to_string()
    } else {
        text.chars().take(max_len).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> ParseOutcome {
        parse_feed(text.as_bytes(), &ParseLimits::default())
    }

    #[test]
    fn test_parse_rss() {
        let rss = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Test Feed</title>
    <link>https://example.com</link>
    <description>A test feed</description>
    <item>
      <title>First Article</title>
      <link>https://example.com/1</link>
      <guid>guid-1</guid>
      <pubDate>Wed, 01 Jan 2025 08:00:00 +0800</pubDate>
      <description>&lt;p&gt;Description&lt;/p&gt;</description>
    </item>
  </channel>
</rss>"#;

        let outcome = parse(rss);
        assert!(outcome.error.is_none());
        assert_eq!(outcome.items.len(), 1);
        let item = &outcome.items[0];
        assert_eq!(item.id, 0);
        assert_eq!(item.title, "First Article");
        assert_eq!(item.link, "https://example.com/1");
        assert_eq!(item.pub_date, "2025-01-01T00:00:00.000Z");
        assert_eq!(item.description.as_deref(), Some("Description"));
    }

    #[test]
    fn test_parse_atom() {
        let atom = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Feed</title>
  <link href="https://example.com"/>
  <entry>
    <id>urn:uuid:1</id>
    <title>Atom Entry</title>
    <link href="https://example.com/entry"/>
    <summary>Entry summary</summary>
    <updated>2025-01-01T00:00:00Z</updated>
  </entry>
</feed>"#;

        let outcome = parse(atom);
        assert!(outcome.error.is_none());
        assert_eq!(outcome.items.len(), 1);
        assert_eq!(outcome.items[0].title, "Atom Entry");
        assert_eq!(outcome.items[0].link, "https://example.com/entry");
        assert_eq!(outcome.items[0].summary.as_deref(), Some("Entry summary"));
        assert_eq!(outcome.items[0].pub_date, "2025-01-01T00:00:00.000Z");
    }

    #[test]
    fn test_fallback_recovers_items_from_broken_xml() {
        // Unclosed channel and a stray ampersand make strict parsers bail.
        let broken = r#"<rss><channel><title>Broken & Co</title>
<item><title><![CDATA[Hello <World>]]></title><link>https://x.test/1</link>
<pubDate>Wed, 01 Jan 2025 00:00:00 GMT</pubDate></item>
<item><title>Second</title><link>https://x.test/2</link></item>"#;

        let outcome = parse(broken);
        assert!(outcome.error.is_none());
        assert_eq!(outcome.items.len(), 2);
        assert_eq!(outcome.items[0].title, "Hello");
        assert_eq!(outcome.items[0].link, "https://x.test/1");
        assert_eq!(outcome.items[0].pub_date, "2025-01-01T00:00:00.000Z");
        assert_eq!(outcome.items[1].id, 1);
        assert_eq!(outcome.items[1].title, "Second");
        // No date in the item: stamped with a current ISO timestamp.
        assert!(DateTime::parse_from_rfc3339(&outcome.items[1].pub_date).is_ok());
    }

    #[test]
    fn test_fallback_entry_with_href_link() {
        let broken = r#"<feed><entry><title>E1</title>
<link rel="alternate" href="https://x.test/e1"/>
<published>2025-02-03T04:05:06+00:00</published></entry> & junk"#;

        let outcome = parse(broken);
        assert_eq!(outcome.items.len(), 1);
        assert_eq!(outcome.items[0].link, "https://x.test/e1");
        assert_eq!(outcome.items[0].pub_date, "2025-02-03T04:05:06.000Z");
    }

    #[test]
    fn test_no_items_reports_error() {
        let outcome = parse("<html><body>Nothing here</body></html>");
        assert!(outcome.items.is_empty());
        assert_eq!(outcome.error.as_deref(), Some(NO_ITEMS_ERROR));
    }

    #[test]
    fn test_max_items_limit() {
        let mut rss = String::from("<rss version=\"2.0\"><channel><title>T</title>");
        for i in 0..10 {
            rss.push_str(&format!(
                "<item><title>Item {i}</title><link>https://x.test/{i}</link></item>"
            ));
        }
        rss.push_str("</channel></rss>");

        let limits = ParseLimits {
            max_items: 3,
            max_content_length: 100,
        };
        let outcome = parse_feed(rss.as_bytes(), &limits);
        assert_eq!(outcome.items.len(), 3);
        assert_eq!(outcome.items[2].title, "Item 2");
    }

    #[test]
    fn test_normalize_date() {
        assert_eq!(
            normalize_date("Tue, 10 Jun 2003 04:00:00 GMT"),
            "2003-06-10T04:00:00.000Z"
        );
        assert_eq!(
            normalize_date("2025-01-01T09:00:00+09:00"),
            "2025-01-01T00:00:00.000Z"
        );
        assert_eq!(normalize_date(" yesterday "), "yesterday");
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(strip_html("<p>Hello</p>"), "Hello");
        assert_eq!(strip_html("<b>Bold</b> text"), "Bold text");
        assert_eq!(strip_html("&lt;tag&gt; &amp; &#65;&#x3042;"), "<tag> & Aあ");
        assert_eq!(strip_html("<p>\n\tNewlines\n\tand\ttabs\n</p>"), "Newlines and tabs");
        assert_eq!(strip_html("Tom & Jerry"), "Tom & Jerry");
    }

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("あいうえお", 3), "あいう");
        assert_eq!(truncate("short", 10), "short");
    }

    #[test]
    fn test_parse_numeric_entity() {
        assert_eq!(parse_numeric_entity("#65"), Some(65));
        assert_eq!(parse_numeric_entity("#x41"), Some(65));
        assert_eq!(parse_numeric_entity("#X41"), Some(65));
        assert_eq!(parse_numeric_entity("invalid"), None);
    }
}
