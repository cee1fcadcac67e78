use crate::error::{Result, ScrapeError};
use crate::models::{ListingRecord, PRICE_NOT_LISTED};
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::cleaner::{node_text, non_empty};

// ── Selectors ─────────────────────────────────────────────────────────────────

/// One element per search result.
const LISTING_CONTAINER: &str = r#"div[data-component-type="s-search-result"]"#;

/// Tried in order; the first one yielding text wins.
const TITLE_CANDIDATES: &[&str] = &[
    "span.a-size-medium.a-color-base.a-text-normal",
    "span.a-size-base-plus.a-color-base.a-text-normal",
    "h2",
];

const LINK_CANDIDATES: &[&str] = &[
    "a.a-link-normal.s-no-outline",
    "a.a-link-normal.s-underline-text.s-underline-link-text.s-link-style.a-text-normal",
];

const PRICE_CANDIDATES: &[&str] = &["span.a-offscreen"];
const RATING_CANDIDATES: &[&str] = &["span.a-icon-alt"];

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| ScrapeError::Selector {
        selector: s.to_string(),
        message: e.to_string(),
    })
}

fn parse_all(candidates: &[&str]) -> Result<Vec<Selector>> {
    candidates.iter().map(|s| parse_selector(s)).collect()
}

/// Compiled selectors for a search-results page.
#[derive(Debug)]
struct ListingSelectors {
    container: Selector,
    title: Vec<Selector>,
    nested_link: Selector,
    link: Vec<Selector>,
    price: Vec<Selector>,
    rating: Vec<Selector>,
}

impl ListingSelectors {
    fn new() -> Result<Self> {
        Ok(Self {
            container: parse_selector(LISTING_CONTAINER)?,
            title: parse_all(TITLE_CANDIDATES)?,
            nested_link: parse_selector("a")?,
            link: parse_all(LINK_CANDIDATES)?,
            price: parse_all(PRICE_CANDIDATES)?,
            rating: parse_all(RATING_CANDIDATES)?,
        })
    }
}

// ── Parser ────────────────────────────────────────────────────────────────────

/// Extracts listing records from a search-results document.
#[derive(Debug)]
pub struct ListingParser {
    selectors: ListingSelectors,
    site_origin: String,
}

impl ListingParser {
    pub fn new(site_origin: impl Into<String>) -> Result<Self> {
        Ok(Self {
            selectors: ListingSelectors::new()?,
            site_origin: site_origin.into(),
        })
    }

    /// Every listing fragment in document order, keeping only those with a title.
    pub fn collect(&self, doc: &Html) -> Vec<ListingRecord> {
        let mut seen = 0usize;
        let records: Vec<ListingRecord> = doc
            .select(&self.selectors.container)
            .inspect(|_| seen += 1)
            .map(|fragment| self.extract(fragment))
            .filter(|rec| rec.title.is_some())
            .collect();

        debug!("{} listing fragments, {} with a title", seen, records.len());
        records
    }

    /// Build a record from one listing fragment. Fields that no selector
    /// matches keep their defaults.
    pub fn extract(&self, fragment: ElementRef<'_>) -> ListingRecord {
        ListingRecord {
            title: self.extract_title(fragment),
            price: first_text(fragment, &self.selectors.price)
                .unwrap_or_else(|| PRICE_NOT_LISTED.to_string()),
            rating: first_text(fragment, &self.selectors.rating),
            url: self.extract_link(fragment),
        }
    }

    fn extract_title(&self, fragment: ElementRef<'_>) -> Option<String> {
        self.selectors.title.iter().find_map(|sel| {
            let node = fragment.select(sel).next()?;
            // A title wrapping a link takes its text from the link.
            let node = node.select(&self.selectors.nested_link).next().unwrap_or(node);
            non_empty(node_text(node, ""))
        })
    }

    fn extract_link(&self, fragment: ElementRef<'_>) -> Option<String> {
        let href = self.selectors.link.iter().find_map(|sel| {
            fragment
                .select(sel)
                .next()
                .and_then(|a| a.value().attr("href"))
        })?;
        // Prefixed unconditionally, absolute hrefs included.
        Some(format!("{}{}", self.site_origin, href))
    }
}

fn first_text(fragment: ElementRef<'_>, candidates: &[Selector]) -> Option<String> {
    candidates.iter().find_map(|sel| {
        let node = fragment.select(sel).next()?;
        non_empty(node_text(node, ""))
    })
}

/// Parse raw page bytes and collect its listings.
pub fn parse_listing_page(parser: &ListingParser, bytes: &[u8]) -> Vec<ListingRecord> {
    let html = String::from_utf8_lossy(bytes);
    let doc = Html::parse_document(&html);
    parser.collect(&doc)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> ListingParser {
        ListingParser::new("https://www.amazon.com").unwrap()
    }

    fn page(fragments: &[&str]) -> Html {
        let body: String = fragments
            .iter()
            .map(|f| format!(r#"<div data-component-type="s-search-result">{f}</div>"#))
            .collect();
        Html::parse_document(&format!("<html><body>{body}</body></html>"))
    }

    #[test]
    fn test_h2_fallback_missing_price_relative_link() {
        let doc = page(&[r#"
            <h2>Compact Air Fryer</h2>
            <span class="a-icon-alt">4.0 out of 5 stars</span>
            <a class="a-link-normal s-no-outline" href="/dp/ABC123">img</a>
        "#]);

        let records = parser().collect(&doc);
        assert_eq!(
            records,
            vec![ListingRecord {
                title: Some("Compact Air Fryer".into()),
                price: "Not Listed".into(),
                rating: Some("4.0 out of 5 stars".into()),
                url: Some("https://www.amazon.com/dp/ABC123".into()),
            }]
        );
    }

    #[test]
    fn test_title_prefers_specific_span_and_nested_link() {
        let doc = page(&[r#"
            <h2 class="a-size-medium a-color-base a-text-normal"><a href="/x"><span>Linked Title</span></a></h2>
            <span class="a-size-medium a-color-base a-text-normal"> Span <a href="/y">Inner Link</a></span>
            <span class="a-price"><span class="a-offscreen">$24.99</span></span>
        "#]);

        let records = parser().collect(&doc);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title.as_deref(), Some("Inner Link"));
        assert_eq!(records[0].price, "$24.99");
        assert_eq!(records[0].url, None);
    }

    #[test]
    fn test_empty_first_candidate_falls_through() {
        let doc = page(&[r#"
            <span class="a-size-base-plus a-color-base a-text-normal">   </span>
            <h2><a class="a-link-normal s-underline-text s-underline-link-text s-link-style a-text-normal" href="/dp/Z9">Toaster</a></h2>
        "#]);

        let records = parser().collect(&doc);
        assert_eq!(records[0].title.as_deref(), Some("Toaster"));
        assert_eq!(records[0].url.as_deref(), Some("https://www.amazon.com/dp/Z9"));
    }

    #[test]
    fn test_untitled_fragments_are_dropped_in_order() {
        let doc = page(&[
            "<h2>First</h2>",
            r#"<span class="a-offscreen">$5.00</span>"#,
            "<h2>Third</h2>",
        ]);

        let p = parser();
        let untitled = doc.select(&p.selectors.container).nth(1).unwrap();
        assert_eq!(p.extract(untitled).title, None);

        let titles: Vec<_> = p
            .collect(&doc)
            .into_iter()
            .map(|r| r.title.unwrap())
            .collect();
        assert_eq!(titles, vec!["First", "Third"]);
    }

    #[test]
    fn test_absolute_href_is_still_prefixed() {
        let doc = page(&[
            r#"<h2>Blender</h2><a class="a-link-normal s-no-outline" href="https://www.amazon.com/dp/B1">x</a>"#,
        ]);
        let records = parser().collect(&doc);
        assert_eq!(
            records[0].url.as_deref(),
            Some("https://www.amazon.comhttps://www.amazon.com/dp/B1")
        );
    }

    #[test]
    fn test_no_fragments_yields_empty() {
        let records = parse_listing_page(&parser(), b"<html><body><p>Robot check</p></body></html>");
        assert!(records.is_empty());
    }
}
