use regex::Regex;
use scraper::{ElementRef, Html};
use std::sync::LazyLock;

// ── Node text ─────────────────────────────────────────────────────────────────

/// Text of every descendant text node, each trimmed, empties dropped, joined
/// with `sep`.
pub fn node_text(el: ElementRef<'_>, sep: &str) -> String {
    join_stripped(el.text(), sep)
}

fn join_stripped<'a>(parts: impl Iterator<Item = &'a str>, sep: &str) -> String {
    parts
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}

/// Flatten an HTML fragment (job descriptions) to single-spaced plain text.
pub fn html_to_text(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }
    let frag = Html::parse_fragment(html);
    join_stripped(frag.root_element().text(), " ")
}

pub fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}

// ── Numeric coercion (dashboard) ─────────────────────────────────────────────

/// Parse a display price: drop `$` and thousands separators, then read a number.
/// "$1,234.56" → 1234.56 | "Not Listed" → None
pub fn parse_price(s: &str) -> Option<f64> {
    let cleaned = s.replace(['$', ','], "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

static RATING_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(\d+\.\d)").ok());

/// First `d.d` number in a rating string.
/// "4.3 out of 5 stars" → 4.3 | "5 out of 5 stars" → None
pub fn parse_rating(s: &str) -> Option<f64> {
    let re = RATING_RE.as_ref()?;
    re.captures(s)?.get(1)?.as_str().parse().ok()
}

/// Render a JSON scalar the way a spreadsheet cell would show it.
pub fn json_scalar_text(v: &serde_json::Value) -> Option<String> {
    match v {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => non_empty(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Selector;

    #[test]
    fn test_node_text_strips_and_joins() {
        let doc = Html::parse_fragment("<h2>\n  <span> Smart </span><span>Kettle\n</span></h2>");
        let h2 = doc.select(&Selector::parse("h2").unwrap()).next().unwrap();
        assert_eq!(node_text(h2, ""), "SmartKettle");
        assert_eq!(node_text(h2, " "), "Smart Kettle");
    }

    #[test]
    fn test_html_to_text() {
        let html = "<div><p>Build <b>data</b> pipelines.</p>\n<ul><li>Rust</li><li>SQL</li></ul></div>";
        assert_eq!(html_to_text(html), "Build data pipelines. Rust SQL");
        assert_eq!(html_to_text(""), "");
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("$19.99"), Some(19.99));
        assert_eq!(parse_price("$1,234.50"), Some(1234.5));
        assert_eq!(parse_price("Not Listed"), None);
        assert_eq!(parse_price(""), None);
        assert_eq!(parse_price("nan"), None);
    }

    #[test]
    fn test_parse_rating() {
        assert_eq!(parse_rating("4.3 out of 5 stars"), Some(4.3));
        assert_eq!(parse_rating("5 out of 5 stars"), None);
        assert_eq!(parse_rating(""), None);
    }

    #[test]
    fn test_json_scalar_text() {
        assert_eq!(json_scalar_text(&serde_json::json!(3.5)).as_deref(), Some("3.5"));
        assert_eq!(json_scalar_text(&serde_json::json!(" 120 ")).as_deref(), Some("120"));
        assert_eq!(json_scalar_text(&serde_json::Value::Null), None);
    }
}
