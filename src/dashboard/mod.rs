//! Terminal dashboard over a persisted listing table: numeric coercion,
//! range filters, summary metrics and rating buckets.

use crate::models::ListingRecord;
use crate::scraper::cleaner::{parse_price, parse_rating};
use crate::utils::{bar, fmt_count};
use chrono::{DateTime, Local};
use std::fmt;
use std::io::{self, Write};
use std::time::SystemTime;

const BAR_WIDTH: usize = 40;

/// A loaded record with its coerced numeric columns.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingView {
    pub record: ListingRecord,
    pub price_num: Option<f64>,
    pub rating_num: Option<f64>,
}

impl From<ListingRecord> for ListingView {
    fn from(record: ListingRecord) -> Self {
        let price_num = parse_price(&record.price);
        let rating_num = record.rating.as_deref().and_then(parse_rating);
        Self {
            record,
            price_num,
            rating_num,
        }
    }
}

// ── Filters ───────────────────────────────────────────────────────────────────

/// Inclusive filters. Rows without a numeric price or rating are compared as 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Filters {
    pub min_price: f64,
    pub max_price: f64,
    pub min_rating: f64,
}

impl Filters {
    /// Bounds spanning every coerced price (truncated to whole units), no
    /// rating floor.
    pub fn full_range(views: &[ListingView]) -> Self {
        let prices = views.iter().filter_map(|v| v.price_num);
        let (lo, hi) = prices.fold((None, None), |(lo, hi): (Option<f64>, Option<f64>), p| {
            (Some(lo.map_or(p, |l| l.min(p))), Some(hi.map_or(p, |h| h.max(p))))
        });
        Self {
            min_price: lo.map_or(0.0, f64::trunc),
            max_price: hi.map_or(0.0, f64::trunc),
            min_rating: 0.0,
        }
    }

    pub fn with_overrides(
        self,
        min_price: Option<f64>,
        max_price: Option<f64>,
        min_rating: Option<f64>,
    ) -> Self {
        Self {
            min_price: min_price.unwrap_or(self.min_price),
            max_price: max_price.unwrap_or(self.max_price),
            min_rating: min_rating.unwrap_or(self.min_rating),
        }
    }

    pub fn matches(&self, v: &ListingView) -> bool {
        let price = v.price_num.unwrap_or(0.0);
        let rating = v.rating_num.unwrap_or(0.0);
        price >= self.min_price && price <= self.max_price && rating >= self.min_rating
    }

    pub fn apply<'a>(&self, views: &'a [ListingView]) -> Vec<&'a ListingView> {
        views.iter().filter(|v| self.matches(v)).collect()
    }
}

// ── Summary ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub mean_price: Option<f64>,
    pub mean_rating: Option<f64>,
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

pub fn summarize(views: &[&ListingView]) -> Summary {
    Summary {
        count: views.len(),
        mean_price: mean(views.iter().filter_map(|v| v.price_num)),
        mean_rating: mean(views.iter().filter_map(|v| v.rating_num)),
    }
}

// ── Rating buckets ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RatingCategory {
    Low,
    Medium,
    High,
}

impl RatingCategory {
    pub const ALL: [RatingCategory; 3] = [Self::Low, Self::Medium, Self::High];

    /// Low `[0, 2]`, Medium `(2, 3.5]`, High `(3.5, 5]`.
    pub fn from_rating(r: f64) -> Option<Self> {
        match r {
            r if (0.0..=2.0).contains(&r) => Some(Self::Low),
            r if r > 2.0 && r <= 3.5 => Some(Self::Medium),
            r if r > 3.5 && r <= 5.0 => Some(Self::High),
            _ => None,
        }
    }
}

impl fmt::Display for RatingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        })
    }
}

pub fn rating_buckets(views: &[&ListingView]) -> Vec<(RatingCategory, usize)> {
    RatingCategory::ALL
        .iter()
        .map(|&cat| {
            let n = views
                .iter()
                .filter(|v| v.rating_num.and_then(RatingCategory::from_rating) == Some(cat))
                .count();
            (cat, n)
        })
        .collect()
}

// ── Histogram ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Bin {
    pub lo: f64,
    pub hi: f64,
    pub count: usize,
}

/// Equal-width bins over `[min, max]`; the last bin is closed on the right.
pub fn histogram(values: &[f64], bins: usize) -> Vec<Bin> {
    if values.is_empty() || bins == 0 {
        return vec![];
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == min {
        return vec![Bin {
            lo: min,
            hi: max,
            count: values.len(),
        }];
    }

    let width = (max - min) / bins as f64;
    let mut out: Vec<Bin> = (0..bins)
        .map(|i| Bin {
            lo: min + width * i as f64,
            hi: min + width * (i + 1) as f64,
            count: 0,
        })
        .collect();
    for v in values {
        let idx = (((v - min) / width) as usize).min(bins - 1);
        out[idx].count += 1;
    }
    out
}

// ── Render ────────────────────────────────────────────────────────────────────

/// Where the rendered table came from.
pub struct Source<'a> {
    pub label: &'a str,
    pub modified: Option<SystemTime>,
}

pub struct RenderOptions {
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_rating: Option<f64>,
    pub histogram_bins: usize,
}

pub fn render<W: Write>(
    out: &mut W,
    rows: &[ListingRecord],
    source: &Source<'_>,
    opts: &RenderOptions,
) -> io::Result<()> {
    writeln!(out, "═══ Amazon Product Analyzer ═══")?;
    let modified = source
        .modified
        .map(|t| DateTime::<Local>::from(t).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "—".into());
    writeln!(out, "Source: {} (modified {})", source.label, modified)?;
    writeln!(out)?;

    if rows.is_empty() {
        writeln!(
            out,
            "No data found. Run `listing-scraper scrape` first to generate the data file."
        )?;
        return Ok(());
    }

    let views: Vec<ListingView> = rows.iter().cloned().map(ListingView::from).collect();
    let filters = Filters::full_range(&views).with_overrides(
        opts.min_price,
        opts.max_price,
        opts.min_rating,
    );
    let shown = filters.apply(&views);

    writeln!(
        out,
        "Filters: price ${:.0}–${:.0}, rating ≥ {:.1}",
        filters.min_price, filters.max_price, filters.min_rating
    )?;
    writeln!(out)?;

    writeln!(out, "── Product Listings ──")?;
    for v in &shown {
        writeln!(
            out,
            "• {} ({})",
            v.record.title.as_deref().unwrap_or("—"),
            v.record.url.as_deref().unwrap_or("—")
        )?;
        writeln!(
            out,
            "    {} | {}",
            v.record.price,
            v.record.rating.as_deref().unwrap_or("—")
        )?;
    }
    writeln!(out)?;

    let summary = summarize(&shown);
    writeln!(out, "── Analysis ──")?;
    writeln!(out, "Total Products : {}", fmt_count(summary.count))?;
    match summary.mean_price {
        Some(p) => writeln!(out, "Average Price  : ${:.2}", p)?,
        None => writeln!(out, "Average Price  : N/A")?,
    }
    match summary.mean_rating {
        Some(r) => writeln!(out, "Average Rating : {:.2} ★", r)?,
        None => writeln!(out, "Average Rating : N/A")?,
    }
    writeln!(out)?;

    let prices: Vec<f64> = shown.iter().filter_map(|v| v.price_num).collect();
    let bins = histogram(&prices, opts.histogram_bins);
    writeln!(out, "── Price Distribution ──")?;
    let peak = bins.iter().map(|b| b.count).max().unwrap_or(0);
    for b in &bins {
        writeln!(
            out,
            "${:>9.2} – ${:>9.2} │{} {}",
            b.lo,
            b.hi,
            bar(b.count, peak, BAR_WIDTH),
            b.count
        )?;
    }
    writeln!(out)?;

    let buckets = rating_buckets(&shown);
    let bucketed: usize = buckets.iter().map(|(_, n)| n).sum();
    let peak = buckets.iter().map(|(_, n)| *n).max().unwrap_or(0);
    writeln!(out, "── Product Count by Rating Category ──")?;
    for (cat, n) in &buckets {
        let pct = if bucketed > 0 {
            100.0 * *n as f64 / bucketed as f64
        } else {
            0.0
        };
        writeln!(
            out,
            "{:<6} │{} {} ({:.0}%)",
            cat.to_string(),
            bar(*n, peak, BAR_WIDTH),
            n,
            pct
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PRICE_NOT_LISTED;

    fn rec(title: &str, price: &str, rating: Option<&str>) -> ListingRecord {
        ListingRecord {
            title: Some(title.into()),
            price: price.into(),
            rating: rating.map(String::from),
            url: Some(format!("https://www.amazon.com/dp/{title}")),
        }
    }

    fn views() -> Vec<ListingView> {
        vec![
            rec("a", "$12.50", Some("4.5 out of 5 stars")),
            rec("b", "$1,099.00", Some("3.0 out of 5 stars")),
            rec("c", PRICE_NOT_LISTED, Some("1.5 out of 5 stars")),
            rec("d", "$40.99", None),
        ]
        .into_iter()
        .map(ListingView::from)
        .collect()
    }

    #[test]
    fn test_coercion() {
        let v = views();
        assert_eq!(v[1].price_num, Some(1099.0));
        assert_eq!(v[2].price_num, None);
        assert_eq!(v[0].rating_num, Some(4.5));
        assert_eq!(v[3].rating_num, None);
    }

    #[test]
    fn test_full_range_truncates() {
        let f = Filters::full_range(&views());
        assert_eq!(f.min_price, 12.0);
        assert_eq!(f.max_price, 1099.0);
        assert_eq!(f.min_rating, 0.0);
    }

    #[test]
    fn test_filters_treat_missing_as_zero() {
        let v = views();
        let all = Filters {
            min_price: 0.0,
            max_price: 2000.0,
            min_rating: 0.0,
        };
        assert_eq!(all.apply(&v).len(), 4);

        // The unpriced row only survives while 0 is inside the price range.
        let f = Filters { min_price: 10.0, ..all };
        let titles: Vec<_> = f.apply(&v).iter().map(|v| v.record.title.clone().unwrap()).collect();
        assert_eq!(titles, vec!["a", "b", "d"]);

        let f = Filters { min_rating: 3.0, ..all };
        let titles: Vec<_> = f.apply(&v).iter().map(|v| v.record.title.clone().unwrap()).collect();
        assert_eq!(titles, vec!["a", "b"]);
    }

    #[test]
    fn test_summary() {
        let v = views();
        let all: Vec<&ListingView> = v.iter().collect();
        let s = summarize(&all);
        assert_eq!(s.count, 4);
        assert_eq!(s.mean_price, Some((12.5 + 1099.0 + 40.99) / 3.0));
        assert_eq!(s.mean_rating, Some(3.0));

        assert_eq!(
            summarize(&[]),
            Summary {
                count: 0,
                mean_price: None,
                mean_rating: None
            }
        );
    }

    #[test]
    fn test_rating_category_edges() {
        assert_eq!(RatingCategory::from_rating(0.0), Some(RatingCategory::Low));
        assert_eq!(RatingCategory::from_rating(2.0), Some(RatingCategory::Low));
        assert_eq!(RatingCategory::from_rating(2.1), Some(RatingCategory::Medium));
        assert_eq!(RatingCategory::from_rating(3.5), Some(RatingCategory::Medium));
        assert_eq!(RatingCategory::from_rating(3.6), Some(RatingCategory::High));
        assert_eq!(RatingCategory::from_rating(5.0), Some(RatingCategory::High));
        assert_eq!(RatingCategory::from_rating(5.5), None);
    }

    #[test]
    fn test_rating_buckets() {
        let v = views();
        let all: Vec<&ListingView> = v.iter().collect();
        assert_eq!(
            rating_buckets(&all),
            vec![
                (RatingCategory::Low, 1),
                (RatingCategory::Medium, 1),
                (RatingCategory::High, 1)
            ]
        );
    }

    #[test]
    fn test_histogram() {
        let bins = histogram(&[0.0, 1.0, 9.0, 10.0], 2);
        assert_eq!(bins.len(), 2);
        assert_eq!((bins[0].count, bins[1].count), (2, 2));
        assert_eq!(histogram(&[3.0, 3.0], 5)[0].count, 2);
        assert!(histogram(&[], 5).is_empty());
    }

    #[test]
    fn test_render_empty_and_populated() {
        let source = Source {
            label: "amazon_products.csv",
            modified: None,
        };
        let opts = RenderOptions {
            min_price: None,
            max_price: None,
            min_rating: None,
            histogram_bins: 4,
        };

        let mut out = Vec::new();
        render(&mut out, &[], &source, &opts).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("No data found"));

        let rows: Vec<ListingRecord> = views().into_iter().map(|v| v.record).collect();
        let mut out = Vec::new();
        render(&mut out, &rows, &source, &opts).unwrap();
        let text = String::from_utf8(out).unwrap();
        // Default price bounds start at the cheapest priced row, so the
        // unpriced one is filtered out.
        assert!(text.contains("Total Products : 3"));
        assert!(text.contains("Average Rating : 3.75"));
        assert!(text.contains("• a (https://www.amazon.com/dp/a)"));
    }
}
