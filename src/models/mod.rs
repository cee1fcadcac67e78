use serde::{Deserialize, Serialize};

/// Price written when a listing shows no price.
pub const PRICE_NOT_LISTED: &str = "Not Listed";

/// A row type with a fixed column order, as written by `storage`.
pub trait Tabular {
    const HEADERS: &'static [&'static str];

    /// Cell values in `HEADERS` order; `None` is written as an empty cell.
    fn cells(&self) -> Vec<Option<String>>;
}

// ── Listing ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListingRecord {
    pub title: Option<String>,
    #[serde(default = "default_price")]
    pub price: String, // display form, e.g. "$19.99"
    pub rating: Option<String>, // e.g. "4.5 out of 5 stars"
    pub url: Option<String>,
}

fn default_price() -> String {
    PRICE_NOT_LISTED.to_string()
}

impl Default for ListingRecord {
    fn default() -> Self {
        Self {
            title: None,
            price: default_price(),
            rating: None,
            url: None,
        }
    }
}

impl Tabular for ListingRecord {
    const HEADERS: &'static [&'static str] = &["title", "price", "rating", "url"];

    fn cells(&self) -> Vec<Option<String>> {
        vec![
            self.title.clone(),
            Some(self.price.clone()),
            self.rating.clone(),
            self.url.clone(),
        ]
    }
}

// ── Job ───────────────────────────────────────────────────────────────────────

/// One cleaned job posting, flattened for a spreadsheet.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct JobRecord {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub job_type: String, // comma-joined, "" when the actor gave none
    pub rating: Option<String>,
    pub reviews: Option<String>,
    pub posted: Option<String>,
    pub apply_link: Option<String>,
    pub description: String,
}

impl Tabular for JobRecord {
    const HEADERS: &'static [&'static str] = &[
        "Job Title",
        "Company",
        "Location",
        "Salary",
        "Job Type",
        "Rating",
        "Reviews",
        "Posted",
        "Apply Link",
        "Description",
    ];

    fn cells(&self) -> Vec<Option<String>> {
        vec![
            self.title.clone(),
            self.company.clone(),
            self.location.clone(),
            self.salary.clone(),
            Some(self.job_type.clone()),
            self.rating.clone(),
            self.reviews.clone(),
            self.posted.clone(),
            self.apply_link.clone(),
            Some(self.description.clone()),
        ]
    }
}

// ── Raw actor dataset item ────────────────────────────────────────────────────

/// A dataset item as the job actor returns it. Everything is optional;
/// `rating` and `reviewsCount` arrive as numbers or strings depending on the
/// actor version.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawJobItem {
    pub position_name: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub salary: Option<String>,
    #[serde(default)]
    pub job_type: Option<Vec<String>>,
    pub rating: Option<serde_json::Value>,
    pub reviews_count: Option<serde_json::Value>,
    pub posted_at: Option<String>,
    pub external_apply_link: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "descriptionHTML")]
    pub description_html: Option<String>,
}
