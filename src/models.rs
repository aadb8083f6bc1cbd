//! Data models for API pages and newspaper issue fields.
//!
//! - [`LocPage`]: one page of search results from the Library of Congress JSON API
//! - [`Field`]: the known issue columns and the rule groups they belong to
//!
//! Records inside a page are kept as raw [`serde_json::Value`]s; only the
//! flattener looks inside them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A single page returned by `https://www.loc.gov/<collection>/?fo=json`.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct LocPage {
    /// Search results on this page.
    #[serde(default)]
    pub results: Vec<Value>,
    /// Paging links; `next` is absent or null on the last page.
    #[serde(default)]
    pub pagination: Pagination,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Pagination {
    #[serde(default)]
    pub next: Option<String>,
}

/// A known issue column.
///
/// The variant names are the logical field names; [`Field::column`] gives
/// the header used in the flattened CSV files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Id,
    Title,
    Lccn,
    DateIssued,
    NewspaperTitle,
    City,
    State,
    Country,
    Description,
    Language,
    Subject,
    ImageUrl,
    Medium,
    CreatedPublished,
    PlaceOfPublication,
    ItemLanguage,
}

impl Field {
    /// Required and non-blank; checked in this order.
    pub const CRITICAL: [Field; 5] = [
        Field::Id,
        Field::Title,
        Field::Lccn,
        Field::DateIssued,
        Field::NewspaperTitle,
    ];

    /// Required together; checked in this order.
    pub const LOCATION: [Field; 3] = [Field::City, Field::State, Field::Country];

    /// Blank values are replaced with [`UNKNOWN`](crate::stages::clean::UNKNOWN).
    pub const FILLABLE: [Field; 8] = [
        Field::Description,
        Field::Language,
        Field::Subject,
        Field::ImageUrl,
        Field::Medium,
        Field::CreatedPublished,
        Field::PlaceOfPublication,
        Field::ItemLanguage,
    ];

    /// Text columns normalized to lowercase. Ids and URLs are left alone.
    pub const LOWERCASE: [Field; 12] = [
        Field::Title,
        Field::Description,
        Field::Language,
        Field::Subject,
        Field::City,
        Field::State,
        Field::Country,
        Field::Medium,
        Field::ItemLanguage,
        Field::CreatedPublished,
        Field::NewspaperTitle,
        Field::PlaceOfPublication,
    ];

    pub const ALL: [Field; 16] = [
        Field::Id,
        Field::Title,
        Field::Lccn,
        Field::DateIssued,
        Field::NewspaperTitle,
        Field::City,
        Field::State,
        Field::Country,
        Field::Description,
        Field::Language,
        Field::Subject,
        Field::ImageUrl,
        Field::Medium,
        Field::CreatedPublished,
        Field::PlaceOfPublication,
        Field::ItemLanguage,
    ];

    /// Column header in the flattened CSV.
    pub fn column(self) -> &'static str {
        match self {
            Field::Id => "id",
            Field::Title => "title",
            Field::Lccn => "item_lccn",
            Field::DateIssued => "item_date_issued",
            Field::NewspaperTitle => "item_newspaper_title",
            Field::City => "location_city",
            Field::State => "location_state",
            Field::Country => "location_country",
            Field::Description => "description",
            Field::Language => "language",
            Field::Subject => "subject",
            Field::ImageUrl => "image_url",
            Field::Medium => "item_medium",
            Field::CreatedPublished => "item_created_published",
            Field::PlaceOfPublication => "item_place_of_publication",
            Field::ItemLanguage => "item_language",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_page_deserialization() {
        let json = r#"{
            "results": [{"id": "a"}, {"id": "b"}],
            "pagination": {"next": "https://www.loc.gov/newspapers/?fo=json&sp=2"}
        }"#;
        let page: LocPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.results.len(), 2);
        assert_eq!(
            page.pagination.next.as_deref(),
            Some("https://www.loc.gov/newspapers/?fo=json&sp=2")
        );
    }

    #[test]
    fn test_last_page_has_no_next() {
        let page: LocPage =
            serde_json::from_str(r#"{"results": [], "pagination": {"next": null}}"#).unwrap();
        assert!(page.pagination.next.is_none());

        let page: LocPage = serde_json::from_str("{}").unwrap();
        assert!(page.results.is_empty());
        assert!(page.pagination.next.is_none());
    }

    #[test]
    fn test_columns_are_unique() {
        let columns: HashSet<&str> = Field::ALL.iter().map(|f| f.column()).collect();
        assert_eq!(columns.len(), Field::ALL.len());
    }

    #[test]
    fn test_lowercase_excludes_ids_and_urls() {
        assert!(!Field::LOWERCASE.contains(&Field::Id));
        assert!(!Field::LOWERCASE.contains(&Field::ImageUrl));
        assert!(!Field::LOWERCASE.contains(&Field::Lccn));
    }

    #[test]
    fn test_display_uses_column() {
        assert_eq!(Field::DateIssued.to_string(), "item_date_issued");
    }
}
