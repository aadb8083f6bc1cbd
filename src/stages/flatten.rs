//! Flatten stage: nested API records to fixed-column CSV rows.
//!
//! Each record becomes one row. List values are joined with `", "`, nested
//! `item` fields are lifted into `item_*` columns, and only the first image
//! URL is kept.

use crate::dataset::{Dataset, Row};
use crate::error::{EtlError, Result};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

/// Output columns, in order.
pub const COLUMNS: [&str; 19] = [
    "id",
    "title",
    "date",
    "description",
    "digitized",
    "language",
    "subject",
    "location_city",
    "location_state",
    "location_country",
    "image_url",
    "url",
    "item_date_issued",
    "item_created_published",
    "item_medium",
    "item_language",
    "item_newspaper_title",
    "item_lccn",
    "item_place_of_publication",
];

/// Text form of a JSON value as written into a cell.
fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(cell_text).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}

/// `obj[key]` as cell text; `""` when the key is missing.
pub fn safe_get(obj: &Value, key: &str) -> String {
    obj.get(key).map(cell_text).unwrap_or_default()
}

/// `obj[parent][key]` as cell text; `""` when either level is missing or
/// `parent` is not an object.
pub fn safe_get_nested(obj: &Value, parent: &str, key: &str) -> String {
    match obj.get(parent) {
        Some(nested @ Value::Object(_)) => safe_get(nested, key),
        _ => String::new(),
    }
}

fn flatten_record(item: &Value) -> Row {
    let image_url = safe_get(item, "image_url");
    let first_image = image_url.split(", ").next().unwrap_or_default().to_string();

    Row::from_values([
        safe_get(item, "id"),
        safe_get(item, "title"),
        safe_get(item, "date"),
        safe_get(item, "description"),
        safe_get(item, "digitized"),
        safe_get(item, "language"),
        safe_get(item, "subject"),
        safe_get(item, "location_city"),
        safe_get(item, "location_state"),
        safe_get(item, "location_country"),
        first_image,
        safe_get(item, "url"),
        safe_get_nested(item, "item", "date_issued"),
        safe_get_nested(item, "item", "created_published"),
        safe_get_nested(item, "item", "medium"),
        safe_get_nested(item, "item", "language"),
        safe_get_nested(item, "item", "newspaper_title"),
        safe_get_nested(item, "item", "library_of_congress_control_number"),
        safe_get_nested(item, "item", "place_of_publication"),
    ])
}

/// Flatten every object in `records`. Non-object entries are skipped.
pub fn flatten_records(records: &[Value]) -> Dataset {
    let header = COLUMNS.iter().map(|c| c.to_string()).collect();
    let mut dataset = Dataset::new(header, Vec::new());
    for (index, record) in records.iter().enumerate() {
        if !record.is_object() {
            warn!(index, "Skipping record that is not a JSON object");
            continue;
        }
        dataset.push(flatten_record(record));
    }
    dataset
}

/// Read a raw JSON array from `input` and write the flattened CSV to `output`.
#[instrument(level = "info", skip_all, fields(input = %input.display(), output = %output.display()))]
pub fn flatten_json(input: &Path, output: &Path) -> Result<PathBuf> {
    let text = fs::read_to_string(input).map_err(|e| EtlError::source_unavailable(input, e))?;
    let data: Value =
        serde_json::from_str(&text).map_err(|e| EtlError::source_unavailable(input, e))?;
    let Value::Array(records) = data else {
        return Err(EtlError::InvalidInput(format!(
            "{}: input JSON should be a list of objects",
            input.display()
        )));
    };

    let dataset = flatten_records(&records);
    dataset.write_path(output)?;
    info!(rows = dataset.len(), "CSV created");
    Ok(output.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_safe_get_simple_value() {
        assert_eq!(safe_get(&json!({"title": "Newspaper"}), "title"), "Newspaper");
    }

    #[test]
    fn test_safe_get_missing_key() {
        assert_eq!(safe_get(&json!({}), "title"), "");
    }

    #[test]
    fn test_safe_get_list() {
        assert_eq!(safe_get(&json!({"subject": ["news", "alaska"]}), "subject"), "news, alaska");
    }

    #[test]
    fn test_safe_get_empty_list() {
        assert_eq!(safe_get(&json!({"subject": []}), "subject"), "");
    }

    #[test]
    fn test_safe_get_scalars() {
        assert_eq!(safe_get(&json!({"digitized": true}), "digitized"), "true");
        assert_eq!(safe_get(&json!({"n": 4}), "n"), "4");
        assert_eq!(safe_get(&json!({"n": null}), "n"), "");
    }

    #[test]
    fn test_safe_get_nested_simple() {
        assert_eq!(safe_get_nested(&json!({"item": {"language": "eng"}}), "item", "language"), "eng");
    }

    #[test]
    fn test_safe_get_nested_list() {
        let obj = json!({"item": {"language": ["eng", "spa"]}});
        assert_eq!(safe_get_nested(&obj, "item", "language"), "eng, spa");
    }

    #[test]
    fn test_safe_get_nested_missing_key() {
        assert_eq!(safe_get_nested(&json!({"item": {}}), "item", "language"), "");
    }

    #[test]
    fn test_safe_get_nested_missing_parent() {
        assert_eq!(safe_get_nested(&json!({}), "item", "language"), "");
        assert_eq!(safe_get_nested(&json!({"item": "flat"}), "item", "language"), "");
    }

    fn sample() -> Value {
        json!([{
            "id": "123",
            "title": "Test Title",
            "date": "1900-01-01",
            "description": ["desc"],
            "digitized": true,
            "language": ["english"],
            "subject": ["news"],
            "location_city": ["juneau"],
            "location_state": ["alaska"],
            "location_country": ["usa"],
            "image_url": ["http://image.com/img.jpg", "http://image.com/big.jpg"],
            "url": "http://loc/id/123",
            "item": {
                "date_issued": "1900-01-01",
                "created_published": ["Juneau"],
                "medium": "4 pages",
                "language": ["eng"],
                "newspaper_title": ["Daily News"],
                "library_of_congress_control_number": "sn12345",
                "place_of_publication": "Juneau, Alaska"
            }
        }])
    }

    #[test]
    fn test_flatten_records_columns() {
        let Value::Array(records) = sample() else { unreachable!() };
        let ds = flatten_records(&records);
        assert_eq!(ds.len(), 1);
        let row = &ds.rows()[0];
        let get = |c: &str| row.get(ds.position(c).unwrap()).unwrap();
        assert_eq!(get("id"), "123");
        assert_eq!(get("title"), "Test Title");
        assert_eq!(get("language"), "english");
        assert_eq!(get("item_language"), "eng");
        assert_eq!(get("item_newspaper_title"), "Daily News");
        assert_eq!(get("item_lccn"), "sn12345");
        assert_eq!(get("image_url"), "http://image.com/img.jpg");
        assert_eq!(get("item_place_of_publication"), "Juneau, Alaska");
    }

    #[test]
    fn test_flatten_json_creates_valid_csv() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("sample_raw.json");
        fs::write(&input, sample().to_string()).unwrap();
        let output = dir.path().join("processed").join("sample.csv");

        let path = flatten_json(&input, &output).unwrap();
        assert!(path.exists());

        let ds = Dataset::read_path(&path).unwrap();
        assert_eq!(ds.header().len(), COLUMNS.len());
        assert_eq!(ds.len(), 1);
        let lccn = ds.position("item_lccn").unwrap();
        assert_eq!(ds.rows()[0].get(lccn), Some("sn12345"));
    }

    #[test]
    fn test_flatten_json_rejects_non_list() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("obj_raw.json");
        fs::write(&input, r#"{"results": []}"#).unwrap();
        let err = flatten_json(&input, &dir.path().join("out.csv")).unwrap_err();
        assert!(matches!(err, EtlError::InvalidInput(_)));
    }

    #[test]
    fn test_non_object_records_skipped() {
        let ds = flatten_records(&[json!("stray"), json!({"id": "1"})]);
        assert_eq!(ds.len(), 1);
    }
}
