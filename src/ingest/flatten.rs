use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use crate::ingest::types::FetchedPage;
use crate::models::{ArtifactBatch, ColorRow, MediaRow, MetadataRow};

// Any of these being present and non-null means the record carries media data.
const MEDIA_FIELDS: [&str; 6] = ["imagecount", "mediacount", "colorcount", "rank", "datebegin", "dateend"];

/// A record (or part of one) that could not be flattened and was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("page {page}, record {index}: {reason}")]
pub struct FlattenWarning {
    pub page: u32,
    pub index: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct Flattened {
    pub batch: ArtifactBatch,
    pub warnings: Vec<FlattenWarning>,
    pub records_seen: usize,
}

/// Rows produced by a single record, plus any per-color problems.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordRows {
    pub metadata: MetadataRow,
    pub media: Option<MediaRow>,
    pub colors: Vec<ColorRow>,
    pub skipped_colors: Vec<String>,
}

pub fn flatten_pages<'a, I>(pages: I) -> Flattened
where
    I: IntoIterator<Item = &'a FetchedPage>,
{
    let mut out = Flattened::default();

    for page in pages {
        for (index, record) in page.body.records.iter().enumerate() {
            out.records_seen += 1;
            match flatten_record(record) {
                Ok(rows) => {
                    for reason in rows.skipped_colors {
                        push_warning(&mut out.warnings, page.number, index, reason);
                    }
                    out.batch.metadata.push(rows.metadata);
                    if let Some(media) = rows.media {
                        out.batch.media.push(media);
                    }
                    out.batch.colors.extend(rows.colors);
                }
                Err(reason) => push_warning(&mut out.warnings, page.number, index, reason),
            }
        }
    }

    out
}

fn push_warning(warnings: &mut Vec<FlattenWarning>, page: u32, index: usize, reason: String) {
    let warning = FlattenWarning { page, index, reason };
    warn!("Skipping: {}", warning);
    warnings.push(warning);
}

pub fn flatten_record(record: &Value) -> Result<RecordRows, String> {
    let obj = record.as_object().ok_or_else(|| "record is not a JSON object".to_string())?;
    let id = object_id(obj).ok_or_else(|| "record has no usable object id".to_string())?;

    let metadata = MetadataRow {
        id,
        title: text(obj, "title"),
        culture: text(obj, "culture"),
        period: text(obj, "period"),
        century: text(obj, "century"),
        medium: text(obj, "medium"),
        dimensions: text(obj, "dimensions"),
        description: text(obj, "description"),
        department: text(obj, "department"),
        classification: text(obj, "classification"),
        dated: text(obj, "dated"),
        accessionyear: int(obj, "accessionyear"),
        accessionmethod: text(obj, "accessionmethod"),
    };

    let media = MEDIA_FIELDS.iter().any(|f| present(obj, f)).then(|| MediaRow {
        objectid: id,
        imagecount: int(obj, "imagecount"),
        mediacount: int(obj, "mediacount"),
        colorcount: int(obj, "colorcount"),
        rank: int(obj, "rank"),
        datebegin: int(obj, "datebegin"),
        dateend: int(obj, "dateend"),
    });

    let mut colors = Vec::new();
    let mut skipped_colors = Vec::new();
    match obj.get("colors") {
        None | Some(Value::Null) => {}
        Some(Value::Array(entries)) => {
            for (i, entry) in entries.iter().enumerate() {
                match entry.as_object() {
                    Some(c) => colors.push(ColorRow {
                        objectid: id,
                        color: text(c, "color"),
                        spectrum: text(c, "spectrum"),
                        hue: text(c, "hue"),
                        percent: real(c, "percent"),
                        css3: text(c, "css3"),
                    }),
                    None => skipped_colors.push(format!("color entry {} of object {} is not an object", i, id)),
                }
            }
        }
        Some(_) => skipped_colors.push(format!("colors of object {} is not a list", id)),
    }

    Ok(RecordRows { metadata, media, colors, skipped_colors })
}

fn object_id(obj: &Map<String, Value>) -> Option<i64> {
    ["id", "objectid"].iter().find_map(|key| obj.get(*key).and_then(as_int))
}

fn present(obj: &Map<String, Value>, key: &str) -> bool {
    obj.get(key).is_some_and(|v| !v.is_null())
}

fn as_int(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn text(obj: &Map<String, Value>, key: &str) -> String {
    match obj.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn int(obj: &Map<String, Value>, key: &str) -> i64 {
    obj.get(key).and_then(as_int).unwrap_or(0)
}

fn real(obj: &Map<String, Value>, key: &str) -> f64 {
    match obj.get(key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::client::tests::{fake_record, FakeSource};
    use crate::ingest::client::pages;
    use crate::ingest::types::{ObjectPage, PageRange};
    use serde_json::json;

    fn page(number: u32, records: Vec<Value>) -> FetchedPage {
        FetchedPage { number, body: ObjectPage { info: Default::default(), records } }
    }

    #[test]
    fn test_one_row_per_color_entry() {
        let rows = flatten_record(&fake_record(42, "Dept", 3)).unwrap();
        assert_eq!(rows.metadata.id, 42);
        assert_eq!(rows.metadata.culture, "Byzantine");
        assert_eq!(rows.colors.len(), 3);
        assert!(rows.colors.iter().all(|c| c.objectid == 42));
        let media = rows.media.unwrap();
        assert_eq!(media.objectid, 42);
        assert_eq!(media.datebegin, 1500);
    }

    #[test]
    fn test_media_row_omitted_without_media_fields() {
        let record = json!({ "id": 5, "title": "Bare", "rank": null, "colors": [] });
        let rows = flatten_record(&record).unwrap();
        assert!(rows.media.is_none());
        assert!(rows.colors.is_empty());
        assert_eq!(rows.metadata.title, "Bare");
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let record = json!({
            "objectid": "17",
            "title": null,
            "accessionyear": "1943",
            "imagecount": 2,
            "colors": [{ "hue": "Red" }]
        });
        let rows = flatten_record(&record).unwrap();
        assert_eq!(rows.metadata.id, 17);
        assert_eq!(rows.metadata.title, "");
        assert_eq!(rows.metadata.accessionyear, 1943);
        let media = rows.media.unwrap();
        assert_eq!(media.imagecount, 2);
        assert_eq!(media.rank, 0);
        assert_eq!(rows.colors[0].percent, 0.0);
        assert_eq!(rows.colors[0].css3, "");
    }

    #[test]
    fn test_bad_records_are_skipped_not_fatal() {
        let fetched = page(
            4,
            vec![
                json!("not an object"),
                json!({ "title": "no id" }),
                json!({ "id": 9, "colors": ["junk", { "hue": "Blue" }] }),
                json!({ "id": 10, "colors": "junk" }),
            ],
        );
        let out = flatten_pages([&fetched]);

        assert_eq!(out.records_seen, 4);
        assert_eq!(out.batch.metadata.len(), 2);
        assert_eq!(out.batch.colors.len(), 1);
        assert_eq!(out.warnings.len(), 4);
        assert_eq!(out.warnings[0].page, 4);
        assert_eq!(out.warnings[0].index, 0);
        assert_eq!(out.warnings[1].index, 1);
    }

    #[test]
    fn test_two_page_scenario_counts() {
        let source = FakeSource::new(10, 2);
        let fetched: Vec<FetchedPage> = pages(&source, "Paintings", PageRange::new(1, 2).unwrap())
            .collect::<Result<_, _>>()
            .unwrap();
        let out = flatten_pages(&fetched);

        assert_eq!(out.batch.metadata.len(), 20);
        assert!(out.batch.media.len() <= 20);
        assert_eq!(out.batch.colors.len(), 40);
        assert!(out.warnings.is_empty());
        // Ordering follows page then record order.
        let ids: Vec<i64> = out.batch.metadata.iter().map(|m| m.id).collect();
        assert_eq!(ids, (1..=20).collect::<Vec<_>>());
    }
}
