//! Export and import formats
//!
//! Links export as a JSON document, CSV or a static HTML page. Every format
//! labels each link Bidirectional or Single, judged against the full store
//! even when only a selection is exported.
//!
//! Imports accept the JSON document. The top-level shape is checked here;
//! individual records are checked one at a time by
//! [`LinkStore::import_merge`](crate::store::LinkStore::import_merge), which
//! skips the bad ones.

use std::fmt::Write as _;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::models::Link;
use crate::pairing::{kind_of, LinkKind};

/// Version written into exported documents
pub const EXPORT_VERSION: &str = "1.0";

const CSV_HEADER: &str = "ID,Title,URL,Icon,Source URL,Type,Created";

/// Output format of an export
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
    Html,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Html => "html",
        }
    }

    /// File name for an export made on `date`, e.g. `jumpmarks-2024-06-01.csv`
    pub fn file_name(&self, date: DateTime<Utc>) -> String {
        format!("jumpmarks-{}.{}", date.format("%Y-%m-%d"), self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            "html" | "htm" => Ok(ExportFormat::Html),
            other => Err(format!(
                "unknown format '{}' (expected json, csv or html)",
                other
            )),
        }
    }
}

/// Counts written alongside exported links
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportMetadata {
    pub total_count: usize,
    pub bidirectional_count: usize,
    pub single_count: usize,
    pub app_version: String,
}

/// Exported JSON document
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub version: String,
    pub export_date: DateTime<Utc>,
    pub jumpmarks: Vec<Link>,
    pub metadata: ExportMetadata,
}

impl ExportDocument {
    /// Build a document for `selection`, classifying pairs against `all`
    pub fn new(selection: Vec<Link>, all: &[Link]) -> Self {
        let bidirectional_count = selection
            .iter()
            .filter(|link| kind_of(link, all) == LinkKind::Bidirectional)
            .count();

        Self {
            version: EXPORT_VERSION.to_string(),
            export_date: Utc::now(),
            metadata: ExportMetadata {
                total_count: selection.len(),
                bidirectional_count,
                single_count: selection.len() - bidirectional_count,
                app_version: env!("CARGO_PKG_VERSION").to_string(),
            },
            jumpmarks: selection,
        }
    }

    /// Pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Storage(e.into()))
    }
}

/// Render `selection` in `format`
pub fn render(format: ExportFormat, selection: &[Link], all: &[Link]) -> Result<String> {
    match format {
        ExportFormat::Json => ExportDocument::new(selection.to_vec(), all).to_json(),
        ExportFormat::Csv => Ok(to_csv(selection, all)),
        ExportFormat::Html => Ok(to_html(selection, all, Utc::now())),
    }
}

/// CSV with a header row, one line per link
pub fn to_csv(selection: &[Link], all: &[Link]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');

    for link in selection {
        let created = timestamp(link.created);
        let row = [
            link.id.as_str(),
            link.title.as_str(),
            link.url.as_str(),
            link.icon.as_str(),
            link.source_url.as_str(),
            kind_of(link, all).label(),
            created.as_str(),
        ];
        let fields: Vec<String> = row.iter().map(|field| csv_field(field)).collect();
        out.push_str(&fields.join(","));
        out.push('\n');
    }

    out
}

/// Quote a CSV field when it contains a comma, quote or line break
pub fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Standalone HTML page listing the links
pub fn to_html(selection: &[Link], all: &[Link], exported_at: DateTime<Utc>) -> String {
    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    out.push_str("<meta charset=\"utf-8\">\n<title>Jumpmarks</title>\n");
    out.push_str(
        "<style>\
body{font-family:sans-serif;margin:2em}\
table{border-collapse:collapse;width:100%}\
th,td{border-bottom:1px solid #ddd;padding:6px;text-align:left}\
.kind{font-size:.85em;color:#555}\
</style>\n",
    );
    out.push_str("</head>\n<body>\n<h1>Jumpmarks</h1>\n");
    let _ = writeln!(
        out,
        "<p>{} links exported {}</p>",
        selection.len(),
        escape_html(&timestamp(exported_at))
    );
    out.push_str("<table>\n<thead><tr><th></th><th>Title</th><th>Type</th><th>URL</th><th>Created</th><th>Source</th></tr></thead>\n<tbody>\n");

    for link in selection {
        let url = escape_html(&link.url);
        let _ = writeln!(
            out,
            "<tr><td>{}</td><td>{}</td><td class=\"kind\">{}</td><td><a href=\"{}\">{}</a></td><td>{}</td><td>{}</td></tr>",
            escape_html(link.display_icon()),
            escape_html(&link.title),
            kind_of(link, all).label(),
            url,
            url,
            escape_html(&timestamp(link.created)),
            escape_html(&link.source_url),
        );
    }

    out.push_str("</tbody>\n</table>\n</body>\n</html>\n");
    out
}

/// Escape text for HTML content and attribute values
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parsed import file
#[derive(Debug, Clone, PartialEq)]
pub struct ImportPayload {
    /// Raw link records, checked individually on import
    pub jumpmarks: Vec<Value>,
}

impl ImportPayload {
    /// Parse an import file
    ///
    /// The text must be a JSON object whose `jumpmarks` field is an array.
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| Error::Validation(format!("not valid JSON: {}", e)))?;

        let Value::Object(mut fields) = value else {
            return Err(Error::Validation("expected a JSON object".to_string()));
        };

        match fields.remove("jumpmarks") {
            Some(Value::Array(jumpmarks)) => Ok(Self { jumpmarks }),
            Some(_) => Err(Error::Validation("`jumpmarks` is not an array".to_string())),
            None => Err(Error::Validation("missing `jumpmarks` array".to_string())),
        }
    }
}

/// One import record that passed validation
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ImportRecord {
    pub title: String,
    pub url: String,
    pub icon: Option<String>,
    pub created: DateTime<Utc>,
    pub source_url: String,
}

impl ImportRecord {
    /// Check a raw record, returning why it is unusable on failure
    pub(crate) fn from_value(value: &Value) -> std::result::Result<Self, String> {
        let fields = value.as_object().ok_or("not an object")?;

        // The exported ID is required but replaced on import
        if !fields.get("id").is_some_and(Value::is_string) {
            return Err("missing id".to_string());
        }
        let url = required_str(fields, "url")?;
        if !crate::normalize::validate_url(url) {
            return Err(format!("invalid url '{}'", url));
        }
        let created = required_str(fields, "created")?;
        let created = DateTime::parse_from_rfc3339(created)
            .map_err(|e| format!("invalid created time '{}': {}", created, e))?
            .with_timezone(&Utc);

        Ok(Self {
            title: required_str(fields, "title")?.to_string(),
            url: url.to_string(),
            icon: fields
                .get("icon")
                .and_then(Value::as_str)
                .map(str::to_string),
            created,
            source_url: required_str(fields, "sourceUrl")?.to_string(),
        })
    }
}

fn required_str<'a>(fields: &'a Map<String, Value>, name: &str) -> std::result::Result<&'a str, String> {
    match fields.get(name).and_then(Value::as_str).map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(format!("missing {}", name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pair_and_single() -> Vec<Link> {
        vec![
            Link::new("B", "https://b.com", None, "a.com"),
            Link::new("← A", "https://a.com", None, "b.com"),
            Link::new("C", "https://c.com", Some("⭐"), "a.com"),
        ]
    }

    #[test]
    fn test_export_document_metadata() {
        let all = pair_and_single();
        let doc = ExportDocument::new(all.clone(), &all);

        assert_eq!(doc.version, "1.0");
        assert_eq!(doc.metadata.total_count, 3);
        assert_eq!(doc.metadata.bidirectional_count, 2);
        assert_eq!(doc.metadata.single_count, 1);

        let value: Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();
        assert!(value.get("exportDate").is_some());
        assert_eq!(value["metadata"]["totalCount"], 3);
        assert_eq!(value["jumpmarks"][0]["sourceUrl"], "a.com");
    }

    #[test]
    fn test_selection_is_classified_against_full_store() {
        let all = pair_and_single();
        let doc = ExportDocument::new(vec![all[0].clone()], &all);

        assert_eq!(doc.metadata.total_count, 1);
        assert_eq!(doc.metadata.bidirectional_count, 1);

        let csv = to_csv(&all[..1], &all);
        assert!(csv.lines().nth(1).unwrap().contains(",Bidirectional,"));
    }

    #[test]
    fn test_exported_document_imports_back() {
        let all = pair_and_single();
        let json = ExportDocument::new(all.clone(), &all).to_json().unwrap();

        let payload = ImportPayload::parse(&json).unwrap();
        assert_eq!(payload.jumpmarks.len(), 3);

        let record = ImportRecord::from_value(&payload.jumpmarks[2]).unwrap();
        assert_eq!(record.title, "C");
        assert_eq!(record.icon.as_deref(), Some("⭐"));
        assert_eq!(record.created, all[2].created);
    }

    #[test]
    fn test_csv_header_and_quoting() {
        let mut link = Link::new("Say \"hi\", world", "https://b.com/?a=1,2", None, "a.com");
        link.id = "id-1".to_string();
        let csv = to_csv(&[link.clone()], &[link]);

        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some(CSV_HEADER));
        let row = lines.next().unwrap();
        assert!(row.starts_with("id-1,\"Say \"\"hi\"\", world\",\"https://b.com/?a=1,2\",🔗,a.com,Single,"));
    }

    #[test]
    fn test_csv_field() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("line\nbreak"), "\"line\nbreak\"");
        assert_eq!(csv_field("cr\rhere"), "\"cr\rhere\"");
        assert_eq!(csv_field("\"q\""), "\"\"\"q\"\"\"");
    }

    #[test]
    fn test_html_escapes_content() {
        let link = Link::new("<script>alert('x')</script>", "https://b.com/?a=1&b=2", None, "a.com");
        let html = to_html(&[link.clone()], &[link], Utc::now());

        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;"));
        assert!(html.contains("href=\"https://b.com/?a=1&amp;b=2\""));
        assert!(html.contains("1 links exported"));
    }

    #[test]
    fn test_import_payload_shape() {
        assert!(ImportPayload::parse(r#"{"jumpmarks": []}"#).unwrap().jumpmarks.is_empty());

        for bad in ["", "nope", "[1]", "42", r#"{"jumpmarks": "x"}"#, r#"{"other": []}"#] {
            assert!(
                matches!(ImportPayload::parse(bad), Err(Error::Validation(_))),
                "{}",
                bad
            );
        }
    }

    #[test]
    fn test_import_record_validation() {
        let good = json!({
            "id": "jm-1", "title": "T", "url": "https://b.com", "created": "2024-06-01T12:00:00Z",
            "sourceUrl": "a.com"
        });
        let record = ImportRecord::from_value(&good).unwrap();
        assert!(record.icon.is_none());

        let mut missing_source = good.clone();
        missing_source.as_object_mut().unwrap().remove("sourceUrl");
        assert_eq!(
            ImportRecord::from_value(&missing_source).unwrap_err(),
            "missing sourceUrl"
        );

        let mut bad_url = good.clone();
        bad_url["url"] = json!("b.com");
        assert!(ImportRecord::from_value(&bad_url).is_err());

        let mut numeric_title = good.clone();
        numeric_title["title"] = json!(7);
        assert!(ImportRecord::from_value(&numeric_title).is_err());

        let mut missing_id = good.clone();
        missing_id.as_object_mut().unwrap().remove("id");
        assert_eq!(ImportRecord::from_value(&missing_id).unwrap_err(), "missing id");

        let mut numeric_id = good;
        numeric_id["id"] = json!(12);
        assert!(ImportRecord::from_value(&numeric_id).is_err());

        assert!(ImportRecord::from_value(&json!(null)).is_err());
    }

    #[test]
    fn test_format_parsing_and_file_name() {
        assert_eq!("CSV".parse::<ExportFormat>(), Ok(ExportFormat::Csv));
        assert!("xml".parse::<ExportFormat>().is_err());

        let date = DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(ExportFormat::Html.file_name(date), "jumpmarks-2024-06-01.html");
    }
}
