//! PageRecord - producer input
//!
//! One scraped page awaiting persistence, plus the normalized projection
//! that is handed to a [`RemoteSink`](crate::RemoteSink).

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};

/// Placeholder body sent when a page has no content
pub const EMPTY_CONTENT_PLACEHOLDER: &str = "<p>No content here.</p>";

/// Wire format of `createdAt` (`yyyy-MM-dd HH:mm:ss`)
pub const CREATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Identifier returned by the remote side for a stored page
pub type ResourceId = String;

/// Attachment descriptor linked to a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Display name (usually the file name)
    pub name: String,
    /// Where the attachment can be downloaded
    pub url: String,
}

impl Attachment {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Scraped page record (one unit of work)
///
/// Read-only once submitted. `thumbnail` and `content` may be absent; they
/// are defaulted by [`PageRecord::normalize`] before reaching a sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRecord {
    /// Category tag
    #[serde(rename = "type")]
    pub page_type: String,

    /// Unique identifier of the page
    pub url: String,

    pub title: String,

    #[serde(default)]
    pub thumbnail: Option<String>,

    #[serde(default)]
    pub content: Option<String>,

    /// Capture time in the record's reference timezone (never converted)
    #[serde(deserialize_with = "deserialize_created_at")]
    pub created_at: NaiveDateTime,

    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl PageRecord {
    /// Create a record without thumbnail, content or attachments
    pub fn new(
        page_type: impl Into<String>,
        url: impl Into<String>,
        title: impl Into<String>,
        created_at: NaiveDateTime,
    ) -> Self {
        Self {
            page_type: page_type.into(),
            url: url.into(),
            title: title.into(),
            thumbnail: None,
            content: None,
            created_at,
            attachments: Vec::new(),
        }
    }

    pub fn with_thumbnail(mut self, thumbnail: impl Into<String>) -> Self {
        self.thumbnail = Some(thumbnail.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    /// Consume the record and produce its wire-ready form
    ///
    /// Empty or missing `thumbnail` becomes `""`, empty or missing `content`
    /// becomes [`EMPTY_CONTENT_PLACEHOLDER`]. Never fails.
    pub fn normalize(self) -> NormalizedPage {
        let thumbnail = self.thumbnail.filter(|s| !s.is_empty()).unwrap_or_default();
        let content = self
            .content
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| EMPTY_CONTENT_PLACEHOLDER.to_string());

        NormalizedPage {
            page_type: self.page_type,
            url: self.url,
            title: self.title,
            thumbnail,
            content,
            created_at: format_created_at(&self.created_at),
            attachments: self.attachments,
        }
    }
}

/// Page with every optional field resolved, as sent to a sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedPage {
    #[serde(rename = "type")]
    pub page_type: String,
    pub url: String,
    pub title: String,
    pub thumbnail: String,
    pub content: String,
    /// Formatted with [`CREATED_AT_FORMAT`]
    pub created_at: String,
    #[serde(skip)]
    pub attachments: Vec<Attachment>,
}

/// Format a capture time for the wire
pub fn format_created_at(created_at: &NaiveDateTime) -> String {
    created_at.format(CREATED_AT_FORMAT).to_string()
}

/// Accepts both the wire format and ISO-8601 (`T` separator)
fn deserialize_created_at<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    NaiveDateTime::parse_from_str(&raw, CREATED_AT_FORMAT)
        .or_else(|_| raw.parse::<NaiveDateTime>())
        .map_err(|e| serde::de::Error::custom(format!("invalid createdAt '{raw}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn created_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2017, 3, 9)
            .unwrap()
            .and_hms_opt(8, 5, 7)
            .unwrap()
    }

    #[test]
    fn test_normalize_defaults_missing_fields() {
        let page = PageRecord::new("news", "http://a", "t", created_at()).normalize();

        assert_eq!(page.thumbnail, "");
        assert_eq!(page.content, EMPTY_CONTENT_PLACEHOLDER);
    }

    #[test]
    fn test_normalize_treats_empty_as_missing() {
        let page = PageRecord::new("news", "http://a", "t", created_at())
            .with_thumbnail("")
            .with_content("")
            .normalize();

        assert_eq!(page.thumbnail, "");
        assert_eq!(page.content, "<p>No content here.</p>");
    }

    #[test]
    fn test_normalize_passes_values_through() {
        let page = PageRecord::new("news", "http://a", "t", created_at())
            .with_thumbnail("http://a/thumb.png")
            .with_content("<p>body</p>")
            .with_attachments(vec![Attachment::new("a.pdf", "http://a/a.pdf")])
            .normalize();

        assert_eq!(page.thumbnail, "http://a/thumb.png");
        assert_eq!(page.content, "<p>body</p>");
        assert_eq!(page.attachments.len(), 1);
    }

    #[test]
    fn test_created_at_wire_format() {
        assert_eq!(format_created_at(&created_at()), "2017-03-09 08:05:07");
    }

    #[test]
    fn test_deserialize_both_timestamp_forms() {
        let wire = r#"{"type":"news","url":"http://a","title":"t","createdAt":"2017-03-09 08:05:07"}"#;
        let iso = r#"{"type":"news","url":"http://a","title":"t","createdAt":"2017-03-09T08:05:07"}"#;

        let a: PageRecord = serde_json::from_str(wire).unwrap();
        let b: PageRecord = serde_json::from_str(iso).unwrap();

        assert_eq!(a.created_at, created_at());
        assert_eq!(a, b);
        assert!(a.thumbnail.is_none());
        assert!(a.attachments.is_empty());
    }

    #[test]
    fn test_deserialize_rejects_bad_timestamp() {
        let bad = r#"{"type":"news","url":"http://a","title":"t","createdAt":"yesterday"}"#;
        let err = serde_json::from_str::<PageRecord>(bad).unwrap_err();
        assert!(err.to_string().contains("invalid createdAt"));
    }

    #[test]
    fn test_normalized_page_serializes_wire_names() {
        let page = PageRecord::new("news", "http://a", "t", created_at()).normalize();
        let json = serde_json::to_value(&page).unwrap();

        assert_eq!(json["type"], "news");
        assert_eq!(json["createdAt"], "2017-03-09 08:05:07");
        assert!(json.get("attachments").is_none());
    }
}
