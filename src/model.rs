use serde::{Deserialize, Serialize};

/// One listing row, before detail-page enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRecord {
    pub year: String,
    pub serial: String,
    pub category: String,
    pub subject: String,
    pub subject_url: Option<String>,
}

/// A labeled hyperlink (attachment or related URL).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRef {
    pub label: String,
    pub url: String,
}

/// Fields extracted from one detail page. Rows absent from the page stay
/// `None`; the link lists stay empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailRecord {
    pub law_year: Option<i32>,
    pub law_year_label: Option<String>,
    pub issuer: Option<String>,
    pub date: Option<String>,
    pub document_number: Option<String>,
    pub article_number: Option<String>,
    pub subject: Option<String>,
    pub content: Option<String>,
    pub deadline: Option<String>,
    pub attachments: Vec<LinkRef>,
    pub related_links: Vec<LinkRef>,
}

/// A listing row merged with its detail fields; one entry of the dataset
/// artifact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoticeRecord {
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub serial: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub law_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub law_year_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
    #[serde(default)]
    pub attachments: Vec<LinkRef>,
    #[serde(default)]
    pub related_links: Vec<LinkRef>,
}

impl NoticeRecord {
    /// Merge detail fields onto a listing row. The detail subject wins only
    /// when the detail page actually provided one.
    pub fn merge(summary: SummaryRecord, detail: DetailRecord) -> Self {
        Self {
            year: summary.year,
            serial: summary.serial,
            category: summary.category,
            subject: detail.subject.unwrap_or(summary.subject),
            subject_url: summary.subject_url,
            law_year: detail.law_year,
            law_year_label: detail.law_year_label,
            issuer: detail.issuer,
            date: detail.date,
            document_number: detail.document_number,
            article_number: detail.article_number,
            content: detail.content,
            deadline: detail.deadline,
            attachments: detail.attachments,
            related_links: detail.related_links,
        }
    }
}

/// The hand-off artifact written once per crawl run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub documents: Vec<NoticeRecord>,
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_records: Option<u64>,
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> SummaryRecord {
        SummaryRecord {
            year: "113".into(),
            serial: "113001".into(),
            category: "法規公告".into(),
            subject: "listing subject".into(),
            subject_url: Some("https://www.kaa.org.tw/law_view.php?id=1".into()),
        }
    }

    #[test]
    fn merge_keeps_listing_subject_when_detail_has_none() {
        let merged = NoticeRecord::merge(summary(), DetailRecord::default());
        assert_eq!(merged.subject, "listing subject");
        assert_eq!(merged.serial, "113001");
        assert!(merged.attachments.is_empty());
    }

    #[test]
    fn merge_prefers_detail_subject() {
        let detail = DetailRecord {
            subject: Some("detail subject".into()),
            issuer: Some("內政部".into()),
            ..DetailRecord::default()
        };
        let merged = NoticeRecord::merge(summary(), detail);
        assert_eq!(merged.subject, "detail subject");
        assert_eq!(merged.issuer.as_deref(), Some("內政部"));
    }

    #[test]
    fn artifact_fields_are_camel_case() {
        let record = NoticeRecord::merge(
            summary(),
            DetailRecord {
                document_number: Some("國署建管字第1130012345號".into()),
                ..DetailRecord::default()
            },
        );
        let dataset = Dataset {
            documents: vec![record],
            updated_at: "2024-06-10T00:00:00Z".into(),
            total_records: Some(1),
        };
        let value = serde_json::to_value(&dataset).unwrap();
        assert!(value.get("updatedAt").is_some());
        assert!(value.get("totalRecords").is_some());
        let doc = &value["documents"][0];
        assert!(doc.get("subjectUrl").is_some());
        assert!(doc.get("documentNumber").is_some());
        assert!(doc.get("relatedLinks").is_some());
        // absent optionals are omitted, not null
        assert!(doc.get("articleNumber").is_none());
    }

    #[test]
    fn dataset_total_records_is_optional_on_load() {
        let payload = r#"{"documents":[],"updatedAt":"2024-06-10T00:00:00Z"}"#;
        let dataset: Dataset = serde_json::from_str(payload).unwrap();
        assert_eq!(dataset.total_records, None);
    }
}
