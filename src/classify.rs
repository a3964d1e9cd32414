use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::resolve_date;
use crate::model::NoticeRecord;

pub const DEADLINE_SOON_DAYS: i64 = 7;
pub const RECENT_ISSUED_DAYS: i64 = 14;
pub const ACTIVE_ISSUED_DAYS: i64 = 90;

/// How urgently a record demands attention. `Expired` is reserved for past
/// deadlines; records without any usable date (or with a long-stale issue
/// date) are `NoDeadline`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeadlineCategory {
    DueSoon,
    Active,
    Expired,
    NoDeadline,
}

impl DeadlineCategory {
    pub const ALL: [DeadlineCategory; 4] = [
        DeadlineCategory::DueSoon,
        DeadlineCategory::Active,
        DeadlineCategory::Expired,
        DeadlineCategory::NoDeadline,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DeadlineCategory::DueSoon => "due-soon",
            DeadlineCategory::Active => "active",
            DeadlineCategory::Expired => "expired",
            DeadlineCategory::NoDeadline => "no-deadline",
        }
    }
}

/// Coarse administrative region inferred from issuer/subject text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Region {
    Central,
    Kaohsiung,
    Taipei,
    NewTaipei,
    Other,
}

impl Region {
    pub const ALL: [Region; 5] = [
        Region::Central,
        Region::Kaohsiung,
        Region::Taipei,
        Region::NewTaipei,
        Region::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Region::Central => "central",
            Region::Kaohsiung => "kaohsiung",
            Region::Taipei => "taipei",
            Region::NewTaipei => "newTaipei",
            Region::Other => "other",
        }
    }
}

const COMMITTEE_KEYWORD: &str = "法規研究委員會";
const COMMITTEE_REPORT_KEYWORD: &str = "座談會工作報告";
const SCIENCE_PARK_KEYWORD: &str = "科學園區管理局";

// Ordered: central-government keywords outrank city keywords.
const REGION_RULES: &[(Region, &[&str])] = &[
    (
        Region::Central,
        &[
            "內政部",
            "國土管理署",
            "行政院",
            "經濟部",
            "中央",
            "中華民國全國建築師公會",
            "環境部",
        ],
    ),
    (Region::Kaohsiung, &["高雄"]),
    (Region::Taipei, &["臺北", "台北"]),
    (Region::NewTaipei, &["新北"]),
];

const CITY_OR_COUNTY_KEYWORDS: &[&str] = &[
    "臺北市", "台北市", "新北市", "高雄市", "臺中市", "台中市", "臺南市", "台南市",
    "基隆市", "桃園市", "新竹市", "嘉義市", "新竹縣", "苗栗縣", "彰化縣", "南投縣",
    "雲林縣", "嘉義縣", "屏東縣", "宜蘭縣", "花蓮縣", "臺東縣", "台東縣", "澎湖縣",
    "金門縣", "連江縣",
];

// Issuers whose records get flagged in the rendered view.
const PRIORITY_ISSUERS: &[&str] = &["內政部國土管理署", "內政部"];

/// First priority-issuer keyword found in the issuer text, if any.
pub fn priority_issuer(issuer: Option<&str>) -> Option<&'static str> {
    let issuer = issuer?;
    PRIORITY_ISSUERS
        .iter()
        .copied()
        .find(|keyword| issuer.contains(keyword))
}

fn match_rules(text: &str) -> Option<Region> {
    if text.is_empty() {
        return None;
    }
    REGION_RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|kw| text.contains(kw)))
        .map(|(region, _)| *region)
}

fn has_city_or_county(text: &str) -> bool {
    CITY_OR_COUNTY_KEYWORDS.iter().any(|kw| text.contains(kw))
}

/// Infer a region tag from issuer and subject text. The precedence order
/// resolves ambiguity in favor of the more specific matches: the committee
/// report special case, then committee and science-park keywords, then the
/// issuer against the rule table, the subject only when the issuer is empty,
/// and finally "no regional marker at all" means a national issuer.
pub fn detect_region(issuer: Option<&str>, subject: Option<&str>) -> Region {
    let issuer = issuer.unwrap_or("").trim();
    let subject = subject.unwrap_or("").trim();

    if !subject.is_empty()
        && subject.contains(COMMITTEE_KEYWORD)
        && subject.contains(COMMITTEE_REPORT_KEYWORD)
    {
        return Region::Kaohsiung;
    }

    if issuer.contains(COMMITTEE_KEYWORD) || subject.contains(COMMITTEE_KEYWORD) {
        return Region::Kaohsiung;
    }

    if issuer.contains(SCIENCE_PARK_KEYWORD) || subject.contains(SCIENCE_PARK_KEYWORD) {
        return Region::Central;
    }

    if let Some(region) = match_rules(issuer) {
        return region;
    }

    if issuer.is_empty() {
        if let Some(region) = match_rules(subject) {
            return region;
        }
    }

    if !has_city_or_county(issuer) && !has_city_or_county(subject) {
        return Region::Central;
    }

    Region::Other
}

/// Deadline urgency plus the day counter that produced it. At most one of
/// the two counters is set; exactly one whenever a usable date exists.
pub fn classify_deadline(
    today: NaiveDate,
    issued: Option<NaiveDate>,
    deadline: Option<NaiveDate>,
) -> (DeadlineCategory, Option<i64>, Option<i64>) {
    if let Some(deadline) = deadline {
        let diff = (deadline - today).num_days();
        let category = if diff < 0 {
            DeadlineCategory::Expired
        } else if diff <= DEADLINE_SOON_DAYS {
            DeadlineCategory::DueSoon
        } else {
            DeadlineCategory::Active
        };
        return (category, Some(diff), None);
    }

    if let Some(issued) = issued {
        let diff = (today - issued).num_days();
        let category = if diff <= RECENT_ISSUED_DAYS {
            DeadlineCategory::DueSoon
        } else if diff <= ACTIVE_ISSUED_DAYS {
            DeadlineCategory::Active
        } else {
            DeadlineCategory::NoDeadline
        };
        return (category, None, Some(diff.max(0)));
    }

    (DeadlineCategory::NoDeadline, None, None)
}

/// A notice record plus everything derived from it at load time.
#[derive(Debug, Clone)]
pub struct Document {
    pub record: NoticeRecord,
    pub issued_date: Option<NaiveDate>,
    pub deadline_date: Option<NaiveDate>,
    pub deadline_category: DeadlineCategory,
    pub days_until_deadline: Option<i64>,
    pub days_since_issued: Option<i64>,
    pub region: Region,
}

/// Attach the derived fields to a raw record, anchored to `today`.
pub fn enrich_document(record: NoticeRecord, today: NaiveDate) -> Document {
    let issued_date = record.date.as_deref().and_then(resolve_date);
    let deadline_date = record.deadline.as_deref().and_then(resolve_date);
    let region = detect_region(record.issuer.as_deref(), Some(&record.subject));
    let (deadline_category, days_until_deadline, days_since_issued) =
        classify_deadline(today, issued_date, deadline_date);

    Document {
        record,
        issued_date,
        deadline_date,
        deadline_category,
        days_until_deadline,
        days_since_issued,
        region,
    }
}

// ── Tests ──
