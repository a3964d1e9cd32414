use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::iter::Peekable;
use std::str::Chars;

use crate::classify::{DeadlineCategory, Document, Region};

pub const PAGE_CHUNK: usize = 21;

const THREE_MONTHS_DAYS: i64 = 90;
const ONE_YEAR_DAYS: i64 = 365;

/// Total order over the result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    #[default]
    DateDesc,
    DateAsc,
    SerialAsc,
    SerialDesc,
}

/// "Issued within" bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeRange {
    #[default]
    ThreeMonths,
    OneYear,
    OverOneYear,
    All,
}

/// The whole mutable filter configuration; replaced wholesale on reset.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterState {
    pub search: String,
    pub sort: SortMode,
    pub statuses: BTreeSet<DeadlineCategory>,
    pub region: Option<Region>,
    pub time_range: TimeRange,
    pub simple: bool,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            search: String::new(),
            sort: SortMode::default(),
            statuses: DeadlineCategory::ALL.into_iter().collect(),
            region: None,
            time_range: TimeRange::default(),
            simple: false,
        }
    }
}

/// Conjunction of the independent predicates, then the configured sort.
/// Each predicate is a no-op at its "don't filter" value.
pub fn apply_filters<'a>(documents: &'a [Document], filters: &FilterState) -> Vec<&'a Document> {
    filter_indices(documents, filters)
        .into_iter()
        .map(|index| &documents[index])
        .collect()
}

fn filter_indices(documents: &[Document], filters: &FilterState) -> Vec<usize> {
    let query = filters.search.trim().to_lowercase();

    let mut indices: Vec<usize> = documents
        .iter()
        .enumerate()
        .filter(|(_, doc)| query.is_empty() || matches_search(doc, &query))
        .filter(|(_, doc)| filters.statuses.contains(&doc.deadline_category))
        .filter(|(_, doc)| filters.region.map_or(true, |region| doc.region == region))
        .filter(|(_, doc)| in_time_range(doc, filters.time_range))
        .map(|(index, _)| index)
        .collect();

    sort_indices(&mut indices, documents, filters.sort);
    indices
}

fn matches_search(doc: &Document, query: &str) -> bool {
    let record = &doc.record;
    let opt_contains =
        |value: &Option<String>| value.as_deref().is_some_and(|v| v.to_lowercase().contains(query));

    record.subject.to_lowercase().contains(query)
        || opt_contains(&record.subject_url)
        || record
            .attachments
            .iter()
            .chain(&record.related_links)
            .any(|link| {
                link.label.to_lowercase().contains(query)
                    || link.url.to_lowercase().contains(query)
            })
        || record.category.to_lowercase().contains(query)
        || opt_contains(&record.issuer)
        || opt_contains(&record.document_number)
        || opt_contains(&record.article_number)
        || record.serial.to_lowercase().contains(query)
        || opt_contains(&record.content)
        || opt_contains(&record.date)
        || opt_contains(&record.deadline)
}

fn in_time_range(doc: &Document, range: TimeRange) -> bool {
    if range == TimeRange::All {
        return true;
    }
    // records whose age is unknown never match a bucket
    let Some(days) = doc.days_since_issued else {
        return false;
    };
    match range {
        TimeRange::ThreeMonths => days <= THREE_MONTHS_DAYS,
        TimeRange::OneYear => days <= ONE_YEAR_DAYS,
        TimeRange::OverOneYear => days > ONE_YEAR_DAYS,
        TimeRange::All => true,
    }
}

fn sort_indices(indices: &mut [usize], documents: &[Document], mode: SortMode) {
    match mode {
        SortMode::DateDesc => {
            indices.sort_by(|&a, &b| compare_issued(&documents[a], &documents[b], false));
        }
        SortMode::DateAsc => {
            indices.sort_by(|&a, &b| compare_issued(&documents[a], &documents[b], true));
        }
        SortMode::SerialAsc => {
            indices
                .sort_by(|&a, &b| natural_compare(serial_key(&documents[a]), serial_key(&documents[b])));
        }
        SortMode::SerialDesc => {
            indices
                .sort_by(|&a, &b| natural_compare(serial_key(&documents[b]), serial_key(&documents[a])));
        }
    }
}

// Missing dates sink to the end in both directions.
fn compare_issued(a: &Document, b: &Document, ascending: bool) -> Ordering {
    match (a.issued_date, b.issued_date) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => {
            if ascending {
                x.cmp(&y)
            } else {
                y.cmp(&x)
            }
        }
    }
}

fn serial_key(doc: &Document) -> &str {
    doc.record
        .article_number
        .as_deref()
        .unwrap_or(&doc.record.serial)
}

/// Numeric-aware, case-insensitive string comparison: digit runs compare by
/// value, so "第2條" orders before "第10條".
pub fn natural_compare(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();

    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let run_a = take_digits(&mut left);
                let run_b = take_digits(&mut right);
                let ordering = compare_digit_runs(&run_a, &run_b);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            (Some(x), Some(y)) => {
                let ordering = x.to_lowercase().cmp(y.to_lowercase());
                if ordering != Ordering::Equal {
                    return ordering;
                }
                left.next();
                right.next();
            }
        }
    }
}

fn take_digits(chars: &mut Peekable<Chars>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.peek().copied() {
        if !c.is_ascii_digit() {
            break;
        }
        run.push(c);
        chars.next();
    }
    run
}

fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    pub chunk_size: usize,
    pub visible_count: usize,
}

/// Re-orderable, incrementally revealed view over a classified document set.
///
/// Mutating any filter predicate re-runs the pipeline and resets the
/// revealed count to one chunk; changing only the sort order preserves it,
/// clamped to the new result length.
pub struct DocumentView {
    documents: Vec<Document>,
    filters: FilterState,
    filtered: Vec<usize>,
    pagination: Pagination,
}

impl DocumentView {
    pub fn new(documents: Vec<Document>) -> Self {
        let mut view = Self {
            documents,
            filters: FilterState::default(),
            filtered: Vec::new(),
            pagination: Pagination {
                chunk_size: PAGE_CHUNK,
                visible_count: PAGE_CHUNK,
            },
        };
        view.refresh(true);
        view
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn set_search(&mut self, search: &str) {
        self.filters.search = search.trim().to_string();
        self.refresh(true);
    }

    pub fn set_sort(&mut self, sort: SortMode) {
        self.filters.sort = sort;
        self.refresh(false);
    }

    /// Toggle one status checkbox. Clearing the last checked status is
    /// rejected: the box stays checked and `false` is returned.
    pub fn set_status(&mut self, status: DeadlineCategory, enabled: bool) -> bool {
        if enabled {
            self.filters.statuses.insert(status);
        } else {
            if self.filters.statuses.len() == 1 && self.filters.statuses.contains(&status) {
                return false;
            }
            self.filters.statuses.remove(&status);
        }
        self.refresh(true);
        true
    }

    pub fn set_region(&mut self, region: Option<Region>) {
        self.filters.region = region;
        self.refresh(true);
    }

    pub fn set_time_range(&mut self, range: TimeRange) {
        self.filters.time_range = range;
        self.refresh(true);
    }

    pub fn set_simple(&mut self, simple: bool) {
        self.filters.simple = simple;
        self.refresh(true);
    }

    /// Restore the default filters and pagination; a no-op (returning
    /// `false`) when nothing differs from the defaults.
    pub fn reset(&mut self) -> bool {
        let defaults = FilterState::default();
        if self.filters == defaults {
            return false;
        }
        self.filters = defaults;
        self.refresh(true);
        true
    }

    /// Reveal up to one more chunk. Returns whether more remain hidden
    /// afterwards; a no-op once everything is visible.
    pub fn load_more(&mut self) -> bool {
        if !self.has_more() {
            return false;
        }
        self.pagination.visible_count = self
            .filtered
            .len()
            .min(self.pagination.visible_count + self.pagination.chunk_size);
        self.has_more()
    }

    pub fn has_more(&self) -> bool {
        self.pagination.visible_count < self.filtered.len()
    }

    pub fn visible(&self) -> Vec<&Document> {
        self.filtered
            .iter()
            .take(self.pagination.visible_count)
            .map(|&index| &self.documents[index])
            .collect()
    }

    pub fn visible_count(&self) -> usize {
        self.pagination.visible_count.min(self.filtered.len())
    }

    pub fn filtered_len(&self) -> usize {
        self.filtered.len()
    }

    pub fn total_len(&self) -> usize {
        self.documents.len()
    }

    fn refresh(&mut self, reset_pagination: bool) {
        self.filtered = filter_indices(&self.documents, &self.filters);
        if reset_pagination {
            self.pagination.visible_count = self.pagination.chunk_size;
        } else {
            self.pagination.visible_count = self
                .filtered
                .len()
                .min(self.pagination.visible_count.max(self.pagination.chunk_size));
        }
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::enrich_document;
    use crate::model::{LinkRef, NoticeRecord};
    use chrono::NaiveDate;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
    }

    fn doc(subject: &str, issuer: Option<&str>, date: Option<&str>, serial: &str) -> Document {
        let record = NoticeRecord {
            year: "113".into(),
            serial: serial.into(),
            category: "法規公告".into(),
            subject: subject.into(),
            issuer: issuer.map(str::to_string),
            date: date.map(str::to_string),
            ..NoticeRecord::default()
        };
        enrich_document(record, today())
    }

    fn sample_docs(count: usize) -> Vec<Document> {
        (0..count)
            .map(|i| {
                doc(
                    &format!("公告 {i}"),
                    Some("內政部"),
                    Some("2024-06-01"),
                    &format!("{i:03}"),
                )
            })
            .collect()
    }

    #[test]
    fn natural_compare_is_numeric_aware() {
        let mut serials = vec!["第2條", "第10條", "第1條"];
        serials.sort_by(|a, b| natural_compare(a, b));
        assert_eq!(serials, vec!["第1條", "第2條", "第10條"]);

        assert_eq!(natural_compare("第007條", "第7條"), Ordering::Equal);
        assert_eq!(natural_compare("A2", "a10"), Ordering::Less);
        assert_eq!(natural_compare("", "第1條"), Ordering::Less);
    }

    #[test]
    fn serial_sort_prefers_article_number() {
        let mut a = doc("甲", None, None, "002");
        a.record.article_number = Some("第10條".into());
        let b = doc("乙", None, None, "010");

        let documents = vec![a, b];
        let mut filters = FilterState {
            sort: SortMode::SerialAsc,
            time_range: TimeRange::All,
            ..FilterState::default()
        };
        let sorted = apply_filters(&documents, &filters);
        // "010" < "第10條": the bare serial sorts ahead of the article label
        assert_eq!(sorted[0].record.subject, "乙");

        filters.sort = SortMode::SerialDesc;
        let sorted = apply_filters(&documents, &filters);
        assert_eq!(sorted[0].record.subject, "甲");
    }

    #[test]
    fn date_sort_sinks_missing_dates_both_ways() {
        let documents = vec![
            doc("old", None, Some("2024-01-05"), "001"),
            doc("undated", None, None, "002"),
            doc("new", None, Some("2024-06-01"), "003"),
        ];
        let filters = FilterState {
            time_range: TimeRange::All,
            ..FilterState::default()
        };
        let sorted = apply_filters(&documents, &filters);
        let subjects: Vec<&str> = sorted.iter().map(|d| d.record.subject.as_str()).collect();
        assert_eq!(subjects, vec!["new", "old", "undated"]);

        let filters = FilterState {
            sort: SortMode::DateAsc,
            time_range: TimeRange::All,
            ..FilterState::default()
        };
        let sorted = apply_filters(&documents, &filters);
        let subjects: Vec<&str> = sorted.iter().map(|d| d.record.subject.as_str()).collect();
        assert_eq!(subjects, vec!["old", "new", "undated"]);
    }

    #[test]
    fn search_matches_across_fields() {
        let mut with_attachment = doc("主旨甲", Some("內政部"), Some("2024-06-01"), "001");
        with_attachment.record.attachments = vec![LinkRef {
            label: "修正條文".into(),
            url: "https://www.kaa.org.tw/files/RULE.pdf".into(),
        }];
        let other = doc("主旨乙", Some("高雄市政府"), Some("2024-06-01"), "002");
        let documents = vec![with_attachment, other];

        let mut filters = FilterState::default();
        filters.search = "rule.pdf".into();
        let hits = apply_filters(&documents, &filters);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.subject, "主旨甲");

        filters.search = "高雄市政府".into();
        let hits = apply_filters(&documents, &filters);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.subject, "主旨乙");

        filters.search = "找不到".into();
        assert!(apply_filters(&documents, &filters).is_empty());
    }

    #[test]
    fn filters_are_conjunctive() {
        let documents = vec![
            doc("高雄公告", Some("高雄市政府"), Some("2024-06-01"), "001"),
            doc("高雄公告", Some("高雄市政府"), Some("2023-01-01"), "002"),
            doc("高雄公告", Some("內政部"), Some("2024-06-01"), "003"),
        ];
        let filters = FilterState {
            search: "高雄公告".into(),
            region: Some(Region::Kaohsiung),
            time_range: TimeRange::ThreeMonths,
            ..FilterState::default()
        };
        let hits = apply_filters(&documents, &filters);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.serial, "001");
    }

    #[test]
    fn time_range_buckets() {
        let documents = vec![
            doc("recent", None, Some("2024-05-01"), "001"),
            doc("this-year", None, Some("2023-08-01"), "002"),
            doc("ancient", None, Some("2020-01-01"), "003"),
            doc("undated", None, None, "004"),
        ];

        let count = |range: TimeRange| {
            let filters = FilterState {
                time_range: range,
                ..FilterState::default()
            };
            apply_filters(&documents, &filters).len()
        };

        assert_eq!(count(TimeRange::ThreeMonths), 1);
        assert_eq!(count(TimeRange::OneYear), 2);
        assert_eq!(count(TimeRange::OverOneYear), 1);
        assert_eq!(count(TimeRange::All), 4);
    }

    #[test]
    fn status_filter_selects_categories() {
        let documents = vec![
            doc("fresh", None, Some("2024-06-05"), "001"),
            doc("aging", None, Some("2024-04-01"), "002"),
            doc("undated", None, None, "003"),
        ];
        let filters = FilterState {
            statuses: [DeadlineCategory::NoDeadline].into_iter().collect(),
            time_range: TimeRange::All,
            ..FilterState::default()
        };
        let hits = apply_filters(&documents, &filters);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.subject, "undated");
    }

    #[test]
    fn last_status_checkbox_cannot_be_cleared() {
        let mut view = DocumentView::new(sample_docs(3));
        assert!(view.set_status(DeadlineCategory::Active, false));
        assert!(view.set_status(DeadlineCategory::Expired, false));
        assert!(view.set_status(DeadlineCategory::NoDeadline, false));
        // due-soon is the last one standing
        assert!(!view.set_status(DeadlineCategory::DueSoon, false));
        assert!(view.filters().statuses.contains(&DeadlineCategory::DueSoon));
        assert_eq!(view.filters().statuses.len(), 1);
    }

    #[test]
    fn pagination_reveals_in_chunks() {
        let mut view = DocumentView::new(sample_docs(50));
        assert_eq!(view.visible_count(), 21);
        assert!(view.has_more());

        assert!(view.load_more());
        assert_eq!(view.visible_count(), 42);

        // final chunk clamps to the result length and hides the sentinel
        assert!(!view.load_more());
        assert_eq!(view.visible_count(), 50);
        assert!(!view.has_more());

        // further triggers are no-ops
        assert!(!view.load_more());
        assert_eq!(view.visible_count(), 50);
    }

    #[test]
    fn filter_change_resets_pagination_sort_change_preserves_it() {
        let mut view = DocumentView::new(sample_docs(50));
        view.load_more();
        assert_eq!(view.visible_count(), 42);

        view.set_sort(SortMode::SerialAsc);
        assert_eq!(view.visible_count(), 42);

        view.set_search("公告");
        assert_eq!(view.visible_count(), 21);
    }

    #[test]
    fn sort_change_clamps_to_the_result_length() {
        let mut view = DocumentView::new(sample_docs(30));
        view.load_more();
        assert_eq!(view.visible_count(), 30);

        view.set_search("公告 1"); // 公告 1 and 10..19
        assert_eq!(view.filtered_len(), 11);
        view.set_sort(SortMode::SerialDesc);
        assert_eq!(view.visible_count(), 11);
        assert!(!view.has_more());
    }

    #[test]
    fn reset_is_a_noop_at_defaults() {
        let mut view = DocumentView::new(sample_docs(5));
        assert!(!view.reset());

        view.set_search("公告 1");
        view.set_time_range(TimeRange::All);
        assert!(view.reset());
        assert_eq!(view.filters(), &FilterState::default());
        assert_eq!(view.filtered_len(), 5);
    }

    #[test]
    fn visible_follows_the_current_sort() {
        let documents = vec![
            doc("b", None, Some("2024-06-02"), "002"),
            doc("a", None, Some("2024-06-03"), "001"),
        ];
        let mut view = DocumentView::new(documents);
        let subjects: Vec<&str> = view.visible().iter().map(|d| d.record.subject.as_str()).collect();
        assert_eq!(subjects, vec!["a", "b"]);

        view.set_sort(SortMode::SerialDesc);
        let subjects: Vec<&str> = view.visible().iter().map(|d| d.record.subject.as_str()).collect();
        assert_eq!(subjects, vec!["b", "a"]);
    }
}
