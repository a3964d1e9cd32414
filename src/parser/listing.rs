use std::sync::LazyLock;

use anyhow::{bail, Result};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::model::SummaryRecord;
use crate::text::{absolute_url, clean_text};

static TABLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".mtable table").unwrap());
static ROW_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static CELL_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());
static ANCHOR_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());
static TITLE_DIV_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div").unwrap());
static SUMMARY_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".quantity .q_box2").unwrap());

static TOTAL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"資料筆數：(\d+)").unwrap());
static PAGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"頁數：(\d+)/(\d+)").unwrap());

/// Pagination summary reported by a listing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub total_records: Option<u64>,
    pub current_page: u64,
    pub total_pages: u64,
}

/// One parsed listing page.
#[derive(Debug)]
pub struct ListPage {
    pub records: Vec<SummaryRecord>,
    pub pagination: Pagination,
}

/// Extract the qualifying rows and the pagination summary from a listing
/// page. A missing listing table is an error, folded into the crawler's
/// page-unavailable handling.
pub fn parse_list(html: &str) -> Result<ListPage> {
    let document = Html::parse_document(html);

    let Some(table) = document.select(&TABLE_SEL).next() else {
        bail!("unable to locate the law listing table");
    };

    let mut records = Vec::new();
    for row in table.select(&ROW_SEL).skip(1) {
        let cells: Vec<ElementRef> = row.select(&CELL_SEL).collect();
        if cells.len() < 4 {
            continue;
        }

        let anchor = cells[2].select(&ANCHOR_SEL).next();
        let subject_url = absolute_url(anchor.and_then(|a| a.value().attr("href")));
        // Prefer the full title stashed on the inner div, then the anchor
        // text, then the whole cell.
        let subject = anchor
            .and_then(|a| a.select(&TITLE_DIV_SEL).next())
            .and_then(|div| div.value().attr("title"))
            .map(clean_text)
            .filter(|title| !title.is_empty())
            .or_else(|| anchor.map(|a| element_text(&a)).filter(|text| !text.is_empty()))
            .unwrap_or_else(|| element_text(&cells[2]));

        records.push(SummaryRecord {
            year: element_text(&cells[0]),
            serial: element_text(&cells[1]),
            category: element_text(&cells[3]),
            subject,
            subject_url,
        });
    }

    Ok(ListPage {
        records,
        pagination: parse_pagination(&document),
    })
}

fn parse_pagination(document: &Html) -> Pagination {
    let summary = clean_text(
        &document
            .select(&SUMMARY_SEL)
            .map(|el| el.text().collect::<String>())
            .collect::<Vec<_>>()
            .join(" "),
    );

    let total_records = TOTAL_RE
        .captures(&summary)
        .and_then(|caps| caps[1].parse().ok());
    let (current_page, total_pages) = PAGE_RE
        .captures(&summary)
        .and_then(|caps| Some((caps[1].parse().ok()?, caps[2].parse().ok()?)))
        .unwrap_or((1, 1));

    Pagination {
        total_records,
        current_page,
        total_pages,
    }
}

pub(crate) fn element_text(element: &ElementRef) -> String {
    clean_text(&element.text().collect::<String>())
}

// ── Tests ──
