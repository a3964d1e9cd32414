use std::sync::LazyLock;

use anyhow::{bail, Result};
use scraper::{ElementRef, Html, Selector};

use crate::dates::resolve_date;
use crate::model::{DetailRecord, LinkRef};
use crate::parser::listing::element_text;
use crate::text::{absolute_url, normalize_label};

static ROW_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".addtable table tr").unwrap());
static HEADER_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("th").unwrap());
static CELL_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());
static ANCHOR_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());

/// Extract the labeled rows of a detail page. Unrecognized labels are
/// ignored; a page with no parsable rows is a hard per-page failure.
pub fn parse_detail(html: &str) -> Result<DetailRecord> {
    let document = Html::parse_document(html);
    let rows: Vec<ElementRef> = document.select(&ROW_SEL).collect();
    if rows.is_empty() {
        bail!("unable to parse detail page content");
    }

    let mut record = DetailRecord::default();
    for row in rows {
        let label = row
            .select(&HEADER_SEL)
            .next()
            .map(|th| normalize_label(&th.text().collect::<String>()))
            .unwrap_or_default();
        let Some(cell) = row.select(&CELL_SEL).next() else {
            continue;
        };
        if label.is_empty() {
            continue;
        }

        let value = element_text(&cell);
        match label.as_str() {
            "法規年度" => {
                record.law_year = numeric_year(&value);
                record.law_year_label = Some(value);
            }
            "發文單位" => record.issuer = Some(value),
            "發文日期" => {
                record.date = Some(
                    resolve_date(&value)
                        .map(|date| date.format("%Y-%m-%d").to_string())
                        .unwrap_or(value),
                );
            }
            "發文字號" => record.document_number = Some(value),
            "條文編號" => record.article_number = Some(value),
            "條文主旨" => {
                if !value.is_empty() {
                    record.subject = Some(value);
                }
            }
            "條文內容" => record.content = Some(value),
            "截止日期" => record.deadline = Some(value),
            "相關檔案" => record.attachments = collect_links(&cell, Some("附件")),
            "相關網址" => record.related_links = collect_links(&cell, None),
            _ => {}
        }
    }

    Ok(record)
}

/// Anchors in a value cell as labeled links. Anchors without a resolvable
/// href are dropped; blank labels fall back to `default_label`, or to the
/// URL itself when no default is given.
fn collect_links(cell: &ElementRef, default_label: Option<&str>) -> Vec<LinkRef> {
    let mut links = Vec::new();
    for anchor in cell.select(&ANCHOR_SEL) {
        let Some(url) = absolute_url(anchor.value().attr("href")) else {
            continue;
        };
        let mut label = element_text(&anchor);
        if label.is_empty() {
            label = default_label.map(str::to_string).unwrap_or_else(|| url.clone());
        }
        links.push(LinkRef { label, url });
    }
    links
}

fn numeric_year(value: &str) -> Option<i32> {
    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().ok().filter(|year| *year != 0)
}

// ── Tests ──
