mod classify;
mod crawler;
mod dates;
mod enrich;
mod model;
mod parser;
mod store;
mod text;
mod view;

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use chrono::{DateTime, FixedOffset};
use clap::{Parser, Subcommand};

use classify::{enrich_document, priority_issuer, DeadlineCategory, Document, Region};
use view::{DocumentView, SortMode, TimeRange};

const DEFAULT_DATA_PATH: &str = "docs/data/documents.json";

#[derive(Parser)]
#[command(name = "kaa_scraper", about = "Scraper and browser for KAA regulatory notices")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl the listing, enrich every record, and write the dataset artifact
    Fetch {
        /// Max listing pages to crawl (default: all)
        #[arg(short = 'n', long, env = "FETCH_MAX_PAGES")]
        max_pages: Option<u64>,
        /// Detail-fetch worker count
        #[arg(long, env = "DETAIL_CONCURRENCY", default_value_t = 2)]
        concurrency: usize,
        /// Per-worker delay between detail requests, in milliseconds
        #[arg(long, env = "FETCH_DELAY_MS", default_value_t = 200)]
        delay_ms: u64,
        /// Output path for the dataset artifact
        #[arg(short, long, default_value = DEFAULT_DATA_PATH)]
        out: PathBuf,
    },
    /// Filter, sort, and page through a dataset artifact
    Browse {
        /// Dataset file path or http(s) URL
        #[arg(long, default_value = DEFAULT_DATA_PATH)]
        data: String,
        /// Substring search across subject, issuer, numbers, links, ...
        #[arg(short, long)]
        search: Option<String>,
        /// Sort order: date-desc, date-asc, serial-asc, serial-desc
        #[arg(long, default_value = "date-desc")]
        sort: String,
        /// Status filter, repeatable: due-soon, active, expired, no-deadline
        #[arg(long = "status")]
        statuses: Vec<String>,
        /// Region filter: all, central, kaohsiung, taipei, new-taipei, other
        #[arg(long, default_value = "all")]
        region: String,
        /// Issued-within bucket: 3m, 1y, gt1y, all
        #[arg(long, default_value = "3m")]
        time_range: String,
        /// Compact single-line rows
        #[arg(long)]
        simple: bool,
        /// Number of pagination chunks to reveal
        #[arg(long, default_value_t = 1)]
        chunks: usize,
    },
    /// Show status / region counts for a dataset artifact
    Stats {
        /// Dataset file path or http(s) URL
        #[arg(long, default_value = DEFAULT_DATA_PATH)]
        data: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Fetch {
            max_pages,
            concurrency,
            delay_ms,
            out,
        } => run_fetch(max_pages, concurrency, delay_ms, out).await,
        Commands::Browse {
            data,
            search,
            sort,
            statuses,
            region,
            time_range,
            simple,
            chunks,
        } => {
            run_browse(
                &data, search, &sort, &statuses, &region, &time_range, simple, chunks,
            )
            .await
        }
        Commands::Stats { data } => run_stats(&data).await,
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

async fn run_fetch(
    max_pages: Option<u64>,
    concurrency: usize,
    delay_ms: u64,
    out: PathBuf,
) -> Result<()> {
    let client = crawler::build_client()?;

    let crawl = crawler::crawl_listing(&client, max_pages).await;
    println!(
        "Collected {} list entries, fetching detail pages...",
        crawl.records.len()
    );

    let documents = enrich::enrich_all(
        &client,
        crawl.records,
        concurrency,
        Duration::from_millis(delay_ms),
    )
    .await?;

    let total_records = Some(crawl.reported_total.unwrap_or(documents.len() as u64));
    let dataset = model::Dataset {
        documents,
        updated_at: chrono::Utc::now().to_rfc3339(),
        total_records,
    };
    store::write_dataset(&out, &dataset)?;
    println!(
        "Saved {} law records to {}",
        dataset.documents.len(),
        out.display()
    );
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_browse(
    data: &str,
    search: Option<String>,
    sort: &str,
    statuses: &[String],
    region: &str,
    time_range: &str,
    simple: bool,
    chunks: usize,
) -> Result<()> {
    let dataset = store::load_dataset(data).await?;
    let today = dates::taipei_today();

    let updated_at = dataset.updated_at.clone();
    let reported_total = dataset.total_records;
    let documents: Vec<Document> = dataset
        .documents
        .into_iter()
        .map(|record| enrich_document(record, today))
        .collect();

    let mut view = DocumentView::new(documents);
    view.set_sort(parse_sort(sort)?);
    if let Some(search) = &search {
        view.set_search(search);
    }
    if !statuses.is_empty() {
        let wanted: BTreeSet<DeadlineCategory> = statuses
            .iter()
            .map(|value| parse_status(value))
            .collect::<Result<_>>()?;
        for category in DeadlineCategory::ALL {
            if !wanted.contains(&category) {
                view.set_status(category, false);
            }
        }
    }
    view.set_region(parse_region(region)?);
    view.set_time_range(parse_time_range(time_range)?);
    view.set_simple(simple);

    for _ in 1..chunks.max(1) {
        if !view.load_more() {
            break;
        }
    }

    println!("Updated: {}", format_updated_at(&updated_at));
    if view.total_len() == 0 {
        println!("No law records available yet.");
        return Ok(());
    }
    if view.filtered_len() == 0 {
        println!("No records match the current filters.");
        return Ok(());
    }

    let total = reported_total.unwrap_or(view.total_len() as u64);
    println!(
        "{}/{} records match; showing {}\n",
        view.filtered_len(),
        total,
        view.visible_count()
    );

    let simple_view = view.filters().simple;
    for (index, doc) in view.visible().into_iter().enumerate() {
        if simple_view {
            print_simple_row(index, doc);
        } else {
            print_record(index, doc);
        }
    }

    if view.has_more() {
        println!(
            "\n{} more hidden; pass --chunks {} to reveal the next page",
            view.filtered_len() - view.visible_count(),
            chunks.max(1) + 1
        );
    }
    Ok(())
}

async fn run_stats(data: &str) -> Result<()> {
    let dataset = store::load_dataset(data).await?;
    let today = dates::taipei_today();

    let updated_at = dataset.updated_at.clone();
    let reported_total = dataset.total_records;
    let documents: Vec<Document> = dataset
        .documents
        .into_iter()
        .map(|record| enrich_document(record, today))
        .collect();

    println!("Total:    {}", documents.len());
    if let Some(total) = reported_total {
        println!("Reported: {total}");
    }
    println!("Updated:  {}", format_updated_at(&updated_at));

    println!("\n--- Status ---");
    for category in DeadlineCategory::ALL {
        let count = documents
            .iter()
            .filter(|doc| doc.deadline_category == category)
            .count();
        println!("{:<12} {count}", category.as_str());
    }

    println!("\n--- Region ---");
    for region in Region::ALL {
        let count = documents.iter().filter(|doc| doc.region == region).count();
        println!("{:<12} {count}", region.as_str());
    }
    Ok(())
}

fn print_record(index: usize, doc: &Document) {
    let record = &doc.record;
    let mut header = format!(
        "{:>3}. [{}] {} {}",
        index + 1,
        doc.deadline_category.as_str(),
        record.date.as_deref().unwrap_or("----------"),
        record.subject
    );
    if let Some(flag) = priority_issuer(record.issuer.as_deref()) {
        header.push_str(&format!(" ◆{flag}"));
    }
    println!("{header}");

    println!(
        "     {} | {} | {} | {} | {}",
        record.issuer.as_deref().unwrap_or("-"),
        record.article_number.as_deref().unwrap_or(&record.serial),
        record.document_number.as_deref().unwrap_or("-"),
        doc.region.as_str(),
        deadline_note(doc)
    );

    if let Some(deadline) = doc.deadline_date {
        println!("     deadline: {deadline}");
    }
    if !record.attachments.is_empty() {
        let labels: Vec<&str> = record.attachments.iter().map(|l| l.label.as_str()).collect();
        println!("     attachments: {}", labels.join(", "));
    }
    if !record.related_links.is_empty() {
        let labels: Vec<&str> = record.related_links.iter().map(|l| l.label.as_str()).collect();
        println!("     links: {}", labels.join(", "));
    }
}

fn print_simple_row(index: usize, doc: &Document) {
    let record = &doc.record;
    let days = doc
        .days_since_issued
        .map(|days| format!("{days}d"))
        .unwrap_or_else(|| "—".into());
    println!(
        "{:>3}. {} | {:>5} | {} | {}",
        index + 1,
        record.date.as_deref().unwrap_or("----------"),
        days,
        truncate(record.issuer.as_deref().unwrap_or("-"), 16),
        truncate(&record.subject, 40)
    );
}

fn deadline_note(doc: &Document) -> String {
    if let Some(days) = doc.days_until_deadline {
        return if days < 0 {
            format!("overdue {} days", days.abs())
        } else if days == 0 {
            "due today".to_string()
        } else {
            format!("{days} days left")
        };
    }
    if let Some(days) = doc.days_since_issued {
        return if days == 0 {
            "issued today".to_string()
        } else {
            format!("issued {days} days ago")
        };
    }
    "no date given".to_string()
}

fn parse_sort(value: &str) -> Result<SortMode> {
    Ok(match value {
        "date-desc" => SortMode::DateDesc,
        "date-asc" => SortMode::DateAsc,
        "serial-asc" => SortMode::SerialAsc,
        "serial-desc" => SortMode::SerialDesc,
        other => bail!("unknown sort mode: {other}"),
    })
}

fn parse_status(value: &str) -> Result<DeadlineCategory> {
    DeadlineCategory::ALL
        .into_iter()
        .find(|category| category.as_str() == value)
        .ok_or_else(|| anyhow::anyhow!("unknown status: {value}"))
}

fn parse_region(value: &str) -> Result<Option<Region>> {
    Ok(match value {
        "all" => None,
        "new-taipei" => Some(Region::NewTaipei),
        other => Some(
            Region::ALL
                .into_iter()
                .find(|region| region.as_str() == other)
                .ok_or_else(|| anyhow::anyhow!("unknown region: {other}"))?,
        ),
    })
}

fn parse_time_range(value: &str) -> Result<TimeRange> {
    Ok(match value {
        "3m" => TimeRange::ThreeMonths,
        "1y" => TimeRange::OneYear,
        "gt1y" => TimeRange::OverOneYear,
        "all" => TimeRange::All,
        other => bail!("unknown time range: {other}"),
    })
}

fn format_updated_at(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(stamp) => stamp
            .with_timezone(&FixedOffset::east_opt(8 * 3600).unwrap())
            .format("%Y-%m-%d %H:%M (Taipei)")
            .to_string(),
        Err(_) => raw.to_string(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
