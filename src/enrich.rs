use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::warn;

use crate::crawler::fetch_page;
use crate::model::{DetailRecord, NoticeRecord, SummaryRecord};
use crate::parser::detail::parse_detail;

/// Fetch every record's detail page and merge the results, preserving input
/// order.
pub async fn enrich_all(
    client: &Client,
    summaries: Vec<SummaryRecord>,
    concurrency: usize,
    delay: Duration,
) -> Result<Vec<NoticeRecord>> {
    let client = client.clone();
    enrich_with(summaries, concurrency, delay, move |url| {
        let client = client.clone();
        async move {
            let html = fetch_page(&client, &url).await?;
            parse_detail(&html)
        }
    })
    .await
}

/// Worker-pool core of the enricher, generic over the detail fetcher so
/// scheduling can be exercised without a network.
///
/// `min(concurrency, len)` workers share one atomically advancing cursor
/// over the input; each claimed index is fetched, merged, and written to its
/// own pre-allocated slot, so `results[i]` always corresponds to
/// `summaries[i]`. A record without a detail URL, or whose fetch/parse
/// fails, gets the empty detail stub; a failure never aborts the batch.
/// Each worker sleeps `delay` between claims.
pub async fn enrich_with<F, Fut>(
    summaries: Vec<SummaryRecord>,
    concurrency: usize,
    delay: Duration,
    fetch: F,
) -> Result<Vec<NoticeRecord>>
where
    F: Fn(String) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<DetailRecord>> + Send + 'static,
{
    let total = summaries.len();
    if total == 0 {
        return Ok(Vec::new());
    }

    let summaries = Arc::new(summaries);
    let cursor = Arc::new(AtomicUsize::new(0));
    let workers = concurrency.max(1).min(total);

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );

    let (tx, mut rx) = mpsc::channel::<(usize, NoticeRecord)>(workers * 2);

    let mut join_set = JoinSet::new();
    for _ in 0..workers {
        let summaries = Arc::clone(&summaries);
        let cursor = Arc::clone(&cursor);
        let tx = tx.clone();
        let fetch = fetch.clone();

        join_set.spawn(async move {
            loop {
                let index = cursor.fetch_add(1, Ordering::Relaxed);
                if index >= summaries.len() {
                    break;
                }

                let summary = summaries[index].clone();
                let detail = match &summary.subject_url {
                    Some(url) => match fetch(url.clone()).await {
                        Ok(detail) => detail,
                        Err(err) => {
                            warn!("Unable to parse detail page {url}: {err:#}");
                            DetailRecord::default()
                        }
                    },
                    None => DetailRecord::default(),
                };

                if tx
                    .send((index, NoticeRecord::merge(summary, detail)))
                    .await
                    .is_err()
                {
                    break;
                }

                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
        });
    }
    drop(tx);

    let mut slots: Vec<Option<NoticeRecord>> = vec![None; total];
    while let Some((index, record)) = rx.recv().await {
        slots[index] = Some(record);
        pb.inc(1);
    }

    while let Some(result) = join_set.join_next().await {
        result.context("detail worker panicked")?;
    }

    pb.finish_and_clear();

    let mut records = Vec::with_capacity(total);
    for (index, slot) in slots.into_iter().enumerate() {
        records.push(slot.with_context(|| format!("no detail result for record {index}"))?);
    }
    Ok(records)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    fn summaries(count: usize) -> Vec<SummaryRecord> {
        (0..count)
            .map(|i| SummaryRecord {
                year: "113".into(),
                serial: format!("{i:03}"),
                category: "法規公告".into(),
                subject: format!("subject {i}"),
                subject_url: Some(format!("https://example.invalid/law_view.php?id={i}")),
            })
            .collect()
    }

    fn index_of(url: &str) -> usize {
        url.rsplit('=').next().unwrap().parse().unwrap()
    }

    #[tokio::test]
    async fn results_preserve_input_order() {
        let input = summaries(20);
        let results = enrich_with(input.clone(), 4, Duration::ZERO, |url| async move {
            let index = index_of(&url);
            // uneven completion times shuffle the worker schedule
            tokio::time::sleep(Duration::from_millis((index as u64 * 7) % 11)).await;
            Ok(DetailRecord {
                issuer: Some(format!("issuer {index}")),
                ..DetailRecord::default()
            })
        })
        .await
        .unwrap();

        assert_eq!(results.len(), input.len());
        for (i, record) in results.iter().enumerate() {
            assert_eq!(record.serial, input[i].serial);
            assert_eq!(record.issuer.as_deref(), Some(format!("issuer {i}").as_str()));
        }
    }

    #[tokio::test]
    async fn failed_fetches_degrade_to_the_empty_stub() {
        let results = enrich_with(summaries(6), 3, Duration::ZERO, |url| async move {
            if index_of(&url) % 2 == 1 {
                Err(anyhow!("boom"))
            } else {
                Ok(DetailRecord {
                    issuer: Some("ok".into()),
                    ..DetailRecord::default()
                })
            }
        })
        .await
        .unwrap();

        assert_eq!(results.len(), 6);
        for (i, record) in results.iter().enumerate() {
            if i % 2 == 1 {
                assert_eq!(record.issuer, None);
                assert!(record.attachments.is_empty());
                // the listing fields survive the stub
                assert_eq!(record.subject, format!("subject {i}"));
            } else {
                assert_eq!(record.issuer.as_deref(), Some("ok"));
            }
        }
    }

    #[tokio::test]
    async fn records_without_a_url_skip_the_fetcher() {
        let mut input = summaries(4);
        input[1].subject_url = None;
        input[3].subject_url = None;

        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let results = enrich_with(input, 2, Duration::ZERO, move |_url| {
            let seen = Arc::clone(&seen);
            async move {
                seen.fetch_add(1, Ordering::Relaxed);
                Ok(DetailRecord::default())
            }
        })
        .await
        .unwrap();

        assert_eq!(results.len(), 4);
        assert_eq!(calls.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn concurrency_larger_than_input_is_fine() {
        let results = enrich_with(summaries(3), 16, Duration::ZERO, |_url| async {
            Ok(DetailRecord::default())
        })
        .await
        .unwrap();
        assert_eq!(results.len(), 3);
    }

    #[tokio::test]
    async fn empty_input_yields_empty_output() {
        let results = enrich_with(Vec::new(), 4, Duration::ZERO, |_url| async {
            Ok(DetailRecord::default())
        })
        .await
        .unwrap();
        assert!(results.is_empty());
    }
}
