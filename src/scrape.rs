use std::path::Path;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::fetcher::{self, FetchError, RenderSession, Renderer};
use crate::parser;
use crate::store::{self, KirtanRecord};

/// Scrape stats returned after completion.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScrapeStats {
    pub total: usize,
    pub ok: usize,
    pub errors: usize,
}

/// Fetch and parse one detail page. The session is closed before returning,
/// whether the load succeeded or not.
pub async fn scrape_detail<R: Renderer>(
    kid: &str,
    renderer: &R,
) -> Result<KirtanRecord, FetchError> {
    let url = fetcher::detail_url(kid);

    let mut session = renderer.open().await?;
    let loaded = session.load(&url).await;
    session.close().await;

    let html = loaded?;
    Ok(parser::parse_detail(&html, &url))
}

/// Scrape every identifier in order, one at a time. Failed identifiers are
/// logged and skipped; nothing is retried.
pub async fn scrape_all<R: Renderer>(
    renderer: &R,
    kids: &[String],
) -> Result<(Vec<KirtanRecord>, ScrapeStats)> {
    let total = kids.len();
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );

    let mut records = Vec::with_capacity(total);
    let mut errors = 0usize;

    for kid in kids {
        info!("Processing Kid: {}", kid);
        match scrape_detail(kid, renderer).await {
            Ok(record) => records.push(record),
            Err(e) => {
                errors += 1;
                warn!("Skipping Kid {}: {}", kid, e);
            }
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    let stats = ScrapeStats {
        total,
        ok: records.len(),
        errors,
    };
    info!("Scraped {} pages ({} ok, {} errors)", stats.total, stats.ok, stats.errors);
    Ok((records, stats))
}

/// Read the identifier list, scrape it, and write the workbook once at the end.
pub async fn run<R: Renderer>(
    renderer: &R,
    list_path: &Path,
    xlsx_path: &Path,
    limit: Option<usize>,
) -> Result<ScrapeStats> {
    let mut kids = store::read_kids(list_path)?;
    if let Some(n) = limit {
        kids.truncate(n);
    }
    info!("Loaded {} Kid values from {}", kids.len(), list_path.display());

    let (records, stats) = scrape_all(renderer, &kids).await?;
    store::write_workbook(xlsx_path, &records)?;
    Ok(stats)
}
