//! CLI entry point for the paperhaul tool.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use paperhaul::fetch::SearchRequest;
use paperhaul::interactions::ActionKind;
use paperhaul::{
    AppConfig, ArxivClient, CancelToken, Database, DownloadEngine, HttpClient, InteractionLog,
    PaperRecord, ResultsCache, RetryPolicy, SearchSession,
};

mod cli;

use cli::{Args, Command, SearchArgs, parse_selection};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    let config = AppConfig::load(args.config.as_deref())?;
    let db = Database::new(&config.db_path).await?;
    let cache = ResultsCache::new(db.clone());
    let history = InteractionLog::new(db.clone());
    let arxiv = ArxivClient::new();

    match args.command {
        Command::Search { search, page } => {
            let records = fetch_records(&arxiv, &cache, &history, &search).await?;
            let mut session =
                SearchSession::with_page_size(&search.query, records, config.page_size);
            session.goto_page(page.saturating_sub(1));
            print_page(&session);
        }
        Command::Fetch {
            search,
            select,
            out,
            concurrency,
            max_attempts,
        } => {
            let records = fetch_records(&arxiv, &cache, &history, &search).await?;
            if records.is_empty() {
                info!("no papers matched the query");
                return Ok(());
            }

            let selection = parse_selection(&select).map_err(anyhow::Error::msg)?;
            let selected = apply_selection(&records, selection.as_deref())?;
            if selected.is_empty() {
                info!("selection matched no papers");
                return Ok(());
            }

            // An explicit subset is a deliberate user action; "all" is not.
            if selection.is_some() {
                for record in &selected {
                    history
                        .record_best_effort(&search.user, &record.arxiv_id, ActionKind::Select)
                        .await;
                }
            }

            let download_root = out.unwrap_or_else(|| config.download_root.clone());
            run_fetch(
                &config,
                &history,
                &search,
                selected,
                &download_root,
                concurrency,
                max_attempts,
            )
            .await?;
        }
    }

    Ok(())
}

/// Returns results for the search, consulting the cache for unfiltered
/// queries and recording the search in the user's history.
async fn fetch_records(
    arxiv: &ArxivClient,
    cache: &ResultsCache,
    history: &InteractionLog,
    search: &SearchArgs,
) -> Result<Vec<PaperRecord>> {
    // The cache is keyed by the bare query string, so filtered searches
    // bypass it entirely rather than poisoning later lookups.
    let unfiltered = search.from.is_none() && search.to.is_none() && search.category.is_none();

    if unfiltered && !search.no_cache {
        match cache.get(&search.query).await {
            Ok(Some(records)) => {
                info!(count = records.len(), "loaded results from cache");
                return Ok(records);
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "cache lookup failed, querying API"),
        }
    }

    let mut request = SearchRequest::new(&search.query);
    request.from_date = search.from;
    request.to_date = search.to;
    request.category = search.category.clone();
    request.max_results = search.max_results;

    let records = arxiv.search(&request).await?;
    info!(count = records.len(), "fetched results from arXiv");

    if unfiltered {
        if let Err(e) = cache.put(&search.query, &records).await {
            warn!(error = %e, "failed to cache results");
        }
    }
    history
        .record_search_best_effort(&search.user, &search.query)
        .await;

    Ok(records)
}

/// Prints the current page of a search session.
fn print_page(session: &SearchSession) {
    let total = session.records().len();
    println!(
        "{total} result(s) for {:?} (page {}/{})",
        session.query(),
        session.page() + 1,
        session.total_pages()
    );
    let offset = session.page() * session.page_size();
    for (i, record) in session.page_slice().iter().enumerate() {
        println!(
            "{:3}. {} [{}] ({})",
            offset + i + 1,
            record.title,
            record.arxiv_id,
            record.published
        );
        if !record.authors.is_empty() {
            println!("     {}", record.authors.join(", "));
        }
    }
}

/// Maps a parsed `--select` expression onto the result list.
fn apply_selection(
    records: &[PaperRecord],
    selection: Option<&[usize]>,
) -> Result<Vec<PaperRecord>> {
    match selection {
        None => Ok(records.to_vec()),
        Some(indices) => {
            let mut selected = Vec::with_capacity(indices.len());
            for &idx in indices {
                let record = records.get(idx).ok_or_else(|| {
                    anyhow::anyhow!(
                        "selection index {} out of range (got {} results)",
                        idx + 1,
                        records.len()
                    )
                })?;
                selected.push(record.clone());
            }
            Ok(selected)
        }
    }
}

/// Runs the download batch with a live progress bar and Ctrl-C handling.
async fn run_fetch(
    config: &AppConfig,
    history: &InteractionLog,
    search: &SearchArgs,
    selected: Vec<PaperRecord>,
    download_root: &PathBuf,
    concurrency: Option<usize>,
    max_attempts: Option<u32>,
) -> Result<()> {
    let client =
        HttpClient::new_with_timeouts(config.connect_timeout_secs, config.read_timeout_secs);
    // CLI flags override the config; otherwise the config decides.
    let policy = match max_attempts {
        Some(attempts) => RetryPolicy::new(
            attempts,
            std::time::Duration::from_millis(config.retry_pause_ms),
        ),
        None => config.retry_policy(),
    };
    let engine = DownloadEngine::new(concurrency.unwrap_or(config.concurrency), policy, client)?
        .with_citation_file_name(config.citation_file_name.clone())
        .with_cite_single_downloads(config.cite_single_downloads);

    // Progress bar fed by the engine's watch channel. The end-of-batch
    // reset (total == 0) terminates the loop.
    let mut progress_rx = engine.subscribe();
    let bar_task = tokio::spawn(async move {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        let mut started = false;
        while progress_rx.changed().await.is_ok() {
            let snapshot = *progress_rx.borrow_and_update();
            if snapshot.total == 0 {
                if started {
                    break;
                }
                continue;
            }
            started = true;
            bar.set_length(snapshot.total as u64);
            bar.set_position(snapshot.completed as u64);
            bar.set_message(snapshot.message());
        }
        bar.finish_and_clear();
    });

    // Ctrl-C cancels the batch cooperatively; in-flight attempts finish,
    // everything else resolves to a cancelled failure.
    let cancel = CancelToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("cancellation requested, finishing in-flight downloads");
            signal_cancel.cancel();
        }
    });

    let batch = engine
        .download_batch(&selected, &search.query, download_root, &cancel)
        .await?;
    let _ = bar_task.await;

    for result in &batch.outcomes {
        match &result.outcome {
            paperhaul::JobOutcome::Success { file_name } => {
                history
                    .record_best_effort(&search.user, &result.arxiv_id, ActionKind::Download)
                    .await;
                debug!(file = %file_name, "saved");
            }
            paperhaul::JobOutcome::Failure { kind, message } => {
                warn!(
                    arxiv_id = %result.arxiv_id,
                    title = %result.title,
                    kind = %kind,
                    "{message}"
                );
            }
        }
    }

    println!(
        "Downloaded {} out of {} papers to {}",
        batch.succeeded(),
        batch.attempted(),
        batch.folder.display()
    );
    if let Some(citation) = &batch.citation_file {
        println!("Citations written to {}", citation.display());
    }

    Ok(())
}
