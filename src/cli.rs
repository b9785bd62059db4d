//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use paperhaul::fetch::DEFAULT_MAX_RESULTS;

/// Search arXiv and bulk-download paper PDFs with BibTeX citations.
#[derive(Parser, Debug)]
#[command(name = "paperhaul")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a JSON config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Shared search filters for the `search` and `fetch` subcommands.
#[derive(clap::Args, Debug)]
pub struct SearchArgs {
    /// Free-text search query
    pub query: String,

    /// Only papers published on or after this date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub from: Option<NaiveDate>,

    /// Only papers published on or before this date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub to: Option<NaiveDate>,

    /// arXiv category filter (e.g. cs.CL)
    #[arg(long)]
    pub category: Option<String>,

    /// Maximum results requested from the API
    #[arg(long, default_value_t = DEFAULT_MAX_RESULTS)]
    pub max_results: u32,

    /// Skip the local result cache and query the API directly
    #[arg(long)]
    pub no_cache: bool,

    /// User identifier for the search and interaction history
    #[arg(long, default_value = "local")]
    pub user: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search arXiv and list matching papers
    Search {
        #[command(flatten)]
        search: SearchArgs,

        /// Result page to display (1-based)
        #[arg(long, default_value_t = 1)]
        page: usize,
    },

    /// Search arXiv and download the selected papers' PDFs
    Fetch {
        #[command(flatten)]
        search: SearchArgs,

        /// Papers to download: "all" or a comma-separated list of
        /// 1-based result indices (e.g. "1,3,7")
        #[arg(long, default_value = "all")]
        select: String,

        /// Download root folder (overrides config)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Maximum concurrent downloads (1-64; defaults to the config value)
        #[arg(short = 'c', long)]
        concurrency: Option<usize>,

        /// Attempts per download (1-10; defaults to the config value)
        #[arg(short = 'r', long, value_parser = clap::value_parser!(u32).range(1..=10))]
        max_attempts: Option<u32>,
    },
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| format!("invalid date {value:?} (expected YYYY-MM-DD): {e}"))
}

/// Parses the `--select` value into indices (0-based) or `None` for "all".
pub fn parse_selection(value: &str) -> Result<Option<Vec<usize>>, String> {
    if value.trim().eq_ignore_ascii_case("all") {
        return Ok(None);
    }
    let mut indices = Vec::new();
    for part in value.split(',') {
        let part = part.trim();
        let n: usize = part
            .parse()
            .map_err(|_| format!("invalid selection entry {part:?}"))?;
        if n == 0 {
            return Err("selection indices are 1-based".to_string());
        }
        indices.push(n - 1);
    }
    Ok(Some(indices))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_search_parses() {
        let args = Args::try_parse_from(["paperhaul", "search", "transformers"]).unwrap();
        match args.command {
            Command::Search { search, page } => {
                assert_eq!(search.query, "transformers");
                assert_eq!(search.max_results, DEFAULT_MAX_RESULTS);
                assert!(!search.no_cache);
                assert_eq!(page, 1);
            }
            Command::Fetch { .. } => panic!("expected search command"),
        }
    }

    #[test]
    fn test_cli_fetch_with_filters() {
        let args = Args::try_parse_from([
            "paperhaul",
            "fetch",
            "diffusion models",
            "--category",
            "cs.CV",
            "--from",
            "2023-01-01",
            "--select",
            "1,3",
            "-c",
            "8",
        ])
        .unwrap();
        match args.command {
            Command::Fetch {
                search,
                select,
                concurrency,
                ..
            } => {
                assert_eq!(search.query, "diffusion models");
                assert_eq!(search.category.as_deref(), Some("cs.CV"));
                assert_eq!(
                    search.from,
                    Some(NaiveDate::from_ymd_opt(2023, 1, 1).unwrap())
                );
                assert_eq!(select, "1,3");
                assert_eq!(concurrency, Some(8));
            }
            Command::Search { .. } => panic!("expected fetch command"),
        }
    }

    #[test]
    fn test_cli_fetch_engine_flags_default_to_config() {
        let args = Args::try_parse_from(["paperhaul", "fetch", "transformers"]).unwrap();
        match args.command {
            Command::Fetch {
                concurrency,
                max_attempts,
                ..
            } => {
                assert_eq!(concurrency, None, "Unset -c must defer to the config");
                assert_eq!(max_attempts, None, "Unset -r must defer to the config");
            }
            Command::Search { .. } => panic!("expected fetch command"),
        }
    }

    #[test]
    fn test_cli_rejects_bad_date() {
        let result = Args::try_parse_from(["paperhaul", "search", "q", "--from", "01/02/2023"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_verbose_and_quiet_flags() {
        let args = Args::try_parse_from(["paperhaul", "-vv", "search", "q"]).unwrap();
        assert_eq!(args.verbose, 2);

        let args = Args::try_parse_from(["paperhaul", "--quiet", "search", "q"]).unwrap();
        assert!(args.quiet);
    }

    #[test]
    fn test_parse_selection_all() {
        assert_eq!(parse_selection("all").unwrap(), None);
        assert_eq!(parse_selection("ALL").unwrap(), None);
    }

    #[test]
    fn test_parse_selection_indices_are_one_based() {
        assert_eq!(parse_selection("1,3,7").unwrap(), Some(vec![0, 2, 6]));
        assert!(parse_selection("0").is_err());
        assert!(parse_selection("1,x").is_err());
    }
}
