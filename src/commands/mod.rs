mod download;
mod inspect;
mod validate;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use crate::config::{HarvestConfig, RetryConfig, SourceConfig};
use crate::source::{XmgrClient, DEFAULT_PAGE_SIZE};

/// Download ground truth and the answer corpus from a Source Project
#[derive(Debug, Parser)]
#[command(name = "corpus-harvest", version)]
pub struct Cli {
    /// Log requests and per-item detail
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Download truth, then the corpus, then drop truth rows missing from the corpus
    Download {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        job: JobArgs,
    },
    /// Download truth.json and truth.csv
    Truth {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Download corpus.csv, resuming an interrupted download
    Corpus {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        job: JobArgs,
    },
    /// List the PAU ids referenced by a document
    PauIds {
        #[command(flatten)]
        source: SourceArgs,
        /// Document id
        document: String,
    },
    /// Show an individual PAU
    Pau {
        #[command(flatten)]
        source: SourceArgs,
        /// PAU id
        pau_id: String,
    },
    /// Move truth rows whose answer id is not in the corpus to truth.non_corpus.csv
    Validate {
        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Debug, Args)]
pub struct SourceArgs {
    /// Project URL [env: XMGR_URL]
    #[arg(long)]
    url: Option<String>,
    /// [env: XMGR_USERNAME]
    #[arg(long)]
    username: Option<String>,
    /// [env: XMGR_PASSWORD]
    #[arg(long)]
    password: Option<String>,
    /// Questions requested per page
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: usize,
    /// Retries of a single request after a transient HTTP failure
    #[arg(long, default_value_t = RetryConfig::default().max_retries)]
    request_retries: u32,
}

impl SourceArgs {
    fn client(&self) -> Result<XmgrClient> {
        let config = SourceConfig::resolve(
            self.url.clone(),
            self.username.clone(),
            self.password.clone(),
        )?;
        let retry = RetryConfig {
            max_retries: self.request_retries,
            ..RetryConfig::default()
        };
        XmgrClient::new(&config, self.page_size, retry).context("Failed to create HTTP client")
    }
}

#[derive(Debug, Args)]
pub struct OutputArgs {
    #[arg(long, default_value = ".")]
    output_directory: PathBuf,
}

#[derive(Debug, Args)]
pub struct JobArgs {
    #[command(flatten)]
    output: OutputArgs,
    /// Maximum number of corpus documents to download
    #[arg(long)]
    max_docs: Option<usize>,
    /// Log progress after this many items
    #[arg(long, default_value_t = HarvestConfig::default().checkpoint_frequency)]
    checkpoint_frequency: usize,
    /// Number of times to rerun the download after an error
    #[arg(long)]
    retries: Option<u32>,
}

impl JobArgs {
    fn config(&self) -> HarvestConfig {
        HarvestConfig {
            output_directory: self.output.output_directory.clone(),
            checkpoint_frequency: self.checkpoint_frequency,
            max_docs: self.max_docs,
            job_retries: self.retries,
            ..HarvestConfig::default()
        }
    }
}

pub async fn run(command: Command) -> Result<()> {
    match command {
        Command::Download { source, job } => {
            let config = job.config();
            download::download(&source.client()?, &config, true).await
        }
        Command::Corpus { source, job } => {
            let config = job.config();
            download::download(&source.client()?, &config, false).await
        }
        Command::Truth { source, output } => {
            download::truth(&source.client()?, &output.output_directory).await
        }
        Command::PauIds { source, document } => {
            inspect::pau_ids(&source.client()?, &document).await
        }
        Command::Pau { source, pau_id } => inspect::pau(&source.client()?, &pau_id).await,
        Command::Validate { output } => validate::validate(&output.output_directory),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_download_defaults() {
        let cli = Cli::parse_from(["corpus-harvest", "download", "--url", "https://xmgr.example.com"]);
        let Command::Download { source, job } = cli.command else {
            panic!("expected download");
        };
        let config = job.config();
        assert_eq!(config.output_directory, PathBuf::from("."));
        assert_eq!(config.checkpoint_frequency, 100);
        assert_eq!(source.page_size, 500);
        assert_eq!(config.job_retries, None);
        assert_eq!(source.request_retries, 3);
    }

    #[test]
    fn test_corpus_flags() {
        let cli = Cli::parse_from([
            "corpus-harvest",
            "-v",
            "corpus",
            "--output-directory",
            "out",
            "--max-docs",
            "10",
            "--retries",
            "2",
        ]);
        assert!(cli.verbose);
        let Command::Corpus { source, job } = cli.command else {
            panic!("expected corpus");
        };
        let config = job.config();
        assert_eq!(config.output_directory, PathBuf::from("out"));
        assert_eq!(config.max_docs, Some(10));
        assert_eq!(config.job_retries, Some(2));
        assert_eq!(config.job_retry_delay_secs, 60);
    }

    #[test]
    fn test_pau_takes_positional_id() {
        let cli = Cli::parse_from(["corpus-harvest", "pau", "abc-123", "--username", "u"]);
        match cli.command {
            Command::Pau { pau_id, source } => {
                assert_eq!(pau_id, "abc-123");
                assert_eq!(source.username.as_deref(), Some("u"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
