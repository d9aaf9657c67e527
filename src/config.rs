use clap::{ArgAction, Parser, ValueEnum};
use std::{net::SocketAddr, path::PathBuf};

use crate::intake::AcceptPolicy;

#[derive(Parser, Debug)]
#[command(name = "aikitchen", version, about = "HTTP API server for AI Kitchen")]
pub struct Cli {
    #[command(flatten)]
    pub config: Config,
}

/// Which generative model backend answers recipe requests.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    /// OpenAI-compatible chat completions (Gemini by default)
    Gemini,
    /// Canned replies, no network
    Fake,
}

/// AI Kitchen server configuration
#[derive(Parser, Debug, Clone)]
pub struct Config {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Decrease verbosity (-q, -qq, -qqq)
    #[arg(short = 'q', action = ArgAction::Count, global = true)]
    pub quiet: u8,

    /// Address to bind the HTTP server to
    #[arg(long, env = "AIKITCHEN_BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub bind: SocketAddr,

    /// Optional log file path (logs are written to stdout + this file)
    #[arg(long, env = "AIKITCHEN_LOG_FILE", default_value = "aikitchen.logs")]
    pub log_file: PathBuf,

    /// Maximum number of files held in the selection
    #[arg(long, env = "AIKITCHEN_MAX_FILES", default_value_t = 1)]
    pub max_files: usize,

    /// Per-file size ceiling in megabytes
    #[arg(long, env = "AIKITCHEN_MAX_SIZE_MB", default_value_t = 20)]
    pub max_size_mb: u64,

    /// LLM backend
    #[arg(long, env = "AIKITCHEN_LLM_PROVIDER", value_enum, default_value = "gemini")]
    pub llm_provider: LlmProvider,

    /// LLM API key (required for the gemini provider)
    #[arg(long, env = "AIKITCHEN_LLM_API_KEY")]
    pub llm_api_key: Option<String>,

    /// LLM API URL (OpenAI-compatible base)
    #[arg(
        long,
        env = "AIKITCHEN_LLM_API_URL",
        default_value = "https://generativelanguage.googleapis.com/v1beta/openai"
    )]
    pub llm_api_url: String,

    /// Reply returned by the fake provider
    #[arg(long, env = "AIKITCHEN_FAKE_REPLY", default_value = "Resep: nasi goreng")]
    pub fake_reply: String,
}

impl Config {
    #[must_use]
    pub fn verbosity_delta(&self) -> i16 {
        i16::from(self.verbose) - i16::from(self.quiet)
    }
    #[must_use]
    pub fn log_filter(&self) -> &'static str {
        match self.verbosity_delta() {
            d if d <= -2 => "error",
            -1 => "warn",
            0 => "info,aikitchen=info,axum=info,tower_http=info",
            1 => "debug,aikitchen=debug,axum=info,tower_http=info,reqwest=info",
            2 => "trace,aikitchen=trace,axum=debug,tower_http=trace,hyper=info",
            _ => "trace,aikitchen=trace,axum=trace,tower_http=trace,hyper=debug",
        }
    }

    /// Per-file cap in bytes; absurd values pin to `u64::MAX`.
    #[must_use]
    pub const fn max_size_bytes(&self) -> u64 {
        self.max_size_mb.saturating_mul(1024 * 1024)
    }

    /// Upload policy derived from the size/count settings.
    #[must_use]
    pub fn accept_policy(&self) -> AcceptPolicy {
        AcceptPolicy {
            max_size: self.max_size_bytes(),
            max_files: self.max_files,
            ..AcceptPolicy::default()
        }
    }

    /// Largest request body the upload route should let through to the policy.
    #[must_use]
    pub fn body_limit(&self) -> usize {
        let per_file = usize::try_from(self.max_size_bytes()).unwrap_or(usize::MAX);
        per_file
            .saturating_mul(self.max_files.max(1))
            .saturating_add(1024 * 1024)
    }
}
