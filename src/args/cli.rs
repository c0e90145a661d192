use clap::{Args, Parser, Subcommand, ValueEnum};
use std::time::Duration;

use super::parsers::{parse_duration_arg, parse_header, parse_positive_u64, parse_positive_usize};
use crate::domain::{HttpMethod, PositiveU64, PositiveUsize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON report
    #[default]
    Json,
    /// Short human-readable summary
    Summary,
}

#[derive(Debug, Parser, Clone)]
#[clap(
    name = "webprobe",
    version,
    about = "Async HTTP probe engine - validated endpoint checks, concurrency-bounded batches, and sustained-throughput stress tests."
)]
pub struct ProbeArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Path to a TOML or JSON config file (defaults to ./webprobe.toml or ./webprobe.json)
    #[arg(long, short = 'c', global = true, env = "WEBPROBE_CONFIG")]
    pub config: Option<String>,

    /// Write the report to this file instead of stdout
    #[arg(long, short = 'o', global = true)]
    pub output: Option<String>,

    /// Report format
    #[arg(long, value_enum, global = true, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Enable debug logging (overridden by WEBPROBE_LOG / RUST_LOG)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Disable ANSI colors in log output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Check every configured endpoint once, in concurrency-bounded groups
    Check(RequestArgs),
    /// Drive endpoints at a target request rate for a fixed duration
    Stress(StressArgs),
    /// GET each URL and report reachability
    Connectivity(ConnectivityArgs),
    /// Run a single health check against the first endpoint
    Health(RequestArgs),
}

/// Settings shared by every request of a run.
#[derive(Debug, Args, Clone, Default)]
pub struct RunArgs {
    /// Requests dispatched together per group
    #[arg(long, short = 'n', value_parser = parse_positive_usize)]
    pub concurrency: Option<PositiveUsize>,

    /// Per-request timeout (supports ms/s/m/h)
    #[arg(long, short = 't', value_parser = parse_duration_arg)]
    pub timeout: Option<Duration>,

    /// Retries after a transport failure
    #[arg(long, short = 'r')]
    pub retries: Option<u32>,

    /// Base delay of the exponential retry backoff (supports ms/s/m/h)
    #[arg(long = "backoff", value_parser = parse_duration_arg)]
    pub backoff: Option<Duration>,

    /// Default HTTP headers in 'Key: Value' format (repeatable)
    #[arg(long = "header", short = 'H', value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Do not follow redirects
    #[arg(long = "no-redirects")]
    pub no_redirects: bool,

    /// Maximum redirects to follow
    #[arg(long = "max-redirects")]
    pub max_redirects: Option<usize>,
}

/// An endpoint given on the command line.
#[derive(Debug, Args, Clone, Default)]
pub struct EndpointArgs {
    /// Target URL (repeatable); added to the endpoints from the config file
    #[arg(long, short = 'u')]
    pub url: Vec<String>,

    /// HTTP method for the URLs given with --url
    #[arg(long, short = 'X', ignore_case = true)]
    pub method: Option<HttpMethod>,

    /// Request body for the URLs given with --url (POST/PUT/PATCH only)
    #[arg(long, short = 'd')]
    pub data: Option<String>,

    /// Expected status code for the URLs given with --url (default: any 2xx)
    #[arg(long = "expect-status")]
    pub expect_status: Option<u16>,
}

#[derive(Debug, Args, Clone, Default)]
pub struct RequestArgs {
    #[command(flatten)]
    pub endpoint: EndpointArgs,

    #[command(flatten)]
    pub run: RunArgs,
}

#[derive(Debug, Args, Clone, Default)]
pub struct StressArgs {
    #[command(flatten)]
    pub request: RequestArgs,

    /// Total test duration (supports ms/s/m/h)
    #[arg(long, value_parser = parse_duration_arg)]
    pub duration: Option<Duration>,

    /// Time to ramp from zero to the target rate (supports ms/s/m/h, 0 disables)
    #[arg(long = "ramp-up", value_parser = parse_duration_arg)]
    pub ramp_up: Option<Duration>,

    /// Target requests per second
    #[arg(long, value_parser = parse_positive_u64)]
    pub rps: Option<PositiveU64>,

    /// Ceiling on simultaneously in-flight requests
    #[arg(long = "max-concurrent", value_parser = parse_positive_usize)]
    pub max_concurrent: Option<PositiveUsize>,

    /// Pause between waves (supports ms/s/m/h)
    #[arg(long = "think-time", value_parser = parse_duration_arg)]
    pub think_time: Option<Duration>,
}

#[derive(Debug, Args, Clone, Default)]
pub struct ConnectivityArgs {
    /// URLs to probe
    #[arg(required = true)]
    pub urls: Vec<String>,

    #[command(flatten)]
    pub run: RunArgs,
}
