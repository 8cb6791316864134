//! kvprobe Load Harness Binary
//!
//! Runs many concurrent sessions against a server and prints the tally.

use clap::Parser;
use kvprobe::config::{DEFAULT_HOST, DEFAULT_PORT};
use kvprobe::scenarios::Scenario;
use kvprobe::{Config, Controller};
use tracing_subscriber::{fmt, EnvFilter};

/// kvprobe load harness
#[derive(Parser, Debug)]
#[command(name = "kvprobe")]
#[command(about = "Conformance and load test harness for RESP key-value servers")]
#[command(version)]
struct Args {
    /// Server host
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    /// Server port
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Total number of sessions (connections) to run
    #[arg(short = 'n', long, default_value = "100")]
    sessions: usize,

    /// Maximum sessions in flight at once
    #[arg(short, long, default_value = "64")]
    concurrency: usize,

    /// Connect/read/write timeout in milliseconds
    #[arg(short, long, default_value = "5000")]
    timeout_ms: u64,

    /// Workflow each session runs
    #[arg(short, long, default_value = "round-trip")]
    scenario: Scenario,

    /// Prefix for per-session keys
    #[arg(short, long, default_value = "client")]
    key_prefix: String,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,kvprobe=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    tracing::info!("kvprobe v{}", kvprobe::VERSION);
    tracing::info!("Target: {}:{}", args.host, args.port);
    tracing::info!("Scenario: {}", args.scenario);

    let config = match Config::builder()
        .host(&args.host)
        .port(args.port)
        .sessions(args.sessions)
        .concurrency(args.concurrency)
        .io_timeout_ms(args.timeout_ms)
        .build()
    {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(2);
        }
    };

    let controller = match Controller::new(config) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(2);
        }
    };

    let scenario = args.scenario;
    let prefix = args.key_prefix;
    let report = match controller.run(|index| scenario.workflow(&prefix, index)) {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Harness error: {}", e);
            std::process::exit(1);
        }
    };

    if args.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                tracing::error!("Could not serialize report: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        print!("{}", report);
    }

    if !report.all_succeeded() {
        std::process::exit(1);
    }
}
