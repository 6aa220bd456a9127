//! upload-relay e2e test runner
//!
//! Default (no args): finds the relay binary, spawns it, runs all tests, kills it.
//!
//!   cargo run                          # auto-detect relay binary, run all tests
//!   cargo run -- list                  # list all tests
//!   cargo run -- run                   # connect to already-running relay
//!   cargo run -- spawn-and-run [opts]  # explicit paths / ports

mod backend;
mod client;
mod runner;
mod tests;
mod types;

use clap::{Parser, Subcommand};
use colored::Colorize;
use runner::{list_tests, run_tests, TestContext};
use std::path::PathBuf;
use tests::all_tests;

/// Default relay binary candidates, tried in order
const DEFAULT_RELAY_BINS: &[&str] = &["../target/release/upload-relay", "../target/debug/upload-relay"];

const DEFAULT_RELAY_CONFIG: &str = "test_configs/relay.yaml";
/// Matches `uploads.dir` in the default config, relative to the spawned relay's cwd
const DEFAULT_UPLOADS_DIR: &str = "test_uploads";
const DEFAULT_UPSTREAM_PORT: u16 = 18080;
const DEFAULT_RELAY_PORT: u16 = 18066;

#[derive(Parser)]
#[command(
    name = "e2e",
    about = "End-to-end tests for upload-relay",
    long_about = "Runs all e2e tests by default (no arguments needed).\n\
                  Spawns the relay binary automatically, runs tests, then kills it."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Only run tests whose name contains this string (applies to default run)
    #[arg(long, short, global = true)]
    filter: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Connect to an already-running relay and run tests
    Run {
        /// Address of the real relay
        #[arg(long, default_value = "127.0.0.1:18066")]
        relay_addr: String,

        /// Port for the mock upstream - the relay's upstream url must point here
        #[arg(long, default_value_t = DEFAULT_UPSTREAM_PORT)]
        upstream_port: u16,

        /// Relay upload directory; cleanup checks are skipped when omitted
        #[arg(long)]
        uploads_dir: Option<PathBuf>,

        /// Only run tests whose name contains this string
        #[arg(long, short)]
        filter: Option<String>,
    },

    /// List all available tests
    List,

    /// Spawn the relay binary, run all tests, then kill it
    SpawnAndRun {
        /// Path to the upload-relay binary
        #[arg(long)]
        relay_bin: Option<String>,

        /// Path to the relay config YAML (upstream must point at mock upstream port)
        #[arg(long, default_value = DEFAULT_RELAY_CONFIG)]
        relay_config: String,

        /// Port for the mock upstream - must match config
        #[arg(long, default_value_t = DEFAULT_UPSTREAM_PORT)]
        upstream_port: u16,

        /// Relay listen port - must match config
        #[arg(long, default_value_t = DEFAULT_RELAY_PORT)]
        relay_port: u16,

        /// Relay upload directory - must match config
        #[arg(long, default_value = DEFAULT_UPLOADS_DIR)]
        uploads_dir: PathBuf,

        /// Only run tests whose name contains this string
        #[arg(long, short)]
        filter: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        // ── No subcommand: default full run ──────────────────────────────────
        None => {
            let relay_bin = find_relay_bin()?;
            do_spawn_and_run(SpawnOptions {
                relay_bin,
                relay_config: DEFAULT_RELAY_CONFIG.to_string(),
                upstream_port: DEFAULT_UPSTREAM_PORT,
                relay_port: DEFAULT_RELAY_PORT,
                uploads_dir: PathBuf::from(DEFAULT_UPLOADS_DIR),
                filter: cli.filter,
            })
            .await?;
        }

        // ── list ─────────────────────────────────────────────────────────────
        Some(Command::List) => {
            list_tests(&all_tests());
        }

        // ── run (connect to existing relay) ───────────────────────────────────
        Some(Command::Run {
            relay_addr,
            upstream_port,
            uploads_dir,
            filter,
        }) => {
            let filter = filter.or(cli.filter);
            println!("Starting mock upstream on port {}...", upstream_port);
            let upstream_state = backend::start(upstream_port).await?;
            println!("Mock upstream running on 127.0.0.1:{}", upstream_port);

            let ctx = TestContext {
                relay_addr,
                upstream_state,
                http_client: client::build_client(),
                uploads_dir,
            };

            let results = run_tests(all_tests(), ctx, filter.as_deref()).await;
            exit_on_failure(&results);
        }

        // ── spawn-and-run ─────────────────────────────────────────────────────
        Some(Command::SpawnAndRun {
            relay_bin,
            relay_config,
            upstream_port,
            relay_port,
            uploads_dir,
            filter,
        }) => {
            let relay_bin = match relay_bin {
                Some(p) => p,
                None => find_relay_bin()?,
            };
            do_spawn_and_run(SpawnOptions {
                relay_bin,
                relay_config,
                upstream_port,
                relay_port,
                uploads_dir,
                filter: filter.or(cli.filter),
            })
            .await?;
        }
    }

    Ok(())
}

struct SpawnOptions {
    relay_bin: String,
    relay_config: String,
    upstream_port: u16,
    relay_port: u16,
    uploads_dir: PathBuf,
    filter: Option<String>,
}

/// Shared implementation for spawn-and-run (used by both default and explicit subcommand)
async fn do_spawn_and_run(opts: SpawnOptions) -> anyhow::Result<()> {
    println!("Starting mock upstream on port {}...", opts.upstream_port);
    let upstream_state = backend::start(opts.upstream_port).await?;
    println!("Mock upstream running on 127.0.0.1:{}", opts.upstream_port);

    println!("Spawning relay: {} --config {} run", opts.relay_bin, opts.relay_config);
    let mut relay_process = tokio::process::Command::new(&opts.relay_bin)
        .arg("--config")
        .arg(&opts.relay_config)
        .arg("run")
        // PORT would otherwise override the config's listen port
        .env_remove("PORT")
        .env_remove("RELAY_UPSTREAM_URL")
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| anyhow::anyhow!("Failed to spawn '{}': {}", opts.relay_bin, e))?;

    let relay_addr = format!("127.0.0.1:{}", opts.relay_port);
    println!("Waiting for relay at {}...", relay_addr);
    wait_for_relay(&relay_addr).await?;
    println!("Relay is ready!\n");

    let ctx = TestContext {
        relay_addr,
        upstream_state,
        http_client: client::build_client(),
        uploads_dir: Some(opts.uploads_dir),
    };

    let results = run_tests(all_tests(), ctx, opts.filter.as_deref()).await;

    relay_process.kill().await.ok();

    exit_on_failure(&results);
    Ok(())
}

/// Find the relay binary, trying release then debug builds
fn find_relay_bin() -> anyhow::Result<String> {
    for candidate in DEFAULT_RELAY_BINS {
        if std::path::Path::new(candidate).exists() {
            println!("Using relay binary: {}", candidate.bright_cyan());
            return Ok(candidate.to_string());
        }
    }
    Err(anyhow::anyhow!(
        "No relay binary found. Tried: {}\nBuild with: cd .. && cargo build --release",
        DEFAULT_RELAY_BINS.join(", ")
    ))
}

/// Exit with code 1 if any tests failed
fn exit_on_failure(results: &[crate::types::TestResult]) {
    let failed = results.iter().filter(|r| !r.passed).count();
    if failed > 0 {
        std::process::exit(1);
    }
}

/// Wait for the relay to start accepting connections
async fn wait_for_relay(addr: &str) -> anyhow::Result<()> {
    let client = client::build_client();
    let health_url = format!("http://{}/health", addr);

    for attempt in 0..30 {
        tokio::time::sleep(tokio::time::Duration::from_millis(200 + attempt * 100)).await;
        if client.get(&health_url).send().await.is_ok() {
            return Ok(());
        }
    }

    Err(anyhow::anyhow!(
        "Relay did not start within timeout. Is the binary correct? Check: {}",
        addr
    ))
}
