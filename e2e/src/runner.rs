//! Test runner - executes tests and reports results
//!
//! Besides each case's own assertions, the runner checks two relay-wide
//! properties after every case: how many times upstream was called, and
//! whether any staged upload was left behind in the relay's upload dir.

use colored::Colorize;
use std::path::PathBuf;
use std::time::Instant;

use crate::tests::helpers::staged_count;
use crate::types::{SharedUpstreamState, TestResult};

/// A single test case
pub struct TestCase {
    pub name: &'static str,
    pub description: &'static str,
    pub run: Box<
        dyn Fn(TestContext) -> std::pin::Pin<Box<dyn std::future::Future<Output = anyhow::Result<()>> + Send>> + Send + Sync,
    >,
}

/// Context passed to each test - relay address, upstream state and the relay's upload dir
#[derive(Clone)]
pub struct TestContext {
    pub relay_addr: String,
    pub upstream_state: SharedUpstreamState,
    pub http_client: reqwest::Client,
    /// Staging directory the relay was configured with, if known
    pub uploads_dir: Option<PathBuf>,
}

/// Run all provided test cases sequentially and report results
pub async fn run_tests(cases: Vec<TestCase>, ctx: TestContext, filter: Option<&str>) -> Vec<TestResult> {
    let cases_to_run: Vec<&TestCase> = cases
        .iter()
        .filter(|c| filter.map_or(true, |f| c.name.contains(f)))
        .collect();

    print_banner(&ctx, cases_to_run.len());

    let mut results = Vec::with_capacity(cases_to_run.len());
    for case in cases_to_run {
        ctx.upstream_state.lock().unwrap().reset();

        print!("  {} {} ... ", "▶".bright_blue(), case.name.bright_white());
        let start = Instant::now();
        let outcome = (case.run)(ctx.clone()).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let upstream_calls = ctx.upstream_state.lock().unwrap().call_count;
        let leaked_files = ctx.uploads_dir.as_deref().and_then(|dir| staged_count(dir).ok());

        // A case that passes its own checks still fails if it leaked staged files
        let outcome = match (outcome, leaked_files) {
            (Ok(()), Some(n)) if n > 0 => Err(anyhow::anyhow!("{} staged file(s) left in upload dir", n)),
            (outcome, _) => outcome,
        };

        let result = TestResult {
            name: case.name.to_string(),
            passed: outcome.is_ok(),
            error: outcome.as_ref().err().map(|e| format!("{:#}", e)),
            duration_ms,
            upstream_calls,
            leaked_files,
        };
        print_result(&result);
        results.push(result);
    }

    print_summary(&results, ctx.uploads_dir.is_some());
    results
}

fn print_banner(ctx: &TestContext, count: usize) {
    println!("\n{}", "═══════════════════════════════════════════════════".bright_blue());
    println!("{}", "  upload-relay End-to-End Tests".bright_white().bold());
    println!("{}", "═══════════════════════════════════════════════════".bright_blue());
    println!("  Relay:   {}", ctx.relay_addr.bright_cyan());
    match ctx.uploads_dir {
        Some(ref dir) => println!("  Uploads: {}", dir.display().to_string().bright_cyan()),
        None => println!("  Uploads: {}", "unknown, leak checks skipped".yellow()),
    }
    println!("  Running: {} test(s)\n", count.to_string().bright_cyan());
}

fn print_result(result: &TestResult) {
    let calls = format!("upstream calls: {}", result.upstream_calls);
    if result.passed {
        println!("{} ({}ms, {})", "PASS".bright_green().bold(), result.duration_ms, calls);
    } else {
        println!("{} ({}ms, {})", "FAIL".bright_red().bold(), result.duration_ms, calls);
        if let Some(ref error) = result.error {
            println!("    {} {}", "Error:".bright_red(), error);
        }
    }
}

fn print_summary(results: &[TestResult], leak_checked: bool) {
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.len() - passed;
    let calls: usize = results.iter().map(|r| r.upstream_calls).sum();
    let total_ms: u64 = results.iter().map(|r| r.duration_ms).sum();

    println!("\n{}", "───────────────────────────────────────────────────".bright_blue());
    let summary = format!("  Results: {} passed, {} failed ({}ms)", passed, failed, total_ms);
    if failed == 0 {
        println!("{}", summary.bright_green().bold());
    } else {
        println!("{}", summary.bright_red().bold());
        for result in results.iter().filter(|r| !r.passed) {
            println!("    {} {}", "✗".bright_red(), result.name);
        }
    }
    println!("  Upstream calls: {}", calls);
    if leak_checked {
        let leaked: usize = results.iter().filter_map(|r| r.leaked_files).max().unwrap_or(0);
        println!("  Staged files left behind: {}", leaked);
    }
    println!("{}\n", "═══════════════════════════════════════════════════".bright_blue());
}

/// Helper to list all available tests, grouped by area
pub fn list_tests(cases: &[TestCase]) {
    println!("\n{}", "Available tests:".bright_white().bold());
    let mut area = "";
    for case in cases {
        let case_area = case.name.split('/').next().unwrap_or_default();
        if case_area != area {
            area = case_area;
            println!("  {}", area.bright_white());
        }
        println!("    {} - {}", case.name.bright_cyan(), case.description);
    }
    println!();
}
