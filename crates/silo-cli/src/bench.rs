use std::cmp::Ordering;
use std::fs;
use std::time::Instant;

use silo_core::{Resolution, ResolveContext, Resolver, Rule};

pub struct BenchOptions {
    pub rules_path: String,
    pub urls_path: String,
    pub iterations: usize,
}

struct BenchResult {
    ops: usize,
    total_ms: f64,
    avg_us: f64,
    p50_us: f64,
    p95_us: f64,
    p99_us: f64,
    ops_per_sec: u64,
    routed: usize,
    blocked: usize,
}

pub fn run(opts: BenchOptions) -> Result<(), String> {
    println!("============================================================");
    println!("Silo Resolution Benchmark");
    println!("============================================================");

    let content = fs::read_to_string(&opts.rules_path)
        .map_err(|e| format!("Failed to read '{}': {e}", opts.rules_path))?;
    let rules: Vec<Rule> = serde_json::from_str(&content)
        .map_err(|e| format!("Failed to parse '{}': {e}", opts.rules_path))?;

    let urls = load_urls(&opts.urls_path)?;
    println!("Rules: {}", rules.len());
    println!("URLs: {}", urls.len());
    println!("Iterations: {}", opts.iterations);
    println!();

    let mut resolver = Resolver::new();
    let ctx = ResolveContext::default();

    println!("Warmup...");
    for url in &urls {
        let _ = resolver.resolve(url, &rules, &ctx);
    }

    println!("Running...");
    let result = run_benchmark(&mut resolver, &rules, &urls, opts.iterations);

    println!();
    println!("Results:");
    println!("  Ops:         {}", result.ops);
    println!("  Total time:  {:.2}ms", result.total_ms);
    println!("  Avg latency: {:.2}us", result.avg_us);
    println!("  P50 latency: {:.2}us", result.p50_us);
    println!("  P95 latency: {:.2}us", result.p95_us);
    println!("  P99 latency: {:.2}us", result.p99_us);
    println!("  Throughput:  {} ops/sec", result.ops_per_sec);
    println!(
        "  Decisions:   {:.1}% routed, {:.1}% blocked, {:.1}% none",
        pct(result.routed, result.ops),
        pct(result.blocked, result.ops),
        pct(result.ops - result.routed - result.blocked, result.ops),
    );

    Ok(())
}

fn run_benchmark(
    resolver: &mut Resolver,
    rules: &[Rule],
    urls: &[String],
    iterations: usize,
) -> BenchResult {
    let ctx = ResolveContext::default();
    let mut latencies = Vec::with_capacity(urls.len() * iterations.max(1));
    let mut routed = 0usize;
    let mut blocked = 0usize;

    for _ in 0..iterations.max(1) {
        for url in urls {
            let start = Instant::now();
            let resolution = resolver.resolve(url, rules, &ctx);
            latencies.push(start.elapsed().as_secs_f64() * 1_000_000.0);
            match resolution {
                Resolution::Route { .. } => routed += 1,
                Resolution::Blocked => blocked += 1,
                Resolution::None => {}
            }
        }
    }

    latencies.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let ops = latencies.len();
    let total_ms = latencies.iter().sum::<f64>() / 1000.0;
    let avg_us = if ops == 0 {
        0.0
    } else {
        latencies.iter().sum::<f64>() / ops as f64
    };

    BenchResult {
        ops,
        total_ms,
        avg_us,
        p50_us: percentile(&latencies, 0.50),
        p95_us: percentile(&latencies, 0.95),
        p99_us: percentile(&latencies, 0.99),
        ops_per_sec: if total_ms > 0.0 {
            (ops as f64 / (total_ms / 1000.0)) as u64
        } else {
            0
        },
        routed,
        blocked,
    }
}

fn load_urls(path: &str) -> Result<Vec<String>, String> {
    let text = fs::read_to_string(path).map_err(|e| format!("Failed to read '{path}': {e}"))?;
    let urls: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect();
    if urls.is_empty() {
        return Err(format!("No URLs loaded from {path}"));
    }
    Ok(urls)
}

fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let idx = ((values.len() as f64) * p).ceil() as usize;
    let idx = idx.saturating_sub(1).min(values.len() - 1);
    values[idx]
}

fn pct(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        (part as f64 / whole as f64) * 100.0
    }
}
