//! Silo CLI
//!
//! Developer tool for validating rule files, previewing pattern matches,
//! dry-running presets, and benchmarking resolution.

use std::collections::{HashMap, HashSet};
use std::fs;

use clap::{Parser, Subcommand};

use silo_core::pattern::CompiledPattern;
use silo_core::preset::{plan, Preset};
use silo_core::{identity_keys, resolve, suggest_match_type, Container, ResolveContext, Rule};
use silo_store::SiloStore;

mod bench;

#[derive(Parser)]
#[command(name = "silo-cli")]
#[command(about = "Silo container-routing rule tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a rules file and report duplicates
    Check {
        /// Rules file (JSON array)
        #[arg(short, long)]
        rules: String,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Test one pattern against a URL without creating a rule
    Test {
        /// The pattern to compile
        #[arg(short, long)]
        pattern: String,

        /// Grammar: exact, domain, glob, or regex
        #[arg(short = 't', long)]
        match_type: String,

        /// Navigation URL to test
        url: String,
    },

    /// Resolve a navigation URL against a rules file
    Resolve {
        /// Rules file (JSON array)
        #[arg(short, long)]
        rules: String,

        /// Containers file (JSON array); rules targeting containers not in
        /// it are treated as inert
        #[arg(short, long)]
        containers: Option<String>,

        /// cookieStoreId of the navigating tab's current container
        #[arg(long)]
        current: Option<String>,

        /// Navigation URL to resolve
        url: String,
    },

    /// Suggest a matchType for a pattern
    Suggest {
        /// The pattern to classify
        pattern: String,
    },

    /// Dry-run a preset and print the plan
    Preset {
        /// Existing rules file (JSON array)
        #[arg(short, long)]
        rules: String,

        /// Preset file (JSON)
        #[arg(short, long)]
        preset: String,

        /// Target container; defaults to a fresh container
        #[arg(short, long)]
        container: Option<String>,
    },

    /// Benchmark resolution throughput over a URL workload
    Bench {
        /// Rules file (JSON array)
        #[arg(short, long)]
        rules: String,

        /// URL workload file, one URL per line
        #[arg(short, long)]
        urls: String,

        /// Passes over the workload
        #[arg(short, long, default_value_t = 1000)]
        iterations: usize,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check { rules, verbose } => cmd_check(&rules, verbose),
        Commands::Test {
            pattern,
            match_type,
            url,
        } => cmd_test(&pattern, &match_type, &url),
        Commands::Resolve {
            rules,
            containers,
            current,
            url,
        } => cmd_resolve(&rules, containers.as_deref(), current.as_deref(), &url),
        Commands::Suggest { pattern } => cmd_suggest(&pattern),
        Commands::Preset {
            rules,
            preset,
            container,
        } => cmd_preset(&rules, &preset, container.as_deref()),
        Commands::Bench {
            rules,
            urls,
            iterations,
        } => bench::run(bench::BenchOptions {
            rules_path: rules,
            urls_path: urls,
            iterations,
        }),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn load_rules(path: &str) -> Result<Vec<Rule>, String> {
    let content =
        fs::read_to_string(path).map_err(|e| format!("Failed to read '{path}': {e}"))?;
    serde_json::from_str(&content).map_err(|e| format!("Failed to parse '{path}': {e}"))
}

fn load_containers(path: &str) -> Result<Vec<Container>, String> {
    let content =
        fs::read_to_string(path).map_err(|e| format!("Failed to read '{path}': {e}"))?;
    serde_json::from_str(&content).map_err(|e| format!("Failed to parse '{path}': {e}"))
}

fn cmd_check(rules_path: &str, verbose: bool) -> Result<(), String> {
    let rules = load_rules(rules_path)?;

    let mut invalid = 0usize;
    for rule in &rules {
        match CompiledPattern::compile(&rule.pattern, rule.match_type) {
            Ok(_) => {
                if verbose {
                    println!(
                        "  ok   {} [{}] {} -> {} (priority {})",
                        rule.id,
                        rule.match_type.as_str(),
                        rule.pattern,
                        rule.container_id,
                        rule.priority
                    );
                }
            }
            Err(e) => {
                invalid += 1;
                println!("  FAIL {} [{}] {}: {e}", rule.id, rule.match_type.as_str(), rule.pattern);
            }
        }
    }

    // Group rules by shared identity key to surface functional duplicates
    let mut by_key: HashMap<String, Vec<&str>> = HashMap::new();
    for rule in &rules {
        for key in identity_keys(&rule.pattern, rule.match_type, rule.rule_type, &rule.container_id)
        {
            by_key.entry(key).or_default().push(&rule.id);
        }
    }
    let mut reported: HashSet<&str> = HashSet::new();
    let mut duplicates = 0usize;
    for (key, ids) in &by_key {
        if ids.len() < 2 {
            continue;
        }
        // An exact bare-origin rule shares two keys with its domain twin;
        // report each group of rules only once
        let mut fresh = false;
        for id in ids {
            fresh |= reported.insert(*id);
        }
        if fresh {
            duplicates += 1;
            println!("  DUP  {} <- {}", key, ids.join(", "));
        }
    }

    println!("Checked '{rules_path}'");
    println!("  Rules:      {}", rules.len());
    println!("  Invalid:    {invalid}");
    println!("  Duplicates: {duplicates}");

    if invalid > 0 {
        return Err(format!("{invalid} invalid rule(s)"));
    }
    Ok(())
}

fn cmd_test(pattern: &str, match_type: &str, url: &str) -> Result<(), String> {
    let match_type = match_type
        .parse()
        .map_err(|e| format!("{e} (expected exact, domain, glob, or regex)"))?;
    let matched = silo_core::pattern::test_pattern(url, pattern, match_type)
        .map_err(|e| format!("Invalid pattern: {e}"))?;
    println!("{}", if matched { "match" } else { "no match" });
    Ok(())
}

fn cmd_resolve(
    rules_path: &str,
    containers_path: Option<&str>,
    current: Option<&str>,
    url: &str,
) -> Result<(), String> {
    let rules = load_rules(rules_path)?;

    let resolution = match containers_path {
        Some(path) => {
            // With a container set, go through the store so dead-container
            // rules behave exactly as they do in the background service
            let containers = load_containers(path)?;
            let mut store = SiloStore::from_parts(containers, rules);
            store.resolve(url, current)
        }
        None => {
            let ctx = ResolveContext {
                current_container: current,
                live_containers: None,
            };
            resolve(url, &rules, &ctx)
        }
    };

    let json = serde_json::to_string_pretty(&resolution)
        .map_err(|e| format!("Failed to serialize resolution: {e}"))?;
    println!("{json}");
    Ok(())
}

fn cmd_suggest(pattern: &str) -> Result<(), String> {
    println!("{}", suggest_match_type(pattern).as_str());
    Ok(())
}

fn cmd_preset(rules_path: &str, preset_path: &str, container: Option<&str>) -> Result<(), String> {
    let rules = load_rules(rules_path)?;
    let content = fs::read_to_string(preset_path)
        .map_err(|e| format!("Failed to read '{preset_path}': {e}"))?;
    let preset: Preset = serde_json::from_str(&content)
        .map_err(|e| format!("Failed to parse '{preset_path}': {e}"))?;

    let container_id = container.unwrap_or("new-container");
    let mut n = 0;
    let planned = plan(&preset, container_id, &rules, || {
        n += 1;
        format!("preset-{n}")
    });

    println!(
        "Preset '{}' -> container '{}': {} to create, {} to skip",
        preset.name,
        container_id,
        planned.to_create.len(),
        planned.to_skip.len()
    );
    let json = serde_json::to_string_pretty(&planned)
        .map_err(|e| format!("Failed to serialize plan: {e}"))?;
    println!("{json}");
    Ok(())
}
