//! ReqFilter CLI
//!
//! Loads filter lists, matches URLs and queries cosmetic rules from the
//! command line. Mostly a debugging and list-triage tool.

use std::path::Path;
use std::time::Instant;

use clap::{Parser, Subcommand};
use serde::Serialize;

use rf_core::{
    CosmeticOption, Engine, EngineConfig, FilterList, Request, RequestType, RuleStorage,
    ScannerFlags,
};

#[derive(Parser)]
#[command(name = "rf-cli")]
#[command(about = "ReqFilter rule engine tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load filter lists and print engine stats
    Scan {
        /// Input filter list files
        #[arg(short, long, required = true)]
        input: Vec<String>,

        /// Parse hosts-file syntax (IP HOSTNAME lines)
        #[arg(long)]
        hosts: bool,

        /// Skip cosmetic rules
        #[arg(long)]
        ignore_cosmetic: bool,
    },

    /// Match a request against the loaded lists
    Match {
        /// Input filter list files
        #[arg(short, long, required = true)]
        input: Vec<String>,

        /// Request URL
        #[arg(short, long)]
        url: String,

        /// Source (document) URL
        #[arg(short, long)]
        source: Option<String>,

        /// Request type (script, image, document, ...)
        #[arg(short = 't', long, default_value = "document")]
        request_type: String,
    },

    /// Print cosmetic rules applying to a hostname
    Cosmetic {
        /// Input filter list files
        #[arg(short, long, required = true)]
        input: Vec<String>,

        /// Hostname to query
        #[arg(long)]
        hostname: String,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Scan {
            input,
            hosts,
            ignore_cosmetic,
        } => cmd_scan(&input, hosts, ignore_cosmetic),
        Commands::Match {
            input,
            url,
            source,
            request_type,
        } => cmd_match(&input, &url, source.as_deref(), &request_type),
        Commands::Cosmetic { input, hostname } => cmd_cosmetic(&input, &hostname),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn load_engine(inputs: &[String], flags: ScannerFlags) -> Result<Engine, String> {
    let mut lists = Vec::new();
    for (list_id, path) in inputs.iter().enumerate() {
        let list = FilterList::from_file(list_id as i32 + 1, path)
            .map_err(|e| format!("failed to read '{path}': {e}"))?;
        lists.push(list);
    }

    let config = EngineConfig::new("rf-cli", env!("CARGO_PKG_VERSION"), false);
    let mut engine = Engine::deferred(RuleStorage::new(lists), config);
    engine.set_scanner_flags(flags);
    engine.load_rules();
    Ok(engine)
}

#[derive(Serialize)]
struct ScanStats {
    engine: String,
    version: String,
    lists: usize,
    rules: usize,
    network_rules: usize,
    cosmetic_rules: usize,
    load_ms: u128,
}

fn cmd_scan(inputs: &[String], hosts: bool, ignore_cosmetic: bool) -> Result<(), String> {
    let mut flags = ScannerFlags::NETWORK_RULES;
    if !ignore_cosmetic {
        flags |= ScannerFlags::COSMETIC_RULES;
    }
    if hosts {
        flags |= ScannerFlags::HOST_RULES;
    }

    let start = Instant::now();
    let engine = load_engine(inputs, flags)?;
    let load_ms = start.elapsed().as_millis();

    for path in inputs {
        println!(
            "  {}",
            Path::new(path)
                .file_name()
                .unwrap_or_default()
                .to_string_lossy()
        );
    }

    let stats = ScanStats {
        engine: engine.config().engine.clone(),
        version: engine.config().version.clone(),
        lists: inputs.len(),
        rules: engine.rules_count(),
        network_rules: engine.network_rules_count(),
        cosmetic_rules: engine.cosmetic_rules_count(),
        load_ms,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&stats).map_err(|e| e.to_string())?
    );
    Ok(())
}

#[derive(Serialize)]
struct MatchVerdict {
    url: String,
    blocked: bool,
    allowlisted: bool,
    basic_rule: Option<String>,
    csp_rules: Vec<String>,
    replace_rules: Vec<String>,
    cookie_rules: Vec<String>,
    redirect_rule: Option<String>,
}

fn cmd_match(
    inputs: &[String],
    url: &str,
    source: Option<&str>,
    request_type: &str,
) -> Result<(), String> {
    let engine = load_engine(inputs, ScannerFlags::default())?;

    let request = Request::new(url, source, RequestType::from_str(request_type));
    let result = engine.match_request(&request);

    let verdict = MatchVerdict {
        url: url.to_string(),
        blocked: result.should_block(),
        allowlisted: result.is_allowlisted(),
        basic_rule: result.get_basic_result().map(|r| r.text().to_string()),
        csp_rules: result.csp_rules.iter().map(|m| m.rule.text().to_string()).collect(),
        replace_rules: result
            .replace_rules
            .iter()
            .map(|m| m.rule.text().to_string())
            .collect(),
        cookie_rules: result
            .cookie_rules
            .iter()
            .map(|m| m.rule.text().to_string())
            .collect(),
        redirect_rule: result.redirect_rule.map(|m| m.rule.text().to_string()),
    };

    println!(
        "{}",
        serde_json::to_string_pretty(&verdict).map_err(|e| e.to_string())?
    );
    Ok(())
}

#[derive(Serialize)]
struct CosmeticOutput {
    hostname: String,
    element_hiding: Vec<String>,
    css: Vec<String>,
    js: Vec<String>,
    html: Vec<String>,
}

fn cmd_cosmetic(inputs: &[String], hostname: &str) -> Result<(), String> {
    let engine = load_engine(inputs, ScannerFlags::default())?;
    let result = engine.get_cosmetic_result(hostname, CosmeticOption::all());

    let collect = |set: &rf_core::engine::cosmetic::CosmeticRuleSet<'_>| -> Vec<String> {
        set.generic
            .iter()
            .chain(set.specific.iter())
            .map(|r| r.content().to_string())
            .collect()
    };

    let output = CosmeticOutput {
        hostname: hostname.to_string(),
        element_hiding: collect(&result.element_hiding),
        css: collect(&result.css),
        js: collect(&result.js),
        html: collect(&result.html),
    };

    println!(
        "{}",
        serde_json::to_string_pretty(&output).map_err(|e| e.to_string())?
    );
    Ok(())
}
