// Main CLI entry point for parcelprobe
// Uses clap for argument parsing, with environment fallbacks for the target and token

use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use anyhow::{anyhow, Context};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use log::{info, warn};

use parcelprobe::auth::TokenScheme;
use parcelprobe::config::{SuiteConfig, SuiteKind, DEFAULT_FIXTURES_DIR};
use parcelprobe::fixtures::Fixtures;
use parcelprobe::rate_limit::RateLimitPolicy;
use parcelprobe::reporting::{export_csv, export_json, export_markdown, ResultCollector, Summary};
use parcelprobe::suite::{run_all, ProbeContext};

struct ReportOptions {
    csv: bool,
    markdown: bool,
    json: bool,
}

fn cli() -> Command {
    Command::new("parcelprobe")
        .version(clap::crate_version!())
        .about("Black-box security probes for logistics pickup, bank-info and password-reset APIs")
        .after_help("EXAMPLES:\n  parcelprobe --base-url https://stg.example.com/api/v2 --token $TOKEN\n  API_BASE_URL=http://localhost:8080 parcelprobe --suite forget-password --max-attempts 30\n  parcelprobe -b https://stg.example.com/api/v2 --wallet-test --wallet-url https://wallet.example.com")
        .arg(Arg::new("base_url")
            .short('b')
            .long("base-url")
            .env("API_BASE_URL")
            .required(true)
            .help("Base URL of the target API"))
        .arg(Arg::new("token")
            .short('t')
            .long("token")
            .env("TEST_USER_TOKEN")
            .hide_env_values(true)
            .help("Token of a test user; probes needing one are skipped without it"))
        .arg(Arg::new("token_scheme")
            .long("token-scheme")
            .default_value("raw")
            .value_parser(value_parser!(TokenScheme))
            .help("How the token is sent: raw (Authorization: <token>) or bearer"))
        .arg(Arg::new("origin")
            .long("origin")
            .env("API_ORIGIN")
            .help("Origin header sent with every request"))
        .arg(Arg::new("timeout")
            .long("timeout")
            .default_value("15")
            .value_parser(value_parser!(u64))
            .help("Per-request timeout in seconds"))
        .arg(Arg::new("fixtures")
            .short('f')
            .long("fixtures")
            .value_parser(value_parser!(PathBuf))
            .help("Directory of JSON fixture files (default: config/testdata, else bundled)"))
        .arg(Arg::new("reports_dir")
            .short('o')
            .long("reports-dir")
            .default_value("reports")
            .value_parser(value_parser!(PathBuf))
            .help("Directory for report files"))
        .arg(Arg::new("wallet_url")
            .long("wallet-url")
            .env("API_WALLET_URL")
            .help("Wallet API base URL for the deduction probe"))
        .arg(Arg::new("wallet_test")
            .long("wallet-test")
            .action(ArgAction::SetTrue)
            .help("Enable the wallet deduction probe (creates a real pickup)"))
        .arg(Arg::new("known_email")
            .long("known-email")
            .env("KNOWN_EMAIL")
            .help("Email registered on the target, for the enumeration probe"))
        .arg(Arg::new("unknown_email")
            .long("unknown-email")
            .env("UNKNOWN_EMAIL")
            .help("Email not registered on the target"))
        .arg(Arg::new("pickup_id")
            .long("pickup-id")
            .help("Pickup id used by the lookup probe"))
        .arg(Arg::new("max_attempts")
            .long("max-attempts")
            .default_value("100")
            .value_parser(value_parser!(usize))
            .help("Request ceiling for the rate-limit probe"))
        .arg(Arg::new("delay_ms")
            .long("delay-ms")
            .default_value("100")
            .value_parser(value_parser!(u64))
            .help("Pause between rate-limit probe requests"))
        .arg(Arg::new("timing_limit_ms")
            .long("timing-limit-ms")
            .default_value("1000")
            .value_parser(value_parser!(u64))
            .help("Largest tolerated response-time gap in the enumeration probe"))
        .arg(Arg::new("suite")
            .short('s')
            .long("suite")
            .action(ArgAction::Append)
            .value_parser(value_parser!(SuiteKind))
            .help("Suite to run: pickups, bank-info or forget-password (repeatable; default all)"))
        .arg(Arg::new("no_csv_report")
            .long("no-csv-report")
            .action(ArgAction::SetTrue)
            .help("Do not write the CSV report"))
        .arg(Arg::new("no_markdown_report")
            .long("no-markdown-report")
            .action(ArgAction::SetTrue)
            .help("Do not write the Markdown report"))
        .arg(Arg::new("json_report")
            .long("json-report")
            .action(ArgAction::SetTrue)
            .help("Also write a JSON report"))
        .arg(Arg::new("save_artifacts")
            .long("save-artifacts")
            .action(ArgAction::SetTrue)
            .help("Keep request and response of every failed check under <reports-dir>/artifacts"))
}

fn config_from_matches(matches: &ArgMatches) -> anyhow::Result<SuiteConfig> {
    let base_url = matches
        .get_one::<String>("base_url")
        .ok_or_else(|| anyhow!("--base-url or API_BASE_URL is required"))?;
    let mut config = SuiteConfig::new(base_url.as_str());

    config.token = matches.get_one::<String>("token").cloned();
    if let Some(scheme) = matches.get_one::<TokenScheme>("token_scheme") {
        config.token_scheme = *scheme;
    }
    config.origin = matches.get_one::<String>("origin").cloned();
    if let Some(secs) = matches.get_one::<u64>("timeout") {
        config.timeout = Duration::from_secs(*secs);
    }
    config.fixtures_dir = matches.get_one::<PathBuf>("fixtures").cloned();
    if let Some(dir) = matches.get_one::<PathBuf>("reports_dir") {
        config.reports_dir = dir.clone();
    }
    config.wallet_url = matches.get_one::<String>("wallet_url").cloned();
    config.wallet_test = wallet_enabled(
        matches.get_flag("wallet_test"),
        std::env::var("SKIP_WALLET_TEST").ok().as_deref(),
    );
    config.save_artifacts = matches.get_flag("save_artifacts");
    if let Some(email) = matches.get_one::<String>("known_email") {
        config.known_email = email.clone();
    }
    if let Some(email) = matches.get_one::<String>("unknown_email") {
        config.unknown_email = email.clone();
    }
    if let Some(id) = matches.get_one::<String>("pickup_id") {
        config.pickup_id = id.clone();
    }
    config.rate_limit = RateLimitPolicy {
        max_attempts: matches.get_one::<usize>("max_attempts").copied().unwrap_or(config.rate_limit.max_attempts),
        delay: matches
            .get_one::<u64>("delay_ms")
            .map(|ms| Duration::from_millis(*ms))
            .unwrap_or(config.rate_limit.delay),
    };
    if let Some(ms) = matches.get_one::<u64>("timing_limit_ms") {
        config.timing_limit = Duration::from_millis(*ms);
    }
    if let Some(suites) = matches.get_many::<SuiteKind>("suite") {
        let mut selected: Vec<SuiteKind> = suites.copied().collect();
        selected.sort();
        selected.dedup();
        config.suites = selected;
    }

    config.validate().map_err(|e| anyhow!(e))?;
    Ok(config)
}

/// The wallet probe runs when asked for on the command line, or when
/// `SKIP_WALLET_TEST` is set to anything but `true`.
fn wallet_enabled(flag: bool, skip_env: Option<&str>) -> bool {
    flag || skip_env.map_or(false, |v| !v.trim().eq_ignore_ascii_case("true"))
}

fn load_fixtures(dir: Option<&Path>) -> anyhow::Result<Fixtures> {
    match dir {
        Some(dir) => Fixtures::load(dir).with_context(|| format!("loading fixtures from {}", dir.display())),
        None if Path::new(DEFAULT_FIXTURES_DIR).is_dir() => {
            Fixtures::load(DEFAULT_FIXTURES_DIR).context("loading default fixtures")
        }
        None => Fixtures::bundled().context("loading bundled fixtures"),
    }
}

fn print_results(collector: &ResultCollector) {
    for record in collector.records() {
        println!("[{}] {}::{}: {}", record.verdict, record.suite, record.probe, record.detail);
    }
    let summary = collector.summary();
    println!(
        "\n{} probes: {} secure, {} vulnerable, {} uncertain, {} skipped",
        summary.total(),
        summary.secure,
        summary.vulnerable,
        summary.uncertain,
        summary.skipped
    );
}

fn write_reports(collector: &ResultCollector, dir: &Path, options: &ReportOptions) {
    let mut written = Vec::new();
    if options.csv {
        written.push(export_csv(collector.records(), dir));
    }
    if options.markdown {
        written.push(export_markdown(collector, dir));
    }
    if options.json {
        written.push(export_json(collector, dir));
    }
    for result in written {
        match result {
            Ok(path) => info!("report written to {}", path.display()),
            Err(e) => warn!("failed to write report: {}", e),
        }
    }
}

async fn run(config: SuiteConfig, options: ReportOptions) -> anyhow::Result<Summary> {
    let fixtures = load_fixtures(config.fixtures_dir.as_deref())?;
    info!("loaded {} fixtures", fixtures.len());
    if config.token.is_none() {
        warn!("no token configured; authenticated probes will be skipped");
    }

    let reports_dir = config.reports_dir.clone();
    let ctx = ProbeContext::new(config, fixtures)?;
    let mut collector = ResultCollector::new();
    run_all(&ctx, &mut collector).await;

    print_results(&collector);
    write_reports(&collector, &reports_dir, &options);
    Ok(collector.summary())
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = cli().get_matches();
    let config = match config_from_matches(&matches) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {:#}", e);
            process::exit(2);
        }
    };
    let options = ReportOptions {
        csv: !matches.get_flag("no_csv_report"),
        markdown: !matches.get_flag("no_markdown_report"),
        json: matches.get_flag("json_report"),
    };

    match run(config, options).await {
        Ok(summary) if summary.is_clean() => {}
        Ok(_) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(2);
        }
    }
}
