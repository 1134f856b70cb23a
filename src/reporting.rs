// Result collection and reporting for parcelprobe
// Supports CSV, Markdown, and JSON export plus per-probe artifact files

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use log::{info, warn};
use serde::Serialize;

use crate::error::ProbeError;
use crate::verdict::Verdict;

pub const REPORT_PREFIX: &str = "security_report";

/// One probe's outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeRecord {
    pub suite: String,
    pub probe: String,
    pub verdict: Verdict,
    pub detail: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub secure: usize,
    pub vulnerable: usize,
    pub uncertain: usize,
    pub skipped: usize,
}

impl Summary {
    pub fn total(&self) -> usize {
        self.secure + self.vulnerable + self.uncertain + self.skipped
    }

    /// A run is clean when nothing was vulnerable or undecided.
    pub fn is_clean(&self) -> bool {
        self.vulnerable == 0 && self.uncertain == 0
    }
}

/// Append-only record of a run, owned by whoever drives the suites.
#[derive(Debug, Default)]
pub struct ResultCollector {
    records: Vec<ProbeRecord>,
}

impl ResultCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, suite: &str, probe: &str, result: Result<String, ProbeError>) -> Verdict {
        let (verdict, detail) = match result {
            Ok(detail) => (Verdict::Secure, detail),
            Err(ProbeError::Skipped(reason)) => (Verdict::Skipped, reason),
            Err(e) => (e.verdict(), e.to_string()),
        };
        match verdict {
            Verdict::Secure => info!("[{}] {}::{} {}", verdict, suite, probe, detail),
            Verdict::Skipped => info!("[{}] {}::{} ({})", verdict, suite, probe, detail),
            Verdict::Vulnerable | Verdict::Uncertain => warn!("[{}] {}::{} {}", verdict, suite, probe, detail),
        }
        self.records.push(ProbeRecord {
            suite: suite.to_string(),
            probe: probe.to_string(),
            verdict,
            detail,
        });
        verdict
    }

    pub fn records(&self) -> &[ProbeRecord] {
        &self.records
    }

    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        for record in &self.records {
            match record.verdict {
                Verdict::Secure => summary.secure += 1,
                Verdict::Vulnerable => summary.vulnerable += 1,
                Verdict::Uncertain => summary.uncertain += 1,
                Verdict::Skipped => summary.skipped += 1,
            }
        }
        summary
    }

    /// Records grouped by suite, in suite name order.
    pub fn by_suite(&self) -> BTreeMap<&str, Vec<&ProbeRecord>> {
        let mut grouped: BTreeMap<&str, Vec<&ProbeRecord>> = BTreeMap::new();
        for record in &self.records {
            grouped.entry(record.suite.as_str()).or_default().push(record);
        }
        grouped
    }
}

/// Escape CSV field to prevent formula injection attacks
/// Cells starting with =, +, -, @, or tab are prefixed with single quote
fn escape_csv_field(field: &str) -> String {
    let needs_escaping = matches!(field.chars().next(), Some('=' | '+' | '-' | '@' | '\t'));

    if needs_escaping {
        format!("\"'{}\"", field.replace('"', "\"\""))
    } else if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

pub fn create_report_directory(dir: &Path) -> Result<PathBuf, std::io::Error> {
    fs::create_dir_all(dir)?;
    Ok(dir.to_path_buf())
}

/// `security_report_<timestamp>.<ext>`
pub fn generate_report_name(extension: &str) -> String {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    format!("{}_{}.{}", REPORT_PREFIX, timestamp, extension)
}

pub fn export_csv(records: &[ProbeRecord], dir: &Path) -> Result<PathBuf, std::io::Error> {
    let path = create_report_directory(dir)?.join(generate_report_name("csv"));
    let mut file = File::create(&path)?;

    writeln!(file, "Suite,Probe,Verdict,Detail")?;
    for record in records {
        writeln!(
            file,
            "{},{},{},{}",
            escape_csv_field(&record.suite),
            escape_csv_field(&record.probe),
            record.verdict,
            escape_csv_field(&record.detail)
        )?;
    }

    Ok(path)
}

pub fn export_markdown(collector: &ResultCollector, dir: &Path) -> Result<PathBuf, std::io::Error> {
    let path = create_report_directory(dir)?.join(generate_report_name("md"));
    let mut file = File::create(&path)?;
    let summary = collector.summary();

    writeln!(file, "# Security Report\n")?;
    writeln!(
        file,
        "{} probes: {} secure, {} vulnerable, {} uncertain, {} skipped\n",
        summary.total(),
        summary.secure,
        summary.vulnerable,
        summary.uncertain,
        summary.skipped
    )?;
    for (suite, records) in collector.by_suite() {
        writeln!(file, "## {}\n", suite)?;
        for record in records {
            writeln!(file, "- **{}** `{}`: {}", record.verdict, record.probe, record.detail.replace('\n', " "))?;
        }
        writeln!(file)?;
    }

    Ok(path)
}

pub fn export_json(collector: &ResultCollector, dir: &Path) -> Result<PathBuf, std::io::Error> {
    #[derive(Serialize)]
    struct Report<'a> {
        generated_at: String,
        summary: Summary,
        results: &'a [ProbeRecord],
    }

    let path = create_report_directory(dir)?.join(generate_report_name("json"));
    let report = Report {
        generated_at: Local::now().to_rfc3339(),
        summary: collector.summary(),
        results: collector.records(),
    };
    let file = File::create(&path)?;
    serde_json::to_writer_pretty(file, &report)?;
    Ok(path)
}

/// Write named text artifacts (request payloads, response bodies) under `dir/<probe>/`.
pub fn save_test_artifacts(dir: &Path, probe: &str, artifacts: &[(&str, &str)]) -> Result<PathBuf, std::io::Error> {
    let artifact_dir = create_report_directory(dir)?.join(probe);
    fs::create_dir_all(&artifact_dir)?;
    for (name, content) in artifacts {
        fs::write(artifact_dir.join(name), content)?;
    }
    Ok(artifact_dir)
}
