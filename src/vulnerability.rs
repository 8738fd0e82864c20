// src/vulnerability.rs
// Known-vulnerability lookup against the OSV.dev advisory API

use std::fmt;
use std::time::Duration;

use serde_json::{json, Value};

use crate::logger::RunLogger;

pub const OSV_API_URL: &str = "https://api.osv.dev/v1/query";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Unknown,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Critical => write!(f, "CRITICAL"),
            Severity::High => write!(f, "HIGH"),
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::Low => write!(f, "LOW"),
            Severity::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl Severity {
    /// Map a CVSS score onto a severity bucket.
    pub fn from_score(score: f64) -> Self {
        if score >= 9.0 {
            Severity::Critical
        } else if score >= 7.0 {
            Severity::High
        } else if score >= 4.0 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    fn from_label(label: &str) -> Self {
        match label.to_uppercase().as_str() {
            "CRITICAL" => Severity::Critical,
            "HIGH" => Severity::High,
            "MEDIUM" => Severity::Medium,
            "LOW" => Severity::Low,
            _ => Severity::Unknown,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VulnerabilityRecord {
    pub id: String,
    pub severity: Severity,
    pub summary: String,
}

/// Outcome of one version scan.
#[derive(Debug, Clone, Default)]
pub struct VulnerabilityReport {
    pub records: Vec<VulnerabilityRecord>,
    pub has_critical: bool,
}

impl VulnerabilityReport {
    fn from_records(records: Vec<VulnerabilityRecord>) -> Self {
        let has_critical = records
            .iter()
            .any(|r| matches!(r.severity, Severity::Critical | Severity::High));
        VulnerabilityReport { records, has_critical }
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.records.iter().filter(|r| r.severity == severity).count()
    }
}

/// Extract the severity of one raw OSV record.
///
/// Prefers the structured `severity` field (list or plain string), then the
/// `database_specific.cvss_score` number, then gives up with `Unknown`.
pub fn classify_severity(vuln: &Value) -> Severity {
    match vuln.get("severity") {
        Some(Value::Array(entries)) if !entries.is_empty() => {
            let label = entries[0].get("type").and_then(Value::as_str).unwrap_or("UNKNOWN");
            return Severity::from_label(label);
        }
        Some(Value::String(label)) => return Severity::from_label(label),
        _ => {}
    }

    if let Some(db) = vuln.get("database_specific") {
        if let Some(score) = db.get("cvss_score").and_then(Value::as_f64) {
            return Severity::from_score(score);
        }
    }

    Severity::Unknown
}

fn record_from_value(vuln: &Value) -> VulnerabilityRecord {
    VulnerabilityRecord {
        id: vuln
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or("Unknown")
            .to_string(),
        severity: classify_severity(vuln),
        summary: vuln
            .get("summary")
            .and_then(Value::as_str)
            .unwrap_or("No summary available")
            .to_string(),
    }
}

/// Queries OSV.dev for known issues in a CEF version.
pub struct VulnerabilityChecker<'a> {
    logger: &'a RunLogger,
    client: reqwest::blocking::Client,
}

impl<'a> VulnerabilityChecker<'a> {
    pub fn new(logger: &'a RunLogger) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::blocking::Client::new());
        VulnerabilityChecker { logger, client }
    }

    /// Check a CEF version against the advisory database.
    ///
    /// Network failure degrades to an empty report rather than aborting the
    /// pipeline: availability over strictness.
    pub fn check_version(&self, version: &str) -> VulnerabilityReport {
        self.logger.section("SECURITY CHECK: Vulnerability Scan");
        self.logger
            .info(&format!("\nChecking for vulnerabilities in CEF {}...\n", version));

        // CEF advisories may be filed under either package name.
        let packages = [("chromium-embedded-framework", "OSS-Fuzz"), ("cef", "OSS-Fuzz")];

        let mut raw_vulns: Vec<Value> = Vec::new();
        for (name, ecosystem) in packages {
            let query = json!({
                "package": { "name": name, "ecosystem": ecosystem },
                "version": version,
            });
            match self.client.post(OSV_API_URL).json(&query).send() {
                Ok(response) if response.status().is_success() => {
                    if let Ok(body) = response.json::<Value>() {
                        if let Some(vulns) = body.get("vulns").and_then(Value::as_array) {
                            raw_vulns.extend(vulns.iter().cloned());
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    self.logger
                        .warn(&format!("WARNING: Failed to check vulnerabilities: {}", e));
                    self.logger.info("Proceeding without vulnerability check...\n");
                    return VulnerabilityReport::default();
                }
            }
        }

        if raw_vulns.is_empty() {
            self.logger
                .info(&format!("✓ No known vulnerabilities found for CEF {}", version));
            return VulnerabilityReport::default();
        }

        let records: Vec<VulnerabilityRecord> = raw_vulns.iter().map(record_from_value).collect();
        let report = VulnerabilityReport::from_records(records);
        self.log_report(version, &report);
        report
    }

    fn log_report(&self, version: &str, report: &VulnerabilityReport) {
        self.logger.section(&format!(
            "⚠ WARNING: {} vulnerabilities found for CEF {}",
            report.records.len(),
            version
        ));

        for severity in [Severity::Critical, Severity::High, Severity::Medium, Severity::Low] {
            let count = report.count(severity);
            if count > 0 {
                self.logger.info(&format!("  {}: {}", severity, count));
            }
        }

        self.logger.info("\nVulnerability Details:");
        self.logger.info(&"-".repeat(70));
        for record in report.records.iter().take(5) {
            self.logger.info(&format!("\n  ID: {}", record.id));
            self.logger.info(&format!("  Severity: {}", record.severity));
            let summary: String = record.summary.chars().take(100).collect();
            self.logger.info(&format!("  Summary: {}...", summary));
            self.logger
                .info(&format!("  Details: https://osv.dev/vulnerability/{}", record.id));
        }
        if report.records.len() > 5 {
            self.logger.info(&format!(
                "\n  ... and {} more vulnerabilities",
                report.records.len() - 5
            ));
        }

        if report.has_critical {
            self.logger
                .error("❌ ABORTING: Critical or high severity vulnerabilities detected!");
            self.logger.error(&format!(
                "   Found {} CRITICAL and {} HIGH severity issues.",
                report.count(Severity::Critical),
                report.count(Severity::High)
            ));
            self.logger
                .info("   Recommendation: Choose a different CEF version without known vulnerabilities.");
        } else {
            self.logger
                .warn("⚠ Proceeding with caution: Only medium/low severity vulnerabilities found.");
        }
    }
}
