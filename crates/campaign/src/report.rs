//! Check recording and the campaign report

use std::fmt;

use contracts::DeviceInfo;
use rate_meter::{Measurement, ToleranceResult};
use serde::Serialize;
use tracing::{info, warn};

/// Outcome of one check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Passed,
    Failed,
    /// The sensor offers no profile for the requested rate
    Unsupported,
    /// The measurement itself failed
    Error,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Passed => "passed",
            CheckStatus::Failed => "failed",
            CheckStatus::Unsupported => "unsupported",
            CheckStatus::Error => "error",
        }
    }

    /// Whether the outcome fails the campaign
    pub fn is_failure(&self) -> bool {
        matches!(self, CheckStatus::Failed | CheckStatus::Error)
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded check
#[derive(Debug, Clone, Serialize)]
pub struct CheckRecord {
    pub name: String,
    pub status: CheckStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_fps: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<ToleranceResult>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_frame_latency_ms: Option<f64>,

    pub frame_drops: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CheckRecord {
    fn bare(name: impl Into<String>, status: CheckStatus) -> Self {
        Self {
            name: name.into(),
            status,
            requested_fps: None,
            tolerance: None,
            first_frame_latency_ms: None,
            frame_drops: 0,
            message: None,
        }
    }

    /// Verdict of a completed measurement
    pub fn measured(name: impl Into<String>, measurement: &Measurement, verdict: ToleranceResult) -> Self {
        let status = if verdict.passed {
            CheckStatus::Passed
        } else {
            CheckStatus::Failed
        };
        Self {
            requested_fps: Some(measurement.profile.fps),
            tolerance: Some(verdict),
            first_frame_latency_ms: measurement
                .first_frame_latency
                .map(|l| l.as_secs_f64() * 1000.0),
            frame_drops: measurement.frame_gaps.len() as u64,
            ..Self::bare(name, status)
        }
    }

    /// Rate without a matching profile
    pub fn unsupported(name: impl Into<String>, requested_fps: u32) -> Self {
        Self {
            requested_fps: Some(requested_fps),
            ..Self::bare(name, CheckStatus::Unsupported)
        }
    }

    /// Measurement that did not complete
    pub fn error(name: impl Into<String>, requested_fps: u32, message: impl Into<String>) -> Self {
        Self {
            requested_fps: Some(requested_fps),
            message: Some(message.into()),
            ..Self::bare(name, CheckStatus::Error)
        }
    }

    /// Failure not tied to a rate
    pub fn failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::bare(name, CheckStatus::Failed)
        }
    }
}

/// Checks of one section, usually one target
#[derive(Debug, Clone, Serialize)]
pub struct SectionReport {
    pub name: String,

    /// Why the section was skipped, if it was
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,

    pub checks: Vec<CheckRecord>,
}

impl SectionReport {
    pub fn failures(&self) -> usize {
        self.checks.iter().filter(|c| c.status.is_failure()).count()
    }
}

/// Count of checks per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CheckSummary {
    pub passed: usize,
    pub failed: usize,
    pub unsupported: usize,
    pub errors: usize,
}

impl CheckSummary {
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.unsupported + self.errors
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0 && self.errors == 0
    }

    fn add(&mut self, status: CheckStatus) {
        match status {
            CheckStatus::Passed => self.passed += 1,
            CheckStatus::Failed => self.failed += 1,
            CheckStatus::Unsupported => self.unsupported += 1,
            CheckStatus::Error => self.errors += 1,
        }
    }
}

impl fmt::Display for CheckSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} checks: {} passed, {} failed, {} unsupported, {} errors",
            self.total(),
            self.passed,
            self.failed,
            self.unsupported,
            self.errors
        )
    }
}

/// Collects checks into ordered sections
///
/// Every check is logged and counted in metrics as it is recorded.
#[derive(Debug, Default)]
pub struct CheckRecorder {
    sections: Vec<SectionReport>,
    current: Option<SectionReport>,
    summary: CheckSummary,
}

impl CheckRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a section, closing the current one
    pub fn start(&mut self, section: impl Into<String>) {
        self.finish();
        let name = section.into();
        info!(section = %name, "section started");
        self.current = Some(SectionReport {
            name,
            skipped: None,
            checks: Vec::new(),
        });
    }

    /// Mark the current section as skipped
    pub fn skip(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        match self.current.as_mut() {
            Some(section) => {
                info!(section = %section.name, reason = %reason, "section skipped");
                section.skipped = Some(reason);
            }
            None => warn!(reason = %reason, "skip outside of a section"),
        }
    }

    /// Record a check in the current section
    ///
    /// Checks recorded outside a section go to an implicit "general" one.
    pub fn check(&mut self, record: CheckRecord) {
        match record.status {
            CheckStatus::Passed | CheckStatus::Unsupported => info!(
                check = %record.name,
                status = %record.status,
                "check recorded"
            ),
            CheckStatus::Failed | CheckStatus::Error => warn!(
                check = %record.name,
                status = %record.status,
                message = record.message.as_deref().unwrap_or(""),
                "check recorded"
            ),
        }
        observability::record_check(record.status.as_str());
        self.summary.add(record.status);

        if self.current.is_none() {
            self.current = Some(SectionReport {
                name: "general".to_string(),
                skipped: None,
                checks: Vec::new(),
            });
        }
        if let Some(section) = self.current.as_mut() {
            section.checks.push(record);
        }
    }

    /// Close the current section
    pub fn finish(&mut self) {
        if let Some(section) = self.current.take() {
            info!(
                section = %section.name,
                checks = section.checks.len(),
                failures = section.failures(),
                "section finished"
            );
            self.sections.push(section);
        }
    }

    pub fn summary(&self) -> CheckSummary {
        self.summary
    }

    /// 0 if nothing failed, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        if self.summary.all_passed() {
            0
        } else {
            1
        }
    }

    /// Closed sections, in order
    pub fn sections(&self) -> &[SectionReport] {
        &self.sections
    }

    /// Close the current section and build the report
    pub fn into_report(mut self, device: DeviceInfo, duration_secs: f64) -> CampaignReport {
        self.finish();
        CampaignReport {
            device,
            passed: self.summary.all_passed(),
            summary: self.summary,
            sections: self.sections,
            duration_secs,
        }
    }
}

/// Result of a whole campaign
#[derive(Debug, Clone, Serialize)]
pub struct CampaignReport {
    pub device: DeviceInfo,
    pub sections: Vec<SectionReport>,
    pub summary: CheckSummary,
    pub passed: bool,
    pub duration_secs: f64,
}

impl CampaignReport {
    /// Process exit code for the verdict
    pub fn exit_code(&self) -> i32 {
        if self.passed {
            0
        } else {
            1
        }
    }

    pub fn section(&self, name: &str) -> Option<&SectionReport> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// All checks across sections, in order
    pub fn checks(&self) -> impl Iterator<Item = &CheckRecord> {
        self.sections.iter().flat_map(|s| s.checks.iter())
    }
}
