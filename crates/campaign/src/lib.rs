//! # Campaign
//!
//! Runs the rate table against every configured target of a device and
//! records one check per (target, rate).
//!
//! ## Outcomes
//!
//! - `Passed` / `Failed`: measured, verdict from the tolerance policy
//! - `Unsupported`: no profile matches the rate; the target is not touched
//! - `Error`: the measurement did not complete; the campaign continues
//!
//! A target absent from the device is skipped when the device name carries
//! one of the target's `optional_on` markers, and is a failed check otherwise.

mod report;
mod runner;

pub use report::{
    CampaignReport, CheckRecord, CheckRecorder, CheckStatus, CheckSummary, SectionReport,
};
pub use runner::{select_profile, CampaignRunner};
