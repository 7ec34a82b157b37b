//! assessor-report: Report rendering for score summaries and retake comparisons.

pub mod html;
pub mod markdown;
