//! Scoring, leveling and first-attempt persistence.
//!
//! A level is a half-point step from 1.0 to 6.0, looked up from a
//! section-specific band table over the number of correct answers.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::{ComponentResult, ComponentType, ModuleResult, SectionType};
use crate::store::{save_first_attempt, KeyValueStore};

// ---------------------------------------------------------------------------
// Levels
// ---------------------------------------------------------------------------

/// Inclusive upper bound of `total_correct` for each band, lowest first.
/// Anything above the last bound is 6.0.
const READING_BANDS: &[(u32, f64)] = &[
    (3, 1.0),
    (6, 1.5),
    (10, 2.0),
    (13, 2.5),
    (17, 3.0),
    (20, 3.5),
    (24, 4.0),
    (27, 4.5),
    (30, 5.0),
    (32, 5.5),
];

const LISTENING_BANDS: &[(u32, f64)] = &[
    (3, 1.0),
    (6, 1.5),
    (9, 2.0),
    (12, 2.5),
    (15, 3.0),
    (18, 3.5),
    (21, 4.0),
    (24, 4.5),
    (26, 5.0),
    (28, 5.5),
];

const TOP_LEVEL: f64 = 6.0;

/// Band table for a section, `None` if the section is not leveled.
pub fn band_table(section: SectionType) -> Option<&'static [(u32, f64)]> {
    match section {
        SectionType::Reading => Some(READING_BANDS),
        SectionType::Listening => Some(LISTENING_BANDS),
        SectionType::Writing | SectionType::Speaking => None,
    }
}

/// A discretized proficiency level.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub enum Level {
    Leveled(f64),
    Unleveled,
}

impl Level {
    /// Numeric value; 0.0 when unleveled.
    pub fn value(&self) -> f64 {
        match self {
            Level::Leveled(v) => *v,
            Level::Unleveled => 0.0,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Leveled(v) => write!(f, "{v:.1}"),
            Level::Unleveled => write!(f, "unleveled"),
        }
    }
}

/// Look up the level for a number of correct answers.
pub fn level_for(section: SectionType, total_correct: u32) -> Level {
    let Some(bands) = band_table(section) else {
        return Level::Unleveled;
    };
    let value = bands
        .iter()
        .find(|(upper, _)| total_correct <= *upper)
        .map(|(_, level)| *level)
        .unwrap_or(TOP_LEVEL);
    Level::Leveled(value)
}

/// `round(100 * correct / total)`, or 0 when there are no questions.
pub fn percentage(correct: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    (100.0 * correct as f64 / total as f64).round() as u32
}

// ---------------------------------------------------------------------------
// Score summary
// ---------------------------------------------------------------------------

/// Score of one component instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentScore {
    pub component_type: ComponentType,
    pub content_set_id: u32,
    pub correct: u32,
    pub total: u32,
}

impl From<&ComponentResult> for ComponentScore {
    fn from(r: &ComponentResult) -> Self {
        Self {
            component_type: r.component_type,
            content_set_id: r.content_set_id,
            correct: r.correct_count(),
            total: r.question_count,
        }
    }
}

/// Outcome of scoring one module result.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreSummary {
    pub section: SectionType,
    pub total_correct: u32,
    pub total_questions: u32,
    pub percentage: u32,
    pub level: Level,
    pub is_perfect: bool,
    pub per_component: Vec<ComponentScore>,
}

/// Score a finished module.
pub fn score(result: &ModuleResult) -> ScoreSummary {
    let per_component: Vec<ComponentScore> =
        result.component_results.iter().map(ComponentScore::from).collect();
    let total_correct = per_component.iter().map(|c| c.correct).sum();
    let total_questions = result.total_questions;

    ScoreSummary {
        section: result.section_type,
        total_correct,
        total_questions,
        percentage: percentage(total_correct, total_questions),
        level: level_for(result.section_type, total_correct),
        is_perfect: total_questions > 0 && total_correct == total_questions,
        per_component,
    }
}

// ---------------------------------------------------------------------------
// Attempt record
// ---------------------------------------------------------------------------

/// Persisted first attempt for one section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    pub attempt_id: Uuid,
    pub section_type: SectionType,
    pub module_id: String,
    pub total_correct: u32,
    pub total_questions: u32,
    pub level: f64,
    pub is_perfect: bool,
    pub component_results: Vec<ComponentResult>,
    pub timestamp: DateTime<Utc>,
}

impl AttemptRecord {
    pub fn new(result: &ModuleResult, summary: &ScoreSummary) -> Self {
        Self {
            attempt_id: Uuid::new_v4(),
            section_type: result.section_type,
            module_id: result.module_id.clone(),
            total_correct: summary.total_correct,
            total_questions: summary.total_questions,
            level: summary.level.value(),
            is_perfect: summary.is_perfect,
            component_results: result.component_results.clone(),
            timestamp: Utc::now(),
        }
    }

    /// Score a module result and wrap it in a fresh record.
    pub fn from_result(result: &ModuleResult) -> Self {
        Self::new(result, &score(result))
    }

    /// Per-question correctness in question-number order.
    pub fn question_results(&self) -> Vec<bool> {
        self.component_results
            .iter()
            .flat_map(|r| r.correctness())
            .collect()
    }

    pub fn percentage(&self) -> u32 {
        percentage(self.total_correct, self.total_questions)
    }

    /// Zero-based indices of the questions answered wrong.
    pub fn missed_questions(&self) -> Vec<usize> {
        self.question_results()
            .iter()
            .enumerate()
            .filter(|&(_, &correct)| !correct)
            .map(|(i, _)| i)
            .collect()
    }

    /// Save as JSON to a file.
    pub fn save_json(&self, path: &std::path::Path) -> anyhow::Result<()> {
        use anyhow::Context;

        let json = serde_json::to_string_pretty(self).context("failed to serialize attempt")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write attempt to {}", path.display()))?;
        Ok(())
    }

    /// Load from a JSON file.
    pub fn load_json(path: &std::path::Path) -> anyhow::Result<Self> {
        use anyhow::Context;

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read attempt from {}", path.display()))?;
        serde_json::from_str(&content).context("failed to parse attempt JSON")
    }
}

// ---------------------------------------------------------------------------
// Result controller
// ---------------------------------------------------------------------------

/// Where the caller should go after the result screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NextStep {
    /// Perfect score: show the explanations.
    Explanation,
    Retake,
}

impl NextStep {
    pub fn for_summary(summary: &ScoreSummary) -> Self {
        if summary.is_perfect {
            NextStep::Explanation
        } else {
            NextStep::Retake
        }
    }
}

/// What the result screen needs.
#[derive(Debug, Clone)]
pub struct ResultScreen {
    pub summary: ScoreSummary,
    pub record: AttemptRecord,
    pub next: NextStep,
}

/// Scores a first attempt and records it.
pub struct ResultController {
    result: ModuleResult,
    store: Arc<dyn KeyValueStore>,
}

impl ResultController {
    pub fn new(result: ModuleResult, store: Arc<dyn KeyValueStore>) -> Self {
        Self { result, store }
    }

    pub fn score(&self) -> ScoreSummary {
        score(&self.result)
    }

    /// Score, overwrite the section's first-attempt record, and pick the
    /// next step.
    pub fn show(&self) -> Result<ResultScreen, StoreError> {
        let summary = self.score();
        let record = AttemptRecord::new(&self.result, &summary);
        save_first_attempt(self.store.as_ref(), &record)?;

        tracing::info!(
            "{} first attempt: {}/{} correct, level {}, attempt {}",
            summary.section,
            summary.total_correct,
            summary.total_questions,
            summary.level,
            record.attempt_id
        );

        let next = NextStep::for_summary(&summary);
        Ok(ResultScreen {
            summary,
            record,
            next,
        })
    }
}
