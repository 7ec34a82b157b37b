//! First-vs-second attempt comparison.
//!
//! A retake re-presents the components of a section that had a missed
//! question. Questions answered correctly the first time carry over
//! unchanged, so the comparison covers the whole module. It classifies every
//! question and reports how much the score, percentage and level moved. A
//! question that was right the first time and wrong on the second is a
//! consistency error between two raw attempts.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{ComparisonError, RetakeError};
use crate::model::{Answer, ComponentResult, GeneratedModule, ModuleResult, SectionType};
use crate::registry::{generate_module, parse_module_id};
use crate::scoring::{percentage, AttemptRecord};
use crate::store::{load_first_attempt, KeyValueStore};

/// Per-question comparison status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionStatus {
    /// Correct both times.
    Neutral,
    Improved,
    StillWrong,
}

/// Classify one question. `(true, false)` is a regression.
pub fn question_status(first: bool, second: bool) -> Option<QuestionStatus> {
    match (first, second) {
        (true, true) => Some(QuestionStatus::Neutral),
        (false, true) => Some(QuestionStatus::Improved),
        (false, false) => Some(QuestionStatus::StillWrong),
        (true, false) => None,
    }
}

/// One side of a comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptSummary {
    pub score: u32,
    pub total: u32,
    pub percentage: u32,
    pub level: f64,
    pub results: Vec<bool>,
}

impl From<&AttemptRecord> for AttemptSummary {
    fn from(record: &AttemptRecord) -> Self {
        Self {
            score: record.total_correct,
            total: record.total_questions,
            percentage: percentage(record.total_correct, record.total_questions),
            level: record.level,
            results: record.question_results(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Improvement {
    pub score_diff: i64,
    pub percent_diff: i64,
    pub level_diff: f64,
}

/// Result of comparing a retake against its first attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetakeComparison {
    pub section_type: SectionType,
    pub first_attempt: AttemptSummary,
    pub second_attempt: AttemptSummary,
    pub improvement: Improvement,
}

impl RetakeComparison {
    /// Status of every question slot, derived on demand. A regressed slot
    /// is `None`.
    pub fn question_statuses(&self) -> Vec<Option<QuestionStatus>> {
        self.first_attempt
            .results
            .iter()
            .zip(&self.second_attempt.results)
            .map(|(&a, &b)| question_status(a, b))
            .collect()
    }

    pub fn count(&self, status: QuestionStatus) -> usize {
        self.question_statuses()
            .into_iter()
            .flatten()
            .filter(|s| *s == status)
            .count()
    }

    /// Message for the retake result screen. No message is defined for a
    /// negative score difference.
    pub fn motivational_message(&self) -> Option<String> {
        let diff = &self.improvement;
        match diff.score_diff {
            d if d > 0 => Some(format!(
                "Great progress! You answered {d} more question{} correctly ({}% -> {}%, +{} points).",
                if d == 1 { "" } else { "s" },
                self.first_attempt.percentage,
                self.second_attempt.percentage,
                diff.percent_diff
            )),
            0 => Some(
                "Same score as last time. Review the questions you missed and keep practicing."
                    .to_string(),
            ),
            _ => None,
        }
    }
}

/// Compare two attempts of the same section.
pub fn compare(
    first: &AttemptRecord,
    second: &AttemptRecord,
) -> Result<RetakeComparison, ComparisonError> {
    if first.section_type != second.section_type {
        return Err(ComparisonError::SectionMismatch {
            first: first.section_type,
            second: second.section_type,
        });
    }

    let first_summary = AttemptSummary::from(first);
    let second_summary = AttemptSummary::from(second);

    if first_summary.results.len() != second_summary.results.len() {
        return Err(ComparisonError::LengthMismatch {
            first: first_summary.results.len(),
            second: second_summary.results.len(),
        });
    }

    let regressed: Vec<usize> = first_summary
        .results
        .iter()
        .zip(&second_summary.results)
        .enumerate()
        .filter(|&(_, (&a, &b))| question_status(a, b).is_none())
        .map(|(i, _)| i)
        .collect();
    if !regressed.is_empty() {
        tracing::warn!(
            "{} retake regressed on {} question(s)",
            first.section_type,
            regressed.len()
        );
        return Err(ComparisonError::Regressed { indices: regressed });
    }

    if second.total_correct < first.total_correct {
        return Err(ComparisonError::NegativeScoreDiff {
            first: first.total_correct,
            second: second.total_correct,
        });
    }

    let improvement = Improvement {
        score_diff: second.total_correct as i64 - first.total_correct as i64,
        percent_diff: second_summary.percentage as i64 - first_summary.percentage as i64,
        level_diff: second.level - first.level,
    };

    Ok(RetakeComparison {
        section_type: first.section_type,
        first_attempt: first_summary,
        second_attempt: second_summary,
        improvement,
    })
}

// ---------------------------------------------------------------------------
// Retake flow
// ---------------------------------------------------------------------------

/// Entry point of the retake flow for one section.
pub struct RetakeController {
    section: SectionType,
    store: Arc<dyn KeyValueStore>,
}

impl RetakeController {
    pub fn new(section: SectionType, store: Arc<dyn KeyValueStore>) -> Self {
        Self { section, store }
    }

    /// Snapshot the stored first attempt.
    pub fn start(&self) -> Result<RetakeSession, RetakeError> {
        let first = load_first_attempt(self.store.as_ref(), self.section)?
            .ok_or(RetakeError::NoFirstAttempt(self.section))?;
        tracing::info!(
            "retake of {} started against attempt {} ({}/{})",
            self.section,
            first.attempt_id,
            first.total_correct,
            first.total_questions
        );
        Ok(RetakeSession {
            first,
            store: Arc::clone(&self.store),
        })
    }
}

/// A retake in progress, pinned to the first attempt it started from.
pub struct RetakeSession {
    first: AttemptRecord,
    store: Arc<dyn KeyValueStore>,
}

impl RetakeSession {
    pub fn first_attempt(&self) -> &AttemptRecord {
        &self.first
    }

    /// Module to run again.
    pub fn module_id(&self) -> &str {
        &self.first.module_id
    }

    /// Zero-based indices of the questions to re-present.
    pub fn missed_questions(&self) -> Vec<usize> {
        self.first.missed_questions()
    }

    /// The first attempt's module reduced to the components with at least
    /// one missed question, in their original order.
    pub fn retake_module(&self) -> Result<GeneratedModule, RetakeError> {
        let (section, number) = parse_module_id(&self.first.module_id)
            .filter(|&(section, _)| section == self.first.section_type)
            .ok_or_else(|| RetakeError::UnknownModule(self.first.module_id.clone()))?;

        let mut module = generate_module(section, number)?;
        module.components.retain(|instance| {
            !self.first.component_results.iter().any(|r| {
                r.component_type == instance.component_type
                    && r.content_set_id == instance.content_set_id
                    && r.correct_count() == r.question_count
            })
        });
        module.total_questions = module
            .components
            .iter()
            .map(|c| c.questions_per_instance)
            .sum();

        tracing::debug!(
            "retake plan for {}: {} component(s), {} question(s)",
            module.module_id,
            module.components.len(),
            module.total_questions
        );
        Ok(module)
    }

    /// Score the retake and compare it with the pinned first attempt.
    ///
    /// `second` may cover only the re-presented components. Each question
    /// answered correctly the first time keeps its first answer; every other
    /// question takes the retake answer, and counts as wrong when the retake
    /// did not answer it.
    ///
    /// Fails if the stored first attempt was replaced since [`start`](RetakeController::start);
    /// the retake is never persisted.
    pub fn finish(self, second: &ModuleResult) -> Result<RetakeComparison, RetakeError> {
        let section = self.first.section_type;
        let current = load_first_attempt(self.store.as_ref(), section)?
            .ok_or(RetakeError::NoFirstAttempt(section))?;
        if current.attempt_id != self.first.attempt_id || current.timestamp > self.first.timestamp {
            tracing::warn!(
                "first attempt for {section} changed during retake ({} -> {})",
                self.first.attempt_id,
                current.attempt_id
            );
            return Err(RetakeError::FirstAttemptSuperseded {
                section,
                expected: self.first.attempt_id,
                found: current.attempt_id,
            });
        }

        let merged = merge_retake(&self.first, second)?;
        let second_record = AttemptRecord::from_result(&merged);
        let comparison = compare(&self.first, &second_record)?;
        tracing::info!(
            "retake of {section}: {} -> {} ({:+})",
            comparison.first_attempt.score,
            comparison.second_attempt.score,
            comparison.improvement.score_diff
        );
        Ok(comparison)
    }
}

/// Overlay a retake onto the first attempt, question by question.
fn merge_retake(
    first: &AttemptRecord,
    retake: &ModuleResult,
) -> Result<ModuleResult, ComparisonError> {
    if retake.section_type != first.section_type {
        return Err(ComparisonError::SectionMismatch {
            first: first.section_type,
            second: retake.section_type,
        });
    }

    let find_first = |r: &ComponentResult| {
        first
            .component_results
            .iter()
            .find(|f| f.component_type == r.component_type && f.content_set_id == r.content_set_id)
    };
    if let Some(extra) = retake.component_results.iter().find(|&r| find_first(r).is_none()) {
        return Err(ComparisonError::UnexpectedComponent {
            component_type: extra.component_type,
            content_set_id: extra.content_set_id,
        });
    }

    let component_results = first
        .component_results
        .iter()
        .map(|previous| {
            let Some(again) = retake.component_results.iter().find(|r| {
                r.component_type == previous.component_type
                    && r.content_set_id == previous.content_set_id
            }) else {
                return previous.clone();
            };
            let answers = (0..previous.question_count as usize)
                .map(|i| match previous.answers.get(i) {
                    Some(answer) if answer.is_correct => answer.clone(),
                    _ => again.answers.get(i).cloned().unwrap_or_else(|| Answer::new(false)),
                })
                .collect();
            ComponentResult {
                answers,
                ..previous.clone()
            }
        })
        .collect();

    Ok(ModuleResult {
        module_id: first.module_id.clone(),
        section_type: first.section_type,
        total_questions: first.total_questions,
        component_results,
    })
}
