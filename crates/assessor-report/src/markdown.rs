//! Markdown rendering for result screens and retake comparisons.

use assessor_core::retake::{question_status, QuestionStatus, RetakeComparison};
use assessor_core::scoring::ScoreSummary;

/// Render a score summary as markdown.
pub fn summary_to_markdown(summary: &ScoreSummary) -> String {
    let mut md = String::new();

    md.push_str(&format!("## {} result\n\n", summary.section.title()));
    md.push_str(&format!(
        "**Score:** {}/{} ({}%), level {}\n\n",
        summary.total_correct, summary.total_questions, summary.percentage, summary.level
    ));

    if !summary.per_component.is_empty() {
        md.push_str("| Component | Set | Correct |\n");
        md.push_str("|-----------|-----|---------|\n");
        for c in &summary.per_component {
            md.push_str(&format!(
                "| {} | {} | {}/{} |\n",
                c.component_type.display_name(),
                c.content_set_id,
                c.correct,
                c.total
            ));
        }
        md.push('\n');
    }

    if summary.is_perfect {
        md.push_str("Perfect score.\n");
    }

    md
}

/// Render a retake comparison as markdown.
pub fn comparison_to_markdown(comparison: &RetakeComparison) -> String {
    let first = &comparison.first_attempt;
    let second = &comparison.second_attempt;
    let diff = &comparison.improvement;
    let mut md = String::new();

    md.push_str(&format!(
        "## {} retake comparison\n\n",
        comparison.section_type.title()
    ));
    md.push_str(&format!(
        "**Summary:** {} improved, {} still wrong, {} unchanged\n\n",
        comparison.count(QuestionStatus::Improved),
        comparison.count(QuestionStatus::StillWrong),
        comparison.count(QuestionStatus::Neutral)
    ));
    if let Some(message) = comparison.motivational_message() {
        md.push_str(&format!("> {message}\n\n"));
    }

    md.push_str("| | Score | Percentage | Level |\n");
    md.push_str("|---|-------|------------|-------|\n");
    md.push_str(&format!(
        "| First attempt | {}/{} | {}% | {:.1} |\n",
        first.score, first.total, first.percentage, first.level
    ));
    md.push_str(&format!(
        "| Retake | {}/{} | {}% | {:.1} |\n",
        second.score, second.total, second.percentage, second.level
    ));
    md.push_str(&format!(
        "| Change | {:+} | {:+}% | {:+.1} |\n\n",
        diff.score_diff, diff.percent_diff, diff.level_diff
    ));

    let changed: Vec<(usize, QuestionStatus)> = first
        .results
        .iter()
        .zip(&second.results)
        .enumerate()
        .filter_map(|(i, (&a, &b))| question_status(a, b).map(|s| (i, s)))
        .filter(|&(_, s)| s != QuestionStatus::Neutral)
        .collect();

    if !changed.is_empty() {
        md.push_str("### Questions\n\n");
        md.push_str("| # | Status |\n");
        md.push_str("|---|--------|\n");
        for (i, status) in changed {
            let label = match status {
                QuestionStatus::Improved => "improved",
                QuestionStatus::StillWrong => "still wrong",
                QuestionStatus::Neutral => "correct",
            };
            md.push_str(&format!("| {} | {} |\n", i + 1, label));
        }
    }

    md
}
