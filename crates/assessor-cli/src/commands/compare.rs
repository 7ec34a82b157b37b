//! The `assessor compare` command.

use std::path::PathBuf;

use anyhow::Result;

use assessor_core::retake::{compare, QuestionStatus, RetakeComparison};
use assessor_core::scoring::AttemptRecord;
use assessor_report::html::write_html_report;
use assessor_report::markdown::comparison_to_markdown;

pub fn execute(
    first_path: PathBuf,
    second_path: PathBuf,
    html: Option<PathBuf>,
    format: String,
) -> Result<()> {
    let first = AttemptRecord::load_json(&first_path)?;
    let second = AttemptRecord::load_json(&second_path)?;

    let comparison = compare(&first, &second)?;
    print_comparison(&comparison, &format)?;

    if let Some(path) = html {
        write_html_report(&comparison, &path)?;
        eprintln!("HTML report: {}", path.display());
    }

    Ok(())
}

pub(crate) fn print_comparison(comparison: &RetakeComparison, format: &str) -> Result<()> {
    match format {
        "markdown" | "md" => {
            println!("{}", comparison_to_markdown(comparison));
        }
        "json" => {
            println!("{}", serde_json::to_string_pretty(comparison)?);
        }
        _ => {
            let first = &comparison.first_attempt;
            let second = &comparison.second_attempt;
            println!(
                "{} retake: {}/{} -> {}/{} ({}% -> {}%), level {:.1} -> {:.1}",
                comparison.section_type.title(),
                first.score,
                first.total,
                second.score,
                second.total,
                first.percentage,
                second.percentage,
                first.level,
                second.level
            );
            println!(
                "Comparison: {} improved, {} still wrong, {} unchanged",
                comparison.count(QuestionStatus::Improved),
                comparison.count(QuestionStatus::StillWrong),
                comparison.count(QuestionStatus::Neutral)
            );

            let changed: Vec<String> = comparison
                .question_statuses()
                .into_iter()
                .enumerate()
                .filter_map(|(i, status)| match status {
                    Some(QuestionStatus::Improved) => Some(format!("  Q{} improved", i + 1)),
                    Some(QuestionStatus::StillWrong) => Some(format!("  Q{} still wrong", i + 1)),
                    _ => None,
                })
                .collect();
            if !changed.is_empty() {
                println!("\nQuestions:");
                for line in changed {
                    println!("{line}");
                }
            }

            if let Some(message) = comparison.motivational_message() {
                println!("\n{message}");
            }
        }
    }
    Ok(())
}
