//! HTML report generator.
//!
//! Produces a self-contained HTML file with all CSS inlined.

use anyhow::Result;
use std::path::Path;

use assessor_core::retake::{question_status, QuestionStatus, RetakeComparison};

/// Escape a string for safe HTML insertion.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

fn status_class(first: bool, second: bool) -> (&'static str, &'static str) {
    match question_status(first, second) {
        Some(QuestionStatus::Improved) => ("improved", "Improved"),
        Some(QuestionStatus::StillWrong) => ("still-wrong", "Still wrong"),
        Some(QuestionStatus::Neutral) => ("neutral", "Correct"),
        None => ("regressed", "Regressed"),
    }
}

fn mark(correct: bool) -> &'static str {
    if correct {
        "&#10003;"
    } else {
        "&#10007;"
    }
}

/// Generate an HTML page for a retake comparison.
pub fn generate_comparison_html(comparison: &RetakeComparison) -> String {
    let first = &comparison.first_attempt;
    let second = &comparison.second_attempt;
    let section = comparison.section_type.title();

    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!(
        "<title>{} retake comparison</title>\n",
        html_escape(section)
    ));
    html.push_str("<style>\n");
    html.push_str(CSS);
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n");

    // Header
    html.push_str("<header>\n");
    html.push_str(&format!(
        "<h1>{} retake comparison</h1>\n",
        html_escape(section)
    ));
    html.push_str(&format!(
        "<p class=\"meta\">{} questions | Generated {}</p>\n",
        first.total,
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    ));
    if let Some(message) = comparison.motivational_message() {
        html.push_str(&format!(
            "<p class=\"message\">{}</p>\n",
            html_escape(&message)
        ));
    }
    html.push_str("</header>\n");

    // Scores
    html.push_str("<section class=\"scores\">\n<h2>Scores</h2>\n");
    html.push_str("<table>\n");
    html.push_str("<thead><tr><th></th><th>Score</th><th>Percentage</th><th>Level</th></tr></thead>\n");
    html.push_str("<tbody>\n");
    for (label, attempt) in [("First attempt", first), ("Retake", second)] {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}/{}</td><td>{}%</td><td>{:.1}</td></tr>\n",
            label, attempt.score, attempt.total, attempt.percentage, attempt.level
        ));
    }
    let diff = &comparison.improvement;
    html.push_str(&format!(
        "<tr class=\"delta\"><td>Change</td><td>{:+}</td><td>{:+}</td><td>{:+.1}</td></tr>\n",
        diff.score_diff, diff.percent_diff, diff.level_diff
    ));
    html.push_str("</tbody></table>\n");
    html.push_str(&format!(
        "<p>{} improved, {} still wrong, {} correct both times</p>\n",
        comparison.count(QuestionStatus::Improved),
        comparison.count(QuestionStatus::StillWrong),
        comparison.count(QuestionStatus::Neutral)
    ));
    html.push_str("</section>\n");

    // Per-question table
    html.push_str("<section class=\"questions\">\n<h2>Questions</h2>\n");
    html.push_str("<table id=\"questions\">\n");
    html.push_str("<thead><tr><th>#</th><th>First</th><th>Retake</th><th>Status</th></tr></thead>\n");
    html.push_str("<tbody>\n");
    for (i, (&a, &b)) in first.results.iter().zip(&second.results).enumerate() {
        let (class, label) = status_class(a, b);
        html.push_str(&format!(
            "<tr class=\"{}\"><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            class,
            i + 1,
            mark(a),
            mark(b),
            label
        ));
    }
    html.push_str("</tbody></table>\n");
    html.push_str("</section>\n");

    // Raw JSON
    html.push_str("<section class=\"raw-data\">\n");
    html.push_str("<details>\n<summary>Raw JSON Data</summary>\n");
    html.push_str("<pre><code>");
    html.push_str(&html_escape(
        &serde_json::to_string_pretty(comparison).unwrap_or_default(),
    ));
    html.push_str("</code></pre>\n");
    html.push_str("</details>\n</section>\n");

    html.push_str("</body>\n</html>");
    html
}

/// Write a comparison HTML report to a file.
pub fn write_html_report(comparison: &RetakeComparison, path: &Path) -> Result<()> {
    let html = generate_comparison_html(comparison);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, html)?;
    Ok(())
}

const CSS: &str = r#"
:root { --bg: #fff; --fg: #1a1a1a; --border: #e5e7eb; --improved: #dcfce7; --wrong: #fde2e2; --regressed: #fef3c7; }
@media (prefers-color-scheme: dark) {
  :root { --bg: #111827; --fg: #f9fafb; --border: #374151; --improved: #064e3b; --wrong: #7f1d1d; --regressed: #78350f; }
}
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; margin: 0; padding: 2rem; background: var(--bg); color: var(--fg); }
h1, h2 { margin-top: 2rem; }
.meta { color: #6b7280; }
.message { font-size: 1.1rem; font-weight: 600; }
table { border-collapse: collapse; width: 100%; margin: 1rem 0; }
th, td { border: 1px solid var(--border); padding: 0.5rem 1rem; text-align: left; }
th { background: var(--border); }
.improved { background: var(--improved); }
.still-wrong { background: var(--wrong); }
.regressed { background: var(--regressed); }
.delta { font-weight: bold; }
pre { overflow-x: auto; padding: 1rem; background: var(--border); border-radius: 8px; }
code { font-family: 'JetBrains Mono', 'Fira Code', monospace; font-size: 0.85rem; }
details { margin: 1rem 0; }
summary { cursor: pointer; font-weight: bold; }
"#;
