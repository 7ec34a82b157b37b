//! The `assessor retake` command.

use std::path::PathBuf;

use anyhow::Result;

use assessor_core::retake::RetakeController;
use assessor_report::html::write_html_report;

use super::compare::print_comparison;
use super::run::run_module;

pub async fn execute(
    section: Option<String>,
    answers: PathBuf,
    html: Option<PathBuf>,
    format: String,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = super::config(config_path)?;
    let section = super::section(section.as_deref(), &config)?;

    let session = RetakeController::new(section, super::store(&config)).start()?;
    let module = session.retake_module()?;

    eprintln!(
        "Retaking {}: {} question(s) missed last time, {} component(s) to redo",
        module.module_name,
        session.missed_questions().len(),
        module.components.len()
    );

    let Some(result) = run_module(module, &answers, config.enforce_time_limits).await? else {
        eprintln!("Retake aborted, nothing compared.");
        return Ok(());
    };

    let comparison = session.finish(&result)?;
    print_comparison(&comparison, &format)?;

    if let Some(path) = html {
        write_html_report(&comparison, &path)?;
        eprintln!("HTML report: {}", path.display());
    }

    Ok(())
}
