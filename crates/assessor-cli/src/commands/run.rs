//! The `assessor run` command.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use assessor_core::controller::ModuleController;
use assessor_core::model::{GeneratedModule, ModuleResult};
use assessor_core::registry::get_module;
use assessor_core::scoring::{NextStep, ResultController, ScoreSummary};
use assessor_core::scripted::{AnswerSheet, ScriptedRunner};
use assessor_core::traits::RunnerSet;
use assessor_report::markdown::summary_to_markdown;

pub async fn execute(
    section: Option<String>,
    number: u32,
    answers: PathBuf,
    format: String,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = super::config(config_path)?;
    let section = super::section(section.as_deref(), &config)?;
    let module = get_module(section.as_str(), number)
        .with_context(|| format!("cannot start session: no {section} module {number}"))?;

    let Some(result) = run_module(module, &answers, config.enforce_time_limits).await? else {
        eprintln!("Module aborted, no result recorded.");
        return Ok(());
    };

    let screen = ResultController::new(result, super::store(&config)).show()?;

    match format.as_str() {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&screen.record)?);
        }
        "markdown" | "md" => {
            println!("{}", summary_to_markdown(&screen.summary));
        }
        _ => print_summary(&screen.summary),
    }

    match screen.next {
        NextStep::Explanation => eprintln!("Perfect score. Next: review the explanations."),
        NextStep::Retake => eprintln!(
            "Next: assessor retake --section {} --answers <sheet>",
            screen.summary.section
        ),
    }

    Ok(())
}

/// Run a module with answers replayed from `answers`.
///
/// Ctrl-C aborts the run; `None` means it was aborted.
pub(crate) async fn run_module(
    module: GeneratedModule,
    answers: &Path,
    enforce_time_limits: bool,
) -> Result<Option<ModuleResult>> {
    let sheet = AnswerSheet::load_json(answers)?;
    let runner = Arc::new(ScriptedRunner::new(sheet));

    eprintln!(
        "assessor v{}: {} ({} components, {} questions)",
        env!("CARGO_PKG_VERSION"),
        module.module_name,
        module.components.len(),
        module.total_questions
    );

    let mut controller =
        ModuleController::new(module, RunnerSet::uniform(runner)).with_time_limits(enforce_time_limits);
    controller.set_on_complete(|result| {
        eprintln!(
            "  Done: {} components answered",
            result.component_results.len()
        );
    });

    let abort = controller.abort_handle();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("  Interrupted, aborting module");
            abort.abort();
        }
    });

    let outcome = controller.start_module().await;
    interrupt.abort();

    Ok(outcome?.into_result())
}

fn print_summary(summary: &ScoreSummary) {
    use comfy_table::{Cell, Table};

    println!(
        "{}: {}/{} correct ({}%), level {}",
        summary.section.title(),
        summary.total_correct,
        summary.total_questions,
        summary.percentage,
        summary.level
    );

    let mut table = Table::new();
    table.set_header(vec!["Component", "Set", "Correct", "Total"]);
    for c in &summary.per_component {
        table.add_row(vec![
            Cell::new(c.component_type.display_name()),
            Cell::new(c.content_set_id),
            Cell::new(c.correct),
            Cell::new(c.total),
        ]);
    }
    println!("{table}");
}
