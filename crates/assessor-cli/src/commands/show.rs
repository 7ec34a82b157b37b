//! The `assessor show` command.

use std::path::PathBuf;

use anyhow::Result;

use assessor_core::store::load_first_attempt;

pub fn execute(
    section: Option<String>,
    export: Option<PathBuf>,
    format: String,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = super::config(config_path)?;
    let section = super::section(section.as_deref(), &config)?;
    let store = super::store(&config);

    let Some(record) = load_first_attempt(store.as_ref(), section)? else {
        println!("No first attempt recorded for {section}.");
        return Ok(());
    };

    match format.as_str() {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        _ => {
            println!(
                "{} first attempt: {}/{} ({}%), level {:.1}",
                section.title(),
                record.total_correct,
                record.total_questions,
                record.percentage(),
                record.level
            );
            println!("  Module: {}", record.module_id);
            println!("  Attempt: {}", record.attempt_id);
            println!("  Recorded: {}", record.timestamp.format("%Y-%m-%d %H:%M:%S UTC"));

            let missed: Vec<String> = record
                .missed_questions()
                .iter()
                .map(|i| (i + 1).to_string())
                .collect();
            if missed.is_empty() {
                println!("  Missed: none");
            } else {
                println!("  Missed: {}", missed.join(", "));
            }
        }
    }

    if let Some(path) = export {
        record.save_json(&path)?;
        eprintln!("Attempt saved to: {}", path.display());
    }

    Ok(())
}
