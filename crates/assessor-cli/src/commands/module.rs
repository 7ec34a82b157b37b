//! The `assessor module` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use assessor_core::registry::get_module;

pub fn execute(
    section: Option<String>,
    number: u32,
    format: String,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = super::config(config_path)?;
    let section = super::section(section.as_deref(), &config)?;
    let module = get_module(section.as_str(), number)
        .with_context(|| format!("cannot start session: no {section} module {number}"))?;

    match format.as_str() {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&module)?);
        }
        _ => {
            use comfy_table::{Cell, Table};

            let time_limit = match module.time_limit_secs {
                Some(secs) => format!("{}:{:02}", secs / 60, secs % 60),
                None => "none".to_string(),
            };
            println!(
                "{} ({}): {} questions, time limit {}",
                module.module_name, module.module_id, module.total_questions, time_limit
            );

            let mut table = Table::new();
            table.set_header(vec!["#", "Component", "Type", "Set", "Questions", "Countdown"]);
            for (i, c) in module.components.iter().enumerate() {
                let countdown = c
                    .component_type
                    .instance_countdown(c.questions_per_instance)
                    .map(|d| format!("{}s", d.as_secs()))
                    .unwrap_or_else(|| "-".to_string());
                table.add_row(vec![
                    Cell::new(i + 1),
                    Cell::new(c.component_type.display_name()),
                    Cell::new(c.component_type),
                    Cell::new(c.content_set_id),
                    Cell::new(c.questions_per_instance),
                    Cell::new(countdown),
                ]);
            }
            println!("{table}");
        }
    }

    Ok(())
}
