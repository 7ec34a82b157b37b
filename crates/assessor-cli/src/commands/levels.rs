//! The `assessor levels` command.

use std::path::PathBuf;

use anyhow::Result;

use assessor_core::scoring::{band_table, level_for};

pub fn execute(section: Option<String>, config_path: Option<PathBuf>) -> Result<()> {
    use comfy_table::{Cell, Table};

    let config = super::config(config_path)?;
    let section = super::section(section.as_deref(), &config)?;

    let Some(bands) = band_table(section) else {
        println!("{} is not leveled.", section.title());
        return Ok(());
    };

    let mut table = Table::new();
    table.set_header(vec!["Correct", "Level"]);

    let mut lower = 0;
    for &(upper, level) in bands {
        table.add_row(vec![
            Cell::new(format!("{lower}-{upper}")),
            Cell::new(format!("{level:.1}")),
        ]);
        lower = upper + 1;
    }
    table.add_row(vec![
        Cell::new(format!("{lower}+")),
        Cell::new(level_for(section, lower)),
    ]);

    println!("{} levels", section.title());
    println!("{table}");
    Ok(())
}
