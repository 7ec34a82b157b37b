//! The `assessor init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("assessor.toml").exists() {
        println!("assessor.toml already exists, skipping.");
    } else {
        std::fs::write("assessor.toml", SAMPLE_CONFIG)?;
        println!("Created assessor.toml");
    }

    std::fs::create_dir_all("answers")?;
    let sheet_path = std::path::Path::new("answers/reading-1.json");
    if sheet_path.exists() {
        println!("answers/reading-1.json already exists, skipping.");
    } else {
        std::fs::write(sheet_path, SAMPLE_ANSWERS)?;
        println!("Created answers/reading-1.json");
    }

    println!("\nNext steps:");
    println!("  1. Run: assessor module --section reading --number 1");
    println!("  2. Run: assessor run --section reading --number 1 --answers answers/reading-1.json");
    println!("  3. Fix the wrong answers and run: assessor retake --section reading --answers <sheet>");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# assessor configuration

# First-attempt records, one JSON file shared by all sections
store_path = "./assessor-data/store.json"

# Apply section and component countdowns
enforce_time_limits = true

# Section used when --section is omitted
default_section = "reading"
"#;

const SAMPLE_ANSWERS: &str = r#"{
  "fillblanks": {
    "1": [true, true, true, false, true, true, true, true, false, true],
    "2": [true, true, true, true, true, false, true, true, true, true]
  },
  "daily1": {
    "1": [true, true],
    "2": [true, false]
  },
  "daily2": {
    "1": [true, true, true],
    "2": [true, true, true]
  },
  "academic": {
    "1": [true, true, false, true, true]
  }
}
"#;
