use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use flex_cli::{FieldsCommands, OutputFormat};
use flex_compete::{field_template, FieldLevel};
use tabwriter::TabWriter;

pub fn handle(command: &FieldsCommands) -> Result<()> {
    match command {
        FieldsCommands::List { format } => list(*format),
        FieldsCommands::Template { out } => template(out.as_deref()),
    }
}

fn list(format: OutputFormat) -> Result<()> {
    let template = field_template();
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&template.optional_fields)?);
        }
        OutputFormat::Table => {
            let mut writer = TabWriter::new(io::stdout());
            writeln!(writer, "FIELD\tLEVEL\tSTANDARD\tDESCRIPTION")?;
            for entry in &template.optional_fields {
                let level = match entry.level {
                    FieldLevel::Root => "root",
                    FieldLevel::ServiceWindow => "service_window",
                };
                let standard = if entry.included_in_standard { "yes" } else { "no" };
                writeln!(
                    writer,
                    "{}\t{level}\t{standard}\t{}",
                    entry.name, entry.description
                )?;
            }
            writer.flush()?;
        }
    }
    Ok(())
}

fn template(out: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(&field_template())?;
    match out {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            println!("Wrote field template to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
