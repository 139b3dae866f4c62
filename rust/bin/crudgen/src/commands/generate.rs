//! `crudgen generate -f request.json`

use std::io::Read;

use anyhow::Result;

use crudgen_codegen::GenerationRequest;
use crudgen_engine::GenError;

use super::{print_json, App};

pub fn generate(app: &App, file: &str, json: bool) -> Result<()> {
    let content = if file == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(file)?
    };
    let request: GenerationRequest = serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Invalid request in {}: {}", file, e))?;

    let record = match app.generator.generate(&request) {
        Ok(record) => record,
        Err(GenError::Validation(violations)) => {
            if json {
                print_json(&violations)?;
            } else {
                println!("{:24} {:20} {}", "KIND", "CONTEXT", "MESSAGE");
                for v in violations.iter() {
                    let kind = serde_json::to_value(v.kind)?;
                    println!(
                        "{:24} {:20} {}",
                        kind.as_str().unwrap_or_default(),
                        v.context,
                        v.message
                    );
                }
            }
            anyhow::bail!("Validation failed with {} violation(s).", violations.len());
        }
        Err(GenError::Emission {
            artifact,
            message,
            manifest_id,
        }) => {
            anyhow::bail!(
                "Generating the {} failed: {}\nFiles written so far are recorded as partial history record {}.",
                artifact,
                message,
                manifest_id
            );
        }
        Err(e) => return Err(e.into()),
    };

    if json {
        return print_json(&record);
    }
    println!(
        "Generated {} (history record {}).",
        record.manifest.struct_name, record.id
    );
    for path in record.manifest.all_files() {
        println!("  file     {}", path);
    }
    for section in &record.manifest.sections {
        println!("  section  {} [{}]", section.path, section.key);
    }
    Ok(())
}
