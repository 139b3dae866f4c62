//! `crudgen history`, `crudgen delete-history`, `crudgen rollback`

use anyhow::Result;

use crudgen_engine::{GenError, RollbackFlags, RollbackReport};

use super::{print_json, App};

pub fn list(app: &App, page: usize, page_size: usize, json: bool) -> Result<()> {
    let page = app.generator.history(page, page_size)?;
    if json {
        return print_json(&page);
    }
    if page.list.is_empty() {
        println!("No history.");
        return Ok(());
    }

    println!(
        "{:6} {:20} {:20} {:6} {:8} {:22} {}",
        "ID", "STRUCT", "TABLE", "FILES", "STATUS", "CREATED", "DESCRIPTION"
    );
    for row in &page.list {
        let status = if row.rolled_back_at.is_some() {
            "rolled"
        } else if row.partial {
            "partial"
        } else {
            "ok"
        };
        println!(
            "{:6} {:20} {:20} {:6} {:8} {:22} {}",
            row.id,
            row.struct_name,
            row.table_name,
            row.file_count,
            status,
            row.created_at,
            row.description
        );
    }
    println!(
        "Page {} ({} per page), {} record(s) total.",
        page.page, page.page_size, page.total
    );
    Ok(())
}

pub fn delete(app: &App, id: u64) -> Result<()> {
    app.generator.delete_history(id)?;
    println!("History record {} deleted. Generated files were kept.", id);
    Ok(())
}

pub fn rollback(app: &App, id: u64, flags: &RollbackFlags, json: bool) -> Result<()> {
    if flags.delete_table && flags.confirm_table.is_none() {
        anyhow::bail!("--table drops the database table; repeat its name with --confirm-table.");
    }

    match app.generator.rollback(id, flags) {
        Ok(report) => {
            if json {
                return print_json(&report);
            }
            if !flags.any() {
                println!("Nothing selected; record {} left as is.", id);
                return Ok(());
            }
            print_report(&report);
            println!("Rollback of record {} complete.", id);
            Ok(())
        }
        Err(GenError::Rollback(report)) => {
            if json {
                print_json(&report)?;
            } else {
                print_report(&report);
                for failure in &report.failures {
                    println!(
                        "  failed   [{}] {}: {}",
                        failure.category, failure.target, failure.message
                    );
                }
            }
            anyhow::bail!(
                "Rollback of record {} incomplete: {} failure(s).",
                id,
                report.failures.len()
            );
        }
        Err(e) => Err(e.into()),
    }
}

fn print_report(report: &RollbackReport) {
    for path in &report.removed_files {
        println!("  removed  {}", path);
    }
    for section in &report.removed_sections {
        println!("  removed  {} [{}]", section.path, section.key);
    }
    if let Some(table) = &report.dropped_table {
        println!("  dropped  table {}", table);
    }
}
