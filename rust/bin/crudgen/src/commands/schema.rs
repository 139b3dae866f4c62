//! `crudgen tables`, `crudgen columns <table>`

use anyhow::Result;

use super::{print_json, App};

pub fn tables(app: &App, json: bool) -> Result<()> {
    let tables = app.catalog()?.list_tables()?;
    if json {
        return print_json(&tables);
    }
    println!("{:32} {}", "TABLE", "COMMENT");
    for t in &tables {
        println!("{:32} {}", t.table_name, t.table_comment);
    }
    Ok(())
}

pub fn columns(app: &App, table: &str, json: bool) -> Result<()> {
    let columns = app.catalog()?.list_columns(table)?;
    if json {
        return print_json(&columns);
    }
    println!(
        "{:24} {:16} {:8} {:4} {}",
        "COLUMN", "TYPE", "NULLABLE", "KEY", "COMMENT"
    );
    for c in &columns {
        println!(
            "{:24} {:16} {:8} {:4} {}",
            c.column_name,
            c.data_type,
            if c.nullable { "yes" } else { "no" },
            c.key_flag,
            c.comment
        );
    }
    Ok(())
}
