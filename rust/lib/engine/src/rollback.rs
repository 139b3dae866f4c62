//! Reversing a recorded generation.
//!
//! Each flag selects one category of what the run wrote. Categories are
//! independent: a failure in one is recorded and the others still run.

use std::fmt;

use serde::{Deserialize, Serialize};

use crudgen_codegen::{SectionDocument, SharedTarget};
use crudgen_history::{HistoryRecord, SectionRecord};

use crate::error::GenError;
use crate::orchestrator::{now, Generator};
use crate::workspace::WorkspaceError;

/// Which categories to roll back. All default to false.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RollbackFlags {
    pub delete_files: bool,
    pub delete_api: bool,
    pub delete_menu: bool,
    pub delete_table: bool,
    /// Must equal the manifest's table name for `delete_table` to act.
    pub confirm_table: Option<String>,
}

impl RollbackFlags {
    pub fn any(&self) -> bool {
        self.delete_files || self.delete_api || self.delete_menu || self.delete_table
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackRequest {
    pub id: u64,
    #[serde(flatten)]
    pub flags: RollbackFlags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollbackCategory {
    Files,
    Api,
    Menu,
    Table,
}

impl fmt::Display for RollbackCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RollbackCategory::Files => "files",
            RollbackCategory::Api => "api",
            RollbackCategory::Menu => "menu",
            RollbackCategory::Table => "table",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackFailure {
    pub category: RollbackCategory,
    /// File path, section key or table name.
    pub target: String,
    pub message: String,
}

/// What a rollback did and what it could not do.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackReport {
    pub id: u64,
    pub removed_files: Vec<String>,
    pub removed_sections: Vec<SectionRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dropped_table: Option<String>,
    pub failures: Vec<RollbackFailure>,
}

impl RollbackReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn fail(&mut self, category: RollbackCategory, target: &str, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(
            id = self.id,
            category = %category,
            target_name = target,
            error = %message,
            "rollback step failed"
        );
        self.failures.push(RollbackFailure {
            category,
            target: target.to_string(),
            message,
        });
    }
}

impl fmt::Display for RollbackReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rollback of record {} incomplete: {} failure(s)",
            self.id,
            self.failures.len()
        )?;
        for (i, failure) in self.failures.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(
                f,
                "{}[{}] {}: {}",
                sep, failure.category, failure.target, failure.message
            )?;
        }
        Ok(())
    }
}

impl Generator {
    /// Roll back the run recorded as `id`.
    ///
    /// Returns the report when every selected category succeeded, and
    /// GenError::Rollback carrying the same report otherwise. Rejected with
    /// GenError::Busy while a generation for the same struct is in flight.
    pub fn rollback(&self, id: u64, flags: &RollbackFlags) -> Result<RollbackReport, GenError> {
        let record = self.history.get(id)?;
        let manifest = &record.manifest;
        let _token = self.locks.acquire(&manifest.struct_name)?;

        let mut report = RollbackReport {
            id,
            ..Default::default()
        };
        if !flags.any() {
            tracing::info!(id, "rollback with no categories selected");
            return Ok(report);
        }

        if flags.delete_files {
            self.remove_files(&record, &mut report);
        }
        if flags.delete_api {
            self.remove_sections(&record, SharedTarget::RouteRegistry, &mut report);
        }
        if flags.delete_menu {
            self.remove_sections(&record, SharedTarget::Menu, &mut report);
        }
        if flags.delete_table {
            self.drop_table(&record, flags.confirm_table.as_deref(), &mut report);
        }

        self.history.mark_rolled_back(id, &now())?;
        tracing::info!(
            id,
            struct_name = %manifest.struct_name,
            files = report.removed_files.len(),
            sections = report.removed_sections.len(),
            failures = report.failures.len(),
            "rollback finished"
        );

        if report.is_clean() {
            Ok(report)
        } else {
            Err(GenError::Rollback(report))
        }
    }

    fn remove_files(&self, record: &HistoryRecord, report: &mut RollbackReport) {
        for path in record.manifest.all_files() {
            match self.workspace.remove(path) {
                Ok(()) => report.removed_files.push(path.to_string()),
                Err(WorkspaceError::NotFound(_)) => {
                    report.fail(RollbackCategory::Files, path, "file already removed")
                }
                Err(e) => report.fail(RollbackCategory::Files, path, e.to_string()),
            }
        }
    }

    fn remove_sections(
        &self,
        record: &HistoryRecord,
        target: SharedTarget,
        report: &mut RollbackReport,
    ) {
        let category = match target {
            SharedTarget::RouteRegistry => RollbackCategory::Api,
            SharedTarget::Menu => RollbackCategory::Menu,
        };
        let _guard = self.locks.shared();
        for section in record.manifest.sections_for(target) {
            match self.remove_section(section, &record.manifest.struct_name) {
                Ok(()) => report.removed_sections.push(section.clone()),
                Err(message) => report.fail(category, &section.key, message),
            }
        }
    }

    /// Remove one recorded section, only while `owner` still owns it.
    fn remove_section(&self, section: &SectionRecord, owner: &str) -> Result<(), String> {
        let text = self
            .workspace
            .read(&section.path)
            .map_err(|e| e.to_string())?
            .ok_or_else(|| format!("{} not found", section.path))?;
        let mut doc = SectionDocument::parse(&text).map_err(|e| e.to_string())?;
        match doc.get(&section.key) {
            None => return Err(format!("section not present in {}", section.path)),
            Some(current) if current.owner != owner => {
                return Err(format!("section is now owned by '{}'", current.owner));
            }
            Some(_) => {}
        }
        doc.remove(&section.key);
        self.workspace
            .write(&section.path, &doc.render())
            .map_err(|e| e.to_string())
    }

    fn drop_table(
        &self,
        record: &HistoryRecord,
        confirm: Option<&str>,
        report: &mut RollbackReport,
    ) {
        let table = &record.manifest.table_name;
        if confirm != Some(table.as_str()) {
            report.fail(
                RollbackCategory::Table,
                table,
                "dropping a table must be confirmed with its exact name",
            );
            return;
        }
        let Some(catalog) = &self.catalog else {
            report.fail(RollbackCategory::Table, table, "no database configured");
            return;
        };
        match catalog.drop_table(table) {
            Ok(()) => report.dropped_table = Some(table.clone()),
            Err(e) => report.fail(RollbackCategory::Table, table, e.to_string()),
        }
    }
}
