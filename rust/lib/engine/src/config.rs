//! Generator configuration.
//!
//! Loaded from a TOML file; every key is optional:
//!
//! ```toml
//! root = "/srv/project"
//! module_path = "example.com/server"
//!
//! [layout]
//! model = "server/apps/{package}/models/{stem}.go"
//!
//! [rollback]
//! trash_dir = ".crudgen/trash"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crudgen_codegen::{EmitOptions, EntityModel, FileRole};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {message}")]
    Io { path: String, message: String },

    #[error("invalid config {path}: {message}")]
    Parse { path: String, message: String },
}

/// Top-level generator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Project root every generated path is relative to.
    pub root: PathBuf,
    /// Go module path of the backend.
    pub module_path: String,
    /// Router-group variable generated routes attach to.
    pub router_group: String,
    /// URL prefix used by the generated frontend client.
    pub api_base: String,
    pub default_page_size: u32,
    pub max_page_size: u32,
    pub layout: Layout,
    pub storage: StorageConfig,
    pub rollback: RollbackConfig,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        let emit = EmitOptions::default();
        Self {
            root: PathBuf::from("."),
            module_path: emit.module_path,
            router_group: emit.router_group,
            api_base: emit.api_base,
            default_page_size: emit.default_page_size,
            max_page_size: emit.max_page_size,
            layout: Layout::default(),
            storage: StorageConfig::default(),
            rollback: RollbackConfig::default(),
        }
    }
}

impl GeneratorConfig {
    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::parse(&content).map_err(|message| ConfigError::Parse {
            path: path.display().to_string(),
            message,
        })
    }

    pub fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    pub fn emit_options(&self) -> EmitOptions {
        EmitOptions {
            module_path: self.module_path.clone(),
            router_group: self.router_group.clone(),
            api_base: self.api_base.clone(),
            default_page_size: self.default_page_size,
            max_page_size: self.max_page_size.max(self.default_page_size),
        }
    }

    /// History database path, resolved against the project root when relative.
    pub fn history_db_path(&self) -> PathBuf {
        self.root.join(&self.storage.history_db)
    }

    pub fn sqlite_path(&self) -> PathBuf {
        self.root.join(&self.storage.sqlite)
    }

    pub fn trash_dir(&self) -> Option<PathBuf> {
        self.rollback.trash_dir.as_ref().map(|d| self.root.join(d))
    }
}

/// Where each artifact lands, relative to the project root.
///
/// Placeholders: `{package}`, `{app}`, `{stem}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layout {
    pub model: String,
    pub dto: String,
    pub controller: String,
    pub client_api: String,
    pub view: String,
    pub view_modal: String,
    pub routes: String,
    pub menu: String,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            model: "server/apps/{package}/models/{stem}.go".to_string(),
            dto: "server/apps/{package}/dto/{stem}.go".to_string(),
            controller: "server/apps/{package}/controllers/{stem}_controller.go".to_string(),
            client_api: "front-end/src/service/api/{stem}.ts".to_string(),
            view: "front-end/src/views/{app}/{stem}/index.vue".to_string(),
            view_modal: "front-end/src/views/{app}/{stem}/components/TableModal.vue".to_string(),
            routes: "server/apps/{package}/routes/routes.go".to_string(),
            menu: "front-end/src/router/routes.inner.ts".to_string(),
        }
    }
}

impl Layout {
    pub fn file_path(&self, role: FileRole, entity: &EntityModel) -> String {
        let template = match role {
            FileRole::Model => &self.model,
            FileRole::Dto => &self.dto,
            FileRole::Controller => &self.controller,
            FileRole::ClientApi => &self.client_api,
            FileRole::View => &self.view,
            FileRole::ViewModal => &self.view_modal,
        };
        expand(template, entity)
    }

    pub fn routes_path(&self, entity: &EntityModel) -> String {
        expand(&self.routes, entity)
    }

    pub fn menu_path(&self, entity: &EntityModel) -> String {
        expand(&self.menu, entity)
    }
}

fn expand(template: &str, entity: &EntityModel) -> String {
    template
        .replace("{package}", &entity.package_name)
        .replace("{app}", &entity.app_name)
        .replace("{stem}", &entity.file_stem())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// redb file holding generation history.
    pub history_db: PathBuf,
    /// SQLite database introspected for tables and columns.
    pub sqlite: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            history_db: PathBuf::from(".crudgen/history.redb"),
            sqlite: PathBuf::from("data/app.sqlite"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RollbackConfig {
    /// When set, rolled-back files are moved here instead of deleted.
    pub trash_dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = GeneratorConfig::parse("").unwrap();
        assert_eq!(config, GeneratorConfig::default());
        assert_eq!(config.emit_options(), EmitOptions::default());
        assert!(config.trash_dir().is_none());
    }

    #[test]
    fn partial_override() {
        let config = GeneratorConfig::parse(
            r#"
root = "/srv/app"
module_path = "git.example.com/erp"
max_page_size = 50

[layout]
model = "backend/{package}/{stem}.go"

[rollback]
trash_dir = ".trash"
"#,
        )
        .unwrap();
        assert_eq!(config.module_path, "git.example.com/erp");
        assert_eq!(config.default_page_size, 10);
        assert_eq!(config.emit_options().max_page_size, 50);
        assert_eq!(config.layout.model, "backend/{package}/{stem}.go");
        assert_eq!(config.layout.dto, Layout::default().dto);
        assert_eq!(config.trash_dir(), Some(PathBuf::from("/srv/app/.trash")));
        assert_eq!(
            config.history_db_path(),
            PathBuf::from("/srv/app/.crudgen/history.redb")
        );
    }

    #[test]
    fn unknown_types_are_rejected() {
        assert!(GeneratorConfig::parse("max_page_size = \"lots\"").is_err());
    }

    #[test]
    fn missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = GeneratorConfig::load(&dir.path().join("crudgen.toml")).unwrap();
        assert_eq!(config, GeneratorConfig::default());
    }
}
