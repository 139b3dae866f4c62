//! Generation runs.
//!
//! A run moves through
//! `Validating → Emitting(model) → … → Emitting(client) → Recording → Done`.
//! Conflicts are detected while validating, before anything is written. An
//! emitter failure moves the run to `Failed`: files already written stay in
//! place and a partial manifest listing exactly those files is recorded.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crudgen_codegen::emit::{self, client, route};
use crudgen_codegen::naming;
use crudgen_codegen::{
    ArtifactKind, ColumnInfo, EmitOptions, Emitter, EntityBuilder, EntityModel, GenerationRequest,
    SectionDocument, SectionEdit, SharedTarget, Upsert,
};
use crudgen_history::{
    Failure, GenerationManifest, HistoryRecord, HistoryStore, ManifestSummary, SectionRecord,
};
use crudgen_schema::SchemaCatalog;

use crate::config::GeneratorConfig;
use crate::error::{section_error, GenError};
use crate::lock::{GenerationLocks, SectionClaim};
use crate::workspace::Workspace;

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validating,
    Emitting(ArtifactKind),
    Recording,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Validating => f.write_str("validating"),
            Stage::Emitting(kind) => write!(f, "emitting({})", kind),
            Stage::Recording => f.write_str("recording"),
            Stage::Done => f.write_str("done"),
            Stage::Failed => f.write_str("failed"),
        }
    }
}

/// One page of history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPage {
    pub list: Vec<ManifestSummary>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

/// The generator: validates requests, runs the emitters, writes their
/// output into the workspace and records what it wrote.
pub struct Generator {
    pub(crate) config: GeneratorConfig,
    pub(crate) workspace: Arc<dyn Workspace>,
    pub(crate) history: Arc<dyn HistoryStore>,
    pub(crate) catalog: Option<Arc<dyn SchemaCatalog>>,
    pub(crate) locks: GenerationLocks,
    emitters: Vec<Box<dyn Emitter + Send + Sync>>,
}

impl Generator {
    pub fn new(
        config: GeneratorConfig,
        workspace: Arc<dyn Workspace>,
        history: Arc<dyn HistoryStore>,
    ) -> Self {
        Self {
            config,
            workspace,
            history,
            catalog: None,
            locks: GenerationLocks::new(),
            emitters: emit::all(),
        }
    }

    /// Attach the business database, used to derive fields from columns
    /// and to drop tables on rollback.
    pub fn with_catalog(mut self, catalog: Arc<dyn SchemaCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn locks(&self) -> &GenerationLocks {
        &self.locks
    }

    pub fn catalog(&self) -> Option<&Arc<dyn SchemaCatalog>> {
        self.catalog.as_ref()
    }

    /// Run a generation and return the stored manifest.
    pub fn generate(&self, request: &GenerationRequest) -> Result<HistoryRecord, GenError> {
        let struct_name = request.struct_name.trim();
        let _token = self.locks.acquire(struct_name)?;
        let opts = self.config.emit_options();

        self.enter(struct_name, Stage::Validating);
        let entity = self.validate(request)?;
        let claims = self.reserve_sections(&entity)?;

        let mut run = Run::new();
        for emitter in &self.emitters {
            let kind = emitter.kind();
            self.enter(struct_name, Stage::Emitting(kind));
            if let Err(message) = self.emit_one(emitter.as_ref(), &entity, &opts, &claims, &mut run)
            {
                return Err(self.fail(&entity, run, kind, message));
            }
        }

        self.enter(struct_name, Stage::Recording);
        let manifest = run.into_manifest(&entity, None);
        let id = self.history.insert(manifest.clone())?;
        self.enter(struct_name, Stage::Done);
        tracing::info!(
            struct_name,
            id,
            files = manifest.file_count(),
            "generation recorded"
        );

        Ok(HistoryRecord {
            id,
            manifest,
            rolled_back_at: None,
        })
    }

    /// One page of history, newest first.
    pub fn history(&self, page: usize, page_size: usize) -> Result<HistoryPage, GenError> {
        let page = page.max(1);
        let page_size = if page_size == 0 {
            self.config.default_page_size as usize
        } else {
            page_size
        };
        let (records, total) = self.history.list(page, page_size)?;
        Ok(HistoryPage {
            list: records.iter().map(ManifestSummary::from).collect(),
            total,
            page,
            page_size,
        })
    }

    pub fn history_record(&self, id: u64) -> Result<HistoryRecord, GenError> {
        Ok(self.history.get(id)?)
    }

    /// Remove a history record. Generated files are left untouched.
    pub fn delete_history(&self, id: u64) -> Result<(), GenError> {
        self.history.delete(id)?;
        tracing::info!(id, "history record deleted");
        Ok(())
    }

    fn enter(&self, struct_name: &str, stage: Stage) {
        tracing::info!(struct_name, stage = %stage, "generation stage");
    }

    /// Build the entity and refuse runs that would clash with another entity.
    fn validate(&self, request: &GenerationRequest) -> Result<EntityModel, GenError> {
        let columns = self.columns_for(request);
        let entity =
            EntityBuilder::build(request, columns.as_deref()).map_err(GenError::Validation)?;

        for record in self.history.for_table(&entity.table_name)? {
            let owner = &record.manifest.struct_name;
            if owner != &entity.struct_name && record.rolled_back_at.is_none() {
                return Err(GenError::Conflict(format!(
                    "table {} is already generated as {} (history record {})",
                    entity.table_name, owner, record.id
                )));
            }
        }

        Ok(entity)
    }

    /// Check and reserve every section key the run will write.
    ///
    /// Runs under the shared-file lock, so no other run can take a key
    /// between the ownership check and the reservation. The claims are held
    /// until the run ends.
    fn reserve_sections(&self, entity: &EntityModel) -> Result<Vec<SectionClaim<'_>>, GenError> {
        let mut keys = vec![(SharedTarget::RouteRegistry, route::route_key(entity))];
        if entity.capabilities.list {
            keys.push((SharedTarget::Menu, client::menu_key(entity)));
        }

        let _guard = self.locks.shared();
        let mut claims = Vec::with_capacity(keys.len());
        for (target, key) in keys {
            let path = self.shared_path(target, entity);
            self.check_section(entity, &path, &key)?;
            claims.push(self.locks.reserve(&path, &key, &entity.struct_name)?);
        }
        Ok(claims)
    }

    /// Columns of the request's table, when fields must be derived from them.
    fn columns_for(&self, request: &GenerationRequest) -> Option<Vec<ColumnInfo>> {
        if !request.fields.is_empty() {
            return None;
        }
        let catalog = self.catalog.as_ref()?;
        let table = if request.table_name.trim().is_empty() {
            naming::table_name_for(request.struct_name.trim())
        } else {
            request.table_name.trim().to_string()
        };
        match catalog.list_columns(&table) {
            Ok(columns) => Some(columns),
            Err(e) => {
                tracing::warn!(table = %table, error = %e, "cannot derive fields from table");
                None
            }
        }
    }

    fn check_section(&self, entity: &EntityModel, path: &str, key: &str) -> Result<(), GenError> {
        let Some(text) = self.workspace.read(path)? else {
            return Ok(());
        };
        let doc = SectionDocument::parse(&text).map_err(|e| section_error(path, e))?;
        match doc.get(key) {
            Some(section) if section.owner != entity.struct_name => Err(GenError::Conflict(format!(
                "{}: section '{}' is already owned by {}",
                path, key, section.owner
            ))),
            _ => Ok(()),
        }
    }

    pub(crate) fn shared_path(&self, target: SharedTarget, entity: &EntityModel) -> String {
        match target {
            SharedTarget::RouteRegistry => self.config.layout.routes_path(entity),
            SharedTarget::Menu => self.config.layout.menu_path(entity),
        }
    }

    /// Run one emitter and write its output. Files are recorded as soon as
    /// they are written.
    fn emit_one(
        &self,
        emitter: &(dyn Emitter + Send + Sync),
        entity: &EntityModel,
        opts: &EmitOptions,
        claims: &[SectionClaim<'_>],
        run: &mut Run,
    ) -> Result<(), String> {
        let kind = emitter.kind();
        let emission = emitter.emit(entity, opts).map_err(|e| e.to_string())?;

        for file in &emission.files {
            let path = self.config.layout.file_path(file.role, entity);
            self.workspace
                .write(&path, &file.content)
                .map_err(|e| e.to_string())?;
            tracing::info!(artifact = %kind, path = %path, "file written");
            run.files.entry(kind).or_default().push(path);
        }

        for edit in &emission.sections {
            let record = self
                .apply_section(entity, edit, opts, claims)
                .map_err(|e| e.to_string())?;
            run.sections.push(record);
        }
        Ok(())
    }

    /// Upsert a section into its shared file under the shared-file lock.
    ///
    /// Other sections of the same owner in that file that this run does not
    /// write are removed, so a renamed key does not leave its old block behind.
    fn apply_section(
        &self,
        entity: &EntityModel,
        edit: &SectionEdit,
        opts: &EmitOptions,
        claims: &[SectionClaim<'_>],
    ) -> Result<SectionRecord, GenError> {
        let path = self.shared_path(edit.target, entity);
        let _guard = self.locks.shared();

        let text = match self.workspace.read(&path)? {
            Some(text) => text,
            None => match edit.target {
                SharedTarget::RouteRegistry => route::registry_skeleton(&entity.package_name, opts),
                SharedTarget::Menu => client::menu_skeleton(),
            },
        };
        let mut doc = SectionDocument::parse(&text).map_err(|e| section_error(&path, e))?;
        let outcome = doc
            .upsert(edit.target.anchor(), &edit.key, &edit.owner, &edit.body)
            .map_err(|e| section_error(&path, e))?;

        let mut stale = doc.keys_owned_by(&edit.owner);
        stale.retain(|key| !claims.iter().any(|c| c.path() == path && c.key() == key.as_str()));
        for key in &stale {
            doc.remove(key);
            tracing::info!(
                shared = edit.target.as_str(),
                key = %key,
                path = %path,
                "stale section removed"
            );
        }

        if outcome != Upsert::Unchanged || !stale.is_empty() {
            self.workspace.write(&path, &doc.render())?;
        }
        tracing::info!(
            shared = edit.target.as_str(),
            key = %edit.key,
            path = %path,
            outcome = ?outcome,
            "section upserted"
        );

        Ok(SectionRecord {
            target: edit.target,
            path,
            key: edit.key.clone(),
        })
    }

    /// Record the partial manifest and build the error reported to the caller.
    fn fail(
        &self,
        entity: &EntityModel,
        run: Run,
        artifact: ArtifactKind,
        message: String,
    ) -> GenError {
        self.enter(&entity.struct_name, Stage::Failed);
        tracing::warn!(
            struct_name = %entity.struct_name,
            artifact = %artifact,
            error = %message,
            "generation failed"
        );
        let manifest = run.into_manifest(
            entity,
            Some(Failure {
                artifact,
                message: message.clone(),
            }),
        );
        match self.history.insert(manifest) {
            Ok(manifest_id) => GenError::Emission {
                artifact,
                message,
                manifest_id,
            },
            Err(e) => GenError::Storage(format!(
                "{} emission failed ({}) and the partial manifest could not be stored: {}",
                artifact, message, e
            )),
        }
    }
}

/// What a run has written so far.
struct Run {
    files: BTreeMap<ArtifactKind, Vec<String>>,
    sections: Vec<SectionRecord>,
    started_at: String,
}

impl Run {
    fn new() -> Self {
        Self {
            files: BTreeMap::new(),
            sections: Vec::new(),
            started_at: now(),
        }
    }

    fn into_manifest(self, entity: &EntityModel, failure: Option<Failure>) -> GenerationManifest {
        GenerationManifest {
            struct_name: entity.struct_name.clone(),
            package_name: entity.package_name.clone(),
            app_name: entity.app_name.clone(),
            table_name: entity.table_name.clone(),
            description: entity.description.clone(),
            api_prefix: entity.api_prefix.clone(),
            files: self.files,
            sections: self.sections,
            fields: entity.fields.clone(),
            partial: failure.is_some(),
            failure,
            created_at: self.started_at,
        }
    }
}

/// Current time, RFC 3339.
pub(crate) fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
