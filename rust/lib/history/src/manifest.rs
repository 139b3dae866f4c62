use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crudgen_codegen::{ArtifactKind, FieldSpec, SharedTarget};

/// A shared-file section touched by a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionRecord {
    pub target: SharedTarget,
    /// Path of the shared file, relative to the project root.
    pub path: String,
    pub key: String,
}

/// Which artifact stopped a partial run, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Failure {
    pub artifact: ArtifactKind,
    pub message: String,
}

/// Everything one generation run wrote. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationManifest {
    pub struct_name: String,
    pub package_name: String,
    pub app_name: String,
    pub table_name: String,
    pub description: String,
    pub api_prefix: String,
    /// Generated file paths, relative to the project root.
    pub files: BTreeMap<ArtifactKind, Vec<String>>,
    pub sections: Vec<SectionRecord>,
    pub fields: Vec<FieldSpec>,
    pub partial: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<Failure>,
    /// RFC 3339.
    pub created_at: String,
}

impl GenerationManifest {
    /// All generated file paths in artifact order.
    pub fn all_files(&self) -> impl Iterator<Item = &str> {
        self.files.values().flatten().map(String::as_str)
    }

    pub fn file_count(&self) -> usize {
        self.files.values().map(Vec::len).sum()
    }

    pub fn sections_for(&self, target: SharedTarget) -> impl Iterator<Item = &SectionRecord> {
        self.sections.iter().filter(move |s| s.target == target)
    }
}

/// A stored manifest plus the bookkeeping the store owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub id: u64,
    #[serde(flatten)]
    pub manifest: GenerationManifest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rolled_back_at: Option<String>,
}

/// Listing row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestSummary {
    pub id: u64,
    pub struct_name: String,
    pub package_name: String,
    pub table_name: String,
    pub description: String,
    pub api_prefix: String,
    pub file_count: usize,
    pub partial: bool,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rolled_back_at: Option<String>,
}

impl From<&HistoryRecord> for ManifestSummary {
    fn from(record: &HistoryRecord) -> Self {
        let m = &record.manifest;
        Self {
            id: record.id,
            struct_name: m.struct_name.clone(),
            package_name: m.package_name.clone(),
            table_name: m.table_name.clone(),
            description: m.description.clone(),
            api_prefix: m.api_prefix.clone(),
            file_count: m.file_count(),
            partial: m.partial,
            created_at: m.created_at.clone(),
            rolled_back_at: record.rolled_back_at.clone(),
        }
    }
}

#[cfg(test)]
pub(crate) fn sample(struct_name: &str, table_name: &str) -> GenerationManifest {
    let mut files = BTreeMap::new();
    files.insert(
        ArtifactKind::Model,
        vec![format!("server/apps/admin/models/{}.go", struct_name)],
    );
    files.insert(
        ArtifactKind::Dto,
        vec![format!("server/apps/admin/dto/{}.go", struct_name)],
    );
    GenerationManifest {
        struct_name: struct_name.to_string(),
        package_name: "admin".to_string(),
        app_name: "admin".to_string(),
        table_name: table_name.to_string(),
        description: String::new(),
        api_prefix: struct_name.to_string(),
        files,
        sections: vec![SectionRecord {
            target: SharedTarget::RouteRegistry,
            path: "server/apps/admin/routes/routes.go".to_string(),
            key: struct_name.to_string(),
        }],
        fields: Vec::new(),
        partial: false,
        failure: None,
        created_at: "2024-01-01T00:00:00Z".to_string(),
    }
}
