/// Artifact emitters.
///
/// Each emitter is a pure function of an [`EntityModel`]: it returns text
/// and section edits, never touches the filesystem, and never decides where
/// its files go.

pub mod client;
pub mod controller;
pub mod dto;
pub mod model;
pub mod route;

use serde::{Deserialize, Serialize};

use crate::entity::{DataType, EntityModel, FieldSpec};
use crate::naming;
use crate::section::SharedTarget;

/// Emitter trait - implement this for each artifact kind.
pub trait Emitter {
    fn kind(&self) -> ArtifactKind;
    fn language(&self) -> &str;
    fn emit(&self, entity: &EntityModel, opts: &EmitOptions) -> Result<Emission, EmitError>;
}

/// The five artifact kinds, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Model,
    Dto,
    Controller,
    Routes,
    Client,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 5] = [
        ArtifactKind::Model,
        ArtifactKind::Dto,
        ArtifactKind::Controller,
        ArtifactKind::Routes,
        ArtifactKind::Client,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Model => "model",
            ArtifactKind::Dto => "dto",
            ArtifactKind::Controller => "controller",
            ArtifactKind::Routes => "routes",
            ArtifactKind::Client => "client",
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a generated file is; the orchestrator maps roles to paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileRole {
    Model,
    Dto,
    Controller,
    ClientApi,
    View,
    /// Create/edit form dialog used by the list view.
    ViewModal,
}

#[derive(Debug)]
pub struct GeneratedFile {
    pub role: FileRole,
    pub content: String,
}

/// A keyed block to upsert into a shared file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionEdit {
    pub target: SharedTarget,
    pub key: String,
    pub owner: String,
    pub body: String,
}

#[derive(Debug, Default)]
pub struct Emission {
    pub files: Vec<GeneratedFile>,
    pub sections: Vec<SectionEdit>,
}

/// Settings shared by every emitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitOptions {
    /// Go module path of the backend, e.g. `example.com/server`.
    pub module_path: String,
    /// Router-group variable the generated routes attach to.
    pub router_group: String,
    /// URL prefix the frontend client puts in front of every route.
    pub api_base: String,
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            module_path: "example.com/server".to_string(),
            router_group: "privateRoutes".to_string(),
            api_base: "/api".to_string(),
            default_page_size: 10,
            max_page_size: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EmitError {
    #[error("field '{field}': data type '{data_type}' cannot be used {usage}")]
    UnsupportedType {
        field: String,
        data_type: String,
        usage: &'static str,
    },

    #[error("{0}")]
    Invalid(String),
}

/// The five emitters in emission order.
pub fn all() -> Vec<Box<dyn Emitter + Send + Sync>> {
    vec![
        Box::new(model::ModelEmitter),
        Box::new(dto::DtoEmitter),
        Box::new(controller::ControllerEmitter),
        Box::new(route::RouteEmitter),
        Box::new(client::ClientEmitter),
    ]
}

/// The entity's primary key, or an emission error when it has none.
pub(crate) fn primary_key(entity: &EntityModel) -> Result<&FieldSpec, EmitError> {
    entity.primary_key().ok_or_else(|| {
        EmitError::Invalid(format!("{} has no primary-key field", entity.struct_name))
    })
}

/// Go type of a scalar field.
pub(crate) fn go_type(data_type: &DataType) -> &str {
    match data_type {
        DataType::Int => "int",
        DataType::Int64 => "int64",
        DataType::Uint => "uint",
        DataType::Float => "float64",
        DataType::String | DataType::Text => "string",
        DataType::Bool => "bool",
        DataType::Time => "time.Time",
        DataType::Json => "json.RawMessage",
        DataType::Custom(name) => name,
    }
}

/// TypeScript type of a scalar field.
pub(crate) fn ts_type(data_type: &DataType) -> &'static str {
    match data_type {
        DataType::Int | DataType::Int64 | DataType::Uint | DataType::Float => "number",
        DataType::String | DataType::Text | DataType::Time => "string",
        DataType::Bool => "boolean",
        DataType::Json | DataType::Custom(_) => "unknown",
    }
}

/// Whether any scalar field of the entity uses `data_type`.
pub(crate) fn uses_type(entity: &EntityModel, pred: impl Fn(&DataType) -> bool) -> bool {
    entity
        .fields
        .iter()
        .filter(|f| !f.is_relation())
        .any(|f| pred(&f.data_type))
}

/// Scalar fields, skipping the conventional ID supplied by the base columns.
pub(crate) fn member_fields(entity: &EntityModel) -> impl Iterator<Item = &FieldSpec> {
    let skip_id = entity.has_conventional_id();
    entity
        .fields
        .iter()
        .filter(move |f| !(skip_id && f.flags.primary_key))
}

/// Whether a scalar field with `name` is declared on the entity.
pub(crate) fn declares_scalar(entity: &EntityModel, name: &str) -> bool {
    entity
        .fields
        .iter()
        .any(|f| !f.is_relation() && f.name == name)
}

/// Double-quoted string literal, valid in both Go and TypeScript.
pub(crate) fn quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// A `//` comment line holding free text, flattened to a single line.
pub(crate) fn go_comment(text: &str) -> String {
    format!("// {}\n", naming::single_line(text))
}

/// Members of a generated Go struct, aligned in columns the way gofmt
/// aligns them.
#[derive(Default)]
pub(crate) struct GoFields {
    rows: Vec<Vec<String>>,
}

impl GoFields {
    /// Add a member. `tag` is the tag content without backquotes; empty
    /// `tag` and `comment` are left out.
    pub fn push(&mut self, name: &str, ty: &str, tag: &str, comment: &str) {
        let mut cells = vec![name.to_string(), ty.to_string()];
        if !tag.is_empty() {
            cells.push(format!("`{}`", tag));
        }
        let comment = naming::single_line(comment);
        if !comment.is_empty() {
            cells.push(format!("// {}", comment));
        }
        self.rows.push(cells);
    }

    pub fn render(&self) -> String {
        let mut output = String::new();
        for line in align_cells(&self.rows) {
            output.push('\t');
            output.push_str(&line);
            output.push('\n');
        }
        output
    }
}

/// Pad cells so each column lines up across consecutive rows.
///
/// Works like a tab writer with a padding of one: the last cell of a row is
/// never padded, and a column block ends at the first row that has no
/// padded cell in that column.
fn align_cells(rows: &[Vec<String>]) -> Vec<String> {
    let mut widths: Vec<Vec<usize>> = rows
        .iter()
        .map(|cells| vec![0; cells.len().saturating_sub(1)])
        .collect();
    column_blocks(rows, &mut widths, 0, 0, rows.len());

    rows.iter()
        .zip(&widths)
        .map(|(cells, widths)| {
            let mut line = String::new();
            for (i, cell) in cells.iter().enumerate() {
                line.push_str(cell);
                if let Some(width) = widths.get(i) {
                    let pad = width.saturating_sub(cell.chars().count());
                    line.extend(std::iter::repeat(' ').take(pad));
                }
            }
            line
        })
        .collect()
}

fn column_blocks(
    rows: &[Vec<String>],
    widths: &mut [Vec<usize>],
    column: usize,
    start: usize,
    end: usize,
) {
    let mut i = start;
    while i < end {
        if rows[i].len() <= column + 1 {
            i += 1;
            continue;
        }
        let mut j = i;
        let mut width = 0;
        while j < end && rows[j].len() > column + 1 {
            width = width.max(rows[j][column].chars().count());
            j += 1;
        }
        for row in widths.iter_mut().take(j).skip(i) {
            row[column] = width + 1;
        }
        column_blocks(rows, widths, column + 1, i, j);
        i = j;
    }
}

/// Standard header placed on every generated Go file.
pub(crate) fn go_header(package: &str) -> String {
    format!("// Code generated by crudgen. DO NOT EDIT.\n\npackage {}\n", package)
}

/// Render an import block; an empty list renders nothing.
///
/// Standard-library paths come first, then the rest, each group sorted.
pub(crate) fn go_imports(imports: &[String]) -> String {
    if imports.is_empty() {
        return String::new();
    }
    let (mut std, mut others): (Vec<&String>, Vec<&String>) = imports
        .iter()
        .partition(|path| !path.split('/').next().unwrap_or_default().contains('.'));
    std.sort();
    others.sort();

    let mut output = String::from("\nimport (\n");
    for import in &std {
        output.push_str(&format!("\t\"{}\"\n", import));
    }
    if !std.is_empty() && !others.is_empty() {
        output.push('\n');
    }
    for import in &others {
        output.push_str(&format!("\t\"{}\"\n", import));
    }
    output.push_str(")\n");
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_align_like_gofmt() {
        let mut fields = GoFields::default();
        fields.push("ID", "uint", "gorm:\"primarykey\" json:\"id\"", "");
        fields.push("CreatedAt", "time.Time", "json:\"createdAt\"", "");
        fields.push("Name", "string", "json:\"name\"", "Display\nname");
        fields.push("Price", "float64", "json:\"price\"", "");
        assert_eq!(
            fields.render(),
            "\tID        uint      `gorm:\"primarykey\" json:\"id\"`\n\
             \tCreatedAt time.Time `json:\"createdAt\"`\n\
             \tName      string    `json:\"name\"` // Display name\n\
             \tPrice     float64   `json:\"price\"`\n"
        );
    }

    #[test]
    fn comment_blocks_break_on_rows_without_comments() {
        let mut fields = GoFields::default();
        fields.push("A", "int", "json:\"a\"", "first");
        fields.push("Bb", "int", "json:\"bbbbbb\"", "");
        fields.push("C", "int", "json:\"c\"", "third");
        assert_eq!(
            fields.render(),
            "\tA  int `json:\"a\"` // first\n\
             \tBb int `json:\"bbbbbb\"`\n\
             \tC  int `json:\"c\"` // third\n"
        );
    }

    #[test]
    fn imports_group_standard_library_first() {
        let imports = vec![
            "github.com/gin-gonic/gin".to_string(),
            "strconv".to_string(),
            "example.com/server/core/response".to_string(),
            "encoding/json".to_string(),
        ];
        assert_eq!(
            go_imports(&imports),
            "\nimport (\n\t\"encoding/json\"\n\t\"strconv\"\n\n\
             \t\"example.com/server/core/response\"\n\t\"github.com/gin-gonic/gin\"\n)\n"
        );
        assert_eq!(go_imports(&["time".to_string()]), "\nimport (\n\t\"time\"\n)\n");
    }

    #[test]
    fn comments_stay_on_one_line() {
        assert_eq!(go_comment("Products\n}\ntype X struct {"), "// Products } type X struct {\n");
    }
}
