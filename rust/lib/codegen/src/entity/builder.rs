//! Builds a validated [`EntityModel`] from an untyped generation request.
//!
//! Checks are exhaustive: every violation is collected and returned at once
//! rather than stopping at the first.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::*;
use crate::naming;

/// Generation request as it arrives from a form, CLI file or HTTP body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationRequest {
    pub struct_name: String,
    pub table_name: String,
    pub package_name: String,
    pub app_name: String,
    pub description: String,
    pub api_prefix: String,
    pub has_list: bool,
    pub has_create: bool,
    pub has_update: bool,
    pub has_delete: bool,
    pub has_detail: bool,
    pub has_pagination: bool,
    pub fields: Vec<FieldInput>,
}

impl Default for GenerationRequest {
    /// Every capability is on unless the request turns it off.
    fn default() -> Self {
        Self {
            struct_name: String::new(),
            table_name: String::new(),
            package_name: String::new(),
            app_name: String::new(),
            description: String::new(),
            api_prefix: String::new(),
            has_list: true,
            has_create: true,
            has_update: true,
            has_delete: true,
            has_detail: true,
            has_pagination: true,
            fields: Vec::new(),
        }
    }
}

/// One operator-entered field. Every attribute is optional here; the
/// builder decides what is meaningful.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldInput {
    #[serde(alias = "name")]
    pub field_name: String,
    /// Semantic tag or target type, e.g. `string`, `int64`, `time.Time`.
    #[serde(alias = "dataType")]
    pub field_type: String,
    pub column_name: String,
    /// SQL column type, used when `field_type` is empty.
    pub column_type: String,
    #[serde(alias = "description")]
    pub field_desc: String,
    pub required: bool,
    #[serde(alias = "primaryKey")]
    pub is_primary_key: bool,
    #[serde(alias = "searchable")]
    pub is_searchable: bool,
    #[serde(alias = "filterable")]
    pub is_filterable: bool,
    #[serde(alias = "sortable")]
    pub is_sortable: bool,

    pub is_relation: bool,
    #[serde(alias = "relationKind")]
    pub relation_type: String,
    #[serde(alias = "relatedEntity")]
    pub related_model: String,
    pub foreign_key: String,
    #[serde(alias = "referencedKey")]
    pub references: String,
    pub preload: bool,
    pub join_table: String,
    pub joinable: bool,
    pub join_condition: String,
    pub filter_condition: String,
}

/// Introspected table metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableInfo {
    pub table_name: String,
    pub table_comment: String,
}

/// Introspected column metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    pub column_name: String,
    pub data_type: String,
    pub comment: String,
    pub nullable: bool,
    /// `PRI` for primary-key columns.
    pub key_flag: String,
}

impl ColumnInfo {
    pub fn is_primary_key(&self) -> bool {
        self.key_flag.eq_ignore_ascii_case("PRI")
    }
}

/// Columns supplied by the model's base members; never derived as fields.
const BASE_COLUMNS: [&str; 3] = ["created_at", "updated_at", "deleted_at"];

/// What a single violation is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    MissingStructName,
    InvalidIdentifier,
    MissingTableName,
    InvalidTableName,
    InvalidPackageName,
    InvalidColumnName,
    NoFields,
    MissingFieldName,
    DuplicateField,
    DuplicateColumn,
    MissingDataType,
    MissingPrimaryKey,
    DuplicatePrimaryKey,
    RelationPrimaryKey,
    MissingRelatedEntity,
    UnknownRelationKind,
    JoinTableNotAllowed,
    MissingJoinTable,
    JoinableCollection,
    InvalidApiPrefix,
}

/// A single violated rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub kind: ViolationKind,
    /// The struct or field the violation is about.
    pub context: String,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.context, self.message)
    }
}

/// Every violation found in one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(transparent)]
#[error("{} validation violation(s): {}", .0.len(), join_messages(.0))]
pub struct Violations(pub Vec<Violation>);

fn join_messages(list: &[Violation]) -> String {
    list.iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl Violations {
    pub fn contains(&self, kind: ViolationKind) -> bool {
        self.0.iter().any(|v| v.kind == kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Violation> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Default)]
struct Collector(Vec<Violation>);

impl Collector {
    fn push(&mut self, kind: ViolationKind, context: &str, message: impl Into<String>) {
        self.0.push(Violation {
            kind,
            context: context.to_string(),
            message: message.into(),
        });
    }
}

enum RelationKind {
    BelongsTo,
    HasOne,
    HasMany,
    ManyToMany,
}

impl RelationKind {
    fn parse(raw: &str) -> Option<Self> {
        let normalized: String = raw
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "belongsto" => Some(RelationKind::BelongsTo),
            "hasone" => Some(RelationKind::HasOne),
            "hasmany" => Some(RelationKind::HasMany),
            "manytomany" | "many2many" => Some(RelationKind::ManyToMany),
            _ => None,
        }
    }
}

/// Converts requests into entity models.
pub struct EntityBuilder;

impl EntityBuilder {
    /// Validate `request`, merging in introspected `columns` when given.
    pub fn build(
        request: &GenerationRequest,
        columns: Option<&[ColumnInfo]>,
    ) -> Result<EntityModel, Violations> {
        let mut errors = Collector::default();
        let struct_name = request.struct_name.trim().to_string();

        if struct_name.is_empty() {
            errors.push(
                ViolationKind::MissingStructName,
                "entity",
                "struct name is required",
            );
        } else if !naming::is_type_identifier(&struct_name) {
            errors.push(
                ViolationKind::InvalidIdentifier,
                &struct_name,
                "struct name must be an UpperCamel identifier",
            );
        }
        let context = if struct_name.is_empty() {
            "entity".to_string()
        } else {
            struct_name.clone()
        };

        let table_name = match request.table_name.trim() {
            "" if struct_name.is_empty() => {
                errors.push(
                    ViolationKind::MissingTableName,
                    &context,
                    "table name is required when it cannot be derived from the struct name",
                );
                String::new()
            }
            "" => naming::table_name_for(&struct_name),
            explicit => explicit.to_string(),
        };
        if !table_name.is_empty() && !is_sql_identifier(&table_name) {
            errors.push(
                ViolationKind::InvalidTableName,
                &context,
                format!("table name '{}' is not a valid SQL identifier", table_name),
            );
        }

        let api_prefix = match request.api_prefix.trim() {
            "" => naming::default_api_prefix(&struct_name),
            explicit => explicit.to_string(),
        };
        if !struct_name.is_empty() && !is_api_prefix(&api_prefix) {
            errors.push(
                ViolationKind::InvalidApiPrefix,
                &context,
                format!("api prefix '{}' is not a valid route segment", api_prefix),
            );
        }

        let fields = if request.fields.is_empty() {
            columns.map(derive_fields).unwrap_or_default()
        } else {
            request
                .fields
                .iter()
                .filter_map(|input| build_field(input, columns, &mut errors))
                .collect()
        };

        if request.fields.is_empty() && fields.is_empty() {
            errors.push(
                ViolationKind::NoFields,
                &context,
                "at least one field is required",
            );
        }

        check_uniqueness(&fields, &context, &mut errors);
        if !fields.is_empty() {
            check_primary_key(&request.fields, &fields, &context, &mut errors);
        }

        let package_name = match request.package_name.trim() {
            "" => "admin".to_string(),
            explicit => explicit.to_string(),
        };
        if !naming::is_package_name(&package_name) {
            errors.push(
                ViolationKind::InvalidPackageName,
                &context,
                format!(
                    "package name '{}' must be lowercase letters, digits and underscores",
                    package_name
                ),
            );
        }
        let app_name = match request.app_name.trim() {
            "" => package_name.clone(),
            explicit => explicit.to_string(),
        };
        if !naming::is_path_segment(&app_name) {
            errors.push(
                ViolationKind::InvalidPackageName,
                &context,
                format!("app name '{}' must be a single path segment", app_name),
            );
        }

        if !errors.0.is_empty() {
            return Err(Violations(errors.0));
        }

        Ok(EntityModel {
            struct_name,
            table_name,
            package_name,
            app_name,
            description: naming::single_line(&request.description),
            api_prefix,
            fields,
            capabilities: Capabilities {
                list: request.has_list,
                create: request.has_create,
                update: request.has_update,
                delete: request.has_delete,
                detail: request.has_detail,
                pagination: request.has_pagination,
            },
        })
    }
}

fn build_field(
    input: &FieldInput,
    columns: Option<&[ColumnInfo]>,
    errors: &mut Collector,
) -> Option<FieldSpec> {
    let name = input.field_name.trim();
    if name.is_empty() {
        errors.push(
            ViolationKind::MissingFieldName,
            "field",
            "field name is required",
        );
        return None;
    }
    if !naming::is_type_identifier(name) {
        errors.push(
            ViolationKind::InvalidIdentifier,
            name,
            "field name must be an UpperCamel identifier",
        );
    }

    let flags = FieldFlags {
        required: input.required,
        primary_key: input.is_primary_key,
        searchable: input.is_searchable,
        filterable: input.is_filterable,
        sortable: input.is_sortable,
    };

    if input.is_relation || !input.relation_type.trim().is_empty() {
        return build_relation_field(input, name, flags, errors);
    }

    if !input.join_table.trim().is_empty() {
        errors.push(
            ViolationKind::JoinTableNotAllowed,
            name,
            "join table is only meaningful on a many_to_many relation",
        );
    }

    let column_name = match input.column_name.trim() {
        "" => naming::to_snake_case(name),
        explicit => explicit.to_string(),
    };
    check_column(name, &column_name, errors);
    let column = columns.and_then(|cols| cols.iter().find(|c| c.column_name == column_name));

    let data_type = DataType::parse(&input.field_type)
        .or_else(|| DataType::parse(&input.column_type))
        .or_else(|| column.and_then(|c| DataType::parse(&c.data_type)));
    let Some(data_type) = data_type else {
        errors.push(
            ViolationKind::MissingDataType,
            name,
            format!("no data type given and no column '{}' to take it from", column_name),
        );
        return None;
    };

    let description = match naming::single_line(&input.field_desc) {
        desc if desc.is_empty() => column
            .map(|c| naming::single_line(&c.comment))
            .unwrap_or_default(),
        desc => desc,
    };

    Some(FieldSpec {
        name: name.to_string(),
        column_name,
        data_type,
        description,
        flags,
        relation: None,
    })
}

fn build_relation_field(
    input: &FieldInput,
    name: &str,
    flags: FieldFlags,
    errors: &mut Collector,
) -> Option<FieldSpec> {
    let related = input.related_model.trim();
    let related_ok = if related.is_empty() {
        errors.push(
            ViolationKind::MissingRelatedEntity,
            name,
            "relation field requires a related entity",
        );
        false
    } else if !naming::is_type_identifier(related) {
        errors.push(
            ViolationKind::InvalidIdentifier,
            name,
            format!("related entity '{}' is not an UpperCamel identifier", related),
        );
        false
    } else {
        true
    };

    let Some(kind) = RelationKind::parse(input.relation_type.trim()) else {
        errors.push(
            ViolationKind::UnknownRelationKind,
            name,
            format!(
                "unknown relation kind '{}' (expected belongs_to, has_one, has_many or many_to_many)",
                input.relation_type
            ),
        );
        return None;
    };

    let join_table = input.join_table.trim();
    let explicit = |s: &str| match s.trim() {
        "" => None,
        v => Some(v.to_string()),
    };

    let mut valid = related_ok;
    for (label, key) in [("foreign key", &input.foreign_key), ("references", &input.references)] {
        let key = key.trim();
        if !key.is_empty() && !naming::is_type_identifier(key) {
            errors.push(
                ViolationKind::InvalidIdentifier,
                name,
                format!("{} '{}' is not an UpperCamel identifier", label, key),
            );
            valid = false;
        }
    }
    match kind {
        RelationKind::ManyToMany => {
            if join_table.is_empty() {
                errors.push(
                    ViolationKind::MissingJoinTable,
                    name,
                    "many_to_many relation requires a join table",
                );
                valid = false;
            } else if !is_sql_identifier(join_table) {
                errors.push(
                    ViolationKind::InvalidTableName,
                    name,
                    format!("join table '{}' is not a valid SQL identifier", join_table),
                );
                valid = false;
            }
        }
        _ if !join_table.is_empty() => {
            errors.push(
                ViolationKind::JoinTableNotAllowed,
                name,
                "join table is only meaningful on a many_to_many relation",
            );
            valid = false;
        }
        _ => {}
    }
    if input.joinable && matches!(kind, RelationKind::HasMany | RelationKind::ManyToMany) {
        errors.push(
            ViolationKind::JoinableCollection,
            name,
            "only belongs_to and has_one relations can participate in joins",
        );
        valid = false;
    }
    if !valid {
        return None;
    }

    let owning = || OwningRelation {
        related_entity: related.to_string(),
        foreign_key: explicit(&input.foreign_key).unwrap_or_else(|| format!("{}ID", related)),
        referenced_key: explicit(&input.references).unwrap_or_else(|| "ID".to_string()),
        preload: input.preload,
        join: input.joinable.then(|| JoinSpec {
            join_condition: explicit(&input.join_condition),
            filter_condition: explicit(&input.filter_condition),
        }),
    };

    let (relation, column_name, data_type) = match kind {
        RelationKind::BelongsTo | RelationKind::HasOne => {
            let owning = owning();
            let column = match input.column_name.trim() {
                "" => naming::to_snake_case(&owning.foreign_key),
                explicit => explicit.to_string(),
            };
            check_column(name, &column, errors);
            let relation = if matches!(kind, RelationKind::BelongsTo) {
                Relation::BelongsTo(owning)
            } else {
                Relation::HasOne(owning)
            };
            (relation, column, DataType::Uint)
        }
        RelationKind::HasMany => (
            Relation::HasMany(CollectionRelation {
                related_entity: related.to_string(),
                foreign_key: explicit(&input.foreign_key),
                referenced_key: explicit(&input.references),
                preload: input.preload,
            }),
            String::new(),
            DataType::Custom(related.to_string()),
        ),
        RelationKind::ManyToMany => (
            Relation::ManyToMany(AssociationRelation {
                related_entity: related.to_string(),
                join_table: join_table.to_string(),
                foreign_key: explicit(&input.foreign_key),
                referenced_key: explicit(&input.references),
                preload: input.preload,
            }),
            String::new(),
            DataType::Custom(related.to_string()),
        ),
    };

    Some(FieldSpec {
        name: name.to_string(),
        column_name,
        data_type,
        description: naming::single_line(&input.field_desc),
        flags,
        relation: Some(relation),
    })
}

/// Derive scalar fields straight from introspected columns.
fn derive_fields(columns: &[ColumnInfo]) -> Vec<FieldSpec> {
    columns
        .iter()
        .filter(|c| !BASE_COLUMNS.contains(&c.column_name.as_str()))
        .map(|c| FieldSpec {
            name: naming::to_upper_camel(&c.column_name),
            column_name: c.column_name.clone(),
            data_type: DataType::parse(&c.data_type)
                .unwrap_or_else(|| DataType::Custom(c.data_type.clone())),
            description: naming::single_line(&c.comment),
            flags: FieldFlags {
                required: !c.nullable && !c.is_primary_key(),
                primary_key: c.is_primary_key(),
                ..FieldFlags::default()
            },
            relation: None,
        })
        .collect()
}

fn check_uniqueness(fields: &[FieldSpec], context: &str, errors: &mut Collector) {
    let mut names = HashSet::new();
    let mut columns = HashSet::new();
    for field in fields {
        if !names.insert(field.name.as_str()) {
            errors.push(
                ViolationKind::DuplicateField,
                &field.name,
                format!("field '{}' is declared more than once", field.name),
            );
        }
        // An owning relation may share its column with a declared scalar FK field.
        if field.column_name.is_empty() || field.is_relation() {
            continue;
        }
        if !columns.insert(field.column_name.as_str()) {
            errors.push(
                ViolationKind::DuplicateColumn,
                context,
                format!("column '{}' is mapped by more than one field", field.column_name),
            );
        }
    }
}

fn check_primary_key(
    inputs: &[FieldInput],
    fields: &[FieldSpec],
    context: &str,
    errors: &mut Collector,
) {
    for input in inputs.iter().filter(|i| i.is_primary_key && i.is_relation) {
        errors.push(
            ViolationKind::RelationPrimaryKey,
            input.field_name.trim(),
            "a relation field cannot be the primary key",
        );
    }
    let keys: Vec<&str> = fields
        .iter()
        .filter(|f| f.flags.primary_key && !f.is_relation())
        .map(|f| f.name.as_str())
        .collect();
    match keys.len() {
        0 => errors.push(
            ViolationKind::MissingPrimaryKey,
            context,
            "exactly one primary-key field is required, found none",
        ),
        1 => {}
        _ => errors.push(
            ViolationKind::DuplicatePrimaryKey,
            context,
            format!(
                "exactly one primary-key field is required, found {}: {}",
                keys.len(),
                keys.join(", ")
            ),
        ),
    }
}

fn check_column(field: &str, column: &str, errors: &mut Collector) {
    if !is_sql_identifier(column) {
        errors.push(
            ViolationKind::InvalidColumnName,
            field,
            format!("column '{}' is not a valid SQL identifier", column),
        );
    }
}

fn is_sql_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_api_prefix(s: &str) -> bool {
    let segment = naming::route_segment(s);
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '/'))
        && !segment.contains("//")
}
