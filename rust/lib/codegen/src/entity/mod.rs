//! Entity model: the validated description of one generatable entity.
//!
//! Instances are only produced by [`builder::EntityBuilder`]; emitters never
//! see unvalidated input.

pub mod builder;

use serde::{Deserialize, Serialize};

use crate::naming;

/// Semantic type tag of a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Int,
    Int64,
    Uint,
    Float,
    String,
    Text,
    Bool,
    Time,
    Json,
    /// A type name passed through verbatim (e.g. `decimal.Decimal`).
    Custom(String),
}

impl DataType {
    /// Parse a semantic tag or an SQL column type.
    ///
    /// Returns `None` only for blank input. Anything unrecognized becomes
    /// [`DataType::Custom`].
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        let lower = trimmed.to_ascii_lowercase();
        if lower == "tinyint(1)" {
            return Some(DataType::Bool);
        }
        let base = lower
            .split(|c: char| c == '(' || c == ' ')
            .next()
            .unwrap_or_default();
        let ty = match base {
            "int" | "integer" | "tinyint" | "smallint" | "mediumint" | "int32" => DataType::Int,
            "int64" | "bigint" => DataType::Int64,
            "uint" | "uint32" | "uint64" | "unsigned" => DataType::Uint,
            "float" | "float32" | "float64" | "double" | "decimal" | "real" | "numeric" => {
                DataType::Float
            }
            "string" | "varchar" | "char" | "nvarchar" => DataType::String,
            "text" | "mediumtext" | "longtext" | "clob" => DataType::Text,
            "bool" | "boolean" => DataType::Bool,
            "time" | "time.time" | "date" | "datetime" | "timestamp" => DataType::Time,
            "json" | "jsonb" | "json.rawmessage" => DataType::Json,
            _ => DataType::Custom(trimmed.to_string()),
        };
        Some(ty)
    }

    /// Whether list filters on this type match by substring.
    pub fn is_textual(&self) -> bool {
        matches!(self, DataType::String | DataType::Text)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, DataType::Int | DataType::Int64 | DataType::Uint)
    }
}

/// Per-field role flags. Each one independently drives what the emitters
/// include in request shapes, list filters and sort options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldFlags {
    pub required: bool,
    pub primary_key: bool,
    pub searchable: bool,
    pub filterable: bool,
    pub sortable: bool,
}

impl FieldFlags {
    /// Whether the field contributes a list-query member.
    pub fn is_queryable(&self) -> bool {
        self.searchable || self.filterable
    }
}

/// Join participation of a single-valued relation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinSpec {
    /// Free-text join; replaces the default `fk = referenced key` join.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_condition: Option<String>,
    /// Predicate fragment applied to the `<Field>Filter` query value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_condition: Option<String>,
}

/// belongsTo / hasOne: the owning side carries the foreign-key column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwningRelation {
    pub related_entity: String,
    pub foreign_key: String,
    pub referenced_key: String,
    pub preload: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join: Option<JoinSpec>,
}

/// hasMany: the foreign key lives on the related entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionRelation {
    pub related_entity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referenced_key: Option<String>,
    pub preload: bool,
}

/// manyToMany: a collection through an association table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssociationRelation {
    pub related_entity: String,
    pub join_table: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referenced_key: Option<String>,
    pub preload: bool,
}

/// Relation descriptor. Each variant carries exactly the attributes it
/// needs; a join table on a belongsTo cannot be expressed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Relation {
    BelongsTo(OwningRelation),
    HasOne(OwningRelation),
    HasMany(CollectionRelation),
    ManyToMany(AssociationRelation),
}

impl Relation {
    pub fn related_entity(&self) -> &str {
        match self {
            Relation::BelongsTo(r) | Relation::HasOne(r) => &r.related_entity,
            Relation::HasMany(r) => &r.related_entity,
            Relation::ManyToMany(r) => &r.related_entity,
        }
    }

    pub fn preload(&self) -> bool {
        match self {
            Relation::BelongsTo(r) | Relation::HasOne(r) => r.preload,
            Relation::HasMany(r) => r.preload,
            Relation::ManyToMany(r) => r.preload,
        }
    }

    /// The owning side, for belongsTo and hasOne.
    pub fn owning(&self) -> Option<&OwningRelation> {
        match self {
            Relation::BelongsTo(r) | Relation::HasOne(r) => Some(r),
            _ => None,
        }
    }

    pub fn join(&self) -> Option<&JoinSpec> {
        self.owning().and_then(|r| r.join.as_ref())
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, Relation::HasMany(_) | Relation::ManyToMany(_))
    }

    /// Table of the related entity, derived with the same naming rule as
    /// every generated table.
    pub fn related_table(&self) -> String {
        naming::table_name_for(self.related_entity())
    }

    pub fn kind_str(&self) -> &'static str {
        match self {
            Relation::BelongsTo(_) => "belongs_to",
            Relation::HasOne(_) => "has_one",
            Relation::HasMany(_) => "has_many",
            Relation::ManyToMany(_) => "many_to_many",
        }
    }
}

/// One generatable field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    pub name: String,
    /// Column of the field. Empty for relations other than the owning side.
    pub column_name: String,
    pub data_type: DataType,
    #[serde(default)]
    pub description: String,
    pub flags: FieldFlags,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<Relation>,
}

impl FieldSpec {
    pub fn is_relation(&self) -> bool {
        self.relation.is_some()
    }

    /// JSON / form name of the field. All-caps names such as `ID` are
    /// lowercased whole.
    pub fn json_name(&self) -> String {
        if self.name.chars().all(|c| !c.is_lowercase()) {
            self.name.to_lowercase()
        } else {
            naming::to_lower_camel(&self.name)
        }
    }

    /// Description, falling back to the field name.
    pub fn label(&self) -> &str {
        if self.description.is_empty() {
            &self.name
        } else {
            &self.description
        }
    }
}

/// Which CRUD operations to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub list: bool,
    pub create: bool,
    pub update: bool,
    pub delete: bool,
    pub detail: bool,
    pub pagination: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            list: true,
            create: true,
            update: true,
            delete: true,
            detail: true,
            pagination: true,
        }
    }
}

/// A validated generatable entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityModel {
    pub struct_name: String,
    pub table_name: String,
    pub package_name: String,
    pub app_name: String,
    pub description: String,
    pub api_prefix: String,
    pub fields: Vec<FieldSpec>,
    pub capabilities: Capabilities,
}

impl EntityModel {
    /// The primary-key field. Always present on a model from
    /// [`builder::EntityBuilder`].
    pub fn primary_key(&self) -> Option<&FieldSpec> {
        self.fields
            .iter()
            .find(|f| f.flags.primary_key && !f.is_relation())
    }

    /// Whether the primary key is the conventional `ID` column supplied by
    /// the model's base columns.
    pub fn has_conventional_id(&self) -> bool {
        self.primary_key().is_some_and(|pk| pk.name == "ID")
    }

    pub fn relations(&self) -> impl Iterator<Item = (&FieldSpec, &Relation)> {
        self.fields
            .iter()
            .filter_map(|f| f.relation.as_ref().map(|r| (f, r)))
    }

    /// Relation fields eager-loaded on read, in source order.
    pub fn preloaded(&self) -> impl Iterator<Item = &FieldSpec> {
        self.relations().filter(|(_, r)| r.preload()).map(|(f, _)| f)
    }

    /// Relation fields participating in SQL joins, in source order.
    pub fn joinable(&self) -> impl Iterator<Item = (&FieldSpec, &OwningRelation, &JoinSpec)> {
        self.relations().filter_map(|(f, r)| {
            let owning = r.owning()?;
            owning.join.as_ref().map(|j| (f, owning, j))
        })
    }

    pub fn has_sortable(&self) -> bool {
        self.fields.iter().any(|f| f.flags.sortable && !f.is_relation())
    }

    /// Plural type-level name, e.g. `ProductCategories`.
    pub fn plural_name(&self) -> String {
        naming::to_plural(&self.struct_name)
    }

    /// Identifier used for generated local variables, e.g. `productCategory`.
    pub fn var_name(&self) -> String {
        naming::to_lower_camel(&self.struct_name)
    }

    pub fn file_stem(&self) -> String {
        naming::file_stem(&self.struct_name)
    }

    pub fn route_segment(&self) -> &str {
        naming::route_segment(&self.api_prefix)
    }

    /// Description, falling back to the struct name.
    pub fn label(&self) -> &str {
        if self.description.is_empty() {
            &self.struct_name
        } else {
            &self.description
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_data_types() {
        assert_eq!(DataType::parse("varchar(255)"), Some(DataType::String));
        assert_eq!(DataType::parse("tinyint(1)"), Some(DataType::Bool));
        assert_eq!(DataType::parse("tinyint"), Some(DataType::Int));
        assert_eq!(DataType::parse("BIGINT"), Some(DataType::Int64));
        assert_eq!(DataType::parse("time.Time"), Some(DataType::Time));
        assert_eq!(DataType::parse("decimal(10,2)"), Some(DataType::Float));
        assert_eq!(
            DataType::parse("decimal.Decimal"),
            Some(DataType::Custom("decimal.Decimal".into()))
        );
        assert_eq!(DataType::parse("  "), None);
    }

    #[test]
    fn relation_serde_is_tagged() {
        let rel = Relation::ManyToMany(AssociationRelation {
            related_entity: "Tag".into(),
            join_table: "product_tags".into(),
            foreign_key: None,
            referenced_key: None,
            preload: false,
        });
        let json = serde_json::to_value(&rel).unwrap();
        assert_eq!(json["kind"], "many_to_many");
        assert_eq!(json["joinTable"], "product_tags");
        let back: Relation = serde_json::from_value(json).unwrap();
        assert_eq!(back, rel);
    }

    #[test]
    fn model_without_key_has_no_primary_key() {
        let model: EntityModel = serde_json::from_value(serde_json::json!({
            "structName": "Loose",
            "tableName": "looses",
            "packageName": "admin",
            "appName": "admin",
            "description": "",
            "apiPrefix": "loose",
            "fields": [],
            "capabilities": Capabilities::default(),
        }))
        .unwrap();
        assert!(model.primary_key().is_none());
        assert!(!model.has_conventional_id());
    }

    #[test]
    fn related_table_uses_plural_rule() {
        let rel = Relation::BelongsTo(OwningRelation {
            related_entity: "Category".into(),
            foreign_key: "CategoryID".into(),
            referenced_key: "ID".into(),
            preload: true,
            join: None,
        });
        assert_eq!(rel.related_table(), "categories");
        assert!(rel.owning().is_some());
        assert!(!rel.is_collection());
    }
}
