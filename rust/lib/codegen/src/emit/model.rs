/// GORM model emitter

use super::*;
use crate::entity::Relation;

pub struct ModelEmitter;

impl Emitter for ModelEmitter {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Model
    }

    fn language(&self) -> &str {
        "go-gorm-model"
    }

    fn emit(&self, entity: &EntityModel, _opts: &EmitOptions) -> Result<Emission, EmitError> {
        primary_key(entity)?;
        Ok(Emission {
            files: vec![GeneratedFile {
                role: FileRole::Model,
                content: generate_model(entity),
            }],
            sections: Vec::new(),
        })
    }
}

fn generate_model(entity: &EntityModel) -> String {
    let base_columns = entity.has_conventional_id();
    let mut imports = Vec::new();
    if uses_type(entity, |t| *t == DataType::Json) {
        imports.push("encoding/json".to_string());
    }
    if base_columns || uses_type(entity, |t| *t == DataType::Time) {
        imports.push("time".to_string());
    }
    if base_columns {
        imports.push("gorm.io/gorm".to_string());
    }

    let mut output = go_header("models");
    output.push_str(&go_imports(&imports));
    output.push('\n');

    output.push_str(&go_comment(&format!("{} {}", entity.struct_name, entity.label())));
    output.push_str(&format!("type {} struct {{\n", entity.struct_name));

    let mut members = GoFields::default();
    if base_columns {
        members.push("ID", "uint", "gorm:\"primarykey\" json:\"id\"", "");
        members.push("CreatedAt", "time.Time", "json:\"createdAt\"", "");
        members.push("UpdatedAt", "time.Time", "json:\"updatedAt\"", "");
        members.push("DeletedAt", "gorm.DeletedAt", "gorm:\"index\" json:\"-\"", "");
    }
    for field in member_fields(entity) {
        match &field.relation {
            None => scalar_member(field, &mut members),
            Some(relation) => relation_members(entity, field, relation, &mut members),
        }
    }
    output.push_str(&members.render());
    output.push_str("}\n\n");

    output.push_str(&format!(
        "// TableName returns the table backing {}.\n",
        entity.struct_name
    ));
    output.push_str(&format!(
        "func ({}) TableName() string {{\n\treturn \"{}\"\n}}\n\n",
        entity.struct_name, entity.table_name
    ));

    let preloads: Vec<String> = entity
        .preloaded()
        .map(|f| format!("\"{}\"", f.name))
        .collect();
    output.push_str("// Preloads lists the associations eager-loaded on read.\n");
    output.push_str(&format!(
        "func ({}) Preloads() []string {{\n\treturn []string{{{}}}\n}}\n",
        entity.struct_name,
        preloads.join(", ")
    ));

    output
}

fn scalar_member(field: &FieldSpec, members: &mut GoFields) {
    let gorm = if field.flags.primary_key {
        format!("primaryKey;column:{}", field.column_name)
    } else {
        format!("column:{}", field.column_name)
    };
    members.push(
        &field.name,
        &go_type(&field.data_type),
        &format!("gorm:\"{}\" json:\"{}\"", gorm, field.json_name()),
        &field.description,
    );
}

fn relation_members(
    entity: &EntityModel,
    field: &FieldSpec,
    relation: &Relation,
    members: &mut GoFields,
) {
    let loading = if relation.preload() {
        "(eager-loaded)"
    } else {
        "(lazy)"
    };
    let note = match field.description.as_str() {
        "" => loading.to_string(),
        desc => format!("{} {}", desc, loading),
    };

    match relation {
        Relation::BelongsTo(owning) | Relation::HasOne(owning) => {
            if !declares_scalar(entity, &owning.foreign_key) {
                let ty = if field.flags.required { "uint" } else { "*uint" };
                members.push(
                    &owning.foreign_key,
                    ty,
                    &format!(
                        "gorm:\"column:{}\" json:\"{}\"",
                        field.column_name,
                        crate::naming::to_lower_camel(&owning.foreign_key)
                    ),
                    "",
                );
            }
            members.push(
                &field.name,
                &format!("*{}", owning.related_entity),
                &format!(
                    "gorm:\"foreignKey:{};references:{}\" json:\"{}\"",
                    owning.foreign_key,
                    owning.referenced_key,
                    field.json_name()
                ),
                &note,
            );
        }
        Relation::HasMany(collection) => {
            let keys = key_tags(&collection.foreign_key, &collection.referenced_key);
            members.push(
                &field.name,
                &format!("[]{}", collection.related_entity),
                &format!("{}json:\"{}\"", gorm_tag(keys), field.json_name()),
                &note,
            );
        }
        Relation::ManyToMany(association) => {
            let mut parts = vec![format!("many2many:{}", association.join_table)];
            parts.extend(key_tags(
                &association.foreign_key,
                &association.referenced_key,
            ));
            members.push(
                &field.name,
                &format!("[]{}", association.related_entity),
                &format!("{}json:\"{}\"", gorm_tag(parts), field.json_name()),
                &note,
            );
        }
    }
}

fn key_tags(foreign_key: &Option<String>, referenced_key: &Option<String>) -> Vec<String> {
    let mut parts = Vec::new();
    if let Some(fk) = foreign_key {
        parts.push(format!("foreignKey:{}", fk));
    }
    if let Some(reference) = referenced_key {
        parts.push(format!("references:{}", reference));
    }
    parts
}

fn gorm_tag(parts: Vec<String>) -> String {
    if parts.is_empty() {
        String::new()
    } else {
        format!("gorm:\"{}\" ", parts.join(";"))
    }
}
