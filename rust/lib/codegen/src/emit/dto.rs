/// Request/response DTO emitter

use super::*;
use crate::entity::Relation;
use crate::naming;

pub struct DtoEmitter;

impl Emitter for DtoEmitter {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Dto
    }

    fn language(&self) -> &str {
        "go-dto"
    }

    fn emit(&self, entity: &EntityModel, _opts: &EmitOptions) -> Result<Emission, EmitError> {
        let pk = primary_key(entity)?;
        Ok(Emission {
            files: vec![GeneratedFile {
                role: FileRole::Dto,
                content: generate_dto(entity, pk),
            }],
            sections: Vec::new(),
        })
    }
}

fn generate_dto(entity: &EntityModel, pk: &FieldSpec) -> String {
    let name = &entity.struct_name;
    let caps = &entity.capabilities;

    let mut imports = Vec::new();
    if uses_type(entity, |t| *t == DataType::Json) {
        imports.push("encoding/json".to_string());
    }
    if entity.has_conventional_id() || uses_type(entity, |t| *t == DataType::Time) {
        imports.push("time".to_string());
    }

    let mut output = go_header("dto");
    output.push_str(&go_imports(&imports));

    if caps.create {
        let mut members = GoFields::default();
        for field in entity.fields.iter().filter(|f| !f.flags.primary_key) {
            create_member(entity, field, &mut members);
        }
        output.push_str(&go_struct(
            &format!("{}CreateRequest creates a {}.", name, entity.label()),
            &format!("{}CreateRequest", name),
            &members,
        ));
    }

    if caps.update {
        let mut members = GoFields::default();
        members.push(
            &pk.name,
            &go_type(&pk.data_type),
            &format!("json:\"{}\" binding:\"required\"", pk.json_name()),
            "",
        );
        for field in entity.fields.iter().filter(|f| !f.flags.primary_key) {
            update_member(entity, field, &mut members);
        }
        output.push_str(&go_struct(
            &format!("{}UpdateRequest updates a {}.", name, entity.label()),
            &format!("{}UpdateRequest", name),
            &members,
        ));
    }

    if caps.list {
        let mut members = GoFields::default();
        if caps.pagination {
            members.push("Page", "int", "form:\"page\"", "");
            members.push("PageSize", "int", "form:\"pageSize\"", "");
        }
        for field in entity.fields.iter() {
            query_members(entity, field, &mut members);
        }
        if entity.has_sortable() {
            members.push("SortBy", "string", "form:\"sortBy\"", "");
            members.push("SortOrder", "string", "form:\"sortOrder\"", "");
        }
        output.push_str(&go_struct(
            &format!("{}QueryParams filters the {} list.", name, entity.label()),
            &format!("{}QueryParams", name),
            &members,
        ));
    }

    let mut members = GoFields::default();
    if entity.has_conventional_id() {
        members.push("ID", "uint", "json:\"id\"", "");
        members.push("CreatedAt", "time.Time", "json:\"createdAt\"", "");
        members.push("UpdatedAt", "time.Time", "json:\"updatedAt\"", "");
    }
    for field in member_fields(entity) {
        response_members(entity, field, &mut members);
    }
    output.push_str(&go_struct(
        &format!("{}Response is the read shape of a {}.", name, entity.label()),
        &format!("{}Response", name),
        &members,
    ));

    if caps.list {
        let mut members = GoFields::default();
        members.push("Total", "int64", "json:\"total\"", "");
        members.push("List", &format!("[]*{}Response", name), "json:\"list\"", "");
        output.push_str(&go_struct(
            &format!("{}ListResponse is one page of {}.", name, entity.plural_name()),
            &format!("{}ListResponse", name),
            &members,
        ));
    }

    output
}

fn go_struct(doc: &str, type_name: &str, members: &GoFields) -> String {
    format!(
        "\n{}type {} struct {{\n{}}}\n",
        go_comment(doc),
        type_name,
        members.render()
    )
}

/// Owning foreign key surfaced as a plain member, unless already declared.
fn owning_key<'a>(entity: &EntityModel, field: &'a FieldSpec) -> Option<&'a str> {
    let owning = field.relation.as_ref()?.owning()?;
    if declares_scalar(entity, &owning.foreign_key) {
        None
    } else {
        Some(&owning.foreign_key)
    }
}

fn create_member(entity: &EntityModel, field: &FieldSpec, members: &mut GoFields) {
    let binding = if field.flags.required {
        " binding:\"required\""
    } else {
        ""
    };
    match &field.relation {
        None => members.push(
            &field.name,
            &go_type(&field.data_type),
            &format!("json:\"{}\"{}", field.json_name(), binding),
            &field.description,
        ),
        Some(_) => {
            if let Some(fk) = owning_key(entity, field) {
                members.push(
                    fk,
                    if field.flags.required { "uint" } else { "*uint" },
                    &format!("json:\"{}\"{}", naming::to_lower_camel(fk), binding),
                    "",
                );
            }
        }
    }
}

fn update_member(entity: &EntityModel, field: &FieldSpec, members: &mut GoFields) {
    match &field.relation {
        None => members.push(
            &field.name,
            &format!("*{}", go_type(&field.data_type)),
            &format!("json:\"{}\"", field.json_name()),
            &field.description,
        ),
        Some(_) => {
            if let Some(fk) = owning_key(entity, field) {
                members.push(
                    fk,
                    "*uint",
                    &format!("json:\"{}\"", naming::to_lower_camel(fk)),
                    "",
                );
            }
        }
    }
}

fn query_members(entity: &EntityModel, field: &FieldSpec, members: &mut GoFields) {
    if !field.flags.is_queryable() {
        return;
    }
    let Some(relation) = &field.relation else {
        members.push(
            &field.name,
            &format!("*{}", go_type(&field.data_type)),
            &format!("form:\"{}\"", field.json_name()),
            "",
        );
        return;
    };
    let Some(owning) = relation.owning() else {
        return;
    };
    if let Some(fk) = owning_key(entity, field) {
        members.push(
            fk,
            "*uint",
            &format!("form:\"{}\"", naming::to_lower_camel(fk)),
            "",
        );
    }
    if field.flags.filterable && owning.join.is_some() {
        members.push(
            &format!("{}Filter", field.name),
            "string",
            &format!("form:\"{}Filter\"", field.json_name()),
            "",
        );
    }
}

fn response_members(entity: &EntityModel, field: &FieldSpec, members: &mut GoFields) {
    let Some(relation) = &field.relation else {
        members.push(
            &field.name,
            &go_type(&field.data_type),
            &format!("json:\"{}\"", field.json_name()),
            &field.description,
        );
        return;
    };

    if let Some(fk) = owning_key(entity, field) {
        members.push(
            fk,
            if field.flags.required { "uint" } else { "*uint" },
            &format!("json:\"{}\"", naming::to_lower_camel(fk)),
            "",
        );
    }
    if relation.preload() {
        let related = relation.related_entity();
        let ty = match relation {
            Relation::BelongsTo(_) | Relation::HasOne(_) => format!("*{}Response", related),
            Relation::HasMany(_) | Relation::ManyToMany(_) => format!("[]*{}Response", related),
        };
        members.push(
            &field.name,
            &ty,
            &format!("json:\"{},omitempty\"", field.json_name()),
            "",
        );
    }
}
