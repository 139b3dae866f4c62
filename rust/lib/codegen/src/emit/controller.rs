/// gin controller emitter
///
/// The list handler composes its query in a fixed order: base scope,
/// preloads, joins, filters, ordering, pagination. Within each step clauses
/// follow source field order, so output is byte-for-byte reproducible.

use super::*;
use crate::entity::{JoinSpec, OwningRelation};
use crate::naming;

pub struct ControllerEmitter;

impl Emitter for ControllerEmitter {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Controller
    }

    fn language(&self) -> &str {
        "go-gin-controller"
    }

    fn emit(&self, entity: &EntityModel, opts: &EmitOptions) -> Result<Emission, EmitError> {
        let pk = primary_key(entity)?;
        check_types(entity, pk)?;
        Ok(Emission {
            files: vec![GeneratedFile {
                role: FileRole::Controller,
                content: generate_controller(entity, pk, opts),
            }],
            sections: Vec::new(),
        })
    }
}

/// Handler names, shared with the route emitter.
pub(crate) fn list_handler(entity: &EntityModel) -> String {
    format!("Get{}", entity.plural_name())
}

pub(crate) fn detail_handler(entity: &EntityModel) -> String {
    format!("Get{}", entity.struct_name)
}

pub(crate) fn create_handler(entity: &EntityModel) -> String {
    format!("Create{}", entity.struct_name)
}

pub(crate) fn update_handler(entity: &EntityModel) -> String {
    format!("Update{}", entity.struct_name)
}

pub(crate) fn delete_handler(entity: &EntityModel) -> String {
    format!("Delete{}", entity.struct_name)
}

pub(crate) fn controller_type(entity: &EntityModel) -> String {
    format!("{}Controller", entity.struct_name)
}

fn check_types(entity: &EntityModel, pk: &FieldSpec) -> Result<(), EmitError> {
    if !(pk.data_type.is_integer() || pk.data_type.is_textual()) {
        return Err(EmitError::UnsupportedType {
            field: pk.name.clone(),
            data_type: go_type(&pk.data_type).to_string(),
            usage: "as a primary key",
        });
    }
    if !entity.capabilities.list {
        return Ok(());
    }
    for field in entity.fields.iter().filter(|f| !f.is_relation()) {
        if field.flags.is_queryable()
            && matches!(field.data_type, DataType::Json | DataType::Custom(_))
        {
            return Err(EmitError::UnsupportedType {
                field: field.name.clone(),
                data_type: go_type(&field.data_type).to_string(),
                usage: "as a list filter",
            });
        }
    }
    Ok(())
}

fn generate_controller(entity: &EntityModel, pk: &FieldSpec, opts: &EmitOptions) -> String {
    let caps = &entity.capabilities;
    let any_handler = caps.list || caps.detail || caps.create || caps.update || caps.delete;
    let parses_id = (caps.detail || caps.delete) && pk.data_type.is_integer();
    let app = format!("{}/apps/{}", opts.module_path, entity.package_name);

    let mut imports = Vec::new();
    if parses_id {
        imports.push("strconv".to_string());
    }
    if any_handler {
        imports.push("github.com/gin-gonic/gin".to_string());
    }
    if caps.list || caps.detail || caps.create || caps.update {
        imports.push(format!("{}/dto", app));
    }
    if any_handler {
        imports.push(format!("{}/models", app));
        imports.push(format!("{}/core/facades", opts.module_path));
        imports.push(format!("{}/core/response", opts.module_path));
    }

    let controller = controller_type(entity);
    let mut output = go_header("controllers");
    output.push_str(&go_imports(&imports));
    output.push_str(&format!(
        "\n// {} handles {} requests.\ntype {} struct{{}}\n",
        controller,
        naming::single_line(entity.label()),
        controller
    ));
    output.push_str(&format!(
        "\n// New{} creates a {}.\nfunc New{}() *{} {{\n\treturn &{}{{}}\n}}\n",
        controller, controller, controller, controller, controller
    ));

    if caps.list {
        output.push_str(&list_handler_body(entity, opts));
    }
    if caps.detail {
        output.push_str(&detail_handler_body(entity, pk));
    }
    if caps.create {
        output.push_str(&create_handler_body(entity));
    }
    if caps.update {
        output.push_str(&update_handler_body(entity, pk));
    }
    if caps.delete {
        output.push_str(&delete_handler_body(entity, pk));
    }
    output
}

fn receiver(entity: &EntityModel) -> String {
    format!("func (c *{})", controller_type(entity))
}

fn fail(code: &str, message: &str) -> String {
    format!(
        "\t\tresponse.FailWithMsg(ctx, response.{}, {})\n\t\treturn\n",
        code, message
    )
}

/// Column of `field` qualified with the entity table.
fn qualified(entity: &EntityModel, column: &str) -> String {
    format!("{}.{}", entity.table_name, column)
}

/// Join clause of a joinable relation.
pub(crate) fn join_clause(entity: &EntityModel, field: &FieldSpec, owning: &OwningRelation, join: &JoinSpec) -> String {
    let related_table = naming::table_name_for(&owning.related_entity);
    match join.join_condition.as_deref().map(str::trim) {
        Some(condition) if !condition.is_empty() => {
            if starts_with_join(condition) {
                condition.to_string()
            } else {
                format!("LEFT JOIN {} ON {}", related_table, condition)
            }
        }
        _ => format!(
            "LEFT JOIN {} ON {} = {}.{}",
            related_table,
            qualified(entity, &field.column_name),
            related_table,
            naming::to_snake_case(&owning.referenced_key)
        ),
    }
}

fn starts_with_join(condition: &str) -> bool {
    let upper = condition.to_ascii_uppercase();
    ["JOIN ", "LEFT ", "RIGHT ", "INNER ", "OUTER ", "CROSS ", "FULL "]
        .iter()
        .any(|prefix| upper.starts_with(prefix))
}

/// Predicate applied to the `<Field>Filter` value.
pub(crate) fn filter_predicate(owning: &OwningRelation, join: &JoinSpec) -> String {
    match join.filter_condition.as_deref().map(str::trim) {
        Some(condition) if condition.contains('?') => condition.to_string(),
        Some(condition) if !condition.is_empty() => format!("{} = ?", condition),
        _ => format!("{}.name = ?", naming::table_name_for(&owning.related_entity)),
    }
}

fn list_handler_body(entity: &EntityModel, opts: &EmitOptions) -> String {
    let name = &entity.struct_name;
    let mut output = format!(
        "\n// {} lists {}.\n{} {}(ctx *gin.Context) {{\n",
        list_handler(entity),
        naming::single_line(entity.label()),
        receiver(entity),
        list_handler(entity)
    );
    output.push_str(&format!("\tvar params dto.{}QueryParams\n", name));
    output.push_str("\tif err := ctx.ShouldBindQuery(&params); err != nil {\n");
    output.push_str(&fail("ParamsValidError", "err.Error()"));
    output.push_str("\t}\n\n");

    // Base scope.
    output.push_str(&format!(
        "\tquery := facades.DB().Model(&models.{}{{}})\n",
        name
    ));

    for field in entity.preloaded() {
        output.push_str(&format!("\tquery = query.Preload({})\n", quoted(&field.name)));
    }

    for (field, owning, join) in entity.joinable() {
        output.push_str(&format!(
            "\tquery = query.Joins({})\n",
            quoted(&join_clause(entity, field, owning, join))
        ));
    }

    for field in entity.fields.iter() {
        output.push_str(&filter_clauses(entity, field));
    }

    let sortable: Vec<&FieldSpec> = entity
        .fields
        .iter()
        .filter(|f| f.flags.sortable && !f.is_relation())
        .collect();
    if !sortable.is_empty() {
        let entries: Vec<String> = sortable
            .iter()
            .map(|f| {
                format!(
                    "{}: {}",
                    quoted(&f.json_name()),
                    quoted(&qualified(entity, &f.column_name))
                )
            })
            .collect();
        output.push_str(&format!(
            "\tsortColumns := map[string]string{{{}}}\n",
            entries.join(", ")
        ));
        output.push_str("\tif column, ok := sortColumns[params.SortBy]; ok {\n");
        output.push_str("\t\tdirection := \"ASC\"\n");
        output.push_str("\t\tif params.SortOrder == \"desc\" {\n\t\t\tdirection = \"DESC\"\n\t\t}\n");
        output.push_str("\t\tquery = query.Order(column + \" \" + direction)\n");
        output.push_str("\t}\n");
    }

    output.push_str("\n\tvar total int64\n");
    output.push_str("\tif err := query.Count(&total).Error; err != nil {\n");
    output.push_str(&fail("SystemError", "err.Error()"));
    output.push_str("\t}\n");

    if entity.capabilities.pagination {
        output.push_str("\n\tpage := params.Page\n");
        output.push_str("\tif page <= 0 {\n\t\tpage = 1\n\t}\n");
        output.push_str("\tpageSize := params.PageSize\n");
        output.push_str(&format!(
            "\tif pageSize <= 0 {{\n\t\tpageSize = {}\n\t}}\n",
            opts.default_page_size
        ));
        output.push_str(&format!(
            "\tif pageSize > {} {{\n\t\tpageSize = {}\n\t}}\n",
            opts.max_page_size, opts.max_page_size
        ));
        output.push_str("\tquery = query.Offset((page - 1) * pageSize).Limit(pageSize)\n");
    }

    output.push_str(&format!("\n\tvar items []*models.{}\n", name));
    output.push_str("\tif err := query.Find(&items).Error; err != nil {\n");
    output.push_str(&fail("SystemError", "err.Error()"));
    output.push_str("\t}\n\n");

    output.push_str(&format!(
        "\tresult := &dto.{}ListResponse{{\n\t\tTotal: total,\n\t\tList:  make([]*dto.{}Response, len(items)),\n\t}}\n",
        name, name
    ));
    output.push_str("\tfor i, item := range items {\n");
    output.push_str(&format!("\t\tresp := &dto.{}Response{{}}\n", name));
    output.push_str("\t\tresponse.Copy(resp, item)\n");
    output.push_str("\t\tresult.List[i] = resp\n");
    output.push_str("\t}\n");
    output.push_str("\tresponse.OkWithData(ctx, result)\n}\n");
    output
}

fn filter_clauses(entity: &EntityModel, field: &FieldSpec) -> String {
    if !field.flags.is_queryable() {
        return String::new();
    }
    let Some(relation) = &field.relation else {
        let column = qualified(entity, &field.column_name);
        return if field.data_type.is_textual() {
            format!(
                "\tif params.{} != nil {{\n\t\tquery = query.Where({}, \"%\"+*params.{}+\"%\")\n\t}}\n",
                field.name,
                quoted(&format!("{} LIKE ?", column)),
                field.name
            )
        } else {
            format!(
                "\tif params.{} != nil {{\n\t\tquery = query.Where({}, *params.{})\n\t}}\n",
                field.name,
                quoted(&format!("{} = ?", column)),
                field.name
            )
        };
    };

    let Some(owning) = relation.owning() else {
        return String::new();
    };
    let mut output = String::new();
    if !declares_scalar(entity, &owning.foreign_key) {
        output.push_str(&format!(
            "\tif params.{} != nil {{\n\t\tquery = query.Where({}, *params.{})\n\t}}\n",
            owning.foreign_key,
            quoted(&format!("{} = ?", qualified(entity, &field.column_name))),
            owning.foreign_key
        ));
    }
    if let (true, Some(join)) = (field.flags.filterable, &owning.join) {
        output.push_str(&format!(
            "\tif params.{}Filter != \"\" {{\n\t\tquery = query.Where({}, params.{}Filter)\n\t}}\n",
            field.name,
            quoted(&filter_predicate(owning, join)),
            field.name
        ));
    }
    output
}

/// Statements that read and parse the `id` path parameter into `id`.
fn parse_id(pk: &FieldSpec) -> String {
    let parse = match pk.data_type {
        DataType::Uint => Some("strconv.ParseUint(ctx.Param(\"id\"), 10, 64)"),
        DataType::Int | DataType::Int64 => Some("strconv.ParseInt(ctx.Param(\"id\"), 10, 64)"),
        _ => None,
    };
    match parse {
        Some(parse) => {
            let mut output = format!("\tid, err := {}\n", parse);
            output.push_str("\tif err != nil {\n");
            output.push_str(&fail("ParamsValidError", "\"invalid id\""));
            output.push_str("\t}\n");
            output
        }
        None => {
            let mut output = String::from("\tid := ctx.Param(\"id\")\n");
            output.push_str("\tif id == \"\" {\n");
            output.push_str(&fail("ParamsValidError", "\"invalid id\""));
            output.push_str("\t}\n");
            output
        }
    }
}

fn pk_predicate(entity: &EntityModel, pk: &FieldSpec) -> String {
    quoted(&format!("{} = ?", qualified(entity, &pk.column_name)))
}

fn detail_handler_body(entity: &EntityModel, pk: &FieldSpec) -> String {
    let name = &entity.struct_name;
    let mut output = format!(
        "\n// {} returns one {}.\n{} {}(ctx *gin.Context) {{\n",
        detail_handler(entity),
        naming::single_line(entity.label()),
        receiver(entity),
        detail_handler(entity)
    );
    output.push_str(&parse_id(pk));
    output.push_str("\n\tquery := facades.DB()\n");
    for field in entity.preloaded() {
        output.push_str(&format!("\tquery = query.Preload({})\n", quoted(&field.name)));
    }
    output.push_str(&format!("\tvar item models.{}\n", name));
    output.push_str(&format!(
        "\tif err := query.First(&item, {}, id).Error; err != nil {{\n",
        pk_predicate(entity, pk)
    ));
    output.push_str(&fail("ParamsValidError", "err.Error()"));
    output.push_str("\t}\n\n");
    output.push_str(&format!("\tresp := &dto.{}Response{{}}\n", name));
    output.push_str("\tresponse.Copy(resp, &item)\n");
    output.push_str("\tresponse.OkWithData(ctx, resp)\n}\n");
    output
}

fn create_handler_body(entity: &EntityModel) -> String {
    let name = &entity.struct_name;
    let mut output = format!(
        "\n// {} creates a {}.\n{} {}(ctx *gin.Context) {{\n",
        create_handler(entity),
        naming::single_line(entity.label()),
        receiver(entity),
        create_handler(entity)
    );
    output.push_str(&format!("\tvar req dto.{}CreateRequest\n", name));
    output.push_str("\tif err := ctx.ShouldBindJSON(&req); err != nil {\n");
    output.push_str(&fail("ParamsValidError", "err.Error()"));
    output.push_str("\t}\n\n");
    output.push_str(&format!("\tvar item models.{}\n", name));
    output.push_str("\tresponse.Copy(&item, &req)\n");
    output.push_str("\tif err := facades.DB().Create(&item).Error; err != nil {\n");
    output.push_str(&fail("SystemError", "err.Error()"));
    output.push_str("\t}\n\n");
    output.push_str(&format!("\tresp := &dto.{}Response{{}}\n", name));
    output.push_str("\tresponse.Copy(resp, &item)\n");
    output.push_str("\tresponse.OkWithData(ctx, resp)\n}\n");
    output
}

fn update_handler_body(entity: &EntityModel, pk: &FieldSpec) -> String {
    let name = &entity.struct_name;
    let mut output = format!(
        "\n// {} updates a {}.\n{} {}(ctx *gin.Context) {{\n",
        update_handler(entity),
        naming::single_line(entity.label()),
        receiver(entity),
        update_handler(entity)
    );
    output.push_str(&format!("\tvar req dto.{}UpdateRequest\n", name));
    output.push_str("\tif err := ctx.ShouldBindJSON(&req); err != nil {\n");
    output.push_str(&fail("ParamsValidError", "err.Error()"));
    output.push_str("\t}\n\n");
    output.push_str(&format!("\tvar item models.{}\n", name));
    output.push_str(&format!(
        "\tif err := facades.DB().First(&item, {}, req.{}).Error; err != nil {{\n",
        pk_predicate(entity, pk),
        pk.name
    ));
    output.push_str(&fail("ParamsValidError", "err.Error()"));
    output.push_str("\t}\n");
    output.push_str("\tresponse.Copy(&item, &req)\n");
    output.push_str("\tif err := facades.DB().Save(&item).Error; err != nil {\n");
    output.push_str(&fail("SystemError", "err.Error()"));
    output.push_str("\t}\n\n");
    output.push_str(&format!("\tresp := &dto.{}Response{{}}\n", name));
    output.push_str("\tresponse.Copy(resp, &item)\n");
    output.push_str("\tresponse.OkWithData(ctx, resp)\n}\n");
    output
}

fn delete_handler_body(entity: &EntityModel, pk: &FieldSpec) -> String {
    let name = &entity.struct_name;
    let mut output = format!(
        "\n// {} deletes a {}.\n{} {}(ctx *gin.Context) {{\n",
        delete_handler(entity),
        naming::single_line(entity.label()),
        receiver(entity),
        delete_handler(entity)
    );
    output.push_str(&parse_id(pk));
    output.push_str(&format!(
        "\n\tresult := facades.DB().Delete(&models.{}{{}}, {}, id)\n",
        name,
        pk_predicate(entity, pk)
    ));
    output.push_str("\tif result.Error != nil {\n");
    output.push_str(&fail("SystemError", "result.Error.Error()"));
    output.push_str("\t}\n");
    output.push_str("\tif result.RowsAffected == 0 {\n");
    output.push_str(&fail("ParamsValidError", "\"record not found\""));
    output.push_str("\t}\n");
    output.push_str("\tresponse.Ok(ctx)\n}\n");
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::fixtures;

    fn render(entity: &EntityModel) -> String {
        ControllerEmitter
            .emit(entity, &EmitOptions::default())
            .unwrap()
            .files
            .remove(0)
            .content
    }

    fn list_body(code: &str) -> &str {
        let start = code.find("GetProducts(ctx *gin.Context)").unwrap();
        let end = code[start..].find("\n}\n").unwrap() + start;
        &code[start..end]
    }

    #[test]
    fn preload_and_join_for_category() {
        let entity = fixtures::build("Product", vec![fixtures::id(), fixtures::category(true)]);
        let code = render(&entity);
        let list = list_body(&code);
        assert!(list.contains("\tquery = query.Preload(\"Category\")\n"));
        assert!(list.contains(
            "\tquery = query.Joins(\"LEFT JOIN categories ON products.category_id = categories.id\")\n"
        ));
        assert!(list.contains("query = query.Where(\"categories.name = ?\", params.CategoryFilter)"));
    }

    #[test]
    fn removing_joinable_keeps_preload() {
        let entity = fixtures::build("Product", vec![fixtures::id(), fixtures::category(false)]);
        let code = render(&entity);
        let list = list_body(&code);
        assert!(list.contains("\tquery = query.Preload(\"Category\")\n"));
        assert!(!list.contains("Joins("));
        assert!(!list.contains("CategoryFilter"));
    }

    #[test]
    fn clause_order() {
        let code = render(&fixtures::product());
        let list = list_body(&code);
        let at = |needle: &str| {
            list.find(needle)
                .unwrap_or_else(|| panic!("'{}' missing from:\n{}", needle, list))
        };
        let base = at("Model(&models.Product{})");
        let preload_category = at("Preload(\"Category\")");
        let preload_tags = at("Preload(\"Tags\")");
        let join = at("Joins(");
        let name_filter = at("products.name LIKE ?");
        let price_filter = at("products.price = ?");
        let join_filter = at("params.CategoryFilter)");
        let order = at("query.Order(");
        let paging = at("query.Offset(");
        assert!(base < preload_category);
        assert!(preload_category < preload_tags);
        assert!(preload_tags < join);
        assert!(join < name_filter);
        assert!(name_filter < price_filter);
        assert!(price_filter < join_filter);
        assert!(join_filter < order);
        assert!(order < paging);
    }

    #[test]
    fn no_preload_when_none_requested() {
        let mut name = fixtures::scalar("Name", "string");
        name.is_searchable = true;
        let entity = fixtures::build("Product", vec![fixtures::id(), name]);
        let code = render(&entity);
        assert!(!code.contains("Preload("));
        assert!(!code.contains("Joins("));
    }

    #[test]
    fn pagination_defaults_and_cap() {
        let code = render(&fixtures::product());
        assert!(code.contains("\tif page <= 0 {\n\t\tpage = 1\n\t}\n"));
        assert!(code.contains("\tif pageSize <= 0 {\n\t\tpageSize = 10\n\t}\n"));
        assert!(code.contains("\tif pageSize > 100 {\n\t\tpageSize = 100\n\t}\n"));

        let opts = EmitOptions {
            default_page_size: 20,
            max_page_size: 50,
            ..EmitOptions::default()
        };
        let custom = ControllerEmitter
            .emit(&fixtures::product(), &opts)
            .unwrap()
            .files
            .remove(0)
            .content;
        assert!(custom.contains("pageSize = 20"));
        assert!(custom.contains("pageSize = 50"));

        let mut entity = fixtures::product();
        entity.capabilities.pagination = false;
        assert!(!render(&entity).contains("Offset("));
    }

    #[test]
    fn custom_join_and_filter_conditions() {
        let mut category = fixtures::category(true);
        category.join_condition = "categories.id = products.category_id AND categories.deleted_at IS NULL".into();
        category.filter_condition = "categories.slug".into();
        let entity = fixtures::build("Product", vec![fixtures::id(), category]);
        let code = render(&entity);
        assert!(code.contains(
            "Joins(\"LEFT JOIN categories ON categories.id = products.category_id AND categories.deleted_at IS NULL\")"
        ));
        assert!(code.contains("Where(\"categories.slug = ?\", params.CategoryFilter)"));

        let mut verbatim = fixtures::category(true);
        verbatim.join_condition = "INNER JOIN categories c ON c.id = products.category_id".into();
        verbatim.filter_condition = "c.title LIKE ?".into();
        let entity = fixtures::build("Product", vec![fixtures::id(), verbatim]);
        let code = render(&entity);
        assert!(code.contains("Joins(\"INNER JOIN categories c ON c.id = products.category_id\")"));
        assert!(code.contains("Where(\"c.title LIKE ?\", params.CategoryFilter)"));
    }

    #[test]
    fn handlers_follow_capabilities() {
        let mut entity = fixtures::product();
        let code = render(&entity);
        for handler in ["GetProducts(", "GetProduct(", "CreateProduct(", "UpdateProduct(", "DeleteProduct("] {
            assert!(code.contains(handler), "{} missing", handler);
        }
        assert!(code.contains("strconv.ParseUint(ctx.Param(\"id\"), 10, 64)"));

        entity.capabilities.delete = false;
        entity.capabilities.detail = false;
        let code = render(&entity);
        assert!(!code.contains("DeleteProduct("));
        assert!(!code.contains("\"strconv\""));
    }

    #[test]
    fn unsupported_types_fail() {
        let mut price = fixtures::scalar("Price", "decimal.Decimal");
        price.is_filterable = true;
        let entity = fixtures::build("Product", vec![fixtures::id(), price]);
        let err = ControllerEmitter
            .emit(&entity, &EmitOptions::default())
            .err()
            .unwrap();
        assert!(matches!(err, EmitError::UnsupportedType { usage: "as a list filter", .. }));

        let mut key = fixtures::scalar("Key", "float64");
        key.is_primary_key = true;
        let entity = fixtures::build("Reading", vec![key]);
        assert!(ControllerEmitter.emit(&entity, &EmitOptions::default()).is_err());
    }

    #[test]
    fn handler_docs_stay_on_one_line() {
        let mut entity = fixtures::product();
        entity.description = "Products\n}\nfunc Evil() {".to_string();
        let code = render(&entity);
        assert!(code.contains("// DeleteProduct deletes a Products } func Evil() {.\n"));
        assert!(!code.contains("\nfunc Evil"));
    }

    #[test]
    fn keyless_model_is_rejected() {
        let mut entity = fixtures::product();
        entity.fields.retain(|f| !f.flags.primary_key);
        assert!(matches!(
            ControllerEmitter.emit(&entity, &EmitOptions::default()),
            Err(EmitError::Invalid(_))
        ));
    }

    #[test]
    fn output_is_deterministic() {
        let entity = fixtures::product();
        assert_eq!(render(&entity), render(&entity));
    }
}
