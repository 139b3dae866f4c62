/// Route registration emitter
///
/// Emits no file of its own: the registration is a keyed section of the
/// shared route registry, keyed by the api prefix and owned by the struct.

use super::*;
use crate::section::{SharedTarget, ROUTES_ANCHOR};

pub struct RouteEmitter;

impl Emitter for RouteEmitter {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Routes
    }

    fn language(&self) -> &str {
        "go-gin-routes"
    }

    fn emit(&self, entity: &EntityModel, opts: &EmitOptions) -> Result<Emission, EmitError> {
        Ok(Emission {
            files: Vec::new(),
            sections: vec![SectionEdit {
                target: SharedTarget::RouteRegistry,
                key: route_key(entity),
                owner: entity.struct_name.clone(),
                body: route_block(entity, opts),
            }],
        })
    }
}

/// Section key of an entity's route block.
pub fn route_key(entity: &EntityModel) -> String {
    entity.route_segment().to_string()
}

fn route_block(entity: &EntityModel, opts: &EmitOptions) -> String {
    let caps = &entity.capabilities;
    let var = entity.var_name();
    let mut routes = Vec::new();
    if caps.list {
        routes.push(("GET", "/list", controller::list_handler(entity)));
    }
    if caps.detail {
        routes.push(("GET", "/detail/:id", controller::detail_handler(entity)));
    }
    if caps.create {
        routes.push(("POST", "/create", controller::create_handler(entity)));
    }
    if caps.update {
        routes.push(("PUT", "/update", controller::update_handler(entity)));
    }
    if caps.delete {
        routes.push(("DELETE", "/delete/:id", controller::delete_handler(entity)));
    }

    let mut output = go_comment(&format!("{} routes", entity.label()));
    if routes.is_empty() {
        return output;
    }
    output.push_str(&format!(
        "{}Controller := controllers.New{}()\n",
        var,
        controller::controller_type(entity)
    ));
    output.push_str(&format!(
        "{}Group := {}.Group(\"/{}\")\n",
        var,
        opts.router_group,
        entity.route_segment()
    ));
    output.push_str("{\n");
    for (method, path, handler) in routes {
        output.push_str(&format!(
            "\t{}Group.{}(\"{}\", {}Controller.{})\n",
            var, method, path, var, handler
        ));
    }
    output.push_str("}\n");
    output
}

/// Content of a fresh route registry for `package_name`.
pub fn registry_skeleton(package_name: &str, opts: &EmitOptions) -> String {
    let mut output = String::from(
        "// Code generated by crudgen. Blocks between crudgen markers are managed by the generator.\n\npackage routes\n",
    );
    output.push_str(&format!(
        "\nimport (\n\t\"github.com/gin-gonic/gin\"\n\n\t\"{}/apps/{}/controllers\"\n)\n",
        opts.module_path, package_name
    ));
    output.push_str(&format!(
        "\n// Register mounts the generated {} routes.\nfunc Register({} *gin.RouterGroup) {{\n\t{}\n}}\n",
        package_name, opts.router_group, ROUTES_ANCHOR
    ));
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::fixtures;
    use crate::section::{SectionDocument, Upsert};

    fn edit(entity: &EntityModel) -> SectionEdit {
        let mut emission = RouteEmitter.emit(entity, &EmitOptions::default()).unwrap();
        assert!(emission.files.is_empty());
        emission.sections.remove(0)
    }

    #[test]
    fn block_registers_every_enabled_handler() {
        let edit = edit(&fixtures::product());
        assert_eq!(edit.target, SharedTarget::RouteRegistry);
        assert_eq!(edit.key, "product");
        assert_eq!(edit.owner, "Product");
        assert!(edit.body.contains("productGroup := privateRoutes.Group(\"/product\")"));
        assert!(edit.body.contains("\tproductGroup.GET(\"/list\", productController.GetProducts)"));
        assert!(edit.body.contains("\tproductGroup.DELETE(\"/delete/:id\", productController.DeleteProduct)"));
    }

    #[test]
    fn disabled_capabilities_are_not_routed() {
        let mut entity = fixtures::product();
        entity.capabilities.update = false;
        let body = edit(&entity).body;
        assert!(!body.contains("/update"));

        entity.capabilities = crate::entity::Capabilities {
            list: false,
            create: false,
            update: false,
            delete: false,
            detail: false,
            pagination: false,
        };
        assert_eq!(edit(&entity).body, "// Product management routes\n");
    }

    #[test]
    fn label_cannot_add_lines_to_the_block() {
        let mut entity = fixtures::product();
        entity.description = "Products\n}\nprivateRoutes.GET(\"/x\", nil)".to_string();
        let body = edit(&entity).body;
        assert!(body.starts_with("// Products } privateRoutes.GET(\"/x\", nil) routes\n"));
        assert!(!body.contains("\nprivateRoutes.GET"));
    }

    #[test]
    fn regeneration_updates_instead_of_duplicating() {
        let entity = fixtures::product();
        let skeleton = registry_skeleton("admin", &EmitOptions::default());
        let mut doc = SectionDocument::parse(&skeleton).unwrap();
        let first = edit(&entity);
        assert_eq!(
            doc.upsert(ROUTES_ANCHOR, &first.key, &first.owner, &first.body).unwrap(),
            Upsert::Inserted
        );
        let rendered = doc.render();

        let mut again = SectionDocument::parse(&rendered).unwrap();
        let second = edit(&entity);
        assert_eq!(
            again.upsert(ROUTES_ANCHOR, &second.key, &second.owner, &second.body).unwrap(),
            Upsert::Unchanged
        );
        assert_eq!(again.render(), rendered);
        assert_eq!(rendered.matches("crudgen:begin product ").count(), 1);
        assert!(rendered.contains("\tproductController := controllers.NewProductController()\n"));
    }
}
