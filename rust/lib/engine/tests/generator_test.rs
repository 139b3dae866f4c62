/// Integration tests for generation runs and rollback against a real
/// filesystem workspace.

use std::path::Path;
use std::sync::Arc;

use crudgen_codegen::{ArtifactKind, GenerationRequest};
use crudgen_engine::*;
use crudgen_history::{HistoryStore, MemoryHistory};
use crudgen_schema::{SchemaCatalog, SqliteCatalog};

const MODEL: &str = "server/apps/admin/models/e2ETest.go";
const DTO: &str = "server/apps/admin/dto/e2ETest.go";
const CONTROLLER: &str = "server/apps/admin/controllers/e2ETest_controller.go";
const CLIENT: &str = "front-end/src/service/api/e2ETest.ts";
const VIEW: &str = "front-end/src/views/admin/e2ETest/index.vue";
const MODAL: &str = "front-end/src/views/admin/e2ETest/components/TableModal.vue";
const ROUTES: &str = "server/apps/admin/routes/routes.go";
const MENU: &str = "front-end/src/router/routes.inner.ts";

struct Fixture {
    _dir: tempfile::TempDir,
    workspace: Arc<FsWorkspace>,
    history: Arc<MemoryHistory>,
    generator: Generator,
}

fn fixture() -> Fixture {
    fixture_with(|config| config)
}

fn fixture_with(adjust: impl FnOnce(GeneratorConfig) -> GeneratorConfig) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let config = adjust(GeneratorConfig {
        root: dir.path().to_path_buf(),
        ..Default::default()
    });
    let workspace = Arc::new(FsWorkspace::new(dir.path()).with_trash(config.trash_dir()));
    let history = Arc::new(MemoryHistory::new());
    let generator = Generator::new(config, workspace.clone(), history.clone());
    Fixture {
        _dir: dir,
        workspace,
        history,
        generator,
    }
}

fn read(f: &Fixture, path: &str) -> Option<String> {
    f.workspace.read(path).unwrap()
}

fn e2e_request() -> GenerationRequest {
    serde_json::from_value(serde_json::json!({
        "structName": "E2ETest",
        "description": "E2E test",
        "fields": [
            {"fieldName": "ID", "fieldType": "uint", "isPrimaryKey": true},
            {"fieldName": "Title", "fieldType": "string", "required": true, "isSearchable": true},
            {"fieldName": "Score", "fieldType": "int", "isFilterable": true, "isSortable": true}
        ]
    }))
    .unwrap()
}

fn request_for(struct_name: &str, table_name: &str) -> GenerationRequest {
    let mut request = e2e_request();
    request.struct_name = struct_name.to_string();
    request.table_name = table_name.to_string();
    request
}

fn files_only() -> RollbackFlags {
    RollbackFlags {
        delete_files: true,
        ..Default::default()
    }
}

#[test]
fn generate_writes_artifacts_and_records_manifest() {
    let f = fixture();
    let record = f.generator.generate(&e2e_request()).unwrap();

    for path in [MODEL, DTO, CONTROLLER, CLIENT, VIEW, MODAL] {
        assert!(read(&f, path).is_some(), "{} missing", path);
    }
    let manifest = &record.manifest;
    assert!(!manifest.partial);
    assert_eq!(manifest.table_name, "e2_etests");
    assert_eq!(manifest.file_count(), 6);
    assert_eq!(manifest.files[&ArtifactKind::Model], [MODEL]);
    assert_eq!(manifest.files[&ArtifactKind::Client], [CLIENT, VIEW, MODAL]);
    assert!(!manifest.files.contains_key(&ArtifactKind::Routes));
    assert_eq!(manifest.sections.len(), 2);
    assert_eq!(manifest.sections[0].path, ROUTES);
    assert_eq!(manifest.sections[1].key, "admin/e2ETest");

    let routes = read(&f, ROUTES).unwrap();
    assert!(routes.contains("// crudgen:begin e2ETest E2ETest"));
    assert!(routes.contains("privateRoutes.Group(\"/e2ETest\")"));
    assert!(routes.contains("// crudgen:routes"));
    let menu = read(&f, MENU).unwrap();
    assert!(menu.contains("// crudgen:begin admin/e2ETest E2ETest"));

    let stored = f.generator.history_record(record.id).unwrap();
    assert_eq!(stored, record);
}

#[test]
fn regeneration_is_byte_identical() {
    let f = fixture();
    f.generator.generate(&e2e_request()).unwrap();
    let first: Vec<_> = [MODEL, DTO, CONTROLLER, CLIENT, VIEW, MODAL, ROUTES, MENU]
        .iter()
        .map(|p| read(&f, p))
        .collect();

    f.generator.generate(&e2e_request()).unwrap();
    let second: Vec<_> = [MODEL, DTO, CONTROLLER, CLIENT, VIEW, MODAL, ROUTES, MENU]
        .iter()
        .map(|p| read(&f, p))
        .collect();
    assert_eq!(first, second);

    let routes = read(&f, ROUTES).unwrap();
    assert_eq!(routes.matches("// crudgen:begin e2ETest").count(), 1);
    assert_eq!(f.generator.history(1, 10).unwrap().total, 2);
}

#[test]
fn two_entities_share_the_route_registry() {
    let f = fixture();
    f.generator.generate(&e2e_request()).unwrap();
    f.generator
        .generate(&request_for("ProductCategory", ""))
        .unwrap();

    let routes = read(&f, ROUTES).unwrap();
    let e2e = routes.find("crudgen:begin e2ETest").unwrap();
    let category = routes.find("crudgen:begin productCategory").unwrap();
    let anchor = routes.find("// crudgen:routes").unwrap();
    assert!(e2e < category && category < anchor);
}

#[test]
fn files_only_rollback_keeps_route_block() {
    let f = fixture();
    let record = f.generator.generate(&e2e_request()).unwrap();

    let report = f.generator.rollback(record.id, &files_only()).unwrap();
    assert_eq!(report.removed_files, [MODEL, DTO, CONTROLLER, CLIENT, VIEW, MODAL]);
    assert!(report.removed_sections.is_empty());
    for path in [MODEL, DTO, CONTROLLER, CLIENT, VIEW, MODAL] {
        assert!(read(&f, path).is_none(), "{} still present", path);
    }
    assert!(read(&f, ROUTES).unwrap().contains("// crudgen:begin e2ETest E2ETest"));
    assert!(read(&f, MENU).unwrap().contains("admin/e2ETest"));

    let stored = f.generator.history_record(record.id).unwrap();
    assert!(stored.rolled_back_at.is_some());
}

#[test]
fn rollback_with_no_flags_is_a_successful_noop() {
    let f = fixture();
    let record = f.generator.generate(&e2e_request()).unwrap();
    let routes_before = read(&f, ROUTES);

    let report = f
        .generator
        .rollback(record.id, &RollbackFlags::default())
        .unwrap();
    assert!(report.is_clean());
    assert!(report.removed_files.is_empty());
    assert!(report.removed_sections.is_empty());
    assert!(read(&f, MODEL).is_some());
    assert_eq!(read(&f, ROUTES), routes_before);
    assert!(f
        .generator
        .history_record(record.id)
        .unwrap()
        .rolled_back_at
        .is_none());
}

#[test]
fn api_and_menu_rollback_removes_only_sections() {
    let f = fixture();
    let record = f.generator.generate(&e2e_request()).unwrap();
    let flags = RollbackFlags {
        delete_api: true,
        delete_menu: true,
        ..Default::default()
    };

    let report = f.generator.rollback(record.id, &flags).unwrap();
    assert_eq!(report.removed_sections.len(), 2);
    assert!(read(&f, MODEL).is_some());
    let routes = read(&f, ROUTES).unwrap();
    assert!(!routes.contains("e2ETest"));
    assert!(routes.contains("// crudgen:routes"));
    assert!(!read(&f, MENU).unwrap().contains("e2ETest"));

    // A second pass has nothing left to remove and says so per section.
    match f.generator.rollback(record.id, &flags) {
        Err(GenError::Rollback(report)) => {
            assert_eq!(report.failures.len(), 2);
            assert_eq!(report.failures[0].category, RollbackCategory::Api);
            assert_eq!(report.failures[1].category, RollbackCategory::Menu);
        }
        other => panic!("expected rollback failure, got {:?}", other),
    }
}

#[test]
fn rollback_reports_missing_files_and_continues() {
    let f = fixture();
    let record = f.generator.generate(&e2e_request()).unwrap();
    f.workspace.remove(DTO).unwrap();

    let flags = RollbackFlags {
        delete_files: true,
        delete_api: true,
        ..Default::default()
    };
    let err = f.generator.rollback(record.id, &flags).unwrap_err();
    assert_eq!(err.error_code(), "ROLLBACK_INCOMPLETE");
    let GenError::Rollback(report) = err else {
        unreachable!()
    };
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].target, DTO);
    assert_eq!(report.removed_files.len(), 5);
    assert_eq!(report.removed_sections.len(), 1);
}

#[test]
fn emission_failure_records_partial_manifest() {
    let f = fixture();
    let mut request = e2e_request();
    request.fields.push(
        serde_json::from_value(serde_json::json!({
            "fieldName": "Budget",
            "fieldType": "Money",
            "isFilterable": true
        }))
        .unwrap(),
    );

    let (artifact, manifest_id, message) = match f.generator.generate(&request) {
        Err(GenError::Emission {
            artifact,
            manifest_id,
            message,
        }) => (artifact, manifest_id, message),
        other => panic!("expected emission error, got {:?}", other),
    };
    assert_eq!(artifact, ArtifactKind::Controller);
    assert!(message.contains("Budget"));

    assert!(read(&f, MODEL).is_some());
    assert!(read(&f, DTO).is_some());
    assert!(read(&f, CONTROLLER).is_none());
    assert!(read(&f, ROUTES).is_none());

    let record = f.generator.history_record(manifest_id).unwrap();
    assert!(record.manifest.partial);
    assert_eq!(record.manifest.all_files().collect::<Vec<_>>(), [MODEL, DTO]);
    assert!(record.manifest.sections.is_empty());
    let failure = record.manifest.failure.unwrap();
    assert_eq!(failure.artifact, ArtifactKind::Controller);
}

#[test]
fn validation_failure_writes_nothing() {
    let f = fixture();
    let mut request = e2e_request();
    request.struct_name = String::new();
    request.fields.clear();

    match f.generator.generate(&request) {
        Err(GenError::Validation(violations)) => assert!(violations.len() >= 2),
        other => panic!("expected validation error, got {:?}", other),
    }
    assert!(read(&f, ROUTES).is_none());
    assert_eq!(f.history.list(1, 10).unwrap().1, 0);
}

#[test]
fn generation_in_flight_blocks_same_name() {
    let f = fixture();
    let record = f.generator.generate(&e2e_request()).unwrap();

    let token = f.generator.locks().acquire("E2ETest").unwrap();
    assert!(matches!(
        f.generator.generate(&e2e_request()),
        Err(GenError::Busy(_))
    ));
    assert!(matches!(
        f.generator.rollback(record.id, &files_only()),
        Err(GenError::Busy(_))
    ));
    assert!(f
        .generator
        .generate(&request_for("Other", "others"))
        .is_ok());

    drop(token);
    assert!(f.generator.rollback(record.id, &files_only()).is_ok());
}

#[test]
fn table_owned_by_another_entity_is_a_conflict() {
    let f = fixture();
    let record = f.generator.generate(&e2e_request()).unwrap();

    let err = f
        .generator
        .generate(&request_for("Intruder", "e2_etests"))
        .unwrap_err();
    assert_eq!(err.error_code(), "CONFLICT");
    assert!(read(&f, "server/apps/admin/models/intruder.go").is_none());
    assert_eq!(f.generator.history(1, 10).unwrap().total, 1);

    f.generator.rollback(record.id, &files_only()).unwrap();
    assert!(f
        .generator
        .generate(&request_for("Intruder", "e2_etests"))
        .is_ok());
}

#[test]
fn route_key_owned_by_another_entity_is_a_conflict() {
    let f = fixture();
    f.workspace
        .write(
            ROUTES,
            "func Register(r *gin.RouterGroup) {\n\
             \t// crudgen:begin e2ETest Legacy\n\
             \t// Legacy routes\n\
             \t// crudgen:end e2ETest\n\
             \t// crudgen:routes\n\
             }\n",
        )
        .unwrap();

    match f.generator.generate(&e2e_request()) {
        Err(GenError::Conflict(message)) => assert!(message.contains("Legacy")),
        other => panic!("expected conflict, got {:?}", other),
    }
    assert!(read(&f, MODEL).is_none());
}

#[test]
fn reserved_route_key_is_a_conflict_before_anything_is_written() {
    let f = fixture();
    let claim = f
        .generator
        .locks()
        .reserve(ROUTES, "e2ETest", "Other")
        .unwrap();

    match f.generator.generate(&e2e_request()) {
        Err(GenError::Conflict(message)) => assert!(message.contains("Other")),
        other => panic!("expected conflict, got {:?}", other),
    }
    assert!(read(&f, MODEL).is_none());
    assert!(read(&f, ROUTES).is_none());
    assert_eq!(f.history.list(1, 10).unwrap().1, 0);

    drop(claim);
    f.generator.generate(&e2e_request()).unwrap();
    // The run's own claims are released when it ends.
    assert!(f.generator.locks().reserve(ROUTES, "e2ETest", "Other").is_ok());
}

#[test]
fn changed_prefix_replaces_the_old_route_block() {
    let f = fixture();
    let mut request = request_for("Product", "products");
    request.api_prefix = "product".to_string();
    f.generator.generate(&request).unwrap();
    f.generator.generate(&e2e_request()).unwrap();

    request.api_prefix = "products".to_string();
    let record = f.generator.generate(&request).unwrap();
    assert_eq!(record.manifest.sections[0].key, "products");

    let routes = read(&f, ROUTES).unwrap();
    assert_eq!(routes.matches("productController :=").count(), 1);
    assert!(routes.contains("// crudgen:begin products Product"));
    assert!(!routes.contains("// crudgen:begin product Product"));
    assert!(routes.contains("// crudgen:begin e2ETest E2ETest"));
}

#[test]
fn rollback_leaves_a_section_taken_over_by_another_entity() {
    let f = fixture();
    let mut product = request_for("Product", "products");
    product.api_prefix = "items".to_string();
    let product_record = f.generator.generate(&product).unwrap();
    let api_only = RollbackFlags {
        delete_api: true,
        ..Default::default()
    };
    f.generator.rollback(product_record.id, &api_only).unwrap();

    let mut item = request_for("Item", "items");
    item.api_prefix = "items".to_string();
    f.generator.generate(&item).unwrap();

    match f.generator.rollback(product_record.id, &api_only) {
        Err(GenError::Rollback(report)) => {
            assert_eq!(report.failures.len(), 1);
            assert_eq!(report.failures[0].target, "items");
            assert!(report.failures[0].message.contains("now owned by 'Item'"));
            assert!(report.removed_sections.is_empty());
        }
        other => panic!("expected rollback failure, got {:?}", other),
    }
    let routes = read(&f, ROUTES).unwrap();
    assert!(routes.contains("// crudgen:begin items Item"));
    assert!(routes.contains("itemController := controllers.NewItemController()"));
}

#[test]
fn table_drop_requires_exact_confirmation() {
    let catalog = Arc::new(SqliteCatalog::open_in_memory().unwrap());
    catalog
        .execute_batch("CREATE TABLE e2_etests (id INTEGER PRIMARY KEY, title TEXT);")
        .unwrap();
    let f = fixture();
    let generator = Generator::new(
        f.generator.config().clone(),
        f.workspace.clone(),
        f.history.clone(),
    )
    .with_catalog(catalog.clone());
    let record = generator.generate(&e2e_request()).unwrap();

    let mut flags = RollbackFlags {
        delete_table: true,
        confirm_table: Some("e2e_tests".into()),
        ..Default::default()
    };
    let err = generator.rollback(record.id, &flags).unwrap_err();
    let GenError::Rollback(report) = err else {
        panic!("expected rollback failure");
    };
    assert_eq!(report.failures[0].category, RollbackCategory::Table);
    assert_eq!(catalog.list_tables().unwrap().len(), 1);

    flags.confirm_table = Some("e2_etests".into());
    let report = generator.rollback(record.id, &flags).unwrap();
    assert_eq!(report.dropped_table.as_deref(), Some("e2_etests"));
    assert!(catalog.list_tables().unwrap().is_empty());
}

#[test]
fn fields_are_derived_from_table_columns() {
    let catalog = Arc::new(SqliteCatalog::open_in_memory().unwrap());
    catalog
        .execute_batch(
            "CREATE TABLE products (
                id INTEGER PRIMARY KEY,
                name VARCHAR(128) NOT NULL,
                price DECIMAL(10,2),
                created_at DATETIME
            );",
        )
        .unwrap();
    let f = fixture();
    let generator = Generator::new(
        f.generator.config().clone(),
        f.workspace.clone(),
        f.history.clone(),
    )
    .with_catalog(catalog);

    let request: GenerationRequest =
        serde_json::from_value(serde_json::json!({"structName": "Product"})).unwrap();
    let record = generator.generate(&request).unwrap();
    let names: Vec<_> = record
        .manifest
        .fields
        .iter()
        .map(|f| f.name.as_str())
        .collect();
    assert_eq!(names, ["ID", "Name", "Price"]);
    let model = read(&f, "server/apps/admin/models/product.go").unwrap();
    assert!(model.contains("func (Product) TableName() string"));
}

#[test]
fn history_pages_and_deletion() {
    let f = fixture();
    let first = f.generator.generate(&e2e_request()).unwrap();
    let second = f.generator.generate(&request_for("Tag", "")).unwrap();

    let page = f.generator.history(1, 1).unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.page_size, 1);
    assert_eq!(page.list[0].id, second.id);
    assert_eq!(page.list[0].file_count, 6);

    f.generator.delete_history(first.id).unwrap();
    assert!(read(&f, MODEL).is_some());
    assert_eq!(f.generator.history(1, 10).unwrap().total, 1);
    assert_eq!(
        f.generator.delete_history(first.id).unwrap_err().error_code(),
        "NOT_FOUND"
    );
}

#[test]
fn rolled_back_files_go_to_trash_when_configured() {
    let f = fixture_with(|config| GeneratorConfig {
        rollback: RollbackConfig {
            trash_dir: Some(".trash".into()),
        },
        ..config
    });
    let record = f.generator.generate(&e2e_request()).unwrap();
    f.generator.rollback(record.id, &files_only()).unwrap();
    assert!(read(&f, MODEL).is_none());

    let trash = f.generator.config().root.join(".trash");
    let batch = std::fs::read_dir(&trash)
        .unwrap()
        .next()
        .unwrap()
        .unwrap()
        .path();
    assert!(Path::new(&batch.join(MODEL)).is_file());
}
