/// TypeScript client, Vue list view and menu entry emitter

use super::*;
use crate::naming;
use crate::section::SharedTarget;

pub struct ClientEmitter;

impl Emitter for ClientEmitter {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Client
    }

    fn language(&self) -> &str {
        "typescript-vue"
    }

    fn emit(&self, entity: &EntityModel, opts: &EmitOptions) -> Result<Emission, EmitError> {
        let pk = primary_key(entity)?;
        let caps = &entity.capabilities;
        let mut files = vec![GeneratedFile {
            role: FileRole::ClientApi,
            content: generate_api(entity, pk, opts),
        }];
        let mut sections = Vec::new();
        if caps.list {
            let with_modal = caps.create || caps.update;
            files.push(GeneratedFile {
                role: FileRole::View,
                content: generate_view(entity, pk, opts, with_modal),
            });
            if with_modal {
                files.push(GeneratedFile {
                    role: FileRole::ViewModal,
                    content: generate_modal(entity, pk),
                });
            }
            sections.push(SectionEdit {
                target: SharedTarget::Menu,
                key: menu_key(entity),
                owner: entity.struct_name.clone(),
                body: menu_entry(entity),
            });
        }
        Ok(Emission { files, sections })
    }
}

/// Section key of an entity's menu entry.
pub fn menu_key(entity: &EntityModel) -> String {
    format!("{}/{}", entity.app_name, entity.file_stem())
}

/// Content of a fresh menu file.
pub fn menu_skeleton() -> String {
    format!(
        "// Menu entries between crudgen markers are managed by the generator.\nexport const generatedRoutes = [\n  {}\n]\n",
        crate::section::MENU_ANCHOR
    )
}

fn ts_member(field: &FieldSpec) -> String {
    ts_type(&field.data_type).to_string()
}

fn generate_api(entity: &EntityModel, pk: &FieldSpec, opts: &EmitOptions) -> String {
    let name = &entity.struct_name;
    let caps = &entity.capabilities;
    let base = format!(
        "{}/{}",
        opts.api_base.trim_end_matches('/'),
        entity.route_segment()
    );
    let id_type = ts_type(&pk.data_type);

    let mut output = String::from("// Code generated by crudgen. DO NOT EDIT.\nimport { http } from '../http';\n");

    output.push_str(&format!("\nexport interface {}Response {{\n", name));
    if entity.has_conventional_id() {
        output.push_str("  id: number;\n  createdAt: string;\n  updatedAt: string;\n");
    }
    for field in member_fields(entity) {
        match &field.relation {
            None => output.push_str(&format!("  {}: {};\n", field.json_name(), ts_member(field))),
            Some(relation) => {
                if let Some(owning) = relation.owning() {
                    if !declares_scalar(entity, &owning.foreign_key) {
                        output.push_str(&format!(
                            "  {}?: number | null;\n",
                            naming::to_lower_camel(&owning.foreign_key)
                        ));
                    }
                }
                if relation.preload() {
                    let shape = if relation.is_collection() {
                        "Record<string, unknown>[]"
                    } else {
                        "Record<string, unknown>"
                    };
                    output.push_str(&format!("  {}?: {};\n", field.json_name(), shape));
                }
            }
        }
    }
    output.push_str("}\n");

    if caps.list {
        output.push_str(&format!("\nexport interface {}QueryParams {{\n", name));
        if caps.pagination {
            output.push_str("  page?: number;\n  pageSize?: number;\n");
        }
        for field in entity.fields.iter().filter(|f| f.flags.is_queryable()) {
            match field.relation.as_ref().and_then(|r| r.owning()) {
                None if field.is_relation() => {}
                None => output.push_str(&format!("  {}?: {};\n", field.json_name(), ts_member(field))),
                Some(owning) => {
                    if !declares_scalar(entity, &owning.foreign_key) {
                        output.push_str(&format!(
                            "  {}?: number;\n",
                            naming::to_lower_camel(&owning.foreign_key)
                        ));
                    }
                    if field.flags.filterable && owning.join.is_some() {
                        output.push_str(&format!("  {}Filter?: string;\n", field.json_name()));
                    }
                }
            }
        }
        if entity.has_sortable() {
            output.push_str("  sortBy?: string;\n  sortOrder?: 'asc' | 'desc';\n");
        }
        output.push_str("}\n");

        output.push_str(&format!(
            "\nexport interface {}ListResponse {{\n  total: number;\n  list: {}Response[];\n}}\n",
            name, name
        ));
        output.push_str(&format!(
            "\nexport const get{} = (params: {}QueryParams) => {{\n  return http.request<{}ListResponse>({{\n    url: '{}/list',\n    method: 'GET',\n    params,\n  }});\n}};\n",
            entity.plural_name(),
            name,
            name,
            base
        ));
    }
    if caps.detail {
        output.push_str(&format!(
            "\nexport const get{} = (id: {}) => {{\n  return http.request<{}Response>({{\n    url: '{}/detail/' + id,\n    method: 'GET',\n  }});\n}};\n",
            name, id_type, name, base
        ));
    }
    if caps.create {
        output.push_str(&format!(
            "\nexport const create{} = (data: Partial<{}Response>) => {{\n  return http.request<{}Response>({{\n    url: '{}/create',\n    method: 'POST',\n    data,\n  }});\n}};\n",
            name, name, name, base
        ));
    }
    if caps.update {
        output.push_str(&format!(
            "\nexport const update{} = (data: Partial<{}Response>) => {{\n  return http.request<{}Response>({{\n    url: '{}/update',\n    method: 'PUT',\n    data,\n  }});\n}};\n",
            name, name, name, base
        ));
    }
    if caps.delete {
        output.push_str(&format!(
            "\nexport const delete{} = (id: {}) => {{\n  return http.request<void>({{\n    url: '{}/delete/' + id,\n    method: 'DELETE',\n  }});\n}};\n",
            name, id_type, base
        ));
    }
    output
}

/// A string literal that is also safe inside an SFC `<script>` block.
fn ts_quoted(s: &str) -> String {
    quoted(s).replace('<', "\\u003c")
}

/// Input control rendered for one form or search item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Text,
    TextArea,
    Number,
    Switch,
    Select,
    DateTime,
}

struct FormItem {
    key: String,
    label: String,
    control: Control,
    required: bool,
}

impl FormItem {
    fn initial(&self) -> &'static str {
        match self.control {
            Control::Text | Control::TextArea => "''",
            Control::Switch => "false",
            Control::Number | Control::Select | Control::DateTime => "null",
        }
    }

    fn input(&self, model: &str) -> String {
        let binding = format!("{}.{}", model, self.key);
        match self.control {
            Control::Text => format!("<n-input v-model:value=\"{}\" clearable />", binding),
            Control::TextArea => {
                format!("<n-input v-model:value=\"{}\" type=\"textarea\" />", binding)
            }
            Control::Number => format!(
                "<n-input-number v-model:value=\"{}\" clearable style=\"width: 100%\" />",
                binding
            ),
            Control::Switch => format!("<n-switch v-model:value=\"{}\" />", binding),
            Control::Select => format!(
                "<n-select v-model:value=\"{}\" :options=\"booleanOptions\" clearable style=\"width: 120px\" />",
                binding
            ),
            Control::DateTime => format!(
                "<n-date-picker v-model:formatted-value=\"{}\" type=\"datetime\" value-format=\"yyyy-MM-dd'T'HH:mm:ssXXX\" clearable />",
                binding
            ),
        }
    }
}

fn scalar_control(data_type: &DataType) -> Option<Control> {
    match data_type {
        DataType::String => Some(Control::Text),
        DataType::Text => Some(Control::TextArea),
        DataType::Int | DataType::Int64 | DataType::Uint | DataType::Float => Some(Control::Number),
        DataType::Bool => Some(Control::Switch),
        DataType::Time => Some(Control::DateTime),
        DataType::Json | DataType::Custom(_) => None,
    }
}

/// Editable members of the create/edit form: scalars and owning foreign keys.
fn form_items(entity: &EntityModel) -> Vec<FormItem> {
    let mut items = Vec::new();
    for field in entity.fields.iter().filter(|f| !f.flags.primary_key) {
        match &field.relation {
            None => {
                if let Some(control) = scalar_control(&field.data_type) {
                    items.push(FormItem {
                        key: field.json_name(),
                        label: field.label().to_string(),
                        control,
                        required: field.flags.required,
                    });
                }
            }
            Some(relation) => {
                let Some(owning) = relation.owning() else {
                    continue;
                };
                if !declares_scalar(entity, &owning.foreign_key) {
                    items.push(FormItem {
                        key: naming::to_lower_camel(&owning.foreign_key),
                        label: field.label().to_string(),
                        control: Control::Number,
                        required: field.flags.required,
                    });
                }
            }
        }
    }
    items
}

/// Filters offered above the table: queryable scalars and join filters.
fn search_items(entity: &EntityModel) -> Vec<FormItem> {
    let mut items = Vec::new();
    for field in entity.fields.iter().filter(|f| f.flags.is_queryable()) {
        match &field.relation {
            None => {
                let control = match scalar_control(&field.data_type) {
                    Some(Control::Switch) => Control::Select,
                    Some(Control::TextArea) => Control::Text,
                    Some(control) => control,
                    None => continue,
                };
                items.push(FormItem {
                    key: field.json_name(),
                    label: field.label().to_string(),
                    control,
                    required: false,
                });
            }
            Some(relation) => {
                let joined = relation.owning().is_some_and(|o| o.join.is_some());
                if field.flags.filterable && joined {
                    items.push(FormItem {
                        key: format!("{}Filter", field.json_name()),
                        label: field.label().to_string(),
                        control: Control::Text,
                        required: false,
                    });
                }
            }
        }
    }
    items
}

fn labels_const(items: &[FormItem]) -> String {
    let mut output = String::from("const labels = {\n");
    for item in items {
        output.push_str(&format!("  {}: {},\n", item.key, ts_quoted(&item.label)));
    }
    output.push_str("};\n");
    output
}

fn page_sizes(opts: &EmitOptions) -> String {
    let mut sizes: Vec<u32> = [10, 20, 50, 100]
        .into_iter()
        .filter(|size| *size <= opts.max_page_size)
        .collect();
    sizes.push(opts.default_page_size);
    sizes.sort_unstable();
    sizes.dedup();
    let sizes: Vec<String> = sizes.iter().map(u32::to_string).collect();
    sizes.join(", ")
}

fn generate_view(entity: &EntityModel, pk: &FieldSpec, opts: &EmitOptions, with_modal: bool) -> String {
    let name = &entity.struct_name;
    let plural = entity.plural_name();
    let caps = &entity.capabilities;
    let search = search_items(entity);
    let can_add = with_modal && caps.create;
    let can_edit = with_modal && caps.update;
    let has_actions = can_edit || caps.delete;

    let mut output = String::from("<!-- Code generated by crudgen. DO NOT EDIT. -->\n<template>\n");
    output.push_str("  <n-card :title=\"pageTitle\" :bordered=\"false\">\n");
    if can_add {
        output.push_str("    <template #header-extra>\n");
        output.push_str("      <n-button type=\"primary\" @click=\"handleAdd\">Add</n-button>\n");
        output.push_str("    </template>\n");
    }
    if !search.is_empty() {
        output.push_str("    <n-form inline :model=\"searchForm\" label-placement=\"left\">\n");
        for item in &search {
            output.push_str(&format!(
                "      <n-form-item :label=\"labels.{}\" path=\"{}\">\n        {}\n      </n-form-item>\n",
                item.key,
                item.key,
                item.input("searchForm")
            ));
        }
        output.push_str("      <n-form-item>\n        <n-space>\n");
        output.push_str("          <n-button type=\"primary\" @click=\"handleSearch\">Search</n-button>\n");
        output.push_str("          <n-button @click=\"handleReset\">Reset</n-button>\n");
        output.push_str("        </n-space>\n      </n-form-item>\n    </n-form>\n");
    }
    output.push_str("    <n-data-table\n      remote\n      :loading=\"loading\"\n      :columns=\"columns\"\n      :data=\"rows\"\n");
    if caps.pagination {
        output.push_str("      :pagination=\"pagination\"\n      @update:page=\"handlePageChange\"\n      @update:page-size=\"handlePageSizeChange\"\n");
    }
    output.push_str("    />\n");
    if with_modal {
        output.push_str("    <TableModal\n      ref=\"modalRef\"\n      :title=\"modalTitle\"\n      :loading=\"modalLoading\"\n      :mode=\"modalMode\"\n      @submit=\"handleModalSubmit\"\n    />\n");
    }
    output.push_str("  </n-card>\n</template>\n\n");

    // Script.
    output.push_str("<script setup lang=\"ts\">\n");
    let vue_imports = if has_actions {
        "h, onMounted, reactive, ref"
    } else {
        "onMounted, reactive, ref"
    };
    output.push_str(&format!("import {{ {} }} from 'vue';\n", vue_imports));
    let mut naive = Vec::new();
    if has_actions {
        naive.extend(["NButton", "NSpace"]);
    }
    if caps.delete {
        naive.push("useDialog");
    }
    naive.extend(["useMessage", "type DataTableColumns"]);
    output.push_str(&format!("import {{ {} }} from 'naive-ui';\n", naive.join(", ")));
    if with_modal {
        output.push_str("import TableModal from './components/TableModal.vue';\n");
    }
    let mut api = vec![format!("get{}", plural)];
    if can_add {
        api.push(format!("create{}", name));
    }
    if caps.delete {
        api.push(format!("delete{}", name));
    }
    if can_edit {
        api.push(format!("update{}", name));
    }
    api.push(format!("type {}QueryParams", name));
    api.push(format!("type {}Response", name));
    output.push_str(&format!(
        "import {{ {} }} from '@/service/api/{}';\n\n",
        api.join(", "),
        entity.file_stem()
    ));

    output.push_str(&format!("const pageTitle = {};\n", ts_quoted(entity.label())));
    if !search.is_empty() {
        output.push_str(&labels_const(&search));
    }
    if search.iter().any(|item| item.control == Control::Select) {
        output.push_str("const booleanOptions = [\n  { label: 'Yes', value: true },\n  { label: 'No', value: false },\n];\n");
    }
    output.push('\n');

    output.push_str("const message = useMessage();\n");
    if caps.delete {
        output.push_str("const dialog = useDialog();\n");
    }
    output.push_str("const loading = ref(false);\n");
    output.push_str(&format!("const rows = ref<{}Response[]>([]);\n", name));
    output.push_str(&format!(
        "const pagination = reactive({{\n  page: 1,\n  pageSize: {},\n  itemCount: 0,\n  showSizePicker: true,\n  pageSizes: [{}],\n}});\n",
        opts.default_page_size,
        page_sizes(opts)
    ));
    output.push_str("const searchForm = reactive<Record<string, any>>(emptySearch());\n");
    if with_modal {
        output.push_str("const modalRef = ref<InstanceType<typeof TableModal> | null>(null);\n");
        output.push_str("const modalLoading = ref(false);\n");
        output.push_str("const modalTitle = ref('');\n");
        output.push_str("const modalMode = ref<'add' | 'edit'>('add');\n");
    }
    output.push('\n');

    output.push_str(&format!("const columns: DataTableColumns<{}Response> = [\n", name));
    for field in member_fields(entity).filter(|f| !f.is_relation()) {
        output.push_str(&format!(
            "  {{ title: {}, key: {} }},\n",
            ts_quoted(field.label()),
            quoted(&field.json_name())
        ));
    }
    if has_actions {
        output.push_str("  {\n    title: 'Actions',\n    key: 'actions',\n    width: 160,\n    render: (row) =>\n      h(NSpace, null, {\n        default: () => [\n");
        if can_edit {
            output.push_str("          h(NButton, { size: 'small', type: 'primary', text: true, onClick: () => handleEdit(row) }, { default: () => 'Edit' }),\n");
        }
        if caps.delete {
            output.push_str("          h(NButton, { size: 'small', type: 'error', text: true, onClick: () => handleDelete(row) }, { default: () => 'Delete' }),\n");
        }
        output.push_str("        ],\n      }),\n  },\n");
    }
    output.push_str("];\n\n");

    output.push_str("function emptySearch(): Record<string, any> {\n  return {\n");
    for item in &search {
        output.push_str(&format!("    {}: null,\n", item.key));
    }
    output.push_str("  };\n}\n\n");

    output.push_str(&format!("function queryParams(): {}QueryParams {{\n", name));
    output.push_str("  const params: Record<string, unknown> = {};\n");
    output.push_str("  for (const [key, value] of Object.entries(searchForm)) {\n");
    output.push_str("    if (value !== null && value !== '') {\n      params[key] = value;\n    }\n  }\n");
    if caps.pagination {
        output.push_str("  params.page = pagination.page;\n  params.pageSize = pagination.pageSize;\n");
    }
    output.push_str(&format!("  return params as {}QueryParams;\n}}\n\n", name));

    output.push_str("async function load() {\n  loading.value = true;\n  try {\n");
    output.push_str(&format!("    const res = await get{}(queryParams());\n", plural));
    output.push_str("    rows.value = res.list;\n    pagination.itemCount = res.total;\n");
    output.push_str("  } catch {\n    message.error('Failed to load data');\n");
    output.push_str("  } finally {\n    loading.value = false;\n  }\n}\n\n");

    output.push_str("function handleSearch() {\n  pagination.page = 1;\n  load();\n}\n\n");
    output.push_str("function handleReset() {\n  Object.assign(searchForm, emptySearch());\n  handleSearch();\n}\n\n");
    if caps.pagination {
        output.push_str("function handlePageChange(page: number) {\n  pagination.page = page;\n  load();\n}\n\n");
        output.push_str("function handlePageSizeChange(pageSize: number) {\n  pagination.pageSize = pageSize;\n  pagination.page = 1;\n  load();\n}\n\n");
    }
    if can_add {
        output.push_str("function handleAdd() {\n  modalTitle.value = 'Add ' + pageTitle;\n  modalMode.value = 'add';\n  modalRef.value?.openModal();\n}\n\n");
    }
    if can_edit {
        output.push_str(&format!(
            "function handleEdit(row: {}Response) {{\n  modalTitle.value = 'Edit ' + pageTitle;\n  modalMode.value = 'edit';\n  modalRef.value?.openModal(row);\n}}\n\n",
            name
        ));
    }
    if caps.delete {
        output.push_str(&format!("function handleDelete(row: {}Response) {{\n", name));
        output.push_str("  dialog.warning({\n    title: 'Delete',\n    content: 'Delete this record?',\n    positiveText: 'Delete',\n    negativeText: 'Cancel',\n    onPositiveClick: async () => {\n      try {\n");
        output.push_str(&format!("        await delete{}(row.{});\n", name, pk.json_name()));
        output.push_str("        message.success('Deleted');\n        load();\n      } catch {\n        message.error('Delete failed');\n      }\n    },\n  });\n}\n\n");
    }
    if with_modal {
        output.push_str("async function handleModalSubmit(data: Record<string, unknown>) {\n  modalLoading.value = true;\n  try {\n");
        match (can_add, can_edit) {
            (true, true) => {
                output.push_str(&format!(
                    "    if (modalMode.value === 'add') {{\n      await create{}(data);\n      message.success('Created');\n    }} else {{\n      await update{}(data);\n      message.success('Updated');\n    }}\n",
                    name, name
                ));
            }
            (true, false) => {
                output.push_str(&format!(
                    "    await create{}(data);\n    message.success('Created');\n",
                    name
                ));
            }
            _ => {
                output.push_str(&format!(
                    "    await update{}(data);\n    message.success('Updated');\n",
                    name
                ));
            }
        }
        output.push_str("    modalRef.value?.closeModal();\n    load();\n");
        output.push_str("  } catch {\n    message.error('Save failed');\n");
        output.push_str("  } finally {\n    modalLoading.value = false;\n  }\n}\n\n");
    }
    output.push_str("onMounted(load);\n</script>\n");
    output
}

/// Create/edit dialog driven by the list view through `openModal`.
fn generate_modal(entity: &EntityModel, pk: &FieldSpec) -> String {
    let items = form_items(entity);
    let key = pk.json_name();
    let keeps_key = entity.capabilities.update;

    let mut output = String::from("<!-- Code generated by crudgen. DO NOT EDIT. -->\n<template>\n");
    output.push_str("  <n-modal\n    v-model:show=\"visible\"\n    preset=\"card\"\n    :title=\"title\"\n    :mask-closable=\"false\"\n    style=\"width: 560px\"\n    @after-leave=\"resetForm\"\n  >\n");
    output.push_str("    <n-form\n      ref=\"formRef\"\n      :model=\"formData\"\n      :rules=\"rules\"\n      label-placement=\"left\"\n      :label-width=\"100\"\n      :disabled=\"loading\"\n    >\n");
    for item in &items {
        output.push_str(&format!(
            "      <n-form-item :label=\"labels.{}\" path=\"{}\">\n        {}\n      </n-form-item>\n",
            item.key,
            item.key,
            item.input("formData")
        ));
    }
    output.push_str("    </n-form>\n    <template #footer>\n      <n-space justify=\"end\">\n");
    output.push_str("        <n-button :disabled=\"loading\" @click=\"closeModal\">Cancel</n-button>\n");
    output.push_str("        <n-button type=\"primary\" :loading=\"loading\" @click=\"handleSubmit\">Save</n-button>\n");
    output.push_str("      </n-space>\n    </template>\n  </n-modal>\n</template>\n\n");

    output.push_str("<script setup lang=\"ts\">\n");
    output.push_str("import { reactive, ref } from 'vue';\n");
    output.push_str("import type { FormInst, FormRules } from 'naive-ui';\n\n");
    if keeps_key {
        output.push_str("const props = ");
    }
    output.push_str("withDefaults(\n  defineProps<{ title?: string; loading?: boolean; mode?: 'add' | 'edit' }>(),\n  { title: '', loading: false, mode: 'add' },\n);\n");
    output.push_str("const emit = defineEmits<{ submit: [data: Record<string, unknown>] }>();\n\n");
    output.push_str(&labels_const(&items));
    output.push('\n');

    output.push_str("const formRef = ref<FormInst | null>(null);\nconst visible = ref(false);\n\n");
    output.push_str("function initialData(): Record<string, any> {\n  return {\n");
    if keeps_key {
        output.push_str(&format!("    {}: null,\n", key));
    }
    for item in &items {
        output.push_str(&format!("    {}: {},\n", item.key, item.initial()));
    }
    output.push_str("  };\n}\n\n");
    output.push_str("const formData = reactive<Record<string, any>>(initialData());\n\n");

    output.push_str("const rules: FormRules = {\n");
    for item in items.iter().filter(|i| i.required && i.control != Control::Switch) {
        let (kind, trigger) = match item.control {
            Control::Number => (", type: 'number'", "['blur', 'change']"),
            Control::DateTime => ("", "['blur', 'change']"),
            _ => ("", "['blur', 'input']"),
        };
        output.push_str(&format!(
            "  {}: {{ required: true{}, message: labels.{} + ' is required', trigger: {} }},\n",
            item.key, kind, item.key, trigger
        ));
    }
    output.push_str("};\n\n");

    output.push_str("function resetForm() {\n  formRef.value?.restoreValidation();\n  Object.assign(formData, initialData());\n}\n\n");
    output.push_str("function openModal(row?: object) {\n  resetForm();\n  if (row) {\n    const source = row as Record<string, unknown>;\n");
    output.push_str("    for (const key of Object.keys(formData)) {\n      if (source[key] !== undefined) {\n        formData[key] = source[key];\n      }\n    }\n  }\n  visible.value = true;\n}\n\n");
    output.push_str("function closeModal() {\n  visible.value = false;\n}\n\n");
    output.push_str("function handleSubmit() {\n  formRef.value?.validate((errors) => {\n    if (errors) {\n      return;\n    }\n");
    output.push_str("    const data: Record<string, unknown> = { ...formData };\n");
    if keeps_key {
        output.push_str(&format!("    if (props.mode === 'add') {{\n      delete data.{};\n    }}\n", key));
    }
    output.push_str("    emit('submit', data);\n  });\n}\n\n");
    output.push_str("defineExpose({ openModal, closeModal });\n</script>\n");
    output
}

fn menu_entry(entity: &EntityModel) -> String {
    let path = format!("/{}/{}", entity.app_name, entity.file_stem());
    let mut output = String::from("{\n");
    output.push_str(&format!(
        "  name: {},\n",
        quoted(&format!("{}_{}", entity.app_name, entity.file_stem()))
    ));
    output.push_str(&format!("  path: {},\n", quoted(&path)));
    output.push_str(&format!(
        "  componentPath: {},\n",
        quoted(&format!("{}/index.vue", path))
    ));
    output.push_str(&format!(
        "  meta: {{ title: {}, icon: 'icon-park-outline:list' }},\n",
        quoted(entity.label())
    ));
    output.push_str("},\n");
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::fixtures;

    #[test]
    fn api_view_and_menu() {
        let emission = ClientEmitter
            .emit(&fixtures::product(), &EmitOptions::default())
            .unwrap();
        let roles: Vec<FileRole> = emission.files.iter().map(|f| f.role).collect();
        assert_eq!(roles, [FileRole::ClientApi, FileRole::View, FileRole::ViewModal]);

        let api = &emission.files[0].content;
        assert!(api.contains("export const getProducts = (params: ProductQueryParams)"));
        assert!(api.contains("url: '/api/product/list'"));
        assert!(api.contains("url: '/api/product/detail/' + id"));
        assert!(api.contains("  categoryFilter?: string;\n"));
        assert!(api.contains("  name: string;\n"));

        let view = &emission.files[1].content;
        assert!(view.contains(
            "import { getProducts, createProduct, deleteProduct, updateProduct, \
             type ProductQueryParams, type ProductResponse } from '@/service/api/product';"
        ));
        assert!(view.contains("{ title: \"Name\", key: \"name\" },"));

        assert_eq!(emission.sections.len(), 1);
        let menu = &emission.sections[0];
        assert_eq!(menu.target, SharedTarget::Menu);
        assert_eq!(menu.key, "admin/product");
        assert!(menu.body.contains("path: \"/admin/product\""));
    }

    #[test]
    fn view_wires_search_and_row_actions() {
        let emission = ClientEmitter
            .emit(&fixtures::product(), &EmitOptions::default())
            .unwrap();
        let view = &emission.files[1].content;
        assert!(view.contains("<n-input v-model:value=\"searchForm.name\" clearable />"));
        assert!(view.contains("<n-select v-model:value=\"searchForm.onSale\" :options=\"booleanOptions\""));
        assert!(view.contains("path=\"categoryFilter\""));
        assert!(view.contains("@click=\"handleAdd\""));
        assert!(view.contains("onClick: () => handleEdit(row)"));
        assert!(view.contains("await deleteProduct(row.id);"));
        assert!(view.contains("await createProduct(data);"));
        assert!(view.contains("await updateProduct(data);"));
        assert!(view.contains("import TableModal from './components/TableModal.vue';"));
        assert!(view.contains("pageSizes: [10, 20, 50, 100],"));
        assert!(view.contains("@update:page-size=\"handlePageSizeChange\""));
    }

    #[test]
    fn modal_form_covers_editable_fields() {
        let emission = ClientEmitter
            .emit(&fixtures::product(), &EmitOptions::default())
            .unwrap();
        let modal = &emission.files[2].content;
        assert!(modal.contains("<n-input v-model:value=\"formData.name\" clearable />"));
        assert!(modal.contains("<n-input-number v-model:value=\"formData.price\""));
        assert!(modal.contains("<n-switch v-model:value=\"formData.onSale\" />"));
        assert!(modal.contains("<n-input-number v-model:value=\"formData.categoryID\""));
        assert!(!modal.contains("formData.tags"));
        assert!(modal.contains("    id: null,\n"));
        assert!(modal.contains("  name: { required: true, message: labels.name + ' is required'"));
        assert!(!modal.contains("  price: { required"));
        assert!(modal.contains("      delete data.id;\n"));
        assert!(modal.contains("defineExpose({ openModal, closeModal });"));
    }

    #[test]
    fn read_only_list_has_no_modal() {
        let mut entity = fixtures::product();
        entity.capabilities.create = false;
        entity.capabilities.update = false;
        let emission = ClientEmitter.emit(&entity, &EmitOptions::default()).unwrap();
        let roles: Vec<FileRole> = emission.files.iter().map(|f| f.role).collect();
        assert_eq!(roles, [FileRole::ClientApi, FileRole::View]);
        let view = &emission.files[1].content;
        assert!(!view.contains("TableModal"));
        assert!(!view.contains("handleAdd"));
        assert!(view.contains("handleDelete(row)"));

        entity.capabilities.delete = false;
        let emission = ClientEmitter.emit(&entity, &EmitOptions::default()).unwrap();
        assert!(!emission.files[1].content.contains("'actions'"));
    }

    #[test]
    fn user_text_stays_in_script_literals() {
        let mut entity = fixtures::product();
        entity.description = "Products</script><script>alert(1)".to_string();
        let emission = ClientEmitter.emit(&entity, &EmitOptions::default()).unwrap();
        let view = &emission.files[1].content;
        assert!(view.contains("const pageTitle = \"Products\\u003c/script>\\u003cscript>alert(1)\";"));
        assert_eq!(view.matches("</script>").count(), 1);
        assert!(view.contains(":title=\"pageTitle\""));
    }

    #[test]
    fn no_list_means_no_view_or_menu() {
        let mut entity = fixtures::product();
        entity.capabilities.list = false;
        let emission = ClientEmitter.emit(&entity, &EmitOptions::default()).unwrap();
        assert_eq!(emission.files.len(), 1);
        assert!(emission.sections.is_empty());
        assert!(!emission.files[0].content.contains("getProducts"));
    }

    #[test]
    fn skeleton_carries_anchor() {
        assert!(menu_skeleton().contains("  // crudgen:menu\n"));
    }
}
