/// crudgen codegen - entity model and artifact emitters
///
/// Pure text generation: nothing in this crate touches the filesystem.

pub mod emit;
pub mod entity;
pub mod naming;
pub mod section;

pub use emit::{
    ArtifactKind, EmitError, EmitOptions, Emission, Emitter, FileRole, GeneratedFile, SectionEdit,
};
pub use entity::builder::{
    ColumnInfo, EntityBuilder, FieldInput, GenerationRequest, TableInfo, Violation, ViolationKind,
    Violations,
};
pub use entity::{Capabilities, DataType, EntityModel, FieldFlags, FieldSpec, Relation};
pub use section::{SectionDocument, SectionError, SharedTarget, Upsert};
