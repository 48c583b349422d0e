use crate::mesh::AttributeInfo;

/// Errors reported to the host by the texturing operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UvError {
    #[error("attribute `{name}` already exists as {found}, expected a per-face 3-vector")]
    AttributeConflict { name: String, found: AttributeInfo },

    #[error("tagged mesh is missing attribute `{name}`")]
    MissingAttribute { name: String },

    #[error("mesh has no active UV layer, select or create one")]
    NoActiveUvLayer,

    #[error("read-only access requires a mesh that already carries texture attributes")]
    MisuseOfReadonly,

    #[error("mesh carries no texture attributes, mark a face first")]
    NotTagged,

    #[error("no faces selected")]
    EmptySelection,

    #[error("transform `{kind}` cannot be mirrored with texture lock")]
    UnsupportedModalTransform { kind: String },

    #[error("pivot mode `{mode}` is not supported with texture lock")]
    UnsupportedPivot { mode: String },
}

impl UvError {
    /// Warnings are shown to the user but do not indicate a broken mesh.
    pub fn is_user_warning(&self) -> bool {
        matches!(self, UvError::EmptySelection)
    }
}

pub type UvResult<T> = Result<T, UvError>;
