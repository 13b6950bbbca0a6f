use thiserror::Error;

use crate::ir::CallKind;

/// Result type for weaving a single method.
pub(crate) type WeaveResult<T> = std::result::Result<T, WeaveError>;

/// Fatal conditions that abort rewriting of the enclosing class.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub(crate) enum WeaveError {
    #[error(
        "super call detected in class {class} method: {method}; super calls can't be redirected by a static replacement"
    )]
    UnsupportedSuperCall { class: String, method: String },

    #[error("unsupported invocation kind {} for replaced call {owner}.{name}", .kind.mnemonic())]
    UnsupportedInvocationKind {
        kind: CallKind,
        owner: String,
        name: String,
    },

    #[error("malformed method descriptor: {descriptor:?}")]
    MalformedDescriptor { descriptor: String },

    #[error("nested replaced construction of {type_name} in class {class} method: {method}")]
    NestedConstruction {
        class: String,
        method: String,
        type_name: String,
    },

    #[error("replaced construction of {type_name} has no constructor call in class {class} method: {method}")]
    UnpairedConstruction {
        class: String,
        method: String,
        type_name: String,
    },

    #[error("parameter names not available for class {class} method: {method}")]
    DebugInfoMissing { class: String, method: String },
}

impl WeaveError {
    pub(crate) fn malformed(descriptor: impl Into<String>) -> Self {
        Self::MalformedDescriptor {
            descriptor: descriptor.into(),
        }
    }
}
