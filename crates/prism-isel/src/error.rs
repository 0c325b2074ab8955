use prism_hw::Generation;
use prism_ssa::ValueId;
use thiserror::Error;

/// Fatal selection failures.
///
/// There is no partial-result semantics: any of these aborts the whole
/// compilation unit. Internal invariant violations are not represented here;
/// those are bugs and assert.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectError {
    /// The source IR handed to us is malformed (unclassifiable value,
    /// unsupported width combination, reference shape the contract forbids).
    #[error("source defect at {value}: {message}")]
    SourceDefect { value: ValueId, message: String },

    /// The operation has no lowering on the requested generation.
    #[error("unsupported on {gen:?}: {message}")]
    Unsupported { gen: Generation, message: String },

    /// A storage backend cannot represent a required minimum transfer.
    #[error("storage backend {backend} cannot transfer {needed} bytes (max {max})")]
    Capability {
        backend: &'static str,
        needed: u32,
        max: u32,
    },
}

pub(crate) fn defect(value: ValueId, message: impl Into<String>) -> SelectError {
    SelectError::SourceDefect {
        value,
        message: message.into(),
    }
}

pub(crate) fn unsupported(gen: Generation, message: impl Into<String>) -> SelectError {
    SelectError::Unsupported {
        gen,
        message: message.into(),
    }
}
