//! Error types shared by every Trellis crate
//!
//! [`TrellisError`] describes model-level failures. Everything that crosses a
//! crate boundary is an [`ExError`], classified by an [`ExErrorKind`] whose
//! `code()` is stable and safe to match on.

use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TrellisError>;

/// Failure classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    InvalidInput,
    NotFound,
    /// The entity exists but sits in the trash
    Deleted,
    AlreadyExists,
    CycleDetected,
    ValidationFailed,
    /// A page names a component, or an entity a parent, that cannot be found
    UnresolvedReference,
    /// Bad source or target of a deploy command
    PreconditionFailed,
    /// One item of a bulk operation was rejected
    ItemFailure,
    /// A bulk batch could not be committed
    TransactionFailure,
    Io,
    Serialization,
    Persistence,
    ScriptFailure,
    Internal,
}

impl ExErrorKind {
    pub fn code(&self) -> &'static str {
        use ExErrorKind::*;
        match self {
            InvalidInput => "ERR_INVALID_INPUT",
            NotFound => "ERR_NOT_FOUND",
            Deleted => "ERR_DELETED",
            AlreadyExists => "ERR_ALREADY_EXISTS",
            CycleDetected => "ERR_CYCLE_DETECTED",
            ValidationFailed => "ERR_VALIDATION_FAILED",
            UnresolvedReference => "ERR_UNRESOLVED_REFERENCE",
            PreconditionFailed => "ERR_PRECONDITION_FAILED",
            ItemFailure => "ERR_ITEM_FAILURE",
            TransactionFailure => "ERR_TRANSACTION_FAILURE",
            Io => "ERR_IO",
            Serialization => "ERR_SERIALIZATION",
            Persistence => "ERR_PERSISTENCE",
            ScriptFailure => "ERR_SCRIPT_FAILURE",
            Internal => "ERR_INTERNAL",
        }
    }

}

/// Classified error with optional context
///
/// Built with `ExError::new(kind)` and the `with_*` methods. `op` names the
/// failing operation and `path` is either a graph path or a file-system path.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity_id: Option<String>,
    path: Option<String>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity_id: None,
            path: None,
            message: String::new(),
            source: None,
        }
    }

    pub fn with_op(self, op: impl Into<String>) -> Self {
        Self {
            op: Some(op.into()),
            ..self
        }
    }

    pub fn with_entity_id(self, id: impl Into<String>) -> Self {
        Self {
            entity_id: Some(id.into()),
            ..self
        }
    }

    pub fn with_path(self, path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..self
        }
    }

    pub fn with_message(self, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..self
        }
    }

    pub fn with_source(self, source: ExError) -> Self {
        Self {
            source: Some(Box::new(source)),
            ..self
        }
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Shorthand for `self.kind().code()`
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Renders as `[CODE] op: message {entity=.., path=..} <- cause`
impl fmt::Display for ExError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.code())?;
        match (&self.op, self.message.is_empty()) {
            (Some(op), true) => write!(f, " {}", op)?,
            (Some(op), false) => write!(f, " {}: {}", op, self.message)?,
            (None, false) => write!(f, " {}", self.message)?,
            (None, true) => {}
        }

        let context: Vec<String> = [("entity", &self.entity_id), ("path", &self.path)]
            .into_iter()
            .filter_map(|(label, value)| value.as_ref().map(|v| format!("{}={}", label, v)))
            .collect();
        if !context.is_empty() {
            write!(f, " {{{}}}", context.join(", "))?;
        }

        match &self.source {
            Some(cause) => write!(f, " <- {}", cause),
            None => Ok(()),
        }
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.source {
            Some(cause) => Some(&**cause),
            None => None,
        }
    }
}

/// Failures raised while validating or converting graph entities
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrellisError {
    #[error("Entity not found: {entity_id}")]
    EntityNotFound { entity_id: String },

    #[error("Entity is in trash: {entity_id}")]
    EntityDeleted { entity_id: String },

    #[error("Parent {parent_id} of entity {entity_id} not found")]
    ParentNotFound {
        entity_id: String,
        parent_id: String,
    },

    /// Setting the parent would create a cycle
    #[error("Cycle detected: entity {entity_id} cannot be placed under {parent_id}")]
    CycleDetected {
        entity_id: String,
        parent_id: String,
    },

    /// Name is missing or malformed for a kind that requires one
    #[error("Invalid name for {kind} entity: {reason}")]
    InvalidName { kind: String, reason: String },

    /// A `type` property refers to a schema type that is not registered
    #[error("Unknown schema type '{type_name}' on entity {entity_id}")]
    UnknownSchemaType {
        entity_id: String,
        type_name: String,
    },

    /// A property value could not be converted to its internal representation
    #[error("Invalid value for property '{key}': {reason}")]
    InvalidProperty { key: String, reason: String },

    /// Entity kind tag not recognised
    #[error("Unknown entity kind: {tag}")]
    UnknownKind { tag: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl From<TrellisError> for ExError {
    fn from(err: TrellisError) -> Self {
        match err {
            TrellisError::EntityNotFound { entity_id } => ExError::new(ExErrorKind::NotFound)
                .with_entity_id(entity_id)
                .with_message("Entity not found"),

            TrellisError::EntityDeleted { entity_id } => ExError::new(ExErrorKind::Deleted)
                .with_entity_id(entity_id)
                .with_message("Entity is in trash"),

            TrellisError::ParentNotFound {
                entity_id,
                parent_id,
            } => ExError::new(ExErrorKind::ValidationFailed)
                .with_entity_id(entity_id)
                .with_op("validate_parent")
                .with_message(format!("Parent {} does not exist", parent_id)),

            TrellisError::CycleDetected {
                entity_id,
                parent_id,
            } => ExError::new(ExErrorKind::CycleDetected)
                .with_entity_id(entity_id)
                .with_message(format!("Placing under {} would create a cycle", parent_id)),

            TrellisError::InvalidName { kind, reason } => {
                ExError::new(ExErrorKind::ValidationFailed)
                    .with_op("validate_name")
                    .with_message(format!("Invalid name for {}: {}", kind, reason))
            }

            TrellisError::UnknownSchemaType {
                entity_id,
                type_name,
            } => ExError::new(ExErrorKind::ValidationFailed)
                .with_entity_id(entity_id)
                .with_op("validate_type")
                .with_message(format!("Unknown schema type '{}'", type_name)),

            TrellisError::InvalidProperty { key, reason } => {
                ExError::new(ExErrorKind::InvalidInput)
                    .with_op("convert_property")
                    .with_message(format!("Invalid value for '{}': {}", key, reason))
            }

            TrellisError::UnknownKind { tag } => ExError::new(ExErrorKind::InvalidInput)
                .with_message(format!("Unknown entity kind: {}", tag)),

            TrellisError::Serialization { message } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }
        }
    }
}

impl From<serde_json::Error> for TrellisError {
    fn from(err: serde_json::Error) -> Self {
        TrellisError::Serialization {
            message: err.to_string(),
        }
    }
}
