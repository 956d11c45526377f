use thiserror::Error;

/// Result type alias using the canonical ExError
pub type Result<T> = std::result::Result<T, ExError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that can be used for programmatic
/// error handling, log assertions and CLI exit reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Mapping/Validation
    InvalidInput,
    NotFound,
    AlreadyExists,
    ConstraintViolation,
    Conversion,

    // Querying
    InvalidQuery,
    DuplicateMapping,
    MissingMapping,

    // Unit of work
    /// Failure raised by caller-supplied logic inside a transaction
    UnitOfWork,
    /// Session or factory used after it was closed
    Closed,

    // Integration/IO
    Io,
    Serialization,
    Persistence,
    Configuration,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::AlreadyExists => "ERR_ALREADY_EXISTS",
            ExErrorKind::ConstraintViolation => "ERR_CONSTRAINT_VIOLATION",
            ExErrorKind::Conversion => "ERR_CONVERSION",
            ExErrorKind::InvalidQuery => "ERR_INVALID_QUERY",
            ExErrorKind::DuplicateMapping => "ERR_DUPLICATE_MAPPING",
            ExErrorKind::MissingMapping => "ERR_MISSING_MAPPING",
            ExErrorKind::UnitOfWork => "ERR_UNIT_OF_WORK",
            ExErrorKind::Closed => "ERR_CLOSED",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Configuration => "ERR_CONFIGURATION",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries classification fields for programmatic handling and context
/// (operation, entity name, entity id) for debugging.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity: Option<String>,
    entity_id: Option<String>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity: None,
            entity_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Shorthand for a failure raised by unit-of-work logic
    pub fn unit_of_work(message: impl Into<String>) -> Self {
        Self::new(ExErrorKind::UnitOfWork).with_message(message)
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity name context
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    /// Add entity ID context
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the entity name context, if any
    pub fn entity(&self) -> Option<&str> {
        self.entity.as_deref()
    }

    /// Get the entity ID context, if any
    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(entity) = &self.entity {
            write!(f, " (entity: {})", entity)?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (entity_id: {})", entity_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Domain failures raised by mapping and query code
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrmStudyError {
    /// No row for the given entity id
    #[error("{entity} not found: {id}")]
    EntityNotFound { entity: String, id: String },

    /// An entity with this id is already persisted
    #[error("{entity} already exists: {id}")]
    EntityAlreadyExists { entity: String, id: String },

    /// An entity was persisted without an id and its table does not generate one
    #[error("{entity} requires an assigned id")]
    MissingId { entity: String },

    /// Named query lookup failed
    #[error("Named query not found: {name}")]
    NamedQueryNotFound { name: String },

    /// Named query registered twice
    #[error("Named query already registered: {name}")]
    DuplicateNamedQuery { name: String },

    /// Entity graph names an attribute the entity does not have
    #[error("Entity graph {graph} references unknown attribute {attribute}")]
    UnknownGraphAttribute { graph: String, attribute: String },

    /// Entity graph lookup failed
    #[error("Entity graph not found: {name}")]
    EntityGraphNotFound { name: String },

    /// Query could not be built
    #[error("Invalid query: {reason}")]
    InvalidQuery { reason: String },

    /// Column value could not be converted to an attribute
    #[error("Cannot convert column value {value:?} for attribute {attribute}")]
    Conversion { attribute: String, value: String },

    /// Stored procedure is not registered with the factory
    #[error("Stored procedure not found: {name}")]
    ProcedureNotFound { name: String },

    /// Chapter id did not match any chapter
    #[error("Unknown chapter: {id}")]
    UnknownChapter { id: String },

    /// Generic internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Conversion from OrmStudyError to ExError
impl From<OrmStudyError> for ExError {
    fn from(err: OrmStudyError) -> Self {
        let message = err.to_string();
        match err {
            OrmStudyError::EntityNotFound { entity, id } => ExError::new(ExErrorKind::NotFound)
                .with_entity(entity)
                .with_entity_id(id)
                .with_message(message),

            OrmStudyError::EntityAlreadyExists { entity, id } => {
                ExError::new(ExErrorKind::AlreadyExists)
                    .with_entity(entity)
                    .with_entity_id(id)
                    .with_message(message)
            }

            OrmStudyError::MissingId { entity } => ExError::new(ExErrorKind::InvalidInput)
                .with_op("persist")
                .with_entity(entity)
                .with_message(message),

            OrmStudyError::NamedQueryNotFound { .. } => ExError::new(ExErrorKind::MissingMapping)
                .with_op("named_query")
                .with_message(message),

            OrmStudyError::DuplicateNamedQuery { .. } => {
                ExError::new(ExErrorKind::DuplicateMapping)
                    .with_op("register_named_query")
                    .with_message(message)
            }

            OrmStudyError::UnknownGraphAttribute { .. } => {
                ExError::new(ExErrorKind::MissingMapping)
                    .with_op("entity_graph")
                    .with_message(message)
            }

            OrmStudyError::EntityGraphNotFound { .. } => {
                ExError::new(ExErrorKind::MissingMapping)
                    .with_op("entity_graph")
                    .with_message(message)
            }

            OrmStudyError::InvalidQuery { .. } => {
                ExError::new(ExErrorKind::InvalidQuery).with_message(message)
            }

            OrmStudyError::Conversion { attribute, .. } => ExError::new(ExErrorKind::Conversion)
                .with_entity_id(attribute)
                .with_message(message),

            OrmStudyError::ProcedureNotFound { .. } => ExError::new(ExErrorKind::MissingMapping)
                .with_op("call_procedure")
                .with_message(message),

            OrmStudyError::UnknownChapter { id } => ExError::new(ExErrorKind::InvalidInput)
                .with_entity_id(id)
                .with_message(message),

            OrmStudyError::Internal { .. } => {
                ExError::new(ExErrorKind::Internal).with_message(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ex_error_builder_chain() {
        let err = ExError::new(ExErrorKind::NotFound)
            .with_op("find")
            .with_entity("Member")
            .with_entity_id("id1")
            .with_message("no row");

        assert_eq!(err.kind(), ExErrorKind::NotFound);
        assert_eq!(err.op(), Some("find"));
        assert_eq!(err.entity(), Some("Member"));
        assert_eq!(err.entity_id(), Some("id1"));
        assert_eq!(err.message(), "no row");
    }

    #[test]
    fn test_display_includes_code_and_context() {
        let err = ExError::new(ExErrorKind::Persistence)
            .with_op("sqlite")
            .with_message("UNIQUE constraint failed");
        let rendered = err.to_string();
        assert!(rendered.starts_with("[ERR_PERSISTENCE]"));
        assert!(rendered.contains("'sqlite'"));
        assert!(rendered.contains("UNIQUE constraint failed"));
    }

    #[test]
    fn test_source_is_exposed_through_std_error() {
        use std::error::Error;

        let inner = ExError::new(ExErrorKind::Io).with_message("disk");
        let outer = ExError::new(ExErrorKind::Configuration).with_source(inner);
        assert!(outer.source().is_some());
        assert_eq!(outer.source_error().map(|e| e.kind()), Some(ExErrorKind::Io));
    }

    #[test]
    fn test_unit_of_work_shorthand() {
        let err = ExError::unit_of_work("boom");
        assert_eq!(err.code(), "ERR_UNIT_OF_WORK");
        assert_eq!(err.message(), "boom");
    }
}
