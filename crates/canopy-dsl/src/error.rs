use thiserror::Error;
use std::fmt;

/// All possible errors that can occur while decoding a screen document
#[derive(Error, Debug)]
pub enum DslError {
    /// Errors that occur during JSON parsing
    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Errors that occur during YAML parsing
    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// The `__typeName` discriminator does not name a known node variant
    #[error("Unknown node type '{type_name}' at {path}")]
    UnknownNodeType {
        /// The unrecognised discriminator value
        type_name: String,
        /// Location of the node in the document
        path: String,
    },

    /// A required field is absent
    #[error("Missing required field '{field}' at {path}")]
    MissingField {
        /// Name of the missing field
        field: String,
        /// Location of the node in the document
        path: String,
    },

    /// A field is present but has the wrong shape
    #[error("Invalid field '{field}' at {path}: {reason}")]
    InvalidField {
        /// Name of the offending field
        field: String,
        /// Location of the node in the document
        path: String,
        /// What was wrong with it
        reason: String,
    },

    /// The variant-specific fields of a node failed to decode
    #[error("Invalid {type_name} node at {path}: {message}")]
    InvalidNode {
        /// The node variant being decoded
        type_name: String,
        /// Location of the node in the document
        path: String,
        /// Decoder message (missing key, type mismatch, ...)
        message: String,
    },

    /// Two nodes in the same document share an identifier
    #[error("Duplicate node id: {0}")]
    DuplicateId(String),

    /// Multiple validation errors
    #[error("{}", MultipleErrorsFormat(.0))]
    MultipleValidationErrors(Vec<DslError>),
}

// Helper struct to format multiple errors
struct MultipleErrorsFormat<'a>(&'a [DslError]);

impl fmt::Display for MultipleErrorsFormat<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Multiple validation errors ({} issues):", self.0.len())?;
        for (i, err) in self.0.iter().enumerate() {
            write!(f, "\n  {}. {}", i + 1, err)?;
        }
        Ok(())
    }
}

impl DslError {
    /// Collapse a list of validation errors into a single error.
    ///
    /// Returns `None` when the list is empty.
    pub fn from_validation_errors(mut errors: Vec<DslError>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(DslError::MultipleValidationErrors(errors)),
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            DslError::JsonError(_) => "ERR_DSL_JSON_PARSE",
            DslError::YamlError(_) => "ERR_DSL_YAML_PARSE",
            DslError::UnknownNodeType { .. } => "ERR_DSL_UNKNOWN_NODE_TYPE",
            DslError::MissingField { .. } => "ERR_DSL_MISSING_FIELD",
            DslError::InvalidField { .. } => "ERR_DSL_INVALID_FIELD",
            DslError::InvalidNode { .. } => "ERR_DSL_INVALID_NODE",
            DslError::DuplicateId(_) => "ERR_DSL_DUPLICATE_ID",
            DslError::MultipleValidationErrors(_) => "ERR_DSL_VALIDATION_MULTIPLE",
        }
    }
}
