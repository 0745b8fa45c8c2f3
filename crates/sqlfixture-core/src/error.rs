//! Error types shared by every SQLFixture crate.

use thiserror::Error;

/// Errors produced while defining models, resolving references or loading fixtures.
#[derive(Debug, Error)]
pub enum Error {
    /// A symbolic key was registered twice in one store.
    #[error("duplicate key: {key}")]
    DuplicateKey {
        /// The offending key.
        key: String,
    },

    /// The first segment of a reference path names no registered key.
    #[error("key not found: {key}")]
    KeyNotFound {
        /// The missing key.
        key: String,
    },

    /// A later segment of a reference path could not be resolved.
    #[error("cannot resolve `{segment}` on value of type `{type_name}` (path `{path}`)")]
    AttributeNotFound {
        /// The full path being resolved.
        path: String,
        /// The segment that failed.
        segment: String,
        /// Runtime type name of the value the segment was applied to.
        type_name: String,
    },

    /// A reference path is syntactically empty or contains empty segments.
    #[error("invalid reference path: `{path}`")]
    InvalidPath {
        /// The rejected path.
        path: String,
    },

    /// An explicit symbolic key does not follow the key syntax.
    #[error("invalid key `{key}`: keys must match [A-Za-z_][A-Za-z0-9_-]*")]
    InvalidKey {
        /// The rejected key.
        key: String,
    },

    /// A fixture section names an entity type that is not registered.
    #[error("unknown entity type: {name}")]
    UnknownEntity {
        /// The entity type name as written in the document.
        name: String,
    },

    /// A section header names a constructor the model does not define.
    #[error("model `{model}` has no constructor named `{name}`")]
    UnknownConstructor {
        /// Model name.
        model: String,
        /// Constructor name.
        name: String,
    },

    /// A record or assignment names a field the model does not declare.
    #[error("model `{model}` has no field `{field}`")]
    UnknownField {
        /// Model name.
        model: String,
        /// Field name.
        field: String,
    },

    /// A value is incompatible with the field it is assigned to.
    #[error("invalid value for {model}.{field}: {message}")]
    InvalidValue {
        /// Model name.
        model: String,
        /// Field name.
        field: String,
        /// What was wrong with it.
        message: String,
    },

    /// A model definition is malformed or conflicts with the registry.
    #[error("invalid model definition: {message}")]
    InvalidModel {
        /// Description of the problem.
        message: String,
    },

    /// The fixture document does not have the expected shape.
    #[error("invalid fixture document: {message}")]
    InvalidDocument {
        /// Description of the problem.
        message: String,
    },

    /// Context wrapper naming the record field that was being processed.
    #[error("error processing {model}.{field}: {source}")]
    Field {
        /// Model name.
        model: String,
        /// Field name.
        field: String,
        /// The underlying error.
        #[source]
        source: Box<Error>,
    },

    /// The fixture text is not valid YAML.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Wrap this error with the model/field being processed.
    ///
    /// Wrapping an error that already carries field context keeps the innermost context.
    pub fn in_field(self, model: impl Into<String>, field: impl Into<String>) -> Self {
        if matches!(self, Error::Field { .. }) {
            return self;
        }
        Error::Field {
            model: model.into(),
            field: field.into(),
            source: Box::new(self),
        }
    }

    /// The underlying error with any field context stripped.
    pub fn root(&self) -> &Error {
        match self {
            Error::Field { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether the root cause is a missing key.
    pub fn is_key_not_found(&self) -> bool {
        matches!(self.root(), Error::KeyNotFound { .. })
    }

    /// Whether the root cause is a duplicate key.
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self.root(), Error::DuplicateKey { .. })
    }

    pub(crate) fn invalid_value(
        model: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Error::InvalidValue {
            model: model.into(),
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Result alias used throughout SQLFixture.
pub type Result<T> = std::result::Result<T, Error>;
