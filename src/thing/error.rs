//! Error types for registering and instantiating things

use thiserror::Error;

use crate::deserializer::DescriptionError;

use super::registry::ThingKind;

/// How an error is meant to be handled by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Authoring slip: logged, the offending operation is skipped
    Warning,
    /// Broken content: the instantiation yields nothing, the rest carries on
    Content,
    /// Programming mistake by the integrator: returned to the caller
    Integration,
}

/// Errors that can occur during thing operations
#[derive(Debug, Error)]
pub enum ThingError {
    /// A definition or override without a name
    #[error("thing has an empty name")]
    EmptyName,

    /// A definition whose name is already registered
    #[error("duplicate thing definition: {name}")]
    DuplicateName { name: String },

    /// A definition whose tag is not template, entity or group
    #[error("unknown thing kind '{tag}' for {name}")]
    UnknownKind { name: String, tag: String },

    /// A callback registered under a name that is already taken
    #[error("cannot register callback for {name}: name already registered")]
    CallbackCollision { name: String },

    /// Unregistering a name that holds nothing
    #[error("no override registered for {name}")]
    NoSuchOverride { name: String },

    /// Unregistering a name that holds a different kind of registration
    #[error("{name} is not registered as {expected} override")]
    WrongOverrideKind { name: String, expected: ThingKind },

    /// Asking for an entity from a group override or the reverse
    #[error("{name} is registered as a {found} override, not {expected}")]
    KindMismatch {
        name: String,
        expected: ThingKind,
        found: ThingKind,
    },

    #[error("template not found: {name}")]
    TemplateNotFound { name: String },

    #[error("group not found: {name}")]
    GroupNotFound { name: String },

    #[error("circular template reference detected: {chain}")]
    CyclicTemplate { chain: String },

    #[error("circular group reference detected: {chain}")]
    CyclicGroup { chain: String },

    /// The deserializer rejected a description layer
    #[error("failed to apply description of {name}: {source}")]
    Description {
        name: String,
        #[source]
        source: DescriptionError,
    },
}

impl ThingError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ThingError::EmptyName
            | ThingError::DuplicateName { .. }
            | ThingError::UnknownKind { .. } => ErrorClass::Warning,
            ThingError::CallbackCollision { .. }
            | ThingError::NoSuchOverride { .. }
            | ThingError::WrongOverrideKind { .. }
            | ThingError::KindMismatch { .. } => ErrorClass::Integration,
            ThingError::TemplateNotFound { .. }
            | ThingError::GroupNotFound { .. }
            | ThingError::CyclicTemplate { .. }
            | ThingError::CyclicGroup { .. }
            | ThingError::Description { .. } => ErrorClass::Content,
        }
    }

    pub fn is_integration(&self) -> bool {
        self.class() == ErrorClass::Integration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        assert_eq!(ThingError::EmptyName.class(), ErrorClass::Warning);
        assert_eq!(
            ThingError::CyclicGroup { chain: "G -> G".into() }.class(),
            ErrorClass::Content
        );
        assert!(ThingError::KindMismatch {
            name: "G".into(),
            expected: ThingKind::Entity,
            found: ThingKind::Group,
        }
        .is_integration());
    }

    #[test]
    fn test_kind_mismatch_message() {
        let err = ThingError::KindMismatch {
            name: "Squad".into(),
            expected: ThingKind::Entity,
            found: ThingKind::Group,
        };
        assert_eq!(
            err.to_string(),
            "Squad is registered as a group override, not entity"
        );
    }
}
