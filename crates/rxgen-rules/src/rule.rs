//! The closed set of rules.

use rxgen_core::{codes, DiagnosticCode};

/// One diagnostic rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Rule {
    PublicObservableField,
    NonPublicConstructor,
    UnknownBaseModel,
    UnknownModelReference,
    CircularModelReference,
    DerivedModelReference,
    MissingMethod,
    InvalidCommandSignature,
    WrongReturnType,
    InvalidTriggerSignature,
    UnknownTriggerProperty,
    UnknownObservedProperty,
    CircularTriggerReference,
    UnusedModelReference,
    UnreachableTrigger,
    ScopeMismatch,
    MissingScope,
    InitOnlyNonCollection,
    PrivateModelNotRegistered,
}

impl Rule {
    /// Every rule in evaluation order: structure, graph, members, hygiene.
    pub const ALL: &'static [Rule] = &[
        Rule::PublicObservableField,
        Rule::NonPublicConstructor,
        Rule::UnknownBaseModel,
        Rule::UnknownModelReference,
        Rule::CircularModelReference,
        Rule::DerivedModelReference,
        Rule::MissingMethod,
        Rule::InvalidCommandSignature,
        Rule::WrongReturnType,
        Rule::InvalidTriggerSignature,
        Rule::UnknownTriggerProperty,
        Rule::UnknownObservedProperty,
        Rule::CircularTriggerReference,
        Rule::UnusedModelReference,
        Rule::UnreachableTrigger,
        Rule::ScopeMismatch,
        Rule::MissingScope,
        Rule::InitOnlyNonCollection,
        Rule::PrivateModelNotRegistered,
    ];

    /// Registry entry reported by this rule.
    pub fn code(self) -> DiagnosticCode {
        match self {
            Self::PublicObservableField => codes::PUBLIC_OBSERVABLE_FIELD,
            Self::NonPublicConstructor => codes::NON_PUBLIC_CONSTRUCTOR,
            Self::UnknownBaseModel => codes::UNKNOWN_BASE_MODEL,
            Self::UnknownModelReference => codes::UNKNOWN_MODEL_REFERENCE,
            Self::CircularModelReference => codes::CIRCULAR_MODEL_REFERENCE,
            Self::DerivedModelReference => codes::DERIVED_MODEL_REFERENCE,
            Self::MissingMethod => codes::MISSING_METHOD,
            Self::InvalidCommandSignature => codes::INVALID_COMMAND_SIGNATURE,
            Self::WrongReturnType => codes::WRONG_RETURN_TYPE,
            Self::InvalidTriggerSignature => codes::INVALID_TRIGGER_SIGNATURE,
            Self::UnknownTriggerProperty => codes::UNKNOWN_TRIGGER_PROPERTY,
            Self::UnknownObservedProperty => codes::UNKNOWN_OBSERVED_PROPERTY,
            Self::CircularTriggerReference => codes::CIRCULAR_TRIGGER_REFERENCE,
            Self::UnusedModelReference => codes::UNUSED_MODEL_REFERENCE,
            Self::UnreachableTrigger => codes::UNREACHABLE_TRIGGER,
            Self::ScopeMismatch => codes::SCOPE_MISMATCH,
            Self::MissingScope => codes::MISSING_SCOPE,
            Self::InitOnlyNonCollection => codes::INIT_ONLY_NON_COLLECTION,
            Self::PrivateModelNotRegistered => codes::PRIVATE_MODEL_NOT_REGISTERED,
        }
    }
}
