//! Rule implementations, grouped by the kind of defect they find.

mod graph;
mod hygiene;
mod members;
mod structure;

use crate::engine::{Report, RuleContext};
use crate::rule::Rule;
use rxgen_core::{Declarations, MethodDescriptor, ModelDescriptor};

/// Run one rule.
pub(crate) fn run(rule: Rule, ctx: RuleContext<'_>, report: &mut Report) {
    match rule {
        Rule::PublicObservableField => structure::public_observable_field(ctx, report),
        Rule::NonPublicConstructor => structure::non_public_constructor(ctx, report),
        Rule::UnknownBaseModel => structure::unknown_base_model(ctx, report),
        Rule::UnknownModelReference => graph::unknown_model_reference(ctx, report),
        Rule::CircularModelReference => graph::circular_model_reference(ctx, report),
        Rule::DerivedModelReference => graph::derived_model_reference(ctx, report),
        Rule::MissingMethod => members::missing_method(ctx, report),
        Rule::InvalidCommandSignature => members::invalid_command_signature(ctx, report),
        Rule::WrongReturnType => members::wrong_return_type(ctx, report),
        Rule::InvalidTriggerSignature => members::invalid_trigger_signature(ctx, report),
        Rule::UnknownTriggerProperty => members::unknown_trigger_property(ctx, report),
        Rule::UnknownObservedProperty => members::unknown_observed_property(ctx, report),
        Rule::CircularTriggerReference => members::circular_trigger_reference(ctx, report),
        Rule::UnusedModelReference => hygiene::unused_model_reference(ctx, report),
        Rule::UnreachableTrigger => hygiene::unreachable_trigger(ctx, report),
        Rule::ScopeMismatch => hygiene::scope_mismatch(ctx, report),
        Rule::MissingScope => hygiene::missing_scope(ctx, report),
        Rule::InitOnlyNonCollection => hygiene::init_only_non_collection(ctx, report),
        Rule::PrivateModelNotRegistered => hygiene::private_model_not_registered(ctx, report),
    }
}

/// Look a method up on the model, then along its base chain.
pub(crate) fn find_method<'a>(
    declarations: &'a Declarations,
    model: &'a ModelDescriptor,
    name: &str,
) -> Option<&'a MethodDescriptor> {
    std::iter::once(model)
        .chain(declarations.base_chain(model))
        .find_map(|m| m.method(name))
}

/// Whether the model or one of its bases declares property `name`.
pub(crate) fn has_property(declarations: &Declarations, model: &ModelDescriptor, name: &str) -> bool {
    std::iter::once(model)
        .chain(declarations.base_chain(model))
        .any(|m| m.property(name).is_some())
}
