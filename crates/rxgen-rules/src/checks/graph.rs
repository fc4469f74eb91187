//! Graph rules: reference targets and cycles.

use crate::engine::{Report, RuleContext};
use crate::rule::Rule;
use rxgen_core::{Diagnostic, Unit};
use rxgen_resolver::EdgeKind;

pub(crate) fn unknown_model_reference(ctx: RuleContext<'_>, report: &mut Report) {
    for model in &ctx.declarations.models {
        for reference in &model.references {
            if ctx.declarations.model(&reference.model).is_some() {
                continue;
            }
            let why = if ctx.blocked.is_model_blocked(&reference.model) {
                "failed analysis"
            } else {
                "is not declared"
            };
            report.emit(
                Diagnostic::new(
                    Rule::UnknownModelReference.code(),
                    format!(
                        "`{}::{}` references model `{}`, which {}",
                        model.name, reference.name, reference.model, why
                    ),
                    model.location_of(reference.span),
                ),
                Some(Unit::Model(model.name.clone())),
            );
        }
    }
    for component in &ctx.declarations.components {
        if ctx.declarations.model(&component.model).is_none() {
            report.emit(
                Diagnostic::new(
                    Rule::UnknownModelReference.code(),
                    format!(
                        "component `{}` observes model `{}`, which is not declared",
                        component.name, component.model
                    ),
                    component.location(),
                ),
                Some(Unit::Component(component.name.clone())),
            );
        }
    }
}

pub(crate) fn circular_model_reference(ctx: RuleContext<'_>, report: &mut Report) {
    for cycle in ctx.graph.find_cycles(EdgeKind::MODEL) {
        let Some(first) = cycle.edges.first() else {
            continue;
        };
        let diagnostic = Diagnostic::new(
            Rule::CircularModelReference.code(),
            format!("circular model reference: {}", cycle.describe()),
            first.location.clone(),
        )
        .with_help("remove one of the references or move the shared state into a separate model");
        for node in &cycle.nodes {
            report.blocked.block(Unit::Model(node.clone()));
        }
        report.emit(diagnostic, None);
    }
}

pub(crate) fn derived_model_reference(ctx: RuleContext<'_>, report: &mut Report) {
    for model in &ctx.declarations.models {
        for reference in &model.references {
            let Some(target) = ctx.declarations.model(&reference.model) else {
                continue;
            };
            if !target.is_derived() {
                continue;
            }
            let mut diagnostic = Diagnostic::new(
                Rule::DerivedModelReference.code(),
                format!(
                    "`{}::{}` references derived model `{}`, which is never registered for injection",
                    model.name, reference.name, target.name
                ),
                model.location_of(reference.span),
            );
            if let Some(root) = ctx.declarations.root_of(target) {
                diagnostic = diagnostic.with_help(format!("reference the root model `{}` instead", root.name));
            }
            report.emit(diagnostic, Some(Unit::Model(model.name.clone())));
        }
    }
}
