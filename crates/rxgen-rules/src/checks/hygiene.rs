//! Hygiene rules. None of these block emission.

use crate::engine::{Report, RuleContext};
use crate::rule::Rule;
use rxgen_core::Diagnostic;

pub(crate) fn unused_model_reference(ctx: RuleContext<'_>, report: &mut Report) {
    for model in &ctx.declarations.models {
        for reference in &model.references {
            let Some(target) = ctx.declarations.model(&reference.model) else {
                continue;
            };
            if !reference.used_properties.is_empty() {
                continue;
            }
            // A reference that only propagates trigger hooks is intentional.
            if model.include_referenced_triggers && target.has_trigger_properties() {
                continue;
            }
            report.emit(
                Diagnostic::new(
                    Rule::UnusedModelReference.code(),
                    format!(
                        "`{}::{}` reads no properties of `{}`",
                        model.name, reference.name, target.name
                    ),
                    model.location_of(reference.span),
                )
                .with_help("remove the reference, or add `include_referenced_triggers` to #[model] if it only propagates triggers"),
                None,
            );
        }
    }
}

pub(crate) fn unreachable_trigger(ctx: RuleContext<'_>, report: &mut Report) {
    for model in &ctx.declarations.models {
        for property in model.properties.iter().filter(|p| p.is_inert()) {
            for trigger in &property.triggers {
                report.emit(
                    Diagnostic::new(
                        Rule::UnreachableTrigger.code(),
                        format!(
                            "trigger `{}` can never fire: `{}::{}` is init-only",
                            trigger.method, model.name, property.name
                        ),
                        model.location_of(trigger.span),
                    ),
                    None,
                );
            }
            if property.callback || property.callback_async {
                report.emit(
                    Diagnostic::new(
                        Rule::UnreachableTrigger.code(),
                        format!(
                            "callbacks on init-only `{}::{}` are never invoked",
                            model.name, property.name
                        ),
                        model.location_of(property.span),
                    ),
                    None,
                );
            }
        }
        for command in &model.commands {
            for trigger in command.triggers.iter().filter(|t| t.path.reference.is_none()) {
                let inert = model
                    .property(&trigger.path.property)
                    .map_or(false, |p| p.is_inert());
                if inert {
                    report.emit(
                        Diagnostic::new(
                            Rule::UnreachableTrigger.code(),
                            format!(
                                "command `{}::{}` is triggered by init-only `{}`, which never changes",
                                model.name, command.name, trigger.path.property
                            ),
                            model.location_of(trigger.span),
                        ),
                        None,
                    );
                }
            }
        }
    }
}

pub(crate) fn scope_mismatch(ctx: RuleContext<'_>, report: &mut Report) {
    for model in &ctx.declarations.models {
        if model.is_derived() {
            continue;
        }
        for reference in &model.references {
            let Some(target) = ctx.declarations.model(&reference.model) else {
                continue;
            };
            if target.is_derived() || !model.scope.outlives(target.scope) {
                continue;
            }
            report.emit(
                Diagnostic::new(
                    Rule::ScopeMismatch.code(),
                    format!(
                        "{} model `{}` captures {} model `{}` through `{}`",
                        model.scope, model.name, target.scope, target.name, reference.name
                    ),
                    model.location_of(reference.span),
                )
                .with_help(format!(
                    "give `{}` a scope no longer than `{}`",
                    model.name, target.scope
                )),
                None,
            );
        }
    }
}

pub(crate) fn missing_scope(ctx: RuleContext<'_>, report: &mut Report) {
    for model in &ctx.declarations.models {
        if model.scope_explicit || model.is_derived() {
            continue;
        }
        report.emit(
            Diagnostic::new(
                Rule::MissingScope.code(),
                format!(
                    "model `{}` does not declare a scope; using {}",
                    model.name, model.scope
                ),
                model.location(),
            )
            .with_help(format!("add `scope = \"{}\"` to #[model]", model.scope)),
            None,
        );
    }
}

pub(crate) fn init_only_non_collection(ctx: RuleContext<'_>, report: &mut Report) {
    for model in &ctx.declarations.models {
        for property in model.properties.iter().filter(|p| p.is_inert()) {
            report.emit(
                Diagnostic::new(
                    Rule::InitOnlyNonCollection.code(),
                    format!(
                        "init-only `{}::{}` has type `{}`, which is not an observable collection",
                        model.name, property.name, property.ty
                    ),
                    model.location_of(property.span),
                )
                .with_help("drop `init` or use `ObservableList`"),
                None,
            );
        }
    }
}

pub(crate) fn private_model_not_registered(ctx: RuleContext<'_>, report: &mut Report) {
    for model in &ctx.declarations.models {
        if !model.visibility.is_private() || model.is_derived() {
            continue;
        }
        if !model.dependencies().is_empty() {
            continue;
        }
        report.emit(
            Diagnostic::new(
                Rule::PrivateModelNotRegistered.code(),
                format!(
                    "private model `{}` is not registered; construct it with `{}::new()`",
                    model.name, model.name
                ),
                model.location(),
            ),
            None,
        );
    }
}

#[cfg(test)]
mod tests {
    use crate::checks::test_support::evaluate;
    use rxgen_core::Severity;

    #[test]
    fn test_used_reference_is_quiet() {
        let report = evaluate(
            r#"
            #[model(scope = "singleton")]
            pub struct Customer {
                #[observable]
                name: String,
                #[observable]
                email: String,
            }
            #[model(scope = "singleton")]
            pub struct Order {
                customer: Arc<Customer>,
                audit: Arc<Customer>,
            }
            impl Order {
                fn label(&self) -> String {
                    self.customer().name()
                }
            }
            "#,
        );
        let unused: Vec<_> = report.diagnostics.with_code("RX030").collect();
        assert_eq!(unused.len(), 1);
        assert!(unused[0].message.contains("Order::audit"));
        assert!(report.blocked.is_empty());
    }

    #[test]
    fn test_scope_and_defaults() {
        let report = evaluate(
            r#"
            #[model(scope = "scoped")]
            pub struct Session {
                #[observable]
                user: String,
            }
            #[model]
            pub struct Dashboard {
                session: Arc<Session>,
                #[observable(init)]
                title: String,
                #[observable(init)]
                #[trigger(on_title)]
                subtitle: String,
            }
            impl Dashboard {
                fn on_title(&self) {}
                fn user(&self) -> String { self.session().user() }
            }
            "#,
        );
        let mismatch = report.diagnostics.with_code("RX032").next().unwrap();
        assert_eq!(mismatch.severity, Severity::Warning);
        assert!(mismatch.message.contains("singleton model `Dashboard` captures scoped model `Session`"));
        assert_eq!(report.diagnostics.with_code("RX033").count(), 1);
        assert_eq!(report.diagnostics.with_code("RX034").count(), 2);
        assert_eq!(report.diagnostics.with_code("RX031").count(), 1);
        assert!(!report.diagnostics.has_errors());
        assert!(report.blocked.is_empty());
    }
}
