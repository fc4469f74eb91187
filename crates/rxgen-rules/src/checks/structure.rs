//! Structural rules: visibility and declaration shape.

use crate::engine::{Report, RuleContext};
use crate::rule::Rule;
use rxgen_core::{Diagnostic, Unit};

pub(crate) fn public_observable_field(ctx: RuleContext<'_>, report: &mut Report) {
    for model in &ctx.declarations.models {
        for property in model.properties.iter().filter(|p| p.public_field) {
            report.emit(
                Diagnostic::new(
                    Rule::PublicObservableField.code(),
                    format!(
                        "observable field `{}::{}` is declared `pub`",
                        model.name, property.name
                    ),
                    model.location_of(property.span),
                )
                .with_help("remove `pub`; the generated accessors expose the value"),
                Some(Unit::Model(model.name.clone())),
            );
        }
    }
}

pub(crate) fn non_public_constructor(ctx: RuleContext<'_>, report: &mut Report) {
    for model in &ctx.declarations.models {
        if !model.visibility.is_private() || model.is_derived() {
            continue;
        }
        let dependencies: Vec<_> = model.dependencies().iter().map(|d| d.name()).collect();
        if dependencies.is_empty() {
            continue;
        }
        report.emit(
            Diagnostic::new(
                Rule::NonPublicConstructor.code(),
                format!(
                    "model `{}` is private but its constructor takes injected dependencies ({})",
                    model.name,
                    dependencies.join(", ")
                ),
                model.location(),
            )
            .with_help("declare the model `pub` or `pub(crate)` so the registration unit can construct it"),
            Some(Unit::Model(model.name.clone())),
        );
    }
}

pub(crate) fn unknown_base_model(ctx: RuleContext<'_>, report: &mut Report) {
    for model in &ctx.declarations.models {
        let Some(base) = &model.base_model else {
            continue;
        };
        if ctx.declarations.model(base).is_some() {
            continue;
        }
        let message = if ctx.blocked.is_model_blocked(base) {
            format!("base model `{}` of `{}` failed analysis", base, model.name)
        } else {
            format!("base model `{}` of `{}` is not declared", base, model.name)
        };
        report.emit(
            Diagnostic::new(Rule::UnknownBaseModel.code(), message, model.location()),
            Some(Unit::Model(model.name.clone())),
        );
    }
}

#[cfg(test)]
mod tests {
    use crate::checks::test_support::{codes, evaluate};

    #[test]
    fn test_public_observable_field_blocks_model() {
        let report = evaluate(
            r#"
            #[model(scope = "singleton")]
            pub struct Counter {
                #[observable]
                pub value: i32,
            }
            "#,
        );
        assert_eq!(codes(&report), vec!["RX004"]);
        assert!(report.blocked.is_model_blocked("Counter"));
    }

    #[test]
    fn test_private_model_with_dependencies() {
        let report = evaluate(
            r#"
            #[model(scope = "singleton")]
            struct Cache {
                store: Arc<dyn Store>,
            }

            #[model(scope = "singleton")]
            struct Clock {
                #[observable]
                now: u64,
            }
            "#,
        );
        assert!(report.blocked.is_model_blocked("Cache"));
        assert!(!report.blocked.is_model_blocked("Clock"));
        assert_eq!(report.diagnostics.with_code("RX005").count(), 1);
        assert_eq!(report.diagnostics.with_code("RX035").count(), 1);
    }

    #[test]
    fn test_unknown_base_model() {
        let report = evaluate(
            r#"
            #[model(base = "Vehicle")]
            pub struct Car {
                #[observable]
                gear: u8,
            }
            "#,
        );
        let diag = report.diagnostics.with_code("RX013").next().unwrap();
        assert!(diag.message.contains("`Vehicle`"));
        assert!(report.blocked.is_model_blocked("Car"));
    }
}
