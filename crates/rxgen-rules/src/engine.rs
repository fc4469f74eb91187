//! Rule evaluation.

use crate::checks;
use crate::rule::Rule;
use rxgen_core::{codes, BlockSet, Declarations, Diagnostic, DiagnosticBag, Unit};
use rxgen_resolver::DependencyGraph;
use tracing::debug;

/// Inputs shared by every rule.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub declarations: &'a Declarations,
    pub graph: &'a DependencyGraph,
    /// Units already rejected by analysis.
    pub blocked: &'a BlockSet,
}

/// Diagnostics and blocked units produced by one evaluation.
#[derive(Debug, Clone, Default)]
pub struct Report {
    pub diagnostics: DiagnosticBag,
    pub blocked: BlockSet,
}

impl Report {
    /// Record a diagnostic; an error also blocks `unit`.
    pub fn emit(&mut self, diagnostic: Diagnostic, unit: Option<Unit>) {
        if diagnostic.is_error() {
            if let Some(unit) = unit {
                self.blocked.block(unit);
            }
        }
        self.diagnostics.push(diagnostic);
    }
}

/// Evaluates a fixed, ordered rule set.
#[derive(Debug, Clone)]
pub struct DiagnosticEngine {
    rules: Vec<Rule>,
}

impl Default for DiagnosticEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticEngine {
    /// Engine running every rule.
    pub fn new() -> Self {
        Self {
            rules: Rule::ALL.to_vec(),
        }
    }

    /// Engine running only the given rules, still in canonical order.
    pub fn with_rules(rules: &[Rule]) -> Self {
        Self {
            rules: Rule::ALL
                .iter()
                .copied()
                .filter(|r| rules.contains(r))
                .collect(),
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn evaluate(&self, ctx: RuleContext<'_>) -> Report {
        let mut report = Report {
            diagnostics: DiagnosticBag::new(),
            blocked: ctx.blocked.clone(),
        };
        for rule in &self.rules {
            let before = report.diagnostics.len();
            checks::run(*rule, ctx, &mut report);
            let found = report.diagnostics.len() - before;
            if found > 0 {
                debug!(?rule, found, "rule reported violations");
            }
        }
        propagate_blocks(ctx.declarations, &mut report);
        report
    }
}

/// Block every unit that depends on a blocked model.
///
/// Runs to a fixed point. Each newly blocked unit gets its own
/// `DEPENDENCY_NOT_GENERATED` diagnostic so that no unit disappears silently.
fn propagate_blocks(declarations: &Declarations, report: &mut Report) {
    loop {
        let mut pending: Vec<(Diagnostic, Unit)> = Vec::new();
        for model in &declarations.models {
            if report.blocked.is_model_blocked(&model.name) {
                continue;
            }
            if let Some(base) = &model.base_model {
                if report.blocked.is_model_blocked(base) {
                    pending.push((
                        Diagnostic::new(
                            codes::DEPENDENCY_NOT_GENERATED,
                            format!(
                                "base model `{}` of `{}` was not generated",
                                base, model.name
                            ),
                            model.location(),
                        ),
                        Unit::Model(model.name.clone()),
                    ));
                    continue;
                }
            }
            for reference in &model.references {
                if report.blocked.is_model_blocked(&reference.model) {
                    pending.push((
                        Diagnostic::new(
                            codes::DEPENDENCY_NOT_GENERATED,
                            format!(
                                "`{}::{}` references model `{}`, which was not generated",
                                model.name, reference.name, reference.model
                            ),
                            model.location_of(reference.span),
                        ),
                        Unit::Model(model.name.clone()),
                    ));
                    break;
                }
            }
        }
        for component in &declarations.components {
            if !report.blocked.is_component_blocked(&component.name)
                && report.blocked.is_model_blocked(&component.model)
            {
                pending.push((
                    Diagnostic::new(
                        codes::DEPENDENCY_NOT_GENERATED,
                        format!(
                            "component `{}` observes model `{}`, which was not generated",
                            component.name, component.model
                        ),
                        component.location(),
                    ),
                    Unit::Component(component.name.clone()),
                ));
            }
        }

        if pending.is_empty() {
            break;
        }
        for (diagnostic, unit) in pending {
            report.emit(diagnostic, Some(unit));
        }
    }
}
