//! Member rules: command and trigger contracts.

use super::{find_method, has_property};
use crate::engine::{Report, RuleContext};
use crate::rule::Rule;
use rxgen_core::{
    normalize_type, CommandDescriptor, Declarations, Diagnostic, MethodDescriptor,
    ModelDescriptor, TriggerMode, Unit,
};
use rxgen_resolver::EdgeKind;

fn member(model: &ModelDescriptor, name: &str) -> Option<Unit> {
    Some(Unit::member(&model.name, name))
}

fn missing(model: &ModelDescriptor, method: &str, role: &str, member_name: &str, signature: &str) -> Diagnostic {
    Diagnostic::new(
        Rule::MissingMethod.code(),
        format!(
            "{} method `{}` of `{}::{}` not found",
            role, method, model.name, member_name
        ),
        model.location(),
    )
    .with_help(format!(
        "add `{}` to an `impl {}` block",
        signature.replace("{}", method),
        model.name
    ))
}

pub(crate) fn missing_method(ctx: RuleContext<'_>, report: &mut Report) {
    let decls = ctx.declarations;
    for model in &decls.models {
        for command in &model.commands {
            if find_method(decls, model, &command.execute).is_none() {
                let signature = if command.shape.asynchronous {
                    "async fn {}(&self)"
                } else {
                    "fn {}(&self)"
                };
                let mut diagnostic = missing(model, &command.execute, "execute", &command.name, signature);
                diagnostic.location = model.location_of(command.span);
                report.emit(diagnostic, member(model, &command.name));
            }
            if let Some(guard) = &command.can_execute {
                if find_method(decls, model, guard).is_none() {
                    let mut diagnostic = missing(model, guard, "can_execute", &command.name, "fn {}(&self) -> bool");
                    diagnostic.location = model.location_of(command.span);
                    report.emit(diagnostic, member(model, &command.name));
                }
            }
        }
        for property in &model.properties {
            for trigger in &property.triggers {
                let signature = match trigger.mode {
                    TriggerMode::Sync => "fn {}(&self)",
                    TriggerMode::Async => "async fn {}(&self)",
                };
                if find_method(decls, model, &trigger.method).is_none() {
                    let mut diagnostic = missing(model, &trigger.method, "trigger", &property.name, signature);
                    diagnostic.location = model.location_of(trigger.span);
                    report.emit(diagnostic, member(model, &property.name));
                }
                if let Some(guard) = &trigger.guard {
                    if find_method(decls, model, guard).is_none() {
                        let mut diagnostic = missing(model, guard, "trigger guard", &property.name, "fn {}(&self) -> bool");
                        diagnostic.location = model.location_of(trigger.span);
                        report.emit(diagnostic, member(model, &property.name));
                    }
                }
            }
        }
    }
}

/// Problems with a `fn(&self[, P]) -> bool` guard.
fn guard_problem(guard: &MethodDescriptor, parameter: Option<&str>) -> Option<String> {
    if !guard.has_receiver {
        return Some("must take `&self`".to_string());
    }
    if guard.is_async {
        return Some("must not be async".to_string());
    }
    if !guard.returns(Some("bool")) {
        return Some("must return `bool`".to_string());
    }
    let params = guard.value_params();
    match (params.as_slice(), parameter) {
        ([], _) => None,
        ([param], Some(expected)) if normalize_type(&param.ty) == normalize_type(expected) => None,
        _ => Some("must take no arguments besides `&self`, or the command parameter".to_string()),
    }
}

/// Problems with an execute method measured against the command shape.
fn execute_problems(command: &CommandDescriptor, execute: &MethodDescriptor) -> Vec<String> {
    let shape = &command.shape;
    let mut problems = Vec::new();
    if !execute.has_receiver {
        problems.push(format!("`{}` must take `&self`", execute.name));
    }
    if execute.is_async != shape.asynchronous {
        problems.push(if shape.asynchronous {
            format!("`{}` must be `async` for an `AsyncCommand`", execute.name)
        } else {
            format!("`{}` must not be `async` for a `Command`", execute.name)
        });
    }
    if shape.cancelable && !shape.asynchronous {
        problems.push("only asynchronous commands can be cancelable".to_string());
    }
    match (execute.value_params().as_slice(), shape.parameter.as_deref()) {
        ([], None) => {}
        ([param], Some(expected)) => {
            if normalize_type(&param.ty) != normalize_type(expected) {
                problems.push(format!(
                    "`{}` takes `{}` but the command parameter is `{}`",
                    execute.name, param.ty, expected
                ));
            }
        }
        ([], Some(expected)) => problems.push(format!(
            "`{}` must take the command parameter `{}`",
            execute.name, expected
        )),
        ([_], None) => problems.push(format!(
            "`{}` takes a parameter but the command declares none",
            execute.name
        )),
        (params, _) => problems.push(format!(
            "`{}` takes {} parameters; commands accept at most one",
            execute.name,
            params.len()
        )),
    }
    if !command.triggers.is_empty() && shape.parameter.is_some() {
        problems.push("a command that takes a parameter cannot be triggered by a property change".to_string());
    }
    problems
}

pub(crate) fn invalid_command_signature(ctx: RuleContext<'_>, report: &mut Report) {
    let decls = ctx.declarations;
    for model in &decls.models {
        for command in &model.commands {
            let location = model.location_of(command.span);
            if let Some(execute) = find_method(decls, model, &command.execute) {
                for problem in execute_problems(command, execute) {
                    report.emit(
                        Diagnostic::new(
                            Rule::InvalidCommandSignature.code(),
                            format!("command `{}::{}`: {}", model.name, command.name, problem),
                            location.clone(),
                        ),
                        member(model, &command.name),
                    );
                }
            }
            let guard = command
                .can_execute
                .as_deref()
                .and_then(|g| find_method(decls, model, g));
            if let Some(guard) = guard {
                if let Some(problem) = guard_problem(guard, command.shape.parameter.as_deref()) {
                    report.emit(
                        Diagnostic::new(
                            Rule::InvalidCommandSignature.code(),
                            format!(
                                "can_execute `{}` of `{}::{}` {}",
                                guard.name, model.name, command.name, problem
                            ),
                            location.clone(),
                        ),
                        member(model, &command.name),
                    );
                }
            }
        }
    }
}

pub(crate) fn wrong_return_type(ctx: RuleContext<'_>, report: &mut Report) {
    let decls = ctx.declarations;
    for model in &decls.models {
        for command in &model.commands {
            let Some(execute) = find_method(decls, model, &command.execute) else {
                continue;
            };
            let expected = command.shape.returns.as_deref();
            if execute.returns(expected) {
                continue;
            }
            report.emit(
                Diagnostic::new(
                    Rule::WrongReturnType.code(),
                    format!(
                        "command `{}::{}` returns `{}` but `{}` returns `{}`",
                        model.name,
                        command.name,
                        expected.unwrap_or("()"),
                        execute.name,
                        execute.return_type.as_deref().unwrap_or("()")
                    ),
                    model.location_of(command.span),
                ),
                member(model, &command.name),
            );
        }
    }
}

pub(crate) fn invalid_trigger_signature(ctx: RuleContext<'_>, report: &mut Report) {
    let decls = ctx.declarations;
    for model in &decls.models {
        for property in &model.properties {
            for trigger in &property.triggers {
                let mut problems = Vec::new();
                if let Some(method) = find_method(decls, model, &trigger.method) {
                    if !method.has_receiver {
                        problems.push(format!("`{}` must take `&self`", method.name));
                    }
                    if !method.value_params().is_empty() || method.takes_cancellation() {
                        problems.push(format!("`{}` must take no arguments besides `&self`", method.name));
                    }
                    if !method.returns(None) {
                        problems.push(format!("`{}` must return `()`", method.name));
                    }
                    match (trigger.mode, method.is_async) {
                        (TriggerMode::Sync, true) => problems.push(format!(
                            "`{}` is async; mark the trigger `asynchronous`",
                            method.name
                        )),
                        (TriggerMode::Async, false) => problems.push(format!(
                            "asynchronous trigger `{}` must be an `async fn`",
                            method.name
                        )),
                        _ => {}
                    }
                }
                let guard = trigger.guard.as_deref().and_then(|g| find_method(decls, model, g));
                if let Some(guard) = guard {
                    if let Some(problem) = guard_problem(guard, None) {
                        problems.push(format!("guard `{}` {}", guard.name, problem));
                    }
                }
                for problem in problems {
                    report.emit(
                        Diagnostic::new(
                            Rule::InvalidTriggerSignature.code(),
                            format!("trigger on `{}::{}`: {}", model.name, property.name, problem),
                            model.location_of(trigger.span),
                        ),
                        member(model, &property.name),
                    );
                }
            }
        }
    }
}

pub(crate) fn unknown_trigger_property(ctx: RuleContext<'_>, report: &mut Report) {
    let decls = ctx.declarations;
    for model in &decls.models {
        for command in &model.commands {
            for trigger in &command.triggers {
                let known = match &trigger.path.reference {
                    None => has_property(decls, model, &trigger.path.property),
                    Some(reference) => match model.reference(reference) {
                        Some(r) => match decls.model(&r.model) {
                            Some(target) => has_property(decls, target, &trigger.path.property),
                            // Reported as an unknown model reference.
                            None => continue,
                        },
                        None => false,
                    },
                };
                if known {
                    continue;
                }
                report.emit(
                    Diagnostic::new(
                        Rule::UnknownTriggerProperty.code(),
                        format!(
                            "command `{}::{}` is triggered by unknown property `{}`",
                            model.name, command.name, trigger.path
                        ),
                        model.location_of(trigger.span),
                    ),
                    member(model, &command.name),
                );
            }
        }
    }
}

pub(crate) fn unknown_observed_property(ctx: RuleContext<'_>, report: &mut Report) {
    let decls = ctx.declarations;
    for component in &decls.components {
        // An undeclared model is reported as an unknown model reference.
        let Some(model) = decls.model(&component.model) else {
            continue;
        };
        for path in &component.observes {
            let known = match &path.reference {
                None => publishes(decls, model, &path.property),
                Some(reference) => model
                    .reference(reference)
                    .and_then(|r| decls.model(&r.model))
                    .is_some_and(|target| publishes(decls, target, &path.property)),
            };
            if known {
                continue;
            }
            report.emit(
                Diagnostic::new(
                    Rule::UnknownObservedProperty.code(),
                    format!(
                        "component `{}` observes `{}`, which model `{}` does not publish",
                        component.name, path, model.name
                    ),
                    component.location(),
                )
                .with_help("name a property of the model, or `reference.property` for a referenced model"),
                Some(Unit::Component(component.name.clone())),
            );
        }
    }
}

/// Whether `name` is a property or command of the model or one of its bases.
fn publishes(decls: &Declarations, model: &ModelDescriptor, name: &str) -> bool {
    has_property(decls, model, name)
        || std::iter::once(model)
            .chain(decls.base_chain(model))
            .any(|m| m.command(name).is_some())
}

pub(crate) fn circular_trigger_reference(ctx: RuleContext<'_>, report: &mut Report) {
    for cycle in ctx.graph.find_cycles(EdgeKind::TRIGGER) {
        for node in &cycle.nodes {
            let Some((model_name, member_name)) = node.split_once("::") else {
                continue;
            };
            let Some(model) = ctx.declarations.model(model_name) else {
                continue;
            };
            let Some(command) = model.command(member_name) else {
                continue;
            };
            report.emit(
                Diagnostic::new(
                    Rule::CircularTriggerReference.code(),
                    format!("circular trigger reference: {}", cycle.describe()),
                    model.location_of(command.span),
                )
                .with_help(format!(
                    "`{}` writes a property that triggers it; remove the trigger or the write",
                    command.execute
                )),
                member(model, &command.name),
            );
        }
    }
}
