//! Classification of model struct fields.
//!
//! An explicit member attribute always wins. Without one, a field is a
//! command when typed `Command`/`AsyncCommand`, a model reference when typed
//! as a declared model (directly or behind `Arc`), and otherwise a service
//! resolved from the container.

use crate::attrs::{self, attribute_name, doc_lines};
use crate::source::span_of;
use crate::usage::parse_property_paths;
use quote::ToTokens;
use rxgen_core::{
    AccessorKind, AnalyzeError, CommandDescriptor, CommandShape, CommandTrigger,
    InjectedServiceDescriptor, ModelReferenceDescriptor, PartialPropertyDescriptor,
    TriggerDescriptor, TriggerMode,
};
use std::collections::BTreeSet;
use syn::{Field, GenericArgument, PathArguments, Type};

/// A classified field.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Member {
    Property(PartialPropertyDescriptor),
    Command(CommandDescriptor),
    Reference(ModelReferenceDescriptor),
    Service(InjectedServiceDescriptor),
}

/// Member kinds selected by attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Property,
    Command,
    Reference,
    Service,
}

fn kind_of(attribute: &str) -> Option<Kind> {
    match attribute {
        "observable" | "trigger" => Some(Kind::Property),
        "command" => Some(Kind::Command),
        "model_ref" => Some(Kind::Reference),
        "inject" => Some(Kind::Service),
        _ => None,
    }
}

/// Render a type the way descriptors store it.
pub(crate) fn render_type(ty: &Type) -> String {
    ty.to_token_stream().to_string()
}

/// Model name a field type refers to: `Customer` or `Arc<Customer>`.
pub(crate) fn model_name_of(ty: &Type) -> Option<String> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    match &segment.arguments {
        PathArguments::None => Some(segment.ident.to_string()),
        PathArguments::AngleBracketed(args) if segment.ident == "Arc" => {
            match args.args.first() {
                Some(GenericArgument::Type(inner)) if args.args.len() == 1 => model_name_of(inner),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Command shape from a `Command<P, R>` / `AsyncCommand<P, R>` field type.
fn command_shape(ty: &Type) -> Option<CommandShape> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    let asynchronous = match segment.ident.to_string().as_str() {
        "Command" => false,
        "AsyncCommand" => true,
        _ => return None,
    };

    let mut types = Vec::new();
    if let PathArguments::AngleBracketed(args) = &segment.arguments {
        for arg in &args.args {
            if let GenericArgument::Type(ty) = arg {
                types.push(ty);
            }
        }
    }
    let non_unit = |ty: Option<&&Type>| -> Option<String> {
        ty.and_then(|ty| match ty {
            Type::Tuple(tuple) if tuple.elems.is_empty() => None,
            other => Some(render_type(other)),
        })
    };

    Some(CommandShape {
        asynchronous,
        parameter: non_unit(types.first()),
        returns: non_unit(types.get(1)),
        cancelable: false,
    })
}

/// Classify one named field of a model.
pub(crate) fn classify(
    field: &Field,
    position: usize,
    models: &BTreeSet<String>,
) -> Result<Member, AnalyzeError> {
    let name = field
        .ident
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_default();
    let span = span_of(field);

    // Explicit attributes, checked for conflicts.
    let mut explicit: Option<(Kind, String)> = None;
    for attr in &field.attrs {
        let Some(attribute) = attribute_name(attr) else {
            continue;
        };
        let Some(kind) = kind_of(&attribute) else {
            continue;
        };
        if let Some((first_kind, first)) = &explicit {
            if *first_kind != kind {
                return Err(AnalyzeError::ConflictingAttributes {
                    field: name,
                    first: first.clone(),
                    second: attribute,
                    span: span_of(attr),
                });
            }
            continue;
        }
        explicit = Some((kind, attribute));
    }

    let kind = match explicit {
        Some((kind, _)) => kind,
        None if command_shape(&field.ty).is_some() => Kind::Command,
        None if model_name_of(&field.ty).map_or(false, |m| models.contains(&m)) => Kind::Reference,
        None => Kind::Service,
    };
    let is_explicit = explicit.is_some();

    match kind {
        Kind::Property => property(field, name, position).map(Member::Property),
        Kind::Command => command(field, name, position, is_explicit).map(Member::Command),
        Kind::Reference => {
            let model = model_name_of(&field.ty).ok_or_else(|| AnalyzeError::InvalidModelShape {
                message: format!(
                    "model reference `{}` must be typed as a model or `Arc<Model>`",
                    name
                ),
                span,
            })?;
            Ok(Member::Reference(ModelReferenceDescriptor {
                name,
                model,
                used_properties: BTreeSet::new(),
                explicit: is_explicit,
                position,
                span,
            }))
        }
        Kind::Service => Ok(Member::Service(InjectedServiceDescriptor {
            name,
            ty: render_type(&field.ty),
            explicit: is_explicit,
            position,
            span,
        })),
    }
}

fn property(
    field: &Field,
    name: String,
    position: usize,
) -> Result<PartialPropertyDescriptor, AnalyzeError> {
    let observable = match attrs::find(&field.attrs, "observable") {
        Some(attr) => attrs::parse_observable(attr)?,
        None => attrs::ObservableAttr::default(),
    };

    let mut triggers = Vec::new();
    for attr in attrs::find_all(&field.attrs, "trigger") {
        let trigger = attrs::parse_trigger(attr)?;
        triggers.push(TriggerDescriptor {
            method: trigger.method,
            mode: if trigger.asynchronous {
                TriggerMode::Async
            } else {
                TriggerMode::Sync
            },
            guard: trigger.guard,
            span: span_of(attr),
        });
    }

    Ok(PartialPropertyDescriptor {
        name,
        ty: render_type(&field.ty),
        accessor: if observable.init {
            AccessorKind::InitOnly
        } else {
            AccessorKind::Mutable
        },
        equality: observable.equality,
        triggers,
        callback: observable.callback,
        callback_async: observable.callback_async,
        batch_groups: observable.batch,
        default: observable.default,
        public_field: matches!(field.vis, syn::Visibility::Public(_)),
        docs: doc_lines(&field.attrs),
        position,
        span: span_of(field),
    })
}

fn command(
    field: &Field,
    name: String,
    position: usize,
    explicit: bool,
) -> Result<CommandDescriptor, AnalyzeError> {
    let span = span_of(field);
    let mut shape = command_shape(&field.ty).ok_or_else(|| AnalyzeError::InvalidModelShape {
        message: format!(
            "command `{}` must be typed `Command<..>` or `AsyncCommand<..>`",
            name
        ),
        span,
    })?;

    let attr = match attrs::find(&field.attrs, "command") {
        Some(attr) => Some((attr, attrs::parse_command(attr)?)),
        None => None,
    };

    let mut triggers = Vec::new();
    let (execute, can_execute) = match attr {
        Some((raw, parsed)) => {
            shape.cancelable = parsed.cancelable;
            for text in &parsed.triggers {
                let paths = parse_property_paths(text).map_err(|message| {
                    AnalyzeError::InvalidAttribute {
                        attribute: "command".to_string(),
                        message,
                        span: span_of(raw),
                    }
                })?;
                triggers.extend(paths.into_iter().map(|path| CommandTrigger {
                    path,
                    span: span_of(raw),
                }));
            }
            (parsed.execute, parsed.can_execute)
        }
        None => (None, None),
    };
    let execute = execute.unwrap_or_else(|| {
        name.strip_suffix("_command")
            .unwrap_or(&name)
            .to_string()
    });

    Ok(CommandDescriptor {
        name,
        ty: render_type(&field.ty),
        shape,
        execute,
        can_execute,
        triggers,
        by_convention: !explicit,
        docs: doc_lines(&field.attrs),
        position,
        span,
    })
}
