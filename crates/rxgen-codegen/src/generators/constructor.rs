//! Constructor emitter.
//!
//! `new` takes every constructor dependency as a parameter and wires the
//! model inside `Arc::new_cyclic`, so commands, triggers and callbacks can
//! hold a weak handle to the instance under construction. A derived model
//! builds its base first and shares the base's notification core.

use super::{
    command_initializer, command_triggers, property_initializer, property_triggers, ModelContext,
};
use crate::error::{CodegenError, Result};
use crate::syntax::{derived_ident, ident, ty};
use proc_macro2::TokenStream;
use quote::quote;
use rxgen_core::{Declarations, Dependency, ModelDescriptor};
use syn::Ident;

/// One `new` parameter.
#[derive(Debug, Clone)]
pub struct ConstructorParam {
    pub name: Ident,
    pub ty: TokenStream,
}

/// Parameters of `new` for a model: the base's parameters (prefixed
/// `base_`) followed by the model's own dependencies in declaration order.
pub fn constructor_params(
    declarations: &Declarations,
    model: &ModelDescriptor,
) -> Result<Vec<ConstructorParam>> {
    let mut params = Vec::new();
    if let Some(base) = base_of(declarations, model)? {
        for param in constructor_params(declarations, base)? {
            params.push(ConstructorParam {
                name: derived_ident("base_", &param.name.to_string(), "")?,
                ty: param.ty,
            });
        }
    }
    for dependency in model.dependencies() {
        params.push(match dependency {
            Dependency::Reference(reference) => {
                let target = declarations
                    .model(&reference.model)
                    .ok_or_else(|| CodegenError::UnknownModel(reference.model.clone()))?;
                let path = crate::syntax::path(&target.type_path())?;
                ConstructorParam {
                    name: ident(&reference.name)?,
                    ty: quote! { ::std::sync::Arc<#path> },
                }
            }
            Dependency::Service(service) => {
                let owner = format!("{}::{}", model.name, service.name);
                let service_ty = ty(&owner, &service.ty)?;
                ConstructorParam {
                    name: ident(&service.name)?,
                    ty: quote! { #service_ty },
                }
            }
        });
    }
    Ok(params)
}

fn base_of<'a>(
    declarations: &'a Declarations,
    model: &ModelDescriptor,
) -> Result<Option<&'a ModelDescriptor>> {
    match &model.base_model {
        Some(base) => declarations
            .model(base)
            .map(Some)
            .ok_or_else(|| CodegenError::UnknownModel(base.clone())),
        None => Ok(None),
    }
}

/// The `new` function of a model.
pub fn constructor(ctx: &ModelContext<'_>) -> Result<TokenStream> {
    let rt = ctx.runtime;
    let params = constructor_params(ctx.declarations, ctx.model)?;
    let names: Vec<&Ident> = params.iter().map(|p| &p.name).collect();
    let types: Vec<&TokenStream> = params.iter().map(|p| &p.ty).collect();

    let (base_setup, core_init, base_field) = match base_of(ctx.declarations, ctx.model)? {
        Some(base) => {
            let base_path = ctx.model_path(&base.name)?;
            let base_count = constructor_params(ctx.declarations, base)?.len();
            let base_args = &names[..base_count];
            (
                quote! { let base = #base_path::new(#(#base_args),*); },
                quote! { let core = base.core().clone(); },
                quote! { base, },
            )
        }
        None => (
            TokenStream::new(),
            quote! { let core = #rt::ModelCore::new(); },
            TokenStream::new(),
        ),
    };

    let mut wiring = Vec::new();
    for prop in ctx.properties() {
        wiring.push(property_initializer(ctx, prop)?);
    }
    for command in ctx.commands() {
        wiring.push(command_initializer(ctx, command)?);
    }
    for usage in &ctx.usage.references {
        if usage.properties.is_empty() {
            continue;
        }
        let reference = ident(&usage.reference)?;
        let pairs = usage.properties.iter().map(|p| {
            let from = rxgen_core::QualifiedName::local(p).to_string();
            let to = rxgen_core::QualifiedName::through(&usage.reference, p).to_string();
            quote! { (#from, #to) }
        });
        wiring.push(quote! {
            subscriptions.add(core.republish(#reference.core(), &[#(#pairs),*]));
        });
    }
    for prop in ctx.properties() {
        wiring.push(property_triggers(ctx, prop)?);
    }
    for command in ctx.commands() {
        wiring.push(command_triggers(ctx, command)?);
    }

    let fields = ctx
        .member_names()
        .into_iter()
        .map(ident)
        .collect::<Result<Vec<_>>>()?;

    Ok(quote! {
        /// Create the model and wire its notifications.
        pub fn new(#(#names: #types),*) -> ::std::sync::Arc<Self> {
            #base_setup
            ::std::sync::Arc::new_cyclic(|weak: &::std::sync::Weak<Self>| {
                #core_init
                let subscriptions = #rt::SubscriptionSet::new();
                #(#wiring)*
                Self {
                    core,
                    subscriptions,
                    this: weak.clone(),
                    #base_field
                    #(#fields,)*
                }
            })
        }
    })
}
