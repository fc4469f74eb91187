//! Model emitter: assembles the generated struct, its impl block and, for
//! derived models, the `Deref` to the base.

use super::{
    command_accessor, constructor, property_accessors, property_callbacks, property_storage,
    ModelContext,
};
use crate::error::Result;
use crate::syntax::{ident, ty};
use proc_macro2::TokenStream;
use quote::quote;
use rxgen_analyzer::is_generator_attribute;
use syn::ItemStruct;

/// Stored type of a member field, or `None` when the member is blocked.
fn member_storage(ctx: &ModelContext<'_>, member: &str) -> Result<Option<TokenStream>> {
    let model = ctx.model;
    if let Some(prop) = model.property(member) {
        if ctx.blocked.is_member_blocked(&model.name, member) {
            return Ok(None);
        }
        return property_storage(ctx, prop).map(Some);
    }
    if let Some(command) = model.command(member) {
        if ctx.blocked.is_member_blocked(&model.name, member) {
            return Ok(None);
        }
        let declared = ty(&ctx.owner(member), &command.ty)?;
        return Ok(Some(quote! { #declared }));
    }
    if let Some(reference) = model.reference(member) {
        let path = ctx.model_path(&reference.model)?;
        return Ok(Some(quote! { ::std::sync::Arc<#path> }));
    }
    match model.services.iter().find(|s| s.name == member) {
        Some(service) => {
            let declared = ty(&ctx.owner(member), &service.ty)?;
            Ok(Some(quote! { #declared }))
        }
        None => Ok(None),
    }
}

/// Generated code for one `#[model]` struct.
pub fn emit_model(ctx: &ModelContext<'_>, item: &ItemStruct) -> Result<TokenStream> {
    let rt = ctx.runtime;
    let name = &item.ident;
    let vis = &item.vis;
    let attrs = item.attrs.iter().filter(|a| !is_generator_attribute(a));

    let mut fields = Vec::new();
    for field in &item.fields {
        let Some(field_name) = &field.ident else {
            continue;
        };
        let member = field_name.to_string();
        let Some(storage) = member_storage(ctx, &member)? else {
            continue;
        };
        let field_attrs = field.attrs.iter().filter(|a| !is_generator_attribute(a));
        // Properties are reached through their accessors only.
        let field_vis = if ctx.model.property(&member).is_some() {
            TokenStream::new()
        } else {
            let v = &field.vis;
            quote! { #v }
        };
        fields.push(quote! { #(#field_attrs)* #field_vis #field_name: #storage });
    }

    let base_path = match &ctx.model.base_model {
        Some(base) => Some(ctx.model_path(base)?),
        None => None,
    };
    let base_field = base_path
        .as_ref()
        .map(|path| quote! { base: ::std::sync::Arc<#path>, });

    let published = ctx.published();
    let new = constructor(ctx)?;

    let mut accessors = Vec::new();
    for prop in ctx.properties() {
        accessors.push(property_accessors(ctx, prop)?);
        accessors.push(property_callbacks(ctx, prop)?);
    }
    for command in ctx.commands() {
        accessors.push(command_accessor(ctx, command)?);
    }
    for reference in &ctx.model.references {
        let accessor = ident(&reference.name)?;
        let path = ctx.model_path(&reference.model)?;
        accessors.push(quote! {
            pub fn #accessor(&self) -> &::std::sync::Arc<#path> {
                &self.#accessor
            }
        });
    }

    let deref = base_path.as_ref().map(|path| {
        quote! {
            impl ::std::ops::Deref for #name {
                type Target = #path;

                fn deref(&self) -> &Self::Target {
                    &self.base
                }
            }
        }
    });

    Ok(quote! {
        #(#attrs)*
        #vis struct #name {
            core: #rt::ModelCore,
            #[allow(dead_code)]
            subscriptions: #rt::SubscriptionSet,
            #[allow(dead_code)]
            this: ::std::sync::Weak<Self>,
            #base_field
            #(#fields,)*
        }

        impl #name {
            /// Every qualified name this model publishes.
            pub const OBSERVED_PROPERTIES: &'static [&'static str] = &[#(#published),*];

            #new

            /// Notification core, shared with derived models.
            pub fn core(&self) -> &#rt::ModelCore {
                &self.core
            }

            #(#accessors)*
        }

        #deref
    })
}
