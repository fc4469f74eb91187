//! Property emitter: storage, getters, setters and initializers.

use super::ModelContext;
use crate::error::Result;
use crate::syntax::{derived_ident, docs, expr, ident, ty};
use proc_macro2::TokenStream;
use quote::quote;
use rxgen_core::{EqualityPolicy, PartialPropertyDescriptor};

/// Stored type of a property field.
///
/// Mutable properties live in a `Field`; init-only properties are stored as
/// declared, and collections notify through their own attachment.
pub fn property_storage(ctx: &ModelContext<'_>, prop: &PartialPropertyDescriptor) -> Result<TokenStream> {
    let value = ty(&ctx.owner(&prop.name), &prop.ty)?;
    let rt = ctx.runtime;
    Ok(if prop.is_init_only() {
        quote! { #value }
    } else {
        quote! { #rt::Field<#value> }
    })
}

/// Getter and (for mutable properties) setter.
pub fn property_accessors(ctx: &ModelContext<'_>, prop: &PartialPropertyDescriptor) -> Result<TokenStream> {
    let name = ident(&prop.name)?;
    let value = ty(&ctx.owner(&prop.name), &prop.ty)?;
    let doc = docs(&prop.docs);

    if prop.is_init_only() {
        return Ok(quote! {
            #doc
            pub fn #name(&self) -> &#value {
                &self.#name
            }
        });
    }

    let setter = derived_ident("set_", &prop.name, "")?;
    let qualified = prop.qualified_name().to_string();
    let notify = if prop.batch_groups.is_empty() {
        quote! { self.core.notify(#qualified); }
    } else {
        let groups = &prop.batch_groups;
        quote! { self.core.notify_in(#qualified, &[#(#groups),*]); }
    };
    let store = match prop.equality {
        EqualityPolicy::SuppressUnchanged => quote! {
            if self.#name.replace_if_changed(value) {
                #notify
            }
        },
        EqualityPolicy::Always => quote! {
            self.#name.set(value);
            #notify
        },
    };

    Ok(quote! {
        #doc
        pub fn #name(&self) -> #value {
            self.#name.get()
        }

        pub fn #setter(&self, value: #value) {
            #store
        }
    })
}

/// Constructor statement creating the property's storage.
pub fn property_initializer(ctx: &ModelContext<'_>, prop: &PartialPropertyDescriptor) -> Result<TokenStream> {
    let name = ident(&prop.name)?;
    let value = ty(&ctx.owner(&prop.name), &prop.ty)?;
    let rt = ctx.runtime;
    let initial = match &prop.default {
        Some(text) => {
            let e = expr(text)?;
            quote! { #e }
        }
        None => quote! { ::std::default::Default::default() },
    };

    if !prop.is_init_only() {
        return Ok(quote! { let #name = #rt::Field::<#value>::new(#initial); });
    }
    let qualified = prop.qualified_name().to_string();
    let attach = prop
        .is_collection()
        .then(|| quote! { #name.attach(&core, #qualified); });
    Ok(quote! {
        let #name: #value = #initial;
        #attach
    })
}
