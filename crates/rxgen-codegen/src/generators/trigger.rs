//! Trigger emitter: property hooks wired in the constructor.

use super::ModelContext;
use crate::error::Result;
use crate::syntax::ident;
use proc_macro2::TokenStream;
use quote::quote;
use rxgen_core::{PartialPropertyDescriptor, TriggerDescriptor, TriggerMode};
use syn::Path;

/// Constructor statements subscribing the property's trigger hooks.
///
/// Inert properties never change, so their hooks are not wired.
pub fn property_triggers(ctx: &ModelContext<'_>, prop: &PartialPropertyDescriptor) -> Result<TokenStream> {
    if prop.triggers.is_empty() || prop.is_inert() {
        return Ok(TokenStream::new());
    }
    let qualified = prop.qualified_name().to_string();
    let hooks = prop
        .triggers
        .iter()
        .map(|t| hook(ctx.runtime, t))
        .collect::<Result<Vec<_>>>()?;
    Ok(quote! {
        #(
            subscriptions.add(core.observe_with(&[#qualified], weak.clone(), |this: ::std::sync::Arc<Self>| {
                #hooks
            }));
        )*
    })
}

fn hook(runtime: &Path, trigger: &TriggerDescriptor) -> Result<TokenStream> {
    let method = ident(&trigger.method)?;
    let call = match trigger.mode {
        TriggerMode::Sync => quote! { this.#method(); },
        TriggerMode::Async => quote! {
            #runtime::spawn(async move {
                this.#method().await;
            });
        },
    };
    Ok(match &trigger.guard {
        Some(guard) => {
            let guard = ident(guard)?;
            quote! {
                if this.#guard() {
                    #call
                }
            }
        }
        None => call,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::test_support::fixture;

    const DRAFT: &str = r#"
        #[model]
        pub struct Draft {
            #[observable]
            #[trigger(persist, guard = "is_dirty")]
            #[trigger(method = "upload", asynchronous)]
            body: String,
            #[observable(init)]
            #[trigger(persist)]
            id: u64,
        }

        impl Draft {
            fn persist(&self) {}
            fn is_dirty(&self) -> bool { true }
            async fn upload(&self) {}
        }
    "#;

    #[test]
    fn test_sync_and_async_hooks() {
        let f = fixture(DRAFT);
        let ctx = f.context("Draft");
        let out = property_triggers(&ctx, ctx.model.property("body").unwrap()).unwrap();
        let expected = quote! {
            subscriptions.add(core.observe_with(&["Model.Body"], weak.clone(), |this: ::std::sync::Arc<Self>| {
                if this.is_dirty() {
                    this.persist();
                }
            }));
            subscriptions.add(core.observe_with(&["Model.Body"], weak.clone(), |this: ::std::sync::Arc<Self>| {
                ::rxgen_runtime::spawn(async move {
                    this.upload().await;
                });
            }));
        };
        assert_eq!(out.to_string(), expected.to_string());
    }

    #[test]
    fn test_inert_property_is_not_wired() {
        let f = fixture(DRAFT);
        let ctx = f.context("Draft");
        let out = property_triggers(&ctx, ctx.model.property("id").unwrap()).unwrap();
        assert!(out.is_empty());
    }
}
