//! Callback emitter: `observe_*` registration methods for hooked properties.

use super::ModelContext;
use crate::error::Result;
use crate::syntax::{derived_ident, ident, ty};
use proc_macro2::TokenStream;
use quote::quote;
use rxgen_core::PartialPropertyDescriptor;

/// `observe_<name>` and `observe_<name>_async` methods.
///
/// Callbacks receive the new value. Collections have no single value to hand
/// over, so their callbacks receive the model instead.
pub fn property_callbacks(ctx: &ModelContext<'_>, prop: &PartialPropertyDescriptor) -> Result<TokenStream> {
    if !(prop.callback || prop.callback_async) || prop.is_inert() {
        return Ok(TokenStream::new());
    }
    let rt = ctx.runtime;
    let name = ident(&prop.name)?;
    let qualified = prop.qualified_name().to_string();
    let (argument, value) = if prop.is_collection() {
        (quote! { ::std::sync::Arc<Self> }, quote! { this })
    } else {
        let value_ty = ty(&ctx.owner(&prop.name), &prop.ty)?;
        (quote! { #value_ty }, quote! { this.#name() })
    };

    let mut out = TokenStream::new();
    if prop.callback {
        let method = derived_ident("observe_", &prop.name, "")?;
        out.extend(quote! {
            /// Run `callback` after every change of this property.
            pub fn #method<F>(&self, callback: F) -> #rt::Subscription
            where
                F: Fn(#argument) + Send + Sync + 'static,
            {
                self.core.observe_with(&[#qualified], self.this.clone(), move |this: ::std::sync::Arc<Self>| {
                    callback(#value)
                })
            }
        });
    }
    if prop.callback_async {
        let method = derived_ident("observe_", &prop.name, "_async")?;
        out.extend(quote! {
            /// Spawn `callback` after every change of this property.
            pub fn #method<F, Fut>(&self, callback: F) -> #rt::Subscription
            where
                F: Fn(#argument) -> Fut + Send + Sync + 'static,
                Fut: ::std::future::Future<Output = ()> + Send + 'static,
            {
                self.core.observe_with(&[#qualified], self.this.clone(), move |this: ::std::sync::Arc<Self>| {
                    #rt::spawn(callback(#value))
                })
            }
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::test_support::fixture;

    const INBOX: &str = r#"
        #[model]
        pub struct Inbox {
            #[observable(callback, callback_async)]
            unread: u32,
            #[observable(init, callback)]
            messages: ObservableList<String>,
            #[observable]
            quiet: bool,
        }
    "#;

    #[test]
    fn test_value_callbacks() {
        let f = fixture(INBOX);
        let ctx = f.context("Inbox");
        let out = property_callbacks(&ctx, ctx.model.property("unread").unwrap())
            .unwrap()
            .to_string();
        assert!(out.contains("pub fn observe_unread < F >"));
        assert!(out.contains("pub fn observe_unread_async < F , Fut >"));
        assert!(out.contains(&quote!(F: Fn(u32) + Send + Sync + 'static).to_string()));
        assert!(out.contains(&quote!(callback(this.unread())).to_string()));
        assert!(out.contains(&quote!(::rxgen_runtime::spawn(callback(this.unread()))).to_string()));
    }

    #[test]
    fn test_collection_callback_receives_model() {
        let f = fixture(INBOX);
        let ctx = f.context("Inbox");
        let out = property_callbacks(&ctx, ctx.model.property("messages").unwrap())
            .unwrap()
            .to_string();
        assert!(out.contains(&quote!(F: Fn(::std::sync::Arc<Self>) + Send + Sync + 'static).to_string()));
        assert!(!out.contains("observe_messages_async"));
    }

    #[test]
    fn test_no_callback_requested() {
        let f = fixture(INBOX);
        let ctx = f.context("Inbox");
        assert!(property_callbacks(&ctx, ctx.model.property("quiet").unwrap())
            .unwrap()
            .is_empty());
    }
}
