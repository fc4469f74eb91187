//! Command emitter: construction, guard wiring, triggers and accessors.

use super::{name_list, ModelContext};
use crate::error::Result;
use crate::syntax::{docs, ident, ty};
use proc_macro2::TokenStream;
use quote::quote;
use rxgen_core::CommandDescriptor;

/// Constructor statements creating a command bound to the model.
///
/// The execute body and guard hold the model weakly; the command publishes
/// its executing state under its own qualified name and re-evaluates the
/// guard whenever a name the guard reads changes.
pub fn command_initializer(ctx: &ModelContext<'_>, command: &CommandDescriptor) -> Result<TokenStream> {
    let owner = ctx.owner(&command.name);
    let rt = ctx.runtime;
    let name = ident(&command.name)?;
    let declared = ty(&owner, &command.ty)?;
    let execute = ctx.method(&command.execute)?;
    let execute_name = ident(&execute.name)?;
    let asynchronous = command.shape.asynchronous;

    let parameter = command
        .shape
        .parameter
        .as_deref()
        .map(|p| ty(&owner, p))
        .transpose()?;
    let parameter_pat = match &parameter {
        Some(p) => quote! { parameter: #p },
        None => quote! { _: () },
    };
    let args: Vec<TokenStream> = execute
        .params
        .iter()
        .map(|p| match (p.is_cancellation_token(), asynchronous) {
            (true, true) => quote! { token },
            (true, false) => quote! { #rt::CancellationToken::new() },
            (false, _) => quote! { parameter },
        })
        .collect();

    let mut init = if asynchronous {
        let token_pat = if execute.takes_cancellation() {
            quote! { token: #rt::CancellationToken }
        } else {
            quote! { _: #rt::CancellationToken }
        };
        quote! {
            <#declared>::bound(weak.clone(), |this: ::std::sync::Arc<Self>, #parameter_pat, #token_pat| async move {
                this.#execute_name(#(#args),*).await
            })
        }
    } else {
        quote! {
            <#declared>::bound(weak.clone(), |this: &Self, #parameter_pat| this.#execute_name(#(#args),*))
        }
    };
    if command.shape.cancelable {
        init = quote! { #init.with_cancellation() };
    }
    if let Some(guard) = &command.can_execute {
        let method = ctx.method(guard)?;
        let guard_name = ident(&method.name)?;
        let (pattern, guard_args) = match (&parameter, method.value_params().is_empty()) {
            (Some(p), false) => (quote! { parameter: &#p }, quote! { parameter.clone() }),
            (Some(p), true) => (quote! { _: &#p }, TokenStream::new()),
            (None, _) => (quote! { _: &() }, TokenStream::new()),
        };
        init = quote! {
            #init.with_guard(weak.clone(), |this: &Self, #pattern| this.#guard_name(#guard_args))
        };
    }

    let qualified = command.qualified_name().to_string();
    let observing = ctx
        .usage
        .commands
        .get(&command.name)
        .filter(|usage| !usage.guard.is_empty())
        .map(|usage| {
            let names = name_list(&usage.guard);
            quote! { subscriptions.add(#name.observing(#names)); }
        });

    Ok(quote! {
        let #name = #init;
        #name.attach(&core, #qualified);
        #observing
    })
}

/// Constructor statement executing the command when a trigger name changes.
pub fn command_triggers(ctx: &ModelContext<'_>, command: &CommandDescriptor) -> Result<TokenStream> {
    let Some(usage) = ctx.usage.commands.get(&command.name) else {
        return Ok(TokenStream::new());
    };
    if usage.triggers.is_empty() {
        return Ok(TokenStream::new());
    }
    let rt = ctx.runtime;
    let name = ident(&command.name)?;
    let names = name_list(&usage.triggers);
    let run = if command.shape.asynchronous {
        quote! {
            #rt::spawn(async move {
                this.#name.execute(()).await;
            });
        }
    } else {
        quote! { this.#name.execute(()); }
    };
    Ok(quote! {
        subscriptions.add(core.observe_with(#names, weak.clone(), |this: ::std::sync::Arc<Self>| {
            #run
        }));
    })
}

pub fn command_accessor(ctx: &ModelContext<'_>, command: &CommandDescriptor) -> Result<TokenStream> {
    let name = ident(&command.name)?;
    let declared = ty(&ctx.owner(&command.name), &command.ty)?;
    let doc = docs(&command.docs);
    Ok(quote! {
        #doc
        pub fn #name(&self) -> &#declared {
            &self.#name
        }
    })
}
