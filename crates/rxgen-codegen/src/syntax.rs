//! Conversions from rendered descriptor text back to syntax.

use crate::error::{CodegenError, Result};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{Expr, Ident, Path, Type};

/// Identifier for a member or method name.
pub(crate) fn ident(name: &str) -> Result<Ident> {
    syn::parse_str(name).map_err(|e| invalid("identifier", name, e))
}

/// Identifier derived from a member name (`set_value`, `observe_value_async`).
pub(crate) fn derived_ident(prefix: &str, name: &str, suffix: &str) -> Result<Ident> {
    let bare = name.strip_prefix("r#").unwrap_or(name);
    ident(&format!("{}{}{}", prefix, bare, suffix))
}

/// Type of a member, as rendered by the analyzer.
pub(crate) fn ty(owner: &str, text: &str) -> Result<Type> {
    syn::parse_str(text).map_err(|e| CodegenError::InvalidType {
        owner: owner.to_string(),
        ty: text.to_string(),
        message: e.to_string(),
    })
}

pub(crate) fn path(text: &str) -> Result<Path> {
    syn::parse_str(text).map_err(|e| invalid("path", text, e))
}

pub(crate) fn expr(text: &str) -> Result<Expr> {
    syn::parse_str(text).map_err(|e| invalid("expression", text, e))
}

/// Path of a trait named in `implements`, resolved against the model's module
/// when it is a bare name.
pub(crate) fn trait_path(module: &str, text: &str) -> Result<Path> {
    if text.contains("::") {
        path(text)
    } else {
        path(&format!("{}::{}", module, text))
    }
}

/// `#[doc]` attributes for stored doc lines.
pub(crate) fn docs(lines: &[String]) -> TokenStream {
    let lines = lines.iter().map(|line| {
        if line.is_empty() {
            String::new()
        } else {
            format!(" {}", line)
        }
    });
    quote! { #(#[doc = #lines])* }
}

fn invalid(kind: &'static str, text: &str, err: syn::Error) -> CodegenError {
    CodegenError::InvalidSyntax {
        kind,
        text: text.to_string(),
        message: err.to_string(),
    }
}
