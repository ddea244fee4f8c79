#![allow(unreachable_pub)]
#![allow(clippy::needless_pass_by_value)]

//! # Macros
//!
//! Attribute macros shared by every crate of the workspace:
//!
//! * [`nsgen_error`] turns an enum into a `thiserror` error with a `.context(...)` extension.
//! * [`api_model`] and [`api_handler`] keep HTTP DTOs and handlers consistent with the
//!   `OpenAPI` document.
//! * [`nsgen_slice`] wraps feature state into a cheaply clonable, registrable slice.
//!
//! The examples below are `ignore`d because a proc-macro crate cannot use its own macros
//! in doctests.

mod macros;

use proc_macro::TokenStream;
use syn::{DeriveInput, ItemFn, ItemStruct, parse_macro_input};

/// Defines a standard API data model.
///
/// * **Derives**: adds `Debug`, `Serialize` and `Deserialize` when missing.
/// * **`OpenAPI`**: adds `utoipa::ToSchema` when the consuming crate enables `server`.
/// * **Serde Policy**: `rename_all = "camelCase"` and `deny_unknown_fields` unless overridden.
///
/// # Example
///
/// ```rust,ignore
/// use nsgen_derive::api_model;
///
/// #[api_model(deny_unknown_fields = false)]
/// pub struct DownloadLink {
///     pub token: String,
///     pub download_url: String,
/// }
/// ```
#[proc_macro_attribute]
pub fn api_model(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemStruct);
    macros::api::expand_api_model(attr.into(), input).into()
}

/// Bridges an Axum handler with its `OpenAPI` description.
///
/// Accepts the usual `utoipa::path` arguments (`post`, `path = "..."`, `request_body = ...`,
/// `responses(...)`, `tag = ...`). The `utoipa::path` attribute is only emitted when the
/// consuming crate enables its `server` feature.
///
/// # Example
///
/// ```rust,ignore
/// #[api_handler(
///     get,
///     path = "/health",
///     responses((status = OK, body = HealthResponse)),
///     tag = SYSTEM_TAG,
/// )]
/// pub async fn health_handler() -> impl IntoResponse { /* ... */ }
/// ```
#[proc_macro_attribute]
pub fn api_handler(args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    macros::api::expand_api_handler(args.into(), input).into()
}

/// Defines a domain-specific error enum.
///
/// # Generated Items
///
/// * `#[derive(Debug, thiserror::Error)]` when not already present.
/// * `<ErrorName>Ext` trait with `.context(...)` for `Result<T, ErrorName>` and for
///   `Result<T, SourceError>` of every variant that wraps a source.
/// * `From<SourceError>` for every variant with a `source` (or `#[source]`/`#[from]`) field.
/// * `From<&'static str>` and `From<String>` when an `Internal` variant exists.
/// * A private `format_context` helper for `#[error(...)]` strings.
///
/// # Requirements
///
/// Variants use named fields. Variants wrapping a source must also carry
/// `context: Option<Cow<'static, str>>`.
///
/// # Example
///
/// ```rust,ignore
/// use std::borrow::Cow;
///
/// #[nsgen_derive::nsgen_error]
/// pub enum StorageError {
///     #[error("I/O failure{}: {source}", format_context(.context))]
///     Io { source: std::io::Error, context: Option<Cow<'static, str>> },
///
///     #[error("Internal fault{}: {message}", format_context(.context))]
///     Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
///
/// fn read(path: &str) -> Result<Vec<u8>, StorageError> {
///     std::fs::read(path).context("Reading scratch file")
/// }
/// ```
#[proc_macro_attribute]
pub fn nsgen_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    macros::error::expand_derive(input).into()
}

/// Turns a struct into a feature slice handle.
///
/// Generates `<Name>Inner` with the declared fields, an `Arc`-backed `<Name>` wrapper with
/// `new`, `Deref` to the inner state, and the kernel's `FeatureSlice` implementation so the
/// slice can be registered in the API state.
///
/// # Example
/// ```rust,ignore
/// #[nsgen_derive::nsgen_slice]
/// pub struct Bundle {
///     config: BundleConfig,
/// }
///
/// let bundle = Bundle::new(BundleInner { config });
/// ```
#[proc_macro_attribute]
pub fn nsgen_slice(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(item as ItemStruct);
    macros::slice::expand_slice(input).into()
}
