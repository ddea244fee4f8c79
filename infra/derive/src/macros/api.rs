use crate::macros::error::derived_traits;
use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::parse::Parser;
use syn::{Attribute, ItemFn, ItemStruct, LitBool, LitStr};

/// Options accepted by `#[api_model(...)]`.
#[derive(Default)]
struct ModelOptions {
    rename_all: Option<LitStr>,
    deny_unknown_fields: Option<LitBool>,
}

/// Serde attributes already written by hand on the struct.
#[derive(Default)]
struct ExistingSerde {
    rename_all: Option<LitStr>,
    deny_unknown_fields: bool,
}

/// Expands `#[api_model]`: serde/schema derives plus the camelCase wire policy.
pub fn expand_api_model(args: TokenStream, input: ItemStruct) -> TokenStream {
    match model_attributes(args, &input) {
        Ok(attrs) => quote! {
            #attrs
            #input
        },
        Err(err) => err.to_compile_error(),
    }
}

/// Expands `#[api_handler]`: documents the handler for `utoipa` under the `server` feature.
pub fn expand_api_handler(args: TokenStream, input: ItemFn) -> TokenStream {
    let ItemFn { attrs, vis, sig, block } = input;

    quote! {
        #(#attrs)*
        #[allow(clippy::unused_async)]
        #[cfg_attr(feature = "server", ::utoipa::path(#args))]
        #vis #sig #block
    }
}

fn model_attributes(args: TokenStream, input: &ItemStruct) -> syn::Result<TokenStream> {
    let options = parse_options(args)?;
    let existing = existing_serde(&input.attrs)?;
    let derives = derived_traits(&input.attrs);

    let mut missing = Vec::new();
    for (name, path) in [
        ("Debug", quote! { Debug }),
        ("Serialize", quote! { ::serde::Serialize }),
        ("Deserialize", quote! { ::serde::Deserialize }),
    ] {
        if !derives.contains(name) {
            missing.push(path);
        }
    }
    let derive_attr =
        if missing.is_empty() { quote! {} } else { quote! { #[derive(#(#missing),*)] } };

    let schema_attr = if derives.contains("ToSchema") {
        quote! {}
    } else {
        quote! { #[cfg_attr(feature = "server", derive(::utoipa::ToSchema))] }
    };

    let rename_all =
        options.rename_all.unwrap_or_else(|| LitStr::new("camelCase", Span::call_site()));
    let rename_attr = match &existing.rename_all {
        Some(written) if written.value() != rename_all.value() => {
            return Err(syn::Error::new_spanned(
                written,
                "Conflicting serde rename_all; remove it or pass the same value to api_model",
            ));
        },
        Some(_) => quote! {},
        None => quote! { #[serde(rename_all = #rename_all)] },
    };

    let deny_unknown = options.deny_unknown_fields.as_ref().is_none_or(LitBool::value);
    let deny_attr = match (existing.deny_unknown_fields, deny_unknown) {
        (true, false) => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "deny_unknown_fields is already set via serde; remove it before disabling",
            ));
        },
        (false, true) => quote! { #[serde(deny_unknown_fields)] },
        _ => quote! {},
    };

    Ok(quote! {
        #derive_attr
        #schema_attr
        #rename_attr
        #deny_attr
    })
}

fn parse_options(args: TokenStream) -> syn::Result<ModelOptions> {
    let mut options = ModelOptions::default();

    let parser = syn::meta::parser(|meta| {
        if meta.path.is_ident("rename_all") {
            if options.rename_all.is_some() {
                return Err(meta.error("Duplicate argument `rename_all`"));
            }
            options.rename_all = Some(meta.value()?.parse()?);
            Ok(())
        } else if meta.path.is_ident("deny_unknown_fields") {
            if options.deny_unknown_fields.is_some() {
                return Err(meta.error("Duplicate argument `deny_unknown_fields`"));
            }
            options.deny_unknown_fields = Some(meta.value()?.parse()?);
            Ok(())
        } else {
            Err(meta.error("Unsupported argument; expected rename_all or deny_unknown_fields"))
        }
    });
    parser.parse2(args)?;

    Ok(options)
}

fn existing_serde(attrs: &[Attribute]) -> syn::Result<ExistingSerde> {
    let mut existing = ExistingSerde::default();

    for attr in attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") {
                existing.rename_all = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("deny_unknown_fields") {
                existing.deny_unknown_fields = true;
            } else if meta.input.peek(syn::Token![=]) {
                let _: syn::Expr = meta.value()?.parse()?;
            } else if meta.input.peek(syn::token::Paren) {
                let _nested;
                syn::parenthesized!(_nested in meta.input);
            }
            Ok(())
        })?;
    }

    Ok(existing)
}
