//! Proc macros for the verconf crate.
//!
//! This crate provides `#[derive(Schema)]` for a single schema version and
//! `#[derive(Versioned)]` for the enum listing every version of a config type.

use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Expr, Fields, Lit, parse_macro_input, spanned::Spanned};

/// Options parsed from the `#[schema(...)]` attribute.
struct SchemaOptions {
    version: u32,
}

impl SchemaOptions {
    fn from_attrs(attrs: &[syn::Attribute]) -> syn::Result<Self> {
        let mut version = None;

        for attr in attrs {
            if attr.path().is_ident("schema") {
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("version") {
                        let value: Expr = meta.value()?.parse()?;
                        if let Expr::Lit(expr_lit) = value {
                            if let Lit::Int(lit_int) = expr_lit.lit {
                                version = Some(lit_int.base10_parse::<u32>()?);
                            } else {
                                return Err(syn::Error::new(
                                    expr_lit.span(),
                                    "version must be an integer",
                                ));
                            }
                        } else {
                            return Err(syn::Error::new(value.span(), "version must be a literal"));
                        }
                    } else {
                        return Err(syn::Error::new(
                            meta.path.span(),
                            format!("unknown schema attribute: {:?}", meta.path.get_ident()),
                        ));
                    }
                    Ok(())
                })?;
            }
        }

        let version = version.ok_or_else(|| {
            syn::Error::new(
                proc_macro2::Span::call_site(),
                "missing required attribute: #[schema(version = ...)]",
            )
        })?;

        Ok(Self { version })
    }
}

/// Derive macro for the `Schema` trait.
///
/// ```rust,ignore
/// #[derive(Debug, Serialize, Deserialize, JsonSchema, Schema)]
/// #[schema(version = 1)]
/// #[serde(deny_unknown_fields)]
/// struct AppConfigV1 {
///     name: String,
/// }
/// ```
///
/// This expands to:
///
/// ```rust,ignore
/// impl ::verconf::Schema for AppConfigV1 {
///     const VERSION: u32 = 1;
/// }
/// ```
#[proc_macro_derive(Schema, attributes(schema))]
pub fn derive_schema(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match derive_schema_impl(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn derive_schema_impl(input: DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let options = SchemaOptions::from_attrs(&input.attrs)?;
    let name = &input.ident;
    let version = options.version;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::verconf::Schema for #name #ty_generics #where_clause {
            const VERSION: u32 = #version;
        }
    })
}

/// Derive macro for the `Versioned` trait.
///
/// Applies to an enum with one single-field tuple variant per schema version,
/// listed oldest first. The last variant is the latest version.
///
/// ```rust,ignore
/// #[derive(Debug, Versioned)]
/// enum AppDocument {
///     V0(AppConfigV0),
///     V1(AppConfigV1),
/// }
/// ```
#[proc_macro_derive(Versioned)]
pub fn derive_versioned(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match derive_versioned_impl(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn derive_versioned_impl(input: DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;

    let Data::Enum(data) = &input.data else {
        return Err(syn::Error::new(
            input.span(),
            "Versioned can only be derived for enums",
        ));
    };

    let mut idents = Vec::new();
    let mut types = Vec::new();
    for variant in &data.variants {
        match &variant.fields {
            Fields::Unnamed(fields) if fields.unnamed.len() == 1 => {
                idents.push(variant.ident.clone());
                types.push(fields.unnamed[0].ty.clone());
            }
            _ => {
                return Err(syn::Error::new(
                    variant.span(),
                    "each variant must wrap exactly one schema type, e.g. `V0(ConfigV0)`",
                ));
            }
        }
    }

    let (Some(latest_ident), Some(latest_ty)) = (idents.last(), types.last()) else {
        return Err(syn::Error::new(
            input.span(),
            "Versioned enums need at least one variant",
        ));
    };

    Ok(quote! {
        impl ::verconf::Versioned for #name {
            type Latest = #latest_ty;

            fn descriptors() -> ::std::result::Result<
                ::std::vec::Vec<::verconf::SchemaDescriptor>,
                ::verconf::Error,
            > {
                ::std::result::Result::Ok(::std::vec![
                    #( ::verconf::SchemaDescriptor::of::<#types>()? ),*
                ])
            }

            fn version(&self) -> u32 {
                match self {
                    #( Self::#idents(_) => <#types as ::verconf::Schema>::VERSION, )*
                }
            }

            fn decode(
                version: u32,
                table: ::verconf::toml::Table,
            ) -> ::std::result::Result<::std::option::Option<Self>, ::verconf::toml::de::Error> {
                #(
                    if version == <#types as ::verconf::Schema>::VERSION {
                        return ::verconf::schema::decode_schema::<#types>(table)
                            .map(|document| ::std::option::Option::Some(Self::#idents(document)));
                    }
                )*
                ::std::result::Result::Ok(::std::option::Option::None)
            }

            fn encode(&self) -> ::std::result::Result<::verconf::toml::Table, ::verconf::Error> {
                match self {
                    #( Self::#idents(document) => ::verconf::schema::encode_schema(document), )*
                }
            }

            #[allow(unreachable_patterns)]
            fn into_latest(self) -> ::std::result::Result<Self::Latest, Self> {
                match self {
                    Self::#latest_ident(document) => ::std::result::Result::Ok(document),
                    other => ::std::result::Result::Err(other),
                }
            }

            fn from_latest(latest: Self::Latest) -> Self {
                Self::#latest_ident(latest)
            }
        }
    })
}
