//! Derive macro for error types.
//!
//! # Usage
//!
//! ```ignore
//! use pidgeon_derive::Error;
//!
//! #[derive(Debug, Error)]
//! pub enum RunError {
//!     #[error("unknown opcode 0x{opcode:02x} at offset {offset}")]
//!     UnknownOpcode { opcode: u8, offset: usize },
//!
//!     #[error("bad immediate {0}")]
//!     BadImmediate(String),
//!
//!     #[error("empty program")]
//!     Empty,
//! }
//! ```
//!
//! Only the fields a message actually mentions are passed to `write!`, so a
//! variant may carry diagnostic fields that its message leaves out.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{ToTokens, format_ident, quote};
use syn::{Data, DeriveInput, Fields, Lit, Meta, parse_macro_input};

pub fn derive_error(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match expand_error_derive(&input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_error_derive(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    match &input.data {
        Data::Enum(data_enum) => {
            let mut display_arms = Vec::with_capacity(data_enum.variants.len());

            for variant in &data_enum.variants {
                let variant_name = &variant.ident;
                let error_msg = extract_error_message_from_attrs(
                    &variant.attrs,
                    &variant.ident,
                    &format!("variant `{}`", variant.ident),
                )?;

                display_arms.push(display_arm(variant_name, &variant.fields, &error_msg));
            }

            Ok(quote! {
                impl #impl_generics ::std::fmt::Display for #name #ty_generics #where_clause {
                    fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                        match self {
                            #(#display_arms)*
                        }
                    }
                }

                impl #impl_generics ::std::error::Error for #name #ty_generics #where_clause {}
            })
        }
        Data::Struct(data_struct) => {
            let error_msg = extract_error_message_from_attrs(
                &input.attrs,
                &input.ident,
                &format!("type `{}`", input.ident),
            )?;

            let display_body = match &data_struct.fields {
                Fields::Unit => quote! { write!(f, #error_msg) },
                Fields::Named(fields) => {
                    let used: Vec<_> = fields
                        .named
                        .iter()
                        .filter_map(|field| field.ident.as_ref())
                        .filter(|ident| mentions(&error_msg, &ident.to_string()))
                        .collect();
                    quote! {
                        write!(f, #error_msg, #(#used = self.#used),*)
                    }
                }
                Fields::Unnamed(fields) => {
                    let format_str = convert_positional_to_named(&error_msg, fields.unnamed.len());
                    let (idents, indices): (Vec<_>, Vec<_>) = (0..fields.unnamed.len())
                        .filter(|i| mentions(&error_msg, &i.to_string()))
                        .map(|i| (format_ident!("f{}", i), syn::Index::from(i)))
                        .unzip();
                    quote! {
                        write!(f, #format_str, #(#idents = self.#indices),*)
                    }
                }
            };

            Ok(quote! {
                impl #impl_generics ::std::fmt::Display for #name #ty_generics #where_clause {
                    fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                        #display_body
                    }
                }

                impl #impl_generics ::std::error::Error for #name #ty_generics #where_clause {}
            })
        }
        Data::Union(_) => Err(syn::Error::new_spanned(
            input,
            "Error derive does not support unions",
        )),
    }
}

/// Builds the `Display` match arm for one enum variant.
fn display_arm(variant_name: &syn::Ident, fields: &Fields, error_msg: &str) -> TokenStream2 {
    match fields {
        Fields::Unit => quote! {
            Self::#variant_name => write!(f, #error_msg),
        },
        Fields::Unnamed(fields) => {
            let format_str = convert_positional_to_named(error_msg, fields.unnamed.len());
            let mut binders = Vec::with_capacity(fields.unnamed.len());
            let mut used = Vec::new();
            for i in 0..fields.unnamed.len() {
                if mentions(error_msg, &i.to_string()) {
                    let ident = format_ident!("f{}", i);
                    binders.push(ident.to_token_stream());
                    used.push(ident);
                } else {
                    binders.push(quote! { _ });
                }
            }
            quote! {
                Self::#variant_name(#(#binders),*) => write!(f, #format_str, #(#used = #used),*),
            }
        }
        Fields::Named(fields) => {
            let used: Vec<_> = fields
                .named
                .iter()
                .filter_map(|field| field.ident.as_ref())
                .filter(|ident| mentions(error_msg, &ident.to_string()))
                .collect();
            quote! {
                Self::#variant_name { #(#used,)* .. } => write!(f, #error_msg, #(#used = #used),*),
            }
        }
    }
}

/// Returns true when `msg` interpolates the argument `name` (`{name}` or `{name:...}`).
fn mentions(msg: &str, name: &str) -> bool {
    msg.contains(&format!("{{{name}}}")) || msg.contains(&format!("{{{name}:"))
}

/// Extracts the message from an `#[error("...")]` attribute.
fn extract_error_message_from_attrs<T: ToTokens>(
    attrs: &[syn::Attribute],
    target: &T,
    target_desc: &str,
) -> syn::Result<String> {
    for attr in attrs {
        if !attr.path().is_ident("error") {
            continue;
        }

        let Meta::List(meta_list) = &attr.meta else {
            return Err(syn::Error::new_spanned(
                &attr.meta,
                "invalid #[error] attribute; use #[error(\"message\")] to describe the error",
            ));
        };

        let lit = syn::parse2::<Lit>(meta_list.tokens.clone()).map_err(|_| {
            syn::Error::new_spanned(
                &attr.meta,
                "failed to parse #[error] attribute; expected a string literal like #[error(\"stack overflow at {offset}\")]",
            )
        })?;

        return match lit {
            Lit::Str(lit_str) => Ok(lit_str.value()),
            _ => Err(syn::Error::new_spanned(
                &attr.meta,
                "invalid #[error] attribute: message must be a string literal",
            )),
        };
    }

    Err(syn::Error::new_spanned(
        target,
        format!(
            "missing #[error(\"...\")] attribute on {}; every error variant must declare a display message",
            target_desc
        ),
    ))
}

/// Rewrites positional arguments `{0}` / `{0:x}` to named ones `{f0}` / `{f0:x}`.
fn convert_positional_to_named(format_str: &str, field_count: usize) -> String {
    let mut result = format_str.to_string();
    for i in (0..field_count).rev() {
        result = result
            .replace(&format!("{{{i}}}"), &format!("{{f{i}}}"))
            .replace(&format!("{{{i}:"), &format!("{{f{i}:"));
    }
    result
}
