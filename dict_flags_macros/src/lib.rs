//! Procedural macros for `dict_flags`.
//!
//! The [`FlagSignature`] derive turns a named-field struct with a
//! `Default` implementation into a flag signature: fields become
//! parameters, field types become type annotations and
//! `Default::default()` supplies the per-parameter defaults. Field
//! behaviour is tuned with `#[flag(...)]` attributes:
//!
//! - `#[flag(skip)]` omits the field from the signature;
//! - `#[flag(help = "...")]` attaches a help string;
//! - `#[flag(enumeration)]` maps a `clap::ValueEnum` field to an
//!   enumeration annotation.
//!
//! Field types with no matching flag kind are annotated as unsupported,
//! so schema derivation fails at definition time and the caller composes
//! those settings manually.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{ToTokens, quote};
use syn::{Data, DeriveInput, Fields, GenericArgument, PathArguments, Type, parse_macro_input};


/// Derive macro for `dict_flags::FlagSignature`.
#[proc_macro_derive(FlagSignature, attributes(flag))]
pub fn derive_flag_signature(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let ident = input.ident;

    let fields = match input.data {
        Data::Struct(data) => match data.fields {
            Fields::Named(named) => named.named,
            _ => {
                return syn::Error::new_spanned(
                    data.struct_token,
                    "FlagSignature requires named fields",
                )
                .to_compile_error()
                .into();
            }
        },
        _ => {
            return syn::Error::new_spanned(ident, "FlagSignature can only be derived for structs")
                .to_compile_error()
                .into();
        }
    };

    let mut params = Vec::new();
    for field in &fields {
        let attrs = match FieldAttrs::parse(field) {
            Ok(attrs) => attrs,
            Err(err) => return err.to_compile_error().into(),
        };
        if attrs.skip {
            continue;
        }
        let Some(name) = field.ident.as_ref() else {
            continue;
        };
        let name_str = name.to_string();
        let ty = &field.ty;

        let (spec, default) = if attrs.enumeration {
            (
                quote!(::dict_flags::TypeSpec::enumeration_of::<#ty>()),
                quote! {
                    match clap::ValueEnum::to_possible_value(&defaults.#name) {
                        ::core::option::Option::Some(possible) => ::dict_flags::ParamDefault::Value(
                            ::dict_flags::Value::from(possible.get_name()),
                        ),
                        ::core::option::Option::None => ::dict_flags::ParamDefault::Null,
                    }
                },
            )
        } else {
            let mapped = classify(ty);
            (
                spec_tokens(&mapped, ty),
                default_tokens(&mapped, &quote!(defaults.#name)),
            )
        };

        let help = attrs
            .help
            .map(|text| quote!(.with_help(#text)))
            .unwrap_or_default();
        params.push(quote! {
            sig.push(
                ::dict_flags::Param::new(#name_str)
                    .annotated(#spec)
                    .defaulted(#default)
                    #help,
            );
        });
    }

    let expanded = quote! {
        #[automatically_derived]
        impl ::dict_flags::FlagSignature for #ident {
            fn signature() -> ::dict_flags::Signature {
                let defaults = <#ident as ::core::default::Default>::default();
                let mut sig = ::dict_flags::Signature::new();
                #(#params)*
                sig
            }
        }
    };
    TokenStream::from(expanded)
}

#[derive(Default)]
struct FieldAttrs {
    skip: bool,
    enumeration: bool,
    help: Option<String>,
}

impl FieldAttrs {
    fn parse(field: &syn::Field) -> syn::Result<Self> {
        let mut attrs = Self::default();
        for attr in &field.attrs {
            if !attr.path().is_ident("flag") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    attrs.skip = true;
                    Ok(())
                } else if meta.path.is_ident("enumeration") {
                    attrs.enumeration = true;
                    Ok(())
                } else if meta.path.is_ident("help") {
                    let text: syn::LitStr = meta.value()?.parse()?;
                    attrs.help = Some(text.value());
                    Ok(())
                } else {
                    Err(meta.error("unsupported #[flag(...)] attribute"))
                }
            })?;
        }
        Ok(attrs)
    }
}

/// Scalar kinds permitted inside sequences and tuples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scalar {
    Bool,
    Int,
    Float,
    Str,
}

/// Result of mapping a field type to a flag annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Mapped {
    Scalar(Scalar),
    DateTime,
    Sequence(Scalar),
    Tuple(Vec<Scalar>),
    Optional(Box<Mapped>),
    Other,
}

fn classify(ty: &Type) -> Mapped {
    match ty {
        Type::Tuple(tuple) => {
            let mut scalars = Vec::with_capacity(tuple.elems.len());
            for elem in &tuple.elems {
                match classify(elem) {
                    Mapped::Scalar(scalar) => scalars.push(scalar),
                    _ => return Mapped::Other,
                }
            }
            if scalars.is_empty() {
                Mapped::Other
            } else {
                Mapped::Tuple(scalars)
            }
        }
        Type::Path(path) if path.qself.is_none() => {
            let Some(segment) = path.path.segments.last() else {
                return Mapped::Other;
            };
            if let Some(scalar) = classify_scalar(&segment.ident.to_string()) {
                return match segment.arguments {
                    PathArguments::None => Mapped::Scalar(scalar),
                    _ => Mapped::Other,
                };
            }
            match segment.ident.to_string().as_str() {
                "NaiveDateTime" => Mapped::DateTime,
                "Vec" => match generic_argument(segment) {
                    Some(inner) => match classify(inner) {
                        Mapped::Scalar(scalar) => Mapped::Sequence(scalar),
                        _ => Mapped::Other,
                    },
                    None => Mapped::Other,
                },
                "Option" => match generic_argument(segment) {
                    Some(inner) => match classify(inner) {
                        Mapped::Other | Mapped::Optional(_) => Mapped::Other,
                        mapped => Mapped::Optional(Box::new(mapped)),
                    },
                    None => Mapped::Other,
                },
                _ => Mapped::Other,
            }
        }
        _ => Mapped::Other,
    }
}

fn classify_scalar(ident: &str) -> Option<Scalar> {
    match ident {
        "bool" => Some(Scalar::Bool),
        "i8" | "i16" | "i32" | "i64" | "u8" | "u16" | "u32" => Some(Scalar::Int),
        "f32" | "f64" => Some(Scalar::Float),
        "String" => Some(Scalar::Str),
        _ => None,
    }
}

fn generic_argument(segment: &syn::PathSegment) -> Option<&Type> {
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    args.args.iter().find_map(|arg| match arg {
        GenericArgument::Type(ty) => Some(ty),
        _ => None,
    })
}

fn scalar_spec(scalar: Scalar) -> TokenStream2 {
    match scalar {
        Scalar::Bool => quote!(::dict_flags::TypeSpec::Bool),
        Scalar::Int => quote!(::dict_flags::TypeSpec::Int),
        Scalar::Float => quote!(::dict_flags::TypeSpec::Float),
        Scalar::Str => quote!(::dict_flags::TypeSpec::Str),
    }
}

fn scalar_kind(scalar: Scalar) -> TokenStream2 {
    match scalar {
        Scalar::Bool => quote!(::dict_flags::ScalarKind::Bool),
        Scalar::Int => quote!(::dict_flags::ScalarKind::Int),
        Scalar::Float => quote!(::dict_flags::ScalarKind::Float),
        Scalar::Str => quote!(::dict_flags::ScalarKind::Str),
    }
}

fn spec_tokens(mapped: &Mapped, ty: &Type) -> TokenStream2 {
    match mapped {
        Mapped::Scalar(scalar) => scalar_spec(*scalar),
        Mapped::DateTime => quote!(::dict_flags::TypeSpec::DateTime),
        Mapped::Sequence(scalar) => {
            let kind = scalar_kind(*scalar);
            quote!(::dict_flags::TypeSpec::Sequence(#kind))
        }
        Mapped::Tuple(scalars) => {
            let kinds = scalars.iter().map(|scalar| scalar_kind(*scalar));
            quote!(::dict_flags::TypeSpec::Tuple(::std::vec![#(#kinds),*]))
        }
        Mapped::Optional(inner) => {
            let inner_ty = match ty {
                Type::Path(path) => path
                    .path
                    .segments
                    .last()
                    .and_then(generic_argument)
                    .unwrap_or(ty),
                _ => ty,
            };
            let inner_spec = spec_tokens(inner, inner_ty);
            quote!(::dict_flags::TypeSpec::Optional(::std::boxed::Box::new(#inner_spec)))
        }
        Mapped::Other => {
            let display = ty.to_token_stream().to_string();
            quote!(::dict_flags::TypeSpec::Other(::std::string::String::from(#display)))
        }
    }
}

fn default_tokens(mapped: &Mapped, access: &TokenStream2) -> TokenStream2 {
    match mapped {
        Mapped::Scalar(_) | Mapped::DateTime | Mapped::Sequence(_) => {
            quote!(::dict_flags::ParamDefault::Value(::dict_flags::Value::from(#access)))
        }
        Mapped::Tuple(scalars) => {
            let elements = (0..scalars.len()).map(|i| {
                let index = syn::Index::from(i);
                quote!(::dict_flags::Value::from(#access.#index))
            });
            quote! {
                ::dict_flags::ParamDefault::Value(
                    ::dict_flags::Value::Seq(::std::vec![#(#elements),*]),
                )
            }
        }
        Mapped::Optional(inner) => {
            let inner_default = default_tokens(inner, &quote!(value));
            quote! {
                match #access {
                    ::core::option::Option::Some(value) => #inner_default,
                    ::core::option::Option::None => ::dict_flags::ParamDefault::Null,
                }
            }
        }
        Mapped::Other => quote!(::dict_flags::ParamDefault::Null),
    }
}
