use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse_macro_input, Attribute, Data, DeriveInput, Fields, GenericArgument, PathArguments,
    Type, Visibility,
};

/// Derive macro for `beanmap_api::Bean`.
///
/// Generates `describe() -> BeanInfo` from the struct declaration:
///
/// - every `pub` field becomes a field member (in-place access);
/// - `#[bean(property)]` exposes a field as a getter/setter property,
///   `#[bean(readonly)]` as a getter-only property;
/// - `#[bean(parent)]` marks the embedded ancestor;
/// - `#[bean(nested)]` records that the member's value type is itself a bean;
/// - `#[bean(skip)]` hides a field; private fields are hidden unless marked.
///
/// Members of type `Option<V>` are nullable with value type `V`.
///
/// Struct-level `#[bean(abstract_type)]` marks a type that is only mapped
/// through its descendants; `#[bean(no_default)]` a concrete type without a
/// parameterless constructor. Otherwise the struct must implement `Default`.
///
/// # Example
///
/// ```ignore
/// #[derive(Bean, Default)]
/// pub struct Order {
///     #[bean(parent)]
///     pub base: Document,
///     pub number: String,
///     #[bean(nested)]
///     pub customer: Option<Customer>,
///     #[bean(property)]
///     total: i64,
/// }
/// ```
#[proc_macro_derive(Bean, attributes(bean))]
pub fn derive_bean(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match derive_impl(&input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

#[derive(Default)]
struct StructAttrs {
    abstract_type: bool,
    no_default: bool,
}

#[derive(Default)]
struct FieldAttrs {
    parent: bool,
    skip: bool,
    property: bool,
    readonly: bool,
    nested: bool,
}

fn derive_impl(input: &DeriveInput) -> Result<TokenStream2, syn::Error> {
    let name = &input.ident;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            Fields::Unit => return derive_for(input, &[], &[], &[]),
            Fields::Unnamed(_) => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Bean only supports structs with named fields",
                ));
            }
        },
        _ => return Err(syn::Error::new_spanned(name, "Bean only supports structs")),
    };

    let mut parents = Vec::new();
    let mut properties = Vec::new();
    let mut members = Vec::new();

    for field in fields {
        let field_name = field
            .ident
            .as_ref()
            .ok_or_else(|| syn::Error::new_spanned(field, "expected named field"))?;
        let field_name_str = field_name.to_string();
        let attrs = field_attrs(&field.attrs)?;

        if attrs.skip {
            continue;
        }

        if attrs.parent {
            let parent_ty = &field.ty;
            parents.push(quote! {
                ::beanmap_api::ParentLink::new(
                    <#parent_ty as ::beanmap_api::Bean>::describe,
                    |value| {
                        value
                            .downcast_ref::<Self>()
                            .map(|this| &this.#field_name as &dyn ::std::any::Any)
                    },
                    |value| {
                        value
                            .downcast_mut::<Self>()
                            .map(|this| &mut this.#field_name as &mut dyn ::std::any::Any)
                    },
                )
            });
            continue;
        }

        let (value_ty, nullable) = match option_inner(&field.ty) {
            Some(inner) => (inner, true),
            None => (&field.ty, false),
        };

        let nested = if attrs.nested {
            quote! { .with_nested(<#value_ty as ::beanmap_api::Bean>::describe) }
        } else {
            quote! {}
        };

        if attrs.property || attrs.readonly {
            let getter = if nullable {
                quote! {
                    .optional_getter(|this: &Self| ::std::clone::Clone::clone(&this.#field_name))
                }
            } else {
                quote! {
                    .getter(|this: &Self| ::std::clone::Clone::clone(&this.#field_name))
                }
            };
            let setter = match (attrs.readonly, nullable) {
                (true, _) => quote! {},
                (false, true) => quote! {
                    .optional_setter(
                        |this: &mut Self, value: ::std::option::Option<#value_ty>| {
                            this.#field_name = value
                        },
                    )
                },
                (false, false) => quote! {
                    .setter(|this: &mut Self, value: #value_ty| this.#field_name = value)
                },
            };
            properties.push(quote! {
                ::beanmap_api::member::PropertyAccessor::<Self, #value_ty>::new(#field_name_str)
                    #getter
                    #setter
                    #nested
            });
            continue;
        }

        if !matches!(field.vis, Visibility::Public(_)) {
            continue;
        }

        let constructor = if nullable {
            quote! { optional }
        } else {
            quote! { required }
        };
        members.push(quote! {
            ::beanmap_api::member::FieldAccessor::<Self, #value_ty>::#constructor(
                #field_name_str,
                |this: &Self| &this.#field_name,
                |this: &mut Self| &mut this.#field_name,
            )
            #nested
        });
    }

    derive_for(input, &parents, &properties, &members)
}

fn derive_for(
    input: &DeriveInput,
    parents: &[TokenStream2],
    properties: &[TokenStream2],
    fields: &[TokenStream2],
) -> Result<TokenStream2, syn::Error> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let attrs = struct_attrs(&input.attrs)?;

    if attrs.abstract_type && attrs.no_default {
        return Err(syn::Error::new_spanned(
            name,
            "#[bean(abstract_type)] and #[bean(no_default)] are mutually exclusive",
        ));
    }

    let construction = if attrs.abstract_type {
        quote! { .abstract_type() }
    } else if attrs.no_default {
        quote! {}
    } else {
        quote! { .with_constructor(::beanmap_api::default_constructor::<Self>) }
    };

    Ok(quote! {
        impl #impl_generics ::beanmap_api::Bean for #name #ty_generics #where_clause {
            fn describe() -> ::beanmap_api::BeanInfo {
                ::beanmap_api::BeanInfo::of::<Self>()
                    #construction
                    #(.with_parent(#parents))*
                    #(.with_property(#properties))*
                    #(.with_field(#fields))*
            }
        }
    })
}

fn struct_attrs(attrs: &[Attribute]) -> Result<StructAttrs, syn::Error> {
    let mut out = StructAttrs::default();
    for attr in attrs {
        if !attr.path().is_ident("bean") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("abstract_type") {
                out.abstract_type = true;
            } else if meta.path.is_ident("no_default") {
                out.no_default = true;
            } else {
                return Err(meta.error("unknown struct attribute (expected abstract_type or no_default)"));
            }
            Ok(())
        })?;
    }
    Ok(out)
}

fn field_attrs(attrs: &[Attribute]) -> Result<FieldAttrs, syn::Error> {
    let mut out = FieldAttrs::default();
    for attr in attrs {
        if !attr.path().is_ident("bean") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("parent") {
                out.parent = true;
            } else if meta.path.is_ident("skip") {
                out.skip = true;
            } else if meta.path.is_ident("property") {
                out.property = true;
            } else if meta.path.is_ident("readonly") {
                out.readonly = true;
            } else if meta.path.is_ident("nested") {
                out.nested = true;
            } else {
                return Err(meta.error(
                    "unknown field attribute (expected parent, skip, property, readonly or nested)",
                ));
            }
            Ok(())
        })?;
    }
    Ok(out)
}

/// `V` for a field declared as `Option<V>` (by last path segment).
fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(tp) = ty else { return None };
    if tp.qself.is_some() {
        return None;
    }
    let segment = tp.path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first() {
        Some(GenericArgument::Type(inner)) if args.args.len() == 1 => Some(inner),
        _ => None,
    }
}
