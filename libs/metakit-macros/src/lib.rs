use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse_macro_input, parse_quote, Fields, ImplItem, Item, ItemEnum, ItemImpl, ItemStruct,
    ItemTrait, TraitItem, Type,
};

mod args;
mod members;
mod normalize;

use args::MetatypeArgs;
use members::{executable_descriptor, field_descriptor, MemberAttrs};
use normalize::{combine, reject_self_param};

/// Describes a struct, enum or trait and registers the description for discovery.
///
/// ```rust,ignore
/// #[metatype(interfaces = [Repository], annotations = [Table("users")])]
/// pub struct UserRepo {
///     #[annotate(Column("id"))]
///     id: u64,
/// }
/// ```
///
/// Parameters: `annotation`, `default`, `superclass = Path`,
/// `interfaces = [Path, ..]`, `extends = [Path, ..]` (traits),
/// `annotations = [Expr, ..]`.
#[proc_macro_attribute]
pub fn metatype(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as MetatypeArgs);
    let item = parse_macro_input!(item as Item);

    let expanded = match item {
        Item::Struct(s) => expand_struct(args, s),
        Item::Enum(e) => expand_enum(args, e),
        Item::Trait(t) => expand_trait(args, t),
        other => Err(syn::Error::new_spanned(
            other,
            "#[metatype] can only be applied to a struct, an enum or a trait",
        )),
    };
    expanded.unwrap_or_else(|e| e.to_compile_error()).into()
}

/// Contributes the functions of an `impl` block as methods of its self type.
/// Functions marked `#[constructor]` are contributed as constructors.
///
/// The self type itself must be described with `#[metatype]`.
#[proc_macro_attribute]
pub fn metamethods(attr: TokenStream, item: TokenStream) -> TokenStream {
    let attr = TokenStream2::from(attr);
    if !attr.is_empty() {
        return syn::Error::new_spanned(attr, "#[metamethods] takes no parameters")
            .to_compile_error()
            .into();
    }
    let item = parse_macro_input!(item as ItemImpl);
    expand_impl(item)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// Shared tail: the registrator fn plus its inventory submission, scoped in an
/// anonymous const so that any number of them can live in one module.
fn registration(body: TokenStream2) -> TokenStream2 {
    quote! {
        const _: () = {
            // Registrator that targets the *builder*, not the final table
            #[doc(hidden)]
            fn __metakit_registrator(b: &mut ::metakit::TypeTableBuilder) {
                #body
            }

            ::metakit::inventory::submit! {
                ::metakit::Registrator(__metakit_registrator)
            }
        };
    }
}

fn supertypes(args: &MetatypeArgs) -> TokenStream2 {
    let superclass = args
        .superclass
        .as_ref()
        .map(|p| quote! { .superclass::<#p>() });
    let interfaces = args.interfaces.iter().chain(&args.extends);
    quote! { #superclass #(.implements::<dyn #interfaces>())* }
}

fn type_annotations(args: &MetatypeArgs) -> TokenStream2 {
    let annotations = &args.annotations;
    quote! { #(.annotation(#annotations))* }
}

fn constructor_kind(args: &MetatypeArgs, class: TokenStream2) -> TokenStream2 {
    if args.annotation {
        quote! { annotation_type }
    } else {
        class
    }
}

fn expand_struct(args: MetatypeArgs, mut item: ItemStruct) -> syn::Result<TokenStream2> {
    args.reject(
        &["annotation", "default", "superclass", "interfaces", "annotations"],
        "a struct",
    )?;
    if !item.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &item.generics,
            "generic types cannot be described",
        ));
    }

    let ident = item.ident.clone();
    let self_ty: Type = parse_quote!(#ident);

    let mut errors = Vec::new();
    let mut fields = Vec::new();
    let named = matches!(item.fields, Fields::Named(_));
    for (idx, field) in item.fields.iter_mut().enumerate() {
        let name = match (&field.ident, named) {
            (Some(i), true) => i.to_string(),
            _ => idx.to_string(),
        };
        let described = MemberAttrs::take(&mut field.attrs).and_then(|attrs| {
            attrs.reject_constructor(&field.ty, "fields")?;
            field_descriptor(&name, &field.ty, &self_ty, &attrs)
        });
        match described {
            Ok(ts) => fields.push(ts),
            Err(e) => errors.push(e),
        }
    }
    combine(errors)?;

    let kind = constructor_kind(&args, quote! { class });
    let supertypes = supertypes(&args);
    let annotations = type_annotations(&args);
    let default = args.default.then(|| quote! { .with_default::<#ident>() });
    let registration = registration(quote! {
        b.register(
            ::metakit::TypeDescriptor::#kind::<#ident>()
                #supertypes
                #annotations
                #(.field(#fields))*
                #default
        );
    });

    Ok(quote! {
        #item
        #registration
    })
}

fn expand_enum(args: MetatypeArgs, mut item: ItemEnum) -> syn::Result<TokenStream2> {
    args.reject(&["annotation", "default", "interfaces", "annotations"], "an enum")?;
    if !item.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &item.generics,
            "generic types cannot be described",
        ));
    }

    let ident = item.ident.clone();
    let self_ty: Type = parse_quote!(#ident);

    let mut errors = Vec::new();
    let mut constants = Vec::new();
    for variant in item.variants.iter_mut() {
        let name = variant.ident.to_string();
        let described = MemberAttrs::take(&mut variant.attrs).and_then(|attrs| {
            attrs.reject_constructor(&variant.ident, "variants")?;
            field_descriptor(&name, &self_ty, &self_ty, &attrs)
        });
        match described {
            Ok(ts) => constants.push(ts),
            Err(e) => errors.push(e),
        }
    }
    combine(errors)?;

    let kind = constructor_kind(&args, quote! { enumeration });
    let supertypes = supertypes(&args);
    let annotations = type_annotations(&args);
    let default = args.default.then(|| quote! { .with_default::<#ident>() });
    let registration = registration(quote! {
        b.register(
            ::metakit::TypeDescriptor::#kind::<#ident>()
                #supertypes
                #annotations
                #(.field(#constants))*
                #default
        );
    });

    Ok(quote! {
        #item
        #registration
    })
}

fn expand_trait(args: MetatypeArgs, mut item: ItemTrait) -> syn::Result<TokenStream2> {
    args.reject(&["extends", "annotations"], "a trait")?;
    if !item.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &item.generics,
            "generic traits cannot be described",
        ));
    }

    let ident = item.ident.clone();
    let self_ty: Type = parse_quote!(dyn #ident);

    let mut errors = Vec::new();
    let mut methods = Vec::new();
    for trait_item in item.items.iter_mut() {
        let TraitItem::Fn(f) = trait_item else {
            continue;
        };
        let described = MemberAttrs::take(&mut f.attrs).and_then(|attrs| {
            attrs.reject_constructor(&f.sig.ident, "trait methods")?;
            for input in &f.sig.inputs {
                if let syn::FnArg::Typed(pt) = input {
                    reject_self_param(&pt.ty)?;
                }
            }
            executable_descriptor(&f.sig, &self_ty, &attrs)
        });
        match described {
            Ok(ts) => methods.push(ts),
            Err(e) => errors.push(e),
        }
    }
    combine(errors)?;

    let supertypes = supertypes(&args);
    let annotations = type_annotations(&args);
    let registration = registration(quote! {
        b.register(
            ::metakit::TypeDescriptor::interface::<dyn #ident>()
                #supertypes
                #annotations
                #(.method(#methods))*
        );
    });

    Ok(quote! {
        #item
        #registration
    })
}

fn expand_impl(mut item: ItemImpl) -> syn::Result<TokenStream2> {
    if !item.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &item.generics,
            "#[metamethods] does not support generic impl blocks",
        ));
    }
    let self_ty = (*item.self_ty).clone();
    if !matches!(self_ty, Type::Path(_)) {
        return Err(syn::Error::new_spanned(
            &self_ty,
            "#[metamethods] expects an impl block for a named type",
        ));
    }

    let mut errors = Vec::new();
    let mut methods = Vec::new();
    let mut constructors = Vec::new();
    for impl_item in item.items.iter_mut() {
        let ImplItem::Fn(f) = impl_item else {
            continue;
        };
        let described = MemberAttrs::take(&mut f.attrs).and_then(|attrs| {
            executable_descriptor(&f.sig, &self_ty, &attrs).map(|ts| (attrs.constructor, ts))
        });
        match described {
            Ok((true, ts)) => constructors.push(ts),
            Ok((false, ts)) => methods.push(ts),
            Err(e) => errors.push(e),
        }
    }
    combine(errors)?;

    let registration = registration(quote! {
        b.extend_members(
            ::metakit::TypeKey::of::<#self_ty>(),
            ::metakit::MemberBlock::new()
                .at(::core::module_path!(), ::core::line!(), ::core::column!())
                #(.method(#methods))*
                #(.constructor(#constructors))*
        );
    });

    Ok(quote! {
        #item
        #registration
    })
}
