//! Helper attributes on members and the descriptor expressions built from them.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{punctuated::Punctuated, Attribute, Expr, FnArg, LitStr, ReturnType, Signature, Token, Type};

use crate::normalize::{normalize, reject_type_generics};

const HELPERS: &[&str] = &["annotate", "synthetic", "constructor"];

/// Helper attributes found on one member, already removed from its attribute list.
#[derive(Default)]
pub struct MemberAttrs {
    pub annotations: Vec<Expr>,
    pub synthetic: bool,
    pub constructor: bool,
}

impl MemberAttrs {
    /// Strips `#[annotate(..)]`, `#[synthetic]` and `#[constructor]` from `attrs`.
    pub fn take(attrs: &mut Vec<Attribute>) -> syn::Result<Self> {
        let mut out = MemberAttrs::default();
        let mut kept = Vec::with_capacity(attrs.len());
        for attr in attrs.drain(..) {
            let Some(name) = HELPERS.iter().find(|h| attr.path().is_ident(h)) else {
                kept.push(attr);
                continue;
            };
            match *name {
                "annotate" => {
                    let exprs =
                        attr.parse_args_with(Punctuated::<Expr, Token![,]>::parse_terminated)?;
                    out.annotations.extend(exprs);
                }
                "synthetic" => {
                    attr.meta.require_path_only()?;
                    out.synthetic = true;
                }
                _ => {
                    attr.meta.require_path_only()?;
                    out.constructor = true;
                }
            }
        }
        *attrs = kept;
        Ok(out)
    }

    pub fn modifiers(&self) -> TokenStream {
        let annotations = &self.annotations;
        let synthetic = self.synthetic.then(|| quote! { .synthetic() });
        quote! { #(.annotation(#annotations))* #synthetic }
    }

    pub fn reject_constructor(&self, span: &impl quote::ToTokens, what: &str) -> syn::Result<()> {
        if self.constructor {
            return Err(syn::Error::new_spanned(
                span,
                format!("#[constructor] is only allowed on functions in #[metamethods] impl blocks, not on {what}"),
            ));
        }
        Ok(())
    }
}

pub fn field_descriptor(name: &str, ty: &Type, self_ty: &Type, attrs: &MemberAttrs) -> syn::Result<TokenStream> {
    let ty = normalize(ty, self_ty)?;
    let name = LitStr::new(name, proc_macro2::Span::call_site());
    let modifiers = attrs.modifiers();
    Ok(quote! {
        ::metakit::FieldDescriptor::new::<#ty>(#name) #modifiers
    })
}

fn param_types(sig: &Signature, self_ty: &Type) -> syn::Result<Vec<Type>> {
    sig.inputs
        .iter()
        .filter_map(|arg| match arg {
            FnArg::Receiver(_) => None,
            FnArg::Typed(pt) => Some(normalize(&pt.ty, self_ty)),
        })
        .collect()
}

/// `MethodDescriptor` or `ConstructorDescriptor` expression for a function signature.
pub fn executable_descriptor(sig: &Signature, self_ty: &Type, attrs: &MemberAttrs) -> syn::Result<TokenStream> {
    reject_type_generics(&sig.generics, "functions")?;
    let params = param_types(sig, self_ty)?;
    let name = LitStr::new(&sig.ident.to_string(), sig.ident.span());
    let modifiers = attrs.modifiers();

    if attrs.constructor {
        if let Some(FnArg::Receiver(r)) = sig.inputs.first() {
            return Err(syn::Error::new_spanned(r, "a #[constructor] cannot take `self`"));
        }
        return Ok(quote! {
            ::metakit::ConstructorDescriptor::new(#name) #(.param::<#params>())* #modifiers
        });
    }

    let ret = match &sig.output {
        ReturnType::Default => quote! { () },
        ReturnType::Type(_, ty) => {
            let ty = normalize(ty, self_ty)?;
            quote! { #ty }
        }
    };
    Ok(quote! {
        ::metakit::MethodDescriptor::new::<#ret>(#name) #(.param::<#params>())* #modifiers
    })
}
