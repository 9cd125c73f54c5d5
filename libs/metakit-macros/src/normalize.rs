//! Rewrites signature types into `'static` types usable with `TypeKey::of`.

use syn::visit_mut::{self, VisitMut};
use syn::spanned::Spanned;
use syn::{
    Generics, Lifetime, ParenthesizedGenericArguments, Type, TypeBareFn, TypePath,
    TypeReference,
};

struct Normalizer<'a> {
    self_ty: &'a Type,
    errors: Vec<syn::Error>,
}

fn static_lifetime(span: proc_macro2::Span) -> Lifetime {
    Lifetime::new("'static", span)
}

impl VisitMut for Normalizer<'_> {
    fn visit_lifetime_mut(&mut self, lt: &mut Lifetime) {
        *lt = static_lifetime(lt.apostrophe);
    }

    fn visit_type_reference_mut(&mut self, r: &mut TypeReference) {
        if r.lifetime.is_none() {
            r.lifetime = Some(static_lifetime(r.and_token.spans[0]));
        }
        visit_mut::visit_type_reference_mut(self, r);
    }

    fn visit_type_mut(&mut self, ty: &mut Type) {
        match ty {
            Type::Path(p) if p.qself.is_none() && p.path.is_ident("Self") => {
                *ty = self.self_ty.clone();
                return;
            }
            Type::Path(p) if p.qself.is_none() && p.path.segments.first().is_some_and(|s| s.ident == "Self") => {
                self.errors.push(syn::Error::new_spanned(
                    &*p,
                    "associated types are not supported in described signatures",
                ));
                return;
            }
            Type::ImplTrait(it) => {
                self.errors.push(syn::Error::new_spanned(
                    &*it,
                    "`impl Trait` has no type identity; use a concrete type or `Box<dyn Trait>`",
                ));
                return;
            }
            Type::Infer(inf) => {
                self.errors.push(syn::Error::new_spanned(&*inf, "`_` is not allowed here"));
                return;
            }
            _ => {}
        }
        visit_mut::visit_type_mut(self, ty);
    }

    // `Fn(&str)` and `fn(&str)` bind their own lifetimes
    fn visit_parenthesized_generic_arguments_mut(&mut self, _: &mut ParenthesizedGenericArguments) {}

    fn visit_type_bare_fn_mut(&mut self, _: &mut TypeBareFn) {}
}

/// Returns `ty` with every lifetime made `'static` and `Self` replaced by `self_ty`.
pub fn normalize(ty: &Type, self_ty: &Type) -> syn::Result<Type> {
    let mut out = ty.clone();
    let mut n = Normalizer {
        self_ty,
        errors: Vec::new(),
    };
    n.visit_type_mut(&mut out);
    combine(n.errors)?;
    Ok(out)
}

struct SelfFinder(Option<proc_macro2::Span>);

impl VisitMut for SelfFinder {
    fn visit_type_path_mut(&mut self, p: &mut TypePath) {
        if self.0.is_none()
            && p.qself.is_none()
            && p.path.segments.first().is_some_and(|s| s.ident == "Self")
        {
            self.0 = Some(p.span());
        }
        visit_mut::visit_type_path_mut(self, p);
    }
}

/// A trait method parameter mentioning `Self` keys as `dyn Trait` while every
/// implementation keys it as the concrete type, so the two never match.
pub fn reject_self_param(ty: &Type) -> syn::Result<()> {
    let mut finder = SelfFinder(None);
    finder.visit_type_mut(&mut ty.clone());
    match finder.0 {
        Some(span) => Err(syn::Error::new(
            span,
            "`Self` in a parameter of a described trait method never matches its implementations; \
             take `&dyn Trait` or a concrete type instead",
        )),
        None => Ok(()),
    }
}

/// Only lifetime parameters are allowed.
pub fn reject_type_generics(generics: &Generics, what: &str) -> syn::Result<()> {
    match generics
        .params
        .iter()
        .find(|p| !matches!(p, syn::GenericParam::Lifetime(_)))
    {
        Some(p) => Err(syn::Error::new_spanned(
            p,
            format!("generic {what} cannot be described; only lifetime parameters are allowed"),
        )),
        None => Ok(()),
    }
}

pub fn combine(errors: Vec<syn::Error>) -> syn::Result<()> {
    let mut iter = errors.into_iter();
    match iter.next() {
        None => Ok(()),
        Some(mut first) => {
            for e in iter {
                first.combine(e);
            }
            Err(first)
        }
    }
}
