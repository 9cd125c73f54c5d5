use syn::{
    parse::{Parse, ParseStream},
    punctuated::Punctuated,
    Expr, Ident, Meta, Path, Token,
};

/// Configuration parsed from `#[metatype(...)]`
#[derive(Default)]
pub struct MetatypeArgs {
    pub annotation: bool,
    pub default: bool,
    pub superclass: Option<Path>,
    pub interfaces: Vec<Path>,
    pub extends: Vec<Path>,
    pub annotations: Vec<Expr>,
    // spans of the parameters that were actually given, for placement errors
    pub given: Vec<Ident>,
}

const VALID_PARAMS: &[&str] = &[
    "annotation",
    "default",
    "superclass",
    "interfaces",
    "extends",
    "annotations",
];

fn suggest_similar(input: &str) -> Vec<&'static str> {
    let mut suggestions: Vec<(&str, f64)> = VALID_PARAMS
        .iter()
        .map(|&p| (p, strsim::jaro_winkler(input, p)))
        .filter(|(_, score)| *score > 0.6) // Only suggest if reasonably similar
        .collect();

    suggestions.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    suggestions.into_iter().take(2).map(|(p, _)| p).collect()
}

fn unknown_param(path: &Path) -> syn::Error {
    let name = path
        .get_ident()
        .map(|i| i.to_string())
        .unwrap_or_else(|| quote::quote!(#path).to_string());
    let suggestions = suggest_similar(&name);
    let msg = if suggestions.is_empty() {
        format!(
            "unknown metatype parameter '{name}', expected one of: {}",
            VALID_PARAMS.join(", ")
        )
    } else {
        format!(
            "unknown metatype parameter '{name}'\n       = help: did you mean one of: {}?",
            suggestions.join(", ")
        )
    };
    syn::Error::new_spanned(path, msg)
}

fn path_list(value: &Expr, what: &str) -> syn::Result<Vec<Path>> {
    match value {
        Expr::Array(arr) => arr
            .elems
            .iter()
            .map(|elem| match elem {
                Expr::Path(p) => Ok(p.path.clone()),
                other => Err(syn::Error::new_spanned(
                    other,
                    format!("{what} must list type paths, e.g. {what} = [Repository, Auditable]"),
                )),
            })
            .collect(),
        other => Err(syn::Error::new_spanned(
            other,
            format!("{what} must be an array, e.g. {what} = [Repository]"),
        )),
    }
}

impl Parse for MetatypeArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut args = MetatypeArgs::default();

        let punctuated: Punctuated<Meta, Token![,]> =
            input.parse_terminated(Meta::parse, Token![,])?;

        for meta in punctuated {
            let Some(ident) = meta.path().get_ident().cloned() else {
                return Err(unknown_param(meta.path()));
            };
            if args.given.iter().any(|g| *g == ident) {
                return Err(syn::Error::new_spanned(
                    &ident,
                    format!("duplicate `{ident}` parameter"),
                ));
            }

            match meta {
                Meta::Path(p) if p.is_ident("annotation") => args.annotation = true,
                Meta::Path(p) if p.is_ident("default") => args.default = true,
                Meta::NameValue(nv) if nv.path.is_ident("superclass") => match nv.value {
                    Expr::Path(p) => args.superclass = Some(p.path),
                    other => {
                        return Err(syn::Error::new_spanned(
                            other,
                            "superclass must be a type path, e.g. superclass = BaseEntity",
                        ));
                    }
                },
                Meta::NameValue(nv) if nv.path.is_ident("interfaces") => {
                    args.interfaces = path_list(&nv.value, "interfaces")?;
                }
                Meta::NameValue(nv) if nv.path.is_ident("extends") => {
                    args.extends = path_list(&nv.value, "extends")?;
                }
                Meta::NameValue(nv) if nv.path.is_ident("annotations") => match nv.value {
                    Expr::Array(arr) => args.annotations = arr.elems.into_iter().collect(),
                    other => {
                        return Err(syn::Error::new_spanned(
                            other,
                            "annotations must be an array of expressions, e.g. annotations = [Table(\"users\")]",
                        ));
                    }
                },
                other if VALID_PARAMS.contains(&ident.to_string().as_str()) => {
                    return Err(syn::Error::new_spanned(
                        other,
                        format!("malformed `{ident}` parameter"),
                    ));
                }
                other => return Err(unknown_param(other.path())),
            }
            args.given.push(ident);
        }

        Ok(args)
    }
}

impl MetatypeArgs {
    /// Errors for every given parameter that `item` (e.g. "a trait") does not accept.
    pub fn reject(&self, allowed: &[&str], item: &str) -> syn::Result<()> {
        match self
            .given
            .iter()
            .find(|g| !allowed.contains(&g.to_string().as_str()))
        {
            Some(bad) => Err(syn::Error::new_spanned(
                bad,
                format!("`{bad}` is not supported on {item}"),
            )),
            None => Ok(()),
        }
    }
}
