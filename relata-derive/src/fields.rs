use proc_macro::TokenStream;
use quote::quote;
use syn::{DataStruct, DeriveInput, Fields, GenericArgument, LitStr, PathArguments, Result, Type};

enum PathSource {
    Leaf(String),
    Nested(String, Type),
}

pub(crate) fn generate_fields_for_struct(
    ast: &DeriveInput,
    data: &DataStruct,
) -> Result<TokenStream> {
    let name = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();

    let named = match &data.fields {
        Fields::Named(named) => named,
        _ => {
            return Err(syn::Error::new_spanned(
                ast,
                "Fields can only be derived for structs with named fields",
            ))
        }
    };

    let mut sources = Vec::new();
    for field in &named.named {
        let Some(ident) = &field.ident else {
            continue;
        };

        let mut path = ident.to_string().trim_start_matches("r#").to_string();
        let mut nested = false;
        let mut skip = false;

        for attr in &field.attrs {
            if attr.path().is_ident("fields") {
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("rename") {
                        let value = meta.value()?;
                        let s: LitStr = value.parse()?;
                        if s.value().is_empty() {
                            return Err(meta.error("Field rename cannot be empty"));
                        }
                        path = s.value();
                        Ok(())
                    } else if meta.path.is_ident("nested") {
                        nested = true;
                        Ok(())
                    } else if meta.path.is_ident("skip") {
                        skip = true;
                        Ok(())
                    } else {
                        Err(meta.error("Unknown fields attribute"))
                    }
                })?;
            }
        }

        if skip {
            continue;
        }
        if nested {
            sources.push(PathSource::Nested(path, element_type(&field.ty).clone()));
        } else {
            sources.push(PathSource::Leaf(path));
        }
    }

    for attr in &ast.attrs {
        if attr.path().is_ident("fields") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("join") {
                    let mut alias: Option<String> = None;
                    let mut target: Option<Type> = None;

                    meta.parse_nested_meta(|meta| {
                        if meta.path.is_ident("alias") {
                            let value = meta.value()?;
                            let s: LitStr = value.parse()?;
                            alias = Some(s.value());
                            Ok(())
                        } else if meta.path.is_ident("target") {
                            let value = meta.value()?;
                            target = Some(value.parse()?);
                            Ok(())
                        } else {
                            Err(meta.error("Unknown join attribute"))
                        }
                    })?;

                    match (alias, target) {
                        (Some(alias), Some(target)) if !alias.is_empty() => {
                            sources.push(PathSource::Nested(alias, target));
                            Ok(())
                        }
                        _ => Err(meta.error("Join alias and target are required")),
                    }
                } else {
                    Err(meta.error("Unknown fields attribute"))
                }
            })?;
        }
    }

    let pushes = sources.iter().map(|source| match source {
        PathSource::Leaf(path) => quote! {
            paths.push(#path.to_string());
        },
        PathSource::Nested(path, ty) => quote! {
            paths.push(#path.to_string());
            for sub_path in <#ty as ::relata::filter::Fields>::paths() {
                paths.push(format!("{}.{}", #path, sub_path));
            }
        },
    });

    let expanded = quote! {
        impl #impl_generics ::relata::filter::Fields for #name #ty_generics #where_clause {
            fn paths() -> Vec<String> {
                let mut paths: Vec<String> = Vec::new();
                #(#pushes)*
                paths
            }
        }
    };

    Ok(TokenStream::from(expanded))
}

// Option<T>, Vec<T> and Box<T> nest the shape of T
fn element_type(ty: &Type) -> &Type {
    if let Type::Path(type_path) = ty {
        if let Some(segment) = type_path.path.segments.last() {
            let wrapper = segment.ident.to_string();
            if matches!(wrapper.as_str(), "Option" | "Vec" | "Box") {
                if let PathArguments::AngleBracketed(args) = &segment.arguments {
                    if let Some(GenericArgument::Type(inner)) = args.args.first() {
                        return element_type(inner);
                    }
                }
            }
        }
    }
    ty
}
