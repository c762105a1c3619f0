//! 工具函数

use proc_macro2::TokenStream;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::{Attribute, GenericArgument, LitStr, PathArguments, ReturnType, Token, Type};

/// 方法上的注解属性名
pub const ANNOTATE: &str = "annotate";

/// 标记返回类型没有 `Default` 的方法
pub const NO_DEFAULT: &str = "no_default";

/// 取出 `Result<T, E>` 中的 `T`
pub fn result_ok_type(output: &ReturnType) -> Option<&Type> {
    match output {
        ReturnType::Type(_, ty) => generic_argument(ty, "Result"),
        ReturnType::Default => None,
    }
}

/// 生成类型对应的 `TypeDesc` 表达式
///
/// `Option<T>` 与 `Box<T>` 记录内部类型，以支持基本类型的放宽匹配。
pub fn type_desc(ty: &Type) -> TokenStream {
    if let Some(inner) = generic_argument(ty, "Option") {
        return quote! { ::chimera_proxy::TypeDesc::optional::<#inner>() };
    }
    if let Some(inner) = generic_argument(ty, "Box") {
        return quote! { ::chimera_proxy::TypeDesc::boxed::<#inner>() };
    }
    quote! { ::chimera_proxy::TypeDesc::of::<#ty>() }
}

/// 路径类型最后一段为 `wrapper` 时，返回它的第一个类型参数
fn generic_argument<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    args.args.iter().find_map(|arg| match arg {
        GenericArgument::Type(ty) => Some(ty),
        _ => None,
    })
}

/// 移除并返回 `#[annotate("a", "b")]` 中的所有注解
pub fn take_annotations(attrs: &mut Vec<Attribute>) -> syn::Result<Vec<LitStr>> {
    let mut annotations = Vec::new();
    let mut kept = Vec::with_capacity(attrs.len());
    for attr in attrs.drain(..) {
        if attr.path().is_ident(ANNOTATE) {
            let values =
                attr.parse_args_with(Punctuated::<LitStr, Token![,]>::parse_terminated)?;
            annotations.extend(values);
        } else {
            kept.push(attr);
        }
    }
    *attrs = kept;
    Ok(annotations)
}

/// 移除名为 `name` 的无参数标记属性，返回是否存在
pub fn take_flag(attrs: &mut Vec<Attribute>, name: &str) -> syn::Result<bool> {
    let mut found = false;
    let mut kept = Vec::with_capacity(attrs.len());
    for attr in attrs.drain(..) {
        if attr.path().is_ident(name) {
            attr.meta.require_path_only()?;
            found = true;
        } else {
            kept.push(attr);
        }
    }
    *attrs = kept;
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_result_ok_type() {
        let output: ReturnType = parse_quote!(-> Result<Option<String>, Throwable>);
        let ok = result_ok_type(&output).unwrap();
        assert_eq!(quote!(#ok).to_string(), quote!(Option<String>).to_string());

        let plain: ReturnType = parse_quote!(-> usize);
        assert!(result_ok_type(&plain).is_none());
        assert!(result_ok_type(&ReturnType::Default).is_none());
    }

    #[test]
    fn test_type_desc_wrappers() {
        let optional: Type = parse_quote!(Option<i32>);
        assert!(type_desc(&optional).to_string().contains("optional"));

        let boxed: Type = parse_quote!(std::boxed::Box<u8>);
        assert!(type_desc(&boxed).to_string().contains("boxed"));

        let plain: Type = parse_quote!(Vec<u8>);
        assert!(type_desc(&plain).to_string().contains(":: of ::"));
    }

    #[test]
    fn test_take_annotations() {
        let mut attrs: Vec<Attribute> = vec![
            parse_quote!(#[doc = "size"]),
            parse_quote!(#[annotate("audited", "cached")]),
            parse_quote!(#[annotate("slow")]),
        ];

        let annotations: Vec<String> = take_annotations(&mut attrs)
            .unwrap()
            .iter()
            .map(LitStr::value)
            .collect();

        assert_eq!(annotations, vec!["audited", "cached", "slow"]);
        assert_eq!(attrs.len(), 1);
    }

    #[test]
    fn test_take_flag() {
        let mut attrs: Vec<Attribute> = vec![
            parse_quote!(#[no_default]),
            parse_quote!(#[annotate("slow")]),
        ];

        assert!(take_flag(&mut attrs, NO_DEFAULT).unwrap());
        assert_eq!(attrs.len(), 1);
        assert!(!take_flag(&mut attrs, NO_DEFAULT).unwrap());

        let mut invalid: Vec<Attribute> = vec![parse_quote!(#[no_default(true)])];
        assert!(take_flag(&mut invalid, NO_DEFAULT).is_err());
    }
}
