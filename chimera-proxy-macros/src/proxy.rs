//! #[proxy] 属性宏实现

use crate::utils::{result_ok_type, take_annotations, take_flag, type_desc, NO_DEFAULT};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{
    Error, FnArg, Ident, ItemTrait, LitStr, Pat, Result, Signature, TraitItem, TraitItemFn, Type,
};

/// 一个被代理的方法
struct ProxiedMethod {
    sig: Signature,
    ok_type: Type,
    arg_types: Vec<Type>,
    annotations: Vec<LitStr>,
    /// 返回类型没有 `Default`，null 映射为失败
    no_default: bool,
}

pub fn impl_proxy(owner: Option<LitStr>, mut item: ItemTrait) -> Result<TokenStream> {
    if !item.generics.params.is_empty() {
        return Err(Error::new_spanned(
            &item.generics,
            "#[proxy] does not support generic traits",
        ));
    }

    let trait_ident = item.ident.clone();
    let owner = owner
        .map(|lit| lit.value())
        .unwrap_or_else(|| trait_ident.to_string());

    let mut methods = Vec::new();
    for trait_item in item.items.iter_mut() {
        match trait_item {
            TraitItem::Fn(method) => methods.push(analyze_method(method)?),
            other => {
                return Err(Error::new_spanned(
                    other,
                    "#[proxy] only supports traits consisting of methods",
                ))
            }
        }
    }

    let vis = &item.vis;
    let proxy_ident = format_ident!("{}Proxy", trait_ident);
    let target_type = quote! { ::std::sync::Arc<dyn #trait_ident + Send + Sync> };

    let operation_fns = methods.iter().map(|m| operation_fn(&owner, m));
    let method_impls = methods.iter().map(|m| method_impl(&trait_ident, m));
    let operation_getters: Vec<Ident> = methods
        .iter()
        .map(|m| operation_fn_ident(&m.sig.ident))
        .collect();
    let method_names: Vec<String> = methods.iter().map(|m| m.sig.ident.to_string()).collect();

    let proxy_doc = format!("`{}` 的代理（由 `#[proxy]` 生成）", trait_ident);

    Ok(quote! {
        #item

        #[doc = #proxy_doc]
        #vis struct #proxy_ident {
            target: ::std::option::Option<#target_type>,
            controller: ::chimera_proxy::DispatchController,
        }

        impl #proxy_ident {
            /// 代理的所有者名称
            pub const OWNER: &'static str = #owner;

            /// 无目标的 mock
            pub fn mock() -> Self {
                Self::from_builder(Self::builder(), ::std::option::Option::None)
            }

            /// 包装真实对象的 spy
            pub fn spy(target: #target_type) -> Self {
                Self::from_builder(Self::builder(), ::std::option::Option::Some(target))
            }

            /// 以所有者名称创建构建器
            pub fn builder() -> ::chimera_proxy::ProxyBuilder {
                ::chimera_proxy::ProxyBuilder::new(Self::OWNER)
            }

            /// 从构建器创建代理，`target` 为 `None` 时是 mock
            pub fn from_builder(
                builder: ::chimera_proxy::ProxyBuilder,
                target: ::std::option::Option<#target_type>,
            ) -> Self {
                let controller = builder.build(target.is_some());
                Self { target, controller }
            }

            /// 所有可拦截操作的描述（按声明顺序）
            pub fn operations() -> ::std::vec::Vec<&'static ::chimera_proxy::OperationDescriptor> {
                ::std::vec![#(Self::#operation_getters()),*]
            }

            /// 按方法名查找操作描述
            pub fn operation(name: &str) -> ::std::option::Option<&'static ::chimera_proxy::OperationDescriptor> {
                match name {
                    #(#method_names => ::std::option::Option::Some(Self::#operation_getters()),)*
                    _ => ::std::option::Option::None,
                }
            }

            #(#operation_fns)*
        }

        impl ::chimera_proxy::Surrogate for #proxy_ident {
            fn controller(&self) -> &::chimera_proxy::DispatchController {
                &self.controller
            }
        }

        impl ::std::fmt::Debug for #proxy_ident {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.debug_struct(::std::stringify!(#proxy_ident))
                    .field("has_target", &self.target.is_some())
                    .field("controller", &self.controller)
                    .finish()
            }
        }

        impl #trait_ident for #proxy_ident {
            #(#method_impls)*
        }
    })
}

/// 检查方法签名是否受支持，并取出注解
fn analyze_method(method: &mut TraitItemFn) -> Result<ProxiedMethod> {
    let annotations = take_annotations(&mut method.attrs)?;
    let no_default = take_flag(&mut method.attrs, NO_DEFAULT)?;
    let sig = &method.sig;

    if sig.asyncness.is_some() {
        return Err(Error::new_spanned(
            sig,
            "#[proxy] does not support async methods",
        ));
    }
    if !sig.generics.params.is_empty() {
        return Err(Error::new_spanned(
            &sig.generics,
            "#[proxy] does not support generic methods",
        ));
    }

    let mut inputs = sig.inputs.iter();
    match inputs.next() {
        Some(FnArg::Receiver(receiver))
            if receiver.reference.is_some() && receiver.mutability.is_none() => {}
        _ => {
            return Err(Error::new_spanned(
                sig,
                "#[proxy] methods must take `&self` as receiver",
            ))
        }
    }

    let mut arg_types = Vec::new();
    for input in inputs {
        let FnArg::Typed(pat_type) = input else {
            return Err(Error::new_spanned(input, "unexpected receiver"));
        };
        if !matches!(*pat_type.pat, Pat::Ident(_) | Pat::Wild(_)) {
            return Err(Error::new_spanned(
                &pat_type.pat,
                "#[proxy] arguments must be plain identifiers",
            ));
        }
        match &*pat_type.ty {
            Type::Reference(_) | Type::ImplTrait(_) => {
                return Err(Error::new_spanned(
                    &pat_type.ty,
                    "#[proxy] arguments must be owned values (Clone + Send + Sync + 'static)",
                ))
            }
            ty => arg_types.push(ty.clone()),
        }
    }

    let ok_type = result_ok_type(&sig.output).cloned().ok_or_else(|| {
        Error::new_spanned(
            &sig.output,
            "#[proxy] currently only supports methods returning Result<T, Throwable>",
        )
    })?;

    Ok(ProxiedMethod {
        sig: sig.clone(),
        ok_type,
        arg_types,
        annotations,
        no_default,
    })
}

fn operation_fn_ident(method: &Ident) -> Ident {
    format_ident!("__operation_{}", method)
}

/// 生成返回方法操作描述的关联函数（惰性构建一次）
fn operation_fn(owner: &str, method: &ProxiedMethod) -> TokenStream {
    let fn_ident = operation_fn_ident(&method.sig.ident);
    let name = method.sig.ident.to_string();
    let params = method.arg_types.iter().map(type_desc);
    let returns = type_desc(&method.ok_type);
    let annotations = &method.annotations;

    quote! {
        #[doc(hidden)]
        pub fn #fn_ident() -> &'static ::chimera_proxy::OperationDescriptor {
            static OPERATION: ::chimera_proxy::__private::Lazy<::chimera_proxy::OperationDescriptor> =
                ::chimera_proxy::__private::Lazy::new(|| {
                    ::chimera_proxy::OperationDescriptor::new(#owner, #name)
                        #(.param(#params))*
                        .returns(#returns)
                        #(.annotated(#annotations))*
                });
            &OPERATION
        }
    }
}

/// 生成代理上的方法实现
fn method_impl(trait_ident: &Ident, method: &ProxiedMethod) -> TokenStream {
    let mut sig = method.sig.clone();
    let method_ident = &sig.ident;
    let operation_fn = operation_fn_ident(method_ident);
    let ok_type = &method.ok_type;

    // 参数统一改名，避免与生成代码中的局部变量冲突
    let arg_idents: Vec<Ident> = (0..method.arg_types.len())
        .map(|i| format_ident!("__arg{}", i))
        .collect();
    for (input, ident) in sig.inputs.iter_mut().skip(1).zip(&arg_idents) {
        if let FnArg::Typed(pat_type) = input {
            *pat_type.pat = syn::parse_quote!(#ident);
        }
    }

    let indices = 0..method.arg_types.len();
    let arg_types = &method.arg_types;
    let dispatch = if method.no_default {
        format_ident!("dispatch_required")
    } else {
        format_ident!("dispatch")
    };

    quote! {
        #sig {
            let __operation = Self::#operation_fn();
            let __args = ::chimera_proxy::Arguments::new(::std::vec![
                #(::chimera_proxy::Value::new(#arg_idents)),*
            ]);
            match &self.target {
                ::std::option::Option::Some(__target) => {
                    let __proceed: &dyn Fn(&::chimera_proxy::Arguments)
                        -> ::std::result::Result<#ok_type, ::chimera_proxy::Throwable> =
                        &|__args| {
                            #trait_ident::#method_ident(
                                &**__target,
                                #(__args.get::<#arg_types>(#indices)?),*
                            )
                        };
                    self.controller.#dispatch(__operation, __args, ::std::option::Option::Some(__proceed))
                }
                ::std::option::Option::None => {
                    self.controller.#dispatch(__operation, __args, ::std::option::Option::None)
                }
            }
        }
    }
}
