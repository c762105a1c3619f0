//! Chimera Proxy 过程宏
//!
//! - `#[proxy]` / `#[proxy("Owner")]` - 为 trait 生成代理类型 `<Trait>Proxy`
//! - `#[annotate("...")]` - 写在 trait 方法上，作为操作描述的注解（由 `#[proxy]` 消费）
//! - `#[no_default]` - 写在 trait 方法上，返回类型不要求 `Default`（由 `#[proxy]` 消费）

extern crate proc_macro;

use proc_macro::TokenStream;
use syn::{parse_macro_input, ItemTrait, LitStr};

mod proxy;
mod utils;

/// `#[proxy]` 属性宏
///
/// 为 trait 生成代理类型，代理上的每一次调用都交给分发控制器处理。
///
/// 使用示例：
/// ```ignore
/// use chimera_proxy::prelude::*;
///
/// #[proxy("UserRepository")]
/// pub trait Repository: Send + Sync {
///     fn count(&self) -> Result<usize, Throwable>;
///
///     #[annotate("audited")]
///     fn delete(&self, id: u64) -> Result<(), Throwable>;
/// }
///
/// let mock = RepositoryProxy::mock();
/// let spy = RepositoryProxy::spy(Arc::new(InMemoryRepository::default()));
/// ```
///
/// 约束：
/// - 方法接收者必须是 `&self`，参数按值传递（`Clone + Send + Sync + 'static`）
/// - 返回类型必须是 `Result<T, Throwable>`，`T: Clone + Default + Send + Sync + 'static`
/// - `T` 没有 `Default`（例如 `Arc<dyn Trait>`）时在方法上标记 `#[no_default]`：
///   需要默认值的地方（mock 上未打桩的调用、录制中的触发调用）返回 `ProxyError::NullValue`，
///   这类方法打桩时宜用 `when(&proxy, |p| p.method())` 形式
/// - 不支持泛型方法、异步方法以及关联类型和常量
#[proc_macro_attribute]
pub fn proxy(attr: TokenStream, item: TokenStream) -> TokenStream {
    let owner = if attr.is_empty() {
        None
    } else {
        Some(parse_macro_input!(attr as LitStr))
    };
    let item_trait = parse_macro_input!(item as ItemTrait);

    proxy::impl_proxy(owner, item_trait)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}
