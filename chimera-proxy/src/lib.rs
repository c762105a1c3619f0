//! Chimera Proxy - 拦截与打桩引擎
//!
//! 在对象或 trait 外面包一层代理，把横切行为声明式地挂到选定的操作上，支持：
//! - 五种通知（Before、After、AfterReturning、AfterThrowing、Around），全部归约为环绕形式
//! - 由谓词合取构成的切点
//! - 每个代理一个分发控制器，支持“先录制调用、再装配打桩”的流式写法
//! - 基于同一套分发机制的 AOP 代理、mock 与 spy
//! - `#[proxy]` 宏在编译时为 trait 生成代理类型
//!
//! ```ignore
//! use chimera_proxy::prelude::*;
//!
//! #[proxy]
//! pub trait Sequence: Send + Sync {
//!     fn size(&self) -> Result<usize, Throwable>;
//!     fn get(&self, index: usize) -> Result<String, Throwable>;
//! }
//!
//! let list = SequenceProxy::mock();
//! do_return(7usize).when(&list)?.size()?;
//! when(&list, |l| l.get(0))?.then_throw(Throwable::msg("boom"));
//! ```

pub mod advice;
pub mod aspect;
pub mod binder;
pub mod chain;
pub mod config;
pub mod defaults;
pub mod descriptor;
pub mod dispatch;
pub mod error;
pub mod invocation;
pub mod joinpoint;
pub mod logging;
pub mod pointcut;
pub mod proxy;
pub mod registry;
pub mod stub;
pub mod value;

#[cfg(test)]
pub(crate) mod testing;

// 重新导出核心类型
pub use advice::{Advice, AdviceType, AroundFn};
pub use aspect::{
    exception_logging_aspect, logging_aspect, performance_aspect, Aspect, AspectRegistration,
};
pub use binder::{bind, Binder, PointcutBuilder};
pub use chain::{InterceptorChain, Terminal};
pub use config::{DefaultAnswer, ProxySettings, Settings};
pub use defaults::{DefaultValueSynthesizer, TypeDefaults};
pub use descriptor::OperationDescriptor;
pub use dispatch::{ArmHook, DispatchController};
pub use error::{ProxyError, ProxyResult, Throwable};
pub use invocation::Invocation;
pub use joinpoint::JoinPoint;
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use pointcut::{MethodFilter, Pointcut};
pub use proxy::{ProxyBuilder, Surrogate};
pub use registry::{get_global_registry, AspectRegistry};
pub use stub::{
    do_around, do_call_real_method, do_nothing, do_return, do_return_value, do_throw, when,
    OngoingStubbing, Stubber,
};
pub use value::{Arguments, TypeDesc, Value};

// 代理生成宏
pub use chimera_proxy_macros::proxy;

// 导出 inventory 供 submit_aspect! 使用
pub use inventory;

/// 生成代码使用的内部依赖，不属于公开 API
#[doc(hidden)]
pub mod __private {
    pub use once_cell::sync::Lazy;
}

/// 预导入模块
pub mod prelude {
    pub use crate::advice::{Advice, AdviceType};
    pub use crate::aspect::{Aspect, AspectRegistration};
    pub use crate::binder::bind;
    pub use crate::config::{DefaultAnswer, ProxySettings, Settings};
    pub use crate::descriptor::OperationDescriptor;
    pub use crate::error::{ProxyError, ProxyResult, Throwable};
    pub use crate::invocation::Invocation;
    pub use crate::joinpoint::JoinPoint;
    pub use crate::pointcut::Pointcut;
    pub use crate::proxy::{ProxyBuilder, Surrogate};
    pub use crate::stub::{
        do_around, do_call_real_method, do_nothing, do_return, do_return_value, do_throw, when,
    };
    pub use crate::value::{Arguments, TypeDesc, Value};
    pub use crate::{proxy, submit_aspect};
}

/// 注册一个全局切面
///
/// 使用 `ProxyBuilder::with_registered_aspects()` 构建的代理，所有者名称匹配 `$owner`
/// 模式（支持 `*`）时会加载该切面。
///
/// ```ignore
/// fn audit() -> Aspect {
///     logging_aspect(Pointcut::all())
/// }
///
/// submit_aspect!("Audit", "*Repository", audit);
/// ```
#[macro_export]
macro_rules! submit_aspect {
    ($name:expr, $owner:expr, $creator:expr) => {
        $crate::inventory::submit! {
            $crate::AspectRegistration::new($name, $owner, $creator)
        }
    };
}
