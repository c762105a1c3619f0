//! 通知（Advice）定义
//!
//! 通知的规范形式是环绕：`Fn(&Invocation) -> Result<Value, Throwable>`。
//! 前置、后置、返回后、异常通知都是在环绕形式之上的组合，执行引擎只需要理解环绕这一种形式。

use crate::error::Throwable;
use crate::invocation::Invocation;
use crate::joinpoint::JoinPoint;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// 通知类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdviceType {
    /// 前置通知
    Before,
    /// 后置通知（无论成功还是失败都执行）
    After,
    /// 返回后通知（成功返回时执行）
    AfterReturning,
    /// 异常通知（抛出异常时执行）
    AfterThrowing,
    /// 环绕通知（可以控制方法执行）
    Around,
}

impl AdviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdviceType::Before => "before",
            AdviceType::After => "after",
            AdviceType::AfterReturning => "after_returning",
            AdviceType::AfterThrowing => "after_throwing",
            AdviceType::Around => "around",
        }
    }
}

impl fmt::Display for AdviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 环绕函数
pub type AroundFn = dyn Fn(&Invocation<'_>) -> Result<Value, Throwable> + Send + Sync;

/// 通知
///
/// 不可变、可廉价克隆；注册到切面后不再修改。
#[derive(Clone)]
pub struct Advice {
    kind: AdviceType,
    name: String,
    handler: Arc<AroundFn>,
}

impl Advice {
    /// 环绕通知：完全控制是否、何时、以何种参数继续执行
    pub fn around<F>(f: F) -> Self
    where
        F: Fn(&Invocation<'_>) -> Result<Value, Throwable> + Send + Sync + 'static,
    {
        Self::compile(AdviceType::Around, f)
    }

    /// 前置通知：在继续执行之前运行，失败则终止调用
    pub fn before<F>(f: F) -> Self
    where
        F: Fn(&JoinPoint<'_>) -> Result<(), Throwable> + Send + Sync + 'static,
    {
        Self::compile(AdviceType::Before, move |invocation| {
            f(&invocation.join_point())?;
            invocation.proceed()
        })
    }

    /// 返回后通知：仅在正常返回时运行，原返回值保持不变
    ///
    /// 函数本身失败时，该失败成为调用结果。
    pub fn after_returning<F>(f: F) -> Self
    where
        F: Fn(&JoinPoint<'_>, &Value) -> Result<(), Throwable> + Send + Sync + 'static,
    {
        Self::compile(AdviceType::AfterReturning, move |invocation| {
            let value = invocation.proceed()?;
            f(&invocation.join_point(), &value)?;
            Ok(value)
        })
    }

    /// 异常通知：仅在失败时运行，之后重新抛出原来的失败
    ///
    /// 只能观察失败，不能抑制或替换它。
    pub fn after_throwing<F>(f: F) -> Self
    where
        F: Fn(&JoinPoint<'_>, &Throwable) + Send + Sync + 'static,
    {
        Self::compile(AdviceType::AfterThrowing, move |invocation| {
            invocation.proceed().map_err(|error| {
                f(&invocation.join_point(), &error);
                error
            })
        })
    }

    /// 后置通知：无论成功还是失败都恰好运行一次，不改变原来的结果
    pub fn after<F>(f: F) -> Self
    where
        F: Fn(&JoinPoint<'_>, Result<&Value, &Throwable>) + Send + Sync + 'static,
    {
        Self::compile(AdviceType::After, move |invocation| {
            let outcome = invocation.proceed();
            f(&invocation.join_point(), outcome.as_ref());
            outcome
        })
    }

    fn compile<F>(kind: AdviceType, f: F) -> Self
    where
        F: Fn(&Invocation<'_>) -> Result<Value, Throwable> + Send + Sync + 'static,
    {
        Self {
            kind,
            name: kind.as_str().to_string(),
            handler: Arc::new(f),
        }
    }

    /// 设置通知名称（用于日志）
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn kind(&self) -> AdviceType {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 以环绕形式执行
    pub fn apply(&self, invocation: &Invocation<'_>) -> Result<Value, Throwable> {
        (self.handler)(invocation)
    }
}

impl fmt::Debug for Advice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Advice")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .finish()
    }
}
