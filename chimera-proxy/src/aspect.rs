//! 切面（Aspect）定义
//!
//! 切面 = 一个切点 + 一组有序通知。注册到某个代理后在代理的整个生命周期内保持不变。

use crate::advice::Advice;
use crate::descriptor::OperationDescriptor;
use crate::pointcut::Pointcut;
use std::fmt;
use std::time::{Duration, Instant};

/// 切面
#[derive(Clone)]
pub struct Aspect {
    name: String,
    pointcut: Pointcut,
    advices: Vec<Advice>,
}

impl Aspect {
    pub fn new(name: impl Into<String>, pointcut: Pointcut) -> Self {
        Self {
            name: name.into(),
            pointcut,
            advices: Vec::new(),
        }
    }

    /// 追加一个通知（按声明顺序执行）
    pub fn advice(mut self, advice: Advice) -> Self {
        self.advices.push(advice);
        self
    }

    /// 只有一个通知的切面
    pub fn of(name: impl Into<String>, pointcut: Pointcut, advice: Advice) -> Self {
        Self::new(name, pointcut).advice(advice)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pointcut(&self) -> &Pointcut {
        &self.pointcut
    }

    pub fn advices(&self) -> &[Advice] {
        &self.advices
    }

    pub fn matches(&self, operation: &OperationDescriptor) -> bool {
        self.pointcut.matches(operation)
    }
}

impl fmt::Debug for Aspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Aspect")
            .field("name", &self.name)
            .field("pointcut", &self.pointcut)
            .field("advices", &self.advices)
            .finish()
    }
}

/// 切面注册器
///
/// 用于 inventory 自动收集切面。`owner_pattern` 决定哪些代理会加载该切面（支持 `*` 通配符）。
pub struct AspectRegistration {
    /// 切面名称
    pub name: &'static str,

    /// 代理所有者名称模式
    pub owner_pattern: &'static str,

    /// 创建切面实例的函数
    pub creator: fn() -> Aspect,
}

impl AspectRegistration {
    pub const fn new(
        name: &'static str,
        owner_pattern: &'static str,
        creator: fn() -> Aspect,
    ) -> Self {
        Self {
            name,
            owner_pattern,
            creator,
        }
    }

    /// 创建切面实例
    pub fn create_instance(&self) -> Aspect {
        (self.creator)()
    }
}

// 使用 inventory 收集所有切面注册器
inventory::collect!(AspectRegistration);

// ============================================================================
// 预定义的常用切面
// ============================================================================

/// 日志切面 - 记录方法进入与退出
pub fn logging_aspect(pointcut: Pointcut) -> Aspect {
    Aspect::of(
        "LoggingAspect",
        pointcut,
        Advice::around(|invocation| {
            let started = Instant::now();
            tracing::info!("→ Entering: {}", invocation.operation());
            let result = invocation.proceed();
            tracing::info!(
                "← Exiting: {} (took {:?})",
                invocation.operation(),
                started.elapsed()
            );
            result
        })
        .named("logging"),
    )
}

/// 性能监控切面 - 超过阈值的调用记录警告
pub fn performance_aspect(threshold: Duration, pointcut: Pointcut) -> Aspect {
    Aspect::of(
        "PerformanceAspect",
        pointcut,
        Advice::around(move |invocation| {
            let started = Instant::now();
            let result = invocation.proceed();
            let elapsed = started.elapsed();
            if elapsed > threshold {
                tracing::warn!(
                    "⚠️ Slow method detected: {} took {:?} (threshold: {:?})",
                    invocation.operation(),
                    elapsed,
                    threshold
                );
            }
            result
        })
        .named("performance"),
    )
}

/// 异常记录切面
pub fn exception_logging_aspect(pointcut: Pointcut) -> Aspect {
    Aspect::of(
        "ExceptionHandlingAspect",
        pointcut,
        Advice::after_throwing(|jp, error| {
            tracing::error!("❌ Exception in {}: {}", jp.signature(), error.full_description());
        })
        .named("exception_logging"),
    )
}
