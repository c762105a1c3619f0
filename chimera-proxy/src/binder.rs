//! AOP 绑定
//!
//! 在已有代理上以流式写法挂载通知：
//!
//! ```ignore
//! bind(&set).do_before(|jp| { log(jp.name()); Ok(()) }).when()?.size()?;
//! bind(&set).do_around(timing).return_type(&[TypeDesc::of::<usize>()])?.register();
//! ```
//!
//! 每次绑定生成一个只含一个通知的切面，追加到代理的切面列表末尾。

use crate::advice::Advice;
use crate::aspect::Aspect;
use crate::descriptor::OperationDescriptor;
use crate::dispatch::DispatchController;
use crate::error::{ProxyResult, Throwable};
use crate::invocation::Invocation;
use crate::joinpoint::JoinPoint;
use crate::pointcut::Pointcut;
use crate::proxy::Surrogate;
use crate::value::{TypeDesc, Value};

/// 开始为代理绑定通知
pub fn bind<P: Surrogate>(proxy: &P) -> Binder<'_, P> {
    Binder { proxy, name: None }
}

/// 通知选择
pub struct Binder<'p, P> {
    proxy: &'p P,
    name: Option<String>,
}

impl<'p, P: Surrogate> Binder<'p, P> {
    /// 设置生成的切面名称（用于日志）
    pub fn aspect_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn do_before<F>(self, f: F) -> PointcutBuilder<'p, P>
    where
        F: Fn(&JoinPoint<'_>) -> Result<(), Throwable> + Send + Sync + 'static,
    {
        self.advice(Advice::before(f))
    }

    pub fn do_after<F>(self, f: F) -> PointcutBuilder<'p, P>
    where
        F: Fn(&JoinPoint<'_>, Result<&Value, &Throwable>) + Send + Sync + 'static,
    {
        self.advice(Advice::after(f))
    }

    pub fn do_after_returning<F>(self, f: F) -> PointcutBuilder<'p, P>
    where
        F: Fn(&JoinPoint<'_>, &Value) -> Result<(), Throwable> + Send + Sync + 'static,
    {
        self.advice(Advice::after_returning(f))
    }

    pub fn do_after_throwing<F>(self, f: F) -> PointcutBuilder<'p, P>
    where
        F: Fn(&JoinPoint<'_>, &Throwable) + Send + Sync + 'static,
    {
        self.advice(Advice::after_throwing(f))
    }

    pub fn do_around<F>(self, f: F) -> PointcutBuilder<'p, P>
    where
        F: Fn(&Invocation<'_>) -> Result<Value, Throwable> + Send + Sync + 'static,
    {
        self.advice(Advice::around(f))
    }

    /// 绑定一个已构建的通知
    pub fn advice(self, advice: Advice) -> PointcutBuilder<'p, P> {
        let name = self
            .name
            .unwrap_or_else(|| format!("{}-binding", advice.kind()));
        PointcutBuilder {
            proxy: self.proxy,
            name,
            advice,
            pointcut: Pointcut::all(),
        }
    }
}

/// 切点构建：每个方法追加一个谓词，终结方法把切面注册到代理上
#[must_use = "the advice is not registered until `when()`, `all_methods()` or `register()` is called"]
pub struct PointcutBuilder<'p, P> {
    proxy: &'p P,
    name: String,
    advice: Advice,
    pointcut: Pointcut,
}

impl<'p, P: Surrogate> PointcutBuilder<'p, P> {
    /// 返回类型可赋值给任意一个给定类型
    pub fn return_type(mut self, types: &[TypeDesc]) -> ProxyResult<Self> {
        self.pointcut = self.pointcut.return_type(types)?;
        Ok(self)
    }

    /// 带有任意一个给定注解
    pub fn annotated_with(mut self, annotations: &[&'static str]) -> ProxyResult<Self> {
        self.pointcut = self.pointcut.annotated_with(annotations)?;
        Ok(self)
    }

    /// 自定义谓词
    pub fn where_method<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&OperationDescriptor) -> bool + Send + Sync + 'static,
    {
        self.pointcut = self.pointcut.where_method(predicate);
        self
    }

    /// 方法名模式（支持 `*` 通配符）
    pub fn named(mut self, pattern: &str) -> ProxyResult<Self> {
        self.pointcut = self.pointcut.named(pattern)?;
        Ok(self)
    }

    /// 只绑定到代理上的下一次调用所对应的操作
    ///
    /// 返回代理本身，随后的那一次调用只用于录制，不会执行真实实现。
    pub fn when(self) -> ProxyResult<&'p P> {
        let PointcutBuilder {
            proxy,
            name,
            advice,
            pointcut,
        } = self;
        proxy.controller().begin_arming(Box::new(
            move |controller: &DispatchController,
                  selector: &OperationDescriptor|
                  -> ProxyResult<()> {
                let pointcut = pointcut.exactly(selector.clone());
                controller.register_aspect(Aspect::of(name, pointcut, advice));
                Ok(())
            },
        ))?;
        Ok(proxy)
    }

    /// 绑定到所有方法（已追加的谓词仍然生效）
    pub fn all_methods(mut self) {
        self.pointcut = self.pointcut.where_method(|_| true);
        self.register();
    }

    /// 以当前切点注册
    pub fn register(self) {
        self.proxy
            .controller()
            .register_aspect(Aspect::of(self.name, self.pointcut, self.advice));
    }
}
