//! 打桩（mock / spy）
//!
//! 两种等价的写法，都是先录制一次调用，再为录制到的操作注册打桩：
//!
//! ```ignore
//! // 配置形式：先给出行为，再触发调用
//! do_return(7usize).when(&list)?.size()?;
//! do_throw(Throwable::msg("boom")).when(&list)?.get(0)?;
//!
//! // 期望形式：先触发调用，再给出行为
//! when(&list, |l| l.size())?.then_return(7);
//! ```
//!
//! 同一个操作多次打桩时最新的生效。

use crate::advice::Advice;
use crate::descriptor::OperationDescriptor;
use crate::dispatch::DispatchController;
use crate::error::{ProxyError, ProxyResult, Throwable};
use crate::invocation::Invocation;
use crate::proxy::Surrogate;
use crate::value::Value;
use std::any::Any;
use std::marker::PhantomData;

/// 打桩前对录制到的操作做的检查
enum Expectation {
    Any,
    /// 返回值类型必须与声明的返回类型一致（null 除外）
    Returns(Value),
    /// 只能用于返回 `()` 的操作
    Unit,
}

impl Expectation {
    fn verify(&self, selector: &OperationDescriptor) -> ProxyResult<()> {
        let returns = selector.return_type();
        match self {
            Expectation::Any => Ok(()),
            Expectation::Returns(value) if value.is_null() || value.is_type(returns) => Ok(()),
            Expectation::Returns(value) => Err(ProxyError::StubTypeMismatch {
                operation: selector.to_string(),
                expected: returns.name(),
                actual: value.type_name(),
            }),
            Expectation::Unit if returns.is_unit() => Ok(()),
            Expectation::Unit => Err(ProxyError::NotVoid {
                operation: selector.to_string(),
                returns: returns.name(),
            }),
        }
    }
}

/// 配置形式的打桩行为，等待 [`Stubber::when`] 指定代理
#[must_use = "a stubber does nothing until `.when(&proxy)` is called and followed by a call"]
pub struct Stubber {
    advice: Advice,
    expectation: Expectation,
}

/// 返回固定值
pub fn do_return<T: Any + Send + Sync>(value: T) -> Stubber {
    do_return_value(Value::new(value))
}

/// 返回类型擦除的值（`Value::null()` 表示 null）
pub fn do_return_value(value: Value) -> Stubber {
    let returned = value.clone();
    Stubber {
        advice: Advice::around(move |_| Ok(returned.clone())).named("do_return"),
        expectation: Expectation::Returns(value),
    }
}

/// 每次调用都抛出同一个失败
pub fn do_throw(error: impl Into<Throwable>) -> Stubber {
    let error = error.into();
    Stubber {
        advice: Advice::around(move |_| Err(error.clone())).named("do_throw"),
        expectation: Expectation::Any,
    }
}

/// 环绕：完全控制调用
pub fn do_around<F>(f: F) -> Stubber
where
    F: Fn(&Invocation<'_>) -> Result<Value, Throwable> + Send + Sync + 'static,
{
    Stubber {
        advice: Advice::around(f).named("do_around"),
        expectation: Expectation::Any,
    }
}

/// 什么都不做，只能用于返回 `()` 的操作
pub fn do_nothing() -> Stubber {
    Stubber {
        advice: Advice::around(|_| Ok(Value::unit())).named("do_nothing"),
        expectation: Expectation::Unit,
    }
}

/// 调用真实实现（用于撤销 spy 上的打桩）
pub fn do_call_real_method() -> Stubber {
    Stubber {
        advice: Advice::around(|invocation| invocation.proceed()).named("do_call_real_method"),
        expectation: Expectation::Any,
    }
}

impl Stubber {
    /// 让代理进入录制模式，返回的代理上的下一次调用会完成打桩
    ///
    /// 触发调用返回声明类型的默认值；检查失败（例如 `do_nothing` 用于有返回值的方法）
    /// 时触发调用返回对应的 [`ProxyError`]。
    pub fn when<P: Surrogate>(self, proxy: &P) -> ProxyResult<&P> {
        let Stubber {
            advice,
            expectation,
        } = self;
        proxy.controller().begin_arming(Box::new(
            move |controller: &DispatchController,
                  selector: &OperationDescriptor|
                  -> ProxyResult<()> {
                expectation.verify(selector)?;
                controller.register_stub(selector.clone(), advice);
                Ok(())
            },
        ))?;
        Ok(proxy)
    }
}

/// 期望形式：执行 `call` 录制一次调用，其返回值被丢弃
pub fn when<P, R, F>(proxy: &P, call: F) -> ProxyResult<OngoingStubbing<'_, R>>
where
    P: Surrogate,
    F: FnOnce(&P) -> Result<R, Throwable>,
    R: Any + Clone + Send + Sync,
{
    let controller = proxy.controller();
    controller.begin_capture()?;
    let mut guard = RecordingGuard::new(controller);
    let _ = call(proxy);
    guard.disarm();
    let selector = controller.take_pending_selector()?;
    Ok(OngoingStubbing {
        controller,
        selector,
        returns: PhantomData,
    })
}

/// `call` 发生 panic 时放弃录制，避免代理停留在录制状态
struct RecordingGuard<'a> {
    controller: &'a DispatchController,
    armed: bool,
}

impl<'a> RecordingGuard<'a> {
    fn new(controller: &'a DispatchController) -> Self {
        Self {
            controller,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for RecordingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.controller.cancel_recording();
        }
    }
}

/// 已录制、尚未指定行为的打桩
#[must_use = "the recorded call is not stubbed until a `then_*` method is called"]
pub struct OngoingStubbing<'p, R> {
    controller: &'p DispatchController,
    selector: OperationDescriptor,
    returns: PhantomData<fn() -> R>,
}

impl<'p, R> OngoingStubbing<'p, R>
where
    R: Any + Clone + Send + Sync,
{
    /// 录制到的操作
    pub fn selector(&self) -> &OperationDescriptor {
        &self.selector
    }

    /// 返回固定值
    pub fn then_return(self, value: R) {
        let value = Value::new(value);
        self.arm(Advice::around(move |_| Ok(value.clone())).named("then_return"));
    }

    /// 每次调用都抛出同一个失败
    pub fn then_throw(self, error: impl Into<Throwable>) {
        let error = error.into();
        self.arm(Advice::around(move |_| Err(error.clone())).named("then_throw"));
    }

    /// 环绕：完全控制调用
    pub fn then_around<F>(self, f: F)
    where
        F: Fn(&Invocation<'_>) -> Result<R, Throwable> + Send + Sync + 'static,
    {
        self.arm(
            Advice::around(move |invocation| f(invocation).map(Value::new)).named("then_around"),
        );
    }

    /// 调用真实实现
    pub fn then_call_real_method(self) {
        self.arm(Advice::around(|invocation| invocation.proceed()).named("then_call_real_method"));
    }

    fn arm(self, advice: Advice) {
        self.controller.register_stub(self.selector, advice);
    }
}

impl OngoingStubbing<'_, ()> {
    /// 什么都不做
    pub fn then_nothing(self) {
        self.arm(Advice::around(|_| Ok(Value::unit())).named("then_nothing"));
    }
}
