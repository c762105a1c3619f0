//! 拦截器链
//!
//! 把所有匹配的通知组合成一条链：第一个注册的通知在最外层，最先执行、最后返回；
//! 最内层是真实实现（或无目标时的默认值合成）。

use crate::advice::Advice;
use crate::descriptor::OperationDescriptor;
use crate::error::Throwable;
use crate::invocation::Invocation;
use crate::value::{Arguments, Value};

/// 链的最内层：调用真实实现
pub type Terminal<'a> = dyn Fn(&Arguments) -> Result<Value, Throwable> + 'a;

/// 单次调用的拦截器链
///
/// 每次代理调用都会重新构建，不缓存链的形状。
pub struct InterceptorChain<'a> {
    operation: &'a OperationDescriptor,
    advices: Vec<Advice>,
    terminal: &'a Terminal<'a>,
}

impl<'a> InterceptorChain<'a> {
    pub fn new(
        operation: &'a OperationDescriptor,
        advices: Vec<Advice>,
        terminal: &'a Terminal<'a>,
    ) -> Self {
        Self {
            operation,
            advices,
            terminal,
        }
    }

    pub fn len(&self) -> usize {
        self.advices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.advices.is_empty()
    }

    /// 从最外层开始执行整条链
    pub fn execute(&self, args: Arguments) -> Result<Value, Throwable> {
        self.proceed_from(0, args)
    }

    pub(crate) fn proceed_from(&self, index: usize, args: Arguments) -> Result<Value, Throwable> {
        match self.advices.get(index) {
            Some(advice) => {
                tracing::trace!(
                    operation = %self.operation,
                    advice = advice.name(),
                    position = index,
                    "Applying advice"
                );
                let invocation = Invocation::new(self.operation, args, self, index + 1);
                advice.apply(&invocation)
            }
            None => (self.terminal)(&args),
        }
    }
}
