//! 调用（Invocation）
//!
//! 一次代理调用事件，传递给每一个通知。环绕通知通过它决定是否（以及调用多少次）继续执行。

use crate::chain::InterceptorChain;
use crate::descriptor::OperationDescriptor;
use crate::error::Throwable;
use crate::joinpoint::JoinPoint;
use crate::value::{Arguments, Value};
use std::any::Any;
use std::fmt;

/// 可继续执行的调用
///
/// 与只能 `proceed` 一次的连接点不同，`Invocation::proceed` 可以被调用任意次，
/// 每次都会完整执行链上剩余的部分，结果彼此独立。
pub struct Invocation<'a> {
    operation: &'a OperationDescriptor,
    args: Arguments,
    chain: &'a InterceptorChain<'a>,
    next: usize,
}

impl<'a> Invocation<'a> {
    pub(crate) fn new(
        operation: &'a OperationDescriptor,
        args: Arguments,
        chain: &'a InterceptorChain<'a>,
        next: usize,
    ) -> Self {
        Self {
            operation,
            args,
            chain,
            next,
        }
    }

    /// 被调用的操作
    pub fn operation(&self) -> &OperationDescriptor {
        self.operation
    }

    /// 参数快照
    pub fn args(&self) -> &Arguments {
        &self.args
    }

    /// 按下标取出具体类型的参数
    pub fn arg<T: Any + Clone>(&self, index: usize) -> Result<T, Throwable> {
        self.args.get(index)
    }

    /// 连接点视图
    pub fn join_point(&self) -> JoinPoint<'_> {
        JoinPoint::new(self.operation, &self.args)
    }

    /// 使用原始参数继续执行
    pub fn proceed(&self) -> Result<Value, Throwable> {
        self.chain.proceed_from(self.next, self.args.clone())
    }

    /// 使用替换后的参数继续执行
    pub fn proceed_with(&self, args: Arguments) -> Result<Value, Throwable> {
        self.chain.proceed_from(self.next, args)
    }
}

impl fmt::Debug for Invocation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("operation", &self.operation.to_string())
            .field("args", &self.args)
            .field("next", &self.next)
            .finish()
    }
}
