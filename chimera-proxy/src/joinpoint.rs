//! 连接点（JoinPoint）定义
//!
//! 连接点是一次代理调用的只读视图：被调用的操作和参数快照。
//! 前置、后置、返回后、异常通知都以它作为输入。

use crate::descriptor::OperationDescriptor;
use crate::error::Throwable;
use crate::value::Arguments;
use std::any::Any;
use std::fmt;

/// 连接点信息
#[derive(Clone, Copy)]
pub struct JoinPoint<'a> {
    operation: &'a OperationDescriptor,
    args: &'a Arguments,
}

impl<'a> JoinPoint<'a> {
    pub fn new(operation: &'a OperationDescriptor, args: &'a Arguments) -> Self {
        Self { operation, args }
    }

    /// 被调用的操作
    pub fn operation(&self) -> &'a OperationDescriptor {
        self.operation
    }

    /// 方法名称
    pub fn name(&self) -> &'static str {
        self.operation.name()
    }

    /// 参数快照
    pub fn args(&self) -> &'a Arguments {
        self.args
    }

    /// 按下标取出具体类型的参数
    pub fn arg<T: Any + Clone>(&self, index: usize) -> Result<T, Throwable> {
        self.args.get(index)
    }

    /// 获取完整的方法签名
    pub fn signature(&self) -> String {
        self.operation.signature()
    }
}

impl fmt::Debug for JoinPoint<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinPoint")
            .field("operation", &self.operation.to_string())
            .field("args", self.args)
            .finish()
    }
}

impl fmt::Display for JoinPoint<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.operation)
    }
}
