//! 单元测试用的手写代理，形状与 `#[proxy]` 生成的代码一致

use crate::descriptor::OperationDescriptor;
use crate::dispatch::DispatchController;
use crate::error::Throwable;
use crate::proxy::{ProxyBuilder, Surrogate};
use crate::value::{Arguments, TypeDesc, Value};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::sync::Arc;

pub(crate) trait Sequence: Send + Sync {
    fn size(&self) -> Result<usize, Throwable>;
    fn get(&self, index: usize) -> Result<String, Throwable>;
    fn clear(&self) -> Result<(), Throwable>;
}

/// 真实实现
pub(crate) struct VecSequence {
    items: Mutex<Vec<String>>,
}

impl VecSequence {
    pub(crate) fn of(items: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            items: Mutex::new(items.iter().map(|s| s.to_string()).collect()),
        })
    }
}

impl Sequence for VecSequence {
    fn size(&self) -> Result<usize, Throwable> {
        Ok(self.items.lock().len())
    }

    fn get(&self, index: usize) -> Result<String, Throwable> {
        self.items
            .lock()
            .get(index)
            .cloned()
            .ok_or_else(|| Throwable::msg(format!("index {} out of bounds", index)))
    }

    fn clear(&self) -> Result<(), Throwable> {
        self.items.lock().clear();
        Ok(())
    }
}

static SIZE: Lazy<OperationDescriptor> =
    Lazy::new(|| OperationDescriptor::new("Sequence", "size").returns(TypeDesc::of::<usize>()));

static GET: Lazy<OperationDescriptor> = Lazy::new(|| {
    OperationDescriptor::new("Sequence", "get")
        .param(TypeDesc::of::<usize>())
        .returns(TypeDesc::of::<String>())
});

static CLEAR: Lazy<OperationDescriptor> =
    Lazy::new(|| OperationDescriptor::new("Sequence", "clear").annotated("mutating"));

pub(crate) struct SequenceProxy {
    target: Option<Arc<dyn Sequence>>,
    controller: DispatchController,
}

impl SequenceProxy {
    pub(crate) fn mock() -> Self {
        Self {
            target: None,
            controller: ProxyBuilder::new("Sequence").build(false),
        }
    }

    pub(crate) fn spy(target: Arc<dyn Sequence>) -> Self {
        Self {
            target: Some(target),
            controller: ProxyBuilder::new("Sequence").build(true),
        }
    }

    pub(crate) fn size_op() -> OperationDescriptor {
        SIZE.clone()
    }

    pub(crate) fn get_op() -> OperationDescriptor {
        GET.clone()
    }
}

impl Surrogate for SequenceProxy {
    fn controller(&self) -> &DispatchController {
        &self.controller
    }
}

impl Sequence for SequenceProxy {
    fn size(&self) -> Result<usize, Throwable> {
        let args = Arguments::empty();
        match &self.target {
            Some(target) => {
                let proceed: &dyn Fn(&Arguments) -> Result<usize, Throwable> =
                    &|_| target.size();
                self.controller.dispatch(&SIZE, args, Some(proceed))
            }
            None => self.controller.dispatch(&SIZE, args, None),
        }
    }

    fn get(&self, index: usize) -> Result<String, Throwable> {
        let args = Arguments::new(vec![Value::new(index)]);
        match &self.target {
            Some(target) => {
                let proceed: &dyn Fn(&Arguments) -> Result<String, Throwable> =
                    &|args| target.get(args.get(0)?);
                self.controller.dispatch(&GET, args, Some(proceed))
            }
            None => self.controller.dispatch(&GET, args, None),
        }
    }

    fn clear(&self) -> Result<(), Throwable> {
        let args = Arguments::empty();
        match &self.target {
            Some(target) => {
                let proceed: &dyn Fn(&Arguments) -> Result<(), Throwable> = &|_| target.clear();
                self.controller.dispatch(&CLEAR, args, Some(proceed))
            }
            None => self.controller.dispatch(&CLEAR, args, None),
        }
    }
}
