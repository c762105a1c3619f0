//! 默认值合成
//!
//! 无目标的 mock 在没有匹配打桩时，以及录制期间的调用，都需要一个按声明返回类型合成的默认值。

use crate::value::{TypeDesc, Value};
use once_cell::sync::Lazy;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

/// 默认值合成器
pub trait DefaultValueSynthesizer: Send + Sync {
    /// 为给定类型合成默认值，无法合成时返回 `None`
    fn synthesize(&self, ty: &TypeDesc) -> Option<Value>;
}

type Factory = Arc<dyn Fn() -> Value + Send + Sync>;

fn factory<T: Any + Default + Send + Sync>() -> (TypeId, Factory) {
    (TypeId::of::<T>(), Arc::new(|| Value::new(T::default())))
}

/// 内置默认值：单元类型、布尔、字符、所有整数与浮点类型、String
static BUILTIN_DEFAULTS: Lazy<HashMap<TypeId, Factory>> = Lazy::new(|| {
    [
        factory::<()>(),
        factory::<bool>(),
        factory::<char>(),
        factory::<i8>(),
        factory::<i16>(),
        factory::<i32>(),
        factory::<i64>(),
        factory::<i128>(),
        factory::<isize>(),
        factory::<u8>(),
        factory::<u16>(),
        factory::<u32>(),
        factory::<u64>(),
        factory::<u128>(),
        factory::<usize>(),
        factory::<f32>(),
        factory::<f64>(),
        factory::<String>(),
    ]
    .into_iter()
    .collect()
});

/// 基于类型表的默认值合成器
///
/// 先查自定义覆盖，再查内置表；都没有时返回 `None`（调用方使用 null 占位）。
#[derive(Clone, Default)]
pub struct TypeDefaults {
    overrides: HashMap<TypeId, Factory>,
}

impl TypeDefaults {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为类型 `T` 注册固定的默认值
    pub fn with_value<T: Any + Clone + Send + Sync>(mut self, value: T) -> Self {
        self.overrides
            .insert(TypeId::of::<T>(), Arc::new(move || Value::new(value.clone())));
        self
    }

    /// 为类型 `T` 注册 `T::default()`
    pub fn with_default<T: Any + Default + Send + Sync>(mut self) -> Self {
        let (id, factory) = factory::<T>();
        self.overrides.insert(id, factory);
        self
    }
}

impl DefaultValueSynthesizer for TypeDefaults {
    fn synthesize(&self, ty: &TypeDesc) -> Option<Value> {
        self.overrides
            .get(&ty.id())
            .or_else(|| BUILTIN_DEFAULTS.get(&ty.id()))
            .map(|factory| factory())
    }
}
