//! 运行时值模型
//!
//! 代理引擎在类型擦除的值上工作：
//! - [`TypeDesc`]：运行时可见的类型标识
//! - [`Value`]：可克隆、可为 null 的类型擦除值
//! - [`Arguments`]：一次调用的参数快照

use crate::error::{ProxyError, Throwable};
use once_cell::sync::Lazy;
use std::any::{Any, TypeId};
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// 基本类型集合（数值、布尔、字符）
static PRIMITIVES: Lazy<HashSet<TypeId>> = Lazy::new(|| {
    [
        TypeId::of::<bool>(),
        TypeId::of::<char>(),
        TypeId::of::<i8>(),
        TypeId::of::<i16>(),
        TypeId::of::<i32>(),
        TypeId::of::<i64>(),
        TypeId::of::<i128>(),
        TypeId::of::<isize>(),
        TypeId::of::<u8>(),
        TypeId::of::<u16>(),
        TypeId::of::<u32>(),
        TypeId::of::<u64>(),
        TypeId::of::<u128>(),
        TypeId::of::<usize>(),
        TypeId::of::<f32>(),
        TypeId::of::<f64>(),
    ]
    .into_iter()
    .collect()
});

/// 类型描述
///
/// 相等性只由 `TypeId` 决定。`wrapped` 记录 `Option<T>` / `Box<T>` 包装的内部类型，
/// 用于基本类型与其包装类型之间的放宽匹配。
#[derive(Clone, Copy)]
pub struct TypeDesc {
    name: &'static str,
    id: TypeId,
    wrapped: Option<TypeId>,
}

impl TypeDesc {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            name: std::any::type_name::<T>(),
            id: TypeId::of::<T>(),
            wrapped: None,
        }
    }

    /// `Option<T>`，记录内部类型 `T`
    pub fn optional<T: 'static>() -> Self {
        Self {
            wrapped: Some(TypeId::of::<T>()),
            ..Self::of::<Option<T>>()
        }
    }

    /// `Box<T>`，记录内部类型 `T`
    pub fn boxed<T: 'static>() -> Self {
        Self {
            wrapped: Some(TypeId::of::<T>()),
            ..Self::of::<Box<T>>()
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }

    pub fn is_unit(&self) -> bool {
        self.is::<()>()
    }

    pub fn is_primitive(&self) -> bool {
        PRIMITIVES.contains(&self.id)
    }

    /// 当前类型是否可以赋值给 `target`
    ///
    /// 相同类型总是可以赋值；基本类型与其包装类型（`Option<T>` / `Box<T>`）之间双向放宽。
    pub fn is_assignable_to(&self, target: &TypeDesc) -> bool {
        if self.id == target.id {
            return true;
        }
        if self.wrapped == Some(target.id) && target.is_primitive() {
            return true;
        }
        target.wrapped == Some(self.id) && self.is_primitive()
    }
}

impl PartialEq for TypeDesc {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeDesc {}

impl Hash for TypeDesc {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// 类型擦除的值
///
/// `Value::null()` 是引用类型的哨兵值，也是无法合成默认值时的占位符。
#[derive(Clone)]
pub struct Value {
    inner: Option<Arc<dyn Any + Send + Sync>>,
    type_name: &'static str,
    type_id: Option<TypeId>,
}

impl Value {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            inner: Some(Arc::new(value)),
            type_name: std::any::type_name::<T>(),
            type_id: Some(TypeId::of::<T>()),
        }
    }

    pub fn null() -> Self {
        Self {
            inner: None,
            type_name: "null",
            type_id: None,
        }
    }

    pub fn unit() -> Self {
        Self::new(())
    }

    pub fn is_null(&self) -> bool {
        self.inner.is_none()
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// 值的类型是否与 `ty` 完全一致（null 与任何类型都不一致）
    pub fn is_type(&self, ty: &TypeDesc) -> bool {
        self.type_id == Some(ty.id())
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        let any: &(dyn Any + Send + Sync) = &**self.inner.as_ref()?;
        any.downcast_ref::<T>()
    }

    /// 取出具体类型的值
    ///
    /// null 会得到 [`ProxyError::NullValue`]，类型不一致会得到 [`ProxyError::TypeMismatch`]。
    pub fn cast<T: Any + Clone>(&self) -> Result<T, Throwable> {
        if self.is_null() {
            return Err(ProxyError::NullValue {
                expected: std::any::type_name::<T>(),
            }
            .into());
        }
        self.downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| {
                ProxyError::TypeMismatch {
                    expected: std::any::type_name::<T>(),
                    actual: self.type_name,
                }
                .into()
            })
    }

    /// 与 [`Value::cast`] 相同，但 null 映射为 `T::default()`
    pub fn cast_or_default<T: Any + Clone + Default>(&self) -> Result<T, Throwable> {
        if self.is_null() {
            return Ok(T::default());
        }
        self.cast()
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value({})", self.type_name)
    }
}

/// 调用参数快照
#[derive(Clone, Default)]
pub struct Arguments(Vec<Value>);

impl Arguments {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn value(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    /// 按下标取出具体类型的参数
    pub fn get<T: Any + Clone>(&self, index: usize) -> Result<T, Throwable> {
        self.0
            .get(index)
            .ok_or(ProxyError::ArgumentIndex {
                index,
                len: self.0.len(),
            })?
            .cast()
    }

    /// 替换某个参数，返回新的参数快照
    pub fn with(&self, index: usize, value: Value) -> Result<Self, Throwable> {
        let mut values = self.0.clone();
        let len = values.len();
        let slot = values
            .get_mut(index)
            .ok_or(ProxyError::ArgumentIndex { index, len })?;
        *slot = value;
        Ok(Self(values))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.0.iter()
    }
}

impl From<Vec<Value>> for Arguments {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

impl fmt::Debug for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}
