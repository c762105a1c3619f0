//! 错误类型
//!
//! - [`Throwable`]：代理调用过程中抛出的失败（目标方法或通知体产生），引擎只负责传递，不做包装或转换
//! - [`ProxyError`]：配置阶段的错误（录制、打桩、切点构建），在注册调用处同步报告

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// 配置错误
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProxyError {
    /// 同一个代理上已经存在一个未完成的录制请求
    #[error("a recording request is already pending on proxy `{0}`")]
    AlreadyRecording(String),

    /// 录制期间没有发生任何代理调用
    #[error("no invocation was recorded on proxy `{0}`")]
    NothingRecorded(String),

    /// 构建器方法至少需要一个参数
    #[error("`{builder}` requires at least one argument")]
    EmptyArgument { builder: &'static str },

    /// do_nothing() 只能用于返回 () 的方法
    #[error("do_nothing() only applies to operations returning (), but `{operation}` returns {returns}")]
    NotVoid { operation: String, returns: &'static str },

    /// 打桩返回值类型与方法声明的返回类型不一致
    #[error("stubbed value of type {actual} does not match `{operation}` returning {expected}")]
    StubTypeMismatch {
        operation: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// 参数下标越界
    #[error("argument index {index} out of bounds for {len} argument(s)")]
    ArgumentIndex { index: usize, len: usize },

    /// 值类型不匹配
    #[error("expected a value of type {expected}, found {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// 需要具体值的位置出现了 null
    #[error("null value where {expected} was required")]
    NullValue { expected: &'static str },

    /// 严格模式下调用了未打桩的方法
    #[error("unstubbed call to `{0}` on a strict mock")]
    Unstubbed(String),

    /// 切点表达式无效
    #[error("invalid pointcut pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// 配置操作结果
pub type ProxyResult<T> = Result<T, ProxyError>;

/// 代理调用中抛出的失败
///
/// 可以廉价克隆，克隆后仍然是同一个失败（[`Throwable::same_as`] 为 true），
/// 因此打桩的 `then_throw` 每次调用都抛出同一个失败实例。
///
/// 任何实现了 `std::error::Error + Send + Sync` 的错误都可以通过 `?` 转换为 `Throwable`。
#[derive(Clone)]
pub struct Throwable {
    inner: Arc<dyn StdError + Send + Sync + 'static>,
    type_name: &'static str,
}

impl Throwable {
    /// 从具体错误创建
    pub fn new<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(error),
            type_name: std::any::type_name::<E>(),
        }
    }

    /// 只包含消息的失败
    pub fn msg(message: impl fmt::Display) -> Self {
        Self::new(MessageError(message.to_string()))
    }

    /// 错误消息
    pub fn message(&self) -> String {
        self.inner.to_string()
    }

    /// 错误类型名称
    pub fn error_type(&self) -> &'static str {
        self.type_name
    }

    /// 是否为同一个失败实例
    pub fn same_as(&self, other: &Throwable) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.inner) as *const (),
            Arc::as_ptr(&other.inner) as *const (),
        )
    }

    /// 尝试向下转型为具体错误
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: StdError + 'static,
    {
        let inner: &(dyn StdError + 'static) = &*self.inner;
        inner.downcast_ref::<E>()
    }

    /// 是否为指定类型的错误
    pub fn is<E>(&self) -> bool
    where
        E: StdError + 'static,
    {
        self.downcast_ref::<E>().is_some()
    }

    /// 错误源链（cause chain）
    pub fn source_chain(&self) -> Vec<String> {
        let mut chain = Vec::new();
        let mut current = self.inner.source();
        while let Some(source) = current {
            chain.push(source.to_string());
            current = source.source();
        }
        chain
    }

    /// 获取完整的错误描述（包含源链）
    pub fn full_description(&self) -> String {
        let chain = self.source_chain();
        if chain.is_empty() {
            self.message()
        } else {
            format!("{}\nCaused by:\n  {}", self.message(), chain.join("\n  "))
        }
    }
}

impl<E> From<E> for Throwable
where
    E: StdError + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        Self::new(error)
    }
}

impl From<Throwable> for Box<dyn StdError + Send + Sync + 'static> {
    fn from(throwable: Throwable) -> Self {
        Box::new(SharedError(throwable.inner))
    }
}

impl From<Throwable> for Box<dyn StdError + 'static> {
    fn from(throwable: Throwable) -> Self {
        Box::new(SharedError(throwable.inner))
    }
}

impl AsRef<dyn StdError + Send + Sync + 'static> for Throwable {
    fn as_ref(&self) -> &(dyn StdError + Send + Sync + 'static) {
        &*self.inner
    }
}

impl fmt::Display for Throwable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl fmt::Debug for Throwable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Throwable")
            .field("type", &self.type_name)
            .field("message", &self.message())
            .finish()
    }
}

#[derive(Debug)]
struct MessageError(String);

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl StdError for MessageError {}

/// 把共享的错误重新装箱，供 `Box<dyn Error>` 使用
struct SharedError(Arc<dyn StdError + Send + Sync + 'static>);

impl fmt::Debug for SharedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for SharedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl StdError for SharedError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.source()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("outer failure")]
    struct Outer {
        #[source]
        source: std::io::Error,
    }

    #[test]
    fn test_clone_keeps_identity() {
        let original = Throwable::msg("boom");
        let cloned = original.clone();
        let other = Throwable::msg("boom");

        assert!(original.same_as(&cloned));
        assert!(!original.same_as(&other));
        assert_eq!(cloned.message(), "boom");
    }

    #[test]
    fn test_from_error_and_downcast() {
        let throwable: Throwable = ProxyError::Unstubbed("List::size".into()).into();

        assert!(throwable.is::<ProxyError>());
        assert_eq!(
            throwable.downcast_ref::<ProxyError>(),
            Some(&ProxyError::Unstubbed("List::size".into()))
        );
        assert!(throwable.error_type().ends_with("ProxyError"));
    }

    #[test]
    fn test_full_description_includes_sources() {
        let throwable = Throwable::new(Outer {
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk gone"),
        });

        assert_eq!(throwable.source_chain(), vec!["disk gone".to_string()]);
        assert_eq!(
            throwable.full_description(),
            "outer failure\nCaused by:\n  disk gone"
        );
    }

    #[test]
    fn test_question_mark_into_boxed_error() {
        fn run() -> Result<(), Box<dyn StdError + Send + Sync>> {
            Err::<(), _>(Throwable::msg("mockDoThrow"))?;
            Ok(())
        }

        assert_eq!(run().unwrap_err().to_string(), "mockDoThrow");
    }
}
