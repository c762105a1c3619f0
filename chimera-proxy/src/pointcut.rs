//! 切点（Pointcut）
//!
//! 切点是作用在操作描述上的有序谓词列表，操作匹配当且仅当满足所有谓词（合取）。
//! 空列表匹配所有操作。匹配在每次调用时重新计算，不做缓存。

use crate::descriptor::OperationDescriptor;
use crate::error::{ProxyError, ProxyResult};
use crate::value::TypeDesc;
use regex::Regex;
use std::fmt;
use std::sync::Arc;

/// 方法过滤器
pub type MethodFilter = Arc<dyn Fn(&OperationDescriptor) -> bool + Send + Sync>;

#[derive(Clone)]
struct Filter {
    label: String,
    predicate: MethodFilter,
}

/// 切点
#[derive(Clone, Default)]
pub struct Pointcut {
    filters: Vec<Filter>,
}

impl Pointcut {
    /// 匹配所有方法
    pub fn all() -> Self {
        Self::default()
    }

    /// 精确匹配单个操作
    pub fn exact(operation: OperationDescriptor) -> Self {
        Self::all().exactly(operation)
    }

    /// 追加精确匹配谓词
    pub fn exactly(self, operation: OperationDescriptor) -> Self {
        let label = format!("exact({})", operation);
        self.filter(label, move |candidate| *candidate == operation)
    }

    /// 追加返回类型谓词：返回类型可以赋值给任意一个给定类型即匹配
    pub fn return_type(self, types: &[TypeDesc]) -> ProxyResult<Self> {
        if types.is_empty() {
            return Err(ProxyError::EmptyArgument {
                builder: "return_type",
            });
        }
        let types = types.to_vec();
        let label = format!("return_type({:?})", types);
        Ok(self.filter(label, move |op| {
            types.iter().any(|ty| op.return_type().is_assignable_to(ty))
        }))
    }

    /// 追加注解谓词：带有任意一个给定注解即匹配
    pub fn annotated_with(self, annotations: &[&'static str]) -> ProxyResult<Self> {
        if annotations.is_empty() {
            return Err(ProxyError::EmptyArgument {
                builder: "annotated_with",
            });
        }
        let annotations = annotations.to_vec();
        let label = format!("annotated_with({:?})", annotations);
        Ok(self.filter(label, move |op| {
            annotations.iter().any(|a| op.has_annotation(a))
        }))
    }

    /// 追加自定义谓词
    pub fn where_method<F>(self, predicate: F) -> Self
    where
        F: Fn(&OperationDescriptor) -> bool + Send + Sync + 'static,
    {
        self.filter("where_method(..)".to_string(), predicate)
    }

    /// 追加方法名谓词
    ///
    /// 支持的模式：
    /// - `*` - 匹配任意名称
    /// - `get*` - 以 get 开头
    /// - `*_all` - 以 _all 结尾
    pub fn named(self, pattern: &str) -> ProxyResult<Self> {
        let matcher = NamePattern::compile(pattern)?;
        let label = format!("named({})", pattern);
        Ok(self.filter(label, move |op| matcher.matches(op.name())))
    }

    /// 追加方法名正则谓词
    pub fn name_regex(self, regex: Regex) -> Self {
        let label = format!("name_regex({})", regex.as_str());
        self.filter(label, move |op| regex.is_match(op.name()))
    }

    /// 追加声明类型谓词（支持 `*` 通配符）
    pub fn declared_by(self, pattern: &str) -> ProxyResult<Self> {
        let matcher = NamePattern::compile(pattern)?;
        let label = format!("declared_by({})", pattern);
        Ok(self.filter(label, move |op| matcher.matches(op.owner())))
    }

    /// 追加 execution 表达式
    ///
    /// 格式：`返回类型 类型名.方法名(参数)`，例如 `* UserService.get_*(..)`。
    /// 只解析类型和方法名部分，参数列表被忽略；没有类型部分时只匹配方法名。
    pub fn execution(self, expression: &str) -> ProxyResult<Self> {
        let invalid = |reason: &str| ProxyError::InvalidPattern {
            pattern: expression.to_string(),
            reason: reason.to_string(),
        };
        let signature = match expression.trim().split_once(char::is_whitespace) {
            Some((_, signature)) if !signature.trim().is_empty() => signature.trim(),
            _ => return Err(invalid("expected `<return> <Type>.<method>(..)`")),
        };
        let method_part = match signature.split_once('(') {
            Some((method_part, params)) if params.trim_end().ends_with(')') => {
                method_part.trim_end()
            }
            Some(_) => return Err(invalid("unclosed parameter list")),
            None => signature,
        };
        if method_part.contains(char::is_whitespace) {
            return Err(invalid("unexpected whitespace in method pattern"));
        }

        let (owner, method) = match method_part.split_once('.') {
            Some((owner, method)) => (NamePattern::compile(owner)?, NamePattern::compile(method)?),
            None => (NamePattern::compile("*")?, NamePattern::compile(method_part)?),
        };
        let label = format!("execution({})", expression);
        Ok(self.filter(label, move |op| {
            owner.matches(op.owner()) && method.matches(op.name())
        }))
    }

    fn filter<F>(mut self, label: String, predicate: F) -> Self
    where
        F: Fn(&OperationDescriptor) -> bool + Send + Sync + 'static,
    {
        self.filters.push(Filter {
            label,
            predicate: Arc::new(predicate),
        });
        self
    }

    /// 检查操作是否满足所有谓词
    pub fn matches(&self, operation: &OperationDescriptor) -> bool {
        self.filters.iter().all(|f| (f.predicate)(operation))
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl fmt::Debug for Pointcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.filters.is_empty() {
            return write!(f, "All");
        }
        let labels: Vec<&str> = self.filters.iter().map(|f| f.label.as_str()).collect();
        write!(f, "{}", labels.join(" && "))
    }
}

/// 简单的名称模式（支持 `*` 通配符）
#[derive(Clone)]
pub(crate) enum NamePattern {
    Any,
    Exact(String),
    Wildcard(Regex),
}

impl NamePattern {
    pub(crate) fn compile(pattern: &str) -> ProxyResult<Self> {
        if pattern == "*" {
            return Ok(NamePattern::Any);
        }
        if !pattern.contains('*') {
            return Ok(NamePattern::Exact(pattern.to_string()));
        }

        // 将 * 转换为正则表达式，其余部分按字面量处理
        let escaped: Vec<String> = pattern.split('*').map(regex::escape).collect();
        let regex_pattern = format!("^{}$", escaped.join(".*"));
        Regex::new(&regex_pattern)
            .map(NamePattern::Wildcard)
            .map_err(|e| ProxyError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })
    }

    pub(crate) fn matches(&self, target: &str) -> bool {
        match self {
            NamePattern::Any => true,
            NamePattern::Exact(name) => name == target,
            NamePattern::Wildcard(regex) => regex.is_match(target),
        }
    }
}
