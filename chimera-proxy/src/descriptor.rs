//! 操作描述（OperationDescriptor）
//!
//! 可拦截操作的不可变标识，由代理构造方提供

use crate::value::TypeDesc;
use std::fmt;
use std::hash::{Hash, Hasher};

/// 操作描述
///
/// 两个描述相等当且仅当声明类型、名称、参数类型和返回类型全部相同。
/// 注解只是元数据，不参与相等性比较。
#[derive(Clone)]
pub struct OperationDescriptor {
    owner: &'static str,
    name: &'static str,
    params: Vec<TypeDesc>,
    returns: TypeDesc,
    annotations: Vec<&'static str>,
}

impl OperationDescriptor {
    /// 创建新的操作描述，默认无参数、返回 `()`
    pub fn new(owner: &'static str, name: &'static str) -> Self {
        Self {
            owner,
            name,
            params: Vec::new(),
            returns: TypeDesc::of::<()>(),
            annotations: Vec::new(),
        }
    }

    /// 追加一个参数类型
    pub fn param(mut self, ty: TypeDesc) -> Self {
        self.params.push(ty);
        self
    }

    /// 设置返回类型
    pub fn returns(mut self, ty: TypeDesc) -> Self {
        self.returns = ty;
        self
    }

    /// 追加一个注解
    pub fn annotated(mut self, annotation: &'static str) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn owner(&self) -> &'static str {
        self.owner
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn params(&self) -> &[TypeDesc] {
        &self.params
    }

    pub fn return_type(&self) -> &TypeDesc {
        &self.returns
    }

    pub fn annotations(&self) -> &[&'static str] {
        &self.annotations
    }

    pub fn has_annotation(&self, annotation: &str) -> bool {
        self.annotations.iter().any(|a| *a == annotation)
    }

    /// 获取完整的方法签名，例如 `Sequence::get(usize) -> alloc::string::String`
    pub fn signature(&self) -> String {
        let params: Vec<&str> = self.params.iter().map(|p| p.name()).collect();
        format!(
            "{}::{}({}) -> {}",
            self.owner,
            self.name,
            params.join(", "),
            self.returns.name()
        )
    }
}

impl PartialEq for OperationDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.owner == other.owner
            && self.name == other.name
            && self.params == other.params
            && self.returns == other.returns
    }
}

impl Eq for OperationDescriptor {}

impl Hash for OperationDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.owner.hash(state);
        self.name.hash(state);
        self.params.hash(state);
        self.returns.hash(state);
    }
}

impl fmt::Debug for OperationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationDescriptor")
            .field("signature", &self.signature())
            .field("annotations", &self.annotations)
            .finish()
    }
}

impl fmt::Display for OperationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.owner, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn get_op() -> OperationDescriptor {
        OperationDescriptor::new("Sequence", "get")
            .param(TypeDesc::of::<usize>())
            .returns(TypeDesc::of::<String>())
    }

    #[test]
    fn test_structural_equality() {
        assert_eq!(get_op(), get_op());
        assert_ne!(
            get_op(),
            OperationDescriptor::new("Sequence", "get").returns(TypeDesc::of::<String>())
        );
        assert_ne!(
            get_op(),
            get_op().param(TypeDesc::of::<bool>()),
        );
    }

    #[test]
    fn test_annotations_do_not_affect_identity() {
        let annotated = get_op().annotated("audited");

        assert_eq!(annotated, get_op());
        assert!(annotated.has_annotation("audited"));

        let set: HashSet<_> = [annotated, get_op()].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_signature() {
        assert_eq!(get_op().to_string(), "Sequence::get");
        assert_eq!(
            get_op().signature(),
            format!(
                "Sequence::get({}) -> {}",
                std::any::type_name::<usize>(),
                std::any::type_name::<String>()
            )
        );
    }
}
