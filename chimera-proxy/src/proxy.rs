//! 代理构建
//!
//! `#[proxy]` 生成的代理类型都实现 [`Surrogate`]，并通过 [`ProxyBuilder`] 创建各自的分发控制器。

use crate::aspect::Aspect;
use crate::config::{ProxySettings, Settings};
use crate::defaults::{DefaultValueSynthesizer, TypeDefaults};
use crate::dispatch::DispatchController;
use crate::registry::get_global_registry;
use std::any::Any;
use std::sync::Arc;

/// 代理对象
///
/// 每个代理都拥有一个独立的 [`DispatchController`]，代理之间不共享可变状态。
pub trait Surrogate {
    fn controller(&self) -> &DispatchController;
}

/// 代理构建器
pub struct ProxyBuilder {
    owner: String,
    aspects: Vec<Arc<Aspect>>,
    settings: ProxySettings,
    defaults: TypeDefaults,
    synthesizer: Option<Arc<dyn DefaultValueSynthesizer>>,
}

impl ProxyBuilder {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            aspects: Vec::new(),
            settings: ProxySettings::default(),
            defaults: TypeDefaults::new(),
            synthesizer: None,
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// 追加一个切面
    pub fn aspect(mut self, aspect: Aspect) -> Self {
        self.aspects.push(Arc::new(aspect));
        self
    }

    /// 追加多个切面（保持给定顺序）
    pub fn aspects(mut self, aspects: impl IntoIterator<Item = Aspect>) -> Self {
        self.aspects.extend(aspects.into_iter().map(Arc::new));
        self
    }

    /// 加载全局注册表中适用于当前所有者的切面
    pub fn with_registered_aspects(mut self) -> Self {
        let registered = get_global_registry().aspects_for(&self.owner);
        tracing::debug!(
            proxy = %self.owner,
            count = registered.len(),
            "Loading registered aspects"
        );
        self.aspects.extend(registered);
        self
    }

    pub fn settings(mut self, settings: ProxySettings) -> Self {
        self.settings = settings;
        self
    }

    /// 从全部配置中取代理相关部分
    pub fn configure(self, settings: &Settings) -> Self {
        self.settings(settings.proxy)
    }

    /// 严格 mock：未打桩的调用抛出失败
    pub fn strict(self) -> Self {
        self.settings(ProxySettings::strict())
    }

    /// 覆盖类型 `T` 的默认值
    pub fn default_value<T: Any + Clone + Send + Sync>(mut self, value: T) -> Self {
        self.defaults = self.defaults.with_value(value);
        self
    }

    /// 使用自定义的默认值合成器（覆盖 `default_value` 的设置）
    pub fn synthesizer(mut self, synthesizer: Arc<dyn DefaultValueSynthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    /// 构建分发控制器
    pub fn build(self, has_target: bool) -> DispatchController {
        let synthesizer: Arc<dyn DefaultValueSynthesizer> = match self.synthesizer {
            Some(synthesizer) => synthesizer,
            None => Arc::new(self.defaults),
        };
        tracing::debug!(
            proxy = %self.owner,
            has_target,
            aspects = self.aspects.len(),
            "Building proxy"
        );
        DispatchController::new(
            self.owner,
            has_target,
            self.settings,
            synthesizer,
            self.aspects,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DefaultAnswer;
    use crate::descriptor::OperationDescriptor;
    use crate::pointcut::Pointcut;
    use crate::value::{Arguments, TypeDesc};

    #[test]
    fn test_builder_defaults() {
        let controller = ProxyBuilder::new("List").build(false);

        assert_eq!(controller.owner(), "List");
        assert!(!controller.has_target());
        assert_eq!(controller.settings().default_answer, DefaultAnswer::ReturnDefaults);
        assert_eq!(controller.aspect_count(), 0);
    }

    #[test]
    fn test_builder_aspects_and_strict() {
        let controller = ProxyBuilder::new("List")
            .aspect(Aspect::new("first", Pointcut::all()))
            .aspects(vec![Aspect::new("second", Pointcut::all())])
            .strict()
            .build(true);

        assert_eq!(controller.aspect_count(), 2);
        assert!(controller.has_target());
        assert_eq!(controller.settings().default_answer, DefaultAnswer::Fail);
    }

    #[test]
    fn test_default_value_override() {
        let op = OperationDescriptor::new("List", "describe").returns(TypeDesc::of::<String>());
        let controller = ProxyBuilder::new("List")
            .default_value("<empty>".to_string())
            .build(false);

        let text: String = controller.dispatch(&op, Arguments::empty(), None).unwrap();
        assert_eq!(text, "<empty>");
    }

    #[test]
    fn test_configure_from_settings() {
        let settings = Settings::from_toml_str("[proxy]\ndefault_answer = \"fail\"\n").unwrap();
        let controller = ProxyBuilder::new("List").configure(&settings).build(false);

        assert_eq!(controller.settings().default_answer, DefaultAnswer::Fail);
    }
}
