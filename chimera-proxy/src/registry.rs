//! 全局切面注册表
//!
//! 通过 inventory 在编译期收集的切面，在首次访问时统一实例化。
//! 代理构建器调用 `with_registered_aspects()` 时按所有者名称挑选适用的切面。

use crate::aspect::{Aspect, AspectRegistration};
use crate::error::ProxyResult;
use crate::pointcut::NamePattern;
use once_cell::sync::Lazy;
use std::sync::Arc;

/// 全局切面注册表
///
/// 首次访问时自动加载所有通过 inventory 注册的切面
static GLOBAL_ASPECT_REGISTRY: Lazy<AspectRegistry> = Lazy::new(|| {
    let mut registry = AspectRegistry::new();
    registry.auto_load_aspects();
    registry
});

/// 获取全局切面注册表
pub fn get_global_registry() -> &'static AspectRegistry {
    &GLOBAL_ASPECT_REGISTRY
}

struct RegisteredAspect {
    owner: NamePattern,
    aspect: Arc<Aspect>,
}

/// 切面注册表
pub struct AspectRegistry {
    entries: Vec<RegisteredAspect>,
}

impl AspectRegistry {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// 注册切面，`owner_pattern` 支持 `*` 通配符
    pub fn register(&mut self, owner_pattern: &str, aspect: Aspect) -> ProxyResult<()> {
        let owner = NamePattern::compile(owner_pattern)?;
        tracing::debug!(
            "Registering aspect: {} for owners matching '{}'",
            aspect.name(),
            owner_pattern
        );
        self.entries.push(RegisteredAspect {
            owner,
            aspect: Arc::new(aspect),
        });
        Ok(())
    }

    /// 获取适用于指定所有者的切面（保持注册顺序）
    pub fn aspects_for(&self, owner: &str) -> Vec<Arc<Aspect>> {
        self.entries
            .iter()
            .filter(|entry| entry.owner.matches(owner))
            .map(|entry| Arc::clone(&entry.aspect))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 从 inventory 自动加载所有注册的切面
    ///
    /// 模式无效的注册项会被跳过并记录警告
    pub fn auto_load_aspects(&mut self) {
        let registrations: Vec<&AspectRegistration> =
            inventory::iter::<AspectRegistration>.into_iter().collect();
        tracing::debug!("Auto-loading {} aspect(s) from registry", registrations.len());

        for registration in registrations {
            tracing::debug!(
                "  ├─ Loading aspect: {} for owners: {}",
                registration.name,
                registration.owner_pattern
            );
            if let Err(e) = self.register(registration.owner_pattern, registration.create_instance())
            {
                tracing::warn!(
                    aspect = registration.name,
                    error = %e,
                    "Skipping aspect registration"
                );
            }
        }
    }
}

impl Default for AspectRegistry {
    fn default() -> Self {
        Self::new()
    }
}
