use std::sync::atomic::{AtomicBool, Ordering};

use super::InstanceFactory;
use crate::context::ResolutionContext;
use crate::definition::BeanDefinition;
use crate::error::DiResult;
use crate::parameters::AnyArc;
use crate::scope::Scope;

/// 每次请求都创建新实例，不持有任何实例
pub struct FactoryInstanceFactory {
    definition: BeanDefinition,
    created: AtomicBool,
}

impl FactoryInstanceFactory {
    pub fn new(definition: BeanDefinition) -> Self {
        Self {
            definition,
            created: AtomicBool::new(false),
        }
    }
}

impl InstanceFactory for FactoryInstanceFactory {
    fn definition(&self) -> &BeanDefinition {
        &self.definition
    }

    fn get(&self, ctx: &ResolutionContext) -> DiResult<AnyArc> {
        let instance = self.create(ctx)?;
        self.created.store(true, Ordering::Release);
        Ok(instance)
    }

    fn is_created(&self, _ctx: Option<&ResolutionContext>) -> bool {
        self.created.load(Ordering::Acquire)
    }

    // 实例归调用方所有，这里没有可释放的内容
    fn drop_instance(&self, _scope: Option<&Scope>) {}

    fn drop_all(&self) {}
}
