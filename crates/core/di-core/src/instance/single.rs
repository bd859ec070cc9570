use parking_lot::{ReentrantMutex, RwLock};

use super::InstanceFactory;
use crate::context::ResolutionContext;
use crate::definition::BeanDefinition;
use crate::error::DiResult;
use crate::parameters::AnyArc;
use crate::scope::Scope;

/// 单例实例工厂
///
/// 读路径只取读锁；首次构造在工厂自己的可重入锁内进行并二次检查，
/// 保证构造函数至多执行一次。
pub struct SingleInstanceFactory {
    definition: BeanDefinition,
    value: RwLock<Option<AnyArc>>,
    lock: ReentrantMutex<()>,
}

impl SingleInstanceFactory {
    pub fn new(definition: BeanDefinition) -> Self {
        Self {
            definition,
            value: RwLock::new(None),
            lock: ReentrantMutex::new(()),
        }
    }

    fn current(&self) -> Option<AnyArc> {
        self.value.read().clone()
    }

    fn release(&self) {
        let _guard = self.lock.lock();
        let released = self.value.write().take();
        if let Some(value) = released {
            self.definition.close(&value);
        }
    }
}

impl InstanceFactory for SingleInstanceFactory {
    fn definition(&self) -> &BeanDefinition {
        &self.definition
    }

    fn get(&self, ctx: &ResolutionContext) -> DiResult<AnyArc> {
        if let Some(existing) = self.current() {
            return Ok(existing);
        }

        let _guard = self.lock.lock();
        if let Some(existing) = self.current() {
            return Ok(existing);
        }

        let created = self.create(ctx)?;
        *self.value.write() = Some(AnyArc::clone(&created));
        Ok(created)
    }

    fn is_created(&self, _ctx: Option<&ResolutionContext>) -> bool {
        self.value.read().is_some()
    }

    fn drop_instance(&self, _scope: Option<&Scope>) {
        self.release();
    }

    fn drop_all(&self) {
        self.release();
    }
}
