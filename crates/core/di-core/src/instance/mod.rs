//! 实例工厂
//!
//! 每个定义对应一个实例工厂，工厂决定实例是否复用以及何时释放：
//!
//! - [`FactoryInstanceFactory`]：每次请求新建
//! - [`SingleInstanceFactory`]：全局单例（支持启动时创建）
//! - [`ScopedInstanceFactory`]：按作用域ID缓存

mod factory;
mod scoped;
mod single;

pub use factory::FactoryInstanceFactory;
pub use scoped::ScopedInstanceFactory;
pub use single::SingleInstanceFactory;

use std::sync::Arc;

use crate::context::ResolutionContext;
use crate::definition::{BeanDefinition, Kind};
use crate::error::{DiError, DiResult};
use crate::parameters::AnyArc;
use crate::scope::Scope;

/// 实例工厂 trait
pub trait InstanceFactory: Send + Sync {
    /// 工厂对应的定义
    fn definition(&self) -> &BeanDefinition;

    /// 调用定义的构造函数创建新实例
    fn create(&self, ctx: &ResolutionContext) -> DiResult<AnyArc> {
        create_instance(self.definition(), ctx)
    }

    /// 按策略复用或创建实例
    fn get(&self, ctx: &ResolutionContext) -> DiResult<AnyArc>;

    /// 是否已经创建过实例
    fn is_created(&self, ctx: Option<&ResolutionContext>) -> bool;

    /// 释放实例并触发 `on_close`
    fn drop_instance(&self, scope: Option<&Scope>);

    /// 释放全部实例
    fn drop_all(&self);

    fn as_scoped(&self) -> Option<&ScopedInstanceFactory> {
        None
    }
}

/// 构造实例，用户错误被包装为 [`DiError::InstanceCreation`]
pub(crate) fn create_instance(definition: &BeanDefinition, ctx: &ResolutionContext) -> DiResult<AnyArc> {
    let logger = ctx.logger();
    logger.debug(|| format!("| (+) '{definition}'"));

    let parameters = ctx.parameters().cloned().unwrap_or_default();
    definition.invoke(ctx.scope(), &parameters).map_err(|e| {
        logger.error(|| format!("* Instance creation error : could not create instance for '{definition}': {e}"));
        DiError::instance_creation(definition.to_string(), e)
    })
}

/// 根据定义的构造策略创建实例工厂
pub(crate) fn factory_for(definition: BeanDefinition) -> Arc<dyn InstanceFactory> {
    match definition.kind {
        Kind::Singleton => Arc::new(SingleInstanceFactory::new(definition)),
        Kind::Factory => Arc::new(FactoryInstanceFactory::new(definition)),
        Kind::Scoped => Arc::new(ScopedInstanceFactory::new(definition, true)),
    }
}
