//! 依赖容器
//!
//! [`Container`] 持有实例注册表、作用域注册表和解析器，是创建作用域和
//! 从根作用域解析实例的入口。容器可以廉价克隆，所有克隆共享同一份状态。

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::builder::ContainerBuilder;
use crate::config::ContainerConfig;
use crate::error::{DiError, DiResult};
use crate::logger::ResolutionLogger;
use crate::parameters::{AnyArc, ParametersHolder};
use crate::qualifier::Qualifier;
use crate::registry::InstanceRegistry;
use crate::resolver::CoreResolver;
use crate::scope::{Scope, ScopeId};
use crate::scope_registry::ScopeRegistry;

pub(crate) struct ContainerInner {
    pub(crate) config: ContainerConfig,
    pub(crate) logger: ResolutionLogger,
    pub(crate) instances: Arc<InstanceRegistry>,
    pub(crate) scopes: Arc<ScopeRegistry>,
    pub(crate) resolver: CoreResolver,
    pub(crate) closed: AtomicBool,
}

impl ContainerInner {
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// 依赖容器
#[derive(Clone)]
pub struct Container {
    pub(crate) inner: Arc<ContainerInner>,
}

impl Container {
    /// 创建容器构建器
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    pub(crate) fn from_inner(inner: Arc<ContainerInner>) -> Self {
        Self { inner }
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.inner.config
    }

    pub fn logger(&self) -> ResolutionLogger {
        self.inner.logger
    }

    pub fn root_scope(&self) -> Arc<Scope> {
        Arc::clone(self.inner.scopes.root())
    }

    #[cfg(test)]
    pub(crate) fn scope_registry(&self) -> &ScopeRegistry {
        &self.inner.scopes
    }

    // ------------------------------------------------------------------
    // 根作用域解析
    // ------------------------------------------------------------------

    pub fn get<T: Any + Send + Sync>(&self) -> DiResult<Arc<T>> {
        self.inner.scopes.root().get::<T>()
    }

    pub fn get_named<T: Any + Send + Sync>(&self, qualifier: impl Into<Qualifier>) -> DiResult<Arc<T>> {
        self.inner.scopes.root().get_named::<T>(qualifier)
    }

    pub fn get_with<T: Any + Send + Sync>(
        &self,
        qualifier: Option<Qualifier>,
        parameters: Option<ParametersHolder>,
    ) -> DiResult<Arc<T>> {
        self.inner.scopes.root().get_with::<T>(qualifier, parameters)
    }

    pub fn get_or_none<T: Any + Send + Sync>(&self) -> DiResult<Option<Arc<T>>> {
        self.inner.scopes.root().get_or_none::<T>()
    }

    /// 在根作用域注入外部实例
    pub fn declare<T: Any + Send + Sync>(&self, instance: T, qualifier: Option<Qualifier>) -> DiResult<()> {
        self.inner.scopes.root().declare(instance, qualifier, true)
    }

    // ------------------------------------------------------------------
    // 作用域管理
    // ------------------------------------------------------------------

    /// 创建作用域
    pub fn create_scope(&self, id: impl Into<ScopeId>, qualifier: impl Into<Qualifier>) -> DiResult<Arc<Scope>> {
        self.create_scope_with(id, qualifier, None, None)
    }

    /// 创建作用域，可携带外部对象和原型
    ///
    /// 新作用域自动链接到根作用域。限定符未声明时，严格模式下返回
    /// [`DiError::NoScopeDefinition`]，否则只记录警告。
    pub fn create_scope_with(
        &self,
        id: impl Into<ScopeId>,
        qualifier: impl Into<Qualifier>,
        source: Option<AnyArc>,
        archetype: Option<Qualifier>,
    ) -> DiResult<Arc<Scope>> {
        self.ensure_open()?;
        let inner = &self.inner;
        let id = id.into();
        let qualifier = qualifier.into();

        if !inner.scopes.is_scope_defined(&qualifier) {
            if inner.config.strict_scopes {
                return Err(DiError::NoScopeDefinition { qualifier });
            }
            inner
                .logger
                .warn(|| format!("| Scope '{qualifier}' not defined. Creating it ..."));
        }

        let scope = Scope::new(
            id,
            qualifier,
            archetype,
            source,
            Arc::downgrade(&self.inner),
            inner.logger,
        );
        inner.scopes.register(Arc::clone(&scope))?;
        scope.link_to(inner.scopes.root())?;
        inner
            .logger
            .debug(|| format!("|- (+) Scope - id:'{}' q:'{}'", scope.id(), scope.scope_qualifier()));
        Ok(scope)
    }

    /// 为外部对象创建作用域，限定符取对象的类型名
    pub fn create_scope_for<S: Any + Send + Sync>(
        &self,
        id: impl Into<ScopeId>,
        source: Arc<S>,
    ) -> DiResult<Arc<Scope>> {
        let source: AnyArc = source;
        self.create_scope_with(id, Qualifier::of::<S>(), Some(source), None)
    }

    /// 获取已有作用域，不存在时创建
    pub fn get_or_create_scope(&self, id: impl Into<ScopeId>, qualifier: impl Into<Qualifier>) -> DiResult<Arc<Scope>> {
        let id = id.into();
        match self.get_scope_or_none(&id) {
            Some(scope) => Ok(scope),
            None => self.create_scope(id, qualifier),
        }
    }

    pub fn get_scope(&self, id: &str) -> DiResult<Arc<Scope>> {
        self.get_scope_or_none(id).ok_or_else(|| DiError::ScopeNotFound {
            scope_id: id.to_owned(),
        })
    }

    pub fn get_scope_or_none(&self, id: &str) -> Option<Arc<Scope>> {
        self.inner.scopes.get(id)
    }

    /// 关闭并移除作用域
    pub fn delete_scope(&self, id: &str) -> DiResult<()> {
        self.get_scope(id)?.close()
    }

    /// 当前作用域数量（包含根作用域）
    pub fn scope_count(&self) -> usize {
        self.inner.scopes.len()
    }

    pub fn definition_count(&self) -> usize {
        self.inner.instances.size()
    }

    // ------------------------------------------------------------------
    // 生命周期
    // ------------------------------------------------------------------

    /// 创建所有标记为启动时创建的单例
    pub fn create_eager_instances(&self) -> DiResult<()> {
        self.ensure_open()?;
        self.inner.instances.create_all_eager_instances(self.inner.scopes.root())
    }

    /// 关闭容器：关闭所有作用域并释放全部实例
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.inner.scopes.close_all_scopes();
        self.inner.instances.close();
        self.inner.scopes.root().close_internal();
        self.inner.logger.info(|| "Container closed".to_string());
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    fn ensure_open(&self) -> DiResult<()> {
        if self.is_closed() {
            return Err(DiError::ContainerClosed);
        }
        Ok(())
    }
}
