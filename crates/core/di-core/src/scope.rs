//! 作用域
//!
//! 作用域是作用域图中的一个节点：约束一组缓存实例的生命周期，并可链接到其他作用域
//! 作为解析回退。链接以作用域ID保存，图中的环不会造成引用环。

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};
use std::time::Instant;

use parking_lot::{Mutex, RwLock};

use crate::container::ContainerInner;
use crate::context::ResolutionContext;
use crate::error::{DiError, DiResult};
use crate::logger::ResolutionLogger;
use crate::parameters::{AnyArc, ParametersHolder};
use crate::qualifier::{Qualifier, TypeKey};

/// 作用域ID
pub type ScopeId = String;

/// 根作用域ID
pub const ROOT_SCOPE_ID: &str = "_root_";

/// 生成随机作用域ID
pub fn new_scope_id() -> ScopeId {
    uuid::Uuid::new_v4().to_string()
}

/// 作用域关闭回调
pub trait ScopeCallback: Send + Sync {
    fn on_scope_close(&self, scope: &Scope);
}

impl<F> ScopeCallback for F
where
    F: Fn(&Scope) + Send + Sync,
{
    fn on_scope_close(&self, scope: &Scope) {
        self(scope)
    }
}

pub struct Scope {
    id: ScopeId,
    scope_qualifier: Qualifier,
    scope_archetype: Option<Qualifier>,
    is_root: bool,
    linked_scopes: RwLock<Vec<ScopeId>>,
    source_value: RwLock<Option<AnyArc>>,
    /// 每个线程各自的参数栈，栈顶为最近压入的参数包
    parameter_stacks: Mutex<HashMap<ThreadId, Vec<ParametersHolder>>>,
    callbacks: Mutex<Vec<Arc<dyn ScopeCallback>>>,
    closed: AtomicBool,
    this: Weak<Scope>,
    container: Weak<ContainerInner>,
    logger: ResolutionLogger,
}

impl Scope {
    pub(crate) fn new(
        id: ScopeId,
        scope_qualifier: Qualifier,
        scope_archetype: Option<Qualifier>,
        source_value: Option<AnyArc>,
        container: Weak<ContainerInner>,
        logger: ResolutionLogger,
    ) -> Arc<Self> {
        Self::build(id, scope_qualifier, scope_archetype, false, source_value, container, logger)
    }

    pub(crate) fn new_root(container: Weak<ContainerInner>, logger: ResolutionLogger) -> Arc<Self> {
        Self::build(
            ROOT_SCOPE_ID.to_owned(),
            Qualifier::root(),
            None,
            true,
            None,
            container,
            logger,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        id: ScopeId,
        scope_qualifier: Qualifier,
        scope_archetype: Option<Qualifier>,
        is_root: bool,
        source_value: Option<AnyArc>,
        container: Weak<ContainerInner>,
        logger: ResolutionLogger,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            id,
            scope_qualifier,
            scope_archetype,
            is_root,
            linked_scopes: RwLock::new(Vec::new()),
            source_value: RwLock::new(source_value),
            parameter_stacks: Mutex::new(HashMap::new()),
            callbacks: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            this: this.clone(),
            container,
            logger,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn scope_qualifier(&self) -> &Qualifier {
        &self.scope_qualifier
    }

    pub fn scope_archetype(&self) -> Option<&Qualifier> {
        self.scope_archetype.as_ref()
    }

    pub fn is_root(&self) -> bool {
        self.is_root
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// 作用域包装的外部对象
    pub fn source_value(&self) -> Option<AnyArc> {
        self.source_value.read().clone()
    }

    /// 以具体类型获取外部对象
    pub fn source<S: Any + Send + Sync>(&self) -> Option<Arc<S>> {
        self.source_value().and_then(|value| value.downcast::<S>().ok())
    }

    // ------------------------------------------------------------------
    // 作用域图
    // ------------------------------------------------------------------

    /// 添加一条指向 `other` 的有向边
    ///
    /// 链接保持声明顺序且不重复；根作用域不能链接到其他作用域。
    pub fn link_to(&self, other: &Scope) -> DiResult<()> {
        if self.is_root {
            return Err(DiError::RootScopeLink);
        }
        self.ensure_open()?;
        if other.id == self.id {
            return Ok(());
        }
        let mut links = self.linked_scopes.write();
        if !links.iter().any(|id| *id == other.id) {
            links.push(other.id.clone());
        }
        Ok(())
    }

    /// 移除指向 `other` 的边
    pub fn unlink(&self, other: &Scope) {
        self.linked_scopes.write().retain(|id| *id != other.id);
    }

    /// 按声明顺序返回链接的作用域ID
    pub fn linked_scope_ids(&self) -> Vec<ScopeId> {
        self.linked_scopes.read().clone()
    }

    // ------------------------------------------------------------------
    // 参数栈
    // ------------------------------------------------------------------

    /// 为当前线程压入参数包，guard 释放时弹出
    pub(crate) fn push_parameters(&self, parameters: ParametersHolder) -> ParameterStackGuard<'_> {
        let thread = thread::current().id();
        self.parameter_stacks
            .lock()
            .entry(thread)
            .or_default()
            .push(parameters);
        ParameterStackGuard { scope: self, thread }
    }

    /// 当前线程栈顶的参数包
    pub fn current_parameters(&self) -> Option<ParametersHolder> {
        let thread = thread::current().id();
        self.parameter_stacks
            .lock()
            .get(&thread)
            .and_then(|stack| stack.last().cloned())
    }

    fn pop_parameters(&self, thread: ThreadId) {
        let mut stacks = self.parameter_stacks.lock();
        if let Some(stack) = stacks.get_mut(&thread) {
            stack.pop();
            if stack.is_empty() {
                stacks.remove(&thread);
            }
        }
    }

    // ------------------------------------------------------------------
    // 解析
    // ------------------------------------------------------------------

    pub fn get<T: Any + Send + Sync>(&self) -> DiResult<Arc<T>> {
        self.get_with(None, None)
    }

    pub fn get_named<T: Any + Send + Sync>(&self, qualifier: impl Into<Qualifier>) -> DiResult<Arc<T>> {
        self.get_with(Some(qualifier.into()), None)
    }

    /// 携带限定符和注入参数解析实例
    pub fn get_with<T: Any + Send + Sync>(
        &self,
        qualifier: Option<Qualifier>,
        parameters: Option<ParametersHolder>,
    ) -> DiResult<Arc<T>> {
        let value = self.resolve(TypeKey::of::<T>(), qualifier, parameters)?;
        value.downcast::<T>().map_err(|_| DiError::TypeMismatch {
            expected: std::any::type_name::<T>(),
        })
    }

    /// 未找到定义时返回 `Ok(None)`，其他错误照常返回
    pub fn get_or_none<T: Any + Send + Sync>(&self) -> DiResult<Option<Arc<T>>> {
        match self.get::<T>() {
            Ok(value) => Ok(Some(value)),
            Err(DiError::NoDefinitionFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// 类型擦除的解析入口
    pub fn resolve(
        &self,
        type_key: TypeKey,
        qualifier: Option<Qualifier>,
        parameters: Option<ParametersHolder>,
    ) -> DiResult<AnyArc> {
        let inner = self.container()?;
        self.ensure_open()?;
        let scope = self.this.upgrade().ok_or_else(|| DiError::ClosedScope {
            scope_id: self.id.clone(),
        })?;

        let ctx = ResolutionContext::new(scope, type_key, qualifier, parameters.clone(), self.logger);
        let tracing = self.logger.is_at(log::Level::Debug);
        let start = tracing.then(Instant::now);
        if tracing {
            self.logger
                .debug(|| format!("|- {} ...", ctx.debug_tag()));
        }

        let result = match parameters {
            Some(parameters) => {
                self.logger.debug(|| format!("| >> parameters {parameters:?}"));
                let _stacked = self.push_parameters(parameters);
                inner.resolver.resolve_from_context(self, ctx)
            }
            None => inner.resolver.resolve_from_context(self, ctx),
        };

        if let Some(start) = start {
            self.logger.debug(|| {
                format!(
                    "|- '{}' in {:.3} ms",
                    type_key,
                    start.elapsed().as_secs_f64() * 1000.0
                )
            });
        }
        result
    }

    // ------------------------------------------------------------------
    // 外部实例
    // ------------------------------------------------------------------

    /// 向作用域注入外部构造的实例
    ///
    /// 非根作用域会得到一个作用域定义并直接写入缓存；`hold_instance` 为 `false` 时，
    /// 同一限定符的其他作用域在注入前请求该类型会得到 [`DiError::MissingScopeValue`]。
    /// 该作用域定义已存在时只写入缓存并沿用其原有的 `hold_instance`，参数只对新建的定义生效。
    /// 根作用域上的声明等价于一个已构造的单例。
    pub fn declare<T: Any + Send + Sync>(
        &self,
        instance: T,
        qualifier: Option<Qualifier>,
        hold_instance: bool,
    ) -> DiResult<()> {
        let inner = self.container()?;
        self.ensure_open()?;
        let value: AnyArc = Arc::new(instance);
        let type_key = TypeKey::of::<T>();
        if self.is_root {
            inner.instances.declare_root_instance(value, type_key, qualifier)
        } else {
            inner.instances.declare_scoped_instance(
                value,
                type_key,
                qualifier,
                &self.scope_qualifier,
                &self.id,
                hold_instance,
            )
        }
    }

    // ------------------------------------------------------------------
    // 生命周期
    // ------------------------------------------------------------------

    pub fn register_callback(&self, callback: Arc<dyn ScopeCallback>) {
        self.callbacks.lock().push(callback);
    }

    /// 关闭作用域：触发回调，释放该作用域缓存的所有实例并从作用域图中移除
    pub fn close(&self) -> DiResult<()> {
        if self.is_root {
            return Err(DiError::RootScopeClose);
        }
        self.close_internal();
        Ok(())
    }

    pub(crate) fn close_internal(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.logger
            .debug(|| format!("|- (-) Scope - id:'{}'", self.id));

        let callbacks = std::mem::take(&mut *self.callbacks.lock());
        for callback in callbacks {
            callback.on_scope_close(self);
        }

        if let Some(inner) = self.container.upgrade() {
            if !self.is_root {
                inner.scopes.remove(&self.id);
            }
            inner.instances.drop_scope_instances(self);
        }

        self.source_value.write().take();
        self.linked_scopes.write().clear();
        self.parameter_stacks.lock().clear();
    }

    fn ensure_open(&self) -> DiResult<()> {
        if self.is_closed() {
            return Err(DiError::ClosedScope {
                scope_id: self.id.clone(),
            });
        }
        Ok(())
    }

    fn container(&self) -> DiResult<Arc<ContainerInner>> {
        let inner = self.container.upgrade().ok_or(DiError::ContainerClosed)?;
        if inner.is_closed() {
            return Err(DiError::ContainerClosed);
        }
        Ok(inner)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "['{}']", self.id)
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.id)
            .field("qualifier", &self.scope_qualifier)
            .field("archetype", &self.scope_archetype)
            .field("root", &self.is_root)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// 参数栈守卫，drop 时弹出压入的参数包
pub(crate) struct ParameterStackGuard<'a> {
    scope: &'a Scope,
    thread: ThreadId,
}

impl Drop for ParameterStackGuard<'_> {
    fn drop(&mut self) {
        self.scope.pop_parameters(self.thread);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::Container;

    #[test]
    fn test_link_is_ordered_set() {
        let container = Container::builder().build().unwrap();
        let a = container.create_scope("a", "A").unwrap();
        let b = container.create_scope("b", "B").unwrap();

        a.link_to(&b).unwrap();
        a.link_to(&b).unwrap();
        a.link_to(&a).unwrap();

        assert_eq!(a.linked_scope_ids(), vec![ROOT_SCOPE_ID.to_owned(), "b".to_owned()]);

        a.unlink(&b);
        assert_eq!(a.linked_scope_ids(), vec![ROOT_SCOPE_ID.to_owned()]);
    }

    #[test]
    fn test_root_cannot_link_or_close() {
        let container = Container::builder().build().unwrap();
        let a = container.create_scope("a", "A").unwrap();
        let root = container.root_scope();

        assert!(matches!(root.link_to(&a), Err(DiError::RootScopeLink)));
        assert!(matches!(root.close(), Err(DiError::RootScopeClose)));
    }

    #[test]
    fn test_parameter_stack_is_per_thread() {
        let container = Container::builder().build().unwrap();
        let scope = container.create_scope("a", "A").unwrap();

        let guard = scope.push_parameters(ParametersHolder::new().with(1u8));
        {
            let _inner = scope.push_parameters(ParametersHolder::new().with(2u8));
            assert_eq!(*scope.current_parameters().unwrap().get::<u8>().unwrap(), 2);
        }
        assert_eq!(*scope.current_parameters().unwrap().get::<u8>().unwrap(), 1);

        let other = Arc::clone(&scope);
        let seen = thread::spawn(move || other.current_parameters().is_none())
            .join()
            .unwrap();
        assert!(seen);

        drop(guard);
        assert!(scope.current_parameters().is_none());
    }

    #[test]
    fn test_closed_scope_rejects_resolution() {
        let container = Container::builder().build().unwrap();
        let scope = container.create_scope("a", "A").unwrap();
        scope.close().unwrap();

        assert!(scope.is_closed());
        assert!(matches!(scope.get::<u32>(), Err(DiError::ClosedScope { .. })));
        assert!(scope.linked_scope_ids().is_empty());
    }

    #[test]
    fn test_close_runs_callbacks_once() {
        use std::sync::atomic::AtomicUsize;

        let container = Container::builder().build().unwrap();
        let scope = container.create_scope("a", "A").unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        scope.register_callback(Arc::new(move |closing: &Scope| {
            assert_eq!(closing.id(), "a");
            seen.fetch_add(1, Ordering::SeqCst);
        }));

        scope.close().unwrap();
        scope.close().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
