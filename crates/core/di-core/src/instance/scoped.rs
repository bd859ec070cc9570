use dashmap::DashMap;
use parking_lot::ReentrantMutex;

use super::InstanceFactory;
use crate::context::ResolutionContext;
use crate::definition::BeanDefinition;
use crate::error::{DiError, DiResult};
use crate::parameters::AnyArc;
use crate::scope::{Scope, ScopeId};

/// 作用域实例工厂
///
/// 以作用域ID为键缓存实例，每个 (定义, 作用域) 至多构造一次。
///
/// - 读路径直接查询缓存，不获取工厂锁
/// - 未命中时在工厂锁内二次检查后构造
/// - `hold_instance == false` 表示值只能由外部通过 [`refresh_instance`](Self::refresh_instance) 注入
///
/// 锁属于工厂本身，不同定义之间互不竞争。锁可重入，构造函数可以在同一线程上
/// 解析该定义在其他作用域中的实例。
pub struct ScopedInstanceFactory {
    definition: BeanDefinition,
    hold_instance: bool,
    values: DashMap<ScopeId, AnyArc>,
    lock: ReentrantMutex<()>,
}

impl ScopedInstanceFactory {
    pub fn new(definition: BeanDefinition, hold_instance: bool) -> Self {
        Self {
            definition,
            hold_instance,
            values: DashMap::new(),
            lock: ReentrantMutex::new(()),
        }
    }

    /// 当前缓存的作用域数量
    pub fn size(&self) -> usize {
        self.values.len()
    }

    fn cached(&self, scope_id: &str) -> Option<AnyArc> {
        self.values.get(scope_id).map(|entry| AnyArc::clone(entry.value()))
    }

    /// 强制设置某个作用域的缓存值
    pub fn refresh_instance(&self, scope_id: &str, instance: AnyArc) {
        let _guard = self.lock.lock();
        self.values.insert(scope_id.to_owned(), instance);
    }

    fn check_scope_qualifier(&self, ctx: &ResolutionContext) -> DiResult<()> {
        let declared = &self.definition.scope_qualifier;
        let scope = ctx.scope();
        if scope.scope_qualifier() != declared && ctx.scope_archetype() != Some(declared) {
            return Err(DiError::WrongScopeQualifier {
                scope_id: scope.id().to_owned(),
                definition: self.definition.to_string(),
            });
        }
        Ok(())
    }
}

impl InstanceFactory for ScopedInstanceFactory {
    fn definition(&self) -> &BeanDefinition {
        &self.definition
    }

    fn get(&self, ctx: &ResolutionContext) -> DiResult<AnyArc> {
        self.check_scope_qualifier(ctx)?;

        let scope_id = ctx.scope().id();
        if let Some(existing) = self.cached(scope_id) {
            return Ok(existing);
        }

        let _guard = self.lock.lock();
        if let Some(existing) = self.cached(scope_id) {
            return Ok(existing);
        }
        // close 先置位再在同一把锁内清理缓存
        if ctx.scope().is_closed() {
            return Err(DiError::ClosedScope {
                scope_id: scope_id.to_owned(),
            });
        }
        if !self.hold_instance {
            return Err(DiError::MissingScopeValue {
                scope_id: scope_id.to_owned(),
                definition: self.definition.to_string(),
            });
        }

        // 构造失败时不写入缓存，下一次请求会重新构造
        let created = super::create_instance(&self.definition, ctx)?;
        self.values.insert(scope_id.to_owned(), AnyArc::clone(&created));
        Ok(created)
    }

    fn is_created(&self, ctx: Option<&ResolutionContext>) -> bool {
        match ctx {
            Some(ctx) => self.values.contains_key(ctx.scope().id()),
            None => !self.values.is_empty(),
        }
    }

    fn drop_instance(&self, scope: Option<&Scope>) {
        let Some(scope) = scope else {
            return;
        };
        let _guard = self.lock.lock();
        if let Some((_, value)) = self.values.remove(scope.id()) {
            self.definition.close(&value);
        }
    }

    fn drop_all(&self) {
        let _guard = self.lock.lock();
        let released: Vec<AnyArc> = self
            .values
            .iter()
            .map(|entry| AnyArc::clone(entry.value()))
            .collect();
        for value in &released {
            self.definition.close(value);
        }
        self.values.clear();
    }

    fn as_scoped(&self) -> Option<&ScopedInstanceFactory> {
        Some(self)
    }
}
