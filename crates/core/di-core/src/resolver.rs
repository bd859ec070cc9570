//! 依赖解析器
//!
//! 所有 "获取实例" 的调用最终进入 [`CoreResolver::resolve_from_context`]，
//! 按固定顺序尝试以下策略，第一个得到结果的策略胜出：
//!
//! 1. 请求作用域自身的注册表（找不到时改用作用域原型）
//! 2. 作用域的外部对象（仅限无限定符请求）
//! 3. 链接作用域（深度优先展开，去重）
//! 4. 本次调用注入的参数
//! 5. 参数栈栈顶的参数包
//! 6. 解析扩展（按注册顺序）

use std::fmt;
use std::sync::Arc;

use crate::context::ResolutionContext;
use crate::error::{DiError, DiResult};
use crate::instance::InstanceFactory;
use crate::logger::ResolutionLogger;
use crate::parameters::AnyArc;
use crate::registry::InstanceRegistry;
use crate::scope::Scope;
use crate::scope_registry::ScopeRegistry;

/// 解析扩展：内置策略全部落空后依次询问
pub trait ResolutionExtension: Send + Sync {
    fn name(&self) -> &str;

    fn resolve(&self, scope: &Scope, ctx: &ResolutionContext) -> Option<AnyArc>;
}

pub struct CoreResolver {
    instances: Arc<InstanceRegistry>,
    scopes: Arc<ScopeRegistry>,
    extensions: Vec<Arc<dyn ResolutionExtension>>,
    logger: ResolutionLogger,
}

impl CoreResolver {
    pub fn new(instances: Arc<InstanceRegistry>, scopes: Arc<ScopeRegistry>, logger: ResolutionLogger) -> Self {
        Self {
            instances,
            scopes,
            extensions: Vec::new(),
            logger,
        }
    }

    /// 追加解析扩展
    ///
    /// 需要独占访问，扩展列表在容器构建完成后不再变化。
    pub fn add_resolution_extension(&mut self, extension: Arc<dyn ResolutionExtension>) {
        self.logger
            .debug(|| format!("(+) resolution extension '{}'", extension.name()));
        self.extensions.push(extension);
    }

    pub fn extension_count(&self) -> usize {
        self.extensions.len()
    }

    /// 在 `scope` 中解析 `ctx` 描述的请求
    pub fn resolve_from_context(&self, scope: &Scope, ctx: ResolutionContext) -> DiResult<AnyArc> {
        if let Some(value) = self.resolve_from_registry(scope, &ctx)? {
            return Ok(value);
        }
        if let Some(value) = self.resolve_from_injected_parameters(&ctx) {
            return Ok(value);
        }
        if let Some(value) = self.resolve_from_stacked_parameters(scope, &ctx) {
            return Ok(value);
        }
        if let Some(value) = self.resolve_in_extensions(scope, &ctx) {
            return Ok(value);
        }
        Err(DiError::NoDefinitionFound {
            type_name: ctx.type_key().name(),
            qualifier: ctx.qualifier().cloned(),
        })
    }

    /// 注册表、外部对象和链接作用域三个策略
    fn resolve_from_registry(&self, scope: &Scope, ctx: &ResolutionContext) -> DiResult<Option<AnyArc>> {
        if let Some((factory, ctx)) = self.find_local(scope, ctx) {
            return factory.get(&ctx).map(Some);
        }

        if let Some(source) = self.resolve_from_scope_source(scope, ctx) {
            return Ok(Some(source));
        }

        match self.find_linked(scope, ctx) {
            Some((factory, ctx)) => factory.get(&ctx).map(Some),
            None => Ok(None),
        }
    }

    fn find_local(
        &self,
        scope: &Scope,
        ctx: &ResolutionContext,
    ) -> Option<(Arc<dyn InstanceFactory>, ResolutionContext)> {
        let type_key = ctx.type_key();
        let qualifier = ctx.qualifier();

        if let Some(factory) = self
            .instances
            .resolve_definition(type_key, qualifier, scope.scope_qualifier())
        {
            return Some((factory, ctx.clone()));
        }

        if scope.is_root() {
            return None;
        }
        let archetype = scope.scope_archetype()?;
        self.logger
            .debug(|| format!("|- ? {} look at scope archetype '{archetype}'", ctx.debug_tag()));
        self.instances
            .resolve_definition(type_key, qualifier, archetype)
            .map(|factory| (factory, ctx.with_scope_archetype(Some(archetype.clone()))))
    }

    fn resolve_from_scope_source(&self, scope: &Scope, ctx: &ResolutionContext) -> Option<AnyArc> {
        if scope.is_root() || ctx.qualifier().is_some() {
            return None;
        }
        let source = scope.source_value()?;
        if !ctx.type_key().is_instance(source.as_ref()) {
            return None;
        }
        self.logger
            .debug(|| format!("|- ? {} look at scope source", ctx.debug_tag()));
        Some(source)
    }

    /// 在展开后的链接作用域中查找定义
    ///
    /// 每个链接作用域先按原型、再按自身限定符查找。命中的作用域不是根作用域时，
    /// 派生一个绑定到该作用域的上下文交给工厂。
    fn find_linked(
        &self,
        scope: &Scope,
        ctx: &ResolutionContext,
    ) -> Option<(Arc<dyn InstanceFactory>, ResolutionContext)> {
        let type_key = ctx.type_key();
        let qualifier = ctx.qualifier();

        for linked in self.scopes.flatten(scope) {
            let by_archetype = linked
                .scope_archetype()
                .and_then(|archetype| self.instances.resolve_definition(type_key, qualifier, archetype));
            let via_archetype = by_archetype.is_some();
            let found = by_archetype.or_else(|| {
                self.instances
                    .resolve_definition(type_key, qualifier, linked.scope_qualifier())
            });
            let Some(factory) = found else {
                continue;
            };

            self.logger
                .debug(|| format!("|- ? {} found in linked scope {linked}", ctx.debug_tag()));
            if linked.is_root() {
                return Some((factory, ctx.clone()));
            }
            let mut derived = ctx.for_scope(Arc::clone(&linked));
            if via_archetype || scope.scope_archetype().is_some() {
                derived = derived.with_scope_archetype(linked.scope_archetype().cloned());
            }
            return Some((factory, derived));
        }
        None
    }

    fn resolve_from_injected_parameters(&self, ctx: &ResolutionContext) -> Option<AnyArc> {
        let parameters = ctx.parameters().filter(|p| !p.is_empty())?;
        self.logger
            .debug(|| format!("|- ? {} look in injected parameters", ctx.debug_tag()));
        parameters.get_by_type(ctx.type_key())
    }

    fn resolve_from_stacked_parameters(&self, scope: &Scope, ctx: &ResolutionContext) -> Option<AnyArc> {
        let current = scope.current_parameters().filter(|p| !p.is_empty())?;
        self.logger
            .debug(|| format!("|- ? {} look in stack parameters", ctx.debug_tag()));
        current.get_by_type(ctx.type_key())
    }

    fn resolve_in_extensions(&self, scope: &Scope, ctx: &ResolutionContext) -> Option<AnyArc> {
        self.extensions.iter().find_map(|extension| {
            self.logger.debug(|| format!("|- ['{}'] ?", extension.name()));
            extension.resolve(scope, ctx)
        })
    }
}

impl fmt::Debug for CoreResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.extensions.iter().map(|e| e.name()).collect();
        f.debug_struct("CoreResolver")
            .field("extensions", &names)
            .finish_non_exhaustive()
    }
}
