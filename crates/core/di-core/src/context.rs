//! 解析上下文
//!
//! 每次解析请求都会新建一个 [`ResolutionContext`]。上下文本身不可变，
//! 回退到其他作用域或原型时生成新的上下文值，而不是原地修改。

use std::fmt;
use std::sync::Arc;

use crate::logger::ResolutionLogger;
use crate::parameters::ParametersHolder;
use crate::qualifier::{Qualifier, TypeKey};
use crate::scope::Scope;

#[derive(Clone)]
pub struct ResolutionContext {
    scope: Arc<Scope>,
    type_key: TypeKey,
    qualifier: Option<Qualifier>,
    parameters: Option<ParametersHolder>,
    scope_archetype: Option<Qualifier>,
    logger: ResolutionLogger,
}

impl ResolutionContext {
    pub fn new(
        scope: Arc<Scope>,
        type_key: TypeKey,
        qualifier: Option<Qualifier>,
        parameters: Option<ParametersHolder>,
        logger: ResolutionLogger,
    ) -> Self {
        Self {
            scope,
            type_key,
            qualifier,
            parameters,
            scope_archetype: None,
            logger,
        }
    }

    pub fn scope(&self) -> &Arc<Scope> {
        &self.scope
    }

    pub fn type_key(&self) -> TypeKey {
        self.type_key
    }

    pub fn qualifier(&self) -> Option<&Qualifier> {
        self.qualifier.as_ref()
    }

    pub fn parameters(&self) -> Option<&ParametersHolder> {
        self.parameters.as_ref()
    }

    /// 覆盖后的作用域原型
    pub fn scope_archetype(&self) -> Option<&Qualifier> {
        self.scope_archetype.as_ref()
    }

    pub fn logger(&self) -> ResolutionLogger {
        self.logger
    }

    /// 记录满足请求的原型，返回新的上下文
    #[must_use]
    pub fn with_scope_archetype(&self, archetype: Option<Qualifier>) -> Self {
        Self {
            scope_archetype: archetype,
            ..self.clone()
        }
    }

    /// 绑定到另一个作用域的派生上下文，原型覆盖被清空
    #[must_use]
    pub fn for_scope(&self, scope: Arc<Scope>) -> Self {
        Self {
            scope,
            scope_archetype: None,
            ..self.clone()
        }
    }

    /// 日志中使用的请求描述
    pub fn debug_tag(&self) -> String {
        match &self.qualifier {
            Some(qualifier) => format!("'{}' - q:'{}'", self.type_key, qualifier),
            None => format!("'{}'", self.type_key),
        }
    }
}

impl fmt::Debug for ResolutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolutionContext")
            .field("scope", &self.scope.id())
            .field("type", &self.type_key)
            .field("qualifier", &self.qualifier)
            .field("scope_archetype", &self.scope_archetype)
            .finish_non_exhaustive()
    }
}
