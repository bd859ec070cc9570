//! Bean 定义
//!
//! 定义描述 "如何为某个 (类型, 限定符, 作用域限定符) 构造实例"，由实例注册表持有，
//! 解析引擎只读使用。

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::BoxError;
use crate::parameters::{AnyArc, ParametersHolder};
use crate::qualifier::{Qualifier, TypeKey};
use crate::scope::Scope;

/// 定义的构造策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// 单例：容器生命周期内只创建一次
    Singleton,
    /// 工厂：每次请求都创建新实例
    Factory,
    /// 作用域：每个作用域实例创建一次
    Scoped,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Singleton => "Singleton",
            Kind::Factory => "Factory",
            Kind::Scoped => "Scoped",
        };
        f.write_str(name)
    }
}

/// 类型擦除的构造函数
pub type DefinitionFn = dyn Fn(&Scope, &ParametersHolder) -> Result<AnyArc, BoxError> + Send + Sync;

/// 实例释放回调
pub type OnCloseCallback = dyn Fn(&AnyArc) + Send + Sync;

/// 生命周期回调
#[derive(Clone, Default)]
pub struct Callbacks {
    pub on_close: Option<Arc<OnCloseCallback>>,
}

/// Bean 定义
#[derive(Clone)]
pub struct BeanDefinition {
    pub scope_qualifier: Qualifier,
    pub primary_type: TypeKey,
    pub qualifier: Option<Qualifier>,
    pub kind: Kind,
    pub created_at_start: bool,
    pub callbacks: Callbacks,
    definition: Arc<DefinitionFn>,
}

impl BeanDefinition {
    fn typed<T, F>(kind: Kind, factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Scope, &ParametersHolder) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        let definition: Arc<DefinitionFn> =
            Arc::new(move |scope: &Scope, params: &ParametersHolder| {
                factory(scope, params).map(|value| Arc::new(value) as AnyArc)
            });
        Self {
            scope_qualifier: Qualifier::root(),
            primary_type: TypeKey::of::<T>(),
            qualifier: None,
            kind,
            created_at_start: false,
            callbacks: Callbacks::default(),
            definition,
        }
    }

    /// 单例定义，默认声明在根作用域
    pub fn singleton<T, F>(factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Scope, &ParametersHolder) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Self::typed(Kind::Singleton, factory)
    }

    /// 工厂定义：每次请求创建新实例
    pub fn factory<T, F>(factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Scope, &ParametersHolder) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Self::typed(Kind::Factory, factory)
    }

    /// 作用域定义：在 `scope_qualifier` 标识的作用域内每个实例缓存一次
    pub fn scoped<T, F>(scope_qualifier: impl Into<Qualifier>, factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Scope, &ParametersHolder) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Self::typed(Kind::Scoped, factory).in_scope(scope_qualifier)
    }

    /// 外部构造值的定义，构造函数直接返回该值
    pub(crate) fn from_value(
        kind: Kind,
        scope_qualifier: Qualifier,
        primary_type: TypeKey,
        qualifier: Option<Qualifier>,
        value: AnyArc,
    ) -> Self {
        Self {
            scope_qualifier,
            primary_type,
            qualifier,
            kind,
            created_at_start: false,
            callbacks: Callbacks::default(),
            definition: Arc::new(move |_: &Scope, _: &ParametersHolder| Ok(Arc::clone(&value))),
        }
    }

    #[must_use]
    pub fn named(mut self, qualifier: impl Into<Qualifier>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    #[must_use]
    pub fn in_scope(mut self, scope_qualifier: impl Into<Qualifier>) -> Self {
        self.scope_qualifier = scope_qualifier.into();
        self
    }

    /// 标记为启动时创建（仅对单例有效）
    #[must_use]
    pub fn created_at_start(mut self) -> Self {
        self.created_at_start = true;
        self
    }

    /// 设置释放回调，回调收到被释放实例的具体类型
    #[must_use]
    pub fn on_close<T, F>(mut self, callback: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&T) + Send + Sync + 'static,
    {
        let callback: Arc<OnCloseCallback> = Arc::new(move |value: &AnyArc| {
            if let Some(typed) = value.downcast_ref::<T>() {
                callback(typed);
            }
        });
        self.callbacks.on_close = Some(callback);
        self
    }

    /// 调用构造函数
    pub fn invoke(&self, scope: &Scope, params: &ParametersHolder) -> Result<AnyArc, BoxError> {
        (self.definition)(scope, params)
    }

    /// 调用释放回调
    pub fn close(&self, value: &AnyArc) {
        if let Some(on_close) = &self.callbacks.on_close {
            on_close(value);
        }
    }

    pub fn is_root_scoped(&self) -> bool {
        self.scope_qualifier.value() == crate::qualifier::ROOT_SCOPE_QUALIFIER
    }
}

impl fmt::Display for BeanDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:'{}'", self.kind, self.primary_type)?;
        if let Some(qualifier) = &self.qualifier {
            write!(f, ",qualifier:{qualifier}")?;
        }
        if !self.is_root_scoped() {
            write!(f, ",scope:{}", self.scope_qualifier)?;
        }
        f.write_str("]")
    }
}

impl fmt::Debug for BeanDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Engine;

    #[test]
    fn test_display() {
        let def = BeanDefinition::singleton(|_, _| Ok(Engine));
        assert!(def.to_string().starts_with("[Singleton:'"));
        assert!(!def.to_string().contains("scope:"));

        let def = BeanDefinition::scoped("Car", |_, _| Ok(Engine)).named("v8");
        let text = def.to_string();
        assert!(text.contains("qualifier:v8"));
        assert!(text.ends_with(",scope:Car]"));
    }

    #[test]
    fn test_on_close_receives_typed_value() {
        use std::sync::atomic::{AtomicU32, Ordering};

        let closed = Arc::new(AtomicU32::new(0));
        let seen = Arc::clone(&closed);
        let def = BeanDefinition::singleton(|_, _| Ok(7u32)).on_close(move |v: &u32| {
            seen.store(*v, Ordering::SeqCst);
        });

        let value: AnyArc = Arc::new(7u32);
        def.close(&value);
        assert_eq!(closed.load(Ordering::SeqCst), 7);
    }
}
