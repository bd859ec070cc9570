//! 实例注册表
//!
//! 按 (类型, 限定符, 作用域限定符) 索引实例工厂。写入集中在容器构建阶段，
//! 运行期的 `declare` 只会追加或替换单个条目。

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::context::ResolutionContext;
use crate::definition::{BeanDefinition, Kind};
use crate::error::{DiError, DiResult};
use crate::instance::{self, InstanceFactory, ScopedInstanceFactory, SingleInstanceFactory};
use crate::logger::ResolutionLogger;
use crate::parameters::AnyArc;
use crate::qualifier::{Qualifier, TypeKey};
use crate::scope::Scope;

/// 注册表索引键
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct IndexKey {
    type_key: TypeKey,
    qualifier: Option<Qualifier>,
    scope_qualifier: Qualifier,
}

impl IndexKey {
    pub fn new(type_key: TypeKey, qualifier: Option<Qualifier>, scope_qualifier: Qualifier) -> Self {
        Self {
            type_key,
            qualifier,
            scope_qualifier,
        }
    }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let qualifier = self.qualifier.as_ref().map(Qualifier::value).unwrap_or_default();
        write!(f, "{}:{}:{}", self.type_key, qualifier, self.scope_qualifier)
    }
}

impl fmt::Debug for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

pub struct InstanceRegistry {
    instances: RwLock<HashMap<IndexKey, Arc<dyn InstanceFactory>>>,
    /// 启动时创建的单例
    eager: RwLock<Vec<Arc<dyn InstanceFactory>>>,
    allow_override: bool,
    logger: ResolutionLogger,
}

impl InstanceRegistry {
    pub fn new(allow_override: bool, logger: ResolutionLogger) -> Self {
        Self {
            instances: RwLock::new(HashMap::new()),
            eager: RwLock::new(Vec::new()),
            allow_override,
            logger,
        }
    }

    /// 保存定义并为其创建实例工厂
    pub fn save_definition(&self, definition: BeanDefinition) -> DiResult<()> {
        let key = IndexKey::new(
            definition.primary_type,
            definition.qualifier.clone(),
            definition.scope_qualifier.clone(),
        );
        let eager = definition.created_at_start && definition.kind == Kind::Singleton;
        let factory = instance::factory_for(definition);
        self.save_mapping(key, Arc::clone(&factory), self.allow_override)?;
        if eager {
            self.eager.write().push(factory);
        }
        Ok(())
    }

    fn save_mapping(&self, key: IndexKey, factory: Arc<dyn InstanceFactory>, allow_override: bool) -> DiResult<()> {
        let mut instances = self.instances.write();
        if instances.contains_key(&key) {
            if !allow_override {
                return Err(DiError::DefinitionOverride { key: key.to_string() });
            }
            self.logger
                .warn(|| format!("(+) override index '{key}' -> '{}'", factory.definition()));
        }
        self.logger
            .debug(|| format!("(+) index '{key}' -> '{}'", factory.definition()));
        instances.insert(key, factory);
        Ok(())
    }

    /// 按 (类型, 限定符, 作用域限定符) 精确查找
    pub fn resolve_definition(
        &self,
        type_key: TypeKey,
        qualifier: Option<&Qualifier>,
        scope_qualifier: &Qualifier,
    ) -> Option<Arc<dyn InstanceFactory>> {
        let key = IndexKey::new(type_key, qualifier.cloned(), scope_qualifier.clone());
        self.instances.read().get(&key).cloned()
    }

    /// 创建所有标记为启动时创建的单例
    pub fn create_all_eager_instances(&self, root: &Arc<Scope>) -> DiResult<()> {
        let eager = std::mem::take(&mut *self.eager.write());
        if eager.is_empty() {
            return Ok(());
        }
        self.logger
            .debug(|| format!("Creating eager instances ... ({})", eager.len()));
        for factory in eager {
            let ctx = ResolutionContext::new(
                Arc::clone(root),
                factory.definition().primary_type,
                factory.definition().qualifier.clone(),
                None,
                self.logger,
            );
            factory.get(&ctx)?;
        }
        Ok(())
    }

    /// 释放某个作用域缓存的全部作用域实例
    pub fn drop_scope_instances(&self, scope: &Scope) {
        let scoped: Vec<Arc<dyn InstanceFactory>> = self
            .instances
            .read()
            .values()
            .filter(|factory| factory.as_scoped().is_some())
            .cloned()
            .collect();
        for factory in scoped {
            factory.drop_instance(Some(scope));
        }
    }

    /// 向非根作用域注入外部实例
    pub fn declare_scoped_instance(
        &self,
        value: AnyArc,
        type_key: TypeKey,
        qualifier: Option<Qualifier>,
        scope_qualifier: &Qualifier,
        scope_id: &str,
        hold_instance: bool,
    ) -> DiResult<()> {
        let key = IndexKey::new(type_key, qualifier.clone(), scope_qualifier.clone());
        let existing = self.instances.read().get(&key).cloned();
        if let Some(scoped) = existing.as_deref().and_then(|factory| factory.as_scoped()) {
            scoped.refresh_instance(scope_id, value);
            return Ok(());
        }

        let definition = BeanDefinition::from_value(
            Kind::Scoped,
            scope_qualifier.clone(),
            type_key,
            qualifier,
            AnyArc::clone(&value),
        );
        let factory = ScopedInstanceFactory::new(definition, hold_instance);
        factory.refresh_instance(scope_id, value);
        self.save_mapping(key, Arc::new(factory), true)
    }

    /// 在根作用域注入外部实例，等价于已构造的单例
    ///
    /// 显式注入总是允许覆盖已有定义。
    pub fn declare_root_instance(
        &self,
        value: AnyArc,
        type_key: TypeKey,
        qualifier: Option<Qualifier>,
    ) -> DiResult<()> {
        let definition = BeanDefinition::from_value(Kind::Singleton, Qualifier::root(), type_key, qualifier, value);
        let key = IndexKey::new(type_key, definition.qualifier.clone(), Qualifier::root());
        self.save_mapping(key, Arc::new(SingleInstanceFactory::new(definition)), true)
    }

    pub fn size(&self) -> usize {
        self.instances.read().len()
    }

    /// 释放全部实例并清空注册表
    pub fn close(&self) {
        let factories: Vec<Arc<dyn InstanceFactory>> =
            self.instances.write().drain().map(|(_, factory)| factory).collect();
        for factory in factories {
            factory.drop_all();
        }
        self.eager.write().clear();
    }
}
