//! 容器构建器
//!
//! 提供流式API收集配置、定义、作用域限定符和解析扩展，最后构建 [`Container`]。

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use crate::config::ContainerConfig;
use crate::container::{Container, ContainerInner};
use crate::definition::BeanDefinition;
use crate::error::DiResult;
use crate::logger::ResolutionLogger;
use crate::qualifier::Qualifier;
use crate::registry::InstanceRegistry;
use crate::resolver::{CoreResolver, ResolutionExtension};
use crate::scope::Scope;
use crate::scope_registry::ScopeRegistry;

/// 容器构建器
#[derive(Default)]
pub struct ContainerBuilder {
    /// 容器配置
    config: ContainerConfig,

    /// 待注册的定义，按添加顺序保存
    definitions: Vec<BeanDefinition>,

    /// 显式声明的作用域限定符
    scope_definitions: Vec<Qualifier>,

    /// 解析扩展
    extensions: Vec<Arc<dyn ResolutionExtension>>,
}

impl ContainerBuilder {
    /// 创建新的容器构建器
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用指定配置
    pub fn with_config(mut self, config: ContainerConfig) -> Self {
        self.config = config;
        self
    }

    /// 添加定义
    pub fn definition(mut self, definition: BeanDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    /// 批量添加定义
    pub fn definitions(mut self, definitions: impl IntoIterator<Item = BeanDefinition>) -> Self {
        self.definitions.extend(definitions);
        self
    }

    /// 声明作用域限定符
    ///
    /// 作用域定义引用的限定符会被自动声明，这里用于声明没有任何定义的作用域。
    pub fn scope_definition(mut self, qualifier: impl Into<Qualifier>) -> Self {
        self.scope_definitions.push(qualifier.into());
        self
    }

    /// 添加解析扩展，按添加顺序询问
    pub fn with_resolution_extension(mut self, extension: Arc<dyn ResolutionExtension>) -> Self {
        self.extensions.push(extension);
        self
    }

    /// 构建容器
    ///
    /// 定义按添加顺序写入注册表；配置允许时随后创建启动时单例。
    pub fn build(self) -> DiResult<Container> {
        let Self {
            config,
            definitions,
            scope_definitions,
            extensions,
        } = self;

        let logger = ResolutionLogger::new(config.level_filter()?);
        let instances = Arc::new(InstanceRegistry::new(config.allow_override, logger));

        let mut declared = scope_definitions;
        for definition in definitions {
            if !definition.is_root_scoped() {
                declared.push(definition.scope_qualifier.clone());
            }
            instances.save_definition(definition)?;
        }

        let inner = Arc::new_cyclic(|weak| {
            let root = Scope::new_root(weak.clone(), logger);
            let scopes = Arc::new(ScopeRegistry::new(root));
            for qualifier in declared {
                scopes.declare_scope_definition(qualifier);
            }

            let mut resolver = CoreResolver::new(Arc::clone(&instances), Arc::clone(&scopes), logger);
            for extension in extensions {
                resolver.add_resolution_extension(extension);
            }

            ContainerInner {
                config,
                logger,
                instances,
                scopes,
                resolver,
                closed: AtomicBool::new(false),
            }
        });

        let container = Container::from_inner(inner);
        logger.info(|| {
            format!(
                "Container started - {} definition(s), {} extension(s)",
                container.definition_count(),
                container.inner.resolver.extension_count()
            )
        });

        if container.config().create_eager_instances {
            container.create_eager_instances()?;
        }
        Ok(container)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiError;

    struct Engine;

    #[test]
    fn test_scoped_definitions_declare_their_qualifier() {
        let container = ContainerBuilder::new()
            .with_config(ContainerConfig::default().with_strict_scopes(true))
            .definition(BeanDefinition::scoped("Car", |_, _| Ok(Engine)))
            .scope_definition("Garage")
            .build()
            .unwrap();

        assert!(container.create_scope("car", "Car").is_ok());
        assert!(container.create_scope("garage", "Garage").is_ok());
        assert!(matches!(
            container.create_scope("boat", "Boat"),
            Err(DiError::NoScopeDefinition { .. })
        ));
    }

    #[test]
    fn test_override_disabled_fails_build() {
        let result = ContainerBuilder::new()
            .with_config(ContainerConfig::default().with_allow_override(false))
            .definitions([
                BeanDefinition::singleton(|_, _| Ok(Engine)),
                BeanDefinition::singleton(|_, _| Ok(Engine)),
            ])
            .build();

        assert!(matches!(result, Err(DiError::DefinitionOverride { .. })));
    }

    #[test]
    fn test_invalid_log_level_fails_build() {
        let config = ContainerConfig {
            log_level: "verbose".into(),
            ..ContainerConfig::default()
        };
        let result = ContainerBuilder::new().with_config(config).build();
        assert!(matches!(result, Err(DiError::Config(_))));
    }

    #[test]
    fn test_eager_singletons_respect_config() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let built = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&built);
        let definition = move || {
            let counter = Arc::clone(&counter);
            BeanDefinition::singleton(move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Engine)
            })
            .created_at_start()
        };

        let _lazy = ContainerBuilder::new()
            .with_config(ContainerConfig::default().with_eager_instances(false))
            .definition(definition())
            .build()
            .unwrap();
        assert_eq!(built.load(Ordering::SeqCst), 0);

        let eager = ContainerBuilder::new().definition(definition()).build().unwrap();
        assert_eq!(built.load(Ordering::SeqCst), 1);
        eager.get::<Engine>().unwrap();
        assert_eq!(built.load(Ordering::SeqCst), 1);
    }
}
