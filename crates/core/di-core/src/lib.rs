//! # di-core - 作用域依赖解析引擎
//!
//! 提供作用域图、按作用域缓存的实例工厂以及多策略解析器。
//!
//! ## 主要组件
//!
//! - **容器**: [`Container`] / [`ContainerBuilder`] 持有定义、作用域和解析器
//! - **作用域**: [`Scope`] 约束缓存实例的生命周期，可链接到其他作用域作为回退
//! - **实例工厂**: [`SingleInstanceFactory`], [`FactoryInstanceFactory`], [`ScopedInstanceFactory`]
//! - **解析器**: [`CoreResolver`] 按固定顺序尝试注册表、外部对象、链接作用域、参数和扩展
//! - **配置**: [`ContainerConfig`] 支持从 TOML 加载
//!
//! ## 示例
//!
//! ```
//! use std::sync::Arc;
//! use di_core::{BeanDefinition, Container};
//!
//! struct Engine;
//! struct Dashboard {
//!     engine: Arc<Engine>,
//! }
//!
//! let container = Container::builder()
//!     .definition(BeanDefinition::singleton(|_, _| Ok(Engine)))
//!     .definition(BeanDefinition::scoped("Car", |scope, _| {
//!         Ok(Dashboard { engine: scope.get::<Engine>()? })
//!     }))
//!     .build()?;
//!
//! let car = container.create_scope("car-1", "Car")?;
//! let dashboard = car.get::<Dashboard>()?;
//! assert!(Arc::ptr_eq(&dashboard.engine, &container.get::<Engine>()?));
//! car.close()?;
//! # Ok::<(), di_core::DiError>(())
//! ```

pub mod builder;
pub mod config;
pub mod container;
pub mod context;
pub mod definition;
pub mod error;
pub mod instance;
pub mod logger;
mod macros;
pub mod parameters;
pub mod qualifier;
pub mod registry;
pub mod resolver;
pub mod scope;
pub mod scope_registry;

pub use builder::ContainerBuilder;
pub use config::{ConfigError, ContainerConfig};
pub use container::Container;
pub use context::ResolutionContext;
pub use definition::{BeanDefinition, Callbacks, Kind};
pub use error::{BoxError, DiError, DiResult};
pub use instance::{FactoryInstanceFactory, InstanceFactory, ScopedInstanceFactory, SingleInstanceFactory};
pub use logger::ResolutionLogger;
pub use parameters::{AnyArc, ParametersHolder};
pub use qualifier::{Qualifier, TypeKey, ROOT_SCOPE_QUALIFIER};
pub use registry::{IndexKey, InstanceRegistry};
pub use resolver::{CoreResolver, ResolutionExtension};
pub use scope::{new_scope_id, Scope, ScopeCallback, ScopeId, ROOT_SCOPE_ID};
pub use scope_registry::ScopeRegistry;
