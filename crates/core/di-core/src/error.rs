//! 依赖解析错误类型
//!
//! 所有解析、作用域和实例构造失败都通过 [`DiError`] 同步返回给调用方。

use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

use crate::config::ConfigError;
use crate::qualifier::Qualifier;
use crate::scope::ScopeId;

/// 用户构造函数返回的错误类型
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// 依赖解析结果
pub type DiResult<T> = Result<T, DiError>;

/// 依赖注入错误类型
#[derive(Error, Debug, Clone)]
pub enum DiError {
    /// 所有解析策略均未找到实例
    #[error(
        "No definition found for type '{type_name}'{}. Check your definitions and add missing type and/or qualifier!",
        qualifier_suffix(.qualifier)
    )]
    NoDefinitionFound {
        type_name: &'static str,
        qualifier: Option<Qualifier>,
    },

    /// 定义声明的作用域限定符与请求上下文不匹配
    #[error("Wrong scope qualifier: trying to open instance for '{scope_id}' in {definition}")]
    WrongScopeQualifier { scope_id: ScopeId, definition: String },

    /// 不缓存的作用域定义在外部注入值之前被请求
    #[error("No value for scope '{scope_id}' in {definition}")]
    MissingScopeValue { scope_id: ScopeId, definition: String },

    /// 用户构造函数失败
    #[error("Could not create instance for {definition}: {source}")]
    InstanceCreation {
        definition: String,
        #[source]
        source: Arc<dyn StdError + Send + Sync + 'static>,
    },

    /// 作用域已关闭
    #[error("Scope '{scope_id}' is closed")]
    ClosedScope { scope_id: ScopeId },

    /// 作用域ID重复
    #[error("Scope with id '{scope_id}' is already created")]
    ScopeAlreadyCreated { scope_id: ScopeId },

    /// 作用域不存在
    #[error("No scope found for id '{scope_id}'")]
    ScopeNotFound { scope_id: ScopeId },

    /// 严格模式下作用域限定符未声明
    #[error("No scope definition found for qualifier '{qualifier}'")]
    NoScopeDefinition { qualifier: Qualifier },

    /// 定义覆盖被禁止
    #[error("Already existing definition for {key}")]
    DefinitionOverride { key: String },

    /// 根作用域不能链接到其他作用域
    #[error("Can't add scope link to the root scope")]
    RootScopeLink,

    /// 根作用域只能随容器一起关闭
    #[error("The root scope can only be closed by closing its container")]
    RootScopeClose,

    /// 实例类型与请求类型不一致
    #[error("Resolved instance is not of requested type '{expected}'")]
    TypeMismatch { expected: &'static str },

    /// 容器已关闭
    #[error("Container is closed")]
    ContainerClosed,

    /// 容器配置无效
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl DiError {
    /// 将用户构造错误包装为 [`DiError::InstanceCreation`]
    pub(crate) fn instance_creation(definition: String, source: BoxError) -> Self {
        DiError::InstanceCreation {
            definition,
            source: Arc::from(source),
        }
    }

    /// 沿着构造失败链找到最内层的解析错误
    ///
    /// 工厂内部的依赖解析失败会被外层包装为 `InstanceCreation`，
    /// 这里返回最先发生的 `DiError`。
    pub fn root_cause(&self) -> &DiError {
        let mut current = self;
        while let DiError::InstanceCreation { source, .. } = current {
            match source.downcast_ref::<DiError>() {
                Some(inner) => current = inner,
                None => break,
            }
        }
        current
    }
}

fn qualifier_suffix(qualifier: &Option<Qualifier>) -> String {
    qualifier
        .as_ref()
        .map(|q| format!(" and qualifier '{q}'"))
        .unwrap_or_default()
}
