//! 容器配置
//!
//! 配置可以在代码中构造，也可以从 TOML 加载：
//!
//! ```toml
//! allow_override = false
//! create_eager_instances = true
//! strict_scopes = true
//! log_level = "debug"
//! ```

use std::path::Path;
use std::str::FromStr;

use log::LevelFilter;
use serde::{Deserialize, Serialize};

/// 配置错误类型
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// 无效的配置
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// 解析错误
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    /// 序列化错误
    #[error("Failed to serialize configuration: {0}")]
    Serialize(String),

    /// IO 错误
    #[error("IO error: {0}")]
    Io(String),
}

/// 容器配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// 是否允许同一索引键的定义互相覆盖
    pub allow_override: bool,
    /// 构建时是否创建标记为启动时创建的单例
    pub create_eager_instances: bool,
    /// 为未声明的作用域限定符创建作用域时报错（否则只记录警告）
    pub strict_scopes: bool,
    /// 解析日志级别：off / error / warn / info / debug / trace
    pub log_level: String,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            allow_override: true,
            create_eager_instances: true,
            strict_scopes: false,
            log_level: "info".to_string(),
        }
    }
}

impl ContainerConfig {
    /// 从 TOML 字符串加载，缺省字段取默认值
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(toml).map_err(|e| ConfigError::Parse(format!("TOML parse error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件加载
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_toml(&content)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialize(format!("TOML serialize error: {}", e)))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.level_filter().map(|_| ())
    }

    /// 解析后的日志级别
    pub fn level_filter(&self) -> Result<LevelFilter, ConfigError> {
        LevelFilter::from_str(self.log_level.trim())
            .map_err(|_| ConfigError::Invalid(format!("unknown log level '{}'", self.log_level)))
    }

    #[must_use]
    pub fn with_allow_override(mut self, allow: bool) -> Self {
        self.allow_override = allow;
        self
    }

    #[must_use]
    pub fn with_eager_instances(mut self, create: bool) -> Self {
        self.create_eager_instances = create;
        self
    }

    #[must_use]
    pub fn with_strict_scopes(mut self, strict: bool) -> Self {
        self.strict_scopes = strict;
        self
    }

    #[must_use]
    pub fn with_log_level(mut self, level: LevelFilter) -> Self {
        self.log_level = level.as_str().to_ascii_lowercase();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ContainerConfig::default();
        assert!(config.allow_override);
        assert!(config.create_eager_instances);
        assert!(!config.strict_scopes);
        assert_eq!(config.level_filter().unwrap(), LevelFilter::Info);
    }

    #[test]
    fn test_from_toml_fills_missing_fields() {
        let toml = r#"
            strict_scopes = true
            log_level = "debug"
        "#;

        let config = ContainerConfig::from_toml(toml).unwrap();
        assert!(config.strict_scopes);
        assert!(config.allow_override);
        assert_eq!(config.level_filter().unwrap(), LevelFilter::Debug);
    }

    #[test]
    fn test_invalid_log_level() {
        let result = ContainerConfig::from_toml(r#"log_level = "loud""#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_parse_error() {
        let result = ContainerConfig::from_toml("allow_override = 3");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ContainerConfig::default()
            .with_allow_override(false)
            .with_log_level(LevelFilter::Warn);
        let text = config.to_toml().unwrap();
        assert_eq!(ContainerConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn test_missing_file() {
        let result = ContainerConfig::from_file("/nonexistent/di-core.toml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
