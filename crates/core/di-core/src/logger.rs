//! 解析过程日志
//!
//! 通过 `log` 门面输出，容器级别的 [`LevelFilter`] 决定是否生成日志文本。
//! 日志只用于观察，不影响解析结果。

use log::{Level, LevelFilter};

const TARGET: &str = "di_core";

#[derive(Debug, Clone, Copy)]
pub struct ResolutionLogger {
    level: LevelFilter,
}

impl ResolutionLogger {
    pub fn new(level: LevelFilter) -> Self {
        Self { level }
    }

    pub fn level(&self) -> LevelFilter {
        self.level
    }

    /// 是否需要输出该级别的日志
    pub fn is_at(&self, level: Level) -> bool {
        level <= self.level && log::log_enabled!(target: TARGET, level)
    }

    pub fn debug(&self, message: impl FnOnce() -> String) {
        if self.is_at(Level::Debug) {
            log::debug!(target: TARGET, "{}", message());
        }
    }

    pub fn info(&self, message: impl FnOnce() -> String) {
        if self.is_at(Level::Info) {
            log::info!(target: TARGET, "{}", message());
        }
    }

    pub fn warn(&self, message: impl FnOnce() -> String) {
        if self.is_at(Level::Warn) {
            log::warn!(target: TARGET, "{}", message());
        }
    }

    pub fn error(&self, message: impl FnOnce() -> String) {
        if self.is_at(Level::Error) {
            log::error!(target: TARGET, "{}", message());
        }
    }
}

impl Default for ResolutionLogger {
    fn default() -> Self {
        Self::new(LevelFilter::Info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_gate() {
        let logger = ResolutionLogger::new(LevelFilter::Off);
        assert!(!logger.is_at(Level::Error));

        let mut called = false;
        logger.debug(|| {
            called = true;
            String::new()
        });
        assert!(!called);
    }
}
