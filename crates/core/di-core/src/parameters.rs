//! 注入参数
//!
//! 调用方为单次解析提供的临时参数包。

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::qualifier::TypeKey;

/// 类型擦除的共享实例
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// 有序参数包
///
/// 内部以 `Arc` 共享，克隆开销很小；同一参数包可以同时出现在解析上下文和作用域参数栈中。
#[derive(Clone, Default)]
pub struct ParametersHolder {
    values: Arc<Vec<AnyArc>>,
}

impl ParametersHolder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 由类型擦除的值构造
    pub fn from_values(values: Vec<AnyArc>) -> Self {
        Self {
            values: Arc::new(values),
        }
    }

    /// 追加一个参数
    #[must_use]
    pub fn with<T: Any + Send + Sync>(self, value: T) -> Self {
        self.with_arc(Arc::new(value))
    }

    /// 追加一个已共享的参数
    #[must_use]
    pub fn with_arc<T: Any + Send + Sync>(self, value: Arc<T>) -> Self {
        let mut values = Arc::unwrap_or_clone(self.values);
        values.push(value);
        Self {
            values: Arc::new(values),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 按位置取参数
    pub fn element_at<T: Any + Send + Sync>(&self, index: usize) -> Option<Arc<T>> {
        self.values
            .get(index)
            .and_then(|value| Arc::clone(value).downcast::<T>().ok())
    }

    /// 取第一个类型为 `T` 的参数
    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.get_by_type(TypeKey::of::<T>())
            .and_then(|value| value.downcast::<T>().ok())
    }

    /// 类型擦除版本的 [`ParametersHolder::get`]
    pub fn get_by_type(&self, key: TypeKey) -> Option<AnyArc> {
        self.values
            .iter()
            .find(|value| key.is_instance(value.as_ref()))
            .cloned()
    }
}

impl fmt::Debug for ParametersHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DefinitionParameters[{} value(s)]", self.values.len())
    }
}
