//! 限定符与类型键

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// 根作用域的限定符名称
pub const ROOT_SCOPE_QUALIFIER: &str = "_root_";

/// 定义或作用域的限定符
///
/// 既可以是任意名称（[`Qualifier::named`]），也可以由类型名派生（[`Qualifier::of`]），
/// 后者用于 "作用域归属于某个类型" 的场景。
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Qualifier(Arc<str>);

impl Qualifier {
    /// 创建命名限定符
    pub fn named(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// 以类型全名作为限定符
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self(Arc::from(std::any::type_name::<T>()))
    }

    /// 根作用域限定符
    pub fn root() -> Self {
        Self::named(ROOT_SCOPE_QUALIFIER)
    }

    pub fn value(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q:'{}'", self.0)
    }
}

impl From<&str> for Qualifier {
    fn from(name: &str) -> Self {
        Self::named(name)
    }
}

impl From<String> for Qualifier {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

/// 类型键：`TypeId` 加上用于诊断的类型名
///
/// 相等性与哈希只看 `TypeId`。
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 判断类型擦除后的值是否属于该类型
    pub fn is_instance(&self, value: &(dyn Any + Send + Sync)) -> bool {
        value.type_id() == self.id
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Widget;

    #[test]
    fn test_type_qualifier_uses_full_name() {
        let q = Qualifier::of::<Widget>();
        assert!(q.value().ends_with("Widget"));
        assert_eq!(q, Qualifier::of::<Widget>());
        assert_ne!(q, Qualifier::named("Widget"));
    }

    #[test]
    fn test_type_key_matches_erased_value() {
        let key = TypeKey::of::<Widget>();
        let value: Arc<dyn Any + Send + Sync> = Arc::new(Widget);
        assert!(key.is_instance(value.as_ref()));
        assert!(!TypeKey::of::<String>().is_instance(value.as_ref()));
    }
}
