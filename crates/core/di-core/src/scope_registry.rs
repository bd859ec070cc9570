//! 作用域注册表
//!
//! 作用域以ID存放在注册表中，作用域之间的链接只保存ID。
//! 注册表负责ID查找、作用域限定符声明和作用域图的展开。

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::RwLock;

use crate::error::{DiError, DiResult};
use crate::qualifier::Qualifier;
use crate::scope::{Scope, ScopeId};

pub struct ScopeRegistry {
    root: Arc<Scope>,
    scopes: DashMap<ScopeId, Arc<Scope>>,
    /// 已声明的作用域限定符
    scope_definitions: RwLock<HashSet<Qualifier>>,
}

impl ScopeRegistry {
    pub fn new(root: Arc<Scope>) -> Self {
        let scopes = DashMap::new();
        scopes.insert(root.id().to_owned(), Arc::clone(&root));
        let mut definitions = HashSet::new();
        definitions.insert(root.scope_qualifier().clone());
        Self {
            root,
            scopes,
            scope_definitions: RwLock::new(definitions),
        }
    }

    pub fn root(&self) -> &Arc<Scope> {
        &self.root
    }

    /// 声明作用域限定符
    pub fn declare_scope_definition(&self, qualifier: Qualifier) {
        self.scope_definitions.write().insert(qualifier);
    }

    pub fn is_scope_defined(&self, qualifier: &Qualifier) -> bool {
        self.scope_definitions.read().contains(qualifier)
    }

    /// 登记新建的作用域，ID已存在时返回 [`DiError::ScopeAlreadyCreated`]
    pub fn register(&self, scope: Arc<Scope>) -> DiResult<()> {
        match self.scopes.entry(scope.id().to_owned()) {
            Entry::Occupied(entry) => Err(DiError::ScopeAlreadyCreated {
                scope_id: entry.key().clone(),
            }),
            Entry::Vacant(entry) => {
                entry.insert(scope);
                Ok(())
            }
        }
    }

    pub fn get(&self, scope_id: &str) -> Option<Arc<Scope>> {
        self.scopes.get(scope_id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn remove(&self, scope_id: &str) -> Option<Arc<Scope>> {
        self.scopes.remove(scope_id).map(|(_, scope)| scope)
    }

    /// 作用域数量（包含根作用域）
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// 从 `origin` 出发展开所有可达的作用域
    ///
    /// 深度优先，保持链接的声明顺序，每个作用域只出现一次且不包含 `origin` 本身。
    /// 图中存在环时同样终止；已关闭或已移除的作用域被跳过。
    pub fn flatten(&self, origin: &Scope) -> Vec<Arc<Scope>> {
        let mut visited: HashSet<ScopeId> = HashSet::new();
        visited.insert(origin.id().to_owned());
        let mut flattened = Vec::new();

        // 显式栈，链接逆序入栈以保持声明顺序
        let mut pending: Vec<ScopeId> = origin.linked_scope_ids();
        pending.reverse();
        while let Some(id) = pending.pop() {
            if !visited.insert(id.clone()) {
                continue;
            }
            let Some(scope) = self.get(&id) else {
                continue;
            };
            if scope.is_closed() {
                continue;
            }
            pending.extend(scope.linked_scope_ids().into_iter().rev());
            flattened.push(scope);
        }
        flattened
    }

    /// 关闭除根作用域以外的全部作用域
    pub fn close_all_scopes(&self) {
        let open: Vec<Arc<Scope>> = self
            .scopes
            .iter()
            .filter(|entry| !entry.value().is_root())
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        for scope in open {
            scope.close_internal();
        }
        self.scopes.retain(|_, scope| scope.is_root());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::Container;
    use crate::scope::ROOT_SCOPE_ID;

    fn ids(scopes: &[Arc<Scope>]) -> Vec<&str> {
        scopes.iter().map(|s| s.id()).collect()
    }

    #[test]
    fn test_flatten_depth_first_in_declared_order() {
        let container = Container::builder().build().unwrap();
        let a = container.create_scope("a", "A").unwrap();
        let b = container.create_scope("b", "B").unwrap();
        let c = container.create_scope("c", "C").unwrap();
        let d = container.create_scope("d", "D").unwrap();
        a.unlink(&container.root_scope());
        a.link_to(&b).unwrap();
        a.link_to(&d).unwrap();
        b.link_to(&c).unwrap();

        let flat = container.scope_registry().flatten(&a);
        assert_eq!(ids(&flat), vec!["b", ROOT_SCOPE_ID, "c", "d"]);
    }

    #[test]
    fn test_flatten_long_chain() {
        const LENGTH: usize = 100_000;
        #[derive(Debug)]
        struct Undefined;

        let container = Container::builder().scope_definition("Link").build().unwrap();
        let chain: Vec<Arc<Scope>> = (0..LENGTH)
            .map(|i| container.create_scope(format!("n{i}"), "Link").unwrap())
            .collect();
        for pair in chain.windows(2) {
            pair[0].link_to(&pair[1]).unwrap();
        }

        let flat = container.scope_registry().flatten(&chain[0]);
        assert_eq!(flat.len(), LENGTH);
        assert_eq!(flat[0].id(), ROOT_SCOPE_ID);
        assert_eq!(flat[1].id(), "n1");
        assert_eq!(flat[LENGTH - 1].id(), format!("n{}", LENGTH - 1));

        let err = chain[0].get::<Undefined>().unwrap_err();
        assert!(matches!(err, DiError::NoDefinitionFound { .. }));
    }

    #[test]
    fn test_flatten_terminates_on_cycle() {
        let container = Container::builder().build().unwrap();
        let a = container.create_scope("a", "A").unwrap();
        let b = container.create_scope("b", "B").unwrap();
        a.link_to(&b).unwrap();
        b.link_to(&a).unwrap();

        let flat = container.scope_registry().flatten(&a);
        assert_eq!(ids(&flat), vec![ROOT_SCOPE_ID, "b"]);
    }

    #[test]
    fn test_flatten_skips_closed_scopes() {
        let container = Container::builder().build().unwrap();
        let a = container.create_scope("a", "A").unwrap();
        let b = container.create_scope("b", "B").unwrap();
        a.link_to(&b).unwrap();
        b.close().unwrap();

        let flat = container.scope_registry().flatten(&a);
        assert_eq!(ids(&flat), vec![ROOT_SCOPE_ID]);
    }

    #[test]
    fn test_register_rejects_duplicate_id() {
        let container = Container::builder().build().unwrap();
        container.create_scope("dup", "A").unwrap();
        let err = container.create_scope("dup", "A").unwrap_err();
        assert!(matches!(err, DiError::ScopeAlreadyCreated { .. }));
    }
}
