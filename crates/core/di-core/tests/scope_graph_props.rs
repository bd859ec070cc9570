//! 作用域图属性测试
//!
//! 使用proptest生成任意链接图（允许环和自环），验证展开与解析总能终止。

use std::collections::HashSet;
use std::sync::Arc;

use di_core::{BeanDefinition, Container, DiError, Scope};
use proptest::prelude::*;

struct Undefined;

fn build_graph(size: usize, edges: &[(usize, usize)]) -> (Container, Vec<Arc<Scope>>) {
    let container = Container::builder()
        .definition(BeanDefinition::scoped("Node0", |scope, _| Ok(scope.id().to_owned())))
        .build()
        .unwrap();
    let scopes: Vec<Arc<Scope>> = (0..size)
        .map(|i| container.create_scope(format!("n{i}"), format!("Node{i}")).unwrap())
        .collect();
    for &(from, to) in edges {
        scopes[from % size].link_to(&scopes[to % size]).unwrap();
    }
    (container, scopes)
}

fn edges_strategy() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (1usize..8).prop_flat_map(|size| (Just(size), prop::collection::vec((0..size, 0..size), 0..24)))
}

// ============================================================================
// 作用域图属性测试
// ============================================================================

proptest! {
    #[test]
    fn test_undefined_type_always_fails(graph in edges_strategy()) {
        let (size, edges) = graph;
        let (_container, scopes) = build_graph(size, &edges);

        for scope in &scopes {
            let result = scope.get::<Undefined>();
            prop_assert!(matches!(result, Err(DiError::NoDefinitionFound { .. })), "expected NoDefinitionFound");
        }
    }

    #[test]
    fn test_links_are_unique_and_never_self(graph in edges_strategy()) {
        let (size, edges) = graph;
        let (_container, scopes) = build_graph(size, &edges);

        for scope in &scopes {
            let links = scope.linked_scope_ids();
            let unique: HashSet<&String> = links.iter().collect();
            prop_assert_eq!(unique.len(), links.len());
            prop_assert!(!links.iter().any(|id| id == scope.id()));
        }
    }

    #[test]
    fn test_reachable_definition_binds_to_owner(graph in edges_strategy()) {
        let (size, edges) = graph;
        let (_container, scopes) = build_graph(size, &edges);

        // 从 n0 可达的作用域解析到 n0 的实例；不可达的作用域失败
        for scope in &scopes {
            match scope.get::<String>() {
                Ok(owner) => prop_assert_eq!(owner.as_str(), "n0"),
                Err(e) => prop_assert!(matches!(e, DiError::NoDefinitionFound { .. }), "expected NoDefinitionFound"),
            }
        }
        let n0_owner = scopes[0].get::<String>().unwrap();
        prop_assert_eq!(n0_owner.as_str(), "n0");
    }
}
