use std::collections::HashMap;

use super::NameRef;

/// Nested lexical blocks. Lookups walk from the innermost block outwards;
/// inserts always go to the innermost block, and a popped block is gone.
#[derive(Debug, Default)]
pub struct ScopeStack {
    layers: Vec<HashMap<String, NameRef>>,
}

impl ScopeStack {
    #[must_use]
    pub fn new() -> Self {
        Self {
            layers: vec![HashMap::new()],
        }
    }

    pub fn push(&mut self) {
        self.layers.push(HashMap::new());
    }

    pub fn pop(&mut self) {
        if self.layers.len() > 1 {
            self.layers.pop();
        }
    }

    /// Bind `name` in the innermost block. The blank identifier is never
    /// bound.
    pub fn insert(&mut self, name: &str, target: NameRef) {
        if name == "_" {
            return;
        }
        if let Some(layer) = self.layers.last_mut() {
            layer.insert(name.to_string(), target);
        }
    }

    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&NameRef> {
        self.layers.iter().rev().find_map(|layer| layer.get(name))
    }

    /// Whether `name` is bound in the innermost block itself.
    #[must_use]
    pub fn declared_here(&self, name: &str) -> bool {
        self.layers
            .last()
            .is_some_and(|layer| layer.contains_key(name))
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.layers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Span;

    #[test]
    fn inner_blocks_shadow_and_pop() {
        let mut scope = ScopeStack::new();
        scope.insert("x", NameRef::Package { name: "x".into() });
        scope.push();
        scope.insert("x", NameRef::Local { decl: Span::new(4, 5) });
        assert_eq!(scope.lookup("x"), Some(&NameRef::Local { decl: Span::new(4, 5) }));
        assert!(scope.declared_here("x"));
        scope.pop();
        assert_eq!(scope.lookup("x"), Some(&NameRef::Package { name: "x".into() }));
        scope.pop();
        assert_eq!(scope.depth(), 1);
    }

    #[test]
    fn blank_identifier_is_never_bound() {
        let mut scope = ScopeStack::new();
        scope.insert("_", NameRef::Local { decl: Span::new(0, 1) });
        assert!(scope.lookup("_").is_none());
    }
}
