//! Hierarchical variable scopes.
//!
//! Scopes form a tree that lives in an arena for the duration of a parse;
//! links between scopes are plain handles, which sidesteps the shared
//! ownership cycles a pointer-based design would need. A lookup walks one
//! precedence tier at a time through the whole parent chain before moving to
//! the next tier, and consults sibling fallbacks only when every tier missed.

use std::cell::RefCell;
use std::rc::Rc;

use super::section::CreatingSection;
use super::value::Value;

/// Handle of a scope record inside the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ScopeId(u32);

#[derive(Default)]
struct Scope {
    explicit: CreatingSection,
    include_params: CreatingSection,
    defaults: CreatingSection,
    target: Option<Rc<RefCell<CreatingSection>>>,
    parent: Option<ScopeId>,
    fallbacks: Vec<ScopeId>,
}

/// Grow-only storage for every scope created during a parse.
#[derive(Default)]
pub(crate) struct ScopeArena {
    scopes: Vec<Scope>,
}

impl ScopeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&mut self) -> ScopeId {
        self.push(Scope::default())
    }

    pub fn inherit(&mut self, parent: ScopeId) -> ScopeId {
        self.push(Scope {
            parent: Some(parent),
            ..Scope::default()
        })
    }

    pub fn inherit_with_target(
        &mut self,
        parent: ScopeId,
        target: Rc<RefCell<CreatingSection>>,
    ) -> ScopeId {
        self.push(Scope {
            parent: Some(parent),
            target: Some(target),
            ..Scope::default()
        })
    }

    fn push(&mut self, scope: Scope) -> ScopeId {
        self.scopes.push(scope);
        ScopeId(self.scopes.len() as u32 - 1)
    }

    pub fn add_fallback(&mut self, id: ScopeId, fallback: ScopeId) {
        self.scopes[id.0 as usize].fallbacks.push(fallback);
    }

    pub fn set_explicit(&mut self, id: ScopeId, key: impl Into<String>, value: Value) {
        self.scopes[id.0 as usize].explicit.set_plain(key, value);
    }

    pub fn has_explicit(&self, id: ScopeId, name: &str) -> bool {
        self.scopes[id.0 as usize].explicit.contains(name)
    }

    pub fn set_include_param(&mut self, id: ScopeId, key: impl Into<String>, value: Value) {
        self.scopes[id.0 as usize].include_params.set_plain(key, value);
    }

    pub fn include_params_fingerprint(&self, id: ScopeId) -> u64 {
        self.scopes[id.0 as usize].include_params.fingerprint()
    }

    pub fn set_default(&mut self, id: ScopeId, key: impl Into<String>, value: Value) {
        self.scopes[id.0 as usize].defaults.set_plain(key, value);
    }

    /// Looks `name` up through the four tiers, then through fallbacks.
    pub fn find(&self, id: ScopeId, name: &str) -> Option<Value> {
        for tier in 0..4 {
            if let Some(v) = self.find_tier(id, name, tier) {
                return Some(v);
            }
        }
        self.find_fallback(id, name)
    }

    fn find_tier(&self, id: ScopeId, name: &str, tier: u8) -> Option<Value> {
        let mut cursor = Some(id);
        while let Some(at) = cursor {
            let scope = &self.scopes[at.0 as usize];
            let hit = match tier {
                0 => scope.explicit.get(name).cloned(),
                1 => scope
                    .target
                    .as_ref()
                    .and_then(|t| t.borrow().get(name).cloned()),
                2 => scope.include_params.get(name).cloned(),
                _ => scope.defaults.get(name).cloned(),
            };
            if hit.is_some() {
                return hit;
            }
            cursor = scope.parent;
        }
        None
    }

    fn find_fallback(&self, id: ScopeId, name: &str) -> Option<Value> {
        let mut cursor = Some(id);
        while let Some(at) = cursor {
            let scope = &self.scopes[at.0 as usize];
            for fb in &scope.fallbacks {
                if let Some(v) = self.find(*fb, name) {
                    return Some(v);
                }
            }
            cursor = scope.parent;
        }
        None
    }
}
