use crate::runtime::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Shared handle to a scope. Single-threaded by design; the handle stands in
/// for the non-owning parent pointer and must never form a cycle (a scope
/// never references a descendant).
pub type EnvRef = Rc<RefCell<Environment>>;

#[derive(Debug)]
pub struct Environment {
    bindings: HashMap<String, Value>,
    parent: Option<EnvRef>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    pub fn new() -> Self {
        Self {
            bindings: HashMap::new(),
            parent: None,
        }
    }

    pub fn new_ref() -> EnvRef {
        Rc::new(RefCell::new(Self::new()))
    }

    /// Looks `name` up through the scope chain. Misses produce an ordinary
    /// error value, not a Rust error: unbound symbols are a normal evaluation
    /// result. Hits always return an independent copy of the binding.
    pub fn get(env: &EnvRef, name: &str) -> Value {
        let scope = env.borrow();
        if let Some(value) = scope.bindings.get(name) {
            return value.clone();
        }
        match scope.parent.clone() {
            Some(parent) => {
                drop(scope);
                Self::get(&parent, name)
            }
            None => Value::err(format!("Unbound symbol: {name}")),
        }
    }

    /// Define-or-overwrite in this scope only.
    pub fn put(&mut self, name: &str, value: Value) {
        self.bindings.insert(name.to_string(), value);
    }

    /// Defines in the root ancestor regardless of call depth.
    pub fn def(env: &EnvRef, name: &str, value: Value) {
        let mut current = Rc::clone(env);
        loop {
            let parent = current.borrow().parent.clone();
            match parent {
                Some(next) => current = next,
                None => break,
            }
        }
        current.borrow_mut().put(name, value);
    }

    pub fn set_parent(&mut self, parent: EnvRef) {
        self.parent = Some(parent);
    }

    /// Independent copy of every local binding, same parent handle.
    pub fn copy(&self) -> Environment {
        Environment {
            bindings: self.bindings.clone(),
            parent: self.parent.clone(),
        }
    }

    pub fn copy_ref(env: &EnvRef) -> EnvRef {
        Rc::new(RefCell::new(env.borrow().copy()))
    }
}
