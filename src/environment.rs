use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::RuntimeError;
use crate::object::Object;
use crate::token::Token;

/// A single scope's bindings plus a link to the enclosing scope.
/// Environments form a chain: one for globals, plus one per block, per
/// function call, and per bound method. Closures keep their defining
/// environment alive through the `Rc`.
#[derive(Debug)]
pub struct Environment {
    pub enclosing: Option<Rc<RefCell<Environment>>>,
    pub variables: HashMap<String, Object>,
}

impl Environment {
    pub fn new(enclosing: Option<Rc<RefCell<Environment>>>) -> Self {
        Environment {
            enclosing,
            variables: HashMap::new(),
        }
    }

    /// Binds a name in this scope. Declaring is not assigning: an existing
    /// binding with the same name is shadowed by the new one.
    pub fn define(&mut self, name: &str, value: Object) {
        self.variables.insert(name.to_string(), value);
    }

    /// Returns the environment `distance` parent-links up the chain.
    /// The resolver guarantees the chain is deep enough.
    fn ancestor(&self, distance: usize) -> Rc<RefCell<Environment>> {
        let mut environment = self.enclosing.clone()
            .unwrap_or_else(|| panic!("enclosing environment to exist at depth 1"));

        for depth in 2..=distance {
            let parent = environment.borrow().enclosing.clone()
                .unwrap_or_else(|| panic!("enclosing environment to exist at depth {depth}"));
            environment = parent;
        }

        environment
    }

    /// Looks a name up along the chain. Used for the globals environment,
    /// where references are late-bound by name rather than by hop count.
    pub fn get(&self, name: &Token) -> Result<Object, RuntimeError> {
        if let Some(variable) = self.variables.get(&name.lexeme) {
            return Ok(variable.clone());
        }

        if let Some(enclosing) = &self.enclosing {
            return enclosing.borrow().get(name);
        }

        Err(RuntimeError {
            token: name.clone(),
            message: format!("Undefined variable '{}'.", name.lexeme),
        })
    }

    /// Fetches a name from the scope exactly `distance` hops up.
    pub fn get_at(&self, distance: usize, name: &Token) -> Result<Object, RuntimeError> {
        let fetch = |variables: &HashMap<String, Object>| {
            variables.get(&name.lexeme).cloned().ok_or_else(|| RuntimeError {
                token: name.clone(),
                message: format!("Undefined variable '{}'.", name.lexeme),
            })
        };

        if distance > 0 {
            fetch(&self.ancestor(distance).borrow().variables)
        } else {
            fetch(&self.variables)
        }
    }

    /// Overwrites a name in the scope exactly `distance` hops up.
    /// The caller has already established that the binding exists.
    pub fn assign_at(&mut self, distance: usize, name: &Token, value: Object) {
        if distance > 0 {
            self.ancestor(distance).borrow_mut().variables.insert(name.lexeme.clone(), value);
        } else {
            self.variables.insert(name.lexeme.clone(), value);
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::literal::Literal;

    fn chain() -> Rc<RefCell<Environment>> {
        let globals = Rc::new(RefCell::new(Environment::new(None)));
        globals.borrow_mut().define("a", Object::from(1.0));

        let middle = Rc::new(RefCell::new(Environment::new(Some(Rc::clone(&globals)))));
        middle.borrow_mut().define("a", Object::from(2.0));

        let inner = Rc::new(RefCell::new(Environment::new(Some(middle))));
        inner.borrow_mut().define("b", Object::from(3.0));

        inner
    }

    #[test]
    fn define_and_get() {
        let environment = chain();
        let value = environment.borrow().get(&Token::from("b")).unwrap();
        assert_eq!(value, Object::from(3.0));
    }

    #[test]
    fn get_walks_the_chain() {
        let environment = chain();
        let value = environment.borrow().get(&Token::from("a")).unwrap();
        assert_eq!(value, Object::from(2.0));
    }

    #[test]
    fn get_at_distance() {
        let environment = chain();
        let near = environment.borrow().get_at(1, &Token::from("a")).unwrap();
        let far = environment.borrow().get_at(2, &Token::from("a")).unwrap();
        assert_eq!(near, Object::from(2.0));
        assert_eq!(far, Object::from(1.0));
    }

    #[test]
    fn assign_at_distance() {
        let environment = chain();
        environment.borrow_mut().assign_at(2, &Token::from("a"), Object::from(9.0));

        let far = environment.borrow().get_at(2, &Token::from("a")).unwrap();
        let near = environment.borrow().get_at(1, &Token::from("a")).unwrap();
        assert_eq!(far, Object::from(9.0));
        assert_eq!(near, Object::from(2.0));
    }

    #[test]
    fn get_undefined() {
        let environment = chain();
        let error = environment.borrow().get(&Token::from("missing")).unwrap_err();
        assert_eq!(error.message, "Undefined variable 'missing'.");
    }

    #[test]
    fn shadowing_is_a_new_binding() {
        let environment = Rc::new(RefCell::new(Environment::new(None)));
        environment.borrow_mut().define("a", Object::from(1.0));
        environment.borrow_mut().define("a", Object::from(Literal::Nil));
        let value = environment.borrow().get(&Token::from("a")).unwrap();
        assert_eq!(value, Object::from(Literal::Nil));
    }
}
