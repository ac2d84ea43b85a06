use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::Display;
use std::rc::Rc;

use crate::error::RuntimeError;
use crate::function::Function;
use crate::interpreter::Interpreter;
use crate::object::{Callable, Object};
use crate::token::Token;

const INITIALIZER: &str = "init";

/// A class value: a name plus the table of its methods.
#[derive(Debug)]
pub struct Class {
    pub name: String,
    methods: HashMap<String, Function>,
}

impl Class {
    pub fn new(name: String, methods: HashMap<String, Function>) -> Self {
        Class { name, methods }
    }

    pub fn find_method(&self, name: &str) -> Option<Function> {
        self.methods.get(name).cloned()
    }
}

impl Display for Class {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} class", self.name)
    }
}

/// Calling a class constructs an instance. Implemented on the shared
/// pointer so every instance backs onto the same class value.
impl Callable for Rc<RefCell<Class>> {
    fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Object>) -> Result<Object, RuntimeError> {
        let instance = Rc::new(RefCell::new(Instance::new(Rc::clone(self))));

        // The initializer runs bound to the new instance. The instance is
        // the result of the call no matter what the initializer returns.
        let initializer = self.borrow().find_method(INITIALIZER);
        if let Some(initializer) = initializer {
            initializer.bind(Rc::clone(&instance)).call(interpreter, arguments)?;
        }

        Ok(Object::Instance(instance))
    }

    fn arity(&self) -> usize {
        self.borrow().find_method(INITIALIZER).map_or(0, |initializer| initializer.arity())
    }
}

/// An instance of a class: a back-pointer to the class plus the mutable
/// map of its properties.
#[derive(Debug)]
pub struct Instance {
    class: Rc<RefCell<Class>>,
    fields: HashMap<String, Object>,
}

impl Instance {
    pub fn new(class: Rc<RefCell<Class>>) -> Self {
        Instance { class, fields: HashMap::new() }
    }

    /// Looks up a property: fields shadow methods, and the initializer is
    /// not reachable as a property. A method hit is bound to the receiving
    /// instance fresh on every access.
    pub fn get(&self, name: &Token, instance: Rc<RefCell<Instance>>) -> Result<Object, RuntimeError> {
        if let Some(field) = self.fields.get(&name.lexeme) {
            return Ok(field.clone());
        }

        if name.lexeme != INITIALIZER {
            if let Some(method) = self.class.borrow().find_method(&name.lexeme) {
                return Ok(Object::from(method.bind(instance)));
            }
        }

        Err(RuntimeError {
            token: name.clone(),
            message: format!("Undefined property '{}'.", name.lexeme),
        })
    }

    /// Creates or overwrites a property.
    pub fn set(&mut self, name: &Token, value: Object) {
        self.fields.insert(name.lexeme.clone(), value);
    }
}

impl Display for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} instance", self.class.borrow().name)
    }
}
