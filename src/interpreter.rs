use std::cell::RefCell;
use std::collections::HashMap;
use std::mem;
use std::rc::Rc;

use crate::class::Class;
use crate::environment::Environment;
use crate::error::{RuntimeError, Unwind};
use crate::expr::*;
use crate::function::{Function, NativeFunction};
use crate::literal::Literal;
use crate::object::{Callable, Object};
use crate::stmt::*;
use crate::token::{Token, Type};

type EvalResult<T> = Result<T, Unwind>;

/// Walks the AST and evaluates it.
///
/// Carries the current environment, the fixed globals environment, and the
/// side-table built by the resolver. A resolved name is read by walking
/// exactly the recorded number of parents from the current environment; an
/// unresolved name falls back to the globals by name, which is what lets
/// top-level declarations refer to each other in any order.
///
/// The interpreter outlives a single run: the prompt keeps feeding it
/// lines and the globals persist between them.
pub struct Interpreter {
    pub globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    locals: HashMap<usize, usize>,
    pub error_count: usize,
}

impl Interpreter {
    pub fn new() -> Self {
        let globals = Rc::new(RefCell::new(Environment::new(None)));

        for native in NativeFunction::globals() {
            let name = native.name.clone();
            globals.borrow_mut().define(&name, Object::NativeFunction(native));
        }

        Interpreter {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            error_count: 0,
        }
    }

    /// Executes the statements in order. The first runtime error is
    /// reported and aborts the rest of the run; the interpreter's state is
    /// preserved so the prompt can keep going with the next line.
    pub fn interpret(&mut self, statements: &[Stmt]) {
        for statement in statements {
            if let Err(unwind) = self.execute(statement) {
                match unwind {
                    Unwind::Error(error) => {
                        self.error_count += 1;
                        println!("{error}");
                    }
                    Unwind::Return(_) => {
                        unreachable!("return outside a function escaped the resolver")
                    }
                }
                return;
            }
        }
    }

    /// Resets the error count between prompt lines.
    pub fn reset_errors(&mut self) {
        self.error_count = 0;
    }

    /// Records a resolved local: the name behind node `id` lives `depth`
    /// environments up the chain. Called by the resolver.
    pub fn resolve(&mut self, id: usize, depth: usize) {
        self.locals.insert(id, depth);
    }

    /// The names currently bound in the globals environment.
    pub fn global_names(&self) -> Vec<String> {
        self.globals.borrow().variables.keys().cloned().collect()
    }

    fn execute(&mut self, statement: &Stmt) -> EvalResult<()> {
        statement.accept(self)
    }

    fn evaluate(&mut self, expr: &Expr) -> EvalResult<Object> {
        expr.accept(self)
    }

    /// Executes statements against the given environment, restoring the
    /// previous one on every exit path, error unwinds included.
    pub fn execute_block(&mut self, statements: &[Stmt], environment: Rc<RefCell<Environment>>) -> EvalResult<()> {
        let previous = mem::replace(&mut self.environment, environment);
        let result = statements.iter().try_for_each(|statement| self.execute(statement));
        self.environment = previous;
        result
    }

    fn look_up_variable(&self, id: usize, name: &Token) -> EvalResult<Object> {
        match self.locals.get(&id) {
            Some(&distance) => self.environment.borrow().get_at(distance, name).map_err(Unwind::from),
            None => self.globals.borrow().get(name).map_err(Unwind::from),
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

fn check_number_operand(operator: &Token, operand: &Object) -> Result<f64, Unwind> {
    match operand {
        Object::Literal(Literal::Number(n)) => Ok(*n),
        _ => Err(RuntimeError {
            token: operator.clone(),
            message: "Operand must be a number.".to_string(),
        }.into()),
    }
}

fn check_number_operands(operator: &Token, left: &Object, right: &Object) -> Result<(f64, f64), Unwind> {
    match (left, right) {
        (Object::Literal(Literal::Number(l)), Object::Literal(Literal::Number(r))) => Ok((*l, *r)),
        _ => Err(RuntimeError {
            token: operator.clone(),
            message: "Operands must be both numbers.".to_string(),
        }.into()),
    }
}

impl ExprVisitor<EvalResult<Object>> for Interpreter {
    fn visit_literal_expr(&mut self, literal: &Literal) -> EvalResult<Object> {
        Ok(Object::Literal(literal.clone()))
    }

    fn visit_unary_expr(&mut self, unary: &UnaryData) -> EvalResult<Object> {
        let right = self.evaluate(&unary.expr)?;

        match unary.operator.r#type {
            Type::Minus => {
                let number = check_number_operand(&unary.operator, &right)?;
                Ok(Object::from(-number))
            }
            Type::Bang => Ok(Object::from(!right.as_bool())),
            _ => unreachable!(),
        }
    }

    fn visit_binary_expr(&mut self, binary: &BinaryData) -> EvalResult<Object> {
        let left = self.evaluate(&binary.left)?;
        let right = self.evaluate(&binary.right)?;
        let operator = &binary.operator;

        match operator.r#type {
            Type::Star => {
                let (l, r) = check_number_operands(operator, &left, &right)?;
                Ok(Object::from(l * r))
            }
            Type::Slash => {
                let (l, r) = check_number_operands(operator, &left, &right)?;
                if r == 0.0 {
                    return Err(RuntimeError {
                        token: operator.clone(),
                        message: "Divided by 0.".to_string(),
                    }.into());
                }
                Ok(Object::from(l / r))
            }
            Type::Minus => {
                let (l, r) = check_number_operands(operator, &left, &right)?;
                Ok(Object::from(l - r))
            }
            Type::Plus => match (&left, &right) {
                (Object::Literal(Literal::Number(l)), Object::Literal(Literal::Number(r))) => {
                    Ok(Object::from(l + r))
                }
                (Object::Literal(Literal::String(l)), Object::Literal(Literal::String(r))) => {
                    Ok(Object::from(format!("{l}{r}")))
                }
                _ => Err(RuntimeError {
                    token: operator.clone(),
                    message: "Operands must be both numbers or both strings.".to_string(),
                }.into()),
            },
            Type::Greater => {
                let (l, r) = check_number_operands(operator, &left, &right)?;
                Ok(Object::from(l > r))
            }
            Type::GreaterEqual => {
                let (l, r) = check_number_operands(operator, &left, &right)?;
                Ok(Object::from(l >= r))
            }
            Type::Less => {
                let (l, r) = check_number_operands(operator, &left, &right)?;
                Ok(Object::from(l < r))
            }
            Type::LessEqual => {
                let (l, r) = check_number_operands(operator, &left, &right)?;
                Ok(Object::from(l <= r))
            }
            Type::EqualEqual => Ok(Object::from(left == right)),
            Type::BangEqual => Ok(Object::from(left != right)),
            _ => unreachable!(),
        }
    }

    /// Short-circuits on the left operand and returns the boolean outcome
    /// of the whole expression, not the deciding operand.
    fn visit_logical_expr(&mut self, logical: &LogicalData) -> EvalResult<Object> {
        let left = self.evaluate(&logical.left)?.as_bool();

        match logical.operator.r#type {
            Type::And => {
                if !left {
                    return Ok(Object::from(false));
                }
                Ok(Object::from(self.evaluate(&logical.right)?.as_bool()))
            }
            Type::Or => {
                if left {
                    return Ok(Object::from(true));
                }
                Ok(Object::from(self.evaluate(&logical.right)?.as_bool()))
            }
            _ => unreachable!(),
        }
    }

    fn visit_grouping_expr(&mut self, grouping: &GroupingData) -> EvalResult<Object> {
        self.evaluate(&grouping.expr)
    }

    fn visit_variable_expr(&mut self, variable: &VariableData) -> EvalResult<Object> {
        self.look_up_variable(variable.id, &variable.name)
    }

    fn visit_assign_expr(&mut self, assign: &AssignData) -> EvalResult<Object> {
        // The target must already be bound somewhere reachable before the
        // value is evaluated; assignment never creates a binding.
        let defined = self.locals.contains_key(&assign.id)
            || self.globals.borrow().variables.contains_key(&assign.name.lexeme);

        if !defined {
            return Err(RuntimeError {
                token: assign.name.clone(),
                message: format!("Undefined variable '{}'.", assign.name.lexeme),
            }.into());
        }

        let value = self.evaluate(&assign.value)?;

        match self.locals.get(&assign.id) {
            Some(&distance) => {
                self.environment.borrow_mut().assign_at(distance, &assign.name, value.clone());
            }
            None => self.globals.borrow_mut().define(&assign.name.lexeme, value.clone()),
        }

        Ok(value)
    }

    fn visit_call_expr(&mut self, call: &CallData) -> EvalResult<Object> {
        let callee = self.evaluate(&call.callee)?;

        let callable: &dyn Callable = match &callee {
            Object::Function(function) => function,
            Object::NativeFunction(function) => function,
            Object::Class(class) => class,
            _ => {
                return Err(RuntimeError {
                    token: call.paren.clone(),
                    message: "Can only call functions and classes.".to_string(),
                }.into());
            }
        };

        let mut arguments = Vec::with_capacity(call.arguments.len());
        for argument in &call.arguments {
            arguments.push(self.evaluate(argument)?);
        }

        if arguments.len() != callable.arity() {
            return Err(RuntimeError {
                token: call.paren.clone(),
                message: format!(
                    "Expected {} arguments but got {}.",
                    callable.arity(),
                    arguments.len(),
                ),
            }.into());
        }

        callable.call(self, arguments).map_err(Unwind::from)
    }

    fn visit_get_expr(&mut self, get: &GetData) -> EvalResult<Object> {
        let object = self.evaluate(&get.object)?;

        match object {
            Object::Instance(ref instance) => {
                instance.borrow().get(&get.name, Rc::clone(instance)).map_err(Unwind::from)
            }
            _ => Err(RuntimeError {
                token: get.name.clone(),
                message: "Only instances have properties.".to_string(),
            }.into()),
        }
    }

    fn visit_set_expr(&mut self, set: &SetData) -> EvalResult<Object> {
        // The value is evaluated before the object; its side effects happen
        // even when the target turns out not to be an instance.
        let value = self.evaluate(&set.value)?;
        let object = self.evaluate(&set.object)?;

        match object {
            Object::Instance(instance) => {
                instance.borrow_mut().set(&set.name, value.clone());
                Ok(value)
            }
            _ => Err(RuntimeError {
                token: set.name.clone(),
                message: "Only instances have properties.".to_string(),
            }.into()),
        }
    }

    fn visit_this_expr(&mut self, this: &ThisData) -> EvalResult<Object> {
        self.look_up_variable(this.id, &this.keyword)
    }
}

impl StmtVisitor<EvalResult<()>> for Interpreter {
    fn visit_expression_stmt(&mut self, stmt: &ExpressionData) -> EvalResult<()> {
        self.evaluate(&stmt.expr)?;
        Ok(())
    }

    fn visit_print_stmt(&mut self, stmt: &PrintData) -> EvalResult<()> {
        let value = self.evaluate(&stmt.expr)?;
        println!("{value}");
        Ok(())
    }

    fn visit_var_stmt(&mut self, stmt: &VarData) -> EvalResult<()> {
        let value = match &stmt.initializer {
            Some(initializer) => self.evaluate(initializer)?,
            None => Object::from(Literal::Nil),
        };

        self.environment.borrow_mut().define(&stmt.name.lexeme, value);
        Ok(())
    }

    fn visit_block_stmt(&mut self, stmt: &BlockData) -> EvalResult<()> {
        let environment = Environment::new(Some(Rc::clone(&self.environment)));
        self.execute_block(&stmt.statements, Rc::new(RefCell::new(environment)))
    }

    fn visit_if_stmt(&mut self, stmt: &IfData) -> EvalResult<()> {
        if self.evaluate(&stmt.condition)?.as_bool() {
            self.execute(&stmt.then_branch)
        } else if let Some(else_branch) = &stmt.else_branch {
            self.execute(else_branch)
        } else {
            Ok(())
        }
    }

    fn visit_while_stmt(&mut self, stmt: &WhileData) -> EvalResult<()> {
        while self.evaluate(&stmt.condition)?.as_bool() {
            self.execute(&stmt.body)?;
        }

        Ok(())
    }

    fn visit_function_stmt(&mut self, stmt: &FunctionData) -> EvalResult<()> {
        let function = Function::new(stmt, Rc::clone(&self.environment));
        self.environment.borrow_mut().define(&stmt.name.lexeme, Object::Function(function));
        Ok(())
    }

    fn visit_return_stmt(&mut self, stmt: &ReturnData) -> EvalResult<()> {
        let value = match &stmt.value {
            Some(value) => self.evaluate(value)?,
            None => Object::from(Literal::Nil),
        };

        Err(Unwind::Return(value))
    }

    fn visit_class_stmt(&mut self, stmt: &ClassData) -> EvalResult<()> {
        let mut methods = HashMap::new();
        for method in &stmt.methods {
            let Stmt::Function(method) = method else { unreachable!() };
            methods.insert(
                method.name.lexeme.clone(),
                Function::new(method, Rc::clone(&self.environment)),
            );
        }

        let class = Rc::new(RefCell::new(Class::new(stmt.name.lexeme.clone(), methods)));
        self.environment.borrow_mut().define(&stmt.name.lexeme, Object::Class(class));
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parser::Parser;
    use crate::resolver::Resolver;
    use crate::scanner::Scanner;

    /// Runs a source string through the whole pipeline.
    fn run(interpreter: &mut Interpreter, source: &str) {
        let tokens = Scanner::new(source).scan_tokens();
        let mut parser = Parser::new(tokens);
        let statements = parser.parse();
        assert_eq!(parser.error_count, 0, "unexpected parse errors in {source:?}");

        let mut resolver = Resolver::new(interpreter);
        resolver.resolve(&statements);
        assert_eq!(resolver.error_count, 0, "unexpected resolve errors in {source:?}");

        interpreter.interpret(&statements);
    }

    fn global(interpreter: &Interpreter, name: &str) -> Object {
        interpreter.globals.borrow().get(&Token::from(name))
            .expect("global to be defined")
    }

    #[test]
    fn arithmetic_precedence() {
        let mut interpreter = Interpreter::new();
        run(&mut interpreter, "var r = 1 + 2 * 3;");
        assert_eq!(global(&interpreter, "r"), Object::from(7.0));
    }

    #[test]
    fn string_concatenation() {
        let mut interpreter = Interpreter::new();
        run(&mut interpreter, "var a = \"hi\"; var b = \" there\"; var r = a + b;");
        assert_eq!(global(&interpreter, "r"), Object::from("hi there"));
    }

    #[test]
    fn division() {
        let mut interpreter = Interpreter::new();
        run(&mut interpreter, "var r = 10 / 4;");
        assert_eq!(global(&interpreter, "r"), Object::from(2.5));
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let mut interpreter = Interpreter::new();
        run(&mut interpreter, "var r = 1 / 0;");
        assert_eq!(interpreter.error_count, 1);
    }

    #[test]
    fn adding_mixed_types_is_an_error() {
        let mut interpreter = Interpreter::new();
        run(&mut interpreter, "var r = 1 + \"x\";");
        assert_eq!(interpreter.error_count, 1);
    }

    #[test]
    fn comparison_requires_numbers() {
        let mut interpreter = Interpreter::new();
        run(&mut interpreter, "var r = 1 < \"x\";");
        assert_eq!(interpreter.error_count, 1);
    }

    #[test]
    fn equality_is_typed() {
        let mut interpreter = Interpreter::new();
        run(&mut interpreter, "var a = 1 == \"1\"; var b = nil == nil; var c = 1 != 2;");
        assert_eq!(global(&interpreter, "a"), Object::from(false));
        assert_eq!(global(&interpreter, "b"), Object::from(true));
        assert_eq!(global(&interpreter, "c"), Object::from(true));
    }

    #[test]
    fn logical_operators_return_booleans() {
        let mut interpreter = Interpreter::new();
        run(&mut interpreter, "var a = 1 and 2; var b = nil or \"x\"; var c = nil and 1;");
        assert_eq!(global(&interpreter, "a"), Object::from(true));
        assert_eq!(global(&interpreter, "b"), Object::from(true));
        assert_eq!(global(&interpreter, "c"), Object::from(false));
    }

    #[test]
    fn logical_operators_short_circuit() {
        let mut interpreter = Interpreter::new();
        run(&mut interpreter, "
            var called = false;
            fun side() { called = true; return true; }
            var r = false and side();
        ");
        assert_eq!(global(&interpreter, "r"), Object::from(false));
        assert_eq!(global(&interpreter, "called"), Object::from(false));
    }

    #[test]
    fn assignment_evaluates_to_the_value() {
        let mut interpreter = Interpreter::new();
        run(&mut interpreter, "var a = 1; var r = a = 3;");
        assert_eq!(global(&interpreter, "r"), Object::from(3.0));
        assert_eq!(global(&interpreter, "a"), Object::from(3.0));
    }

    #[test]
    fn assignment_does_not_create_a_binding() {
        let mut interpreter = Interpreter::new();
        run(&mut interpreter, "missing = 1;");
        assert_eq!(interpreter.error_count, 1);
    }

    #[test]
    fn block_scoping() {
        let mut interpreter = Interpreter::new();
        run(&mut interpreter, "
            var a = 1;
            var inner = nil;
            { var a = 2; inner = a; }
            var outer = a;
        ");
        assert_eq!(global(&interpreter, "inner"), Object::from(2.0));
        assert_eq!(global(&interpreter, "outer"), Object::from(1.0));
    }

    #[test]
    fn state_survives_a_runtime_error() {
        let mut interpreter = Interpreter::new();
        run(&mut interpreter, "var a = 1;");
        run(&mut interpreter, "{ var b = a + nil; print b; }");
        assert_eq!(interpreter.error_count, 1);

        // The environment was restored on unwind; a new line still runs
        // against the globals.
        interpreter.reset_errors();
        run(&mut interpreter, "var r = a + 1;");
        assert_eq!(interpreter.error_count, 0);
        assert_eq!(global(&interpreter, "r"), Object::from(2.0));
    }

    #[test]
    fn runtime_error_aborts_the_rest_of_the_run() {
        let mut interpreter = Interpreter::new();
        run(&mut interpreter, "var a = 1; var b = a + nil; a = 99;");
        assert_eq!(interpreter.error_count, 1);
        assert_eq!(global(&interpreter, "a"), Object::from(1.0));
    }

    #[test]
    fn functions_return_values() {
        let mut interpreter = Interpreter::new();
        run(&mut interpreter, "fun add(a, b) { return a + b; } var r = add(1, 2);");
        assert_eq!(global(&interpreter, "r"), Object::from(3.0));
    }

    #[test]
    fn functions_without_return_produce_nil() {
        let mut interpreter = Interpreter::new();
        run(&mut interpreter, "fun nop() {} var r = nop();");
        assert_eq!(global(&interpreter, "r"), Object::from(Literal::Nil));
    }

    #[test]
    fn return_unwinds_nested_blocks_and_loops() {
        let mut interpreter = Interpreter::new();
        run(&mut interpreter, "
            fun find() {
                for (var i = 0; i < 10; i = i + 1) {
                    if (i == 3) { return i; }
                }
                return -1;
            }
            var r = find();
        ");
        assert_eq!(global(&interpreter, "r"), Object::from(3.0));
    }

    #[test]
    fn recursion() {
        let mut interpreter = Interpreter::new();
        run(&mut interpreter, "
            fun fib(n) {
                if (n < 2) { return n; }
                return fib(n - 1) + fib(n - 2);
            }
            var r = fib(10);
        ");
        assert_eq!(global(&interpreter, "r"), Object::from(55.0));
    }

    #[test]
    fn closures_capture_their_environment() {
        let mut interpreter = Interpreter::new();
        run(&mut interpreter, "
            fun counter() {
                var n = 0;
                fun tick() { n = n + 1; return n; }
                return tick;
            }
            var c = counter();
            var a = c();
            var b = c();
            var d = c();
        ");
        assert_eq!(global(&interpreter, "a"), Object::from(1.0));
        assert_eq!(global(&interpreter, "b"), Object::from(2.0));
        assert_eq!(global(&interpreter, "d"), Object::from(3.0));
    }

    #[test]
    fn assignment_through_a_closure_is_observable() {
        let mut interpreter = Interpreter::new();
        run(&mut interpreter, "
            var result = nil;
            {
                var shared = \"before\";
                fun read() { return shared; }
                shared = \"after\";
                result = read();
            }
        ");
        assert_eq!(global(&interpreter, "result"), Object::from("after"));
    }

    #[test]
    fn for_loop_matches_hand_written_while() {
        let mut interpreter = Interpreter::new();
        run(&mut interpreter, "
            var a = 0;
            for (var i = 0; i < 5; i = i + 1) a = a + i;

            var b = 0;
            {
                var i = 0;
                while (i < 5) {
                    b = b + i;
                    i = i + 1;
                }
            }
        ");
        assert_eq!(global(&interpreter, "a"), global(&interpreter, "b"));
    }

    #[test]
    fn wrong_arity_is_an_error() {
        let mut interpreter = Interpreter::new();
        run(&mut interpreter, "fun f(a, b) { return a + b; } f(1);");
        assert_eq!(interpreter.error_count, 1);
    }

    #[test]
    fn calling_a_non_callable_is_an_error() {
        let mut interpreter = Interpreter::new();
        run(&mut interpreter, "var x = 1; x();");
        assert_eq!(interpreter.error_count, 1);
    }

    #[test]
    fn class_construction_and_methods() {
        let mut interpreter = Interpreter::new();
        run(&mut interpreter, "
            class Greet {
                init(name) { this.name = name; }
                hi() { return \"hello \" + this.name; }
            }
            var r = Greet(\"world\").hi();
        ");
        assert_eq!(global(&interpreter, "r"), Object::from("hello world"));
    }

    #[test]
    fn fields_shadow_methods() {
        let mut interpreter = Interpreter::new();
        run(&mut interpreter, "
            class C { kind() { return \"method\"; } }
            var c = C();
            c.kind = \"field\";
            var r = c.kind;
        ");
        assert_eq!(global(&interpreter, "r"), Object::from("field"));
    }

    #[test]
    fn bound_methods_are_distinct_but_share_the_instance() {
        let mut interpreter = Interpreter::new();
        run(&mut interpreter, "
            class C {
                init() { this.n = 0; }
                bump() { this.n = this.n + 1; return this.n; }
            }
            var c = C();
            var first = c.bump;
            var second = c.bump;
            var same = first == second;
            first();
            var r = second();
        ");
        assert_eq!(global(&interpreter, "same"), Object::from(false));
        assert_eq!(global(&interpreter, "r"), Object::from(2.0));
    }

    #[test]
    fn initializer_is_not_a_property() {
        let mut interpreter = Interpreter::new();
        run(&mut interpreter, "class C { init() { this.x = 1; } } var r = C().init;");
        assert_eq!(interpreter.error_count, 1);
    }

    #[test]
    fn class_call_returns_the_instance_despite_bare_return() {
        let mut interpreter = Interpreter::new();
        run(&mut interpreter, "
            class C {
                init() {
                    this.x = 1;
                    return;
                }
            }
            var r = C().x;
        ");
        assert_eq!(global(&interpreter, "r"), Object::from(1.0));
    }

    #[test]
    fn property_access_on_non_instance_is_an_error() {
        let mut interpreter = Interpreter::new();
        run(&mut interpreter, "var r = \"str\".length;");
        assert_eq!(interpreter.error_count, 1);
    }

    #[test]
    fn set_evaluates_value_before_object() {
        let mut interpreter = Interpreter::new();
        run(&mut interpreter, "
            var evaluated = false;
            fun value() { evaluated = true; return 1; }
            var n = 1;
            n.field = value();
        ");
        assert_eq!(interpreter.error_count, 1);
        assert_eq!(global(&interpreter, "evaluated"), Object::from(true));
    }

    #[test]
    fn clock_is_callable() {
        let mut interpreter = Interpreter::new();
        run(&mut interpreter, "var r = clock() > 0;");
        assert_eq!(global(&interpreter, "r"), Object::from(true));
    }
}
