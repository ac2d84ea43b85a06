use std::collections::HashMap;
use std::mem;

use crate::error::ResolveError;
use crate::expr::*;
use crate::interpreter::Interpreter;
use crate::literal::Literal;
use crate::stmt::*;
use crate::token::Token;

const INITIALIZER: &str = "init";

/// The kind of function body being resolved, for validating returns.
#[derive(Clone, Copy)]
enum FunctionType {
    None,
    Function,
    Initializer,
}

/// What the resolver knows about one declaration in a scope.
struct Meta {
    defined: bool,
    used: bool,
    line: usize,
}

/// A static pass over the AST run between parsing and evaluation.
///
/// For every use of a local name it records, keyed by the node's id, how
/// many environments up the chain the binding lives; the interpreter walks
/// exactly that many parents at runtime. It also reports the semantic
/// errors the parser cannot see: reading a variable in its own
/// initializer, duplicate declarations, returns outside a function or with
/// a value inside an initializer, `this` outside a class, and variables
/// that are declared but never used.
///
/// The bottom of the scope stack is a permanent tracking scope for
/// globals, pre-seeded from the interpreter's globals environment. Hits in
/// it are never recorded — global references stay late-bound by name so
/// top-level declarations can refer to each other in any order — and it is
/// exempt from the duplicate and unused diagnostics, since globals may be
/// redeclared freely.
pub struct Resolver<'a> {
    interpreter: &'a mut Interpreter,
    scopes: Vec<HashMap<String, Meta>>,
    current_function: FunctionType,
    inside_class: bool,
    pub error_count: usize,
}

impl<'a> Resolver<'a> {
    pub fn new(interpreter: &'a mut Interpreter) -> Self {
        let mut globals = HashMap::new();
        for name in interpreter.global_names() {
            globals.insert(name, Meta { defined: true, used: true, line: 0 });
        }

        Resolver {
            interpreter,
            scopes: vec![globals],
            current_function: FunctionType::None,
            inside_class: false,
            error_count: 0,
        }
    }

    pub fn resolve(&mut self, statements: &[Stmt]) {
        for statement in statements {
            self.resolve_stmt(statement);
        }
    }

    fn resolve_stmt(&mut self, statement: &Stmt) {
        statement.accept(self);
    }

    fn resolve_expr(&mut self, expr: &Expr) {
        expr.accept(self);
    }

    /// Reports a resolve error without aborting; the rest of the program is
    /// still resolved so every error surfaces in one run.
    fn report(&mut self, line: usize, message: String) {
        self.error_count += 1;
        println!("{}", ResolveError { line, message });
    }

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// Pops a scope, flagging every declaration that was never used.
    fn end_scope(&mut self) {
        let scope = self.scopes.pop().expect("a scope to end");

        let mut unused: Vec<(usize, String)> = scope
            .into_iter()
            .filter(|(_, meta)| !meta.used)
            .map(|(name, meta)| (meta.line, name))
            .collect();
        unused.sort();

        for (line, name) in unused {
            self.report(line, format!("{name} declared but not used."));
        }
    }

    /// Returns if the innermost scope is the globals tracking scope.
    fn at_global_scope(&self) -> bool {
        self.scopes.len() == 1
    }

    fn declare(&mut self, name: &Token) {
        if self.at_global_scope() {
            // Globals may be redeclared; an existing (defined) entry stays
            // defined so the initializer may read the previous binding.
            self.scopes[0]
                .entry(name.lexeme.clone())
                .or_insert(Meta { defined: false, used: true, line: name.line });
            return;
        }

        let scope = self.scopes.last().expect("scope stack to not be empty");
        if scope.contains_key(&name.lexeme) {
            self.report(name.line, "Already a variable with this name in this scope.".to_string());
            return;
        }

        self.scopes
            .last_mut()
            .expect("scope stack to not be empty")
            .insert(name.lexeme.clone(), Meta { defined: false, used: false, line: name.line });
    }

    fn define(&mut self, name: &Token) {
        self.scopes
            .last_mut()
            .expect("scope stack to not be empty")
            .get_mut(&name.lexeme)
            .expect("name to be declared before it is defined")
            .defined = true;
    }

    /// Binds a use to its declaration: searches the scopes from the inside
    /// out and records the hop count on a hit, unless the hit is a global.
    fn resolve_local(&mut self, id: usize, name: &Token) {
        for index in (0..self.scopes.len()).rev() {
            if let Some(meta) = self.scopes[index].get_mut(&name.lexeme) {
                meta.used = true;
                if index > 0 {
                    self.interpreter.resolve(id, self.scopes.len() - 1 - index);
                }
                return;
            }
        }
    }

    fn resolve_function(&mut self, function: &FunctionData, r#type: FunctionType) {
        let enclosing_function = mem::replace(&mut self.current_function, r#type);

        self.begin_scope();
        for param in &function.params {
            self.declare(param);
            self.define(param);
        }
        self.resolve(&function.body);
        self.end_scope();

        self.current_function = enclosing_function;
    }
}

impl ExprVisitor<()> for Resolver<'_> {
    fn visit_literal_expr(&mut self, _literal: &Literal) {}

    fn visit_unary_expr(&mut self, unary: &UnaryData) {
        self.resolve_expr(&unary.expr);
    }

    fn visit_binary_expr(&mut self, binary: &BinaryData) {
        self.resolve_expr(&binary.left);
        self.resolve_expr(&binary.right);
    }

    fn visit_logical_expr(&mut self, logical: &LogicalData) {
        self.resolve_expr(&logical.left);
        self.resolve_expr(&logical.right);
    }

    fn visit_grouping_expr(&mut self, grouping: &GroupingData) {
        self.resolve_expr(&grouping.expr);
    }

    fn visit_variable_expr(&mut self, variable: &VariableData) {
        let in_own_initializer = self.scopes
            .last()
            .and_then(|scope| scope.get(&variable.name.lexeme))
            .is_some_and(|meta| !meta.defined);

        if in_own_initializer {
            self.report(
                variable.name.line,
                "Can't read local variable in its own initializer.".to_string(),
            );
        }

        self.resolve_local(variable.id, &variable.name);
    }

    fn visit_assign_expr(&mut self, assign: &AssignData) {
        self.resolve_expr(&assign.value);
        self.resolve_local(assign.id, &assign.name);
    }

    fn visit_call_expr(&mut self, call: &CallData) {
        self.resolve_expr(&call.callee);

        for argument in &call.arguments {
            self.resolve_expr(argument);
        }
    }

    fn visit_get_expr(&mut self, get: &GetData) {
        // The property name is looked up dynamically; only the object
        // expression resolves.
        self.resolve_expr(&get.object);
    }

    fn visit_set_expr(&mut self, set: &SetData) {
        self.resolve_expr(&set.value);
        self.resolve_expr(&set.object);
    }

    fn visit_this_expr(&mut self, this: &ThisData) {
        if !self.inside_class {
            self.report(this.keyword.line, "Can't use 'this' outside of a class.".to_string());
            return;
        }

        self.resolve_local(this.id, &this.keyword);
    }
}

impl StmtVisitor<()> for Resolver<'_> {
    fn visit_expression_stmt(&mut self, stmt: &ExpressionData) {
        self.resolve_expr(&stmt.expr);
    }

    fn visit_print_stmt(&mut self, stmt: &PrintData) {
        self.resolve_expr(&stmt.expr);
    }

    fn visit_var_stmt(&mut self, stmt: &VarData) {
        self.declare(&stmt.name);
        if let Some(initializer) = &stmt.initializer {
            self.resolve_expr(initializer);
        }
        self.define(&stmt.name);
    }

    fn visit_block_stmt(&mut self, stmt: &BlockData) {
        self.begin_scope();
        self.resolve(&stmt.statements);
        self.end_scope();
    }

    fn visit_if_stmt(&mut self, stmt: &IfData) {
        self.resolve_expr(&stmt.condition);
        self.resolve_stmt(&stmt.then_branch);
        if let Some(else_branch) = &stmt.else_branch {
            self.resolve_stmt(else_branch);
        }
    }

    fn visit_while_stmt(&mut self, stmt: &WhileData) {
        self.resolve_expr(&stmt.condition);
        self.resolve_stmt(&stmt.body);
    }

    fn visit_function_stmt(&mut self, stmt: &FunctionData) {
        self.declare(&stmt.name);
        self.define(&stmt.name);

        self.resolve_function(stmt, FunctionType::Function);
    }

    fn visit_return_stmt(&mut self, stmt: &ReturnData) {
        if let FunctionType::None = self.current_function {
            self.report(stmt.keyword.line, "Can't return from top-level code.".to_string());
        }

        if let Some(value) = &stmt.value {
            if let FunctionType::Initializer = self.current_function {
                self.report(
                    stmt.keyword.line,
                    "Can't return a value from class initializer.".to_string(),
                );
                return;
            }

            self.resolve_expr(value);
        }
    }

    fn visit_class_stmt(&mut self, stmt: &ClassData) {
        self.declare(&stmt.name);
        self.define(&stmt.name);

        let enclosing_class = mem::replace(&mut self.inside_class, true);

        // Method bodies see `this` one scope outside their parameters.
        // It counts as used from the start; so do the methods themselves,
        // since a method is part of the class's interface whether or not
        // the class body calls it.
        self.begin_scope();
        self.scopes
            .last_mut()
            .expect("scope stack to not be empty")
            .insert("this".to_string(), Meta { defined: true, used: true, line: stmt.name.line });

        for method in &stmt.methods {
            let Stmt::Function(method) = method else { unreachable!() };

            let r#type = if method.name.lexeme == INITIALIZER {
                FunctionType::Initializer
            } else {
                FunctionType::Function
            };
            self.resolve_function(method, r#type);
        }

        self.end_scope();

        self.inside_class = enclosing_class;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parser::Parser;
    use crate::scanner::Scanner;

    fn resolve(source: &str) -> usize {
        let tokens = Scanner::new(source).scan_tokens();
        let mut parser = Parser::new(tokens);
        let statements = parser.parse();
        assert_eq!(parser.error_count, 0, "unexpected parse errors in {source:?}");

        let mut interpreter = Interpreter::new();
        let mut resolver = Resolver::new(&mut interpreter);
        resolver.resolve(&statements);
        resolver.error_count
    }

    #[test]
    fn clean_program() {
        assert_eq!(resolve("var a = 1; { var b = a; print b; } print a;"), 0);
    }

    #[test]
    fn global_forward_reference() {
        assert_eq!(resolve("fun a() { b(); } fun b() { print 1; } a();"), 0);
    }

    #[test]
    fn read_in_own_initializer() {
        assert_eq!(resolve("var x = x;"), 1);
        assert_eq!(resolve("fun f() { var a = a; print a; } f();"), 1);
    }

    #[test]
    fn global_redeclaration_reads_old_binding() {
        assert_eq!(resolve("var x = 1; var x = x + 1; print x;"), 0);
    }

    #[test]
    fn shadowing_outer_is_fine() {
        assert_eq!(resolve("var a = 1; { var a = 2; print a; } print a;"), 0);
    }

    #[test]
    fn duplicate_declaration() {
        assert_eq!(resolve("{ var a = 1; var a = 2; print a; }"), 1);
        // Globals may be redeclared.
        assert_eq!(resolve("var a = 1; var a = 2; print a;"), 0);
    }

    #[test]
    fn declared_but_not_used() {
        assert_eq!(resolve("{ var unused = 1; }"), 1);
        assert_eq!(resolve("fun f(a) { print 1; } f(1);"), 1);
    }

    #[test]
    fn return_at_top_level() {
        assert_eq!(resolve("return;"), 1);
        assert_eq!(resolve("return 1;"), 1);
    }

    #[test]
    fn return_value_from_initializer() {
        assert_eq!(resolve("class C { init() { return 1; } }"), 1);
        assert_eq!(resolve("class C { init() { return; } }"), 0);
        assert_eq!(resolve("class C { m() { return 1; } }"), 0);
    }

    #[test]
    fn this_outside_class() {
        assert_eq!(resolve("print this;"), 1);
        assert_eq!(resolve("fun f() { print this; } f();"), 1);
        assert_eq!(resolve("class C { m() { print this; } }"), 0);
    }

    #[test]
    fn methods_and_this_are_exempt_from_unused() {
        assert_eq!(resolve("class C { m() { print 1; } }"), 0);
    }
}
