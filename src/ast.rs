use crate::expr::*;
use crate::literal::Literal;
use crate::stmt::*;

/// Renders the AST back to Lox source text.
///
/// Expressions come out fully parenthesized, so re-parsing the output
/// yields a tree that renders identically: the printed form is a normal
/// form for comparing trees without caring about grouping or node ids.
pub struct AstPrinter;

impl AstPrinter {
    /// Prints a whole program, one statement per line.
    pub fn print(&mut self, statements: &[Stmt]) -> String {
        statements
            .iter()
            .map(|statement| self.print_stmt(statement))
            .collect::<Vec<String>>()
            .join("\n")
    }

    pub fn print_stmt(&mut self, statement: &Stmt) -> String {
        statement.accept(self)
    }

    pub fn print_expr(&mut self, expr: &Expr) -> String {
        expr.accept(self)
    }

    /// Renders a function's signature and body, without a leading keyword.
    /// Shared between function declarations and class methods.
    fn function(&mut self, function: &FunctionData) -> String {
        let params = function.params
            .iter()
            .map(|param| param.lexeme.clone())
            .collect::<Vec<String>>()
            .join(", ");

        format!("{}({params}) {}", function.name.lexeme, self.block(&function.body))
    }

    fn block(&mut self, statements: &[Stmt]) -> String {
        let mut string = String::from("{");
        for statement in statements {
            string += " ";
            string += &statement.accept(self);
        }
        string += " }";

        string
    }
}

impl ExprVisitor<String> for AstPrinter {
    fn visit_literal_expr(&mut self, literal: &Literal) -> String {
        match literal {
            // Quoted so the output scans back to the same literal.
            Literal::String(s) => format!("\"{s}\""),
            _ => literal.to_string(),
        }
    }

    fn visit_unary_expr(&mut self, unary: &UnaryData) -> String {
        format!("({}{})", unary.operator.lexeme, unary.expr.accept(self))
    }

    fn visit_binary_expr(&mut self, binary: &BinaryData) -> String {
        format!(
            "({} {} {})",
            binary.left.accept(self),
            binary.operator.lexeme,
            binary.right.accept(self),
        )
    }

    fn visit_logical_expr(&mut self, logical: &LogicalData) -> String {
        format!(
            "({} {} {})",
            logical.left.accept(self),
            logical.operator.lexeme,
            logical.right.accept(self),
        )
    }

    // Transparent: every compound expression already parenthesizes itself,
    // so printing the grouping's own parens would grow a fresh Grouping
    // node on every re-parse and the output would never reach a fixed
    // point. Dropping them is what "up to grouping" means here.
    fn visit_grouping_expr(&mut self, grouping: &GroupingData) -> String {
        grouping.expr.accept(self)
    }

    fn visit_variable_expr(&mut self, variable: &VariableData) -> String {
        variable.name.lexeme.clone()
    }

    fn visit_assign_expr(&mut self, assign: &AssignData) -> String {
        format!("({} = {})", assign.name.lexeme, assign.value.accept(self))
    }

    fn visit_call_expr(&mut self, call: &CallData) -> String {
        let arguments = call.arguments
            .iter()
            .map(|argument| argument.accept(self))
            .collect::<Vec<String>>()
            .join(", ");

        format!("{}({arguments})", call.callee.accept(self))
    }

    fn visit_get_expr(&mut self, get: &GetData) -> String {
        format!("{}.{}", get.object.accept(self), get.name.lexeme)
    }

    fn visit_set_expr(&mut self, set: &SetData) -> String {
        format!(
            "({}.{} = {})",
            set.object.accept(self),
            set.name.lexeme,
            set.value.accept(self),
        )
    }

    fn visit_this_expr(&mut self, _this: &ThisData) -> String {
        String::from("this")
    }
}

impl StmtVisitor<String> for AstPrinter {
    fn visit_expression_stmt(&mut self, stmt: &ExpressionData) -> String {
        format!("{};", stmt.expr.accept(self))
    }

    fn visit_print_stmt(&mut self, stmt: &PrintData) -> String {
        format!("print {};", stmt.expr.accept(self))
    }

    fn visit_var_stmt(&mut self, stmt: &VarData) -> String {
        match &stmt.initializer {
            Some(initializer) => format!("var {} = {};", stmt.name.lexeme, initializer.accept(self)),
            None => format!("var {};", stmt.name.lexeme),
        }
    }

    fn visit_block_stmt(&mut self, stmt: &BlockData) -> String {
        self.block(&stmt.statements)
    }

    fn visit_if_stmt(&mut self, stmt: &IfData) -> String {
        let mut string = format!(
            "if ({}) {}",
            stmt.condition.accept(self),
            stmt.then_branch.accept(self),
        );

        if let Some(else_branch) = &stmt.else_branch {
            string += &format!(" else {}", else_branch.accept(self));
        }

        string
    }

    fn visit_while_stmt(&mut self, stmt: &WhileData) -> String {
        format!("while ({}) {}", stmt.condition.accept(self), stmt.body.accept(self))
    }

    fn visit_function_stmt(&mut self, stmt: &FunctionData) -> String {
        format!("fun {}", self.function(stmt))
    }

    fn visit_return_stmt(&mut self, stmt: &ReturnData) -> String {
        match &stmt.value {
            Some(value) => format!("return {};", value.accept(self)),
            None => String::from("return;"),
        }
    }

    fn visit_class_stmt(&mut self, stmt: &ClassData) -> String {
        let mut string = format!("class {} {{", stmt.name.lexeme);

        for method in &stmt.methods {
            let Stmt::Function(method) = method else { unreachable!() };
            string += " ";
            string += &self.function(method);
        }

        string += " }";
        string
    }
}
