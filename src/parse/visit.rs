//! Recorrido del árbol sintáctico en profundidad.
//!
//! Cada método `visit_*` tiene una implementación por omisión que
//! delega en la función `walk_*` homónima, la cual visita los hijos
//! del nodo. Un visitante redefine únicamente los métodos de interés
//! y llama a `walk_*` si desea continuar el descenso.

use super::{Alternative, Argument, Ast, Expr, FunctionDef, Parameter, Statement};
use crate::source::Located;

pub trait Visitor<'ast>: Sized {
    fn visit_statement(&mut self, statement: &'ast Located<Statement>) {
        walk_statement(self, statement)
    }

    fn visit_function_def(&mut self, function: &'ast FunctionDef) {
        walk_function_def(self, function)
    }

    /// Una secuencia de sentencias hermanas.
    fn visit_body(&mut self, body: &'ast [Located<Statement>]) {
        walk_body(self, body)
    }

    fn visit_alternative(&mut self, alternative: &'ast Located<Alternative>) {
        walk_alternative(self, alternative)
    }

    fn visit_expr(&mut self, expr: &'ast Located<Expr>) {
        walk_expr(self, expr)
    }
}

pub fn walk_ast<'a>(visitor: &mut impl Visitor<'a>, ast: &'a Ast) {
    visitor.visit_body(ast.body());
}

pub fn walk_body<'a>(visitor: &mut impl Visitor<'a>, body: &'a [Located<Statement>]) {
    for statement in body {
        visitor.visit_statement(statement);
    }
}

pub fn walk_function_def<'a>(visitor: &mut impl Visitor<'a>, function: &'a FunctionDef) {
    walk_parameters(visitor, &function.parameters);

    if let Some(returns) = &function.returns {
        visitor.visit_expr(returns);
    }

    visitor.visit_body(&function.body);
}

fn walk_parameters<'a>(visitor: &mut impl Visitor<'a>, parameters: &'a [Parameter]) {
    for parameter in parameters {
        if let Some(annotation) = &parameter.annotation {
            visitor.visit_expr(annotation);
        }

        if let Some(default) = &parameter.default {
            visitor.visit_expr(default);
        }
    }
}

pub fn walk_statement<'a>(visitor: &mut impl Visitor<'a>, statement: &'a Located<Statement>) {
    match statement.val() {
        Statement::FunctionDef(function) => visitor.visit_function_def(function),

        Statement::If {
            condition,
            body,
            alternative,
        } => {
            visitor.visit_expr(condition);
            visitor.visit_body(body);

            if let Some(alternative) = alternative {
                visitor.visit_alternative(alternative);
            }
        }

        Statement::While {
            condition,
            body,
            orelse,
        } => {
            visitor.visit_expr(condition);
            visitor.visit_body(body);
            visitor.visit_body(orelse);
        }

        Statement::For {
            target,
            iterable,
            body,
            orelse,
        } => {
            visitor.visit_expr(target);
            visitor.visit_expr(iterable);
            visitor.visit_body(body);
            visitor.visit_body(orelse);
        }

        Statement::Assign(assign) => {
            for target in &assign.targets {
                visitor.visit_expr(target);
            }

            visitor.visit_expr(&assign.value);
        }

        Statement::AnnAssign {
            target,
            annotation,
            value,
        } => {
            visitor.visit_expr(target);
            visitor.visit_expr(annotation);
            if let Some(value) = value {
                visitor.visit_expr(value);
            }
        }

        Statement::AugAssign { target, value, .. } => {
            visitor.visit_expr(target);
            visitor.visit_expr(value);
        }

        Statement::Return(Some(value)) | Statement::Expr(value) | Statement::Decorator(value) => {
            visitor.visit_expr(value)
        }

        Statement::Other { body, .. } => visitor.visit_body(body),

        Statement::Return(None) | Statement::Pass | Statement::Break | Statement::Continue => (),
    }
}

pub fn walk_alternative<'a>(visitor: &mut impl Visitor<'a>, alternative: &'a Located<Alternative>) {
    match alternative.val() {
        Alternative::Elif {
            condition,
            body,
            alternative,
        } => {
            visitor.visit_expr(condition);
            visitor.visit_body(body);

            if let Some(alternative) = alternative {
                visitor.visit_alternative(alternative);
            }
        }

        Alternative::Else(body) => visitor.visit_body(body),
    }
}

pub fn walk_expr<'a>(visitor: &mut impl Visitor<'a>, expr: &'a Located<Expr>) {
    match expr.val() {
        Expr::Constant(_) | Expr::FormattedString(_) | Expr::Name(_) => (),

        Expr::Binary(lhs, _, rhs) => {
            visitor.visit_expr(lhs);
            visitor.visit_expr(rhs);
        }

        Expr::Unary(_, operand) | Expr::Starred(operand) | Expr::Await(operand) => {
            visitor.visit_expr(operand)
        }

        Expr::Named(_, value) => visitor.visit_expr(value),

        Expr::Yield { value, .. } => {
            if let Some(value) = value {
                visitor.visit_expr(value);
            }
        }

        Expr::Logical(_, operands)
        | Expr::List(operands)
        | Expr::Tuple(operands)
        | Expr::Set(operands) => {
            for operand in operands {
                visitor.visit_expr(operand);
            }
        }

        Expr::Compare(first, comparisons) => {
            visitor.visit_expr(first);
            for (_, operand) in comparisons {
                visitor.visit_expr(operand);
            }
        }

        Expr::Conditional {
            condition,
            then,
            otherwise,
        } => {
            visitor.visit_expr(then);
            visitor.visit_expr(condition);
            visitor.visit_expr(otherwise);
        }

        Expr::Call {
            function,
            arguments,
        } => {
            visitor.visit_expr(function);
            for argument in arguments {
                match argument {
                    Argument::Positional(value)
                    | Argument::Keyword(_, value)
                    | Argument::Unpack(value) => visitor.visit_expr(value),
                }
            }
        }

        Expr::Attribute(object, _) => visitor.visit_expr(object),

        Expr::Subscript(object, index) => {
            visitor.visit_expr(object);
            visitor.visit_expr(index);
        }

        Expr::Slice { lower, upper, step } => {
            for bound in [lower, upper, step].into_iter().flatten() {
                visitor.visit_expr(bound);
            }
        }

        Expr::Dict(entries) => {
            for (key, value) in entries {
                if let Some(key) = key {
                    visitor.visit_expr(key);
                }

                visitor.visit_expr(value);
            }
        }

        Expr::Comprehension {
            element,
            value,
            clauses,
            ..
        } => {
            for clause in clauses {
                visitor.visit_expr(&clause.target);
                visitor.visit_expr(&clause.iterable);
                for condition in &clause.conditions {
                    visitor.visit_expr(condition);
                }
            }

            visitor.visit_expr(element);
            if let Some(value) = value {
                visitor.visit_expr(value);
            }
        }

        Expr::Lambda { parameters, body } => {
            walk_parameters(visitor, parameters);
            visitor.visit_expr(body);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse::parse, source::Source};
    use indoc::indoc;

    #[derive(Default)]
    struct Counter {
        statements: usize,
        names: Vec<String>,
    }

    impl<'ast> Visitor<'ast> for Counter {
        fn visit_statement(&mut self, statement: &'ast Located<Statement>) {
            self.statements += 1;
            walk_statement(self, statement)
        }

        fn visit_expr(&mut self, expr: &'ast Located<Expr>) {
            if let Expr::Name(name) = expr.val() {
                self.names.push(name.to_string());
            }

            walk_expr(self, expr)
        }
    }

    #[test]
    fn reaches_nested_statements_in_source_order() {
        let source = Source::new(
            "<test>",
            indoc! {"
                def f(a):
                    while a:
                        if b:
                            c = d
                        elif e:
                            pass
                        else:
                            g(h=i)
            "},
        );

        let ast = parse(&source).unwrap();
        let mut counter = Counter::default();
        walk_ast(&mut counter, &ast);

        assert_eq!(counter.statements, 6);
        assert_eq!(counter.names, ["a", "b", "c", "d", "e", "g", "i"]);
    }

    #[test]
    fn descends_into_other_statements_and_comprehensions() {
        let source = Source::new(
            "<test>",
            indoc! {"
                class A:
                    def f(self):
                        return [x for x in xs if ok]
                try:
                    pass
                finally:
                    g(*rest, **kw)
            "},
        );

        let ast = parse(&source).unwrap();
        let mut counter = Counter::default();
        walk_ast(&mut counter, &ast);

        assert_eq!(counter.statements, 6);
        assert_eq!(counter.names, ["x", "xs", "ok", "x", "g", "rest", "kw"]);
    }
}
