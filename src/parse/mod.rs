//! Análisis sintáctico.
//!
//! El texto fuente se escanea en [`scan`] y los tokens resultantes se
//! disponen en un [`Ast`] por descenso recursivo. Funciones, condicionales,
//! ciclos, asignaciones y expresiones se modelan por completo, con la
//! precedencia usual del lenguaje. El resto de las sentencias válidas
//! (`import`, `class`, `try`, `with`, `match`, ...) se conservan como
//! [`Statement::Other`] junto con sus bloques. Solo el texto que viola
//! la gramática produce un [`SyntaxError`], lo cual detiene la compilación.

use std::{
    fmt::{self, Display},
    iter::Peekable,
    rc::Rc,
    slice,
};

use thiserror::Error;

use crate::source::{Located, Location, Position, Source};

pub mod scan;
pub mod visit;

use scan::{Keyword, Token};

/// Un identificador.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(Rc<str>);

impl Identifier {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Identifier {
    fn from(name: &str) -> Self {
        Identifier(Rc::from(name))
    }
}

impl Display for Identifier {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(&self.0)
    }
}

#[derive(Debug)]
pub struct Ast {
    body: Vec<Located<Statement>>,
    eof: Location,
}

impl Ast {
    /// Sentencias de nivel superior.
    pub fn body(&self) -> &[Located<Statement>] {
        &self.body
    }

    /// Ubicación del fin del programa.
    pub fn eof(&self) -> &Location {
        &self.eof
    }

    /// Origen a partir del cual se construyó el árbol.
    pub fn source(&self) -> &Rc<Source> {
        self.eof.source()
    }
}

#[derive(Debug)]
pub enum Statement {
    FunctionDef(FunctionDef),

    If {
        condition: Located<Expr>,
        body: Vec<Located<Statement>>,
        alternative: Option<Box<Located<Alternative>>>,
    },

    While {
        condition: Located<Expr>,
        body: Vec<Located<Statement>>,
        orelse: Vec<Located<Statement>>,
    },

    For {
        target: Located<Expr>,
        iterable: Located<Expr>,
        body: Vec<Located<Statement>>,
        orelse: Vec<Located<Statement>>,
    },

    Assign(Assign),

    /// Asignación anotada, `x: int = 5`.
    AnnAssign {
        target: Located<Expr>,
        annotation: Located<Expr>,
        value: Option<Located<Expr>>,
    },

    AugAssign {
        target: Located<Expr>,
        operator: BinOp,
        value: Located<Expr>,
    },

    Return(Option<Located<Expr>>),
    Expr(Located<Expr>),
    Pass,
    Break,
    Continue,

    /// `@expr` antes de una definición.
    Decorator(Located<Expr>),

    /// Sentencia válida que el compilador no modela. Se conservan
    /// únicamente los bloques anidados, en orden.
    Other {
        construct: &'static str,
        body: Vec<Located<Statement>>,
    },
}

#[derive(Debug)]
pub struct FunctionDef {
    pub name: Located<Identifier>,
    pub parameters: Vec<Parameter>,
    pub returns: Option<Located<Expr>>,
    pub body: Vec<Located<Statement>>,
}

#[derive(Debug)]
pub struct Parameter {
    pub name: Located<Identifier>,
    pub kind: ParameterKind,
    pub annotation: Option<Located<Expr>>,
    pub default: Option<Located<Expr>>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ParameterKind {
    Regular,

    /// `*args`
    Variadic,

    /// `**kwargs`
    KeywordVariadic,
}

#[derive(Debug)]
pub struct Assign {
    pub targets: Vec<Located<Expr>>,
    pub value: Located<Expr>,
}

/// Ramas `elif` y `else` de un condicional.
#[derive(Debug)]
pub enum Alternative {
    Elif {
        condition: Located<Expr>,
        body: Vec<Located<Statement>>,
        alternative: Option<Box<Located<Alternative>>>,
    },

    Else(Vec<Located<Statement>>),
}

#[derive(Debug)]
pub enum Expr {
    Constant(Constant),
    FormattedString(String),
    Name(Identifier),
    Binary(Box<Located<Expr>>, BinOp, Box<Located<Expr>>),
    Unary(UnaryOp, Box<Located<Expr>>),
    Logical(LogicalOp, Vec<Located<Expr>>),
    Compare(Box<Located<Expr>>, Vec<(CompareOp, Located<Expr>)>),

    Conditional {
        condition: Box<Located<Expr>>,
        then: Box<Located<Expr>>,
        otherwise: Box<Located<Expr>>,
    },

    Call {
        function: Box<Located<Expr>>,
        arguments: Vec<Argument>,
    },

    Attribute(Box<Located<Expr>>, Located<Identifier>),
    Subscript(Box<Located<Expr>>, Box<Located<Expr>>),

    /// `inicio:fin:paso` dentro de un subíndice.
    Slice {
        lower: Option<Box<Located<Expr>>>,
        upper: Option<Box<Located<Expr>>>,
        step: Option<Box<Located<Expr>>>,
    },

    List(Vec<Located<Expr>>),
    Tuple(Vec<Located<Expr>>),
    Set(Vec<Located<Expr>>),

    /// Una clave ausente corresponde a `**mapping`.
    Dict(Vec<(Option<Located<Expr>>, Located<Expr>)>),

    Comprehension {
        kind: ComprehensionKind,
        element: Box<Located<Expr>>,
        value: Option<Box<Located<Expr>>>,
        clauses: Vec<Comprehension>,
    },

    Lambda {
        parameters: Vec<Parameter>,
        body: Box<Located<Expr>>,
    },

    /// `nombre := valor`
    Named(Located<Identifier>, Box<Located<Expr>>),

    Starred(Box<Located<Expr>>),
    Await(Box<Located<Expr>>),

    /// `yield`, o `yield from` si `delegate` es verdadero.
    Yield {
        value: Option<Box<Located<Expr>>>,
        delegate: bool,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ComprehensionKind {
    List,
    Set,
    Dict,
    Generator,
}

/// Una cláusula `for ... in ... if ...` de una comprensión.
#[derive(Debug)]
pub struct Comprehension {
    pub target: Located<Expr>,
    pub iterable: Located<Expr>,
    pub conditions: Vec<Located<Expr>>,
}

#[derive(Debug)]
pub enum Argument {
    Positional(Located<Expr>),
    Keyword(Located<Identifier>, Located<Expr>),

    /// `**mapping`
    Unpack(Located<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Int(i64),

    /// Entero que excede `i64`, con sus dígitos tal como aparecen.
    LargeInt(String),

    Float(f64),
    Imaginary(f64),
    Str(String),
    Bool(bool),
    None,
    Ellipsis,
}

impl Display for Constant {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Int(integer) => write!(fmt, "{}", integer),
            Constant::LargeInt(digits) => fmt.write_str(digits),
            Constant::Float(float) => write!(fmt, "{:?}", float),
            Constant::Imaginary(imaginary) => write!(fmt, "{}j", imaginary),
            Constant::Str(string) => fmt.write_str(string),
            Constant::Bool(true) => fmt.write_str("True"),
            Constant::Bool(false) => fmt.write_str("False"),
            Constant::None => fmt.write_str("None"),
            Constant::Ellipsis => fmt.write_str("..."),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mult,
    Div,
    FloorDiv,
    Mod,
    Pow,
    MatMult,
    LShift,
    RShift,
    BitAnd,
    BitOr,
    BitXor,
}

impl BinOp {
    /// Operador de asignación aumentada correspondiente, como `+=`.
    fn from_augmented(symbol: &str) -> Option<Self> {
        use BinOp::*;

        let operator = match symbol {
            "+=" => Add,
            "-=" => Sub,
            "*=" => Mult,
            "/=" => Div,
            "//=" => FloorDiv,
            "%=" => Mod,
            "**=" => Pow,
            "@=" => MatMult,
            "<<=" => LShift,
            ">>=" => RShift,
            "&=" => BitAnd,
            "|=" => BitOr,
            "^=" => BitXor,
            _ => return None,
        };

        Some(operator)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
    Plus,
    Invert,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    In,
    NotIn,
    Is,
    IsNot,
}

/// Niveles de operadores binarios, de menor a mayor precedencia.
const BINARY_LEVELS: &[&[(&str, BinOp)]] = &[
    &[("|", BinOp::BitOr)],
    &[("^", BinOp::BitXor)],
    &[("&", BinOp::BitAnd)],
    &[("<<", BinOp::LShift), (">>", BinOp::RShift)],
    &[("+", BinOp::Add), ("-", BinOp::Sub)],
    &[
        ("*", BinOp::Mult),
        ("/", BinOp::Div),
        ("//", BinOp::FloorDiv),
        ("%", BinOp::Mod),
        ("@", BinOp::MatMult),
    ],
];

#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum SyntaxError {
    #[error("Invalid character {0:?} in source")]
    InvalidCharacter(char),

    #[error("Unterminated string literal")]
    UnterminatedString,

    #[error("Unmatched {0:?}")]
    UnmatchedBracket(char),

    #[error("Malformed numeric literal")]
    MalformedNumber,

    #[error("Unindent does not match any outer indentation level")]
    BadDedent,

    #[error("Unexpected indent")]
    UnexpectedIndent,

    #[error("Expected an indented block")]
    ExpectedIndent,

    #[error("Expected {0}, found {1} instead")]
    UnexpectedToken(String, Token),

    #[error("Expected {0}, none was found instead")]
    MissingToken(String),

    #[error("Expected an expression")]
    ExpectedExpr,

    #[error("Cannot assign to expression")]
    InvalidTarget,

    #[error("Abrupt end of program")]
    UnexpectedEof,
}

type Parse<T> = Result<T, Located<SyntaxError>>;

/// Valida y construye el árbol sintáctico de un origen.
pub fn parse(source: &Rc<Source>) -> Parse<Ast> {
    let tokens = scan::tokenize(source)?;

    let eof = match tokens.last() {
        Some(token) => Location::at(Rc::clone(source), token.location().end()),
        None => Location::at(Rc::clone(source), Position::default()),
    };

    let mut parser = Parser {
        tokens: tokens.iter().peekable(),
        last_known: eof.clone(),
        eof,
    };

    parser.program()
}

struct Parser<'a> {
    tokens: Peekable<slice::Iter<'a, Located<Token>>>,
    last_known: Location,
    eof: Location,
}

impl Parser<'_> {
    fn program(&mut self) -> Parse<Ast> {
        let mut body = Vec::new();
        while self.tokens.peek().is_some() {
            body.extend(self.statement()?);
        }

        Ok(Ast {
            body,
            eof: self.eof.clone(),
        })
    }

    fn statement(&mut self) -> Parse<Vec<Located<Statement>>> {
        if self.is_match_statement() {
            return Ok(vec![self.match_statement()?]);
        }

        let statement = match self.peek() {
            Some(Token::Keyword(Keyword::Def)) => self.function_def()?,
            Some(Token::Keyword(Keyword::If)) => self.if_statement()?,
            Some(Token::Keyword(Keyword::While)) => self.while_statement()?,
            Some(Token::Keyword(Keyword::For)) => self.for_statement()?,
            Some(Token::Keyword(Keyword::Async)) => return self.async_statement(),

            Some(Token::Keyword(keyword @ (Keyword::Class | Keyword::With | Keyword::Try))) => {
                let keyword = *keyword;
                self.compound(keyword)?
            }

            Some(Token::Symbol("@")) => self.decorator()?,

            Some(Token::Indent) => {
                self.next()?;
                return self.fail(SyntaxError::UnexpectedIndent);
            }

            _ => return self.simple_statements(),
        };

        Ok(vec![statement])
    }

    fn function_def(&mut self) -> Parse<Located<Statement>> {
        let start = self.keyword(Keyword::Def)?;
        let name = self.id()?;

        self.symbol("(")?;
        let parameters = self.parameters(")", true)?;
        self.symbol(")")?;

        let returns = if self.eat_symbol("->") {
            Some(self.expr()?)
        } else {
            None
        };

        let body = self.block()?;
        let function = FunctionDef {
            name,
            parameters,
            returns,
            body,
        };

        Ok(self.located(Statement::FunctionDef(function), start))
    }

    /// Parámetros hasta `close`. Los separadores `*` y `/` no producen parámetros.
    fn parameters(&mut self, close: &'static str, annotated: bool) -> Parse<Vec<Parameter>> {
        let parameters = self.comma_separated(close, |s| s.parameter(annotated))?;
        Ok(parameters.into_iter().flatten().collect())
    }

    fn parameter(&mut self, annotated: bool) -> Parse<Option<Parameter>> {
        let kind = if self.eat_symbol("**") {
            ParameterKind::KeywordVariadic
        } else if self.eat_symbol("*") {
            if !matches!(self.peek(), Some(Token::Name(_))) {
                return Ok(None);
            }

            ParameterKind::Variadic
        } else if self.eat_symbol("/") {
            return Ok(None);
        } else {
            ParameterKind::Regular
        };

        let name = self.id()?;

        let annotation = if annotated && self.eat_symbol(":") {
            Some(self.expr()?)
        } else {
            None
        };

        let default = if self.eat_symbol("=") {
            Some(self.expr()?)
        } else {
            None
        };

        Ok(Some(Parameter {
            name,
            kind,
            annotation,
            default,
        }))
    }

    fn if_statement(&mut self) -> Parse<Located<Statement>> {
        let start = self.keyword(Keyword::If)?;
        let condition = self.named_expr()?;
        let body = self.block()?;
        let alternative = self.alternative()?;

        let statement = Statement::If {
            condition,
            body,
            alternative,
        };

        Ok(self.located(statement, start))
    }

    fn alternative(&mut self) -> Parse<Option<Box<Located<Alternative>>>> {
        let alternative = match self.peek() {
            Some(Token::Keyword(Keyword::Elif)) => {
                let start = self.keyword(Keyword::Elif)?;
                let condition = self.named_expr()?;
                let body = self.block()?;
                let alternative = self.alternative()?;

                let elif = Alternative::Elif {
                    condition,
                    body,
                    alternative,
                };

                self.located(elif, start)
            }

            Some(Token::Keyword(Keyword::Else)) => {
                let start = self.keyword(Keyword::Else)?;
                let body = self.block()?;
                self.located(Alternative::Else(body), start)
            }

            _ => return Ok(None),
        };

        Ok(Some(Box::new(alternative)))
    }

    fn while_statement(&mut self) -> Parse<Located<Statement>> {
        let start = self.keyword(Keyword::While)?;
        let condition = self.named_expr()?;
        let body = self.block()?;
        let orelse = self.loop_else()?;

        let statement = Statement::While {
            condition,
            body,
            orelse,
        };

        Ok(self.located(statement, start))
    }

    fn for_statement(&mut self) -> Parse<Located<Statement>> {
        let start = self.keyword(Keyword::For)?;

        // El objetivo no puede contener `in`, por lo cual se detiene antes de comparaciones
        let target = self.sequence(|s| s.starred(|s| s.binary(0)))?;
        self.check_target(&target)?;

        self.keyword(Keyword::In)?;
        let iterable = self.sequence(|s| s.starred(Parser::expr))?;
        let body = self.block()?;
        let orelse = self.loop_else()?;

        let statement = Statement::For {
            target,
            iterable,
            body,
            orelse,
        };

        Ok(self.located(statement, start))
    }

    /// Bloque `else` opcional de un ciclo.
    fn loop_else(&mut self) -> Parse<Vec<Located<Statement>>> {
        if self.eat_keyword(Keyword::Else) {
            self.block()
        } else {
            Ok(Vec::new())
        }
    }

    /// `async` solo precede a `def`, `for` o `with`.
    fn async_statement(&mut self) -> Parse<Vec<Located<Statement>>> {
        self.keyword(Keyword::Async)?;
        match self.peek() {
            Some(Token::Keyword(Keyword::Def | Keyword::For | Keyword::With)) => self.statement(),
            _ => {
                let found = self.next()?.into_inner();
                let expected = String::from("`def`, `for` or `with`");
                self.fail(SyntaxError::UnexpectedToken(expected, found))
            }
        }
    }

    /// Sentencias compuestas que no se traducen: `class`, `with` y `try`
    /// con sus cláusulas. Los encabezados se omiten y los bloques se analizan.
    fn compound(&mut self, keyword: Keyword) -> Parse<Located<Statement>> {
        let start = self.keyword(keyword)?;
        let mut body = self.clause()?;

        if keyword == Keyword::Try {
            while let Some(Token::Keyword(Keyword::Except | Keyword::Else | Keyword::Finally)) =
                self.peek()
            {
                self.next()?;
                body.extend(self.clause()?);
            }
        }

        let statement = Statement::Other {
            construct: keyword.name(),
            body,
        };

        Ok(self.located(statement, start))
    }

    fn clause(&mut self) -> Parse<Vec<Located<Statement>>> {
        self.skip_header();
        self.block()
    }

    /// Avanza hasta el `:` que abre el bloque, fuera de todo paréntesis.
    fn skip_header(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.peek() {
                None | Some(Token::Newline) => return,
                Some(Token::Symbol(":")) if depth == 0 => return,
                Some(Token::Symbol("(" | "[" | "{")) => depth += 1,
                Some(Token::Symbol(")" | "]" | "}")) => depth = depth.saturating_sub(1),
                Some(_) => (),
            }

            if self.next().is_err() {
                return;
            }
        }
    }

    /// `match` es palabra clave solo al inicio de una línea que termina en `:`.
    fn is_match_statement(&self) -> bool {
        let mut ahead = self.tokens.clone();
        match ahead.next().map(Located::val) {
            Some(Token::Name(name)) if name.as_str() == "match" => (),
            _ => return false,
        }

        let last = ahead
            .map(Located::val)
            .take_while(|token| **token != Token::Newline)
            .last();

        matches!(last, Some(Token::Symbol(":")))
    }

    fn match_statement(&mut self) -> Parse<Located<Statement>> {
        let start = self.peek_location();
        self.next()?;
        self.skip_header();
        self.symbol(":")?;
        self.expect(Token::Newline, "end of line")?;
        self.expect(Token::Indent, "an indented block")?;

        let mut body = Vec::new();
        loop {
            match self.peek() {
                Some(Token::Dedent) => {
                    self.next()?;
                    break;
                }

                None => break,
                Some(Token::Name(name)) if name.as_str() == "case" => {
                    self.next()?;
                    body.extend(self.clause()?);
                }

                Some(_) => {
                    let found = self.next()?.into_inner();
                    return self.fail(SyntaxError::UnexpectedToken(String::from("`case`"), found));
                }
            }
        }

        let statement = Statement::Other {
            construct: "match",
            body,
        };

        Ok(self.located(statement, start))
    }

    fn decorator(&mut self) -> Parse<Located<Statement>> {
        let start = self.symbol("@")?;
        let decorator = self.named_expr()?;
        self.expect(Token::Newline, "end of line")?;

        Ok(self.located(Statement::Decorator(decorator), start))
    }

    fn block(&mut self) -> Parse<Vec<Located<Statement>>> {
        self.symbol(":")?;

        if !matches!(self.peek(), Some(Token::Newline)) {
            return self.simple_statements();
        }

        self.next()?;
        match self.tokens.next() {
            Some(token) if *token.val() == Token::Indent => (),
            Some(token) => {
                self.last_known = token.location().clone();
                return self.fail(SyntaxError::ExpectedIndent);
            }

            None => return self.fail(SyntaxError::ExpectedIndent),
        }

        let mut body = Vec::new();
        loop {
            match self.peek() {
                Some(Token::Dedent) => {
                    self.next()?;
                    break Ok(body);
                }

                None => break Ok(body),
                Some(_) => body.extend(self.statement()?),
            }
        }
    }

    fn simple_statements(&mut self) -> Parse<Vec<Located<Statement>>> {
        let mut statements = vec![self.small_statement()?];
        while self.eat_symbol(";") {
            if matches!(self.peek(), Some(Token::Newline)) {
                break;
            }

            statements.push(self.small_statement()?);
        }

        self.expect(Token::Newline, "end of line")?;
        Ok(statements)
    }

    fn small_statement(&mut self) -> Parse<Located<Statement>> {
        let start = self.peek_location();

        let statement = match self.peek() {
            Some(Token::Keyword(Keyword::Pass)) => {
                self.next()?;
                Statement::Pass
            }

            Some(Token::Keyword(Keyword::Break)) => {
                self.next()?;
                Statement::Break
            }

            Some(Token::Keyword(Keyword::Continue)) => {
                self.next()?;
                Statement::Continue
            }

            Some(Token::Keyword(Keyword::Return)) => {
                self.next()?;
                match self.peek() {
                    Some(Token::Newline) | Some(Token::Symbol(";")) => Statement::Return(None),
                    _ => Statement::Return(Some(self.sequence(|s| s.starred(Parser::expr))?)),
                }
            }

            Some(Token::Keyword(
                keyword @ (Keyword::Import
                | Keyword::From
                | Keyword::Global
                | Keyword::Nonlocal
                | Keyword::Del
                | Keyword::Assert
                | Keyword::Raise),
            )) => {
                let keyword = *keyword;
                self.next()?;
                self.other_statement(keyword)?;

                Statement::Other {
                    construct: keyword.name(),
                    body: Vec::new(),
                }
            }

            _ => self.expr_statement()?,
        };

        Ok(self.located(statement, start))
    }

    /// Valida el resto de una sentencia simple que no se modela.
    fn other_statement(&mut self, keyword: Keyword) -> Parse<()> {
        match keyword {
            Keyword::Import => loop {
                self.dotted_name()?;
                if self.eat_keyword(Keyword::As) {
                    self.id()?;
                }

                if !self.eat_symbol(",") {
                    break Ok(());
                }
            },

            Keyword::From => {
                while self.eat_symbol(".") || self.eat_symbol("...") {}
                if !matches!(self.peek(), Some(Token::Keyword(Keyword::Import))) {
                    self.dotted_name()?;
                }

                self.keyword(Keyword::Import)?;
                if self.eat_symbol("*") {
                    return Ok(());
                }

                let parenthesized = self.eat_symbol("(");
                loop {
                    self.id()?;
                    if self.eat_keyword(Keyword::As) {
                        self.id()?;
                    }

                    if !self.eat_symbol(",") || self.peek_symbol(")") {
                        break;
                    }
                }

                if parenthesized {
                    self.symbol(")")?;
                }

                Ok(())
            }

            Keyword::Global | Keyword::Nonlocal => {
                self.id()?;
                while self.eat_symbol(",") {
                    self.id()?;
                }

                Ok(())
            }

            Keyword::Del => {
                let targets = self.sequence(|s| s.binary(0))?;
                self.check_target(&targets)
            }

            Keyword::Assert => {
                self.expr()?;
                if self.eat_symbol(",") {
                    self.expr()?;
                }

                Ok(())
            }

            // `raise [excepción [from causa]]`
            _ => {
                if self.starts_expr() {
                    self.expr()?;
                    if self.eat_keyword(Keyword::From) {
                        self.expr()?;
                    }
                }

                Ok(())
            }
        }
    }

    fn dotted_name(&mut self) -> Parse<()> {
        self.id()?;
        while self.eat_symbol(".") {
            self.id()?;
        }

        Ok(())
    }

    fn expr_statement(&mut self) -> Parse<Statement> {
        let first = self.assigned_value()?;

        if self.eat_symbol(":") {
            self.check_single_target(&first)?;
            let annotation = self.expr()?;
            let value = if self.eat_symbol("=") {
                Some(self.assigned_value()?)
            } else {
                None
            };

            return Ok(Statement::AnnAssign {
                target: first,
                annotation,
                value,
            });
        }

        if let Some(Token::Symbol(symbol)) = self.peek() {
            if let Some(operator) = BinOp::from_augmented(symbol) {
                self.next()?;
                self.check_single_target(&first)?;

                let value = self.assigned_value()?;
                return Ok(Statement::AugAssign {
                    target: first,
                    operator,
                    value,
                });
            }
        }

        if !matches!(self.peek(), Some(Token::Symbol("="))) {
            return Ok(Statement::Expr(first));
        }

        let mut targets = vec![first];
        while self.eat_symbol("=") {
            targets.push(self.assigned_value()?);
        }

        let value = targets.pop().ok_or_else(|| self.error(SyntaxError::ExpectedExpr))?;
        for target in &targets {
            self.check_target(target)?;
        }

        Ok(Statement::Assign(Assign { targets, value }))
    }

    /// Lado derecho de una asignación: una expresión `yield` o una secuencia.
    fn assigned_value(&mut self) -> Parse<Located<Expr>> {
        if matches!(self.peek(), Some(Token::Keyword(Keyword::Yield))) {
            self.yield_expr()
        } else {
            self.sequence(|s| s.starred(Parser::expr))
        }
    }

    fn check_single_target(&self, target: &Located<Expr>) -> Parse<()> {
        match target.val() {
            Expr::Name(_) | Expr::Attribute(..) | Expr::Subscript(..) => Ok(()),
            _ => Err(Located::at(
                SyntaxError::InvalidTarget,
                target.location().clone(),
            )),
        }
    }

    fn check_target(&self, target: &Located<Expr>) -> Parse<()> {
        match target.val() {
            Expr::Name(_) | Expr::Attribute(..) | Expr::Subscript(..) => Ok(()),
            Expr::Starred(inner) => self.check_target(inner),
            Expr::Tuple(items) | Expr::List(items) => {
                items.iter().try_for_each(|item| self.check_target(item))
            }

            _ => Err(Located::at(
                SyntaxError::InvalidTarget,
                target.location().clone(),
            )),
        }
    }

    /// Una o más expresiones separadas por comas, formando una tupla si hay comas.
    fn sequence<F>(&mut self, mut rule: F) -> Parse<Located<Expr>>
    where
        F: FnMut(&mut Self) -> Parse<Located<Expr>>,
    {
        let first = rule(self)?;
        if !matches!(self.peek(), Some(Token::Symbol(","))) {
            return Ok(first);
        }

        let start = first.location().clone();
        let mut items = vec![first];
        while self.eat_symbol(",") {
            if !self.starts_expr() {
                break;
            }

            items.push(rule(self)?);
        }

        Ok(self.located(Expr::Tuple(items), start))
    }

    fn expr(&mut self) -> Parse<Located<Expr>> {
        if matches!(self.peek(), Some(Token::Keyword(Keyword::Lambda))) {
            return self.lambda();
        }

        let start = self.peek_location();
        let then = self.disjunction()?;

        if !matches!(self.peek(), Some(Token::Keyword(Keyword::If))) {
            return Ok(then);
        }

        self.next()?;
        let condition = self.disjunction()?;
        self.keyword(Keyword::Else)?;
        let otherwise = self.expr()?;

        let conditional = Expr::Conditional {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        };

        Ok(self.located(conditional, start))
    }

    /// Expresión con una asignación opcional `nombre := valor`.
    fn named_expr(&mut self) -> Parse<Located<Expr>> {
        let start = self.peek_location();
        let expr = self.expr()?;
        if !self.eat_symbol(":=") {
            return Ok(expr);
        }

        let name = match expr.split() {
            (location, Expr::Name(name)) => Located::at(name, location),
            (location, _) => return Err(Located::at(SyntaxError::InvalidTarget, location)),
        };

        let value = self.expr()?;
        Ok(self.located(Expr::Named(name, Box::new(value)), start))
    }

    /// Admite un `*` de desempaquetado antes de lo que reconoce `rule`.
    fn starred<F>(&mut self, rule: F) -> Parse<Located<Expr>>
    where
        F: FnOnce(&mut Self) -> Parse<Located<Expr>>,
    {
        if !self.peek_symbol("*") {
            return rule(self);
        }

        let start = self.symbol("*")?;
        let value = self.binary(0)?;
        Ok(self.located(Expr::Starred(Box::new(value)), start))
    }

    fn lambda(&mut self) -> Parse<Located<Expr>> {
        let start = self.keyword(Keyword::Lambda)?;
        let parameters = self.parameters(":", false)?;
        self.symbol(":")?;

        let body = Box::new(self.expr()?);
        Ok(self.located(Expr::Lambda { parameters, body }, start))
    }

    fn yield_expr(&mut self) -> Parse<Located<Expr>> {
        let start = self.keyword(Keyword::Yield)?;

        let (value, delegate) = if self.eat_keyword(Keyword::From) {
            (Some(self.expr()?), true)
        } else if self.starts_expr() {
            (Some(self.sequence(|s| s.starred(Parser::expr))?), false)
        } else {
            (None, false)
        };

        let value = value.map(Box::new);
        Ok(self.located(Expr::Yield { value, delegate }, start))
    }

    fn disjunction(&mut self) -> Parse<Located<Expr>> {
        self.logical(Keyword::Or, LogicalOp::Or, Parser::conjunction)
    }

    fn conjunction(&mut self) -> Parse<Located<Expr>> {
        self.logical(Keyword::And, LogicalOp::And, Parser::inversion)
    }

    fn logical<F>(&mut self, keyword: Keyword, operator: LogicalOp, operand: F) -> Parse<Located<Expr>>
    where
        F: Fn(&mut Self) -> Parse<Located<Expr>>,
    {
        let start = self.peek_location();
        let first = operand(self)?;

        let mut operands = vec![first];
        while matches!(self.peek(), Some(Token::Keyword(found)) if *found == keyword) {
            self.next()?;
            operands.push(operand(self)?);
        }

        match operands.len() {
            1 => Ok(operands.remove(0)),
            _ => Ok(self.located(Expr::Logical(operator, operands), start)),
        }
    }

    fn inversion(&mut self) -> Parse<Located<Expr>> {
        if !matches!(self.peek(), Some(Token::Keyword(Keyword::Not))) {
            return self.comparison();
        }

        let start = self.keyword(Keyword::Not)?;
        let operand = self.inversion()?;
        Ok(self.located(Expr::Unary(UnaryOp::Not, Box::new(operand)), start))
    }

    fn comparison(&mut self) -> Parse<Located<Expr>> {
        let start = self.peek_location();
        let first = self.binary(0)?;

        let mut comparisons = Vec::new();
        while let Some(operator) = self.compare_op()? {
            comparisons.push((operator, self.binary(0)?));
        }

        if comparisons.is_empty() {
            Ok(first)
        } else {
            Ok(self.located(Expr::Compare(Box::new(first), comparisons), start))
        }
    }

    fn compare_op(&mut self) -> Parse<Option<CompareOp>> {
        use CompareOp::*;

        let operator = match self.peek() {
            Some(Token::Symbol("==")) => Equal,
            Some(Token::Symbol("!=")) => NotEqual,
            Some(Token::Symbol("<")) => Less,
            Some(Token::Symbol("<=")) => LessOrEqual,
            Some(Token::Symbol(">")) => Greater,
            Some(Token::Symbol(">=")) => GreaterOrEqual,
            Some(Token::Keyword(Keyword::In)) => In,

            Some(Token::Keyword(Keyword::Is)) => {
                self.next()?;
                if matches!(self.peek(), Some(Token::Keyword(Keyword::Not))) {
                    self.next()?;
                    return Ok(Some(IsNot));
                }

                return Ok(Some(Is));
            }

            Some(Token::Keyword(Keyword::Not)) => {
                let mut ahead = self.tokens.clone();
                ahead.next();
                match ahead.next().map(Located::val) {
                    Some(Token::Keyword(Keyword::In)) => {
                        self.next()?;
                        self.next()?;
                        return Ok(Some(NotIn));
                    }

                    _ => return Ok(None),
                }
            }

            _ => return Ok(None),
        };

        self.next()?;
        Ok(Some(operator))
    }

    fn binary(&mut self, level: usize) -> Parse<Located<Expr>> {
        let operators = match BINARY_LEVELS.get(level) {
            Some(operators) => *operators,
            None => return self.factor(),
        };

        let start = self.peek_location();
        let mut lhs = self.binary(level + 1)?;

        loop {
            let operator = match self.peek() {
                Some(Token::Symbol(symbol)) => operators
                    .iter()
                    .find(|&&(candidate, _)| candidate == *symbol)
                    .map(|&(_, operator)| operator),

                _ => None,
            };

            let operator = match operator {
                Some(operator) => operator,
                None => break Ok(lhs),
            };

            self.next()?;
            let rhs = self.binary(level + 1)?;
            lhs = self.located(
                Expr::Binary(Box::new(lhs), operator, Box::new(rhs)),
                start.clone(),
            );
        }
    }

    fn factor(&mut self) -> Parse<Located<Expr>> {
        let operator = match self.peek() {
            Some(Token::Symbol("-")) => UnaryOp::Negate,
            Some(Token::Symbol("+")) => UnaryOp::Plus,
            Some(Token::Symbol("~")) => UnaryOp::Invert,
            _ => return self.power(),
        };

        let start = self.peek_location();
        self.next()?;

        let operand = self.factor()?;
        Ok(self.located(Expr::Unary(operator, Box::new(operand)), start))
    }

    fn power(&mut self) -> Parse<Located<Expr>> {
        let start = self.peek_location();
        let base = if self.eat_keyword(Keyword::Await) {
            let awaited = self.primary()?;
            self.located(Expr::Await(Box::new(awaited)), start.clone())
        } else {
            self.primary()?
        };

        if !self.eat_symbol("**") {
            return Ok(base);
        }

        // `**` asocia a la derecha y liga más fuerte que un signo a su izquierda
        let exponent = self.factor()?;
        let power = Expr::Binary(Box::new(base), BinOp::Pow, Box::new(exponent));
        Ok(self.located(power, start))
    }

    fn primary(&mut self) -> Parse<Located<Expr>> {
        let start = self.peek_location();
        let mut expr = self.atom()?;

        loop {
            expr = match self.peek() {
                Some(Token::Symbol("(")) => {
                    self.next()?;
                    let arguments = self.comma_separated(")", Parser::argument)?;
                    self.symbol(")")?;

                    let call = Expr::Call {
                        function: Box::new(expr),
                        arguments,
                    };

                    self.located(call, start.clone())
                }

                Some(Token::Symbol("[")) => {
                    self.next()?;
                    let index = self.sequence(Parser::slice_item)?;
                    self.symbol("]")?;

                    let subscript = Expr::Subscript(Box::new(expr), Box::new(index));
                    self.located(subscript, start.clone())
                }

                Some(Token::Symbol(".")) => {
                    self.next()?;
                    let attribute = self.id()?;
                    self.located(Expr::Attribute(Box::new(expr), attribute), start.clone())
                }

                _ => break Ok(expr),
            };
        }
    }

    /// Un índice o un rango `inicio:fin:paso` con partes opcionales.
    fn slice_item(&mut self) -> Parse<Located<Expr>> {
        if self.peek_symbol("*") {
            return self.starred(Parser::expr);
        }

        let start = self.peek_location();
        let lower = if self.peek_symbol(":") {
            None
        } else {
            Some(self.named_expr()?)
        };

        if !self.eat_symbol(":") {
            return lower.ok_or_else(|| self.error(SyntaxError::ExpectedExpr));
        }

        let upper = self.optional_expr()?;
        let step = if self.eat_symbol(":") {
            self.optional_expr()?
        } else {
            None
        };

        let slice = Expr::Slice {
            lower: lower.map(Box::new),
            upper,
            step,
        };

        Ok(self.located(slice, start))
    }

    fn optional_expr(&mut self) -> Parse<Option<Box<Located<Expr>>>> {
        if self.starts_expr() {
            Ok(Some(Box::new(self.expr()?)))
        } else {
            Ok(None)
        }
    }

    fn argument(&mut self) -> Parse<Argument> {
        if self.eat_symbol("**") {
            return Ok(Argument::Unpack(self.expr()?));
        }

        let mut ahead = self.tokens.clone();
        let is_keyword = matches!(
            (ahead.next().map(Located::val), ahead.next().map(Located::val)),
            (Some(Token::Name(_)), Some(Token::Symbol("=")))
        );

        if is_keyword {
            let name = self.id()?;
            self.symbol("=")?;
            return Ok(Argument::Keyword(name, self.expr()?));
        }

        let start = self.peek_location();
        let value = self.starred(Parser::named_expr)?;
        if !self.at_comprehension() {
            return Ok(Argument::Positional(value));
        }

        // Un generador como argumento no requiere paréntesis propios
        let generator = self.comprehension(ComprehensionKind::Generator, value, None)?;
        Ok(Argument::Positional(self.located(generator, start)))
    }

    fn atom(&mut self) -> Parse<Located<Expr>> {
        let (location, token) = match self.tokens.peek() {
            Some(token) => (*token).clone().split(),
            None => return self.fail(SyntaxError::UnexpectedEof),
        };

        let expr = match token {
            Token::Name(name) => Expr::Name(name),
            Token::Int(integer) => Expr::Constant(Constant::Int(integer)),
            Token::LargeInt(digits) => Expr::Constant(Constant::LargeInt(digits)),
            Token::Float(float) => Expr::Constant(Constant::Float(float)),
            Token::Imaginary(imaginary) => Expr::Constant(Constant::Imaginary(imaginary)),
            Token::Symbol("...") => Expr::Constant(Constant::Ellipsis),
            Token::Keyword(Keyword::True) => Expr::Constant(Constant::Bool(true)),
            Token::Keyword(Keyword::False) => Expr::Constant(Constant::Bool(false)),
            Token::Keyword(Keyword::None) => Expr::Constant(Constant::None),
            Token::Str { .. } => return self.strings(),
            Token::Symbol("(") => return self.parenthesized(),
            Token::Symbol("[") => return self.list(),
            Token::Symbol("{") => return self.dict(),

            _ => {
                self.next()?;
                return self.fail(SyntaxError::ExpectedExpr);
            }
        };

        self.next()?;
        Ok(Located::at(expr, location))
    }

    /// Literales de texto adyacentes se concatenan.
    fn strings(&mut self) -> Parse<Located<Expr>> {
        let start = self.peek_location();
        let mut text = String::new();
        let mut any_formatted = false;

        while let Some(Token::Str { value, formatted }) = self.peek() {
            text.push_str(value);
            any_formatted |= *formatted;
            self.next()?;
        }

        let expr = if any_formatted {
            Expr::FormattedString(text)
        } else {
            Expr::Constant(Constant::Str(text))
        };

        Ok(self.located(expr, start))
    }

    fn parenthesized(&mut self) -> Parse<Located<Expr>> {
        let start = self.symbol("(")?;
        if self.eat_symbol(")") {
            return Ok(self.located(Expr::Tuple(Vec::new()), start));
        }

        if matches!(self.peek(), Some(Token::Keyword(Keyword::Yield))) {
            let inner = self.yield_expr()?;
            self.symbol(")")?;
            return Ok(inner);
        }

        let first = self.starred(Parser::named_expr)?;
        let expr = if self.at_comprehension() {
            self.comprehension(ComprehensionKind::Generator, first, None)?
        } else if self.peek_symbol(",") {
            Expr::Tuple(self.items(first, ")")?)
        } else {
            self.symbol(")")?;
            return Ok(first);
        };

        self.symbol(")")?;
        Ok(self.located(expr, start))
    }

    fn list(&mut self) -> Parse<Located<Expr>> {
        let start = self.symbol("[")?;
        if self.eat_symbol("]") {
            return Ok(self.located(Expr::List(Vec::new()), start));
        }

        let first = self.starred(Parser::named_expr)?;
        let expr = if self.at_comprehension() {
            self.comprehension(ComprehensionKind::List, first, None)?
        } else {
            Expr::List(self.items(first, "]")?)
        };

        self.symbol("]")?;
        Ok(self.located(expr, start))
    }

    /// Diccionarios y conjuntos comparten las llaves.
    fn dict(&mut self) -> Parse<Located<Expr>> {
        let start = self.symbol("{")?;
        if self.eat_symbol("}") {
            return Ok(self.located(Expr::Dict(Vec::new()), start));
        }

        let expr = if self.peek_symbol("**") {
            Expr::Dict(self.entries(Vec::new())?)
        } else {
            let first = self.starred(Parser::named_expr)?;
            let is_set = matches!(first.val(), Expr::Starred(_)) || !self.eat_symbol(":");

            if is_set && self.at_comprehension() {
                self.comprehension(ComprehensionKind::Set, first, None)?
            } else if is_set {
                Expr::Set(self.items(first, "}")?)
            } else {
                let value = self.expr()?;
                if self.at_comprehension() {
                    self.comprehension(ComprehensionKind::Dict, first, Some(value))?
                } else if self.eat_symbol(",") {
                    Expr::Dict(self.entries(vec![(Some(first), value)])?)
                } else {
                    Expr::Dict(vec![(Some(first), value)])
                }
            }
        };

        self.symbol("}")?;
        Ok(self.located(expr, start))
    }

    /// Elementos restantes de una colección, a partir del primero.
    fn items(&mut self, first: Located<Expr>, close: &'static str) -> Parse<Vec<Located<Expr>>> {
        let mut items = vec![first];
        while self.eat_symbol(",") {
            if self.peek_symbol(close) {
                break;
            }

            items.push(self.starred(Parser::named_expr)?);
        }

        Ok(items)
    }

    fn entries(
        &mut self,
        mut entries: Vec<(Option<Located<Expr>>, Located<Expr>)>,
    ) -> Parse<Vec<(Option<Located<Expr>>, Located<Expr>)>> {
        let rest = self.comma_separated("}", |s| {
            if s.eat_symbol("**") {
                return Ok((None, s.binary(0)?));
            }

            let key = s.expr()?;
            s.symbol(":")?;
            Ok((Some(key), s.expr()?))
        })?;

        entries.extend(rest);
        Ok(entries)
    }

    fn at_comprehension(&mut self) -> bool {
        matches!(
            self.peek(),
            Some(Token::Keyword(Keyword::For | Keyword::Async))
        )
    }

    /// Cláusulas `for`/`if` que siguen al elemento de una comprensión.
    fn comprehension(
        &mut self,
        kind: ComprehensionKind,
        element: Located<Expr>,
        value: Option<Located<Expr>>,
    ) -> Parse<Expr> {
        let mut clauses = Vec::new();
        while self.at_comprehension() {
            self.eat_keyword(Keyword::Async);
            self.keyword(Keyword::For)?;

            let target = self.sequence(|s| s.starred(|s| s.binary(0)))?;
            self.check_target(&target)?;
            self.keyword(Keyword::In)?;

            // Sin condicional ternario, pues `if` inicia un filtro
            let iterable = self.disjunction()?;
            let mut conditions = Vec::new();
            while self.eat_keyword(Keyword::If) {
                conditions.push(self.disjunction()?);
            }

            clauses.push(Comprehension {
                target,
                iterable,
                conditions,
            });
        }

        Ok(Expr::Comprehension {
            kind,
            element: Box::new(element),
            value: value.map(Box::new),
            clauses,
        })
    }

    /// Elementos separados por comas hasta `close`, sin consumirlo.
    fn comma_separated<T, F>(&mut self, close: &'static str, mut rule: F) -> Parse<Vec<T>>
    where
        F: FnMut(&mut Self) -> Parse<T>,
    {
        let mut items = Vec::new();
        loop {
            if matches!(self.peek(), Some(Token::Symbol(symbol)) if *symbol == close) {
                break Ok(items);
            }

            items.push(rule(self)?);
            if !self.eat_symbol(",") {
                break Ok(items);
            }
        }
    }

    fn starts_expr(&mut self) -> bool {
        match self.peek() {
            Some(Token::Name(_))
            | Some(Token::Int(_))
            | Some(Token::LargeInt(_))
            | Some(Token::Float(_))
            | Some(Token::Imaginary(_))
            | Some(Token::Str { .. }) => true,

            Some(Token::Keyword(keyword)) => matches!(
                keyword,
                Keyword::True
                    | Keyword::False
                    | Keyword::None
                    | Keyword::Not
                    | Keyword::Lambda
                    | Keyword::Await
            ),

            Some(Token::Symbol(symbol)) => {
                matches!(*symbol, "(" | "[" | "{" | "-" | "+" | "~" | "*" | "...")
            }

            _ => false,
        }
    }

    fn id(&mut self) -> Parse<Located<Identifier>> {
        let (location, token) = self.next()?.split();
        match token {
            Token::Name(name) => Ok(Located::at(name, location)),
            found => self.fail(SyntaxError::UnexpectedToken(String::from("identifier"), found)),
        }
    }

    fn keyword(&mut self, keyword: Keyword) -> Parse<Location> {
        self.expect(Token::Keyword(keyword), &format!("`{}`", keyword))
    }

    fn symbol(&mut self, symbol: &'static str) -> Parse<Location> {
        self.expect(Token::Symbol(symbol), &format!("`{}`", symbol))
    }

    fn eat_symbol(&mut self, symbol: &'static str) -> bool {
        self.peek_symbol(symbol) && self.next().is_ok()
    }

    fn eat_keyword(&mut self, keyword: Keyword) -> bool {
        match self.peek() {
            Some(Token::Keyword(found)) if *found == keyword => self.next().is_ok(),
            _ => false,
        }
    }

    fn peek_symbol(&mut self, symbol: &str) -> bool {
        matches!(self.peek(), Some(Token::Symbol(found)) if *found == symbol)
    }

    fn expect(&mut self, token: Token, description: &str) -> Parse<Location> {
        match self.tokens.peek() {
            None => self.fail(SyntaxError::MissingToken(description.to_owned())),
            Some(found) if *found.val() == token => {
                let location = found.location().clone();
                self.next()?;
                Ok(location)
            }

            Some(found) => {
                let found = found.val().clone();
                self.next()?;
                self.fail(SyntaxError::UnexpectedToken(description.to_owned(), found))
            }
        }
    }

    fn peek(&mut self) -> Option<&Token> {
        self.tokens.peek().map(|token| token.val())
    }

    fn peek_location(&mut self) -> Location {
        match self.tokens.peek() {
            Some(token) => token.location().clone(),
            None => self.eof.clone(),
        }
    }

    fn next(&mut self) -> Parse<Located<Token>> {
        match self.tokens.next() {
            Some(token) => {
                self.last_known = token.location().clone();
                Ok(token.clone())
            }

            None => self.fail(SyntaxError::UnexpectedEof),
        }
    }

    /// Ubica un nodo desde `start` hasta el último token consumido.
    fn located<T>(&self, value: T, start: Location) -> Located<T> {
        let location = if self.last_known.start().line() >= start.start().line() {
            Location::span(start, &self.last_known)
        } else {
            start
        };

        Located::at(value, location)
    }

    fn error(&self, error: SyntaxError) -> Located<SyntaxError> {
        Located::at(error, self.last_known.clone())
    }

    fn fail<T>(&self, error: SyntaxError) -> Parse<T> {
        Err(self.error(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn ast(text: &str) -> Ast {
        let source = Source::new("<test>", text);
        parse(&source).unwrap()
    }

    fn failure(text: &str) -> SyntaxError {
        failure_at(text).into_inner()
    }

    fn failure_at(text: &str) -> Located<SyntaxError> {
        let source = Source::new("<test>", text);
        parse(&source).unwrap_err()
    }

    #[test]
    fn parses_the_prime_checker() {
        let ast = ast(indoc! {r#"
            # Function to check if a number is prime
            def is_prime(num):
                if num <= 1:
                    return False
                for i in range(2, int(num**0.5) + 1):
                    if num % i == 0:
                        return False
                return True

            number = int(input("Enter a number: "))

            if is_prime(number):
                print(f"{number} is a prime number.")
            else:
                print(f"{number} is not a prime number.")
        "#});

        assert_eq!(ast.body().len(), 3);
        let function = match ast.body()[0].val() {
            Statement::FunctionDef(function) => function,
            other => panic!("unexpected {:?}", other),
        };

        assert_eq!(function.name.val().as_str(), "is_prime");
        assert_eq!(function.parameters.len(), 1);
        assert_eq!(function.body.len(), 3);
        assert!(matches!(function.body[1].val(), Statement::For { orelse, .. } if orelse.is_empty()));
        assert!(matches!(function.body[2].val(), Statement::Return(Some(_))));

        assert_eq!(ast.body()[1].location().line(), 10);
        assert!(matches!(
            ast.body()[2].val(),
            Statement::If {
                alternative: Some(_),
                ..
            }
        ));
    }

    #[test]
    fn precedence_follows_python() {
        let ast = ast("x = a + b * c ** -d\n");
        let value = match ast.body()[0].val() {
            Statement::Assign(assign) => &assign.value,
            other => panic!("unexpected {:?}", other),
        };

        let (lhs, rhs) = match value.val() {
            Expr::Binary(lhs, BinOp::Add, rhs) => (lhs, rhs),
            other => panic!("unexpected {:?}", other),
        };

        assert!(matches!(lhs.val(), Expr::Name(_)));
        match rhs.val() {
            Expr::Binary(_, BinOp::Mult, power) => assert!(matches!(
                power.val(),
                Expr::Binary(_, BinOp::Pow, _)
            )),

            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn inline_suites_and_elif_chains() {
        let ast = ast(indoc! {"
            for i in range(2, 5): pass
            if a and not b: x = 1
            elif c: x = 2
            else: x = 3
        "});

        assert_eq!(ast.body().len(), 2);
        match ast.body()[1].val() {
            Statement::If {
                condition,
                alternative: Some(alternative),
                ..
            } => {
                assert!(matches!(condition.val(), Expr::Logical(LogicalOp::And, _)));
                assert!(matches!(alternative.val(), Alternative::Elif { .. }));
            }

            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn assignments() {
        let ast = ast("a = b = 1\nx += 2\nx, y = 1, 2\nf(k=1)\n");
        assert!(matches!(ast.body()[0].val(), Statement::Assign(Assign { targets, .. }) if targets.len() == 2));
        assert!(matches!(
            ast.body()[1].val(),
            Statement::AugAssign {
                operator: BinOp::Add,
                ..
            }
        ));
        assert!(matches!(ast.body()[2].val(), Statement::Assign(_)));
        assert!(matches!(ast.body()[3].val(), Statement::Expr(_)));
    }

    #[test]
    fn syntax_errors_are_located() {
        let error = failure_at("def f(:\n    pass\n");
        assert!(matches!(error.val(), SyntaxError::UnexpectedToken(..)));
        assert_eq!(error.location().line(), 1);

        let error = failure_at("if x:\npass\n");
        assert!(matches!(error.val(), SyntaxError::ExpectedIndent));
        assert_eq!(error.location().line(), 2);

        assert!(matches!(failure("1 = x\n"), SyntaxError::InvalidTarget));
        assert!(matches!(failure("x = 1\n  y = 2\n"), SyntaxError::UnexpectedIndent));
        assert!(matches!(failure("if a and not b:\n"), SyntaxError::ExpectedIndent));
        assert!(matches!(failure("x = [1 for]\n"), SyntaxError::ExpectedExpr));
        assert!(matches!(failure("y = (a + 1 := 2)\n"), SyntaxError::InvalidTarget));
        assert!(matches!(failure("else:\n    pass\n"), SyntaxError::ExpectedExpr));
        assert!(matches!(failure("async x = 1\n"), SyntaxError::UnexpectedToken(..)));
        assert!(matches!(failure("import\n"), SyntaxError::UnexpectedToken(..)));
    }

    #[test]
    fn other_statements_keep_their_blocks() {
        let ast = ast(indoc! {"
            import os.path as p, sys
            from . import (a, b,)
            @decorate(1)
            class A(Base, metaclass=M):
                def f(self, *args, key=None, **kwargs):
                    global counter
                    return args
            try:
                x = 1
            except (KeyError, ValueError) as error:
                raise RuntimeError('bad') from error
            else:
                pass
            finally:
                del x
            with open('f') as f, lock:
                assert f, 'empty'
            match command:
                case [x, *rest] if x > 0:
                    pass
                case {'k': v} | None:
                    pass
                case _:
                    pass
        "});

        let constructs: Vec<_> = ast
            .body()
            .iter()
            .map(|statement| match statement.val() {
                Statement::Other { construct, .. } => *construct,
                Statement::Decorator(_) => "@",
                other => panic!("unexpected {:?}", other),
            })
            .collect();

        assert_eq!(constructs, ["import", "from", "@", "class", "try", "with", "match"]);

        match ast.body()[3].val() {
            Statement::Other { body, .. } => match body[0].val() {
                Statement::FunctionDef(function) => {
                    let kinds: Vec<_> = function.parameters.iter().map(|p| p.kind).collect();
                    assert_eq!(
                        kinds,
                        [
                            ParameterKind::Regular,
                            ParameterKind::Variadic,
                            ParameterKind::Regular,
                            ParameterKind::KeywordVariadic
                        ]
                    );
                }

                other => panic!("unexpected {:?}", other),
            },

            other => panic!("unexpected {:?}", other),
        }

        match ast.body()[4].val() {
            Statement::Other { body, .. } => assert_eq!(body.len(), 4),
            other => panic!("unexpected {:?}", other),
        }

        match ast.body()[6].val() {
            Statement::Other { body, .. } => assert_eq!(body.len(), 3),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn expressions_beyond_arithmetic() {
        let ast = ast(indoc! {"
            squares = [i * i for i in range(10) if i % 2 if i > 2]
            pairs = {k: v for k, v in items}
            unique = {x for x in xs}
            total = sum(x for x in xs)
            merged = {**a, 'b': 1}
            flags = {1, 2, *rest}
            head, *tail = values
            part = xs[1:-1], xs[::2], xs[:]
            f = lambda a, b=2, *c, **d: a if b else c
            big = 99999999999999999999 + 2j
            stub = ...
            if (n := len(xs)) > 3: pass
            x: int = 5
            y: list
            while x:
                x -= 1
            else:
                pass
            for i in xs:
                break
            else:
                pass
        "});

        let values: Vec<_> = ast.body()[..11]
            .iter()
            .map(|statement| match statement.val() {
                Statement::Assign(assign) => assign.value.val(),
                other => panic!("unexpected {:?}", other),
            })
            .collect();

        assert!(matches!(
            values[0],
            Expr::Comprehension { kind: ComprehensionKind::List, clauses, .. }
                if clauses.len() == 1 && clauses[0].conditions.len() == 2
        ));
        assert!(matches!(
            values[1],
            Expr::Comprehension { kind: ComprehensionKind::Dict, value: Some(_), .. }
        ));
        assert!(matches!(
            values[2],
            Expr::Comprehension { kind: ComprehensionKind::Set, .. }
        ));
        assert!(matches!(
            values[3],
            Expr::Call { arguments, .. } if matches!(
                &arguments[0],
                Argument::Positional(generator) if matches!(generator.val(), Expr::Comprehension { .. })
            )
        ));
        assert!(matches!(values[4], Expr::Dict(entries) if entries[0].0.is_none()));
        assert!(matches!(values[5], Expr::Set(items) if items.len() == 3));
        assert!(matches!(values[7], Expr::Tuple(items) if items.len() == 3));
        assert!(matches!(values[8], Expr::Lambda { parameters, .. } if parameters.len() == 4));
        assert!(matches!(
            values[9],
            Expr::Binary(lhs, BinOp::Add, rhs)
                if matches!(lhs.val(), Expr::Constant(Constant::LargeInt(_)))
                && matches!(rhs.val(), Expr::Constant(Constant::Imaginary(_)))
        ));
        assert!(matches!(values[10], Expr::Constant(Constant::Ellipsis)));

        assert!(matches!(ast.body()[12].val(), Statement::AnnAssign { value: Some(_), .. }));
        assert!(matches!(ast.body()[13].val(), Statement::AnnAssign { value: None, .. }));
        assert!(matches!(ast.body()[14].val(), Statement::While { orelse, .. } if orelse.len() == 1));
        assert!(matches!(ast.body()[15].val(), Statement::For { orelse, .. } if orelse.len() == 1));
    }
}
