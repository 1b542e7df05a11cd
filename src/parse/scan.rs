//! Escaneo sensible a indentación.
//!
//! A diferencia del lexer diagnóstico de [`crate::lex`], este escáner
//! reconoce la estructura léxica completa que requiere la gramática:
//! literales numéricos y de texto, operadores compuestos, y tokens
//! sintéticos `Newline`, `Indent` y `Dedent` derivados del sangrado
//! de cada línea lógica.

use std::{
    fmt::{self, Display},
    iter::Peekable,
    rc::Rc,
    str::FromStr,
};

use super::{Identifier, SyntaxError};
use crate::source::{Chars, Located, Location, Position, Source};

/// Ancho de tabulador para efectos de indentación.
const INDENT_TAB: u32 = 8;

/// Operadores y puntuación, ordenados de mayor a menor longitud.
const SYMBOLS: &[&str] = &[
    "**=", "//=", ">>=", "<<=", "...", "**", "//", "<<", ">>", "<=", ">=", "==", "!=", "->", "+=",
    "-=", "*=", "/=", "%=", "&=", "|=", "^=", "@=", ":=", "(", ")", "[", "]", "{", "}", ",", ":",
    ".", ";", "=", "+", "-", "*", "/", "%", "@", "&", "|", "^", "~", "<", ">",
];

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Identificador.
    Name(Identifier),

    /// Palabra clave.
    Keyword(Keyword),

    /// Literal entero.
    Int(i64),

    /// Literal entero fuera del rango de `i64`, conservado como texto.
    LargeInt(String),

    /// Literal de punto flotante.
    Float(f64),

    /// Literal imaginario (`2j`).
    Imaginary(f64),

    /// Literal de texto. Para f-strings se preserva el contenido crudo.
    Str { value: String, formatted: bool },

    /// Operador o signo de puntuación.
    Symbol(&'static str),

    /// Fin de línea lógica.
    Newline,

    /// Aumento de indentación.
    Indent,

    /// Disminución de indentación.
    Dedent,
}

impl Display for Token {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Token::*;

        match self {
            Name(name) => write!(fmt, "identifier `{}`", name),
            Keyword(keyword) => write!(fmt, "keyword `{}`", keyword),
            Int(integer) => write!(fmt, "literal `{}`", integer),
            LargeInt(digits) => write!(fmt, "literal `{}`", digits),
            Float(float) => write!(fmt, "literal `{:?}`", float),
            Imaginary(imaginary) => write!(fmt, "literal `{}j`", imaginary),
            Str { .. } => fmt.write_str("string literal"),
            Symbol(symbol) => write!(fmt, "`{}`", symbol),
            Newline => fmt.write_str("end of line"),
            Indent => fmt.write_str("indent"),
            Dedent => fmt.write_str("dedent"),
        }
    }
}

/// Una palabra clave.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Keyword {
    Def,
    If,
    Elif,
    Else,
    While,
    For,
    In,
    Is,
    Return,
    Pass,
    Break,
    Continue,
    And,
    Or,
    Not,
    True,
    False,
    None,

    // Reservadas; el traductor no las convierte a C
    Class,
    Import,
    From,
    Try,
    Except,
    Finally,
    With,
    As,
    Raise,
    Global,
    Nonlocal,
    Del,
    Assert,
    Yield,
    Lambda,
    Async,
    Await,
}

const KEYWORDS: &[(&str, Keyword)] = &[
    ("def", Keyword::Def),
    ("if", Keyword::If),
    ("elif", Keyword::Elif),
    ("else", Keyword::Else),
    ("while", Keyword::While),
    ("for", Keyword::For),
    ("in", Keyword::In),
    ("is", Keyword::Is),
    ("return", Keyword::Return),
    ("pass", Keyword::Pass),
    ("break", Keyword::Break),
    ("continue", Keyword::Continue),
    ("and", Keyword::And),
    ("or", Keyword::Or),
    ("not", Keyword::Not),
    ("True", Keyword::True),
    ("False", Keyword::False),
    ("None", Keyword::None),
    ("class", Keyword::Class),
    ("import", Keyword::Import),
    ("from", Keyword::From),
    ("try", Keyword::Try),
    ("except", Keyword::Except),
    ("finally", Keyword::Finally),
    ("with", Keyword::With),
    ("as", Keyword::As),
    ("raise", Keyword::Raise),
    ("global", Keyword::Global),
    ("nonlocal", Keyword::Nonlocal),
    ("del", Keyword::Del),
    ("assert", Keyword::Assert),
    ("yield", Keyword::Yield),
    ("lambda", Keyword::Lambda),
    ("async", Keyword::Async),
    ("await", Keyword::Await),
];

impl Keyword {
    pub fn name(self) -> &'static str {
        KEYWORDS
            .iter()
            .find(|&&(_, keyword)| keyword == self)
            .map_or("?", |&(name, _)| name)
    }
}

impl Display for Keyword {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(self.name())
    }
}

impl FromStr for Keyword {
    type Err = ();

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        KEYWORDS
            .iter()
            .find(|&&(name, _)| name == string)
            .map(|&(_, keyword)| keyword)
            .ok_or(())
    }
}

pub type Scan<T> = Result<T, Located<SyntaxError>>;

/// Escanea un origen completo.
pub fn tokenize(source: &Rc<Source>) -> Scan<Vec<Located<Token>>> {
    let mut scanner = Scanner {
        source,
        chars: Chars::new(source).peekable(),
        indents: vec![0],
        depth: 0,
        tokens: Vec::new(),
        end: Position::default(),
    };

    scanner.run()?;
    Ok(scanner.tokens)
}

struct Scanner<'a> {
    source: &'a Rc<Source>,
    chars: Peekable<Chars<'a>>,
    indents: Vec<u32>,
    depth: u32,
    tokens: Vec<Located<Token>>,
    end: Position,
}

impl Scanner<'_> {
    fn run(&mut self) -> Scan<()> {
        while self.logical_line()? {}

        let at = self.end;
        if matches!(self.tokens.last(), Some(token) if *token.val() != Token::Newline) {
            self.push(Token::Newline, at..at.advance());
        }

        while self.indents.len() > 1 {
            self.indents.pop();
            self.push(Token::Dedent, at..at.advance());
        }

        Ok(())
    }

    /// Procesa una línea lógica. Retorna falso al agotar la entrada.
    fn logical_line(&mut self) -> Scan<bool> {
        let mut width = 0;
        let start = match self.chars.peek() {
            None => return Ok(false),
            Some(&(_, position, _)) => position,
        };

        while let Some(&(c, _, _)) = self.chars.peek() {
            match c {
                ' ' => width += 1,
                '\t' => width = (width / INDENT_TAB + 1) * INDENT_TAB,
                '\x0c' => width = 0,
                _ => break,
            }

            self.bump();
        }

        match self.chars.peek() {
            // Líneas vacías o de solo comentario no afectan la indentación
            None => return Ok(false),
            Some(&('\n', _, _)) | Some(&('\r', _, _)) | Some(&('#', _, _)) => {
                self.skip_line();
                return Ok(true);
            }

            Some(_) => (),
        }

        let here = self.here();
        let current = self.indents.last().copied().unwrap_or(0);
        if width > current {
            self.indents.push(width);
            self.push(Token::Indent, start..here);
        } else {
            while width < self.indents.last().copied().unwrap_or(0) {
                self.indents.pop();
                self.push(Token::Dedent, here..here.advance());
            }

            if width != self.indents.last().copied().unwrap_or(0) {
                return self.fail(SyntaxError::BadDedent, here);
            }
        }

        self.line_tokens()?;
        Ok(true)
    }

    fn line_tokens(&mut self) -> Scan<()> {
        while let Some(&(c, position, _)) = self.chars.peek() {
            match c {
                '\n' if self.depth == 0 => {
                    self.bump();
                    self.push(Token::Newline, position..position.advance());
                    return Ok(());
                }

                // Unión implícita de líneas dentro de paréntesis
                '\n' | ' ' | '\t' | '\r' | '\x0c' => self.bump(),
                '#' => self.skip_comment(),

                '\\' => {
                    self.bump();
                    match self.chars.peek() {
                        Some(&('\n', _, _)) => self.bump(),
                        Some(&('\r', _, _)) => {
                            self.bump();
                            if let Some(&('\n', _, _)) = self.chars.peek() {
                                self.bump();
                            }
                        }

                        _ => return self.fail(SyntaxError::InvalidCharacter('\\'), position),
                    }
                }

                '"' | '\'' => self.string(String::new(), position)?,
                c if c.is_ascii_digit() => self.number(position)?,
                '.' if self.second_is_digit() => self.number(position)?,
                c if c.is_alphabetic() || c == '_' => self.word(position)?,
                _ => self.symbol(position)?,
            }
        }

        if self.depth > 0 {
            let at = self.end;
            return self.fail(SyntaxError::UnexpectedEof, at);
        }

        Ok(())
    }

    fn word(&mut self, start: Position) -> Scan<()> {
        let mut word = String::new();
        while let Some(&(c, _, _)) = self.chars.peek() {
            if !(c.is_alphanumeric() || c == '_') {
                break;
            }

            word.push(c);
            self.bump();
        }

        let is_prefix = matches!(
            word.to_ascii_lowercase().as_str(),
            "r" | "b" | "f" | "u" | "rb" | "br" | "fr" | "rf"
        );

        if is_prefix && matches!(self.chars.peek(), Some(&('"', _, _)) | Some(&('\'', _, _))) {
            return self.string(word, start);
        }

        let token = match Keyword::from_str(&word) {
            Ok(keyword) => Token::Keyword(keyword),
            Err(()) => Token::Name(Identifier::from(word.as_str())),
        };

        let end = self.here();
        self.push(token, start..end);
        Ok(())
    }

    fn number(&mut self, start: Position) -> Scan<()> {
        let mut digits = String::new();
        if self.peek_is('0') && self.second_is_radix() {
            self.bump();
            let (letter, radix) = match self.chars.next().map(|(c, _, _)| c.to_ascii_lowercase()) {
                Some('x') => ('x', 16),
                Some('o') => ('o', 8),
                _ => ('b', 2),
            };

            self.take_digits(&mut digits, |c| c.is_digit(radix));
            if digits.is_empty() {
                let at = self.here();
                return self.fail(SyntaxError::MalformedNumber, at);
            }

            let token = match i64::from_str_radix(&digits, radix) {
                Ok(value) => Token::Int(value),
                Err(_) => Token::LargeInt(format!("0{}{}", letter, digits)),
            };

            return self.finish_number(token, start);
        }

        self.take_digits(&mut digits, |c| c.is_ascii_digit());

        let mut is_float = false;
        if self.peek_is('.') {
            is_float = true;
            digits.push('.');
            self.bump();
            self.take_digits(&mut digits, |c| c.is_ascii_digit());
        }

        if self.peek_is('e') || self.peek_is('E') {
            is_float = true;
            digits.push('e');
            self.bump();

            if self.peek_is('+') || self.peek_is('-') {
                let (sign, _, _) = self.chars.next().unwrap_or(('+', start, 0));
                digits.push(sign);
            }

            self.take_digits(&mut digits, |c| c.is_ascii_digit());
        }

        let imaginary = self.peek_is('j') || self.peek_is('J');
        let token = if is_float || imaginary {
            let value = digits
                .parse::<f64>()
                .map_err(|_| self.located(SyntaxError::MalformedNumber, start))?;

            if imaginary {
                self.bump();
                Token::Imaginary(value)
            } else {
                Token::Float(value)
            }
        } else {
            // Python no limita el tamaño de los enteros
            match digits.parse::<i64>() {
                Ok(value) => Token::Int(value),
                Err(_) => Token::LargeInt(digits),
            }
        };

        self.finish_number(token, start)
    }

    fn finish_number(&mut self, token: Token, start: Position) -> Scan<()> {
        match self.chars.peek() {
            Some(&(c, position, _)) if c.is_alphanumeric() || c == '_' => {
                self.fail(SyntaxError::MalformedNumber, position)
            }

            _ => {
                let end = self.here();
                self.push(token, start..end);
                Ok(())
            }
        }
    }

    fn take_digits<F>(&mut self, digits: &mut String, accept: F)
    where
        F: Fn(char) -> bool,
    {
        while let Some(&(c, _, _)) = self.chars.peek() {
            if c == '_' {
                self.bump();
            } else if accept(c) {
                digits.push(c);
                self.bump();
            } else {
                break;
            }
        }
    }

    fn string(&mut self, prefix: String, start: Position) -> Scan<()> {
        let prefix = prefix.to_ascii_lowercase();
        let raw = prefix.contains('r');
        let formatted = prefix.contains('f');

        let quote = match self.chars.next() {
            Some((c, _, _)) => c,
            None => return self.fail(SyntaxError::UnterminatedString, start),
        };

        let triple = {
            let mut ahead = self.chars.clone();
            matches!(
                (ahead.next(), ahead.next()),
                (Some((a, _, _)), Some((b, _, _))) if a == quote && b == quote
            )
        };

        if triple {
            self.bump();
            self.bump();
        }

        let mut value = String::new();
        loop {
            let (c, _, _) = match self.chars.next() {
                Some(next) => next,
                None => return self.fail(SyntaxError::UnterminatedString, start),
            };

            match c {
                c if c == quote && !triple => break,
                c if c == quote && self.peek_is(quote) && self.second_is(quote) => {
                    self.bump();
                    self.bump();
                    break;
                }

                '\n' if !triple => return self.fail(SyntaxError::UnterminatedString, start),

                '\\' => match self.chars.next() {
                    None => return self.fail(SyntaxError::UnterminatedString, start),
                    Some(('\n', _, _)) => {
                        if raw || formatted {
                            value.push_str("\\\n");
                        }
                    }

                    Some((escaped, _, _)) if raw || formatted => {
                        value.push('\\');
                        value.push(escaped);
                    }

                    Some((escaped, _, _)) => match escaped {
                        'n' => value.push('\n'),
                        't' => value.push('\t'),
                        'r' => value.push('\r'),
                        '0' => value.push('\0'),
                        '\\' | '\'' | '"' => value.push(escaped),
                        other => {
                            value.push('\\');
                            value.push(other);
                        }
                    },
                },

                c => value.push(c),
            }
        }

        let end = self.here();
        self.push(Token::Str { value, formatted }, start..end);
        Ok(())
    }

    fn symbol(&mut self, start: Position) -> Scan<()> {
        let ahead: String = self.chars.clone().take(3).map(|(c, _, _)| c).collect();
        let symbol = match SYMBOLS.iter().find(|symbol| ahead.starts_with(*symbol)) {
            Some(symbol) => *symbol,
            None => {
                let c = ahead.chars().next().unwrap_or('\0');
                return self.fail(SyntaxError::InvalidCharacter(c), start);
            }
        };

        for _ in 0..symbol.chars().count() {
            self.bump();
        }

        match symbol {
            "(" | "[" | "{" => self.depth += 1,
            ")" | "]" | "}" => match self.depth.checked_sub(1) {
                Some(depth) => self.depth = depth,
                None => {
                    let c = symbol.chars().next().unwrap_or(')');
                    return self.fail(SyntaxError::UnmatchedBracket(c), start);
                }
            },

            _ => (),
        }

        let end = self.here();
        self.push(Token::Symbol(symbol), start..end);
        Ok(())
    }

    fn skip_comment(&mut self) {
        while let Some(&(c, _, _)) = self.chars.peek() {
            if c == '\n' {
                break;
            }

            self.bump();
        }
    }

    fn skip_line(&mut self) {
        self.skip_comment();
        self.bump();
    }

    fn bump(&mut self) {
        if let Some((c, position, _)) = self.chars.next() {
            self.end = match c {
                '\n' => position.newline(),
                _ => position.advance(),
            };
        }
    }

    fn here(&mut self) -> Position {
        match self.chars.peek() {
            Some(&(_, position, _)) => position,
            None => self.end,
        }
    }

    fn peek_is(&mut self, expected: char) -> bool {
        matches!(self.chars.peek(), Some(&(c, _, _)) if c == expected)
    }

    fn second_is(&self, expected: char) -> bool {
        matches!(self.chars.clone().nth(1), Some((c, _, _)) if c == expected)
    }

    fn second_is_digit(&self) -> bool {
        matches!(self.chars.clone().nth(1), Some((c, _, _)) if c.is_ascii_digit())
    }

    fn second_is_radix(&self) -> bool {
        matches!(
            self.chars.clone().nth(1),
            Some((c, _, _)) if matches!(c, 'x' | 'X' | 'o' | 'O' | 'b' | 'B')
        )
    }

    fn push(&mut self, token: Token, range: std::ops::Range<Position>) {
        let location = Location::new(Rc::clone(self.source), range);
        self.tokens.push(Located::at(token, location));
    }

    fn located(&self, error: SyntaxError, at: Position) -> Located<SyntaxError> {
        Located::at(error, Location::at(Rc::clone(self.source), at))
    }

    fn fail<T>(&self, error: SyntaxError, at: Position) -> Scan<T> {
        Err(self.located(error, at))
    }
}
