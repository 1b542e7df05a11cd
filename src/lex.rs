//! Análisis léxico.
//!
//! # Tokenization
//! Esta es la primera fase del compilador. Descompone el texto fuente
//! en unidades léxicas denominadas tokens, separando en fronteras de
//! palabra: cada secuencia máxima de caracteres de palabra (letras,
//! dígitos y `_`) forma un token, y cada carácter restante que no sea
//! espacio en blanco forma un token por sí solo.
//!
//! # Alcance
//! Este lexer es de carácter diagnóstico. Ninguna entrada es inválida
//! y su salida no alimenta a fases posteriores: el análisis sintáctico
//! realiza su propio escaneo en [`crate::parse`] y el traductor trabaja
//! directamente sobre líneas físicas.

use crate::source::{Chars, Located, Location, Source};
use std::{
    fmt::{self, Display},
    iter::Peekable,
    rc::Rc,
};

/// Objeto resultante del análisis léxico.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    lexeme: String,
}

impl Token {
    /// Texto original del token.
    pub fn lexeme(&self) -> &str {
        &self.lexeme
    }
}

impl Display for Token {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(&self.lexeme)
    }
}

/// Flujo perezoso de tokens.
///
/// El flujo es finito y reiniciable: clonar un `Lexer` produce un
/// recorrido independiente a partir del mismo punto.
#[derive(Clone)]
pub struct Lexer<'a> {
    source: &'a Rc<Source>,
    chars: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    /// Crea un lexer posicionado al inicio del origen.
    pub fn new(source: &'a Rc<Source>) -> Self {
        Lexer {
            source,
            chars: Chars::new(source).peekable(),
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Located<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        let (first, start) = loop {
            let (c, position, _) = self.chars.next()?;
            if !c.is_whitespace() {
                break (c, position);
            }
        };

        let mut lexeme = first.to_string();
        let mut end = start.advance();

        if is_word_char(first) {
            while let Some(&(c, position, _)) = self.chars.peek() {
                if !is_word_char(c) {
                    break;
                }

                lexeme.push(c);
                end = position.advance();
                self.chars.next();
            }
        }

        let location = Location::new(Rc::clone(self.source), start..end);
        Some(Located::at(Token { lexeme }, location))
    }
}

/// Determina si un carácter puede pertenecer a una palabra.
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Position;

    fn lexemes(text: &str) -> Vec<String> {
        let source = Source::new("<test>", text);
        Lexer::new(&source)
            .map(|token| token.val().lexeme().to_owned())
            .collect()
    }

    #[test]
    fn splits_on_word_boundaries() {
        assert_eq!(
            lexemes("if num <= 1:\n    return False"),
            ["if", "num", "<", "=", "1", ":", "return", "False"]
        );
    }

    #[test]
    fn punctuation_is_one_token_per_character() {
        assert_eq!(
            lexemes("x=num**0.5"),
            ["x", "=", "num", "*", "*", "0", ".", "5"]
        );
        assert_eq!(lexemes("print(f\"{n}\")").len(), 9);
    }

    #[test]
    fn tokens_carry_positions() {
        let source = Source::new("<test>", "a = 1\n  bee");
        let tokens: Vec<_> = Lexer::new(&source).collect();

        assert_eq!(tokens[3].val().lexeme(), "bee");
        assert_eq!(tokens[3].location().start(), Position::new(2, 3));
        assert_eq!(tokens[3].location().end(), Position::new(2, 6));
    }

    #[test]
    fn any_input_is_accepted_and_restartable() {
        let source = Source::new("<test>", "$ ¿? `weird` \t\n");
        let lexer = Lexer::new(&source);

        let first: Vec<_> = lexer.clone().map(|t| t.into_inner()).collect();
        let second: Vec<_> = lexer.map(|t| t.into_inner()).collect();

        assert_eq!(first.len(), 6);
        assert_eq!(first, second);
        assert!(lexemes("   \n\t").is_empty());
    }
}
