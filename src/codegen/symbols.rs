//! Tabla de símbolos del traductor.

use std::{
    collections::BTreeMap,
    fmt::{self, Display},
};

use once_cell::sync::Lazy;
use regex::Regex;

static INTEGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").unwrap());
static DECIMAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.\d+$").unwrap());

/// Tipo inferido de una variable.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    Int,
    Float,
    Bool,

    /// Sin registro en la tabla.
    Unknown,
}

impl Type {
    /// Infiere un tipo a partir de la forma literal de un valor.
    pub fn infer(literal: &str) -> Option<Type> {
        match literal {
            "True" | "False" => Some(Type::Bool),
            _ if INTEGER.is_match(literal) => Some(Type::Int),
            _ if DECIMAL.is_match(literal) => Some(Type::Float),
            _ => None,
        }
    }

    /// Especificador de formato para `printf`.
    pub fn format(self) -> Option<&'static str> {
        match self {
            Type::Int | Type::Bool => Some("%d"),
            Type::Float => Some("%f"),
            Type::Unknown => None,
        }
    }
}

impl Display for Type {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => fmt.write_str("int"),
            Type::Float => fmt.write_str("float"),
            Type::Bool => fmt.write_str("bool"),
            Type::Unknown => fmt.write_str("unknown"),
        }
    }
}

/// Tipos registrados durante una traducción.
///
/// El alcance es la unidad de compilación completa. Las entradas se
/// crean en la primera asignación con tipo reconocible y nunca se
/// eliminan.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SymbolTable {
    symbols: BTreeMap<String, Type>,
}

impl SymbolTable {
    pub fn lookup(&self, name: &str) -> Type {
        self.symbols.get(name).copied().unwrap_or(Type::Unknown)
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    pub(super) fn declare(&mut self, name: &str, typ: Type) {
        self.symbols.insert(name.to_owned(), typ);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Type)> {
        self.symbols.iter().map(|(name, &typ)| (name.as_str(), typ))
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl Display for SymbolTable {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, typ) in self.iter() {
            writeln!(fmt, "{}: {}", name, typ)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_shapes() {
        assert_eq!(Type::infer("42"), Some(Type::Int));
        assert_eq!(Type::infer("3.14"), Some(Type::Float));
        assert_eq!(Type::infer("False"), Some(Type::Bool));
        assert_eq!(Type::infer("-1"), None);
        assert_eq!(Type::infer("1e3"), None);
        assert_eq!(Type::infer("n + 1"), None);
    }

    #[test]
    fn missing_names_are_unknown() {
        let mut symbols = SymbolTable::default();
        symbols.declare("x", Type::Int);

        assert_eq!(symbols.lookup("x"), Type::Int);
        assert_eq!(symbols.lookup("y"), Type::Unknown);
        assert!(!symbols.is_declared("y"));
        assert_eq!(Type::Unknown.format(), None);
        assert_eq!(symbols.to_string(), "x: int\n");
    }
}
