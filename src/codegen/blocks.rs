//! Pila explícita de bloques abiertos.

use std::fmt::{self, Display};

/// Construcción que abrió un bloque.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BlockKind {
    Function,
    If,
    Elif,
    Else,
    While,
    For,
}

impl Display for BlockKind {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BlockKind::Function => "function",
            BlockKind::If => "if",
            BlockKind::Elif => "elif",
            BlockKind::Else => "else",
            BlockKind::While => "while",
            BlockKind::For => "for",
        };

        fmt.write_str(name)
    }
}

/// Un bloque abierto y la indentación de su encabezado.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct OpenBlock {
    pub kind: BlockKind,
    pub indent: usize,
    pub line: u32,
}

/// La profundidad de anidamiento es la altura de la pila. Nunca es
/// negativa y al final de toda traducción vuelve a cero.
#[derive(Clone, Debug, Default)]
pub struct BlockStack {
    open: Vec<OpenBlock>,
}

impl BlockStack {
    pub fn push(&mut self, block: OpenBlock) {
        self.open.push(block);
    }

    pub fn pop(&mut self) -> Option<OpenBlock> {
        self.open.pop()
    }

    pub fn top(&self) -> Option<&OpenBlock> {
        self.open.last()
    }

    pub fn depth(&self) -> usize {
        self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_tracks_pushes_and_pops() {
        let mut blocks = BlockStack::default();
        assert!(blocks.pop().is_none());

        for (line, kind) in [(1, BlockKind::Function), (2, BlockKind::For)] {
            blocks.push(OpenBlock {
                kind,
                indent: line as usize * 4 - 4,
                line,
            });
        }

        assert_eq!(blocks.depth(), 2);
        assert_eq!(blocks.top().map(|block| block.kind), Some(BlockKind::For));
        assert_eq!(blocks.pop().map(|block| block.line), Some(2));
        assert_eq!(blocks.depth(), 1);
    }
}
