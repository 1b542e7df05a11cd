//! Compilador de un subconjunto de Python a C.
//!
//! # Fases diagnósticas
//! Cada programa deriva de un único texto fuente. Este texto se somete
//! primero a análisis léxico en [`lex`], de lo cual se obtiene un flujo
//! de tokens con fines meramente informativos. El análisis sintáctico
//! en [`parse`] valida la estructura del programa y construye un árbol;
//! un error en esta fase detiene la compilación. El árbol es recorrido
//! por el análisis semántico en [`semantic`], que advierte sobre código
//! inalcanzable y construcciones inseguras, y por el generador de
//! código de tres direcciones en [`ir`].
//!
//! # Fases de producción
//! El traductor en [`codegen`] opera directamente sobre las líneas del
//! texto fuente, independientemente de las fases anteriores, y produce
//! código C junto con una tabla de símbolos. Finalmente, [`optimize`]
//! aplica pasadas heurísticas sobre el código generado.
//!
//! Ambas salidas se exponen por separado en una [`Compilation`]: el
//! código final y un [`Report`] con el resultado de cada fase.

#[macro_use]
mod macros;

pub mod codegen;
pub mod error;
pub mod ir;
pub mod lex;
pub mod optimize;
pub mod parse;
pub mod semantic;
pub mod source;

use std::fmt::{self, Display};

use thiserror::Error;
use tracing::info;

use crate::{
    codegen::{SymbolTable, TranslateError},
    error::Diagnostics,
    ir::Tac,
    lex::{Lexer, Token},
    parse::SyntaxError,
    semantic::SemanticWarning,
    source::{Located, Source},
};

pub use codegen::{BlockClosing, UntypedPrint};
pub use optimize::Passes;

/// Ancho de los separadores entre secciones del reporte.
const SEPARATOR_WIDTH: usize = 50;

/// Opciones de compilación.
#[derive(Clone, Debug)]
pub struct Options {
    /// Nombre del origen en diagnósticos.
    pub name: String,
    pub block_closing: BlockClosing,
    pub untyped_print: UntypedPrint,
    pub passes: Passes,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            name: String::from("<memory>"),
            block_closing: BlockClosing::default(),
            untyped_print: UntypedPrint::default(),
            passes: Passes::default(),
        }
    }
}

#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Syntax error: {0}")]
    Syntax(Located<SyntaxError>),

    #[error("Translation error: {0}")]
    Translate(Located<TranslateError>),
}

impl CompileError {
    /// Diagnóstico con la línea original señalada.
    pub fn diagnostics(self) -> Diagnostics {
        Diagnostics::from(self)
    }
}

impl From<CompileError> for Diagnostics {
    fn from(error: CompileError) -> Self {
        match error {
            CompileError::Syntax(error) => Diagnostics::from(error).kind("syntax error"),
            CompileError::Translate(error) => Diagnostics::from(error),
        }
    }
}

/// Resultado de una compilación exitosa.
#[derive(Debug)]
pub struct Compilation {
    pub code: String,
    pub symbols: SymbolTable,
    pub report: Report,
}

/// Resultados de cada fase, en orden.
#[derive(Debug)]
pub struct Report {
    pub tokens: Vec<Located<Token>>,
    pub warnings: Vec<Located<SemanticWarning>>,
    pub tac: Tac,
    pub generated: String,
    pub optimized: String,
}

impl Display for Report {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let separator = "-".repeat(SEPARATOR_WIDTH);

        let tokens: Vec<_> = self
            .tokens
            .iter()
            .map(|token| format!("{:?}", token.val().lexeme()))
            .collect();

        writeln!(fmt, "Lexical Analysis:")?;
        writeln!(fmt, "Tokens: [{}]", tokens.join(", "))?;
        writeln!(fmt, "{}", separator)?;

        writeln!(fmt, "Syntax Analysis:")?;
        writeln!(fmt, "No syntax errors.")?;
        writeln!(fmt, "{}", separator)?;

        writeln!(fmt, "Semantic Analysis:")?;
        for warning in &self.warnings {
            writeln!(fmt, "Warning: {}", warning)?;
        }

        writeln!(fmt, "{}", separator)?;

        writeln!(fmt, "Three Address Code (TAC):")?;
        write!(fmt, "{}", self.tac)?;
        writeln!(fmt, "{}", separator)?;

        writeln!(fmt, "Python to C Translation:")?;
        writeln!(fmt, "{}", self.generated)?;
        writeln!(fmt, "{}", separator)?;

        writeln!(fmt, "Optimized C Code:")?;
        writeln!(fmt, "{}", self.optimized)?;
        writeln!(fmt, "{}", separator)
    }
}

/// Compila un programa completo.
///
/// Las fases diagnósticas se ejecutan primero; un error de sintaxis
/// aborta la compilación sin producir código.
pub fn compile(text: &str, options: &Options) -> Result<Compilation, CompileError> {
    let source = Source::new(options.name.clone(), text);

    let tokens: Vec<_> = Lexer::new(&source).collect();
    info!(tokens = tokens.len(), "lexical analysis finished");

    let ast = parse::parse(&source).map_err(CompileError::Syntax)?;
    info!(statements = ast.body().len(), "syntax analysis finished");

    let warnings = ast.analyze();
    info!(warnings = warnings.len(), "semantic analysis finished");

    let tac = ast.lower();

    let translation = codegen::translate(&source, options).map_err(CompileError::Translate)?;
    let (generated, symbols) = translation.into_parts();

    let optimized = optimize::optimize(&generated, options.passes);
    info!(passes = ?options.passes, "optimization finished");

    let report = Report {
        tokens,
        warnings,
        tac,
        generated,
        optimized: optimized.clone(),
    };

    Ok(Compilation {
        code: optimized,
        symbols,
        report,
    })
}
