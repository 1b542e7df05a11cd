//! Traducción de Python a C.
//!
//! # Modelo
//! El traductor no consume el árbol sintáctico: recorre el texto fuente
//! línea por línea y aplica a cada línea física la primera regla de
//! [`rules`] que la reconozca. El estado persistente se limita a una
//! [`SymbolTable`] con los tipos inferidos y a una pila explícita de
//! bloques abiertos, cuya altura determina la indentación de cada
//! línea emitida.
//!
//! # Tolerancia
//! Una línea que ninguna regla reconoce se emite como comentario y la
//! traducción continúa. El único error posible es
//! [`TranslateError::UntypedPrint`], el cual solo ocurre si así lo
//! solicitan las opciones.

use std::rc::Rc;

use thiserror::Error;
use tracing::{debug, info};

use crate::{
    source::{Located, Location, Position, Source},
    Options,
};

mod blocks;
mod rules;
mod symbols;

pub use blocks::{BlockKind, OpenBlock};
pub use symbols::{SymbolTable, Type};

use blocks::BlockStack;

/// Directivas fijas al inicio de todo programa generado.
pub const HEADER: &[&str] = &["#include <stdio.h>", "#include <math.h>", ""];

/// Unidad de indentación por nivel de anidamiento.
const INDENT: &str = "    ";

/// Ancho de tabulador al medir la indentación de una línea.
const TAB_WIDTH: usize = 8;

/// Criterio para cerrar bloques abiertos.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BlockClosing {
    /// Una línea sin indentación que ninguna otra regla reconoce cierra
    /// exactamente un bloque.
    TopLevelLine,

    /// Antes de traducir cada línea se cierran los bloques cuyo
    /// encabezado tenga una indentación mayor o igual a la de la línea.
    Indentation,
}

impl Default for BlockClosing {
    fn default() -> Self {
        BlockClosing::TopLevelLine
    }
}

/// Formato de `print` para nombres sin tipo registrado.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UntypedPrint {
    /// Se asume punto flotante (`%f`).
    Float,

    /// Se rechaza la compilación.
    Reject,
}

impl Default for UntypedPrint {
    fn default() -> Self {
        UntypedPrint::Float
    }
}

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslateError {
    #[error("Cannot choose a print format for `{0}`, its type is unknown")]
    UntypedPrint(String),
}

pub type Translate<T> = Result<T, Located<TranslateError>>;

/// Resultado de una traducción.
#[derive(Debug)]
pub struct Translation {
    code: String,
    symbols: SymbolTable,
}

impl Translation {
    /// Código C generado, sin optimizar.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Tabla de símbolos final.
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn into_parts(self) -> (String, SymbolTable) {
        (self.code, self.symbols)
    }
}

/// Traduce un origen completo.
///
/// Todo el estado se construye con cada invocación, por lo que
/// traducciones sucesivas o concurrentes son independientes.
pub fn translate(source: &Rc<Source>, options: &Options) -> Translate<Translation> {
    let mut context = Context {
        source,
        options,
        symbols: SymbolTable::default(),
        blocks: BlockStack::default(),
        lines: HEADER.iter().map(|line| line.to_string()).collect(),
    };

    for (index, physical) in source.lines().enumerate() {
        let line = Line::new(index as u32 + 1, physical);
        if !line.is_blank() && options.block_closing == BlockClosing::Indentation {
            context.close_enclosing(&line);
        }

        context.statements(&line)?;
    }

    while context.close() {}

    let Context { lines, symbols, .. } = context;
    info!(
        lines = lines.len(),
        symbols = symbols.len(),
        "translated to C"
    );

    Ok(Translation {
        code: lines.join("\n"),
        symbols,
    })
}

/// Estado mutable de una traducción.
struct Context<'a> {
    source: &'a Rc<Source>,
    options: &'a Options,
    symbols: SymbolTable,
    blocks: BlockStack,
    lines: Vec<String>,
}

impl Context<'_> {
    /// Aplica la primera regla que reconozca la línea.
    fn dispatch(&mut self, line: &Line<'_>) -> Translate<()> {
        for &(name, rule) in rules::RULES {
            if let Some(result) = rule(self, line) {
                debug!(rule = name, line = line.number, "matched translation rule");
                return result;
            }
        }

        Ok(())
    }

    fn emit(&mut self, line: String) {
        let indent = INDENT.repeat(self.blocks.depth());
        self.lines.push(indent + &line);
    }

    fn open(&mut self, kind: BlockKind, line: &Line<'_>) {
        self.blocks.push(OpenBlock {
            kind,
            indent: line.indent,
            line: line.number,
        });
    }

    /// Cierra el bloque más interno, si existe.
    fn close(&mut self) -> bool {
        match self.blocks.pop() {
            Some(block) => {
                emit!(self, "}}");
                debug!(block = %block.kind, opened_at = block.line, "closed block");
                true
            }

            None => false,
        }
    }

    fn close_enclosing(&mut self, line: &Line<'_>) {
        let continues = rules::continues_chain(line);
        while let Some(top) = self.blocks.top() {
            if top.indent < line.indent || (continues && top.indent == line.indent) {
                break;
            }

            self.close();
        }
    }

    /// Determina si `elif` o `else` tienen un bloque previo que continuar.
    fn can_continue(&self, line: &Line<'_>) -> bool {
        match (self.blocks.top(), self.options.block_closing) {
            (None, _) => false,
            (Some(_), BlockClosing::TopLevelLine) => true,
            (Some(block), BlockClosing::Indentation) => block.indent == line.indent,
        }
    }

    /// Traduce por separado cada sentencia de una línea `a = 1; b = 2`.
    /// Los encabezados conservan la línea completa para [`Context::suite`].
    fn statements(&mut self, line: &Line<'_>) -> Translate<()> {
        let parts = rules::split_top_level(line.raw, ';');
        if parts.len() == 1 || rules::opens_block(line) {
            return self.dispatch(line);
        }

        for part in parts.into_iter().filter(|part| !part.is_empty()) {
            self.dispatch(&line.part(part))?;
        }

        Ok(())
    }

    /// Traduce el cuerpo en línea de un encabezado, como en `if x: y = 1`.
    fn suite(&mut self, header: &Line<'_>, body: &str) -> Translate<()> {
        for statement in rules::split_top_level(body, ';') {
            if !statement.is_empty() {
                self.dispatch(&header.suite(statement))?;
            }
        }

        Ok(())
    }

    fn location(&self, line: &Line<'_>) -> Location {
        let end = line.raw.chars().fold(line.start, |position, _| position.advance());
        Location::new(Rc::clone(self.source), line.start..end)
    }

    fn fail<T>(&self, line: &Line<'_>, error: TranslateError) -> Translate<T> {
        Err(Located::at(error, self.location(line)))
    }
}

/// Una línea física preparada para las reglas de traducción.
struct Line<'a> {
    number: u32,

    /// Ancho de la indentación.
    indent: usize,

    /// Posición del primer carácter significativo.
    start: Position,

    /// Texto original sin indentación ni comentario final.
    raw: &'a str,

    /// Como `raw`, con exponenciación reescrita a `pow()`.
    text: String,
}

impl<'a> Line<'a> {
    fn new(number: u32, physical: &'a str) -> Self {
        let leading = physical.len() - physical.trim_start().len();
        let (indent, start) = physical[..leading].chars().fold(
            (0, Position::new(number, 1)),
            |(width, position), c| match c {
                '\t' => ((width / TAB_WIDTH + 1) * TAB_WIDTH, position.tab()),
                _ => (width + 1, position.advance()),
            },
        );

        let raw = rules::strip_comment(physical).trim();
        Line {
            number,
            indent,
            start,
            raw,
            text: rules::rewrite_powers(raw),
        }
    }

    /// Sentencia en línea de un encabezado, tratada como indentada.
    fn suite<'b>(&'b self, statement: &'b str) -> Line<'b> {
        Line {
            number: self.number,
            indent: self.indent + 1,
            start: self.start,
            raw: statement,
            text: statement.to_owned(),
        }
    }

    /// Una de varias sentencias de la misma línea física.
    fn part<'b>(&'b self, statement: &'b str) -> Line<'b> {
        Line {
            number: self.number,
            indent: self.indent,
            start: self.start,
            raw: statement,
            text: rules::rewrite_powers(statement),
        }
    }

    fn is_blank(&self) -> bool {
        self.text.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn c(text: &str) -> String {
        c_with(text, &Options::default())
    }

    fn c_with(text: &str, options: &Options) -> String {
        let source = Source::new("<test>", text);
        let translation = translate(&source, options).unwrap();

        let body = translation.code().strip_prefix("#include <stdio.h>\n#include <math.h>\n\n");
        body.unwrap().to_owned()
    }

    #[test]
    fn integer_declaration_and_print() {
        assert_eq!(c("x = 5\nprint(x)"), "int x = 5;\nprintf(\"%d\\n\", x);");
    }

    #[test]
    fn range_loop_with_inline_suite() {
        assert_eq!(
            c("for i in range(2, 5): pass"),
            "for (int i = 2; i < 5; i++) {\n    // pass\n}"
        );
    }

    #[test]
    fn range_arities() {
        assert_eq!(
            c("for i in range(n):\n    pass\n"),
            "for (int i = 0; i < n; i++) {\n    // pass\n}"
        );
        assert_eq!(
            c("for k in range(10, 0, -2):\n    pass\n"),
            "for (int k = 10; k < 0; k += -2) {\n    // pass\n}"
        );
        assert_eq!(
            c("for i in range(2, int(num**0.5) + 1):\n    pass\n"),
            "for (int i = 2; i < int(pow(num, 0.5)) + 1; i++) {\n    // pass\n}"
        );
    }

    #[test]
    fn connectives_are_rewritten_in_if_but_not_while() {
        assert_eq!(c("if a and not b:\n    pass\n").lines().next(), Some("if (a && !b) {"));
        assert_eq!(
            c("if order or \"and\" == s:\n    pass\n").lines().next(),
            Some("if (order || \"and\" == s) {")
        );
        assert_eq!(
            c("while a and b:\n    pass\n").lines().next(),
            Some("while (a and b) {")
        );
    }

    #[test]
    fn if_elif_else_chain() {
        let code = c(indoc! {"
            x = 1
            if x > 0:
                print(\"positive\")
            elif x < 0:
                print(\"negative\")
            else:
                print(\"zero\")
        "});

        assert_eq!(
            code,
            indoc! {r#"
                int x = 1;
                if (x > 0) {
                    printf("positive\n");
                } else if (x < 0) {
                    printf("negative\n");
                } else {
                    printf("zero\n");
                }"#}
        );
    }

    #[test]
    fn input_records_an_integer() {
        let source = Source::new("<test>", "n = int(input(\"Enter a number: \"))\nprint(n)\n");
        let translation = translate(&source, &Options::default()).unwrap();

        assert!(translation
            .code()
            .ends_with("printf(\"Enter a number: \");\nscanf(\"%d\", &n);\nprintf(\"%d\\n\", n);"));
        assert_eq!(translation.symbols().lookup("n"), Type::Int);
    }

    #[test]
    fn function_signature_and_returns() {
        let code = c(indoc! {"
            def check(a, b: int = 2):
                if a:
                    return True
                return
        "});

        assert_eq!(
            code,
            indoc! {"
                int check(int a, int b) {
                    if (a) {
                        return 1;
                        return;
                    }
                }"}
        );
    }

    #[test]
    fn assignments_declare_once() {
        let code = c("x = 1\nx = 2\ny = 2.5\nz = True\nz = False\nw = x + 1\nx += 3\nq -= 1\n");

        assert_eq!(
            code,
            indoc! {"
                int x = 1;
                x = 2;
                float y = 2.5;
                bool z = 1;
                z = 0;
                // Unsupported assignment: w = x + 1
                x += 3;
                // Unsupported assignment: q -= 1"}
        );
    }

    #[test]
    fn formatted_print() {
        assert_eq!(
            c("n = 7\nprint(f\"{n} is {{odd}} at 100%\")"),
            "int n = 7;\nprintf(\"%d is {odd} at 100%%\\n\", n);"
        );
        assert_eq!(
            c("print(f'{a} and {f(b)}')"),
            "printf(\"%d and %d\\n\", a, f(b));"
        );
        assert_eq!(c("print(f\"plain\")"), "printf(\"plain\\n\");");
    }

    #[test]
    fn plain_print_variants() {
        assert_eq!(c("print()"), "printf(\"\\n\");");
        assert_eq!(c("print('it\\'s')"), "printf(\"it's\\n\");");
        assert_eq!(c("print(y)"), "printf(\"%f\\n\", y);");
        assert_eq!(
            c("b = True\nprint(\"b is\", b)"),
            "bool b = 1;\nprintf(\"b is %d\\n\", b);"
        );
    }

    #[test]
    fn strict_print_rejects_unknown_names() {
        let options = Options {
            untyped_print: UntypedPrint::Reject,
            ..Default::default()
        };

        let source = Source::new("<test>", "x = 1\nprint(x)\nprint(y)\n");
        let error = translate(&source, &options).unwrap_err();

        assert_eq!(*error.val(), TranslateError::UntypedPrint(String::from("y")));
        assert_eq!(error.location().line(), 3);
    }

    #[test]
    fn top_level_line_closes_one_block() {
        let code = c(indoc! {"
            def f():
                pass
            call()
            x = 1
        "});

        assert_eq!(code, "int f() {\n    // pass\n}\nint x = 1;");
    }

    #[test]
    fn indentation_mode_closes_by_level() {
        let options = Options {
            block_closing: BlockClosing::Indentation,
            ..Default::default()
        };

        let code = c_with(
            indoc! {"
                def f(n):
                    for i in range(n):
                        if i:
                            pass

                    return n
                x = 1
            "},
            &options,
        );

        assert_eq!(
            code,
            indoc! {"
                int f(int n) {
                    for (int i = 0; i < n; i++) {
                        if (i) {
                            // pass
                        }
                    }
                    return n;
                }
                int x = 1;"}
        );
    }

    #[test]
    fn stray_and_malformed_headers_are_comments() {
        assert_eq!(c("else:\n"), "// Unsupported: else:");
        assert_eq!(c("def broken:\n"), "// Unsupported: def broken:");
        assert_eq!(c("for i in range(1, 2, 3, 4):\n"), "// Unsupported: for i in range(1, 2, 3, 4):");
        assert_eq!(c("import os  # needed\n"), "// Unsupported: import os");
    }

    #[test]
    fn semicolons_separate_statements() {
        assert_eq!(
            c("x = 1; y = 2.5\nprint(x); print(y);\n"),
            "int x = 1;\nfloat y = 2.5;\nprintf(\"%d\\n\", x);\nprintf(\"%f\\n\", y);"
        );
        assert_eq!(
            c("if x: a = 1; b = 2\n"),
            "if (x) {\n    int a = 1;\n    int b = 2;\n}"
        );
    }

    #[test]
    fn print_keyword_arguments() {
        assert_eq!(c("print('a', end='')\n"), "printf(\"a\");");
        assert_eq!(c("print(1, 2, sep=', ')\n"), "printf(\"%d, %d\\n\", 1, 2);");
        assert_eq!(c("print(1, flush=True)\n"), "printf(\"%d\\n\", 1);");
        assert_eq!(
            c("n = 2\nprint('n =', f'{n}!')\n"),
            "int n = 2;\nprintf(\"n = %d!\\n\", n);"
        );
    }

    #[test]
    fn unicode_identifiers() {
        assert_eq!(
            c("é = 5\nprint(é)\né += 1\nañade = int(input())\n"),
            "int é = 5;\nprintf(\"%d\\n\", é);\né += 1;\nprintf(\"\");\nscanf(\"%d\", &añade);"
        );
        assert_eq!(
            c("def f(a, *args, b=1, **kw):\n    pass\n"),
            "int f(int a, int args, int b, int kw) {\n    // pass\n}"
        );
    }
}
