//! Análisis semántico.
//!
//! Las comprobaciones de esta fase son meramente consultivas: producen
//! advertencias ubicadas, pero nunca alteran la entrada de las fases
//! posteriores ni detienen la compilación.

use thiserror::Error;
use tracing::warn;

use std::rc::Rc;

use crate::{
    parse::{
        self,
        visit::{self, Visitor},
        FunctionDef, Statement,
    },
    source::{Located, Location, Source},
};

/// Construcciones de evaluación dinámica que se consideran inseguras.
const INSECURE_CONSTRUCTS: &[&str] = &["eval", "exec"];

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SemanticWarning {
    #[error("Unreachable code at line {0}")]
    Unreachable(u32),

    #[error("Use of `{0}` is insecure")]
    Insecure(&'static str),
}

impl parse::Ast {
    /// Recorre el árbol en busca de código inalcanzable y construcciones inseguras.
    pub fn analyze(&self) -> Vec<Located<SemanticWarning>> {
        let mut reachability = Reachability::default();
        visit::walk_ast(&mut reachability, self);

        let mut warnings = reachability.warnings;
        warnings.extend(insecure_constructs(self.source()));

        for warning in &warnings {
            warn!("{}", warning);
        }

        warnings
    }
}

#[derive(Default)]
struct Reachability {
    warnings: Vec<Located<SemanticWarning>>,
}

impl<'ast> Visitor<'ast> for Reachability {
    fn visit_function_def(&mut self, function: &'ast FunctionDef) {
        // Solo se consideran las sentencias hermanas del cuerpo de la función
        let mut returned = false;
        for statement in &function.body {
            if returned {
                let location = statement.location().clone();
                let warning = SemanticWarning::Unreachable(location.line());
                self.warnings.push(Located::at(warning, location));
            }

            if let Statement::Return(_) = statement.val() {
                returned = true;
            }
        }

        visit::walk_function_def(self, function);
    }
}

/// Busca `eval(` y `exec(` en el texto completo, una vez por construcción.
fn insecure_constructs(source: &Rc<Source>) -> impl Iterator<Item = Located<SemanticWarning>> + '_ {
    INSECURE_CONSTRUCTS.iter().filter_map(move |&construct| {
        let offset = source.text().find(&format!("{}(", construct))?;
        let start = source.position_of(offset);

        let end = construct.chars().fold(start, |position, _| position.advance());
        let location = Location::new(Rc::clone(source), start..end);

        Some(Located::at(SemanticWarning::Insecure(construct), location))
    })
}
