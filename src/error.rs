//! Reporte de diagnósticos.
//!
//! Todo error o advertencia con ubicación conocida puede reunirse en
//! un [`Diagnostics`], cuya representación textual muestra el mensaje,
//! la ubicación y la línea original con el rango señalado.

use crate::source::{Located, Location};
use std::{
    error::Error,
    fmt::{self, Display},
};

mod sealed {
    pub trait Sealed {}
}

pub trait LocatedError: sealed::Sealed {
    fn source(&self) -> &dyn Error;
    fn location(&self) -> &Location;
}

/// Gravedad de un conjunto de diagnósticos.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Severity {
    /// Impide la compilación.
    Error,

    /// Meramente informativo.
    Warning,
}

pub struct Diagnostics {
    kind: &'static str,
    severity: Severity,
    errors: Vec<Box<dyn 'static + LocatedError>>,
}

impl Diagnostics {
    pub fn kind(self, kind: &'static str) -> Self {
        Diagnostics { kind, ..self }
    }

    /// Reclasifica los diagnósticos como advertencias.
    pub fn warnings(self) -> Self {
        Diagnostics {
            kind: "warning",
            severity: Severity::Warning,
            ..self
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Diagnostics {
            kind: "error",
            severity: Severity::Error,
            errors: Default::default(),
        }
    }
}

impl<E: 'static + Error> From<Located<E>> for Diagnostics {
    fn from(error: Located<E>) -> Self {
        Diagnostics {
            errors: vec![Box::new(error)],
            ..Default::default()
        }
    }
}

impl<E: 'static + Error> From<Vec<Located<E>>> for Diagnostics {
    fn from(errors: Vec<Located<E>>) -> Self {
        let errors = errors
            .into_iter()
            .map(|error| {
                let error: Box<dyn LocatedError> = Box::new(error);
                error
            })
            .collect();

        Diagnostics {
            errors,
            ..Default::default()
        }
    }
}

impl Display for Diagnostics {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Diagnostics {
            kind,
            severity,
            errors,
        } = self;

        let noun = match severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };

        if errors.is_empty() {
            return writeln!(fmt, "No {}s were reported", noun);
        }

        for error in errors {
            writeln!(fmt, "{}: {}", kind, error.source())?;

            let location = error.location();
            writeln!(fmt, " --> {}", location)?;

            let digits = location.end().line().to_string().chars().count();
            writeln!(fmt, "{:digits$} |", "", digits = digits)?;

            for line_number in location.start().line()..=location.end().line() {
                location.source().with_line(line_number, |line| {
                    writeln!(fmt, "{:>digits$} | {}", line_number, line, digits = digits)
                })?
            }

            // Solo se subraya cuando el rango ocupa una única línea
            if location.start().line() == location.end().line() {
                let (from, to) = (location.start().column(), location.end().column().max(2) - 1);
                let min = from.min(to).max(1);
                let max = from.max(to);

                let skip = (min - 1) as usize;
                let highlight = (max - min + 1) as usize;

                writeln!(
                    fmt,
                    "{:digits$} | {:skip$}{:^<highlight$}",
                    "",
                    "",
                    "",
                    digits = digits,
                    skip = skip,
                    highlight = highlight
                )?;
            }

            writeln!(fmt)?;
        }

        let plural = if errors.len() == 1 { "" } else { "s" };
        match severity {
            Severity::Error => writeln!(
                fmt,
                "Build failed with {} {}{}",
                errors.len(),
                noun,
                plural
            ),

            Severity::Warning => writeln!(fmt, "{} {}{} emitted", errors.len(), noun, plural),
        }
    }
}

impl<E: Error> sealed::Sealed for Located<E> {}

impl<E: Error> LocatedError for Located<E> {
    fn source(&self) -> &dyn Error {
        self.as_ref()
    }

    fn location(&self) -> &Location {
        Located::location(self)
    }
}
