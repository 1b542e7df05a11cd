//! Código de tres direcciones.
//!
//! Únicamente las asignaciones planas se traducen: una operación
//! binaria entre dos nombres o constantes, o bien una constante sola.
//! El resultado es de carácter informativo y no alimenta al generador
//! de código.

use std::fmt::{self, Display};

use tracing::info;

use crate::parse::{
    self,
    visit::{self, Visitor},
    BinOp, Constant, Expr, Identifier, Statement,
};
use crate::source::Located;

/// Un temporal. Cada temporal se define exactamente una vez.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Temp(pub u32);

impl Display for Temp {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "t{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    Name(Identifier),
    Constant(Constant),
}

impl Display for Operand {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Name(name) => write!(fmt, "{}", name),
            Operand::Constant(constant) => write!(fmt, "{}", constant),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,

    /// Operador sin correspondencia, se muestra como `?`.
    Unresolved,
}

impl From<BinOp> for Operator {
    fn from(operator: BinOp) -> Self {
        match operator {
            BinOp::Add => Operator::Add,
            BinOp::Sub => Operator::Sub,
            BinOp::Mult => Operator::Mul,
            BinOp::Div => Operator::Div,
            _ => Operator::Unresolved,
        }
    }
}

impl Display for Operator {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Unresolved => "?",
        };

        fmt.write_str(symbol)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Instruction {
    Binary {
        output: Temp,
        operator: Operator,
        lhs: Operand,
        rhs: Operand,
    },

    Copy {
        target: Identifier,
        temp: Temp,
    },

    Assign {
        target: Identifier,
        value: Constant,
    },
}

impl Display for Instruction {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Binary {
                output,
                operator,
                lhs,
                rhs,
            } => write!(fmt, "{} = {} {} {}", output, lhs, operator, rhs),

            Instruction::Copy { target, temp } => write!(fmt, "{} = {}", target, temp),
            Instruction::Assign { target, value } => write!(fmt, "{} = {}", target, value),
        }
    }
}

/// Listado completo de instrucciones de una unidad de compilación.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Tac {
    instructions: Vec<Instruction>,
}

impl Tac {
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }
}

impl Display for Tac {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        for instruction in &self.instructions {
            writeln!(fmt, "{}", instruction)?;
        }

        Ok(())
    }
}

impl parse::Ast {
    /// Genera código de tres direcciones para cada asignación del programa.
    ///
    /// El contador de temporales inicia en cero con cada invocación.
    pub fn lower(&self) -> Tac {
        let mut lowering = Lowering::default();
        visit::walk_ast(&mut lowering, self);

        info!(
            instructions = lowering.tac.instructions.len(),
            "generated three address code"
        );

        lowering.tac
    }
}

#[derive(Default)]
struct Lowering {
    next_temp: u32,
    tac: Tac,
}

impl Lowering {
    fn temp(&mut self) -> Temp {
        let temp = Temp(self.next_temp);
        self.next_temp += 1;
        temp
    }
}

impl<'ast> Visitor<'ast> for Lowering {
    fn visit_statement(&mut self, statement: &'ast Located<Statement>) {
        let assign = match statement.val() {
            Statement::Assign(assign) => assign,
            _ => return visit::walk_statement(self, statement),
        };

        let target = match assign.targets.first().map(Located::val) {
            Some(Expr::Name(target)) => target.clone(),
            _ => return,
        };

        match assign.value.val() {
            Expr::Constant(value) => self.tac.instructions.push(Instruction::Assign {
                target,
                value: value.clone(),
            }),

            Expr::Binary(lhs, operator, rhs) => {
                let (lhs, rhs) = match (operand(lhs), operand(rhs)) {
                    (Some(lhs), Some(rhs)) => (lhs, rhs),
                    _ => return,
                };

                let output = self.temp();
                self.tac.instructions.push(Instruction::Binary {
                    output,
                    operator: Operator::from(*operator),
                    lhs,
                    rhs,
                });

                self.tac.instructions.push(Instruction::Copy {
                    target,
                    temp: output,
                });
            }

            _ => (),
        }
    }
}

fn operand(expr: &Located<Expr>) -> Option<Operand> {
    match expr.val() {
        Expr::Name(name) => Some(Operand::Name(name.clone())),
        Expr::Constant(constant) => Some(Operand::Constant(constant.clone())),
        _ => None,
    }
}
