//! Optimización del código C generado.
//!
//! Ambas pasadas son heurísticas sintácticas sobre el texto generado y
//! no un análisis de flujo de datos. En particular, el movimiento de
//! código invariante no verifica que las expresiones movidas sean
//! realmente invariantes dentro del ciclo.

use bitflags::bitflags;
use tracing::{debug, info};

/// Marcador que precede a las líneas movidas fuera de un ciclo.
pub const HOIST_MARKER: &str = "// Loop-invariant code motion:";

bitflags! {
    /// Pasadas de optimización a aplicar.
    pub struct Passes: u32 {
        /// Movimiento de código invariante (heurístico).
        const HOIST = 0x01;

        /// Eliminación de líneas vacías y sentencias sin contenido.
        const PRUNE = 0x02;
    }
}

impl Default for Passes {
    fn default() -> Self {
        Passes::all()
    }
}

/// Una secuencia de líneas sin ramificaciones internas.
///
/// Un bloque termina en una línea que cierra con `}` o que inicia con
/// `return`. Concatenar todos los bloques en orden reconstruye
/// exactamente la secuencia original.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BasicBlock<'a> {
    lines: Vec<&'a str>,
}

impl<'a> BasicBlock<'a> {
    pub fn lines(&self) -> &[&'a str] {
        &self.lines
    }

    /// Determina si el bloque contiene un encabezado de ciclo.
    pub fn has_loop(&self) -> bool {
        self.lines
            .iter()
            .any(|line| line.contains("for (") || line.contains("while ("))
    }
}

/// Particiona el código en bloques básicos.
pub fn basic_blocks(code: &str) -> Vec<BasicBlock<'_>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();

    for line in code.split('\n') {
        current.push(line);

        let trimmed = line.trim();
        if trimmed.ends_with('}') || trimmed.starts_with("return") {
            blocks.push(BasicBlock {
                lines: std::mem::take(&mut current),
            });
        }
    }

    if !current.is_empty() {
        blocks.push(BasicBlock { lines: current });
    }

    blocks
}

/// Aplica las pasadas indicadas, en orden fijo.
pub fn optimize(code: &str, passes: Passes) -> String {
    let mut code = code.to_owned();

    if passes.contains(Passes::HOIST) {
        code = hoist_invariants(&code);
    }

    if passes.contains(Passes::PRUNE) {
        code = prune(&code);
    }

    code
}

/// Mueve al inicio de cada bloque con ciclo las líneas candidatas.
///
/// Una línea es candidata si contiene una asignación junto a una
/// multiplicación, división o llamada a `pow`.
pub fn hoist_invariants(code: &str) -> String {
    let blocks = basic_blocks(code);
    let mut output = Vec::new();
    let mut hoisted = 0;

    for block in &blocks {
        if !block.has_loop() {
            output.extend(block.lines().iter().map(|line| line.to_string()));
            continue;
        }

        let lines = block
            .lines()
            .iter()
            .copied()
            .filter(|line| line.trim() != HOIST_MARKER);

        let (candidates, rest): (Vec<&str>, Vec<&str>) = lines.partition(|line| is_candidate(line));

        if let Some(first) = candidates.first() {
            let indent = &first[..first.len() - first.trim_start().len()];
            output.push(format!("{}{}", indent, HOIST_MARKER));
            hoisted += candidates.len();
        }

        output.extend(candidates.into_iter().chain(rest).map(String::from));
    }

    info!(blocks = blocks.len(), hoisted, "hoisted loop candidates");
    output.join("\n")
}

fn is_candidate(line: &str) -> bool {
    let arithmetic = ["*", "/", "pow("].iter().any(|op| line.contains(op));
    arithmetic && line.contains('=')
}

/// Elimina líneas vacías y líneas que solo contienen `;`.
pub fn prune(code: &str) -> String {
    let lines: Vec<_> = code
        .split('\n')
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.is_empty() && trimmed != ";"
        })
        .collect();

    debug!(kept = lines.len(), "pruned blank lines");
    lines.join("\n")
}
