//! Rastreo de ubicaciones originales en código fuente.
//!
//! Los distintos objetos internos que el compilador construye
//! deben llevar cuenta de posiciones o rangos de ubicaciones en
//! el código fuente original, lo cual permite determinar un punto
//! exacto o aproximado en donde ocurre un error o una advertencia.

use std::{
    error::Error,
    fmt::{self, Debug, Display, Formatter},
    ops::Range,
    rc::Rc,
    str,
};

/// Ancho de los divisores de tabulador.
const TAB_STOP: u32 = 4;

/// Un objeto cualquiera con una posición original asociada.
#[derive(Debug, Clone)]
pub struct Located<T> {
    location: Location,
    value: T,
}

impl<T> Located<T> {
    /// Obtiene el valor.
    pub fn val(&self) -> &T {
        &self.value
    }

    /// Obtiene la ubicación.
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Descarta la ubicación y toma ownership del valor.
    pub fn into_inner(self) -> T {
        self.value
    }

    /// Descompone y toma ownership de las dos partes.
    pub fn split(self) -> (Location, T) {
        (self.location, self.value)
    }

    /// Construye a partir de un valor y una ubicación.
    pub fn at(value: T, location: Location) -> Self {
        Located { value, location }
    }

    /// Transforma el valor con la misma ubicación.
    pub fn map<U, F>(self, map: F) -> Located<U>
    where
        F: FnOnce(T) -> U,
    {
        Located {
            value: map(self.value),
            location: self.location,
        }
    }
}

impl<T> AsRef<T> for Located<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

impl<T: Display> Display for Located<T> {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}: {}", self.location, self.value)
    }
}

impl<E: Error> Error for Located<E> {}

/// Una unidad de compilación: nombre de origen y texto completo.
pub struct Source {
    name: String,
    text: String,
}

impl Source {
    /// Construye un origen compartido a partir de su texto.
    pub fn new<S: Into<String>>(name: S, text: &str) -> Rc<Self> {
        Rc::new(Source {
            name: name.into(),
            text: text.to_owned(),
        })
    }

    /// Nombre del origen, usualmente una ruta.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Texto completo.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Itera por las líneas físicas del texto, sin terminadores.
    pub fn lines(&self) -> str::Lines<'_> {
        self.text.lines()
    }

    /// Invoca a `callback` con el contenido de una línea (base 1).
    ///
    /// Una línea inexistente se trata como vacía.
    pub fn with_line<F, R>(&self, line: u32, callback: F) -> R
    where
        F: FnOnce(&str) -> R,
    {
        let index = (line as usize).saturating_sub(1);
        callback(self.lines().nth(index).unwrap_or(""))
    }

    /// Traduce un desplazamiento en bytes a una posición línea-columna.
    pub fn position_of(&self, offset: usize) -> Position {
        Chars::new(self)
            .take_while(|&(_, _, at)| at < offset)
            .last()
            .map(|(c, position, _)| match c {
                '\n' => position.newline(),
                '\t' => position.tab(),
                _ => position.advance(),
            })
            .unwrap_or_default()
    }
}

/// Una ubicación está conformada por un origen y un rango de posiciones.
#[derive(Clone)]
pub struct Location {
    from: Rc<Source>,
    position: Range<Position>,
}

impl Location {
    /// Construye una ubicación dentro de un origen.
    pub fn new(from: Rc<Source>, position: Range<Position>) -> Self {
        Location { from, position }
    }

    /// Ubicación de un único carácter.
    pub fn at(from: Rc<Source>, position: Position) -> Self {
        Location {
            from,
            position: position..position.advance(),
        }
    }

    /// Unifica un rango de ubicaciones. Se asume el mismo origen.
    pub fn span(from: Location, to: &Location) -> Self {
        Location {
            from: from.from,
            position: from.position.start..to.position.end,
        }
    }

    /// Obtiene el origen.
    pub fn source(&self) -> &Rc<Source> {
        &self.from
    }

    /// Obtiene la posición de inicio.
    pub fn start(&self) -> Position {
        self.position.start
    }

    /// Obtiene la posición de fin.
    pub fn end(&self) -> Position {
        self.position.end
    }

    /// Número de la línea donde inicia la ubicación.
    pub fn line(&self) -> u32 {
        self.position.start.line
    }
}

impl Display for Location {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:", self.from.name)?;

        let Range { start, end } = self.position;
        if end == start.advance() || end.line != start.line {
            // Solo se señala una columna en específico
            write!(formatter, "{}", start)
        } else {
            write!(formatter, "[{}-{}]", start, end.back())
        }
    }
}

impl Debug for Location {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        <Self as Display>::fmt(self, formatter)
    }
}

/// Una posición línea-columna en un archivo.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Position {
    line: u32,
    column: u32,
}

impl Position {
    /// Construye una posición explícita (base 1).
    pub fn new(line: u32, column: u32) -> Self {
        Position { line, column }
    }

    /// Obtiene el número de línea.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Obtiene el número de columna.
    pub fn column(&self) -> u32 {
        self.column
    }

    /// Incrementa el número de columna.
    pub fn advance(self) -> Position {
        Position {
            line: self.line,
            column: self.column + 1,
        }
    }

    /// Decrementa el número de columna.
    pub fn back(self) -> Position {
        Position {
            line: self.line,
            column: self.column.saturating_sub(1).max(1),
        }
    }

    /// Incrementa el número de línea y retorna a la columna 1.
    pub fn newline(self) -> Position {
        Position {
            line: self.line + 1,
            column: 1,
        }
    }

    /// Ajusta la posición a la siguiente columna de tabulador.
    pub fn tab(self) -> Position {
        let column = 1 + ((self.column - 1) / TAB_STOP + 1) * TAB_STOP;
        Position {
            line: self.line,
            column,
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Position { line: 1, column: 1 }
    }
}

impl Display for Position {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.line, self.column)
    }
}

/// Recorre un origen carácter por carácter.
///
/// Cada elemento incluye la posición del carácter emitido y su
/// desplazamiento en bytes. El iterador es `Clone`, por lo que
/// cualquier punto del recorrido puede reanudarse.
#[derive(Clone)]
pub struct Chars<'a> {
    chars: str::CharIndices<'a>,
    next: Position,
}

impl<'a> Chars<'a> {
    /// Comienza un recorrido desde el inicio del origen.
    pub fn new(source: &'a Source) -> Self {
        Chars {
            chars: source.text.char_indices(),
            next: Position::default(),
        }
    }
}

impl Iterator for Chars<'_> {
    type Item = (char, Position, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let (offset, c) = self.chars.next()?;
        let here = self.next;

        self.next = match c {
            '\n' => here.newline(),
            '\t' => here.tab(),
            _ => here.advance(),
        };

        Some((c, here, offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_follow_lines_and_tabs() {
        let source = Source::new("<test>", "ab\n\tc");
        let positions: Vec<_> = Chars::new(&source).map(|(c, at, _)| (c, at)).collect();

        assert_eq!(positions[0], ('a', Position::new(1, 1)));
        assert_eq!(positions[2], ('\n', Position::new(1, 3)));
        assert_eq!(positions[3], ('\t', Position::new(2, 1)));
        assert_eq!(positions[4], ('c', Position::new(2, 5)));
    }

    #[test]
    fn offsets_map_back_to_positions() {
        let source = Source::new("<test>", "x = 1\ny = eval(x)\n");
        let offset = source.text().find("eval").unwrap();

        assert_eq!(source.position_of(offset), Position::new(2, 5));
        assert_eq!(source.position_of(0), Position::new(1, 1));
    }

    #[test]
    fn locations_display_single_columns_and_ranges() {
        let source = Source::new("main.py", "");
        let single = Location::at(Rc::clone(&source), Position::new(3, 7));
        let range = Location::new(source, Position::new(1, 1)..Position::new(1, 5));

        assert_eq!(single.to_string(), "main.py:3:7");
        assert_eq!(range.to_string(), "main.py:[1:1-1:4]");
    }
}
