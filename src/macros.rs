/// Emite una línea de C con la indentación del bloque actual.
macro_rules! emit {
    ($context:expr, $($format:tt)*) => {
        $context.emit(format!($($format)*))
    };
}
