//! Reglas de traducción por línea.
//!
//! Cada regla recibe la línea y el contexto mutable de la traducción.
//! Una regla que no reconoce la línea retorna `None` y se prueba la
//! siguiente; el orden de [`RULES`] es significativo, pues la primera
//! coincidencia gana.

use std::str::CharIndices;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::warn;

use super::{
    BlockClosing, BlockKind, Context, Line, Translate, TranslateError, Type, UntypedPrint,
};

pub(super) type Rule = fn(&mut Context<'_>, &Line<'_>) -> Option<Translate<()>>;

pub(super) const RULES: &[(&str, Rule)] = &[
    ("blank", blank),
    ("function", function),
    ("return", return_statement),
    ("if", if_statement),
    ("elif", elif),
    ("else", else_statement),
    ("while", while_statement),
    ("for", for_range),
    ("input", input),
    ("formatted print", formatted_print),
    ("print", print),
    ("assignment", assignment),
    ("pass", pass),
    ("block end", block_end),
    ("unsupported", unsupported),
];

static POWER: Lazy<Regex> = Lazy::new(|| Regex::new(r"([\w.]+)\s*\*\*\s*([\w.]+)").unwrap());

static FUNCTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^def\s+(\w+)\s*\((.*?)\)\s*(?:->[^:]*)?:\s*(.*)$").unwrap());

static FOR_RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^for\s+(\w+)\s+in\s+range\s*\(").unwrap());

static IN_RANGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bin\s+range\s*\(").unwrap());

static INPUT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([^\W\d]\w*)\s*=\s*int\s*\(\s*input\s*\((.*)\)\s*\)$").unwrap()
});

static FORMATTED_PRINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^print\s*\(\s*[fF](.*)\)$").unwrap());

static PRINT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^print\s*\((.*)\)$").unwrap());

static AUGMENTED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([^\W\d]\w*)\s*(\+|-|\*\*|\*|//|/|%|<<|>>|&|\||\^)=\s*(.*)$").unwrap()
});

// `\w` abarca identificadores Unicode, como los de Python
static TARGET: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\W\d]\w*$").unwrap());

static AND: Lazy<Regex> = Lazy::new(|| Regex::new(r"\band\b").unwrap());
static OR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bor\b").unwrap());
static NOT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bnot\b\s*").unwrap());

fn blank(_: &mut Context<'_>, line: &Line<'_>) -> Option<Translate<()>> {
    line.is_blank().then(|| Ok(()))
}

fn function(context: &mut Context<'_>, line: &Line<'_>) -> Option<Translate<()>> {
    keyword(&line.text, "def")?;

    let captures = match FUNCTION.captures(&line.text) {
        Some(captures) => captures,
        None => return unsupported(context, line),
    };

    let parameters: Vec<_> = captures[2]
        .split(',')
        .filter_map(|parameter| {
            // Se descartan anotaciones, valores por omisión, `*`, `**` y el separador `/`
            let name = parameter.split(|c: char| c == ':' || c == '=').next()?;
            let name = name.trim().trim_start_matches('*').trim();
            (!name.is_empty() && name != "/").then(|| format!("int {}", name))
        })
        .collect();

    emit!(context, "int {}({}) {{", &captures[1], parameters.join(", "));
    context.open(BlockKind::Function, line);

    Some(context.suite(line, &captures[3]))
}

fn return_statement(context: &mut Context<'_>, line: &Line<'_>) -> Option<Translate<()>> {
    match keyword(&line.text, "return")? {
        "" => emit!(context, "return;"),
        value => emit!(context, "return {};", c_value(value)),
    }

    Some(Ok(()))
}

fn if_statement(context: &mut Context<'_>, line: &Line<'_>) -> Option<Translate<()>> {
    let (condition, body) = split_header(keyword(&line.text, "if")?);

    emit!(context, "if ({}) {{", rewrite_connectives(condition));
    context.open(BlockKind::If, line);

    Some(context.suite(line, body))
}

fn elif(context: &mut Context<'_>, line: &Line<'_>) -> Option<Translate<()>> {
    let (condition, body) = split_header(keyword(&line.text, "elif")?);
    if !context.can_continue(line) {
        return unsupported(context, line);
    }

    // Un cierre y una apertura: la profundidad neta no cambia
    context.blocks.pop();
    emit!(context, "}} else if ({}) {{", rewrite_connectives(condition));
    context.open(BlockKind::Elif, line);

    Some(context.suite(line, body))
}

fn else_statement(context: &mut Context<'_>, line: &Line<'_>) -> Option<Translate<()>> {
    let (_, body) = split_header(keyword(&line.text, "else")?);
    if !context.can_continue(line) {
        return unsupported(context, line);
    }

    context.blocks.pop();
    emit!(context, "}} else {{");
    context.open(BlockKind::Else, line);

    Some(context.suite(line, body))
}

fn while_statement(context: &mut Context<'_>, line: &Line<'_>) -> Option<Translate<()>> {
    let (condition, body) = split_header(keyword(&line.text, "while")?);

    emit!(context, "while ({}) {{", condition);
    context.open(BlockKind::While, line);

    Some(context.suite(line, body))
}

fn for_range(context: &mut Context<'_>, line: &Line<'_>) -> Option<Translate<()>> {
    let rest = keyword(&line.text, "for")?;
    if !IN_RANGE.is_match(rest) {
        return None;
    }

    let (var, arguments, body) = match range_header(&line.text) {
        Some(header) => header,
        None => return unsupported(context, line),
    };

    match arguments.as_slice() {
        [bound] => emit!(context, "for (int {0} = 0; {0} < {1}; {0}++) {{", var, bound),

        [start, bound] => emit!(
            context,
            "for (int {0} = {1}; {0} < {2}; {0}++) {{",
            var,
            start,
            bound
        ),

        [start, bound, step] => emit!(
            context,
            "for (int {0} = {1}; {0} < {2}; {0} += {3}) {{",
            var,
            start,
            bound,
            step
        ),

        _ => return unsupported(context, line),
    }

    context.open(BlockKind::For, line);
    Some(context.suite(line, body))
}

/// Descompone `for <var> in range(<args>): <body>`.
fn range_header(text: &str) -> Option<(&str, Vec<&str>, &str)> {
    let captures = FOR_RANGE.captures(text)?;
    let var = captures.get(1)?.as_str();

    let open = captures.get(0)?.end();
    let close = open + matching_paren(&text[open..])?;

    let arguments = split_top_level(&text[open..close], ',');
    if arguments.len() > 3 || arguments.iter().any(|argument| argument.is_empty()) {
        return None;
    }

    let body = text[close + 1..].trim_start().strip_prefix(':')?.trim();
    Some((var, arguments, body))
}

fn input(context: &mut Context<'_>, line: &Line<'_>) -> Option<Translate<()>> {
    let captures = INPUT.captures(&line.text)?;
    let (var, prompt) = (&captures[1], captures[2].trim());

    match string_literal(prompt) {
        Some((body, quote)) => emit!(context, "printf(\"{}\");", c_format(body, quote)),
        None if prompt.is_empty() => emit!(context, "printf(\"\");"),
        None => emit!(context, "printf(\"%s\", {});", prompt),
    }

    emit!(context, "scanf(\"%d\", &{});", var);
    context.symbols.declare(var, Type::Int);

    Some(Ok(()))
}

fn formatted_print(context: &mut Context<'_>, line: &Line<'_>) -> Option<Translate<()>> {
    let captures = FORMATTED_PRINT.captures(&line.text)?;
    let (body, quote) = string_literal(captures[1].trim())?;

    let (format, arguments) = placeholders(body, quote);
    if arguments.is_empty() {
        emit!(context, "printf(\"{}\\n\");", format);
    } else {
        emit!(context, "printf(\"{}\\n\", {});", format, arguments.join(", "));
    }

    Some(Ok(()))
}

fn print(context: &mut Context<'_>, line: &Line<'_>) -> Option<Translate<()>> {
    let captures = PRINT.captures(&line.text)?;
    let inner = captures[1].trim();

    let mut format = Vec::new();
    let mut arguments = Vec::new();
    let mut separator = String::from(" ");
    let mut end = String::from("\\n");

    for argument in split_top_level(inner, ',').into_iter().filter(|a| !a.is_empty()) {
        if let Some((name, value)) = keyword_argument(argument) {
            match (name, string_literal(value)) {
                ("sep", Some((body, quote))) => separator = c_format(body, quote),
                ("end", Some((body, quote))) => end = c_format(body, quote),
                _ => warn!(line = line.number, "ignored print argument: {}", argument),
            }

            continue;
        }

        if let Some((body, quote)) = string_literal(argument) {
            format.push(c_format(body, quote));
            continue;
        }

        if let Some((body, quote)) = formatted_literal(argument) {
            let (text, values) = placeholders(body, quote);
            format.push(text);
            arguments.extend(values);
            continue;
        }

        match print_format(context, argument) {
            Some(specifier) => {
                format.push(specifier.to_owned());
                arguments.push(argument.to_owned());
            }

            None => {
                let error = TranslateError::UntypedPrint(argument.to_owned());
                return Some(context.fail(line, error));
            }
        }
    }

    let format = format.join(&separator) + &end;
    if arguments.is_empty() {
        emit!(context, "printf(\"{}\");", format);
    } else {
        emit!(context, "printf(\"{}\", {});", format, arguments.join(", "));
    }

    Some(Ok(()))
}

/// Argumento `nombre=valor` de una llamada.
fn keyword_argument(argument: &str) -> Option<(&str, &str)> {
    let split = assignment_operator(argument)?;
    let name = argument[..split].trim();
    TARGET
        .is_match(name)
        .then(|| (name, argument[split + 1..].trim()))
}

/// Una f-string completa, `f"..."` o `F"..."`.
fn formatted_literal(text: &str) -> Option<(&str, char)> {
    string_literal(text.strip_prefix(|c: char| c == 'f' || c == 'F')?)
}

/// Especificador para un argumento de `print` según su tipo.
fn print_format(context: &Context<'_>, argument: &str) -> Option<&'static str> {
    let typ = Type::infer(argument).unwrap_or_else(|| context.symbols.lookup(argument));
    match (typ.format(), context.options.untyped_print) {
        (Some(specifier), _) => Some(specifier),
        (None, UntypedPrint::Float) => Some("%f"),
        (None, UntypedPrint::Reject) => None,
    }
}

fn assignment(context: &mut Context<'_>, line: &Line<'_>) -> Option<Translate<()>> {
    if let Some(captures) = AUGMENTED.captures(&line.text) {
        return Some(augmented_assignment(context, line, &captures));
    }

    let split = assignment_operator(&line.text)?;
    let target = line.text[..split].trim();
    let value = line.text[split + 1..].trim();

    if !TARGET.is_match(target) || value.is_empty() {
        return Some(unsupported_assignment(context, line));
    }

    if context.symbols.is_declared(target) {
        emit!(context, "{} = {};", target, c_value(value));
        return Some(Ok(()));
    }

    match Type::infer(value) {
        Some(typ) => {
            emit!(context, "{} {} = {};", typ, target, c_value(value));
            context.symbols.declare(target, typ);
            Some(Ok(()))
        }

        None => Some(unsupported_assignment(context, line)),
    }
}

fn augmented_assignment(
    context: &mut Context<'_>,
    line: &Line<'_>,
    captures: &Captures<'_>,
) -> Translate<()> {
    let (target, operator, value) = (&captures[1], &captures[2], captures[3].trim());
    if !context.symbols.is_declared(target) || value.is_empty() {
        return unsupported_assignment(context, line);
    }

    match operator {
        "**" => emit!(context, "{0} = pow({0}, {1});", target, value),
        "//" => emit!(context, "{} /= {};", target, value),
        _ => emit!(context, "{} {}= {};", target, operator, c_value(value)),
    }

    Ok(())
}

fn unsupported_assignment(context: &mut Context<'_>, line: &Line<'_>) -> Translate<()> {
    warn!(line = line.number, "unsupported assignment: {}", line.raw);
    emit!(context, "// Unsupported assignment: {}", line.raw);
    Ok(())
}

fn pass(context: &mut Context<'_>, line: &Line<'_>) -> Option<Translate<()>> {
    if line.text != "pass" {
        return None;
    }

    emit!(context, "// pass");
    Some(Ok(()))
}

fn block_end(context: &mut Context<'_>, line: &Line<'_>) -> Option<Translate<()>> {
    let closes = context.options.block_closing == BlockClosing::TopLevelLine
        && line.indent == 0
        && !context.blocks.is_empty();

    if !closes {
        return None;
    }

    warn!(line = line.number, "line only closes a block: {}", line.text);
    context.close();
    Some(Ok(()))
}

fn unsupported(context: &mut Context<'_>, line: &Line<'_>) -> Option<Translate<()>> {
    warn!(line = line.number, "unsupported statement: {}", line.text);
    emit!(context, "// Unsupported: {}", line.text);
    Some(Ok(()))
}

/// Reescribe `a ** b` como `pow(a, b)`.
pub(super) fn rewrite_powers(line: &str) -> String {
    POWER.replace_all(line, "pow(${1}, ${2})").into_owned()
}

/// Descarta un comentario `#` final que no forme parte de un literal.
pub(super) fn strip_comment(line: &str) -> &str {
    match Scan::new(line).find(|&(_, c, _)| c == '#') {
        Some((index, _, _)) => &line[..index],
        None => line,
    }
}

/// Determina si la línea es un encabezado que abre un bloque, cuyo
/// cuerpo en línea puede contener varias sentencias.
pub(super) fn opens_block(line: &Line<'_>) -> bool {
    ["def", "if", "elif", "else", "while", "for"]
        .iter()
        .any(|header| keyword(&line.text, header).is_some())
}

/// Determina si la línea continúa una cadena condicional.
pub(super) fn continues_chain(line: &Line<'_>) -> bool {
    keyword(&line.text, "elif").is_some() || keyword(&line.text, "else").is_some()
}

/// Divide en `separator` fuera de literales y agrupaciones.
pub(super) fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;

    for (index, c, depth) in Scan::new(text) {
        if depth == 0 && c == separator {
            parts.push(text[start..index].trim());
            start = index + c.len_utf8();
        }
    }

    parts.push(text[start..].trim());
    parts
}

/// Resto de `text` si inicia con la palabra clave dada.
fn keyword<'t>(text: &'t str, keyword: &str) -> Option<&'t str> {
    let rest = text.strip_prefix(keyword)?;
    match rest.chars().next() {
        Some(c) if c.is_alphanumeric() || c == '_' => None,
        _ => Some(rest.trim_start()),
    }
}

/// Separa la condición de un encabezado de su cuerpo en línea.
fn split_header(rest: &str) -> (&str, &str) {
    match Scan::new(rest).find(|&(_, c, depth)| depth == 0 && c == ':') {
        Some((index, _, _)) => (rest[..index].trim(), rest[index + 1..].trim()),
        None => (rest.trim(), ""),
    }
}

/// Índice del `)` que cierra un paréntesis ya abierto antes de `text`.
fn matching_paren(text: &str) -> Option<usize> {
    Scan::new(text)
        .find(|&(_, c, depth)| depth == 0 && c == ')')
        .map(|(index, _, _)| index)
}

/// Posición del `=` de una asignación simple, si existe.
fn assignment_operator(text: &str) -> Option<usize> {
    Scan::new(text)
        .filter(|&(_, c, depth)| depth == 0 && c == '=')
        .map(|(index, _, _)| index)
        .find(|&index| {
            let before = text[..index].chars().next_back();
            let after = text[index + 1..].chars().next();

            !matches!(before, Some('=' | '<' | '>' | '!' | ':')) && after != Some('=')
        })
}

/// `and`, `or` y `not` como palabras completas, fuera de literales.
fn rewrite_connectives(condition: &str) -> String {
    outside_strings(condition, |code| {
        let code = AND.replace_all(code, "&&");
        let code = OR.replace_all(&code, "||");
        NOT.replace_all(&code, "!").into_owned()
    })
}

/// `True` y `False` se escriben como `1` y `0`.
fn c_value(value: &str) -> &str {
    match value {
        "True" => "1",
        "False" => "0",
        _ => value,
    }
}

/// Un literal de texto completo, sin prefijos, y su comilla.
fn string_literal(text: &str) -> Option<(&str, char)> {
    let quote = text.chars().next().filter(|&c| c == '"' || c == '\'')?;
    if text.len() < 2 || !text.ends_with(quote) {
        return None;
    }

    let body = &text[1..text.len() - 1];

    let mut escaped = false;
    for c in body.chars() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            c if c == quote => return None,
            _ => (),
        }
    }

    (!escaped).then(|| (body, quote))
}

/// Contenido de un literal como formato de `printf`.
fn c_format(body: &str, quote: char) -> String {
    let mut format = String::with_capacity(body.len());
    let mut chars = body.chars();

    while let Some(c) = chars.next() {
        push_format_char(&mut format, c, quote, &mut chars);
    }

    format
}

/// Reemplaza cada `{expr}` de una f-string por `%d`.
fn placeholders(body: &str, quote: char) -> (String, Vec<String>) {
    let mut format = String::with_capacity(body.len());
    let mut arguments = Vec::new();
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                format.push('{');
            }

            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                format.push('}');
            }

            '{' => {
                let mut expr = String::new();
                let mut depth = 0usize;
                let mut in_format_spec = false;

                while let Some(c) = chars.next() {
                    match c {
                        '}' if depth == 0 => break,
                        '(' | '[' | '{' => depth += 1,
                        ')' | ']' | '}' => depth = depth.saturating_sub(1),

                        // Conversión o especificación de formato: `{x!r}`, `{x:.2f}`
                        '!' | ':' if depth == 0 && chars.peek() != Some(&'=') => in_format_spec = true,
                        _ => (),
                    }

                    if !in_format_spec {
                        expr.push(c);
                    }
                }

                format.push_str("%d");
                arguments.push(expr.trim().to_owned());
            }

            _ => push_format_char(&mut format, c, quote, &mut chars),
        }
    }

    (format, arguments)
}

fn push_format_char<I>(format: &mut String, c: char, quote: char, rest: &mut I)
where
    I: Iterator<Item = char>,
{
    match c {
        '%' => format.push_str("%%"),
        '"' => format.push_str("\\\""),

        '\\' => match rest.next() {
            Some('\'') if quote == '\'' => format.push('\''),
            Some(escaped) => {
                format.push('\\');
                format.push(escaped);
            }

            None => format.push('\\'),
        },

        _ => format.push(c),
    }
}

/// Aplica `rewrite` únicamente a los segmentos fuera de literales.
fn outside_strings<F>(text: &str, mut rewrite: F) -> String
where
    F: FnMut(&str) -> String,
{
    let mut output = String::with_capacity(text.len());
    let mut start = 0;
    let mut quote = None;
    let mut escaped = false;

    for (index, c) in text.char_indices() {
        match quote {
            None if c == '"' || c == '\'' => {
                output.push_str(&rewrite(&text[start..index]));
                start = index;
                quote = Some(c);
            }

            None => (),
            Some(_) if escaped => escaped = false,
            Some(_) if c == '\\' => escaped = true,

            Some(open) if c == open => {
                output.push_str(&text[start..=index]);
                start = index + 1;
                quote = None;
            }

            Some(_) => (),
        }
    }

    match quote {
        None => output.push_str(&rewrite(&text[start..])),
        Some(_) => output.push_str(&text[start..]),
    }

    output
}

/// Recorre los caracteres fuera de literales de texto junto con la
/// profundidad de agrupación previa a cada uno.
struct Scan<'t> {
    chars: CharIndices<'t>,
    depth: usize,
    quote: Option<char>,
    escaped: bool,
}

impl<'t> Scan<'t> {
    fn new(text: &'t str) -> Self {
        Scan {
            chars: text.char_indices(),
            depth: 0,
            quote: None,
            escaped: false,
        }
    }
}

impl Iterator for Scan<'_> {
    type Item = (usize, char, usize);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (index, c) = self.chars.next()?;

            if let Some(quote) = self.quote {
                if self.escaped {
                    self.escaped = false;
                } else if c == '\\' {
                    self.escaped = true;
                } else if c == quote {
                    self.quote = None;
                }

                continue;
            }

            let depth = self.depth;
            match c {
                '"' | '\'' => {
                    self.quote = Some(c);
                    continue;
                }

                '(' | '[' | '{' => self.depth += 1,
                ')' | ']' | '}' => self.depth = self.depth.saturating_sub(1),
                _ => (),
            }

            return Some((index, c, depth));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn powers_accept_dotted_operands() {
        assert_eq!(rewrite_powers("y = x ** 2"), "y = pow(x, 2)");
        assert_eq!(rewrite_powers("r = num**0.5 + a.b**c"), "r = pow(num, 0.5) + pow(a.b, c)");
    }

    #[test]
    fn connectives_are_whole_words_outside_strings() {
        assert_eq!(rewrite_connectives("a and not b"), "a && !b");
        assert_eq!(rewrite_connectives("band or nothing"), "band || nothing");
        assert_eq!(rewrite_connectives("not(x) or s == 'a or b'"), "!(x) || s == 'a or b'");
    }

    #[test]
    fn top_level_splitting() {
        assert_eq!(split_top_level("2, f(a, b), [1, 2]", ','), ["2", "f(a, b)", "[1, 2]"]);
        assert_eq!(split_top_level("'a,b', c", ','), ["'a,b'", "c"]);
        assert_eq!(split_header("x[1:2]: y = 1"), ("x[1:2]", "y = 1"));
        assert_eq!(split_header("ready"), ("ready", ""));
    }

    #[test]
    fn comments_and_operators() {
        assert_eq!(strip_comment("x = '#' # real"), "x = '#' ");
        assert_eq!(assignment_operator("x == 1"), None);
        assert_eq!(assignment_operator("a <= b"), None);
        assert_eq!(assignment_operator("y = x == 1"), Some(2));
    }

    #[test]
    fn literals() {
        assert_eq!(string_literal("\"hi\""), Some(("hi", '"')));
        assert_eq!(string_literal("'a' + 'b'"), None);
        assert_eq!(string_literal("\"unterminated\\\""), None);
        assert_eq!(string_literal("name"), None);

        assert_eq!(c_format("say \"100%\"", '\''), "say \\\"100%%\\\"");
        assert_eq!(
            placeholders("{a!r:>3} {b[i]} {{}}", '"'),
            (String::from("%d %d {}"), vec![String::from("a"), String::from("b[i]")])
        );
    }

    #[test]
    fn keyword_arguments() {
        assert_eq!(keyword_argument("end=''"), Some(("end", "''")));
        assert_eq!(keyword_argument("sep = ', '"), Some(("sep", "', '")));
        assert_eq!(keyword_argument("x == 1"), None);
        assert_eq!(keyword_argument("'a=b'"), None);
        assert_eq!(formatted_literal("f'{x}'"), Some(("{x}", '\'')));
        assert_eq!(formatted_literal("'x'"), None);
    }

    #[test]
    fn keywords_are_whole_words() {
        assert_eq!(keyword("return x", "return"), Some("x"));
        assert_eq!(keyword("return", "return"), Some(""));
        assert_eq!(keyword("returned = 1", "return"), None);
        assert_eq!(keyword("if(x):", "if"), Some("(x):"));
    }
}
