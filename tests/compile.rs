use indoc::indoc;
use py2c::{
    codegen::Type,
    optimize::{self, Passes, HOIST_MARKER},
    semantic::SemanticWarning,
    BlockClosing, CompileError, Compilation, Options, UntypedPrint,
};

const PRELUDE: &str = "#include <stdio.h>\n#include <math.h>\n";

fn compile(text: &str) -> Compilation {
    py2c::compile(text, &Options::default()).unwrap()
}

fn body(compilation: &Compilation) -> &str {
    compilation.code.strip_prefix(PRELUDE).unwrap()
}

fn balanced(code: &str) -> bool {
    let opened = code.matches('{').count();
    let closed = code.matches('}').count();
    opened == closed
}

#[test]
fn integer_is_declared_and_printed() {
    let compilation = compile("x = 5\nprint(x)");

    assert_eq!(body(&compilation), "int x = 5;\nprintf(\"%d\\n\", x);");
    assert_eq!(compilation.symbols.lookup("x"), Type::Int);
}

#[test]
fn range_loop_with_inline_pass() {
    let compilation = compile("for i in range(2, 5): pass");
    assert_eq!(
        body(&compilation),
        "for (int i = 2; i < 5; i++) {\n    // pass\n}"
    );
}

#[test]
fn logical_connectives_in_conditions() {
    let compilation = compile("if a and not b:\n    pass\n");
    assert_eq!(body(&compilation), "if (a && !b) {\n    // pass\n}");
}

#[test]
fn unreachable_code_is_only_reported() {
    let text = indoc! {"
        def f():
            return 1
            x = 2
    "};

    let compilation = compile(text);
    let warnings = &compilation.report.warnings;

    assert_eq!(warnings.len(), 1);
    assert_eq!(*warnings[0].val(), SemanticWarning::Unreachable(3));
    assert_eq!(
        body(&compilation),
        "int f() {\n    return 1;\n    int x = 2;\n}"
    );
}

#[test]
fn input_prompts_and_scans_an_integer() {
    let compilation = compile("n = int(input(\"Enter a number: \"))\n");

    assert_eq!(
        body(&compilation),
        "printf(\"Enter a number: \");\nscanf(\"%d\", &n);"
    );
    assert_eq!(compilation.symbols.lookup("n"), Type::Int);
}

#[test]
fn literal_assignments_are_typed_and_declared_once() {
    let compilation = compile("a = 1\nb = 2.5\nc = True\na = 3\nc = False\n");

    assert_eq!(
        body(&compilation),
        "int a = 1;\nfloat b = 2.5;\nbool c = 1;\na = 3;\nc = 0;"
    );

    let symbols: Vec<_> = compilation.symbols.iter().collect();
    assert_eq!(symbols.len(), 3);
    assert_eq!(compilation.symbols.lookup("a"), Type::Int);
    assert_eq!(compilation.symbols.lookup("b"), Type::Float);
    assert_eq!(compilation.symbols.lookup("c"), Type::Bool);
}

#[test]
fn sample_program_translates_with_balanced_braces() {
    let text = indoc! {r#"
        def factorial_iterative(n):
            if n < 0:
                return "Factorial is not defined for negative numbers."
            result = 1
            for i in range(1, n + 1):
                result = result*i
            return result

        # Example usage
        number = 5
        print(f"Factorial of {number} is {factorial_iterative(number)}")
    "#};

    let compilation = compile(text);
    let code = &compilation.code;

    assert!(balanced(code));
    assert!(code.contains("int factorial_iterative(int n) {"));
    assert!(code.contains("for (int i = 1; i < n + 1; i++) {"));
    assert!(code.contains("// Unsupported assignment: result = result*i"));
    assert!(code.contains(
        "printf(\"Factorial of %d is %d\\n\", number, factorial_iterative(number));"
    ));
    assert!(code.contains(HOIST_MARKER));
    assert!(compilation.report.warnings.is_empty());
}

#[test]
fn supported_programs_close_every_block() {
    let programs = [
        "def f(a):\n    while a > 0:\n        a -= 1\n    return a\n",
        "if x:\n    if y:\n        pass\nelse:\n    pass\n",
        "for i in range(3):\n    for j in range(i):\n        print(j)\n",
    ];

    for program in programs {
        for block_closing in [BlockClosing::TopLevelLine, BlockClosing::Indentation] {
            let options = Options {
                block_closing,
                ..Default::default()
            };

            let compilation = py2c::compile(program, &options).unwrap();
            assert!(balanced(&compilation.code), "{}", compilation.code);
        }
    }
}

#[test]
fn indentation_mode_pairs_else_with_its_if() {
    let options = Options {
        block_closing: BlockClosing::Indentation,
        ..Default::default()
    };

    let text = indoc! {"
        def sign(x):
            if x < 0:
                return -1
            else:
                return 1
        y = 3
    "};

    let compilation = py2c::compile(text, &options).unwrap();
    assert_eq!(
        compilation.code.strip_prefix(PRELUDE).unwrap(),
        indoc! {"
            int sign(int x) {
                if (x < 0) {
                    return -1;
                } else {
                    return 1;
                }
            }
            int y = 3;"}
    );
}

#[test]
fn strict_print_fails_without_output() {
    let options = Options {
        untyped_print: UntypedPrint::Reject,
        ..Default::default()
    };

    match py2c::compile("total = 1\nprint(total)\nprint(other)\n", &options) {
        Err(CompileError::Translate(error)) => assert_eq!(error.location().line(), 3),
        other => panic!("unexpected result: {:?}", other),
    }

    let lenient = compile("print(other)\n");
    assert_eq!(body(&lenient), "printf(\"%f\\n\", other);");
}

#[test]
fn syntax_errors_abort_compilation() {
    match py2c::compile("x = 1\ny = )\n", &Options::default()) {
        Err(CompileError::Syntax(error)) => assert_eq!(error.location().line(), 2),
        other => panic!("unexpected result: {:?}", other),
    }

    assert!(matches!(
        py2c::compile("if x:\npass\n", &Options::default()),
        Err(CompileError::Syntax(_))
    ));
}

#[test]
fn insecure_constructs_are_advisory() {
    let compilation = compile("value = eval(\"1 + 1\")\n");

    assert_eq!(compilation.report.warnings.len(), 1);
    assert_eq!(
        *compilation.report.warnings[0].val(),
        SemanticWarning::Insecure("eval")
    );
    assert_eq!(
        body(&compilation),
        "// Unsupported assignment: value = eval(\"1 + 1\")"
    );
}

#[test]
fn report_lists_every_phase() {
    let compilation = compile("a = 2\nb = a * 3\n");
    let report = compilation.report.to_string();

    let sections = [
        "Lexical Analysis:",
        "Syntax Analysis:",
        "Semantic Analysis:",
        "Three Address Code (TAC):",
        "Python to C Translation:",
        "Optimized C Code:",
    ];

    let mut from = 0;
    for section in sections {
        let found = report[from..].find(section).map(|offset| from + offset);
        assert!(found.is_some(), "missing section {}", section);
        from = found.unwrap_or(from);
    }

    assert!(report.contains("No syntax errors."));
    assert!(report.contains("a = 2\nt0 = a * 3\nb = t0\n"));
    assert_eq!(report.matches(&"-".repeat(50)).count(), 6);
}

#[test]
fn optimizer_output_is_stable() {
    let text = indoc! {"
        def scale(n):
            total = 0
            for i in range(n):
                total += i * 2

            return total
    "};

    let options = Options {
        passes: Passes::empty(),
        ..Default::default()
    };

    let generated = py2c::compile(text, &options).unwrap().code;
    let blocks = optimize::basic_blocks(&generated);
    let rejoined: Vec<_> = blocks.iter().flat_map(|block| block.lines().to_vec()).collect();
    assert_eq!(rejoined.join("\n"), generated);

    let once = optimize::optimize(&generated, Passes::all());
    assert_eq!(optimize::optimize(&once, Passes::all()), once);
    assert!(!once.contains("\n\n"));
}

#[test]
fn compilations_are_independent() {
    let first = compile("a = 1\nb = a + 2\n");
    let second = compile("a = 1\nb = a + 2\n");

    assert_eq!(first.report.tac.to_string(), second.report.tac.to_string());
    assert_eq!(first.code, second.code);
}

#[test]
fn unsupported_statement_becomes_a_comment() {
    let compilation = compile("import math\nx = 5\nprint(x)\n");
    assert_eq!(
        body(&compilation),
        "// Unsupported: import math\nint x = 5;\nprintf(\"%d\\n\", x);"
    );
}

#[test]
fn valid_python_outside_the_subset_compiles() {
    let programs = [
        "def f():\n    global x\n    x = 1\n",
        "y = [i for i in range(3)]\n",
        "g = lambda a: a\n",
        "x = 1\nassert x\n",
        "def f(*args, **kwargs):\n    pass\n",
        "y = x[1:2]\n",
        "x: int = 5\n",
        "x = 1\nwhile x:\n    x -= 1\nelse:\n    pass\n",
        "x = 99999999999999999999\n",
        "class A:\n    pass\n",
        "try:\n    pass\nexcept Exception as error:\n    raise\nfinally:\n    pass\n",
        "with open('f') as f:\n    pass\n",
        "from os import path\ndel path\n",
        "s = {1, 2}\nc = 1j\nz = ...\n",
        "@decorate\ndef f():\n    pass\n",
    ];

    for program in programs {
        let compilation = py2c::compile(program, &Options::default())
            .unwrap_or_else(|error| panic!("{:?} failed: {}", program, error));

        assert!(balanced(&compilation.code), "{}", compilation.code);
    }
}

#[test]
fn large_integers_reach_the_tac_as_written() {
    let compilation = compile("x = 99999999999999999999\n");
    assert_eq!(
        compilation.report.tac.to_string(),
        "x = 99999999999999999999\n"
    );
}
