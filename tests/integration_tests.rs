// End-to-end interpreter tests: source in, value or diagnostic out.

use quill::error::ErrorKind;
use quill::evaluator::Interpreter;
use quill::lexer::Lexer;
use quill::parser::Parser;
use quill::value::Value;
use quill::QuillError;

fn eval(source: &str) -> Result<Value, QuillError> {
    let mut lexer = Lexer::new(source.to_string());
    let tokens = lexer.scan_tokens()?;
    let mut parser = Parser::new(tokens);
    let program = parser.parse()?;
    let mut interpreter = Interpreter::new();
    interpreter.interpret(&program)
}

fn eval_ok(source: &str) -> Value {
    eval(source).expect("expected program to evaluate")
}

fn eval_kind(source: &str) -> ErrorKind {
    eval(source).expect_err("expected program to fail").kind
}

fn number(value: f64) -> Value {
    Value::Number(value)
}

fn string(value: &str) -> Value {
    Value::Str(value.to_string())
}

// ============================================================================
// Arithmetic and the value algebra
// ============================================================================

#[test]
fn arithmetic_precedence() {
    assert_eq!(eval_ok("1 + 2 * 3"), number(7.0));
    assert_eq!(eval_ok("(1 + 2) * 3"), number(9.0));
    assert_eq!(eval_ok("2 ** 3 ** 2"), number(512.0));
    assert_eq!(eval_ok("10 - 2 - 3"), number(5.0));
}

#[test]
fn string_repetition() {
    assert_eq!(eval_ok("con x = \"hi\"; x * 3"), string("hihihi"));
    assert_eq!(eval_ok("3 * \"ab\""), string("ababab"));
    assert_eq!(eval_ok("\"x\" * -2"), string("xx"));
    assert_eq!(eval_ok("\"x\" * 0"), string(""));
}

#[test]
fn string_concatenation_coerces_either_side() {
    assert_eq!(eval_ok("\"n = \" + 4"), string("n = 4"));
    assert_eq!(eval_ok("4 + \"!\""), string("4!"));
    assert_eq!(eval_ok("\"v: \" + true"), string("v: true"));
}

#[test]
fn arithmetic_keeps_the_left_operand_variant() {
    assert_eq!(eval_ok("'a' + 1"), Value::Char(b'b'));
    assert_eq!(eval_ok("'z' - 'a'"), Value::Char(25));
    assert_eq!(eval_ok("1 + 'a'"), number(98.0));
    assert_eq!(eval_ok("true + true"), Value::Bool(true));
}

#[test]
fn null_absorbs_arithmetic() {
    assert_eq!(eval_ok("null + 5"), Value::Null);
    assert_eq!(eval_ok("5 * null"), Value::Null);
    assert_eq!(eval_ok("null ** 2"), Value::Null);
    assert_eq!(eval_ok("null - 1"), Value::Null);
    assert_eq!(eval_ok("null / 2"), Value::Null);
    assert_eq!(eval_ok("null % 2"), Value::Null);
}

#[test]
fn null_absorbs_even_with_a_string_operand() {
    assert_eq!(eval_ok("null - \"x\""), Value::Null);
    assert_eq!(eval_ok("\"x\" - null"), Value::Null);
    assert_eq!(eval_ok("null / \"x\""), Value::Null);
    assert_eq!(eval_ok("null % \"x\""), Value::Null);
    assert_eq!(eval_ok("null ** \"x\""), Value::Null);
    assert_eq!(eval_ok("\"x\" ** null"), Value::Null);
}

#[test]
fn division_and_remainder_by_zero_are_math_errors() {
    assert_eq!(eval_kind("let a = 10 / 0"), ErrorKind::MathError);
    assert_eq!(eval_kind("10 % 0"), ErrorKind::MathError);
}

#[test]
fn remainder_uses_ieee_semantics() {
    // The quotient rounds to nearest: 5 = 2*3 - 1.
    assert_eq!(eval_ok("5 % 3"), number(-1.0));
    assert_eq!(eval_ok("7 % 3"), number(1.0));
    assert_eq!(eval_ok("6 % 3"), number(0.0));
}

#[test]
fn divisibility_operator() {
    assert_eq!(eval_ok("5 %% 5"), Value::Bool(true));
    assert_eq!(eval_ok("5 %% 3"), Value::Bool(false));
    assert_eq!(eval_ok("format(\"{} {}\", 5 %% 5, 5 %% 3)"), string("true false"));
}

#[test]
fn string_operands_reject_non_additive_arithmetic() {
    assert_eq!(eval_kind("\"abc\" - 1"), ErrorKind::TypeError);
    assert_eq!(eval_kind("\"a\" * \"b\""), ErrorKind::TypeError);
    assert_eq!(eval_kind("\"a\" / 2"), ErrorKind::TypeError);
}

// ============================================================================
// Comparisons
// ============================================================================

#[test]
fn numeric_comparisons() {
    assert_eq!(eval_ok("2 > 1"), Value::Bool(true));
    assert_eq!(eval_ok("2 >= 2"), Value::Bool(true));
    assert_eq!(eval_ok("1 < 2"), Value::Bool(true));
    assert_eq!(eval_ok("3 <= 2"), Value::Bool(false));
    assert_eq!(eval_ok("'a' < 'b'"), Value::Bool(true));
}

#[test]
fn string_comparison_is_case_insensitive() {
    assert_eq!(eval_ok("\"Apple\" < \"banana\""), Value::Bool(true));
    assert_eq!(eval_ok("\"ZEBRA\" > \"apple\""), Value::Bool(true));
    // Common-prefix ties resolve as not-greater.
    assert_eq!(eval_ok("\"abc\" > \"ab\""), Value::Bool(false));
}

#[test]
fn equality_coerces_but_stays_case_sensitive_for_strings() {
    assert_eq!(eval_ok("\"5\" == 5"), Value::Bool(true));
    assert_eq!(eval_ok("\"ABC\" == \"abc\""), Value::Bool(false));
    assert_eq!(eval_ok("'a' == 97"), Value::Bool(true));
    assert_eq!(eval_ok("true == 1"), Value::Bool(true));
    assert_eq!(eval_ok("null == 0"), Value::Bool(false));
    assert_eq!(eval_ok("null == null"), Value::Bool(true));
}

#[test]
fn strict_equality_requires_matching_variants() {
    assert_eq!(eval_ok("'a' === 97"), Value::Bool(false));
    assert_eq!(eval_ok("1 === 1"), Value::Bool(true));
    assert_eq!(eval_ok("1 is 1"), Value::Bool(true));
    assert_eq!(eval_ok("1 isnot \"1\""), Value::Bool(true));
    assert_eq!(eval_ok("\"a\" === \"a\""), Value::Bool(true));
}

#[test]
fn relational_operators_reject_null() {
    assert_eq!(eval_kind("null < 1"), ErrorKind::TypeError);
    assert_eq!(eval_kind("1 >= null"), ErrorKind::TypeError);
}

// ============================================================================
// Logic, ternary and null coalescing
// ============================================================================

#[test]
fn truthiness() {
    assert_eq!(eval_ok("!0"), Value::Bool(true));
    assert_eq!(eval_ok("!\"\""), Value::Bool(true));
    assert_eq!(eval_ok("!\"x\""), Value::Bool(false));
    assert_eq!(eval_ok("!null"), Value::Bool(true));
    assert_eq!(eval_ok("not false"), Value::Bool(true));
    assert_eq!(eval_kind("!print"), ErrorKind::TypeError);
}

#[test]
fn logic_operators_yield_booleans() {
    assert_eq!(eval_ok("1 && 2"), Value::Bool(true));
    assert_eq!(eval_ok("1 and 0"), Value::Bool(false));
    assert_eq!(eval_ok("0 || 0"), Value::Bool(false));
    assert_eq!(eval_ok("0 or 3"), Value::Bool(true));
}

#[test]
fn null_coalescing_takes_the_first_non_null() {
    assert_eq!(eval_ok("null ?? \"fallback\""), string("fallback"));
    assert_eq!(eval_ok("\"set\" ?? \"fallback\""), string("set"));
    assert_eq!(eval_ok("null ?? null ?? 3"), number(3.0));
}

#[test]
fn ternary_selects_branches() {
    assert_eq!(eval_ok("1 ? \"a\" : \"b\""), string("a"));
    assert_eq!(eval_ok("0 ? \"a\" : \"b\""), string("b"));
    assert_eq!(eval_ok("0 ? \"a\" : 1 ? \"b\" : \"c\""), string("b"));
}

#[test]
fn short_circuits_never_touch_the_unchosen_operand() {
    assert_eq!(eval_ok("let n = 0; false && (n = 1); n"), number(0.0));
    assert_eq!(eval_ok("let n = 0; true || (n = 1); n"), number(0.0));
    assert_eq!(eval_ok("let n = 0; \"v\" ?? (n = 1); n"), number(0.0));
    assert_eq!(eval_ok("let n = 0; true ? 2 : (n = 1); n"), number(0.0));
    assert_eq!(eval_ok("let n = 0; false ? (n = 1) : 2; n"), number(0.0));
}

// ============================================================================
// Variables, constants and scope
// ============================================================================

#[test]
fn declarations_broadcast_and_fill() {
    assert_eq!(eval_ok("let a, b, c = 7; a + b + c"), number(21.0));
    assert_eq!(eval_ok("let a, b, c = 1, 2; c"), number(2.0));
    assert_eq!(eval_ok("let a; a"), Value::Null);
    assert_eq!(eval_ok("con a, b = 5; a + b"), number(10.0));
}

#[test]
fn broadcast_copies_are_independent() {
    assert_eq!(eval_ok("let a, b = \"x\"; a += \"y\"; b"), string("x"));
}

#[test]
fn constants_cannot_be_reassigned() {
    let error = eval("con k = 1; k = 2").expect_err("expected a diagnostic");
    assert_eq!(error.kind, ErrorKind::NameError);
    assert!(error.message.contains("constant"));
}

#[test]
fn constants_cannot_be_redeclared_or_deleted() {
    assert_eq!(eval_kind("con k = 1; let k = 2"), ErrorKind::NameError);
    assert_eq!(eval_kind("con k = 1; con k = 2"), ErrorKind::NameError);
    assert_eq!(eval_kind("con k = 1; delete k"), ErrorKind::NameError);
    assert_eq!(eval_kind("con k = 1; k += 1"), ErrorKind::NameError);
    assert_eq!(eval_kind("con k = 1; k++"), ErrorKind::NameError);
}

#[test]
fn constants_are_per_frame() {
    // An inner scope may shadow an outer constant with its own binding.
    assert_eq!(eval_ok("con k = 1; { let k = 2; k }"), number(2.0));
    assert_eq!(eval_ok("con k = 1; { let k = 2 }; k"), number(1.0));
}

#[test]
fn undefined_variables_are_name_errors() {
    assert_eq!(eval_kind("missing"), ErrorKind::NameError);
    assert_eq!(eval_kind("missing = 1"), ErrorKind::NameError);
    assert_eq!(eval_kind("delete missing"), ErrorKind::NameError);
}

#[test]
fn exists_reports_without_raising() {
    assert_eq!(eval_ok("exists missing"), Value::Bool(false));
    assert_eq!(eval_ok("let x = 1; exists x"), Value::Bool(true));
    assert_eq!(eval_ok("let x = 1; delete x; exists x"), Value::Bool(false));
    assert_eq!(eval_ok("exists println"), Value::Bool(true));
}

#[test]
fn blocks_scope_their_declarations() {
    assert_eq!(eval_ok("let x = 1; { let x = 99 }; x"), number(1.0));
    assert_eq!(eval_ok("{ let y = 9 }; exists y"), Value::Bool(false));
    assert_eq!(eval_ok("let x = 1; { x = 2 }; x"), number(2.0));
    assert_eq!(eval_ok("let x = { 1; 2 }; x"), number(2.0));
}

#[test]
fn values_deep_copy_on_read() {
    assert_eq!(eval_ok("let a = \"x\"; let b = a; b += \"y\"; a"), string("x"));
}

#[test]
fn increment_and_decrement_write_back_to_names() {
    assert_eq!(eval_ok("let i = 5; i++"), number(6.0));
    assert_eq!(eval_ok("let i = 5; i++; i"), number(6.0));
    assert_eq!(eval_ok("let i = 5; i--; i"), number(4.0));
    assert_eq!(eval_ok("let c = 'a'; c++; c"), Value::Char(b'b'));
    // On an rvalue the operator only steps the value.
    assert_eq!(eval_ok("5++"), number(6.0));
}

// ============================================================================
// Control flow
// ============================================================================

#[test]
fn while_loop_accumulates() {
    assert_eq!(
        eval_ok("let out = \"\"; let i = 0; while i < 3 { out += string(i); i += 1 }; out"),
        string("012")
    );
}

#[test]
fn while_with_false_condition_never_runs() {
    assert_eq!(eval_ok("let n = 0; while false { n = 1 }; n"), number(0.0));
}

#[test]
fn infinite_while_exits_via_break() {
    assert_eq!(
        eval_ok("let i = 0; while { i += 1; break unless i < 3 }; i"),
        number(3.0)
    );
}

#[test]
fn for_loop_with_break() {
    assert_eq!(
        eval_ok(
            "let out = \"\"\n\
             for let i = 0; i < 3; i += 1 { if i == 2 { break } out += string(i) }\n\
             out"
        ),
        string("01")
    );
}

#[test]
fn for_loop_continue_still_steps() {
    assert_eq!(
        eval_ok(
            "let out = \"\"\n\
             for let i = 0; i < 5; i += 1 { continue unless i %% 2; out += string(i) }\n\
             out"
        ),
        string("024")
    );
}

#[test]
fn for_header_scope_does_not_leak() {
    assert_eq!(
        eval_ok("for let i = 0; i < 3; i += 1 { i }; exists i"),
        Value::Bool(false)
    );
}

#[test]
fn loops_do_not_perturb_the_outer_environment() {
    assert_eq!(
        eval_ok("let x = 1; let i = 0; while i < 3 { let x = 99; i += 1 }; x"),
        number(1.0)
    );
}

#[test]
fn if_elif_else_selects_the_first_truthy_clause() {
    let source = "fn pick(n) { if n < 0 { \"neg\" } elif n == 0 { \"zero\" } else { \"pos\" } }\n";
    assert_eq!(eval_ok(&format!("{}pick(-5)", source)), string("neg"));
    assert_eq!(eval_ok(&format!("{}pick(0)", source)), string("zero"));
    assert_eq!(eval_ok(&format!("{}pick(3)", source)), string("pos"));
}

#[test]
fn conditions_accept_any_truthy_value() {
    assert_eq!(eval_ok("if \"x\" { 1 } else { 2 }"), number(1.0));
    assert_eq!(eval_ok("if null { 1 } else { 2 }"), number(2.0));
}

#[test]
fn unless_runs_on_falsy_conditions_only() {
    assert_eq!(eval_ok("let n = 0; do n = 1 unless true; n"), number(0.0));
    assert_eq!(eval_ok("let n = 0; do n = 1 unless false; n"), number(1.0));
}

#[test]
fn break_and_continue_outside_loops_are_flow_errors() {
    assert_eq!(eval_kind("break"), ErrorKind::FlowError);
    assert_eq!(eval_kind("continue"), ErrorKind::FlowError);
    assert_eq!(eval_kind("return 1"), ErrorKind::FlowError);
}

#[test]
fn break_inside_a_called_function_does_not_reach_the_callers_loop() {
    let error = eval("fn f() { break }\nlet i = 0\nwhile i < 3 { f(); i += 1 }")
        .expect_err("expected a diagnostic");
    assert_eq!(error.kind, ErrorKind::FlowError);
    assert!(error.message.contains("break"));
}

// ============================================================================
// Functions
// ============================================================================

#[test]
fn function_calls_bind_parameters() {
    assert_eq!(eval_ok("fn add(a, b) { a + b }\nadd(40, 2)"), number(42.0));
}

#[test]
fn recursion() {
    assert_eq!(
        eval_ok("fn fact(n) { if n <= 1 { 1 } else { n * fact(n - 1) } }\nfact(5)"),
        number(120.0)
    );
}

#[test]
fn default_parameters_fill_trailing_slots() {
    let source = "fn greet(name, punct = \"!\") { name + punct }\n";
    assert_eq!(eval_ok(&format!("{}greet(\"hi\")", source)), string("hi!"));
    assert_eq!(
        eval_ok(&format!("{}greet(\"hi\", \"?\")", source)),
        string("hi?")
    );
}

#[test]
fn call_arity_is_checked() {
    let source = "fn greet(name, punct = \"!\") { name + punct }\n";
    assert_eq!(eval_kind(&format!("{}greet()", source)), ErrorKind::TypeError);
    assert_eq!(
        eval_kind(&format!("{}greet(\"a\", \"b\", \"c\")", source)),
        ErrorKind::TypeError
    );
}

#[test]
fn return_exits_the_function_early() {
    assert_eq!(eval_ok("fn f() { return 1; 2 }\nf()"), number(1.0));
    assert_eq!(
        eval_ok("fn f() { let i = 0; while true { return 7 } }\nf()"),
        number(7.0)
    );
}

#[test]
fn return_variable_is_prebound() {
    assert_eq!(eval_ok("fn f() -> r = 10 { r += 1 }\nf()"), number(11.0));
    assert_eq!(eval_ok("fn f() -> r { r }\nf()"), Value::Null);
}

#[test]
fn functions_close_over_their_declaration_environment() {
    assert_eq!(
        eval_ok("let counter = 0\nfn bump() { counter += 1 }\nbump(); bump(); counter"),
        number(2.0)
    );
    // Calls observe mutations made after declaration.
    assert_eq!(
        eval_ok("let base = 1\nfn get() { base }\nbase = 5\nget()"),
        number(5.0)
    );
}

#[test]
fn function_declarations_are_constants() {
    assert_eq!(eval_kind("fn f() { 1 }\nf = 2"), ErrorKind::NameError);
}

#[test]
fn only_callables_can_be_called() {
    assert_eq!(eval_kind("let x = 1; x()"), ErrorKind::TypeError);
}

#[test]
fn functions_convert_to_strings_but_nothing_else() {
    assert_eq!(eval_ok("string(println)"), string("println"));
    assert_eq!(eval_ok("fn f() { 1 }\n\"<\" + f + \">\""), string("<f>"));
    assert_eq!(eval_kind("number(println)"), ErrorKind::TypeError);
    assert_eq!(eval_kind("bool(println)"), ErrorKind::TypeError);
}

// ============================================================================
// Built-ins
// ============================================================================

#[test]
fn format_expands_placeholders() {
    assert_eq!(eval_ok("format(\"{} + {} = {}\", 1, 2, 3)"), string("1 + 2 = 3"));
    // Missing arguments leave placeholders; extras are ignored.
    assert_eq!(eval_ok("format(\"{} {}\", 1)"), string("1 {}"));
    assert_eq!(eval_ok("format(\"{}\", 1, 2)"), string("1"));
}

#[test]
fn format_requires_a_string_template() {
    assert_eq!(eval_kind("format(1)"), ErrorKind::TypeError);
    assert_eq!(eval_kind("printf()"), ErrorKind::TypeError);
}

#[test]
fn conversions() {
    assert_eq!(eval_ok("number(\"12\") + 1"), number(13.0));
    assert_eq!(eval_ok("string(2.5)"), string("2.5"));
    assert_eq!(eval_ok("string(2)"), string("2"));
    assert_eq!(eval_ok("string(null)"), string("null"));
    assert_eq!(eval_ok("char(\"x\")"), Value::Char(b'x'));
    assert_eq!(eval_ok("char(97)"), Value::Char(b'a'));
    assert_eq!(eval_ok("bool(\"\")"), Value::Bool(false));
    assert_eq!(eval_ok("bool(3)"), Value::Bool(true));
    // Neutral values with no argument.
    assert_eq!(eval_ok("string()"), string(""));
    assert_eq!(eval_ok("number()"), number(0.0));
    assert_eq!(eval_ok("bool()"), Value::Bool(false));
}

#[test]
fn failed_conversions_raise() {
    assert_eq!(eval_kind("number(\"abc\")"), ErrorKind::MathError);
    assert_eq!(eval_kind("char(\"xy\")"), ErrorKind::TypeError);
}

#[test]
fn raise_and_assert_surface_user_errors() {
    let error = eval("raise(\"bad {}\", 7)").expect_err("expected a diagnostic");
    assert_eq!(error.kind, ErrorKind::UserError);
    assert_eq!(error.message, "bad 7");

    assert!(eval("assert(1 < 2, \"fine\")").is_ok());
    let error = eval("assert(1 > 2, \"impossible\")").expect_err("expected a diagnostic");
    assert_eq!(error.kind, ErrorKind::UserError);
    assert_eq!(error.message, "impossible");
}

#[test]
fn throw_carries_a_status_code() {
    let error = eval("throw(\"boom\", 7)").expect_err("expected a diagnostic");
    assert_eq!(error.kind, ErrorKind::UserError);
    assert_eq!(error.status, 7);
    assert!(error.span.is_none());
}

#[test]
fn exit_is_a_silent_signal() {
    let error = eval("exit(3)").expect_err("expected the exit signal");
    assert_eq!(error.kind, ErrorKind::Exit);
    assert_eq!(error.status, 3);
}

// ============================================================================
// Copy idempotence
// ============================================================================

#[test]
fn cloned_programs_evaluate_identically() {
    let mut lexer = Lexer::new("let a, b = 2, 3; a ** b".to_string());
    let tokens = lexer.scan_tokens().expect("expected source to lex");
    let mut parser = Parser::new(tokens);
    let program = parser.parse().expect("expected source to parse");

    let copy = program.clone().clone();
    let mut first = Interpreter::new();
    let mut second = Interpreter::new();
    assert_eq!(
        first.interpret(&program).expect("expected evaluation"),
        second.interpret(&copy).expect("expected evaluation")
    );
}

#[test]
fn cloned_values_compare_equal() {
    for value in [
        Value::Null,
        Value::Bool(true),
        Value::Number(3.25),
        Value::Char(b'q'),
        Value::Str("text".to_string()),
    ] {
        assert_eq!(value.clone().clone(), value);
    }
}

// ============================================================================
// Runner: exit codes and the main contract
// ============================================================================

#[test]
fn runner_reports_success_and_failure_statuses() {
    assert_eq!(quill::runner::run("1 + 1", None), 0);
    assert_eq!(quill::runner::run("con k = 1; k = 2", None), 1);
    assert_eq!(quill::runner::run("exit(3)", None), 3);
    assert_eq!(quill::runner::run("throw(\"boom\", 7)", None), 7);
}

#[test]
fn runner_invokes_a_global_main_function() {
    assert_eq!(quill::runner::run("fn main() { exit(42) }", None), 42);
    // A non-function `main` is left alone.
    assert_eq!(quill::runner::run("let main = 3", None), 0);
}
