use crate::error::QuillError;
use crate::evaluator::Interpreter;
use crate::lexer::Lexer;
use crate::parser::Parser;

/// Runs a full program: lex, parse, evaluate, then the `main` contract.
/// Returns the process exit status.
pub fn run(source: &str, filename: Option<&str>) -> i32 {
    let mut lexer = Lexer::new(source.to_string());
    let tokens = match lexer.scan_tokens() {
        Ok(tokens) => tokens,
        Err(error) => return finish(&error, source, filename),
    };

    let mut parser = Parser::new(tokens);
    let program = match parser.parse() {
        Ok(program) => program,
        Err(error) => return finish(&error, source, filename),
    };

    let mut interpreter = Interpreter::new();
    if let Err(error) = interpreter.interpret(&program) {
        return finish(&error, source, filename);
    }

    // After top-level evaluation, a global `main` function runs with no
    // arguments.
    if let Err(error) = interpreter.run_main() {
        return finish(&error, source, filename);
    }
    0
}

fn finish(error: &QuillError, source: &str, filename: Option<&str>) -> i32 {
    error.report(source, filename);
    error.status
}
