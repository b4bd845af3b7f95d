use crate::error::ErrorKind;
use crate::evaluator::Interpreter;
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::value::Value;
use std::io::{self, Write};
use std::process;

/// Interactive loop with persistent state between lines.
pub fn start() {
    println!("Quill Interpreter v0.1.0");
    println!("Type 'exit' or press Ctrl+C to quit");
    println!();

    let mut interpreter = Interpreter::new();

    loop {
        print!("> ");
        io::stdout().flush().unwrap();

        let mut line = String::new();
        match io::stdin().read_line(&mut line) {
            Ok(0) => {
                // EOF reached (Ctrl+D or piped input ended)
                println!();
                break;
            }
            Ok(_) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line == "exit" || line == "quit" {
                    println!("Goodbye!");
                    break;
                }

                run_line(line, &mut interpreter);
            }
            Err(error) => {
                eprintln!("Error reading input: {}", error);
                break;
            }
        }
    }
}

fn run_line(source: &str, interpreter: &mut Interpreter) {
    let mut lexer = Lexer::new(source.to_string());
    let tokens = match lexer.scan_tokens() {
        Ok(tokens) => tokens,
        Err(error) => {
            error.report(source, None);
            return;
        }
    };

    let mut parser = Parser::new(tokens);
    let program = match parser.parse() {
        Ok(program) => program,
        Err(error) => {
            error.report(source, None);
            return;
        }
    };

    match interpreter.interpret(&program) {
        // Echo the line's value unless there is nothing to show.
        Ok(Value::Null) => {}
        Ok(value) => println!("{}", value),
        Err(error) => {
            if error.kind == ErrorKind::Exit {
                process::exit(error.status);
            }
            error.report(source, None);
        }
    }
}
