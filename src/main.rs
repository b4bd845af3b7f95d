mod ast;
mod builtins;
mod environment;
mod error;
mod evaluator;
mod lexer;
mod parser;
mod repl;
mod runner;
mod value;

use clap::{Arg, Command};
use std::fs;
use std::path::Path;
use std::process;

fn main() {
    let matches = Command::new("quill")
        .about("A small dynamically-typed scripting language with friendly error diagnostics")
        .arg(
            Arg::new("program")
                .help("Path to a script file, or inline source to execute")
                .value_name("FILE_OR_SOURCE")
                .index(1),
        )
        .arg(
            Arg::new("interactive")
                .short('i')
                .long("interactive")
                .help("Start in interactive REPL mode")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    if matches.get_flag("interactive") {
        repl::start();
        return;
    }

    let Some(program) = matches.get_one::<String>("program") else {
        repl::start();
        return;
    };

    // An argument naming an existing regular file runs that file; any
    // other argument is treated as inline source.
    let path = Path::new(program);
    if path.is_file() {
        match fs::read_to_string(path) {
            Ok(source) => process::exit(runner::run(&source, path.to_str())),
            Err(error) => {
                eprintln!("Error reading file '{}': {}", path.display(), error);
                process::exit(1);
            }
        }
    } else {
        process::exit(runner::run(program, None));
    }
}
