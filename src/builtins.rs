use crate::environment::Environment;
use crate::error::{QuillError, Span};
use crate::value::Value;
use std::cell::RefCell;
use std::io::{self, BufRead, Write};
use std::rc::Rc;

/// Builds the global environment: the `null`/`true`/`false` constants and
/// every native function, all bound as constants.
pub fn global_environment() -> Rc<RefCell<Environment>> {
    let env = Rc::new(RefCell::new(Environment::new()));
    {
        let mut globals = env.borrow_mut();
        globals.define("null", Value::Null, true);
        globals.define("true", Value::Bool(true), true);
        globals.define("false", Value::Bool(false), true);

        let natives: &[(&'static str, crate::value::NativeHandler)] = &[
            ("print", print),
            ("println", println),
            ("printf", printf),
            ("printfln", printfln),
            ("format", format),
            ("raise", raise),
            ("assert", assert),
            ("throw", throw),
            ("exit", exit),
            ("input", input),
            ("inputnum", inputnum),
            ("inputch", inputch),
            ("string", string),
            ("number", number),
            ("char", char_),
            ("bool", bool_),
        ];
        for &(name, handler) in natives {
            globals.define(name, Value::NativeFn { name, handler }, true);
        }
    }
    env
}

/// Replaces `{}` placeholders left to right. Surplus arguments are
/// ignored; surplus placeholders stay in place.
fn expand_placeholders(template: &str, args: &[Value]) -> String {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;
    let mut next = 0;

    while let Some(pos) = rest.find("{}") {
        if next >= args.len() {
            break;
        }
        result.push_str(&rest[..pos]);
        result.push_str(&args[next].as_string());
        rest = &rest[pos + 2..];
        next += 1;
    }
    result.push_str(rest);
    result
}

fn template_argument(
    name: &str,
    args: &[Value],
    span: Span,
) -> Result<String, QuillError> {
    match args.first() {
        Some(Value::Str(template)) => Ok(template.clone()),
        _ => Err(QuillError::type_error(
            span,
            format!(
                "'{}': Expected at least one argument and expected the first argument to be a string.",
                name
            ),
        )),
    }
}

fn check_at_most_one(name: &str, args: &[Value], span: Span) -> Result<(), QuillError> {
    if args.len() > 1 {
        return Err(QuillError::type_error(
            span,
            format!("'{}': Expected no arguments or a single argument.", name),
        ));
    }
    Ok(())
}

fn read_line(prompt: Option<&Value>, span: Span) -> Result<String, QuillError> {
    if let Some(prompt) = prompt {
        print!("{}", prompt.as_string());
        io::stdout().flush().ok();
    }
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line).map_err(|_| {
        QuillError::user_error(span, "Could not read from standard input.".to_string())
    })?;
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Ok(line)
}

// Print/format functions

fn print(args: Vec<Value>, _env: &Rc<RefCell<Environment>>, _span: Span) -> Result<Value, QuillError> {
    let parts: Vec<String> = args.iter().map(Value::as_string).collect();
    print!("{}", parts.join(" "));
    io::stdout().flush().ok();
    Ok(Value::Null)
}

fn println(args: Vec<Value>, env: &Rc<RefCell<Environment>>, span: Span) -> Result<Value, QuillError> {
    print(args, env, span)?;
    println!();
    Ok(Value::Null)
}

fn printf(args: Vec<Value>, _env: &Rc<RefCell<Environment>>, span: Span) -> Result<Value, QuillError> {
    let template = template_argument("printf", &args, span)?;
    print!("{}", expand_placeholders(&template, &args[1..]));
    io::stdout().flush().ok();
    Ok(Value::Null)
}

fn printfln(args: Vec<Value>, _env: &Rc<RefCell<Environment>>, span: Span) -> Result<Value, QuillError> {
    let template = template_argument("printfln", &args, span)?;
    println!("{}", expand_placeholders(&template, &args[1..]));
    Ok(Value::Null)
}

fn format(args: Vec<Value>, _env: &Rc<RefCell<Environment>>, span: Span) -> Result<Value, QuillError> {
    let template = template_argument("format", &args, span)?;
    Ok(Value::Str(expand_placeholders(&template, &args[1..])))
}

// Error/exit functions

fn raise(args: Vec<Value>, _env: &Rc<RefCell<Environment>>, span: Span) -> Result<Value, QuillError> {
    let template = template_argument("raise", &args, span)?;
    Err(QuillError::user_error(
        span,
        expand_placeholders(&template, &args[1..]),
    ))
}

fn assert(args: Vec<Value>, _env: &Rc<RefCell<Environment>>, span: Span) -> Result<Value, QuillError> {
    if args.len() != 2 {
        return Err(QuillError::type_error(
            span,
            "'assert': Expected two arguments.".to_string(),
        ));
    }
    if !args[0].as_bool(span)? {
        return Err(QuillError::user_error(span, args[1].as_string()));
    }
    Ok(Value::Null)
}

fn throw(args: Vec<Value>, _env: &Rc<RefCell<Environment>>, span: Span) -> Result<Value, QuillError> {
    if args.len() > 2 {
        return Err(QuillError::type_error(
            span,
            "'throw': Expected at most two arguments.".to_string(),
        ));
    }
    let message = args
        .first()
        .map(Value::as_string)
        .unwrap_or_else(|| "Error thrown with no further description.".to_string());
    let status = match args.get(1) {
        Some(code) => code.as_number(span)? as i32,
        None => 1,
    };
    Err(QuillError::thrown(message, status))
}

fn exit(args: Vec<Value>, _env: &Rc<RefCell<Environment>>, span: Span) -> Result<Value, QuillError> {
    check_at_most_one("exit", &args, span)?;
    let status = match args.first() {
        Some(code) => code.as_number(span)? as i32,
        None => 0,
    };
    Err(QuillError::exit(status))
}

// Input functions

fn input(args: Vec<Value>, _env: &Rc<RefCell<Environment>>, span: Span) -> Result<Value, QuillError> {
    check_at_most_one("input", &args, span)?;
    Ok(Value::Str(read_line(args.first(), span)?))
}

fn inputnum(args: Vec<Value>, _env: &Rc<RefCell<Environment>>, span: Span) -> Result<Value, QuillError> {
    check_at_most_one("inputnum", &args, span)?;
    let line = read_line(args.first(), span)?;
    Ok(Value::Number(line.trim().parse().unwrap_or(0.0)))
}

fn inputch(args: Vec<Value>, _env: &Rc<RefCell<Environment>>, span: Span) -> Result<Value, QuillError> {
    check_at_most_one("inputch", &args, span)?;
    let line = read_line(args.first(), span)?;
    Ok(Value::Char(line.bytes().next().unwrap_or(0)))
}

// Type conversion functions

fn string(args: Vec<Value>, _env: &Rc<RefCell<Environment>>, span: Span) -> Result<Value, QuillError> {
    check_at_most_one("string", &args, span)?;
    Ok(Value::Str(
        args.first().map(Value::as_string).unwrap_or_default(),
    ))
}

fn number(args: Vec<Value>, _env: &Rc<RefCell<Environment>>, span: Span) -> Result<Value, QuillError> {
    check_at_most_one("number", &args, span)?;
    let value = match args.first() {
        Some(value) => value.as_number(span)?,
        None => 0.0,
    };
    Ok(Value::Number(value))
}

fn char_(args: Vec<Value>, _env: &Rc<RefCell<Environment>>, span: Span) -> Result<Value, QuillError> {
    check_at_most_one("char", &args, span)?;
    let value = match args.first() {
        Some(value) => value.as_char(span)?,
        None => 0,
    };
    Ok(Value::Char(value))
}

fn bool_(args: Vec<Value>, _env: &Rc<RefCell<Environment>>, span: Span) -> Result<Value, QuillError> {
    check_at_most_one("bool", &args, span)?;
    let value = match args.first() {
        Some(value) => value.as_bool(span)?,
        None => false,
    };
    Ok(Value::Bool(value))
}
