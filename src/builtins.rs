//! Sample functions served by the `wirecall` binary.
//!
//! Each handler validates its own arity and argument types and reports
//! problems as [`HandlerError`] values.

use serde_json::{Value, json};

use crate::{
    registry::{HandlerError, HandlerResult},
    server::{RpcServer, ServerError},
};

/// Register every sample function on `server`.
///
/// # Errors
///
/// Returns a [`ServerError`] if the server is no longer accepting registrations.
pub fn register_builtins(server: &RpcServer) -> Result<(), ServerError> {
    server.register("add", add)?;
    server.register("greet", greet)?;
    server.register("is_positive", is_positive)?;
    server.register("echo", echo)?;
    server.register("no_return", no_return)?;
    server.register("divide", divide)?;
    server.register("sum_array", sum_array)?;
    server.register("process_person", process_person)?;
    server.register("get_greetings", get_greetings)?;
    Ok(())
}

fn int_arg(value: &Value) -> Option<i32> { value.as_i64().and_then(|n| i32::try_from(n).ok()) }

fn two_ints(args: &[Value], usage: &str) -> Result<(i32, i32), HandlerError> {
    match args {
        [a, b] => int_arg(a)
            .zip(int_arg(b))
            .ok_or_else(|| HandlerError::invalid_arguments(usage)),
        _ => Err(HandlerError::invalid_arguments(usage)),
    }
}

fn single<'a>(args: &'a [Value], usage: &str) -> Result<&'a Value, HandlerError> {
    match args {
        [value] => Ok(value),
        _ => Err(HandlerError::invalid_arguments(usage)),
    }
}

fn greeting(name: &str) -> String { format!("Hello, {name}!") }

/// `add(a: int, b: int) -> int`
pub fn add(args: &[Value]) -> HandlerResult {
    let (a, b) = two_ints(args, "add requires two integer arguments")?;
    a.checked_add(b)
        .map(|sum| json!(sum))
        .ok_or_else(|| HandlerError::execution_failed("Integer overflow"))
}

/// `greet(name: string) -> string`
pub fn greet(args: &[Value]) -> HandlerResult {
    let usage = "greet requires one string argument";
    let name = single(args, usage)?
        .as_str()
        .ok_or_else(|| HandlerError::invalid_arguments(usage))?;
    Ok(json!(greeting(name)))
}

/// `is_positive(n: number) -> bool`
pub fn is_positive(args: &[Value]) -> HandlerResult {
    let usage = "is_positive requires one numeric argument";
    let n = single(args, usage)?
        .as_f64()
        .ok_or_else(|| HandlerError::invalid_arguments(usage))?;
    Ok(json!(n > 0.0))
}

/// `echo(value) -> value`
pub fn echo(args: &[Value]) -> HandlerResult {
    single(args, "echo requires exactly one argument").cloned()
}

/// `no_return() -> null`
pub fn no_return(args: &[Value]) -> HandlerResult {
    if !args.is_empty() {
        return Err(HandlerError::invalid_arguments("no_return takes no arguments"));
    }
    Ok(Value::Null)
}

/// `divide(numerator: int, denominator: int) -> int`, truncating.
pub fn divide(args: &[Value]) -> HandlerResult {
    let (numerator, denominator) = two_ints(args, "divide requires two integers")?;
    if denominator == 0 {
        return Err(HandlerError::execution_failed("Division by zero"));
    }
    numerator
        .checked_div(denominator)
        .map(|quotient| json!(quotient))
        .ok_or_else(|| HandlerError::execution_failed("Integer overflow"))
}

/// `sum_array(numbers: [int]) -> int`
pub fn sum_array(args: &[Value]) -> HandlerResult {
    let usage = "sum_array requires one array of integers";
    let items = single(args, usage)?
        .as_array()
        .ok_or_else(|| HandlerError::invalid_arguments(usage))?;
    let mut total: i32 = 0;
    for item in items {
        let n = int_arg(item)
            .ok_or_else(|| HandlerError::invalid_arguments("All array elements must be integers"))?;
        total = total
            .checked_add(n)
            .ok_or_else(|| HandlerError::execution_failed("Integer overflow"))?;
    }
    Ok(json!(total))
}

/// `process_person({name: string, age: int, is_student: bool}) -> string`
pub fn process_person(args: &[Value]) -> HandlerResult {
    let person = single(args, "process_person requires one object")?
        .as_object()
        .ok_or_else(|| HandlerError::invalid_arguments("process_person requires one object"))?;
    let name = person.get("name").and_then(Value::as_str);
    let age = person.get("age").and_then(int_arg);
    let is_student = person.get("is_student").and_then(Value::as_bool);
    let (Some(name), Some(age), Some(is_student)) = (name, age, is_student) else {
        return Err(HandlerError::invalid_arguments(
            "Person object requires name (string), age (int), is_student (bool)",
        ));
    };
    let status = if is_student { "a student" } else { "not a student" };
    Ok(json!(format!(
        "Processed person: {name}, age {age}, is {status}."
    )))
}

/// `get_greetings(names: [string]) -> [string]`
pub fn get_greetings(args: &[Value]) -> HandlerResult {
    let usage = "get_greetings requires one array of strings";
    let names = single(args, usage)?
        .as_array()
        .ok_or_else(|| HandlerError::invalid_arguments(usage))?;
    names
        .iter()
        .map(|name| {
            name.as_str()
                .map(|name| json!(greeting(name)))
                .ok_or_else(|| HandlerError::invalid_arguments("All elements must be strings"))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}
