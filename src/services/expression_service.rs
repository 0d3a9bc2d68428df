use serde_json::{json, Value};

use super::expression::{is_error_result, render_result};
use crate::error::InvocationError;
use crate::registry::{BatchDescriptor, DispatchTarget, MetadataRegistry};

/// Evaluates arithmetic expressions.
///
/// | method              | metadata          | args                                  |
/// |---------------------|-------------------|---------------------------------------|
/// | `calculate_results` | batched, size 10  | `[expressions]`, optional `precision` |
/// | `evaluate`          | none              | `expression`                          |
/// | `count_errors`      | log invocation    | `[rendered results]`                  |
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpressionService;

impl ExpressionService {
    pub const NAME: &'static str = "ExpressionService";
    pub const CALCULATE_RESULTS: &'static str = "calculate_results";
    pub const EVALUATE: &'static str = "evaluate";
    pub const COUNT_ERRORS: &'static str = "count_errors";
    pub const CALCULATE_CHUNK_SIZE: i64 = 10;

    pub fn new() -> Self {
        Self
    }

    fn calculate_results(&self, args: &[Value]) -> Result<Value, InvocationError> {
        let expressions = string_list(Self::CALCULATE_RESULTS, args.first())?;
        let precision = precision(args.get(1))?;

        Ok(Value::Array(
            expressions
                .into_iter()
                .map(|expression| Value::String(render_result(expression, precision)))
                .collect(),
        ))
    }

    fn evaluate(&self, args: &[Value]) -> Result<Value, InvocationError> {
        match args.first() {
            Some(Value::String(expression)) => Ok(Value::String(render_result(expression, None))),
            other => Err(invalid(
                Self::EVALUATE,
                format!("expected an expression string, got {}", describe(other)),
            )),
        }
    }

    fn count_errors(&self, args: &[Value]) -> Result<Value, InvocationError> {
        let results = string_list(Self::COUNT_ERRORS, args.first())?;
        let errors = results.iter().filter(|r| is_error_result(r)).count();
        Ok(json!(errors))
    }
}

impl DispatchTarget for ExpressionService {
    fn service_name(&self) -> &str {
        Self::NAME
    }

    fn supported_methods(&self) -> Vec<&str> {
        vec![Self::CALCULATE_RESULTS, Self::EVALUATE, Self::COUNT_ERRORS]
    }

    fn invoke(&self, method: &str, args: &[Value]) -> Result<Value, InvocationError> {
        match method {
            Self::CALCULATE_RESULTS => self.calculate_results(args),
            Self::EVALUATE => self.evaluate(args),
            Self::COUNT_ERRORS => self.count_errors(args),
            other => Err(InvocationError::new(Self::NAME, other, "unsupported method")),
        }
    }

    fn declare_metadata(registry: &MetadataRegistry) {
        registry
            .register_batch::<Self>(
                Self::CALCULATE_RESULTS,
                BatchDescriptor::with_chunk_size(Self::CALCULATE_CHUNK_SIZE),
            )
            .register_log_invocation::<Self>(Self::COUNT_ERRORS);
    }
}

fn invalid(method: &str, message: String) -> InvocationError {
    InvocationError::invalid_arguments(ExpressionService::NAME, method, message)
}

fn describe(value: Option<&Value>) -> &'static str {
    match value {
        None => "nothing",
        Some(Value::Null) => "null",
        Some(Value::Bool(_)) => "a boolean",
        Some(Value::Number(_)) => "a number",
        Some(Value::String(_)) => "a string",
        Some(Value::Array(_)) => "an array",
        Some(Value::Object(_)) => "an object",
    }
}

fn string_list<'a>(
    method: &str,
    value: Option<&'a Value>,
) -> Result<Vec<&'a str>, InvocationError> {
    let Some(Value::Array(items)) = value else {
        return Err(invalid(
            method,
            format!("expected an array of strings, got {}", describe(value)),
        ));
    };

    items
        .iter()
        .enumerate()
        .map(|(position, item)| {
            item.as_str().ok_or_else(|| {
                invalid(
                    method,
                    format!("item {position} is {}, expected a string", describe(Some(item))),
                )
            })
        })
        .collect()
}

fn precision(value: Option<&Value>) -> Result<Option<usize>, InvocationError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|p| usize::try_from(p).ok())
            .filter(|p| *p <= 16)
            .map(Some)
            .ok_or_else(|| {
                invalid(
                    ExpressionService::CALCULATE_RESULTS,
                    format!("precision must be an integer between 0 and 16, got {n}"),
                )
            }),
        other => Err(invalid(
            ExpressionService::CALCULATE_RESULTS,
            format!("precision must be a number, got {}", describe(other)),
        )),
    }
}
