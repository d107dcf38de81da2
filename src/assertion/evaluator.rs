use std::sync::Arc;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::assertion::path::{navigate, stringify};
use crate::assertion::schema::{SchemaValidator, StructuralSchemaValidator, matches_type_name, type_name};
use crate::assertion::script::{ScriptContext, ScriptEvaluator, ScriptOutcome, invoke};
use crate::assertion::types::{
    AssertError, Assertion, AssertionResult, HeaderCondition, JsonPathCondition, StatusCondition,
    TimeCondition,
};
use crate::http::ResponseRecord;
use crate::variable::VariableScope;

const DATA_TYPES: [&str; 7] = ["string", "number", "integer", "boolean", "array", "object", "null"];

/// 单个断言的判定
enum Verdict {
    Pass(Option<String>),
    Fail(Option<String>, String),
}

/// 断言求值器
///
/// 求值永远不会失败：所有内部错误都会变成 `passed = false` 的结果
#[derive(Clone)]
pub struct AssertionEvaluator {
    schema_validator: Arc<dyn SchemaValidator>,
    script_evaluator: Option<Arc<dyn ScriptEvaluator>>,
}

impl Default for AssertionEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl AssertionEvaluator {
    pub fn new() -> Self {
        Self {
            schema_validator: Arc::new(StructuralSchemaValidator),
            script_evaluator: None,
        }
    }

    pub fn with_schema_validator(mut self, validator: Arc<dyn SchemaValidator>) -> Self {
        self.schema_validator = validator;
        self
    }

    pub fn with_script_evaluator(mut self, evaluator: Arc<dyn ScriptEvaluator>) -> Self {
        self.script_evaluator = Some(evaluator);
        self
    }

    pub fn script_evaluator(&self) -> Option<&dyn ScriptEvaluator> {
        self.script_evaluator.as_deref()
    }

    /// 执行断言求值
    pub fn evaluate(
        &self,
        assertion: &Assertion,
        response: &ResponseRecord,
        variables: &VariableScope,
    ) -> AssertionResult {
        let verdict = match assertion {
            Assertion::Status {
                condition,
                expected,
            } => eval_status(*condition, expected, response),
            Assertion::ResponseTime {
                condition,
                expected,
            } => eval_response_time(*condition, expected, response),
            Assertion::Header {
                header_name,
                condition,
                expected,
            } => Ok(eval_header(header_name, *condition, expected, response)),
            Assertion::JsonPath {
                path,
                condition,
                expected,
            } => eval_json_path(path, *condition, expected, response),
            Assertion::Schema { schema } => self.eval_schema(schema, response),
            Assertion::DataType { path, expected } => eval_data_type(path, expected, response),
            Assertion::Custom { script } => self.eval_custom(script, response, variables),
        };

        let result = match verdict {
            Ok(Verdict::Pass(actual)) => AssertionResult::success(assertion, actual),
            Ok(Verdict::Fail(actual, message)) => AssertionResult::failure(assertion, actual, message),
            Err(e) => AssertionResult::error(assertion, e),
        };
        debug!(
            "assertion '{}' -> {}",
            result.description,
            if result.passed { "passed" } else { "failed" }
        );
        result
    }

    /// 对同一响应逐个求值，不短路
    pub fn evaluate_all(
        &self,
        assertions: &[Assertion],
        response: &ResponseRecord,
        variables: &VariableScope,
    ) -> Vec<AssertionResult> {
        assertions
            .iter()
            .map(|assertion| self.evaluate(assertion, response, variables))
            .collect()
    }

    fn eval_schema(&self, schema: &Value, response: &ResponseRecord) -> Result<Verdict, AssertError> {
        let body = response.json().ok_or(AssertError::BodyNotJson)?;
        let mismatches = self.schema_validator.validate(schema, body);
        if mismatches.is_empty() {
            Ok(Verdict::Pass(None))
        } else {
            Ok(Verdict::Fail(None, format!("schema mismatch: {}", mismatches.join("; "))))
        }
    }

    fn eval_custom(
        &self,
        script: &str,
        response: &ResponseRecord,
        variables: &VariableScope,
    ) -> Result<Verdict, AssertError> {
        let Some(evaluator) = self.script_evaluator.as_deref() else {
            return Ok(Verdict::Fail(None, "no script evaluator configured".to_string()));
        };

        let context = ScriptContext {
            response: Some(response),
            variables,
        };
        match invoke(evaluator, script, &context) {
            Ok(ScriptOutcome::Bool(true)) => Ok(Verdict::Pass(None)),
            Ok(ScriptOutcome::Bool(false)) => {
                Ok(Verdict::Fail(None, "custom script returned false".to_string()))
            }
            Ok(ScriptOutcome::Verdict {
                passed: true,
                actual,
                ..
            }) => Ok(Verdict::Pass(actual)),
            Ok(ScriptOutcome::Verdict {
                passed: false,
                actual,
                error,
            }) => Ok(Verdict::Fail(
                actual,
                error.unwrap_or_else(|| "custom script failed".to_string()),
            )),
            Err(e) => Err(AssertError::Script(e.0)),
        }
    }
}

/// 使用默认求值器（无脚本钩子、空变量作用域）执行断言
pub fn evaluate_assertion(assertion: &Assertion, response: &ResponseRecord) -> AssertionResult {
    AssertionEvaluator::new().evaluate(assertion, response, &VariableScope::new())
}

fn parse_number(expected: &str) -> Result<f64, AssertError> {
    expected
        .trim()
        .parse::<f64>()
        .map_err(|_| AssertError::InvalidExpected(format!("'{}' is not a number", expected)))
}

fn parse_number_list(expected: &str) -> Result<Vec<f64>, AssertError> {
    let items: Vec<&str> = expected
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if items.is_empty() {
        return Err(AssertError::InvalidExpected("empty list".to_string()));
    }
    items.into_iter().map(parse_number).collect()
}

/// `in` 条件的候选列表：JSON 数组或逗号分隔文本
fn parse_candidates(expected: &str) -> Vec<Value> {
    if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(expected) {
        return items;
    }
    expected
        .split(',')
        .map(|s| Value::String(s.trim().to_string()))
        .collect()
}

fn compare_numbers(actual: f64, expected: f64, greater: bool) -> bool {
    if greater { actual > expected } else { actual < expected }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

fn eval_status(
    condition: StatusCondition,
    expected: &str,
    response: &ResponseRecord,
) -> Result<Verdict, AssertError> {
    let code = response.status_code();
    let actual = code as f64;

    let passed = match condition {
        StatusCondition::In => parse_number_list(expected)?.contains(&actual),
        StatusCondition::Equals => actual == parse_number(expected)?,
        StatusCondition::NotEquals => actual != parse_number(expected)?,
        StatusCondition::GreaterThan => compare_numbers(actual, parse_number(expected)?, true),
        StatusCondition::LessThan => compare_numbers(actual, parse_number(expected)?, false),
    };

    let actual = code.to_string();
    if passed {
        Ok(Verdict::Pass(Some(actual)))
    } else {
        let message = format!("Expected status {} {}, but got {}", condition, expected.trim(), actual);
        Ok(Verdict::Fail(Some(actual), message))
    }
}

fn eval_response_time(
    condition: TimeCondition,
    expected: &str,
    response: &ResponseRecord,
) -> Result<Verdict, AssertError> {
    let limit = parse_number(expected)?;
    let elapsed = response.elapsed_ms() as f64;

    let passed = match condition {
        TimeCondition::LessThan => compare_numbers(elapsed, limit, false),
        TimeCondition::GreaterThan => compare_numbers(elapsed, limit, true),
    };

    let actual = format_number(elapsed);
    if passed {
        Ok(Verdict::Pass(Some(actual)))
    } else {
        let message = format!(
            "Expected response time {} {}ms, but got {}ms",
            condition,
            format_number(limit),
            actual
        );
        Ok(Verdict::Fail(Some(actual), message))
    }
}

fn eval_header(
    name: &str,
    condition: HeaderCondition,
    expected: &str,
    response: &ResponseRecord,
) -> Verdict {
    let Some(value) = response.header(name) else {
        return match condition {
            HeaderCondition::NotExists => Verdict::Pass(None),
            _ => Verdict::Fail(None, AssertError::HeaderNotFound(name.to_string()).to_string()),
        };
    };

    let expected_trimmed = expected.trim();
    let passed = match condition {
        HeaderCondition::Exists => true,
        HeaderCondition::NotExists => false,
        HeaderCondition::Equals => value == expected_trimmed,
        HeaderCondition::NotEquals => value != expected_trimmed,
        HeaderCondition::Contains => value.contains(expected_trimmed),
        HeaderCondition::NotContains => !value.contains(expected_trimmed),
        HeaderCondition::In => expected.split(',').map(str::trim).any(|c| c == value),
    };

    let actual = Some(value.to_string());
    if passed {
        Verdict::Pass(actual)
    } else if condition == HeaderCondition::NotExists {
        Verdict::Fail(actual, format!("Expected header {} to be absent", name))
    } else {
        Verdict::Fail(
            actual,
            format!(
                "Expected header {} {} {}, but got \"{}\"",
                name, condition, expected_trimmed, value
            ),
        )
    }
}

/// 实际值与期望文本是否相等：先比较字符串形式，再尝试按 JSON / 数字比较
fn json_equals(actual: &Value, expected: &str) -> bool {
    let expected = expected.trim();
    if stringify(actual) == expected {
        return true;
    }
    match serde_json::from_str::<Value>(expected) {
        Ok(parsed) => values_equal(actual, &parsed),
        Err(_) => false,
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::String(x), other) | (other, Value::String(x)) if !other.is_string() => {
            *x == stringify(other)
        }
        _ => a == b,
    }
}

fn json_contains(actual: &Value, expected: &str) -> bool {
    match actual {
        Value::Array(items) => items.iter().any(|item| json_equals(item, expected)),
        other => stringify(other).contains(expected.trim()),
    }
}

fn eval_json_path(
    path: &str,
    condition: JsonPathCondition,
    expected: &str,
    response: &ResponseRecord,
) -> Result<Verdict, AssertError> {
    let found = match response.json() {
        Some(body) => navigate(body, path)?,
        None => None,
    };

    let Some(actual) = found else {
        return Ok(match condition {
            JsonPathCondition::NotExists => Verdict::Pass(None),
            _ if response.json().is_none() => Verdict::Fail(None, AssertError::BodyNotJson.to_string()),
            _ => Verdict::Fail(None, AssertError::PathNotFound(path.to_string()).to_string()),
        });
    };

    let passed = match condition {
        JsonPathCondition::Exists => true,
        JsonPathCondition::NotExists => false,
        JsonPathCondition::Equals => json_equals(actual, expected),
        JsonPathCondition::NotEquals => !json_equals(actual, expected),
        JsonPathCondition::Contains => json_contains(actual, expected),
        JsonPathCondition::NotContains => !json_contains(actual, expected),
        JsonPathCondition::In => parse_candidates(expected)
            .iter()
            .any(|candidate| json_equals(actual, &stringify(candidate))),
        JsonPathCondition::Matches => Regex::new(expected)?.is_match(&stringify(actual)),
    };

    let actual_text = stringify(actual);
    if passed {
        Ok(Verdict::Pass(Some(actual_text)))
    } else if condition == JsonPathCondition::NotExists {
        Ok(Verdict::Fail(
            Some(actual_text),
            format!("Expected {} to not exist", path),
        ))
    } else {
        let message = format!(
            "Expected {} {} {}, but got {}",
            path,
            condition,
            expected.trim(),
            actual_text
        );
        Ok(Verdict::Fail(Some(actual_text), message))
    }
}

fn eval_data_type(path: &str, expected: &str, response: &ResponseRecord) -> Result<Verdict, AssertError> {
    let expected = expected.trim();
    if !DATA_TYPES.contains(&expected) {
        return Err(AssertError::InvalidExpected(format!(
            "unknown data type '{}', expected one of {}",
            expected,
            DATA_TYPES.join("|")
        )));
    }

    let body = response.json().ok_or(AssertError::BodyNotJson)?;
    let Some(value) = navigate(body, path)? else {
        return Ok(Verdict::Fail(
            None,
            AssertError::PathNotFound(path.to_string()).to_string(),
        ));
    };

    let actual = type_name(value).to_string();
    if matches_type_name(expected, value) {
        Ok(Verdict::Pass(Some(actual)))
    } else {
        let message = format!("Expected type {}, but got {}", expected, actual);
        Ok(Verdict::Fail(Some(actual), message))
    }
}
