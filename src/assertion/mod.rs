/// 断言模块 - 提供 API 响应断言能力
mod evaluator;
pub mod path;
mod schema;
mod script;
mod types;

pub use evaluator::{AssertionEvaluator, evaluate_assertion};
pub use schema::{SchemaValidator, StructuralSchemaValidator};
pub use script::{ScriptContext, ScriptError, ScriptEvaluator, ScriptOutcome, invoke as invoke_script};
pub use types::{
    AssertError, Assertion, AssertionResult, HeaderCondition, JsonPathCondition, StatusCondition,
    TimeCondition,
};
