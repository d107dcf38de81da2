//! 自定义断言和表达式条件的脚本钩子。
//!
//! 引擎本身不内置脚本语言，由宿主程序注入 [`ScriptEvaluator`]。

use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::http::ResponseRecord;
use crate::variable::VariableScope;

/// 脚本执行时可见的上下文
#[derive(Debug, Clone, Copy)]
pub struct ScriptContext<'a> {
    /// 当前（或最近一次）响应，链中第一个步骤之前没有响应
    pub response: Option<&'a ResponseRecord>,
    pub variables: &'a VariableScope,
}

/// 脚本返回值：布尔值，或者带详情的判定
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptOutcome {
    Bool(bool),
    Verdict {
        passed: bool,
        actual: Option<String>,
        error: Option<String>,
    },
}

impl ScriptOutcome {
    pub fn passed(&self) -> bool {
        match self {
            ScriptOutcome::Bool(b) => *b,
            ScriptOutcome::Verdict { passed, .. } => *passed,
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct ScriptError(pub String);

pub trait ScriptEvaluator: Send + Sync {
    fn evaluate(&self, script: &str, context: &ScriptContext<'_>) -> Result<ScriptOutcome, ScriptError>;
}

/// 调用注入的求值器，panic 也会被转换为 ScriptError
pub fn invoke(
    evaluator: &dyn ScriptEvaluator,
    script: &str,
    context: &ScriptContext<'_>,
) -> Result<ScriptOutcome, ScriptError> {
    match catch_unwind(AssertUnwindSafe(|| evaluator.evaluate(script, context))) {
        Ok(result) => result,
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "script evaluator panicked".to_string());
            Err(ScriptError(message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct VariablePresent;

    impl ScriptEvaluator for VariablePresent {
        fn evaluate(&self, script: &str, context: &ScriptContext<'_>) -> Result<ScriptOutcome, ScriptError> {
            Ok(ScriptOutcome::Bool(context.variables.get(script).is_some()))
        }
    }

    struct Panicking;

    impl ScriptEvaluator for Panicking {
        fn evaluate(&self, _: &str, _: &ScriptContext<'_>) -> Result<ScriptOutcome, ScriptError> {
            panic!("boom")
        }
    }

    #[test]
    fn test_invoke_evaluator() {
        let mut scope = VariableScope::new();
        scope.insert("token", "abc");
        let ctx = ScriptContext {
            response: None,
            variables: &scope,
        };

        assert!(invoke(&VariablePresent, "token", &ctx).unwrap().passed());
        assert!(!invoke(&VariablePresent, "missing", &ctx).unwrap().passed());
    }

    #[test]
    fn test_panic_is_converted() {
        let scope = VariableScope::new();
        let ctx = ScriptContext {
            response: None,
            variables: &scope,
        };

        let err = invoke(&Panicking, "anything", &ctx).unwrap_err();
        assert_eq!(err.0, "boom");
    }

    #[test]
    fn test_verdict_passed() {
        let outcome = ScriptOutcome::Verdict {
            passed: false,
            actual: Some("3".to_string()),
            error: Some("expected 4".to_string()),
        };
        assert!(!outcome.passed());
    }
}
