use std::collections::HashMap;
use std::sync::Arc;

use crate::http::ResponseRecord;
use crate::runner::types::{StepOutcome, StepResult};
use crate::variable::{Environment, VariableScope};

/// 一次链运行的状态
///
/// 步骤只通过引用读取它；记录步骤结果时按值推进到下一个状态。
#[derive(Debug, Clone)]
pub struct RunContext {
    scope: VariableScope,
    last_response: Option<Arc<ResponseRecord>>,
    steps: Vec<StepResult>,
}

impl RunContext {
    /// 环境变量在前，链变量覆盖
    pub fn seed(environment: Option<&Environment>, chain_variables: &HashMap<String, String>) -> Self {
        Self {
            scope: VariableScope::seed(environment, chain_variables),
            last_response: None,
            steps: Vec::new(),
        }
    }

    pub fn scope(&self) -> &VariableScope {
        &self.scope
    }

    /// 最近一次收到的响应
    pub fn last_response(&self) -> Option<&ResponseRecord> {
        self.last_response.as_deref()
    }

    /// 上一个步骤的状态，第一个步骤之前为 None
    pub fn previous_outcome(&self) -> Option<StepOutcome> {
        self.steps.last().map(|s| s.outcome)
    }

    pub fn steps(&self) -> &[StepResult] {
        &self.steps
    }

    /// 记录不改变作用域的步骤（跳过、配置错误）
    pub fn record(self, result: StepResult) -> Self {
        let scope = self.scope.clone();
        self.advance(result, scope)
    }

    /// 记录步骤结果并替换作用域
    pub fn advance(mut self, result: StepResult, scope: VariableScope) -> Self {
        if let Some(response) = &result.response {
            self.last_response = Some(Arc::clone(response));
        }
        self.steps.push(result);
        self.scope = scope;
        self
    }

    pub fn into_parts(self) -> (VariableScope, Vec<StepResult>) {
        (self.scope, self.steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainStep;
    use crate::variable::EnvironmentVariable;
    use std::time::Duration;

    #[test]
    fn test_seed_chain_variables_win() {
        let env = Environment::new("e", "dev")
            .with_variable(EnvironmentVariable::new("host", "env-host"))
            .with_variable(EnvironmentVariable::new("token", "t").disabled());
        let chain_vars = HashMap::from([("host".to_string(), "chain-host".to_string())]);

        let context = RunContext::seed(Some(&env), &chain_vars);
        assert_eq!(context.scope().get("host"), Some("chain-host"));
        assert_eq!(context.scope().get("token"), None);
        assert_eq!(context.previous_outcome(), None);
    }

    #[test]
    fn test_advance_tracks_last_response() {
        let context = RunContext::seed(None, &HashMap::new());
        let step = ChainStep::new("s1", "r1");

        let mut result = StepResult::skipped(&step, "x", Default::default());
        result.outcome = StepOutcome::Succeeded;
        result.response = Some(Arc::new(ResponseRecord::new(
            204,
            "No Content",
            Vec::new(),
            String::new(),
            Duration::ZERO,
        )));

        let mut scope = context.scope().clone();
        scope.insert("id", "1");
        let context = context.advance(result, scope);

        assert_eq!(context.last_response().map(|r| r.status_code()), Some(204));
        assert_eq!(context.scope().get("id"), Some("1"));

        // 跳过的步骤不会清掉最近的响应
        let context = context.record(StepResult::skipped(&ChainStep::new("s2", "r1"), "x", Default::default()));
        assert_eq!(context.previous_outcome(), Some(StepOutcome::Skipped));
        assert_eq!(context.last_response().map(|r| r.status_code()), Some(204));
        assert_eq!(context.steps().len(), 2);
    }
}
