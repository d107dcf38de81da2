use crate::assertion::AssertionResult;
use crate::chain::ChainStep;
use crate::extraction::ExtractionRecord;
use crate::http::{ResolvedRequest, ResponseRecord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// 步骤的最终状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepOutcome {
    Succeeded,
    Failed,
    Skipped,
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StepOutcome::Succeeded => "succeeded",
            StepOutcome::Failed => "failed",
            StepOutcome::Skipped => "skipped",
        };
        f.write_str(text)
    }
}

/// 单个步骤的执行结果
#[derive(Debug, Clone)]
pub struct StepResult {
    pub step_id: String,

    pub step_name: String,

    pub request_id: String,

    pub outcome: StepOutcome,

    /// 解析后实际发送的请求，跳过或配置错误时为 None
    pub request: Option<ResolvedRequest>,

    /// 收到的响应（传输失败时为 status = 0 的占位响应）
    pub response: Option<Arc<ResponseRecord>>,

    /// 断言结果列表
    pub assertions: Vec<AssertionResult>,

    /// 提取记录
    pub extractions: Vec<ExtractionRecord>,

    /// 步骤结束后的作用域快照（未脱敏）
    pub scope: BTreeMap<String, String>,

    /// 失败原因（传输错误、提取未命中、配置错误）
    pub error: Option<String>,

    /// 跳过原因
    pub skip_reason: Option<String>,

    pub duration: Duration,
}

impl StepResult {
    fn bare(step: &ChainStep, outcome: StepOutcome, scope: BTreeMap<String, String>) -> Self {
        Self {
            step_id: step.id.clone(),
            step_name: step.name.clone(),
            request_id: step.request_id.clone(),
            outcome,
            request: None,
            response: None,
            assertions: Vec::new(),
            extractions: Vec::new(),
            scope,
            error: None,
            skip_reason: None,
            duration: Duration::ZERO,
        }
    }

    pub fn skipped(step: &ChainStep, reason: impl Into<String>, scope: BTreeMap<String, String>) -> Self {
        Self {
            skip_reason: Some(reason.into()),
            ..Self::bare(step, StepOutcome::Skipped, scope)
        }
    }

    /// 步骤引用的请求不存在
    pub fn configuration_error(
        step: &ChainStep,
        message: impl Into<String>,
        scope: BTreeMap<String, String>,
    ) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::bare(step, StepOutcome::Failed, scope)
        }
    }

    /// 显示名称，name 为空时退回 id
    pub fn display_name(&self) -> &str {
        if self.step_name.trim().is_empty() {
            &self.step_id
        } else {
            &self.step_name
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == StepOutcome::Succeeded
    }

    pub fn passed_assertions(&self) -> usize {
        self.assertions.iter().filter(|a| a.passed).count()
    }
}

/// 链的最终状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainOutcome {
    Completed,
    Aborted,
}

impl fmt::Display for ChainOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainOutcome::Completed => f.write_str("completed"),
            ChainOutcome::Aborted => f.write_str("aborted"),
        }
    }
}

/// 中止原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    /// 步骤引用了不存在的请求
    Configuration { step_id: String, request_id: String },
    /// 调用方取消
    Cancelled,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::Configuration {
                step_id,
                request_id,
            } => write!(f, "step '{}' references unknown request '{}'", step_id, request_id),
            AbortReason::Cancelled => f.write_str("run cancelled"),
        }
    }
}

/// 一次链运行的完整结果
#[derive(Debug, Clone)]
pub struct ChainRunResult {
    pub chain_id: String,
    pub chain_name: String,
    /// 使用的环境名称
    pub environment: Option<String>,
    pub outcome: ChainOutcome,
    pub abort_reason: Option<AbortReason>,
    /// 按声明顺序排列的步骤结果
    pub steps: Vec<StepResult>,
    /// 运行结束时的作用域快照（未脱敏）
    pub variables: BTreeMap<String, String>,
    /// 需要在展示时遮盖的变量名
    pub secret_keys: BTreeSet<String>,
    pub duration: Duration,
}

impl ChainRunResult {
    pub fn summary(&self) -> ChainSummary {
        ChainSummary::from_results(&self.steps)
    }

    pub fn is_aborted(&self) -> bool {
        self.outcome == ChainOutcome::Aborted
    }

    /// 链完成且没有失败的步骤
    pub fn all_passed(&self) -> bool {
        !self.is_aborted() && self.steps.iter().all(|s| s.outcome != StepOutcome::Failed)
    }
}

/// 测试摘要
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    #[serde(skip)]
    pub total_duration: Duration,
    pub total_assertions: usize,
    pub passed_assertions: usize,
    pub failed_assertions: usize,
}

impl ChainSummary {
    pub fn from_results(results: &[StepResult]) -> Self {
        let count = |outcome: StepOutcome| results.iter().filter(|r| r.outcome == outcome).count();

        let total_assertions = results.iter().map(|r| r.assertions.len()).sum();
        let passed_assertions = results.iter().map(StepResult::passed_assertions).sum();

        Self {
            total: results.len(),
            passed: count(StepOutcome::Succeeded),
            failed: count(StepOutcome::Failed),
            skipped: count(StepOutcome::Skipped),
            total_duration: results.iter().map(|r| r.duration).sum(),
            total_assertions,
            passed_assertions,
            failed_assertions: total_assertions - passed_assertions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assertion::{Assertion, StatusCondition};

    fn step(id: &str) -> ChainStep {
        ChainStep::new(id, "req")
    }

    #[test]
    fn test_summary_counts() {
        let assertion = Assertion::Status {
            condition: StatusCondition::Equals,
            expected: "200".to_string(),
        };
        let mut ok = StepResult::skipped(&step("a"), "x", BTreeMap::new());
        ok.outcome = StepOutcome::Succeeded;
        ok.duration = Duration::from_millis(100);
        ok.assertions = vec![
            AssertionResult::success(&assertion, Some("200".to_string())),
            AssertionResult::failure(&assertion, Some("500".to_string()), "mismatch"),
        ];

        let mut failed = StepResult::configuration_error(&step("b"), "unknown request", BTreeMap::new());
        failed.duration = Duration::from_millis(200);

        let skipped = StepResult::skipped(&step("c"), "previous step failed", BTreeMap::new());

        let summary = ChainSummary::from_results(&[ok, failed, skipped]);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.total_assertions, 2);
        assert_eq!(summary.passed_assertions, 1);
        assert_eq!(summary.failed_assertions, 1);
        assert_eq!(summary.total_duration, Duration::from_millis(300));
    }

    #[test]
    fn test_display_name_falls_back_to_id() {
        let result = StepResult::skipped(&step("s1").with_name(""), "x", BTreeMap::new());
        assert_eq!(result.display_name(), "s1");
    }
}
