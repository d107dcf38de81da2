use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::runner::{ChainOutcome, ChainRunResult, StepOutcome, StepResult};
use crate::variable::mask_secrets;

/// 历史记录条目：一次链运行的摘要
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// 唯一 ID (UUID)
    pub id: String,

    /// 运行时间
    pub timestamp: DateTime<Utc>,

    pub chain_id: String,

    pub chain_name: String,

    /// 使用的环境名称
    #[serde(default)]
    pub environment: Option<String>,

    pub outcome: ChainOutcome,

    /// 运行耗时 (毫秒)
    pub duration_ms: u64,

    /// 步骤快照 (不包含 body 和变量值，节省空间)
    #[serde(default)]
    pub steps: Vec<StepSnapshot>,
}

/// 步骤快照
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepSnapshot {
    pub id: String,
    pub name: String,
    pub outcome: StepOutcome,
    pub method: Option<String>,
    pub url: Option<String>,
    /// 响应状态码，传输失败时为 0
    pub status: Option<u16>,
    pub duration_ms: u64,
    pub assertions_passed: usize,
    pub assertions_total: usize,
    #[serde(default)]
    pub error: Option<String>,
}

impl StepSnapshot {
    /// URL 中出现的 secret 值会被遮盖后再落盘
    pub fn from_step(step: &StepResult, secret_keys: &BTreeSet<String>) -> Self {
        Self {
            id: step.step_id.clone(),
            name: step.display_name().to_string(),
            outcome: step.outcome,
            method: step.request.as_ref().map(|r| r.method.to_string()),
            url: step
                .request
                .as_ref()
                .map(|r| mask_secrets(&r.url, &step.scope, secret_keys)),
            status: step.response.as_ref().map(|r| r.status_code()),
            duration_ms: step.duration.as_millis() as u64,
            assertions_passed: step.passed_assertions(),
            assertions_total: step.assertions.len(),
            error: step.error.clone(),
        }
    }
}

impl HistoryEntry {
    pub fn from_run(id: String, timestamp: DateTime<Utc>, run: &ChainRunResult) -> Self {
        Self {
            id,
            timestamp,
            chain_id: run.chain_id.clone(),
            chain_name: run.chain_name.clone(),
            environment: run.environment.clone(),
            outcome: run.outcome,
            duration_ms: run.duration.as_millis() as u64,
            steps: run
                .steps
                .iter()
                .map(|step| StepSnapshot::from_step(step, &run.secret_keys))
                .collect(),
        }
    }

    pub fn count(&self, outcome: StepOutcome) -> usize {
        self.steps.iter().filter(|s| s.outcome == outcome).count()
    }
}
