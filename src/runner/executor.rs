use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::Result;
use crate::assertion::{
    AssertionEvaluator, SchemaValidator, ScriptContext, ScriptEvaluator, invoke_script,
};
use crate::chain::{ChainStep, RequestCatalog, RequestDefinition, StepCondition, TestChain};
use crate::error::ChainpostError;
use crate::extraction::{ExtractionRecord, MissPolicy, try_extract};
use crate::http::{RequestExecutor, ResponseRecord};
use crate::runner::context::RunContext;
use crate::runner::request::{render_request, unresolved_placeholders};
use crate::runner::types::{AbortReason, ChainOutcome, ChainRunResult, StepOutcome, StepResult};
use crate::variable::{Environment, VariableScope};

/// 协作式取消标记，只在步骤之间检查
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// 测试链编排器
///
/// 同一个实例可以被多个任务并发使用，每次运行持有自己的作用域。
#[derive(Clone)]
pub struct ChainRunner {
    executor: Arc<dyn RequestExecutor>,
    evaluator: AssertionEvaluator,
    miss_policy: MissPolicy,
}

impl ChainRunner {
    pub fn new(executor: Arc<dyn RequestExecutor>) -> Self {
        Self {
            executor,
            evaluator: AssertionEvaluator::new(),
            miss_policy: MissPolicy::default(),
        }
    }

    /// custom 断言和 expression 条件共用的脚本求值器
    pub fn with_script_evaluator(mut self, evaluator: Arc<dyn ScriptEvaluator>) -> Self {
        self.evaluator = self.evaluator.with_script_evaluator(evaluator);
        self
    }

    pub fn with_schema_validator(mut self, validator: Arc<dyn SchemaValidator>) -> Self {
        self.evaluator = self.evaluator.with_schema_validator(validator);
        self
    }

    pub fn with_miss_policy(mut self, policy: MissPolicy) -> Self {
        self.miss_policy = policy;
        self
    }

    /// 运行测试链
    ///
    /// 只有链没有任何步骤时返回错误，其余问题都记录在结果里
    pub async fn run(
        &self,
        chain: &TestChain,
        catalog: &RequestCatalog,
        environment: Option<&Environment>,
    ) -> Result<ChainRunResult> {
        self.run_with_cancel(chain, catalog, environment, &CancelFlag::new())
            .await
    }

    pub async fn run_with_cancel(
        &self,
        chain: &TestChain,
        catalog: &RequestCatalog,
        environment: Option<&Environment>,
        cancel: &CancelFlag,
    ) -> Result<ChainRunResult> {
        if chain.steps.is_empty() {
            return Err(ChainpostError::EmptyChain(chain.id.clone()));
        }

        let started = Instant::now();
        info!(
            "Running chain '{}' ({} steps, environment: {})",
            chain.name,
            chain.steps.len(),
            environment.map(|e| e.name.as_str()).unwrap_or("none")
        );

        let mut context = RunContext::seed(environment, &chain.variables);
        let mut abort_reason = None;

        for step in &chain.steps {
            if cancel.is_cancelled() {
                info!("Chain '{}' cancelled before step '{}'", chain.name, step.id);
                abort_reason = Some(AbortReason::Cancelled);
                break;
            }

            if let Some(reason) = self.skip_reason(step, &context) {
                info!("Step '{}' skipped: {}", step.id, reason);
                let result = StepResult::skipped(step, reason, context.scope().snapshot());
                context = context.record(result);
                continue;
            }

            let Some(definition) = catalog.get(&step.request_id) else {
                let reason = AbortReason::Configuration {
                    step_id: step.id.clone(),
                    request_id: step.request_id.clone(),
                };
                warn!("Aborting chain '{}': {}", chain.name, reason);
                let result =
                    StepResult::configuration_error(step, reason.to_string(), context.scope().snapshot());
                context = context.record(result);
                abort_reason = Some(reason);
                break;
            };

            let (result, scope) = self
                .execute_step(step, definition, &context, environment)
                .await;
            info!(
                "Step '{}' {} ({}ms)",
                step.id,
                result.outcome,
                result.duration.as_millis()
            );
            context = context.advance(result, scope);
        }

        let outcome = if abort_reason.is_some() {
            ChainOutcome::Aborted
        } else {
            ChainOutcome::Completed
        };
        let (scope, steps) = context.into_parts();

        info!("Chain '{}' {}", chain.name, outcome);

        Ok(ChainRunResult {
            chain_id: chain.id.clone(),
            chain_name: chain.name.clone(),
            environment: environment.map(|e| e.name.clone()),
            outcome,
            abort_reason,
            steps,
            variables: scope.snapshot(),
            secret_keys: scope.secret_keys(),
            duration: started.elapsed(),
        })
    }

    /// 步骤应当被跳过时返回原因
    fn skip_reason(&self, step: &ChainStep, context: &RunContext) -> Option<String> {
        match &step.condition {
            StepCondition::Always => None,
            StepCondition::OnSuccess => match context.previous_outcome() {
                Some(StepOutcome::Succeeded) => None,
                Some(outcome) => Some(format!("previous step {}", outcome)),
                None => Some("no previous step".to_string()),
            },
            StepCondition::OnFailure => match context.previous_outcome() {
                Some(StepOutcome::Failed) => None,
                Some(outcome) => Some(format!("previous step {}", outcome)),
                None => Some("no previous step".to_string()),
            },
            StepCondition::Expression { expression } => {
                let Some(evaluator) = self.evaluator.script_evaluator() else {
                    return Some("no script evaluator configured".to_string());
                };
                let script_context = ScriptContext {
                    response: context.last_response(),
                    variables: context.scope(),
                };
                match invoke_script(evaluator, expression, &script_context) {
                    Ok(outcome) if outcome.passed() => None,
                    Ok(_) => Some(format!("condition '{}' evaluated to false", expression)),
                    Err(e) => Some(format!("condition '{}' failed: {}", expression, e)),
                }
            }
        }
    }

    async fn execute_step(
        &self,
        step: &ChainStep,
        definition: &RequestDefinition,
        context: &RunContext,
        environment: Option<&Environment>,
    ) -> (StepResult, VariableScope) {
        let started = Instant::now();
        let scope = context.scope();

        let missing = unresolved_placeholders(definition, scope);
        if !missing.is_empty() {
            warn!(
                "Step '{}': unresolved variables left verbatim: {}",
                step.id,
                missing.join(", ")
            );
        }

        let request = render_request(definition, scope);
        debug!("Step '{}': {} {}", step.id, request.method, request.url);

        let response = match self.executor.execute(&request, environment).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Step '{}': transport error: {}", step.id, e);
                ResponseRecord::transport_error(e.to_string(), started.elapsed())
            }
        };
        let response = Arc::new(response);

        let mut next_scope = scope.clone();
        let mut extractions = Vec::with_capacity(step.extractions.len());
        let mut errors = Vec::new();

        if let Some(error) = response.error() {
            errors.push(error.to_string());
        }

        for rule in &step.extractions {
            let (value, miss) = match try_extract(rule, &response) {
                Ok(value) => (Some(value), None),
                Err(miss) => {
                    debug!("Step '{}': extraction miss: {}", step.id, miss);
                    match self.miss_policy {
                        MissPolicy::Empty => (Some(String::new()), Some(miss.to_string())),
                        MissPolicy::Fail => {
                            errors.push(format!(
                                "extraction of '{}' failed: {}",
                                rule.destination_variable, miss
                            ));
                            (None, Some(miss.to_string()))
                        }
                    }
                }
            };

            if let Some(value) = &value {
                next_scope.insert(rule.destination_variable.clone(), value.clone());
            }
            extractions.push(ExtractionRecord {
                variable: rule.destination_variable.clone(),
                source: rule.source,
                path: rule.path.clone(),
                value,
                miss,
            });
        }

        let assertions = self
            .evaluator
            .evaluate_all(&step.assertions, &response, &next_scope);

        let outcome = if errors.is_empty() && assertions.iter().all(|a| a.passed) {
            StepOutcome::Succeeded
        } else {
            StepOutcome::Failed
        };

        let result = StepResult {
            step_id: step.id.clone(),
            step_name: step.name.clone(),
            request_id: step.request_id.clone(),
            outcome,
            request: Some(request),
            response: Some(response),
            assertions,
            extractions,
            scope: next_scope.snapshot(),
            error: if errors.is_empty() {
                None
            } else {
                Some(errors.join("; "))
            },
            skip_reason: None,
            duration: started.elapsed(),
        };

        (result, next_scope)
    }
}
