use async_trait::async_trait;
use chainpost::ChainpostError;
use chainpost::assertion::{
    Assertion, ScriptContext, ScriptError, ScriptEvaluator, ScriptOutcome, StatusCondition,
};
use chainpost::chain::{ChainStep, RequestCatalog, RequestDefinition, StepCondition, TestChain};
use chainpost::extraction::{ExtractionRule, MissPolicy};
use chainpost::http::{Method, RequestExecutor, ResolvedRequest, ResponseRecord, TransportError};
use chainpost::runner::{AbortReason, CancelFlag, ChainOutcome, ChainRunner, StepOutcome};
use chainpost::variable::{Environment, EnvironmentVariable};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const BASE: &str = "http://api.test";

/// 内存中的执行器：按 URL 返回预设响应，未知 URL 视为连接失败
#[derive(Default)]
struct ScriptedExecutor {
    routes: HashMap<String, (u16, String)>,
    calls: Mutex<Vec<ResolvedRequest>>,
    counter: AtomicUsize,
    cancel_after_first: Option<CancelFlag>,
}

impl ScriptedExecutor {
    fn route(mut self, path: &str, status: u16, body: &str) -> Self {
        self.routes
            .insert(format!("{}{}", BASE, path), (status, body.to_string()));
        self
    }

    fn calls(&self) -> Vec<ResolvedRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RequestExecutor for ScriptedExecutor {
    async fn execute(
        &self,
        request: &ResolvedRequest,
        _environment: Option<&Environment>,
    ) -> Result<ResponseRecord, TransportError> {
        self.calls.lock().unwrap().push(request.clone());
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        if n == 0
            && let Some(flag) = &self.cancel_after_first
        {
            flag.cancel();
        }

        match self.routes.get(&request.url) {
            Some((status, body)) => Ok(ResponseRecord::new(
                *status,
                "",
                vec![("Content-Type".to_string(), "application/json".to_string())],
                body.clone(),
                Duration::from_millis(3),
            )),
            None => Err(TransportError::Connect(format!("connection refused: {}", request.url))),
        }
    }
}

fn status_is(code: &str) -> Assertion {
    Assertion::Status {
        condition: StatusCondition::Equals,
        expected: code.to_string(),
    }
}

fn catalog(ids: &[(&str, &str)]) -> RequestCatalog {
    ids.iter()
        .map(|(id, url)| (id.to_string(), RequestDefinition::new(*id, Method::Get, *url)))
        .collect()
}

fn runner(executor: Arc<ScriptedExecutor>) -> ChainRunner {
    ChainRunner::new(executor)
}

#[tokio::test]
async fn test_on_failure_step_skipped_after_success() {
    let executor = Arc::new(ScriptedExecutor::default().route("/ok", 200, "{}"));
    let catalog = catalog(&[("ok", "{{base}}/ok")]);
    let chain = TestChain::new("c", "on failure")
        .with_variable("base", BASE)
        .with_step(ChainStep::new("s1", "ok").with_assertion(status_is("200")))
        .with_step(ChainStep::new("s2", "ok").with_condition(StepCondition::OnFailure))
        .with_step(ChainStep::new("s3", "ok"));

    let result = runner(executor.clone()).run(&chain, &catalog, None).await.unwrap();

    assert_eq!(result.outcome, ChainOutcome::Completed);
    let outcomes: Vec<_> = result.steps.iter().map(|s| s.outcome).collect();
    assert_eq!(
        outcomes,
        vec![StepOutcome::Succeeded, StepOutcome::Skipped, StepOutcome::Succeeded]
    );
    assert_eq!(executor.calls().len(), 2);
}

#[tokio::test]
async fn test_on_success_and_on_failure_follow_previous_outcome() {
    let executor = Arc::new(ScriptedExecutor::default().route("/fail", 500, "{}"));
    let catalog = catalog(&[("fail", "{{base}}/fail")]);
    let chain = TestChain::new("c", "conditions")
        .with_variable("base", BASE)
        .with_step(ChainStep::new("first", "fail").with_condition(StepCondition::OnSuccess))
        .with_step(ChainStep::new("s1", "fail").with_assertion(status_is("200")))
        .with_step(ChainStep::new("s2", "fail").with_condition(StepCondition::OnSuccess))
        .with_step(ChainStep::new("s3", "fail").with_condition(StepCondition::OnSuccess));

    let result = runner(executor).run(&chain, &catalog, None).await.unwrap();

    assert_eq!(result.steps[0].outcome, StepOutcome::Skipped);
    assert_eq!(result.steps[0].skip_reason.as_deref(), Some("no previous step"));
    assert_eq!(result.steps[1].outcome, StepOutcome::Failed);
    assert_eq!(result.steps[2].outcome, StepOutcome::Skipped);
    // 上一步是 Skipped，同样不满足 onSuccess
    assert_eq!(result.steps[3].outcome, StepOutcome::Skipped);
    assert_eq!(result.outcome, ChainOutcome::Completed);
}

#[tokio::test]
async fn test_unknown_request_aborts_chain() {
    let executor = Arc::new(ScriptedExecutor::default().route("/ok", 200, "{}"));
    let catalog = catalog(&[("ok", "http://api.test/ok")]);
    let chain = TestChain::new("c", "abort")
        .with_step(ChainStep::new("s1", "ok"))
        .with_step(ChainStep::new("s2", "ghost"))
        .with_step(ChainStep::new("s3", "ok"));

    let result = runner(executor.clone()).run(&chain, &catalog, None).await.unwrap();

    assert_eq!(result.outcome, ChainOutcome::Aborted);
    assert_eq!(result.steps.len(), 2);
    assert_eq!(result.steps[1].outcome, StepOutcome::Failed);
    assert!(result.steps[1].error.as_deref().unwrap().contains("ghost"));
    assert_eq!(
        result.abort_reason,
        Some(AbortReason::Configuration {
            step_id: "s2".to_string(),
            request_id: "ghost".to_string(),
        })
    );
    assert_eq!(executor.calls().len(), 1);
    assert!(!result.all_passed());
}

#[tokio::test]
async fn test_extraction_visible_to_later_steps_only() {
    let executor = Arc::new(
        ScriptedExecutor::default()
            .route("/login", 200, r#"{"data": {"token": "tok-1"}}"#)
            .route("/me", 200, r#"{"id": 7}"#),
    );
    let mut catalog = catalog(&[("me", "http://api.test/me")]);
    catalog.insert(
        "login".to_string(),
        RequestDefinition::new("login", Method::Post, "http://api.test/login").with_header("X-Token", "{{token}}"),
    );
    catalog.insert(
        "me".to_string(),
        RequestDefinition::new("me", Method::Get, "http://api.test/me").with_auth(
            chainpost::chain::AuthDescriptor::Bearer {
                token: "{{token}}".to_string(),
            },
        ),
    );

    let chain = TestChain::new("c", "extract")
        .with_step(
            ChainStep::new("login", "login").with_extraction(ExtractionRule::body("data.token", "token")),
        )
        .with_step(ChainStep::new("me", "me").with_extraction(ExtractionRule::body("id", "userId")));

    let result = runner(executor.clone()).run(&chain, &catalog, None).await.unwrap();
    let calls = executor.calls();

    // 步骤自己的提取对本步骤的请求不可见
    assert!(calls[0].headers.contains(&("X-Token".to_string(), "{{token}}".to_string())));
    assert!(calls[1].headers.contains(&("Authorization".to_string(), "Bearer tok-1".to_string())));

    assert_eq!(result.steps[0].scope.get("token").map(String::as_str), Some("tok-1"));
    assert!(!result.steps[0].scope.contains_key("userId"));
    assert_eq!(result.variables.get("userId").map(String::as_str), Some("7"));
}

#[tokio::test]
async fn test_sequential_runs_do_not_leak_variables() {
    let executor = Arc::new(ScriptedExecutor::default().route("/login", 200, r#"{"token": "abc"}"#));
    let catalog = catalog(&[("login", "http://api.test/login")]);
    let mut definition = catalog["login"].clone();
    definition.headers.push(chainpost::chain::KeyValue::new("X-Prev", "{{token}}"));
    let catalog: RequestCatalog = HashMap::from([("login".to_string(), definition)]);

    let chain = TestChain::new("c", "leak")
        .with_step(ChainStep::new("s1", "login").with_extraction(ExtractionRule::body("token", "token")));

    let runner = runner(executor.clone());
    let first = runner.run(&chain, &catalog, None).await.unwrap();
    let second = runner.run(&chain, &catalog, None).await.unwrap();

    assert_eq!(first.variables.get("token").map(String::as_str), Some("abc"));
    assert_eq!(second.variables.get("token").map(String::as_str), Some("abc"));

    let calls = executor.calls();
    assert_eq!(calls.len(), 2);
    for call in calls {
        assert!(call.headers.contains(&("X-Prev".to_string(), "{{token}}".to_string())));
    }
}

#[tokio::test]
async fn test_chain_variables_override_environment() {
    let executor = Arc::new(ScriptedExecutor::default().route("/v2/users", 200, "[]"));
    let catalog = catalog(&[("users", "{{base}}/{{version}}/users")]);
    let env = Environment::new("dev", "dev")
        .with_variable(EnvironmentVariable::new("base", BASE))
        .with_variable(EnvironmentVariable::new("version", "v1"));
    let chain = TestChain::new("c", "override")
        .with_variable("version", "v2")
        .with_step(ChainStep::new("s1", "users").with_assertion(status_is("200")));

    let result = runner(executor.clone()).run(&chain, &catalog, Some(&env)).await.unwrap();

    assert_eq!(executor.calls()[0].url, "http://api.test/v2/users");
    assert_eq!(result.steps[0].outcome, StepOutcome::Succeeded);
    assert_eq!(result.environment.as_deref(), Some("dev"));
}

#[tokio::test]
async fn test_transport_error_records_status_zero_and_continues() {
    let executor = Arc::new(ScriptedExecutor::default().route("/ok", 200, "{}"));
    let catalog = catalog(&[("down", "http://api.test/down"), ("ok", "http://api.test/ok")]);
    let chain = TestChain::new("c", "transport")
        .with_step(ChainStep::new("s1", "down").with_extraction(ExtractionRule::status("code")))
        .with_step(ChainStep::new("s2", "ok"));

    let result = runner(executor).run(&chain, &catalog, None).await.unwrap();

    let failed = &result.steps[0];
    assert_eq!(failed.outcome, StepOutcome::Failed);
    let response = failed.response.as_ref().unwrap();
    assert_eq!(response.status_code(), 0);
    assert!(response.error().unwrap().contains("connection refused"));
    assert!(failed.error.as_deref().unwrap().contains("connection refused"));
    assert_eq!(failed.scope.get("code").map(String::as_str), Some("0"));

    assert_eq!(result.steps[1].outcome, StepOutcome::Succeeded);
    assert_eq!(result.outcome, ChainOutcome::Completed);
}

#[tokio::test]
async fn test_step_without_assertions_succeeds() {
    let executor = Arc::new(ScriptedExecutor::default().route("/err", 503, ""));
    let catalog = catalog(&[("err", "http://api.test/err")]);
    let chain = TestChain::new("c", "no assertions").with_step(ChainStep::new("s1", "err"));

    let result = runner(executor).run(&chain, &catalog, None).await.unwrap();
    assert_eq!(result.steps[0].outcome, StepOutcome::Succeeded);
}

#[tokio::test]
async fn test_extraction_miss_policies() {
    let catalog = catalog(&[("ok", "http://api.test/ok")]);
    let chain = TestChain::new("c", "miss")
        .with_step(ChainStep::new("s1", "ok").with_extraction(ExtractionRule::body("missing.path", "value")));

    let executor = Arc::new(ScriptedExecutor::default().route("/ok", 200, r#"{"a": 1}"#));
    let soft = runner(executor).run(&chain, &catalog, None).await.unwrap();
    assert_eq!(soft.steps[0].outcome, StepOutcome::Succeeded);
    assert_eq!(soft.variables.get("value").map(String::as_str), Some(""));
    assert!(soft.steps[0].extractions[0].is_miss());

    let executor = Arc::new(ScriptedExecutor::default().route("/ok", 200, r#"{"a": 1}"#));
    let strict = runner(executor)
        .with_miss_policy(MissPolicy::Fail)
        .run(&chain, &catalog, None)
        .await
        .unwrap();
    assert_eq!(strict.steps[0].outcome, StepOutcome::Failed);
    assert!(!strict.variables.contains_key("value"));
    assert!(strict.steps[0].error.as_deref().unwrap().contains("missing.path"));
}

#[tokio::test]
async fn test_empty_chain_is_rejected() {
    let executor = Arc::new(ScriptedExecutor::default());
    let result = runner(executor.clone())
        .run(&TestChain::new("empty", "empty"), &RequestCatalog::new(), None)
        .await;

    assert!(matches!(result, Err(ChainpostError::EmptyChain(id)) if id == "empty"));
    assert!(executor.calls().is_empty());
}

#[tokio::test]
async fn test_cancel_between_steps() {
    let flag = CancelFlag::new();
    let executor = Arc::new(ScriptedExecutor {
        cancel_after_first: Some(flag.clone()),
        ..ScriptedExecutor::default().route("/ok", 200, "{}")
    });
    let catalog = catalog(&[("ok", "http://api.test/ok")]);
    let chain = TestChain::new("c", "cancel")
        .with_step(ChainStep::new("s1", "ok"))
        .with_step(ChainStep::new("s2", "ok"));

    let result = runner(executor.clone())
        .run_with_cancel(&chain, &catalog, None, &flag)
        .await
        .unwrap();

    // 进行中的请求会完成，下一步不会开始
    assert_eq!(result.outcome, ChainOutcome::Aborted);
    assert_eq!(result.abort_reason, Some(AbortReason::Cancelled));
    assert_eq!(result.steps.len(), 1);
    assert_eq!(executor.calls().len(), 1);
}

/// `name == value` 形式的表达式，比较作用域中的变量
struct EqualsExpression;

impl ScriptEvaluator for EqualsExpression {
    fn evaluate(&self, script: &str, context: &ScriptContext<'_>) -> Result<ScriptOutcome, ScriptError> {
        let (name, value) = script
            .split_once("==")
            .ok_or_else(|| ScriptError(format!("SyntaxError: {}", script)))?;
        Ok(ScriptOutcome::Bool(
            context.variables.get(name.trim()) == Some(value.trim()),
        ))
    }
}

#[tokio::test]
async fn test_expression_conditions() {
    let catalog = catalog(&[("ok", "http://api.test/ok")]);
    let expression = |text: &str| StepCondition::Expression {
        expression: text.to_string(),
    };
    let chain = TestChain::new("c", "expr")
        .with_variable("mode", "full")
        .with_step(ChainStep::new("s1", "ok").with_condition(expression("mode == full")))
        .with_step(ChainStep::new("s2", "ok").with_condition(expression("mode == quick")))
        .with_step(ChainStep::new("s3", "ok").with_condition(expression("broken")));

    let executor = Arc::new(ScriptedExecutor::default().route("/ok", 200, "{}"));
    let result = runner(executor)
        .with_script_evaluator(Arc::new(EqualsExpression))
        .run(&chain, &catalog, None)
        .await
        .unwrap();

    assert_eq!(result.steps[0].outcome, StepOutcome::Succeeded);
    assert_eq!(result.steps[1].outcome, StepOutcome::Skipped);
    assert_eq!(result.steps[2].outcome, StepOutcome::Skipped);
    assert!(result.steps[2].skip_reason.as_deref().unwrap().contains("SyntaxError"));

    // 没有脚本求值器时 expression 步骤被跳过
    let executor = Arc::new(ScriptedExecutor::default().route("/ok", 200, "{}"));
    let result = runner(executor).run(&chain, &catalog, None).await.unwrap();
    assert!(result.steps.iter().all(|s| s.outcome == StepOutcome::Skipped));
    assert_eq!(
        result.steps[0].skip_reason.as_deref(),
        Some("no script evaluator configured")
    );
}

#[tokio::test]
async fn test_concurrent_runs_have_isolated_scopes() {
    let executor = Arc::new(
        ScriptedExecutor::default()
            .route("/a/echo", 200, r#"{"who": "a"}"#)
            .route("/b/echo", 200, r#"{"who": "b"}"#),
    );
    let runner = Arc::new(runner(executor));
    let catalog = Arc::new(catalog(&[("echo", "http://api.test/{{tenant}}/echo")]));
    let chain = Arc::new(
        TestChain::new("c", "concurrent").with_step(
            ChainStep::new("s1", "echo")
                .with_extraction(ExtractionRule::body("who", "who"))
                .with_assertion(Assertion::JsonPath {
                    path: "who".to_string(),
                    condition: chainpost::assertion::JsonPathCondition::Exists,
                    expected: String::new(),
                }),
        ),
    );

    let mut handles = Vec::new();
    for tenant in ["a", "b", "a", "b"] {
        let runner = Arc::clone(&runner);
        let catalog = Arc::clone(&catalog);
        let chain = Arc::clone(&chain);
        handles.push(tokio::spawn(async move {
            let env = Environment::new(tenant, tenant).with_variable(EnvironmentVariable::new("tenant", tenant));
            let result = runner.run(&chain, &catalog, Some(&env)).await.unwrap();
            (tenant, result)
        }));
    }

    for handle in handles {
        let (tenant, result) = handle.await.unwrap();
        assert_eq!(result.variables.get("who").map(String::as_str), Some(tenant));
        assert!(result.all_passed());
    }
}
