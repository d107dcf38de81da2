use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

use crate::assertion::Assertion;
use crate::extraction::ExtractionRule;
use crate::http::Method;

/// Header / Query 参数模板，禁用的条目不会被发送
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    #[serde(default)]
    pub value: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            enabled: true,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

fn default_true() -> bool {
    true
}

/// API Key 的放置位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiKeyLocation {
    #[default]
    Header,
    Query,
}

/// 认证描述，所有字段都是模板
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AuthDescriptor {
    #[default]
    None,
    Bearer {
        token: String,
    },
    Basic {
        username: String,
        #[serde(default)]
        password: String,
    },
    ApiKey {
        key: String,
        value: String,
        #[serde(rename = "in", default)]
        location: ApiKeyLocation,
    },
}

/// 请求定义（未解析的模板）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDefinition {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub method: Method,

    pub url: String,

    #[serde(default)]
    pub headers: Vec<KeyValue>,

    #[serde(default, alias = "params")]
    pub query_params: Vec<KeyValue>,

    /// 结构化的 body 在加载时被序列化为文本
    #[serde(default, deserialize_with = "deserialize_body")]
    pub body: Option<String>,

    #[serde(default)]
    pub auth: AuthDescriptor,
}

impl RequestDefinition {
    pub fn new(id: impl Into<String>, method: Method, url: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            method,
            url: url.into(),
            headers: Vec::new(),
            query_params: Vec::new(),
            body: None,
            auth: AuthDescriptor::None,
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(KeyValue::new(key, value));
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.push(KeyValue::new(key, value));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_auth(mut self, auth: AuthDescriptor) -> Self {
        self.auth = auth;
        self
    }
}

fn deserialize_body<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// 请求集合
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub requests: Vec<RequestDefinition>,
}

/// 步骤的执行条件
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StepCondition {
    #[default]
    Always,
    /// 上一步成功时才执行
    OnSuccess,
    /// 上一步失败时才执行
    OnFailure,
    /// 交给脚本求值器判断
    Expression { expression: String },
}

impl StepCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepCondition::Always => "always",
            StepCondition::OnSuccess => "onSuccess",
            StepCondition::OnFailure => "onFailure",
            StepCondition::Expression { .. } => "expression",
        }
    }
}

/// 测试链中的一个步骤
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainStep {
    pub id: String,

    #[serde(default)]
    pub name: String,

    pub request_id: String,

    #[serde(default)]
    pub extractions: Vec<ExtractionRule>,

    #[serde(default)]
    pub assertions: Vec<Assertion>,

    #[serde(default)]
    pub condition: StepCondition,
}

impl ChainStep {
    pub fn new(id: impl Into<String>, request_id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            request_id: request_id.into(),
            extractions: Vec::new(),
            assertions: Vec::new(),
            condition: StepCondition::Always,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_extraction(mut self, rule: ExtractionRule) -> Self {
        self.extractions.push(rule);
        self
    }

    pub fn with_assertion(mut self, assertion: Assertion) -> Self {
        self.assertions.push(assertion);
        self
    }

    pub fn with_condition(mut self, condition: StepCondition) -> Self {
        self.condition = condition;
        self
    }
}

/// 测试链：有序步骤 + 链级变量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestChain {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub steps: Vec<ChainStep>,

    #[serde(default)]
    pub variables: HashMap<String, String>,
}

impl TestChain {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            steps: Vec::new(),
            variables: HashMap::new(),
        }
    }

    pub fn with_step(mut self, step: ChainStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }
}
