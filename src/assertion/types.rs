use serde::{Deserialize, Serialize};
use std::fmt;

/// 断言错误类型
///
/// 只在求值内部流转，最终都会被转换为失败的 AssertionResult
#[derive(Debug, thiserror::Error)]
pub enum AssertError {
    #[error("Invalid expected value: {0}")]
    InvalidExpected(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("header not found: {0}")]
    HeaderNotFound(String),

    #[error("Response body is not valid JSON")]
    BodyNotJson,

    #[error("Invalid regular expression: {0}")]
    InvalidRegex(#[from] regex::Error),

    #[error("Script error: {0}")]
    Script(String),
}

/// 断言定义，每种类型只携带自己求值需要的字段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Assertion {
    /// 状态码断言，`in` 条件的期望值为逗号分隔列表
    Status {
        condition: StatusCondition,
        expected: String,
    },

    /// 响应时间（毫秒）
    #[serde(rename_all = "camelCase")]
    ResponseTime {
        condition: TimeCondition,
        expected: String,
    },

    /// 响应 Header，名称大小写不敏感
    #[serde(rename_all = "camelCase")]
    Header {
        header_name: String,
        condition: HeaderCondition,
        #[serde(default)]
        expected: String,
    },

    /// JSON body 路径断言
    #[serde(rename_all = "camelCase")]
    JsonPath {
        path: String,
        condition: JsonPathCondition,
        #[serde(default)]
        expected: String,
    },

    /// 结构校验
    Schema { schema: serde_json::Value },

    /// 路径处值的运行时类型
    #[serde(rename_all = "camelCase")]
    DataType {
        #[serde(default)]
        path: String,
        expected: String,
    },

    /// 交给外部注入的脚本求值器
    Custom { script: String },
}

impl Assertion {
    pub fn type_name(&self) -> &'static str {
        match self {
            Assertion::Status { .. } => "status",
            Assertion::ResponseTime { .. } => "responseTime",
            Assertion::Header { .. } => "header",
            Assertion::JsonPath { .. } => "jsonPath",
            Assertion::Schema { .. } => "schema",
            Assertion::DataType { .. } => "dataType",
            Assertion::Custom { .. } => "custom",
        }
    }

    /// 期望描述，用于报告
    pub fn expected_description(&self) -> String {
        match self {
            Assertion::Status { condition, expected } => format!("{} {}", condition, expected),
            Assertion::ResponseTime { condition, expected } => {
                format!("{} {}ms", condition, expected)
            }
            Assertion::Header {
                condition, expected, ..
            } => describe_expected(condition.as_str(), condition.takes_value(), expected),
            Assertion::JsonPath {
                condition, expected, ..
            } => describe_expected(condition.as_str(), condition.takes_value(), expected),
            Assertion::Schema { .. } => "matches schema".to_string(),
            Assertion::DataType { expected, .. } => format!("type {}", expected),
            Assertion::Custom { .. } => "custom script passes".to_string(),
        }
    }
}

fn describe_expected(condition: &str, takes_value: bool, expected: &str) -> String {
    if takes_value {
        format!("{} {}", condition, expected)
    } else {
        condition.to_string()
    }
}

impl fmt::Display for Assertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Assertion::Status { .. } => write!(f, "status {}", self.expected_description()),
            Assertion::ResponseTime { .. } => {
                write!(f, "response time {}", self.expected_description())
            }
            Assertion::Header { header_name, .. } => {
                write!(f, "header {} {}", header_name, self.expected_description())
            }
            Assertion::JsonPath { path, .. } => {
                write!(f, "body.{} {}", path, self.expected_description())
            }
            Assertion::Schema { .. } => write!(f, "body matches schema"),
            Assertion::DataType { path, expected } => {
                let target = if path.trim().is_empty() { "body" } else { path.as_str() };
                write!(f, "{} is {}", target, expected)
            }
            Assertion::Custom { script } => write!(f, "custom: {}", script),
        }
    }
}

macro_rules! condition_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal, $takes:literal;)+ }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase")]
        pub enum $name {
            $($variant,)+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }

            /// 该条件是否需要期望值
            pub fn takes_value(&self) -> bool {
                match self {
                    $(Self::$variant => $takes,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

condition_enum!(
    /// status 断言支持的条件
    StatusCondition {
        Equals => "equals", true;
        NotEquals => "notEquals", true;
        GreaterThan => "greaterThan", true;
        LessThan => "lessThan", true;
        In => "in", true;
    }
);

condition_enum!(
    /// responseTime 断言支持的条件
    TimeCondition {
        LessThan => "lessThan", true;
        GreaterThan => "greaterThan", true;
    }
);

condition_enum!(
    /// header 断言支持的条件
    HeaderCondition {
        Exists => "exists", false;
        NotExists => "notExists", false;
        Equals => "equals", true;
        NotEquals => "notEquals", true;
        Contains => "contains", true;
        NotContains => "notContains", true;
        In => "in", true;
    }
);

condition_enum!(
    /// jsonPath 断言支持的条件
    JsonPathCondition {
        Exists => "exists", false;
        NotExists => "notExists", false;
        Equals => "equals", true;
        NotEquals => "notEquals", true;
        Contains => "contains", true;
        NotContains => "notContains", true;
        In => "in", true;
        Matches => "matches", true;
    }
);

/// 断言结果：求值产生的新值，不修改断言定义
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssertionResult {
    /// 断言的可读描述
    pub description: String,

    /// 断言类型名
    pub kind: &'static str,

    /// 是否通过
    pub passed: bool,

    /// 实际值（字符串表示）
    pub actual: Option<String>,

    /// 期望描述
    pub expected: String,

    /// 失败原因；失败的断言总是带有非空的错误信息
    pub error: Option<String>,
}

impl AssertionResult {
    /// 创建成功的断言结果
    pub fn success(assertion: &Assertion, actual: Option<String>) -> Self {
        Self {
            description: assertion.to_string(),
            kind: assertion.type_name(),
            passed: true,
            actual,
            expected: assertion.expected_description(),
            error: None,
        }
    }

    /// 创建失败的断言结果
    pub fn failure(assertion: &Assertion, actual: Option<String>, message: impl Into<String>) -> Self {
        let mut message = message.into();
        if message.trim().is_empty() {
            message = format!("assertion '{}' failed", assertion);
        }
        Self {
            description: assertion.to_string(),
            kind: assertion.type_name(),
            passed: false,
            actual,
            expected: assertion.expected_description(),
            error: Some(message),
        }
    }

    /// 创建错误的断言结果（求值过程出错）
    pub fn error(assertion: &Assertion, error: AssertError) -> Self {
        Self::failure(assertion, None, error.to_string())
    }
}
