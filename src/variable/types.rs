use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// 脱敏后显示的占位值
pub const SECRET_MASK: &str = "******";

/// 变量作用域，一次链运行独占一个实例
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableScope {
    /// 变量映射表
    variables: HashMap<String, String>,

    /// 标记为 secret 的变量名，仅影响展示
    secrets: HashSet<String>,
}

impl VariableScope {
    /// 创建新的空作用域
    pub fn new() -> Self {
        Self::default()
    }

    /// 用环境变量和链声明变量构建初始作用域，后写入者覆盖前者
    pub fn seed(environment: Option<&Environment>, chain_variables: &HashMap<String, String>) -> Self {
        let mut scope = Self::new();

        if let Some(env) = environment {
            for var in env.variables.iter().filter(|v| v.enabled) {
                scope.insert(var.key.clone(), var.value.clone());
                if var.secret {
                    scope.secrets.insert(var.key.clone());
                }
            }
        }

        for (key, value) in chain_variables {
            scope.insert(key.clone(), value.clone());
        }

        scope
    }

    /// 插入变量
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(key.into(), value.into());
    }

    /// 获取变量值
    pub fn get(&self, key: &str) -> Option<&str> {
        self.variables.get(key).map(|s| s.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.variables.contains_key(key)
    }

    /// 所有 secret 变量名
    pub fn secret_keys(&self) -> BTreeSet<String> {
        self.secrets.iter().cloned().collect()
    }

    /// 变量数量
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// 按 key 排序的快照
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.variables
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// 用于展示的快照，secret 变量被遮盖
    pub fn masked_snapshot(&self) -> BTreeMap<String, String> {
        self.variables
            .iter()
            .map(|(k, v)| {
                let shown = if self.secrets.contains(k) {
                    SECRET_MASK.to_string()
                } else {
                    v.clone()
                };
                (k.clone(), shown)
            })
            .collect()
    }
}

/// 把文本中出现的 secret 变量值替换为遮盖值，长值优先
pub fn mask_secrets(text: &str, variables: &BTreeMap<String, String>, secret_keys: &BTreeSet<String>) -> String {
    let mut values: Vec<&str> = secret_keys
        .iter()
        .filter_map(|key| variables.get(key))
        .map(String::as_str)
        .filter(|value| !value.is_empty())
        .collect();
    values.sort_by_key(|value| std::cmp::Reverse(value.len()));

    values
        .into_iter()
        .fold(text.to_string(), |masked, value| masked.replace(value, SECRET_MASK))
}

/// 环境中的单个变量
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentVariable {
    pub key: String,
    pub value: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub secret: bool,
}

impl EnvironmentVariable {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            enabled: true,
            secret: false,
        }
    }

    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

fn default_true() -> bool {
    true
}

/// 环境：一组具名变量，运行时只读
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Environment {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub variables: Vec<EnvironmentVariable>,
}

impl Environment {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            variables: Vec::new(),
        }
    }

    pub fn with_variable(mut self, variable: EnvironmentVariable) -> Self {
        self.variables.push(variable);
        self
    }

    /// 获取启用状态下的变量值
    pub fn get(&self, key: &str) -> Option<&str> {
        self.variables
            .iter()
            .rev()
            .find(|v| v.enabled && v.key == key)
            .map(|v| v.value.as_str())
    }
}
