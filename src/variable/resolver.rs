use crate::variable::types::VariableScope;
use regex::{Captures, Regex};
use std::sync::OnceLock;

/// 变量替换器
pub struct VariableResolver;

impl VariableResolver {
    fn placeholder_regex() -> &'static Regex {
        static VAR_REGEX: OnceLock<Regex> = OnceLock::new();
        VAR_REGEX.get_or_init(|| {
            Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_.\-]*)\s*\}\}").expect("valid placeholder regex")
        })
    }

    /// 替换文本中的所有 {{variable}} 占位符
    ///
    /// 只扫描一遍：替换进去的值不会再被展开，找不到的占位符原样保留
    pub fn resolve(text: &str, scope: &VariableScope) -> String {
        Self::placeholder_regex()
            .replace_all(text, |caps: &Captures| {
                let var_name = &caps[1];
                scope.get(var_name).unwrap_or(&caps[0]).to_string()
            })
            .into_owned()
    }

    /// 列出在当前作用域中无法解析的变量名（按出现顺序，去重）
    pub fn unresolved(text: &str, scope: &VariableScope) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for caps in Self::placeholder_regex().captures_iter(text) {
            let name = &caps[1];
            if !scope.contains(name) && !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        names
    }

    /// 解析并替换系统环境变量 ${VAR}，只在加载配置文件时使用
    pub fn resolve_env_vars(text: &str) -> String {
        static ENV_REGEX: OnceLock<Regex> = OnceLock::new();
        let re = ENV_REGEX
            .get_or_init(|| Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("valid env regex"));

        re.replace_all(text, |caps: &Captures| {
            let env_name = &caps[1];
            std::env::var(env_name).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
    }
}
