use crate::{ChainpostError, Result};
use crate::extraction::MissPolicy;
use crate::variable::resolver::VariableResolver;
use crate::variable::types::{Environment, EnvironmentVariable};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// chainpost.toml 的完整内容
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ChainpostConfig {
    #[serde(default)]
    pub client: ClientConfig,

    #[serde(default)]
    pub run: RunConfig,

    /// 所有环境配置，变量按 key 排序以保证种子顺序稳定
    #[serde(default)]
    pub environments: HashMap<String, BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub extraction_miss: MissPolicy,

    #[serde(default = "default_history")]
    pub history: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            extraction_miss: MissPolicy::default(),
            history: default_history(),
        }
    }
}

fn default_history() -> bool {
    true
}

impl ChainpostConfig {
    /// 把指定的配置环境转换为 Environment，值中的 ${VAR} 会被系统环境变量替换
    pub fn environment(&self, env_name: &str) -> Option<Environment> {
        let vars = self.environments.get(env_name)?;
        let variables = vars
            .iter()
            .map(|(key, value)| {
                EnvironmentVariable::new(key.clone(), VariableResolver::resolve_env_vars(value))
            })
            .collect();

        Some(Environment {
            id: env_name.to_string(),
            name: env_name.to_string(),
            variables,
        })
    }
}

/// 配置文件加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 配置文件名
    const CONFIG_FILE: &'static str = "chainpost.toml";

    /// 从指定路径加载配置文件
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<ChainpostConfig> {
        let content = fs::read_to_string(path.as_ref())?;
        Ok(toml::from_str(&content)?)
    }

    /// 查找并加载配置文件
    /// 查找顺序：
    /// 1. 当前目录及其父目录
    /// 2. 用户配置目录 ~/.config/chainpost/
    ///
    /// 找到但无法解析的配置文件返回 `ConfigError`
    pub fn find_and_load() -> Result<Option<ChainpostConfig>> {
        if let Ok(current) = std::env::current_dir()
            && let Some(config) = Self::find_and_load_from(&current)?
        {
            return Ok(Some(config));
        }
        Self::try_load_from_user_dir()
    }

    /// 从 start 目录开始向上查找
    pub fn find_and_load_from(start: &Path) -> Result<Option<ChainpostConfig>> {
        let mut current = start.to_path_buf();

        loop {
            let config_path = current.join(Self::CONFIG_FILE);
            if config_path.exists() {
                return Self::load_discovered(&config_path).map(Some);
            }

            if !current.pop() {
                return Ok(None);
            }
        }
    }

    /// 尝试从用户配置目录加载
    fn try_load_from_user_dir() -> Result<Option<ChainpostConfig>> {
        let Some(home) = dirs::home_dir() else {
            return Ok(None);
        };
        let config_path = home.join(".config").join("chainpost").join(Self::CONFIG_FILE);

        if config_path.exists() {
            Self::load_discovered(&config_path).map(Some)
        } else {
            Ok(None)
        }
    }

    fn load_discovered(path: &Path) -> Result<ChainpostConfig> {
        let config = Self::load_from_path(path)
            .map_err(|e| ChainpostError::ConfigError(format!("{}: {}", path.display(), e)))?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// 解析 CLI 变量参数 "key=value"
    pub fn parse_cli_var(s: &str) -> Option<(String, String)> {
        s.split_once('=')
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .filter(|(k, _)| !k.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_from_path() {
        let config_content = r#"
[client]
timeout_secs = 5

[run]
extraction_miss = "fail"
history = false

[environments.dev]
base_url = "http://localhost:8080"
api_key = "dev-key"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(config_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = ConfigLoader::load_from_path(temp_file.path()).unwrap();
        assert_eq!(config.environments.len(), 1);
        assert_eq!(config.client.timeout(), Duration::from_secs(5));
        assert_eq!(config.run.extraction_miss, MissPolicy::Fail);
        assert!(!config.run.history);
    }

    #[test]
    fn test_defaults_when_sections_missing() {
        let config: ChainpostConfig = toml::from_str("").unwrap();
        assert_eq!(config.client.timeout_secs, 30);
        assert_eq!(config.run.extraction_miss, MissPolicy::Empty);
        assert!(config.run.history);
    }

    #[test]
    fn test_environment_conversion() {
        unsafe {
            std::env::set_var("CHAINPOST_CONFIG_TOKEN", "from-env");
        }

        let config: ChainpostConfig = toml::from_str(
            r#"
[environments.prod]
base_url = "https://api.example.com"
token = "${CHAINPOST_CONFIG_TOKEN}"
"#,
        )
        .unwrap();

        let env = config.environment("prod").unwrap();
        assert_eq!(env.name, "prod");
        assert_eq!(env.get("base_url"), Some("https://api.example.com"));
        assert_eq!(env.get("token"), Some("from-env"));
        assert!(config.environment("staging").is_none());

        unsafe {
            std::env::remove_var("CHAINPOST_CONFIG_TOKEN");
        }
    }

    #[test]
    fn test_parse_cli_var() {
        assert_eq!(
            ConfigLoader::parse_cli_var("key=value"),
            Some(("key".to_string(), "value".to_string()))
        );

        assert_eq!(
            ConfigLoader::parse_cli_var("url=https://example.com?a=b"),
            Some(("url".to_string(), "https://example.com?a=b".to_string()))
        );

        assert_eq!(ConfigLoader::parse_cli_var("invalid"), None);
        assert_eq!(ConfigLoader::parse_cli_var("=value"), None);
    }
}
