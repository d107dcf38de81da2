use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::Result;
use crate::chain::model::{Collection, RequestDefinition, TestChain};
use crate::error::ChainpostError;
use crate::variable::Environment;

/// 运行时使用的请求目录：所有集合中的请求按 id 索引
pub type RequestCatalog = HashMap<String, RequestDefinition>;

/// 工作区文件：环境、请求集合、测试链
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Workspace {
    #[serde(default)]
    pub environments: Vec<Environment>,

    #[serde(default)]
    pub collections: Vec<Collection>,

    #[serde(default)]
    pub chains: Vec<TestChain>,
}

impl Workspace {
    /// 从 JSON 文件加载工作区
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ChainpostError::NotFound {
                kind: "workspace",
                id: path.display().to_string(),
            });
        }

        let content = fs::read_to_string(path)?;
        let workspace = Self::from_json(&content)?;
        debug!(
            "Loaded workspace {}: {} environment(s), {} collection(s), {} chain(s)",
            path.display(),
            workspace.environments.len(),
            workspace.collections.len(),
            workspace.chains.len()
        );
        Ok(workspace)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// 合并所有集合的请求，id 重复时后出现的覆盖先出现的
    pub fn request_catalog(&self) -> RequestCatalog {
        let mut catalog = RequestCatalog::new();
        for request in self.collections.iter().flat_map(|c| c.requests.iter()) {
            if catalog.insert(request.id.clone(), request.clone()).is_some() {
                warn!("Duplicate request id '{}' in workspace, later definition wins", request.id);
            }
        }
        catalog
    }

    /// 按 id 或名称查找测试链
    pub fn find_chain(&self, key: &str) -> Result<&TestChain> {
        self.chains
            .iter()
            .find(|c| c.id == key)
            .or_else(|| self.chains.iter().find(|c| c.name == key))
            .ok_or_else(|| ChainpostError::NotFound {
                kind: "chain",
                id: key.to_string(),
            })
    }

    /// 按 id 或名称查找环境
    pub fn find_environment(&self, key: &str) -> Option<&Environment> {
        self.environments
            .iter()
            .find(|e| e.id == key)
            .or_else(|| self.environments.iter().find(|e| e.name == key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const WORKSPACE: &str = r#"{
        "environments": [
            {"id": "env-dev", "name": "dev", "variables": [{"key": "baseUrl", "value": "http://localhost"}]}
        ],
        "collections": [
            {"id": "c1", "name": "Auth", "requests": [{"id": "login", "method": "POST", "url": "{{baseUrl}}/login"}]},
            {"id": "c2", "name": "Users", "requests": [{"id": "me", "url": "{{baseUrl}}/me"}]}
        ],
        "chains": [
            {"id": "chain-1", "name": "Login flow", "steps": [
                {"id": "s1", "requestId": "login"},
                {"id": "s2", "requestId": "me"}
            ]}
        ]
    }"#;

    #[test]
    fn test_load_workspace() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(WORKSPACE.as_bytes()).unwrap();

        let workspace = Workspace::load(file.path()).unwrap();
        assert_eq!(workspace.environments.len(), 1);
        assert_eq!(workspace.chains[0].steps.len(), 2);

        let catalog = workspace.request_catalog();
        assert_eq!(catalog.len(), 2);
        assert!(catalog.contains_key("login"));
        assert!(catalog.contains_key("me"));
    }

    #[test]
    fn test_find_by_id_or_name() {
        let workspace = Workspace::from_json(WORKSPACE).unwrap();

        assert_eq!(workspace.find_chain("chain-1").unwrap().name, "Login flow");
        assert_eq!(workspace.find_chain("Login flow").unwrap().id, "chain-1");
        assert!(matches!(
            workspace.find_chain("nope"),
            Err(ChainpostError::NotFound { kind: "chain", .. })
        ));

        assert_eq!(workspace.find_environment("dev").unwrap().id, "env-dev");
        assert!(workspace.find_environment("prod").is_none());
    }

    #[test]
    fn test_load_missing_file() {
        let result = Workspace::load("/nonexistent/workspace.json");
        assert!(matches!(result, Err(ChainpostError::NotFound { .. })));
    }

    #[test]
    fn test_load_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{not json").unwrap();

        assert!(matches!(Workspace::load(file.path()), Err(ChainpostError::JsonError(_))));
    }
}
