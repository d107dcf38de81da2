use tracing::debug;

use crate::assertion::path::{navigate, stringify};
use crate::extraction::types::{ExtractionMiss, ExtractionRule, ExtractionSource};
use crate::http::ResponseRecord;

/// 按规则从响应中提取值，未命中时返回 `ExtractionMiss`
///
/// 只读取响应，写入作用域由调用方完成
pub fn try_extract(rule: &ExtractionRule, response: &ResponseRecord) -> Result<String, ExtractionMiss> {
    let value = match rule.source {
        ExtractionSource::Status => response.status_code().to_string(),

        ExtractionSource::Headers => response
            .header(rule.path.trim())
            .map(str::to_string)
            .ok_or_else(|| ExtractionMiss::HeaderNotFound(rule.path.trim().to_string()))?,

        ExtractionSource::Body => {
            let body = response.json().ok_or(ExtractionMiss::BodyNotJson)?;
            let node = navigate(body, &rule.path).map_err(|e| ExtractionMiss::InvalidPath {
                path: rule.path.clone(),
                reason: e.to_string(),
            })?;
            node.map(stringify)
                .ok_or_else(|| ExtractionMiss::PathNotFound(rule.path.clone()))?
        }
    };

    debug!(
        "extracted {}:{} -> {}",
        rule.source, rule.path, rule.destination_variable
    );
    Ok(value)
}

/// 软提取：未命中时返回空字符串
pub fn extract(rule: &ExtractionRule, response: &ResponseRecord) -> String {
    try_extract(rule, response).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn create_test_response(body: &str) -> ResponseRecord {
        ResponseRecord::new(
            201,
            "Created",
            vec![("X-Trace-Id".to_string(), "trace-9".to_string())],
            body.to_string(),
            Duration::from_millis(5),
        )
    }

    #[test]
    fn test_extract_body_path() {
        let response = create_test_response(r#"{"data": {"id": "abc123", "n": 7, "tags": ["a"], "obj": {"k": 1}}}"#);

        assert_eq!(extract(&ExtractionRule::body("data.id", "id"), &response), "abc123");
        assert_eq!(extract(&ExtractionRule::body("data.n", "n"), &response), "7");
        assert_eq!(extract(&ExtractionRule::body("data.tags", "t"), &response), r#"["a"]"#);
        assert_eq!(extract(&ExtractionRule::body("$.data.obj", "o"), &response), r#"{"k":1}"#);
        assert_eq!(extract(&ExtractionRule::body("data.tags[0]", "t0"), &response), "a");
    }

    #[test]
    fn test_extract_body_miss_is_empty() {
        let response = create_test_response(r#"{"data": {"id": "abc123"}}"#);
        let rule = ExtractionRule::body("missing.path", "x");

        assert_eq!(extract(&rule, &response), "");
        assert_eq!(
            try_extract(&rule, &response),
            Err(ExtractionMiss::PathNotFound("missing.path".to_string()))
        );
    }

    #[test]
    fn test_extract_body_not_json() {
        let response = create_test_response("<html></html>");
        let rule = ExtractionRule::body("a", "x");

        assert_eq!(try_extract(&rule, &response), Err(ExtractionMiss::BodyNotJson));
        assert_eq!(extract(&rule, &response), "");
    }

    #[test]
    fn test_extract_invalid_path() {
        let response = create_test_response(r#"{"a": 1}"#);
        let err = try_extract(&ExtractionRule::body("a[", "x"), &response).unwrap_err();
        assert!(matches!(err, ExtractionMiss::InvalidPath { .. }));
    }

    #[test]
    fn test_extract_header_case_insensitive() {
        let response = create_test_response("{}");

        assert_eq!(extract(&ExtractionRule::header("x-trace-id", "t"), &response), "trace-9");
        assert_eq!(
            try_extract(&ExtractionRule::header("X-Other", "t"), &response),
            Err(ExtractionMiss::HeaderNotFound("X-Other".to_string()))
        );
    }

    #[test]
    fn test_extract_status_never_misses() {
        assert_eq!(extract(&ExtractionRule::status("code"), &create_test_response("")), "201");

        let failed = ResponseRecord::transport_error("connection refused", Duration::ZERO);
        assert_eq!(try_extract(&ExtractionRule::status("code"), &failed), Ok("0".to_string()));
    }
}
