//! 响应 body 的路径导航，支持 `a.b[0].c` 这样的点号 / 下标写法。
//!
//! 断言（jsonPath、dataType）和变量提取共用这一套规则。

use serde_json::Value;

use crate::assertion::types::AssertError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// 解析路径表达式
///
/// 可以带 `$` / `$.` 前缀；空路径表示根节点
pub fn parse_path(path: &str) -> Result<Vec<PathSegment>, AssertError> {
    let trimmed = path.trim();
    let rest = trimmed.strip_prefix('$').unwrap_or(trimmed);
    let rest = rest.strip_prefix('.').unwrap_or(rest);

    let mut segments = Vec::new();
    let mut key = String::new();
    // `a[0].b` 中 `]` 之后紧跟的点号是合法的
    let mut after_bracket = false;
    let mut trailing_dot = false;
    let mut chars = rest.chars();

    while let Some(ch) = chars.next() {
        trailing_dot = false;
        match ch {
            '.' => {
                if !key.is_empty() {
                    segments.push(PathSegment::Key(std::mem::take(&mut key)));
                } else if !after_bracket {
                    return Err(AssertError::InvalidPath(format!(
                        "empty segment in path '{}'",
                        path
                    )));
                }
                after_bracket = false;
                trailing_dot = true;
            }
            '[' => {
                if !key.is_empty() {
                    segments.push(PathSegment::Key(std::mem::take(&mut key)));
                }
                let mut inner = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == ']' {
                        closed = true;
                        break;
                    }
                    inner.push(c);
                }
                if !closed {
                    return Err(AssertError::InvalidPath(format!(
                        "unclosed '[' in path '{}'",
                        path
                    )));
                }
                segments.push(parse_bracket(inner.trim(), path)?);
                after_bracket = true;
            }
            _ => {
                key.push(ch);
                after_bracket = false;
            }
        }
    }

    if trailing_dot {
        return Err(AssertError::InvalidPath(format!(
            "trailing '.' in path '{}'",
            path
        )));
    }
    if !key.is_empty() {
        segments.push(PathSegment::Key(key));
    }

    Ok(segments)
}

fn parse_bracket(inner: &str, path: &str) -> Result<PathSegment, AssertError> {
    if let Ok(index) = inner.parse::<usize>() {
        return Ok(PathSegment::Index(index));
    }

    let quoted = inner
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .or_else(|| inner.strip_prefix('"').and_then(|s| s.strip_suffix('"')));

    match quoted {
        Some(key) => Ok(PathSegment::Key(key.to_string())),
        None => Err(AssertError::InvalidPath(format!(
            "invalid index '[{}]' in path '{}'",
            inner, path
        ))),
    }
}

/// 在 JSON 中按路径查找节点，找不到返回 `Ok(None)`
pub fn navigate<'a>(root: &'a Value, path: &str) -> Result<Option<&'a Value>, AssertError> {
    let segments = parse_path(path)?;
    Ok(navigate_segments(root, &segments))
}

pub fn navigate_segments<'a>(root: &'a Value, segments: &[PathSegment]) -> Option<&'a Value> {
    let mut current = root;
    for segment in segments {
        current = match (segment, current) {
            (PathSegment::Key(key), Value::Object(map)) => map.get(key)?,
            // `items.0.id` 这种写法也能访问数组
            (PathSegment::Key(key), Value::Array(items)) => items.get(key.parse::<usize>().ok()?)?,
            (PathSegment::Index(index), Value::Array(items)) => items.get(*index)?,
            _ => return None,
        };
    }
    Some(current)
}

/// 把 JSON 值转换为字符串：字符串取原文，其他值输出紧凑 JSON 文本
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
