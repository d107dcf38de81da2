use base64::{Engine as _, engine::general_purpose::STANDARD};

use crate::chain::{ApiKeyLocation, AuthDescriptor, RequestDefinition};
use crate::http::ResolvedRequest;
use crate::variable::{VariableResolver, VariableScope};

/// 用当前作用域渲染请求定义
///
/// URL、Header 值、Query 值、认证字段和 body 都会被替换；禁用的条目不发送
pub fn render_request(definition: &RequestDefinition, scope: &VariableScope) -> ResolvedRequest {
    let resolve = |text: &str| VariableResolver::resolve(text, scope);

    let mut request = ResolvedRequest::new(definition.method, resolve(&definition.url));

    for header in definition.headers.iter().filter(|h| h.enabled) {
        request = request.with_header(header.key.trim(), resolve(&header.value));
    }
    for param in definition.query_params.iter().filter(|p| p.enabled) {
        request = request.with_query(param.key.trim(), resolve(&param.value));
    }
    if let Some(body) = &definition.body {
        request = request.with_body(resolve(body));
    }

    match &definition.auth {
        AuthDescriptor::None => request,
        AuthDescriptor::Bearer { token } => request.with_auth_bearer(&resolve(token)),
        AuthDescriptor::Basic { username, password } => {
            let credentials = format!("{}:{}", resolve(username), resolve(password));
            request.with_header("Authorization", format!("Basic {}", STANDARD.encode(credentials)))
        }
        AuthDescriptor::ApiKey {
            key,
            value,
            location: ApiKeyLocation::Header,
        } => request.with_header(resolve(key), resolve(value)),
        AuthDescriptor::ApiKey {
            key,
            value,
            location: ApiKeyLocation::Query,
        } => request.with_query(resolve(key), resolve(value)),
    }
}

/// 请求定义中当前作用域无法解析的占位符
pub fn unresolved_placeholders(definition: &RequestDefinition, scope: &VariableScope) -> Vec<String> {
    let mut templates: Vec<&str> = vec![definition.url.as_str()];
    templates.extend(definition.headers.iter().filter(|h| h.enabled).map(|h| h.value.as_str()));
    templates.extend(definition.query_params.iter().filter(|p| p.enabled).map(|p| p.value.as_str()));
    templates.extend(definition.body.as_deref());
    match &definition.auth {
        AuthDescriptor::None => {}
        AuthDescriptor::Bearer { token } => templates.push(token.as_str()),
        AuthDescriptor::Basic { username, password } => templates.extend([username.as_str(), password.as_str()]),
        AuthDescriptor::ApiKey { key, value, .. } => templates.extend([key.as_str(), value.as_str()]),
    }

    let mut names: Vec<String> = Vec::new();
    for template in templates {
        for name in VariableResolver::unresolved(template, scope) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    names
}
