use serde_json::Value;

/// 结构校验器，可以替换成完整的 JSON Schema 引擎
pub trait SchemaValidator: Send + Sync {
    /// 返回所有不匹配项的描述，空列表表示通过
    fn validate(&self, schema: &Value, instance: &Value) -> Vec<String>;
}

/// 默认的最小结构校验器
///
/// 支持 `type`（字符串或字符串数组）、`enum`、`required`、`properties`、`items`。
/// 对象要求 `properties` 中声明的每个属性都存在并递归匹配；
/// 数组要求每个元素匹配 `items`。
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralSchemaValidator;

impl SchemaValidator for StructuralSchemaValidator {
    fn validate(&self, schema: &Value, instance: &Value) -> Vec<String> {
        let mut errors = Vec::new();
        check(schema, instance, "$", &mut errors);
        errors
    }
}

fn check(schema: &Value, instance: &Value, at: &str, errors: &mut Vec<String>) {
    let Value::Object(schema) = schema else {
        // `true` 或空 schema 接受任何值
        if schema == &Value::Bool(false) {
            errors.push(format!("{}: no value is allowed here", at));
        }
        return;
    };

    let declared = declared_types(schema);
    if !declared.is_empty() && !declared.iter().any(|t| type_matches(t, instance)) {
        errors.push(format!(
            "{}: expected {}, got {}",
            at,
            declared.join(" | "),
            type_name(instance)
        ));
        return;
    }

    if let Some(Value::Array(allowed)) = schema.get("enum")
        && !allowed.contains(instance)
    {
        errors.push(format!(
            "{}: {} is not one of {}",
            at,
            instance,
            Value::Array(allowed.clone())
        ));
    }

    if let (Some(Value::Array(required)), Value::Object(object)) = (schema.get("required"), instance) {
        for name in required.iter().filter_map(Value::as_str) {
            if !object.contains_key(name) {
                errors.push(format!("{}.{}: required property missing", at, name));
            }
        }
    }

    if let (Some(Value::Object(properties)), Value::Object(object)) =
        (schema.get("properties"), instance)
    {
        for (name, property_schema) in properties {
            let child = format!("{}.{}", at, name);
            match object.get(name) {
                Some(value) => check(property_schema, value, &child, errors),
                None => errors.push(format!("{}: missing property", child)),
            }
        }
    }

    if let (Some(item_schema), Value::Array(items)) = (schema.get("items"), instance) {
        for (index, item) in items.iter().enumerate() {
            check(item_schema, item, &format!("{}[{}]", at, index), errors);
        }
    }
}

fn declared_types(schema: &serde_json::Map<String, Value>) -> Vec<&str> {
    match schema.get("type") {
        Some(Value::String(t)) => vec![t.as_str()],
        Some(Value::Array(types)) => types.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

fn type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "integer" => is_integer(value),
        "number" => value.is_number(),
        other => type_name(value) == other,
    }
}

fn is_integer(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0),
        _ => false,
    }
}

/// 运行时类型名：string | number | integer | boolean | array | object | null
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) if is_integer(value) => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// `integer` 同时满足 `number`
pub fn matches_type_name(expected: &str, value: &Value) -> bool {
    type_matches(expected, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validate(schema: Value, instance: Value) -> Vec<String> {
        StructuralSchemaValidator.validate(&schema, &instance)
    }

    #[test]
    fn test_object_with_nested_properties() {
        let schema = json!({
            "type": "object",
            "properties": {
                "id": {"type": "integer"},
                "profile": {
                    "type": "object",
                    "properties": {"email": {"type": "string"}}
                }
            }
        });

        assert!(validate(schema.clone(), json!({"id": 1, "profile": {"email": "a@b.c"}, "extra": true})).is_empty());

        let errors = validate(schema, json!({"id": "1", "profile": {}}));
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("$.id"));
        assert!(errors[1].contains("$.profile.email: missing property"));
    }

    #[test]
    fn test_array_items() {
        let schema = json!({"type": "array", "items": {"type": "object", "properties": {"name": {"type": "string"}}}});

        assert!(validate(schema.clone(), json!([{"name": "a"}, {"name": "b"}])).is_empty());

        let errors = validate(schema, json!([{"name": "a"}, {"name": 3}]));
        assert_eq!(errors, vec!["$[1].name: expected string, got integer".to_string()]);
    }

    #[test]
    fn test_scalar_types() {
        assert!(validate(json!({"type": "number"}), json!(1)).is_empty());
        assert!(validate(json!({"type": "number"}), json!(1.5)).is_empty());
        assert!(!validate(json!({"type": "integer"}), json!(1.5)).is_empty());
        assert!(validate(json!({"type": ["string", "null"]}), json!(null)).is_empty());
        assert!(!validate(json!({"type": "boolean"}), json!("true")).is_empty());
    }

    #[test]
    fn test_required_properties() {
        let schema = json!({"type": "object", "required": ["id", "name"]});

        assert!(validate(schema.clone(), json!({"id": 1, "name": "a"})).is_empty());

        let errors = validate(schema, json!({"id": 1}));
        assert_eq!(errors, vec!["$.name: required property missing".to_string()]);
    }

    #[test]
    fn test_enum_values() {
        let schema = json!({"properties": {"state": {"enum": ["open", "closed"]}}});

        assert!(validate(schema.clone(), json!({"state": "open"})).is_empty());

        let errors = validate(schema, json!({"state": "draft"}));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("$.state: \"draft\" is not one of"));
    }

    #[test]
    fn test_type_name() {
        assert_eq!(type_name(&json!(1)), "integer");
        assert_eq!(type_name(&json!(1.25)), "number");
        assert_eq!(type_name(&json!([])), "array");
        assert_eq!(type_name(&json!({})), "object");
        assert!(matches_type_name("number", &json!(3)));
    }
}
