//! JSON-schema validation and sanitization of request parameters.
//!
//! The supported keyword subset is `type` (single or list), `required`,
//! `properties`, `additionalProperties`, `items`, `enum`, `minLength`,
//! `maxLength`, `minimum`, `maximum`, `minItems`, `maxItems`, `pattern`,
//! `format` (`email`, `uri`, `date-time`, `date`, `ipv4`, `ipv6`, `uuid`) and
//! `default`.
//!
//! Validation runs first and may rewrite the parameters: missing properties
//! with a `default` are filled in, and string parameters are coerced to
//! `integer`, `number` or `boolean` when the schema asks for those types (query
//! and form values always arrive as strings). Sanitization then cleans every
//! declared top-level property and writes it back into the request.

use std::sync::OnceLock;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat};
use http::StatusCode;
use regex::Regex;
use serde_json::{Map, Number, Value};

use plubo_rs_core::ValidationError;
use plubo_rs_http::{HttpRequest, HttpResponse, JsonResponse};

use crate::chain::{Middleware, Next};

/// Validates request parameters against a JSON schema, then sanitizes them.
///
/// Failure short-circuits with 400 and
/// `{"error": "Input validation failed", "details": ["[property] message", ...]}`.
///
/// # Examples
///
/// ```
/// use plubo_rs_middleware::builtin::SchemaValidator;
/// use serde_json::json;
///
/// let validator = SchemaValidator::new(json!({
///     "type": "object",
///     "required": ["email"],
///     "properties": {
///         "email": {"type": "string", "format": "email"},
///         "page": {"type": "integer", "minimum": 1, "default": 1}
///     }
/// }));
///
/// let mut params = json!({"email": "ana@example.com"});
/// validator.validate(&mut params).unwrap();
/// assert_eq!(params["page"], 1);
/// ```
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    schema: Value,
}

impl SchemaValidator {
    /// Creates a validator for the given schema.
    pub const fn new(schema: Value) -> Self {
        Self { schema }
    }

    /// Returns the schema.
    pub const fn schema(&self) -> &Value {
        &self.schema
    }

    /// Validates `params` in place, applying defaults and string coercion.
    pub fn validate(&self, params: &mut Value) -> Result<(), ValidationError> {
        let mut errors = ValidationError::default();
        validate_value("", params, &self.schema, &mut errors);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Sanitizes the declared top-level properties present in `params`.
    pub fn sanitize(&self, params: &Value) -> Map<String, Value> {
        let mut clean = Map::new();
        let (Some(properties), Some(data)) = (
            self.schema.get("properties").and_then(Value::as_object),
            params.as_object(),
        ) else {
            return clean;
        };
        for (key, property) in properties {
            if let Some(value) = data.get(key).filter(|v| !v.is_null()) {
                clean.insert(key.clone(), sanitize_value(value, property));
            }
        }
        clean
    }
}

#[async_trait]
impl Middleware for SchemaValidator {
    async fn handle(&self, mut request: HttpRequest, next: Next<'_>) -> HttpResponse {
        let mut params = Value::Object(request.params().clone());

        if let Err(errors) = self.validate(&mut params) {
            let details = errors.details();
            tracing::debug!(?details, "request parameters rejected");
            return JsonResponse::with_status(
                StatusCode::BAD_REQUEST,
                &serde_json::json!({ "error": "Input validation failed", "details": details }),
            );
        }

        for (key, value) in self.sanitize(&params) {
            request.set_param(key, value);
        }
        next.run(request).await
    }

    fn name(&self) -> &'static str {
        "schema_validator"
    }
}

// ============================================================
// Validation
// ============================================================

fn child_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

fn fail(errors: &mut ValidationError, path: &str, code: &str, message: String) {
    let field = if path.is_empty() { "$" } else { path };
    errors.push(field, code, message);
}

fn declared_types(schema: &Value) -> Vec<&str> {
    match schema.get("type") {
        Some(Value::String(t)) => vec![t.as_str()],
        Some(Value::Array(ts)) => ts.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn matches_type(value: &Value, ty: &str) -> bool {
    match ty {
        "number" => value.is_number(),
        "integer" => {
            value.is_i64()
                || value.is_u64()
                || value.as_f64().is_some_and(|f| f.fract() == 0.0)
        }
        other => type_name(value) == other,
    }
}

fn coerce(value: &Value, ty: &str) -> Option<Value> {
    let s = value.as_str()?.trim();
    match ty {
        "integer" => s.parse::<i64>().ok().map(Value::from),
        "number" => s
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),
        "boolean" => match s {
            "true" | "1" => Some(Value::Bool(true)),
            "false" | "0" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    }
}

/// Checks `type`, coercing string input when possible. Returns `false` if the
/// value still has the wrong type, in which case later keywords are skipped.
fn check_type(path: &str, value: &mut Value, schema: &Value, errors: &mut ValidationError) -> bool {
    let types = declared_types(schema);
    if types.is_empty() || types.iter().any(|t| matches_type(value, t)) {
        return true;
    }
    if let Some(coerced) = types.iter().find_map(|t| coerce(value, t)) {
        *value = coerced;
        return true;
    }
    fail(
        errors,
        path,
        "type",
        format!(
            "{} value found, but {} is required",
            capitalize(type_name(value)),
            types.join(" or ")
        ),
    );
    false
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars
        .next()
        .map(|first| first.to_uppercase().chain(chars).collect())
        .unwrap_or_default()
}

fn validate_value(path: &str, value: &mut Value, schema: &Value, errors: &mut ValidationError) {
    if !check_type(path, value, schema, errors) {
        return;
    }

    if let Some(allowed) = schema.get("enum").and_then(Value::as_array) {
        if !allowed.contains(value) {
            let listed: Vec<String> = allowed.iter().map(Value::to_string).collect();
            fail(
                errors,
                path,
                "enum",
                format!("Does not have a value in the enumeration [{}]", listed.join(", ")),
            );
        }
    }

    match value {
        Value::String(s) => validate_string(path, s, schema, errors),
        Value::Number(n) => validate_number(path, n, schema, errors),
        Value::Array(items) => validate_array(path, items, schema, errors),
        Value::Object(map) => validate_object(path, map, schema, errors),
        Value::Null | Value::Bool(_) => {}
    }
}

fn schema_usize(schema: &Value, key: &str) -> Option<usize> {
    schema
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|n| usize::try_from(n).ok())
}

fn validate_string(path: &str, s: &str, schema: &Value, errors: &mut ValidationError) {
    let len = s.chars().count();
    if let Some(min) = schema_usize(schema, "minLength") {
        if len < min {
            fail(errors, path, "minLength", format!("Must be at least {min} characters long"));
        }
    }
    if let Some(max) = schema_usize(schema, "maxLength") {
        if len > max {
            fail(errors, path, "maxLength", format!("Must be at most {max} characters long"));
        }
    }
    if let Some(pattern) = schema.get("pattern").and_then(Value::as_str) {
        match Regex::new(pattern) {
            Ok(re) if re.is_match(s) => {}
            Ok(_) => fail(
                errors,
                path,
                "pattern",
                format!("Does not match the regex pattern {pattern}"),
            ),
            Err(e) => {
                tracing::warn!(pattern, error = %e, "invalid schema pattern");
                fail(errors, path, "pattern", format!("Invalid regex pattern {pattern}"));
            }
        }
    }
    if let Some(format) = schema.get("format").and_then(Value::as_str) {
        if !matches_format(s, format) {
            fail(errors, path, "format", format!("Invalid {format}"));
        }
    }
}

fn validate_number(path: &str, n: &Number, schema: &Value, errors: &mut ValidationError) {
    let Some(value) = n.as_f64() else {
        return;
    };
    if let Some(min) = schema.get("minimum").and_then(Value::as_f64) {
        if value < min {
            fail(errors, path, "minimum", format!("Must have a minimum value of {min}"));
        }
    }
    if let Some(max) = schema.get("maximum").and_then(Value::as_f64) {
        if value > max {
            fail(errors, path, "maximum", format!("Must have a maximum value of {max}"));
        }
    }
}

fn validate_array(path: &str, items: &mut [Value], schema: &Value, errors: &mut ValidationError) {
    if let Some(min) = schema_usize(schema, "minItems") {
        if items.len() < min {
            fail(errors, path, "minItems", format!("There must be a minimum of {min} items in the array"));
        }
    }
    if let Some(max) = schema_usize(schema, "maxItems") {
        if items.len() > max {
            fail(errors, path, "maxItems", format!("There must be a maximum of {max} items in the array"));
        }
    }
    if let Some(item_schema) = schema.get("items").filter(|s| s.is_object()) {
        for (i, item) in items.iter_mut().enumerate() {
            validate_value(&format!("{path}[{i}]"), item, item_schema, errors);
        }
    }
}

fn validate_object(
    path: &str,
    map: &mut Map<String, Value>,
    schema: &Value,
    errors: &mut ValidationError,
) {
    let properties = schema.get("properties").and_then(Value::as_object);

    if let Some(properties) = properties {
        for (key, property) in properties {
            if !map.contains_key(key) {
                if let Some(default) = property.get("default") {
                    map.insert(key.clone(), default.clone());
                }
            }
        }
    }

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for key in required.iter().filter_map(Value::as_str) {
            if !map.contains_key(key) {
                fail(
                    errors,
                    &child_path(path, key),
                    "required",
                    format!("The property {key} is required"),
                );
            }
        }
    }

    if let Some(properties) = properties {
        for (key, property) in properties {
            if let Some(value) = map.get_mut(key) {
                validate_value(&child_path(path, key), value, property, errors);
            }
        }
    }

    if schema.get("additionalProperties") == Some(&Value::Bool(false)) {
        for key in map.keys() {
            if !properties.is_some_and(|p| p.contains_key(key)) {
                fail(
                    errors,
                    &child_path(path, key),
                    "additionalProperties",
                    format!(
                        "The property {key} is not defined and the definition does not allow additional properties"
                    ),
                );
            }
        }
    }
}

fn email_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}$").ok())
        .as_ref()
}

fn is_email(s: &str) -> bool {
    email_regex().is_some_and(|re| re.is_match(s))
}

fn is_uri(s: &str) -> bool {
    url::Url::parse(s).is_ok_and(|u| u.has_host() || u.scheme() == "mailto" || u.scheme() == "urn")
}

fn matches_format(s: &str, format: &str) -> bool {
    match format {
        "email" => is_email(s),
        "uri" => is_uri(s),
        "date-time" => DateTime::parse_from_rfc3339(s).is_ok(),
        "date" => NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok(),
        "ipv4" => s.parse::<std::net::Ipv4Addr>().is_ok(),
        "ipv6" => s.parse::<std::net::Ipv6Addr>().is_ok(),
        "uuid" => is_uuid(s),
        _ => true,
    }
}

fn is_uuid(s: &str) -> bool {
    let groups: Vec<&str> = s.split('-').collect();
    groups.len() == 5
        && groups
            .iter()
            .zip([8, 4, 4, 4, 12])
            .all(|(g, len)| g.len() == len && g.chars().all(|c| c.is_ascii_hexdigit()))
}

// ============================================================
// Sanitization
// ============================================================

fn sanitize_value(value: &Value, schema: &Value) -> Value {
    match schema.get("type") {
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .map(|t| sanitize_as(value, t, schema))
            .find(|v| !v.is_null())
            .unwrap_or_else(|| Value::String(sanitize_text(&scalar_text(value)))),
        Some(Value::String(t)) => sanitize_as(value, t, schema),
        _ => sanitize_as(value, "string", schema),
    }
}

fn sanitize_as(value: &Value, ty: &str, schema: &Value) -> Value {
    match ty {
        "string" => sanitize_string(value, schema.get("format").and_then(Value::as_str)),
        "integer" => Value::from(to_integer(value)),
        "number" => Number::from_f64(to_float(value)).map_or(Value::from(0), Value::Number),
        "boolean" => to_boolean(value).map_or(Value::Null, Value::Bool),
        "array" => {
            let Value::Array(items) = value else {
                return Value::Array(Vec::new());
            };
            match schema.get("items").filter(|s| s.is_object()) {
                Some(item_schema) => items.iter().map(|i| sanitize_value(i, item_schema)).collect(),
                None => items.iter().map(sanitize_loose).collect(),
            }
        }
        "object" => {
            let Value::Object(map) = value else {
                return Value::Object(Map::new());
            };
            sanitize_object(map, schema)
        }
        "null" => Value::Null,
        _ => Value::String(sanitize_text(&scalar_text(value))),
    }
}

fn sanitize_object(map: &Map<String, Value>, schema: &Value) -> Value {
    let mut clean = Map::new();
    let properties = schema.get("properties").and_then(Value::as_object);
    if let Some(properties) = properties {
        for (key, property) in properties {
            if let Some(v) = map.get(key).filter(|v| !v.is_null()) {
                clean.insert(key.clone(), sanitize_value(v, property));
            }
        }
    }
    if schema.get("additionalProperties") == Some(&Value::Bool(true)) {
        for (key, v) in map {
            if properties.is_some_and(|p| p.contains_key(key)) {
                continue;
            }
            let v = match v {
                Value::String(s) => Value::String(sanitize_text(s)),
                other => other.clone(),
            };
            clean.insert(key.clone(), v);
        }
    }
    Value::Object(clean)
}

fn sanitize_string(value: &Value, format: Option<&str>) -> Value {
    let raw = scalar_text(value);
    let raw = raw.trim();
    match format {
        Some("email") => {
            if is_email(raw) {
                Value::String(raw.to_string())
            } else {
                Value::Null
            }
        }
        Some("uri") => {
            if is_uri(raw) {
                Value::String(raw.to_string())
            } else {
                Value::Null
            }
        }
        Some("date-time") => parse_date_time(raw)
            .map_or(Value::Null, |dt| Value::String(dt.to_rfc3339_opts(SecondsFormat::Secs, false))),
        _ => Value::String(sanitize_text(raw)),
    }
}

fn parse_date_time(s: &str) -> Option<DateTime<chrono::FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;
    Some(naive.and_utc().fixed_offset())
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) | Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn to_integer(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n.as_i64().unwrap_or_else(|| n.as_f64().map_or(0, |f| f as i64)),
        Value::String(s) => leading_number(s).map_or(0, |f| f as i64),
        Value::Bool(b) => i64::from(*b),
        Value::Array(a) => i64::from(!a.is_empty()),
        Value::Object(_) => 1,
        Value::Null => 0,
    }
}

fn to_float(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => leading_number(s).unwrap_or(0.0),
        Value::Bool(true) => 1.0,
        _ => 0.0,
    }
}

/// Parses the longest numeric prefix of a string, the way loose numeric casts do.
fn leading_number(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;
    for (i, c) in s.char_indices() {
        match c {
            '+' | '-' if i == 0 => {}
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end = i + c.len_utf8();
    }
    if seen_digit {
        s[..end].trim_end_matches('.').parse().ok()
    } else {
        None
    }
}

fn to_boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "on" | "yes" => Some(true),
            "0" | "false" | "off" | "no" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn sanitize_loose(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(sanitize_text(s)),
        Value::Array(items) => items.iter().map(sanitize_loose).collect(),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (sanitize_key(k), sanitize_loose(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Lowercases a key and keeps only `[a-z0-9_-]`.
fn sanitize_key(key: &str) -> String {
    key.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

/// Strips tags and percent-encoded octets, and collapses whitespace.
pub(crate) fn sanitize_text(input: &str) -> String {
    let mut stripped = String::with_capacity(input.len());
    let mut in_tag = false;
    for c in input.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => stripped.push(c),
            _ => {}
        }
    }

    let mut without_octets = String::with_capacity(stripped.len());
    let mut chars = stripped.chars();
    while let Some(c) = chars.next() {
        if c == '%' {
            let mut lookahead = chars.clone();
            if let (Some(a), Some(b)) = (lookahead.next(), lookahead.next()) {
                if a.is_ascii_hexdigit() && b.is_ascii_hexdigit() {
                    chars = lookahead;
                    continue;
                }
            }
        }
        without_octets.push(c);
    }

    without_octets.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{handler, MiddlewareStack};
    use serde_json::json;

    fn order_schema() -> Value {
        json!({
            "type": "object",
            "required": ["email", "quantity"],
            "properties": {
                "email": {"type": "string", "format": "email"},
                "quantity": {"type": "integer", "minimum": 1, "maximum": 10},
                "note": {"type": "string", "maxLength": 20},
                "gift": {"type": "boolean", "default": false},
                "size": {"type": "string", "enum": ["s", "m", "l"]},
                "tags": {"type": "array", "items": {"type": "string"}},
                "delivery": {"type": "string", "format": "date-time"},
                "coupon": {"type": ["string", "null"]}
            }
        })
    }

    fn validator() -> SchemaValidator {
        SchemaValidator::new(order_schema())
    }

    #[test]
    fn test_valid_params_with_defaults_and_coercion() {
        let mut params = json!({"email": "ana@example.com", "quantity": "3"});
        validator().validate(&mut params).unwrap();
        assert_eq!(params["quantity"], 3);
        assert_eq!(params["gift"], false);
    }

    #[test]
    fn test_error_details() {
        let mut params = json!({"quantity": 0, "size": "xl", "note": "x".repeat(30)});
        let details = validator().validate(&mut params).unwrap_err().details();
        assert!(details.contains(&"[email] The property email is required".to_string()));
        assert!(details.contains(&"[quantity] Must have a minimum value of 1".to_string()));
        assert!(details.iter().any(|d| d.starts_with("[size] Does not have a value in the enumeration")));
        assert!(details.contains(&"[note] Must be at most 20 characters long".to_string()));
    }

    #[test]
    fn test_type_mismatch() {
        let mut params = json!({"email": "ana@example.com", "quantity": "many"});
        let details = validator().validate(&mut params).unwrap_err().details();
        assert_eq!(
            details,
            vec!["[quantity] String value found, but integer is required".to_string()]
        );
    }

    #[test]
    fn test_format_checks() {
        let mut params = json!({"email": "not-an-email", "quantity": 1, "delivery": "tomorrow"});
        let details = validator().validate(&mut params).unwrap_err().details();
        assert!(details.contains(&"[email] Invalid email".to_string()));
        assert!(details.contains(&"[delivery] Invalid date-time".to_string()));
    }

    #[test]
    fn test_nested_paths() {
        let schema = json!({
            "type": "object",
            "properties": {
                "address": {
                    "type": "object",
                    "required": ["city"],
                    "properties": {"zip": {"type": "string", "pattern": "^[0-9]{5}$"}}
                },
                "ids": {"type": "array", "items": {"type": "integer"}}
            }
        });
        let mut params = json!({"address": {"zip": "ABC"}, "ids": [1, "x"]});
        let details = SchemaValidator::new(schema)
            .validate(&mut params)
            .unwrap_err()
            .details();
        assert!(details.contains(&"[address.city] The property city is required".to_string()));
        assert!(details.iter().any(|d| d.starts_with("[address.zip] Does not match")));
        assert!(details.iter().any(|d| d.starts_with("[ids[1]]")));
    }

    #[test]
    fn test_additional_properties_false() {
        let schema = json!({
            "type": "object",
            "properties": {"a": {"type": "string"}},
            "additionalProperties": false
        });
        let mut params = json!({"a": "x", "b": "y"});
        let details = SchemaValidator::new(schema)
            .validate(&mut params)
            .unwrap_err()
            .details();
        assert_eq!(details.len(), 1);
        assert!(details[0].starts_with("[b] The property b is not defined"));
    }

    #[test]
    fn test_sanitize_values() {
        let params = json!({
            "email": " ana@example.com ",
            "quantity": 4,
            "note": "<b>hello</b>\n  world %41",
            "gift": "yes",
            "tags": ["<i>a</i>", 5],
            "delivery": "2024-05-01 10:30:00",
            "coupon": "SAVE10",
            "unknown": "dropped"
        });
        let clean = validator().sanitize(&params);
        assert_eq!(clean["email"], "ana@example.com");
        assert_eq!(clean["quantity"], 4);
        assert_eq!(clean["note"], "hello world");
        assert_eq!(clean["gift"], true);
        assert_eq!(clean["tags"], json!(["a", "5"]));
        assert_eq!(clean["delivery"], "2024-05-01T10:30:00+00:00");
        assert_eq!(clean["coupon"], "SAVE10");
        assert!(!clean.contains_key("unknown"));
    }

    #[test]
    fn test_sanitize_object_and_loose_arrays() {
        let schema = json!({
            "type": "object",
            "properties": {
                "meta": {
                    "type": "object",
                    "properties": {"count": {"type": "integer"}},
                    "additionalProperties": true
                },
                "blob": {"type": "array"}
            }
        });
        let params = json!({
            "meta": {"count": "7 apples", "label": " <em>x</em> "},
            "blob": [{"Bad Key!": "<p>v</p>"}, true]
        });
        let clean = SchemaValidator::new(schema).sanitize(&params);
        assert_eq!(clean["meta"], json!({"count": 7, "label": "x"}));
        assert_eq!(clean["blob"], json!([{"badkey": "v"}, true]));
    }

    #[test]
    fn test_sanitize_text() {
        assert_eq!(sanitize_text("  a\t\tb \n c "), "a b c");
        assert_eq!(sanitize_text("<script>x</script>y"), "xy");
        assert_eq!(sanitize_text("100%"), "100%");
        assert_eq!(sanitize_text("a%20b"), "ab");
    }

    #[test]
    fn test_leading_number() {
        assert_eq!(leading_number("42abc"), Some(42.0));
        assert_eq!(leading_number("-3.5kg"), Some(-3.5));
        assert_eq!(leading_number("abc"), None);
    }

    #[tokio::test]
    async fn test_middleware_rejects_with_400() {
        let stack = MiddlewareStack::new().with(validator());
        let h = handler(|_req| async { HttpResponse::ok("reached") });
        let request = HttpRequest::builder().query_string("quantity=2").build();
        let response = stack.run(request, &h).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response.json().unwrap();
        assert_eq!(body["error"], "Input validation failed");
        assert_eq!(body["details"], json!(["[email] The property email is required"]));
    }

    #[tokio::test]
    async fn test_middleware_writes_back_sanitized_params() {
        let stack = MiddlewareStack::new().with(validator());
        let h = handler(|req: HttpRequest| async move {
            JsonResponse::new(&Value::Object(req.params().clone()))
        });
        let request = HttpRequest::builder()
            .query_string("email=ana%40example.com&quantity=2&note=%3Cb%3Ehi%3C%2Fb%3E")
            .build();
        let response = stack.run(request, &h).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.json().unwrap();
        assert_eq!(body["quantity"], 2);
        assert_eq!(body["gift"], false);
        assert_eq!(body["note"], "hi");
        assert_eq!(body["email"], "ana@example.com");
    }
}
