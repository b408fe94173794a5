use serde::{Deserialize, Serialize};

use crate::error::{TelaError, TelaResult};
use crate::types::Value;

/// The data-binding collaborator: resolves a deferred expression against the
/// current view model. The expression language is host-defined; the engine
/// only requires that expressions a resolver cannot interpret (`None`) stay
/// in their raw form.
pub trait BindingResolver {
    fn resolve(&self, expr: &str) -> Option<Value>;
}

/// A JSON-backed view model resolving dotted paths (`user.name`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewModel {
    root: serde_json::Map<String, serde_json::Value>,
}

impl ViewModel {
    pub fn new() -> Self {
        ViewModel::default()
    }

    pub fn from_json(value: serde_json::Value) -> TelaResult<Self> {
        match value {
            serde_json::Value::Object(root) => Ok(ViewModel { root }),
            other => Err(TelaError::InvalidModel(format!(
                "view model must be a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    pub fn from_json_str(src: &str) -> TelaResult<Self> {
        let value: serde_json::Value = serde_json::from_str(src)
            .map_err(|e| TelaError::InvalidModel(e.to_string()))?;
        Self::from_json(value)
    }

    pub fn insert(&mut self, key: &str, value: serde_json::Value) {
        self.root.insert(key.to_string(), value);
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }
}

impl BindingResolver for ViewModel {
    /// Total resolver: a path that walks off the model resolves to null, the
    /// way a view model lookup of a missing property does.
    fn resolve(&self, expr: &str) -> Option<Value> {
        let mut segments = expr.split('.');
        let first = segments.next()?;
        let Some(mut current) = self.root.get(first) else {
            return Some(Value::Null);
        };
        for segment in segments {
            let next = match current {
                serde_json::Value::Object(map) => map.get(segment),
                serde_json::Value::Array(items) => {
                    segment.parse::<usize>().ok().and_then(|i| items.get(i))
                }
                _ => None,
            };
            match next {
                Some(v) => current = v,
                None => return Some(Value::Null),
            }
        }
        Some(json_to_value(current))
    }
}

/// Maps a JSON value onto the engine's value model: scalars become scalars,
/// arrays and objects stay opaque `data`.
pub fn json_to_value(v: &serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Int(n.as_f64().unwrap_or(0.0) as i64),
        },
        serde_json::Value::String(s) => Value::Text(s.clone()),
        other => Value::Data(other.clone()),
    }
}

fn json_type_name(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_dotted_paths() {
        let model = ViewModel::from_json(json!({
            "user": { "name": "Ada", "roles": ["admin", "dev"] },
            "count": 3
        }))
        .unwrap();

        assert_eq!(model.resolve("user.name"), Some(Value::Text("Ada".into())));
        assert_eq!(model.resolve("count"), Some(Value::Int(3)));
        assert_eq!(
            model.resolve("user.roles.1"),
            Some(Value::Text("dev".into()))
        );
        assert_eq!(model.resolve("user.missing"), Some(Value::Null));
        assert_eq!(model.resolve("missing"), Some(Value::Null));
    }

    #[test]
    fn structured_values_stay_opaque_data() {
        let model = ViewModel::from_json(json!({ "items": [1, 2] })).unwrap();
        assert_eq!(
            model.resolve("items"),
            Some(Value::Data(json!([1, 2])))
        );
    }

    #[test]
    fn model_must_be_an_object() {
        let err = ViewModel::from_json(json!([1, 2]));
        assert!(matches!(err, Err(TelaError::InvalidModel(_))));
    }
}
