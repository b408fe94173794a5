use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::component::ComponentNode;
use crate::error::{TelaError, TelaResult};

/// The closed set of attribute/property kinds.
///
/// Every declared attribute maps to exactly one of these; the type determines
/// the default value and the validation/coercion rule applied on `set`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeType {
    /// Coerced via the truthy-string rule. Never fails.
    Bool,
    /// Identifier string matching `\w+`.
    Id,
    /// Integer (numeric strings are coerced, floats truncated).
    Number,
    /// String, with authoring-artifact tail normalization.
    Text,
    /// Opaque structured data (JSON value or an unresolved `{...}` source).
    Data,
    /// A single subtag value, itself a component.
    Parameter,
    /// An ordered sequence of subtag components.
    MultipleParams,
    /// An arbitrary subtag-carried component consumed by the owner's logic.
    Metadata,
    /// A deferred expression string resolved against the view model.
    Binding,
}

impl AttributeType {
    pub fn is_scalar(self) -> bool {
        matches!(
            self,
            AttributeType::Bool | AttributeType::Id | AttributeType::Number | AttributeType::Text
        )
    }

    pub fn is_subtag(self) -> bool {
        matches!(
            self,
            AttributeType::Parameter | AttributeType::MultipleParams | AttributeType::Metadata
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            AttributeType::Bool => "bool",
            AttributeType::Id => "identifier",
            AttributeType::Number => "number",
            AttributeType::Text => "text",
            AttributeType::Data => "data",
            AttributeType::Parameter => "parameter",
            AttributeType::MultipleParams => "parameter list",
            AttributeType::Metadata => "metadata",
            AttributeType::Binding => "binding",
        }
    }
}

/// A runtime attribute value.
///
/// Scalars, opaque data and deferred bindings live side by side with
/// component-valued attributes (subtags), so a single `set` entry point can
/// dispatch on the declared kind.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
    Data(serde_json::Value),
    /// An unresolved binding expression (without the enclosing braces).
    Binding(String),
    /// A parameter component owned by the attribute container.
    Component(Box<ComponentNode>),
    /// An ordered sequence of parameter components.
    Components(Vec<ComponentNode>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The value's runtime type name, used in validation diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "number",
            Value::Text(_) => "text",
            Value::Data(_) => "data",
            Value::Binding(_) => "binding",
            Value::Component(_) => "component",
            Value::Components(_) => "component list",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// PHP-style truthiness: null, `""`, `"0"`, `0` and `false` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Text(s) => !s.is_empty() && s != "0",
            Value::Data(d) => match d {
                serde_json::Value::Null => false,
                serde_json::Value::Bool(b) => *b,
                serde_json::Value::Number(n) => n.as_f64() != Some(0.0),
                serde_json::Value::String(s) => !s.is_empty() && s != "0",
                _ => true,
            },
            Value::Binding(s) => !s.is_empty(),
            Value::Component(_) | Value::Components(_) => true,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", if *b { "true" } else { "false" }),
            Value::Int(n) => write!(f, "{}", n),
            Value::Text(s) => f.write_str(s),
            Value::Data(d) => f.write_str(&d.to_string()),
            Value::Binding(s) => write!(f, "{{{}}}", s),
            Value::Component(_) => f.write_str("[component]"),
            Value::Components(_) => f.write_str("[components]"),
        }
    }
}

/// Converts a textual description of a boolean into a true boolean.
///
/// `"true"`, `"1"`, `"yes"` and `"on"` (case-sensitive) evaluate to true;
/// all other strings evaluate to false.
pub fn str_to_bool(s: &str) -> bool {
    matches!(s, "true" | "1" | "yes" | "on")
}

/// Boolean coercion over runtime values. Total; never fails.
pub fn value_to_bool(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::Int(n) => *n == 1,
        Value::Text(s) => str_to_bool(s),
        _ => false,
    }
}

/// Loose textual equality used by conditional comparisons: both sides are
/// compared by their display form, so `1` equals `"1"`.
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        _ => a.to_string() == b.to_string(),
    }
}

fn identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\w+$").unwrap())
}

fn trailing_artifact_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<br ?/?>$|<p>&nbsp;</p>").unwrap())
}

fn nbsp_close_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"&nbsp;</p>").unwrap())
}

/// Strips rich-text authoring artifacts from the tail of a text value: a
/// trailing `<br>` (or `<br/>`), trailing empty paragraphs, and `&nbsp;`
/// padding before a paragraph close.
///
/// The rule set encodes an editor convention and is intentionally a separate
/// step; hosts with different authoring pipelines can normalize before `set`.
pub fn strip_authoring_artifacts(s: &str) -> String {
    let s = trailing_artifact_re().replace_all(s, "");
    nbsp_close_re().replace_all(&s, "</p>").into_owned()
}

/// Validates and coerces a scalar value against the given attribute type.
///
/// This is the single choke point all scalar coercion passes through: it
/// either returns a value satisfying the type's predicate (or `Null` for
/// unset/empty input) or fails with a typed error. It never substitutes a
/// silently-wrong value.
pub fn validate_scalar(ty: AttributeType, v: Value, attribute: &str) -> TelaResult<Value> {
    if v.is_null() {
        return Ok(Value::Null);
    }
    if let Value::Text(s) = &v {
        if s.is_empty() {
            return Ok(Value::Null);
        }
    }
    match ty {
        AttributeType::Bool => Ok(Value::Bool(value_to_bool(&v))),

        AttributeType::Id => match &v {
            Value::Text(s) if identifier_re().is_match(s) => Ok(v),
            Value::Int(n) => Ok(Value::Text(n.to_string())),
            other => Err(TelaError::InvalidValue {
                attribute: attribute.to_string(),
                expected: "identifier".to_string(),
                got: format!("'{}' ({})", other, other.type_name()),
            }),
        },

        AttributeType::Number => match &v {
            Value::Int(_) => Ok(v),
            Value::Text(s) => {
                if let Ok(n) = s.parse::<i64>() {
                    Ok(Value::Int(n))
                } else if let Ok(f) = s.parse::<f64>() {
                    Ok(Value::Int(f as i64))
                } else {
                    Err(TelaError::InvalidValue {
                        attribute: attribute.to_string(),
                        expected: "number".to_string(),
                        got: format!("'{}' ({})", s, v.type_name()),
                    })
                }
            }
            other => Err(TelaError::InvalidValue {
                attribute: attribute.to_string(),
                expected: "number".to_string(),
                got: format!("'{}' ({})", other, other.type_name()),
            }),
        },

        AttributeType::Text => match v {
            Value::Text(s) => Ok(Value::Text(strip_authoring_artifacts(&s))),
            // Non-string scalars pass through unchanged, supporting
            // already-resolved bound values.
            Value::Bool(_) | Value::Int(_) => Ok(v),
            other => Err(TelaError::InvalidValue {
                attribute: attribute.to_string(),
                expected: "text".to_string(),
                got: other.type_name().to_string(),
            }),
        },

        AttributeType::Data => match &v {
            Value::Data(_) => Ok(v),
            // A string containing `{` is an unresolved expression/JSON
            // fragment and passes through until resolution.
            Value::Text(s) if s.contains('{') => Ok(v),
            Value::Binding(_) => Ok(v),
            other => Err(TelaError::InvalidValue {
                attribute: attribute.to_string(),
                expected: "data".to_string(),
                got: format!("'{}' ({})", other, other.type_name()),
            }),
        },

        other => Err(TelaError::InvalidValue {
            attribute: attribute.to_string(),
            expected: "a scalar type".to_string(),
            got: format!("declaration of type {}", other.name()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn str_to_bool_truthy_table() {
        assert!(str_to_bool("true"));
        assert!(str_to_bool("1"));
        assert!(str_to_bool("yes"));
        assert!(str_to_bool("on"));
    }

    #[test]
    fn str_to_bool_falsy_table() {
        assert!(!str_to_bool("false"));
        assert!(!str_to_bool("0"));
        assert!(!str_to_bool(""));
        assert!(!str_to_bool("TRUE"));
        assert!(!str_to_bool("On"));
    }

    #[test]
    fn bool_coercion_is_total() {
        let v = validate_scalar(
            AttributeType::Bool,
            Value::Text("whatever".into()),
            "flag",
        );
        assert_eq!(v, Ok(Value::Bool(false)));
        let v = validate_scalar(AttributeType::Bool, Value::Text("yes".into()), "flag");
        assert_eq!(v, Ok(Value::Bool(true)));
    }

    #[test]
    fn id_rejects_non_word_characters() {
        let err = validate_scalar(AttributeType::Id, Value::Text("a-b".into()), "of");
        assert!(matches!(err, Err(TelaError::InvalidValue { .. })));
        let ok = validate_scalar(AttributeType::Id, Value::Text("block_1".into()), "of");
        assert_eq!(ok, Ok(Value::Text("block_1".into())));
    }

    #[test]
    fn number_coerces_numeric_strings_to_integers() {
        assert_eq!(
            validate_scalar(AttributeType::Number, Value::Text("42".into()), "n"),
            Ok(Value::Int(42))
        );
        assert_eq!(
            validate_scalar(AttributeType::Number, Value::Text("3.9".into()), "n"),
            Ok(Value::Int(3))
        );
        assert!(matches!(
            validate_scalar(AttributeType::Number, Value::Text("abc".into()), "n"),
            Err(TelaError::InvalidValue { .. })
        ));
    }

    #[test]
    fn text_passes_non_string_scalars_through() {
        assert_eq!(
            validate_scalar(AttributeType::Text, Value::Int(7), "t"),
            Ok(Value::Int(7))
        );
        assert_eq!(
            validate_scalar(AttributeType::Text, Value::Bool(true), "t"),
            Ok(Value::Bool(true))
        );
    }

    #[test]
    fn text_strips_trailing_break_and_empty_paragraph() {
        assert_eq!(strip_authoring_artifacts("hello<br>"), "hello");
        assert_eq!(strip_authoring_artifacts("hello<br/>"), "hello");
        assert_eq!(strip_authoring_artifacts("hello<br />"), "hello");
        assert_eq!(strip_authoring_artifacts("<p>x</p><p>&nbsp;</p>"), "<p>x</p>");
        assert_eq!(strip_authoring_artifacts("<p>x&nbsp;</p>"), "<p>x</p>");
        assert_eq!(strip_authoring_artifacts("plain"), "plain");
    }

    #[test]
    fn data_accepts_structures_and_unresolved_expressions() {
        let ok = validate_scalar(
            AttributeType::Data,
            Value::Data(serde_json::json!([1, 2])),
            "d",
        );
        assert!(ok.is_ok());
        let ok = validate_scalar(AttributeType::Data, Value::Text("{items}".into()), "d");
        assert!(ok.is_ok());
        let err = validate_scalar(AttributeType::Data, Value::Int(3), "d");
        assert!(matches!(err, Err(TelaError::InvalidValue { .. })));
    }

    #[test]
    fn empty_input_validates_to_null() {
        for ty in [
            AttributeType::Id,
            AttributeType::Number,
            AttributeType::Text,
            AttributeType::Data,
        ] {
            assert_eq!(validate_scalar(ty, Value::Text(String::new()), "a"), Ok(Value::Null));
            assert_eq!(validate_scalar(ty, Value::Null, "a"), Ok(Value::Null));
        }
    }

    #[test]
    fn loose_equality_compares_display_forms() {
        assert!(loose_eq(&Value::Int(1), &Value::Text("1".into())));
        assert!(!loose_eq(&Value::Null, &Value::Text("".into())));
        assert!(loose_eq(&Value::Null, &Value::Null));
    }
}
