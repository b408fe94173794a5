use std::sync::atomic::{AtomicUsize, Ordering};

use crate::types::{AttributeType, Value};

/// Counts schema derivations process-wide. Each component kind's schema must
/// be derived exactly once, no matter how many instances are created or how
/// many passes run concurrently.
static DERIVATIONS: AtomicUsize = AtomicUsize::new(0);

pub fn derivation_count() -> usize {
    DERIVATIONS.load(Ordering::Relaxed)
}

/// Per-attribute declaration: type, default, optional enumeration, required
/// flag and the never-dirty exclusion.
#[derive(Debug, Clone, PartialEq)]
pub struct AttrSpec {
    pub ty: AttributeType,
    pub default: Value,
    pub enum_values: Option<&'static [&'static str]>,
    pub required: bool,
    pub never_dirty: bool,
}

/// The immutable, per-component-kind map of attribute name to declaration.
///
/// Derived once per kind (see the `OnceLock` statics in `components`) and
/// shared read-only by every instance thereafter.
#[derive(Debug, PartialEq)]
pub struct Schema {
    component: &'static str,
    attrs: Vec<(&'static str, AttrSpec)>,
}

impl Schema {
    pub fn build(component: &'static str) -> SchemaBuilder {
        SchemaBuilder {
            component,
            attrs: Vec::new(),
        }
    }

    pub fn component(&self) -> &'static str {
        self.component
    }

    pub fn spec(&self, name: &str) -> Option<&AttrSpec> {
        self.attrs.iter().find(|(n, _)| *n == name).map(|(_, s)| s)
    }

    pub fn defines(&self, name: &str) -> bool {
        self.spec(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &AttrSpec)> {
        self.attrs.iter().map(|(n, s)| (*n, s))
    }
}

/// Declares a component kind's attributes. Scalar declarations carry the
/// type's canonical default; `text`/`id` default to `Null` so components can
/// distinguish "never set" from the empty string.
pub struct SchemaBuilder {
    component: &'static str,
    attrs: Vec<(&'static str, AttrSpec)>,
}

impl SchemaBuilder {
    fn add(mut self, name: &'static str, ty: AttributeType, default: Value) -> Self {
        assert!(
            !self.attrs.iter().any(|(n, _)| *n == name),
            "duplicate attribute declaration '{}' for component '{}'",
            name,
            self.component
        );
        self.attrs.push((
            name,
            AttrSpec {
                ty,
                default,
                enum_values: None,
                required: false,
                never_dirty: false,
            },
        ));
        self
    }

    pub fn bool(self, name: &'static str) -> Self {
        self.add(name, AttributeType::Bool, Value::Bool(false))
    }

    pub fn id(self, name: &'static str) -> Self {
        self.add(name, AttributeType::Id, Value::Null)
    }

    pub fn number(self, name: &'static str) -> Self {
        self.add(name, AttributeType::Number, Value::Int(0))
    }

    pub fn text(self, name: &'static str) -> Self {
        self.add(name, AttributeType::Text, Value::Null)
    }

    pub fn text_default(self, name: &'static str, default: &str) -> Self {
        self.add(name, AttributeType::Text, Value::Text(default.to_string()))
    }

    pub fn data(self, name: &'static str) -> Self {
        self.add(name, AttributeType::Data, Value::Null)
    }

    pub fn parameter(self, name: &'static str) -> Self {
        self.add(name, AttributeType::Parameter, Value::Null)
    }

    pub fn multiple_params(self, name: &'static str) -> Self {
        self.add(name, AttributeType::MultipleParams, Value::Null)
    }

    pub fn metadata(self, name: &'static str) -> Self {
        self.add(name, AttributeType::Metadata, Value::Null)
    }

    pub fn binding(self, name: &'static str) -> Self {
        self.add(name, AttributeType::Binding, Value::Null)
    }

    /// Restricts the most recently declared attribute to an ordered set of
    /// allowed values (exact, case-sensitive membership).
    pub fn enumeration(mut self, values: &'static [&'static str]) -> Self {
        let (name, spec) = self
            .attrs
            .last_mut()
            .unwrap_or_else(|| panic!("enumeration() before any attribute declaration"));
        assert!(
            spec.ty.is_scalar(),
            "enumeration on non-scalar attribute '{}'",
            name
        );
        spec.enum_values = Some(values);
        self
    }

    /// Marks the most recently declared attribute as mandatory.
    pub fn required(mut self) -> Self {
        let (_, spec) = self
            .attrs
            .last_mut()
            .unwrap_or_else(|| panic!("required() before any attribute declaration"));
        spec.required = true;
        self
    }

    /// Excludes the most recently declared attribute from dirty tracking.
    pub fn never_dirty(mut self) -> Self {
        let (_, spec) = self
            .attrs
            .last_mut()
            .unwrap_or_else(|| panic!("never_dirty() before any attribute declaration"));
        spec.never_dirty = true;
        self
    }

    pub fn finish(self) -> Schema {
        DERIVATIONS.fetch_add(1, Ordering::Relaxed);
        Schema {
            component: self.component,
            attrs: self.attrs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_records_types_defaults_and_flags() {
        let schema = Schema::build("Sample")
            .text("title")
            .bool("active")
            .number("count")
            .id("target")
            .required()
            .text("mode")
            .enumeration(&["a", "b"])
            .finish();

        assert_eq!(schema.spec("title").unwrap().default, Value::Null);
        assert_eq!(schema.spec("active").unwrap().default, Value::Bool(false));
        assert_eq!(schema.spec("count").unwrap().default, Value::Int(0));
        assert!(schema.spec("target").unwrap().required);
        assert_eq!(schema.spec("mode").unwrap().enum_values, Some(&["a", "b"][..]));
        assert!(!schema.defines("missing"));
    }

    #[test]
    #[should_panic(expected = "duplicate attribute declaration")]
    fn builder_rejects_duplicate_declarations() {
        let _ = Schema::build("Sample").text("x").bool("x");
    }
}
