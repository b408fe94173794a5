use crate::binding::BindingResolver;
use crate::component::ComponentNode;
use crate::error::{TelaError, TelaResult};
use crate::schema::Schema;
use crate::types::{validate_scalar, value_to_bool, AttributeType, Value};

static NULL: Value = Value::Null;

/// The per-instance attribute/property container.
///
/// Holds the current value for every schema key (initialized from defaults)
/// plus a dirty flag that records whether any explicit `set` moved a value
/// away from its default. Attributes of subtag type own nested component
/// instances; cloning the bag deep-copies them, so no subtree is ever aliased
/// between two logical placements.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeBag {
    schema: Option<&'static Schema>,
    owner: String,
    values: Vec<(String, Value)>,
    modified: bool,
}

impl AttributeBag {
    /// A bag validated against a component kind's schema, prefilled with the
    /// schema's default values.
    pub fn with_schema(schema: &'static Schema) -> Self {
        let values = schema
            .iter()
            .map(|(name, spec)| (name.to_string(), spec.default.clone()))
            .collect();
        AttributeBag {
            schema: Some(schema),
            owner: schema.component().to_string(),
            values,
            modified: false,
        }
    }

    /// An open bag for literal markup elements and parameter subtags, which
    /// accept arbitrary attributes as text.
    pub fn open(owner: &str) -> Self {
        AttributeBag {
            schema: None,
            owner: owner.to_string(),
            values: Vec::new(),
            modified: false,
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn modified(&self) -> bool {
        self.modified
    }

    pub fn defines(&self, name: &str) -> bool {
        match self.schema {
            Some(schema) => schema.defines(name),
            None => true,
        }
    }

    /// True when the attribute may be expressed in subtag form.
    pub fn is_subtag_attr(&self, name: &str) -> bool {
        self.attr_type(name).is_some_and(|ty| ty.is_subtag())
    }

    pub fn attr_type(&self, name: &str) -> Option<AttributeType> {
        self.schema.and_then(|s| s.spec(name)).map(|spec| spec.ty)
    }

    pub fn get(&self, name: &str) -> &Value {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
            .unwrap_or(&NULL)
    }

    pub fn get_text(&self, name: &str) -> Option<&str> {
        self.get(name).as_text()
    }

    pub fn get_bool(&self, name: &str) -> bool {
        value_to_bool(self.get(name))
    }

    pub fn get_component_mut(&mut self, name: &str) -> Option<&mut ComponentNode> {
        match self.slot_mut(name) {
            Some(Value::Component(c)) => Some(c),
            _ => None,
        }
    }

    pub fn get_components(&self, name: &str) -> Option<&[ComponentNode]> {
        match self.get(name) {
            Value::Components(cs) => Some(cs),
            _ => None,
        }
    }

    /// Attribute names with a non-null current value, in insertion order.
    pub fn iter_set(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(n, v)| (n.as_str(), v))
    }

    fn slot_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.values
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// The value slot for `name`, created as `Null` when absent.
    fn slot_entry(&mut self, name: &str) -> &mut Value {
        let idx = match self.values.iter().position(|(n, _)| n == name) {
            Some(i) => i,
            None => {
                self.values.push((name.to_string(), Value::Null));
                self.values.len() - 1
            }
        };
        &mut self.values[idx].1
    }

    fn store(&mut self, name: &str, value: Value) {
        *self.slot_entry(name) = value;
    }

    /// Sets an attribute, dispatching on its declared kind.
    ///
    /// Scalars are enum-checked and coerced through `validate_scalar`; a
    /// `parameter` value is treated as literal text content appended to a
    /// lazily materialized parameter component; other subtag kinds are stored
    /// as given (structural re-parenting happens through cloning).
    pub fn set(&mut self, name: &str, value: Value) -> TelaResult<()> {
        let Some(schema) = self.schema else {
            // Open bags accept anything, stored as-is.
            self.store(name, value);
            self.modified = true;
            return Ok(());
        };
        let Some(spec) = schema.spec(name) else {
            return Err(TelaError::UnknownAttribute {
                component: self.owner.clone(),
                attribute: name.to_string(),
            });
        };
        let (ty, never_dirty, enum_values) = (spec.ty, spec.never_dirty, spec.enum_values);

        if ty.is_scalar() {
            if let Some(allowed) = enum_values {
                let text = value.to_string();
                if !allowed.contains(&text.as_str()) {
                    return Err(TelaError::InvalidEnum {
                        attribute: name.to_string(),
                        value: text,
                        allowed: allowed.join(", "),
                    });
                }
            }
            let new_value = validate_scalar(ty, value, name)?;
            if *self.get(name) != new_value {
                self.store(name, new_value);
                if !never_dirty {
                    self.modified = true;
                }
            }
            return Ok(());
        }

        match ty {
            AttributeType::Parameter => {
                let text = ComponentNode::text(&value.to_string());
                let slot = self.slot_entry(name);
                if let Value::Component(param) = slot {
                    param.add_child(text);
                } else {
                    let mut param = ComponentNode::parameter(name, AttributeType::Parameter);
                    param.add_child(text);
                    *slot = Value::Component(Box::new(param));
                }
                self.modified = true;
            }
            AttributeType::Data => {
                let new_value = validate_scalar(ty, value, name)?;
                self.store(name, new_value);
                self.modified = true;
            }
            _ => {
                self.store(name, value);
                self.modified = true;
            }
        }
        Ok(())
    }

    /// Parser entry point for string attribute values. A whole-attribute
    /// `{...}` expression is stored deferred and only validated once the
    /// binding resolves.
    pub fn set_raw(&mut self, name: &str, raw: &str) -> TelaResult<()> {
        if !self.defines(name) {
            return Err(TelaError::UnknownAttribute {
                component: self.owner.clone(),
                attribute: name.to_string(),
            });
        }
        let trimmed = raw.trim();
        if trimmed.len() > 2 && trimmed.starts_with('{') && trimmed.ends_with('}') {
            let expr = trimmed[1..trimmed.len() - 1].to_string();
            self.store(name, Value::Binding(expr));
            self.modified = true;
            return Ok(());
        }
        self.set(name, Value::Text(raw.to_string()))
    }

    /// A bare attribute (no value) commits as boolean `true`.
    pub fn set_bare(&mut self, name: &str) -> TelaResult<()> {
        self.set(name, Value::Bool(true))
    }

    /// Binds a subtag-encoded component to its attribute slot: `parameter`
    /// and `metadata` attributes hold a single component, `multipleParams`
    /// accumulates an ordered sequence.
    pub fn set_subtag(&mut self, name: &str, node: ComponentNode) -> TelaResult<()> {
        let Some(schema) = self.schema else {
            return Err(TelaError::NotASubtag {
                component: self.owner.clone(),
                attribute: name.to_string(),
            });
        };
        let Some(spec) = schema.spec(name) else {
            return Err(TelaError::UnknownAttribute {
                component: self.owner.clone(),
                attribute: name.to_string(),
            });
        };
        match spec.ty {
            AttributeType::Parameter | AttributeType::Metadata => {
                self.store(name, Value::Component(Box::new(node)));
            }
            AttributeType::MultipleParams => {
                let slot = self.slot_entry(name);
                if let Value::Components(seq) = slot {
                    seq.push(node);
                } else {
                    *slot = Value::Components(vec![node]);
                }
            }
            _ => {
                return Err(TelaError::NotASubtag {
                    component: self.owner.clone(),
                    attribute: name.to_string(),
                })
            }
        }
        self.modified = true;
        Ok(())
    }

    /// Every required attribute must hold a value once the component's tag
    /// closes.
    pub fn check_required(&self) -> TelaResult<()> {
        let Some(schema) = self.schema else {
            return Ok(());
        };
        for (name, spec) in schema.iter() {
            if spec.required && self.get(name).is_null() {
                return Err(TelaError::MissingAttribute {
                    component: self.owner.clone(),
                    attribute: name.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Resolves deferred binding expressions against the view model. Resolved
    /// values re-enter `set`, so declared-type coercion and enum checks apply
    /// to them; unresolvable expressions keep their raw form.
    pub fn databind(&mut self, resolver: &dyn BindingResolver) -> TelaResult<()> {
        let pending: Vec<(String, String)> = self
            .values
            .iter()
            .filter_map(|(n, v)| match v {
                Value::Binding(expr) => Some((n.clone(), expr.clone())),
                _ => None,
            })
            .collect();
        for (name, expr) in pending {
            if let Some(resolved) = resolver.resolve(&expr) {
                self.set(&name, resolved)?;
            } else {
                log::debug!("binding '{{{}}}' on '{}' left unresolved", expr, self.owner);
            }
        }
        // Subtag-held components may carry bindings of their own.
        for (_, value) in self.values.iter_mut() {
            match value {
                Value::Component(c) => c.databind(resolver)?,
                Value::Components(cs) => {
                    for c in cs {
                        c.databind(resolver)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}
