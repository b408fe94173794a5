use crate::attributes::AttributeBag;
use crate::binding::BindingResolver;
use crate::components;
use crate::context::Context;
use crate::error::TelaResult;
use crate::types::{validate_scalar, AttributeType, Value};

/// Discriminates the node's rendering behavior. All variants share the same
/// node shape; only `render` differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    /// Synthetic document root; renders its children only.
    Fragment,
    /// A literal text span.
    Text,
    /// A literal markup element, emitted verbatim with its attributes.
    Html,
    If,
    Content,
    Include,
    /// A subtag-encoded attribute value. Not rendered automatically.
    Parameter,
    /// An arbitrary subtag-carried component. Not rendered automatically.
    Metadata,
}

/// One markup element: a tag name, an attributes container, and exclusively
/// owned children. Parameter components are owned by the attributes
/// container instead of the child list.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentNode {
    kind: ComponentKind,
    tag_name: String,
    text: String,
    allows_children: bool,
    has_body: bool,
    attrs: AttributeBag,
    children: Vec<ComponentNode>,
    param_type: AttributeType,
    value: Value,
}

impl ComponentNode {
    fn new(kind: ComponentKind, tag_name: &str, attrs: AttributeBag, allows_children: bool) -> Self {
        ComponentNode {
            kind,
            tag_name: tag_name.to_string(),
            text: String::new(),
            allows_children,
            has_body: false,
            attrs,
            children: Vec::new(),
            param_type: AttributeType::Metadata,
            value: Value::Null,
        }
    }

    /// The synthetic root wrapping a parsed document.
    pub fn fragment() -> Self {
        Self::new(ComponentKind::Fragment, "", AttributeBag::open("fragment"), true)
    }

    pub fn text(content: &str) -> Self {
        let mut node = Self::new(ComponentKind::Text, "", AttributeBag::open("text"), false);
        node.text = content.to_string();
        node
    }

    pub fn html(tag: &str) -> Self {
        Self::new(ComponentKind::Html, tag, AttributeBag::open(tag), true)
    }

    pub fn structural(kind: ComponentKind, tag: &str) -> Self {
        let schema = components::schema_for(kind);
        let allows_children = !matches!(kind, ComponentKind::Include);
        Self::new(kind, tag, AttributeBag::with_schema(schema), allows_children)
    }

    /// A parameter/metadata carrier for the named attribute.
    pub fn parameter(name: &str, ty: AttributeType) -> Self {
        let kind = if ty == AttributeType::Metadata {
            ComponentKind::Metadata
        } else {
            ComponentKind::Parameter
        };
        let mut node = Self::new(kind, name, AttributeBag::open(name), true);
        node.param_type = ty;
        node
    }

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    pub fn tag_name(&self) -> &str {
        &self.tag_name
    }

    pub fn text_content(&self) -> &str {
        &self.text
    }

    pub fn allows_children(&self) -> bool {
        self.allows_children
    }

    pub fn has_body(&self) -> bool {
        self.has_body
    }

    pub fn set_has_body(&mut self, has_body: bool) {
        self.has_body = has_body;
    }

    pub fn attrs(&self) -> &AttributeBag {
        &self.attrs
    }

    pub fn attrs_mut(&mut self) -> &mut AttributeBag {
        &mut self.attrs
    }

    pub fn children(&self) -> &[ComponentNode] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut [ComponentNode] {
        &mut self.children
    }

    pub fn add_child(&mut self, child: ComponentNode) {
        self.children.push(child);
    }

    pub fn set_children(&mut self, children: Vec<ComponentNode>) {
        self.children = children;
    }

    /// The attribute type this parameter/metadata node carries a value for.
    pub fn param_type(&self) -> AttributeType {
        self.param_type
    }

    /// Sets the carried scalar payload, validated against the carried type.
    pub fn set_scalar(&mut self, v: Value) -> TelaResult<()> {
        self.value = validate_scalar(self.param_type, v, &self.tag_name)?;
        Ok(())
    }

    /// The carried value: the scalar payload when one was set, otherwise the
    /// node's children stand in as the (content) value.
    pub fn param_value(&self) -> Value {
        if self.value.is_null() && !self.children.is_empty() {
            Value::Components(self.children.clone())
        } else {
            self.value.clone()
        }
    }

    /// Resolves deferred bindings in this subtree against the view model.
    pub fn databind(&mut self, resolver: &dyn BindingResolver) -> TelaResult<()> {
        self.attrs.databind(resolver)?;
        for child in &mut self.children {
            child.databind(resolver)?;
        }
        Ok(())
    }

    /// Renders this node depth-first into `out`, consulting `ctx` for block
    /// storage, assets and view loading.
    ///
    /// Parameter and metadata nodes render nothing here: their children are
    /// often alternate representations, so the owning component must choose
    /// to render them (see `render_children`).
    pub fn render(&mut self, ctx: &mut Context<'_>, out: &mut String) -> TelaResult<()> {
        match self.kind {
            ComponentKind::Text => {
                out.push_str(&self.text);
                Ok(())
            }
            ComponentKind::Fragment => self.render_children(ctx, out),
            ComponentKind::Html => self.render_html(ctx, out),
            ComponentKind::If => components::render_if(self, ctx, out),
            ComponentKind::Content => components::render_content(self, ctx, out),
            ComponentKind::Include => components::render_include(self, ctx, out),
            ComponentKind::Parameter | ComponentKind::Metadata => Ok(()),
        }
    }

    pub fn render_children(&mut self, ctx: &mut Context<'_>, out: &mut String) -> TelaResult<()> {
        for child in &mut self.children {
            child.render(ctx, out)?;
        }
        Ok(())
    }

    fn render_html(&mut self, ctx: &mut Context<'_>, out: &mut String) -> TelaResult<()> {
        out.push('<');
        out.push_str(&self.tag_name);
        for (name, value) in self.attrs.iter_set() {
            match value {
                Value::Bool(true) => {
                    out.push(' ');
                    out.push_str(name);
                }
                Value::Bool(false) => {}
                v => {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    push_escaped_attr(out, &v.to_string());
                    out.push('"');
                }
            }
        }
        if self.children.is_empty() && !self.has_body {
            out.push_str("/>");
            return Ok(());
        }
        out.push('>');
        self.render_children(ctx, out)?;
        out.push_str("</");
        out.push_str(&self.tag_name);
        out.push('>');
        Ok(())
    }
}

fn push_escaped_attr(out: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            '"' => out.push_str("&quot;"),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            c => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;

    #[test]
    fn clone_isolates_subtree_state() {
        let mut original = ComponentNode::html("div");
        original
            .attrs_mut()
            .set("class", Value::Text("card".into()))
            .unwrap();
        original.add_child(ComponentNode::text("body"));

        let mut copy = original.clone();
        copy.attrs_mut()
            .set("class", Value::Text("panel".into()))
            .unwrap();
        copy.set_children(vec![]);

        assert_eq!(original.attrs().get_text("class"), Some("card"));
        assert_eq!(original.children().len(), 1);
        assert_eq!(copy.attrs().get_text("class"), Some("panel"));
    }

    #[test]
    fn html_rendering_escapes_attribute_values() {
        let mut node = ComponentNode::html("a");
        node.attrs_mut()
            .set("href", Value::Text("/x?a=1&b=\"2\"".into()))
            .unwrap();
        node.add_child(ComponentNode::text("link"));

        let mut ctx = Context::new();
        let mut out = String::new();
        node.render(&mut ctx, &mut out).unwrap();
        assert_eq!(out, "<a href=\"/x?a=1&amp;b=&quot;2&quot;\">link</a>");
    }

    #[test]
    fn bodyless_html_renders_self_closing() {
        let mut node = ComponentNode::html("br");
        let mut ctx = Context::new();
        let mut out = String::new();
        node.render(&mut ctx, &mut out).unwrap();
        assert_eq!(out, "<br/>");
    }

    #[test]
    fn parameter_nodes_do_not_render_automatically() {
        let mut node = ComponentNode::parameter("else", AttributeType::Parameter);
        node.add_child(ComponentNode::text("hidden"));
        let mut ctx = Context::new();
        let mut out = String::new();
        node.render(&mut ctx, &mut out).unwrap();
        assert_eq!(out, "");
    }

    #[test]
    fn parameter_value_is_the_scalar_payload_or_the_children() {
        let mut scalar = ComponentNode::parameter("limit", AttributeType::Number);
        scalar.set_scalar(Value::Text("42".into())).unwrap();
        assert_eq!(scalar.param_value(), Value::Int(42));

        let mut content = ComponentNode::parameter("template", AttributeType::Metadata);
        content.add_child(ComponentNode::text("body"));
        assert!(matches!(content.param_value(), Value::Components(_)));
    }
}
