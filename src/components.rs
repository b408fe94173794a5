//! The structural components: conditional rendering (`If`), named content
//! blocks (`Content`) and dynamic inclusion (`Include`), plus their schemas.
//!
//! Each schema is derived exactly once per process and shared read-only by
//! every instance; concurrent first use is resolved idempotently by the
//! `OnceLock` guards.

use std::sync::OnceLock;

use regex::Regex;

use crate::component::{ComponentKind, ComponentNode};
use crate::context::Context;
use crate::error::{TelaError, TelaResult};
use crate::parser;
use crate::schema::Schema;
use crate::types::{loose_eq, value_to_bool, Value};

pub(crate) fn schema_for(kind: ComponentKind) -> &'static Schema {
    match kind {
        ComponentKind::If => if_schema(),
        ComponentKind::Content => content_schema(),
        ComponentKind::Include => include_schema(),
        other => unreachable!("component kind {:?} has no schema", other),
    }
}

fn if_schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        Schema::build("If")
            .text("the")
            .text("is")
            .bool("isSet")
            .bool("isTrue")
            .bool("not")
            .text("matches")
            .multiple_params("case")
            .parameter("else")
            .finish()
    })
}

fn content_schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        Schema::build("Content")
            .id("of")
            .id("appendTo")
            .id("prependTo")
            .bool("byDefault")
            .text("value")
            .finish()
    })
}

fn include_schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        Schema::build("Include")
            .text("view")
            .text("file")
            .bool("styles")
            .bool("scripts")
            .finish()
    })
}

/// Conditional rendering. Predicates evaluate in strict priority order and
/// the first recognized one wins, even when several are present:
/// `is`, `isSet`, `isTrue`, `matches`, `case`, then plain truthiness of
/// `the`. `not` toggles the chosen predicate's outcome. A failed predicate
/// renders the `else` parameter, if any.
pub(crate) fn render_if(
    node: &mut ComponentNode,
    ctx: &mut Context<'_>,
    out: &mut String,
) -> TelaResult<()> {
    let the = node.attrs().get("the").clone();
    let not = node.attrs().get_bool("not");

    let is = node.attrs().get("is").clone();
    if !is.is_null() {
        // With no `the`, `is` itself is coerced to boolean and compared
        // against true; otherwise the two values compare loosely.
        let cond = if the.is_null() {
            value_to_bool(&is)
        } else {
            loose_eq(&the, &is)
        };
        return render_branch(node, cond ^ not, ctx, out);
    }

    if node.attrs().get_bool("isSet") {
        let cond = !the.is_null() && the.as_text() != Some("");
        return render_branch(node, cond ^ not, ctx, out);
    }

    if node.attrs().get_bool("isTrue") {
        return render_branch(node, value_to_bool(&the) ^ not, ctx, out);
    }

    let pattern = node.attrs().get("matches").clone();
    if let Value::Text(pattern) = &pattern {
        let re = Regex::new(pattern).map_err(|e| TelaError::InvalidValue {
            attribute: "matches".to_string(),
            expected: "a regular expression".to_string(),
            got: format!("'{}' ({})", pattern, e),
        })?;
        let subject = if the.is_null() { String::new() } else { the.to_string() };
        return render_branch(node, re.is_match(&subject) ^ not, ctx, out);
    }

    let has_cases = matches!(node.attrs().get("case"), Value::Components(_));
    if has_cases {
        let matched = match node.attrs().get("case") {
            Value::Components(cases) => cases
                .iter()
                .find(|case| loose_eq(&the, case.attrs().get("is")))
                .map(|case| case.children().to_vec()),
            _ => None,
        };
        // The matched case's children replace this node's own children; the
        // clones are then rendered in place. A later render of the same node
        // renders the substituted children without re-matching.
        if let Some(children) = matched {
            log::debug!("<If> case matched for value '{}'", the);
            node.set_children(children);
            return node.render_children(ctx, out);
        }
        return render_else(node, ctx, out);
    }

    render_branch(node, the.is_truthy(), ctx, out)
}

fn render_branch(
    node: &mut ComponentNode,
    cond: bool,
    ctx: &mut Context<'_>,
    out: &mut String,
) -> TelaResult<()> {
    if cond {
        node.render_children(ctx, out)
    } else {
        render_else(node, ctx, out)
    }
}

fn render_else(
    node: &mut ComponentNode,
    ctx: &mut Context<'_>,
    out: &mut String,
) -> TelaResult<()> {
    match node.attrs_mut().get_component_mut("else") {
        Some(param) => param.render_children(ctx, out),
        None => Ok(()),
    }
}

/// Saves content to a named block on the rendering context. The payload is
/// the `value` property when set, otherwise the node's rendered children.
/// Exactly one of `of` (replace), `appendTo` or `prependTo` selects the
/// write policy; `byDefault` makes the first writer win.
pub(crate) fn render_content(
    node: &mut ComponentNode,
    ctx: &mut Context<'_>,
    _out: &mut String,
) -> TelaResult<()> {
    let explicit = node.attrs().get("value").clone();
    let payload = match explicit {
        Value::Null => {
            let mut buf = String::new();
            node.render_children(ctx, &mut buf)?;
            buf
        }
        v => v.to_string(),
    };
    let by_default = node.attrs().get_bool("byDefault");

    if let Some(name) = non_empty(node.attrs().get_text("of")) {
        if by_default && ctx.has_block(name) {
            return Ok(());
        }
        ctx.set_block(name, payload);
    } else if let Some(name) = non_empty(node.attrs().get_text("appendTo")) {
        if by_default && ctx.has_block(name) {
            return Ok(());
        }
        ctx.append_to_block(name, &payload);
    } else if let Some(name) = non_empty(node.attrs().get_text("prependTo")) {
        if by_default && ctx.has_block(name) {
            return Ok(());
        }
        ctx.prepend_to_block(name, &payload);
    } else {
        return Err(TelaError::Config {
            component: "Content".to_string(),
            message: "one of 'of', 'appendTo' or 'prependTo' must be set".to_string(),
        });
    }
    Ok(())
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}

/// Renders a named view, a raw file's contents, or the context's accumulated
/// style/script assets, in that priority order.
pub(crate) fn render_include(
    node: &mut ComponentNode,
    ctx: &mut Context<'_>,
    out: &mut String,
) -> TelaResult<()> {
    let view = node.attrs().get_text("view").map(str::to_string);
    if let Some(view) = view.filter(|v| !v.is_empty()) {
        log::debug!("<Include> loading view '{}'", view);
        let src = ctx.load_view(&view)?;
        let mut tree = parser::parse(&src)?;
        if let Some(resolver) = ctx.resolver() {
            tree.databind(resolver)?;
        }
        return tree.render(ctx, out);
    }

    let file = node.attrs().get_text("file").map(str::to_string);
    if let Some(file) = file.filter(|f| !f.is_empty()) {
        return match ctx.load_raw_file(&file) {
            Some(content) => {
                out.push_str(&content);
                Ok(())
            }
            None => Err(TelaError::FileNotFound {
                path: file,
                search_paths: ctx.search_paths(),
            }),
        };
    }

    if node.attrs().get_bool("styles") {
        ctx.output_styles(out);
        return Ok(());
    }
    if node.attrs().get_bool("scripts") {
        ctx.output_scripts(out);
        return Ok(());
    }
    Ok(())
}
