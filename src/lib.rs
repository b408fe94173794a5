//! # Tela — a server-side component template engine
//!
//! Tela parses markup into a tree of typed components, validates and coerces
//! each component's declared attributes against a static type schema, and
//! renders the tree to output with structural composition (conditionals,
//! named content blocks, inclusion, parameterized subtags) and data binding
//! against a runtime view model.
//!
//! ## Features
//! - Byte-scanning tokenizer with subtag-encoded complex attributes
//! - Closed attribute type system with validation and coercion
//! - Per-kind schemas derived once and shared read-only across passes
//! - Conditional rendering (`<If>`), named content blocks (`<Content>`),
//!   dynamic inclusion (`<Include>`)
//! - Deferred `{expression}` bindings resolved against a JSON view model
//!
//! ## Example
//! ```ignore
//! use tela::{render_template, ViewModel};
//!
//! let model = ViewModel::from_json_str(r#"{ "name": "Ada" }"#)?;
//! let html = render_template(
//!     r#"<If the="{name}" isSet><p>Hello</p><Else><p>Who?</p></Else></If>"#,
//!     &model,
//! )?;
//! assert_eq!(html, "<p>Hello</p>");
//! ```
//!
//! Each render pass owns a private [`Context`] and component tree; the only
//! state shared across passes is the per-kind schema cache, which is derived
//! once and immutable thereafter, so independent passes may run in parallel.

pub mod attributes;
pub mod binding;
pub mod component;
pub mod components;
pub mod context;
pub mod error;
pub mod parser;
pub mod schema;
pub mod types;
pub mod view;

// --- Core types ---
pub use attributes::AttributeBag;
pub use binding::{BindingResolver, ViewModel};
pub use component::{ComponentKind, ComponentNode};
pub use context::Context;
pub use error::{TelaError, TelaResult};
pub use parser::Tag;
pub use schema::{AttrSpec, Schema};
pub use types::{str_to_bool, strip_authoring_artifacts, validate_scalar, AttributeType, Value};
pub use view::{load_file, FileViewLoader, ViewLoader};

/// Parse markup into a component tree rooted at a synthetic fragment node.
pub fn parse_template(src: &str) -> TelaResult<ComponentNode> {
    parser::parse(src)
}

/// Parse, bind and render markup in one pass with no view loader.
pub fn render_template(src: &str, model: &ViewModel) -> TelaResult<String> {
    Engine::new().render_str(src, model)
}

/// The engine front door: holds the view-loading configuration and runs
/// render passes. Each pass gets a fresh [`Context`]; an `Engine` may be
/// shared across passes.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    loader: Option<FileViewLoader>,
}

impl Engine {
    pub fn new() -> Self {
        Engine::default()
    }

    /// An engine that resolves `<Include view=...>` names against the given
    /// ordered search directories.
    pub fn with_view_dirs<I, P>(dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<std::path::PathBuf>,
    {
        Engine {
            loader: Some(FileViewLoader::new(dirs)),
        }
    }

    pub fn render_str(&self, src: &str, model: &ViewModel) -> TelaResult<String> {
        let mut tree = parser::parse(src)?;
        tree.databind(model)?;

        let mut ctx = Context::new();
        if let Some(loader) = &self.loader {
            ctx.set_loader(loader);
        }
        ctx.set_resolver(model);

        let mut out = String::new();
        tree.render(&mut ctx, &mut out)?;
        Ok(out)
    }

    /// Resolves a view by name through the configured loader and renders it.
    pub fn render_view(&self, name: &str, model: &ViewModel) -> TelaResult<String> {
        let loader = self.loader.as_ref().ok_or_else(|| TelaError::Config {
            component: "Engine".to_string(),
            message: "no view directories configured".to_string(),
        })?;
        let src = loader.load(name)?;
        self.render_str(&src, model)
    }
}
