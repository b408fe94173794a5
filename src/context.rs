use std::collections::HashMap;

use crate::binding::BindingResolver;
use crate::error::{TelaError, TelaResult};
use crate::view::{self, ViewLoader};

/// Per-pass rendering state: named content blocks, accumulated style/script
/// assets, and the host collaborators (view loader, binding resolver).
///
/// One instance is created per render pass and threaded explicitly through
/// every `render` call; it is never reused across passes. Blocks support
/// replace, append and prepend — there is no deletion primitive.
#[derive(Default)]
pub struct Context<'a> {
    blocks: HashMap<String, String>,
    styles: Vec<String>,
    scripts: Vec<String>,
    loader: Option<&'a dyn ViewLoader>,
    resolver: Option<&'a dyn BindingResolver>,
}

impl<'a> Context<'a> {
    pub fn new() -> Self {
        Context::default()
    }

    pub fn set_loader(&mut self, loader: &'a dyn ViewLoader) {
        self.loader = Some(loader);
    }

    pub fn set_resolver(&mut self, resolver: &'a dyn BindingResolver) {
        self.resolver = Some(resolver);
    }

    pub fn resolver(&self) -> Option<&'a dyn BindingResolver> {
        self.resolver
    }

    // ─── Named content blocks ───────────────────────────────────────────────

    pub fn has_block(&self, name: &str) -> bool {
        self.blocks.contains_key(name)
    }

    pub fn block(&self, name: &str) -> Option<&str> {
        self.blocks.get(name).map(String::as_str)
    }

    pub fn set_block(&mut self, name: &str, content: String) {
        self.blocks.insert(name.to_string(), content);
    }

    pub fn append_to_block(&mut self, name: &str, content: &str) {
        self.blocks.entry(name.to_string()).or_default().push_str(content);
    }

    pub fn prepend_to_block(&mut self, name: &str, content: &str) {
        let block = self.blocks.entry(name.to_string()).or_default();
        block.insert_str(0, content);
    }

    // ─── Style/script asset accumulation ────────────────────────────────────

    pub fn add_style(&mut self, style: String) {
        self.styles.push(style);
    }

    pub fn add_script(&mut self, script: String) {
        self.scripts.push(script);
    }

    pub fn output_styles(&self, out: &mut String) {
        for style in &self.styles {
            out.push_str(style);
        }
    }

    pub fn output_scripts(&self, out: &mut String) {
        for script in &self.scripts {
            out.push_str(script);
        }
    }

    // ─── Collaborator access ────────────────────────────────────────────────

    pub fn load_view(&self, name: &str) -> TelaResult<String> {
        match self.loader {
            Some(loader) => loader.load(name),
            None => Err(TelaError::Config {
                component: "Include".to_string(),
                message: "no view loader is configured for this render pass".to_string(),
            }),
        }
    }

    /// Reads a raw file through the loader's search paths (falling back to
    /// the path as given). `None` means unreadable; the caller decides
    /// whether that is fatal.
    pub fn load_raw_file(&self, path: &str) -> Option<String> {
        view::read_raw(path, &self.search_paths())
    }

    pub fn search_paths(&self) -> Vec<String> {
        self.loader.map(|l| l.search_paths()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_policies_replace_append_prepend() {
        let mut ctx = Context::new();
        ctx.set_block("x", "B".to_string());
        ctx.append_to_block("x", "C");
        ctx.prepend_to_block("x", "A");
        assert_eq!(ctx.block("x"), Some("ABC"));

        ctx.set_block("x", "Z".to_string());
        assert_eq!(ctx.block("x"), Some("Z"));
    }

    #[test]
    fn append_to_missing_block_creates_it() {
        let mut ctx = Context::new();
        assert!(!ctx.has_block("late"));
        ctx.append_to_block("late", "tail");
        assert_eq!(ctx.block("late"), Some("tail"));
    }

    #[test]
    fn assets_emit_in_registration_order() {
        let mut ctx = Context::new();
        ctx.add_style("<style>a</style>".to_string());
        ctx.add_style("<style>b</style>".to_string());
        let mut out = String::new();
        ctx.output_styles(&mut out);
        assert_eq!(out, "<style>a</style><style>b</style>");
    }
}
