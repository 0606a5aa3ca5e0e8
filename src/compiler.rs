//! Template compiler seam and compiled-template cache.
//!
//! The runtime never parses templates itself. It hands a template string and
//! a [`CompilerOptions`] to a [`TemplateCompiler`] and stores the returned
//! render routines on the instance options.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;

use crate::error::CompileError;
use crate::options::RenderFn;

/// Exactly the configuration keys a compiler receives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerOptions {
    /// Retain source locations for diagnostics (development only).
    pub output_source_range: bool,
    pub should_decode_newlines: bool,
    pub should_decode_newlines_for_href: bool,
    /// Custom interpolation markers, e.g. `("${", "}")`.
    pub delimiters: Option<(String, String)>,
    /// Keep HTML comments in the output.
    pub comments: bool,
}

#[derive(Clone)]
pub struct CompiledTemplate {
    pub render: RenderFn,
    pub static_render_fns: Vec<RenderFn>,
}

impl CompiledTemplate {
    pub fn new(render: RenderFn) -> Self {
        Self {
            render,
            static_render_fns: Vec::new(),
        }
    }

    pub fn with_static_render_fns(mut self, fns: Vec<RenderFn>) -> Self {
        self.static_render_fns = fns;
        self
    }
}

impl fmt::Debug for CompiledTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledTemplate")
            .field("static_render_fns", &self.static_render_fns.len())
            .finish()
    }
}

pub trait TemplateCompiler {
    fn compile(&self, template: &str, options: &CompilerOptions) -> Result<CompiledTemplate, CompileError>;
}

impl<F> TemplateCompiler for F
where
    F: Fn(&str, &CompilerOptions) -> Result<CompiledTemplate, CompileError>,
{
    fn compile(&self, template: &str, options: &CompilerOptions) -> Result<CompiledTemplate, CompileError> {
        self(template, options)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CACHE
// ═══════════════════════════════════════════════════════════════════════════════

/// SHA-256 over the delimiter pair and the template text.
pub fn cache_key(template: &str, options: &CompilerOptions) -> String {
    let mut hasher = Sha256::new();
    if let Some((open, close)) = &options.delimiters {
        hasher.update(open.as_bytes());
        hasher.update(close.as_bytes());
    }
    hasher.update(template.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Memoizes successful compilations keyed by delimiters and template text.
/// Failures are not cached.
pub struct CachedCompiler<C> {
    inner: C,
    cache: RefCell<HashMap<String, CompiledTemplate>>,
    hits: Cell<usize>,
}

impl<C: TemplateCompiler> CachedCompiler<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            cache: RefCell::new(HashMap::new()),
            hits: Cell::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.cache.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.borrow().is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits.get()
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl<C: TemplateCompiler> TemplateCompiler for CachedCompiler<C> {
    fn compile(&self, template: &str, options: &CompilerOptions) -> Result<CompiledTemplate, CompileError> {
        let key = cache_key(template, options);
        if let Some(hit) = self.cache.borrow().get(&key) {
            self.hits.set(self.hits.get() + 1);
            return Ok(hit.clone());
        }
        let compiled = self.inner.compile(template, options)?;
        self.cache.borrow_mut().insert(key, compiled.clone());
        Ok(compiled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::RenderContext;
    use crate::vnode::VNode;
    use std::rc::Rc;

    fn counting_compiler(calls: Rc<Cell<usize>>) -> impl TemplateCompiler {
        move |template: &str, _options: &CompilerOptions| {
            calls.set(calls.get() + 1);
            if template.is_empty() {
                return Err(CompileError::new("empty template"));
            }
            let text = template.to_string();
            let render: RenderFn = Rc::new(move |_ctx: &RenderContext<'_>| VNode::text(text.clone()));
            Ok(CompiledTemplate::new(render))
        }
    }

    #[test]
    fn test_cache_hit_skips_inner_compiler() {
        let calls = Rc::new(Cell::new(0));
        let compiler = CachedCompiler::new(counting_compiler(calls.clone()));
        let options = CompilerOptions::default();
        compiler.compile("<p>a</p>", &options).unwrap();
        compiler.compile("<p>a</p>", &options).unwrap();
        assert_eq!(calls.get(), 1);
        assert_eq!(compiler.hits(), 1);
        assert_eq!(compiler.len(), 1);
    }

    #[test]
    fn test_delimiters_are_part_of_the_key() {
        let plain = CompilerOptions::default();
        let custom = CompilerOptions {
            delimiters: Some(("${".into(), "}".into())),
            ..CompilerOptions::default()
        };
        assert_ne!(cache_key("x", &plain), cache_key("x", &custom));
        assert_eq!(cache_key("x", &plain), cache_key("x", &plain.clone()));
    }

    #[test]
    fn test_errors_are_not_cached() {
        let calls = Rc::new(Cell::new(0));
        let compiler = CachedCompiler::new(counting_compiler(calls.clone()));
        assert!(compiler.compile("", &CompilerOptions::default()).is_err());
        assert!(compiler.compile("", &CompilerOptions::default()).is_err());
        assert_eq!(calls.get(), 2);
        assert!(compiler.is_empty());
    }

    #[test]
    fn test_options_serialize_camel_case() {
        let options = CompilerOptions {
            output_source_range: true,
            ..CompilerOptions::default()
        };
        let value = serde_json::to_value(&options).unwrap();
        assert_eq!(value["outputSourceRange"], serde_json::json!(true));
        assert!(value.get("shouldDecodeNewlinesForHref").is_some());
    }
}
