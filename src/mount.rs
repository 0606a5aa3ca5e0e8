//! Compile-and-mount pipeline.
//!
//! Wraps the base mount primitive ([`crate::subsystems::Subsystems::mount_component`]):
//!
//! 1. resolve the target; `<html>` and `<body>` are refused outright
//! 2. an explicit `render` routine is never replaced
//! 3. otherwise derive a template from `template` (`#id`, element, or
//!    markup) or from the target's outer markup
//! 4. compile it and store `render` / `staticRenderFns` on `$options`
//! 5. hand off to the base mount
//!
//! Usage errors are reported through [`crate::debug::warn`]; when the mount is
//! aborted the instance is returned as it was.

use serde_json::Value;
use std::rc::Rc;

use crate::compiler::CompilerOptions;
use crate::config;
use crate::debug::warn;
use crate::dom::Element;
use crate::instance::{Instance, InstanceRef};
use crate::options::OptionValue;
use crate::perf;
use crate::runtime::Runtime;

#[derive(Debug, Clone)]
pub enum MountTarget {
    Selector(String),
    Element(Element),
}

impl From<&str> for MountTarget {
    fn from(selector: &str) -> Self {
        MountTarget::Selector(selector.to_string())
    }
}

impl From<String> for MountTarget {
    fn from(selector: String) -> Self {
        MountTarget::Selector(selector)
    }
}

impl From<Element> for MountTarget {
    fn from(el: Element) -> Self {
        MountTarget::Element(el)
    }
}

/// Where the template came from, before compilation.
enum TemplateSource {
    Markup(String),
    Invalid,
    Absent,
}

/// An empty string or `null` template counts as no template at all.
fn is_blank_template(template: &OptionValue) -> bool {
    match template {
        OptionValue::Json(value) => match value.as_ref() {
            Value::Null => true,
            Value::String(markup) => markup.is_empty(),
            _ => false,
        },
        _ => false,
    }
}

impl Runtime {
    pub fn mount(&self, vm: &InstanceRef, target: Option<MountTarget>, hydrating: bool) -> InstanceRef {
        let el = target.and_then(|target| self.query(target, &vm.borrow()));

        if let Some(el) = &el {
            if self.dom.is_document_root(el) {
                if config::is_dev() {
                    warn(
                        "Do not mount the root instance to <html> or <body> - mount to normal \
                         elements instead.",
                        Some(&*vm.borrow()),
                    );
                }
                return vm.clone();
            }
        }

        let has_render = vm.borrow().options.render().is_some();
        if !has_render {
            let template = match self.derive_template(vm, el.as_ref()) {
                TemplateSource::Invalid => return vm.clone(),
                TemplateSource::Absent => None,
                TemplateSource::Markup(markup) => Some(markup),
            };
            if let Some(template) = template.filter(|t| !t.is_empty()) {
                self.compile_into(vm, &template);
            }
        }

        self.subsystems.mount_component(vm, el, hydrating);
        vm.clone()
    }

    fn query(&self, target: MountTarget, vm: &Instance) -> Option<Element> {
        match target {
            MountTarget::Element(el) => Some(el),
            MountTarget::Selector(selector) => {
                let found = self.dom.query(&selector);
                if found.is_none() && config::is_dev() {
                    warn(&format!("Cannot find element: {}", selector), Some(vm));
                }
                found
            }
        }
    }

    fn derive_template(&self, vm: &InstanceRef, el: Option<&Element>) -> TemplateSource {
        let template = vm.borrow().options.get("template").filter(|t| !is_blank_template(t));
        match template {
            Some(OptionValue::Json(value)) => match value.as_str() {
                Some(id) if id.starts_with('#') => {
                    let markup = self.template_for_id(id);
                    if markup.as_deref().map_or(true, str::is_empty) && config::is_dev() {
                        warn(
                            &format!("Template element not found or is empty: {}", id),
                            Some(&*vm.borrow()),
                        );
                    }
                    markup.map_or(TemplateSource::Absent, TemplateSource::Markup)
                }
                Some(markup) => TemplateSource::Markup(markup.to_string()),
                None => self.invalid_template(vm, &value.to_string()),
            },
            Some(OptionValue::Element(node)) => TemplateSource::Markup(self.dom.inner_html(&node)),
            Some(other) => self.invalid_template(vm, &format!("{:?}", other)),
            None => match el {
                Some(el) => TemplateSource::Markup(self.get_outer_html(el)),
                None => TemplateSource::Absent,
            },
        }
    }

    fn invalid_template(&self, vm: &InstanceRef, got: &str) -> TemplateSource {
        if config::is_dev() {
            warn(&format!("invalid template option: {}", got), Some(&*vm.borrow()));
        }
        TemplateSource::Invalid
    }

    /// Inner markup of the element with the given `#id`, cached per id.
    fn template_for_id(&self, id: &str) -> Option<String> {
        if let Some(cached) = self.id_to_template.borrow().get(id) {
            return cached.clone();
        }
        let markup = self.dom.query(id).map(|el| self.dom.inner_html(&el));
        self.id_to_template
            .borrow_mut()
            .insert(id.to_string(), markup.clone());
        markup
    }

    /// Outer markup, falling back to serializing a detached clone.
    pub fn get_outer_html(&self, el: &Element) -> String {
        self.dom
            .outer_html(el)
            .unwrap_or_else(|| self.dom.clone_outer_html(el))
    }

    fn compile_into(&self, vm: &InstanceRef, template: &str) {
        let measuring = perf::enabled();
        if measuring {
            perf::mark("compile");
        }

        let compiler_options = {
            let instance = vm.borrow();
            let flags = self.dom.compat_flags();
            CompilerOptions {
                output_source_range: config::is_dev(),
                should_decode_newlines: flags.should_decode_newlines,
                should_decode_newlines_for_href: flags.should_decode_newlines_for_href,
                delimiters: instance.options.delimiters(),
                comments: instance.options.comments(),
            }
        };

        match self.compiler.compile(template, &compiler_options) {
            Ok(compiled) => {
                let instance = vm.borrow();
                instance.options.set("render", OptionValue::Render(compiled.render));
                instance.options.set(
                    "staticRenderFns",
                    OptionValue::StaticRenderFns(Rc::new(compiled.static_render_fns)),
                );
            }
            Err(err) => {
                if config::is_dev() {
                    let location = err
                        .range
                        .map(|(start, end)| format!(" ({}..{})", start, end))
                        .unwrap_or_default();
                    warn(
                        &format!("Error compiling template:\n\n{}\n\n- {}{}", template, err.message, location),
                        Some(&*vm.borrow()),
                    );
                }
            }
        }

        if measuring {
            let name = vm.borrow().name.clone().unwrap_or_default();
            perf::mark("compile end");
            perf::measure(&format!("zenith {} compile", name), "compile", "compile end");
        }
    }
}
