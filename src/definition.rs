//! Typed builder for component definitions.
//!
//! A definition is just an [`Options`] object; the builder keeps callers away
//! from option keys and value variants. The serializable subset can also be
//! read from JSON with [`ComponentDefinition::from_json`].

use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::rc::Rc;

use crate::constructor::Constructor;
use crate::dom::Element;
use crate::error::{HookResult, RuntimeError};
use crate::instance::Instance;
use crate::options::{
    Asset, AssetKind, ComputedFn, FilterFn, Hook, Method, OptionValue, Options, Registry, RenderFn,
    WatchHandler,
};
use crate::proxy::RenderContext;
use crate::vnode::VNode;

/// JSON shape of a definition. Everything callable is left to the builder.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct StaticDefinition {
    name: Option<String>,
    template: Option<String>,
    el: Option<String>,
    props: Option<Value>,
    props_data: Option<Map<String, Value>>,
    inject: Option<Value>,
    data: Option<Map<String, Value>>,
    provide: Option<Map<String, Value>>,
    delimiters: Option<(String, String)>,
    comments: Option<bool>,
    #[serde(rename = "abstract")]
    is_abstract: Option<bool>,
    #[serde(rename = "__file")]
    file: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ComponentDefinition {
    options: Options,
}

impl ComponentDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the serializable part of a definition: `name`, `template`, `el`,
    /// `props`, `propsData`, `inject`, object `data`/`provide`, `delimiters`,
    /// `comments`, `abstract` and `__file`.
    pub fn from_json(source: &str) -> Result<Self, RuntimeError> {
        let parsed: StaticDefinition = serde_json::from_str(source).map_err(RuntimeError::Definition)?;
        let mut definition = Self::new();
        if let Some(name) = parsed.name {
            definition = definition.name(&name);
        }
        if let Some(template) = parsed.template {
            definition = definition.template(&template);
        }
        if let Some(el) = parsed.el {
            definition = definition.el(&el);
        }
        if let Some(props) = parsed.props {
            definition = definition.props(props);
        }
        if let Some(props_data) = parsed.props_data {
            definition = definition.props_data(props_data);
        }
        if let Some(inject) = parsed.inject {
            definition = definition.inject(inject);
        }
        if let Some(data) = parsed.data {
            definition = definition.option("data", OptionValue::json(Value::Object(data)));
        }
        if let Some(provide) = parsed.provide {
            definition = definition.option("provide", OptionValue::json(Value::Object(provide)));
        }
        if let Some((open, close)) = parsed.delimiters {
            definition = definition.delimiters(&open, &close);
        }
        if let Some(comments) = parsed.comments {
            definition = definition.comments(comments);
        }
        if let Some(is_abstract) = parsed.is_abstract {
            definition = definition.option("abstract", OptionValue::json(Value::Bool(is_abstract)));
        }
        if let Some(file) = parsed.file {
            definition = definition.option("__file", OptionValue::string(file));
        }
        Ok(definition)
    }

    /// Raw option escape hatch.
    pub fn option(self, key: &str, value: OptionValue) -> Self {
        self.options.set(key, value);
        self
    }

    pub fn name(self, name: &str) -> Self {
        self.option("name", OptionValue::string(name))
    }

    /// Template markup, or `#id` of an element holding it.
    pub fn template(self, template: &str) -> Self {
        self.option("template", OptionValue::string(template))
    }

    pub fn template_element(self, el: Element) -> Self {
        self.option("template", OptionValue::Element(el))
    }

    pub fn el(self, selector: &str) -> Self {
        self.option("el", OptionValue::string(selector))
    }

    pub fn el_element(self, el: Element) -> Self {
        self.option("el", OptionValue::Element(el))
    }

    pub fn render(self, render: impl Fn(&RenderContext<'_>) -> VNode + 'static) -> Self {
        self.option("render", OptionValue::Render(Rc::new(render)))
    }

    pub fn static_render_fns(self, fns: Vec<RenderFn>) -> Self {
        self.option("staticRenderFns", OptionValue::StaticRenderFns(Rc::new(fns)))
    }

    pub fn data(self, data: impl Fn(&Instance) -> Map<String, Value> + 'static) -> Self {
        self.option("data", OptionValue::Data(Rc::new(data)))
    }

    pub fn provide(self, provide: impl Fn(&Instance) -> Map<String, Value> + 'static) -> Self {
        self.option("provide", OptionValue::Data(Rc::new(provide)))
    }

    pub fn props(self, props: Value) -> Self {
        self.option("props", OptionValue::json(props))
    }

    pub fn props_data(self, props_data: Map<String, Value>) -> Self {
        self.option("propsData", OptionValue::json(Value::Object(props_data)))
    }

    pub fn inject(self, inject: Value) -> Self {
        self.option("inject", OptionValue::json(inject))
    }

    pub fn delimiters(self, open: &str, close: &str) -> Self {
        self.option("delimiters", OptionValue::json(serde_json::json!([open, close])))
    }

    pub fn comments(self, comments: bool) -> Self {
        self.option("comments", OptionValue::json(Value::Bool(comments)))
    }

    /// Append a handler for a lifecycle hook.
    pub fn hook(self, hook: &str, handler: impl Fn(&mut Instance) -> HookResult + 'static) -> Self {
        let mut hooks = self.options.hooks(hook);
        hooks.push(Rc::new(handler) as Hook);
        self.option(hook, OptionValue::Hooks(Rc::new(hooks)))
    }

    pub fn before_create(self, handler: impl Fn(&mut Instance) -> HookResult + 'static) -> Self {
        self.hook("beforeCreate", handler)
    }

    pub fn created(self, handler: impl Fn(&mut Instance) -> HookResult + 'static) -> Self {
        self.hook("created", handler)
    }

    pub fn before_mount(self, handler: impl Fn(&mut Instance) -> HookResult + 'static) -> Self {
        self.hook("beforeMount", handler)
    }

    pub fn mounted(self, handler: impl Fn(&mut Instance) -> HookResult + 'static) -> Self {
        self.hook("mounted", handler)
    }

    pub fn method(self, name: &str, method: impl Fn(&mut Instance, &[Value]) -> Value + 'static) -> Self {
        let mut methods: HashMap<String, Method> =
            self.options.methods().map(|m| m.as_ref().clone()).unwrap_or_default();
        methods.insert(name.to_string(), Rc::new(method));
        self.option("methods", OptionValue::Methods(Rc::new(methods)))
    }

    pub fn computed(self, name: &str, getter: impl Fn(&Instance) -> Value + 'static) -> Self {
        let mut computed: HashMap<String, ComputedFn> =
            self.options.computed().map(|c| c.as_ref().clone()).unwrap_or_default();
        computed.insert(name.to_string(), Rc::new(getter));
        self.option("computed", OptionValue::Computed(Rc::new(computed)))
    }

    pub fn watch(self, key: &str, handler: impl Fn(&mut Instance, &Value, &Value) + 'static) -> Self {
        let mut watch = self.options.watch().map(|w| w.as_ref().clone()).unwrap_or_default();
        watch
            .entry(key.to_string())
            .or_default()
            .push(Rc::new(handler) as WatchHandler);
        self.option("watch", OptionValue::Watch(Rc::new(watch)))
    }

    fn asset(self, kind: AssetKind, id: &str, asset: Asset) -> Self {
        let registry = self
            .options
            .registry(kind)
            .map(|r| r.fork())
            .unwrap_or_else(Registry::new);
        registry.insert(id, asset);
        self.option(kind.option_key(), OptionValue::Registry(Rc::new(registry)))
    }

    /// Locally registered component backed by a constructor.
    pub fn component(self, id: &str, ctor: Rc<Constructor>) -> Self {
        self.asset(AssetKind::Component, id, Asset::Constructor(ctor))
    }

    /// Locally registered component given as a plain definition.
    pub fn component_definition(self, id: &str, definition: ComponentDefinition) -> Self {
        self.asset(AssetKind::Component, id, Asset::Definition(Rc::new(definition.build())))
    }

    pub fn directive(self, id: &str, definition: Options) -> Self {
        self.asset(AssetKind::Directive, id, Asset::Definition(Rc::new(definition)))
    }

    pub fn filter(self, id: &str, filter: impl Fn(&Value) -> Value + 'static) -> Self {
        self.asset(AssetKind::Filter, id, Asset::Filter(Rc::new(filter) as FilterFn))
    }

    pub fn mixin(self, mixin: ComponentDefinition) -> Self {
        let mut mixins = match self.options.get_own("mixins") {
            Some(OptionValue::Mixins(existing)) => existing.as_ref().clone(),
            _ => Vec::new(),
        };
        mixins.push(Rc::new(mixin.build()));
        self.option("mixins", OptionValue::Mixins(Rc::new(mixins)))
    }

    pub fn extends(self, base: ComponentDefinition) -> Self {
        self.option("extends", OptionValue::Extends(Rc::new(base.build())))
    }

    pub fn build(self) -> Options {
        self.options
    }
}

impl From<ComponentDefinition> for Options {
    fn from(definition: ComponentDefinition) -> Self {
        definition.build()
    }
}
