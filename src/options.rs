//! Option values, option objects and asset registries.
//!
//! ## Identity
//!
//! Every reference-like option value is held behind an `Rc`, and
//! [`OptionValue::same`] compares those by pointer. This is what the
//! constructor resolver relies on to detect late-modified options: a key is
//! "modified" when its value is no longer the *same* value as in the sealed
//! snapshot, never when it merely compares equal.
//!
//! ## Layered registries
//!
//! `components`, `directives` and `filters` are [`Registry`] values: an own
//! mapping plus an immutable parent snapshot captured when the registry was
//! merged. Lookups consult the own mapping first, then the parent chain.

use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::constructor::Constructor;
use crate::dom::Element;
use crate::error::HookResult;
use crate::instance::{Instance, InstanceRef, WeakInstance};
use crate::proxy::RenderContext;
use crate::util::{camelize, capitalize};
use crate::vnode::VNode;

// ═══════════════════════════════════════════════════════════════════════════════
// CALLABLE OPTION TYPES
// ═══════════════════════════════════════════════════════════════════════════════

pub type Hook = Rc<dyn Fn(&mut Instance) -> HookResult>;
pub type DataFn = Rc<dyn Fn(&Instance) -> Map<String, Value>>;
pub type RenderFn = Rc<dyn Fn(&RenderContext<'_>) -> VNode>;
pub type WatchHandler = Rc<dyn Fn(&mut Instance, &Value, &Value)>;
pub type Method = Rc<dyn Fn(&mut Instance, &[Value]) -> Value>;
pub type ComputedFn = Rc<dyn Fn(&Instance) -> Value>;
pub type FilterFn = Rc<dyn Fn(&Value) -> Value>;
pub type Listener = Rc<dyn Fn(&[Value])>;

pub type WatchMap = HashMap<String, Vec<WatchHandler>>;
pub type Listeners = HashMap<String, Vec<Listener>>;

pub const LIFECYCLE_HOOKS: &[&str] = &[
    "beforeCreate",
    "created",
    "beforeMount",
    "mounted",
    "beforeUpdate",
    "updated",
    "beforeDestroy",
    "destroyed",
    "activated",
    "deactivated",
    "errorCaptured",
    "serverPrefetch",
];

pub fn is_lifecycle_hook(key: &str) -> bool {
    LIFECYCLE_HOOKS.contains(&key)
}

/// Compare two `Rc`s by address, ignoring vtable metadata.
pub(crate) fn same_rc<T: ?Sized>(a: &Rc<T>, b: &Rc<T>) -> bool {
    std::ptr::eq(Rc::as_ptr(a) as *const (), Rc::as_ptr(b) as *const ())
}

// ═══════════════════════════════════════════════════════════════════════════════
// ASSET REGISTRIES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Component,
    Directive,
    Filter,
}

impl AssetKind {
    pub const ALL: [AssetKind; 3] = [AssetKind::Component, AssetKind::Directive, AssetKind::Filter];

    /// Option key holding the registry for this kind.
    pub fn option_key(self) -> &'static str {
        match self {
            AssetKind::Component => "components",
            AssetKind::Directive => "directives",
            AssetKind::Filter => "filters",
        }
    }

    pub fn from_option_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.option_key() == key)
    }
}

#[derive(Clone)]
pub enum Asset {
    Constructor(Rc<Constructor>),
    /// A constructor registered under its own name. Held weakly so the
    /// constructor's options do not keep the constructor alive.
    Recursive(Weak<Constructor>),
    Definition(Rc<Options>),
    Filter(FilterFn),
}

impl Asset {
    pub fn constructor(&self) -> Option<Rc<Constructor>> {
        match self {
            Asset::Constructor(ctor) => Some(ctor.clone()),
            Asset::Recursive(ctor) => ctor.upgrade(),
            _ => None,
        }
    }

    pub fn same(&self, other: &Asset) -> bool {
        match (self, other) {
            (Asset::Constructor(a), Asset::Constructor(b)) => Rc::ptr_eq(a, b),
            (Asset::Recursive(a), Asset::Recursive(b)) => Weak::ptr_eq(a, b),
            (Asset::Definition(a), Asset::Definition(b)) => Rc::ptr_eq(a, b),
            (Asset::Filter(a), Asset::Filter(b)) => same_rc(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Asset::Constructor(ctor) => write!(f, "Constructor(cid={})", ctor.cid()),
            Asset::Recursive(ctor) => match ctor.upgrade() {
                Some(ctor) => write!(f, "Recursive(cid={})", ctor.cid()),
                None => write!(f, "Recursive(dropped)"),
            },
            Asset::Definition(options) => write!(f, "Definition({:?})", options.name()),
            Asset::Filter(_) => write!(f, "Filter"),
        }
    }
}

#[derive(Default)]
pub struct Registry {
    entries: RefCell<HashMap<String, Asset>>,
    parent: Option<Rc<Registry>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (String, Asset)>) -> Self {
        Self {
            entries: RefCell::new(entries.into_iter().collect()),
            parent: None,
        }
    }

    /// Child registry over an immutable snapshot of `parent` and an own copy of
    /// `child`'s entries. Later additions to `parent` are not visible here.
    pub fn layered(parent: Option<&Registry>, child: Option<&Registry>) -> Self {
        Self {
            entries: RefCell::new(child.map(|c| c.entries.borrow().clone()).unwrap_or_default()),
            parent: parent.map(Registry::snapshot),
        }
    }

    /// Frozen copy of the own entries, sharing the (already frozen) parent chain.
    pub fn snapshot(&self) -> Rc<Registry> {
        Rc::new(self.fork())
    }

    /// Independent copy that can be extended without affecting `self`.
    pub fn fork(&self) -> Registry {
        Registry {
            entries: RefCell::new(self.entries.borrow().clone()),
            parent: self.parent.clone(),
        }
    }

    pub fn parent(&self) -> Option<&Rc<Registry>> {
        self.parent.as_ref()
    }

    pub fn insert(&self, id: &str, asset: Asset) {
        self.entries.borrow_mut().insert(id.to_string(), asset);
    }

    pub fn get_own(&self, id: &str) -> Option<Asset> {
        self.entries.borrow().get(id).cloned()
    }

    pub fn has_own(&self, id: &str) -> bool {
        self.entries.borrow().contains_key(id)
    }

    pub fn own_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.borrow().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Exact-id lookup through the layered chain.
    pub fn get(&self, id: &str) -> Option<Asset> {
        self.get_own(id)
            .or_else(|| self.parent.as_ref().and_then(|p| p.get(id)))
    }

    /// Asset lookup accepting the id as written, camelized, or capitalized.
    /// Own entries are preferred over inherited ones for every spelling.
    pub fn resolve(&self, id: &str) -> Option<Asset> {
        let camelized = camelize(id);
        let pascal = capitalize(&camelized);
        let candidates = [id, camelized.as_str(), pascal.as_str()];
        candidates
            .iter()
            .find_map(|candidate| self.get_own(candidate))
            .or_else(|| candidates.iter().find_map(|candidate| self.get(candidate)))
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("own", &self.own_ids())
            .field("parent", &self.parent)
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// OPTION VALUES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub enum OptionValue {
    /// Plain data: `name`, `template`, `el` selectors, `props`, `propsData`,
    /// `inject`, `delimiters`, `comments`, or data/provide objects.
    Json(Rc<Value>),
    Data(DataFn),
    Hooks(Rc<Vec<Hook>>),
    Render(RenderFn),
    StaticRenderFns(Rc<Vec<RenderFn>>),
    Registry(Rc<Registry>),
    Watch(Rc<WatchMap>),
    Methods(Rc<HashMap<String, Method>>),
    Computed(Rc<HashMap<String, ComputedFn>>),
    Element(Element),
    Instance(WeakInstance),
    VNode(Rc<VNode>),
    Listeners(Rc<Listeners>),
    Children(Rc<Vec<VNode>>),
    Mixins(Rc<Vec<Rc<Options>>>),
    Extends(Rc<Options>),
}

impl OptionValue {
    pub fn json(value: Value) -> Self {
        OptionValue::Json(Rc::new(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        OptionValue::json(Value::String(value.into()))
    }

    pub fn hook(hook: impl Fn(&mut Instance) -> HookResult + 'static) -> Self {
        OptionValue::Hooks(Rc::new(vec![Rc::new(hook) as Hook]))
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            OptionValue::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Identity comparison. JSON primitives compare by value, everything
    /// else by reference.
    pub fn same(&self, other: &OptionValue) -> bool {
        use OptionValue::*;
        match (self, other) {
            (Json(a), Json(b)) => {
                Rc::ptr_eq(a, b) || (is_primitive(a) && is_primitive(b) && a == b)
            }
            (Data(a), Data(b)) => same_rc(a, b),
            (Hooks(a), Hooks(b)) => Rc::ptr_eq(a, b),
            (Render(a), Render(b)) => same_rc(a, b),
            (StaticRenderFns(a), StaticRenderFns(b)) => Rc::ptr_eq(a, b),
            (Registry(a), Registry(b)) => Rc::ptr_eq(a, b),
            (Watch(a), Watch(b)) => Rc::ptr_eq(a, b),
            (Methods(a), Methods(b)) => Rc::ptr_eq(a, b),
            (Computed(a), Computed(b)) => Rc::ptr_eq(a, b),
            (Element(a), Element(b)) => a.same(b),
            (Instance(a), Instance(b)) => Weak::ptr_eq(a, b),
            (VNode(a), VNode(b)) => Rc::ptr_eq(a, b),
            (Listeners(a), Listeners(b)) => Rc::ptr_eq(a, b),
            (Children(a), Children(b)) => Rc::ptr_eq(a, b),
            (Mixins(a), Mixins(b)) => Rc::ptr_eq(a, b),
            (Extends(a), Extends(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    fn kind(&self) -> &'static str {
        use OptionValue::*;
        match self {
            Json(_) => "Json",
            Data(_) => "Data",
            Hooks(_) => "Hooks",
            Render(_) => "Render",
            StaticRenderFns(_) => "StaticRenderFns",
            Registry(_) => "Registry",
            Watch(_) => "Watch",
            Methods(_) => "Methods",
            Computed(_) => "Computed",
            Element(_) => "Element",
            Instance(_) => "Instance",
            VNode(_) => "VNode",
            Listeners(_) => "Listeners",
            Children(_) => "Children",
            Mixins(_) => "Mixins",
            Extends(_) => "Extends",
        }
    }
}

fn is_primitive(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

impl fmt::Debug for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Json(value) => write!(f, "Json({})", value),
            OptionValue::Hooks(hooks) => write!(f, "Hooks(len={})", hooks.len()),
            OptionValue::Registry(registry) => write!(f, "{:?}", registry),
            OptionValue::Element(el) => write!(f, "Element({:?})", el),
            other => f.write_str(other.kind()),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// OPTIONS OBJECT
// ═══════════════════════════════════════════════════════════════════════════════

/// A string-keyed bag of option values with an optional prototype that
/// lookups fall back to. Entries are interior-mutable so that an `Rc<Options>`
/// keeps its identity across in-place edits.
#[derive(Default, Clone)]
pub struct Options {
    entries: RefCell<HashMap<String, OptionValue>>,
    proto: Option<Rc<Options>>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty options delegating every lookup to `proto`.
    pub fn with_proto(proto: Rc<Options>) -> Self {
        Self {
            entries: RefCell::new(HashMap::new()),
            proto: Some(proto),
        }
    }

    pub fn proto(&self) -> Option<&Rc<Options>> {
        self.proto.as_ref()
    }

    /// Builder-style insert.
    pub fn with(self, key: &str, value: OptionValue) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&self, key: &str, value: OptionValue) {
        self.entries.borrow_mut().insert(key.to_string(), value);
    }

    pub fn remove(&self, key: &str) -> Option<OptionValue> {
        self.entries.borrow_mut().remove(key)
    }

    pub fn get_own(&self, key: &str) -> Option<OptionValue> {
        self.entries.borrow().get(key).cloned()
    }

    pub fn get(&self, key: &str) -> Option<OptionValue> {
        self.get_own(key)
            .or_else(|| self.proto.as_ref().and_then(|p| p.get(key)))
    }

    pub fn has_own(&self, key: &str) -> bool {
        self.entries.borrow().contains_key(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.has_own(key) || self.proto.as_ref().is_some_and(|p| p.has(key))
    }

    pub fn own_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.borrow().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Own keys followed by inherited keys not shadowed by them.
    pub fn keys(&self) -> Vec<String> {
        let mut keys = self.own_keys();
        if let Some(proto) = &self.proto {
            for key in proto.keys() {
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
        }
        keys
    }

    /// Copy every own entry of `other` into `self`.
    pub fn extend_from(&self, other: &Options) {
        let incoming = other.entries.borrow().clone();
        self.entries.borrow_mut().extend(incoming);
    }

    // ───────────────────────────────────────────────────────────────────────
    // Typed accessors
    // ───────────────────────────────────────────────────────────────────────

    pub fn json(&self, key: &str) -> Option<Rc<Value>> {
        match self.get(key)? {
            OptionValue::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn string(&self, key: &str) -> Option<String> {
        self.json(key).and_then(|v| v.as_str().map(str::to_string))
    }

    pub fn name(&self) -> Option<String> {
        self.string("name")
    }

    pub fn render(&self) -> Option<RenderFn> {
        match self.get("render")? {
            OptionValue::Render(render) => Some(render),
            _ => None,
        }
    }

    pub fn static_render_fns(&self) -> Vec<RenderFn> {
        match self.get("staticRenderFns") {
            Some(OptionValue::StaticRenderFns(fns)) => fns.as_ref().clone(),
            _ => Vec::new(),
        }
    }

    pub fn hooks(&self, hook: &str) -> Vec<Hook> {
        match self.get(hook) {
            Some(OptionValue::Hooks(hooks)) => hooks.as_ref().clone(),
            _ => Vec::new(),
        }
    }

    pub fn registry(&self, kind: AssetKind) -> Option<Rc<Registry>> {
        match self.get(kind.option_key())? {
            OptionValue::Registry(registry) => Some(registry),
            _ => None,
        }
    }

    pub fn parent(&self) -> Option<InstanceRef> {
        match self.get("parent")? {
            OptionValue::Instance(parent) => parent.upgrade(),
            _ => None,
        }
    }

    pub fn parent_vnode(&self) -> Option<Rc<VNode>> {
        match self.get("_parentVnode")? {
            OptionValue::VNode(vnode) => Some(vnode),
            _ => None,
        }
    }

    pub fn props_data(&self) -> Option<Map<String, Value>> {
        self.json("propsData").and_then(|v| v.as_object().cloned())
    }

    pub fn parent_listeners(&self) -> Option<Rc<Listeners>> {
        match self.get("_parentListeners")? {
            OptionValue::Listeners(listeners) => Some(listeners),
            _ => None,
        }
    }

    pub fn render_children(&self) -> Option<Rc<Vec<VNode>>> {
        match self.get("_renderChildren")? {
            OptionValue::Children(children) => Some(children),
            _ => None,
        }
    }

    pub fn component_tag(&self) -> Option<String> {
        self.string("_componentTag")
    }

    pub fn methods(&self) -> Option<Rc<HashMap<String, Method>>> {
        match self.get("methods")? {
            OptionValue::Methods(methods) => Some(methods),
            _ => None,
        }
    }

    pub fn computed(&self) -> Option<Rc<HashMap<String, ComputedFn>>> {
        match self.get("computed")? {
            OptionValue::Computed(computed) => Some(computed),
            _ => None,
        }
    }

    pub fn watch(&self) -> Option<Rc<WatchMap>> {
        match self.get("watch")? {
            OptionValue::Watch(watch) => Some(watch),
            _ => None,
        }
    }

    /// Custom interpolation delimiters, e.g. `["${", "}"]`.
    pub fn delimiters(&self) -> Option<(String, String)> {
        let value = self.json("delimiters")?;
        match value.as_array()?.as_slice() {
            [Value::String(open), Value::String(close)] => Some((open.clone(), close.clone())),
            _ => None,
        }
    }

    pub fn comments(&self) -> bool {
        self.json("comments")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.borrow();
        let mut map = f.debug_map();
        for key in self.own_keys() {
            if let Some(value) = entries.get(&key) {
                map.entry(&key, value);
            }
        }
        map.finish()
    }
}
