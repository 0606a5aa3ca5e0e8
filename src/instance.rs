//! Live component instances.

use serde_json::{Map, Value};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::constructor::Constructor;
use crate::debug::{format_component_name, warn};
use crate::dom::Element;
use crate::options::{ComputedFn, Listener, Listeners, Method, Options, WatchMap};
use crate::proxy::{RenderContext, RenderProxy};
use crate::util::is_reserved_key;
use crate::vnode::VNode;

pub type InstanceRef = Rc<RefCell<Instance>>;
pub type WeakInstance = Weak<RefCell<Instance>>;

// ═══════════════════════════════════════════════════════════════════════════════
// UID GENERATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Process-wide and monotonic: every initialized instance gets a uid strictly
/// greater than all uids handed out before it.
static INSTANCE_UID_COUNTER: AtomicU64 = AtomicU64::new(0);

pub(crate) fn next_uid() -> u64 {
    INSTANCE_UID_COUNTER.fetch_add(1, Ordering::SeqCst)
}

// ═══════════════════════════════════════════════════════════════════════════════
// TREE LINKS
// ═══════════════════════════════════════════════════════════════════════════════

/// Tree bookkeeping kept outside the instance's `RefCell`.
///
/// Relatives reach it through [`links_of`] without borrowing the instance, so
/// a child created from one of its parent's hooks (while the parent is
/// mutably borrowed) is still linked and still sees the parent's `provide`.
#[derive(Default)]
pub struct Links {
    owner: RefCell<WeakInstance>,
    parent: RefCell<Option<Rc<Links>>>,
    root: RefCell<WeakInstance>,
    children: RefCell<Vec<WeakInstance>>,
    pub(crate) provided: RefCell<Map<String, Value>>,
    is_abstract: Cell<bool>,
}

impl Links {
    pub fn owner(&self) -> Option<InstanceRef> {
        self.owner.borrow().upgrade()
    }

    pub fn parent(&self) -> Option<Rc<Links>> {
        self.parent.borrow().clone()
    }

    pub fn root(&self) -> Option<InstanceRef> {
        self.root.borrow().upgrade()
    }

    pub fn children(&self) -> Vec<InstanceRef> {
        self.children.borrow().iter().filter_map(Weak::upgrade).collect()
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract.get()
    }

    pub fn provided(&self, key: &str) -> Option<Value> {
        self.provided.borrow().get(key).cloned()
    }

    pub(crate) fn push_child(&self, child: &InstanceRef) {
        self.children.borrow_mut().push(Rc::downgrade(child));
    }

    /// Reset the links for a fresh `init`.
    pub(crate) fn attach(&self, parent: Option<Rc<Links>>, root: &InstanceRef, is_abstract: bool) {
        *self.parent.borrow_mut() = parent;
        *self.root.borrow_mut() = Rc::downgrade(root);
        self.children.borrow_mut().clear();
        self.is_abstract.set(is_abstract);
    }

    fn is_owned_by(&self, vm: &InstanceRef) -> bool {
        std::ptr::eq(self.owner.borrow().as_ptr(), Rc::as_ptr(vm))
    }
}

thread_local! {
    /// Instance allocation → its links. Entries are removed when the instance drops.
    static LINKS: RefCell<HashMap<usize, Weak<Links>>> = RefCell::new(HashMap::new());
}

fn links_key(ptr: *const RefCell<Instance>) -> usize {
    ptr as usize
}

fn register_links(vm: &InstanceRef, links: &Rc<Links>) {
    LINKS.with(|table| {
        table
            .borrow_mut()
            .insert(links_key(Rc::as_ptr(vm)), Rc::downgrade(links));
    });
}

/// Tree links of `vm`, available even while `vm` itself is borrowed.
pub fn links_of(vm: &InstanceRef) -> Option<Rc<Links>> {
    let registered = LINKS.with(|table| {
        table
            .borrow()
            .get(&links_key(Rc::as_ptr(vm)))
            .and_then(Weak::upgrade)
    });
    if let Some(links) = registered.filter(|links| links.is_owned_by(vm)) {
        return Some(links);
    }
    let links = vm.try_borrow().ok()?.links.clone();
    *links.owner.borrow_mut() = Rc::downgrade(vm);
    register_links(vm, &links);
    Some(links)
}

// ═══════════════════════════════════════════════════════════════════════════════
// INSTANCE STATE
// ═══════════════════════════════════════════════════════════════════════════════

/// Parent/child bookkeeping, owned by the lifecycle subsystem.
#[derive(Default)]
pub struct LifecycleState {
    pub parent: Option<WeakInstance>,
    pub root: Option<WeakInstance>,
    pub is_mounted: bool,
    pub is_destroyed: bool,
    pub is_being_destroyed: bool,
    pub inactive: Option<bool>,
    pub direct_inactive: bool,
}

pub struct Instance {
    pub(crate) uid: u64,
    pub(crate) is_vue: bool,
    pub(crate) is_component: bool,
    pub(crate) constructor: Rc<Constructor>,
    pub(crate) options: Rc<Options>,
    pub(crate) render_proxy: Option<RenderProxy>,
    pub(crate) self_ref: WeakInstance,
    pub(crate) name: Option<String>,

    pub(crate) lifecycle: LifecycleState,

    pub(crate) events: Listeners,
    pub(crate) has_hook_event: bool,

    pub(crate) parent_vnode: Option<Rc<VNode>>,
    pub(crate) vnode: Option<VNode>,
    pub(crate) slots: HashMap<String, Vec<VNode>>,

    pub(crate) props: Map<String, Value>,
    pub(crate) data: Map<String, Value>,
    pub(crate) injected: Map<String, Value>,
    pub(crate) methods: HashMap<String, Method>,
    pub(crate) computed: HashMap<String, ComputedFn>,
    pub(crate) watchers: WatchMap,

    pub(crate) el: Option<Element>,

    pub(crate) links: Rc<Links>,
}

impl Instance {
    /// Uninitialized instance; `init` fills every field in phase order.
    pub(crate) fn blank(constructor: Rc<Constructor>) -> Self {
        Self {
            uid: 0,
            is_vue: false,
            is_component: false,
            constructor,
            options: Rc::new(Options::new()),
            render_proxy: None,
            self_ref: Weak::new(),
            name: None,
            lifecycle: LifecycleState::default(),
            events: HashMap::new(),
            has_hook_event: false,
            parent_vnode: None,
            vnode: None,
            slots: HashMap::new(),
            props: Map::new(),
            data: Map::new(),
            injected: Map::new(),
            methods: HashMap::new(),
            computed: HashMap::new(),
            watchers: HashMap::new(),
            el: None,
            links: Rc::new(Links::default()),
        }
    }

    /// Blank instance behind its shared handle, with `_self` and the tree
    /// links registered.
    pub(crate) fn new_ref(constructor: Rc<Constructor>) -> InstanceRef {
        let vm = Rc::new(RefCell::new(Self::blank(constructor)));
        let links = {
            let mut instance = vm.borrow_mut();
            instance.self_ref = Rc::downgrade(&vm);
            *instance.links.owner.borrow_mut() = Rc::downgrade(&vm);
            instance.links.clone()
        };
        register_links(&vm, &links);
        vm
    }

    pub fn uid(&self) -> u64 {
        self.uid
    }

    /// Marks component instances so the reactivity layer never observes them.
    pub fn is_vue(&self) -> bool {
        self.is_vue
    }

    pub fn is_component(&self) -> bool {
        self.is_component
    }

    pub fn constructor(&self) -> &Rc<Constructor> {
        &self.constructor
    }

    /// `$options`
    pub fn options(&self) -> &Rc<Options> {
        &self.options
    }

    pub fn render_proxy(&self) -> Option<RenderProxy> {
        self.render_proxy
    }

    /// `_self`: the unwrapped instance.
    pub fn self_ref(&self) -> Option<InstanceRef> {
        self.self_ref.upgrade()
    }

    pub fn name(&self) -> String {
        format_component_name(Some(self), false)
    }

    pub fn lifecycle(&self) -> &LifecycleState {
        &self.lifecycle
    }

    pub fn parent(&self) -> Option<InstanceRef> {
        self.lifecycle.parent.as_ref().and_then(Weak::upgrade)
    }

    pub fn root(&self) -> Option<InstanceRef> {
        self.lifecycle.root.as_ref().and_then(Weak::upgrade)
    }

    pub fn children(&self) -> Vec<InstanceRef> {
        self.links.children()
    }

    pub fn is_mounted(&self) -> bool {
        self.lifecycle.is_mounted
    }

    /// `$el`
    pub fn el(&self) -> Option<&Element> {
        self.el.as_ref()
    }

    /// `$vnode`: the placeholder vnode in the parent tree.
    pub fn parent_vnode(&self) -> Option<&Rc<VNode>> {
        self.parent_vnode.as_ref()
    }

    /// Last rendered tree.
    pub fn vnode(&self) -> Option<&VNode> {
        self.vnode.as_ref()
    }

    pub fn slots(&self) -> &HashMap<String, Vec<VNode>> {
        &self.slots
    }

    pub fn props(&self) -> &Map<String, Value> {
        &self.props
    }

    /// `$data`
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn injected(&self) -> &Map<String, Value> {
        &self.injected
    }

    /// Values this instance exposes to descendants.
    pub fn provided(&self) -> Map<String, Value> {
        self.links.provided.borrow().clone()
    }

    pub fn listeners(&self, event: &str) -> Vec<Listener> {
        self.events.get(event).cloned().unwrap_or_default()
    }

    /// Proxied property read: props, then data, then computed, then injections.
    /// Reserved-prefix data keys are not proxied.
    pub fn get(&self, key: &str) -> Option<Value> {
        if let Some(value) = self.props.get(key) {
            return Some(value.clone());
        }
        if !is_reserved_key(key) {
            if let Some(value) = self.data.get(key) {
                return Some(value.clone());
            }
        }
        if let Some(getter) = self.computed.get(key) {
            return Some(getter(self));
        }
        self.injected.get(key).cloned()
    }

    /// Whether `key` is proxied onto the instance (including methods).
    pub fn has(&self, key: &str) -> bool {
        self.props.contains_key(key)
            || (!is_reserved_key(key) && self.data.contains_key(key))
            || self.computed.contains_key(key)
            || self.methods.contains_key(key)
            || self.injected.contains_key(key)
    }

    /// Proxied property write. Watchers registered for `key` run synchronously
    /// when the value changes.
    pub fn set(&mut self, key: &str, value: Value) {
        let old = self.get(key).unwrap_or(Value::Null);
        if self.props.contains_key(key) {
            warn(
                &format!(
                    "Avoid mutating a prop directly since the value will be overwritten whenever \
                     the parent component re-renders. Prop being mutated: \"{}\"",
                    key
                ),
                Some(&*self),
            );
            self.props.insert(key.to_string(), value.clone());
        } else if self.injected.contains_key(key) {
            warn(
                &format!(
                    "Avoid mutating an injected value directly. Injection being mutated: \"{}\"",
                    key
                ),
                Some(&*self),
            );
            self.injected.insert(key.to_string(), value.clone());
        } else {
            self.data.insert(key.to_string(), value.clone());
        }
        if old != value {
            self.notify_watchers(key, &value, &old);
        }
    }

    fn notify_watchers(&mut self, key: &str, new: &Value, old: &Value) {
        let handlers = self.watchers.get(key).cloned().unwrap_or_default();
        for handler in handlers {
            handler(self, new, old);
        }
    }

    pub fn call_method(&mut self, name: &str, args: &[Value]) -> Option<Value> {
        let method = self.methods.get(name).cloned()?;
        Some(method(self, args))
    }

    pub fn render_context(&self) -> RenderContext<'_> {
        RenderContext::new(self)
    }

    /// Run the configured render routine. Without one, renders an empty node.
    pub fn render(&self) -> VNode {
        match self.options.render() {
            Some(render) => render(&self.render_context()),
            None => VNode::empty(),
        }
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        let key = links_key(self.self_ref.as_ptr());
        let own = Rc::downgrade(&self.links);
        let _ = LINKS.try_with(|table| {
            if let Ok(mut table) = table.try_borrow_mut() {
                if table.get(&key).is_some_and(|links| links.ptr_eq(&own)) {
                    table.remove(&key);
                }
            }
        });
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("uid", &self.uid)
            .field("name", &self.options.name())
            .field("is_component", &self.is_component)
            .field("is_mounted", &self.lifecycle.is_mounted)
            .finish()
    }
}
