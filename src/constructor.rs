//! Component constructors and constructor options resolution.
//!
//! A [`Constructor`] owns its current options behind an `Rc`. The `Rc` identity
//! is the cache key: a sub-constructor remembers the identity of its super
//! constructor's options (`super_options`) from the last resolution, and
//! [`resolve_constructor_options`] only re-merges when that identity changed.
//!
//! ## Invariants
//!
//! - Without a super constructor, resolution returns the constructor's own
//!   options unchanged.
//! - Resolving twice with no intervening change returns the identical `Rc`.
//! - Any operation that changes what descendants should inherit (`mixin`,
//!   asset registration) installs a *new* options `Rc` so that the staleness
//!   check fires. In-place edits (`set_option`) keep the identity and are
//!   recovered by diffing against the sealed snapshot on the next recompute.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config;
use crate::merge::{merge_options, validate_component_name};
use crate::options::{Asset, AssetKind, FilterFn, OptionValue, Options, Registry};

static CID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_cid() -> u64 {
    CID_COUNTER.fetch_add(1, Ordering::SeqCst)
}

pub struct Constructor {
    cid: u64,
    options: RefCell<Rc<Options>>,
    super_ctor: Option<Rc<Constructor>>,
    super_options: RefCell<Option<Rc<Options>>>,
    extend_options: Rc<Options>,
    sealed_options: Rc<Options>,
    self_ref: Weak<Constructor>,
}

impl Constructor {
    /// The base constructor. Its options always carry the three asset
    /// registries and the `_base` marker.
    pub fn root(options: Options) -> Rc<Self> {
        for kind in AssetKind::ALL {
            if !options.has_own(kind.option_key()) {
                options.set(kind.option_key(), OptionValue::Registry(Rc::new(Registry::new())));
            }
        }
        options.set("_base", OptionValue::json(serde_json::Value::Bool(true)));
        Rc::new_cyclic(|weak| Constructor {
            cid: next_cid(),
            options: RefCell::new(Rc::new(options)),
            super_ctor: None,
            super_options: RefCell::new(None),
            extend_options: Rc::new(Options::new()),
            sealed_options: Rc::new(Options::new()),
            self_ref: weak.clone(),
        })
    }

    pub fn cid(&self) -> u64 {
        self.cid
    }

    /// Current options, without staleness checking.
    pub fn options(&self) -> Rc<Options> {
        self.options.borrow().clone()
    }

    pub fn super_ctor(&self) -> Option<&Rc<Constructor>> {
        self.super_ctor.as_ref()
    }

    /// Super options seen at the last resolution.
    pub fn super_options(&self) -> Option<Rc<Options>> {
        self.super_options.borrow().clone()
    }

    pub fn extend_options(&self) -> &Rc<Options> {
        &self.extend_options
    }

    pub fn sealed_options(&self) -> &Rc<Options> {
        &self.sealed_options
    }

    pub fn name(&self) -> Option<String> {
        self.options().name()
    }

    /// Walk up to the base constructor.
    pub fn base(self: &Rc<Self>) -> Rc<Constructor> {
        let mut current = self.clone();
        while let Some(parent) = current.super_ctor.clone() {
            current = parent;
        }
        current
    }

    /// Create a sub-constructor inheriting from `self`.
    pub fn extend(self: &Rc<Self>, extend_options: Options) -> Rc<Constructor> {
        let name = extend_options.name().or_else(|| self.name());
        if config::is_dev() {
            if let Some(name) = &name {
                validate_component_name(name);
            }
        }

        let super_options = self.options();
        let options = Rc::new(merge_options(&super_options, &extend_options, None));
        let sealed = Rc::new((*options).clone());

        let sub = Rc::new_cyclic(|weak| Constructor {
            cid: next_cid(),
            options: RefCell::new(options.clone()),
            super_ctor: Some(self.clone()),
            super_options: RefCell::new(Some(super_options)),
            extend_options: Rc::new(extend_options),
            sealed_options: sealed,
            self_ref: weak.clone(),
        });

        if let Some(name) = name {
            register_self(&options, &name, &sub.self_ref);
        }
        tracing::trace!(cid = sub.cid, parent = self.cid, "extended constructor");
        sub
    }

    /// Merge `mixin` into this constructor's options. Sub-constructors pick
    /// the change up on their next resolution.
    pub fn mixin(&self, mixin: &Options) {
        let merged = merge_options(&self.options(), mixin, None);
        *self.options.borrow_mut() = Rc::new(merged);
    }

    /// Edit an option in place. The options identity is unchanged.
    pub fn set_option(&self, key: &str, value: OptionValue) {
        self.options.borrow().set(key, value);
    }

    /// Register `asset` under `id`. Copy-on-write: the registry and the
    /// options object are replaced, never edited in place.
    pub fn register_asset(&self, kind: AssetKind, id: &str, asset: Asset) {
        if kind == AssetKind::Component && config::is_dev() {
            validate_component_name(id);
        }
        let current = self.options();
        let registry = current
            .registry(kind)
            .map(|registry| registry.fork())
            .unwrap_or_default();
        registry.insert(id, asset);
        let next = (*current).clone();
        next.set(kind.option_key(), OptionValue::Registry(Rc::new(registry)));
        *self.options.borrow_mut() = Rc::new(next);
    }

    /// Global component registration. The definition is extended from the
    /// base constructor, named after `id` unless it carries its own name.
    pub fn component(self: &Rc<Self>, id: &str, definition: Options) -> Rc<Constructor> {
        if !definition.has("name") {
            definition.set("name", OptionValue::string(id));
        }
        let ctor = self.base().extend(definition);
        self.register_asset(AssetKind::Component, id, Asset::Constructor(ctor.clone()));
        ctor
    }

    pub fn register_constructor(&self, id: &str, ctor: Rc<Constructor>) {
        self.register_asset(AssetKind::Component, id, Asset::Constructor(ctor));
    }

    pub fn directive(&self, id: &str, definition: Options) {
        self.register_asset(AssetKind::Directive, id, Asset::Definition(Rc::new(definition)));
    }

    pub fn filter(&self, id: &str, filter: FilterFn) {
        self.register_asset(AssetKind::Filter, id, Asset::Filter(filter));
    }
}

impl std::fmt::Debug for Constructor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Constructor")
            .field("cid", &self.cid)
            .field("name", &self.name())
            .field("super", &self.super_ctor.as_ref().map(|s| s.cid))
            .finish()
    }
}

fn register_self(options: &Options, name: &str, ctor: &Weak<Constructor>) {
    if let Some(registry) = options.registry(AssetKind::Component) {
        registry.insert(name, Asset::Recursive(ctor.clone()));
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RESOLUTION
// ═══════════════════════════════════════════════════════════════════════════════

/// Current effective options for `ctor`, re-merging from its ancestors when
/// their options changed since the last call.
pub fn resolve_constructor_options(ctor: &Rc<Constructor>) -> Rc<Options> {
    let Some(super_ctor) = &ctor.super_ctor else {
        return ctor.options();
    };

    let super_options = resolve_constructor_options(super_ctor);
    let cached = ctor.super_options();
    if cached.is_some_and(|cached| Rc::ptr_eq(&cached, &super_options)) {
        return ctor.options();
    }

    tracing::debug!(cid = ctor.cid, "super options changed, re-resolving");
    *ctor.super_options.borrow_mut() = Some(super_options.clone());

    if let Some(modified) = resolve_modified_options(ctor) {
        ctor.extend_options.extend_from(&modified);
    }

    let options = Rc::new(merge_options(&super_options, &ctor.extend_options, None));
    if let Some(name) = options.name() {
        register_self(&options, &name, &ctor.self_ref);
    }
    *ctor.options.borrow_mut() = options.clone();
    options
}

/// Keys whose value in the latest options is not the same value as in the
/// sealed snapshot taken at `extend` time.
pub fn resolve_modified_options(ctor: &Constructor) -> Option<Options> {
    let latest = ctor.options();
    let sealed = &ctor.sealed_options;
    let mut modified: Option<Options> = None;
    for key in latest.own_keys() {
        let Some(value) = latest.get_own(&key) else {
            continue;
        };
        let changed = match sealed.get_own(&key) {
            Some(sealed_value) => !value.same(&sealed_value),
            None => true,
        };
        if changed {
            modified.get_or_insert_with(Options::new).set(&key, value);
        }
    }
    modified
}
