//! Render-time property guard.
//!
//! Render routines never see the instance directly; they read through a
//! [`RenderContext`]. When the instance's [`RenderProxy`] is `Guarded`
//! (development builds), reads of unknown or reserved-prefix properties are
//! reported through the diagnostic channel. In production the context is a
//! plain pass-through.

use lazy_static::lazy_static;
use serde_json::Value;
use std::collections::HashSet;

use crate::config;
use crate::debug::warn;
use crate::instance::Instance;
use crate::vnode::VNode;

lazy_static! {
    /// Identifiers a template may reference without them living on the instance.
    static ref ALLOWED_GLOBALS: HashSet<&'static str> = {
        [
            "Infinity", "undefined", "NaN", "isFinite", "isNaN", "parseFloat", "parseInt",
            "decodeURI", "decodeURIComponent", "encodeURI", "encodeURIComponent", "Math",
            "Number", "Date", "Array", "Object", "Boolean", "String", "RegExp", "Map", "Set",
            "JSON", "Intl", "BigInt", "require",
        ]
        .into_iter()
        .collect()
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderProxy {
    Direct,
    Guarded,
}

impl RenderProxy {
    /// Pick the proxy flavour for the current configuration.
    pub fn install() -> Self {
        if config::is_dev() {
            RenderProxy::Guarded
        } else {
            RenderProxy::Direct
        }
    }
}

pub fn is_allowed_global(key: &str) -> bool {
    ALLOWED_GLOBALS.contains(key)
}

pub struct RenderContext<'a> {
    vm: &'a Instance,
}

impl<'a> RenderContext<'a> {
    pub fn new(vm: &'a Instance) -> Self {
        Self { vm }
    }

    pub fn instance(&self) -> &'a Instance {
        self.vm
    }

    pub fn is_guarded(&self) -> bool {
        self.vm.render_proxy() == Some(RenderProxy::Guarded)
    }

    /// Read a property as a template would.
    pub fn get(&self, key: &str) -> Option<Value> {
        let value = self.vm.get(key);
        if value.is_none() && self.is_guarded() && !self.vm.has(key) {
            self.check_missing(key);
        }
        value
    }

    /// `$data.key` access, bypassing the reserved-prefix rule.
    pub fn data(&self, key: &str) -> Option<Value> {
        self.vm.data().get(key).cloned()
    }

    /// Render the static sub-tree at `index` (hoisted by the compiler).
    pub fn static_tree(&self, index: usize) -> Option<VNode> {
        let fns = self.vm.options().static_render_fns();
        fns.get(index).map(|render| render(self))
    }

    fn check_missing(&self, key: &str) {
        let in_data = self.vm.data().contains_key(key);
        let allowed = is_allowed_global(key) || (key.starts_with('_') && !in_data);
        if allowed {
            return;
        }
        if in_data {
            warn(
                &format!(
                    "Property \"{key}\" must be accessed with \"$data.{key}\" because properties \
                     starting with \"$\" or \"_\" are not proxied onto the instance to prevent \
                     conflicts with runtime internals."
                ),
                Some(self.vm),
            );
        } else {
            warn(
                &format!(
                    "Property or method \"{key}\" is not defined on the instance but referenced \
                     during render. Make sure that this property is declared, either in the data \
                     option or as a prop."
                ),
                Some(self.vm),
            );
        }
    }
}
