//! Collaborator seam for instance initialization and the base mount.
//!
//! The initializer calls these entry points in a fixed order and never looks
//! inside them. Every method defaults to the bundled implementation, so an
//! embedder overrides only the pieces it replaces (for example a reactive
//! `init_state` or a patching `mount_component`).

use crate::dom::Element;
use crate::instance::InstanceRef;
use crate::{events, inject, lifecycle, render, state};

pub trait Subsystems {
    fn init_lifecycle(&self, vm: &InstanceRef) {
        lifecycle::init_lifecycle(vm)
    }

    fn init_events(&self, vm: &InstanceRef) {
        events::init_events(vm)
    }

    fn init_render(&self, vm: &InstanceRef) {
        render::init_render(vm)
    }

    fn call_hook(&self, vm: &InstanceRef, hook: &str) {
        lifecycle::call_hook(vm, hook)
    }

    fn init_injections(&self, vm: &InstanceRef) {
        inject::init_injections(vm)
    }

    /// Called exactly once per instance, between injections and provide.
    fn init_state(&self, vm: &InstanceRef) {
        state::init_state(vm)
    }

    fn init_provide(&self, vm: &InstanceRef) {
        inject::init_provide(vm)
    }

    /// The lower-level mount primitive wrapped by the compile-and-mount
    /// pipeline.
    fn mount_component(&self, vm: &InstanceRef, el: Option<Element>, hydrating: bool) {
        lifecycle::mount_component(vm, el, hydrating)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultSubsystems;

impl Subsystems for DefaultSubsystems {}
