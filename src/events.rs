//! Instance event registry.

use serde_json::Value;
use std::collections::HashMap;

use crate::instance::{Instance, InstanceRef};
use crate::options::Listener;

/// Reset the registry and bind listeners handed down by the parent.
pub fn init_events(vm: &InstanceRef) {
    let mut instance = vm.borrow_mut();
    instance.events = HashMap::new();
    instance.has_hook_event = false;
    if let Some(listeners) = instance.options.parent_listeners() {
        for (event, handlers) in listeners.iter() {
            for handler in handlers {
                on(&mut instance, event, handler.clone());
            }
        }
    }
}

pub fn on(vm: &mut Instance, event: &str, listener: Listener) {
    vm.events.entry(event.to_string()).or_default().push(listener);
    if event.starts_with("hook:") {
        vm.has_hook_event = true;
    }
}

pub fn off(vm: &mut Instance, event: &str) {
    vm.events.remove(event);
}

/// Invoke the listeners for `event`. The instance is not borrowed while
/// listeners run.
pub fn emit(vm: &InstanceRef, event: &str, args: &[Value]) {
    let listeners = vm.borrow().listeners(event);
    for listener in listeners {
        listener(args);
    }
}
