//! Instance state: props, methods, data, computed and watchers.
//!
//! Initialized exactly once per instance, in that order. Key conflicts between
//! the categories are reported but never fatal; the earlier category keeps the
//! key for reads.

use serde_json::{Map, Value};

use crate::config;
use crate::debug::warn;
use crate::instance::{Instance, InstanceRef};
use crate::options::OptionValue;
use crate::util::{hyphenate, is_reserved_key};

const RESERVED_ATTRIBUTES: &[&str] = &["key", "ref", "slot", "slot-scope", "is"];

pub fn init_state(vm: &InstanceRef) {
    let options = vm.borrow().options.clone();
    let mut instance = vm.borrow_mut();
    instance.watchers.clear();

    if let Some(props) = options.json("props") {
        init_props(&mut instance, &props, options.props_data().unwrap_or_default());
    }
    if let Some(methods) = options.methods() {
        for (name, method) in methods.iter() {
            if config::is_dev() {
                check_method(&instance, name);
            }
            instance.methods.insert(name.clone(), method.clone());
        }
    }
    if let Some(data) = options.get("data") {
        init_data(&mut instance, &data);
    }
    if let Some(computed) = options.computed() {
        for (key, getter) in computed.iter() {
            if config::is_dev() {
                if instance.data.contains_key(key) {
                    warn(
                        &format!("The computed property \"{}\" is already defined in data.", key),
                        Some(&*instance),
                    );
                } else if instance.props.contains_key(key) {
                    warn(
                        &format!("The computed property \"{}\" is already defined as a prop.", key),
                        Some(&*instance),
                    );
                }
            }
            instance.computed.insert(key.clone(), getter.clone());
        }
    }
    if let Some(watch) = options.watch() {
        for (key, handlers) in watch.iter() {
            instance
                .watchers
                .entry(key.clone())
                .or_default()
                .extend(handlers.iter().cloned());
        }
    }
}

fn init_props(vm: &mut Instance, props: &Value, props_data: Map<String, Value>) {
    let Some(specs) = props.as_object() else {
        return;
    };
    for (key, spec) in specs {
        if config::is_dev() && RESERVED_ATTRIBUTES.contains(&hyphenate(key).as_str()) {
            warn(
                &format!(
                    "\"{}\" is a reserved attribute and cannot be used as component prop.",
                    hyphenate(key)
                ),
                Some(&*vm),
            );
        }
        let value = props_data
            .get(key)
            .or_else(|| props_data.get(&hyphenate(key)))
            .cloned()
            .or_else(|| prop_default(spec));
        match value {
            Some(value) => {
                vm.props.insert(key.clone(), value);
            }
            None => {
                if spec.get("required").and_then(Value::as_bool).unwrap_or(false) {
                    warn(&format!("Missing required prop: \"{}\"", key), Some(&*vm));
                }
                vm.props.insert(key.clone(), Value::Null);
            }
        }
    }
}

/// Explicit `default`, or `false` for boolean props.
fn prop_default(spec: &Value) -> Option<Value> {
    if let Some(default) = spec.get("default") {
        return Some(default.clone());
    }
    let is_boolean = match spec.get("type") {
        Some(Value::String(ty)) => ty == "Boolean",
        Some(Value::Array(types)) => types.iter().any(|t| t.as_str() == Some("Boolean")),
        _ => false,
    };
    is_boolean.then_some(Value::Bool(false))
}

fn check_method(vm: &Instance, name: &str) {
    if vm.props.contains_key(name) {
        warn(
            &format!("Method \"{}\" has already been defined as a prop.", name),
            Some(vm),
        );
    }
    if is_reserved_key(name) {
        warn(
            &format!(
                "Method \"{}\" conflicts with an existing instance method. Avoid defining \
                 component methods that start with _ or $.",
                name
            ),
            Some(vm),
        );
    }
}

fn init_data(vm: &mut Instance, data: &OptionValue) {
    let data = match data {
        OptionValue::Data(data) => data(vm),
        OptionValue::Json(value) if value.is_object() => value.as_object().cloned().unwrap_or_default(),
        _ => {
            warn(
                "data functions should return an object.",
                Some(&*vm),
            );
            Map::new()
        }
    };
    if config::is_dev() {
        for key in data.keys() {
            if vm.methods.contains_key(key) {
                warn(
                    &format!("Method \"{}\" has already been defined as a data property.", key),
                    Some(&*vm),
                );
            }
            if vm.props.contains_key(key) {
                warn(
                    &format!(
                        "The data property \"{}\" is already declared as a prop. Use prop default \
                         value instead.",
                        key
                    ),
                    Some(&*vm),
                );
            }
        }
    }
    vm.data = data;
}
