//! Dependency injection between ancestors and descendants.
//!
//! `inject` is resolved before state so data and props defaults may depend on
//! injected values; `provide` is evaluated after state so it may depend on
//! them in turn.

use serde_json::{Map, Value};

use crate::debug::warn;
use crate::instance::{Instance, InstanceRef};
use crate::options::OptionValue;

/// Look up every normalized `inject` entry through the parent chain.
pub fn resolve_inject(inject: &Value, vm: &Instance) -> Map<String, Value> {
    let mut result = Map::new();
    let Some(entries) = inject.as_object() else {
        return result;
    };
    for (key, entry) in entries {
        let from = entry.get("from").and_then(Value::as_str).unwrap_or(key);
        match lookup_provided(vm, from) {
            Some(value) => {
                result.insert(key.clone(), value);
            }
            None => match entry.get("default") {
                Some(default) => {
                    result.insert(key.clone(), default.clone());
                }
                None => warn(&format!("Injection \"{}\" not found", key), Some(vm)),
            },
        }
    }
    result
}

/// Walks ancestor links, so providers borrowed by a running hook are still
/// visible.
fn lookup_provided(vm: &Instance, key: &str) -> Option<Value> {
    let mut source = vm.links.parent();
    while let Some(ancestor) = source {
        if let Some(value) = ancestor.provided(key) {
            return Some(value);
        }
        source = ancestor.parent();
    }
    None
}

pub fn init_injections(vm: &InstanceRef) {
    let inject = vm.borrow().options.json("inject");
    let Some(inject) = inject else {
        return;
    };
    let injected = resolve_inject(&inject, &vm.borrow());
    vm.borrow_mut().injected = injected;
}

pub fn init_provide(vm: &InstanceRef) {
    let provide = vm.borrow().options.get("provide");
    let provided = match provide {
        Some(OptionValue::Data(provide)) => provide(&vm.borrow()),
        Some(OptionValue::Json(value)) => value.as_object().cloned().unwrap_or_default(),
        _ => return,
    };
    let links = vm.borrow().links.clone();
    *links.provided.borrow_mut() = provided;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{self, Config};
    use crate::constructor::Constructor;
    use crate::debug::capture_warnings;
    use crate::lifecycle::init_lifecycle;
    use crate::options::Options;
    use serde_json::json;
    use std::rc::Rc;

    fn instance(options: Options, parent: Option<&InstanceRef>) -> InstanceRef {
        if let Some(parent) = parent {
            options.set("parent", OptionValue::Instance(Rc::downgrade(parent)));
        }
        let vm = Instance::new_ref(Constructor::root(Options::new()));
        vm.borrow_mut().options = Rc::new(options);
        init_lifecycle(&vm);
        vm
    }

    #[test]
    fn test_inject_resolves_from_nearest_ancestor() {
        let root = instance(
            Options::new().with("provide", OptionValue::json(json!({ "theme": "dark", "size": 1 }))),
            None,
        );
        init_provide(&root);
        let middle = instance(
            Options::new().with("provide", OptionValue::json(json!({ "size": 2 }))),
            Some(&root),
        );
        init_provide(&middle);
        let leaf = instance(
            Options::new().with(
                "inject",
                OptionValue::json(json!({
                    "theme": { "from": "theme" },
                    "size": { "from": "size" },
                    "locale": { "from": "locale", "default": "en" }
                })),
            ),
            Some(&middle),
        );
        init_injections(&leaf);
        assert_eq!(
            Value::Object(leaf.borrow().injected().clone()),
            json!({ "theme": "dark", "size": 2, "locale": "en" })
        );
    }

    #[test]
    fn test_missing_injection_warns() {
        config::with_config(Config::development(), || {
            let vm = instance(
                Options::new().with("inject", OptionValue::json(json!({ "store": { "from": "store" } }))),
                None,
            );
            let (_, warnings) = capture_warnings(|| init_injections(&vm));
            assert_eq!(warnings, vec!["Injection \"store\" not found".to_string()]);
            assert!(vm.borrow().injected().is_empty());
        });
    }

    #[test]
    fn test_provide_function_sees_state() {
        let vm = instance(
            Options::new().with(
                "provide",
                OptionValue::Data(Rc::new(|vm: &Instance| {
                    let mut provided = Map::new();
                    provided.insert("count".into(), vm.get("count").unwrap_or(Value::Null));
                    provided
                })),
            ),
            None,
        );
        vm.borrow_mut().data.insert("count".into(), json!(5));
        init_provide(&vm);
        assert_eq!(vm.borrow().provided().get("count"), Some(&json!(5)));
    }
}
