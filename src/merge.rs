//! Options merger.
//!
//! `merge_options(parent, child, vm)` builds a fresh [`Options`] from a parent
//! (defaults or ancestor) options object and a child options object. Every key
//! present on either side is resolved through a merge strategy:
//!
//! | key | strategy |
//! |---|---|
//! | `data`, `provide` | compose: parent result, then child result overlaid shallowly |
//! | lifecycle hooks | parent hooks followed by child hooks, de-duplicated by identity |
//! | `components`, `directives`, `filters` | layered registry over a parent snapshot |
//! | `watch` | per-key handler sequences, parent first |
//! | `props`, `methods`, `inject`, `computed` | shallow extend, child keys win |
//! | `el`, `propsData`, everything else | child if present, else parent |
//!
//! Neither input is modified. Custom strategies registered with
//! [`register_strategy`] take precedence over the built-in table.

use serde_json::{Map, Value};
use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::config;
use crate::debug::warn;
use crate::instance::Instance;
use crate::options::{
    is_lifecycle_hook, same_rc, AssetKind, DataFn, Hook, OptionValue, Options, Registry, WatchMap,
};
use crate::util::{camelize, is_builtin_or_reserved_tag, is_valid_component_name};

pub type Strategy =
    Rc<dyn Fn(Option<&OptionValue>, Option<&OptionValue>, Option<&Instance>, &str) -> Option<OptionValue>>;

thread_local! {
    static CUSTOM_STRATEGIES: RefCell<HashMap<String, Strategy>> = RefCell::new(HashMap::new());
}

/// Register a merge strategy for `key` on the current thread.
pub fn register_strategy(key: &str, strategy: Strategy) {
    CUSTOM_STRATEGIES.with(|s| {
        s.borrow_mut().insert(key.to_string(), strategy);
    });
}

pub fn remove_strategy(key: &str) -> Option<Strategy> {
    CUSTOM_STRATEGIES.with(|s| s.borrow_mut().remove(key))
}

fn custom_strategy(key: &str) -> Option<Strategy> {
    CUSTOM_STRATEGIES.with(|s| s.borrow().get(key).cloned())
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENTRY POINT
// ═══════════════════════════════════════════════════════════════════════════════

pub fn merge_options(parent: &Options, child: &Options, vm: Option<&Instance>) -> Options {
    if config::is_dev() {
        check_components(child);
    }

    let child = normalize(child, vm);

    // Raw child options may pull in `extends` and `mixins`; already-merged
    // options carry `_base` and have had theirs applied.
    let mut base: Cow<'_, Options> = Cow::Borrowed(parent);
    if !child.has("_base") {
        if let Some(OptionValue::Extends(extends)) = child.get_own("extends") {
            base = Cow::Owned(merge_options(&base, &extends, vm));
        }
        if let Some(OptionValue::Mixins(mixins)) = child.get_own("mixins") {
            for mixin in mixins.iter() {
                base = Cow::Owned(merge_options(&base, mixin, vm));
            }
        }
    }

    let merged = Options::new();
    for key in base.keys() {
        merge_field(&merged, &key, base.get(&key).as_ref(), child.get(&key).as_ref(), vm);
    }
    for key in child.keys() {
        if !base.has(&key) {
            merge_field(&merged, &key, None, child.get(&key).as_ref(), vm);
        }
    }
    merged
}

fn merge_field(
    merged: &Options,
    key: &str,
    parent: Option<&OptionValue>,
    child: Option<&OptionValue>,
    vm: Option<&Instance>,
) {
    let value = match custom_strategy(key) {
        Some(strategy) => strategy(parent, child, vm, key),
        None => builtin_strategy(key, parent, child, vm),
    };
    if let Some(value) = value {
        merged.set(key, value);
    }
}

fn builtin_strategy(
    key: &str,
    parent: Option<&OptionValue>,
    child: Option<&OptionValue>,
    vm: Option<&Instance>,
) -> Option<OptionValue> {
    match key {
        "data" => merge_data(parent, child, vm),
        "provide" => merge_data_or_fn(parent, child),
        "el" | "propsData" => {
            if vm.is_none() && child.is_some() && config::is_dev() {
                warn(
                    &format!(
                        "option \"{}\" can only be used during instance creation.",
                        key
                    ),
                    None,
                );
            }
            default_strategy(parent, child)
        }
        "watch" => merge_watch(parent, child),
        "props" | "methods" | "inject" | "computed" => merge_extend(parent, child),
        _ if is_lifecycle_hook(key) => merge_hooks(parent, child),
        _ => match AssetKind::from_option_key(key) {
            Some(kind) => merge_assets(kind, parent, child, vm),
            None => default_strategy(parent, child),
        },
    }
}

pub fn default_strategy(parent: Option<&OptionValue>, child: Option<&OptionValue>) -> Option<OptionValue> {
    child.or(parent).cloned()
}

// ═══════════════════════════════════════════════════════════════════════════════
// DATA / PROVIDE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
enum DataSource {
    Fn(DataFn),
    Object(Rc<Value>),
}

impl DataSource {
    fn from_option(value: &OptionValue) -> Option<Self> {
        match value {
            OptionValue::Data(f) => Some(DataSource::Fn(f.clone())),
            OptionValue::Json(v) if v.is_object() => Some(DataSource::Object(v.clone())),
            _ => None,
        }
    }

    fn evaluate(&self, vm: &Instance) -> Map<String, Value> {
        match self {
            DataSource::Fn(f) => f(vm),
            DataSource::Object(v) => v.as_object().cloned().unwrap_or_default(),
        }
    }
}

fn merge_data(
    parent: Option<&OptionValue>,
    child: Option<&OptionValue>,
    vm: Option<&Instance>,
) -> Option<OptionValue> {
    if vm.is_none() {
        if let Some(child_value) = child {
            if !matches!(child_value, OptionValue::Data(_)) {
                if config::is_dev() {
                    warn(
                        "The \"data\" option should be a function that returns a per-instance \
                         value in component definitions.",
                        None,
                    );
                }
                return parent.cloned();
            }
        }
    }
    merge_data_or_fn(parent, child)
}

fn merge_data_or_fn(parent: Option<&OptionValue>, child: Option<&OptionValue>) -> Option<OptionValue> {
    let Some(child_value) = child else {
        return parent.cloned();
    };
    let Some(child_source) = DataSource::from_option(child_value) else {
        if config::is_dev() {
            warn("data and provide options must be functions or objects.", None);
        }
        return parent.cloned();
    };
    let Some(parent_source) = parent.and_then(DataSource::from_option) else {
        return Some(child_value.clone());
    };
    let composed: DataFn = Rc::new(move |vm: &Instance| {
        let mut data = parent_source.evaluate(vm);
        for (key, value) in child_source.evaluate(vm) {
            data.insert(key, value);
        }
        data
    });
    Some(OptionValue::Data(composed))
}

// ═══════════════════════════════════════════════════════════════════════════════
// HOOKS
// ═══════════════════════════════════════════════════════════════════════════════

fn hooks_of(value: Option<&OptionValue>) -> Option<Rc<Vec<Hook>>> {
    match value {
        Some(OptionValue::Hooks(hooks)) => Some(hooks.clone()),
        _ => None,
    }
}

fn dedupe_hooks(hooks: Vec<Hook>) -> Vec<Hook> {
    let mut unique: Vec<Hook> = Vec::with_capacity(hooks.len());
    for hook in hooks {
        if !unique.iter().any(|seen| same_rc(seen, &hook)) {
            unique.push(hook);
        }
    }
    unique
}

fn merge_hooks(parent: Option<&OptionValue>, child: Option<&OptionValue>) -> Option<OptionValue> {
    let parent_hooks = hooks_of(parent);
    let Some(child_hooks) = hooks_of(child) else {
        return parent_hooks.map(OptionValue::Hooks);
    };
    let Some(parent_hooks) = parent_hooks else {
        return Some(OptionValue::Hooks(child_hooks));
    };
    let combined: Vec<Hook> = parent_hooks
        .iter()
        .chain(child_hooks.iter())
        .cloned()
        .collect();
    Some(OptionValue::Hooks(Rc::new(dedupe_hooks(combined))))
}

// ═══════════════════════════════════════════════════════════════════════════════
// ASSETS
// ═══════════════════════════════════════════════════════════════════════════════

fn merge_assets(
    kind: AssetKind,
    parent: Option<&OptionValue>,
    child: Option<&OptionValue>,
    vm: Option<&Instance>,
) -> Option<OptionValue> {
    let parent_registry = match parent {
        Some(OptionValue::Registry(registry)) => Some(registry.clone()),
        _ => None,
    };
    let child_registry = match child {
        Some(OptionValue::Registry(registry)) => Some(registry.clone()),
        Some(other) => {
            if config::is_dev() {
                warn(
                    &format!(
                        "Invalid value for option \"{}\": expected a registry, but got {:?}.",
                        kind.option_key(),
                        other
                    ),
                    vm,
                );
            }
            None
        }
        None => None,
    };
    if parent_registry.is_none() && child_registry.is_none() {
        return None;
    }
    let layered = Registry::layered(parent_registry.as_deref(), child_registry.as_deref());
    Some(OptionValue::Registry(Rc::new(layered)))
}

// ═══════════════════════════════════════════════════════════════════════════════
// WATCH / EXTEND
// ═══════════════════════════════════════════════════════════════════════════════

fn merge_watch(parent: Option<&OptionValue>, child: Option<&OptionValue>) -> Option<OptionValue> {
    let (parent_watch, child_watch) = match (parent, child) {
        (Some(OptionValue::Watch(p)), Some(OptionValue::Watch(c))) => (p, c),
        _ => return default_strategy(parent, child),
    };
    let mut merged: WatchMap = parent_watch.as_ref().clone();
    for (key, handlers) in child_watch.iter() {
        let entry = merged.entry(key.clone()).or_default();
        for handler in handlers {
            if !entry.iter().any(|existing| same_rc(existing, handler)) {
                entry.push(handler.clone());
            }
        }
    }
    Some(OptionValue::Watch(Rc::new(merged)))
}

fn merge_extend(parent: Option<&OptionValue>, child: Option<&OptionValue>) -> Option<OptionValue> {
    match (parent, child) {
        (Some(OptionValue::Json(p)), Some(OptionValue::Json(c))) => {
            match (p.as_object(), c.as_object()) {
                (Some(p), Some(c)) => {
                    let mut merged = p.clone();
                    merged.extend(c.clone());
                    Some(OptionValue::json(Value::Object(merged)))
                }
                _ => default_strategy(parent, child),
            }
        }
        (Some(OptionValue::Methods(p)), Some(OptionValue::Methods(c))) => {
            let mut merged = p.as_ref().clone();
            merged.extend(c.iter().map(|(k, v)| (k.clone(), v.clone())));
            Some(OptionValue::Methods(Rc::new(merged)))
        }
        (Some(OptionValue::Computed(p)), Some(OptionValue::Computed(c))) => {
            let mut merged = p.as_ref().clone();
            merged.extend(c.iter().map(|(k, v)| (k.clone(), v.clone())));
            Some(OptionValue::Computed(Rc::new(merged)))
        }
        _ => default_strategy(parent, child),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// NORMALIZATION & VALIDATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Copy of `child` with `props` and `inject` in object form.
fn normalize(child: &Options, vm: Option<&Instance>) -> Options {
    let normalized = child.clone();
    if let Some(OptionValue::Json(props)) = child.get_own("props") {
        if let Some(props) = normalize_props(&props, vm) {
            normalized.set("props", OptionValue::json(props));
        }
    }
    if let Some(OptionValue::Json(inject)) = child.get_own("inject") {
        if let Some(inject) = normalize_inject(&inject, vm) {
            normalized.set("inject", OptionValue::json(inject));
        }
    }
    normalized
}

/// `["fooBar"]` / `{ "foo-bar": Type }` → `{ "fooBar": { "type": ... } }`
pub fn normalize_props(props: &Value, vm: Option<&Instance>) -> Option<Value> {
    let mut normalized = Map::new();
    match props {
        Value::Array(names) => {
            for name in names {
                match name.as_str() {
                    Some(name) => {
                        normalized.insert(camelize(name), serde_json::json!({ "type": null }));
                    }
                    None => {
                        if config::is_dev() {
                            warn("props must be strings when using array syntax.", vm);
                        }
                    }
                }
            }
        }
        Value::Object(entries) => {
            for (name, entry) in entries {
                let entry = if entry.is_object() {
                    entry.clone()
                } else {
                    serde_json::json!({ "type": entry })
                };
                normalized.insert(camelize(name), entry);
            }
        }
        other => {
            if config::is_dev() {
                warn(
                    &format!(
                        "Invalid value for option \"props\": expected an Array or an Object, but got {}.",
                        other
                    ),
                    vm,
                );
            }
            return None;
        }
    }
    Some(Value::Object(normalized))
}

/// `["theme"]` / `{ "t": "theme" }` → `{ "theme": { "from": "theme" } }`
pub fn normalize_inject(inject: &Value, vm: Option<&Instance>) -> Option<Value> {
    let mut normalized = Map::new();
    match inject {
        Value::Array(keys) => {
            for key in keys.iter().filter_map(Value::as_str) {
                normalized.insert(key.to_string(), serde_json::json!({ "from": key }));
            }
        }
        Value::Object(entries) => {
            for (key, entry) in entries {
                let entry = match entry {
                    Value::Object(obj) => {
                        let mut full = Map::new();
                        full.insert("from".to_string(), Value::String(key.clone()));
                        full.extend(obj.clone());
                        Value::Object(full)
                    }
                    other => serde_json::json!({ "from": other }),
                };
                normalized.insert(key.clone(), entry);
            }
        }
        other => {
            if config::is_dev() {
                warn(
                    &format!(
                        "Invalid value for option \"inject\": expected an Array or an Object, but got {}.",
                        other
                    ),
                    vm,
                );
            }
            return None;
        }
    }
    Some(Value::Object(normalized))
}

fn check_components(options: &Options) {
    if let Some(OptionValue::Registry(registry)) = options.get_own("components") {
        for id in registry.own_ids() {
            validate_component_name(&id);
        }
    }
}

pub fn validate_component_name(name: &str) {
    if !is_valid_component_name(name) {
        warn(
            &format!(
                "Invalid component name: \"{}\". Component names should conform to valid custom \
                 element name in html5 specification.",
                name
            ),
            None,
        );
    }
    if is_builtin_or_reserved_tag(name) {
        warn(
            &format!(
                "Do not use built-in or reserved HTML elements as component id: {}",
                name
            ),
            None,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::constructor::Constructor;
    use crate::debug::capture_warnings;
    use crate::options::{Asset, WatchHandler};
    use serde_json::json;

    fn recording_hook(log: &Rc<RefCell<Vec<&'static str>>>, label: &'static str) -> Hook {
        let log = log.clone();
        Rc::new(move |_vm: &mut Instance| {
            log.borrow_mut().push(label);
            Ok(())
        })
    }

    fn blank_vm() -> Instance {
        Instance::blank(Constructor::root(Options::new()))
    }

    fn run(hooks: &[Hook]) {
        let mut vm = blank_vm();
        for hook in hooks {
            hook(&mut vm).unwrap();
        }
    }

    #[test]
    fn test_hooks_concatenate_parent_first() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let a = Options::new().with("created", OptionValue::Hooks(Rc::new(vec![recording_hook(&log, "a")])));
        let b = Options::new().with("created", OptionValue::Hooks(Rc::new(vec![recording_hook(&log, "b")])));
        let c = Options::new().with("created", OptionValue::Hooks(Rc::new(vec![recording_hook(&log, "c")])));

        let left = merge_options(&merge_options(&a, &b, None), &c, None);
        run(&left.hooks("created"));
        assert_eq!(log.borrow().as_slice(), ["a", "b", "c"]);

        log.borrow_mut().clear();
        let right = merge_options(&a, &merge_options(&b, &c, None), None);
        run(&right.hooks("created"));
        assert_eq!(log.borrow().as_slice(), ["a", "b", "c"]);
    }

    #[test]
    fn test_hooks_dedupe_by_identity() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let shared = recording_hook(&log, "shared");
        let parent = Options::new().with("mounted", OptionValue::Hooks(Rc::new(vec![shared.clone()])));
        let child = Options::new().with("mounted", OptionValue::Hooks(Rc::new(vec![shared])));
        assert_eq!(merge_options(&parent, &child, None).hooks("mounted").len(), 1);
    }

    #[test]
    fn test_data_compose_child_overlays_parent() {
        let parent = Options::new().with(
            "data",
            OptionValue::Data(Rc::new(|_vm: &Instance| {
                json!({ "a": 1, "b": 1 }).as_object().cloned().unwrap()
            })),
        );
        let child = Options::new().with(
            "data",
            OptionValue::Data(Rc::new(|_vm: &Instance| {
                json!({ "b": 2, "c": 2 }).as_object().cloned().unwrap()
            })),
        );
        let merged = merge_options(&parent, &child, None);
        let Some(OptionValue::Data(data)) = merged.get("data") else {
            panic!("expected composed data function");
        };
        let vm = blank_vm();
        assert_eq!(Value::Object(data(&vm)), json!({ "a": 1, "b": 2, "c": 2 }));
    }

    #[test]
    fn test_object_data_rejected_at_extend_time() {
        config::with_config(Config::development(), || {
            let parent = Options::new();
            let child = Options::new().with("data", OptionValue::json(json!({ "a": 1 })));
            let (merged, warnings) = capture_warnings(|| merge_options(&parent, &child, None));
            assert!(merged.get("data").is_none());
            assert_eq!(warnings.len(), 1);
            assert!(warnings[0].contains("should be a function"));
        });
    }

    #[test]
    fn test_object_data_allowed_with_instance() {
        let vm = blank_vm();
        let child = Options::new().with("data", OptionValue::json(json!({ "a": 1 })));
        let merged = merge_options(&Options::new(), &child, Some(&vm));
        assert!(matches!(merged.get("data"), Some(OptionValue::Json(_))));
    }

    #[test]
    fn test_registry_merge_shadows_without_deleting() {
        let base_button = Rc::new(Options::new());
        let own_button = Rc::new(Options::new());
        let parent_registry = Registry::from_entries([
            ("Button".to_string(), Asset::Definition(base_button.clone())),
            ("Card".to_string(), Asset::Definition(Rc::new(Options::new()))),
        ]);
        let parent_registry = Rc::new(parent_registry);
        let parent = Options::new().with("components", OptionValue::Registry(parent_registry.clone()));
        let child = Options::new().with(
            "components",
            OptionValue::Registry(Rc::new(Registry::from_entries([(
                "Button".to_string(),
                Asset::Definition(own_button.clone()),
            )]))),
        );
        let merged = merge_options(&parent, &child, None);
        let registry = merged.registry(AssetKind::Component).unwrap();
        assert!(registry.get("Button").unwrap().same(&Asset::Definition(own_button)));
        assert!(registry.get("Card").is_some());

        // Snapshot: parent additions after the merge stay invisible.
        parent_registry.insert("Late", Asset::Definition(Rc::new(Options::new())));
        assert!(registry.get("Late").is_none());
        // The parent registry itself was never touched by the merge.
        assert!(parent_registry
            .get("Button")
            .unwrap()
            .same(&Asset::Definition(base_button)));
    }

    #[test]
    fn test_watch_merges_into_sequences() {
        let first: WatchHandler = Rc::new(|_vm: &mut Instance, _n: &Value, _o: &Value| {});
        let second: WatchHandler = Rc::new(|_vm: &mut Instance, _n: &Value, _o: &Value| {});
        let parent = Options::new().with(
            "watch",
            OptionValue::Watch(Rc::new(HashMap::from([("count".to_string(), vec![first])]))),
        );
        let child = Options::new().with(
            "watch",
            OptionValue::Watch(Rc::new(HashMap::from([("count".to_string(), vec![second])]))),
        );
        let merged = merge_options(&parent, &child, None);
        assert_eq!(merged.watch().unwrap().get("count").map(Vec::len), Some(2));
    }

    #[test]
    fn test_default_strategy_child_wins() {
        let parent = Options::new()
            .with("name", OptionValue::string("parent"))
            .with("comments", OptionValue::json(json!(true)));
        let child = Options::new().with("name", OptionValue::string("child"));
        let merged = merge_options(&parent, &child, None);
        assert_eq!(merged.name().as_deref(), Some("child"));
        assert!(merged.comments());
    }

    #[test]
    fn test_el_outside_instance_creation_warns() {
        config::with_config(Config::development(), || {
            let child = Options::new().with("el", OptionValue::string("#app"));
            let (merged, warnings) = capture_warnings(|| merge_options(&Options::new(), &child, None));
            assert_eq!(merged.string("el").as_deref(), Some("#app"));
            assert_eq!(warnings.len(), 1);

            let vm = blank_vm();
            let (_, warnings) = capture_warnings(|| merge_options(&Options::new(), &child, Some(&vm)));
            assert!(warnings.is_empty());
        });
    }

    #[test]
    fn test_props_normalized_and_extended() {
        let parent = Options::new().with("props", OptionValue::json(json!(["title"])));
        let child = Options::new().with("props", OptionValue::json(json!({ "max-count": { "default": 3 } })));
        let merged = merge_options(&parent, &child, None);
        assert_eq!(
            *merged.json("props").unwrap(),
            json!({ "title": { "type": null }, "maxCount": { "default": 3 } })
        );
    }

    #[test]
    fn test_inject_normalization() {
        assert_eq!(
            normalize_inject(&json!(["theme"]), None).unwrap(),
            json!({ "theme": { "from": "theme" } })
        );
        assert_eq!(
            normalize_inject(&json!({ "t": "theme", "size": { "default": 1 } }), None).unwrap(),
            json!({ "t": { "from": "theme" }, "size": { "from": "size", "default": 1 } })
        );
    }

    #[test]
    fn test_mixins_and_extends_apply_before_child() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let extends = Options::new().with("created", OptionValue::Hooks(Rc::new(vec![recording_hook(&log, "extends")])));
        let mixin = Options::new().with("created", OptionValue::Hooks(Rc::new(vec![recording_hook(&log, "mixin")])));
        let child = Options::new()
            .with("extends", OptionValue::Extends(Rc::new(extends)))
            .with("mixins", OptionValue::Mixins(Rc::new(vec![Rc::new(mixin)])))
            .with("created", OptionValue::Hooks(Rc::new(vec![recording_hook(&log, "own")])));
        let parent = Options::new().with("created", OptionValue::Hooks(Rc::new(vec![recording_hook(&log, "parent")])));
        run(&merge_options(&parent, &child, None).hooks("created"));
        assert_eq!(log.borrow().as_slice(), ["parent", "extends", "mixin", "own"]);
    }

    #[test]
    fn test_custom_strategy_overrides_builtin() {
        register_strategy(
            "title",
            Rc::new(|parent: Option<&OptionValue>, child: Option<&OptionValue>, _vm: Option<&Instance>, _key: &str| {
                let join = |v: Option<&OptionValue>| {
                    v.and_then(|v| v.as_json().and_then(|j| j.as_str().map(str::to_string)))
                        .unwrap_or_default()
                };
                Some(OptionValue::string(format!("{}{}", join(parent), join(child))))
            }),
        );
        let parent = Options::new().with("title", OptionValue::string("a"));
        let child = Options::new().with("title", OptionValue::string("b"));
        let merged = merge_options(&parent, &child, None);
        remove_strategy("title");
        assert_eq!(merged.string("title").as_deref(), Some("ab"));
    }

    #[test]
    fn test_inputs_are_not_modified() {
        let parent = Options::new().with("name", OptionValue::string("p"));
        let child = Options::new().with("props", OptionValue::json(json!(["a"])));
        let _ = merge_options(&parent, &child, None);
        assert_eq!(parent.own_keys(), vec!["name".to_string()]);
        assert_eq!(*child.json("props").unwrap(), json!(["a"]));
    }

    #[test]
    fn test_invalid_component_names_warn() {
        config::with_config(Config::development(), || {
            let (_, warnings) = capture_warnings(|| {
                validate_component_name("div");
                validate_component_name("9lives");
                validate_component_name("todo-item");
            });
            assert_eq!(warnings.len(), 2);
        });
    }
}
