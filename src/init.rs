//! Instance initialization.
//!
//! ## Phase order
//!
//! 1. uid
//! 2. `_isVue` marker
//! 3. `$options`: internal fast path, or `merge(resolve(ctor), options, vm)`
//! 4. render proxy and `_self`
//! 5. lifecycle, 6. events, 7. render scaffolding
//! 8. `beforeCreate`
//! 9. injections
//! 10. state (exactly once)
//! 11. provide
//! 12. `created`
//! 13. mount when `$options.el` is set
//!
//! 8 → 9 → 10 → 11 → 12 never reorders: injections must exist before state,
//! and provide may read state.

use serde_json::Value;
use std::rc::Rc;

use crate::constructor::resolve_constructor_options;
use crate::debug::format_component_name;
use crate::instance::{next_uid, InstanceRef};
use crate::merge::merge_options;
use crate::mount::MountTarget;
use crate::options::{OptionValue, Options};
use crate::perf;
use crate::proxy::RenderProxy;
use crate::runtime::{InitOptions, InternalComponentOptions, Runtime};

impl Runtime {
    pub fn init(&self, vm: &InstanceRef, options: InitOptions) {
        let uid = next_uid();
        vm.borrow_mut().uid = uid;

        let start_tag = format!("zenith-perf-start:{}", uid);
        let end_tag = format!("zenith-perf-end:{}", uid);
        let measuring = perf::enabled();
        if measuring {
            perf::mark(&start_tag);
        }

        vm.borrow_mut().is_vue = true;

        match options {
            InitOptions::Internal(internal) => init_internal_component(vm, internal),
            InitOptions::User(user) => {
                let ctor = vm.borrow().constructor.clone();
                let resolved = resolve_constructor_options(&ctor);
                let merged = merge_options(&resolved, &user, Some(&*vm.borrow()));
                vm.borrow_mut().options = Rc::new(merged);
            }
        }

        {
            let mut instance = vm.borrow_mut();
            instance.render_proxy = Some(RenderProxy::install());
            instance.self_ref = Rc::downgrade(vm);
        }

        self.subsystems.init_lifecycle(vm);
        self.subsystems.init_events(vm);
        self.subsystems.init_render(vm);
        self.subsystems.call_hook(vm, "beforeCreate");
        self.subsystems.init_injections(vm);
        self.subsystems.init_state(vm);
        self.subsystems.init_provide(vm);
        self.subsystems.call_hook(vm, "created");

        if measuring {
            let name = format_component_name(Some(&*vm.borrow()), false);
            vm.borrow_mut().name = Some(name.clone());
            perf::mark(&end_tag);
            perf::measure(&format!("zenith {} init", name), &start_tag, &end_tag);
        }

        // Only a selector or an element mounts; `null`, `""` and other values do not.
        let el = vm.borrow().options.get("el");
        let target = match el {
            Some(OptionValue::Element(el)) => Some(MountTarget::Element(el)),
            Some(OptionValue::Json(value)) => match value.as_ref() {
                Value::String(selector) if !selector.is_empty() => {
                    Some(MountTarget::Selector(selector.clone()))
                }
                _ => None,
            },
            _ => None,
        };
        if let Some(target) = target {
            self.mount(vm, Some(target), false);
        }
    }
}

/// Assemble `$options` for an instance created by the render tree.
///
/// The result delegates to the constructor's options instead of copying or
/// merging them; only per-occurrence fields are set as own entries.
pub fn init_internal_component(vm: &InstanceRef, internal: InternalComponentOptions) {
    let ctor = vm.borrow().constructor.clone();
    let options = Options::with_proto(ctor.options());

    if let Some(parent) = internal.parent {
        options.set("parent", OptionValue::Instance(parent));
    }
    let parent_vnode = internal.parent_vnode;
    if let Some(component) = &parent_vnode.component_options {
        if let Some(props_data) = &component.props_data {
            options.set("propsData", OptionValue::json(Value::Object(props_data.clone())));
        }
        if let Some(listeners) = &component.listeners {
            options.set("_parentListeners", OptionValue::Listeners(listeners.clone()));
        }
        if let Some(children) = &component.children {
            options.set("_renderChildren", OptionValue::Children(children.clone()));
        }
        if let Some(tag) = &component.tag {
            options.set("_componentTag", OptionValue::string(tag.as_str()));
        }
    }
    options.set("_parentVnode", OptionValue::VNode(parent_vnode));

    if let Some(render) = internal.render {
        options.set("render", OptionValue::Render(render));
        options.set(
            "staticRenderFns",
            OptionValue::StaticRenderFns(Rc::new(internal.static_render_fns)),
        );
    }

    let mut instance = vm.borrow_mut();
    instance.options = Rc::new(options);
    instance.is_component = true;
}
