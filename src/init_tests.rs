//! Instance initialization scenarios
//!
//! Covers the ordering and identity guarantees of `Runtime::init`:
//! - fixed phase order, state initialized exactly once
//! - monotonic uids
//! - constructor options resolved by identity and merged with instance options
//! - the internal-component fast path bypassing the merger

#[cfg(test)]
mod tests {
    use serde_json::{json, Map, Value};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use crate::compiler::{CompiledTemplate, CompilerOptions, TemplateCompiler};
    use crate::config::{self, Config};
    use crate::constructor::resolve_constructor_options;
    use crate::definition::ComponentDefinition;
    use crate::dom::{Element, HtmlDocument};
    use crate::error::{CompileError, HookError};
    use crate::instance::{Instance, InstanceRef};
    use crate::merge::{register_strategy, remove_strategy};
    use crate::options::{OptionValue, Options, RenderFn};
    use crate::proxy::{RenderContext, RenderProxy};
    use crate::runtime::{InternalComponentOptions, Runtime};
    use crate::subsystems::{DefaultSubsystems, Subsystems};
    use crate::vnode::{VNode, VNodeComponentOptions};

    // ═══════════════════════════════════════════════════════════════════════════════
    // TEST DOUBLES
    // ═══════════════════════════════════════════════════════════════════════════════

    #[derive(Clone, Default)]
    struct RecordingSubsystems {
        log: Rc<RefCell<Vec<String>>>,
    }

    impl RecordingSubsystems {
        fn record(&self, entry: impl Into<String>) {
            self.log.borrow_mut().push(entry.into());
        }
    }

    impl Subsystems for RecordingSubsystems {
        fn init_lifecycle(&self, vm: &InstanceRef) {
            self.record("lifecycle");
            DefaultSubsystems.init_lifecycle(vm)
        }

        fn init_events(&self, vm: &InstanceRef) {
            self.record("events");
            DefaultSubsystems.init_events(vm)
        }

        fn init_render(&self, vm: &InstanceRef) {
            self.record("render");
            DefaultSubsystems.init_render(vm)
        }

        fn call_hook(&self, vm: &InstanceRef, hook: &str) {
            self.record(format!("hook:{}", hook));
            DefaultSubsystems.call_hook(vm, hook)
        }

        fn init_injections(&self, vm: &InstanceRef) {
            self.record("injections");
            DefaultSubsystems.init_injections(vm)
        }

        fn init_state(&self, vm: &InstanceRef) {
            self.record("state");
            DefaultSubsystems.init_state(vm)
        }

        fn init_provide(&self, vm: &InstanceRef) {
            self.record("provide");
            DefaultSubsystems.init_provide(vm)
        }

        fn mount_component(&self, vm: &InstanceRef, el: Option<Element>, hydrating: bool) {
            self.record("mount");
            DefaultSubsystems.mount_component(vm, el, hydrating)
        }
    }

    fn static_compiler() -> impl TemplateCompiler {
        |_template: &str, _options: &CompilerOptions| {
            let render: RenderFn = Rc::new(|_ctx: &RenderContext<'_>| VNode::element("div", vec![]));
            Ok::<_, CompileError>(CompiledTemplate::new(render))
        }
    }

    fn setup() -> (Runtime, RecordingSubsystems) {
        let doc = HtmlDocument::parse("<html><body><div id=\"app\"></div></body></html>").unwrap();
        let recording = RecordingSubsystems::default();
        let runtime = Runtime::new(Rc::new(doc), static_compiler()).with_subsystems(recording.clone());
        (runtime, recording)
    }

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // PHASE ORDER
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_phase_order_without_el() {
        let (runtime, recording) = setup();
        runtime.new_root(Options::new());
        assert_eq!(
            recording.log.borrow().as_slice(),
            [
                "lifecycle",
                "events",
                "render",
                "hook:beforeCreate",
                "injections",
                "state",
                "provide",
                "hook:created",
            ]
        );
    }

    #[test]
    fn test_el_mounts_after_created() {
        let (runtime, recording) = setup();
        runtime.new_root(
            ComponentDefinition::new()
                .el("#app")
                .render(|_ctx| VNode::element("main", vec![]))
                .build(),
        );
        let log = recording.log.borrow();
        assert_eq!(log.iter().filter(|e| *e == "state").count(), 1);
        assert_eq!(log.last().map(String::as_str), Some("mount"));
        let created = log.iter().position(|e| e == "hook:created").unwrap();
        assert_eq!(created, log.len() - 2);
    }

    #[test]
    fn test_hooks_observe_phase_state() {
        let (runtime, _) = setup();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let before = seen.clone();
        let after = seen.clone();
        let parent = runtime.new_root(
            ComponentDefinition::new()
                .provide(|_vm| object(json!({ "theme": "dark" })))
                .build(),
        );
        let child_ctor = runtime.extend(
            ComponentDefinition::new()
                .name("themed-box")
                .inject(json!(["theme"]))
                .data(|vm| object(json!({ "label": vm.get("theme") })))
                .before_create(move |vm| {
                    before
                        .borrow_mut()
                        .push(format!("beforeCreate data={} injected={}", vm.data().len(), vm.injected().len()));
                    Ok(())
                })
                .created(move |vm| {
                    after
                        .borrow_mut()
                        .push(format!("created label={}", vm.get("label").unwrap_or(Value::Null)));
                    Ok(())
                })
                .build(),
        );
        let child = runtime.create(
            &child_ctor,
            Options::new().with("parent", OptionValue::Instance(Rc::downgrade(&parent))),
        );

        assert_eq!(
            seen.borrow().as_slice(),
            ["beforeCreate data=0 injected=0".to_string(), "created label=\"dark\"".to_string()]
        );
        assert!(Rc::ptr_eq(&child.borrow().parent().unwrap(), &parent));
    }

    #[test]
    fn test_hook_error_does_not_abort_init() {
        let (runtime, recording) = setup();
        let reported = Rc::new(Cell::new(0));
        let counter = reported.clone();
        let previous = crate::debug::set_error_handler(Some(Rc::new(
            move |_err: &HookError, _vm: Option<&Instance>, info: &str| {
                assert_eq!(info, "beforeCreate hook");
                counter.set(counter.get() + 1);
            },
        )));
        let vm = runtime.new_root(
            ComponentDefinition::new()
                .before_create(|_vm| Err(HookError::new("not ready")))
                .data(|_vm| object(json!({ "ok": true })))
                .build(),
        );
        crate::debug::set_error_handler(previous);

        assert_eq!(reported.get(), 1);
        assert_eq!(vm.borrow().get("ok"), Some(json!(true)));
        assert!(recording.log.borrow().contains(&"hook:created".to_string()));
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // IDENTITY
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_uids_are_strictly_increasing() {
        let (runtime, _) = setup();
        let uids: Vec<u64> = (0..4)
            .map(|_| runtime.new_root(Options::new()).borrow().uid())
            .collect();
        assert!(uids.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_markers_self_and_render_proxy() {
        config::with_config(Config::development(), || {
            let (runtime, _) = setup();
            let vm = runtime.new_root(Options::new());
            let instance = vm.borrow();
            assert!(instance.is_vue());
            assert!(!instance.is_component());
            assert!(Rc::ptr_eq(&instance.self_ref().unwrap(), &vm));
            assert_eq!(instance.render_proxy(), Some(RenderProxy::Guarded));
            assert!(Rc::ptr_eq(&instance.root().unwrap(), &vm));
        });
        config::with_config(
            Config {
                production: true,
                ..Config::default()
            },
            || {
                let (runtime, _) = setup();
                let vm = runtime.new_root(Options::new());
                assert_eq!(vm.borrow().render_proxy(), Some(RenderProxy::Direct));
            },
        );
    }

    #[test]
    fn test_instance_options_merge_constructor_first() {
        let (runtime, _) = setup();
        let order = Rc::new(RefCell::new(Vec::new()));
        let from_ctor = order.clone();
        let from_instance = order.clone();
        let ctor = runtime.extend(
            ComponentDefinition::new()
                .name("counter-view")
                .created(move |_| {
                    from_ctor.borrow_mut().push("constructor");
                    Ok(())
                })
                .build(),
        );
        let vm = runtime.create(
            &ctor,
            ComponentDefinition::new()
                .created(move |_| {
                    from_instance.borrow_mut().push("instance");
                    Ok(())
                })
                .build(),
        );
        assert_eq!(order.borrow().as_slice(), ["constructor", "instance"]);
        assert_eq!(vm.borrow().options().name().as_deref(), Some("counter-view"));
    }

    #[test]
    fn test_constructor_options_cached_across_instances() {
        let (runtime, _) = setup();
        let ctor = runtime.extend(ComponentDefinition::new().name("card-item").build());
        runtime.create(&ctor, Options::new());
        let first = resolve_constructor_options(&ctor);
        runtime.create(&ctor, Options::new());
        let second = resolve_constructor_options(&ctor);
        assert!(Rc::ptr_eq(&first, &second));

        let mixed_in = Rc::new(Cell::new(0));
        let counter = mixed_in.clone();
        runtime.base().mixin(
            &ComponentDefinition::new()
                .created(move |_| {
                    counter.set(counter.get() + 1);
                    Ok(())
                })
                .build(),
        );
        runtime.create(&ctor, Options::new());
        assert_eq!(mixed_in.get(), 1);
        assert!(!Rc::ptr_eq(&first, &resolve_constructor_options(&ctor)));
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // INTERNAL FAST PATH
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_internal_component_skips_merge() {
        let (runtime, _) = setup();
        let child_ctor = runtime.extend(ComponentDefinition::new().name("child-item").props(json!(["msg"])).build());
        let parent = runtime.new_root(Options::new());
        let ctor_options = child_ctor.options();

        let merges = Rc::new(Cell::new(0));
        let counter = merges.clone();
        register_strategy(
            "name",
            Rc::new(move |parent: Option<&OptionValue>, child: Option<&OptionValue>, _vm: Option<&Instance>, _key: &str| {
                counter.set(counter.get() + 1);
                child.or(parent).cloned()
            }),
        );

        let vnode = Rc::new(VNode::component(
            "child-item",
            VNodeComponentOptions::new(child_ctor.clone())
                .props_data(object(json!({ "msg": "hi" })))
                .children(vec![VNode::text("slotted")])
                .tag("child-item"),
        ));
        let child = runtime
            .create_component_instance_for_vnode(vnode.clone(), Some(&parent))
            .unwrap();
        remove_strategy("name");

        assert_eq!(merges.get(), 0);
        let child = child.borrow();
        let options = child.options();
        assert_eq!(options.props_data().unwrap()["msg"], json!("hi"));
        assert!(options.render().is_none());
        assert!(Rc::ptr_eq(options.proto().unwrap(), &ctor_options));
        assert!(Rc::ptr_eq(&options.parent_vnode().unwrap(), &vnode));
        assert_eq!(options.component_tag().as_deref(), Some("child-item"));
        assert!(!ctor_options.has_own("propsData"));
        assert!(Rc::ptr_eq(&child_ctor.options(), &ctor_options));

        assert!(child.is_component());
        assert_eq!(child.props()["msg"], json!("hi"));
        assert_eq!(child.slots()["default"].len(), 1);
        assert!(Rc::ptr_eq(&child.parent().unwrap(), &parent));
    }

    #[test]
    fn test_vnode_instance_sees_options_added_after_extend() {
        let (runtime, _) = setup();
        let child_ctor = runtime.extend(ComponentDefinition::new().name("child-item").build());

        let created = Rc::new(Cell::new(0));
        let counter = created.clone();
        runtime.base().mixin(
            &ComponentDefinition::new()
                .created(move |_| {
                    counter.set(counter.get() + 1);
                    Ok(())
                })
                .build(),
        );

        let vnode = Rc::new(VNode::component(
            "child-item",
            VNodeComponentOptions::new(child_ctor.clone()),
        ));
        let child = runtime.create_component_instance_for_vnode(vnode, None).unwrap();
        assert_eq!(created.get(), 1);
        assert!(Rc::ptr_eq(child.borrow().options().proto().unwrap(), &child_ctor.options()));

        runtime.create(&child_ctor, Options::new());
        assert_eq!(created.get(), 2);
    }

    #[test]
    fn test_internal_component_with_explicit_render() {
        let (runtime, _) = setup();
        let ctor = runtime.extend(ComponentDefinition::new().name("inline-box").build());
        let vnode = Rc::new(VNode::component("inline-box", VNodeComponentOptions::new(ctor.clone())));
        let render: RenderFn = Rc::new(|_ctx: &RenderContext<'_>| VNode::text("inline"));
        let child = runtime.create(
            &ctor,
            InternalComponentOptions::new(vnode).render(render.clone(), vec![render.clone()]),
        );
        let child = child.borrow();
        let Some(OptionValue::Render(stored)) = child.options().get_own("render") else {
            panic!("explicit render missing");
        };
        assert!(crate::options::same_rc(&stored, &render));
        assert_eq!(child.options().static_render_fns().len(), 1);
        assert!(ctor.options().render().is_none());
    }

    #[test]
    fn test_non_component_vnode_is_rejected() {
        let (runtime, _) = setup();
        assert!(runtime
            .create_component_instance_for_vnode(Rc::new(VNode::element("div", vec![])), None)
            .is_none());
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // TREE LINKS
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_child_created_from_parent_hook_is_linked() {
        let (runtime, _) = setup();
        let runtime = Rc::new(runtime);
        let kid_ctor = runtime.extend(ComponentDefinition::new().name("kid").inject(json!(["theme"])).build());
        let kid_slot: Rc<RefCell<Option<InstanceRef>>> = Rc::new(RefCell::new(None));

        let rt = runtime.clone();
        let slot = kid_slot.clone();
        let parent = runtime.new_root(
            ComponentDefinition::new()
                .provide(|_vm| object(json!({ "theme": "dark" })))
                .render(|_ctx| VNode::element("main", vec![]))
                .mounted(move |vm| {
                    let me = vm.self_ref().expect("self reference");
                    let kid = rt.create(
                        &kid_ctor,
                        Options::new().with("parent", OptionValue::Instance(Rc::downgrade(&me))),
                    );
                    *slot.borrow_mut() = Some(kid);
                    Ok(())
                })
                .el("#app")
                .build(),
        );

        let kid = kid_slot.borrow().clone().expect("kid created");
        let children = parent.borrow().children();
        assert_eq!(children.len(), 1);
        assert!(Rc::ptr_eq(&children[0], &kid));

        let kid = kid.borrow();
        assert!(Rc::ptr_eq(&kid.parent().unwrap(), &parent));
        assert!(Rc::ptr_eq(&kid.root().unwrap(), &parent));
        assert_eq!(kid.injected().get("theme"), Some(&json!("dark")));
    }

    #[test]
    fn test_non_selector_el_does_not_mount() {
        let (runtime, recording) = setup();
        for el in [Value::Null, json!(""), json!(3)] {
            let vm = runtime.new_root(Options::new().with("el", OptionValue::json(el)));
            assert!(vm.borrow().el().is_none());
        }
        assert!(!recording.log.borrow().iter().any(|entry| entry == "mount"));
    }
}
