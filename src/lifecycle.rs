//! Parent/child linkage, hook invocation and the base mount.

use std::rc::Rc;

use crate::config;
use crate::debug::{handle_error, warn};
use crate::dom::Element;
use crate::events;
use crate::instance::{links_of, InstanceRef};

/// Link `vm` under its first non-abstract parent and reset lifecycle flags.
///
/// Parents are reached through their [`Links`](crate::instance::Links), so
/// linking works while the parent is borrowed by one of its own hooks.
pub fn init_lifecycle(vm: &InstanceRef) {
    let (parent, links, is_abstract) = {
        let instance = vm.borrow();
        let is_abstract = instance
            .options
            .json("abstract")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        (instance.options.parent(), instance.links.clone(), is_abstract)
    };

    let mut parent_links = parent.as_ref().and_then(links_of);
    if parent.is_some() && parent_links.is_none() {
        warn("Could not link instance to its parent.", Some(&*vm.borrow()));
    }
    if !is_abstract {
        while let Some(p) = parent_links.clone() {
            match p.parent() {
                Some(next) if p.is_abstract() => parent_links = Some(next),
                _ => break,
            }
        }
        if let Some(p) = &parent_links {
            p.push_child(vm);
        }
    }

    let parent = parent_links.as_ref().and_then(|p| p.owner());
    let root = parent_links
        .as_ref()
        .and_then(|p| p.root())
        .unwrap_or_else(|| vm.clone());
    links.attach(parent_links, &root, is_abstract);

    let mut instance = vm.borrow_mut();
    let lifecycle = &mut instance.lifecycle;
    lifecycle.parent = parent.as_ref().map(Rc::downgrade);
    lifecycle.root = Some(Rc::downgrade(&root));
    lifecycle.inactive = None;
    lifecycle.direct_inactive = false;
    lifecycle.is_mounted = false;
    lifecycle.is_destroyed = false;
    lifecycle.is_being_destroyed = false;
}

/// Run every handler registered for `hook`, parent-merged handlers first.
/// Failures are routed to the error handler and never stop the sequence.
pub fn call_hook(vm: &InstanceRef, hook: &str) {
    let handlers = vm.borrow().options.hooks(hook);
    let info = format!("{} hook", hook);
    for handler in handlers {
        let mut instance = vm.borrow_mut();
        if let Err(err) = handler(&mut instance) {
            handle_error(&err, Some(&*instance), &info);
        }
    }
    let has_hook_event = vm.borrow().has_hook_event;
    if has_hook_event {
        events::emit(vm, &format!("hook:{}", hook), &[]);
    }
}

/// Base mount: record the element, render once and fire the mount hooks.
///
/// Instances created for a placeholder vnode are left unmounted; the renderer
/// marks them with [`mark_inserted`] once their element is in the tree.
pub fn mount_component(vm: &InstanceRef, el: Option<Element>, hydrating: bool) {
    {
        let mut instance = vm.borrow_mut();
        instance.el = el;
        if instance.options.render().is_none() && config::is_dev() {
            let template = instance.options.string("template");
            let has_template = template.as_deref().is_some_and(|t| !t.starts_with('#'));
            if has_template || instance.options.has("el") || instance.el.is_some() {
                warn(
                    "You are using the runtime-only build where the template compiler is not \
                     available. Either pre-compile the templates into render functions, or use \
                     the compiler-included build.",
                    Some(&*instance),
                );
            } else {
                warn(
                    "Failed to mount component: template or render function not defined.",
                    Some(&*instance),
                );
            }
        }
    }

    call_hook(vm, "beforeMount");

    let vnode = vm.borrow().render();
    tracing::trace!(uid = vm.borrow().uid, hydrating, "rendered");
    vm.borrow_mut().vnode = Some(vnode);

    let is_placeholder_child = vm.borrow().parent_vnode.is_some();
    if !is_placeholder_child {
        mark_inserted(vm);
    }
}

pub fn mark_inserted(vm: &InstanceRef) {
    {
        let mut instance = vm.borrow_mut();
        if instance.lifecycle.is_mounted {
            return;
        }
        instance.lifecycle.is_mounted = true;
    }
    call_hook(vm, "mounted");
}
