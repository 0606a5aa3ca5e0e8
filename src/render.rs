//! Render scaffolding: placeholder vnode and slots.

use crate::instance::InstanceRef;
use crate::vnode::resolve_slots;

pub fn init_render(vm: &InstanceRef) {
    let mut instance = vm.borrow_mut();
    let options = instance.options.clone();
    instance.vnode = None;
    instance.parent_vnode = options.parent_vnode();
    instance.slots = options
        .render_children()
        .map(|children| resolve_slots(&children))
        .unwrap_or_default();
}
