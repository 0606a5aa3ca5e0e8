//! Diagnostic channel.
//!
//! `warn` never throws and never changes control flow. Outside production it
//! forwards to a custom handler if one is installed for the current thread,
//! and otherwise logs through `tracing`.

use std::cell::RefCell;
use std::rc::Rc;

use crate::config;
use crate::error::HookError;
use crate::instance::{Instance, InstanceRef};
use crate::util::classify;

pub type WarnHandler = Rc<dyn Fn(&str, Option<&Instance>, &str)>;
pub type ErrorHandler = Rc<dyn Fn(&HookError, Option<&Instance>, &str)>;

thread_local! {
    static WARN_HANDLER: RefCell<Option<WarnHandler>> = const { RefCell::new(None) };
    static ERROR_HANDLER: RefCell<Option<ErrorHandler>> = const { RefCell::new(None) };
}

/// Install (or clear) the warning handler. Receives the message, the
/// instance context and the formatted component trace.
pub fn set_warn_handler(handler: Option<WarnHandler>) -> Option<WarnHandler> {
    WARN_HANDLER.with(|h| std::mem::replace(&mut *h.borrow_mut(), handler))
}

/// Install (or clear) the handler for errors returned by lifecycle hooks.
pub fn set_error_handler(handler: Option<ErrorHandler>) -> Option<ErrorHandler> {
    ERROR_HANDLER.with(|h| std::mem::replace(&mut *h.borrow_mut(), handler))
}

pub fn warn(msg: &str, vm: Option<&Instance>) {
    let config = config::get();
    if config.production || config.silent {
        return;
    }
    let trace = vm.map(generate_component_trace).unwrap_or_default();
    let handler = WARN_HANDLER.with(|h| h.borrow().clone());
    match handler {
        Some(handler) => handler(msg, vm, &trace),
        None => tracing::warn!("[Zenith warn]: {}{}", msg, trace),
    }
}

/// Route a hook failure to the configured error handler, or log it.
pub fn handle_error(err: &HookError, vm: Option<&Instance>, info: &str) {
    let handler = ERROR_HANDLER.with(|h| h.borrow().clone());
    if let Some(handler) = handler {
        handler(err, vm, info);
        return;
    }
    warn(&format!("Error in {}: \"{}\"", info, err), vm);
    tracing::error!(info = %info, "{}", err);
}

/// Run `f` and collect every warning it emits on this thread.
pub fn capture_warnings<R>(f: impl FnOnce() -> R) -> (R, Vec<String>) {
    let captured = Rc::new(RefCell::new(Vec::new()));
    let sink = captured.clone();
    let previous = set_warn_handler(Some(Rc::new(move |msg: &str, _vm: Option<&Instance>, _trace: &str| {
        sink.borrow_mut().push(msg.to_string());
    })));
    let result = f();
    set_warn_handler(previous);
    let warnings = captured.borrow().clone();
    (result, warnings)
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPONENT NAMES AND TRACES
// ═══════════════════════════════════════════════════════════════════════════════

fn is_root(vm: &Instance) -> bool {
    !vm.is_component && vm.lifecycle.parent.is_none()
}

/// `<TodoItem>`, `<Root>` or `<Anonymous>`; with `include_file`, appends the
/// `__file` option when present.
pub fn format_component_name(vm: Option<&Instance>, include_file: bool) -> String {
    let Some(vm) = vm else {
        return "<Anonymous>".to_string();
    };
    if is_root(vm) {
        return "<Root>".to_string();
    }
    let options = &vm.options;
    let name = options.name().or_else(|| options.component_tag());
    let mut formatted = match name {
        Some(name) => format!("<{}>", classify(&name)),
        None => "<Anonymous>".to_string(),
    };
    if include_file {
        if let Some(file) = options.string("__file") {
            formatted.push_str(&format!(" at {}", file));
        }
    }
    formatted
}

/// `found in` trace from `vm` up to the root, collapsing direct recursion.
pub fn generate_component_trace(vm: &Instance) -> String {
    if vm.is_component || vm.lifecycle.parent.is_some() {
        let mut names: Vec<(String, usize)> = Vec::new();
        let mut last_ctor = Some(vm.constructor.cid());
        names.push((format_component_name(Some(vm), true), 0));

        let mut current: Option<InstanceRef> = vm.parent();
        while let Some(node) = current {
            let Ok(parent) = node.try_borrow() else {
                break;
            };
            let cid = parent.constructor.cid();
            if last_ctor == Some(cid) && !is_root(&parent) {
                if let Some(last) = names.last_mut() {
                    last.1 += 1;
                }
            } else {
                names.push((format_component_name(Some(&parent), true), 0));
            }
            last_ctor = Some(cid);
            current = parent.parent();
        }

        let lines: Vec<String> = names
            .iter()
            .enumerate()
            .map(|(i, (name, recursive))| {
                let prefix = if i == 0 {
                    "---> ".to_string()
                } else {
                    " ".repeat(5 + i * 2)
                };
                if *recursive > 0 {
                    format!("{}{}... ({} recursive calls)", prefix, name, recursive)
                } else {
                    format!("{}{}", prefix, name)
                }
            })
            .collect();
        format!("\n\nfound in\n\n{}", lines.join("\n"))
    } else {
        format!("\n\n(found in {})", format_component_name(Some(vm), true))
    }
}
