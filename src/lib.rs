//! # Zenith Component Runtime
//!
//! Options resolution and instantiation for components, plus the
//! compile-and-mount pipeline that turns a template into a render routine
//! attached to a document element.
//!
//! ## Runtime Invariants
//!
//! 1. **Pure merging**: `merge_options(parent, child, vm)` never modifies either
//!    input. Registries are layered over a snapshot of the parent registry taken
//!    at merge time; later additions to the parent are not visible.
//!
//! 2. **Identity-cached resolution**: `resolve_constructor_options(ctor)`
//!    returns the identical `Rc<Options>` until an ancestor's options identity
//!    changes. On a change, options modified in place since `extend` are kept,
//!    the options are re-merged, and the constructor re-registers itself under
//!    its own name.
//!
//! 3. **Phase order**: `init` runs uid → markers → `$options` → render proxy →
//!    lifecycle → events → render → `beforeCreate` → injections → state →
//!    provide → `created` → optional mount. State is initialized exactly once.
//!
//! 4. **Internal fast path**: instances created for a placeholder vnode get
//!    `$options` that delegate to the constructor's options. The merger is not
//!    involved and the constructor's options are never written.
//!
//! 5. **Render is never overwritten**: a mount with `render` already present
//!    skips template derivation and compilation entirely.
//!
//! 6. **Usage errors are diagnostics**: invalid templates, root-element mount
//!    targets, unknown injections and the like are reported through
//!    `debug::warn` and never propagate. A refused mount returns the instance
//!    untouched.
//!
//! 7. **Monotonic uids**: every initialized instance gets a uid strictly
//!    greater than all previously issued uids in the process.

pub mod compiler;
pub mod config;
pub mod constructor;
pub mod debug;
pub mod definition;
pub mod dom;
pub mod error;
pub mod events;
pub mod init;
pub mod inject;
pub mod instance;
pub mod lifecycle;
pub mod merge;
pub mod mount;
pub mod options;
pub mod perf;
pub mod proxy;
pub mod render;
pub mod runtime;
pub mod state;
pub mod subsystems;
pub mod util;
pub mod vnode;

#[cfg(test)]
mod init_tests;

pub use compiler::{CachedCompiler, CompiledTemplate, CompilerOptions, TemplateCompiler};
pub use config::Config;
pub use constructor::{resolve_constructor_options, resolve_modified_options, Constructor};
pub use definition::ComponentDefinition;
pub use dom::{CompatFlags, Dom, Element, HtmlDocument};
pub use error::{CompileError, HookError, HookResult, RuntimeError};
pub use init::init_internal_component;
pub use instance::{Instance, InstanceRef};
pub use merge::{merge_options, register_strategy};
pub use mount::MountTarget;
pub use options::{Asset, AssetKind, OptionValue, Options, Registry};
pub use proxy::{RenderContext, RenderProxy};
pub use runtime::{InitOptions, InternalComponentOptions, Runtime};
pub use subsystems::{DefaultSubsystems, Subsystems};
pub use vnode::{VNode, VNodeComponentOptions};
