//! The runtime: base constructor, collaborators and per-runtime caches.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::compiler::{CompiledTemplate, CompilerOptions, TemplateCompiler};
use crate::constructor::{resolve_constructor_options, Constructor};
use crate::dom::Dom;
use crate::error::CompileError;
use crate::instance::{Instance, InstanceRef, WeakInstance};
use crate::options::{Options, RenderFn};
use crate::subsystems::{DefaultSubsystems, Subsystems};
use crate::vnode::VNode;

/// Options handed to `init`.
pub enum InitOptions {
    /// Author-supplied options, merged with the resolved constructor options.
    User(Options),
    /// Created by the render tree for a component placeholder vnode.
    Internal(InternalComponentOptions),
}

impl Default for InitOptions {
    fn default() -> Self {
        InitOptions::User(Options::new())
    }
}

impl From<Options> for InitOptions {
    fn from(options: Options) -> Self {
        InitOptions::User(options)
    }
}

impl From<InternalComponentOptions> for InitOptions {
    fn from(options: InternalComponentOptions) -> Self {
        InitOptions::Internal(options)
    }
}

pub struct InternalComponentOptions {
    pub parent: Option<WeakInstance>,
    pub parent_vnode: Rc<VNode>,
    /// Inline render routine; when set, overrides the constructor's.
    pub render: Option<RenderFn>,
    pub static_render_fns: Vec<RenderFn>,
}

impl InternalComponentOptions {
    pub fn new(parent_vnode: Rc<VNode>) -> Self {
        Self {
            parent: None,
            parent_vnode,
            render: None,
            static_render_fns: Vec::new(),
        }
    }

    pub fn parent(mut self, parent: &InstanceRef) -> Self {
        self.parent = Some(Rc::downgrade(parent));
        self
    }

    pub fn render(mut self, render: RenderFn, static_render_fns: Vec<RenderFn>) -> Self {
        self.render = Some(render);
        self.static_render_fns = static_render_fns;
        self
    }
}

pub struct Runtime {
    pub(crate) base: Rc<Constructor>,
    pub(crate) subsystems: Box<dyn Subsystems>,
    pub(crate) dom: Rc<dyn Dom>,
    pub(crate) compiler: Box<dyn TemplateCompiler>,
    /// `#id` template lookups, including misses.
    pub(crate) id_to_template: RefCell<HashMap<String, Option<String>>>,
}

impl Runtime {
    pub fn new(dom: Rc<dyn Dom>, compiler: impl TemplateCompiler + 'static) -> Self {
        Self {
            base: Constructor::root(Options::new()),
            subsystems: Box::new(DefaultSubsystems),
            dom,
            compiler: Box::new(compiler),
            id_to_template: RefCell::new(HashMap::new()),
        }
    }

    pub fn with_subsystems(mut self, subsystems: impl Subsystems + 'static) -> Self {
        self.subsystems = Box::new(subsystems);
        self
    }

    pub fn with_base(mut self, base: Rc<Constructor>) -> Self {
        self.base = base;
        self
    }

    pub fn base(&self) -> &Rc<Constructor> {
        &self.base
    }

    pub fn dom(&self) -> &Rc<dyn Dom> {
        &self.dom
    }

    /// Sub-constructor of the base constructor.
    pub fn extend(&self, options: Options) -> Rc<Constructor> {
        self.base.extend(options)
    }

    /// Construct and initialize an instance of `ctor`.
    pub fn create(&self, ctor: &Rc<Constructor>, options: impl Into<InitOptions>) -> InstanceRef {
        let vm = Instance::new_ref(ctor.clone());
        self.init(&vm, options.into());
        vm
    }

    /// Instance of the base constructor.
    pub fn new_root(&self, options: Options) -> InstanceRef {
        let base = self.base.clone();
        self.create(&base, options)
    }

    /// Instantiate the component behind a placeholder vnode through the
    /// internal fast path. `None` when `vnode` is not a component vnode.
    ///
    /// The constructor is resolved first, so options added to its ancestors
    /// since `extend` reach the instance's `$options` through delegation.
    pub fn create_component_instance_for_vnode(
        &self,
        vnode: Rc<VNode>,
        parent: Option<&InstanceRef>,
    ) -> Option<InstanceRef> {
        let ctor = vnode.component_options.as_ref()?.ctor.clone();
        resolve_constructor_options(&ctor);
        let mut options = InternalComponentOptions::new(vnode);
        if let Some(parent) = parent {
            options = options.parent(parent);
        }
        Some(self.create(&ctor, options))
    }

    /// Compile a template with the configured compiler.
    pub fn compile(&self, template: &str, options: &CompilerOptions) -> Result<CompiledTemplate, CompileError> {
        self.compiler.compile(template, options)
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("base", &self.base)
            .field("cached_templates", &self.id_to_template.borrow().len())
            .finish()
    }
}
