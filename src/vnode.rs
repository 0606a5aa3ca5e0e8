use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::constructor::Constructor;
use crate::options::Listeners;

/// Virtual node produced by a render routine. Diffing and patching are left
/// to the renderer; the runtime only creates, stores and hands these over.
#[derive(Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VNode {
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<VNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip)]
    pub component_options: Option<VNodeComponentOptions>,
    pub is_comment: bool,
}

/// Data carried by a component placeholder vnode into the child instance.
#[derive(Clone)]
pub struct VNodeComponentOptions {
    pub ctor: Rc<Constructor>,
    pub props_data: Option<Map<String, Value>>,
    pub listeners: Option<Rc<Listeners>>,
    pub children: Option<Rc<Vec<VNode>>>,
    pub tag: Option<String>,
}

impl VNode {
    pub fn element(tag: &str, children: Vec<VNode>) -> Self {
        Self {
            tag: Some(tag.to_string()),
            children,
            ..Default::default()
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn empty() -> Self {
        Self {
            text: Some(String::new()),
            is_comment: true,
            ..Default::default()
        }
    }

    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = Some(data);
        self
    }

    /// Placeholder vnode for a child component occurrence.
    pub fn component(tag: &str, options: VNodeComponentOptions) -> Self {
        Self {
            tag: Some(format!("zenith-component-{}", tag)),
            component_options: Some(options),
            ..Default::default()
        }
    }

    /// Slot name for a child passed into a component (`data.slot`).
    pub fn slot_name(&self) -> Option<&str> {
        self.data
            .as_ref()
            .and_then(|d| d.get("slot"))
            .and_then(Value::as_str)
    }
}

impl VNodeComponentOptions {
    pub fn new(ctor: Rc<Constructor>) -> Self {
        Self {
            ctor,
            props_data: None,
            listeners: None,
            children: None,
            tag: None,
        }
    }

    pub fn props_data(mut self, props: Map<String, Value>) -> Self {
        self.props_data = Some(props);
        self
    }

    pub fn listeners(mut self, listeners: Listeners) -> Self {
        self.listeners = Some(Rc::new(listeners));
        self
    }

    pub fn children(mut self, children: Vec<VNode>) -> Self {
        self.children = Some(Rc::new(children));
        self
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.tag = Some(tag.to_string());
        self
    }
}

impl fmt::Debug for VNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VNode")
            .field("tag", &self.tag)
            .field("text", &self.text)
            .field("children", &self.children)
            .field("is_component", &self.component_options.is_some())
            .finish()
    }
}

impl fmt::Debug for VNodeComponentOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VNodeComponentOptions")
            .field("cid", &self.ctor.cid())
            .field("props_data", &self.props_data)
            .field("tag", &self.tag)
            .finish()
    }
}

/// Group render children into named slots (`default` when no `slot` data).
pub fn resolve_slots(children: &[VNode]) -> HashMap<String, Vec<VNode>> {
    let mut slots: HashMap<String, Vec<VNode>> = HashMap::new();
    for child in children {
        let name = child.slot_name().unwrap_or("default").to_string();
        slots.entry(name).or_default().push(child.clone());
    }
    // Whitespace-only default slots are dropped.
    if let Some(default) = slots.get("default") {
        let all_blank = default.iter().all(|n| {
            n.is_comment || (n.tag.is_none() && n.text.as_deref().is_some_and(|t| t.trim().is_empty()))
        });
        if all_blank {
            slots.remove("default");
        }
    }
    slots
}
