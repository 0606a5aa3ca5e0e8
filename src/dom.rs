//! DOM query and markup layer.
//!
//! The runtime only needs a handful of document capabilities: resolve a mount
//! target, recognise the document root elements, and read inner/outer markup.
//! [`Dom`] is that seam; [`HtmlDocument`] implements it on top of html5ever's
//! reference DOM.

use html5ever::parse_document;
use html5ever::serialize::{serialize, SerializeOpts, TraversalScope};
use html5ever::tendril::TendrilSink;
use html5ever::{LocalName, Namespace, QualName};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom, SerializableHandle};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::RuntimeError;

const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";
const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

// ═══════════════════════════════════════════════════════════════════════════════
// ELEMENT HANDLE
// ═══════════════════════════════════════════════════════════════════════════════

/// A live element in a document. Equality is node identity.
#[derive(Clone)]
pub struct Element(Handle);

impl Element {
    pub fn new(handle: Handle) -> Option<Self> {
        match handle.data {
            NodeData::Element { .. } => Some(Self(handle)),
            _ => None,
        }
    }

    pub fn handle(&self) -> &Handle {
        &self.0
    }

    pub fn same(&self, other: &Element) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn tag_name(&self) -> String {
        match &self.0.data {
            NodeData::Element { name, .. } => name.local.to_string(),
            _ => String::new(),
        }
    }

    pub fn is_svg(&self) -> bool {
        match &self.0.data {
            NodeData::Element { name, .. } => &*name.ns == SVG_NAMESPACE,
            _ => false,
        }
    }

    pub fn attr(&self, attr_name: &str) -> Option<String> {
        match &self.0.data {
            NodeData::Element { attrs, .. } => attrs
                .borrow()
                .iter()
                .find(|a| &*a.name.local == attr_name)
                .map(|a| a.value.to_string()),
            _ => None,
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|c| c.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.attr("id") {
            Some(id) => write!(f, "<{} id=\"{}\">", self.tag_name(), id),
            None => write!(f, "<{}>", self.tag_name()),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DOM SEAM
// ═══════════════════════════════════════════════════════════════════════════════

/// Environment quirks the template compiler needs to know about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompatFlags {
    /// Attribute values come back with newlines encoded as `&#10;`.
    pub should_decode_newlines: bool,
    /// Same, but only for `<a href>`.
    pub should_decode_newlines_for_href: bool,
}

pub trait Dom {
    /// Resolve a selector to an element.
    fn query(&self, selector: &str) -> Option<Element>;

    /// `true` for `<html>` and `<body>`, which may never be mount targets.
    fn is_document_root(&self, el: &Element) -> bool;

    fn inner_html(&self, el: &Element) -> String;

    /// `None` when the environment has no outer-markup accessor for `el`.
    fn outer_html(&self, el: &Element) -> Option<String>;

    /// Serialize a detached deep clone of `el` through a wrapper element.
    fn clone_outer_html(&self, el: &Element) -> String;

    fn compat_flags(&self) -> CompatFlags {
        CompatFlags::default()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HTML DOCUMENT
// ═══════════════════════════════════════════════════════════════════════════════

pub struct HtmlDocument {
    dom: RcDom,
    legacy_svg: bool,
}

impl HtmlDocument {
    pub fn parse(html: &str) -> Result<Self, RuntimeError> {
        let dom = parse_document(RcDom::default(), Default::default())
            .from_utf8()
            .read_from(&mut html.as_bytes())?;
        Ok(Self {
            dom,
            legacy_svg: false,
        })
    }

    /// Emulate environments whose SVG elements lack an outer-markup accessor.
    pub fn with_legacy_svg(mut self, legacy_svg: bool) -> Self {
        self.legacy_svg = legacy_svg;
        self
    }

    pub fn document_element(&self) -> Option<Element> {
        self.dom
            .document
            .children
            .borrow()
            .iter()
            .find_map(|child| Element::new(child.clone()))
    }

    pub fn body(&self) -> Option<Element> {
        let html = self.document_element()?;
        let children = html.handle().children.borrow();
        children
            .iter()
            .filter_map(|child| Element::new(child.clone()))
            .find(|el| el.tag_name() == "body")
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<Element> {
        self.find(|el| el.attr("id").as_deref() == Some(id))
    }

    fn find(&self, predicate: impl Fn(&Element) -> bool) -> Option<Element> {
        fn walk(handle: &Handle, predicate: &dyn Fn(&Element) -> bool) -> Option<Element> {
            if let Some(el) = Element::new(handle.clone()) {
                if predicate(&el) {
                    return Some(el);
                }
            }
            for child in handle.children.borrow().iter() {
                if let Some(found) = walk(child, predicate) {
                    return Some(found);
                }
            }
            None
        }
        walk(&self.dom.document, &predicate)
    }

    fn probe_newline_encoding(markup: &str) -> bool {
        let Ok(doc) = HtmlDocument::parse(&format!("<div id=\"probe\">{}</div>", markup)) else {
            return false;
        };
        doc.get_element_by_id("probe")
            .map(|div| doc.inner_html(&div).contains("&#10;"))
            .unwrap_or(false)
    }
}

impl Dom for HtmlDocument {
    fn query(&self, selector: &str) -> Option<Element> {
        let selector = selector.trim();
        if let Some(id) = selector.strip_prefix('#') {
            self.get_element_by_id(id)
        } else if let Some(class) = selector.strip_prefix('.') {
            self.find(|el| el.has_class(class))
        } else if !selector.is_empty() {
            let tag = selector.to_lowercase();
            self.find(|el| el.tag_name() == tag)
        } else {
            None
        }
    }

    fn is_document_root(&self, el: &Element) -> bool {
        self.document_element().is_some_and(|html| html.same(el))
            || self.body().is_some_and(|body| body.same(el))
    }

    fn inner_html(&self, el: &Element) -> String {
        serialize_handle(el.handle(), TraversalScope::ChildrenOnly(None))
    }

    fn outer_html(&self, el: &Element) -> Option<String> {
        if self.legacy_svg && el.is_svg() {
            return None;
        }
        Some(serialize_handle(el.handle(), TraversalScope::IncludeNode))
    }

    fn clone_outer_html(&self, el: &Element) -> String {
        let container = Node::new(NodeData::Element {
            name: QualName::new(None, Namespace::from(HTML_NAMESPACE), LocalName::from("div")),
            attrs: RefCell::new(Vec::new()),
            template_contents: RefCell::new(None),
            mathml_annotation_xml_integration_point: false,
        });
        append_child(&container, deep_clone(el.handle()));
        serialize_handle(&container, TraversalScope::ChildrenOnly(None))
    }

    fn compat_flags(&self) -> CompatFlags {
        CompatFlags {
            should_decode_newlines: Self::probe_newline_encoding("<div a=\"\n\"></div>"),
            should_decode_newlines_for_href: Self::probe_newline_encoding("<a href=\"\n\"></a>"),
        }
    }
}

fn serialize_handle(handle: &Handle, traversal_scope: TraversalScope) -> String {
    let mut out = Vec::new();
    let node: SerializableHandle = handle.clone().into();
    let opts = SerializeOpts {
        traversal_scope,
        ..Default::default()
    };
    if serialize(&mut out, &node, opts).is_err() {
        return String::new();
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn append_child(parent: &Handle, child: Handle) {
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().push(child);
}

fn deep_clone(handle: &Handle) -> Handle {
    let data = match &handle.data {
        NodeData::Document => NodeData::Document,
        NodeData::Doctype {
            name,
            public_id,
            system_id,
        } => NodeData::Doctype {
            name: name.clone(),
            public_id: public_id.clone(),
            system_id: system_id.clone(),
        },
        NodeData::Text { contents } => NodeData::Text {
            contents: RefCell::new(contents.borrow().clone()),
        },
        NodeData::Comment { contents } => NodeData::Comment {
            contents: contents.clone(),
        },
        NodeData::Element {
            name,
            attrs,
            template_contents,
            mathml_annotation_xml_integration_point,
        } => NodeData::Element {
            name: name.clone(),
            attrs: RefCell::new(attrs.borrow().clone()),
            template_contents: RefCell::new(template_contents.borrow().as_ref().map(deep_clone)),
            mathml_annotation_xml_integration_point: *mathml_annotation_xml_integration_point,
        },
        NodeData::ProcessingInstruction { target, contents } => {
            NodeData::ProcessingInstruction {
                target: target.clone(),
                contents: contents.clone(),
            }
        }
    };
    let copy = Node::new(data);
    for child in handle.children.borrow().iter() {
        append_child(&copy, deep_clone(child));
    }
    copy
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html><html><head></head><body>
<div id="app" class="shell main"><span>{{msg}}</span></div>
<svg id="icon"><circle r="4"></circle></svg>
</body></html>"#;

    #[test]
    fn test_query_by_id_class_and_tag() {
        let doc = HtmlDocument::parse(PAGE).unwrap();
        assert_eq!(doc.query("#app").unwrap().tag_name(), "div");
        assert_eq!(doc.query(".main").unwrap().attr("id").as_deref(), Some("app"));
        assert_eq!(doc.query("span").unwrap().tag_name(), "span");
        assert!(doc.query("#missing").is_none());
        assert!(doc.query("").is_none());
    }

    #[test]
    fn test_document_roots() {
        let doc = HtmlDocument::parse(PAGE).unwrap();
        let body = doc.query("body").unwrap();
        let html = doc.query("html").unwrap();
        assert!(doc.is_document_root(&body));
        assert!(doc.is_document_root(&html));
        assert!(!doc.is_document_root(&doc.query("#app").unwrap()));
    }

    #[test]
    fn test_inner_and_outer_html() {
        let doc = HtmlDocument::parse(PAGE).unwrap();
        let app = doc.query("#app").unwrap();
        assert_eq!(doc.inner_html(&app), "<span>{{msg}}</span>");
        assert_eq!(
            doc.outer_html(&app).unwrap(),
            r#"<div id="app" class="shell main"><span>{{msg}}</span></div>"#
        );
    }

    #[test]
    fn test_legacy_svg_falls_back_to_clone() {
        let doc = HtmlDocument::parse(PAGE).unwrap().with_legacy_svg(true);
        let icon = doc.query("#icon").unwrap();
        assert!(icon.is_svg());
        assert!(doc.outer_html(&icon).is_none());
        let cloned = doc.clone_outer_html(&icon);
        assert!(cloned.starts_with("<svg id=\"icon\">"));
        assert!(cloned.contains("<circle r=\"4\"></circle>"));
        // The original tree is untouched by the clone.
        assert_eq!(doc.inner_html(&icon), "<circle r=\"4\"></circle>");
    }

    #[test]
    fn test_compat_flags_for_html5ever() {
        let doc = HtmlDocument::parse(PAGE).unwrap();
        assert_eq!(doc.compat_flags(), CompatFlags::default());
    }
}
