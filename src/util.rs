//! Small string helpers shared by option normalization, asset lookup and
//! component naming.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

lazy_static! {
    static ref CAMELIZE_RE: Regex = Regex::new(r"-(\w)").unwrap();
    static ref HYPHENATE_RE: Regex = Regex::new(r"\B([A-Z])").unwrap();
    static ref CLASSIFY_RE: Regex = Regex::new(r"(?:^|[-_])(\w)").unwrap();

    /// Component names must start with a letter and may contain the characters
    /// allowed in custom element names.
    static ref COMPONENT_NAME_RE: Regex =
        Regex::new(r"^[a-zA-Z][\-\.0-9_a-zA-Z\u{00B7}\u{00C0}-\u{00D6}\u{00D8}-\u{00F6}\u{00F8}-\u{037D}\u{037F}-\u{1FFF}\u{200C}-\u{200D}\u{203F}-\u{2040}\u{2070}-\u{218F}\u{2C00}-\u{2FEF}\u{3001}-\u{D7FF}\u{F900}-\u{FDCF}\u{FDF0}-\u{FFFD}\u{10000}-\u{EFFFF}]*$").unwrap();

    static ref BUILT_IN_TAGS: HashSet<&'static str> = {
        let mut s = HashSet::new();
        s.insert("slot");
        s.insert("component");
        s
    };

    /// Plain HTML and SVG tag names that may not be used as component ids.
    static ref RESERVED_TAGS: HashSet<&'static str> = {
        [
            "html", "body", "base", "head", "link", "meta", "style", "title", "address",
            "article", "aside", "footer", "header", "h1", "h2", "h3", "h4", "h5", "h6",
            "hgroup", "nav", "section", "div", "dd", "dl", "dt", "figcaption", "figure",
            "picture", "hr", "img", "li", "main", "ol", "p", "pre", "ul", "a", "b", "abbr",
            "bdi", "bdo", "br", "cite", "code", "data", "dfn", "em", "i", "kbd", "mark", "q",
            "rp", "rt", "rtc", "ruby", "s", "samp", "small", "span", "strong", "sub", "sup",
            "time", "u", "var", "wbr", "area", "audio", "map", "track", "video", "embed",
            "object", "param", "source", "canvas", "script", "noscript", "del", "ins",
            "caption", "col", "colgroup", "table", "thead", "tbody", "td", "th", "tr",
            "button", "datalist", "fieldset", "form", "input", "label", "legend", "meter",
            "optgroup", "option", "output", "progress", "select", "textarea", "details",
            "dialog", "menu", "menuitem", "summary", "content", "element", "shadow",
            "template", "blockquote", "iframe", "tfoot", "svg", "animate", "circle",
            "clippath", "cursor", "defs", "desc", "ellipse", "filter", "font-face",
            "foreignObject", "g", "glyph", "image", "line", "marker", "mask", "missing-glyph",
            "path", "pattern", "polygon", "polyline", "rect", "switch", "symbol", "text",
            "textpath", "tspan", "use", "view",
        ]
        .into_iter()
        .collect()
    };
}

/// `my-component` → `myComponent`
pub fn camelize(s: &str) -> String {
    CAMELIZE_RE
        .replace_all(s, |caps: &regex::Captures| caps[1].to_uppercase())
        .to_string()
}

/// `myComponent` → `MyComponent`
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `myComponent` → `my-component`
pub fn hyphenate(s: &str) -> String {
    HYPHENATE_RE.replace_all(s, "-$1").to_lowercase()
}

/// `my-component` / `my_component` → `MyComponent`
pub fn classify(s: &str) -> String {
    CLASSIFY_RE
        .replace_all(s, |caps: &regex::Captures| caps[1].to_uppercase())
        .to_string()
}

pub fn is_valid_component_name(name: &str) -> bool {
    COMPONENT_NAME_RE.is_match(name)
}

pub fn is_builtin_or_reserved_tag(name: &str) -> bool {
    let lower = name.to_lowercase();
    BUILT_IN_TAGS.contains(lower.as_str()) || RESERVED_TAGS.contains(lower.as_str())
}

/// Keys starting with `$` or `_` are reserved for the runtime and are not
/// proxied onto the instance.
pub fn is_reserved_key(key: &str) -> bool {
    key.starts_with('$') || key.starts_with('_')
}
