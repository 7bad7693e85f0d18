//! Minimal HTML tree for analyzer reports.
//!
//! Reports are machine-generated and well nested, so a tokenizer plus an
//! open-element stack is enough: unmatched closing tags are ignored and
//! anything left open is closed at end of input. Text keeps the order it had
//! in the document, which is what event extraction relies on.

use std::sync::LazyLock;

use regex_lite::{Captures, Regex};

/// Comment | doctype/processing instruction | tag | stray `<` | text
const TOKEN_PATTERN: &str = r#"(?s)<!--(.*?)-->|<![^>]*>|<\?[^>]*>|<(/?)([A-Za-z][A-Za-z0-9:-]*)((?:[^>"']|"[^"]*"|'[^']*')*)>|<|[^<]+"#;
const ATTR_PATTERN: &str =
    r#"([A-Za-z_:][-A-Za-z0-9_:.]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#;
const ENTITY_PATTERN: &str = r"&(#[0-9]+|#[xX][0-9A-Fa-f]+|[A-Za-z]+);";

#[allow(clippy::expect_used)]
static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(TOKEN_PATTERN).expect("valid token regex"));
#[allow(clippy::expect_used)]
static ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(ATTR_PATTERN).expect("valid attribute regex"));
#[allow(clippy::expect_used)]
static ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(ENTITY_PATTERN).expect("valid entity regex"));

const VOID_ELEMENTS: [&str; 13] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "wbr",
];
const RAW_TEXT_ELEMENTS: [&str; 2] = ["script", "style"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Node {
    Element(Element),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Element {
    pub tag: String,
    attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    fn new(tag: &str, attrs: Vec<(String, String)>) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs,
            children: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn class(&self) -> &str {
        self.attr("class").unwrap_or_default()
    }

    /// Element children, skipping text and comments.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|child| match child {
            Node::Element(element) => Some(element),
            _ => None,
        })
    }

    /// Text before the first child element or comment.
    pub fn leading_text(&self) -> String {
        self.children
            .iter()
            .map_while(|child| match child {
                Node::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Every descendant element in document order.
    pub fn descendants(&self) -> Vec<&Element> {
        let mut out = Vec::new();
        let mut stack: Vec<&Element> = self.elements().collect::<Vec<_>>();
        stack.reverse();
        while let Some(element) = stack.pop() {
            out.push(element);
            let before = stack.len();
            stack.extend(element.elements());
            stack[before..].reverse();
        }
        out
    }
}

/// Parse `html` into a tree rooted at a synthetic `#document` element.
pub(crate) fn parse_document(html: &str) -> Element {
    let lower = html.to_ascii_lowercase();
    let mut stack = vec![Element::new("#document", Vec::new())];
    let mut pos = 0;

    while pos < html.len() {
        let Some(caps) = TOKEN_RE.captures_at(html, pos) else {
            break;
        };
        let Some(token) = caps.get(0) else {
            break;
        };
        pos = token.end();

        if let Some(comment) = caps.get(1) {
            push_node(&mut stack, Node::Comment(comment.as_str().to_string()));
        } else if let Some(name) = caps.get(3) {
            let closing = caps.get(2).is_some_and(|slash| !slash.as_str().is_empty());
            let raw_attrs = caps.get(4).map_or("", |m| m.as_str());
            let tag = name.as_str().to_ascii_lowercase();

            if closing {
                close_element(&mut stack, &tag);
                continue;
            }

            let element = Element::new(&tag, parse_attrs(raw_attrs));
            if VOID_ELEMENTS.contains(&tag.as_str()) || raw_attrs.trim_end().ends_with('/') {
                push_node(&mut stack, Node::Element(element));
            } else if RAW_TEXT_ELEMENTS.contains(&tag.as_str()) {
                // Script and style bodies are not markup.
                let end_tag = format!("</{tag}");
                let end = lower[pos..].find(&end_tag).map_or(html.len(), |i| pos + i);
                let mut element = element;
                if end > pos {
                    element.children.push(Node::Text(html[pos..end].to_string()));
                }
                push_node(&mut stack, Node::Element(element));
                pos = lower[end..].find('>').map_or(html.len(), |i| end + i + 1);
            } else {
                stack.push(element);
            }
        } else if !token.as_str().starts_with("<!") && !token.as_str().starts_with("<?") {
            push_node(&mut stack, Node::Text(decode_entities(token.as_str())));
        }
    }

    close_to_depth(&mut stack, 1);
    stack.pop().unwrap_or_else(|| Element::new("#document", Vec::new()))
}

fn push_node(stack: &mut [Element], node: Node) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    }
}

fn close_element(stack: &mut Vec<Element>, tag: &str) {
    if let Some(depth) = stack.iter().skip(1).rposition(|open| open.tag == tag) {
        close_to_depth(stack, depth + 1);
    }
}

/// Pop open elements until `depth` remain, attaching each to its parent.
fn close_to_depth(stack: &mut Vec<Element>, depth: usize) {
    while stack.len() > depth.max(1) {
        if let Some(element) = stack.pop() {
            push_node(stack, Node::Element(element));
        }
    }
}

fn parse_attrs(raw: &str) -> Vec<(String, String)> {
    ATTR_RE
        .captures_iter(raw)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str().to_ascii_lowercase();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map_or(String::new(), |value| decode_entities(value.as_str()));
            Some((name, value))
        })
        .collect()
}

pub(crate) fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    ENTITY_RE
        .replace_all(text, |caps: &Captures| {
            let name = caps.get(1).map_or("", |m| m.as_str());
            decode_entity(name).map_or_else(
                || caps.get(0).map_or("", |m| m.as_str()).to_string(),
                String::from,
            )
        })
        .into_owned()
}

fn decode_entity(name: &str) -> Option<char> {
    if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
        return u32::from_str_radix(hex, 16).ok().and_then(char::from_u32);
    }
    if let Some(dec) = name.strip_prefix('#') {
        return dec.parse().ok().and_then(char::from_u32);
    }
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => None,
    }
}
