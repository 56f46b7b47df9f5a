//! AST node definitions for parsed LaTeX
//!
//! The token tree produced by the lexer and consumed by the argument
//! machinery. Unlike character-based processing, nodes preserve semantic
//! meaning: brace groups nest, macros carry a structured argument list once
//! one has been attached, and verbatim material stays an opaque leaf.
//!
//! All nodes serialize to JSON with a `type` discriminator so a tree can be
//! handed to non-Rust consumers.

mod print;

pub use print::{print_raw, print_raw_all};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A point in the original source, tracked as both a byte offset and a
/// 1-based line/column pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

/// The source range a node was produced from.
///
/// Positions are advisory. The argument machinery passes them through
/// unchanged; nodes created by re-tokenization (string splitting) carry no
/// position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub start: SourceLocation,
    pub end: SourceLocation,
}

/// A node of the LaTeX token tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Node {
    /// Top-level container for a whole document or fragment
    Root(Root),
    /// A run of ordinary characters
    String(StringNode),
    /// A run of blank space containing at most one newline
    Whitespace(Whitespace),
    /// A blank line separating paragraphs
    Parbreak(Parbreak),
    /// A `%` comment
    Comment(Comment),
    /// A `{...}` brace group
    Group(Group),
    /// A control sequence, possibly with attached arguments
    Macro(Macro),
    /// A `\begin{name}...\end{name}` block
    Environment(Environment),
    /// An environment whose body is raw, untokenized text
    #[serde(rename = "verbatim")]
    VerbatimEnvironment(VerbatimEnvironment),
    /// An inline `\verb` island
    Verb(Verb),
    /// `$...$` or `\(...\)` math
    #[serde(rename = "inlinemath")]
    InlineMath(InlineMath),
    /// `$$...$$` or `\[...\]` math
    #[serde(rename = "displaymath")]
    DisplayMath(DisplayMath),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Root {
    pub content: Vec<Node>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StringNode {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Whitespace {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Parbreak {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// Comment text without the leading `%` or the trailing newline
    pub content: String,
    /// True when the comment shares a line with preceding material
    pub sameline: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Group {
    pub content: Vec<Node>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Macro {
    /// The control sequence name without its escape token
    pub name: String,
    /// The token that introduced the macro. `None` means the usual `\`.
    /// Characters that act as macros without an escape (TeX's `^` and `_`)
    /// carry `Some("")`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escape_token: Option<String>,
    /// Attached arguments. `None` until argument attachment has run for
    /// this macro; `Some` afterwards, even if the list is empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<Argument>>,
    /// Advisory metadata for downstream renderers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub render_info: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    pub name: String,
    /// Arguments gobbled from the front of the body, if the environment
    /// has been processed against a signature table
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<Argument>>,
    pub content: Vec<Node>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub render_info: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerbatimEnvironment {
    pub name: String,
    /// Raw body text, never tokenized
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verb {
    /// The macro that opened the island (`verb` or `verb*`)
    pub name: String,
    /// The delimiter character
    pub escape: String,
    /// Raw text between the delimiters
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InlineMath {
    pub content: Vec<Node>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DisplayMath {
    pub content: Vec<Node>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

/// One attached macro/environment argument.
///
/// `open_mark`/`close_mark` record the delimiters the argument was written
/// with (`{`/`}`, `[`/`]`, custom marks, or an embellishment token with an
/// empty close mark). An argument with empty marks and no content is the
/// blank-argument sentinel for an omitted slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Argument {
    pub content: Vec<Node>,
    pub open_mark: String,
    pub close_mark: String,
    /// Declared default for an omitted slot, carried as advisory metadata.
    /// Defaults are never materialized into `content`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_arg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

impl Argument {
    /// Create an argument with the given content and delimiters
    pub fn new(
        content: Vec<Node>,
        open_mark: impl Into<String>,
        close_mark: impl Into<String>,
    ) -> Self {
        Argument {
            content,
            open_mark: open_mark.into(),
            close_mark: close_mark.into(),
            default_arg: None,
            position: None,
        }
    }

    /// The sentinel for an omitted optional slot
    pub fn blank() -> Self {
        Argument::new(Vec::new(), "", "")
    }

    /// A blank argument carrying a declared default as metadata
    pub fn blank_with_default(default_arg: Option<String>) -> Self {
        Argument {
            default_arg,
            ..Argument::blank()
        }
    }

    /// True if this argument is the omitted-slot sentinel
    pub fn is_blank(&self) -> bool {
        self.content.is_empty() && self.open_mark.is_empty() && self.close_mark.is_empty()
    }
}

impl Root {
    pub fn new(content: Vec<Node>) -> Self {
        Root {
            content,
            position: None,
        }
    }
}

impl Macro {
    /// Create a macro node with the usual `\` escape and no arguments
    pub fn new(name: impl Into<String>) -> Self {
        Macro {
            name: name.into(),
            escape_token: None,
            args: None,
            render_info: None,
            position: None,
        }
    }

    /// Create a macro node with an explicit escape token (`""` for TeX's
    /// `^`/`_` pseudo-macros)
    pub fn with_escape_token(name: impl Into<String>, escape_token: impl Into<String>) -> Self {
        Macro {
            escape_token: Some(escape_token.into()),
            ..Macro::new(name)
        }
    }

    /// The escape token, with the `\` default applied
    pub fn effective_escape_token(&self) -> &str {
        self.escape_token.as_deref().unwrap_or("\\")
    }
}

impl Environment {
    pub fn new(name: impl Into<String>, content: Vec<Node>) -> Self {
        Environment {
            name: name.into(),
            args: None,
            content,
            render_info: None,
            position: None,
        }
    }
}

impl Node {
    /// A string node
    pub fn string(content: impl Into<String>) -> Self {
        Node::String(StringNode {
            content: content.into(),
            position: None,
        })
    }

    /// A whitespace node
    pub fn whitespace() -> Self {
        Node::Whitespace(Whitespace::default())
    }

    /// A parbreak node
    pub fn parbreak() -> Self {
        Node::Parbreak(Parbreak::default())
    }

    /// A comment node
    pub fn comment(content: impl Into<String>, sameline: bool) -> Self {
        Node::Comment(Comment {
            content: content.into(),
            sameline,
            position: None,
        })
    }

    /// A brace group
    pub fn group(content: Vec<Node>) -> Self {
        Node::Group(Group {
            content,
            position: None,
        })
    }

    /// True for whitespace nodes
    pub fn is_whitespace(&self) -> bool {
        matches!(self, Node::Whitespace(_))
    }

    /// True for comment nodes
    pub fn is_comment(&self) -> bool {
        matches!(self, Node::Comment(_))
    }

    /// True for parbreak nodes
    pub fn is_parbreak(&self) -> bool {
        matches!(self, Node::Parbreak(_))
    }

    /// True for brace groups
    pub fn is_group(&self) -> bool {
        matches!(self, Node::Group(_))
    }

    /// True for string nodes
    pub fn is_string(&self) -> bool {
        matches!(self, Node::String(_))
    }

    /// The text of a string node
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Node::String(s) => Some(&s.content),
            _ => None,
        }
    }

    /// Borrow a macro node
    pub fn as_macro(&self) -> Option<&Macro> {
        match self {
            Node::Macro(m) => Some(m),
            _ => None,
        }
    }

    /// Mutably borrow a macro node
    pub fn as_macro_mut(&mut self) -> Option<&mut Macro> {
        match self {
            Node::Macro(m) => Some(m),
            _ => None,
        }
    }

    /// Borrow an environment node
    pub fn as_environment(&self) -> Option<&Environment> {
        match self {
            Node::Environment(e) => Some(e),
            _ => None,
        }
    }
}

impl From<Macro> for Node {
    fn from(m: Macro) -> Self {
        Node::Macro(m)
    }
}

impl From<Environment> for Node {
    fn from(e: Environment) -> Self {
        Node::Environment(e)
    }
}

impl From<Root> for Node {
    fn from(r: Root) -> Self {
        Node::Root(r)
    }
}

/// Environments whose body is math material
pub fn is_math_environment(name: &str) -> bool {
    matches!(
        name,
        "math"
            | "displaymath"
            | "equation"
            | "equation*"
            | "align"
            | "align*"
            | "gather"
            | "gather*"
            | "multline"
            | "multline*"
            | "eqnarray"
            | "eqnarray*"
    )
}

/// Remove position metadata from a node and everything below it.
///
/// Useful when comparing trees that went through re-tokenization or came
/// from different sources, since split nodes carry no position.
pub fn strip_positions(node: &mut Node) {
    match node {
        Node::Root(n) => {
            n.position = None;
            strip_positions_all(&mut n.content);
        }
        Node::String(n) => n.position = None,
        Node::Whitespace(n) => n.position = None,
        Node::Parbreak(n) => n.position = None,
        Node::Comment(n) => n.position = None,
        Node::Group(n) => {
            n.position = None;
            strip_positions_all(&mut n.content);
        }
        Node::Macro(n) => {
            n.position = None;
            if let Some(args) = &mut n.args {
                for arg in args {
                    strip_argument_positions(arg);
                }
            }
        }
        Node::Environment(n) => {
            n.position = None;
            if let Some(args) = &mut n.args {
                for arg in args {
                    strip_argument_positions(arg);
                }
            }
            strip_positions_all(&mut n.content);
        }
        Node::VerbatimEnvironment(n) => n.position = None,
        Node::Verb(n) => n.position = None,
        Node::InlineMath(n) => {
            n.position = None;
            strip_positions_all(&mut n.content);
        }
        Node::DisplayMath(n) => {
            n.position = None;
            strip_positions_all(&mut n.content);
        }
    }
}

/// [`strip_positions`] over a slice of siblings
pub fn strip_positions_all(nodes: &mut [Node]) {
    for node in nodes {
        strip_positions(node);
    }
}

fn strip_argument_positions(arg: &mut Argument) {
    arg.position = None;
    strip_positions_all(&mut arg.content);
}

/// Merge advisory render info into a node's bag.
///
/// Object keys from `incoming` overwrite keys already present; non-object
/// values replace the bag wholesale.
pub fn merge_render_info(slot: &mut Option<Value>, incoming: &Value) {
    match (slot.as_mut(), incoming) {
        (Some(Value::Object(existing)), Value::Object(map)) => {
            for (k, v) in map {
                existing.insert(k.clone(), v.clone());
            }
        }
        _ => *slot = Some(incoming.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_blank_argument_sentinel() {
        assert!(Argument::blank().is_blank());
        assert!(!Argument::new(vec![Node::string("x")], "", "").is_blank());
        assert!(!Argument::new(vec![], "[", "]").is_blank());
    }

    #[test]
    fn test_blank_with_default_is_still_blank() {
        let arg = Argument::blank_with_default(Some("x".to_string()));
        assert!(arg.is_blank());
        assert_eq!(arg.default_arg.as_deref(), Some("x"));
        assert!(arg.content.is_empty());
    }

    #[test]
    fn test_effective_escape_token() {
        assert_eq!(Macro::new("frac").effective_escape_token(), "\\");
        assert_eq!(Macro::with_escape_token("^", "").effective_escape_token(), "");
    }

    #[test]
    fn test_merge_render_info_objects() {
        let mut slot = Some(json!({"inParMode": true}));
        merge_render_info(&mut slot, &json!({"breakAround": true}));
        assert_eq!(
            slot,
            Some(json!({"inParMode": true, "breakAround": true}))
        );
    }

    #[test]
    fn test_merge_render_info_empty_slot() {
        let mut slot = None;
        merge_render_info(&mut slot, &json!({"alignContent": true}));
        assert_eq!(slot, Some(json!({"alignContent": true})));
    }

    #[test]
    fn test_json_shape_has_type_tag() {
        let node = Node::string("hello");
        let v = serde_json::to_value(&node).unwrap();
        assert_eq!(v["type"], "string");
        assert_eq!(v["content"], "hello");

        let node: Node = Macro::new("frac").into();
        let v = serde_json::to_value(&node).unwrap();
        assert_eq!(v["type"], "macro");
        assert_eq!(v["name"], "frac");
        // Unset optional fields stay out of the JSON
        assert!(v.get("args").is_none());
    }

    #[test]
    fn test_json_roundtrip() {
        let node = Node::group(vec![
            Node::string("a"),
            Node::whitespace(),
            Macro::new("it").into(),
        ]);
        let text = serde_json::to_string(&node).unwrap();
        let back: Node = serde_json::from_str(&text).unwrap();
        assert_eq!(node, back);
    }
}
