//! Texast - LaTeX to AST toolkit
//!
//! Parses LaTeX source into a token tree and attaches macro/environment
//! arguments according to xparse-style signatures. The heart of the crate
//! is the argument-attachment engine: given a flat token stream and a
//! signature table, it finds macro invocations, parses their declared
//! signatures, and gobbles the right tokens into structured argument
//! lists.
//!
//! ```
//! let result = texast::parse(r"\frac{1}{2} rest");
//! assert!(result.warnings.is_empty());
//!
//! let json = texast::to_json(&result.ast).unwrap();
//! assert!(json.contains("\"type\":\"macro\""));
//! ```
//!
//! The pieces compose individually: [`lexer::lex`] tokenizes,
//! [`argspec::parse`] handles signature strings,
//! [`gobble::gobble_arguments`] consumes arguments at a position, and
//! [`attach::ArgumentAttacher`] drives whole-tree attachment with custom
//! tables.

pub mod argspec;
pub mod ast;
pub mod attach;
pub mod error;
pub mod gobble;
pub mod lexer;
pub mod tables;
pub mod visit;

pub use ast::{print_raw, print_raw_all, Argument, Node};
pub use attach::{attach_macro_args, attach_macro_args_in_array, ArgumentAttacher};
pub use error::{Diagnostics, Error, Result, Warning, WarningKind};
pub use gobble::{
    gobble_arguments, gobble_single_argument, ArgumentParser, GobbledArguments, Signature,
};
pub use tables::{
    EnvInfo, EnvInfoRecord, MacroInfo, MacroInfoRecord, BUILTIN_ENVIRONMENTS, BUILTIN_MACROS,
};

use ast::Root;

/// A parsed document plus everything worth reporting about the parse
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// The document tree, rooted at a [`ast::Root`] node
    pub ast: Node,
    /// Warnings collected while attaching arguments
    pub warnings: Vec<Warning>,
}

/// Parse LaTeX source using the built-in signature tables
pub fn parse(source: &str) -> ParseResult {
    parse_with_tables(source, &BUILTIN_MACROS, &BUILTIN_ENVIRONMENTS)
}

/// Parse a fragment that is already inside math mode (`^` and `_` become
/// argument-taking macros), using the built-in tables
pub fn parse_math(source: &str) -> ParseResult {
    let nodes = lexer::lex_math(source);
    attach_to_root(nodes, &BUILTIN_MACROS, &BUILTIN_ENVIRONMENTS)
}

/// Parse LaTeX source against caller-supplied signature tables
pub fn parse_with_tables(
    source: &str,
    macros: &MacroInfoRecord,
    environments: &EnvInfoRecord,
) -> ParseResult {
    let nodes = lexer::lex(source);
    attach_to_root(nodes, macros, environments)
}

fn attach_to_root(
    nodes: Vec<Node>,
    macros: &MacroInfoRecord,
    environments: &EnvInfoRecord,
) -> ParseResult {
    let mut ast: Node = Root::new(nodes).into();
    let mut attacher = ArgumentAttacher::new(macros).with_environments(environments);
    attacher.attach(&mut ast);
    ParseResult {
        ast,
        warnings: attacher.take_warnings(),
    }
}

/// Serialize a node tree to JSON
pub fn to_json(node: &Node) -> serde_json::Result<String> {
    serde_json::to_string(node)
}

/// Deserialize a node tree from JSON
pub fn from_json(json: &str) -> serde_json::Result<Node> {
    serde_json::from_str(json)
}
