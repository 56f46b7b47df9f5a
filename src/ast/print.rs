//! Convert a token tree back to LaTeX source text
//!
//! The inverse of tokenization. Output is canonical rather than
//! byte-faithful: display math always prints as `\[...\]`, a comment always
//! ends its line, and a control word is separated from a following letter
//! with a single space so the result re-tokenizes to an equal tree.

use super::{Argument, Node};

/// Print a single node as LaTeX source
pub fn print_raw(node: &Node) -> String {
    let mut out = String::new();
    write_node(node, &mut out);
    out
}

/// Print a slice of sibling nodes as LaTeX source
pub fn print_raw_all(nodes: &[Node]) -> String {
    let mut out = String::new();
    write_nodes(nodes, &mut out);
    out
}

fn write_nodes(nodes: &[Node], out: &mut String) {
    for node in nodes {
        // A control word would swallow a following letter during
        // re-tokenization, so keep them apart.
        if ends_with_control_word(out) && starts_with_letter(node) {
            out.push(' ');
        }
        write_node(node, out);
    }
}

fn write_node(node: &Node, out: &mut String) {
    match node {
        Node::Root(root) => write_nodes(&root.content, out),
        Node::String(s) => out.push_str(&s.content),
        Node::Whitespace(_) => out.push(' '),
        Node::Parbreak(_) => out.push_str("\n\n"),
        Node::Comment(c) => {
            out.push('%');
            out.push_str(&c.content);
            out.push('\n');
        }
        Node::Group(g) => {
            out.push('{');
            write_nodes(&g.content, out);
            out.push('}');
        }
        Node::Macro(m) => {
            out.push_str(m.effective_escape_token());
            out.push_str(&m.name);
            if let Some(args) = &m.args {
                write_args(args, out);
            }
        }
        Node::Environment(e) => {
            out.push_str("\\begin{");
            out.push_str(&e.name);
            out.push('}');
            if let Some(args) = &e.args {
                write_args(args, out);
            }
            write_nodes(&e.content, out);
            out.push_str("\\end{");
            out.push_str(&e.name);
            out.push('}');
        }
        Node::VerbatimEnvironment(v) => {
            out.push_str("\\begin{");
            out.push_str(&v.name);
            out.push('}');
            out.push_str(&v.content);
            out.push_str("\\end{");
            out.push_str(&v.name);
            out.push('}');
        }
        Node::Verb(v) => {
            out.push('\\');
            out.push_str(&v.name);
            out.push_str(&v.escape);
            out.push_str(&v.content);
            out.push_str(&v.escape);
        }
        Node::InlineMath(m) => {
            out.push('$');
            write_nodes(&m.content, out);
            out.push('$');
        }
        Node::DisplayMath(m) => {
            out.push_str("\\[");
            write_nodes(&m.content, out);
            out.push_str("\\]");
        }
    }
}

fn write_args(args: &[Argument], out: &mut String) {
    for arg in args {
        if arg.is_blank() {
            continue;
        }
        out.push_str(&arg.open_mark);
        write_nodes(&arg.content, out);
        out.push_str(&arg.close_mark);
    }
}

/// True if `out` ends in `\letters`, i.e. a control word with nothing
/// separating it from whatever comes next
fn ends_with_control_word(out: &str) -> bool {
    let tail_len = out
        .chars()
        .rev()
        .take_while(|c| c.is_alphabetic())
        .count();
    if tail_len == 0 {
        return false;
    }
    let mut rev = out.chars().rev().skip(tail_len);
    // Exactly one backslash before the letters; `\\foo` after a `\\` row
    // is already a complete control symbol plus a word.
    rev.next() == Some('\\') && rev.next() != Some('\\')
}

fn starts_with_letter(node: &Node) -> bool {
    match node {
        Node::String(s) => s
            .content
            .chars()
            .next()
            .map(|c| c.is_alphabetic())
            .unwrap_or(false),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Macro;

    #[test]
    fn test_print_simple_nodes() {
        assert_eq!(print_raw(&Node::string("abc")), "abc");
        assert_eq!(print_raw(&Node::whitespace()), " ");
        assert_eq!(print_raw(&Node::parbreak()), "\n\n");
        assert_eq!(print_raw(&Node::comment("note", true)), "%note\n");
    }

    #[test]
    fn test_print_macro_with_args() {
        let mut m = Macro::new("frac");
        m.args = Some(vec![
            Argument::new(vec![Node::string("a")], "{", "}"),
            Argument::new(vec![Node::string("b")], "{", "}"),
        ]);
        assert_eq!(print_raw(&m.into()), "\\frac{a}{b}");
    }

    #[test]
    fn test_blank_args_print_as_nothing() {
        let mut m = Macro::new("sqrt");
        m.args = Some(vec![
            Argument::blank(),
            Argument::new(vec![Node::string("x")], "{", "}"),
        ]);
        assert_eq!(print_raw(&m.into()), "\\sqrt{x}");
    }

    #[test]
    fn test_control_word_letter_separation() {
        let nodes = vec![Macro::new("alpha").into(), Node::string("x")];
        assert_eq!(print_raw_all(&nodes), "\\alpha x");
        // A control symbol needs no separator
        let nodes = vec![Macro::new("%").into(), Node::string("x")];
        assert_eq!(print_raw_all(&nodes), "\\%x");
    }

    #[test]
    fn test_print_environment() {
        let env = crate::ast::Environment::new(
            "center",
            vec![Node::string("a"), Node::whitespace(), Node::string("b")],
        );
        assert_eq!(print_raw(&env.into()), "\\begin{center}a b\\end{center}");
    }

    #[test]
    fn test_print_math() {
        let math = Node::InlineMath(crate::ast::InlineMath {
            content: vec![Node::string("x")],
            position: None,
        });
        assert_eq!(print_raw(&math), "$x$");
    }

    #[test]
    fn test_print_escape_token_macro() {
        let mut m = Macro::with_escape_token("^", "");
        m.args = Some(vec![Argument::new(vec![Node::string("2")], "{", "}")]);
        assert_eq!(print_raw(&m.into()), "^{2}");
    }
}
