//! Tree traversal with math-mode context
//!
//! Walks every node of a token tree in document order, telling the
//! visitor whether the node sits inside math material. Verbatim leaves
//! hold raw text and have no children to walk.

use crate::ast::{is_math_environment, Node};

/// Context handed to the visitor at each node
#[derive(Debug, Clone, Copy, Default)]
pub struct VisitContext {
    /// True inside `$...$`, `\[...\]` and math environments
    pub in_math_mode: bool,
    /// Nesting depth below the visited root
    pub depth: usize,
}

/// Visit `node` and everything below it
pub fn visit<F>(node: &Node, visitor: &mut F)
where
    F: FnMut(&Node, &VisitContext),
{
    visit_inner(node, visitor, VisitContext::default());
}

fn visit_inner<F>(node: &Node, visitor: &mut F, context: VisitContext)
where
    F: FnMut(&Node, &VisitContext),
{
    visitor(node, &context);
    let child_context = VisitContext {
        in_math_mode: context.in_math_mode || enters_math_mode(node),
        depth: context.depth + 1,
    };
    for_each_child(node, |child| visit_inner(child, visitor, child_context));
}

/// Visit `node` and everything below it, with mutable access
pub fn visit_mut<F>(node: &mut Node, visitor: &mut F)
where
    F: FnMut(&mut Node, &VisitContext),
{
    visit_mut_inner(node, visitor, VisitContext::default());
}

fn visit_mut_inner<F>(node: &mut Node, visitor: &mut F, context: VisitContext)
where
    F: FnMut(&mut Node, &VisitContext),
{
    visitor(node, &context);
    let child_context = VisitContext {
        in_math_mode: context.in_math_mode || enters_math_mode(node),
        depth: context.depth + 1,
    };
    for_each_child_mut(node, |child| visit_mut_inner(child, visitor, child_context));
}

fn enters_math_mode(node: &Node) -> bool {
    match node {
        Node::InlineMath(_) | Node::DisplayMath(_) => true,
        Node::Environment(env) => is_math_environment(&env.name),
        _ => false,
    }
}

fn for_each_child(node: &Node, mut f: impl FnMut(&Node)) {
    let arg_lists = match node {
        Node::Macro(m) => m.args.as_deref(),
        Node::Environment(e) => e.args.as_deref(),
        _ => None,
    };
    if let Some(args) = arg_lists {
        for arg in args {
            for child in &arg.content {
                f(child);
            }
        }
    }
    let content = match node {
        Node::Root(n) => Some(&n.content),
        Node::Group(n) => Some(&n.content),
        Node::Environment(n) => Some(&n.content),
        Node::InlineMath(n) => Some(&n.content),
        Node::DisplayMath(n) => Some(&n.content),
        _ => None,
    };
    if let Some(content) = content {
        for child in content {
            f(child);
        }
    }
}

fn for_each_child_mut(node: &mut Node, mut f: impl FnMut(&mut Node)) {
    match node {
        Node::Macro(m) => {
            if let Some(args) = &mut m.args {
                for arg in args {
                    for child in &mut arg.content {
                        f(child);
                    }
                }
            }
        }
        Node::Environment(e) => {
            if let Some(args) = &mut e.args {
                for arg in args {
                    for child in &mut arg.content {
                        f(child);
                    }
                }
            }
            for child in &mut e.content {
                f(child);
            }
        }
        Node::Root(n) => {
            for child in &mut n.content {
                f(child);
            }
        }
        Node::Group(n) => {
            for child in &mut n.content {
                f(child);
            }
        }
        Node::InlineMath(n) => {
            for child in &mut n.content {
                f(child);
            }
        }
        Node::DisplayMath(n) => {
            for child in &mut n.content {
                f(child);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Root;

    #[test]
    fn test_visits_every_node() {
        let root: Node = Root::new(crate::lexer::lex("a {b $c$}")).into();
        let mut count = 0;
        visit(&root, &mut |_, _| count += 1);
        // root, "a", ws, group, "b", ws, inlinemath, "c"
        assert_eq!(count, 8);
    }

    #[test]
    fn test_math_context() {
        let root: Node = Root::new(crate::lexer::lex("x $y$ \\begin{align}z\\end{align}")).into();
        let mut math_strings = Vec::new();
        let mut text_strings = Vec::new();
        visit(&root, &mut |node, context| {
            if let Some(s) = node.as_string() {
                if context.in_math_mode {
                    math_strings.push(s.to_string());
                } else {
                    text_strings.push(s.to_string());
                }
            }
        });
        assert_eq!(math_strings, vec!["y", "z"]);
        assert_eq!(text_strings, vec!["x"]);
    }

    #[test]
    fn test_visit_mut_rewrites() {
        let mut root: Node = Root::new(crate::lexer::lex("a b")).into();
        visit_mut(&mut root, &mut |node, _| {
            if let Node::String(s) = node {
                s.content = s.content.to_uppercase();
            }
        });
        assert_eq!(crate::ast::print_raw(&root), "A B");
    }

    #[test]
    fn test_depth_tracking() {
        let root: Node = Root::new(crate::lexer::lex("{{x}}")).into();
        let mut max_depth = 0;
        visit(&root, &mut |_, context| max_depth = max_depth.max(context.depth));
        // root=0, outer group=1, inner group=2, "x"=3
        assert_eq!(max_depth, 3);
    }
}
