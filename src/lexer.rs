//! LaTeX tokenizer
//!
//! Converts source text into the token tree the argument machinery works
//! on. This follows standard TeX surface rules:
//! - control sequence recognition (multi-letter names accept any Unicode
//!   letter; a single non-letter after `\` is a control symbol)
//! - comment capture to end of line
//! - blank lines become paragraph breaks, other whitespace runs collapse
//!   into single whitespace nodes
//! - brace groups nest
//! - `$...$`, `$$...$$`, `\(...\)` and `\[...\]` produce math containers
//! - `\verb` and verbatim environments capture raw text
//! - `\begin{name}...\end{name}` pairs produce environment nodes
//!
//! The lexer is deliberately lenient: unbalanced input degrades into
//! literal tokens instead of failing, since argument attachment is a
//! best-effort structural pass.

use crate::ast::{
    is_math_environment, Comment, DisplayMath, Environment, Group, InlineMath, Macro, Node,
    Parbreak, Position, SourceLocation, StringNode, Verb, VerbatimEnvironment, Whitespace,
};

/// Environments whose body is captured raw instead of tokenized
const VERBATIM_ENVIRONMENTS: &[&str] = &[
    "verbatim",
    "verbatim*",
    "lstlisting",
    "minted",
    "filecontents",
    "filecontents*",
];

/// Tokenize a complete source string
pub fn lex(input: &str) -> Vec<Node> {
    Lexer::new(input).run(Terminator::EndOfInput, false)
}

/// Tokenize a fragment that is already inside math mode, so `^` and `_`
/// become their escape-less pseudo-macros
pub fn lex_math(input: &str) -> Vec<Node> {
    Lexer::new(input).run(Terminator::EndOfInput, true)
}

/// What ends the current tokenization level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terminator {
    EndOfInput,
    CloseBrace,
    InlineDollar,
    DisplayDollars,
    /// `\)` or `\]`
    MathClose(char),
    /// `\end{...}`; the environment name lives on the caller's stack
    EnvEnd,
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    offset: usize,
    line: usize,
    column: usize,
    /// True once the current source line has produced a non-whitespace token
    line_dirty: bool,
    /// Environment name the innermost `Terminator::EnvEnd` is waiting for
    env_stack: Vec<String>,
}

impl Lexer {
    fn new(input: &str) -> Self {
        Lexer {
            chars: input.chars().collect(),
            pos: 0,
            offset: 0,
            line: 1,
            column: 1,
            line_dirty: false,
            env_stack: Vec::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).copied()
    }

    fn next_char(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        self.offset += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
            self.line_dirty = false;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn mark(&self) -> SourceLocation {
        SourceLocation {
            offset: self.offset,
            line: self.line,
            column: self.column,
        }
    }

    fn span(&self, start: SourceLocation) -> Option<Position> {
        Some(Position {
            start,
            end: self.mark(),
        })
    }

    /// Tokenize until the terminator is consumed (or input runs out)
    fn run(&mut self, terminator: Terminator, math_mode: bool) -> Vec<Node> {
        let mut nodes = Vec::new();
        loop {
            let start = self.mark();
            let Some(c) = self.peek() else {
                break;
            };
            match c {
                '}' if terminator == Terminator::CloseBrace => {
                    self.next_char();
                    break;
                }
                '}' => {
                    // Unbalanced close brace: keep it as literal text
                    self.next_char();
                    self.line_dirty = true;
                    nodes.push(Node::String(StringNode {
                        content: "}".to_string(),
                        position: self.span(start),
                    }));
                }
                '{' => {
                    self.next_char();
                    let content = self.run(Terminator::CloseBrace, math_mode);
                    self.line_dirty = true;
                    nodes.push(Node::Group(Group {
                        content,
                        position: self.span(start),
                    }));
                }
                '$' => {
                    if terminator == Terminator::InlineDollar {
                        self.next_char();
                        break;
                    }
                    if terminator == Terminator::DisplayDollars {
                        self.next_char();
                        if self.peek() == Some('$') {
                            self.next_char();
                        }
                        break;
                    }
                    self.next_char();
                    self.line_dirty = true;
                    if self.peek() == Some('$') {
                        self.next_char();
                        let content = self.run(Terminator::DisplayDollars, true);
                        nodes.push(Node::DisplayMath(DisplayMath {
                            content,
                            position: self.span(start),
                        }));
                    } else {
                        let content = self.run(Terminator::InlineDollar, true);
                        nodes.push(Node::InlineMath(InlineMath {
                            content,
                            position: self.span(start),
                        }));
                    }
                }
                '%' => {
                    let sameline = self.line_dirty;
                    self.next_char();
                    let mut content = String::new();
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        content.push(c);
                        self.next_char();
                    }
                    // The comment owns its line ending
                    if self.peek() == Some('\n') {
                        self.next_char();
                    }
                    nodes.push(Node::Comment(Comment {
                        content,
                        sameline,
                        position: self.span(start),
                    }));
                }
                '\\' => {
                    if terminator_math_close(terminator, self) {
                        break;
                    }
                    if terminator == Terminator::EnvEnd && self.at_env_end() {
                        break;
                    }
                    let node = self.read_escape(start, math_mode);
                    self.line_dirty = true;
                    nodes.push(node);
                }
                '^' | '_' if math_mode => {
                    self.next_char();
                    self.line_dirty = true;
                    nodes.push(Node::Macro(Macro {
                        name: c.to_string(),
                        escape_token: Some(String::new()),
                        args: None,
                        render_info: None,
                        position: self.span(start),
                    }));
                }
                c if c.is_whitespace() => {
                    let mut newlines = 0;
                    while let Some(w) = self.peek() {
                        if !w.is_whitespace() {
                            break;
                        }
                        if w == '\n' {
                            newlines += 1;
                        }
                        self.next_char();
                    }
                    if newlines >= 2 {
                        nodes.push(Node::Parbreak(Parbreak {
                            position: self.span(start),
                        }));
                    } else {
                        nodes.push(Node::Whitespace(Whitespace {
                            position: self.span(start),
                        }));
                    }
                }
                _ => {
                    let mut content = String::new();
                    while let Some(c) = self.peek() {
                        let special = matches!(c, '\\' | '{' | '}' | '$' | '%')
                            || c.is_whitespace()
                            || (math_mode && matches!(c, '^' | '_'));
                        if special {
                            break;
                        }
                        content.push(c);
                        self.next_char();
                    }
                    self.line_dirty = true;
                    nodes.push(Node::String(StringNode {
                        content,
                        position: self.span(start),
                    }));
                }
            }
        }
        nodes
    }

    /// Handle a `\` already peeked at `self.pos`
    fn read_escape(&mut self, start: SourceLocation, math_mode: bool) -> Node {
        self.next_char();
        let Some(c) = self.peek() else {
            // Lone backslash at end of input
            return Node::String(StringNode {
                content: "\\".to_string(),
                position: self.span(start),
            });
        };

        if c == '(' || c == '[' {
            self.next_char();
            let close = if c == '(' { ')' } else { ']' };
            let content = self.run(Terminator::MathClose(close), true);
            return if c == '(' {
                Node::InlineMath(InlineMath {
                    content,
                    position: self.span(start),
                })
            } else {
                Node::DisplayMath(DisplayMath {
                    content,
                    position: self.span(start),
                })
            };
        }

        if !c.is_alphabetic() {
            // Control symbol such as \% or \{
            self.next_char();
            return Node::Macro(Macro {
                name: c.to_string(),
                escape_token: None,
                args: None,
                render_info: None,
                position: self.span(start),
            });
        }

        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphabetic() {
                name.push(c);
                self.next_char();
            } else {
                break;
            }
        }

        match name.as_str() {
            "begin" => self.read_environment(start, math_mode),
            "verb" => self.read_verb(start),
            _ => Node::Macro(Macro {
                name,
                escape_token: None,
                args: None,
                render_info: None,
                position: self.span(start),
            }),
        }
    }

    /// True when the input at the cursor is `\end{...}` closing the
    /// innermost environment; consumes it in that case.
    fn at_env_end(&mut self) -> bool {
        let expected = match self.env_stack.last() {
            Some(name) => name.clone(),
            None => return false,
        };
        let save = (self.pos, self.offset, self.line, self.column, self.line_dirty);
        if self.try_consume_end(&expected) {
            return true;
        }
        (self.pos, self.offset, self.line, self.column, self.line_dirty) = save;
        false
    }

    fn try_consume_end(&mut self, expected: &str) -> bool {
        if self.peek() != Some('\\') {
            return false;
        }
        let word: String = (1..4)
            .filter_map(|i| self.peek_at(i))
            .collect();
        if word != "end" {
            return false;
        }
        if self.peek_at(4).map(|c| c.is_alphabetic()).unwrap_or(false) {
            return false;
        }
        // Consume "\end", optional whitespace, then "{name}"
        for _ in 0..4 {
            self.next_char();
        }
        while self.peek().map(|c| c.is_whitespace()).unwrap_or(false) {
            self.next_char();
        }
        if self.peek() != Some('{') {
            return false;
        }
        self.next_char();
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c == '}' {
                break;
            }
            name.push(c);
            self.next_char();
        }
        if self.peek() != Some('}') {
            return false;
        }
        self.next_char();
        name == expected
    }

    fn read_environment(&mut self, start: SourceLocation, math_mode: bool) -> Node {
        let save = (self.pos, self.offset, self.line, self.column);
        while self.peek().map(|c| c.is_whitespace()).unwrap_or(false) {
            self.next_char();
        }
        if self.peek() != Some('{') {
            // Not followed by a name: fall back to a bare \begin macro
            (self.pos, self.offset, self.line, self.column) = save;
            return Node::Macro(Macro {
                name: "begin".to_string(),
                escape_token: None,
                args: None,
                render_info: None,
                position: self.span(start),
            });
        }
        self.next_char();
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c == '}' {
                break;
            }
            name.push(c);
            self.next_char();
        }
        self.next_char(); // closing brace

        if VERBATIM_ENVIRONMENTS.contains(&name.as_str()) {
            let content = self.read_raw_until_end(&name);
            return Node::VerbatimEnvironment(VerbatimEnvironment {
                name,
                content,
                position: self.span(start),
            });
        }

        let math_body = math_mode || is_math_environment(&name);
        self.env_stack.push(name.clone());
        let content = self.run(Terminator::EnvEnd, math_body);
        self.env_stack.pop();
        Node::Environment(Environment {
            name,
            args: None,
            content,
            render_info: None,
            position: self.span(start),
        })
    }

    /// Capture raw text until `\end{name}`, consuming the end marker
    fn read_raw_until_end(&mut self, name: &str) -> String {
        let end_marker: Vec<char> = format!("\\end{{{}}}", name).chars().collect();
        let mut content = String::new();
        while self.peek().is_some() {
            if self.chars[self.pos..].starts_with(&end_marker[..]) {
                for _ in 0..end_marker.len() {
                    self.next_char();
                }
                return content;
            }
            content.push(self.next_char().unwrap());
        }
        content
    }

    fn read_verb(&mut self, start: SourceLocation) -> Node {
        let mut name = "verb".to_string();
        if self.peek() == Some('*') {
            self.next_char();
            name.push('*');
        }
        let Some(escape) = self.peek() else {
            return Node::Macro(Macro {
                name,
                escape_token: None,
                args: None,
                render_info: None,
                position: self.span(start),
            });
        };
        self.next_char();
        let mut content = String::new();
        while let Some(c) = self.peek() {
            if c == escape || c == '\n' {
                break;
            }
            content.push(c);
            self.next_char();
        }
        if self.peek() == Some(escape) {
            self.next_char();
        }
        Node::Verb(Verb {
            name,
            escape: escape.to_string(),
            content,
            position: self.span(start),
        })
    }
}

/// Consume `\)` / `\]` when it closes the current math level
fn terminator_math_close(terminator: Terminator, lexer: &mut Lexer) -> bool {
    let Terminator::MathClose(close) = terminator else {
        return false;
    };
    if lexer.peek_at(1) == Some(close) {
        lexer.next_char();
        lexer.next_char();
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::print_raw_all;

    fn kinds(nodes: &[Node]) -> Vec<&'static str> {
        nodes
            .iter()
            .map(|n| match n {
                Node::Root(_) => "root",
                Node::String(_) => "string",
                Node::Whitespace(_) => "whitespace",
                Node::Parbreak(_) => "parbreak",
                Node::Comment(_) => "comment",
                Node::Group(_) => "group",
                Node::Macro(_) => "macro",
                Node::Environment(_) => "environment",
                Node::VerbatimEnvironment(_) => "verbatim",
                Node::Verb(_) => "verb",
                Node::InlineMath(_) => "inlinemath",
                Node::DisplayMath(_) => "displaymath",
            })
            .collect()
    }

    #[test]
    fn test_simple_text() {
        let nodes = lex("hello world");
        assert_eq!(kinds(&nodes), vec!["string", "whitespace", "string"]);
        assert_eq!(nodes[0].as_string(), Some("hello"));
    }

    #[test]
    fn test_macro_with_group() {
        let nodes = lex("\\frac{a}{b}");
        assert_eq!(kinds(&nodes), vec!["macro", "group", "group"]);
        assert_eq!(nodes[0].as_macro().unwrap().name, "frac");
    }

    #[test]
    fn test_unicode_macro_name() {
        let nodes = lex("\\größe x");
        assert_eq!(nodes[0].as_macro().unwrap().name, "größe");
    }

    #[test]
    fn test_control_symbol() {
        let nodes = lex("\\% \\{");
        assert_eq!(nodes[0].as_macro().unwrap().name, "%");
        assert_eq!(nodes[2].as_macro().unwrap().name, "{");
    }

    #[test]
    fn test_whitespace_kept_after_macro() {
        // Whitespace is a real node; argument gobbling decides whether to
        // skip it, not the lexer.
        let nodes = lex("\\frac  {a}");
        assert_eq!(kinds(&nodes), vec!["macro", "whitespace", "group"]);
    }

    #[test]
    fn test_parbreak() {
        let nodes = lex("a\n\nb");
        assert_eq!(kinds(&nodes), vec!["string", "parbreak", "string"]);
        let nodes = lex("a\nb");
        assert_eq!(kinds(&nodes), vec!["string", "whitespace", "string"]);
    }

    #[test]
    fn test_comment_owns_newline() {
        let nodes = lex("a%note\nb");
        assert_eq!(kinds(&nodes), vec!["string", "comment", "string"]);
        match &nodes[1] {
            Node::Comment(c) => {
                assert_eq!(c.content, "note");
                assert!(c.sameline);
            }
            other => panic!("expected comment, got {:?}", other),
        }
    }

    #[test]
    fn test_comment_on_own_line_is_not_sameline() {
        let nodes = lex("a\n%note\nb");
        match &nodes[2] {
            Node::Comment(c) => assert!(!c.sameline),
            other => panic!("expected comment, got {:?}", other),
        }
    }

    #[test]
    fn test_inline_and_display_math() {
        let nodes = lex("$x$ and $$y$$");
        assert_eq!(
            kinds(&nodes),
            vec!["inlinemath", "whitespace", "string", "whitespace", "displaymath"]
        );
    }

    #[test]
    fn test_math_mode_scripts_become_macros() {
        let nodes = lex("$x^2$");
        let Node::InlineMath(m) = &nodes[0] else {
            panic!("expected math");
        };
        let caret = m.content[1].as_macro().unwrap();
        assert_eq!(caret.name, "^");
        assert_eq!(caret.effective_escape_token(), "");
        // Outside math mode the same characters are plain text
        let nodes = lex("x^2");
        assert_eq!(kinds(&nodes), vec!["string"]);
    }

    #[test]
    fn test_latex_math_delimiters() {
        let nodes = lex("\\(x\\) \\[y\\]");
        assert_eq!(
            kinds(&nodes),
            vec!["inlinemath", "whitespace", "displaymath"]
        );
    }

    #[test]
    fn test_environment() {
        let nodes = lex("\\begin{center}a b\\end{center}");
        assert_eq!(kinds(&nodes), vec!["environment"]);
        let env = nodes[0].as_environment().unwrap();
        assert_eq!(env.name, "center");
        assert_eq!(env.content.len(), 3);
    }

    #[test]
    fn test_nested_environments() {
        let nodes = lex("\\begin{a}\\begin{b}x\\end{b}\\end{a}");
        let outer = nodes[0].as_environment().unwrap();
        let inner = outer.content[0].as_environment().unwrap();
        assert_eq!(inner.name, "b");
    }

    #[test]
    fn test_verbatim_environment_is_raw() {
        let nodes = lex("\\begin{verbatim}\\frac{a}{b}\\end{verbatim}");
        match &nodes[0] {
            Node::VerbatimEnvironment(v) => {
                assert_eq!(v.name, "verbatim");
                assert_eq!(v.content, "\\frac{a}{b}");
            }
            other => panic!("expected verbatim, got {:?}", other),
        }
    }

    #[test]
    fn test_verb_island() {
        let nodes = lex("\\verb|x{y}|z");
        match &nodes[0] {
            Node::Verb(v) => {
                assert_eq!(v.escape, "|");
                assert_eq!(v.content, "x{y}");
            }
            other => panic!("expected verb, got {:?}", other),
        }
        assert_eq!(nodes[1].as_string(), Some("z"));
    }

    #[test]
    fn test_math_environment_body_is_math_mode() {
        let nodes = lex("\\begin{equation}x_i\\end{equation}");
        let env = nodes[0].as_environment().unwrap();
        assert_eq!(env.content[1].as_macro().unwrap().name, "_");
    }

    #[test]
    fn test_unbalanced_input_degrades() {
        let nodes = lex("a}b");
        assert_eq!(kinds(&nodes), vec!["string", "string", "string"]);
        let nodes = lex("{ab");
        assert_eq!(kinds(&nodes), vec!["group"]);
    }

    #[test]
    fn test_positions_recorded() {
        let nodes = lex("ab \\x");
        let Node::String(s) = &nodes[0] else {
            panic!("expected string");
        };
        let pos = s.position.unwrap();
        assert_eq!(pos.start.offset, 0);
        assert_eq!(pos.end.offset, 2);
        assert_eq!(pos.start.line, 1);
    }

    #[test]
    fn test_roundtrip_via_print() {
        for source in [
            "\\frac{a}{b}",
            "a %note\nb",
            "\\begin{center}x\\end{center}",
            "$x^{2}$",
            "\\verb|raw|",
            "one two\n\nthree",
        ] {
            let nodes = lex(source);
            let printed = print_raw_all(&nodes);
            assert_eq!(lex(&printed), lex(source), "source: {:?}", source);
        }
    }
}
