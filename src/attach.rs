//! Attach declared arguments to macros and environments
//!
//! The array-level pass scans right to left: when macros chain with no
//! delimiters (`\xxx\xxx a b c`), TeX resolves the rightmost one first, so
//! the inner macro claims its arguments before becoming the outer macro's
//! first argument. The scan direction is a correctness requirement, not an
//! optimization.
//!
//! The tree-level pass applies the array pass to every content array in
//! the tree (group bodies, environment bodies, math bodies, attached
//! argument content) but never descends into verbatim leaves, whose
//! payload is opaque text.

use crate::argspec::ArgSpecCache;
use crate::ast::{merge_render_info, Environment, Node};
use crate::error::{Diagnostics, Error, Result, Warning};
use crate::gobble::gobble_arguments;
use crate::tables::{EnvInfo, EnvInfoRecord, MacroInfo, MacroInfoRecord};

/// Recursion guard for pathologically deep trees
const DEFAULT_MAX_DEPTH: usize = 256;

/// Attach arguments throughout a tree using `macros` as the signature
/// table; returns the warnings collected along the way
pub fn attach_macro_args(node: &mut Node, macros: &MacroInfoRecord) -> Vec<Warning> {
    let mut attacher = ArgumentAttacher::new(macros);
    attacher.attach(node);
    attacher.take_warnings()
}

/// Array-level attachment over a single node array (no recursion into
/// children); returns the warnings collected along the way
pub fn attach_macro_args_in_array(
    nodes: &mut Vec<Node>,
    macros: &MacroInfoRecord,
) -> Vec<Warning> {
    let mut attacher = ArgumentAttacher::new(macros);
    attacher.attach_in_array(nodes);
    attacher.take_warnings()
}

/// Argument-attachment pass over a token tree.
///
/// Owns the signature parse cache and the collected diagnostics, so one
/// attacher can be reused across many trees without re-parsing signatures.
#[derive(Debug)]
pub struct ArgumentAttacher<'a> {
    macros: &'a MacroInfoRecord,
    environments: Option<&'a EnvInfoRecord>,
    cache: ArgSpecCache,
    diagnostics: Diagnostics,
    max_depth: usize,
}

impl<'a> ArgumentAttacher<'a> {
    pub fn new(macros: &'a MacroInfoRecord) -> Self {
        ArgumentAttacher {
            macros,
            environments: None,
            cache: ArgSpecCache::new(),
            diagnostics: Diagnostics::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Also process environments against `environments` during tree walks
    pub fn with_environments(mut self, environments: &'a EnvInfoRecord) -> Self {
        self.environments = Some(environments);
        self
    }

    /// Override the recursion guard (builder pattern)
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Take all warnings collected so far
    pub fn take_warnings(&mut self) -> Vec<Warning> {
        self.diagnostics.take_warnings()
    }

    /// Attach arguments everywhere in the tree under `node`
    pub fn attach(&mut self, node: &mut Node) {
        self.attach_node(node, 0);
    }

    /// Attach arguments to macros found in one node array.
    ///
    /// Scans right to left. A macro whose `args` are already present is
    /// skipped, so the pass is idempotent; a macro without a signature
    /// consumes nothing but still receives its table render info.
    pub fn attach_in_array(&mut self, nodes: &mut Vec<Node>) {
        let mut cursor = nodes.len();
        while cursor > 0 {
            cursor -= 1;
            let Some(info) = self.lookup(&nodes[cursor]) else {
                continue;
            };

            // Render info flows to every table hit, arguments or not
            if let Some(render_info) = &info.render_info {
                let macro_node = nodes[cursor].as_macro_mut().expect("matched a macro");
                merge_render_info(&mut macro_node.render_info, render_info);
            }
            if nodes[cursor]
                .as_macro()
                .expect("matched a macro")
                .args
                .is_some()
            {
                continue;
            }
            let Some(signature) = &info.signature else {
                continue;
            };

            match gobble_arguments(
                nodes,
                signature,
                cursor + 1,
                &mut self.cache,
                &mut self.diagnostics,
            ) {
                Ok(gobbled) => {
                    let macro_node = nodes[cursor].as_macro_mut().expect("matched a macro");
                    macro_node.args = Some(gobbled.args);
                }
                Err(error) => {
                    let name = nodes[cursor].as_macro().expect("matched a macro").name.clone();
                    self.diagnostics
                        .push_warning(Warning::invalid_signature(&name, &error));
                }
            }
            // Scanning resumes just before the macro's original position
        }
    }

    /// Gobble an environment's declared arguments from the front of its
    /// body, per its entry in the environment table.
    ///
    /// Calling this for an environment that has no table entry is a
    /// contract violation and returns an error.
    pub fn process_environment(&mut self, env: &mut Environment) -> Result<()> {
        let info = self
            .environments
            .and_then(|envs| envs.get(env.name.as_str()))
            .ok_or_else(|| Error::unknown_environment(&env.name))?;
        self.apply_env_info(env, info);
        Ok(())
    }

    fn apply_env_info(&mut self, env: &mut Environment, info: &EnvInfo) {
        if let Some(render_info) = &info.render_info {
            merge_render_info(&mut env.render_info, render_info);
        }
        if env.args.is_some() {
            return;
        }
        let Some(signature) = &info.signature else {
            return;
        };
        match gobble_arguments(
            &mut env.content,
            signature,
            0,
            &mut self.cache,
            &mut self.diagnostics,
        ) {
            Ok(gobbled) => env.args = Some(gobbled.args),
            Err(error) => {
                self.diagnostics
                    .push_warning(Warning::invalid_signature(&env.name, &error));
            }
        }
    }

    /// Table lookup for a macro node. The name alone is not enough; the
    /// escape token has to agree too, so `^`-style table entries never
    /// capture the `\^` accent macro.
    fn lookup(&self, node: &Node) -> Option<&'a MacroInfo> {
        let macro_node = node.as_macro()?;
        let info = self.macros.get(macro_node.name.as_str())?;
        if info.effective_escape_token() == macro_node.effective_escape_token() {
            Some(info)
        } else {
            None
        }
    }

    fn attach_node(&mut self, node: &mut Node, depth: usize) {
        if depth > self.max_depth {
            self.diagnostics
                .push_warning(Warning::recursion_limit(self.max_depth));
            return;
        }
        match node {
            Node::Root(root) => self.attach_array(&mut root.content, depth),
            Node::Group(group) => self.attach_array(&mut group.content, depth),
            Node::InlineMath(math) => self.attach_array(&mut math.content, depth),
            Node::DisplayMath(math) => self.attach_array(&mut math.content, depth),
            Node::Environment(env) => {
                if let Some(info) = self
                    .environments
                    .and_then(|envs| envs.get(env.name.as_str()))
                {
                    self.apply_env_info(env, info);
                }
                if let Some(args) = &mut env.args {
                    for arg in args {
                        self.attach_array(&mut arg.content, depth);
                    }
                }
                self.attach_array(&mut env.content, depth);
            }
            Node::Macro(macro_node) => {
                if let Some(args) = &mut macro_node.args {
                    for arg in args {
                        self.attach_array(&mut arg.content, depth);
                    }
                }
            }
            // Verbatim-like leaves hold raw text; there is nothing to
            // descend into
            Node::String(_)
            | Node::Whitespace(_)
            | Node::Parbreak(_)
            | Node::Comment(_)
            | Node::Verb(_)
            | Node::VerbatimEnvironment(_) => {}
        }
    }

    fn attach_array(&mut self, nodes: &mut Vec<Node>, depth: usize) {
        if depth > self.max_depth {
            self.diagnostics
                .push_warning(Warning::recursion_limit(self.max_depth));
            return;
        }
        self.attach_in_array(nodes);
        for node in nodes.iter_mut() {
            self.attach_node(node, depth + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{print_raw, strip_positions_all, Root};
    use crate::tables::MacroInfo;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn toks(source: &str) -> Vec<Node> {
        let mut nodes = crate::lexer::lex(source);
        strip_positions_all(&mut nodes);
        nodes
    }

    fn table(entries: &[(&str, &str)]) -> MacroInfoRecord {
        entries
            .iter()
            .map(|(name, signature)| {
                (name.to_string(), MacroInfo::with_signature(*signature))
            })
            .collect()
    }

    #[test]
    fn test_basic_attachment() {
        let macros = table(&[("frac", "m m")]);
        let mut nodes = toks("\\frac{a}{b} rest");
        attach_macro_args_in_array(&mut nodes, &macros);
        let frac = nodes[0].as_macro().unwrap();
        let args = frac.args.as_ref().unwrap();
        assert_eq!(args.len(), 2);
        assert_eq!(args[0].content, vec![Node::string("a")]);
        assert_eq!(args[1].content, vec![Node::string("b")]);
        assert_eq!(nodes.len(), 3);
    }

    #[test]
    fn test_right_associativity() {
        // The rightmost \xxx grabs `a b`; the outer one gets the inner
        // macro itself plus `c`
        let macros = table(&[("xxx", "m m")]);
        let mut nodes = toks("\\xxx\\xxx a b c");
        attach_macro_args_in_array(&mut nodes, &macros);

        assert_eq!(nodes.len(), 1);
        let outer = nodes[0].as_macro().unwrap();
        let outer_args = outer.args.as_ref().unwrap();
        assert_eq!(outer_args.len(), 2);

        let inner = outer_args[0].content[0].as_macro().unwrap();
        assert_eq!(inner.name, "xxx");
        let inner_args = inner.args.as_ref().unwrap();
        assert_eq!(inner_args[0].content, vec![Node::string("a")]);
        assert_eq!(inner_args[1].content, vec![Node::string("b")]);

        assert_eq!(outer_args[1].content, vec![Node::string("c")]);
    }

    #[test]
    fn test_idempotence() {
        let macros = table(&[("sqrt", "o m"), ("frac", "m m")]);
        let mut root: Node = Root::new(toks("\\sqrt[3]{x} and {\\frac{a}{b}}")).into();
        attach_macro_args(&mut root, &macros);
        let once = root.clone();
        attach_macro_args(&mut root, &macros);
        assert_eq!(root, once);
    }

    #[test]
    fn test_comment_is_not_consumed() {
        let macros = table(&[("xxx", "m")]);
        let mut nodes = toks("\\xxx %comment\ny");
        attach_macro_args_in_array(&mut nodes, &macros);
        let macro_node = nodes[0].as_macro().unwrap();
        assert!(macro_node.args.as_ref().unwrap()[0].is_blank());
        // The whitespace and comment stay put
        assert!(nodes[1].is_whitespace());
        assert!(nodes[2].is_comment());
        assert_eq!(nodes[3].as_string(), Some("y"));
    }

    #[test]
    fn test_no_signature_macro_untouched() {
        let mut macros = table(&[]);
        macros.insert(
            "item".to_string(),
            MacroInfo::new().with_render_info(json!({"inParMode": true})),
        );
        let mut nodes = toks("\\item text");
        attach_macro_args_in_array(&mut nodes, &macros);
        let item = nodes[0].as_macro().unwrap();
        // No arguments gobbled, but render info still arrives
        assert!(item.args.is_none());
        assert_eq!(item.render_info, Some(json!({"inParMode": true})));
        assert_eq!(nodes.len(), 3);
    }

    #[test]
    fn test_escape_token_must_match() {
        let mut macros = MacroInfoRecord::new();
        macros.insert(
            "^".to_string(),
            MacroInfo::with_signature("m").with_escape_token(""),
        );
        // In math mode, `^` is an escape-less macro and matches
        let mut nodes = crate::lexer::lex_math("x^2");
        strip_positions_all(&mut nodes);
        attach_macro_args_in_array(&mut nodes, &macros);
        let caret = nodes[1].as_macro().unwrap();
        assert_eq!(caret.args.as_ref().unwrap()[0].content, vec![Node::string("2")]);

        // The accent macro \^ has the same name but the usual escape, so
        // the table entry must not capture it
        let mut nodes = toks("\\^ o");
        attach_macro_args_in_array(&mut nodes, &macros);
        assert!(nodes[0].as_macro().unwrap().args.is_none());
    }

    #[test]
    fn test_recursion_into_groups_and_math() {
        let macros = table(&[("textbf", "m")]);
        let mut root: Node = Root::new(toks("{\\textbf{a}} $\\textbf{b}$")).into();
        attach_macro_args(&mut root, &macros);
        assert_eq!(print_raw(&root), "{\\textbf{a}} $\\textbf{b}$");
        let Node::Root(root) = &root else { unreachable!() };
        let Node::Group(group) = &root.content[0] else {
            panic!("expected group");
        };
        assert!(group.content[0].as_macro().unwrap().args.is_some());
    }

    #[test]
    fn test_verbatim_content_is_opaque() {
        let macros = table(&[("textbf", "m")]);
        let mut root: Node =
            Root::new(toks("\\begin{verbatim}\\textbf{a}\\end{verbatim}")).into();
        attach_macro_args(&mut root, &macros);
        assert_eq!(
            print_raw(&root),
            "\\begin{verbatim}\\textbf{a}\\end{verbatim}"
        );
    }

    #[test]
    fn test_environment_processing() {
        let macros = MacroInfoRecord::new();
        let mut envs = EnvInfoRecord::new();
        envs.insert("tabular".to_string(), EnvInfo::with_signature("o m"));

        let mut root: Node = Root::new(toks("\\begin{tabular}[t]{ll}x\\end{tabular}")).into();
        let mut attacher = ArgumentAttacher::new(&macros).with_environments(&envs);
        attacher.attach(&mut root);

        let Node::Root(root) = &root else { unreachable!() };
        let env = root.content[0].as_environment().unwrap();
        let args = env.args.as_ref().unwrap();
        assert_eq!(args.len(), 2);
        assert_eq!(args[0].open_mark, "[");
        assert_eq!(args[1].open_mark, "{");
        // The gobbled arguments are gone from the body
        assert_eq!(env.content, vec![Node::string("x")]);
    }

    #[test]
    fn test_unknown_environment_is_contract_error() {
        let macros = MacroInfoRecord::new();
        let envs = EnvInfoRecord::new();
        let mut attacher = ArgumentAttacher::new(&macros).with_environments(&envs);
        let mut env = Environment::new("mystery", toks("body"));
        let result = attacher.process_environment(&mut env);
        assert!(matches!(result, Err(Error::UnknownEnvironment { .. })));
    }

    #[test]
    fn test_bad_signature_degrades_with_warning() {
        let macros = table(&[("broken", "q")]);
        let mut nodes = toks("\\broken{a}");
        let warnings = attach_macro_args_in_array(&mut nodes, &macros);
        assert!(nodes[0].as_macro().unwrap().args.is_none());
        assert_eq!(warnings.len(), 1);
        assert_eq!(
            warnings[0].kind,
            crate::error::WarningKind::InvalidSignature
        );
    }

    #[test]
    fn test_depth_guard() {
        let macros = table(&[("textbf", "m")]);
        let mut node = Node::string("x");
        for _ in 0..40 {
            node = Node::group(vec![node]);
        }
        let mut attacher = ArgumentAttacher::new(&macros).with_max_depth(16);
        attacher.attach(&mut node);
        let warnings = attacher.take_warnings();
        assert!(warnings
            .iter()
            .any(|w| w.kind == crate::error::WarningKind::RecursionLimit));
    }

    #[test]
    fn test_attachment_inside_gobbled_args() {
        // A macro inside a gobbled group argument is attached as the walk
        // descends into the argument content
        let macros = table(&[("outer", "m"), ("inner", "m")]);
        let mut root: Node = Root::new(toks("\\outer{\\inner{x}}")).into();
        attach_macro_args(&mut root, &macros);
        let Node::Root(root) = &root else { unreachable!() };
        let outer = root.content[0].as_macro().unwrap();
        let inner = outer.args.as_ref().unwrap()[0].content[0].as_macro().unwrap();
        assert!(inner.args.is_some());
        assert_eq!(
            inner.args.as_ref().unwrap()[0].content,
            vec![Node::string("x")]
        );
    }
}
