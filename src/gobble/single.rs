//! Gobble a single argument from a token array
//!
//! Given one parsed spec node and a position, decide whether an argument of
//! that kind starts there and, if so, cut it out of the array. "No match"
//! is an ordinary result, not an error; it is how optional arguments work.
//!
//! Delimiters do not have to line up with token boundaries. A string token
//! `"(ab)"` is re-tokenized into `"("`, `"ab"`, `")"` when parentheses are
//! the argument marks. These splits are a tokenization refinement, not a
//! semantic change, so they are kept even when the overall match fails.

use crate::argspec::{print_spec_tokens, ArgSpec, BracedArg, EmbellishmentArg, SpecToken, UntilArg};
use crate::ast::{Argument, Node};
use crate::error::{Diagnostics, Warning};

/// What a successful gobble produced: ordinary specs yield one argument,
/// embellishments yield one argument per declared token
#[derive(Debug, Clone, PartialEq)]
pub enum Gobbled {
    Single(Argument),
    Embellishments(Vec<Argument>),
}

/// Result of [`gobble_single_argument`]
#[derive(Debug, Clone, PartialEq)]
pub struct SingleGobbleResult {
    /// `None` when no argument of the requested kind was found
    pub argument: Option<Gobbled>,
    /// How many nodes were removed starting at `start_pos`; always zero on
    /// a failed match
    pub nodes_removed: usize,
}

impl SingleGobbleResult {
    fn no_match() -> Self {
        SingleGobbleResult {
            argument: None,
            nodes_removed: 0,
        }
    }

    fn single(argument: Argument, nodes_removed: usize) -> Self {
        SingleGobbleResult {
            argument: Some(Gobbled::Single(argument)),
            nodes_removed,
        }
    }
}

/// Attempt to gobble one argument of kind `spec` starting at `start_pos`.
///
/// On success the consumed nodes (including any skipped leading
/// whitespace) are removed from `nodes` and ownership of the argument
/// content transfers into the returned [`Argument`].
pub fn gobble_single_argument(
    nodes: &mut Vec<Node>,
    spec: &ArgSpec,
    start_pos: usize,
    diagnostics: &mut Diagnostics,
) -> SingleGobbleResult {
    let mut curr = start_pos;
    if !spec.no_leading_whitespace() {
        while nodes.get(curr).map(Node::is_whitespace).unwrap_or(false) {
            curr += 1;
        }
    }
    // Arguments never reach across a comment or a paragraph boundary
    match nodes.get(curr) {
        None => return SingleGobbleResult::no_match(),
        Some(node) if node.is_comment() || node.is_parbreak() => {
            return SingleGobbleResult::no_match()
        }
        Some(_) => {}
    }

    match spec {
        ArgSpec::Mandatory(braced) => gobble_braced(nodes, braced, true, start_pos, curr),
        ArgSpec::Optional(braced) => gobble_braced(nodes, braced, false, start_pos, curr),
        ArgSpec::OptionalStar(_) => gobble_literal(nodes, "*", start_pos, curr),
        ArgSpec::OptionalToken(t) => gobble_literal(nodes, &t.token, start_pos, curr),
        ArgSpec::Until(until) => gobble_until(nodes, until, start_pos, curr, diagnostics),
        ArgSpec::Embellishment(emb) => {
            gobble_embellishment(nodes, emb, start_pos, curr, diagnostics)
        }
        ArgSpec::Verbatim(_) => {
            diagnostics.push_warning(Warning::unsupported_argument_kind("verbatim"));
            SingleGobbleResult::no_match()
        }
        // The body is claimed by environment processing, not by gobbling
        ArgSpec::Body => SingleGobbleResult::no_match(),
    }
}

// =============================================================================
// Braced arguments
// =============================================================================

fn gobble_braced(
    nodes: &mut Vec<Node>,
    braced: &BracedArg,
    mandatory: bool,
    start_pos: usize,
    curr: usize,
) -> SingleGobbleResult {
    // A mandatory argument with the stock braces takes either a ready-made
    // group (unwrapped) or, TeX-style, the single token that sits there
    if mandatory && braced.open_brace == "{" && braced.close_brace == "}" {
        let end = curr + 1;
        let mut removed: Vec<Node> = nodes.drain(start_pos..end).collect();
        let node = removed.pop().expect("current node checked by caller");
        let content = match node {
            Node::Group(group) => group.content,
            other => vec![other],
        };
        let argument = Argument::new(content, "{", "}");
        return SingleGobbleResult::single(argument, end - start_pos);
    }
    // An optional argument with `{}` marks can still be satisfied by a group
    if braced.open_brace == "{" && nodes[curr].is_group() {
        let end = curr + 1;
        let mut removed: Vec<Node> = nodes.drain(start_pos..end).collect();
        let Some(Node::Group(group)) = removed.pop() else {
            unreachable!("group checked above");
        };
        let argument = Argument::new(group.content, "{", "}");
        return SingleGobbleResult::single(argument, end - start_pos);
    }
    if braced.open_brace.is_empty() || braced.close_brace.is_empty() {
        return SingleGobbleResult::no_match();
    }

    // The open mark has to sit exactly at the match position
    if match_literal(nodes, curr, &braced.open_brace).is_none() {
        return SingleGobbleResult::no_match();
    }
    let Some(close_pos) =
        find_closing_mark(nodes, curr + 1, &braced.open_brace, &braced.close_brace)
    else {
        // All or nothing: nothing is removed when the close mark is missing
        return SingleGobbleResult::no_match();
    };

    let end = close_pos + 1;
    let mut removed: Vec<Node> = nodes.drain(start_pos..end).collect();
    removed.pop(); // the close mark
    let content = removed.split_off(curr - start_pos + 1);
    let argument = Argument::new(
        content,
        braced.open_brace.clone(),
        braced.close_brace.clone(),
    );
    SingleGobbleResult::single(argument, end - start_pos)
}

// =============================================================================
// Star and literal-token arguments
// =============================================================================

fn gobble_literal(
    nodes: &mut Vec<Node>,
    mark: &str,
    start_pos: usize,
    curr: usize,
) -> SingleGobbleResult {
    let matches = if let Some(name) = mark.strip_prefix('\\') {
        matches!(nodes.get(curr), Some(Node::Macro(m))
            if m.name == name && m.effective_escape_token() == "\\")
    } else {
        match_literal(nodes, curr, mark).is_some()
    };
    if !matches {
        return SingleGobbleResult::no_match();
    }
    let end = curr + 1;
    let mut removed: Vec<Node> = nodes.drain(start_pos..end).collect();
    let token = removed.pop().expect("matched token present");
    SingleGobbleResult::single(Argument::new(vec![token], "", ""), end - start_pos)
}

// =============================================================================
// Until arguments
// =============================================================================

fn gobble_until(
    nodes: &mut Vec<Node>,
    until: &UntilArg,
    start_pos: usize,
    curr: usize,
    diagnostics: &mut Diagnostics,
) -> SingleGobbleResult {
    let Some(stop) = normalize_until_stop(until, diagnostics) else {
        return SingleGobbleResult::no_match();
    };

    let stop_str = stop.to_string();
    let stop_pos = if stop.is_whitespace() {
        let mut idx = curr;
        loop {
            match nodes.get(idx) {
                None => return SingleGobbleResult::no_match(),
                Some(node) if node.is_whitespace() => break idx,
                Some(_) => idx += 1,
            }
        }
    } else {
        match find_string_literal(nodes, curr, &stop_str) {
            Some(idx) => idx,
            None => return SingleGobbleResult::no_match(),
        }
    };

    let end = stop_pos + 1;
    let mut removed: Vec<Node> = nodes.drain(start_pos..end).collect();
    removed.pop(); // the stop token is consumed but not part of the content
    let content = removed.split_off(curr - start_pos);
    SingleGobbleResult::single(Argument::new(content, "", stop_str), end - start_pos)
}

/// Reduce an until-stop declaration to the single character this engine
/// can match. Multi-token lists, multi-character stops and alphanumeric
/// stops are declared but unimplemented; they warn and never match.
fn normalize_until_stop(until: &UntilArg, diagnostics: &mut Diagnostics) -> Option<char> {
    let printed = print_spec_tokens(&until.stop_tokens);
    if let [SpecToken::String(s)] = until.stop_tokens.as_slice() {
        let mut chars = s.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if !c.is_alphanumeric() {
                return Some(c);
            }
        }
    }
    diagnostics.push_warning(Warning::unsupported_until_stop(&printed));
    None
}

// =============================================================================
// Embellishment arguments
// =============================================================================

/// How one embellishment slot captured its content
#[derive(Debug, Clone, Copy)]
struct Capture {
    /// Index of the content node, if the marker was followed by anything
    content_pos: Option<usize>,
}

fn gobble_embellishment(
    nodes: &mut Vec<Node>,
    emb: &EmbellishmentArg,
    start_pos: usize,
    init_curr: usize,
    diagnostics: &mut Diagnostics,
) -> SingleGobbleResult {
    let tokens = normalize_tokens(&emb.tokens, Some(diagnostics));
    if tokens.is_empty() {
        return SingleGobbleResult::no_match();
    }
    let defaults: Vec<Option<String>> = (0..tokens.len())
        .map(|i| {
            emb.default_args
                .as_ref()
                .and_then(|d| d.get(i))
                .map(|d| print_spec_tokens(d))
        })
        .collect();

    let mut captures: Vec<Option<Capture>> = vec![None; tokens.len()];
    let mut curr = init_curr;
    let mut matched_any = false;

    loop {
        // Probe past whitespace, but only commit if a marker matches there
        let mut probe = curr;
        while nodes.get(probe).map(Node::is_whitespace).unwrap_or(false) {
            probe += 1;
        }
        match nodes.get(probe) {
            None => break,
            Some(node) if node.is_comment() || node.is_parbreak() => break,
            Some(_) => {}
        }
        let Some(slot) = (0..tokens.len())
            .find(|&i| captures[i].is_none() && marker_matches(nodes, probe, &tokens[i]))
        else {
            break;
        };

        // The marker now occupies exactly the node at `probe`; its content
        // is the next gobbleable token.
        let mut content_pos = probe + 1;
        while nodes
            .get(content_pos)
            .map(Node::is_whitespace)
            .unwrap_or(false)
        {
            content_pos += 1;
        }
        // One character of a string run is one token; groups and macros
        // are taken whole
        let split_char: Option<Option<String>> = match nodes.get(content_pos) {
            Some(Node::Group(_)) | Some(Node::Macro(_)) => Some(None),
            Some(Node::String(s)) => Some(Some(s.content.chars().take(1).collect())),
            _ => None,
        };
        let capture = match split_char {
            Some(first) => {
                if let Some(first) = first {
                    match_literal(nodes, content_pos, &first);
                }
                curr = content_pos + 1;
                Capture {
                    content_pos: Some(content_pos),
                }
            }
            None => {
                curr = probe + 1;
                Capture { content_pos: None }
            }
        };
        captures[slot] = Some(capture);
        matched_any = true;
    }

    if !matched_any {
        return SingleGobbleResult::no_match();
    }

    let end = curr;
    let removed: Vec<Node> = nodes.drain(start_pos..end).collect();
    let mut pool: Vec<Option<Node>> = removed.into_iter().map(Some).collect();

    let args: Vec<Argument> = captures
        .iter()
        .zip(tokens.iter())
        .zip(defaults.iter())
        .map(|((capture, token), default)| match capture {
            None => Argument::blank_with_default(default.clone()),
            Some(capture) => {
                let content = match capture.content_pos {
                    None => Vec::new(),
                    Some(pos) => {
                        let node = pool[pos - start_pos]
                            .take()
                            .expect("content node consumed once");
                        match node {
                            Node::Group(group) => group.content,
                            other => vec![other],
                        }
                    }
                };
                Argument::new(content, token.clone(), "")
            }
        })
        .collect();

    SingleGobbleResult {
        argument: Some(Gobbled::Embellishments(args)),
        nodes_removed: end - start_pos,
    }
}

/// Does the declared marker `token` match at `nodes[pos]`? On a string
/// match the node is split so the marker stands alone.
fn marker_matches(nodes: &mut Vec<Node>, pos: usize, token: &str) -> bool {
    if let Some(name) = token.strip_prefix('\\') {
        return matches!(nodes.get(pos), Some(Node::Macro(m))
            if m.name == name && m.effective_escape_token() == "\\");
    }
    // Script characters tokenize as escape-less macros in math mode
    if let Some(Node::Macro(m)) = nodes.get(pos) {
        return m.name == token && m.effective_escape_token().is_empty();
    }
    match_literal(nodes, pos, token).is_some()
}

/// The declared embellishment tokens, reduced to the single characters and
/// control sequences the matcher understands. Anything else is dropped,
/// with a warning when a diagnostics sink is supplied.
fn normalize_tokens(tokens: &[SpecToken], mut diagnostics: Option<&mut Diagnostics>) -> Vec<String> {
    let mut out = Vec::with_capacity(tokens.len());
    for token in tokens {
        let flat = match token {
            SpecToken::String(s) => Some(s.clone()),
            SpecToken::Group(inner) => {
                if inner
                    .iter()
                    .all(|t| matches!(t, SpecToken::String(_)))
                {
                    Some(print_spec_tokens(inner))
                } else {
                    None
                }
            }
        };
        match flat {
            Some(s) if s.chars().count() == 1 || s.starts_with('\\') => out.push(s),
            other => {
                if let Some(diag) = diagnostics.as_deref_mut() {
                    let text = other.unwrap_or_else(|| print_spec_tokens(std::slice::from_ref(token)));
                    diag.push_warning(Warning::malformed_embellishment_token(&text));
                }
            }
        }
    }
    out
}

/// Quiet normalization, for callers that only need the slot layout
pub(crate) fn normalized_embellishment_tokens(emb: &EmbellishmentArg) -> Vec<String> {
    normalize_tokens(&emb.tokens, None)
}

// =============================================================================
// String re-tokenization
// =============================================================================

/// Try to match `needle` starting exactly at the beginning of the string
/// node at `pos`, spanning into following string nodes. On success the
/// nodes are rearranged so the needle is exactly the node at `pos`, and
/// the index just past it is returned.
fn match_literal(nodes: &mut Vec<Node>, pos: usize, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    let mut matched_len = 0usize;
    let mut idx = pos;
    let split_at;
    loop {
        let content = match nodes.get(idx) {
            Some(Node::String(s)) => s.content.as_str(),
            _ => return None,
        };
        let want = &needle[matched_len..];
        if content.len() >= want.len() {
            if !content.starts_with(want) {
                return None;
            }
            split_at = want.len();
            break;
        }
        if !want.starts_with(content) {
            return None;
        }
        matched_len += content.len();
        idx += 1;
    }

    let last_len = match &nodes[idx] {
        Node::String(s) => s.content.len(),
        _ => unreachable!("matched nodes are strings"),
    };
    if idx == pos && split_at == last_len {
        // Already one exact token; keep it (and its position) as is
        return Some(pos + 1);
    }
    let tail = match &nodes[idx] {
        Node::String(s) => s.content[split_at..].to_string(),
        _ => unreachable!("matched nodes are strings"),
    };
    let mut replacement = vec![Node::string(needle)];
    if !tail.is_empty() {
        replacement.push(Node::string(tail));
    }
    nodes.splice(pos..=idx, replacement);
    Some(pos + 1)
}

/// Can `needle` be read starting at byte `byte_off` of the string node at
/// `idx`, spanning into following string nodes?
fn literal_matches_at(nodes: &[Node], idx: usize, byte_off: usize, needle: &str) -> bool {
    let mut matched = 0usize;
    let mut i = idx;
    let mut off = byte_off;
    while matched < needle.len() {
        let Some(Node::String(s)) = nodes.get(i) else {
            return false;
        };
        let avail = &s.content[off..];
        let want = &needle[matched..];
        if avail.len() >= want.len() {
            return avail.starts_with(want);
        }
        if !want.starts_with(avail) {
            return false;
        }
        matched += avail.len();
        i += 1;
        off = 0;
    }
    true
}

/// Split so that the literal starting at byte `byte_off` of node `idx`
/// becomes its own node; returns that node's index
fn isolate_literal(nodes: &mut Vec<Node>, idx: usize, byte_off: usize, needle: &str) -> usize {
    let pos = if byte_off > 0 {
        let (prefix, rest) = match &nodes[idx] {
            Node::String(s) => (
                s.content[..byte_off].to_string(),
                s.content[byte_off..].to_string(),
            ),
            _ => unreachable!("splits happen inside string nodes"),
        };
        nodes.splice(idx..=idx, [Node::string(prefix), Node::string(rest)]);
        idx + 1
    } else {
        idx
    };
    match_literal(nodes, pos, needle).expect("verified by literal_matches_at");
    pos
}

/// Find the first occurrence of `needle` at or after `from`, at any offset
/// inside a run of string nodes. The needle is split into its own node and
/// its index returned.
fn find_string_literal(nodes: &mut Vec<Node>, from: usize, needle: &str) -> Option<usize> {
    let mut idx = from;
    while idx < nodes.len() {
        if let Node::String(s) = &nodes[idx] {
            let offsets: Vec<usize> = s.content.char_indices().map(|(o, _)| o).collect();
            for byte_off in offsets {
                if literal_matches_at(nodes, idx, byte_off, needle) {
                    return Some(isolate_literal(nodes, idx, byte_off, needle));
                }
            }
        }
        idx += 1;
    }
    None
}

/// Find the close mark matching an already-consumed open mark, honoring
/// nesting when the two marks differ. Marks found along the way are split
/// into standalone nodes.
fn find_closing_mark(
    nodes: &mut Vec<Node>,
    from: usize,
    open: &str,
    close: &str,
) -> Option<usize> {
    let mut depth = 0usize;
    let mut idx = from;
    while idx < nodes.len() {
        let Some(Node::String(s)) = nodes.get(idx) else {
            idx += 1;
            continue;
        };
        let offsets: Vec<usize> = s.content.char_indices().map(|(o, _)| o).collect();
        let mut advanced = false;
        for byte_off in offsets {
            let open_here = open != close && literal_matches_at(nodes, idx, byte_off, open);
            let close_here = !open_here && literal_matches_at(nodes, idx, byte_off, close);
            if !open_here && !close_here {
                continue;
            }
            let mark = if open_here { open } else { close };
            let mark_pos = isolate_literal(nodes, idx, byte_off, mark);
            if close_here {
                if depth == 0 {
                    return Some(mark_pos);
                }
                depth -= 1;
            } else {
                depth += 1;
            }
            idx = mark_pos + 1;
            advanced = true;
            break;
        }
        if !advanced {
            idx += 1;
        }
    }
    None
}
