//! xparse argument-specification handling
//!
//! Parses signature strings such as `"o m o !o m"`, `"e{^_}"` or
//! `"D(){def}"` into typed spec nodes, prints them back out, and memoizes
//! parses behind an explicit cache.
//!
//! The printed form is canonical: it re-parses to an equal spec list, but
//! is not guaranteed byte-identical to arbitrary input (it is for the
//! usual compact forms).

mod parser;

pub use parser::parse;

use crate::error::Result;
use fxhash::FxHashMap;
use lazy_static::lazy_static;
use regex::Regex;
use std::rc::Rc;

/// One token inside a signature: either a character run / control sequence,
/// or a `{...}` collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecToken {
    String(String),
    Group(Vec<SpecToken>),
}

impl SpecToken {
    pub fn string(s: impl Into<String>) -> Self {
        SpecToken::String(s.into())
    }
}

/// A mandatory or optional argument delimited by braces
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BracedArg {
    pub open_brace: String,
    pub close_brace: String,
    /// Declared default value (`O`/`D`/`R` forms)
    pub default_arg: Option<Vec<SpecToken>>,
    /// The `!` decorator: match must start immediately, without skipping
    /// leading whitespace
    pub no_leading_whitespace: bool,
}

impl BracedArg {
    fn new(open_brace: impl Into<String>, close_brace: impl Into<String>) -> Self {
        BracedArg {
            open_brace: open_brace.into(),
            close_brace: close_brace.into(),
            default_arg: None,
            no_leading_whitespace: false,
        }
    }

    /// Standard `{}`-delimited mandatory argument
    pub fn mandatory() -> Self {
        BracedArg::new("{", "}")
    }

    /// Standard `[]`-delimited optional argument
    pub fn optional() -> Self {
        BracedArg::new("[", "]")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StarArg {
    pub no_leading_whitespace: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenArg {
    pub token: String,
    pub no_leading_whitespace: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerbatimArg {
    pub open_brace: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UntilArg {
    pub stop_tokens: Vec<SpecToken>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbellishmentArg {
    /// The declared marker tokens, in declaration order
    pub tokens: Vec<SpecToken>,
    /// Per-token defaults (`E` form), index-aligned with `tokens`
    pub default_args: Option<Vec<Vec<SpecToken>>>,
}

/// A parsed argument-specification node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgSpec {
    /// `m`, `r<t1><t2>`, `R<t1><t2>{default}`
    Mandatory(BracedArg),
    /// `o`, `O{default}`, `d<t1><t2>`, `D<t1><t2>{default}`
    Optional(BracedArg),
    /// `s`
    OptionalStar(StarArg),
    /// `t<token>`
    OptionalToken(TokenArg),
    /// `v<open>`
    Verbatim(VerbatimArg),
    /// `u<stop>` / `u{<stop...>}`
    Until(UntilArg),
    /// `e{tokens}` / `E{tokens}{defaults}`
    Embellishment(EmbellishmentArg),
    /// `b`; matches nothing structurally
    Body,
}

impl ArgSpec {
    /// Whether leading whitespace may be skipped before matching this
    /// argument
    pub fn no_leading_whitespace(&self) -> bool {
        match self {
            ArgSpec::Mandatory(b) | ArgSpec::Optional(b) => b.no_leading_whitespace,
            ArgSpec::OptionalStar(s) => s.no_leading_whitespace,
            ArgSpec::OptionalToken(t) => t.no_leading_whitespace,
            ArgSpec::Verbatim(_)
            | ArgSpec::Until(_)
            | ArgSpec::Embellishment(_)
            | ArgSpec::Body => false,
        }
    }

    /// Number of argument slots this spec contributes to a gobbled
    /// argument list
    pub fn slot_count(&self) -> usize {
        match self {
            ArgSpec::Embellishment(e) => e.tokens.len(),
            _ => 1,
        }
    }
}

// =============================================================================
// Printing
// =============================================================================

lazy_static! {
    /// Output ending in a bare control word, which would swallow a
    /// following letter or digit on re-parse
    static ref CONTROL_WORD_TAIL: Regex = Regex::new(r"\\[A-Za-z]+$").unwrap();
}

/// Print a spec list back to signature-string form.
///
/// With `root` set, top-level nodes are joined with single spaces, matching
/// the usual way signatures are written.
pub fn print_raw(specs: &[ArgSpec], root: bool) -> String {
    let printed: Vec<String> = specs.iter().map(print_one).collect();
    printed.join(if root { " " } else { "" })
}

fn print_one(spec: &ArgSpec) -> String {
    let mut out = String::new();
    if spec.no_leading_whitespace() {
        out.push('!');
    }
    match spec {
        ArgSpec::Mandatory(b) => {
            if let Some(default) = &b.default_arg {
                out.push('R');
                push_delimiter(&mut out, &b.open_brace);
                push_delimiter(&mut out, &b.close_brace);
                out.push('{');
                out.push_str(&print_spec_tokens(default));
                out.push('}');
            } else if b.open_brace == "{" && b.close_brace == "}" {
                out.push('m');
            } else {
                out.push('r');
                push_delimiter(&mut out, &b.open_brace);
                push_delimiter(&mut out, &b.close_brace);
            }
        }
        ArgSpec::Optional(b) => {
            let default_braces = b.open_brace == "[" && b.close_brace == "]";
            match (&b.default_arg, default_braces) {
                (Some(default), true) => {
                    out.push('O');
                    out.push('{');
                    out.push_str(&print_spec_tokens(default));
                    out.push('}');
                }
                (Some(default), false) => {
                    out.push('D');
                    push_delimiter(&mut out, &b.open_brace);
                    push_delimiter(&mut out, &b.close_brace);
                    out.push('{');
                    out.push_str(&print_spec_tokens(default));
                    out.push('}');
                }
                (None, true) => out.push('o'),
                (None, false) => {
                    out.push('d');
                    push_delimiter(&mut out, &b.open_brace);
                    push_delimiter(&mut out, &b.close_brace);
                }
            }
        }
        ArgSpec::OptionalStar(_) => out.push('s'),
        ArgSpec::OptionalToken(t) => {
            out.push('t');
            push_delimiter(&mut out, &t.token);
        }
        ArgSpec::Verbatim(v) => {
            out.push('v');
            push_delimiter(&mut out, &v.open_brace);
        }
        ArgSpec::Until(u) => {
            out.push('u');
            match u.stop_tokens.as_slice() {
                [SpecToken::String(s)] if s.chars().count() == 1 && !s.starts_with('\\') => {
                    out.push_str(s);
                }
                tokens => {
                    out.push('{');
                    out.push_str(&print_spec_tokens(tokens));
                    out.push('}');
                }
            }
        }
        ArgSpec::Embellishment(e) => {
            out.push(if e.default_args.is_some() { 'E' } else { 'e' });
            out.push('{');
            out.push_str(&print_spec_tokens(&e.tokens));
            out.push('}');
            if let Some(defaults) = &e.default_args {
                out.push('{');
                for default in defaults {
                    out.push('{');
                    out.push_str(&print_spec_tokens(default));
                    out.push('}');
                }
                out.push('}');
            }
        }
        ArgSpec::Body => out.push('b'),
    }
    out
}

/// Print a token run, wrapping where a bare character would otherwise be
/// swallowed into a preceding control word on re-parse
pub fn print_spec_tokens(tokens: &[SpecToken]) -> String {
    let mut out = String::new();
    for token in tokens {
        match token {
            SpecToken::String(s) => {
                if CONTROL_WORD_TAIL.is_match(&out)
                    && s.chars().count() == 1
                    && !s.starts_with('\\')
                {
                    out.push('{');
                    out.push_str(s);
                    out.push('}');
                } else {
                    out.push_str(s);
                }
            }
            SpecToken::Group(inner) => {
                out.push('{');
                out.push_str(&print_spec_tokens(inner));
                out.push('}');
            }
        }
    }
    out
}

/// Print a delimiter token: single characters and control sequences print
/// bare, anything longer needs a brace wrapper to stay one token
fn push_delimiter(out: &mut String, delimiter: &str) {
    if delimiter.chars().count() == 1 || delimiter.starts_with('\\') {
        out.push_str(delimiter);
    } else {
        out.push('{');
        out.push_str(delimiter);
        out.push('}');
    }
}

// =============================================================================
// Parse cache
// =============================================================================

/// Memoizing wrapper around [`parse`], keyed by the exact signature string.
///
/// Cached parses are shared read-only; callers that need to mutate a spec
/// list must clone the inner data first.
#[derive(Debug, Clone, Default)]
pub struct ArgSpecCache {
    cache: FxHashMap<String, Rc<Vec<ArgSpec>>>,
}

impl ArgSpecCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `signature`, reusing a previous parse of the same string
    pub fn parse(&mut self, signature: &str) -> Result<Rc<Vec<ArgSpec>>> {
        if let Some(cached) = self.cache.get(signature) {
            return Ok(Rc::clone(cached));
        }
        let parsed = Rc::new(parse(signature)?);
        self.cache
            .insert(signature.to_string(), Rc::clone(&parsed));
        Ok(parsed)
    }

    /// Number of distinct signatures parsed so far
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_corpus() {
        // Signatures print back exactly as written
        for signature in [
            "o m o !o m",
            "m e{^}",
            "d++ D--{def}",
            "u{xx;}",
            "e{^_}",
            "r()",
            "R(){def}",
            "O{x}",
            "s t+ v|",
            "m m b",
            "u;",
        ] {
            let parsed = parse(signature).unwrap();
            assert_eq!(print_raw(&parsed, true), signature, "signature: {}", signature);
        }
    }

    #[test]
    fn test_reparse_equals_parse() {
        for signature in ["o m", "E{^_}{{up}{down}}", "!o !m", "D(){default}", "u{ }"] {
            let parsed = parse(signature).unwrap();
            let reparsed = parse(&print_raw(&parsed, true)).unwrap();
            assert_eq!(parsed, reparsed, "signature: {}", signature);
        }
    }

    #[test]
    fn test_control_word_wrap_on_print() {
        let tokens = vec![SpecToken::string("\\foo"), SpecToken::string("x")];
        assert_eq!(print_spec_tokens(&tokens), "\\foo{x}");
        // No wrapping needed after a non-word token
        let tokens = vec![SpecToken::string(";"), SpecToken::string("x")];
        assert_eq!(print_spec_tokens(&tokens), ";x");
    }

    #[test]
    fn test_multichar_delimiter_prints_braced() {
        let spec = ArgSpec::Mandatory(BracedArg::new("((", "))"));
        assert_eq!(print_raw(&[spec], true), "r{((}{))}");
    }

    #[test]
    fn test_cache_shares_parses() {
        let mut cache = ArgSpecCache::new();
        let a = cache.parse("o m").unwrap();
        let b = cache.parse("o m").unwrap();
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
        cache.parse("m m").unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_cache_propagates_errors() {
        let mut cache = ArgSpecCache::new();
        assert!(cache.parse("q").is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_slot_count() {
        let specs = parse("o m e{^_}").unwrap();
        let total: usize = specs.iter().map(|s| s.slot_count()).sum();
        assert_eq!(total, 4);
    }
}
