//! Gobble a macro's full argument list
//!
//! Drives the single-argument gobbler across a parsed signature, filling
//! the slots that did not match with blank arguments. The output always
//! has one entry per declared slot, in declaration order, no matter how
//! many slots actually matched or in which order embellishments appeared.

use super::single::{gobble_single_argument, normalized_embellishment_tokens, Gobbled};
use crate::argspec::{print_spec_tokens, ArgSpec, ArgSpecCache};
use crate::ast::{Argument, Node};
use crate::error::{Diagnostics, Result};
use std::fmt;
use std::sync::Arc;

/// Bespoke argument parsing for macros whose grammar the signature
/// language cannot express.
///
/// Implementations own the whole job: consume what they need from `nodes`
/// starting at `start_pos` and report every removed node in the result.
pub trait ArgumentParser {
    fn gobble(
        &self,
        nodes: &mut Vec<Node>,
        start_pos: usize,
        diagnostics: &mut Diagnostics,
    ) -> GobbledArguments;
}

/// How a macro or environment declares its arguments
#[derive(Clone)]
pub enum Signature {
    /// An xparse signature string, parsed on demand through the cache
    Spec(String),
    /// Already-parsed spec nodes
    Parsed(Vec<ArgSpec>),
    /// A custom parser plugged in through the signature table
    Custom(Arc<dyn ArgumentParser + Send + Sync>),
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signature::Spec(s) => f.debug_tuple("Spec").field(s).finish(),
            Signature::Parsed(specs) => f.debug_tuple("Parsed").field(specs).finish(),
            Signature::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl From<&str> for Signature {
    fn from(spec: &str) -> Self {
        Signature::Spec(spec.to_string())
    }
}

impl From<String> for Signature {
    fn from(spec: String) -> Self {
        Signature::Spec(spec)
    }
}

/// Result of [`gobble_arguments`]
#[derive(Debug, Clone, PartialEq)]
pub struct GobbledArguments {
    /// One argument per declared slot, in declaration order
    pub args: Vec<Argument>,
    /// Total nodes removed from the array starting at `start_pos`
    pub nodes_removed: usize,
}

/// Gobble every argument a signature declares, starting at `start_pos`.
///
/// Fails only when a signature string cannot be parsed; an argument that
/// simply is not present in the token stream produces a blank slot
/// instead.
pub fn gobble_arguments(
    nodes: &mut Vec<Node>,
    signature: &Signature,
    start_pos: usize,
    cache: &mut ArgSpecCache,
    diagnostics: &mut Diagnostics,
) -> Result<GobbledArguments> {
    match signature {
        Signature::Custom(parser) => Ok(parser.gobble(nodes, start_pos, diagnostics)),
        Signature::Spec(spec) => {
            // The cached parse is shared; it is only ever read here
            let specs = cache.parse(spec)?;
            Ok(gobble_parsed(nodes, &specs, start_pos, diagnostics))
        }
        Signature::Parsed(specs) => Ok(gobble_parsed(nodes, specs, start_pos, diagnostics)),
    }
}

fn gobble_parsed(
    nodes: &mut Vec<Node>,
    specs: &[ArgSpec],
    start_pos: usize,
    diagnostics: &mut Diagnostics,
) -> GobbledArguments {
    let mut args = Vec::new();
    let mut nodes_removed = 0;
    for spec in specs {
        // Earlier gobbles already shifted everything left, so each
        // argument starts at the same position.
        let result = gobble_single_argument(nodes, spec, start_pos, diagnostics);
        nodes_removed += result.nodes_removed;
        match result.argument {
            Some(Gobbled::Embellishments(list)) => args.extend(list),
            Some(Gobbled::Single(arg)) => args.push(arg),
            None => fill_blank_slots(spec, &mut args),
        }
    }
    GobbledArguments {
        args,
        nodes_removed,
    }
}

/// Fill the slots of a spec node that matched nothing at all
fn fill_blank_slots(spec: &ArgSpec, args: &mut Vec<Argument>) {
    match spec {
        ArgSpec::Embellishment(emb) => {
            let tokens = normalized_embellishment_tokens(emb);
            for i in 0..tokens.len() {
                let default = emb
                    .default_args
                    .as_ref()
                    .and_then(|d| d.get(i))
                    .map(|d| print_spec_tokens(d));
                args.push(Argument::blank_with_default(default));
            }
        }
        ArgSpec::Mandatory(b) | ArgSpec::Optional(b) => {
            let default = b.default_arg.as_ref().map(|d| print_spec_tokens(d));
            args.push(Argument::blank_with_default(default));
        }
        _ => args.push(Argument::blank()),
    }
}
