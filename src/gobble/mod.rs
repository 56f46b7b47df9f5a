//! Argument gobbling
//!
//! Consuming tokens that follow a macro according to its parsed signature.
//! [`single::gobble_single_argument`] handles one spec node;
//! [`arguments::gobble_arguments`] drives a whole signature and fills the
//! slots a macro declares.

mod arguments;
mod single;

pub use arguments::{gobble_arguments, ArgumentParser, GobbledArguments, Signature};
pub use single::{gobble_single_argument, Gobbled, SingleGobbleResult};
