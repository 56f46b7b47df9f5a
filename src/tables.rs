//! Macro and environment signature tables
//!
//! A table maps a macro or environment name to what the attachment pass
//! needs to know about it: the argument signature, optional render info
//! for downstream consumers, and (for macros) the escape token that must
//! accompany the name for a match.
//!
//! A built-in table covering the common LaTeX kernel and amsmath commands
//! ships with the crate; callers merge their own entries on top.

use crate::gobble::Signature;
use indexmap::IndexMap;
use lazy_static::lazy_static;
use phf::phf_map;
use serde_json::{json, Value};

/// Everything the attachment pass knows about one macro name
#[derive(Debug, Clone, Default)]
pub struct MacroInfo {
    /// How the macro's arguments are declared; `None` means it takes none
    pub signature: Option<Signature>,
    /// Advisory metadata merged into every matched macro node
    pub render_info: Option<Value>,
    /// Escape token required for a match; `None` means the usual `\`
    pub escape_token: Option<String>,
}

impl MacroInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_signature(signature: impl Into<Signature>) -> Self {
        MacroInfo {
            signature: Some(signature.into()),
            ..Self::default()
        }
    }

    pub fn with_render_info(mut self, render_info: Value) -> Self {
        self.render_info = Some(render_info);
        self
    }

    pub fn with_escape_token(mut self, escape_token: impl Into<String>) -> Self {
        self.escape_token = Some(escape_token.into());
        self
    }

    /// The escape token this entry matches, with the `\` default applied
    pub fn effective_escape_token(&self) -> &str {
        self.escape_token.as_deref().unwrap_or("\\")
    }
}

/// Everything the attachment pass knows about one environment name
#[derive(Debug, Clone, Default)]
pub struct EnvInfo {
    /// Arguments gobbled from the front of the environment body
    pub signature: Option<Signature>,
    /// Advisory metadata merged into every matched environment node
    pub render_info: Option<Value>,
}

impl EnvInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_signature(signature: impl Into<Signature>) -> Self {
        EnvInfo {
            signature: Some(signature.into()),
            ..Self::default()
        }
    }

    pub fn with_render_info(mut self, render_info: Value) -> Self {
        self.render_info = Some(render_info);
        self
    }
}

/// Signature table for macros, keyed by name
pub type MacroInfoRecord = IndexMap<String, MacroInfo>;

/// Signature table for environments, keyed by name
pub type EnvInfoRecord = IndexMap<String, EnvInfo>;

/// xparse signatures for common LaTeX kernel, graphicx, xcolor and
/// amsmath macros
static MACRO_SIGNATURES: phf::Map<&'static str, &'static str> = phf_map! {
    // Font and text commands
    "textbf" => "m",
    "textit" => "m",
    "textrm" => "m",
    "textsf" => "m",
    "texttt" => "m",
    "textsc" => "m",
    "textsl" => "m",
    "textnormal" => "m",
    "textsuperscript" => "m",
    "textsubscript" => "m",
    "emph" => "m",
    "underline" => "m",
    "mbox" => "m",
    "fbox" => "m",
    "phantom" => "m",

    // Preamble and document structure
    "documentclass" => "o m",
    "usepackage" => "o m",
    "title" => "m",
    "author" => "m",
    "date" => "m",
    "section" => "s o m",
    "subsection" => "s o m",
    "subsubsection" => "s o m",
    "paragraph" => "s o m",
    "chapter" => "s o m",
    "part" => "s o m",
    "caption" => "o m",
    "footnote" => "o m",
    "item" => "o",

    // Cross references and citations
    "label" => "m",
    "ref" => "m",
    "eqref" => "m",
    "pageref" => "m",
    "cite" => "o m",
    "citep" => "o m",
    "citet" => "o m",

    // Boxes and spacing
    "hspace" => "s m",
    "vspace" => "s m",
    "rule" => "o m m",
    "parbox" => "o m m",
    "makebox" => "o o m",
    "framebox" => "o o m",
    "setlength" => "m m",

    // Graphics and color
    "includegraphics" => "s o m",
    "textcolor" => "o m m",
    "color" => "o m",
    "colorbox" => "o m m",
    "definecolor" => "m m m",

    // Math commands
    "frac" => "m m",
    "dfrac" => "m m",
    "tfrac" => "m m",
    "binom" => "m m",
    "sqrt" => "o m",
    "overline" => "m",
    "overbrace" => "m",
    "underbrace" => "m",
    "hat" => "m",
    "bar" => "m",
    "vec" => "m",
    "dot" => "m",
    "ddot" => "m",
    "tilde" => "m",
    "mathbb" => "m",
    "mathbf" => "m",
    "mathcal" => "m",
    "mathfrak" => "m",
    "mathrm" => "m",
    "mathsf" => "m",
    "mathscr" => "m",
    "operatorname" => "s m",
    "stackrel" => "m m",
    "substack" => "m",
    "boldsymbol" => "m",
    "pmb" => "m",

    // Definitions (the declaration itself takes arguments; the defined
    // macro's behavior is out of scope here)
    "newcommand" => "s m o o m",
    "renewcommand" => "s m o o m",
    "providecommand" => "s m o o m",
    "newenvironment" => "s m o o m m",
    "renewenvironment" => "s m o o m m",
    "NewDocumentCommand" => "m m m",
    "RenewDocumentCommand" => "m m m",
    "DeclareMathOperator" => "s m m",
};

/// Environment signatures: arguments gobbled from the body start
static ENVIRONMENT_SIGNATURES: phf::Map<&'static str, &'static str> = phf_map! {
    "tabular" => "o m",
    "tabular*" => "m o m",
    "array" => "o m",
    "figure" => "o",
    "figure*" => "o",
    "table" => "o",
    "table*" => "o",
    "minipage" => "o o o m",
    "itemize" => "o",
    "enumerate" => "o",
    "description" => "o",
    "thebibliography" => "m",
    "multicols" => "m o",
    "alignat" => "m",
    "alignat*" => "m",
};

/// Section-like macros get a break-around hint for renderers
const BREAK_AROUND_MACROS: &[&str] = &[
    "section",
    "subsection",
    "subsubsection",
    "paragraph",
    "chapter",
    "part",
];

lazy_static! {
    /// Ready-made macro table for common LaTeX
    pub static ref BUILTIN_MACROS: MacroInfoRecord = build_builtin_macros();

    /// Ready-made environment table for common LaTeX
    pub static ref BUILTIN_ENVIRONMENTS: EnvInfoRecord = build_builtin_environments();
}

fn build_builtin_macros() -> MacroInfoRecord {
    let mut table: MacroInfoRecord = MACRO_SIGNATURES
        .entries()
        .map(|(name, signature)| ((*name).to_string(), MacroInfo::with_signature(*signature)))
        .collect();
    for name in BREAK_AROUND_MACROS {
        if let Some(info) = table.get_mut(*name) {
            info.render_info = Some(json!({ "breakAround": true }));
        }
    }
    // TeX's sub/superscript characters act as macros with an empty escape
    // token in math mode
    for name in ["^", "_"] {
        table.insert(
            name.to_string(),
            MacroInfo::with_signature("m").with_escape_token(""),
        );
    }
    table
}

fn build_builtin_environments() -> EnvInfoRecord {
    ENVIRONMENT_SIGNATURES
        .entries()
        .map(|(name, signature)| ((*name).to_string(), EnvInfo::with_signature(*signature)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_tables_have_expected_entries() {
        assert!(BUILTIN_MACROS.contains_key("frac"));
        assert!(BUILTIN_MACROS.contains_key("sqrt"));
        assert!(BUILTIN_ENVIRONMENTS.contains_key("tabular"));
    }

    #[test]
    fn test_builtin_signatures_parse() {
        // Every shipped signature must be valid
        for (name, info) in BUILTIN_MACROS.iter() {
            let Some(Signature::Spec(spec)) = &info.signature else {
                panic!("builtin macro '{}' should carry a spec string", name);
            };
            assert!(
                crate::argspec::parse(spec).is_ok(),
                "signature for '{}' failed to parse",
                name
            );
        }
        for (name, info) in BUILTIN_ENVIRONMENTS.iter() {
            let Some(Signature::Spec(spec)) = &info.signature else {
                panic!("builtin environment '{}' should carry a spec string", name);
            };
            assert!(
                crate::argspec::parse(spec).is_ok(),
                "signature for '{}' failed to parse",
                name
            );
        }
    }

    #[test]
    fn test_script_macros_use_empty_escape() {
        let caret = &BUILTIN_MACROS["^"];
        assert_eq!(caret.effective_escape_token(), "");
        let frac = &BUILTIN_MACROS["frac"];
        assert_eq!(frac.effective_escape_token(), "\\");
    }

    #[test]
    fn test_section_render_info() {
        let section = &BUILTIN_MACROS["section"];
        assert_eq!(
            section.render_info,
            Some(json!({ "breakAround": true }))
        );
    }
}
