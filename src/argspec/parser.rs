//! Parser for xparse signature strings
//!
//! The grammar is a flat run of single-letter argument kinds, each with
//! kind-specific trailing tokens. Tokens are single characters, control
//! sequences, or `{...}` collections. Whitespace between argument kinds is
//! insignificant.

use super::{
    ArgSpec, BracedArg, EmbellishmentArg, SpecToken, StarArg, TokenArg, UntilArg, VerbatimArg,
};
use crate::error::{Error, Result};

/// Parse a signature string into spec nodes
pub fn parse(signature: &str) -> Result<Vec<ArgSpec>> {
    Parser::new(signature).run()
}

struct Parser<'a> {
    signature: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(signature: &'a str) -> Self {
        Parser {
            signature,
            chars: signature.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::bad_signature(self.signature, message, self.pos)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().map(|c| c.is_whitespace()).unwrap_or(false) {
            self.pos += 1;
        }
    }

    fn run(&mut self) -> Result<Vec<ArgSpec>> {
        let mut specs = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek().is_none() {
                break;
            }
            specs.push(self.read_spec()?);
        }
        Ok(specs)
    }

    fn read_spec(&mut self) -> Result<ArgSpec> {
        let no_leading_whitespace = if self.peek() == Some('!') {
            self.next();
            true
        } else {
            false
        };
        let Some(kind) = self.next() else {
            return Err(self.error("dangling '!' with no argument kind"));
        };

        let spec = match kind {
            'm' => ArgSpec::Mandatory(BracedArg {
                no_leading_whitespace,
                ..BracedArg::mandatory()
            }),
            'r' | 'R' => {
                let open_brace = self.read_delimiter()?;
                let close_brace = self.read_delimiter()?;
                let default_arg = if kind == 'R' {
                    Some(self.read_default()?)
                } else {
                    None
                };
                ArgSpec::Mandatory(BracedArg {
                    open_brace,
                    close_brace,
                    default_arg,
                    no_leading_whitespace,
                })
            }
            'o' => ArgSpec::Optional(BracedArg {
                no_leading_whitespace,
                ..BracedArg::optional()
            }),
            'O' => ArgSpec::Optional(BracedArg {
                default_arg: Some(self.read_default()?),
                no_leading_whitespace,
                ..BracedArg::optional()
            }),
            'd' | 'D' => {
                let open_brace = self.read_delimiter()?;
                let close_brace = self.read_delimiter()?;
                let default_arg = if kind == 'D' {
                    Some(self.read_default()?)
                } else {
                    None
                };
                ArgSpec::Optional(BracedArg {
                    open_brace,
                    close_brace,
                    default_arg,
                    no_leading_whitespace,
                })
            }
            's' => ArgSpec::OptionalStar(StarArg {
                no_leading_whitespace,
            }),
            't' => ArgSpec::OptionalToken(TokenArg {
                token: self.read_delimiter()?,
                no_leading_whitespace,
            }),
            'v' => {
                self.reject_modifier(no_leading_whitespace, 'v')?;
                ArgSpec::Verbatim(VerbatimArg {
                    open_brace: self.read_delimiter()?,
                })
            }
            'u' => {
                self.reject_modifier(no_leading_whitespace, 'u')?;
                let stop_tokens = match self.read_token()? {
                    SpecToken::Group(tokens) => tokens,
                    token => vec![token],
                };
                ArgSpec::Until(UntilArg { stop_tokens })
            }
            'e' | 'E' => {
                self.reject_modifier(no_leading_whitespace, kind)?;
                let tokens = match self.read_token()? {
                    SpecToken::Group(tokens) => tokens,
                    token => vec![token],
                };
                let default_args = if kind == 'E' {
                    let defaults = self.read_default()?;
                    Some(
                        defaults
                            .into_iter()
                            .map(|d| match d {
                                SpecToken::Group(inner) => inner,
                                token => vec![token],
                            })
                            .collect(),
                    )
                } else {
                    None
                };
                ArgSpec::Embellishment(EmbellishmentArg {
                    tokens,
                    default_args,
                })
            }
            'b' => {
                self.reject_modifier(no_leading_whitespace, 'b')?;
                ArgSpec::Body
            }
            other => {
                return Err(self.error(format!("unknown argument kind '{}'", other)));
            }
        };
        Ok(spec)
    }

    fn reject_modifier(&self, no_leading_whitespace: bool, kind: char) -> Result<()> {
        if no_leading_whitespace {
            Err(self.error(format!("'!' cannot modify argument kind '{}'", kind)))
        } else {
            Ok(())
        }
    }

    /// One signature token: a `{...}` collection, a control sequence, or a
    /// single character
    fn read_token(&mut self) -> Result<SpecToken> {
        let Some(c) = self.next() else {
            return Err(self.error("expected a token, found end of signature"));
        };
        match c {
            '{' => {
                let mut items = Vec::new();
                loop {
                    match self.peek() {
                        None => return Err(self.error("unclosed '{' in signature")),
                        Some('}') => {
                            self.next();
                            break;
                        }
                        Some(_) => items.push(self.read_token()?),
                    }
                }
                Ok(SpecToken::Group(items))
            }
            '\\' => {
                let mut name = String::from("\\");
                match self.peek() {
                    Some(c) if c.is_alphabetic() => {
                        while let Some(c) = self.peek() {
                            if c.is_alphabetic() {
                                name.push(c);
                                self.next();
                            } else {
                                break;
                            }
                        }
                    }
                    Some(c) => {
                        name.push(c);
                        self.next();
                    }
                    None => return Err(self.error("lone '\\' at end of signature")),
                }
                Ok(SpecToken::String(name))
            }
            c => Ok(SpecToken::String(c.to_string())),
        }
    }

    /// A delimiter: one token, flattened to its literal text (a `{((}`
    /// collection becomes the two-character mark `((`)
    fn read_delimiter(&mut self) -> Result<String> {
        let token = self.read_token()?;
        self.flatten_delimiter(&token)
    }

    fn flatten_delimiter(&self, token: &SpecToken) -> Result<String> {
        match token {
            SpecToken::String(s) => Ok(s.clone()),
            SpecToken::Group(items) => {
                let mut out = String::new();
                for item in items {
                    match item {
                        SpecToken::String(s) => out.push_str(s),
                        SpecToken::Group(_) => {
                            return Err(
                                self.error("delimiters cannot contain nested groups")
                            );
                        }
                    }
                }
                Ok(out)
            }
        }
    }

    /// A `{default}` group following `O`, `D`, `R` or `E`
    fn read_default(&mut self) -> Result<Vec<SpecToken>> {
        match self.read_token()? {
            SpecToken::Group(tokens) => Ok(tokens),
            _ => Err(self.error("expected a braced default value")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_kinds() {
        let specs = parse("o m s b").unwrap();
        assert!(matches!(specs[0], ArgSpec::Optional(_)));
        assert!(matches!(specs[1], ArgSpec::Mandatory(_)));
        assert!(matches!(specs[2], ArgSpec::OptionalStar(_)));
        assert!(matches!(specs[3], ArgSpec::Body));
    }

    #[test]
    fn test_no_leading_whitespace_flag() {
        let specs = parse("!o o").unwrap();
        assert!(specs[0].no_leading_whitespace());
        assert!(!specs[1].no_leading_whitespace());
    }

    #[test]
    fn test_custom_braces() {
        let specs = parse("r()").unwrap();
        let ArgSpec::Mandatory(b) = &specs[0] else {
            panic!("expected mandatory");
        };
        assert_eq!(b.open_brace, "(");
        assert_eq!(b.close_brace, ")");
        assert!(b.default_arg.is_none());
    }

    #[test]
    fn test_multichar_braces() {
        let specs = parse("d{((}{))}").unwrap();
        let ArgSpec::Optional(b) = &specs[0] else {
            panic!("expected optional");
        };
        assert_eq!(b.open_brace, "((");
        assert_eq!(b.close_brace, "))");
    }

    #[test]
    fn test_optional_with_default() {
        let specs = parse("O{x}").unwrap();
        let ArgSpec::Optional(b) = &specs[0] else {
            panic!("expected optional");
        };
        assert_eq!(b.open_brace, "[");
        assert_eq!(
            b.default_arg,
            Some(vec![SpecToken::string("x")])
        );
    }

    #[test]
    fn test_mandatory_with_default() {
        let specs = parse("R(){def}").unwrap();
        let ArgSpec::Mandatory(b) = &specs[0] else {
            panic!("expected mandatory");
        };
        assert_eq!(b.open_brace, "(");
        assert_eq!(b.default_arg.as_ref().unwrap().len(), 3);
    }

    #[test]
    fn test_embellishment_tokens() {
        let specs = parse("e{^_}").unwrap();
        let ArgSpec::Embellishment(e) = &specs[0] else {
            panic!("expected embellishment");
        };
        assert_eq!(
            e.tokens,
            vec![SpecToken::string("^"), SpecToken::string("_")]
        );
        assert!(e.default_args.is_none());
    }

    #[test]
    fn test_embellishment_with_defaults() {
        let specs = parse("E{^_}{{up}{down}}").unwrap();
        let ArgSpec::Embellishment(e) = &specs[0] else {
            panic!("expected embellishment");
        };
        let defaults = e.default_args.as_ref().unwrap();
        assert_eq!(defaults.len(), 2);
        assert_eq!(defaults[0].len(), 2);
    }

    #[test]
    fn test_embellishment_macro_token() {
        let specs = parse("e{\\bm}").unwrap();
        let ArgSpec::Embellishment(e) = &specs[0] else {
            panic!("expected embellishment");
        };
        assert_eq!(e.tokens, vec![SpecToken::string("\\bm")]);
    }

    #[test]
    fn test_until_stop_forms() {
        let specs = parse("u;").unwrap();
        let ArgSpec::Until(u) = &specs[0] else {
            panic!("expected until");
        };
        assert_eq!(u.stop_tokens, vec![SpecToken::string(";")]);

        let specs = parse("u{xx;}").unwrap();
        let ArgSpec::Until(u) = &specs[0] else {
            panic!("expected until");
        };
        assert_eq!(u.stop_tokens.len(), 3);
    }

    #[test]
    fn test_errors() {
        assert!(parse("q").is_err());
        assert!(parse("t").is_err());
        assert!(parse("O(x)").is_err());
        assert!(parse("e{^").is_err());
        assert!(parse("!u;").is_err());
        assert!(parse("!").is_err());
    }
}
