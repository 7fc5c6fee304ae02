//! Pattern parsing - wildcard, identifier, literal, tuple, slice, struct, enum, range, or patterns

use crate::ast::*;
use crate::Parser;
use corvus_lex::Token;

impl<'a> Parser<'a> {
    /// Parse pattern, including `p1 | p2 | ...` alternatives.
    pub fn parse_pattern(&mut self) -> Option<Pattern> {
        let first = self.parse_pattern_alt()?;

        if self.current_token() != Token::Pipe {
            return Some(first);
        }

        let mut alts = vec![first];
        while self.match_token(Token::Pipe) {
            alts.push(self.parse_pattern_alt()?);
        }
        Some(Pattern::Or(alts))
    }

    /// Parse a single pattern alternative (no top-level `|`).
    fn parse_pattern_alt(&mut self) -> Option<Pattern> {
        match self.current_token() {
            Token::Underscore => {
                self.advance();
                Some(Pattern::Wildcard)
            },
            Token::Mut => {
                self.advance();
                let name = self.parse_ident()?;
                Some(Pattern::Ident(name, Mutability::Mutable))
            },
            Token::Minus => {
                self.advance();
                match self.current_token() {
                    Token::Number(n) => {
                        self.advance();
                        self.finish_literal_pattern(Literal::Int(-(n as i64)))
                    },
                    Token::Float(f) => {
                        self.advance();
                        self.finish_literal_pattern(Literal::Float(-f))
                    },
                    _ => {
                        self.error("expected number after '-' in pattern");
                        None
                    },
                }
            },
            Token::Number(n) => {
                self.advance();
                self.finish_literal_pattern(Literal::Int(n as i64))
            },
            Token::Float(f) => {
                self.advance();
                self.finish_literal_pattern(Literal::Float(f))
            },
            Token::True => {
                self.advance();
                Some(Pattern::Literal(Literal::Bool(true)))
            },
            Token::False => {
                self.advance();
                Some(Pattern::Literal(Literal::Bool(false)))
            },
            Token::String(s) => {
                self.advance();
                Some(Pattern::Literal(Literal::String(s)))
            },
            Token::Char(c) => {
                self.advance();
                self.finish_literal_pattern(Literal::Char(c))
            },
            Token::LParen => {
                self.advance();

                if self.match_token(Token::RParen) {
                    return Some(Pattern::Tuple(Vec::new()));
                }

                let mut patterns = Vec::new();
                loop {
                    if let Some(pat) = self.parse_pattern() {
                        patterns.push(pat);
                    }
                    if !self.match_token(Token::Comma) {
                        break;
                    }
                }
                self.expect(Token::RParen)?;
                Some(Pattern::Tuple(patterns))
            },
            Token::LBracket => {
                self.advance();

                let mut patterns = Vec::new();
                while !self.is_at_end() && self.current_token() != Token::RBracket {
                    if let Some(pat) = self.parse_pattern() {
                        patterns.push(pat);
                    }
                    if !self.match_token(Token::Comma) {
                        break;
                    }
                }
                self.expect(Token::RBracket)?;
                Some(Pattern::Slice(patterns))
            },
            Token::Ident(_) | Token::Self_ | Token::SelfUpper | Token::Super | Token::Crate => {
                self.parse_path_pattern()
            },
            _ => {
                self.error("expected pattern");
                None
            },
        }
    }

    /// After a path (single- or multi-segment), disambiguate a bare lowercase
    /// binding from a unit/tuple/struct variant constructor pattern.
    fn parse_path_pattern(&mut self) -> Option<Pattern> {
        let path = self.parse_path();

        if self.match_token(Token::LParen) {
            let mut patterns = Vec::new();
            while !self.is_at_end() && self.current_token() != Token::RParen {
                if let Some(pat) = self.parse_pattern() {
                    patterns.push(pat);
                }
                if !self.match_token(Token::Comma) {
                    break;
                }
            }
            self.expect(Token::RParen)?;
            return Some(Pattern::TupleStruct(path, patterns));
        }

        if self.current_token() == Token::LBrace {
            self.advance();
            let mut fields = Vec::new();
            while !self.is_at_end() && self.current_token() != Token::RBrace {
                if self.match_token(Token::DotDot) {
                    break;
                }
                let field_name = self.parse_ident()?;
                let pattern = if self.match_token(Token::Colon) {
                    self.parse_pattern()?
                } else {
                    Pattern::Ident(field_name, Mutability::Immutable)
                };
                fields.push(FieldPattern {
                    field: field_name,
                    pattern,
                });
                if !self.match_token(Token::Comma) {
                    break;
                }
            }
            self.expect(Token::RBrace)?;
            return Some(Pattern::Struct(path, fields));
        }

        let pat = if path.segments.len() == 1 && !starts_with_uppercase(path.segments[0].ident.as_str())
        {
            Pattern::Ident(path.segments[0].ident, Mutability::Immutable)
        } else {
            Pattern::Path(path)
        };

        self.finish_range_pattern(pat)
    }

    fn finish_literal_pattern(&mut self, lit: Literal) -> Option<Pattern> {
        self.finish_range_pattern(Pattern::Literal(lit))
    }

    /// `lo..hi` / `lo..=hi`, where `lo` has already been parsed.
    fn finish_range_pattern(&mut self, lo: Pattern) -> Option<Pattern> {
        let inclusive = if self.match_token(Token::DotDotEq) {
            true
        } else if self.match_token(Token::DotDot) {
            false
        } else {
            return Some(lo);
        };

        let hi = self.parse_pattern_alt()?;
        Some(Pattern::Range(Box::new(lo), Box::new(hi), inclusive))
    }
}

fn starts_with_uppercase(name: &str) -> bool {
    name.chars().next().map_or(false, |c| c.is_uppercase())
}
