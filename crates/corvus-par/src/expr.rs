//! Expression parsing using Pratt Parsing (Top-Down Operator Precedence)
//!
//! This module provides the core Pratt parsing algorithm and comprehensive
//! tests for expression parsing in the Fax programming language.
//!
//! # Operator Precedence (lowest to highest)
//!
//! | Level | Operators | Associativity |
//! |-------|-----------|---------------|
//! | 1 | `||` | Left |
//! | 2 | `&&` | Left |
//! | 3 | `==`, `!=`, `<`, `<=`, `>`, `>=` | Left |
//! | 4 | `|` | Left |
//! | 5 | `^` | Left |
//! | 6 | `&` | Left |
//! | 7 | `<<`, `>>` | Left |
//! | 8 | `+`, `-` | Left |
//! | 9 | `*`, `/`, `%` | Left |
//!
//! # Example
//!
//! ```
//! // a + b * c parses as a + (b * c) because * has higher precedence
//! // a - b - c parses as (a - b) - c because - is left-associative
//! ```

use crate::ast::*;
use crate::Parser;
use corvus_lex::Token;
use corvus_util::Symbol;

/// Binding power levels for Pratt parsing
/// Higher numbers = tighter binding (higher precedence)
#[doc(hidden)]
pub mod bp {
    /// Minimum binding power (start of expression)
    pub const MIN: u8 = 0;

    /// Logical OR: ||
    pub const LOGICAL_OR: u8 = 2;

    /// Logical AND: &&
    pub const LOGICAL_AND: u8 = 4;

    /// Comparison: ==, !=, <, <=, >, >=
    pub const COMPARISON: u8 = 6;

    /// Bitwise OR: |
    pub const BITWISE_OR: u8 = 8;

    /// Bitwise XOR: ^
    pub const BITWISE_XOR: u8 = 10;

    /// Bitwise AND: &
    pub const BITWISE_AND: u8 = 12;

    /// Shift: <<, >>
    pub const SHIFT: u8 = 14;

    /// Additive: +, -
    pub const ADDITIVE: u8 = 16;

    /// Multiplicative: *, /, %
    pub const MULTIPLICATIVE: u8 = 18;

    /// Cast: as (tighter than multiplicative)
    pub const CAST: u8 = 22;

    /// Maximum binding power (for prefix operators)
    pub const MAX: u8 = 24;
}

impl<'a> Parser<'a> {
    // =========================================================================
    // MAIN EXPRESSION ENTRY POINTS (Public API)
    // =========================================================================

    /// Main expression entry point
    ///
    /// Parses a complete expression using Pratt parsing algorithm.
    /// This is the primary method for parsing expressions in statement context.
    ///
    /// # Returns
    ///
    /// `Ok(Expr)` if parsing succeeds, `Err(&'static str)` on failure
    ///
    /// # Example
    ///
    /// ```
    /// let expr = parser.parse_expression()?;
    /// ```
    pub fn parse_expression(&mut self) -> Result<Expr, &'static str> {
        // Delegate to existing implementation
        self.parse_expr().ok_or("failed to parse expression")
    }

    /// Parse expression with minimum binding power (Pratt parser core)
    ///
    /// This is the heart of the Pratt parsing algorithm. It parses an expression
    /// while respecting operator precedence. The `min_bp` parameter controls
    /// which operators will be parsed - only operators with left binding power
    /// >= min_bp will be consumed.
    ///
    /// # Algorithm
    ///
    /// 1. Parse a prefix expression (atom or unary) as the left-hand side
    /// 2. While the current operator has sufficient binding power:
    ///    - Get the operator's binding powers (left, right)
    ///    - Parse the right-hand side with right_bp as the new minimum
    ///    - Combine into a binary expression
    ///    - Continue with the result as the new left-hand side
    ///
    /// # Associativity
    ///
    /// - Left-associative: right_bp = left_bp + 1 (e.g., `a - b - c` = `(a - b) - c`)
    /// - Right-associative: right_bp = left_bp (e.g., `a = b = c` = `a = (b = c)`)
    ///
    /// # Arguments
    ///
    /// * `min_bp` - Minimum binding power for operators to consume
    ///
    /// # Returns
    ///
    /// `Ok(Expr)` - The parsed expression
    /// `Err(&'static str)` - Error message on failure
    pub fn parse_expression_bp(&mut self, min_bp: u8) -> Result<Expr, &'static str> {
        // Delegate to existing implementation
        self.parse_expr_with_min_bp(min_bp).ok_or("failed to parse expression")
    }

    /// Get binding powers for Pratt parsing
    ///
    /// Returns (left_binding_power, right_binding_power) for the current token.
    /// Higher numbers = tighter binding (higher precedence).
    ///
    /// For left-associative operators: right_bp = left_bp + 1
    /// For right-associative operators: right_bp = left_bp
    ///
    /// # Precedence Levels (lowest to highest)
    ///
    /// | Level | Operators | Left BP | Right BP |
    /// |-------|-----------|---------|----------|
    /// | 1 | `||` | 2 | 3 |
    /// | 2 | `&&` | 4 | 5 |
    /// | 3 | `==`, `!=`, `<`, `<=`, `>`, `>=` | 6 | 7 |
    /// | 4 | `|` | 8 | 9 |
    /// | 5 | `^` | 10 | 11 |
    /// | 6 | `&` | 12 | 13 |
    /// | 7 | `<<`, `>>` | 14 | 15 |
    /// | 8 | `+`, `-` | 16 | 17 |
    /// | 9 | `*`, `/`, `%` | 18 | 19 |
    pub fn binding_power(&self) -> Option<(u8, u8)> {
        // Delegate to existing implementation
        self.infix_binding_power()
    }

    // =========================================================================
    // PRATT PARSER CORE
    // =========================================================================

    /// Top-level expression entry point: a range, which is itself the lowest
    /// precedence construct (lower than any binary operator the Pratt loop
    /// below handles).
    pub(crate) fn parse_expr(&mut self) -> Option<Expr> {
        self.parse_range_expr()
    }

    /// `lo..hi`, `lo..=hi`, `..hi`, `lo..`, `..` - parsed around the Pratt
    /// loop rather than inside it since a range's operands are themselves
    /// full Pratt expressions and `..`/`..=` bind looser than every binary
    /// operator in `infix_binding_power`.
    fn parse_range_expr(&mut self) -> Option<Expr> {
        if matches!(self.current_token(), Token::DotDot | Token::DotDotEq) {
            let inclusive = self.current_token() == Token::DotDotEq;
            self.advance();
            let end = if self.can_start_expr() {
                Some(Box::new(self.parse_expr_with_min_bp(bp::MIN)?))
            } else {
                None
            };
            return Some(Expr::Range(RangeExpr {
                start: None,
                end,
                inclusive,
            }));
        }

        let lhs = self.parse_expr_with_min_bp(bp::MIN)?;

        if matches!(self.current_token(), Token::DotDot | Token::DotDotEq) {
            let inclusive = self.current_token() == Token::DotDotEq;
            self.advance();
            let end = if self.can_start_expr() {
                Some(Box::new(self.parse_expr_with_min_bp(bp::MIN)?))
            } else {
                None
            };
            return Some(Expr::Range(RangeExpr {
                start: Some(Box::new(lhs)),
                end,
                inclusive,
            }));
        }

        Some(lhs)
    }

    /// Whether the current token can begin a new expression. Used only to
    /// decide whether a range has an end operand (`a..`  vs `a..b`); gates
    /// `{` on [`Self::struct_literals_allowed`] so that, inside a
    /// suppressed condition/iterator, a range like `0..n` followed directly
    /// by a loop/if body doesn't swallow that body's `{` as a block.
    fn can_start_expr(&self) -> bool {
        match self.current_token() {
            Token::Number(_)
            | Token::Float(_)
            | Token::String(_)
            | Token::RawString(_)
            | Token::Char(_)
            | Token::True
            | Token::False
            | Token::LParen
            | Token::LBracket
            | Token::If
            | Token::Match
            | Token::Loop
            | Token::Async
            | Token::Pipe
            | Token::OrOr
            | Token::Fn
            | Token::Ident(_)
            | Token::Self_
            | Token::SelfUpper
            | Token::Super
            | Token::Crate
            | Token::Minus
            | Token::Bang
            | Token::Tilde
            | Token::Star
            | Token::Ampersand
            | Token::Move
            | Token::Spawn => true,
            Token::LBrace => self.struct_literals_allowed(),
            _ => false,
        }
    }

    /// Binary-operator Pratt loop: parses a prefix expression as the left
    /// operand, then repeatedly consumes infix operators whose left binding
    /// power is at least `min_bp`, recursing on the right with that
    /// operator's right binding power. `as`-casts are folded in here too,
    /// as a postfix-like operator at [`bp::CAST`] - tighter than every
    /// binary operator, looser than unary prefix/postfix.
    pub(crate) fn parse_expr_with_min_bp(&mut self, min_bp: u8) -> Option<Expr> {
        let mut lhs = self.parse_prefix_expr()?;

        loop {
            if self.current_token() == Token::As {
                if bp::CAST < min_bp {
                    break;
                }
                self.advance();
                let ty = self.parse_type()?;
                lhs = Expr::Cast(Box::new(lhs), ty);
                continue;
            }

            let Some((left_bp, right_bp)) = self.infix_binding_power() else {
                break;
            };
            if left_bp < min_bp {
                break;
            }

            let op = binop_for(&self.current_token())?;
            let span = self.current_span();
            self.advance();
            let rhs = self.parse_expr_with_min_bp(right_bp)?;
            lhs = Expr::Binary(BinaryExpr {
                left: Box::new(lhs),
                op,
                right: Box::new(rhs),
                span,
            });
        }

        Some(lhs)
    }

    /// `(left_bp, right_bp)` for the current token if it is a binary
    /// operator, `None` otherwise. Every operator here is left-associative:
    /// `right_bp = left_bp + 1`.
    pub(crate) fn infix_binding_power(&self) -> Option<(u8, u8)> {
        match self.current_token() {
            Token::OrOr => Some((bp::LOGICAL_OR, bp::LOGICAL_OR + 1)),
            Token::AndAnd => Some((bp::LOGICAL_AND, bp::LOGICAL_AND + 1)),
            Token::EqEq | Token::NotEq | Token::Lt | Token::Gt | Token::LtEq | Token::GtEq => {
                Some((bp::COMPARISON, bp::COMPARISON + 1))
            }
            Token::Pipe => Some((bp::BITWISE_OR, bp::BITWISE_OR + 1)),
            Token::Caret => Some((bp::BITWISE_XOR, bp::BITWISE_XOR + 1)),
            Token::Ampersand => Some((bp::BITWISE_AND, bp::BITWISE_AND + 1)),
            Token::Shl | Token::Shr => Some((bp::SHIFT, bp::SHIFT + 1)),
            Token::Plus | Token::Minus => Some((bp::ADDITIVE, bp::ADDITIVE + 1)),
            Token::Star | Token::Slash | Token::Percent => {
                Some((bp::MULTIPLICATIVE, bp::MULTIPLICATIVE + 1))
            }
            _ => None,
        }
    }

    /// Prefix unary operators, recursing on themselves so chained unary
    /// (`-!~x`) composes correctly; anything else falls through to postfix
    /// parsing.
    fn parse_prefix_expr(&mut self) -> Option<Expr> {
        let span = self.current_span();
        match self.current_token() {
            Token::Minus => {
                self.advance();
                let expr = self.parse_prefix_expr()?;
                Some(Expr::Unary(UnaryExpr {
                    op: UnOp::Neg,
                    expr: Box::new(expr),
                    span,
                }))
            }
            Token::Bang => {
                self.advance();
                let expr = self.parse_prefix_expr()?;
                Some(Expr::Unary(UnaryExpr {
                    op: UnOp::Not,
                    expr: Box::new(expr),
                    span,
                }))
            }
            Token::Tilde => {
                self.advance();
                let expr = self.parse_prefix_expr()?;
                Some(Expr::Unary(UnaryExpr {
                    op: UnOp::BitNot,
                    expr: Box::new(expr),
                    span,
                }))
            }
            Token::Star => {
                self.advance();
                let expr = self.parse_prefix_expr()?;
                Some(Expr::Unary(UnaryExpr {
                    op: UnOp::Deref,
                    expr: Box::new(expr),
                    span,
                }))
            }
            Token::Ampersand => {
                self.advance();
                let mutable = self.match_token(Token::Mut);
                let expr = self.parse_prefix_expr()?;
                Some(Expr::Unary(UnaryExpr {
                    op: UnOp::Ref(mutable),
                    expr: Box::new(expr),
                    span,
                }))
            }
            Token::Move => {
                self.advance();
                let expr = self.parse_prefix_expr()?;
                Some(Expr::Move(Box::new(expr)))
            }
            Token::Spawn => {
                self.advance();
                let expr = self.parse_prefix_expr()?;
                Some(Expr::Spawn(Box::new(expr)))
            }
            _ => self.parse_postfix_expr(),
        }
    }

    /// Postfix operators applied to a primary atom: field/tuple-index
    /// access, `.await`, method calls, indexing/slicing, calls, and the
    /// postfix `?` operator.
    fn parse_postfix_expr(&mut self) -> Option<Expr> {
        let mut expr = self.parse_primary_expr()?;

        loop {
            match self.current_token() {
                Token::Dot => {
                    self.advance();
                    if self.match_token(Token::Await) {
                        expr = Expr::Await(Box::new(expr));
                        continue;
                    }
                    if let Token::Number(n) = self.current_token() {
                        self.advance();
                        expr = Expr::Field(FieldExpr {
                            object: Box::new(expr),
                            field: Symbol::intern(&n.to_string()),
                            span: self.current_span(),
                        });
                        continue;
                    }
                    let name = self.parse_ident()?;
                    let generics = if self.current_token() == Token::ColonColon
                        && self.peek_token() == Token::Lt
                    {
                        self.advance();
                        self.advance();
                        let mut types = Vec::new();
                        while !self.is_at_end() && self.current_token() != Token::Gt {
                            if let Some(ty) = self.parse_type() {
                                types.push(ty);
                            }
                            if !self.match_token(Token::Comma) {
                                break;
                            }
                        }
                        self.expect(Token::Gt)?;
                        Some(types)
                    } else {
                        None
                    };
                    if self.match_token(Token::LParen) {
                        let call_args = self.with_struct_literals_allowed(|p| p.parse_call_args())?;
                        expr = Expr::MethodCall(MethodCallExpr {
                            receiver: Box::new(expr),
                            method: name,
                            args: generics,
                            call_args,
                        });
                    } else {
                        expr = Expr::Field(FieldExpr {
                            object: Box::new(expr),
                            field: name,
                            span: self.current_span(),
                        });
                    }
                }
                Token::LBracket => {
                    self.advance();
                    expr = self.with_struct_literals_allowed(|p| p.finish_index_or_slice(expr))?;
                    continue;
                }
                Token::LParen => {
                    self.advance();
                    let args = self.with_struct_literals_allowed(|p| p.parse_call_args())?;
                    let span = self.current_span();
                    expr = Expr::Call(CallExpr {
                        func: Box::new(expr),
                        args,
                        span,
                        generics: None,
                    });
                }
                Token::Question => {
                    self.advance();
                    expr = Expr::Try(Box::new(expr));
                }
                _ => break,
            }
        }

        Some(expr)
    }

    /// Comma-separated call/index argument list already past the opening
    /// delimiter's consumption point for `(`; consumes up to and including
    /// the closing `)`.
    fn parse_call_args(&mut self) -> Option<Vec<Expr>> {
        let mut args = Vec::new();
        if self.current_token() != Token::RParen {
            loop {
                args.push(self.parse_expr()?);
                if !self.match_token(Token::Comma) {
                    break;
                }
                if self.current_token() == Token::RParen {
                    break;
                }
            }
        }
        self.expect(Token::RParen)?;
        Some(args)
    }

    /// `[index]` or `[start..end]`/`[start..]`/`[..end]`/`[..]`, called
    /// right after the opening `[` has been consumed. `object` is the
    /// already-parsed base expression.
    fn finish_index_or_slice(&mut self, object: Expr) -> Option<Expr> {
        if matches!(self.current_token(), Token::DotDot | Token::DotDotEq) {
            let inclusive = self.match_token(Token::DotDotEq);
            if !inclusive {
                self.advance();
            }
            if inclusive {
                self.error("inclusive ranges are not supported in slice expressions");
            }
            let end = if self.current_token() == Token::RBracket {
                None
            } else {
                Some(Box::new(self.parse_expr()?))
            };
            self.expect(Token::RBracket)?;
            return Some(Expr::Slice(SliceExpr {
                object: Box::new(object),
                start: None,
                end,
            }));
        }

        let first = self.parse_expr()?;

        if self.current_token() == Token::DotDot || self.current_token() == Token::DotDotEq {
            let inclusive = self.current_token() == Token::DotDotEq;
            self.advance();
            if inclusive {
                self.error("inclusive ranges are not supported in slice expressions");
            }
            let end = if self.current_token() == Token::RBracket {
                None
            } else {
                Some(Box::new(self.parse_expr()?))
            };
            self.expect(Token::RBracket)?;
            return Some(Expr::Slice(SliceExpr {
                object: Box::new(object),
                start: Some(Box::new(first)),
                end,
            }));
        }

        self.expect(Token::RBracket)?;
        Some(Expr::Index(IndexExpr {
            object: Box::new(object),
            index: Box::new(first),
        }))
    }

    /// Atoms: literals, grouping/tuples, arrays, block/if/match/loop/async,
    /// closures, and path-rooted forms (plain path, call target, struct
    /// literal, enum variant construction).
    fn parse_primary_expr(&mut self) -> Option<Expr> {
        match self.current_token() {
            Token::Number(n) => {
                self.advance();
                Some(Expr::Literal(Literal::Int(n as i64)))
            }
            Token::Float(f) => {
                self.advance();
                Some(Expr::Literal(Literal::Float(f)))
            }
            Token::String(s) | Token::RawString(s) => {
                self.advance();
                Some(Expr::Literal(Literal::String(s)))
            }
            Token::Char(c) => {
                self.advance();
                Some(Expr::Literal(Literal::Char(c)))
            }
            Token::True => {
                self.advance();
                Some(Expr::Literal(Literal::Bool(true)))
            }
            Token::False => {
                self.advance();
                Some(Expr::Literal(Literal::Bool(false)))
            }
            Token::LParen => self.parse_paren_or_tuple_expr(),
            Token::LBracket => self.parse_array_expr(),
            Token::LBrace => self.parse_block().map(Expr::Block),
            Token::If => self.parse_if_expr(),
            Token::Match => self.parse_match_expr(),
            Token::Loop => self.parse_loop_expr(),
            Token::Async => self.parse_async_expr(),
            Token::Pipe | Token::OrOr => self.parse_closure_pipe_expr(),
            Token::Fn => self.parse_closure_fn_expr(),
            Token::Ident(_) | Token::Self_ | Token::SelfUpper | Token::Super | Token::Crate => {
                self.parse_path_expr()
            }
            other => {
                self.error(format!("expected expression, found {:?}", other));
                None
            }
        }
    }

    fn parse_paren_or_tuple_expr(&mut self) -> Option<Expr> {
        self.expect(Token::LParen)?;
        if self.match_token(Token::RParen) {
            return Some(Expr::Literal(Literal::Unit));
        }

        let first = self.with_struct_literals_allowed(|p| p.parse_expr())?;

        if self.match_token(Token::Comma) {
            let mut elements = vec![first];
            while !self.is_at_end() && self.current_token() != Token::RParen {
                elements.push(self.with_struct_literals_allowed(|p| p.parse_expr())?);
                if !self.match_token(Token::Comma) {
                    break;
                }
            }
            self.expect(Token::RParen)?;
            Some(Expr::Tuple(elements))
        } else {
            self.expect(Token::RParen)?;
            Some(first)
        }
    }

    fn parse_array_expr(&mut self) -> Option<Expr> {
        self.expect(Token::LBracket)?;
        let mut elements = Vec::new();
        if self.current_token() != Token::RBracket {
            loop {
                elements.push(self.with_struct_literals_allowed(|p| p.parse_expr())?);
                if !self.match_token(Token::Comma) {
                    break;
                }
                if self.current_token() == Token::RBracket {
                    break;
                }
            }
        }
        self.expect(Token::RBracket)?;
        Some(Expr::Array(elements))
    }

    /// `|x: i32, y| body` / `|| body`, pipe-delimited closure params.
    fn parse_closure_pipe_expr(&mut self) -> Option<Expr> {
        let params = if self.match_token(Token::OrOr) {
            Vec::new()
        } else {
            self.expect(Token::Pipe)?;
            let mut params = Vec::new();
            if self.current_token() != Token::Pipe {
                loop {
                    let mutable = self.match_token(Token::Mut);
                    let name = self.parse_ident()?;
                    let ty = if self.match_token(Token::Colon) {
                        self.parse_type()?
                    } else {
                        Type::Inferred
                    };
                    params.push(Param {
                        name,
                        ty,
                        mutable,
                    });
                    if !self.match_token(Token::Comma) {
                        break;
                    }
                }
            }
            self.expect(Token::Pipe)?;
            params
        };

        let ret_type = if self.match_token(Token::Arrow) {
            self.parse_type()
        } else {
            None
        };

        let body = self.parse_expr()?;
        Some(Expr::Closure(ClosureExpr {
            params,
            ret_type,
            body: Box::new(body),
            move_kw: false,
        }))
    }

    /// `fn(x: i32) -> i32 { ... }`, the fn-syntax closure form.
    fn parse_closure_fn_expr(&mut self) -> Option<Expr> {
        self.expect(Token::Fn)?;
        let params = self.parse_params()?;
        let ret_type = self.parse_return_type();
        let body_block = self.parse_block()?;
        Some(Expr::Closure(ClosureExpr {
            params,
            ret_type,
            body: Box::new(Expr::Block(body_block)),
            move_kw: false,
        }))
    }

    /// Path-rooted primary: disambiguates a plain path/call target from a
    /// struct literal (`Name { .. }`, suppressed per
    /// [`Self::struct_literals_allowed`]) and from enum variant construction
    /// (`Path::Variant`, `Path::Variant(..)`, `Path::Variant { .. }` - any
    /// multi-segment path whose last segment starts uppercase).
    fn parse_path_expr(&mut self) -> Option<Expr> {
        let path = self.parse_path();
        let is_variant_like = path.segments.len() >= 2
            && path
                .segments
                .last()
                .is_some_and(|s| starts_with_uppercase(s.ident.as_str()));

        if self.current_token() == Token::LBrace && self.struct_literals_allowed() {
            return if is_variant_like {
                self.finish_enum_struct_variant(path)
            } else {
                self.finish_struct_literal(path)
            };
        }

        if is_variant_like {
            return match self.current_token() {
                Token::LParen => self.finish_enum_tuple_variant(path),
                _ => Some(Self::finish_enum_unit_variant(path)),
            };
        }

        Some(Expr::Path(path))
    }

    fn split_variant_path(path: Path) -> (Path, Symbol, Option<Vec<Type>>) {
        let mut segments = path.segments;
        let last = segments.pop().expect("caller checked segments.len() >= 2");
        (Path { segments }, last.ident, last.args)
    }

    fn finish_enum_unit_variant(path: Path) -> Expr {
        let (base, variant, generics) = Self::split_variant_path(path);
        Expr::EnumVariant(Box::new(EnumVariantExpr {
            path: base,
            variant,
            generics,
            data: EnumVariantData::Unit,
        }))
    }

    fn finish_enum_tuple_variant(&mut self, path: Path) -> Option<Expr> {
        let (base, variant, generics) = Self::split_variant_path(path);
        self.expect(Token::LParen)?;
        let args = self.with_struct_literals_allowed(|p| p.parse_call_args())?;
        Some(Expr::EnumVariant(Box::new(EnumVariantExpr {
            path: base,
            variant,
            generics,
            data: EnumVariantData::Tuple(args),
        })))
    }

    fn finish_enum_struct_variant(&mut self, path: Path) -> Option<Expr> {
        let (base, variant, generics) = Self::split_variant_path(path);
        let (fields, _base_expr) = self.parse_struct_field_list()?;
        Some(Expr::EnumVariant(Box::new(EnumVariantExpr {
            path: base,
            variant,
            generics,
            data: EnumVariantData::Struct(fields),
        })))
    }

    fn finish_struct_literal(&mut self, path: Path) -> Option<Expr> {
        let generics = path.segments.last().and_then(|s| s.args.clone());
        let (fields, base) = self.parse_struct_field_list()?;
        Some(Expr::StructLiteral(Box::new(StructLiteralExpr {
            path,
            generics,
            fields,
            base,
        })))
    }

    /// `{ name, name: expr, ..base }`, consuming both delimiters.
    fn parse_struct_field_list(&mut self) -> Option<(Vec<StructField>, Option<Expr>)> {
        self.expect(Token::LBrace)?;
        let mut fields = Vec::new();
        let mut base = None;

        while !self.is_at_end() && self.current_token() != Token::RBrace {
            if self.match_token(Token::DotDot) {
                base = Some(self.with_struct_literals_allowed(|p| p.parse_expr())?);
                break;
            }

            let name = self.parse_ident()?;
            let is_shorthand = self.current_token() != Token::Colon;
            let expr = if !is_shorthand {
                self.advance();
                self.with_struct_literals_allowed(|p| p.parse_expr())?
            } else {
                Expr::Path(Path {
                    segments: vec![PathSegment {
                        ident: name,
                        args: None,
                    }],
                })
            };
            fields.push(StructField {
                name,
                expr,
                is_shorthand,
            });

            if !self.match_token(Token::Comma) {
                break;
            }
        }

        self.expect(Token::RBrace)?;
        Some((fields, base))
    }
}

fn binop_for(token: &Token) -> Option<BinOp> {
    Some(match token {
        Token::OrOr => BinOp::Or,
        Token::AndAnd => BinOp::And,
        Token::EqEq => BinOp::Eq,
        Token::NotEq => BinOp::Ne,
        Token::Lt => BinOp::Lt,
        Token::Gt => BinOp::Gt,
        Token::LtEq => BinOp::Le,
        Token::GtEq => BinOp::Ge,
        Token::Pipe => BinOp::BitOr,
        Token::Caret => BinOp::BitXor,
        Token::Ampersand => BinOp::BitAnd,
        Token::Shl => BinOp::Shl,
        Token::Shr => BinOp::Shr,
        Token::Plus => BinOp::Add,
        Token::Minus => BinOp::Sub,
        Token::Star => BinOp::Mul,
        Token::Slash => BinOp::Div,
        Token::Percent => BinOp::Mod,
        _ => return None,
    })
}

fn starts_with_uppercase(name: &str) -> bool {
    name.chars().next().map_or(false, |c| c.is_uppercase())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        BinaryExpr, Block, CallExpr, ClosureExpr, EnumVariantData, FieldExpr, IfExpr, IndexExpr,
        Literal, MatchArm, MatchExpr, MethodCallExpr, Param, Path, Stmt, StructField, Type, UnOp,
        UnaryExpr,
    };
    use corvus_lex::Lexer;
    use corvus_util::Handler;

    /// Helper to parse a single expression
    fn parse_expr_source(source: &str) -> (Result<Expr, &'static str>, Handler) {
        let mut handler = Handler::new();
        let tokens = lex_all(source, &mut handler);
        let mut parser = Parser::from_tokens(tokens, &mut handler);
        let expr = parser.parse_expression();

        (expr, handler)
    }

    fn lex_all(source: &str, handler: &mut Handler) -> Vec<Token> {
        let mut lexer = Lexer::new(source, handler);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token();
            if token == Token::Eof {
                break;
            }
            tokens.push(token);
        }
        tokens
    }

    /// Helper to check expression type
    fn assert_is_binary(expr: &Expr, op: BinOp) {
        match expr {
            Expr::Binary(b) => assert_eq!(b.op, op, "Expected operator {:?}", op),
            _ => panic!("Expected Binary expression, got {:?}", expr),
        }
    }

    fn assert_is_unary(expr: &Expr, op: UnOp) {
        match expr {
            Expr::Unary(u) => assert_eq!(u.op, op, "Expected unary operator {:?}", op),
            _ => panic!("Expected Unary expression, got {:?}", expr),
        }
    }

    // =========================================================================
    // LITERAL TESTS
    // =========================================================================

    #[test]
    fn test_parse_int_literal() {
        let (expr, handler) = parse_expr_source("42");
        assert!(!handler.has_errors());
        assert!(matches!(expr, Ok(Expr::Literal(Literal::Int(42)))));
    }

    #[test]
    fn test_parse_float_literal() {
        let (expr, handler) = parse_expr_source("3.14");
        assert!(!handler.has_errors());
        if let Ok(Expr::Literal(Literal::Float(f))) = expr {
            assert!((f - 3.14).abs() < 0.001);
        } else {
            panic!("Expected float literal");
        }
    }

    #[test]
    fn test_parse_string_literal() {
        let (expr, handler) = parse_expr_source("\"hello world\"");
        assert!(!handler.has_errors());
        if let Ok(Expr::Literal(Literal::String(s))) = expr {
            assert_eq!(s.as_str(), "hello world");
        } else {
            panic!("Expected string literal");
        }
    }

    #[test]
    fn test_parse_bool_literal() {
        let (expr, handler) = parse_expr_source("true");
        assert!(!handler.has_errors());
        assert!(matches!(expr, Ok(Expr::Literal(Literal::Bool(true)))));

        let (expr, handler) = parse_expr_source("false");
        assert!(!handler.has_errors());
        assert!(matches!(expr, Ok(Expr::Literal(Literal::Bool(false)))));
    }

    #[test]
    fn test_parse_unit_literal() {
        let (expr, handler) = parse_expr_source("()");
        assert!(!handler.has_errors());
        assert!(matches!(expr, Ok(Expr::Literal(Literal::Unit))));
    }

    // =========================================================================
    // UNARY OPERATOR TESTS
    // =========================================================================

    #[test]
    fn test_parse_unary_negation() {
        let (expr, handler) = parse_expr_source("-x");
        assert!(!handler.has_errors());
        assert_is_unary(&expr.unwrap(), UnOp::Neg);
    }

    #[test]
    fn test_parse_unary_not() {
        let (expr, handler) = parse_expr_source("!flag");
        assert!(!handler.has_errors());
        assert_is_unary(&expr.unwrap(), UnOp::Not);
    }

    #[test]
    fn test_parse_unary_bitwise_not() {
        let (expr, handler) = parse_expr_source("~mask");
        assert!(!handler.has_errors());
        assert_is_unary(&expr.unwrap(), UnOp::BitNot);
    }

    #[test]
    fn test_parse_unary_reference() {
        let (expr, handler) = parse_expr_source("&value");
        assert!(!handler.has_errors());
        assert_is_unary(&expr.unwrap(), UnOp::Ref(false));
    }

    #[test]
    fn test_parse_unary_reference_mut() {
        let (expr, handler) = parse_expr_source("&mut value");
        assert!(!handler.has_errors());
        assert_is_unary(&expr.unwrap(), UnOp::Ref(true));
    }

    #[test]
    fn test_parse_chained_unary() {
        let (expr, handler) = parse_expr_source("-!~x");
        assert!(!handler.has_errors());
        // Should parse as -(!(~x))
        let expr = expr.unwrap();
        assert_is_unary(&expr, UnOp::Neg);
    }

    // =========================================================================
    // BINARY OPERATOR PRECEDENCE TESTS
    // =========================================================================

    #[test]
    fn test_precedence_mul_add() {
        // a + b * c should parse as a + (b * c)
        let (expr, handler) = parse_expr_source("a + b * c");
        assert!(!handler.has_errors());

        let expr = expr.unwrap();
        assert_is_binary(&expr, BinOp::Add);

        if let Expr::Binary(b) = &expr {
            // Right side should be multiplication
            assert_is_binary(&b.right, BinOp::Mul);
        }
    }

    #[test]
    fn test_precedence_multiple_levels() {
        // a + b * c - d / e should parse as (a + (b * c)) - (d / e)
        let (expr, handler) = parse_expr_source("a + b * c - d / e");
        assert!(!handler.has_errors());

        let expr = expr.unwrap();
        // Top level should be subtraction (left-associative)
        assert_is_binary(&expr, BinOp::Sub);

        if let Expr::Binary(b) = &expr {
            // Left side: a + (b * c)
            assert_is_binary(&b.left, BinOp::Add);
            // Right side: d / e
            assert_is_binary(&b.right, BinOp::Div);
        }
    }

    #[test]
    fn test_precedence_logical_vs_comparison() {
        // a && b == c || d should parse as (a && (b == c)) || d
        let (expr, handler) = parse_expr_source("a && b == c || d");
        assert!(!handler.has_errors());

        let expr = expr.unwrap();
        // Top level should be OR
        assert_is_binary(&expr, BinOp::Or);
    }

    #[test]
    fn test_precedence_bitwise_hierarchy() {
        // a | b ^ c & d should parse as a | (b ^ (c & d))
        let (expr, handler) = parse_expr_source("a | b ^ c & d");
        assert!(!handler.has_errors());

        let expr = expr.unwrap();
        // Top level should be bitwise OR
        assert_is_binary(&expr, BinOp::BitOr);

        if let Expr::Binary(b) = &expr {
            // Right side: b ^ (c & d)
            assert_is_binary(&b.right, BinOp::BitXor);
        }
    }

    #[test]
    fn test_precedence_shift_vs_additive() {
        // a + b << c - d should parse as (a + b) << (c - d)
        let (expr, handler) = parse_expr_source("a + b << c - d");
        assert!(!handler.has_errors());

        let expr = expr.unwrap();
        // Top level should be shift
        assert_is_binary(&expr, BinOp::Shl);
    }

    // =========================================================================
    // ASSOCIATIVITY TESTS
    // =========================================================================

    #[test]
    fn test_associativity_subtraction() {
        // a - b - c should parse as (a - b) - c (left-associative)
        let (expr, handler) = parse_expr_source("a - b - c");
        assert!(!handler.has_errors());

        let expr = expr.unwrap();
        assert_is_binary(&expr, BinOp::Sub);

        if let Expr::Binary(b) = &expr {
            // Left side should be subtraction
            assert_is_binary(&b.left, BinOp::Sub);
        }
    }

    #[test]
    fn test_associativity_division() {
        // a / b / c should parse as (a / b) / c (left-associative)
        let (expr, handler) = parse_expr_source("a / b / c");
        assert!(!handler.has_errors());

        let expr = expr.unwrap();
        assert_is_binary(&expr, BinOp::Div);

        if let Expr::Binary(b) = &expr {
            assert_is_binary(&b.left, BinOp::Div);
        }
    }

    #[test]
    fn test_associativity_logical_and() {
        // a && b && c should parse as (a && b) && c
        let (expr, handler) = parse_expr_source("a && b && c");
        assert!(!handler.has_errors());

        let expr = expr.unwrap();
        assert_is_binary(&expr, BinOp::And);

        if let Expr::Binary(b) = &expr {
            assert_is_binary(&b.left, BinOp::And);
        }
    }

    #[test]
    fn test_associativity_comparison_chain() {
        // a == b == c should parse as (a == b) == c
        let (expr, handler) = parse_expr_source("a == b == c");
        assert!(!handler.has_errors());

        let expr = expr.unwrap();
        assert_is_binary(&expr, BinOp::Eq);

        if let Expr::Binary(b) = &expr {
            assert_is_binary(&b.left, BinOp::Eq);
        }
    }

    // =========================================================================
    // PARENTHESIZED EXPRESSION TESTS
    // =========================================================================

    #[test]
    fn test_paren_override_precedence() {
        // (a + b) * c should parse as (a + b) * c
        let (expr, handler) = parse_expr_source("(a + b) * c");
        assert!(!handler.has_errors());

        let expr = expr.unwrap();
        assert_is_binary(&expr, BinOp::Mul);

        if let Expr::Binary(b) = &expr {
            // Left side should be addition
            assert_is_binary(&b.left, BinOp::Add);
        }
    }

    #[test]
    fn test_nested_parens() {
        // ((a + b) * (c - d))
        let (expr, handler) = parse_expr_source("(a + b) * (c - d)");
        assert!(!handler.has_errors());

        let expr = expr.unwrap();
        assert_is_binary(&expr, BinOp::Mul);
    }

    // =========================================================================
    // FUNCTION CALL TESTS
    // =========================================================================

    #[test]
    fn test_function_call_no_args() {
        let (expr, handler) = parse_expr_source("foo()");
        assert!(!handler.has_errors());
        assert!(matches!(expr, Ok(Expr::Call(c)) if c.args.is_empty()));
    }

    #[test]
    fn test_function_call_with_args() {
        let (expr, handler) = parse_expr_source("foo(a, b, c)");
        assert!(!handler.has_errors());
        if let Ok(Expr::Call(c)) = &expr {
            assert_eq!(c.args.len(), 3);
        } else {
            panic!("Expected call expression");
        }
    }

    #[test]
    fn test_function_call_in_expression() {
        // foo(a + b, c * d)
        let (expr, handler) = parse_expr_source("foo(a + b, c * d)");
        assert!(!handler.has_errors());

        if let Ok(Expr::Call(c)) = &expr {
            assert_eq!(c.args.len(), 2);
            assert_is_binary(&c.args[0], BinOp::Add);
            assert_is_binary(&c.args[1], BinOp::Mul);
        } else {
            panic!("Expected call expression");
        }
    }

    // =========================================================================
    // FIELD ACCESS AND INDEXING TESTS
    // =========================================================================

    #[test]
    fn test_field_access() {
        let (expr, handler) = parse_expr_source("obj.field");
        assert!(!handler.has_errors());
        assert!(matches!(expr, Ok(Expr::Field(_))));
    }

    #[test]
    fn test_tuple_index() {
        let (expr, handler) = parse_expr_source("tuple.0");
        assert!(!handler.has_errors());
        assert!(matches!(expr, Ok(Expr::Field(_))));
    }

    #[test]
    fn test_array_index() {
        let (expr, handler) = parse_expr_source("arr[0]");
        assert!(!handler.has_errors());
        assert!(matches!(expr, Ok(Expr::Index(_))));
    }

    #[test]
    fn test_chained_access() {
        // obj.field[0].nested
        let (expr, handler) = parse_expr_source("obj.field[0].nested");
        assert!(!handler.has_errors());
        assert!(matches!(expr, Ok(Expr::Field(_))));
    }

    // =========================================================================
    // METHOD CALL TESTS
    // =========================================================================

    #[test]
    fn test_method_call_no_args() {
        let (expr, handler) = parse_expr_source("obj.method()");
        assert!(!handler.has_errors());
        assert!(matches!(expr, Ok(Expr::MethodCall(m)) if m.call_args.is_empty()));
    }

    #[test]
    fn test_method_call_with_args() {
        let (expr, handler) = parse_expr_source("obj.method(a, b)");
        assert!(!handler.has_errors());
        if let Ok(Expr::MethodCall(m)) = &expr {
            assert_eq!(m.call_args.len(), 2);
        } else {
            panic!("Expected method call");
        }
    }

    #[test]
    fn test_method_call_turbofish() {
        let (expr, handler) = parse_expr_source("obj.method::<i32>(a)");
        assert!(!handler.has_errors());
        if let Ok(Expr::MethodCall(m)) = &expr {
            assert!(m.args.is_some());
            assert_eq!(m.args.as_ref().unwrap().len(), 1);
        } else {
            panic!("Expected method call");
        }
    }

    #[test]
    fn test_chained_method_calls() {
        let (expr, handler) = parse_expr_source("obj.method1().method2()");
        assert!(!handler.has_errors());
        assert!(matches!(expr, Ok(Expr::MethodCall(_))));
    }

    // =========================================================================
    // IF EXPRESSION TESTS
    // =========================================================================

    #[test]
    fn test_if_expression() {
        let (expr, handler) = parse_expr_source("if cond { a }");
        assert!(!handler.has_errors());
        assert!(matches!(expr, Ok(Expr::If(_))));
    }

    #[test]
    fn test_if_else_expression() {
        let (expr, handler) = parse_expr_source("if cond { a } else { b }");
        assert!(!handler.has_errors());
        if let Ok(Expr::If(i)) = &expr {
            assert!(i.else_block.is_some());
        } else {
            panic!("Expected if expression");
        }
    }

    #[test]
    fn test_if_else_if_expression() {
        let (expr, handler) = parse_expr_source("if a { 1 } else if b { 2 } else { 3 }");
        assert!(!handler.has_errors());
        assert!(matches!(expr, Ok(Expr::If(_))));
    }

    #[test]
    fn test_if_as_expression_value() {
        // let x = if cond { 1 } else { 2 };
        let (expr, handler) = parse_expr_source("if x > 0 { x } else { -x }");
        assert!(!handler.has_errors());
    }

    // =========================================================================
    // MATCH EXPRESSION TESTS
    // =========================================================================

    #[test]
    fn test_match_expression() {
        let (expr, handler) = parse_expr_source("match x { 0 => \"zero\", _ => \"other\" }");
        assert!(!handler.has_errors());
        if let Ok(Expr::Match(m)) = &expr {
            assert_eq!(m.arms.len(), 2);
        } else {
            panic!("Expected match expression");
        }
    }

    #[test]
    fn test_match_with_guard() {
        let (expr, handler) =
            parse_expr_source("match x { n if n > 0 => \"positive\", _ => \"other\" }");
        assert!(!handler.has_errors());
        if let Ok(Expr::Match(m)) = &expr {
            assert!(m.arms[0].guard.is_some());
        } else {
            panic!("Expected match expression");
        }
    }

    #[test]
    fn test_match_with_block_body() {
        let (expr, handler) =
            parse_expr_source("match x { 0 => { println(\"zero\"); }, _ => {} }");
        assert!(!handler.has_errors());
    }

    // =========================================================================
    // LAMBDA/CLOSURE TESTS
    // =========================================================================

    #[test]
    fn test_closure_pipe_syntax() {
        let (expr, handler) = parse_expr_source("|x: i32| x + 1");
        assert!(!handler.has_errors());
        assert!(matches!(expr, Ok(Expr::Closure(_))));
    }

    #[test]
    fn test_closure_fn_syntax() {
        let (expr, handler) = parse_expr_source("fn(x: i32) -> i32 { x + 1 }");
        assert!(!handler.has_errors());
        assert!(matches!(expr, Ok(Expr::Closure(_))));
    }

    #[test]
    fn test_closure_no_params() {
        let (expr, handler) = parse_expr_source("|| 42");
        assert!(!handler.has_errors());
        assert!(matches!(expr, Ok(Expr::Closure(_))));
    }

    #[test]
    fn test_closure_with_block() {
        let (expr, handler) = parse_expr_source("|x| { let y = x + 1; y }");
        assert!(!handler.has_errors());
    }

    // =========================================================================
    // BLOCK EXPRESSION TESTS
    // =========================================================================

    #[test]
    fn test_block_expression() {
        let (expr, handler) = parse_expr_source("{ let x = 1; x + 1 }");
        assert!(!handler.has_errors());
        assert!(matches!(expr, Ok(Expr::Block(_))));
    }

    #[test]
    fn test_block_with_trailing_expr() {
        let (expr, handler) = parse_expr_source("{ 1 + 2 }");
        assert!(!handler.has_errors());
    }

    #[test]
    fn test_nested_block() {
        let (expr, handler) = parse_expr_source("{ { 1 } }");
        assert!(!handler.has_errors());
    }

    // =========================================================================
    // ARRAY LITERAL TESTS
    // =========================================================================

    #[test]
    fn test_array_literal() {
        let (expr, handler) = parse_expr_source("[1, 2, 3]");
        assert!(!handler.has_errors());
        if let Ok(Expr::Array(arr)) = &expr {
            assert_eq!(arr.len(), 3);
        } else {
            panic!("Expected array");
        }
    }

    #[test]
    fn test_array_empty() {
        let (expr, handler) = parse_expr_source("[]");
        assert!(!handler.has_errors());
        if let Ok(Expr::Array(arr)) = &expr {
            assert!(arr.is_empty());
        } else {
            panic!("Expected array");
        }
    }

    #[test]
    fn test_array_with_expressions() {
        let (expr, handler) = parse_expr_source("[a + b, c * d]");
        assert!(!handler.has_errors());
        if let Ok(Expr::Array(arr)) = &expr {
            assert_eq!(arr.len(), 2);
            assert_is_binary(&arr[0], BinOp::Add);
            assert_is_binary(&arr[1], BinOp::Mul);
        } else {
            panic!("Expected array");
        }
    }

    // =========================================================================
    // TUPLE TESTS
    // =========================================================================

    #[test]
    fn test_tuple_literal() {
        let (expr, handler) = parse_expr_source("(1, 2, 3)");
        assert!(!handler.has_errors());
        if let Ok(Expr::Tuple(t)) = &expr {
            assert_eq!(t.len(), 3);
        } else {
            panic!("Expected tuple");
        }
    }

    #[test]
    fn test_tuple_single_with_comma() {
        let (expr, handler) = parse_expr_source("(1,)");
        assert!(!handler.has_errors());
        assert!(matches!(expr, Ok(Expr::Tuple(_))));
    }

    // =========================================================================
    // COMPLEX EXPRESSION TESTS
    // =========================================================================

    #[test]
    fn test_complex_arithmetic() {
        // a * b + c * d - e / f
        let (expr, handler) = parse_expr_source("a * b + c * d - e / f");
        assert!(!handler.has_errors());
    }

    #[test]
    fn test_complex_logical() {
        // (a && b) || (c && d)
        let (expr, handler) = parse_expr_source("(a && b) || (c && d)");
        assert!(!handler.has_errors());
    }

    #[test]
    fn test_mixed_operators() {
        // a + b * c == d && e || f
        let (expr, handler) = parse_expr_source("a + b * c == d && e || f");
        assert!(!handler.has_errors());
    }

    #[test]
    fn test_deeply_nested() {
        // ((((a))))
        let (expr, handler) = parse_expr_source("((((a))))");
        assert!(!handler.has_errors());
    }

    #[test]
    fn test_function_with_complex_args() {
        // foo(a + b * c, if x { y } else { z })
        let (expr, handler) = parse_expr_source("foo(a + b * c, if x { y } else { z })");
        assert!(!handler.has_errors());
    }

    #[test]
    fn test_match_in_if() {
        // if match x { 0 => true, _ => false } { a } else { b }
        let (expr, handler) =
            parse_expr_source("if match x { 0 => true, _ => false } { a } else { b }");
        assert!(!handler.has_errors());
    }

    #[test]
    fn test_closure_in_call() {
        // map(fn(x) { x + 1 })
        let (expr, handler) = parse_expr_source("map(fn(x: i32) -> i32 { x + 1 })");
        assert!(!handler.has_errors());
    }

    // =========================================================================
    // ERROR CASE TESTS
    // =========================================================================

    #[test]
    fn test_error_missing_operand_binary() {
        // a + (missing operand)
        let (expr, handler) = parse_expr_source("a +");
        assert!(handler.has_errors());
    }

    #[test]
    fn test_error_missing_operand_unary() {
        let (expr, handler) = parse_expr_source("-");
        assert!(handler.has_errors());
    }

    #[test]
    fn test_error_invalid_token() {
        let (expr, handler) = parse_expr_source("@invalid");
        assert!(handler.has_errors());
    }

    #[test]
    fn test_error_unmatched_paren() {
        let (expr, handler) = parse_expr_source("(a + b");
        assert!(handler.has_errors());
    }

    #[test]
    fn test_error_unmatched_brace() {
        let (expr, handler) = parse_expr_source("if x { a");
        assert!(handler.has_errors());
    }

    #[test]
    fn test_error_unmatched_bracket() {
        let (expr, handler) = parse_expr_source("arr[0");
        assert!(handler.has_errors());
    }

    #[test]
    fn test_error_double_operator() {
        let (expr, handler) = parse_expr_source("a ++ b");
        assert!(handler.has_errors());
    }

    // =========================================================================
    // SPEC EXAMPLES
    // =========================================================================

    #[test]
    fn test_spec_fibonacci_expression() {
        // fib(n - 1) + fib(n - 2)
        let (expr, handler) = parse_expr_source("fib(n - 1) + fib(n - 2)");
        assert!(!handler.has_errors());

        let expr = expr.unwrap();
        assert_is_binary(&expr, BinOp::Add);
    }

    #[test]
    fn test_spec_max_expression() {
        // if a > b { a } else { b }
        let (expr, handler) = parse_expr_source("if a > b { a } else { b }");
        assert!(!handler.has_errors());
    }

    #[test]
    fn test_spec_complex_condition() {
        // a > b && c < d || e == f
        let (expr, handler) = parse_expr_source("a > b && c < d || e == f");
        assert!(!handler.has_errors());
    }

    #[test]
    fn test_spec_bitwise_example() {
        // 5 & 3, 5 | 3, 5 ^ 3, 4 << 1, 8 >> 1
        let tests = vec![
            ("5 & 3", BinOp::BitAnd),
            ("5 | 3", BinOp::BitOr),
            ("5 ^ 3", BinOp::BitXor),
            ("4 << 1", BinOp::Shl),
            ("8 >> 1", BinOp::Shr),
        ];

        for (source, expected_op) in tests {
            let (expr, handler) = parse_expr_source(source);
            assert!(!handler.has_errors(), "Failed for: {}", source);
            assert_is_binary(&expr.unwrap(), expected_op);
        }
    }

    #[test]
    fn test_spec_unary_precedence() {
        // -5 + 3 should parse as (-5) + 3
        let (expr, handler) = parse_expr_source("-5 + 3");
        assert!(!handler.has_errors());

        let expr = expr.unwrap();
        assert_is_binary(&expr, BinOp::Add);

        if let Expr::Binary(b) = &expr {
            assert_is_unary(&b.left, UnOp::Neg);
        }
    }

    // =========================================================================
    // BINDING POWER TESTS
    // =========================================================================

    #[test]
    fn test_binding_power_logical_or() {
        let mut handler = Handler::new();
        let tokens = lex_all("||", &mut handler);
        let parser = Parser::from_tokens(tokens, &mut handler);
        let bp = parser.binding_power();
        assert_eq!(bp, Some((bp::LOGICAL_OR, bp::LOGICAL_OR + 1)));
    }

    #[test]
    fn test_binding_power_logical_and() {
        let mut handler = Handler::new();
        let tokens = lex_all("&&", &mut handler);
        let parser = Parser::from_tokens(tokens, &mut handler);
        let bp = parser.binding_power();
        assert_eq!(bp, Some((bp::LOGICAL_AND, bp::LOGICAL_AND + 1)));
    }

    #[test]
    fn test_binding_power_comparison() {
        let mut handler = Handler::new();
        let tokens = lex_all("==", &mut handler);
        let parser = Parser::from_tokens(tokens, &mut handler);
        let bp = parser.binding_power();
        assert_eq!(bp, Some((bp::COMPARISON, bp::COMPARISON + 1)));
    }

    #[test]
    fn test_binding_power_multiplicative() {
        let mut handler = Handler::new();
        let tokens = lex_all("*", &mut handler);
        let parser = Parser::from_tokens(tokens, &mut handler);
        let bp = parser.binding_power();
        assert_eq!(bp, Some((bp::MULTIPLICATIVE, bp::MULTIPLICATIVE + 1)));
    }

    #[test]
    fn test_binding_power_not_operator() {
        let mut handler = Handler::new();
        let tokens = lex_all("ident", &mut handler);
        let parser = Parser::from_tokens(tokens, &mut handler);
        let bp = parser.binding_power();
        assert_eq!(bp, None);
    }

    // =========================================================================
    // CHARACTER LITERAL TESTS
    // =========================================================================

    #[test]
    fn test_char_literal() {
        let (expr, handler) = parse_expr_source("'a'");
        assert!(!handler.has_errors());
        assert!(matches!(expr, Ok(Expr::Literal(Literal::Char('a')))));
    }

    #[test]
    fn test_char_literal_escape() {
        let (expr, handler) = parse_expr_source("'\\n'");
        assert!(!handler.has_errors());
        assert!(matches!(expr, Ok(Expr::Literal(Literal::Char('\n')))));
    }

    #[test]
    fn test_char_literal_unicode() {
        let (expr, handler) = parse_expr_source("'\\u{1F600}'");
        assert!(!handler.has_errors());
        assert!(matches!(expr, Ok(Expr::Literal(Literal::Char('ðŸ˜€')))));
    }

    // =========================================================================
    // CAST EXPRESSION TESTS
    // =========================================================================

    #[test]
    fn test_cast_expression() {
        let (expr, handler) = parse_expr_source("x as i32");
        assert!(!handler.has_errors());
        assert!(matches!(expr, Ok(Expr::Cast(_, _))));
    }

    #[test]
    fn test_cast_expression_precedence() {
        // Cast binds tighter than arithmetic: (x as i32) + 1
        let (expr, handler) = parse_expr_source("x as i32 + 1");
        assert!(!handler.has_errors());
        
        let expr = expr.unwrap();
        // Top level should be addition
        assert!(matches!(expr, Expr::Binary(b) if b.op == BinOp::Add));
        
        if let Expr::Binary(b) = &expr {
            // Left side should be cast
            assert!(matches!(b.left, Expr::Cast(_, _)));
        }
    }

    #[test]
    fn test_cast_expression_chain() {
        let (expr, handler) = parse_expr_source("x as i32 as i64");
        assert!(!handler.has_errors());
        assert!(matches!(expr, Ok(Expr::Cast(_, _))));
    }

    #[test]
    fn test_cast_with_multiplication() {
        // x as i32 * 2 should parse as (x as i32) * 2
        let (expr, handler) = parse_expr_source("x as i32 * 2");
        assert!(!handler.has_errors());
        
        let expr = expr.unwrap();
        assert!(matches!(expr, Expr::Binary(b) if b.op == BinOp::Mul));
    }

    // =========================================================================
    // STRUCT LITERAL TESTS
    // =========================================================================

    #[test]
    fn test_struct_literal() {
        let (expr, handler) = parse_expr_source("Point { x: 1.0, y: 2.0 }");
        assert!(!handler.has_errors());
        assert!(matches!(expr, Ok(Expr::StructLiteral(_))));
    }

    #[test]
    fn test_struct_literal_shorthand() {
        let (expr, handler) = parse_expr_source("Point { x, y }");
        assert!(!handler.has_errors());
        
        if let Ok(Expr::StructLiteral(s)) = &expr {
            assert_eq!(s.fields.len(), 2);
            assert!(s.fields[0].is_shorthand);
            assert!(s.fields[1].is_shorthand);
        } else {
            panic!("Expected struct literal");
        }
    }

    #[test]
    fn test_struct_literal_mixed() {
        let (expr, handler) = parse_expr_source("Point { x, y: 2.0 }");
        assert!(!handler.has_errors());
        
        if let Ok(Expr::StructLiteral(s)) = &expr {
            assert_eq!(s.fields.len(), 2);
            assert!(s.fields[0].is_shorthand);
            assert!(!s.fields[1].is_shorthand);
        } else {
            panic!("Expected struct literal");
        }
    }

    #[test]
    fn test_struct_literal_with_base() {
        let (expr, handler) = parse_expr_source("Point { x: 1.0, ..base }");
        assert!(!handler.has_errors());
        
        if let Ok(Expr::StructLiteral(s)) = &expr {
            assert!(s.base.is_some());
        } else {
            panic!("Expected struct literal");
        }
    }

    #[test]
    fn test_struct_literal_turbofish() {
        let (expr, handler) = parse_expr_source("Vec::<i32> { data: 1 }");
        assert!(!handler.has_errors());
        
        if let Ok(Expr::StructLiteral(s)) = &expr {
            assert!(s.generics.is_some());
        } else {
            panic!("Expected struct literal");
        }
    }

    #[test]
    fn test_struct_literal_empty() {
        let (expr, handler) = parse_expr_source("Empty {}");
        assert!(!handler.has_errors());
        
        if let Ok(Expr::StructLiteral(s)) = &expr {
            assert!(s.fields.is_empty());
        } else {
            panic!("Expected struct literal");
        }
    }

    // =========================================================================
    // ENUM VARIANT CONSTRUCTION TESTS
    // =========================================================================

    #[test]
    fn test_enum_variant_unit() {
        let (expr, handler) = parse_expr_source("Option::None");
        assert!(!handler.has_errors());
        
        if let Ok(Expr::EnumVariant(e)) = &expr {
            assert_eq!(e.variant.as_str(), "None");
            assert!(matches!(e.data, EnumVariantData::Unit));
        } else {
            panic!("Expected enum variant");
        }
    }

    #[test]
    fn test_enum_variant_tuple() {
        let (expr, handler) = parse_expr_source("Option::Some(42)");
        assert!(!handler.has_errors());
        
        if let Ok(Expr::EnumVariant(e)) = &expr {
            assert_eq!(e.variant.as_str(), "Some");
            if let EnumVariantData::Tuple(args) = &e.data {
                assert_eq!(args.len(), 1);
            } else {
                panic!("Expected tuple variant");
            }
        } else {
            panic!("Expected enum variant");
        }
    }

    #[test]
    fn test_enum_variant_tuple_multiple_args() {
        let (expr, handler) = parse_expr_source("Result::Ok(value, extra)");
        assert!(!handler.has_errors());
        
        if let Ok(Expr::EnumVariant(e)) = &expr {
            if let EnumVariantData::Tuple(args) = &e.data {
                assert_eq!(args.len(), 2);
            } else {
                panic!("Expected tuple variant");
            }
        } else {
            panic!("Expected enum variant");
        }
    }

    #[test]
    fn test_enum_variant_struct() {
        let (expr, handler) = parse_expr_source("Message::Click { x: 1, y: 2 }");
        assert!(!handler.has_errors());
        
        if let Ok(Expr::EnumVariant(e)) = &expr {
            assert_eq!(e.variant.as_str(), "Click");
            if let EnumVariantData::Struct(fields) = &e.data {
                assert_eq!(fields.len(), 2);
            } else {
                panic!("Expected struct variant");
            }
        } else {
            panic!("Expected enum variant");
        }
    }

    #[test]
    fn test_enum_variant_turbofish() {
        let (expr, handler) = parse_expr_source("Option::Some::<i32>(42)");
        assert!(!handler.has_errors());
        
        if let Ok(Expr::EnumVariant(e)) = &expr {
            assert!(e.generics.is_some());
            assert_eq!(e.generics.as_ref().unwrap().len(), 1);
        } else {
            panic!("Expected enum variant");
        }
    }

    #[test]
    fn test_enum_variant_in_expression() {
        let (expr, handler) = parse_expr_source("match x { None => 0, Some(n) => n }");
        assert!(!handler.has_errors());
    }

    #[test]
    fn test_enum_variant_nested() {
        let (expr, handler) = parse_expr_source("Outer::Inner::Variant(1)");
        assert!(!handler.has_errors());
    }
}
