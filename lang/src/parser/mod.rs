pub mod ast;

use crate::lexer::{Token, TokenKind};
use ast::*;

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    ast: Ast,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            current: 0,
            ast: Ast::new(),
        }
    }

    pub fn parse_program(mut self) -> Result<Program, ParseError> {
        let mut body = Vec::new();

        while !self.is_at_end() {
            if self.check(&TokenKind::Newline) {
                self.advance();
                continue;
            }
            body.push(self.parse_statement()?);
        }

        let root = self.ast.push(NodeKind::Module { body }, None);
        Ok(Program {
            ast: self.ast,
            root,
        })
    }

    fn parse_statement(&mut self) -> Result<NodeId, ParseError> {
        match self.current_kind()? {
            TokenKind::Def => self.parse_def(),
            TokenKind::If => {
                self.advance(); // consume 'if'
                self.parse_if_rest()
            }
            TokenKind::While => self.parse_while(),
            _ => self.parse_simple_statement(),
        }
    }

    /// A single-line statement terminated by a newline
    fn parse_simple_statement(&mut self) -> Result<NodeId, ParseError> {
        let line = self.current_line();

        let stmt = match self.current_kind()? {
            TokenKind::Pass => {
                self.advance();
                self.ast.push(NodeKind::Pass, line)
            }
            TokenKind::Return => {
                self.advance();
                let value = if self.check(&TokenKind::Newline) {
                    None
                } else {
                    Some(self.parse_testlist()?)
                };
                self.ast.push(NodeKind::Return { value }, line)
            }
            _ => self.parse_expression_statement()?,
        };

        self.expect(TokenKind::Newline, "at end of statement")?;
        Ok(stmt)
    }

    /// `a = b = value` becomes one Assign with two targets
    fn parse_expression_statement(&mut self) -> Result<NodeId, ParseError> {
        let line = self.current_line();
        let first = self.parse_testlist()?;

        if !self.check(&TokenKind::Equal) {
            return Ok(self.ast.push(NodeKind::Expr { value: first }, line));
        }

        let mut targets = vec![first];
        let mut value = first;
        while self.check(&TokenKind::Equal) {
            self.advance();
            value = self.parse_testlist()?;
            targets.push(value);
        }
        targets.pop();

        Ok(self.ast.push(NodeKind::Assign { targets, value }, line))
    }

    fn parse_def(&mut self) -> Result<NodeId, ParseError> {
        let line = self.current_line();
        self.advance(); // consume 'def'

        let name = self.expect_identifier("after 'def'")?;
        self.expect(TokenKind::LeftParen, "after function name")?;
        let params = self.parse_params(TokenKind::RightParen)?;
        self.expect(TokenKind::RightParen, "after parameters")?;
        self.expect(TokenKind::Colon, "after function signature")?;
        let body = self.parse_suite()?;

        Ok(self.ast.push(NodeKind::FunctionDef { name, params, body }, line))
    }

    /// Everything after an `if` or `elif` keyword
    fn parse_if_rest(&mut self) -> Result<NodeId, ParseError> {
        let line = self.previous_line();
        let test = self.parse_test()?;
        self.expect(TokenKind::Colon, "after condition")?;
        let body = self.parse_suite()?;

        let orelse = match self.current_kind()? {
            TokenKind::Elif => {
                self.advance();
                vec![self.parse_if_rest()?]
            }
            TokenKind::Else => {
                self.advance();
                self.expect(TokenKind::Colon, "after 'else'")?;
                self.parse_suite()?
            }
            _ => Vec::new(),
        };

        Ok(self.ast.push(NodeKind::If { test, body, orelse }, line))
    }

    fn parse_while(&mut self) -> Result<NodeId, ParseError> {
        let line = self.current_line();
        self.advance(); // consume 'while'

        let test = self.parse_test()?;
        self.expect(TokenKind::Colon, "after condition")?;
        let body = self.parse_suite()?;

        Ok(self.ast.push(NodeKind::While { test, body }, line))
    }

    fn parse_suite(&mut self) -> Result<Vec<NodeId>, ParseError> {
        if !self.check(&TokenKind::Newline) {
            return Ok(vec![self.parse_simple_statement()?]);
        }

        self.advance(); // consume newline
        self.expect(TokenKind::Indent, "to start an indented block")?;

        let mut body = Vec::new();
        while !self.check(&TokenKind::Dedent) && !self.is_at_end() {
            body.push(self.parse_statement()?);
        }
        self.expect(TokenKind::Dedent, "to close an indented block")?;

        Ok(body)
    }

    /// Formal parameters up to (not including) `closing`
    fn parse_params(&mut self, closing: TokenKind) -> Result<Params, ParseError> {
        let mut params = Params::default();

        while !self.check(&closing) {
            let token = self.current_token()?.clone();

            if params.kwarg.is_some() {
                return Err(self.error_at(&token, "no parameters may follow '**' parameter"));
            }

            match token.kind {
                TokenKind::Star => {
                    self.advance();
                    if params.vararg.is_some() {
                        return Err(self.error_at(&token, "duplicate '*' parameter"));
                    }
                    params.vararg = Some(self.parse_param_name()?);
                }
                TokenKind::DoubleStar => {
                    self.advance();
                    params.kwarg = Some(self.parse_param_name()?);
                }
                TokenKind::Identifier(_) => {
                    if params.vararg.is_some() {
                        return Err(self.error_at(&token, "keyword-only parameters are not supported"));
                    }
                    let name = self.parse_param_name()?;
                    if self.check(&TokenKind::Equal) {
                        self.advance();
                        params.defaults.push(self.parse_test()?);
                    } else if !params.defaults.is_empty() {
                        return Err(self.error_at(&token, "non-default parameter follows default parameter"));
                    }
                    params.args.push(name);
                }
                _ => {
                    return Err(self.error_at(
                        &token,
                        &format!("Expected parameter name, got {:?}", token.kind),
                    ))
                }
            }

            if self.check(&TokenKind::Comma) {
                self.advance();
            } else if !self.check(&closing) {
                let token = self.current_token()?.clone();
                return Err(self.error_at(
                    &token,
                    &format!("Expected ',' or {:?} in parameters, got {:?}", closing, token.kind),
                ));
            }
        }

        Ok(params)
    }

    fn parse_param_name(&mut self) -> Result<NodeId, ParseError> {
        let line = self.current_line();
        let name = self.expect_identifier("as parameter name")?;
        Ok(self.ast.push(NodeKind::Name(name), line))
    }

    /// `test (',' test)* [',']`, a tuple when any comma is present
    fn parse_testlist(&mut self) -> Result<NodeId, ParseError> {
        let line = self.current_line();
        let first = self.parse_test()?;

        if !self.check(&TokenKind::Comma) {
            return Ok(first);
        }

        let mut elements = vec![first];
        while self.check(&TokenKind::Comma) {
            self.advance();
            if !self.starts_expression() {
                break;
            }
            elements.push(self.parse_test()?);
        }

        Ok(self.ast.push(NodeKind::Tuple(elements), line))
    }

    fn parse_test(&mut self) -> Result<NodeId, ParseError> {
        if self.check(&TokenKind::Lambda) {
            return self.parse_lambda();
        }
        self.parse_or()
    }

    fn parse_lambda(&mut self) -> Result<NodeId, ParseError> {
        let line = self.current_line();
        self.advance(); // consume 'lambda'

        let params = self.parse_params(TokenKind::Colon)?;
        self.expect(TokenKind::Colon, "after lambda parameters")?;
        let body = self.parse_test()?;

        Ok(self.ast.push(NodeKind::Lambda { params, body }, line))
    }

    fn parse_or(&mut self) -> Result<NodeId, ParseError> {
        self.parse_bool_chain(TokenKind::Or, BoolOp::Or, Self::parse_and)
    }

    fn parse_and(&mut self) -> Result<NodeId, ParseError> {
        self.parse_bool_chain(TokenKind::And, BoolOp::And, Self::parse_not)
    }

    /// `a or b or c` is one BoolOp with three values
    fn parse_bool_chain(
        &mut self,
        keyword: TokenKind,
        op: BoolOp,
        operand: fn(&mut Self) -> Result<NodeId, ParseError>,
    ) -> Result<NodeId, ParseError> {
        let line = self.current_line();
        let first = operand(self)?;

        if !self.check(&keyword) {
            return Ok(first);
        }

        let mut values = vec![first];
        while self.check(&keyword) {
            self.advance();
            values.push(operand(self)?);
        }

        Ok(self.ast.push(NodeKind::BoolOp { op, values }, line))
    }

    fn parse_not(&mut self) -> Result<NodeId, ParseError> {
        if self.check(&TokenKind::Not) {
            let line = self.current_line();
            self.advance();
            let operand = self.parse_not()?;
            return Ok(self.ast.push(
                NodeKind::UnaryOp {
                    op: UnaryOp::Not,
                    operand,
                },
                line,
            ));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<NodeId, ParseError> {
        let line = self.current_line();
        let left = self.parse_arith()?;

        let mut ops = Vec::new();
        let mut comparators = Vec::new();
        while let Some(op) = self.comparison_operator() {
            ops.push(op);
            comparators.push(self.parse_arith()?);
        }

        if ops.is_empty() {
            return Ok(left);
        }

        Ok(self.ast.push(
            NodeKind::Compare {
                left,
                ops,
                comparators,
            },
            line,
        ))
    }

    /// Consume a comparison operator, including the two-word `not in` and `is not`
    fn comparison_operator(&mut self) -> Option<CmpOp> {
        let kind = self.tokens.get(self.current)?.kind.clone();
        let op = match kind {
            TokenKind::EqualEqual => CmpOp::Eq,
            TokenKind::NotEqual => CmpOp::NotEq,
            TokenKind::Less => CmpOp::Lt,
            TokenKind::LessEqual => CmpOp::LtE,
            TokenKind::Greater => CmpOp::Gt,
            TokenKind::GreaterEqual => CmpOp::GtE,
            TokenKind::In => CmpOp::In,
            TokenKind::Not if self.peek_kind(1) == Some(&TokenKind::In) => {
                self.advance();
                CmpOp::NotIn
            }
            TokenKind::Is if self.peek_kind(1) == Some(&TokenKind::Not) => {
                self.advance();
                CmpOp::IsNot
            }
            TokenKind::Is => CmpOp::Is,
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    fn parse_arith(&mut self) -> Result<NodeId, ParseError> {
        let line = self.current_line();
        let mut left = self.parse_term()?;

        loop {
            let op = match self.current_kind()? {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_term()?;
            left = self.ast.push(NodeKind::BinOp { left, op, right }, line);
        }

        Ok(left)
    }

    fn parse_term(&mut self) -> Result<NodeId, ParseError> {
        let line = self.current_line();
        let mut left = self.parse_factor()?;

        loop {
            let op = match self.current_kind()? {
                TokenKind::Star => BinOp::Mult,
                TokenKind::Slash => BinOp::Div,
                TokenKind::DoubleSlash => BinOp::FloorDiv,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_factor()?;
            left = self.ast.push(NodeKind::BinOp { left, op, right }, line);
        }

        Ok(left)
    }

    fn parse_factor(&mut self) -> Result<NodeId, ParseError> {
        let line = self.current_line();
        let op = match self.current_kind()? {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Plus => UnaryOp::Plus,
            _ => return self.parse_power(),
        };
        self.advance();
        let operand = self.parse_factor()?;
        Ok(self.ast.push(NodeKind::UnaryOp { op, operand }, line))
    }

    /// `**` binds tighter than unary minus on its left and is right-associative
    fn parse_power(&mut self) -> Result<NodeId, ParseError> {
        let line = self.current_line();
        let left = self.parse_postfix()?;

        if !self.check(&TokenKind::DoubleStar) {
            return Ok(left);
        }

        self.advance();
        let right = self.parse_factor()?;
        Ok(self.ast.push(
            NodeKind::BinOp {
                left,
                op: BinOp::Pow,
                right,
            },
            line,
        ))
    }

    fn parse_postfix(&mut self) -> Result<NodeId, ParseError> {
        let mut expr = self.parse_atom()?;

        loop {
            let line = self.current_line();
            match self.current_kind()? {
                TokenKind::LeftParen => expr = self.parse_call(expr)?,
                TokenKind::LeftBracket => {
                    self.advance(); // consume '['
                    let index = self.parse_testlist()?;
                    self.expect(TokenKind::RightBracket, "after subscript")?;
                    expr = self.ast.push(NodeKind::Subscript { value: expr, index }, line);
                }
                TokenKind::Dot => {
                    self.advance(); // consume '.'
                    let attr = self.expect_identifier("after '.'")?;
                    expr = self.ast.push(NodeKind::Attribute { value: expr, attr }, line);
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    fn parse_call(&mut self, func: NodeId) -> Result<NodeId, ParseError> {
        let line = self.current_line();
        self.advance(); // consume '('

        let mut args = Vec::new();
        let mut keywords = Vec::new();

        while !self.check(&TokenKind::RightParen) {
            let token = self.current_token()?.clone();

            let is_keyword = matches!(token.kind, TokenKind::Identifier(_))
                && self.peek_kind(1) == Some(&TokenKind::Equal);

            if is_keyword {
                let arg = self.expect_identifier("as keyword name")?;
                self.advance(); // consume '='
                let value = self.parse_test()?;
                keywords.push(self.ast.push(NodeKind::Keyword { arg, value }, token_line(&token)));
            } else if !keywords.is_empty() {
                return Err(self.error_at(&token, "positional argument follows keyword argument"));
            } else {
                args.push(self.parse_test()?);
            }

            if self.check(&TokenKind::Comma) {
                self.advance();
            } else if !self.check(&TokenKind::RightParen) {
                let token = self.current_token()?.clone();
                return Err(self.error_at(
                    &token,
                    &format!("Expected ',' or ')' in call arguments, got {:?}", token.kind),
                ));
            }
        }
        self.advance(); // consume ')'

        Ok(self.ast.push(NodeKind::Call { func, args, keywords }, line))
    }

    fn parse_atom(&mut self) -> Result<NodeId, ParseError> {
        let token = self.current_token()?.clone();
        let line = token_line(&token);

        match token.kind {
            TokenKind::Integer(n) => {
                self.advance();
                Ok(self.ast.push(NodeKind::Num(Number::Int(n)), line))
            }
            TokenKind::Float(f) => {
                self.advance();
                Ok(self.ast.push(NodeKind::Num(Number::Float(f)), line))
            }
            TokenKind::String(s) => {
                self.advance();
                // Adjacent literals concatenate
                let mut value = s;
                while let TokenKind::String(next) = &self.current_kind()? {
                    value.push_str(next);
                    self.advance();
                }
                Ok(self.ast.push(NodeKind::Str(value), line))
            }
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(self.ast.push(NodeKind::Name(name), line))
            }
            TokenKind::LeftParen => {
                self.advance(); // consume '('
                if self.check(&TokenKind::RightParen) {
                    self.advance();
                    return Ok(self.ast.push(NodeKind::Tuple(Vec::new()), line));
                }
                let inner = self.parse_testlist()?;
                self.expect(TokenKind::RightParen, "to close parenthesis")?;
                Ok(inner)
            }
            TokenKind::LeftBracket => self.parse_list(),
            TokenKind::LeftBrace => self.parse_dict(),
            _ => Err(self.error_at(&token, &format!("Unexpected token: {:?}", token.kind))),
        }
    }

    fn parse_list(&mut self) -> Result<NodeId, ParseError> {
        let line = self.current_line();
        self.advance(); // consume '['

        let mut elements = Vec::new();
        while !self.check(&TokenKind::RightBracket) {
            elements.push(self.parse_test()?);

            if self.check(&TokenKind::Comma) {
                self.advance();
            } else if !self.check(&TokenKind::RightBracket) {
                let token = self.current_token()?.clone();
                return Err(self.error_at(&token, &format!("Expected ',' or ']', got {:?}", token.kind)));
            }
        }
        self.advance(); // consume ']'

        Ok(self.ast.push(NodeKind::List(elements), line))
    }

    fn parse_dict(&mut self) -> Result<NodeId, ParseError> {
        let line = self.current_line();
        self.advance(); // consume '{'

        let mut keys = Vec::new();
        let mut values = Vec::new();
        while !self.check(&TokenKind::RightBrace) {
            keys.push(self.parse_test()?);
            self.expect(TokenKind::Colon, "in dict literal")?;
            values.push(self.parse_test()?);

            if self.check(&TokenKind::Comma) {
                self.advance();
            } else if !self.check(&TokenKind::RightBrace) {
                let token = self.current_token()?.clone();
                return Err(self.error_at(
                    &token,
                    &format!("Expected ',' or '}}' in dict literal, got {:?}", token.kind),
                ));
            }
        }
        self.advance(); // consume '}'

        Ok(self.ast.push(NodeKind::Dict { keys, values }, line))
    }

    fn starts_expression(&self) -> bool {
        matches!(
            self.tokens.get(self.current).map(|t| &t.kind),
            Some(
                TokenKind::Integer(_)
                    | TokenKind::Float(_)
                    | TokenKind::String(_)
                    | TokenKind::Identifier(_)
                    | TokenKind::LeftParen
                    | TokenKind::LeftBracket
                    | TokenKind::LeftBrace
                    | TokenKind::Minus
                    | TokenKind::Plus
                    | TokenKind::Not
                    | TokenKind::Lambda
            )
        )
    }

    fn expect(&mut self, kind: TokenKind, context: &str) -> Result<(), ParseError> {
        let token = self.current_token()?.clone();
        if token.kind != kind {
            return Err(self.error_at(
                &token,
                &format!("Expected {:?} {}, got {:?}", kind, context, token.kind),
            ));
        }
        self.advance();
        Ok(())
    }

    fn expect_identifier(&mut self, context: &str) -> Result<String, ParseError> {
        let token = self.current_token()?.clone();
        match token.kind {
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.error_at(
                &token,
                &format!("Expected identifier {}, got {:?}", context, token.kind),
            )),
        }
    }

    fn error_at(&self, token: &Token, message: &str) -> ParseError {
        ParseError {
            message: message.to_string(),
            line: token.span.start.line as usize,
            column: token.span.start.column as usize,
        }
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.tokens.get(self.current).is_some_and(|t| &t.kind == kind)
    }

    fn peek_kind(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.current + offset).map(|t| &t.kind)
    }

    fn current_line(&self) -> Option<u32> {
        self.tokens.get(self.current).and_then(token_line)
    }

    fn previous_line(&self) -> Option<u32> {
        self.current
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .and_then(token_line)
    }

    fn current_kind(&self) -> Result<TokenKind, ParseError> {
        Ok(self.current_token()?.kind.clone())
    }

    fn current_token(&self) -> Result<&Token, ParseError> {
        self.tokens.get(self.current).ok_or_else(|| ParseError {
            message: "Unexpected end of input".to_string(),
            line: 0,
            column: 0,
        })
    }

    fn advance(&mut self) {
        if !self.is_at_end() {
            self.current += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        if self.current >= self.tokens.len() {
            return true;
        }
        matches!(self.tokens[self.current].kind, TokenKind::Eof)
    }
}

fn token_line(token: &Token) -> Option<u32> {
    Some(token.span.start.line)
}

pub fn parse(tokens: Vec<Token>) -> Result<Program, ParseError> {
    Parser::new(tokens).parse_program()
}
