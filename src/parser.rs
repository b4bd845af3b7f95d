use crate::ast::{AssignOp, BinaryOp, IfClause, Program, Stmt, UnaryOp};
use crate::error::{QuillError, Span};
use crate::lexer::{Token, TokenType};

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, current: 0 }
    }

    pub fn parse(&mut self) -> Result<Program, QuillError> {
        let mut statements = Vec::new();

        while !self.is_at_end() {
            if self.match_types(&[TokenType::Semicolon]) {
                continue;
            }
            statements.push(self.statement()?);
        }

        Ok(Program { statements })
    }

    fn statement(&mut self) -> Result<Stmt, QuillError> {
        if !self.check(&TokenType::Keyword) {
            return self.expression();
        }

        match self.peek().lexeme.as_str() {
            "let" | "con" => self.var_declaration(),
            "fn" => self.fn_declaration(),
            "delete" => self.delete_statement(),
            "exists" => self.exists_statement(),
            "if" => self.if_statement(),
            "while" => self.while_statement(),
            "for" => self.for_statement(),
            "return" => self.return_statement(),
            "break" => {
                let span = self.advance().span;
                self.with_unless(Stmt::Break { span })
            }
            "continue" => {
                let span = self.advance().span;
                self.with_unless(Stmt::Continue { span })
            }
            "do" => {
                let block = self.block()?;
                self.with_unless(block)
            }
            keyword => Err(QuillError::parse_error(
                self.peek().span,
                format!("Unexpected keyword '{}'.", keyword),
            )),
        }
    }

    /// Wraps a finished statement in `Unless` when an `unless <expr>`
    /// suffix follows.
    fn with_unless(&mut self, stmt: Stmt) -> Result<Stmt, QuillError> {
        if !self.check_keyword("unless") {
            return Ok(stmt);
        }
        self.advance();
        let condition = self.expression()?;
        let span = Span::merge(stmt.span(), condition.span());
        Ok(Stmt::Unless {
            condition: Box::new(condition),
            body: Box::new(stmt),
            span,
        })
    }

    fn var_declaration(&mut self) -> Result<Stmt, QuillError> {
        let keyword = self.advance().clone();
        let constant = keyword.lexeme == "con";

        let mut names = vec![self.identifier_name("in variable declaration")?];
        while self.match_types(&[TokenType::Comma]) {
            names.push(self.identifier_name("in variable declaration")?);
        }

        let mut values = Vec::new();
        if self.match_types(&[TokenType::Equal]) {
            values.push(self.expression()?);
            while self.match_types(&[TokenType::Comma]) {
                values.push(self.expression()?);
            }
        }

        let span = Span::merge(keyword.span, self.previous().span);
        if values.len() > names.len() {
            return Err(QuillError::parse_error(
                span,
                "Expected value count to not exceed identifier count.".to_string(),
            ));
        }
        if constant && values.is_empty() {
            return Err(QuillError::parse_error(
                span,
                "Expected constant variable to have an initial value.".to_string(),
            ));
        }
        if constant && values.len() != 1 && values.len() != names.len() {
            return Err(QuillError::parse_error(
                span,
                "Expected constant value count to be one or to match the identifier count."
                    .to_string(),
            ));
        }

        Ok(Stmt::VarDecl {
            constant,
            names,
            values,
            span,
        })
    }

    fn fn_declaration(&mut self) -> Result<Stmt, QuillError> {
        let keyword = self.advance().clone();
        let name = self.identifier_name("after 'fn'")?;
        self.consume(TokenType::LeftParen, "Expected '(' after function name.")?;

        let mut params = Vec::new();
        let mut param_defaults = Vec::new();
        if !self.check(&TokenType::RightParen) {
            loop {
                let param = self.identifier_name("in parameter list")?;
                if self.match_types(&[TokenType::Equal]) {
                    param_defaults.push(self.expression()?);
                } else if !param_defaults.is_empty() {
                    return Err(QuillError::parse_error(
                        self.previous().span,
                        "Expected parameters with default values to come last.".to_string(),
                    ));
                }
                params.push(param);

                if !self.match_types(&[TokenType::Comma]) {
                    break;
                }
                if self.check(&TokenType::RightParen) {
                    break;
                }
            }
        }
        self.consume(TokenType::RightParen, "Expected ')' after parameter list.")?;

        let mut return_name = None;
        let mut return_default = None;
        if self.match_types(&[TokenType::Arrow]) {
            return_name = Some(self.identifier_name("after '->'")?);
            if self.match_types(&[TokenType::Equal]) {
                return_default = Some(Box::new(self.expression()?));
            }
        }

        let body = self.block()?;
        let span = Span::merge(keyword.span, body.span());
        self.with_unless(Stmt::FnDecl {
            name,
            params,
            param_defaults,
            return_name,
            return_default,
            body: Box::new(body),
            span,
        })
    }

    fn delete_statement(&mut self) -> Result<Stmt, QuillError> {
        let keyword = self.advance().clone();

        let mut names = vec![self.identifier_name("after 'delete'")?];
        while self.match_types(&[TokenType::Comma]) {
            names.push(self.identifier_name("after 'delete'")?);
        }

        let span = Span::merge(keyword.span, self.previous().span);
        self.with_unless(Stmt::Delete { names, span })
    }

    fn exists_statement(&mut self) -> Result<Stmt, QuillError> {
        let keyword = self.advance().clone();
        let name = self.identifier_name("after 'exists'")?;
        let span = Span::merge(keyword.span, self.previous().span);
        Ok(Stmt::Exists { name, span })
    }

    fn if_statement(&mut self) -> Result<Stmt, QuillError> {
        let start = self.peek().span;

        let mut clauses = vec![self.if_clause()?];
        while self.check_keyword("elif") {
            clauses.push(self.if_clause()?);
        }

        let mut else_body = None;
        if self.check_keyword("else") {
            self.advance();
            else_body = Some(Box::new(self.block()?));
        }

        let span = Span::merge(start, self.previous().span);
        self.with_unless(Stmt::IfElse {
            clauses,
            else_body,
            span,
        })
    }

    fn if_clause(&mut self) -> Result<IfClause, QuillError> {
        let keyword = self.advance().clone();
        let condition = self.expression()?;
        let body = self.block()?;
        let span = Span::merge(keyword.span, body.span());
        Ok(IfClause {
            condition,
            body,
            span,
        })
    }

    fn while_statement(&mut self) -> Result<Stmt, QuillError> {
        let keyword = self.advance().clone();

        // `while { ... }` and `while do ...` loop forever.
        if self.check(&TokenType::LeftBrace) || self.check_keyword("do") {
            let body = self.block()?;
            let span = Span::merge(keyword.span, body.span());
            return Ok(Stmt::While {
                condition: None,
                body: Box::new(body),
                span,
            });
        }

        let condition = self.expression()?;
        let body = self.block()?;
        let span = Span::merge(keyword.span, body.span());
        self.with_unless(Stmt::While {
            condition: Some(Box::new(condition)),
            body: Box::new(body),
            span,
        })
    }

    fn for_statement(&mut self) -> Result<Stmt, QuillError> {
        let keyword = self.advance().clone();

        if self.check(&TokenType::LeftBrace) || self.check_keyword("do") {
            let body = self.block()?;
            let span = Span::merge(keyword.span, body.span());
            return Ok(Stmt::For {
                init: None,
                condition: None,
                step: None,
                body: Box::new(body),
                span,
            });
        }

        let init = if !self.check(&TokenType::Semicolon) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        self.consume(TokenType::Semicolon, "Expected ';' after for-loop initializer.")?;

        let condition = if !self.check(&TokenType::Semicolon) {
            Some(Box::new(self.expression()?))
        } else {
            None
        };
        self.consume(TokenType::Semicolon, "Expected ';' after for-loop condition.")?;

        let step = if !self.check(&TokenType::LeftBrace) && !self.check_keyword("do") {
            Some(Box::new(self.expression()?))
        } else {
            None
        };

        let body = self.block()?;
        let span = Span::merge(keyword.span, body.span());
        self.with_unless(Stmt::For {
            init,
            condition,
            step,
            body: Box::new(body),
            span,
        })
    }

    fn return_statement(&mut self) -> Result<Stmt, QuillError> {
        let keyword = self.advance().clone();
        let value = self.expression()?;
        let span = Span::merge(keyword.span, value.span());
        self.with_unless(Stmt::Return {
            value: Box::new(value),
            span,
        })
    }

    /// A block is either `{ ... }` or `do <statement>`.
    fn block(&mut self) -> Result<Stmt, QuillError> {
        if self.check_keyword("do") {
            let keyword = self.advance().clone();
            let stmt = self.statement()?;
            let span = Span::merge(keyword.span, stmt.span());
            return Ok(Stmt::Block {
                statements: vec![stmt],
                span,
            });
        }

        let brace = self
            .consume(TokenType::LeftBrace, "Expected a 'do' keyword or a block.")?
            .clone();

        let mut statements = Vec::new();
        while !self.check(&TokenType::RightBrace) && !self.is_at_end() {
            if self.match_types(&[TokenType::Semicolon]) {
                continue;
            }
            statements.push(self.statement()?);
        }

        let end = self
            .consume(TokenType::RightBrace, "Unterminated block.")?
            .clone();
        Ok(Stmt::Block {
            statements,
            span: Span::merge(brace.span, end.span),
        })
    }

    fn expression(&mut self) -> Result<Stmt, QuillError> {
        self.ternary()
    }

    fn ternary(&mut self) -> Result<Stmt, QuillError> {
        let mut expr = self.coalesce()?;

        while self.match_types(&[TokenType::Question]) {
            let then_branch = self.ternary()?;
            self.consume(TokenType::Colon, "Expected ':' in ternary expression.")?;
            let else_branch = self.ternary()?;
            let span = Span::merge(expr.span(), else_branch.span());
            expr = Stmt::Ternary {
                condition: Box::new(expr),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
                span,
            };
        }

        Ok(expr)
    }

    fn coalesce(&mut self) -> Result<Stmt, QuillError> {
        let mut expr = self.assignment()?;

        while self.match_types(&[TokenType::QuestionQuestion]) {
            let right = self.coalesce()?;
            let span = Span::merge(expr.span(), right.span());
            expr = Stmt::Binary {
                op: BinaryOp::NullCoalesce,
                left: Box::new(expr),
                right: Box::new(right),
                span,
            };
        }

        Ok(expr)
    }

    fn assignment(&mut self) -> Result<Stmt, QuillError> {
        let expr = self.logical_or()?;

        if let Some(op) = self.match_assign_op() {
            let op_token = self.previous().clone();
            let value = self.assignment()?;

            let name = match &expr {
                Stmt::Variable { name, .. } => name.clone(),
                _ => {
                    return Err(QuillError::parse_error(
                        op_token.span,
                        format!("Invalid assignment target for '{}'.", op_token.lexeme),
                    ));
                }
            };

            let span = Span::merge(expr.span(), value.span());
            return Ok(Stmt::Assign {
                op,
                name,
                value: Box::new(value),
                span,
            });
        }

        Ok(expr)
    }

    fn match_assign_op(&mut self) -> Option<AssignOp> {
        let op = match self.peek().token_type {
            TokenType::Equal => AssignOp::Assign,
            TokenType::PlusEqual => AssignOp::AddAssign,
            TokenType::MinusEqual => AssignOp::SubtractAssign,
            TokenType::StarEqual => AssignOp::MultiplyAssign,
            TokenType::SlashEqual => AssignOp::DivideAssign,
            TokenType::PercentEqual => AssignOp::RemainderAssign,
            TokenType::StarStarEqual => AssignOp::ExponentiateAssign,
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    fn logical_or(&mut self) -> Result<Stmt, QuillError> {
        let mut expr = self.logical_and()?;

        while self.match_types(&[TokenType::OrOr]) {
            let right = self.logical_and()?;
            let span = Span::merge(expr.span(), right.span());
            expr = Stmt::Binary {
                op: BinaryOp::Or,
                left: Box::new(expr),
                right: Box::new(right),
                span,
            };
        }

        Ok(expr)
    }

    fn logical_and(&mut self) -> Result<Stmt, QuillError> {
        let mut expr = self.equality()?;

        while self.match_types(&[TokenType::AndAnd]) {
            let right = self.equality()?;
            let span = Span::merge(expr.span(), right.span());
            expr = Stmt::Binary {
                op: BinaryOp::And,
                left: Box::new(expr),
                right: Box::new(right),
                span,
            };
        }

        Ok(expr)
    }

    fn equality(&mut self) -> Result<Stmt, QuillError> {
        let mut expr = self.comparison()?;

        while self.match_types(&[
            TokenType::EqualEqual,
            TokenType::EqualEqualEqual,
            TokenType::BangEqual,
            TokenType::BangEqualEqual,
            TokenType::PercentPercent,
        ]) {
            let op = match self.previous().token_type {
                TokenType::EqualEqual => BinaryOp::Equal,
                TokenType::EqualEqualEqual => BinaryOp::StrictEqual,
                TokenType::BangEqual => BinaryOp::NotEqual,
                TokenType::BangEqualEqual => BinaryOp::StrictNotEqual,
                TokenType::PercentPercent => BinaryOp::Divisible,
                _ => unreachable!(),
            };
            let right = self.comparison()?;
            let span = Span::merge(expr.span(), right.span());
            expr = Stmt::Binary {
                op,
                left: Box::new(expr),
                right: Box::new(right),
                span,
            };
        }

        Ok(expr)
    }

    fn comparison(&mut self) -> Result<Stmt, QuillError> {
        let mut expr = self.term()?;

        while self.match_types(&[
            TokenType::Greater,
            TokenType::GreaterEqual,
            TokenType::Less,
            TokenType::LessEqual,
        ]) {
            let op = match self.previous().token_type {
                TokenType::Greater => BinaryOp::Greater,
                TokenType::GreaterEqual => BinaryOp::GreaterEqual,
                TokenType::Less => BinaryOp::Less,
                TokenType::LessEqual => BinaryOp::LessEqual,
                _ => unreachable!(),
            };
            let right = self.term()?;
            let span = Span::merge(expr.span(), right.span());
            expr = Stmt::Binary {
                op,
                left: Box::new(expr),
                right: Box::new(right),
                span,
            };
        }

        Ok(expr)
    }

    fn term(&mut self) -> Result<Stmt, QuillError> {
        let mut expr = self.factor()?;

        while self.match_types(&[TokenType::Plus, TokenType::Minus]) {
            let op = match self.previous().token_type {
                TokenType::Plus => BinaryOp::Add,
                TokenType::Minus => BinaryOp::Subtract,
                _ => unreachable!(),
            };
            let right = self.factor()?;
            let span = Span::merge(expr.span(), right.span());
            expr = Stmt::Binary {
                op,
                left: Box::new(expr),
                right: Box::new(right),
                span,
            };
        }

        Ok(expr)
    }

    fn factor(&mut self) -> Result<Stmt, QuillError> {
        let mut expr = self.power()?;

        while self.match_types(&[TokenType::Star, TokenType::Slash, TokenType::Percent]) {
            let op = match self.previous().token_type {
                TokenType::Star => BinaryOp::Multiply,
                TokenType::Slash => BinaryOp::Divide,
                TokenType::Percent => BinaryOp::Remainder,
                _ => unreachable!(),
            };
            let right = self.power()?;
            let span = Span::merge(expr.span(), right.span());
            expr = Stmt::Binary {
                op,
                left: Box::new(expr),
                right: Box::new(right),
                span,
            };
        }

        Ok(expr)
    }

    fn power(&mut self) -> Result<Stmt, QuillError> {
        let expr = self.unary()?;

        if self.match_types(&[TokenType::StarStar]) {
            let right = self.power()?;
            let span = Span::merge(expr.span(), right.span());
            return Ok(Stmt::Binary {
                op: BinaryOp::Exponentiate,
                left: Box::new(expr),
                right: Box::new(right),
                span,
            });
        }

        Ok(expr)
    }

    fn unary(&mut self) -> Result<Stmt, QuillError> {
        let mut ops = Vec::new();
        loop {
            let op = match self.peek().token_type {
                TokenType::Plus => UnaryOp::Identity,
                TokenType::Minus => UnaryOp::Negate,
                TokenType::Bang => UnaryOp::Not,
                _ => break,
            };
            ops.push((op, self.advance().span));
        }

        let mut expr = self.postfix()?;
        for (op, op_span) in ops.into_iter().rev() {
            let span = Span::merge(op_span, expr.span());
            expr = Stmt::Unary {
                op,
                operand: Box::new(expr),
                span,
            };
        }
        Ok(expr)
    }

    fn postfix(&mut self) -> Result<Stmt, QuillError> {
        let expr = self.call()?;

        if self.match_types(&[TokenType::PlusPlus, TokenType::MinusMinus]) {
            let token = self.previous().clone();
            let op = if token.token_type == TokenType::PlusPlus {
                UnaryOp::Increment
            } else {
                UnaryOp::Decrement
            };
            let span = Span::merge(expr.span(), token.span);
            return Ok(Stmt::Unary {
                op,
                operand: Box::new(expr),
                span,
            });
        }

        Ok(expr)
    }

    fn call(&mut self) -> Result<Stmt, QuillError> {
        let mut expr = self.primary()?;

        if matches!(expr, Stmt::Variable { .. }) {
            while self.check(&TokenType::LeftParen) {
                let args = self.arguments()?;
                let span = Span::merge(expr.span(), self.previous().span);
                expr = Stmt::Call {
                    callee: Box::new(expr),
                    args,
                    span,
                };
            }
        }

        Ok(expr)
    }

    fn arguments(&mut self) -> Result<Vec<Stmt>, QuillError> {
        self.consume(TokenType::LeftParen, "Expected '(' before arguments.")?;

        let mut args = Vec::new();
        if !self.check(&TokenType::RightParen) {
            loop {
                args.push(self.expression()?);
                if !self.match_types(&[TokenType::Comma]) {
                    break;
                }
                if self.check(&TokenType::RightParen) {
                    break;
                }
            }
        }

        self.consume(TokenType::RightParen, "Expected ')' after arguments.")?;
        Ok(args)
    }

    fn primary(&mut self) -> Result<Stmt, QuillError> {
        // Keywords in expression position dispatch back to statement
        // parsing: conditionals, loops and declarations all yield values.
        if self.check(&TokenType::Keyword) {
            return self.statement();
        }
        if self.check(&TokenType::LeftBrace) {
            return self.block();
        }
        if self.is_at_end() {
            return Err(QuillError::parse_error(
                self.peek().span,
                "Unexpected end of input.".to_string(),
            ));
        }

        let token = self.advance().clone();
        match token.token_type {
            TokenType::Identifier => Ok(Stmt::Variable {
                name: token.lexeme,
                span: token.span,
            }),
            TokenType::Number => {
                let value = token.lexeme.parse::<f64>().map_err(|_| {
                    QuillError::parse_error(token.span, "Invalid number literal.".to_string())
                })?;
                Ok(Stmt::Number {
                    value,
                    span: token.span,
                })
            }
            TokenType::Character => Ok(Stmt::Char {
                value: token.lexeme.chars().next().map(|c| c as u8).unwrap_or(0),
                span: token.span,
            }),
            TokenType::Str => Ok(Stmt::Str {
                value: token.lexeme,
                span: token.span,
            }),
            TokenType::LeftParen => {
                let expr = self.expression()?;
                self.consume(TokenType::RightParen, "Expected ')' after expression.")?;
                Ok(expr)
            }
            _ => Err(QuillError::parse_error(
                token.span,
                format!(
                    "Expected primary expression, got '{}' instead.",
                    token.token_type
                ),
            )),
        }
    }

    fn identifier_name(&mut self, context: &str) -> Result<String, QuillError> {
        if self.check(&TokenType::Identifier) {
            Ok(self.advance().lexeme.clone())
        } else {
            Err(QuillError::parse_error(
                self.peek().span,
                format!(
                    "Expected identifier {}, got '{}' instead.",
                    context,
                    self.peek().token_type
                ),
            ))
        }
    }

    fn match_types(&mut self, types: &[TokenType]) -> bool {
        for token_type in types {
            if self.check(token_type) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn check(&self, token_type: &TokenType) -> bool {
        &self.peek().token_type == token_type
    }

    fn check_keyword(&self, word: &str) -> bool {
        self.peek().token_type == TokenType::Keyword && self.peek().lexeme == word
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().token_type == TokenType::Eof
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn consume(&mut self, token_type: TokenType, message: &str) -> Result<&Token, QuillError> {
        if self.check(&token_type) {
            Ok(self.advance())
        } else {
            let span = if self.is_at_end() && self.current > 0 {
                Span::single(self.tokens[self.current - 1].span.end)
            } else {
                self.peek().span
            };
            Err(QuillError::parse_error(span, message.to_string()))
        }
    }
}
