use crate::error::{QuillError, Span};
use std::collections::{HashMap, HashSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenType {
    // Postfix and assignment operators
    PlusPlus,
    MinusMinus,
    Equal,
    PlusEqual,
    MinusEqual,
    StarEqual,
    SlashEqual,
    PercentEqual,
    StarStarEqual,

    // Arithmetic operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    StarStar,

    // Logical, comparison and conditional operators
    AndAnd,
    OrOr,
    Bang,
    PercentPercent,
    QuestionQuestion,
    Question,
    Colon,
    EqualEqual,
    EqualEqualEqual,
    BangEqual,
    BangEqualEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,

    // Punctuation
    Arrow,
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Comma,
    Dot,
    Semicolon,

    // Literals and words
    Keyword,
    Identifier,
    Number,
    Character,
    Str,

    // Special
    Eof,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let text = match self {
            TokenType::PlusPlus => "++",
            TokenType::MinusMinus => "--",
            TokenType::Equal => "=",
            TokenType::PlusEqual => "+=",
            TokenType::MinusEqual => "-=",
            TokenType::StarEqual => "*=",
            TokenType::SlashEqual => "/=",
            TokenType::PercentEqual => "%=",
            TokenType::StarStarEqual => "**=",
            TokenType::Plus => "+",
            TokenType::Minus => "-",
            TokenType::Star => "*",
            TokenType::Slash => "/",
            TokenType::Percent => "%",
            TokenType::StarStar => "**",
            TokenType::AndAnd => "&&",
            TokenType::OrOr => "||",
            TokenType::Bang => "!",
            TokenType::PercentPercent => "%%",
            TokenType::QuestionQuestion => "??",
            TokenType::Question => "?",
            TokenType::Colon => ":",
            TokenType::EqualEqual => "==",
            TokenType::EqualEqualEqual => "===",
            TokenType::BangEqual => "!=",
            TokenType::BangEqualEqual => "!==",
            TokenType::Greater => ">",
            TokenType::GreaterEqual => ">=",
            TokenType::Less => "<",
            TokenType::LessEqual => "<=",
            TokenType::Arrow => "->",
            TokenType::LeftParen => "(",
            TokenType::RightParen => ")",
            TokenType::LeftBrace => "{",
            TokenType::RightBrace => "}",
            TokenType::LeftBracket => "[",
            TokenType::RightBracket => "]",
            TokenType::Comma => ",",
            TokenType::Dot => ".",
            TokenType::Semicolon => ";",
            TokenType::Keyword => "Keyword",
            TokenType::Identifier => "Identifier",
            TokenType::Number => "Number",
            TokenType::Character => "Character",
            TokenType::Str => "String",
            TokenType::Eof => "EOF",
        };
        write!(f, "{}", text)
    }
}

#[derive(Debug, Clone)]
pub struct Token {
    pub token_type: TokenType,
    pub lexeme: String,
    pub span: Span,
}

impl Token {
    pub fn new(token_type: TokenType, lexeme: String, span: Span) -> Self {
        Self {
            token_type,
            lexeme,
            span,
        }
    }
}

pub struct Lexer {
    source: String,
    tokens: Vec<Token>,
    start: usize,
    current: usize,
    keywords: HashSet<&'static str>,
    keyword_operators: HashMap<&'static str, TokenType>,
}

impl Lexer {
    pub fn new(source: String) -> Self {
        let keywords = HashSet::from([
            "let", "con", "delete", "exists", "if", "elif", "else", "while", "for", "fn", "do",
            "break", "continue", "return", "unless",
        ]);

        // Word-spelled operators tokenize as their symbolic counterparts.
        let keyword_operators = HashMap::from([
            ("and", TokenType::AndAnd),
            ("or", TokenType::OrOr),
            ("not", TokenType::Bang),
            ("is", TokenType::EqualEqualEqual),
            ("isnot", TokenType::BangEqualEqual),
        ]);

        Self {
            source,
            tokens: Vec::new(),
            start: 0,
            current: 0,
            keywords,
            keyword_operators,
        }
    }

    pub fn scan_tokens(&mut self) -> Result<Vec<Token>, QuillError> {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token()?;
        }

        self.tokens.push(Token::new(
            TokenType::Eof,
            "".to_string(),
            Span::single(self.current),
        ));

        Ok(self.tokens.clone())
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn scan_token(&mut self) -> Result<(), QuillError> {
        let c = self.advance();

        match c {
            b'(' => self.add_token(TokenType::LeftParen),
            b')' => self.add_token(TokenType::RightParen),
            b'{' => self.add_token(TokenType::LeftBrace),
            b'}' => self.add_token(TokenType::RightBrace),
            b'[' => self.add_token(TokenType::LeftBracket),
            b']' => self.add_token(TokenType::RightBracket),
            b',' => self.add_token(TokenType::Comma),
            b'.' => self.add_token(TokenType::Dot),
            b':' => self.add_token(TokenType::Colon),
            b';' => self.add_token(TokenType::Semicolon),
            b'+' => {
                let token_type = if self.match_byte(b'+') {
                    TokenType::PlusPlus
                } else if self.match_byte(b'=') {
                    TokenType::PlusEqual
                } else {
                    TokenType::Plus
                };
                self.add_token(token_type);
            }
            b'-' => {
                let token_type = if self.match_byte(b'-') {
                    TokenType::MinusMinus
                } else if self.match_byte(b'=') {
                    TokenType::MinusEqual
                } else if self.match_byte(b'>') {
                    TokenType::Arrow
                } else {
                    TokenType::Minus
                };
                self.add_token(token_type);
            }
            b'*' => {
                let token_type = if self.match_byte(b'*') {
                    if self.match_byte(b'=') {
                        TokenType::StarStarEqual
                    } else {
                        TokenType::StarStar
                    }
                } else if self.match_byte(b'=') {
                    TokenType::StarEqual
                } else {
                    TokenType::Star
                };
                self.add_token(token_type);
            }
            b'%' => {
                let token_type = if self.match_byte(b'%') {
                    TokenType::PercentPercent
                } else if self.match_byte(b'=') {
                    TokenType::PercentEqual
                } else {
                    TokenType::Percent
                };
                self.add_token(token_type);
            }
            b'?' => {
                let token_type = if self.match_byte(b'?') {
                    TokenType::QuestionQuestion
                } else {
                    TokenType::Question
                };
                self.add_token(token_type);
            }
            b'!' => {
                let token_type = if self.match_byte(b'=') {
                    if self.match_byte(b'=') {
                        TokenType::BangEqualEqual
                    } else {
                        TokenType::BangEqual
                    }
                } else {
                    TokenType::Bang
                };
                self.add_token(token_type);
            }
            b'=' => {
                let token_type = if self.match_byte(b'=') {
                    if self.match_byte(b'=') {
                        TokenType::EqualEqualEqual
                    } else {
                        TokenType::EqualEqual
                    }
                } else {
                    TokenType::Equal
                };
                self.add_token(token_type);
            }
            b'<' => {
                let token_type = if self.match_byte(b'=') {
                    TokenType::LessEqual
                } else {
                    TokenType::Less
                };
                self.add_token(token_type);
            }
            b'>' => {
                let token_type = if self.match_byte(b'=') {
                    TokenType::GreaterEqual
                } else {
                    TokenType::Greater
                };
                self.add_token(token_type);
            }
            b'&' => {
                if self.match_byte(b'&') {
                    self.add_token(TokenType::AndAnd);
                } else {
                    return Err(QuillError::lex_error(
                        Span::single(self.start),
                        "Unexpected character: '&'.".to_string(),
                    ));
                }
            }
            b'|' => {
                if self.match_byte(b'|') {
                    self.add_token(TokenType::OrOr);
                } else {
                    return Err(QuillError::lex_error(
                        Span::single(self.start),
                        "Unexpected character: '|'.".to_string(),
                    ));
                }
            }
            b'/' => {
                if self.match_byte(b'/') {
                    while self.peek() != b'\n' && !self.is_at_end() {
                        self.advance();
                    }
                } else if self.match_byte(b'*') {
                    self.block_comment()?;
                } else if self.match_byte(b'=') {
                    self.add_token(TokenType::SlashEqual);
                } else {
                    self.add_token(TokenType::Slash);
                }
            }
            b' ' | b'\r' | b'\t' | b'\n' => {}
            b'"' => self.string()?,
            b'\'' => self.character()?,
            c if c.is_ascii_digit() => self.number()?,
            c if c.is_ascii_alphabetic() || c == b'_' => self.identifier(),
            c => {
                return Err(QuillError::lex_error(
                    Span::single(self.start),
                    format!("Unexpected character: '{}'.", c as char),
                ));
            }
        }

        Ok(())
    }

    fn advance(&mut self) -> u8 {
        let c = self.peek();
        self.current += 1;
        c
    }

    fn match_byte(&mut self, expected: u8) -> bool {
        if self.is_at_end() || self.peek() != expected {
            false
        } else {
            self.current += 1;
            true
        }
    }

    fn peek(&self) -> u8 {
        if self.current >= self.source.len() {
            return 0;
        }
        self.source.as_bytes()[self.current]
    }

    fn block_comment(&mut self) -> Result<(), QuillError> {
        while !self.is_at_end() && !(self.peek() == b'*' && self.peek_next() == b'/') {
            self.advance();
        }

        if self.is_at_end() {
            return Err(QuillError::lex_error(
                Span::new(self.start, self.start + 2),
                "Unterminated block comment.".to_string(),
            ));
        }

        // Consume the closing "*/"
        self.advance();
        self.advance();
        Ok(())
    }

    fn peek_next(&self) -> u8 {
        if self.current + 1 >= self.source.len() {
            return 0;
        }
        self.source.as_bytes()[self.current + 1]
    }

    fn string(&mut self) -> Result<(), QuillError> {
        let mut content = Vec::new();

        while !self.is_at_end() && self.peek() != b'"' {
            let c = self.advance();
            if c == b'\\' {
                let escape = self.advance();
                content.push(self.escape_code(escape)?);
            } else {
                content.push(c);
            }
        }

        if self.is_at_end() {
            return Err(QuillError::lex_error(
                Span::single(self.start),
                "Unterminated string.".to_string(),
            ));
        }

        // Consume the closing quote
        self.advance();
        self.add_token_with_content(
            TokenType::Str,
            String::from_utf8_lossy(&content).into_owned(),
        );
        Ok(())
    }

    fn character(&mut self) -> Result<(), QuillError> {
        let mut c = self.advance();
        if c == b'\\' {
            let escape = self.advance();
            c = self.escape_code(escape)?;
        }

        if self.advance() != b'\'' {
            return Err(QuillError::lex_error(
                Span::new(self.start, self.current.min(self.source.len())),
                "Expected character literal to be exactly one character long.".to_string(),
            ));
        }

        self.add_token_with_content(TokenType::Character, (c as char).to_string());
        Ok(())
    }

    fn escape_code(&self, escape: u8) -> Result<u8, QuillError> {
        match escape {
            b'a' => Ok(0x07),
            b'b' => Ok(0x08),
            b't' => Ok(b'\t'),
            b'n' => Ok(b'\n'),
            b'v' => Ok(0x0B),
            b'f' => Ok(0x0C),
            b'r' => Ok(b'\r'),
            b'e' => Ok(0x1B),
            b'\\' => Ok(b'\\'),
            b'\'' => Ok(b'\''),
            b'"' => Ok(b'"'),
            _ => Err(QuillError::lex_error(
                Span::new(self.current.saturating_sub(2), self.current),
                format!("Unknown escape code '\\{}'.", escape as char),
            )),
        }
    }

    fn number(&mut self) -> Result<(), QuillError> {
        let first = self.source.as_bytes()[self.start];
        let radix = if first == b'0' {
            match self.peek() {
                b'b' | b'B' => Some(2),
                b'o' | b'O' => Some(8),
                b'x' | b'X' => Some(16),
                _ => None,
            }
        } else {
            None
        };

        let mut digits = String::new();
        if radix.is_some() {
            // Consume the radix letter; the leading zero carries no value.
            self.advance();
        } else {
            digits.push(first as char);
        }

        let mut seen_dot = false;
        let mut seen_exponent = false;
        // `_`, `.` and `e` are all separators: none may repeat or stack.
        let mut last_separator = false;

        loop {
            let c = self.peek();
            if c.is_ascii_digit() || (radix == Some(16) && matches!(c, b'a'..=b'f' | b'A'..=b'F'))
            {
                digits.push(self.advance() as char);
                last_separator = false;
            } else if c == b'_' {
                if last_separator {
                    return Err(self.number_error("two or more consecutive separators"));
                }
                last_separator = true;
                self.advance();
            } else if c == b'.' && radix.is_none() && !seen_dot && !seen_exponent {
                if last_separator {
                    return Err(self.number_error("two or more consecutive separators"));
                }
                seen_dot = true;
                last_separator = true;
                digits.push(self.advance() as char);
            } else if c == b'e' || c == b'E' {
                if radix.is_some() {
                    return Err(self.number_error("a radix prefix and an exponent"));
                }
                if seen_exponent {
                    return Err(self.number_error("more than one exponent"));
                }
                if last_separator {
                    return Err(self.number_error("two or more consecutive separators"));
                }
                seen_exponent = true;
                last_separator = true;
                self.advance();
                digits.push('e');
                if matches!(self.peek(), b'+' | b'-') {
                    digits.push(self.advance() as char);
                }
            } else {
                break;
            }
        }

        if last_separator {
            return Err(QuillError::lex_error(
                Span::new(self.start, self.current),
                "Expected number to not end with '_', 'e' or '.'.".to_string(),
            ));
        }

        let span = Span::new(self.start, self.current);
        let value = match radix {
            Some(radix) => {
                if digits.is_empty() {
                    return Err(QuillError::lex_error(
                        span,
                        "Expected number to not only contain the radix prefix.".to_string(),
                    ));
                }
                match u64::from_str_radix(&digits, radix) {
                    Ok(value) => value as f64,
                    Err(_) => {
                        return Err(QuillError::lex_error(
                            span,
                            format!(
                                "Prefixed number '{}' is out of range or has invalid digits.",
                                digits
                            ),
                        ));
                    }
                }
            }
            None => match digits.parse::<f64>() {
                Ok(value) if value.is_finite() => value,
                _ => {
                    return Err(QuillError::lex_error(
                        span,
                        format!("Number '{}' is out of range or invalid.", digits),
                    ));
                }
            },
        };

        // Prefixed and scientific literals are stored in decimal form.
        self.add_token_with_content(TokenType::Number, value.to_string());
        Ok(())
    }

    fn number_error(&self, what: &str) -> QuillError {
        QuillError::lex_error(
            Span::new(self.start, self.current + 1),
            format!("Expected number to not contain {}.", what),
        )
    }

    fn identifier(&mut self) {
        while self.peek().is_ascii_alphanumeric() || self.peek() == b'_' {
            self.advance();
        }

        let text = &self.source[self.start..self.current];
        if let Some(&token_type) = self.keyword_operators.get(text) {
            self.add_token(token_type);
        } else if self.keywords.contains(text) {
            self.add_token(TokenType::Keyword);
        } else {
            self.add_token(TokenType::Identifier);
        }
    }

    fn add_token(&mut self, token_type: TokenType) {
        let text = &self.source[self.start..self.current];
        self.add_token_with_content(token_type, text.to_string());
    }

    fn add_token_with_content(&mut self, token_type: TokenType, lexeme: String) {
        self.tokens.push(Token::new(
            token_type,
            lexeme,
            Span::new(self.start, self.current),
        ));
    }
}
