pub mod token;

pub use token::{Token, TokenKind};
use token::{Position, Span};

#[cfg(test)]
mod tests;

#[derive(Debug, Clone, PartialEq)]
pub enum LexError {
    UnexpectedCharacter { ch: char, position: Position },
    UnterminatedString { position: Position },
    InvalidNumber { text: String, position: Position },
    InconsistentIndentation { position: Position },
}

pub type LexResult = Result<Vec<Token>, LexError>;

pub fn lex(input: &str) -> LexResult {
    let mut lexer = Lexer::new(input);
    lexer.lex_all()
}

struct Lexer {
    input: Vec<char>,
    position: usize,
    line: u32,
    column: u32,
    /// Indentation widths of the enclosing blocks; the bottom entry is always 0.
    indents: Vec<u32>,
    /// Open bracket nesting. Newlines inside brackets are not significant.
    depth: usize,
    at_line_start: bool,
}

impl Lexer {
    fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            indents: vec![0],
            depth: 0,
            at_line_start: true,
        }
    }

    fn lex_all(&mut self) -> LexResult {
        let mut tokens = Vec::new();

        loop {
            if self.at_line_start && self.depth == 0 {
                self.lex_indentation(&mut tokens)?;
            }

            self.skip_inline_whitespace();

            if self.is_at_end() {
                break;
            }

            if self.peek() == '\n' {
                let start = self.current_position();
                self.advance_line();
                if self.depth == 0 {
                    tokens.push(Token::new(TokenKind::Newline, Span::new(start, start)));
                    self.at_line_start = true;
                }
                continue;
            }

            tokens.push(self.next_token()?);
        }

        let pos = self.current_position();
        if !matches!(tokens.last().map(|t: &Token| &t.kind), None | Some(TokenKind::Newline)) {
            tokens.push(Token::new(TokenKind::Newline, Span::new(pos, pos)));
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            tokens.push(Token::new(TokenKind::Dedent, Span::new(pos, pos)));
        }
        tokens.push(Token::new(TokenKind::Eof, Span::new(pos, pos)));

        Ok(tokens)
    }

    /// Measure the indentation of the next logical line and emit Indent/Dedent tokens.
    /// Blank and comment-only lines are consumed without producing tokens.
    fn lex_indentation(&mut self, tokens: &mut Vec<Token>) -> Result<(), LexError> {
        loop {
            let mut width = 0u32;
            while !self.is_at_end() {
                match self.peek() {
                    ' ' => {
                        width += 1;
                        self.advance();
                    }
                    '\t' => {
                        width += 8 - width % 8;
                        self.advance();
                    }
                    '\r' | '\x0c' => {
                        self.advance();
                    }
                    _ => break,
                }
            }

            if self.peek() == '#' {
                self.skip_comment();
            }

            if self.is_at_end() {
                self.at_line_start = false;
                return Ok(());
            }

            if self.peek() == '\n' {
                self.advance_line();
                continue;
            }

            self.at_line_start = false;
            let pos = self.current_position();
            let span = Span::new(pos, pos);
            let current = self.indents.last().copied().unwrap_or(0);

            if width > current {
                self.indents.push(width);
                tokens.push(Token::new(TokenKind::Indent, span));
            } else {
                while width < self.indents.last().copied().unwrap_or(0) {
                    self.indents.pop();
                    tokens.push(Token::new(TokenKind::Dedent, span));
                }
                if width != self.indents.last().copied().unwrap_or(0) {
                    return Err(LexError::InconsistentIndentation { position: pos });
                }
            }

            return Ok(());
        }
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        let start = self.current_position();
        let ch = self.peek();

        let kind = match ch {
            '0'..='9' => self.lex_number()?,
            '"' | '\'' => self.lex_string(ch)?,
            'a'..='z' | 'A'..='Z' | '_' => self.lex_identifier_or_keyword(),
            '+' => {
                self.advance();
                TokenKind::Plus
            }
            '-' => {
                self.advance();
                TokenKind::Minus
            }
            '*' => {
                self.advance();
                if self.peek() == '*' {
                    self.advance();
                    TokenKind::DoubleStar
                } else {
                    TokenKind::Star
                }
            }
            '/' => {
                self.advance();
                if self.peek() == '/' {
                    self.advance();
                    TokenKind::DoubleSlash
                } else {
                    TokenKind::Slash
                }
            }
            '%' => {
                self.advance();
                TokenKind::Percent
            }
            '=' => {
                self.advance();
                if self.peek() == '=' {
                    self.advance();
                    TokenKind::EqualEqual
                } else {
                    TokenKind::Equal
                }
            }
            '!' => {
                self.advance();
                if self.peek() == '=' {
                    self.advance();
                    TokenKind::NotEqual
                } else {
                    return Err(LexError::UnexpectedCharacter {
                        ch: '!',
                        position: start,
                    });
                }
            }
            '<' => {
                self.advance();
                if self.peek() == '=' {
                    self.advance();
                    TokenKind::LessEqual
                } else {
                    TokenKind::Less
                }
            }
            '>' => {
                self.advance();
                if self.peek() == '=' {
                    self.advance();
                    TokenKind::GreaterEqual
                } else {
                    TokenKind::Greater
                }
            }
            '(' => {
                self.advance();
                self.depth += 1;
                TokenKind::LeftParen
            }
            ')' => {
                self.advance();
                self.depth = self.depth.saturating_sub(1);
                TokenKind::RightParen
            }
            '[' => {
                self.advance();
                self.depth += 1;
                TokenKind::LeftBracket
            }
            ']' => {
                self.advance();
                self.depth = self.depth.saturating_sub(1);
                TokenKind::RightBracket
            }
            '{' => {
                self.advance();
                self.depth += 1;
                TokenKind::LeftBrace
            }
            '}' => {
                self.advance();
                self.depth = self.depth.saturating_sub(1);
                TokenKind::RightBrace
            }
            ',' => {
                self.advance();
                TokenKind::Comma
            }
            ':' => {
                self.advance();
                TokenKind::Colon
            }
            '.' => {
                self.advance();
                TokenKind::Dot
            }
            _ => {
                return Err(LexError::UnexpectedCharacter {
                    ch,
                    position: start,
                })
            }
        };

        let end = self.current_position();
        Ok(Token::new(kind, Span::new(start, end)))
    }

    fn lex_identifier_or_keyword(&mut self) -> TokenKind {
        let mut name = String::new();

        while !self.is_at_end() {
            match self.peek() {
                'a'..='z' | 'A'..='Z' | '0'..='9' | '_' => name.push(self.advance()),
                _ => break,
            }
        }

        match name.as_str() {
            "def" => TokenKind::Def,
            "if" => TokenKind::If,
            "elif" => TokenKind::Elif,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "return" => TokenKind::Return,
            "lambda" => TokenKind::Lambda,
            "pass" => TokenKind::Pass,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "in" => TokenKind::In,
            "is" => TokenKind::Is,
            _ => TokenKind::Identifier(name),
        }
    }

    fn lex_string(&mut self, quote: char) -> Result<TokenKind, LexError> {
        let start = self.current_position();
        self.advance(); // Skip opening quote

        let mut value = String::new();

        while !self.is_at_end() {
            let ch = self.peek();

            if ch == quote {
                self.advance();
                return Ok(TokenKind::String(value));
            }

            if ch == '\n' {
                break;
            }

            if ch == '\\' {
                self.advance();
                if self.is_at_end() {
                    break;
                }

                let escaped = self.advance();
                match escaped {
                    'n' => value.push('\n'),
                    't' => value.push('\t'),
                    'r' => value.push('\r'),
                    '\\' => value.push('\\'),
                    '\'' => value.push('\''),
                    '"' => value.push('"'),
                    // Unknown escapes are kept verbatim
                    other => {
                        value.push('\\');
                        value.push(other);
                    }
                }
            } else {
                value.push(ch);
                self.advance();
            }
        }

        Err(LexError::UnterminatedString { position: start })
    }

    fn lex_number(&mut self) -> Result<TokenKind, LexError> {
        let start = self.current_position();
        let mut text = String::new();
        let mut has_decimal_point = false;

        while !self.is_at_end() {
            match self.peek() {
                '0'..='9' => text.push(self.advance()),
                '_' => {
                    self.advance();
                }
                '.' if !has_decimal_point => {
                    // `1.5` is a float, `x.attr` after a number is not
                    let next = self.input.get(self.position + 1).copied();
                    if next.is_some_and(|c| c.is_ascii_digit()) {
                        text.push(self.advance());
                        has_decimal_point = true;
                    } else {
                        break;
                    }
                }
                c if c.is_ascii_alphabetic() => {
                    text.push(self.advance());
                    return Err(LexError::InvalidNumber {
                        text,
                        position: start,
                    });
                }
                _ => break,
            }
        }

        if has_decimal_point {
            text.parse::<f64>()
                .map(TokenKind::Float)
                .map_err(|_| LexError::InvalidNumber { text, position: start })
        } else {
            // Only the digit run reaches here, so a failed parse is overflow
            Ok(TokenKind::Integer(text.parse::<i64>().unwrap_or(i64::MAX)))
        }
    }

    fn skip_inline_whitespace(&mut self) {
        while !self.is_at_end() {
            match self.peek() {
                ' ' | '\t' | '\r' | '\x0c' => {
                    self.advance();
                }
                '#' => self.skip_comment(),
                '\\' if self.input.get(self.position + 1) == Some(&'\n') => {
                    // Explicit line continuation
                    self.advance();
                    self.advance_line();
                }
                _ => break,
            }
        }
    }

    fn skip_comment(&mut self) {
        while !self.is_at_end() && self.peek() != '\n' {
            self.advance();
        }
    }

    fn current_position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn peek(&self) -> char {
        self.input.get(self.position).copied().unwrap_or('\0')
    }

    fn advance(&mut self) -> char {
        let ch = self.peek();
        self.position += 1;
        self.column += 1;
        ch
    }

    fn advance_line(&mut self) {
        self.position += 1;
        self.line += 1;
        self.column = 1;
    }
}
