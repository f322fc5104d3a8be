//! Shell-style tokenization of an edit line, with cursor tracking.
//!
//! Words are separated by unquoted whitespace. Single quotes keep everything
//! literally, double quotes keep everything except `\` escapes, and a
//! backslash outside quotes escapes any following character. Unlike a strict
//! lexer, an unterminated quote or escape is not an error: the last token
//! simply reports the state it ended in, so callers can ask for more input.

use std::ops::Range;

/// A read-only view over an edit buffer.
///
/// All offsets are byte offsets into the *whole* buffer. A sub-line created
/// with [`EditLine::after`] shares the buffer and the cursor, so a cursor
/// position keeps its meaning while a line is handed down to sub-commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditLine<'a> {
    buffer: &'a str,
    start: usize,
    end: usize,
    cursor: usize,
}

impl<'a> EditLine<'a> {
    /// View of the whole `buffer` with the editing cursor at byte offset `cursor`.
    pub fn new(buffer: &'a str, cursor: usize) -> Self {
        Self {
            buffer,
            start: 0,
            end: buffer.len(),
            cursor,
        }
    }

    /// View of the whole `buffer` with no editing cursor inside it.
    pub fn without_cursor(buffer: &'a str) -> Self {
        Self::new(buffer, usize::MAX)
    }

    pub fn buffer(&self) -> &'a str {
        self.buffer
    }

    /// The text this view covers.
    pub fn text(&self) -> &'a str {
        &self.buffer[self.start..self.end]
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The rest of this line after the delimiter character found at `pos`.
    ///
    /// `pos` is normally the end of a token's span, i.e. the whitespace that
    /// terminated it. The returned view ends where this one ends.
    pub fn after(&self, pos: usize) -> EditLine<'a> {
        let pos = pos.clamp(self.start, self.end);
        let next = self.buffer[pos..self.end]
            .chars()
            .next()
            .map_or(pos, |c| pos + c.len_utf8());
        EditLine {
            start: next,
            ..*self
        }
    }
}

/// Lexical state of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    /// Outside of any quotes.
    Normal,
    /// Inside `"..."`.
    DoubleQuote,
    /// Inside `'...'`.
    SingleQuote,
    /// Right after an unquoted `\`.
    Escape,
    /// Right after a `\` inside double quotes.
    EscapeInDoubleQuote,
    /// Terminated by unquoted whitespace.
    Complete,
}

impl TokenState {
    /// Next state for `ch` and whether `ch` becomes part of the token value.
    fn transition(self, ch: char) -> (TokenState, bool) {
        use TokenState::*;
        match self {
            Complete => (Complete, false),
            Normal => match ch {
                c if c.is_whitespace() => (Complete, false),
                '\\' => (Escape, false),
                '"' => (DoubleQuote, false),
                '\'' => (SingleQuote, false),
                _ => (Normal, true),
            },
            DoubleQuote => match ch {
                '"' => (Normal, false),
                '\\' => (EscapeInDoubleQuote, false),
                _ => (DoubleQuote, true),
            },
            SingleQuote => match ch {
                '\'' => (Normal, false),
                _ => (SingleQuote, true),
            },
            Escape => (Normal, true),
            EscapeInDoubleQuote => (DoubleQuote, true),
        }
    }
}

/// One word of an edit line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    span: Range<usize>,
    value: String,
    cursor: Option<usize>,
    state: TokenState,
}

impl Token {
    fn starting_at(pos: usize) -> Self {
        Token {
            span: pos..pos,
            value: String::new(),
            cursor: None,
            state: TokenState::Normal,
        }
    }

    /// Feed the character found at byte offset `pos` into the token.
    ///
    /// When `is_cursor` is set the cursor is recorded *before* the character
    /// takes effect, so a cursor sitting on a quote points at the value
    /// accumulated so far.
    fn push(&mut self, pos: usize, ch: char, is_cursor: bool) -> TokenState {
        if is_cursor {
            self.cursor = Some(self.value.len());
        }
        if self.state == TokenState::Complete {
            return TokenState::Complete;
        }
        let (next, append) = self.state.transition(ch);
        self.state = next;
        if next == TokenState::Complete {
            // the terminating whitespace is not part of the span
            self.span.end = pos;
            return next;
        }
        if append {
            self.value.push(ch);
        }
        self.span.end = pos + ch.len_utf8();
        next
    }

    /// Byte range of the raw token text in the buffer it was parsed from.
    pub fn span(&self) -> Range<usize> {
        self.span.clone()
    }

    /// The raw text of the token, quotes and escapes included.
    pub fn original<'a>(&self, buffer: &'a str) -> &'a str {
        &buffer[self.span()]
    }

    /// The unescaped value of the token.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Byte offset of the editing cursor inside [`Token::value`], if the
    /// cursor lies in this token.
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn state(&self) -> TokenState {
        self.state
    }

    /// Whether the token ended outside of any quote or escape.
    pub fn is_complete(&self) -> bool {
        matches!(self.state, TokenState::Normal | TokenState::Complete)
    }
}

/// Where the editing cursor is, relative to the tokens of a line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CursorInfo {
    /// Index of the token holding the cursor. `0` when the cursor is before
    /// the first token, `tokens.len()` when it is after the last one.
    pub token_index: usize,
    /// The part of that token's value before the cursor.
    pub prefix: String,
}

/// Result of tokenizing one edit line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedLine {
    tokens: Vec<Token>,
    cursor: CursorInfo,
}

impl ParsedLine {
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn cursor_info(&self) -> &CursorInfo {
        &self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// `false` when the line ends inside a quote or right after an escape.
    pub fn is_complete(&self) -> bool {
        self.tokens.last().is_none_or(Token::is_complete)
    }

    /// Unescaped token values, in order. This is the argument vector used to
    /// execute a line.
    pub fn values(&self) -> Vec<String> {
        self.tokens.iter().map(|t| t.value.clone()).collect()
    }
}

/// Split `line` into tokens and locate its cursor.
pub fn parse(line: &EditLine<'_>) -> ParsedLine {
    let mut tokens = Vec::new();
    let mut chars = line
        .text()
        .char_indices()
        .map(|(i, c)| (line.start + i, c))
        .peekable();

    loop {
        while chars.next_if(|&(_, c)| c.is_whitespace()).is_some() {}
        let Some(&(start, _)) = chars.peek() else {
            break;
        };
        let mut token = Token::starting_at(start);
        for (pos, ch) in chars.by_ref() {
            if token.push(pos, ch, pos == line.cursor) == TokenState::Complete {
                break;
            }
        }
        tokens.push(token);
    }

    // A cursor at the very end has no character to land on.
    if line.cursor == line.end {
        if let Some(last) = tokens.last_mut() {
            if last.span.end == line.cursor {
                last.cursor = Some(last.value.len());
            }
        }
    }

    let cursor = match tokens.iter().position(|t| t.cursor.is_some()) {
        Some(index) => {
            let token = &tokens[index];
            let at = token.cursor.unwrap_or_default();
            CursorInfo {
                token_index: index,
                prefix: token.value[..at].to_string(),
            }
        }
        None if tokens.first().is_none_or(|t| line.cursor < t.span.start) => CursorInfo::default(),
        None => CursorInfo {
            token_index: tokens.len(),
            prefix: String::new(),
        },
    };

    log::trace!(
        "parsed {:?} into {} token(s), cursor {:?}",
        line.text(),
        tokens.len(),
        cursor
    );
    ParsedLine { tokens, cursor }
}

/// Tokenize a whole line that has no editing cursor.
pub fn tokenize(line: &str) -> ParsedLine {
    parse(&EditLine::without_cursor(line))
}
