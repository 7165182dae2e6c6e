//! Lexer for the line-oriented action syntax.
//!
//! There is no literal text between actions in this surface: every source
//! line (or semicolon-separated fragment of one) is an action. The scanner
//! therefore alternates between two principal states, `whitespace` (between
//! actions) and `inside-action`, and brackets each action with synthetic
//! [`TokenKind::LeftDelim`]/[`TokenKind::RightDelim`] tokens so the parser
//! can share its pipeline grammar with the classical delimited dialect.
//!
//! The scanner is pull-based and synchronous with the parser: each state is
//! a plain function returning `(token, next state)`, and [`Lexer::next_token`]
//! drives the current state until a real token falls out. There is no
//! background producer and no channel.

use std::fmt;
use std::sync::Arc;

/// A token produced by the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the first byte of this token in the input.
    pub pos: usize,
    /// 1-based line number at the start of this token.
    pub line: usize,
    /// The literal slice, or the error message for [`TokenKind::Error`].
    pub text: String,
}

impl Default for Token {
    fn default() -> Self {
        Token {
            kind: TokenKind::Eof,
            pos: 0,
            line: 1,
            text: String::new(),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eof => f.write_str("EOF"),
            TokenKind::Error => f.write_str(&self.text),
            k if k.is_keyword() => write!(f, "<{}>", self.text),
            _ => {
                if self.text.chars().count() > 10 {
                    let short: String = self.text.chars().take(10).collect();
                    write!(f, "{short:?}...")
                } else {
                    write!(f, "{:?}", self.text)
                }
            }
        }
    }
}

/// Token types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Scan failed; the token text is the error message.
    Error,
    /// Boolean constant (`true`, `false`).
    Bool,
    /// Printable ASCII punctuator; grab bag for comma etc.
    Char,
    /// Character constant, quotes included.
    CharConstant,
    /// Comment text, leading `#` stripped.
    Comment,
    /// Complex constant (`1+2i`); pure imaginary is just a number.
    Complex,
    /// Equals (`=`) introducing an assignment.
    Assign,
    /// Colon-equals (`:=`) introducing a declaration.
    Declare,
    Eof,
    /// Alphanumeric identifier starting with `.`.
    Field,
    /// Alphanumeric identifier not starting with `.`.
    Identifier,
    /// Synthetic action opener; carries no text.
    LeftDelim,
    LeftParen,
    /// Simple number, including imaginary.
    Number,
    Pipe,
    /// Raw quoted string, backquotes included.
    RawString,
    /// Synthetic action closer; carries no text.
    RightDelim,
    RightParen,
    /// Run of spaces separating arguments.
    Space,
    /// Quoted string, quotes included.
    String,
    /// Variable starting with `$`, such as `$`, `$1`, or `$hello`.
    Variable,
    // Keywords below here.
    Block,
    Break,
    Continue,
    /// The cursor, spelled `.`.
    Dot,
    Define,
    Else,
    End,
    If,
    /// The untyped nil constant, easiest to treat as a keyword.
    Nil,
    Range,
    Template,
    With,
}

impl TokenKind {
    pub fn is_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::Block
                | TokenKind::Break
                | TokenKind::Continue
                | TokenKind::Dot
                | TokenKind::Define
                | TokenKind::Else
                | TokenKind::End
                | TokenKind::If
                | TokenKind::Nil
                | TokenKind::Range
                | TokenKind::Template
                | TokenKind::With
        )
    }
}

/// A scanner state: returns the token it produced (if any) and the state to
/// run next. A `None` state terminates the machine; a `None` token keeps
/// [`Lexer::next_token`] looping.
#[derive(Clone, Copy)]
struct State(fn(&mut Lexer) -> (Option<Token>, Option<State>));

/// Scanner over an input string.
pub struct Lexer {
    input: Arc<String>,
    /// Emit [`TokenKind::Comment`] tokens.
    emit_comment: bool,
    /// Current byte position in the input.
    pos: usize,
    /// Start position of the token in flight.
    start: usize,
    /// Nesting depth of `( )` exprs.
    paren_depth: isize,
    /// 1 + number of newlines seen.
    line: usize,
    /// Line at the start of the token in flight.
    start_line: usize,
    state: Option<State>,
}

impl Lexer {
    pub fn new(input: Arc<String>, emit_comment: bool) -> Self {
        Self {
            input,
            emit_comment,
            pos: 0,
            start: 0,
            paren_depth: 0,
            line: 1,
            start_line: 1,
            state: Some(State(Self::lex_whitespace)),
        }
    }

    /// Returns the next token. Drives the state machine until a state yields
    /// a real token; after the terminal state, synthesizes `Eof` forever.
    pub fn next_token(&mut self) -> Token {
        while let Some(state) = self.state {
            let (token, next) = (state.0)(self);
            self.state = next;
            match token {
                Some(token) => return token,
                None if self.state.is_some() => continue,
                None => break,
            }
        }
        self.emit(TokenKind::Eof)
    }

    fn emit(&mut self, kind: TokenKind) -> Token {
        let token = Token {
            kind,
            pos: self.start,
            line: self.start_line,
            text: self.input[self.start..self.pos].to_string(),
        };
        self.start = self.pos;
        self.start_line = self.line;
        token
    }

    /// Builds an error token; the caller returns a `None` next state with it,
    /// which terminates the scan.
    fn error(&self, message: String) -> Token {
        Token {
            kind: TokenKind::Error,
            pos: self.start,
            line: self.start_line,
            text: message,
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn next_char(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn accept(&mut self, valid: &str) -> bool {
        if let Some(c) = self.peek_char() {
            if valid.contains(c) {
                self.next_char();
                return true;
            }
        }
        false
    }

    fn accept_run(&mut self, valid: &str) {
        while self.accept(valid) {}
    }

    /// Reports whether the input is at a valid termination character to
    /// appear after an identifier. Breaks `.X.Y` into two pieces. Also
    /// catches cases like `$x+2` not being acceptable without a space.
    fn at_terminator(&self) -> bool {
        match self.input.as_bytes().get(self.pos) {
            None => true,
            Some(b) => matches!(
                b,
                b'.' | b',' | b'|' | b':' | b'(' | b')' | b' ' | b'\t' | b'\r' | b'\n' | b';'
            ),
        }
    }

    // State functions.

    /// Eats the whitespace between actions; emits a synthetic `LeftDelim`
    /// when real input begins, `Eof` at the end, and routes `#` to the
    /// comment scanner.
    fn lex_whitespace(l: &mut Lexer) -> (Option<Token>, Option<State>) {
        let input = Arc::clone(&l.input);
        let data = &input[l.pos..];
        let mut found: Option<(usize, char)> = None;
        for (i, c) in data.char_indices() {
            match c {
                ' ' | '\r' | '\t' => continue,
                '\n' => {
                    l.line += 1;
                    continue;
                }
                _ => {
                    found = Some((i, c));
                    break;
                }
            }
        }
        match found {
            None => {
                l.pos = l.input.len();
                l.start = l.pos;
                l.start_line = l.line;
                (Some(l.emit(TokenKind::Eof)), None)
            }
            Some((i, c)) => {
                l.pos += i;
                l.start = l.pos;
                l.start_line = l.line;
                if c == '#' {
                    return Self::lex_comment(l);
                }
                (
                    Some(l.emit(TokenKind::LeftDelim)),
                    Some(State(Self::lex_inside_action)),
                )
            }
        }
    }

    /// Scans a `#` comment line; the `#` is at the current position.
    fn lex_comment(l: &mut Lexer) -> (Option<Token>, Option<State>) {
        let newline = l.input[l.pos..].find('\n');
        match newline {
            None => l.pos = l.input.len(),
            Some(i) => {
                l.pos += i + 1;
                l.line += 1;
            }
        }
        if l.emit_comment {
            let mut token = l.emit(TokenKind::Comment);
            token.pos += 1;
            token.text.remove(0); // trim '#'
            (Some(token), Some(State(Self::lex_whitespace)))
        } else {
            l.start = l.pos;
            l.start_line = l.line;
            (None, Some(State(Self::lex_whitespace)))
        }
    }

    /// Scans the elements inside an action.
    fn lex_inside_action(l: &mut Lexer) -> (Option<Token>, Option<State>) {
        let inside = Some(State(Self::lex_inside_action));
        let Some(c) = l.peek_char() else {
            if l.paren_depth > 0 {
                return (Some(l.error("unclosed left paren".to_string())), None);
            }
            return (
                Some(l.emit(TokenKind::RightDelim)),
                Some(State(Self::lex_whitespace)),
            );
        };

        // fast path for identifiers and constants (template funcs)
        if c.is_ascii_digit() {
            return Self::lex_number(l);
        }
        if is_alphanumeric(c) {
            return Self::lex_identifier(l);
        }

        match c {
            ' ' | '\n' | '\t' | '\r' => Self::lex_in_action_space(l),
            '.' => match l.input.as_bytes().get(l.pos + 1) {
                None => {
                    l.pos += 1;
                    (Some(l.emit(TokenKind::Dot)), inside)
                }
                Some(b) if !b.is_ascii_digit() => {
                    l.pos += 1;
                    Self::lex_field(l)
                }
                _ => Self::lex_number(l), // .[0-9]
            },
            '|' => {
                l.pos += 1;
                (Some(l.emit(TokenKind::Pipe)), inside)
            }
            '=' => {
                l.pos += 1;
                (Some(l.emit(TokenKind::Assign)), inside)
            }
            ':' => {
                if l.input.as_bytes().get(l.pos + 1) == Some(&b'=') {
                    l.pos += 2;
                    (Some(l.emit(TokenKind::Declare)), inside)
                } else {
                    (Some(l.error("expected :=".to_string())), None)
                }
            }
            '"' => {
                l.pos += 1;
                Self::lex_quote(l)
            }
            '`' => {
                l.pos += 1;
                Self::lex_raw_quote(l)
            }
            '$' => {
                l.pos += 1;
                Self::lex_variable(l)
            }
            '\'' => {
                l.pos += 1;
                Self::lex_char(l)
            }
            '(' => {
                l.pos += 1;
                let token = l.emit(TokenKind::LeftParen);
                l.paren_depth += 1;
                (Some(token), inside)
            }
            ')' => {
                l.pos += 1;
                let token = l.emit(TokenKind::RightParen);
                l.paren_depth -= 1;
                if l.paren_depth < 0 {
                    return (
                        Some(l.error(format!("unexpected right paren {}", format_rune(c)))),
                        None,
                    );
                }
                (Some(token), inside)
            }
            '+' | '-' => Self::lex_number(l),
            ';' => {
                l.pos += 1;
                l.start = l.pos;
                (
                    Some(l.emit(TokenKind::RightDelim)),
                    Some(State(Self::lex_whitespace)),
                )
            }
            _ => {
                if c.is_ascii_graphic() {
                    // punctuations
                    l.pos += 1;
                    (
                        Some(l.emit(TokenKind::Char)),
                        Some(State(Self::lex_in_action_space)),
                    )
                } else {
                    (
                        Some(l.error(format!(
                            "unrecognized character in action: {}",
                            format_rune(c)
                        ))),
                        None,
                    )
                }
            }
        }
    }

    /// Scans a run of whitespace inside an action. This is also where action
    /// termination is decided: a bare newline at paren depth zero, a `;`, a
    /// `#`, or end of input closes the action; a backslash as the last
    /// non-whitespace byte before a newline continues it.
    fn lex_in_action_space(l: &mut Lexer) -> (Option<Token>, Option<State>) {
        let input = Arc::clone(&l.input);
        let data = &input[l.pos..];

        let mut has_inline_backslash = false;
        let mut emit_right_delim = false;
        let mut consumed = 0usize;
        let mut terminator: Option<char> = None;

        for (idx, c) in data.char_indices() {
            match c {
                ' ' | '\t' | '\r' => consumed = idx + 1,
                '\\' => {
                    has_inline_backslash = true;
                    consumed = idx + 1;
                }
                '\n' => {
                    l.line += 1;
                    if has_inline_backslash || l.paren_depth > 0 {
                        // the action continues past this newline
                        has_inline_backslash = false;
                        consumed = idx + 1;
                    } else {
                        emit_right_delim = true;
                        consumed = idx + 1;
                        terminator = Some(c);
                        break;
                    }
                }
                _ => {
                    terminator = Some(c);
                    break;
                }
            }
        }

        match terminator {
            None => {
                if data.is_empty() {
                    l.start = l.pos;
                    l.start_line = l.line;
                    return (Some(l.emit(TokenKind::Eof)), None);
                }
                // trailing whitespace runs to end of input
                l.pos += data.len();
                emit_right_delim = true;
            }
            Some('\n') => l.pos += consumed,
            Some(';') => {
                l.pos += consumed + 1; // include the semicolon
                emit_right_delim = true;
            }
            Some('#') => {
                l.pos += consumed;
                emit_right_delim = true;
            }
            Some(_) => l.pos += consumed,
        }

        if emit_right_delim {
            l.start = l.pos;
            l.start_line = l.line;
            return (
                Some(l.emit(TokenKind::RightDelim)),
                Some(State(Self::lex_whitespace)),
            );
        }

        if consumed == 0 {
            return Self::lex_inside_action(l);
        }

        (
            Some(l.emit(TokenKind::Space)),
            Some(State(Self::lex_inside_action)),
        )
    }

    /// Scans an alphanumeric identifier or keyword.
    fn lex_identifier(l: &mut Lexer) -> (Option<Token>, Option<State>) {
        let input = Arc::clone(&l.input);
        let data = &input[l.pos..];
        let mut end = data.len();
        for (idx, c) in data.char_indices() {
            if !is_alphanumeric(c) {
                end = idx;
                break;
            }
        }
        let word = &data[..end];
        l.pos += end;
        if !l.at_terminator() {
            let c = l.peek_char().unwrap_or('\u{FFFD}');
            return (Some(l.error(format!("bad character {}", format_rune(c)))), None);
        }
        let kind = match word {
            "block" => TokenKind::Block,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "define" => TokenKind::Define,
            "else" => TokenKind::Else,
            "end" => TokenKind::End,
            "if" => TokenKind::If,
            "range" => TokenKind::Range,
            "nil" => TokenKind::Nil,
            "template" => TokenKind::Template,
            "with" => TokenKind::With,
            "true" | "false" => TokenKind::Bool,
            _ => TokenKind::Identifier,
        };
        (Some(l.emit(kind)), Some(State(Self::lex_inside_action)))
    }

    /// Scans a field: `.Alphanumeric`. The `.` has been scanned.
    fn lex_field(l: &mut Lexer) -> (Option<Token>, Option<State>) {
        Self::lex_field_or_variable(l, TokenKind::Field)
    }

    /// Scans a variable: `$Alphanumeric`. The `$` has been scanned.
    fn lex_variable(l: &mut Lexer) -> (Option<Token>, Option<State>) {
        Self::lex_field_or_variable(l, TokenKind::Variable)
    }

    fn lex_field_or_variable(l: &mut Lexer, kind: TokenKind) -> (Option<Token>, Option<State>) {
        if l.at_terminator() {
            // Nothing interesting follows -> "." or "$".
            let kind = if kind == TokenKind::Variable {
                TokenKind::Variable
            } else {
                TokenKind::Dot
            };
            return (Some(l.emit(kind)), Some(State(Self::lex_inside_action)));
        }
        let input = Arc::clone(&l.input);
        let data = &input[l.pos..];
        let mut end = data.len();
        for (idx, c) in data.char_indices() {
            if !is_alphanumeric(c) {
                end = idx;
                break;
            }
        }
        l.pos += end;
        if !l.at_terminator() {
            let c = l.peek_char().unwrap_or('\u{FFFD}');
            return (Some(l.error(format!("bad character {}", format_rune(c)))), None);
        }
        (Some(l.emit(kind)), Some(State(Self::lex_inside_action)))
    }

    /// Scans a character constant. The initial quote is already scanned.
    /// Syntax checking is done by the parser.
    fn lex_char(l: &mut Lexer) -> (Option<Token>, Option<State>) {
        Self::lex_quoted(l, '\'', TokenKind::CharConstant, "unterminated character constant")
    }

    /// Scans a quoted string. The initial quote is already scanned.
    fn lex_quote(l: &mut Lexer) -> (Option<Token>, Option<State>) {
        Self::lex_quoted(l, '"', TokenKind::String, "unterminated quoted string")
    }

    fn lex_quoted(
        l: &mut Lexer,
        quote: char,
        kind: TokenKind,
        unterminated: &str,
    ) -> (Option<Token>, Option<State>) {
        let input = Arc::clone(&l.input);
        let data = &input[l.pos..];
        let mut escaped = false;
        for (idx, c) in data.char_indices() {
            if escaped {
                if c == '\n' {
                    break;
                }
                escaped = false;
                continue;
            }
            match c {
                '\\' => escaped = true,
                '\n' => break,
                c if c == quote => {
                    l.pos += idx + 1;
                    return (Some(l.emit(kind)), Some(State(Self::lex_inside_action)));
                }
                _ => {}
            }
        }
        (Some(l.error(unterminated.to_string())), None)
    }

    /// Scans a raw quoted string; newlines are allowed and counted.
    fn lex_raw_quote(l: &mut Lexer) -> (Option<Token>, Option<State>) {
        let input = Arc::clone(&l.input);
        let data = &input[l.pos..];
        for (idx, c) in data.char_indices() {
            match c {
                '\n' => l.line += 1,
                '`' => {
                    l.pos += idx + 1;
                    return (
                        Some(l.emit(TokenKind::RawString)),
                        Some(State(Self::lex_inside_action)),
                    );
                }
                _ => {}
            }
        }
        (Some(l.error("unterminated raw quoted string".to_string())), None)
    }

    /// Scans a number: decimal, octal, hex, float, or imaginary. This isn't
    /// a perfect number scanner; when it's wrong the input is invalid and
    /// the parser's number classifier will notice.
    fn lex_number(l: &mut Lexer) -> (Option<Token>, Option<State>) {
        if !l.scan_number() {
            let text = l.input[l.start..l.pos].to_string();
            return (Some(l.error(format!("bad number syntax: {text:?}"))), None);
        }
        if matches!(l.peek_char(), Some('+') | Some('-')) {
            // Complex: 1+2i. No spaces, must end in 'i'.
            if !l.scan_number() || l.input.as_bytes().get(l.pos - 1) != Some(&b'i') {
                let text = l.input[l.start..l.pos].to_string();
                return (Some(l.error(format!("bad number syntax: {text:?}"))), None);
            }
            return (
                Some(l.emit(TokenKind::Complex)),
                Some(State(Self::lex_inside_action)),
            );
        }
        (
            Some(l.emit(TokenKind::Number)),
            Some(State(Self::lex_inside_action)),
        )
    }

    fn scan_number(&mut self) -> bool {
        // Optional leading sign.
        self.accept("+-");
        // Is it hex?
        let mut digits = "0123456789_";
        if self.accept("0") {
            // Note: Leading 0 does not mean octal in floats.
            if self.accept("xX") {
                digits = "0123456789abcdefABCDEF_";
            } else if self.accept("oO") {
                digits = "01234567_";
            } else if self.accept("bB") {
                digits = "01_";
            }
        }
        self.accept_run(digits);
        if self.accept(".") {
            self.accept_run(digits);
        }
        if digits.len() == 10 + 1 && self.accept("eE") {
            self.accept("+-");
            self.accept_run("0123456789_");
        }
        if digits.len() == 16 + 6 + 1 && self.accept("pP") {
            self.accept("+-");
            self.accept_run("0123456789_");
        }
        // Is it imaginary?
        self.accept("i");
        // Next thing mustn't be alphanumeric.
        if self.peek_char().is_some_and(is_alphanumeric) {
            self.next_char();
            return false;
        }
        true
    }
}

/// Reports whether `c` is an alphabetic, digit, or underscore.
pub(crate) fn is_alphanumeric(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

/// Renders a rune the way diagnostics expect: `U+0029 ')'`, or bare
/// `U+0001` for non-printable characters.
fn format_rune(c: char) -> String {
    if c.is_control() {
        format!("U+{:04X}", c as u32)
    } else {
        format!("U+{:04X} '{}'", c as u32, c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(input: &str) -> Vec<(TokenKind, std::string::String)> {
        let mut lexer = Lexer::new(Arc::new(input.to_string()), true);
        let mut items = Vec::new();
        loop {
            let token = lexer.next_token();
            let stop = matches!(token.kind, TokenKind::Eof | TokenKind::Error);
            items.push((token.kind, token.text));
            if stop {
                break;
            }
        }
        items
    }

    fn kinds(input: &str) -> Vec<TokenKind> {
        collect(input).into_iter().map(|(k, _)| k).collect()
    }

    use TokenKind::*;

    const LEFT: (TokenKind, &str) = (LeftDelim, "");
    const RIGHT: (TokenKind, &str) = (RightDelim, "");

    fn check(input: &str, expected: &[(TokenKind, &str)]) {
        let got = collect(input);
        let expected: Vec<(TokenKind, std::string::String)> =
            expected.iter().map(|(k, t)| (*k, t.to_string())).collect();
        assert_eq!(got, expected, "input {input:?}");
    }

    #[test]
    fn test_empty() {
        check("", &[(Eof, "")]);
        assert_eq!(kinds(" \t\n"), vec![Eof]);
    }

    #[test]
    fn test_identifiers() {
        check(
            "now is the time",
            &[
                LEFT,
                (Identifier, "now"),
                (Space, " "),
                (Identifier, "is"),
                (Space, " "),
                (Identifier, "the"),
                (Space, " "),
                (Identifier, "time"),
                RIGHT,
                (Eof, ""),
            ],
        );
    }

    #[test]
    fn test_semicolon_separated_actions() {
        check(
            "`x`;foo;;;",
            &[
                LEFT,
                (RawString, "`x`"),
                RIGHT,
                LEFT,
                (Identifier, "foo"),
                RIGHT,
                LEFT,
                RIGHT,
                LEFT,
                RIGHT,
                (Eof, ""),
            ],
        );
    }

    #[test]
    fn test_comment_after_identifier() {
        check(
            "hello # this is a comment",
            &[
                LEFT,
                (Identifier, "hello"),
                RIGHT,
                (Comment, " this is a comment"),
                (Eof, ""),
            ],
        );
    }

    #[test]
    fn test_punctuation() {
        check(
            ",@% ",
            &[LEFT, (Char, ","), (Char, "@"), (Char, "%"), RIGHT, (Eof, "")],
        );
    }

    #[test]
    fn test_parens() {
        check(
            "((3))",
            &[
                LEFT,
                (LeftParen, "("),
                (LeftParen, "("),
                (Number, "3"),
                (RightParen, ")"),
                (RightParen, ")"),
                RIGHT,
                (Eof, ""),
            ],
        );
    }

    #[test]
    fn test_non_keyword_identifier() {
        check("for", &[LEFT, (Identifier, "for"), RIGHT, (Eof, "")]);
    }

    #[test]
    fn test_block() {
        check(
            r#"block "foo" ."#,
            &[
                LEFT,
                (Block, "block"),
                (Space, " "),
                (String, r#""foo""#),
                (Space, " "),
                (Dot, "."),
                RIGHT,
                (Eof, ""),
            ],
        );
    }

    #[test]
    fn test_quotes() {
        check(
            r#""abc \n\t\" ""#,
            &[LEFT, (String, r#""abc \n\t\" ""#), RIGHT, (Eof, "")],
        );
        let raw = "`abc\\n\\t\\\" `";
        check(raw, &[LEFT, (RawString, raw), RIGHT, (Eof, "")]);
        // Raw quotes keep embedded newlines; the token is reported on the
        // line where it starts.
        let raw_nl = "`now is{{\n}}the time`";
        check(raw_nl, &[LEFT, (RawString, raw_nl), RIGHT, (Eof, "")]);
    }

    #[test]
    fn test_numbers() {
        check(
            "1 02 0x14 0X14 -7.2i 1e3 1E3 +1.2e-4 4.2i 1+2i 1_2 0x1.e_fp4 0X1.E_FP4",
            &[
                LEFT,
                (Number, "1"),
                (Space, " "),
                (Number, "02"),
                (Space, " "),
                (Number, "0x14"),
                (Space, " "),
                (Number, "0X14"),
                (Space, " "),
                (Number, "-7.2i"),
                (Space, " "),
                (Number, "1e3"),
                (Space, " "),
                (Number, "1E3"),
                (Space, " "),
                (Number, "+1.2e-4"),
                (Space, " "),
                (Number, "4.2i"),
                (Space, " "),
                (Complex, "1+2i"),
                (Space, " "),
                (Number, "1_2"),
                (Space, " "),
                (Number, "0x1.e_fp4"),
                (Space, " "),
                (Number, "0X1.E_FP4"),
                RIGHT,
                (Eof, ""),
            ],
        );
    }

    #[test]
    fn test_characters() {
        check(
            r"'a' '\n' '\'' '\\' 'ÿ' '\xFF' '本'",
            &[
                LEFT,
                (CharConstant, "'a'"),
                (Space, " "),
                (CharConstant, r"'\n'"),
                (Space, " "),
                (CharConstant, r"'\''"),
                (Space, " "),
                (CharConstant, r"'\\'"),
                (Space, " "),
                (CharConstant, r"'ÿ'"),
                (Space, " "),
                (CharConstant, r"'\xFF'"),
                (Space, " "),
                (CharConstant, "'本'"),
                RIGHT,
                (Eof, ""),
            ],
        );
    }

    #[test]
    fn test_bools_and_nil() {
        check(
            "true false",
            &[LEFT, (Bool, "true"), (Space, " "), (Bool, "false"), RIGHT, (Eof, "")],
        );
        check("nil", &[LEFT, (Nil, "nil"), RIGHT, (Eof, "")]);
    }

    #[test]
    fn test_dots() {
        check(".", &[LEFT, (Dot, "."), RIGHT, (Eof, "")]);
        check(
            ".x . .2 .x.y.z",
            &[
                LEFT,
                (Field, ".x"),
                (Space, " "),
                (Dot, "."),
                (Space, " "),
                (Number, ".2"),
                (Space, " "),
                (Field, ".x"),
                (Field, ".y"),
                (Field, ".z"),
                RIGHT,
                (Eof, ""),
            ],
        );
    }

    #[test]
    fn test_keywords() {
        check(
            "range if else end with",
            &[
                LEFT,
                (Range, "range"),
                (Space, " "),
                (If, "if"),
                (Space, " "),
                (Else, "else"),
                (Space, " "),
                (End, "end"),
                (Space, " "),
                (With, "with"),
                RIGHT,
                (Eof, ""),
            ],
        );
    }

    #[test]
    fn test_variables() {
        check(
            "$c := printf $ $hello $23 $ $var.Field .Method",
            &[
                LEFT,
                (Variable, "$c"),
                (Space, " "),
                (Declare, ":="),
                (Space, " "),
                (Identifier, "printf"),
                (Space, " "),
                (Variable, "$"),
                (Space, " "),
                (Variable, "$hello"),
                (Space, " "),
                (Variable, "$23"),
                (Space, " "),
                (Variable, "$"),
                (Space, " "),
                (Variable, "$var"),
                (Field, ".Field"),
                (Space, " "),
                (Field, ".Method"),
                RIGHT,
                (Eof, ""),
            ],
        );
    }

    #[test]
    fn test_variable_invocation() {
        check(
            "$x 23",
            &[LEFT, (Variable, "$x"), (Space, " "), (Number, "23"), RIGHT, (Eof, "")],
        );
    }

    #[test]
    fn test_pipeline() {
        check(
            r#"echo hi 1.2 |noargs|args 1 "hi""#,
            &[
                LEFT,
                (Identifier, "echo"),
                (Space, " "),
                (Identifier, "hi"),
                (Space, " "),
                (Number, "1.2"),
                (Space, " "),
                (Pipe, "|"),
                (Identifier, "noargs"),
                (Pipe, "|"),
                (Identifier, "args"),
                (Space, " "),
                (Number, "1"),
                (Space, " "),
                (String, r#""hi""#),
                RIGHT,
                (Eof, ""),
            ],
        );
    }

    #[test]
    fn test_declarations() {
        check(
            "$v := 3",
            &[
                LEFT,
                (Variable, "$v"),
                (Space, " "),
                (Declare, ":="),
                (Space, " "),
                (Number, "3"),
                RIGHT,
                (Eof, ""),
            ],
        );
        check(
            "$v , $w := 3",
            &[
                LEFT,
                (Variable, "$v"),
                (Space, " "),
                (Char, ","),
                (Space, " "),
                (Variable, "$w"),
                (Space, " "),
                (Declare, ":="),
                (Space, " "),
                (Number, "3"),
                RIGHT,
                (Eof, ""),
            ],
        );
    }

    #[test]
    fn test_field_of_parenthesized_expression() {
        check(
            "(.X).Y",
            &[
                LEFT,
                (LeftParen, "("),
                (Field, ".X"),
                (RightParen, ")"),
                (Field, ".Y"),
                RIGHT,
                (Eof, ""),
            ],
        );
    }

    #[test]
    fn test_line_continuation() {
        // A trailing backslash suppresses the action terminator.
        let items = kinds("$x \\\n := 1");
        assert_eq!(
            items,
            vec![LeftDelim, Variable, Space, Declare, Space, Number, RightDelim, Eof]
        );
    }

    #[test]
    fn test_newline_inside_parens_continues_action() {
        let items = kinds("(.X\n.Y)");
        assert_eq!(
            items,
            vec![LeftDelim, LeftParen, Field, Space, Field, RightParen, RightDelim, Eof]
        );
    }

    #[test]
    fn test_errors() {
        check(
            "\u{1}",
            &[LEFT, (Error, "unrecognized character in action: U+0001")],
        );
        check("\"\n\"", &[LEFT, (Error, "unterminated quoted string")]);
        check("`xx", &[LEFT, (Error, "unterminated raw quoted string")]);
        check("'\n", &[LEFT, (Error, "unterminated character constant")]);
        check("3k", &[LEFT, (Error, "bad number syntax: \"3k\"")]);
        check(
            "(3",
            &[LEFT, (LeftParen, "("), (Number, "3"), (Error, "unclosed left paren")],
        );
        check(
            "3)",
            &[LEFT, (Number, "3"), (Error, "unexpected right paren U+0029 ')'")],
        );
        check("a#", &[LEFT, (Error, "bad character U+0023 '#'")]);
        check("$x+2", &[LEFT, (Error, "bad character U+002B '+'")]);
        check(":", &[LEFT, (Error, "expected :=")]);
    }

    // Many elements in an action blew the lookahead until the inside-action
    // state stopped looping.
    #[test]
    fn test_long_pipeline() {
        check(
            "|||||",
            &[
                LEFT,
                (Pipe, "|"),
                (Pipe, "|"),
                (Pipe, "|"),
                (Pipe, "|"),
                (Pipe, "|"),
                RIGHT,
                (Eof, ""),
            ],
        );
    }

    // The other tests don't check positions; this one does.
    #[test]
    fn test_positions() {
        let mut lexer = Lexer::new(Arc::new("".to_string()), true);
        let token = lexer.next_token();
        assert_eq!((token.kind, token.pos, token.line), (Eof, 0, 1));

        let mut lexer = Lexer::new(Arc::new("x\ny".to_string()), false);
        let expected = [
            (LeftDelim, 0, 1),
            (Identifier, 0, 1),
            (RightDelim, 2, 2),
            (LeftDelim, 2, 2),
            (Identifier, 2, 2),
            (RightDelim, 3, 2),
            (Eof, 3, 2),
        ];
        for (kind, pos, line) in expected {
            let token = lexer.next_token();
            assert_eq!((token.kind, token.pos, token.line), (kind, pos, line));
        }
    }
}
