//! Scans a config file character by character.

use std::path::Path;

#[derive(Debug)]
pub struct ParseError {
    msg: String,
    ofs: usize,
}
pub type ParseResult<T> = Result<T, ParseError>;

pub struct Scanner<'a> {
    buf: &'a [u8],
    pub ofs: usize,
    pub line: usize,
}

impl<'a> Scanner<'a> {
    /// The buffer must be valid UTF-8 and end with a nul byte, which acts as
    /// the end-of-input sentinel.
    pub fn new(buf: &'a [u8]) -> Self {
        if !buf.ends_with(b"\0") {
            panic!("Scanner requires nul-terminated buf");
        }
        Scanner {
            buf,
            ofs: 0,
            line: 1,
        }
    }

    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        unsafe { std::str::from_utf8_unchecked(self.buf.get_unchecked(start..end)) }
    }
    pub fn peek(&self) -> char {
        unsafe { *self.buf.get_unchecked(self.ofs) as char }
    }
    pub fn at_end(&self) -> bool {
        self.ofs >= self.buf.len() - 1
    }
    pub fn peek_newline(&self) -> bool {
        if self.peek() == '\n' {
            return true;
        }
        if self.at_end() {
            return false;
        }
        let peek2 = unsafe { *self.buf.get_unchecked(self.ofs + 1) as char };
        self.peek() == '\r' && peek2 == '\n'
    }
    pub fn next(&mut self) {
        if self.peek() == '\n' {
            self.line += 1;
        }
        if self.ofs == self.buf.len() {
            panic!("scanned past end")
        }
        self.ofs += 1;
    }
    pub fn skip(&mut self, ch: char) -> bool {
        if self.peek() == ch {
            self.next();
            return true;
        }
        false
    }

    pub fn skip_spaces(&mut self) {
        while self.skip(' ') || self.skip('\t') {}
    }

    /// Advance to the end of the current line, returning the offset where
    /// the line's content ends (before any "\r\n" or "\n").
    pub fn skip_to_eol(&mut self) -> usize {
        while !self.at_end() && !self.peek_newline() {
            self.next();
        }
        let end = self.ofs;
        self.skip('\r');
        self.skip('\n');
        end
    }

    pub fn parse_error_at<T, S: Into<String>>(&self, ofs: usize, msg: S) -> ParseResult<T> {
        Err(ParseError {
            msg: msg.into(),
            ofs,
        })
    }

    pub fn format_parse_error(&self, filename: &Path, err: ParseError) -> String {
        let mut ofs = 0;
        let lines = self.buf.split(|&c| c == b'\n');
        for (line_number, line) in lines.enumerate() {
            if ofs + line.len() >= err.ofs {
                let mut msg = "parse error: ".to_string();
                msg.push_str(&err.msg);
                msg.push('\n');

                let prefix = format!("{}:{}: ", filename.display(), line_number + 1);
                msg.push_str(&prefix);

                let line = line.strip_suffix(b"\0").unwrap_or(line);
                let line = line.strip_suffix(b"\r").unwrap_or(line);
                let context = String::from_utf8_lossy(line);
                msg.push_str(&context);
                msg.push('\n');

                msg.push_str(&" ".repeat(prefix.len() + (err.ofs - ofs)));
                msg.push_str("^\n");
                return msg;
            }
            ofs += line.len() + 1;
        }
        panic!("invalid offset when formatting error")
    }
}
