/// Byte cursor shared by the path-data and transform-list parsers.
///
/// Numbers follow the SVG grammar: optional sign, digits with an optional
/// fraction, optional exponent. A second `.` or a sign starts a new number,
/// so `1.5.5` and `-1-2` each yield two values.
pub(crate) struct Scanner<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            bytes: text.as_bytes(),
            pos: 0,
        }
    }

    pub fn offset(&self) -> usize {
        self.pos
    }

    pub fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    pub fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    pub fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    /// Whitespace with at most one comma
    pub fn skip_separators(&mut self) {
        self.skip_whitespace();
        if self.peek() == Some(b',') {
            self.pos += 1;
            self.skip_whitespace();
        }
    }

    /// True when the next token can start a number
    pub fn at_number(&self) -> bool {
        matches!(self.peek(), Some(b) if b.is_ascii_digit() || b == b'-' || b == b'+' || b == b'.')
    }

    /// Parse one finite number; on failure the cursor is left where it was
    pub fn number(&mut self) -> Option<f64> {
        let (end, value) = self.lex_number()?;
        if !value.is_finite() {
            return None;
        }
        self.pos = end;
        Some(value)
    }

    /// A well-formed number follows, but its value overflows `f64`
    pub fn at_non_finite(&self) -> bool {
        matches!(self.lex_number(), Some((_, value)) if !value.is_finite())
    }

    fn lex_number(&self) -> Option<(usize, f64)> {
        let start = self.pos;
        let mut end = self.pos;
        let bytes = self.bytes;

        if matches!(bytes.get(end), Some(b'-' | b'+')) {
            end += 1;
        }
        let int_start = end;
        while matches!(bytes.get(end), Some(b) if b.is_ascii_digit()) {
            end += 1;
        }
        let mut digits = end - int_start;
        if bytes.get(end) == Some(&b'.') {
            end += 1;
            let frac_start = end;
            while matches!(bytes.get(end), Some(b) if b.is_ascii_digit()) {
                end += 1;
            }
            digits += end - frac_start;
        }
        if digits == 0 {
            return None;
        }
        if matches!(bytes.get(end), Some(b'e' | b'E')) {
            let mut exp_end = end + 1;
            if matches!(bytes.get(exp_end), Some(b'-' | b'+')) {
                exp_end += 1;
            }
            let exp_digits_start = exp_end;
            while matches!(bytes.get(exp_end), Some(b) if b.is_ascii_digit()) {
                exp_end += 1;
            }
            // "1em" style units are not exponents
            if exp_end > exp_digits_start {
                end = exp_end;
            }
        }

        let text = std::str::from_utf8(&bytes[start..end]).ok()?;
        let value = text.parse::<f64>().ok()?;
        Some((end, value))
    }

    /// Arc flags are single `0`/`1` characters and need no separator
    pub fn flag(&mut self) -> Option<bool> {
        let value = match self.peek()? {
            b'0' => false,
            b'1' => true,
            _ => return None,
        };
        self.pos += 1;
        Some(value)
    }
}
