use ropey::Rope;
use unicode_segmentation::UnicodeSegmentation;

pub type BufferResult<T> = Result<T, BufferError>;

/// Errors raised by bounds-checked buffer operations. The game only calls
/// these with cursor-clamped coordinates, so surfacing one is a defect.
#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    #[error("line {0} is out of bounds")]
    LineOutOfBounds(usize),
    #[error("column {col} is out of bounds on line {line}")]
    ColumnOutOfBounds { line: usize, col: usize },
    #[error("line {0} has no following line to join")]
    JoinAtLastLine(usize),
}

/// The document under edit: a rope whose text is the lines joined with '\n'.
/// An empty rope is one empty line, so the buffer is never empty. Columns
/// are counted in grapheme clusters.
#[derive(Clone)]
pub struct Buffer {
    rope: Rope,
}

impl Default for Buffer {
    fn default() -> Self {
        Self {
            rope: Rope::from_str(""),
        }
    }
}

fn is_blank(g: &str) -> bool {
    g.chars().all(char::is_whitespace)
}

impl Buffer {
    pub fn from_string(s: String) -> Self {
        Self {
            rope: Rope::from_str(&s.replace('\r', "")),
        }
    }

    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Self {
        let joined = lines
            .iter()
            .map(|l| l.as_ref())
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            rope: Rope::from_str(&joined),
        }
    }

    #[cfg(test)]
    pub fn to_lines(&self) -> Vec<String> {
        self.to_string()
            .split('\n')
            .map(|s| s.to_string())
            .collect()
    }

    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Lenient line lookup; out-of-range rows read as empty.
    pub fn line_string(&self, y: usize) -> String {
        if y >= self.line_count() {
            return String::new();
        }
        let s = self.rope.line(y).to_string();
        // Be robust to whether rope includes trailing newline
        if let Some(stripped) = s.strip_suffix('\n') {
            stripped.to_string()
        } else {
            s
        }
    }

    /// Checked line accessor.
    pub fn line(&self, y: usize) -> BufferResult<String> {
        if y >= self.line_count() {
            return Err(BufferError::LineOutOfBounds(y));
        }
        Ok(self.line_string(y))
    }

    pub fn line_len(&self, y: usize) -> usize {
        self.line_string(y).graphemes(true).count()
    }

    fn col_to_byte_in(line: &str, col: usize) -> usize {
        let mut pos = 0usize;
        for (i, g) in line.graphemes(true).enumerate() {
            if i == col {
                return pos;
            }
            pos += g.len();
        }
        pos
    }

    fn byte_to_col_in(line: &str, byte: usize) -> usize {
        let mut col = 0usize;
        let mut pos = 0usize;
        for g in line.graphemes(true) {
            if pos + g.len() > byte {
                break;
            }
            pos += g.len();
            col += 1;
        }
        col
    }

    /// Absolute char index of (row, col); clamps to buffer extents.
    pub fn char_index(&self, y: usize, col: usize) -> usize {
        if y >= self.line_count() {
            return self.rope.len_chars();
        }
        let line = self.line_string(y);
        let byte = Self::col_to_byte_in(&line, col);
        self.rope.line_to_char(y) + line[..byte].chars().count()
    }

    fn check_line(&self, y: usize) -> BufferResult<()> {
        if y >= self.line_count() {
            return Err(BufferError::LineOutOfBounds(y));
        }
        Ok(())
    }

    fn check_col(&self, y: usize, col: usize, inclusive: bool) -> BufferResult<()> {
        let len = self.line_len(y);
        let bad = if inclusive { col > len } else { col >= len };
        if bad {
            return Err(BufferError::ColumnOutOfBounds { line: y, col });
        }
        Ok(())
    }

    pub fn insert_char(&mut self, y: usize, col: usize, ch: char) -> BufferResult<()> {
        self.check_line(y)?;
        self.check_col(y, col, true)?;
        let idx = self.char_index(y, col);
        let mut buf = [0u8; 4];
        self.rope.insert(idx, ch.encode_utf8(&mut buf));
        Ok(())
    }

    /// Inserts text at (row, col); embedded newlines create new lines.
    pub fn insert_text(&mut self, y: usize, col: usize, s: &str) -> BufferResult<()> {
        self.check_line(y)?;
        self.check_col(y, col, true)?;
        let idx = self.char_index(y, col);
        self.rope.insert(idx, s);
        Ok(())
    }

    /// Removes the grapheme at (row, col).
    pub fn delete_char(&mut self, y: usize, col: usize) -> BufferResult<()> {
        self.check_line(y)?;
        self.check_col(y, col, false)?;
        let start = self.char_index(y, col);
        let end = self.char_index(y, col + 1);
        self.rope.remove(start..end);
        Ok(())
    }

    /// Overwrites the grapheme at (row, col) in place.
    pub fn replace_char(&mut self, y: usize, col: usize, ch: char) -> BufferResult<()> {
        self.delete_char(y, col)?;
        self.insert_char(y, col, ch)
    }

    /// Splits line `y` at `col`, inserting a new line after it.
    pub fn split_line(&mut self, y: usize, col: usize) -> BufferResult<()> {
        self.check_line(y)?;
        self.check_col(y, col, true)?;
        let idx = self.char_index(y, col);
        self.rope.insert(idx, "\n");
        Ok(())
    }

    /// Appends line `y + 1` onto line `y`.
    pub fn join_lines(&mut self, y: usize) -> BufferResult<()> {
        self.check_line(y)?;
        if y + 1 >= self.line_count() {
            return Err(BufferError::JoinAtLastLine(y));
        }
        let nl = self.rope.line_to_char(y + 1) - 1;
        self.rope.remove(nl..nl + 1);
        Ok(())
    }

    /// Removes line `y` entirely. Removing the only line leaves one empty
    /// line, keeping the buffer non-empty.
    pub fn delete_line(&mut self, y: usize) {
        if y >= self.line_count() {
            return;
        }
        let (start, end) = if y + 1 < self.line_count() {
            (self.rope.line_to_char(y), self.rope.line_to_char(y + 1))
        } else if y > 0 {
            // Last line: take the preceding newline with it
            (self.rope.line_to_char(y) - 1, self.rope.len_chars())
        } else {
            (0, self.rope.len_chars())
        };
        self.rope.remove(start..end);
    }

    pub fn remove_char_range(&mut self, start: usize, end: usize) {
        if start < end && end <= self.rope.len_chars() {
            self.rope.remove(start..end);
        }
    }

    pub fn slice(&self, start: usize, end: usize) -> String {
        self.rope.slice(start..end).to_string()
    }

    /// Replaces the first occurrence of `pattern` in line `y`.
    pub fn replace_first(&mut self, y: usize, pattern: &str, replacement: &str) -> BufferResult<()> {
        let line = self.line(y)?;
        if pattern.is_empty() {
            return Ok(());
        }
        if let Some(byte) = line.find(pattern) {
            let start = self.rope.line_to_char(y) + line[..byte].chars().count();
            self.rope.remove(start..start + pattern.chars().count());
            self.rope.insert(start, replacement);
        }
        Ok(())
    }

    // --- Motion queries; these never mutate the buffer ---

    /// One step right, wrapping to the start of the next line; None at the
    /// end of the buffer.
    pub fn step_right(&self, y: usize, col: usize) -> Option<(usize, usize)> {
        if col < self.line_len(y) {
            Some((y, col + 1))
        } else if y + 1 < self.line_count() {
            Some((y + 1, 0))
        } else {
            None
        }
    }

    /// One step left, wrapping to the end of the previous line; None at the
    /// start of the buffer.
    pub fn step_left(&self, y: usize, col: usize) -> Option<(usize, usize)> {
        if col > 0 {
            Some((y, col - 1))
        } else if y > 0 {
            Some((y - 1, self.line_len(y - 1)))
        } else {
            None
        }
    }

    fn is_word_start(&self, y: usize, col: usize) -> bool {
        let line = self.line_string(y);
        let gs: Vec<&str> = line.graphemes(true).collect();
        match gs.get(col) {
            Some(g) if !is_blank(g) => col == 0 || is_blank(gs[col - 1]),
            _ => false,
        }
    }

    fn is_word_end(&self, y: usize, col: usize) -> bool {
        let line = self.line_string(y);
        let gs: Vec<&str> = line.graphemes(true).collect();
        match gs.get(col) {
            Some(g) if !is_blank(g) => col + 1 == gs.len() || is_blank(gs[col + 1]),
            _ => false,
        }
    }

    /// Start of the next word (a word is a maximal non-whitespace run),
    /// crossing line boundaries. Stops at the end of the buffer.
    pub fn word_forward(&self, y: usize, col: usize) -> (usize, usize) {
        let (mut y, mut col) = (y, col);
        loop {
            match self.step_right(y, col) {
                Some((ny, nc)) => {
                    y = ny;
                    col = nc;
                }
                None => break,
            }
            if self.is_word_start(y, col) {
                break;
            }
        }
        (y, col)
    }

    /// Start of the previous word, crossing line boundaries.
    pub fn word_backward(&self, y: usize, col: usize) -> (usize, usize) {
        let (mut y, mut col) = (y, col);
        loop {
            match self.step_left(y, col) {
                Some((ny, nc)) => {
                    y = ny;
                    col = nc;
                }
                None => break,
            }
            if self.is_word_start(y, col) {
                break;
            }
        }
        (y, col)
    }

    /// Last character of the current or next word; at the end of the buffer,
    /// lands on the last character of the last line.
    pub fn end_of_word(&self, y: usize, col: usize) -> (usize, usize) {
        let (mut y, mut col) = (y, col);
        loop {
            match self.step_right(y, col) {
                Some((ny, nc)) => {
                    y = ny;
                    col = nc;
                }
                None => {
                    col = self.line_len(y).saturating_sub(1);
                    break;
                }
            }
            if self.is_word_end(y, col) {
                break;
            }
        }
        (y, col)
    }

    /// First occurrence of `ch` in line `y` strictly after `col`.
    pub fn find_char_forward(&self, y: usize, col: usize, ch: char) -> Option<usize> {
        let line = self.line_string(y);
        let mut buf = [0u8; 4];
        let target: &str = ch.encode_utf8(&mut buf);
        line.graphemes(true)
            .enumerate()
            .find(|(i, g)| *i > col && *g == target)
            .map(|(i, _)| i)
    }

    /// Forward search starting strictly after (y, col), wrapping past the
    /// end of the buffer. Empty queries never match.
    pub fn search_forward(&self, y: usize, col: usize, query: &str) -> Option<(usize, usize)> {
        if query.is_empty() {
            return None;
        }
        for row in y..self.line_count() {
            let line = self.line_string(row);
            let from = if row == y {
                Self::col_to_byte_in(&line, col + 1)
            } else {
                0
            };
            if let Some(b) = line[from..].find(query) {
                return Some((row, Self::byte_to_col_in(&line, from + b)));
            }
        }
        for row in 0..y {
            let line = self.line_string(row);
            if let Some(b) = line.find(query) {
                return Some((row, Self::byte_to_col_in(&line, b)));
            }
        }
        None
    }

    /// Backward search: the current line only matches strictly before `col`,
    /// then earlier lines, then wraps to the bottom.
    pub fn search_backward(&self, y: usize, col: usize, query: &str) -> Option<(usize, usize)> {
        if query.is_empty() {
            return None;
        }
        let line = self.line_string(y);
        let before = Self::col_to_byte_in(&line, col);
        if let Some(b) = rfind_before(&line, query, before) {
            return Some((y, Self::byte_to_col_in(&line, b)));
        }
        for row in (0..y).rev() {
            let line = self.line_string(row);
            if let Some(b) = line.rfind(query) {
                return Some((row, Self::byte_to_col_in(&line, b)));
            }
        }
        for row in (y + 1..self.line_count()).rev() {
            let line = self.line_string(row);
            if let Some(b) = line.rfind(query) {
                return Some((row, Self::byte_to_col_in(&line, b)));
            }
        }
        None
    }
}

/// Rightmost occurrence of `query` whose start byte is strictly below
/// `before`. Overlapping matches count.
fn rfind_before(line: &str, query: &str, before: usize) -> Option<usize> {
    let mut best = None;
    let mut start = 0usize;
    while let Some(b) = line[start..].find(query) {
        let abs = start + b;
        if abs >= before {
            break;
        }
        best = Some(abs);
        match line[abs..].chars().next() {
            Some(c) => start = abs + c.len_utf8(),
            None => break,
        }
    }
    best
}

impl PartialEq for Buffer {
    fn eq(&self, other: &Self) -> bool {
        self.rope == other.rope
    }
}

impl std::fmt::Display for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.rope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_buffer_is_one_empty_line() {
        let b = Buffer::default();
        assert_eq!(b.line_count(), 1);
        assert_eq!(b.line_string(0), "");
    }

    #[test]
    fn line_accessor_checks_bounds() {
        let b = Buffer::from_lines(&["one", "two"]);
        assert_eq!(b.line(1).unwrap(), "two");
        assert!(matches!(b.line(2), Err(BufferError::LineOutOfBounds(2))));
    }

    #[test]
    fn insert_and_delete_check_bounds() {
        let mut b = Buffer::from_lines(&["abc"]);
        assert!(matches!(
            b.insert_char(1, 0, 'x'),
            Err(BufferError::LineOutOfBounds(1))
        ));
        assert!(matches!(
            b.insert_char(0, 4, 'x'),
            Err(BufferError::ColumnOutOfBounds { line: 0, col: 4 })
        ));
        // col == len is the valid append position for insert
        b.insert_char(0, 3, 'd').unwrap();
        assert_eq!(b.line_string(0), "abcd");
        // but not for delete
        assert!(matches!(
            b.delete_char(0, 4),
            Err(BufferError::ColumnOutOfBounds { line: 0, col: 4 })
        ));
        b.delete_char(0, 0).unwrap();
        assert_eq!(b.line_string(0), "bcd");
    }

    #[test]
    fn split_and_join_round_trip() {
        let mut b = Buffer::from_lines(&["hello world"]);
        b.split_line(0, 5).unwrap();
        assert_eq!(b.to_lines(), vec!["hello", " world"]);
        b.join_lines(0).unwrap();
        assert_eq!(b.to_lines(), vec!["hello world"]);
        assert!(matches!(
            b.join_lines(0),
            Err(BufferError::JoinAtLastLine(0))
        ));
    }

    #[test]
    fn delete_line_keeps_buffer_non_empty() {
        let mut b = Buffer::from_lines(&["only"]);
        b.delete_line(0);
        assert_eq!(b.line_count(), 1);
        assert_eq!(b.line_string(0), "");
    }

    #[test]
    fn delete_last_line_takes_preceding_newline() {
        let mut b = Buffer::from_lines(&["a", "b"]);
        b.delete_line(1);
        assert_eq!(b.to_lines(), vec!["a"]);
        let mut b = Buffer::from_lines(&["a", "b", "c"]);
        b.delete_line(1);
        assert_eq!(b.to_lines(), vec!["a", "c"]);
    }

    #[test]
    fn grapheme_columns_span_multibyte() {
        let mut b = Buffer::from_lines(&["a😄b"]);
        assert_eq!(b.line_len(0), 3);
        b.delete_char(0, 1).unwrap();
        assert_eq!(b.line_string(0), "ab");
        b.insert_char(0, 1, 'ż').unwrap();
        assert_eq!(b.line_string(0), "ażb");
    }

    #[test]
    fn replace_char_keeps_length() {
        let mut b = Buffer::from_lines(&["cat"]);
        b.replace_char(0, 1, 'o').unwrap();
        assert_eq!(b.line_string(0), "cot");
    }

    #[test]
    fn insert_text_with_newlines_creates_lines() {
        let mut b = Buffer::from_lines(&["paste here -> "]);
        b.insert_text(0, 14, "line one\nline").unwrap();
        assert_eq!(b.to_lines(), vec!["paste here -> line one", "line"]);
    }

    #[test]
    fn word_forward_stops_at_word_starts() {
        let b = Buffer::from_lines(&["foo bar baz"]);
        assert_eq!(b.word_forward(0, 0), (0, 4));
        assert_eq!(b.word_forward(0, 4), (0, 8));
    }

    #[test]
    fn word_forward_crosses_lines() {
        let b = Buffer::from_lines(&["foo  ", "  bar"]);
        assert_eq!(b.word_forward(0, 0), (1, 2));
    }

    #[test]
    fn word_forward_at_buffer_end_stops() {
        let b = Buffer::from_lines(&["foo bar"]);
        assert_eq!(b.word_forward(0, 4), (0, 7));
        assert_eq!(b.word_forward(0, 7), (0, 7));
    }

    #[test]
    fn word_backward_is_symmetric() {
        let b = Buffer::from_lines(&["foo bar", "baz"]);
        assert_eq!(b.word_backward(1, 0), (0, 4));
        assert_eq!(b.word_backward(0, 4), (0, 0));
        assert_eq!(b.word_backward(0, 0), (0, 0));
    }

    #[test]
    fn end_of_word_lands_on_last_character() {
        let b = Buffer::from_lines(&["foo bar"]);
        assert_eq!(b.end_of_word(0, 0), (0, 2));
        assert_eq!(b.end_of_word(0, 2), (0, 6));
        // at the end of the buffer: last character of the last line
        assert_eq!(b.end_of_word(0, 6), (0, 6));
    }

    #[test]
    fn find_char_searches_strictly_after_cursor() {
        let b = Buffer::from_lines(&["abcabc"]);
        assert_eq!(b.find_char_forward(0, 0, 'a'), Some(3));
        assert_eq!(b.find_char_forward(0, 3, 'a'), None);
        assert_eq!(b.find_char_forward(0, 0, 'z'), None);
    }

    #[test]
    fn search_forward_wraps_around() {
        let b = Buffer::from_lines(&["needle here", "nothing", "needle again"]);
        assert_eq!(b.search_forward(0, 0, "needle"), Some((2, 0)));
        assert_eq!(b.search_forward(2, 0, "needle"), Some((0, 0)));
        assert_eq!(b.search_forward(0, 0, "absent"), None);
        assert_eq!(b.search_forward(0, 0, ""), None);
    }

    #[test]
    fn search_forward_skips_match_at_cursor() {
        let b = Buffer::from_lines(&["aba aba"]);
        // match at the cursor itself does not count
        assert_eq!(b.search_forward(0, 0, "aba"), Some((0, 4)));
    }

    #[test]
    fn search_backward_honors_column_bound() {
        let b = Buffer::from_lines(&["aba aba", "x"]);
        assert_eq!(b.search_backward(0, 4, "aba"), Some((0, 0)));
        // nothing lies strictly before column 0, and the wrap scan never
        // revisits the current line
        assert_eq!(b.search_backward(0, 0, "aba"), None);
    }

    #[test]
    fn search_backward_scans_up_then_wraps() {
        let b = Buffer::from_lines(&["top", "mid needle", "cur", "low needle"]);
        assert_eq!(b.search_backward(2, 0, "needle"), Some((1, 4)));
        assert_eq!(b.search_backward(1, 0, "needle"), Some((3, 4)));
    }

    #[test]
    fn replace_first_touches_only_first_occurrence() {
        let mut b = Buffer::from_lines(&["eror and eror"]);
        b.replace_first(0, "eror", "error").unwrap();
        assert_eq!(b.line_string(0), "error and eror");
        b.replace_first(0, "missing", "x").unwrap();
        assert_eq!(b.line_string(0), "error and eror");
    }

    #[test]
    fn buffers_compare_structurally() {
        let a = Buffer::from_lines(&["one", "two"]);
        let b = Buffer::from_lines(&["one", "two"]);
        let c = Buffer::from_lines(&["one", "two "]);
        assert!(a == b);
        assert!(a != c);
    }
}
