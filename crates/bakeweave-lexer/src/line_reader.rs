use thiserror::Error;

#[derive(Error, Copy, Clone, Debug, PartialEq, Eq)]
pub enum LineReaderErrorKind {
    #[error(
        "confusing multiline, partially commented expression; clarify whether this is all a \
         comment or should be parsed"
    )]
    BrokenComment,
    #[error("comment in the middle of a multiline expression")]
    CommentInMultiline,
    #[error("line continuation at end of file")]
    UnterminatedContinuation,
}

impl LineReaderErrorKind {
    /// Whether the input is well-formed but ambiguous, as opposed to a plain syntax error.
    pub fn is_handled_failure(&self) -> bool {
        matches!(
            self,
            LineReaderErrorKind::BrokenComment | LineReaderErrorKind::CommentInMultiline
        )
    }
}

#[derive(Error, Copy, Clone, Debug, PartialEq, Eq)]
#[error("line {line}: {kind}")]
pub struct LineReaderError {
    pub line: usize,
    pub kind: LineReaderErrorKind,
}

/// A statement after continuation lines have been joined.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogicalLine {
    pub text: String,
    pub first_line: usize,
    pub last_line: usize,
}

/// Splits metadata text into physical lines (right-trimmed, 1-based numbering) and joins them
/// into logical lines on demand.
///
/// Function bodies are not subject to continuation or comment handling, so the statement
/// interpreter switches to [`LineReader::next_physical`] while it captures one.
#[derive(Clone, Debug)]
pub struct LineReader<'a> {
    lines: Vec<&'a str>,
    pos: usize,
}

impl<'a> LineReader<'a> {
    pub fn new(text: &'a str) -> Self {
        let text = text.strip_suffix('\n').unwrap_or(text);
        let lines = if text.is_empty() {
            vec![]
        } else {
            text.split('\n').map(str::trim_end).collect()
        };

        LineReader { lines, pos: 0 }
    }

    /// Number of the last physical line handed out.
    pub fn line_number(&self) -> usize {
        self.pos
    }

    pub fn next_physical(&mut self) -> Option<(usize, &'a str)> {
        let line = self.lines.get(self.pos).copied()?;
        self.pos += 1;
        Some((self.pos, line))
    }

    pub fn peek_physical(&self) -> Option<(usize, &'a str)> {
        self.lines.get(self.pos).map(|line| (self.pos + 1, *line))
    }

    /// Returns the next statement, skipping blank lines and comments.
    ///
    /// A trailing `\` joins the following line with the backslash removed. In a continued
    /// statement, a line starting with `#` in the first column is an error, while a `#` anywhere
    /// else is part of the value. A continued comment must continue onto another comment line.
    pub fn next_logical(&mut self) -> Result<Option<LogicalLine>, LineReaderError> {
        loop {
            let Some((first_line, line)) = self.next_physical() else {
                return Ok(None);
            };

            if line.is_empty() {
                continue;
            }

            let is_comment = line.trim_start().starts_with('#');
            let mut text = String::new();
            let mut current = line;
            let mut last_line = first_line;

            while let Some(stripped) = current.strip_suffix('\\') {
                text.push_str(stripped);

                let Some((n, next)) = self.next_physical() else {
                    let kind = if is_comment {
                        LineReaderErrorKind::BrokenComment
                    } else {
                        LineReaderErrorKind::UnterminatedContinuation
                    };
                    return Err(LineReaderError {
                        line: first_line,
                        kind,
                    });
                };
                last_line = n;

                if is_comment {
                    if !next.trim_start().starts_with('#') {
                        return Err(LineReaderError {
                            line: first_line,
                            kind: LineReaderErrorKind::BrokenComment,
                        });
                    }
                } else if next.starts_with('#') {
                    return Err(LineReaderError {
                        line: n,
                        kind: LineReaderErrorKind::CommentInMultiline,
                    });
                }

                current = next;
                if current.is_empty() {
                    break;
                }
            }
            text.push_str(current);

            if is_comment {
                continue;
            }

            return Ok(Some(LogicalLine {
                text,
                first_line,
                last_line,
            }));
        }
    }
}
