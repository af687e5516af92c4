use phf::{self, phf_map};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Keyword {
    AddHandler,
    AddTask,
    Def,
    DelTask,
    Export,
    ExportFunctions,
    Fakeroot,
    Include,
    Inherit,
    Python,
    Require,
    Unset,
}

static BITBAKE_KEYWORDS: phf::Map<&'static str, Keyword> = phf_map! {
    "addtask" => Keyword::AddTask,
    "addhandler" => Keyword::AddHandler,
    "def" => Keyword::Def,
    "deltask" => Keyword::DelTask,
    "export" => Keyword::Export,
    "fakeroot" => Keyword::Fakeroot,
    "inherit" => Keyword::Inherit,
    "include" => Keyword::Include,
    "python" => Keyword::Python,
    "require" => Keyword::Require,
    "unset" => Keyword::Unset,
    "EXPORT_FUNCTIONS" => Keyword::ExportFunctions,
};

/// Recognizes a keyword at the start of `line`. The keyword must be followed by whitespace or
/// `(` (for `python()`); the remainder of the line after the keyword is returned with it.
pub fn leading_keyword(line: &str) -> Option<(Keyword, &str)> {
    let end = line
        .find(|c: char| c.is_whitespace() || c == '(')
        .unwrap_or(line.len());
    let keyword = BITBAKE_KEYWORDS.get(&line[..end])?;
    let rest = &line[end..];
    if rest.is_empty() {
        return None;
    }

    Some((*keyword, rest))
}
