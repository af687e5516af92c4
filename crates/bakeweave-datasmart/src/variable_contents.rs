use std::fmt::{Display, Formatter};

use derive_more::From;

/// The value held by a variable or one of its flags.
///
/// Text assigned by the parser is always a `String`. Integers are used for boolean-like flags
/// (`export`, `func`, `task`) and lists for bookkeeping variables such as `__BBTASKS`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, From)]
pub enum VariableContents {
    String(String),
    Integer(i64),
    List(Vec<String>),
}

impl VariableContents {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            VariableContents::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&Vec<String>> {
        match self {
            VariableContents::List(l) => Some(l),
            _ => None,
        }
    }

    /// Mirrors Python truthiness: empty strings, empty lists and zero are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            VariableContents::String(s) => !s.is_empty(),
            VariableContents::Integer(i) => *i != 0,
            VariableContents::List(l) => !l.is_empty(),
        }
    }
}

impl From<&str> for VariableContents {
    fn from(value: &str) -> Self {
        VariableContents::String(value.to_string())
    }
}

impl From<&String> for VariableContents {
    fn from(value: &String) -> Self {
        VariableContents::String(value.clone())
    }
}

impl From<Vec<&str>> for VariableContents {
    fn from(value: Vec<&str>) -> Self {
        VariableContents::List(value.into_iter().map(String::from).collect())
    }
}

impl Display for VariableContents {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            VariableContents::String(s) => write!(f, "{s}"),
            VariableContents::Integer(i) => write!(f, "{i}"),
            VariableContents::List(l) => write!(f, "{}", l.join(" ")),
        }
    }
}

impl PartialEq<&str> for VariableContents {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == Some(*other)
    }
}

impl PartialEq<i64> for VariableContents {
    fn eq(&self, other: &i64) -> bool {
        matches!(self, VariableContents::Integer(i) if i == other)
    }
}
