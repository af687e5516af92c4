use bakeweave_lexer::keywords::{Keyword, leading_keyword};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static FUNC_START_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<func>[\w.\-+{}$:]+)?\s*\(\s*\)\s*\{$").unwrap());
static DEF_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^def\s+(\w+).*:").unwrap());
static EXPORT_FUNCTIONS_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^EXPORT_FUNCTIONS\s+(.+)").unwrap());
static ADDTASK_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^addtask\s+([^#\n]+)").unwrap());
static DELTASK_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^deltask\s+([^#\n]+)").unwrap());
static ADDHANDLER_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^addhandler\s+(.+)").unwrap());
static INHERIT_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^inherit\s+(.+)").unwrap());

static CONFIG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        ^
        (?P<exp>export\s+)?
        (?P<var>[a-zA-Z0-9\-_+.${}/~:]*?)
        (\[(?P<flag>[a-zA-Z0-9\-_+.][a-zA-Z0-9\-_+.@/]*)\])?
        \s*
        (?P<op>:=|\?\?=|\?=|\+=|=\+|=\.|\.=|=)
        \s*
        (?P<rest>.*)
        $
        ",
    )
    .unwrap()
});
static INCLUDE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^include\s+(.+)").unwrap());
static REQUIRE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^require\s+(.+)").unwrap());
static EXPORT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^export\s+([a-zA-Z0-9\-_+.${}/~]+)$").unwrap());
static UNSET_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^unset\s+([a-zA-Z0-9\-_+.${}/~:]+)$").unwrap());
static UNSET_FLAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^unset\s+([a-zA-Z0-9\-_+.${}/~:]+)\[([a-zA-Z0-9\-_+.][a-zA-Z0-9\-_+.@/]*)]$")
        .unwrap()
});

const TASK_NAME_KEYWORDS: [&str; 3] = [":append", ":prepend", ":remove"];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StatementError {
    #[error("unparsed line: '{0}'")]
    Unparsed(String),
    #[error(
        "task name '{0}' contains a keyword which is not supported; rename the task so it does \
         not include :append, :prepend or :remove"
    )]
    InvalidTaskName(String),
    #[error("empty variable name in assignment: '{0}'")]
    EmptyVariableName(String),
}

/// Which statements a file may contain. Configuration files only carry the assignment-like
/// forms; recipes, classes and include files carry everything.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ParseMode {
    Recipe,
    Config,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AssignmentOperator {
    Equals,
    EqualsPlus,
    EqualsDot,
    DotEquals,
    PlusEquals,
    DefaultEquals,
    WeakEquals,
    ColonEquals,
}

impl AssignmentOperator {
    fn from_token(token: &str) -> Option<Self> {
        let ret = match token {
            "=" => AssignmentOperator::Equals,
            "=+" => AssignmentOperator::EqualsPlus,
            "=." => AssignmentOperator::EqualsDot,
            ".=" => AssignmentOperator::DotEquals,
            "+=" => AssignmentOperator::PlusEquals,
            "?=" => AssignmentOperator::DefaultEquals,
            "??=" => AssignmentOperator::WeakEquals,
            ":=" => AssignmentOperator::ColonEquals,
            _ => return None,
        };

        Some(ret)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentOperator::Equals => "=",
            AssignmentOperator::EqualsPlus => "=+",
            AssignmentOperator::EqualsDot => "=.",
            AssignmentOperator::DotEquals => ".=",
            AssignmentOperator::PlusEquals => "+=",
            AssignmentOperator::DefaultEquals => "?=",
            AssignmentOperator::WeakEquals => "??=",
            AssignmentOperator::ColonEquals => ":=",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Assignment {
    pub exported: bool,
    pub var: String,
    pub flag: Option<String>,
    pub op: AssignmentOperator,
    pub value: String,
}

/// The opening line of a function block. `name` is `None` for `python () {`; a nameless block is
/// always anonymous python.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionStart {
    pub name: Option<String>,
    pub python: bool,
    pub fakeroot: bool,
}

impl FunctionStart {
    pub fn is_anonymous(&self) -> bool {
        self.name.as_deref().map_or(true, |n| n == "__anonymous")
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AddTask {
    pub tasks: Vec<String>,
    pub after: Vec<String>,
    pub before: Vec<String>,
}

/// One recognised metadata statement. Values that are subject to expansion (class lists,
/// include targets, `deltask` arguments) are kept raw.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Statement {
    FunctionStart(FunctionStart),
    PythonDef { name: String },
    ExportFunctions(Vec<String>),
    AddTask(AddTask),
    DelTask(String),
    AddHandler(Vec<String>),
    Inherit(String),
    Assignment(Assignment),
    Include(String),
    Require(String),
    Export(String),
    Unset { var: String, flag: Option<String> },
}

/// Recognises a single logical line.
pub fn parse_statement(line: &str, mode: ParseMode) -> Result<Statement, StatementError> {
    if mode == ParseMode::Recipe {
        if let Some(statement) = parse_recipe_statement(line)? {
            return Ok(statement);
        }
    }

    if let Some(assignment) = parse_assignment(line)? {
        return Ok(Statement::Assignment(assignment));
    }

    let captured = |re: &Regex| re.captures(line).map(|c| c[1].to_string());
    let statement = match leading_keyword(line) {
        Some((Keyword::Include, _)) => captured(&INCLUDE_REGEX).map(Statement::Include),
        Some((Keyword::Require, _)) => captured(&REQUIRE_REGEX).map(Statement::Require),
        Some((Keyword::Export, _)) => captured(&EXPORT_REGEX).map(Statement::Export),
        Some((Keyword::Unset, _)) => UNSET_FLAG_REGEX
            .captures(line)
            .map(|c| Statement::Unset {
                var: c[1].to_string(),
                flag: Some(c[2].to_string()),
            })
            .or_else(|| {
                captured(&UNSET_REGEX).map(|var| Statement::Unset { var, flag: None })
            }),
        _ => None,
    };

    statement.ok_or_else(|| StatementError::Unparsed(line.to_string()))
}

fn parse_recipe_statement(line: &str) -> Result<Option<Statement>, StatementError> {
    if let Some(start) = parse_function_start(line) {
        return Ok(Some(Statement::FunctionStart(start)));
    }

    let Some((keyword, _)) = leading_keyword(line) else {
        return Ok(None);
    };

    let captured = |re: &Regex| re.captures(line).map(|c| c[1].to_string());
    let statement = match keyword {
        Keyword::Def => captured(&DEF_REGEX).map(|name| Statement::PythonDef { name }),
        Keyword::ExportFunctions => captured(&EXPORT_FUNCTIONS_REGEX)
            .map(|funcs| Statement::ExportFunctions(split_words(&funcs))),
        Keyword::AddTask => match captured(&ADDTASK_REGEX) {
            Some(expression) => Some(Statement::AddTask(parse_addtask(&expression)?)),
            None => None,
        },
        Keyword::DelTask => captured(&DELTASK_REGEX).map(Statement::DelTask),
        Keyword::AddHandler => {
            captured(&ADDHANDLER_REGEX).map(|handlers| Statement::AddHandler(split_words(&handlers)))
        }
        Keyword::Inherit => captured(&INHERIT_REGEX).map(Statement::Inherit),
        _ => None,
    };

    Ok(statement)
}

fn split_words(s: &str) -> Vec<String> {
    s.split_whitespace().map(str::to_string).collect()
}

fn parse_function_start(line: &str) -> Option<FunctionStart> {
    let mut python = false;
    let mut fakeroot = false;
    let mut rest = line;

    loop {
        match leading_keyword(rest) {
            Some((Keyword::Python, after)) => {
                python = true;
                rest = after.trim_start();
            }
            Some((Keyword::Fakeroot, after)) if after.starts_with(char::is_whitespace) => {
                fakeroot = true;
                rest = after.trim_start();
            }
            _ => break,
        }
    }

    let caps = FUNC_START_REGEX.captures(rest)?;
    Some(FunctionStart {
        name: caps.name("func").map(|m| m.as_str().to_string()),
        python,
        fakeroot,
    })
}

/// Splits `NAME... [after NAME...] [before NAME...]`. Either clause may be repeated; all of
/// its names accumulate.
fn parse_addtask(expression: &str) -> Result<AddTask, StatementError> {
    if let Some(bad) = expression
        .split_whitespace()
        .find(|word| TASK_NAME_KEYWORDS.iter().any(|k| word.contains(&format!("{k}_"))))
    {
        return Err(StatementError::InvalidTaskName(bad.to_string()));
    }

    let mut ret = AddTask::default();
    let mut target = &mut ret.tasks;
    for word in expression.split_whitespace() {
        match word {
            "after" => target = &mut ret.after,
            "before" => target = &mut ret.before,
            _ => target.push(word.to_string()),
        }
    }

    ret.after = ret.after.into_iter().unique().collect();
    ret.before = ret.before.into_iter().unique().collect();
    Ok(ret)
}

fn parse_assignment(line: &str) -> Result<Option<Assignment>, StatementError> {
    let Some(caps) = CONFIG_REGEX.captures(line) else {
        return Ok(None);
    };
    let Some(value) = caps.name("rest").and_then(|m| unquote(m.as_str())) else {
        return Ok(None);
    };
    let Some(op) = AssignmentOperator::from_token(&caps["op"]) else {
        return Ok(None);
    };

    if caps["var"].is_empty() {
        return Err(StatementError::EmptyVariableName(line.to_string()));
    }

    Ok(Some(Assignment {
        exported: caps.name("exp").is_some(),
        var: caps["var"].to_string(),
        flag: caps.name("flag").map(|m| m.as_str().to_string()),
        op,
        value: value.to_string(),
    }))
}

/// Strips matching quotes from an assignment value. A value of the form `'a'b'` (exactly three
/// of the opening quote) is ambiguous and rejected.
fn unquote(rest: &str) -> Option<&str> {
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    if rest.len() < 2 || !rest.ends_with(quote) {
        return None;
    }

    if rest.matches(quote).count() == 3 {
        return None;
    }

    Some(&rest[1..rest.len() - 1])
}
