use std::path::Path;

use bakeweave_lexer::LineReader;
use bakeweave_syntax::{FunctionStart, ParseMode, Statement, parse_statement};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::BakeweaveResult;
use crate::errors::{HandledFailure, HandledFailureKind, ParseError, ParseErrorKind};

static PYTHON_FUNC_LINE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\s+.*|$|#)").unwrap());
static PYTHON_TAB_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^ *\t").unwrap());

/// A parsed file item, ready for evaluation against a datastore.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    Statement {
        statement: Statement,
        line: usize,
    },
    /// `[python] [fakeroot] NAME () { ... }`. `line` is the header, `end_line` the closing brace.
    Function {
        start: FunctionStart,
        body: Vec<String>,
        line: usize,
        end_line: usize,
    },
    /// `def NAME(...):` followed by its indented body. `body` includes the header line.
    PythonDef {
        name: String,
        body: Vec<String>,
        line: usize,
    },
}

impl Node {
    pub fn line(&self) -> usize {
        match self {
            Node::Statement { line, .. }
            | Node::Function { line, .. }
            | Node::PythonDef { line, .. } => *line,
        }
    }
}

fn warn_on_tabs(file: &Path, line: usize, text: &str) {
    if PYTHON_TAB_REGEX.is_match(text) {
        warn!(
            "python should use 4 spaces indentation, but found tabs in {}, line {line}",
            file.display()
        );
    }
}

/// Splits `text` into nodes. Nothing is evaluated, so a syntax error anywhere in the file is
/// reported before any of it touches a datastore.
pub fn parse_nodes(text: &str, file: &Path, mode: ParseMode) -> BakeweaveResult<Vec<Node>> {
    let parse_error = |line: usize, kind: ParseErrorKind| ParseError {
        file: file.to_path_buf(),
        line,
        kind,
    };

    let mut reader = LineReader::new(text);
    let mut nodes = vec![];

    loop {
        let logical = match reader.next_logical() {
            Ok(Some(logical)) => logical,
            Ok(None) => break,
            Err(err) if err.kind.is_handled_failure() => {
                return Err(HandledFailure {
                    file: file.to_path_buf(),
                    line: err.line,
                    kind: HandledFailureKind::LineReader(err.kind),
                }
                .into());
            }
            Err(err) => {
                return Err(parse_error(err.line, ParseErrorKind::UnterminatedContinuation).into());
            }
        };

        let line = logical.first_line;
        let statement = parse_statement(&logical.text, mode)
            .map_err(|e| parse_error(logical.last_line, e.into()))?;

        match statement {
            Statement::FunctionStart(start) => {
                let in_python = start.python;
                let mut body = vec![];
                let end_line = loop {
                    let Some((n, text)) = reader.next_physical() else {
                        let name = start.name.clone().unwrap_or_else(|| "__anonymous".into());
                        return Err(parse_error(line, ParseErrorKind::UnclosedFunction(name)).into());
                    };
                    if text == "}" {
                        break n;
                    }
                    if in_python {
                        warn_on_tabs(file, n, text);
                    }
                    body.push(text.to_string());
                };

                nodes.push(Node::Function {
                    start,
                    body,
                    line,
                    end_line,
                });
            }
            Statement::PythonDef { name } => {
                let mut body = vec![logical.text];
                while let Some((n, text)) = reader.peek_physical() {
                    if !PYTHON_FUNC_LINE_REGEX.is_match(text) {
                        break;
                    }
                    warn_on_tabs(file, n, text);
                    body.push(text.to_string());
                    reader.next_physical();
                }

                nodes.push(Node::PythonDef { name, body, line });
            }
            statement => nodes.push(Node::Statement { statement, line }),
        }
    }

    Ok(nodes)
}

#[cfg(test)]
mod tests {
    use bakeweave_lexer::LineReaderErrorKind;
    use bakeweave_syntax::{AddTask, Assignment, AssignmentOperator};
    use pretty_assertions::assert_eq;

    use super::*;

    fn nodes(text: &str) -> BakeweaveResult<Vec<Node>> {
        parse_nodes(text, Path::new("test.bb"), ParseMode::Recipe)
    }

    #[test]
    fn function_bodies_are_verbatim() {
        let parsed = nodes("A = \"1\"\ndo_install() {\n\techo \"hello\" \\\n# not a comment\n}\nC = \"3\"\n")
            .unwrap();
        assert_eq!(
            parsed,
            vec![
                Node::Statement {
                    statement: Statement::Assignment(Assignment {
                        exported: false,
                        var: "A".into(),
                        flag: None,
                        op: AssignmentOperator::Equals,
                        value: "1".into()
                    }),
                    line: 1
                },
                Node::Function {
                    start: FunctionStart {
                        name: Some("do_install".into()),
                        python: false,
                        fakeroot: false
                    },
                    body: vec!["\techo \"hello\" \\".into(), "# not a comment".into()],
                    line: 2,
                    end_line: 5
                },
                Node::Statement {
                    statement: Statement::Assignment(Assignment {
                        exported: false,
                        var: "C".into(),
                        flag: None,
                        op: AssignmentOperator::Equals,
                        value: "3".into()
                    }),
                    line: 6
                },
            ]
        );
    }

    #[test]
    fn unclosed_function() {
        let err = nodes("A = \"1\"\ndo_install() {\n\techo \"hello\"\n\nC = \"3\"\n").unwrap_err();
        let err = err.downcast_ref::<ParseError>().unwrap();
        assert_eq!(err.line, 2);
        assert_eq!(
            err.kind,
            ParseErrorKind::UnclosedFunction("do_install".to_string())
        );
    }

    #[test]
    fn python_def_block() {
        let parsed = nodes("def helper(d):\n    return 1\n\n# trailing\nA = \"1\"\n").unwrap();
        assert_eq!(
            parsed[0],
            Node::PythonDef {
                name: "helper".into(),
                body: vec![
                    "def helper(d):".into(),
                    "    return 1".into(),
                    "".into(),
                    "# trailing".into()
                ],
                line: 1
            }
        );
        assert_eq!(parsed[1].line(), 5);
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn errors_carry_kind_and_line() {
        let err = nodes("A = \"1\"\nnot a statement\n").unwrap_err();
        let err = err.downcast_ref::<ParseError>().unwrap();
        assert_eq!(err.line, 2);

        let err = nodes("# First line of comment \\\n# Second line of comment \\\n\n").unwrap_err();
        let err = err.downcast_ref::<HandledFailure>().unwrap();
        assert_eq!(
            err.kind,
            HandledFailureKind::LineReader(LineReaderErrorKind::BrokenComment)
        );

        let err = nodes("A = \"1\" \\\n").unwrap_err();
        assert_eq!(
            err.downcast_ref::<ParseError>().unwrap().kind,
            ParseErrorKind::UnterminatedContinuation
        );
    }

    #[test]
    fn addtask_node() {
        let parsed = nodes("addtask do_build after do_compile\n").unwrap();
        assert_eq!(
            parsed,
            vec![Node::Statement {
                statement: Statement::AddTask(AddTask {
                    tasks: vec!["do_build".into()],
                    after: vec!["do_compile".into()],
                    before: vec![],
                }),
                line: 1
            }]
        );
    }
}
