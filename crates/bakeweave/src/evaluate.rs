use anyhow::Context;
use bakeweave_datasmart::{DataSmart, GetVarOptions, VariableContents};
use bakeweave_syntax::{Assignment, AssignmentOperator, FunctionStart, Statement};
use tracing::{trace, warn};

use crate::BakeweaveResult;
use crate::build;
use crate::export_functions::export_functions;
use crate::handle::{Directive, ParseSession};
use crate::nodes::Node;
use crate::utils::{is_set, list_var, raw};

pub const ANON_FUNCS_VAR: &str = "__BBANONFUNCS";
pub const HANDLERS_VAR: &str = "__BBHANDLERS";

pub trait Evaluate {
    fn evaluate(&self, d: &mut DataSmart, session: &mut ParseSession<'_>) -> BakeweaveResult<()>;
}

impl Evaluate for [Node] {
    fn evaluate(&self, d: &mut DataSmart, session: &mut ParseSession<'_>) -> BakeweaveResult<()> {
        for node in self {
            node.evaluate(d, session).with_context(|| {
                format!("error at {}:{}", session.current_file().display(), node.line())
            })?;
        }

        Ok(())
    }
}

impl Evaluate for Node {
    fn evaluate(&self, d: &mut DataSmart, session: &mut ParseSession<'_>) -> BakeweaveResult<()> {
        match self {
            Node::Statement { statement, line } => evaluate_statement(statement, *line, d, session),
            Node::Function {
                start,
                body,
                line,
                end_line,
            } => evaluate_function(start, body, *line, *end_line, d, session),
            Node::PythonDef { name, body, line } => {
                d.set_var_flag(name, "func", 1i64);
                d.set_var_flag(name, "python", "1");
                d.set_var_parsing(name, body.join("\n"))?;
                d.set_var_flag(name, "filename", session.current_file().display().to_string());
                d.set_var_flag(name, "lineno", line.to_string());
                Ok(())
            }
        }
    }
}

fn expand_words(d: &DataSmart, words: &[String]) -> BakeweaveResult<Vec<String>> {
    let mut ret = vec![];
    for word in words {
        ret.extend(d.expand(word)?.split_whitespace().map(str::to_string));
    }
    Ok(ret)
}

fn evaluate_statement(
    statement: &Statement,
    line: usize,
    d: &mut DataSmart,
    session: &mut ParseSession<'_>,
) -> BakeweaveResult<()> {
    match statement {
        Statement::Assignment(assignment) => evaluate_assignment_expression(d, assignment)
            .with_context(|| format!("failure evaluating assignment to {}", assignment.var)),
        Statement::Export(var) => {
            d.set_var_flag(var, "export", 1i64);
            Ok(())
        }
        Statement::Unset { var, flag } => {
            match flag {
                Some(flag) => d.del_var_flag(var, flag),
                None => d.del_var(var),
            }
            Ok(())
        }
        Statement::Include(what) => session.include(what, Directive::Include, line, d),
        Statement::Require(what) => session.include(what, Directive::Require, line, d),
        Statement::Inherit(classes) => session.inherit(classes, line, d),
        Statement::AddTask(add) => {
            let tasks = expand_words(d, &add.tasks)?;
            let before = expand_words(d, &add.before)?;
            let after = expand_words(d, &add.after)?;
            for task in &tasks {
                build::add_task(task, before.as_slice(), after.as_slice(), d)?;
            }
            Ok(())
        }
        Statement::DelTask(tasks) => {
            let tasks = d.expand(tasks)?;
            for task in tasks.split_whitespace() {
                build::del_task(task, d)?;
            }
            Ok(())
        }
        Statement::AddHandler(handlers) => {
            let mut all = list_var(d, HANDLERS_VAR)?;
            for handler in handlers {
                all.push(handler.clone());
                d.set_var_flag(handler, "handler", 1i64);
            }
            d.set_var(HANDLERS_VAR, VariableContents::List(all))?;
            Ok(())
        }
        Statement::ExportFunctions(functions) => match session.classname() {
            Some(classname) => {
                let classname = classname.to_string();
                let file = session.current_file().to_path_buf();
                export_functions(functions.as_slice(), &classname, d, &file, line)
            }
            None => {
                warn!(
                    "EXPORT_FUNCTIONS outside of a class in {}:{line} is ignored",
                    session.current_file().display()
                );
                Ok(())
            }
        },
        // Captured together with their bodies as Node::Function / Node::PythonDef.
        Statement::FunctionStart(_) | Statement::PythonDef { .. } => Ok(()),
    }
}

fn anonymous_function_name(end_line: usize, file: &str) -> String {
    let file = file.replace(['/', '.', '+', '-', '@', '%', '&', '~'], "_");
    format!("__anon_{end_line}_{file}")
}

fn evaluate_function(
    start: &FunctionStart,
    body: &[String],
    line: usize,
    end_line: usize,
    d: &mut DataSmart,
    session: &mut ParseSession<'_>,
) -> BakeweaveResult<()> {
    let file = session.current_file().display().to_string();
    let mut text = body.iter().map(|l| format!("{l}\n")).collect::<String>();
    let mut python = start.python;

    let funcname = match &start.name {
        Some(name) if !start.is_anonymous() => name.clone(),
        _ => {
            let name = anonymous_function_name(end_line, &file);
            python = true;
            text = format!("def {name}(d):\n{text}");

            let mut anonfuncs = list_var(d, ANON_FUNCS_VAR)?;
            anonfuncs.push(name.clone());
            d.set_var(ANON_FUNCS_VAR, VariableContents::List(anonfuncs))?;
            trace!("queued anonymous function {name}");
            name
        }
    };

    if is_set(&d.get_var_opt(&funcname, raw())?) {
        // Flags of an earlier definition don't carry over.
        d.del_var_flag(&funcname, "python");
        d.del_var_flag(&funcname, "fakeroot");
    }
    if python {
        d.set_var_flag(&funcname, "python", "1");
    }
    if start.fakeroot {
        d.set_var_flag(&funcname, "fakeroot", "1");
    }
    d.set_var_flag(&funcname, "func", 1i64);
    d.set_var_parsing(&funcname, text)?;
    d.set_var_flag(&funcname, "filename", file);
    d.set_var_flag(&funcname, "lineno", line.to_string());

    Ok(())
}

/// Applies one assignment statement. Reads for the combining operators see the current raw
/// value (no expansion, override selection or keyword operations).
pub fn evaluate_assignment_expression(
    data: &mut DataSmart,
    expr: &Assignment,
) -> BakeweaveResult<()> {
    let key = expr.var.as_str();
    let flag = expr.flag.as_deref();
    let assigned_value = expr.value.as_str();

    if expr.exported {
        data.set_var_flag(key, "export", 1i64);
    }

    fn _get_func(
        data: &DataSmart,
        key: &str,
        flag: Option<&str>,
    ) -> BakeweaveResult<Option<VariableContents>> {
        let get_opts = GetVarOptions::default().no_weak_default(true).expand(false);
        match flag {
            Some(flag) => data.get_var_flag_opt(key, flag, get_opts),
            None => data.get_var_opt(key, get_opts.parsing(true)),
        }
    }

    let current_text = |data: &DataSmart| -> BakeweaveResult<String> {
        Ok(_get_func(data, key, flag)?
            .map(|v| v.to_string())
            .unwrap_or_default())
    };

    let new_value: VariableContents = match expr.op {
        AssignmentOperator::Equals | AssignmentOperator::WeakEquals => assigned_value.into(),
        AssignmentOperator::DefaultEquals => match _get_func(data, key, flag)? {
            Some(val) => val,
            None => assigned_value.into(),
        },
        AssignmentOperator::ColonEquals => data
            .expand_with_varname(assigned_value, format!("{key}[:=]"))
            .with_context(|| format!("error expanding {assigned_value}"))?
            .into(),
        AssignmentOperator::PlusEquals => {
            format!("{} {}", current_text(data)?, assigned_value).into()
        }
        AssignmentOperator::EqualsPlus => {
            format!("{} {}", assigned_value, current_text(data)?).into()
        }
        AssignmentOperator::DotEquals => {
            format!("{}{}", current_text(data)?, assigned_value).into()
        }
        AssignmentOperator::EqualsDot => {
            format!("{}{}", assigned_value, current_text(data)?).into()
        }
    };

    let combining = !matches!(
        expr.op,
        AssignmentOperator::Equals | AssignmentOperator::WeakEquals | AssignmentOperator::ColonEquals
    );
    if combining && [":append", ":prepend", ":remove"].iter().any(|k| key.contains(k)) {
        warn!(
            "{key} {} is not a recommended operator combination, please replace it.",
            expr.op.as_str()
        );
    }

    match (flag, expr.op) {
        (Some(flag), AssignmentOperator::WeakEquals) => {
            data.weak_default_var_flag(key, flag, new_value)
        }
        (Some(flag), _) => data.set_var_flag(key, flag, new_value),
        (None, AssignmentOperator::WeakEquals) => data.weak_default_var(key, new_value),
        (None, _) => data.set_var_parsing(key, new_value)?,
    }

    Ok(())
}

/// Parses and evaluates `text` as the contents of a recipe named `eval.bb`, without
/// finalisation.
#[cfg(test)]
pub(crate) fn eval<D: AsRef<str>>(data: D) -> DataSmart {
    let parser = crate::handle::Parser::default();
    let mut d = DataSmart::new();
    parser
        .evaluate_text(data.as_ref(), std::path::Path::new("eval.bb"), &mut d)
        .unwrap();
    d
}
