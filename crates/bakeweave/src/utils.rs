use bakeweave_datasmart::{DataSmart, GetVarOptions, VariableContents};

use crate::BakeweaveResult;

/// Options for reading bookkeeping variables: overrides apply, nothing is expanded.
pub(crate) fn raw() -> GetVarOptions {
    GetVarOptions::default().expand(false)
}

fn to_list(value: Option<VariableContents>) -> Vec<String> {
    match value {
        Some(VariableContents::List(l)) => l,
        Some(other) => other
            .to_string()
            .split_whitespace()
            .map(String::from)
            .collect(),
        None => vec![],
    }
}

/// Reads a list-valued bookkeeping variable such as `__BBTASKS`. Text values are split on
/// whitespace.
pub fn list_var(d: &DataSmart, var: &str) -> BakeweaveResult<Vec<String>> {
    Ok(to_list(d.get_var_opt(var, raw())?))
}

pub fn list_flag(d: &DataSmart, var: &str, flag: &str) -> BakeweaveResult<Vec<String>> {
    Ok(to_list(d.get_var_flag_opt(var, flag, raw())?))
}

pub(crate) fn is_set(value: &Option<VariableContents>) -> bool {
    value.as_ref().is_some_and(VariableContents::is_truthy)
}
