use crate::data_smart::{DataSmart, GetVarOptions};
use default_args::default_args;

extern crate self as _current_crate;

default_args! {
    export pub fn crate::macros::get_var<S: AsRef<str>>(d: &DataSmart, var: S, parsing: bool = false) -> Option<String> {
        d.get_var_opt(var, GetVarOptions::default().parsing(parsing))
            .ok()
            .flatten()
            .map(|v| v.to_string())
    }
}

#[allow(unused_imports)]
pub(crate) use get_var;
