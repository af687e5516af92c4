use std::collections::HashSet;

use regex::Captures;
use tracing::debug;

use crate::data_smart::{GetVarOptions, Resolver};
use crate::errors::DataSmartResult;
use crate::variable_contents::VariableContents;

/// The outcome of expanding a value: the expanded text plus what was learned on the way.
#[derive(Clone, Debug, Default)]
pub struct VariableParse {
    pub name: Option<String>,
    pub value: Option<VariableContents>,
    /// Every variable referenced through `${...}`.
    pub references: HashSet<String>,
    /// References to variables that don't exist; they expanded to nothing.
    pub unresolved: HashSet<String>,
    /// The `:remove` values that actually removed something.
    pub removes: Option<HashSet<String>>,
}

impl VariableParse {
    pub fn new<T: Into<String>>(name: Option<T>) -> Self {
        VariableParse {
            name: name.map(Into::into),
            ..Default::default()
        }
    }

    pub fn value_string(&self) -> String {
        self.value.as_ref().map(|v| v.to_string()).unwrap_or_default()
    }

    pub(crate) fn var_sub(
        &mut self,
        caps: &Captures,
        resolver: &mut Resolver,
    ) -> DataSmartResult<String> {
        let match_str = &caps[0];
        let referenced_var = &match_str[2..match_str.len() - 1];
        self.references.insert(referenced_var.to_string());

        match resolver.get_content(referenced_var, GetVarOptions::default())? {
            Some(v) => Ok(v.to_string()),
            None => {
                debug!(
                    "{}: undefined reference to {referenced_var}",
                    self.name.as_deref().unwrap_or("<expression>")
                );
                self.unresolved.insert(referenced_var.to_string());
                Ok(String::new())
            }
        }
    }
}
