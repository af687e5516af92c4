//!
//! ## Introduction
//! This crate implements the BitBake variable store: the datastore every `.bb`, `.bbclass` and
//! `.conf` statement ends up writing into. See
//! <https://docs.yoctoproject.org/bitbake/bitbake-user-manual/bitbake-user-manual-metadata.html>
//! for the syntax itself; this page only explains how `bakeweave` stores it.
//!
//! ## Base variables and override variants
//! Consider this snippet:
//!
//! ```text
//! MY_VAR = "base"
//! MY_VAR:a = "a"
//! MY_VAR:a:b = "ab"
//! ```
//!
//! `MY_VAR` is the **base variable**; `MY_VAR:a` and `MY_VAR:a:b` are its **override variants**.
//! All three are stored as separate variables. [`overrides::PerVarOverrideData`] remembers that
//! `MY_VAR:a:b` is a variant of both `MY_VAR:a` (override `b`) and `MY_VAR` (override `a:b`).
//!
//! Reading `MY_VAR` consults `OVERRIDES` (colon separated, increasing priority) and picks the
//! most specific active variant, falling back to the base value. Nothing is precomputed, so
//! setting `OVERRIDES` later changes what the next read returns.
//!
//! ## Keyword operations
//! ```text
//! MY_VAR:append = " more"
//! MY_VAR:append:a = " a"
//! MY_VAR:b:append = " b"
//! ```
//!
//! `:append`, `:prepend` and `:remove` don't create variables. They queue a
//! [`data_smart::KeywordOperation`] on the name in front of the keyword (`MY_VAR`, or `MY_VAR:b`
//! in the last line). Anything after the keyword is a filter: `MY_VAR:append:a` only applies
//! while `a` is active. Operations are applied when the variable is read, after override
//! selection: appends, then prepends, then expansion, then removes.
//!
//! ## Expansion
//! `${NAME}` references expand recursively at read time. A reference to an undefined variable
//! expands to nothing. `${@...}` inline code is left as-is.
pub mod data_smart;
pub mod errors;
pub mod macros;
pub mod overrides;
#[cfg(test)]
mod tests;
pub mod variable_contents;
pub mod variable_parse;

pub use data_smart::{DataSmart, GetVarOptions};
pub use variable_contents::VariableContents;
