//! BitBake metadata parsing.
//!
//! [`handle::Parser::handle`] reads a recipe, class, include or configuration file and
//! evaluates it into a [`bakeweave_datasmart::DataSmart`]:
//!
//! 1. [`nodes::parse_nodes`] splits the text into statements and captured function bodies.
//!    Any syntax error stops here, before the store is touched.
//! 2. [`evaluate::Evaluate`] applies each node in order: assignments, flags, `export`,
//!    `unset`, functions, tasks, `inherit`/`include`/`require` and `EXPORT_FUNCTIONS`.
//! 3. Recipes are finalised once per context (the default one plus one per `BBCLASSEXTEND`
//!    entry): keys are expanded, anonymous functions are handed to the
//!    [`executor::FunctionExecutor`], tasks are flagged and the
//!    [`siggen::SignatureGenerator`] is called.
//!
//! Function bodies are never interpreted here; that is the executor's job.
pub mod build;
pub mod errors;
pub mod evaluate;
pub mod executor;
pub mod export_functions;
pub mod handle;
pub mod locator;
pub mod nodes;
pub mod siggen;
#[cfg(test)]
mod tests;
pub mod utils;

pub use errors::{HandledFailure, ParseError, SkipRecipe};
pub use handle::Parser;

pub type BakeweaveResult<T> = anyhow::Result<T>;
