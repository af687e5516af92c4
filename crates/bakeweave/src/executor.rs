use bakeweave_datasmart::DataSmart;
use tracing::debug;

use crate::BakeweaveResult;

/// Runs metadata functions on behalf of the parser.
///
/// The parser never interprets function bodies itself. Anonymous functions queued in
/// `__BBANONFUNCS` are handed to the executor, one at a time and in declaration order, when a
/// recipe is finalised. Returning a [`crate::errors::SkipRecipe`] error marks the recipe (or
/// variant) as skipped instead of failing the parse.
pub trait FunctionExecutor: Send + Sync {
    fn execute(&self, name: &str, d: &mut DataSmart) -> BakeweaveResult<()>;
}

/// Executes nothing.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopExecutor;

impl FunctionExecutor for NoopExecutor {
    fn execute(&self, name: &str, _d: &mut DataSmart) -> BakeweaveResult<()> {
        debug!("not executing {name}: no function executor configured");
        Ok(())
    }
}
