use std::path::Path;

use anyhow::bail;
use bakeweave_datasmart::DataSmart;
use tracing::trace;

use crate::BakeweaveResult;

/// Computes task signatures once a recipe is finalised. The parser treats it as a black box.
pub trait SignatureGenerator: Send + Sync {
    fn name(&self) -> &'static str;

    /// Called once per finalised datastore; `variant` is `None` for the default context.
    fn finalise(
        &self,
        file: &Path,
        d: &mut DataSmart,
        variant: Option<&str>,
    ) -> BakeweaveResult<()>;
}

#[derive(Copy, Clone, Debug, Default)]
pub struct NoopSignatureGenerator;

impl SignatureGenerator for NoopSignatureGenerator {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn finalise(
        &self,
        file: &Path,
        _d: &mut DataSmart,
        variant: Option<&str>,
    ) -> BakeweaveResult<()> {
        trace!("noop signatures for {} ({variant:?})", file.display());
        Ok(())
    }
}

/// Selects the signature generator named by `BB_SIGNATURE_HANDLER` (default `noop`).
pub fn init(d: &DataSmart) -> BakeweaveResult<Box<dyn SignatureGenerator>> {
    let desired = d
        .get_var("BB_SIGNATURE_HANDLER")?
        .map(|v| v.to_string())
        .unwrap_or_else(|| "noop".into());

    let generators: [Box<dyn SignatureGenerator>; 1] = [Box::new(NoopSignatureGenerator)];
    let available = generators.iter().map(|g| g.name()).collect::<Vec<_>>();
    match generators.into_iter().find(|g| g.name() == desired) {
        Some(generator) => Ok(generator),
        None => bail!(
            "invalid signature generator '{desired}'; available generators: {}",
            available.join(", ")
        ),
    }
}
