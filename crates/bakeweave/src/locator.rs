use std::path::{Path, PathBuf};

use bakeweave_datasmart::DataSmart;
use bakeweave_util::which::which;

use crate::BakeweaveResult;

/// Resolves `include`/`require`/`inherit` targets and top-level file names to absolute paths.
pub trait FileLocator: Send + Sync {
    fn locate(
        &self,
        name: &Path,
        d: &DataSmart,
        including_file: Option<&Path>,
    ) -> BakeweaveResult<Option<PathBuf>>;
}

/// Searches `BBPATH`, then the directory of the including file, then the working directory.
#[derive(Copy, Clone, Debug, Default)]
pub struct BbPathLocator;

impl FileLocator for BbPathLocator {
    fn locate(
        &self,
        name: &Path,
        d: &DataSmart,
        including_file: Option<&Path>,
    ) -> BakeweaveResult<Option<PathBuf>> {
        if name.is_absolute() {
            return Ok(which("", name)?);
        }

        let mut search = vec![
            d.get_var("BBPATH")?
                .map(|v| v.to_string())
                .unwrap_or_default(),
        ];
        if let Some(dir) = including_file.and_then(Path::parent) {
            search.push(dir.display().to_string());
        }
        search.push(std::env::current_dir()?.display().to_string());

        Ok(which(search.join(":"), name)?)
    }
}
