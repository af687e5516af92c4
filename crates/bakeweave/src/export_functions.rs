use std::path::Path;

use bakeweave_datasmart::DataSmart;
use tracing::trace;

use crate::BakeweaveResult;
use crate::errors::{HandledFailure, HandledFailureKind};
use crate::utils::{is_set, raw};

/// First line of every stub installed by `EXPORT_FUNCTIONS`. A function whose body lacks it was
/// defined by hand and is never replaced.
pub const EXPORT_SENTINEL: &str = "    # Export function set\n";

/// `EXPORT_FUNCTIONS` inside `classname.bbclass`: installs `func` as a stub calling
/// `classname_func`, unless something other than an earlier stub already defines `func`.
pub fn export_functions<S: AsRef<str>>(
    functions: &[S],
    classname: &str,
    d: &mut DataSmart,
    file: &Path,
    line: usize,
) -> BakeweaveResult<()> {
    for func in functions {
        let func = func.as_ref();
        let called = format!("{classname}_{func}");

        let current = d.get_var_opt(func, raw())?;
        if is_set(&current) {
            if !current
                .as_ref()
                .is_some_and(|v| v.to_string().contains(EXPORT_SENTINEL))
            {
                trace!("{func} is defined locally; not exporting {called}");
                continue;
            }

            d.del_var_flag(func, "python");
            d.del_var_flag(func, "func");
        }

        for flag in ["func", "python"] {
            let value = d.get_var_flag_opt(&called, flag, raw())?;
            if let Some(value) = value.filter(|v| v.is_truthy()) {
                d.set_var_flag(func, flag, value);
            }
        }
        for flag in ["dirs", "cleandirs", "fakeroot"] {
            let value = d.get_var_flag_opt(func, flag, raw())?;
            if let Some(value) = value.filter(|v| v.is_truthy()) {
                d.set_var_flag(&called, flag, value);
            }
        }
        d.set_var_flag(func, "filename", "autogenerated");
        d.set_var_flag(func, "lineno", 1i64);

        let python = is_set(&d.get_var_flag_opt(&called, "python", raw())?);
        let stub = if python {
            format!("{EXPORT_SENTINEL}    bb.build.exec_func('{called}', d)\n")
        } else {
            if classname.contains('-') {
                return Err(HandledFailure {
                    file: file.to_path_buf(),
                    line,
                    kind: HandledFailureKind::DashInClassName {
                        class: classname.to_string(),
                        function: called,
                    },
                }
                .into());
            }
            format!("{EXPORT_SENTINEL}    {called}\n")
        };

        d.set_var_parsing(func, stub)?;
    }

    Ok(())
}
