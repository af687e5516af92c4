use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataSmartError {
    #[error("unable to convert contents of {var} to a string")]
    DataConversionError { var: String },

    #[error("attempt to use ? operator on None")]
    UnwrapNoneError,

    #[error("variable {var} references itself")]
    RecursiveReferenceError { var: String },

    #[error(
        "overrides could not be expanded into a stable state after 5 iterations: {}",
        history.join(" -> ")
    )]
    UnstableOverridesError { history: Vec<String> },
}

pub type DataSmartResult<T> = anyhow::Result<T>;
