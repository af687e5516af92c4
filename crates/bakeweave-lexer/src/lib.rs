pub mod keywords;
pub mod line_reader;

pub use line_reader::{LineReader, LineReaderError, LineReaderErrorKind, LogicalLine};
