mod formatter;

pub use formatter::{ResponseFormat, ResponseFormatter};
