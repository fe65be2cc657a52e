mod bounded;

pub use bounded::{AsyncBoundedLineReader, LineRead};
