pub mod parser;

pub use parser::{ParsedBatch, TokenRecordParser};
