pub mod parser;
pub mod system;

pub use parser::QuoteParser;
pub use system::{QuotationMark, QuoteSystem, QuoteSystemError, QuoteType};
