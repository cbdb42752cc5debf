mod extractor;

pub mod extractors;

pub use extractor::{detect_kind_from_bytes, DocumentExtractor};
pub use extractors::ProgressFn;
