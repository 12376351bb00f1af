pub mod extractor;
pub mod inline_file;
pub mod jwt;
pub mod test_utils;
