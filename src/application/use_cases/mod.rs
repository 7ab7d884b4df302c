pub mod endpoint_catalog;
pub mod generation;
pub mod prompt_builder;
pub mod response_parser;
pub mod script_export;
pub mod script_generator;
pub mod test_batch;
pub mod test_executor;

#[cfg(test)]
pub(crate) mod test_support;
