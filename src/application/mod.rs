pub mod use_cases;

pub use use_cases::endpoint_catalog::EndpointCatalogUseCase;
pub use use_cases::script_export::ScriptExportUseCase;
pub use use_cases::script_generator::ScriptGeneratorUseCase;
pub use use_cases::test_batch::TestBatchUseCase;
