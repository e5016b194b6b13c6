pub mod asset_processor;
pub mod attrs;
pub mod document_scanner;
pub mod dom_visitor;
pub mod processor_core;
pub mod script_processor;
pub mod stylesheet_processor;

pub use asset_processor::AssetProcessor;
pub use document_scanner::{DocumentScanner, ScanError};
pub use processor_core::ProcessorCore;
pub use script_processor::ScriptProcessor;
pub use stylesheet_processor::StylesheetProcessor;
