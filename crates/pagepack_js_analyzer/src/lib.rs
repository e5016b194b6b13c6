pub mod chunk;
pub mod iife;

pub use chunk::{transform_chunk, ChunkValue};
pub use iife::{is_program_an_iife, AnalyzerError, SourceKind};
