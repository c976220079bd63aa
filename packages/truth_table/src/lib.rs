pub mod binary;
pub mod compiler;
pub mod error;
pub mod evaluate;
pub mod generator;
pub mod operator;
pub mod reconstruct;
pub mod render;
pub mod stack;

pub use error::TableError;
pub use generator::{GeneratorConfig, RowRange, TableJob, TableSummary, DIAGNOSTIC};
pub use operator::{FilterMode, Notation};
