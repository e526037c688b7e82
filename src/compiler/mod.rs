pub mod compiler;
pub mod context;
pub mod expr;
pub mod modules;
pub mod operators;
pub mod pattern;
pub mod recursion;

pub use compiler::Compiler;
pub use context::{SourceDir, NO_PATH};
pub use modules::{DeferredModules, ModuleResolver};
pub use operators::OperatorTables;
