pub mod diagnostics;
pub mod error;
pub mod span;

pub use diagnostics::{Diagnostics, DiagnosticsSink, TracingSink};
pub use error::{CompileError, EvalError, ModuleError, ParseError};
pub use span::{Source, Span, SpanMergeError};
