/// IR выражений и паттернов, значения и эталонный вычислитель

pub mod eval;
pub mod expr;
pub mod pattern;
pub mod scope;
pub mod value;

pub use eval::{eval, evaluate};
pub use expr::{BinaryOp, CompareOp, Expr, SafeTailCallback, SafeTailStep, UnaryOp};
pub use pattern::{DictPatternEntry, FallbackPattern, Pattern, TuplePatternAttr};
pub use scope::Scope;
pub use value::{NativeFunction, Value};
