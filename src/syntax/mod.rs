pub mod ast;
pub mod grammar;

pub use ast::{Children, Node, NodeBuilder};
pub use grammar::{Grammar, JsonGrammar, TreeDocument};
