pub mod error;
pub mod lexer;
pub mod parser;
pub mod runner;
pub mod types;
