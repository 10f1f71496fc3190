mod binder;
mod builtins;
mod env;
mod fault;
mod history;
mod infer;
mod invoke;
mod seq;
mod ty;

#[cfg(test)]
mod tests;

pub use builtins::builtin_symbols;
pub use env::{Binding, CallStack, Env, Frame};
pub use fault::Fault;
pub use history::History;
pub use infer::{Analysis, Analyzer, InferError};
pub use ty::{subtype_bindings, ClosureId, ClosureRef, Signature, Type, TypeSet, BOTTOM, CONT, MAX_CONTAINER_DEPTH};
