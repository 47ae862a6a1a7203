#[macro_use]
extern crate pest_derive;

pub mod collector;
pub mod error;
pub mod fields;
pub mod lang;

pub use crate::collector::combinators::{accumulate, compose, left_join, select, Accumulate, CollectContext};
pub use crate::collector::{dispatch, Collector, HandlerMap, HandlerNode, HandlerResult};
pub use crate::error::CollectError;
pub use crate::fields::{ExtractOptions, FieldTree};

#[cfg(test)]
mod tests;
