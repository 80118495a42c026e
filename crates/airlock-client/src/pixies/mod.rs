//! The pixies that make up a running context.

pub mod context;
pub mod exchange;
