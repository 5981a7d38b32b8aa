//! SPICE deck generation.

pub mod circuit;
mod codegen;
pub mod models;

pub use circuit::{Card, Circuit, CircuitElement, SubCircuit};
pub use models::{get_includes, ModelRegistry, SpiceModel};
