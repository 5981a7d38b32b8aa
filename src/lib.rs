//! Reads KiCad 6 schematics and writes SPICE netlists.
//!
//! ```no_run
//! use kicad_spice::{Circuit, Config, Netlist, Schema};
//!
//! # fn main() -> Result<(), kicad_spice::Error> {
//! let config = Config::from_env();
//! let mut library = config.library();
//! let mut registry = config.registry();
//! let schema = Schema::load("amp.kicad_sch")?;
//! let netlist = Netlist::new(&schema, &mut library)?;
//! let circuit = Circuit::from_netlist("amp", &schema, &netlist, &mut library, &mut registry)?;
//! print!("{circuit}");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod library;
pub mod netlist;
mod parse;
pub mod schema;
pub mod sexpr;
pub mod spice;
pub mod transform;

pub use config::Config;
pub use error::{Error, ParseError};
pub use library::SymbolLibrary;
pub use netlist::Netlist;
pub use schema::{Schema, SchemaVisitor};
pub use sexpr::SExpr;
pub use spice::{Circuit, ModelRegistry};
