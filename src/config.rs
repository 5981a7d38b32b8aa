//! Search paths for symbol libraries and SPICE models.

use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

use crate::library::SymbolLibrary;
use crate::spice::ModelRegistry;

const SYMBOL_DIR_VARS: [&str; 2] = ["KICAD6_SYMBOL_DIR", "KICAD_SYMBOL_DIR"];
const MODEL_DIR_VAR: &str = "SPICE_LIB_DIR";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub symbol_paths: Vec<PathBuf>,
    pub model_paths: Vec<PathBuf>,
}

fn split_paths(value: Option<OsString>) -> Vec<PathBuf> {
    value
        .map(|value| env::split_paths(&value).filter(|p| !p.as_os_str().is_empty()).collect())
        .unwrap_or_default()
}

impl Config {
    /// Reads the search paths from the environment.
    pub fn from_env() -> Self {
        Self::from_vars(|name| env::var_os(name))
    }

    fn from_vars(var: impl Fn(&str) -> Option<OsString>) -> Self {
        let mut symbol_paths = Vec::new();
        for name in SYMBOL_DIR_VARS {
            symbol_paths.extend(split_paths(var(name)));
        }
        Config {
            symbol_paths,
            model_paths: split_paths(var(MODEL_DIR_VAR)),
        }
    }

    /// Puts paths given on the command line in front of the configured ones.
    pub fn with_cli(mut self, symbol_paths: &[PathBuf], model_paths: &[PathBuf]) -> Self {
        self.symbol_paths.splice(0..0, symbol_paths.iter().cloned());
        self.model_paths.splice(0..0, model_paths.iter().cloned());
        self
    }

    pub fn library(&self) -> SymbolLibrary {
        SymbolLibrary::new(self.symbol_paths.iter().cloned())
    }

    pub fn registry(&self) -> ModelRegistry {
        ModelRegistry::new(self.model_paths.iter().cloned())
    }
}
