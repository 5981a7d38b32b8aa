//! Resolution of `Library:Symbol` ids against `.kicad_sym` files.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use crate::error::{Error, ParseError};
use crate::schema::LibrarySymbol;
use crate::sexpr::SExpr;

/// Reads all top level symbols of a `.kicad_sym` file.
pub fn parse_library(input: &str) -> Result<Vec<LibrarySymbol>, Error> {
    let sexpr = SExpr::try_from(input)?;
    if sexpr.label() != Some("kicad_symbol_lib") {
        return Err(ParseError::MissingChild("kicad_symbol_lib".to_owned()).into());
    }
    let symbols = sexpr
        .children("symbol")
        .map(LibrarySymbol::try_from)
        .collect::<Result<_, _>>()?;
    Ok(symbols)
}

/// Looks up library symbols, loading each library file once.
#[derive(Debug, Default)]
pub struct SymbolLibrary {
    paths: Vec<PathBuf>,
    libraries: HashMap<String, Vec<LibrarySymbol>>,
    embedded: HashMap<String, LibrarySymbol>,
}

impl SymbolLibrary {
    pub fn new<P: Into<PathBuf>>(paths: impl IntoIterator<Item = P>) -> Self {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Adds symbols embedded in a schematic. They shadow the library files.
    pub fn register(&mut self, symbols: &[LibrarySymbol]) {
        for symbol in symbols {
            self.embedded.insert(symbol.lib_id.clone(), symbol.clone());
        }
    }

    pub fn get(&mut self, qualified: &str) -> Result<LibrarySymbol, Error> {
        if let Some(symbol) = self.embedded.get(qualified) {
            return Ok(symbol.clone());
        }
        let (prefix, name) = qualified
            .split_once(':')
            .ok_or_else(|| Error::LibraryFormat(qualified.to_owned()))?;
        let symbols = self.load(prefix)?;
        let not_found = || Error::LibraryNotFound(qualified.to_owned());
        let find = |name: &str| symbols.iter().find(|s| s.lib_id == name);

        let mut symbol = find(name).ok_or_else(not_found)?.clone();
        let mut seen = HashSet::from([name.to_owned()]);
        let mut parent = symbol.parent().map(str::to_owned);
        while let Some(parent_name) = parent {
            if !seen.insert(parent_name.clone()) {
                return Err(Error::RecursiveExtends(qualified.to_owned()));
            }
            let base = find(&parent_name).ok_or_else(not_found)?;
            symbol.units = base.units.clone();
            symbol.power |= base.power;
            parent = base.parent().map(str::to_owned);
        }
        Ok(symbol)
    }

    fn load(&mut self, prefix: &str) -> Result<&Vec<LibrarySymbol>, Error> {
        if !self.libraries.contains_key(prefix) {
            let file = format!("{prefix}.kicad_sym");
            let path = self
                .paths
                .iter()
                .map(|dir| dir.join(&file))
                .find(|path| path.is_file())
                .ok_or_else(|| Error::LibraryNotFound(prefix.to_owned()))?;
            log::debug!("loading symbol library {}", path.display());
            let input = std::fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
            let symbols = parse_library(&input)?;
            self.libraries.insert(prefix.to_owned(), symbols);
        }
        self.libraries
            .get(prefix)
            .ok_or_else(|| Error::LibraryNotFound(prefix.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use rstest::*;

    fn resources() -> PathBuf {
        PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/resources/test"))
    }

    #[fixture]
    fn library() -> SymbolLibrary {
        SymbolLibrary::new([resources()])
    }

    #[rstest]
    fn loads_symbols_from_files(mut library: SymbolLibrary) {
        let r = library.get("Device:R").unwrap();
        assert_eq!(r.lib_id, "R");
        assert_eq!(r.pins(1).count(), 2);
        let gnd = library.get("power:GND").unwrap();
        assert!(gnd.is_power());
        assert_eq!(library.libraries.len(), 2);
        library.get("Device:C").unwrap();
        assert_eq!(library.libraries.len(), 2);
    }

    #[rstest]
    fn extends_borrows_the_parent_units(mut library: SymbolLibrary) {
        let base = library.get("Transistor_BJT:BC547").unwrap();
        let derived = library.get("Transistor_BJT:BC549").unwrap();
        assert_eq!(derived.lib_id, "BC549");
        assert_eq!(derived.units, base.units);
        assert_eq!(derived.property("Value"), Some("BC549"));
        let names: Vec<_> = derived.pins(1).map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["C", "B", "E"]);
    }

    #[rstest]
    #[case("Device")]
    #[case("Device:")]
    fn rejects_unqualified_names(mut library: SymbolLibrary, #[case] name: &str) {
        let result = library.get(name);
        if name.contains(':') {
            assert!(matches!(result, Err(Error::LibraryNotFound(_))));
        } else {
            assert!(matches!(result, Err(Error::LibraryFormat(n)) if n == name));
        }
    }

    #[rstest]
    #[case("Device:Q")]
    #[case("Missing:R")]
    fn reports_missing_symbols(mut library: SymbolLibrary, #[case] name: &str) {
        assert!(matches!(library.get(name), Err(Error::LibraryNotFound(_))));
    }

    #[test]
    fn detects_cyclic_extends() {
        let input = r#"(kicad_symbol_lib (version 20211014) (generator kicad_symbol_editor)
  (symbol "A" (extends "B"))
  (symbol "B" (extends "A"))
)"#;
        let symbols = parse_library(input).unwrap();
        let mut library = SymbolLibrary::default();
        library.libraries.insert("Loop".into(), symbols);
        assert!(matches!(
            library.get("Loop:A"),
            Err(Error::RecursiveExtends(n)) if n == "Loop:A"
        ));
    }

    #[test]
    fn embedded_symbols_take_precedence() {
        let input = std::fs::read_to_string(resources().join("divider.kicad_sch")).unwrap();
        let schema = Schema::parse(&input).unwrap();
        let mut library = SymbolLibrary::new(Vec::<PathBuf>::new());
        library.register(&schema.lib_symbols);
        let conn = library.get("Connector_Generic:Conn_01x04").unwrap();
        assert_eq!(conn.lib_id, "Connector_Generic:Conn_01x04");
        assert!(library.libraries.is_empty());
    }
}
