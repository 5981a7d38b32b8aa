//! Turns an extracted netlist into SPICE element cards.

use std::cmp::Ordering;

use indexmap::IndexMap;

use super::circuit::{Card, Circuit, CircuitElement};
use super::models::{get_includes, ModelRegistry};
use crate::error::Error;
use crate::library::SymbolLibrary;
use crate::netlist::Netlist;
use crate::schema::{LibrarySymbol, Schema, Symbol};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Primitive {
    Resistor,
    Capacitor,
    Diode,
    Bjt,
    Subcircuit,
    VoltageSource,
}

impl Primitive {
    fn from_letter(letter: &str) -> Option<Primitive> {
        match letter.to_ascii_uppercase().as_str() {
            "R" => Some(Primitive::Resistor),
            "C" => Some(Primitive::Capacitor),
            "D" => Some(Primitive::Diode),
            "Q" => Some(Primitive::Bjt),
            "X" => Some(Primitive::Subcircuit),
            "V" => Some(Primitive::VoltageSource),
            _ => None,
        }
    }

    fn needs_model(&self) -> bool {
        matches!(
            self,
            Primitive::Diode | Primitive::Bjt | Primitive::Subcircuit
        )
    }

    fn element(&self, card: Card) -> CircuitElement {
        match self {
            Primitive::Resistor => CircuitElement::Resistor(card),
            Primitive::Capacitor => CircuitElement::Capacitor(card),
            Primitive::Diode => CircuitElement::Diode(card),
            Primitive::Bjt => CircuitElement::Bjt(card),
            Primitive::Subcircuit => CircuitElement::Subcircuit(card),
            Primitive::VoltageSource => CircuitElement::VoltageSource(card),
        }
    }
}

/// A property of the placed symbol, falling back to the library symbol.
fn property<'s>(symbol: &'s Symbol, library: &'s LibrarySymbol, key: &str) -> Option<&'s str> {
    symbol.property(key).or_else(|| library.property(key))
}

fn primitive(
    reference: &str,
    model: &str,
    explicit: Option<&str>,
    registry: &mut ModelRegistry,
) -> Result<Option<Primitive>, Error> {
    if let Some(explicit) = explicit {
        let primitive = Primitive::from_letter(explicit);
        if primitive.is_none() {
            log::warn!("{reference}: unknown spice primitive {explicit}");
        }
        return Ok(primitive);
    }
    let letter = reference
        .chars()
        .next()
        .map(|c| c.to_ascii_uppercase())
        .unwrap_or_default();
    let primitive = match letter {
        'R' => Some(Primitive::Resistor),
        'C' => Some(Primitive::Capacitor),
        'D' => Some(Primitive::Diode),
        'Q' => Some(Primitive::Bjt),
        'V' => Some(Primitive::VoltageSource),
        'U' | 'X' if registry.contains(model)? => Some(Primitive::Subcircuit),
        _ => None,
    };
    if primitive.is_none() {
        log::warn!("{reference}: no spice primitive for this part, skipping");
    }
    Ok(primitive)
}

/// Numeric pin numbers first in numeric order, the rest after them.
fn compare_pins(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Pin numbers in the order the card lists their nodes.
fn pin_sequence(
    library: &LibrarySymbol,
    units: impl IntoIterator<Item = u32>,
    sequence: Option<&str>,
) -> Vec<String> {
    if let Some(sequence) = sequence {
        return sequence
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|pin| !pin.is_empty())
            .map(str::to_owned)
            .collect();
    }
    let mut pins: Vec<String> = Vec::new();
    for unit in units {
        for pin in library.pins(unit) {
            if !pins.contains(&pin.number) {
                pins.push(pin.number.clone());
            }
        }
    }
    pins.sort_by(|a, b| compare_pins(a, b));
    pins
}

/// Drops unit suffixes SPICE does not understand.
fn normalize_value(primitive: Primitive, value: &str) -> String {
    match primitive {
        Primitive::Resistor => {
            let lower = value.to_ascii_lowercase();
            if lower.ends_with("ohm") {
                value[..value.len() - 3].to_owned()
            } else {
                value.trim_end_matches('Ω').to_owned()
            }
        }
        Primitive::Capacitor => {
            let mut chars = value.chars().rev();
            match (chars.next(), chars.next()) {
                (Some('F' | 'f'), Some(scale)) if "pnuµmk".contains(scale) => {
                    value[..value.len() - 1].to_owned()
                }
                _ => value.to_owned(),
            }
        }
        _ => value.to_owned(),
    }
}

impl Circuit {
    /// Builds the deck for an extracted netlist.
    ///
    /// Parts sharing a reference become one card. Power symbols and
    /// parts with `Spice_Netlist_Enabled` set to `N` are left out.
    pub fn from_netlist(
        title: &str,
        schema: &Schema,
        netlist: &Netlist,
        library: &mut SymbolLibrary,
        registry: &mut ModelRegistry,
    ) -> Result<Circuit, Error> {
        library.register(&schema.lib_symbols);
        let mut circuit = Circuit::new(title);

        let mut parts: IndexMap<&str, Vec<(usize, &Symbol)>> = IndexMap::new();
        for (index, symbol) in schema.symbols().enumerate() {
            parts
                .entry(symbol.reference().unwrap_or_default())
                .or_default()
                .push((index, symbol));
        }

        for (reference, symbols) in &parts {
            let Some(&(_, first)) = symbols.first() else {
                continue;
            };
            let lib = library.get(&first.lib_id)?;
            if lib.is_power() {
                continue;
            }
            if property(first, &lib, "Spice_Netlist_Enabled") == Some("N") {
                log::debug!("{reference}: excluded from the netlist");
                continue;
            }

            let model = property(first, &lib, "Spice_Model")
                .or_else(|| first.value())
                .unwrap_or_default();
            let explicit = property(first, &lib, "Spice_Primitive");
            let Some(primitive) = primitive(reference, model, explicit, registry)? else {
                continue;
            };

            let sequence = pin_sequence(
                &lib,
                symbols.iter().map(|(_, symbol)| symbol.unit),
                property(first, &lib, "Spice_Node_Sequence"),
            );
            let mut nodes = Vec::with_capacity(sequence.len());
            for number in &sequence {
                let net = symbols
                    .iter()
                    .find_map(|(index, _)| netlist.net_of(*index, number))
                    .ok_or_else(|| Error::UnresolvedNet {
                        reference: reference.to_string(),
                        pin: number.clone(),
                    })?;
                nodes.push(net.identifier.clone());
            }

            if primitive.needs_model() {
                get_includes(model, &mut circuit.includes, registry.models()?);
            }
            let value = normalize_value(primitive, model);
            circuit.push(primitive.element(Card::new(*reference, nodes, value)));
        }
        log::debug!(
            "{} cards, {} includes",
            circuit.elements.len(),
            circuit.includes.len()
        );
        Ok(circuit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Label, Property, SheetElement};
    use crate::transform::{Mirror, Point};
    use rstest::*;
    use std::path::PathBuf;

    fn resources() -> PathBuf {
        PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/resources/test"))
    }

    fn field(key: &str, value: &str) -> Property {
        Property {
            key: key.into(),
            value: value.into(),
            id: None,
            at: Point::default(),
            angle: 0.0,
            effects: Default::default(),
        }
    }

    fn symbol(lib_id: &str, uuid: &str, at: Point, properties: &[(&str, &str)]) -> SheetElement {
        SheetElement::Symbol(Symbol {
            lib_id: lib_id.into(),
            at,
            angle: 0.0,
            mirror: Mirror::None,
            unit: 1,
            uuid: uuid.into(),
            properties: properties.iter().map(|(k, v)| field(k, v)).collect(),
            pins: vec![],
        })
    }

    fn label(text: &str, at: Point) -> SheetElement {
        SheetElement::Label(Label {
            at,
            angle: 0.0,
            text: text.into(),
            uuid: String::new(),
        })
    }

    fn schema(elements: Vec<SheetElement>) -> Schema {
        Schema {
            version: "20211123".into(),
            generator: "eeschema".into(),
            uuid: String::new(),
            paper: "A4".into(),
            title_block: Default::default(),
            lib_symbols: vec![],
            elements,
            sheet_instances: vec![],
            symbol_instances: vec![],
        }
    }

    fn deck(schema: &Schema) -> String {
        let mut library = SymbolLibrary::new([resources()]);
        let mut registry = ModelRegistry::new([resources().join("spice")]);
        let netlist = Netlist::new(schema, &mut library).unwrap();
        Circuit::from_netlist("test", schema, &netlist, &mut library, &mut registry)
            .unwrap()
            .to_string()
    }

    #[test]
    fn resistor_between_label_and_ground() {
        let schema = schema(vec![
            label("A", Point::new(0.0, -3.81)),
            symbol(
                "Device:R",
                "r1",
                Point::new(0.0, 0.0),
                &[("Reference", "R1"), ("Value", "4k7")],
            ),
            symbol(
                "power:GND",
                "g1",
                Point::new(0.0, 3.81),
                &[("Reference", "#PWR01"), ("Value", "GND")],
            ),
        ]);
        assert_eq!(deck(&schema), ".title test\nR1 A GND 4k7\n.end\n");
    }

    #[test]
    fn disabled_parts_are_skipped() {
        let schema = schema(vec![symbol(
            "Device:R",
            "r1",
            Point::new(0.0, 0.0),
            &[("Reference", "R1"), ("Value", "1k"), ("Spice_Netlist_Enabled", "N")],
        )]);
        assert_eq!(deck(&schema), ".title test\n.end\n");
    }

    #[test]
    fn transistor_pulls_in_its_model() {
        let schema = schema(vec![symbol(
            "Transistor_BJT:BC548",
            "q1",
            Point::new(0.0, 0.0),
            &[("Reference", "Q1"), ("Value", "BC548")],
        )]);
        let expected = format!(
            ".title test\n.include {}\nQ1 1 2 3 BC548\n.end\n",
            resources().join("spice").join("bjt.lib").display()
        );
        assert_eq!(deck(&schema), expected);
    }

    #[test]
    fn node_sequence_overrides_pin_order() {
        let schema = schema(vec![
            label("A", Point::new(0.0, -3.81)),
            label("B", Point::new(0.0, 3.81)),
            symbol(
                "Device:R",
                "r1",
                Point::new(0.0, 0.0),
                &[("Reference", "R1"), ("Value", "1k"), ("Spice_Node_Sequence", "2,1")],
            ),
        ]);
        assert_eq!(deck(&schema), ".title test\nR1 B A 1k\n.end\n");
    }

    #[test]
    fn unknown_parts_are_skipped() {
        let schema = schema(vec![symbol(
            "Device:R",
            "u1",
            Point::new(0.0, 0.0),
            &[("Reference", "U1"), ("Value", "LM741")],
        )]);
        assert_eq!(deck(&schema), ".title test\n.end\n");
    }

    #[test]
    fn parts_without_uuid_keep_their_own_nets() {
        let schema = schema(vec![
            label("A", Point::new(0.0, -3.81)),
            label("B", Point::new(0.0, 3.81)),
            label("C", Point::new(10.0, -3.81)),
            label("D", Point::new(10.0, 3.81)),
            symbol(
                "Device:R",
                "",
                Point::new(0.0, 0.0),
                &[("Reference", "R1"), ("Value", "1k")],
            ),
            symbol(
                "Device:R",
                "",
                Point::new(10.0, 0.0),
                &[("Reference", "R2"), ("Value", "2k")],
            ),
        ]);
        assert_eq!(deck(&schema), ".title test\nR1 A B 1k\nR2 C D 2k\n.end\n");
    }

    fn amp_unit(uuid: &str, at: Point, unit: u32) -> SheetElement {
        match symbol("Amp:Dual", uuid, at, &[("Reference", "U1"), ("Value", "TL072")]) {
            SheetElement::Symbol(symbol) => SheetElement::Symbol(Symbol { unit, ..symbol }),
            other => other,
        }
    }

    fn amp() -> LibrarySymbol {
        let input = std::fs::read_to_string(resources().join("Amp.kicad_sym")).unwrap();
        crate::library::parse_library(&input).unwrap().remove(0)
    }

    #[test]
    fn units_of_one_part_make_one_subcircuit_card() {
        let schema = schema(vec![
            label("P1", Point::new(-5.08, -2.54)),
            label("P2", Point::new(-5.08, 2.54)),
            label("P3", Point::new(25.08, -2.54)),
            label("P4", Point::new(25.08, 2.54)),
            amp_unit("u1a", Point::new(0.0, 0.0), 1),
            amp_unit("u1b", Point::new(20.0, 0.0), 2),
        ]);
        let spice = resources().join("spice");
        let expected = format!(
            ".title test\n.include {}\n.include {}\nXU1 P1 P2 P3 P4 TL072\n.end\n",
            spice.join("opamp.lib").display(),
            spice.join("diodes.lib").display()
        );
        assert_eq!(deck(&schema), expected);
    }

    #[test]
    fn explicit_primitive_names_the_card() {
        let schema = schema(vec![
            label("A", Point::new(0.0, -3.81)),
            label("B", Point::new(0.0, 3.81)),
            symbol(
                "Device:R",
                "a1",
                Point::new(0.0, 0.0),
                &[
                    ("Reference", "A1"),
                    ("Value", "amp"),
                    ("Spice_Primitive", "X"),
                    ("Spice_Model", "TL072"),
                ],
            ),
        ]);
        let spice = resources().join("spice");
        let expected = format!(
            ".title test\n.include {}\n.include {}\nXA1 A B TL072\n.end\n",
            spice.join("opamp.lib").display(),
            spice.join("diodes.lib").display()
        );
        assert_eq!(deck(&schema), expected);
    }

    #[test]
    fn unknown_explicit_primitive_is_skipped() {
        let schema = schema(vec![symbol(
            "Device:R",
            "r1",
            Point::new(0.0, 0.0),
            &[("Reference", "R1"), ("Value", "1k"), ("Spice_Primitive", "Z")],
        )]);
        assert_eq!(deck(&schema), ".title test\n.end\n");
    }

    #[rstest]
    #[case("1,2", &["1", "2"])]
    #[case("3 1, 2", &["3", "1", "2"])]
    fn node_sequence_splits_on_commas_and_spaces(
        #[case] sequence: &str,
        #[case] expected: &[&str],
    ) {
        assert_eq!(pin_sequence(&amp(), [1, 2], Some(sequence)), expected);
    }

    #[test]
    fn pin_order_is_the_union_of_units() {
        let lib = amp();
        assert_eq!(pin_sequence(&lib, [2, 1], None), vec!["1", "2", "3", "4"]);
        assert_eq!(pin_sequence(&lib, [2], None), vec!["3", "4"]);
    }

    #[rstest]
    #[case(Primitive::Resistor, "10kohm", "10k")]
    #[case(Primitive::Resistor, "4k7Ω", "4k7")]
    #[case(Primitive::Resistor, "100", "100")]
    #[case(Primitive::Capacitor, "100nF", "100n")]
    #[case(Primitive::Capacitor, "10f", "10f")]
    #[case(Primitive::Capacitor, "1F", "1F")]
    #[case(Primitive::Diode, "1N4148", "1N4148")]
    fn normalizes_values(
        #[case] primitive: Primitive,
        #[case] value: &str,
        #[case] expected: &str,
    ) {
        assert_eq!(normalize_value(primitive, value), expected);
    }

    #[rstest]
    #[case(&["10", "2", "1"], &["1", "2", "10"])]
    #[case(&["B", "2", "A", "1"], &["1", "2", "A", "B"])]
    fn orders_pin_numbers(#[case] input: &[&str], #[case] expected: &[&str]) {
        let mut pins = input.to_vec();
        pins.sort_by(|a, b| compare_pins(a, b));
        assert_eq!(pins, expected);
    }
}
