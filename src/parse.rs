//! Conversions from the s-expression tree into the schematic model.

use crate::error::ParseError;
use crate::schema::{
    Effects, EffectsNode, GlobalLabel, Graphic, Junction, Label, LibrarySymbol, NoConnect, Pin,
    Property, Schema, SheetElement, SheetInstance, Symbol, SymbolInstance, TitleBlock, Unit, Wire,
};
use crate::sexpr::SExpr;
use crate::transform::{Mirror, Point};

fn number(s: &str) -> Result<f64, ParseError> {
    s.parse().map_err(|_| ParseError::InvalidNumber(s.to_owned()))
}

fn integer(s: &str) -> Result<u32, ParseError> {
    s.parse().map_err(|_| ParseError::InvalidNumber(s.to_owned()))
}

/// Reads the first two atoms of `sexpr` as a point.
fn point(sexpr: &SExpr) -> Result<Point, ParseError> {
    Ok(Point::new(number(sexpr.atom(0)?)?, number(sexpr.atom(1)?)?))
}

/// Position and angle from an `(at x y [angle])` child.
fn at(sexpr: &SExpr) -> Result<(Point, f64), ParseError> {
    let at = sexpr.child("at")?;
    let angle = match at.atom(2) {
        Ok(angle) => number(angle)?,
        Err(_) => 0.0,
    };
    Ok((point(at)?, angle))
}

fn optional_value(sexpr: &SExpr, label: &str) -> Result<Option<String>, ParseError> {
    if sexpr.has_child(label) {
        Ok(Some(sexpr.value(label)?.to_owned()))
    } else {
        Ok(None)
    }
}

fn uuid(sexpr: &SExpr) -> Result<String, ParseError> {
    Ok(optional_value(sexpr, "uuid")?.unwrap_or_default())
}

fn points(sexpr: &SExpr) -> Result<Vec<Point>, ParseError> {
    sexpr.child("pts")?.children("xy").map(point).collect()
}

/// Splits a unit name like `R_1_1` into its unit and body style.
fn unit_name(name: &str) -> Result<(u32, u32), ParseError> {
    let invalid = || ParseError::InvalidUnitName(name.to_owned());
    let mut parts = name.rsplitn(3, '_');
    let style = parts.next().ok_or_else(invalid)?;
    let unit = parts.next().ok_or_else(invalid)?;
    if parts.next().is_none() {
        return Err(invalid());
    }
    let unit = unit.parse().map_err(|_| invalid())?;
    let style = style.parse().map_err(|_| invalid())?;
    Ok((unit, style))
}

impl TryFrom<&SExpr<'_>> for EffectsNode {
    type Error = ParseError;

    fn try_from(sexpr: &SExpr) -> Result<Self, Self::Error> {
        let font_size = match sexpr.child("font").and_then(|font| font.child("size")) {
            Ok(size) => Some((number(size.atom(0)?)?, number(size.atom(1)?)?)),
            Err(_) => None,
        };
        let justify = sexpr
            .child("justify")
            .ok()
            .map(|justify| justify.atoms().map(str::to_owned).collect());
        Ok(EffectsNode {
            font_size,
            justify,
            hide: sexpr.has_atom("hide"),
        })
    }
}

fn effects(sexpr: &SExpr) -> Result<Effects, ParseError> {
    let defaults = Effects::default();
    match sexpr.child("effects") {
        Ok(effects) => Ok(defaults.merge(EffectsNode::try_from(effects)?)),
        Err(_) => Ok(defaults),
    }
}

impl TryFrom<&SExpr<'_>> for Property {
    type Error = ParseError;

    fn try_from(sexpr: &SExpr) -> Result<Self, Self::Error> {
        let (at, angle) = at(sexpr)?;
        let id = match sexpr.child("id") {
            Ok(id) => Some(integer(id.atom(0)?)?),
            Err(_) => None,
        };
        Ok(Property {
            key: sexpr.atom(0)?.to_owned(),
            value: sexpr.atom(1)?.to_owned(),
            id,
            at,
            angle,
            effects: effects(sexpr)?,
        })
    }
}

impl TryFrom<&SExpr<'_>> for Pin {
    type Error = ParseError;

    fn try_from(sexpr: &SExpr) -> Result<Self, Self::Error> {
        let (at, angle) = at(sexpr)?;
        Ok(Pin {
            number: sexpr.value("number")?.to_owned(),
            name: sexpr.value("name")?.to_owned(),
            electrical: sexpr.atom(0)?.to_owned(),
            at,
            angle,
            length: number(sexpr.value("length")?)?,
            hidden: sexpr.has_atom("hide"),
        })
    }
}

fn stroke(sexpr: &SExpr) -> Result<f64, ParseError> {
    match sexpr.child("stroke") {
        Ok(stroke) => number(stroke.value("width")?),
        Err(_) => Ok(0.0),
    }
}

fn fill(sexpr: &SExpr) -> Result<String, ParseError> {
    match sexpr.child("fill") {
        Ok(fill) => Ok(fill.value("type")?.to_owned()),
        Err(_) => Ok("none".to_owned()),
    }
}

/// Reads a drawing primitive; `None` for kinds the model does not keep.
fn graphic(sexpr: &SExpr) -> Result<Option<Graphic>, ParseError> {
    let stroke = stroke(sexpr)?;
    let fill = fill(sexpr)?;
    let graphic = match sexpr.label() {
        Some("polyline") => Graphic::Polyline {
            pts: points(sexpr)?,
            stroke,
            fill,
        },
        Some("rectangle") => Graphic::Rectangle {
            start: point(sexpr.child("start")?)?,
            end: point(sexpr.child("end")?)?,
            stroke,
            fill,
        },
        Some("circle") => Graphic::Circle {
            center: point(sexpr.child("center")?)?,
            radius: number(sexpr.value("radius")?)?,
            stroke,
            fill,
        },
        Some("arc") => Graphic::Arc {
            start: point(sexpr.child("start")?)?,
            mid: point(sexpr.child("mid")?)?,
            end: point(sexpr.child("end")?)?,
            stroke,
            fill,
        },
        _ => return Ok(None),
    };
    Ok(Some(graphic))
}

impl TryFrom<&SExpr<'_>> for Unit {
    type Error = ParseError;

    fn try_from(sexpr: &SExpr) -> Result<Self, Self::Error> {
        let name = sexpr.atom(0)?;
        let (unit, style) = unit_name(name)?;
        let mut graphics = Vec::new();
        let mut pins = Vec::new();
        for child in sexpr.lists() {
            if child.label() == Some("pin") {
                pins.push(Pin::try_from(child)?);
            } else if let Some(graphic) = graphic(child)? {
                graphics.push(graphic);
            }
        }
        Ok(Unit {
            name: name.to_owned(),
            unit,
            style,
            graphics,
            pins,
        })
    }
}

impl TryFrom<&SExpr<'_>> for LibrarySymbol {
    type Error = ParseError;

    fn try_from(sexpr: &SExpr) -> Result<Self, Self::Error> {
        let properties = sexpr
            .children("property")
            .map(Property::try_from)
            .collect::<Result<_, _>>()?;
        let units = sexpr
            .children("symbol")
            .map(Unit::try_from)
            .collect::<Result<_, _>>()?;
        Ok(LibrarySymbol {
            lib_id: sexpr.atom(0)?.to_owned(),
            extends: optional_value(sexpr, "extends")?,
            power: sexpr.has_child("power"),
            properties,
            units,
        })
    }
}

impl TryFrom<&SExpr<'_>> for Wire {
    type Error = ParseError;

    fn try_from(sexpr: &SExpr) -> Result<Self, Self::Error> {
        let pts = points(sexpr)?;
        match pts[..] {
            [start, end] => Ok(Wire {
                pts: [start, end],
                uuid: uuid(sexpr)?,
            }),
            _ => Err(ParseError::MissingValue()),
        }
    }
}

impl TryFrom<&SExpr<'_>> for Junction {
    type Error = ParseError;

    fn try_from(sexpr: &SExpr) -> Result<Self, Self::Error> {
        Ok(Junction {
            at: at(sexpr)?.0,
            uuid: uuid(sexpr)?,
        })
    }
}

impl TryFrom<&SExpr<'_>> for NoConnect {
    type Error = ParseError;

    fn try_from(sexpr: &SExpr) -> Result<Self, Self::Error> {
        Ok(NoConnect {
            at: at(sexpr)?.0,
            uuid: uuid(sexpr)?,
        })
    }
}

impl TryFrom<&SExpr<'_>> for Label {
    type Error = ParseError;

    fn try_from(sexpr: &SExpr) -> Result<Self, Self::Error> {
        let (at, angle) = at(sexpr)?;
        Ok(Label {
            at,
            angle,
            text: sexpr.atom(0)?.to_owned(),
            uuid: uuid(sexpr)?,
        })
    }
}

impl TryFrom<&SExpr<'_>> for GlobalLabel {
    type Error = ParseError;

    fn try_from(sexpr: &SExpr) -> Result<Self, Self::Error> {
        let (at, angle) = at(sexpr)?;
        Ok(GlobalLabel {
            at,
            angle,
            text: sexpr.atom(0)?.to_owned(),
            shape: optional_value(sexpr, "shape")?.unwrap_or_else(|| "input".to_owned()),
            uuid: uuid(sexpr)?,
        })
    }
}

impl TryFrom<&str> for Mirror {
    type Error = ParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "x" => Ok(Mirror::X),
            "y" => Ok(Mirror::Y),
            s => Err(ParseError::UnknownMirror(s.to_owned())),
        }
    }
}

impl TryFrom<&SExpr<'_>> for Symbol {
    type Error = ParseError;

    fn try_from(sexpr: &SExpr) -> Result<Self, Self::Error> {
        let (at, angle) = at(sexpr)?;
        let mirror = match sexpr.child("mirror") {
            Ok(mirror) => Mirror::try_from(mirror.atom(0)?)?,
            Err(_) => Mirror::None,
        };
        let unit = match sexpr.child("unit") {
            Ok(unit) => integer(unit.atom(0)?)?,
            Err(_) => 1,
        };
        let properties = sexpr
            .children("property")
            .map(Property::try_from)
            .collect::<Result<_, _>>()?;
        let pins = sexpr
            .children("pin")
            .map(|pin| Ok((pin.atom(0)?.to_owned(), uuid(pin)?)))
            .collect::<Result<_, ParseError>>()?;
        Ok(Symbol {
            lib_id: sexpr.value("lib_id")?.to_owned(),
            at,
            angle,
            mirror,
            unit,
            uuid: uuid(sexpr)?,
            properties,
            pins,
        })
    }
}

impl TryFrom<&SExpr<'_>> for TitleBlock {
    type Error = ParseError;

    fn try_from(sexpr: &SExpr) -> Result<Self, Self::Error> {
        let comments = sexpr
            .children("comment")
            .map(|comment| comment.atom(1).map(str::to_owned))
            .collect::<Result<_, _>>()?;
        Ok(TitleBlock {
            title: optional_value(sexpr, "title")?.unwrap_or_default(),
            date: optional_value(sexpr, "date")?.unwrap_or_default(),
            rev: optional_value(sexpr, "rev")?.unwrap_or_default(),
            company: optional_value(sexpr, "company")?.unwrap_or_default(),
            comments,
        })
    }
}

impl TryFrom<&SExpr<'_>> for SymbolInstance {
    type Error = ParseError;

    fn try_from(sexpr: &SExpr) -> Result<Self, Self::Error> {
        Ok(SymbolInstance {
            path: sexpr.atom(0)?.to_owned(),
            reference: sexpr.value("reference")?.to_owned(),
            unit: integer(sexpr.value("unit")?)?,
            value: optional_value(sexpr, "value")?.unwrap_or_default(),
            footprint: optional_value(sexpr, "footprint")?.unwrap_or_default(),
        })
    }
}

fn sheet_element(sexpr: &SExpr) -> Result<Option<SheetElement>, ParseError> {
    let element = match sexpr.label() {
        Some("wire") => SheetElement::Wire(Wire::try_from(sexpr)?),
        Some("junction") => SheetElement::Junction(Junction::try_from(sexpr)?),
        Some("label") => SheetElement::Label(Label::try_from(sexpr)?),
        Some("global_label") => SheetElement::GlobalLabel(GlobalLabel::try_from(sexpr)?),
        Some("no_connect") => SheetElement::NoConnect(NoConnect::try_from(sexpr)?),
        Some("symbol") => SheetElement::Symbol(Symbol::try_from(sexpr)?),
        _ => return Ok(None),
    };
    Ok(Some(element))
}

impl TryFrom<&SExpr<'_>> for Schema {
    type Error = ParseError;

    fn try_from(sexpr: &SExpr) -> Result<Self, Self::Error> {
        if sexpr.label() != Some("kicad_sch") {
            return Err(ParseError::MissingChild("kicad_sch".to_owned()));
        }
        let title_block = match sexpr.child("title_block") {
            Ok(title_block) => TitleBlock::try_from(title_block)?,
            Err(_) => TitleBlock::default(),
        };
        let lib_symbols = match sexpr.child("lib_symbols") {
            Ok(lib_symbols) => lib_symbols
                .children("symbol")
                .map(LibrarySymbol::try_from)
                .collect::<Result<_, _>>()?,
            Err(_) => Vec::new(),
        };

        let mut elements = Vec::new();
        for child in sexpr.lists() {
            match sheet_element(child)? {
                Some(element) => elements.push(element),
                None => log::trace!("skipping {}", child.label().unwrap_or_default()),
            }
        }

        let sheet_instances = match sexpr.child("sheet_instances") {
            Ok(instances) => instances
                .children("path")
                .map(|path| {
                    Ok(SheetInstance {
                        path: path.atom(0)?.to_owned(),
                        page: path.value("page")?.to_owned(),
                    })
                })
                .collect::<Result<_, ParseError>>()?,
            Err(_) => Vec::new(),
        };
        let symbol_instances = match sexpr.child("symbol_instances") {
            Ok(instances) => instances
                .children("path")
                .map(SymbolInstance::try_from)
                .collect::<Result<_, _>>()?,
            Err(_) => Vec::new(),
        };

        Ok(Schema {
            version: sexpr.value("version")?.to_owned(),
            generator: sexpr.value("generator")?.to_owned(),
            uuid: uuid(sexpr)?,
            paper: optional_value(sexpr, "paper")?.unwrap_or_default(),
            title_block,
            lib_symbols,
            elements,
            sheet_instances,
            symbol_instances,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    macro_rules! test_data {
        ($fname:expr) => {
            std::fs::read_to_string(concat!(
                env!("CARGO_MANIFEST_DIR"),
                "/resources/test/",
                $fname
            ))
            .unwrap()
        };
    }

    #[rstest]
    #[case("R_1_1", Ok((1, 1)))]
    #[case("Conn_01x04_1_1", Ok((1, 1)))]
    #[case("LM358_0_1", Ok((0, 1)))]
    #[case("R_1", Err(ParseError::InvalidUnitName("R_1".into())))]
    #[case("R_a_1", Err(ParseError::InvalidUnitName("R_a_1".into())))]
    fn can_parse_unit_names(#[case] name: &str, #[case] expected: Result<(u32, u32), ParseError>) {
        assert_eq!(unit_name(name), expected);
    }

    #[test]
    fn can_parse_pin() {
        let sexpr = SExpr::try_from(
            "(pin power_in line (at 0 0 270) (length 0) hide
               (name \"GND\" (effects (font (size 1.27 1.27))))
               (number \"1\" (effects (font (size 1.27 1.27)))))",
        )
        .unwrap();
        let pin = Pin::try_from(&sexpr).unwrap();
        assert_eq!(pin.number, "1");
        assert_eq!(pin.name, "GND");
        assert_eq!(pin.electrical, "power_in");
        assert_eq!(pin.angle, 270.0);
        assert!(pin.hidden);
    }

    #[test]
    fn can_parse_mirrored_symbol() {
        let sexpr = SExpr::try_from(
            "(symbol (lib_id \"Device:R\") (at 10 20 180) (mirror y) (unit 2)
               (uuid abc)
               (property \"Reference\" \"R7\" (id 0) (at 0 0 0))
               (pin \"1\" (uuid p1)))",
        )
        .unwrap();
        let symbol = Symbol::try_from(&sexpr).unwrap();
        assert_eq!(symbol.lib_id, "Device:R");
        assert_eq!(symbol.at, Point::new(10.0, 20.0));
        assert_eq!(symbol.angle, 180.0);
        assert_eq!(symbol.mirror, Mirror::Y);
        assert_eq!(symbol.unit, 2);
        assert_eq!(symbol.reference(), Some("R7"));
        assert_eq!(symbol.pins, vec![("1".to_string(), "p1".to_string())]);
    }

    #[test]
    fn rejects_bad_numbers() {
        let sexpr = SExpr::try_from("(junction (at 1,0 2))").unwrap();
        assert_eq!(
            Junction::try_from(&sexpr),
            Err(ParseError::InvalidNumber("1,0".into()))
        );
    }

    #[test]
    fn property_effects_fall_back_to_defaults() {
        let sexpr = SExpr::try_from(
            "(property \"Footprint\" \"\" (id 2) (at 0 0 0) (effects (font (size 2 2)) hide))",
        )
        .unwrap();
        let property = Property::try_from(&sexpr).unwrap();
        assert_eq!(property.value, "");
        assert_eq!(property.effects.font_size, (2.0, 2.0));
        assert!(property.effects.justify.is_empty());
        assert!(property.effects.hide);
    }

    #[test]
    fn can_parse_schema() {
        let input = test_data!("divider.kicad_sch");
        let schema = Schema::parse(&input).unwrap();
        assert_eq!(schema.version, "20211123");
        assert_eq!(schema.title_block.title, "Divider");
        assert_eq!(schema.lib_symbols.len(), 4);
        assert_eq!(schema.elements.len(), 20);
        assert_eq!(schema.symbols().count(), 7);
        assert_eq!(schema.symbol_instances.len(), 7);
        assert_eq!(schema.symbol_instances[4].reference, "R1");
        assert_eq!(schema.sheet_instances[0].page, "1");

        let r = &schema.lib_symbols[1];
        assert_eq!(r.units.len(), 2);
        assert!(matches!(r.units[0].graphics[0], Graphic::Rectangle { .. }));
        assert_eq!(r.units[1].pins[1].at, Point::new(0.0, -3.81));
    }
}
