//! Typed model of a KiCad schematic.

use std::path::Path;

use crate::error::Error;
use crate::sexpr::SExpr;
use crate::transform::{is_unit, Mirror, Placement, Point};

/// Text effects of a property or label.
#[derive(Debug, Clone, PartialEq)]
pub struct Effects {
    pub font_size: (f64, f64),
    pub justify: Vec<String>,
    pub hide: bool,
}

impl Default for Effects {
    fn default() -> Self {
        Self {
            font_size: (1.27, 1.27),
            justify: Vec::new(),
            hide: false,
        }
    }
}

/// The parts of an `(effects ...)` node actually present in the file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectsNode {
    pub font_size: Option<(f64, f64)>,
    pub justify: Option<Vec<String>>,
    pub hide: bool,
}

impl Effects {
    /// Fills everything `node` leaves out from `self`.
    pub fn merge(&self, node: EffectsNode) -> Effects {
        Effects {
            font_size: node.font_size.unwrap_or(self.font_size),
            justify: node.justify.unwrap_or_else(|| self.justify.clone()),
            hide: node.hide || self.hide,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub key: String,
    pub value: String,
    pub id: Option<u32>,
    pub at: Point,
    pub angle: f64,
    pub effects: Effects,
}

/// A pin of a library symbol, in the unit's local frame
#[derive(Debug, Clone, PartialEq)]
pub struct Pin {
    pub number: String,
    pub name: String,
    pub electrical: String,
    pub at: Point,
    pub angle: f64,
    pub length: f64,
    pub hidden: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Graphic {
    Polyline {
        pts: Vec<Point>,
        stroke: f64,
        fill: String,
    },
    Rectangle {
        start: Point,
        end: Point,
        stroke: f64,
        fill: String,
    },
    Circle {
        center: Point,
        radius: f64,
        stroke: f64,
        fill: String,
    },
    Arc {
        start: Point,
        mid: Point,
        end: Point,
        stroke: f64,
        fill: String,
    },
}

/// One sub-symbol of a library symbol, named `<Name>_<unit>_<style>`
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub name: String,
    pub unit: u32,
    pub style: u32,
    pub graphics: Vec<Graphic>,
    pub pins: Vec<Pin>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LibrarySymbol {
    pub lib_id: String,
    pub extends: Option<String>,
    pub power: bool,
    pub properties: Vec<Property>,
    pub units: Vec<Unit>,
}

impl LibrarySymbol {
    /// Power symbols name nets and are not components.
    pub fn is_power(&self) -> bool {
        self.power || self.extends.as_deref() == Some("power")
    }

    /// The parent symbol this one borrows its units from.
    pub fn parent(&self) -> Option<&str> {
        self.extends.as_deref().filter(|parent| *parent != "power")
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        property(&self.properties, key)
    }

    /// Pins drawn for a symbol placed as `unit`, shared pins included.
    pub fn pins(&self, unit: u32) -> impl Iterator<Item = &Pin> {
        self.units
            .iter()
            .filter(move |u| is_unit(u, unit))
            .flat_map(|u| u.pins.iter())
    }

    /// Number of distinct units, not counting the shared unit 0.
    pub fn unit_count(&self) -> u32 {
        self.units.iter().map(|u| u.unit).max().unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Wire {
    pub pts: [Point; 2],
    pub uuid: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Junction {
    pub at: Point,
    pub uuid: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub at: Point,
    pub angle: f64,
    pub text: String,
    pub uuid: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GlobalLabel {
    pub at: Point,
    pub angle: f64,
    pub text: String,
    pub shape: String,
    pub uuid: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NoConnect {
    pub at: Point,
    pub uuid: String,
}

/// A library symbol placed on the sheet
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub lib_id: String,
    pub at: Point,
    pub angle: f64,
    pub mirror: Mirror,
    pub unit: u32,
    pub uuid: String,
    pub properties: Vec<Property>,
    /// Pin numbers with the uuid KiCad assigned to each
    pub pins: Vec<(String, String)>,
}

impl Symbol {
    pub fn property(&self, key: &str) -> Option<&str> {
        property(&self.properties, key)
    }

    pub fn reference(&self) -> Option<&str> {
        self.property("Reference")
    }

    pub fn value(&self) -> Option<&str> {
        self.property("Value")
    }
}

impl Placement for Symbol {
    fn position(&self) -> Point {
        self.at
    }

    fn angle(&self) -> f64 {
        self.angle
    }

    fn mirror(&self) -> Mirror {
        self.mirror
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SheetElement {
    Wire(Wire),
    Junction(Junction),
    Label(Label),
    GlobalLabel(GlobalLabel),
    NoConnect(NoConnect),
    Symbol(Symbol),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TitleBlock {
    pub title: String,
    pub date: String,
    pub rev: String,
    pub company: String,
    pub comments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SheetInstance {
    pub path: String,
    pub page: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolInstance {
    pub path: String,
    pub reference: String,
    pub unit: u32,
    pub value: String,
    pub footprint: String,
}

/// A parsed `.kicad_sch` file
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub version: String,
    pub generator: String,
    pub uuid: String,
    pub paper: String,
    pub title_block: TitleBlock,
    pub lib_symbols: Vec<LibrarySymbol>,
    pub elements: Vec<SheetElement>,
    pub sheet_instances: Vec<SheetInstance>,
    pub symbol_instances: Vec<SymbolInstance>,
}

impl Schema {
    pub fn parse(input: &str) -> Result<Schema, Error> {
        let sexpr = SExpr::try_from(input)?;
        Ok(Schema::try_from(&sexpr)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Schema, Error> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        log::debug!("loading schematic {}", path.display());
        Schema::parse(&input)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.elements.iter().filter_map(|element| match element {
            SheetElement::Symbol(symbol) => Some(symbol),
            _ => None,
        })
    }

    /// Walks the schematic in file order.
    pub fn accept<V: SchemaVisitor + ?Sized>(&self, visitor: &mut V) -> Result<(), Error> {
        visitor.start(self)?;
        visitor.start_library_symbols()?;
        for symbol in &self.lib_symbols {
            visitor.library_symbol(symbol)?;
        }
        visitor.end_library_symbols()?;
        for element in &self.elements {
            match element {
                SheetElement::Wire(wire) => visitor.wire(wire)?,
                SheetElement::Junction(junction) => visitor.junction(junction)?,
                SheetElement::Label(label) => visitor.label(label)?,
                SheetElement::GlobalLabel(label) => visitor.global_label(label)?,
                SheetElement::NoConnect(no_connect) => visitor.no_connect(no_connect)?,
                SheetElement::Symbol(symbol) => visitor.symbol(symbol)?,
            }
        }
        visitor.start_sheet_instances()?;
        for instance in &self.sheet_instances {
            visitor.sheet_instance(instance)?;
        }
        visitor.end_sheet_instances()?;
        visitor.start_symbol_instances()?;
        for instance in &self.symbol_instances {
            visitor.symbol_instance(instance)?;
        }
        visitor.end_symbol_instances()?;
        visitor.end()
    }
}

/// Receives the elements of a [`Schema`] in file order.
///
/// Plotters and the netlist extraction both consume the schematic this
/// way. Every callback defaults to doing nothing.
#[allow(unused_variables)]
pub trait SchemaVisitor {
    fn start(&mut self, schema: &Schema) -> Result<(), Error> {
        Ok(())
    }
    fn start_library_symbols(&mut self) -> Result<(), Error> {
        Ok(())
    }
    fn library_symbol(&mut self, symbol: &LibrarySymbol) -> Result<(), Error> {
        Ok(())
    }
    fn end_library_symbols(&mut self) -> Result<(), Error> {
        Ok(())
    }
    fn wire(&mut self, wire: &Wire) -> Result<(), Error> {
        Ok(())
    }
    fn junction(&mut self, junction: &Junction) -> Result<(), Error> {
        Ok(())
    }
    fn label(&mut self, label: &Label) -> Result<(), Error> {
        Ok(())
    }
    fn global_label(&mut self, label: &GlobalLabel) -> Result<(), Error> {
        Ok(())
    }
    fn no_connect(&mut self, no_connect: &NoConnect) -> Result<(), Error> {
        Ok(())
    }
    fn symbol(&mut self, symbol: &Symbol) -> Result<(), Error> {
        Ok(())
    }
    fn start_sheet_instances(&mut self) -> Result<(), Error> {
        Ok(())
    }
    fn sheet_instance(&mut self, instance: &SheetInstance) -> Result<(), Error> {
        Ok(())
    }
    fn end_sheet_instances(&mut self) -> Result<(), Error> {
        Ok(())
    }
    fn start_symbol_instances(&mut self) -> Result<(), Error> {
        Ok(())
    }
    fn symbol_instance(&mut self, instance: &SymbolInstance) -> Result<(), Error> {
        Ok(())
    }
    fn end_symbol_instances(&mut self) -> Result<(), Error> {
        Ok(())
    }
    fn end(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

fn property<'p>(properties: &'p [Property], key: &str) -> Option<&'p str> {
    properties
        .iter()
        .find(|p| p.key == key)
        .map(|p| p.value.as_str())
}
