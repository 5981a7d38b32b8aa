//! Electrical connectivity of a schematic.

use std::collections::{HashMap, HashSet};

use crate::error::Error;
use crate::library::SymbolLibrary;
use crate::schema::{
    GlobalLabel, Label, LibrarySymbol, NoConnect, Schema, SchemaVisitor, Symbol, Wire,
};
use crate::transform::{pin_position, Point, PointKey};

mod disjoint_set;

use disjoint_set::DisjointSet;

/// A pin attached to a net
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetPin {
    /// Position of the placed symbol in `Schema::symbols`
    pub symbol: usize,
    /// uuid of the placed symbol, empty when the file has none
    pub instance: String,
    pub reference: String,
    pub number: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Net {
    pub identifier: String,
    pub points: Vec<PointKey>,
    pub pins: Vec<NetPin>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Net(String),
    Component(String),
}

/// A pin of one component connected to one net
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub symbol: usize,
    pub pin: String,
    pub component: usize,
    pub net: usize,
}

/// Incidence graph between components and nets.
///
/// Net `i` of the netlist is node `i`; component nodes follow.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    lookup: HashMap<(usize, String), usize>,
}

impl Graph {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edge(&self, symbol: usize, pin: &str) -> Option<&Edge> {
        self.lookup
            .get(&(symbol, pin.to_owned()))
            .map(|i| &self.edges[*i])
    }

    fn add_edge(&mut self, edge: Edge) {
        let key = (edge.symbol, edge.pin.clone());
        self.lookup.insert(key, self.edges.len());
        self.edges.push(edge);
    }
}

/// The nets of a schematic, frozen after extraction
#[derive(Debug, Clone)]
pub struct Netlist {
    nets: Vec<Net>,
    by_point: HashMap<PointKey, usize>,
    no_connects: Vec<Point>,
    graph: Graph,
}

impl Netlist {
    /// Extracts the nets of `schema`. Symbols embedded in the schematic
    /// are registered with `library` on the way.
    pub fn new(schema: &Schema, library: &mut SymbolLibrary) -> Result<Netlist, Error> {
        let mut builder = NetlistBuilder::new(library);
        schema.accept(&mut builder)?;
        Ok(builder.build())
    }

    pub fn nets(&self) -> &[Net] {
        &self.nets
    }

    pub fn net_at(&self, point: Point) -> Option<&Net> {
        self.by_point.get(&point.key()).map(|i| &self.nets[*i])
    }

    pub fn net_name(&self, point: Point) -> Option<&str> {
        self.net_at(point).map(|net| net.identifier.as_str())
    }

    /// Net of pin `pin` on the `symbol`th placed symbol of the schematic.
    pub fn net_of(&self, symbol: usize, pin: &str) -> Option<&Net> {
        self.graph.edge(symbol, pin).map(|edge| &self.nets[edge.net])
    }

    pub fn no_connects(&self) -> &[Point] {
        &self.no_connects
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }
}

struct PlacedSymbol {
    symbol: Symbol,
    library: LibrarySymbol,
}

/// Collects the connectable elements while a schematic is visited and
/// joins them into nets at the end.
struct NetlistBuilder<'l> {
    library: &'l mut SymbolLibrary,
    wires: Vec<[Point; 2]>,
    labels: Vec<(Point, String)>,
    symbols: Vec<PlacedSymbol>,
    no_connects: Vec<Point>,
}

impl<'l> NetlistBuilder<'l> {
    fn new(library: &'l mut SymbolLibrary) -> Self {
        Self {
            library,
            wires: Vec::new(),
            labels: Vec::new(),
            symbols: Vec::new(),
            no_connects: Vec::new(),
        }
    }

    fn build(&self) -> Netlist {
        let mut set = DisjointSet::new();

        for [start, end] in &self.wires {
            let a = set.make(start.key());
            let b = set.make(end.key());
            set.union(a, b);
        }
        log::debug!("{} wires joined into {} coordinates", self.wires.len(), set.len());

        let mut names: HashMap<usize, String> = HashMap::new();
        for (at, text) in &self.labels {
            let id = set.make(at.key());
            let root = set.find(id);
            if let Some(previous) = names.insert(root, text.clone()) {
                if previous != *text {
                    log::debug!("label {text} renames net {previous}");
                }
            }
        }

        let mut pins: HashMap<usize, Vec<NetPin>> = HashMap::new();
        for (index, placed) in self.symbols.iter().enumerate() {
            let reference = placed.symbol.reference().unwrap_or_default();
            for pin in placed.library.pins(placed.symbol.unit) {
                let id = set.make(pin_position(&placed.symbol, pin).key());
                let root = set.find(id);
                pins.entry(root).or_default().push(NetPin {
                    symbol: index,
                    instance: placed.symbol.uuid.clone(),
                    reference: reference.to_owned(),
                    number: pin.number.clone(),
                });
                if placed.library.is_power() {
                    if let Some(value) = placed.symbol.value() {
                        names.insert(root, value.to_owned());
                    }
                }
            }
        }

        // roots in order of their first coordinate
        let mut roots: Vec<usize> = Vec::new();
        let mut net_of_root: HashMap<usize, usize> = HashMap::new();
        let mut points: Vec<Vec<PointKey>> = Vec::new();
        for id in 0..set.len() {
            let root = set.find(id);
            let net = *net_of_root.entry(root).or_insert_with(|| {
                roots.push(root);
                points.push(Vec::new());
                roots.len() - 1
            });
            if let Some(key) = set.key(id) {
                points[net].push(key);
            }
        }

        let no_connects: HashSet<PointKey> = self.no_connects.iter().map(Point::key).collect();
        let mut counter = 0;
        let mut nets = Vec::with_capacity(roots.len());
        let mut by_point = HashMap::new();
        for (index, (root, points)) in roots.iter().zip(points).enumerate() {
            let identifier = match names.remove(root) {
                Some(name) => name,
                None if points.len() == 1 && no_connects.contains(&points[0]) => "NC".to_owned(),
                None => {
                    counter += 1;
                    counter.to_string()
                }
            };
            for key in &points {
                by_point.insert(*key, index);
            }
            nets.push(Net {
                identifier,
                points,
                pins: pins.remove(root).unwrap_or_default(),
            });
        }

        let graph = self.graph(&nets);
        log::debug!("{} nets, {} edges", nets.len(), graph.edges.len());
        Netlist {
            nets,
            by_point,
            no_connects: self.no_connects.clone(),
            graph,
        }
    }

    fn graph(&self, nets: &[Net]) -> Graph {
        let mut graph = Graph {
            nodes: nets
                .iter()
                .map(|net| Node::Net(net.identifier.clone()))
                .collect(),
            ..Default::default()
        };

        for placed in &self.symbols {
            graph
                .nodes
                .push(Node::Component(component_name(&placed.symbol, &placed.library)));
        }
        for (index, net) in nets.iter().enumerate() {
            for pin in &net.pins {
                graph.add_edge(Edge {
                    symbol: pin.symbol,
                    pin: pin.number.clone(),
                    component: nets.len() + pin.symbol,
                    net: index,
                });
            }
        }
        graph
    }
}

/// Reference of a placed symbol with a unit letter for multi-unit parts.
fn component_name(symbol: &Symbol, library: &LibrarySymbol) -> String {
    let reference = symbol.reference().unwrap_or_default();
    if library.unit_count() > 1 {
        let letter = char::from_u32('A' as u32 + symbol.unit.saturating_sub(1)).unwrap_or('?');
        format!("{reference}{letter}")
    } else {
        reference.to_owned()
    }
}

impl SchemaVisitor for NetlistBuilder<'_> {
    fn library_symbol(&mut self, symbol: &LibrarySymbol) -> Result<(), Error> {
        self.library.register(std::slice::from_ref(symbol));
        Ok(())
    }

    fn wire(&mut self, wire: &Wire) -> Result<(), Error> {
        self.wires.push(wire.pts);
        Ok(())
    }

    fn label(&mut self, label: &Label) -> Result<(), Error> {
        self.labels.push((label.at, label.text.clone()));
        Ok(())
    }

    fn global_label(&mut self, label: &GlobalLabel) -> Result<(), Error> {
        self.labels.push((label.at, label.text.clone()));
        Ok(())
    }

    fn no_connect(&mut self, no_connect: &NoConnect) -> Result<(), Error> {
        self.no_connects.push(no_connect.at);
        Ok(())
    }

    fn symbol(&mut self, symbol: &Symbol) -> Result<(), Error> {
        let library = self.library.get(&symbol.lib_id)?;
        self.symbols.push(PlacedSymbol {
            symbol: symbol.clone(),
            library,
        });
        Ok(())
    }
}
