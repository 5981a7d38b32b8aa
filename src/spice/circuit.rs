//! SPICE circuit elements and the deck they are written to.

use std::fmt::{self, Display};
use std::path::PathBuf;

/// One element card: reference, nodes in pin order and value or model
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub reference: String,
    pub nodes: Vec<String>,
    pub value: String,
}

impl Card {
    pub fn new(reference: impl Into<String>, nodes: Vec<String>, value: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            nodes,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CircuitElement {
    Resistor(Card),
    Capacitor(Card),
    Diode(Card),
    Bjt(Card),
    Subcircuit(Card),
    VoltageSource(Card),
}

impl CircuitElement {
    /// The SPICE letter that starts the card name.
    pub fn letter(&self) -> char {
        match self {
            CircuitElement::Resistor(_) => 'R',
            CircuitElement::Capacitor(_) => 'C',
            CircuitElement::Diode(_) => 'D',
            CircuitElement::Bjt(_) => 'Q',
            CircuitElement::Subcircuit(_) => 'X',
            CircuitElement::VoltageSource(_) => 'V',
        }
    }

    pub fn card(&self) -> &Card {
        match self {
            CircuitElement::Resistor(card)
            | CircuitElement::Capacitor(card)
            | CircuitElement::Diode(card)
            | CircuitElement::Bjt(card)
            | CircuitElement::Subcircuit(card)
            | CircuitElement::VoltageSource(card) => card,
        }
    }

    /// The reference, prefixed with the element letter when it does not
    /// start with it already.
    pub fn name(&self) -> String {
        let reference = &self.card().reference;
        let letter = self.letter();
        if reference
            .chars()
            .next()
            .is_some_and(|c| c.eq_ignore_ascii_case(&letter))
        {
            reference.clone()
        } else {
            format!("{letter}{reference}")
        }
    }
}

impl Display for CircuitElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let card = self.card();
        write!(f, "{}", self.name())?;
        for node in &card.nodes {
            write!(f, " {node}")?;
        }
        write!(f, " {}", card.value)
    }
}

/// A `.subckt` block
#[derive(Debug, Clone, PartialEq)]
pub struct SubCircuit {
    pub name: String,
    pub nodes: Vec<String>,
    pub elements: Vec<CircuitElement>,
}

impl Display for SubCircuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ".subckt {}", self.name)?;
        for node in &self.nodes {
            write!(f, " {node}")?;
        }
        writeln!(f)?;
        for element in &self.elements {
            writeln!(f, "{element}")?;
        }
        write!(f, ".ends {}", self.name)
    }
}

/// A SPICE deck
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Circuit {
    pub title: String,
    pub includes: Vec<PathBuf>,
    pub subcircuits: Vec<SubCircuit>,
    pub elements: Vec<CircuitElement>,
}

impl Circuit {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn include(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !self.includes.contains(&path) {
            self.includes.push(path);
        }
    }

    pub fn push(&mut self, element: CircuitElement) {
        self.elements.push(element);
    }

    /// Moves all element cards into a subcircuit called `name` with the
    /// given nets as ports.
    pub fn into_subcircuit(mut self, name: impl Into<String>, ports: Vec<String>) -> Circuit {
        let elements = std::mem::take(&mut self.elements);
        self.subcircuits.push(SubCircuit {
            name: name.into(),
            nodes: ports,
            elements,
        });
        self
    }
}

impl Display for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, ".title {}", self.title)?;
        for include in &self.includes {
            writeln!(f, ".include {}", include.display())?;
        }
        for subcircuit in &self.subcircuits {
            writeln!(f, "{subcircuit}")?;
        }
        for element in &self.elements {
            writeln!(f, "{element}")?;
        }
        writeln!(f, ".end")
    }
}
