use std::fmt::Display;

use crate::error::ParseError;

mod lexer;
mod parser;
pub mod writer;

pub use writer::to_kicad_string;

/// A node of the s-expression tree.
///
/// Lists always start with a bare label. Quoted strings keep their raw
/// content, without the quotes and without decoding escapes.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum SExpr<'a> {
    SExpr(&'a str, Box<[SExpr<'a>]>),
    Atom(&'a str),
    String(&'a str),
}

impl<'a> Display for SExpr<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SExpr::SExpr(label, children) => {
                write!(f, "({}", label)?;
                for child in children.iter() {
                    write!(f, " {}", child)?;
                }
                write!(f, ")")
            }
            SExpr::Atom(s) => write!(f, "{}", s),
            SExpr::String(s) => write!(f, "\"{}\"", s),
        }
    }
}

impl<'a> SExpr<'a> {
    /// The label of a list, `None` for atoms
    pub fn label(&self) -> Option<&'a str> {
        match self {
            SExpr::SExpr(label, _) => Some(label),
            _ => None,
        }
    }

    /// The text of an atom or quoted string
    pub fn text(&self) -> Option<&'a str> {
        match self {
            SExpr::Atom(s) | SExpr::String(s) => Some(s),
            SExpr::SExpr(_, _) => None,
        }
    }

    pub fn items(&self) -> &[SExpr<'a>] {
        match self {
            SExpr::SExpr(_, children) => &children[..],
            _ => &[],
        }
    }

    /// First atom of the child list called `label`
    pub fn value(&self, label: &str) -> Result<&'a str, ParseError> {
        self.child(label)?.atom(0)
    }

    /// The `index`th atom (or string) among the direct children
    pub fn atom(&self, index: usize) -> Result<&'a str, ParseError> {
        self.atoms().nth(index).ok_or(ParseError::MissingValue())
    }

    pub fn atoms(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.items().iter().filter_map(|child| child.text())
    }

    pub fn lists(&self) -> impl Iterator<Item = &SExpr<'a>> {
        self.items()
            .iter()
            .filter(|child| matches!(child, SExpr::SExpr(_, _)))
    }

    /// True when a bare atom such as `hide` is a direct child
    pub fn has_atom(&self, token: &str) -> bool {
        self.items()
            .iter()
            .any(|child| matches!(child, SExpr::Atom(s) if *s == token))
    }

    pub fn children<'b, 'c>(&'b self, label: &'c str) -> LabeledChildIterator<'a, 'b, 'c> {
        let iter = match self {
            SExpr::SExpr(_, children) => Some(children.iter()),
            _ => None,
        };
        LabeledChildIterator { iter, label }
    }

    pub fn child<'b>(&self, label: &'b str) -> Result<&SExpr<'a>, ParseError> {
        let mut iter = self.children(label);
        iter.next()
            .ok_or(ParseError::MissingChild(label.to_owned()))
    }

    pub fn has_child(&self, label: &str) -> bool {
        self.children(label).next().is_some()
    }
}

#[derive(Debug)]
pub struct LabeledChildIterator<'a, 'b, 'c> {
    iter: Option<std::slice::Iter<'b, SExpr<'a>>>,
    label: &'c str,
}

impl<'a, 'b, 'c> Iterator for LabeledChildIterator<'a, 'b, 'c> {
    type Item = &'b SExpr<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let iter = self.iter.as_mut()?;
        loop {
            let item = iter.next();
            match &item {
                None => return None,
                Some(SExpr::SExpr(label, _)) => {
                    if *label == self.label {
                        return item;
                    }
                }
                Some(_) => continue,
            }
        }
    }
}

impl<'a> TryFrom<&'a String> for SExpr<'a> {
    type Error = ParseError;

    fn try_from(input: &'a String) -> Result<Self, Self::Error> {
        SExpr::try_from(input.as_str())
    }
}
