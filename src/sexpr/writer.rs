//! Writes an [`SExpr`] tree the way KiCad 6 lays out its schematic and
//! symbol library files.
//!
//! KiCad puts some child lists on a line of their own and keeps others
//! inline with their parent, depending on the parent and where it sits in
//! the document. The decision table lives in [`breaks_before`]. Atoms and
//! quoted strings are written exactly as they were read, so numbers keep
//! their original spelling.

use super::SExpr;

const INDENT: &str = "  ";

/// Serializes `sexpr` in KiCad's file layout, with a trailing newline.
pub fn to_kicad_string(sexpr: &SExpr) -> String {
    let mut out = String::new();
    let mut ancestors = Vec::new();
    write_node(&mut out, sexpr, 0, &mut ancestors);
    out.push('\n');
    out
}

fn write_node<'a>(out: &mut String, node: &SExpr<'a>, depth: usize, ancestors: &mut Vec<&'a str>) {
    match node {
        SExpr::Atom(s) => out.push_str(s),
        SExpr::String(s) => {
            out.push('"');
            out.push_str(s);
            out.push('"');
        }
        SExpr::SExpr(label, children) => {
            out.push('(');
            out.push_str(label);
            let mut broken = false;
            for child in children.iter() {
                let on_new_line = child
                    .label()
                    .is_some_and(|child_label| breaks_before(ancestors, node, child_label));
                if on_new_line {
                    newline(out, depth + 1);
                    broken = true;
                } else {
                    out.push(' ');
                }
                ancestors.push(label);
                write_node(out, child, depth + 1, ancestors);
                ancestors.pop();
            }
            if broken {
                newline(out, depth);
            }
            out.push(')');
        }
    }
}

fn newline(out: &mut String, depth: usize) {
    out.push('\n');
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

fn in_library(ancestors: &[&str]) -> bool {
    ancestors
        .iter()
        .any(|label| matches!(*label, "lib_symbols" | "kicad_symbol_lib"))
}

/// Whether the child list `child` of `node` starts on a new line.
fn breaks_before(ancestors: &[&str], node: &SExpr, child: &str) -> bool {
    let parent = ancestors.last().copied().unwrap_or_default();
    match node.label().unwrap_or_default() {
        "kicad_sch" | "kicad_symbol_lib" => !matches!(child, "version" | "generator"),
        "lib_symbols" | "title_block" | "sheet_instances" | "symbol_instances" => true,
        // placed symbol on the sheet
        "symbol" if node.has_child("lib_id") => {
            matches!(child, "in_bom" | "uuid" | "property" | "pin")
        }
        // unit of a library symbol
        "symbol" if parent == "symbol" => true,
        "symbol" => matches!(child, "property" | "symbol"),
        "path" => parent == "symbol_instances" && child == "reference",
        "property" | "label" | "global_label" | "hierarchical_label" | "text" => {
            matches!(child, "effects" | "uuid" | "property")
        }
        "pin" if parent == "sheet" => matches!(child, "effects" | "uuid"),
        "pin" => matches!(child, "name" | "number"),
        "polyline" | "pts" if in_library(ancestors) => true,
        "wire" | "bus" | "bus_entry" | "polyline" => matches!(child, "stroke" | "uuid"),
        "junction" => child == "uuid",
        "rectangle" | "circle" | "arc" => matches!(child, "stroke" | "fill" | "uuid"),
        "sheet" => !matches!(child, "at" | "size" | "fields_autoplaced"),
        _ => false,
    }
}
