//! Algebraic properties an operation can be given.
//!
//! Most of them are made up. Templates are written for the operation `.`;
//! a template that mentions `&` relates `.` to a partner operation that an
//! earlier level introduced, and the constants `I` and `Z` stand for a
//! fresh identity or zero term.
//!
//! Before adding a property, make sure it cannot rewrite forever, e.g.
//! `$x . $y => ($y . $x) . $x` or `$x . ($y . $z) => ($x . $y) . ($y . $x)`
//! keep creating classes until the generator gives up.

use crate::{
    parse::{parse_rewrite, ParseError},
    pattern::{Pattern, Rewrite},
    util::{IndexMap, IndexSet, Symbol},
};

pub const OPERATION_PLACEHOLDER: &str = ".";
pub const PARTNER_PLACEHOLDER: &str = "&";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    Idempotence,
    /// One side of the operation is thrown away, e.g. `$x . $y => $x`.
    Projection,
    Commutativity,
    Associativity,
    Identity,
    Zero,
    Distributivity,
    /// A nested expression collapses into a flat one.
    Collapse,
    Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Property {
    pub kind: PropertyKind,
    pub template: &'static str,
    /// Indices of the levels this property may be used at.
    pub levels: &'static [usize],
}

const fn property(kind: PropertyKind, template: &'static str, levels: &'static [usize]) -> Property {
    Property {
        kind,
        template,
        levels,
    }
}

use PropertyKind::*;

/// Every known property. The first level is meant to be introductory.
pub const PROPERTIES: &[Property] = &[
    property(Idempotence, "$x . $x => $x", &[0]),
    property(Projection, "$x . $y => $x", &[0]),
    property(Projection, "$x . $y => $y", &[0]),
    property(Projection, "$x . $y => $x . $x", &[0]),
    property(Projection, "$x . $y => $y . $y", &[0]),
    property(Commutativity, "$x . $y => $y . $x", &[0, 1]),
    property(Identity, "$x . I => $x", &[0, 1]),
    property(Zero, "$x . Z => Z", &[0, 1]),
    //
    property(Associativity, "($x . $y) . $z => $x . ($y . $z)", &[1]),
    property(Associativity, "$x . ($y . $z) => ($x . $y) . $z", &[1]),
    property(Associativity, "($x . $y) . $z => $z . ($y . $x)", &[1, 3]),
    property(Associativity, "$x . ($y . $z) => ($z . $y) . $x", &[1, 3]),
    property(Associativity, "($x . $y) . $z => $z . ($x . $y)", &[1, 3]),
    property(Associativity, "$x . ($y . $z) => ($y . $z) . $x", &[1, 3]),
    property(Associativity, "$x . ($y . $z) => ($z . $x) . $y", &[1, 3]),
    property(Associativity, "$x . ($y . $z) => ($x . $z) . $y", &[1, 3]),
    property(Associativity, "($x . $y) . $z => $y . ($z . $x)", &[1, 3]),
    property(Associativity, "($x . $y) . $z => $y . ($x . $z)", &[1, 3]),
    //
    property(Collapse, "($x . $y) . $z => $x . $y", &[2]),
    property(Collapse, "$x . ($y . $z) => $x . $y", &[2]),
    property(Collapse, "($x . $y) . $z => $y . $x", &[2]),
    property(Collapse, "$x . ($y . $z) => $y . $x", &[2]),
    property(Collapse, "($x . $y) . $z => $x . $z", &[2]),
    property(Collapse, "$x . ($y . $z) => $x . $z", &[2]),
    property(Collapse, "($x . $y) . $z => $z . $x", &[2]),
    property(Collapse, "$x . ($y . $z) => $z . $x", &[2]),
    property(Collapse, "($x . $y) . $z => $y . $z", &[2]),
    property(Collapse, "$x . ($y . $z) => $y . $z", &[2]),
    property(Collapse, "($x . $y) . $z => $z . $y", &[2]),
    property(Collapse, "$x . ($y . $z) => $z . $y", &[2]),
    property(Collapse, "($x . $y) . $z => $x . $x", &[2]),
    property(Collapse, "$x . ($y . $z) => $x . $x", &[2]),
    property(Collapse, "($x . $y) . $z => $y . $y", &[2]),
    property(Collapse, "$x . ($y . $z) => $y . $y", &[2]),
    property(Collapse, "($x . $y) . $z => $z . $z", &[2]),
    property(Collapse, "$x . ($y . $z) => $z . $z", &[2]),
    //
    property(Distributivity, "$x . ($y & $z) => ($x . $y) & ($x . $z)", &[2, 3]),
    property(Distributivity, "($x & $y) . $z => ($x . $z) & ($y . $z)", &[2, 3]),
    //
    property(Mixed, "($x . $y) . $z => ($x . $y) . ($y . $x)", &[2, 3]),
    property(Mixed, "$x . ($y . $z) => ($y . $z) . ($z . $y)", &[2, 3]),
    property(Mixed, "($x . $y) . $z => ($y . $x) . ($x . $y)", &[2, 3]),
    property(Mixed, "$x . ($y . $z) => ($z . $y) . ($y . $z)", &[2, 3]),
    property(Mixed, "($x . $y) . $z => ($x . $y) . ($x . $x)", &[2, 3]),
    property(Mixed, "$x . ($y . $z) => ($y . $z) . ($y . $y)", &[2, 3]),
    property(Mixed, "($x . $y) . $z => ($y . $x) . ($x . $x)", &[2, 3]),
    property(Mixed, "$x . ($y . $z) => ($z . $y) . ($y . $y)", &[2, 3]),
    property(Mixed, "($x . $y) . $z => ($x . $y) . ($y . $y)", &[2, 3]),
    property(Mixed, "$x . ($y . $z) => ($y . $z) . ($z . $z)", &[2, 3]),
    property(Mixed, "($x . $y) . $z => ($y . $x) . ($y . $y)", &[2, 3]),
    property(Mixed, "$x . ($y . $z) => ($z . $y) . ($z . $z)", &[2, 3]),
    property(Mixed, "($x . $y) . $z => ($x . $x) . ($x . $y)", &[2, 3]),
    property(Mixed, "$x . ($y . $z) => ($y . $y) . ($y . $z)", &[2, 3]),
    property(Mixed, "($x . $y) . $z => ($x . $x) . ($y . $x)", &[2, 3]),
    property(Mixed, "$x . ($y . $z) => ($y . $y) . ($z . $y)", &[2, 3]),
    property(Mixed, "($x . $y) . $z => ($y . $y) . ($x . $y)", &[2, 3]),
    property(Mixed, "$x . ($y . $z) => ($z . $z) . ($y . $z)", &[2, 3]),
    property(Mixed, "($x . $y) . $z => ($y . $y) . ($y . $x)", &[2, 3]),
    property(Mixed, "$x . ($y . $z) => ($z . $z) . ($z . $y)", &[2, 3]),
];

impl Property {
    pub fn is_eligible(&self, level: usize) -> bool {
        self.levels.contains(&level)
    }

    pub fn needs_partner(&self) -> bool {
        self.template.contains(PARTNER_PLACEHOLDER)
    }

    /// Parses the template as written, with placeholder symbols.
    pub fn parse(&self) -> Result<Rewrite, ParseError> {
        parse_rewrite(self.template, self.template)
    }

    /// The constant terms the template mentions, such as `I`.
    pub fn constants(&self) -> Result<IndexSet<Symbol>, ParseError> {
        let rule = self.parse()?;
        let mut constants = IndexSet::default();
        collect_constants(&rule.lhs, &mut constants);
        collect_constants(&rule.rhs, &mut constants);
        Ok(constants)
    }

    /// Makes the rewrite for a concrete operation. `renames` maps the
    /// template's constants (and, if needed, the partner placeholder) to
    /// their symbols in the egraph.
    pub fn instantiate(&self, operation: Symbol, renames: &IndexMap<Symbol, Symbol>) -> Result<Rewrite, ParseError> {
        let template = self.parse()?;
        let placeholder = Symbol::from(OPERATION_PLACEHOLDER);
        let rename = |symbol: Symbol| {
            if symbol == placeholder {
                operation
            } else {
                renames.get(&symbol).copied().unwrap_or(symbol)
            }
        };

        let lhs = template.lhs.map_symbols(&rename);
        let rhs = template.rhs.map_symbols(&rename);
        let name = format!("{lhs} => {rhs}");
        Ok(Rewrite::new(name, lhs, rhs))
    }
}

fn collect_constants(pattern: &Pattern, out: &mut IndexSet<Symbol>) {
    if let Pattern::Term(symbol, children) = pattern {
        if children.is_empty() {
            out.insert(*symbol);
        }
        for child in children {
            collect_constants(child, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_template_parses() {
        for property in PROPERTIES {
            let rule = property.parse().unwrap();
            assert!(!rule.lhs.children().is_empty(), "{}", property.template);
            assert!(!property.levels.is_empty());
        }
    }

    #[test]
    fn every_level_has_a_property() {
        for level in 0..4 {
            assert!(PROPERTIES.iter().any(|p| p.is_eligible(level) && !p.needs_partner()));
        }
        assert!(PROPERTIES
            .iter()
            .filter(|p| p.needs_partner())
            .all(|p| !p.is_eligible(0)));
    }

    #[test]
    fn instantiates_placeholders() {
        let identity = PROPERTIES.iter().find(|p| p.kind == Identity).unwrap();
        let constants = identity.constants().unwrap();
        assert_eq!(constants.len(), 1);

        let renames: IndexMap<Symbol, Symbol> = [(Symbol::from("I"), Symbol::from("e"))].into_iter().collect();
        let rule = identity.instantiate("~>".into(), &renames).unwrap();
        assert_eq!(rule.to_string(), "$x ~> e => $x");

        let distributivity = PROPERTIES.iter().find(|p| p.kind == Distributivity).unwrap();
        assert!(distributivity.needs_partner());
        assert!(distributivity.constants().unwrap().is_empty());
        let renames: IndexMap<Symbol, Symbol> = [(Symbol::from("&"), Symbol::from("."))].into_iter().collect();
        let rule = distributivity.instantiate("&".into(), &renames).unwrap();
        assert_eq!(rule.to_string(), "$x & ($y . $z) => ($x & $y) . ($x & $z)");
    }
}
