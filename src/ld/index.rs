// Link-time symbol index
//
//  Copyright (C) 2024 wixrs contributors.
//
//  This file is part of wixrs.
//
//  This program is free software: you can redistribute it and/or modify
//  it under the terms of the GNU General Public License as published by
//  the Free Software Foundation, either version 3 of the License, or
//  (at your option) any later version.
//
//  This program is distributed in the hope that it will be useful,
//  but WITHOUT ANY WARRANTY; without even the implied warranty of
//  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//  GNU General Public License for more details.
//
//  You should have received a copy of the GNU General Public License
//  along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Lookup of symbols by `(table, id)` across all collected sections.
//!
//! Linkable symbols (public and global) share one namespace;
//!   private symbols are visible only to their own section and shadow
//!   linkable symbols of the same key there.

use super::LinkError;
use crate::diagnose::StageSink;
use crate::ir::{Section, SymbolKey};
use fxhash::FxHashMap;
use std::collections::hash_map::Entry;

/// Position of a symbol among the collected sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolLoc {
    pub section: usize,
    pub symbol: usize,
}

/// The unit from which a section originated.
///
/// Sections of one compilation are one unit;
///   a section with no compilation id is a unit of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin<'a> {
    Unit(&'a str),
    Section(usize),
}

impl<'a> Origin<'a> {
    fn of(sections: &'a [Section], index: usize) -> Self {
        match sections[index].compilation_id() {
            Some(id) => Self::Unit(id),
            None => Self::Section(index),
        }
    }
}

#[derive(Debug, Default)]
pub struct SymbolIndex {
    linkable: FxHashMap<SymbolKey, Vec<SymbolLoc>>,
    private: FxHashMap<(usize, SymbolKey), SymbolLoc>,
}

impl SymbolIndex {
    /// Index every symbol of `sections`.
    ///
    /// A linkable symbol defined by more than one unit is reported as a
    ///   duplicate unless its definition permits duplicates.
    /// Duplicates within a single unit were already reported by the
    ///   compiler and are ignored here;
    ///     the first definition wins.
    pub fn build(sections: &[Section], sink: &mut StageSink) -> Self {
        let mut index = Self::default();

        for (si, section) in sections.iter().enumerate() {
            for (yi, sym) in section.symbols().iter().enumerate() {
                let loc = SymbolLoc {
                    section: si,
                    symbol: yi,
                };

                if !sym.access().is_linkable() {
                    index.private.entry((si, sym.key())).or_insert(loc);
                    continue;
                }

                match index.linkable.entry(sym.key()) {
                    Entry::Vacant(e) => {
                        e.insert(vec![loc]);
                    }
                    Entry::Occupied(mut e) if sym.definition().allows_duplicates() => {
                        e.get_mut().push(loc);
                    }
                    Entry::Occupied(e) => {
                        let first = e.get()[0];

                        if Origin::of(sections, first.section) != Origin::of(sections, si) {
                            let first_sym = &sections[first.section].symbols()[first.symbol];

                            sink.emit(&LinkError::DuplicateSymbol {
                                span: sym.span().cloned(),
                                first: first_sym.span().cloned(),
                                table: sym.table().into(),
                                id: sym.id_str().into(),
                            });
                        }
                    }
                }
            }
        }

        index
    }

    /// Symbols matching `key` as seen from the section `from`.
    pub fn lookup(&self, from: usize, key: &SymbolKey) -> &[SymbolLoc] {
        if let Some(loc) = self.private.get(&(from, key.clone())) {
            return std::slice::from_ref(loc);
        }

        self.linkable.get(key).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::diagnose::{MessageCode, Messaging};
    use crate::ir::{Identifier, SectionType, Symbol};
    use crate::schema::SchemaRegistry;

    fn section(registry: &SchemaRegistry, unit: &str, ids: &[Identifier]) -> Section {
        let mut section = Section::new(SectionType::Fragment, None).with_compilation_id(unit);

        for id in ids {
            section.push_symbol(Symbol::new(
                registry.get("Property").unwrap().clone(),
                id.clone(),
                None,
            ));
        }

        section
    }

    #[test]
    fn private_symbols_are_scoped_to_section() {
        let registry = SchemaRegistry::with_core();
        let messaging = Messaging::default();
        let mut sink = StageSink::new(&messaging, "link");

        let sections = [
            section(&registry, "a", &[Identifier::private("P")]),
            section(&registry, "b", &[Identifier::public("P")]),
        ];

        let sut = SymbolIndex::build(&sections, &mut sink);
        let key = SymbolKey::new("Property", "P");

        assert_eq!(0, sink.errors());
        assert_eq!(&[SymbolLoc { section: 0, symbol: 0 }], sut.lookup(0, &key));
        assert_eq!(&[SymbolLoc { section: 1, symbol: 0 }], sut.lookup(2, &key));
    }

    #[test]
    fn duplicates_within_a_unit_are_not_link_errors() {
        let registry = SchemaRegistry::with_core();
        let messaging = Messaging::default();
        let mut sink = StageSink::new(&messaging, "link");

        let sections = [
            section(&registry, "a", &[Identifier::public("P")]),
            section(&registry, "a", &[Identifier::public("P")]),
            section(&registry, "b", &[Identifier::public("P")]),
        ];

        let sut = SymbolIndex::build(&sections, &mut sink);

        assert_eq!(1, sink.errors());
        assert_eq!(Some(MessageCode(91)), messaging.last_error_code());
        assert_eq!(1, sut.lookup(0, &SymbolKey::new("Property", "P")).len());
    }
}
