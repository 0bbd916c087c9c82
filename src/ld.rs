// Linker
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

//! The [linker][] combines compiled intermediates and libraries into a
//!   single intermediate describing the whole product,
//!     module,
//!     or bundle.
//!
//! Its user-facing binary is `wixld`.
//!
//! [linker]: https://en.wikipedia.org/wiki/Linker_(computing)
//!
//! Linking proceeds as follows:
//!
//!   1. Libraries contributed by extensions are collected first,
//!        followed by the libraries and intermediates given by the caller.
//!   2. Every symbol is indexed by `(table, id)`,
//!        reporting linkable symbols defined by more than one unit
//!        (see [`index`]).
//!   3. Every reference is looked up in that index,
//!        producing a graph of dependencies between sections.
//!   4. Sections reachable from any section that did not come from a
//!        library survive;
//!          all others are dropped.
//!      Only references of surviving sections must resolve.
//!   5. The surviving sections are merged into one section whose type is
//!        that of the single entry section,
//!          and group membership is expanded (see [`groups`]).
//!   6. Localizations are selected by culture (see [`culture`]).
//!
//! Like the compiler,
//!   the linker reports as many errors as it can before aborting.
//!
//! ```
//! use wixrs::diagnose::Messaging;
//! use wixrs::ext::ExtensionRegistry;
//! use wixrs::ir::{Intermediate, IntermediateLevel, SectionType};
//! use wixrs::ld::{LinkOptions, Linker};
//! use wixrs::schema::SchemaRegistry;
//!
//! let registry = SchemaRegistry::with_core();
//! let extensions = ExtensionRegistry::new();
//! let messaging = Messaging::default();
//!
//! let linker = Linker::new(&registry, &extensions, LinkOptions::default());
//! let linked = linker.link(vec![], vec![], &messaging).unwrap();
//!
//! assert_eq!(IntermediateLevel::Linked, linked.level());
//! assert_eq!(SectionType::Fragment, linked.sections()[0].ty());
//! ```

pub mod culture;
mod error;
pub mod groups;
pub mod index;


pub use culture::CultureFilter;
pub use error::LinkError;

use crate::diagnose::{Aborted, Messaging, StageSink};
use crate::ext::ExtensionRegistry;
use crate::ir::{
    Intermediate, IntermediateLevel, Localization, ReferenceKind, Section,
    SectionType,
};
use crate::schema::SchemaRegistry;
use fxhash::FxHashSet;
use index::SymbolIndex;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;

#[derive(Debug, Clone, Default)]
pub struct LinkOptions {
    /// Cultures whose localizations survive linking,
    ///   in order of preference.
    pub cultures: CultureFilter,
}

pub struct Linker<'a> {
    registry: &'a SchemaRegistry,
    extensions: &'a ExtensionRegistry,
    options: LinkOptions,
}

/// Everything gathered from the inputs before linking proper.
#[derive(Default)]
struct Collection {
    sections: Vec<Section>,
    library_units: FxHashSet<String>,
    localizations: Vec<Localization>,
}

/// Outcome of looking up the references of one section.
#[derive(Default)]
struct SectionRefs {
    unresolved: Vec<LinkError>,

    /// Whether each reference, in order, survives into the output.
    keep: Vec<bool>,
}

impl<'a> Linker<'a> {
    pub fn new(
        registry: &'a SchemaRegistry,
        extensions: &'a ExtensionRegistry,
        options: LinkOptions,
    ) -> Self {
        Self {
            registry,
            extensions,
            options,
        }
    }

    /// Link `intermediates` and `libraries` into one intermediate.
    ///
    /// A library may be provided in either list;
    ///   it is the level of each intermediate that determines how it is
    ///   treated.
    pub fn link(
        &self,
        intermediates: Vec<Intermediate>,
        libraries: Vec<Intermediate>,
        messaging: &Messaging,
    ) -> Result<Intermediate, Aborted> {
        let _span = tracing::info_span!("link").entered();

        let mut sink = StageSink::new(messaging, "link");
        let mut output = Intermediate::with_unique_id(IntermediateLevel::Linked);
        let mut collection = Collection::default();

        let units = self
            .extensions
            .libraries(self.registry)
            .into_iter()
            .chain(libraries)
            .chain(intermediates);

        for unit in units {
            Self::collect(unit, &mut collection, &mut output, &mut sink);
        }

        let Collection {
            mut sections,
            library_units,
            localizations,
        } = collection;

        for ext in self.extensions.linkers() {
            ext.pre_combine(&mut sections);
        }

        let index = SymbolIndex::build(&sections, &mut sink);
        let (graph, mut refs) = self.resolve_references(&sections, &index);

        let is_root = |section: &Section| {
            section
                .compilation_id()
                .map_or(true, |id| !library_units.contains(id))
        };

        let reachable = reachable_sections(&graph, &sections, is_root);

        for (si, section_refs) in refs.iter_mut().enumerate() {
            if reachable[si] {
                section_refs
                    .unresolved
                    .drain(..)
                    .for_each(|e| sink.emit(&e));
            }
        }

        let survivors = sections
            .into_iter()
            .zip(refs)
            .zip(reachable)
            .filter_map(|((section, refs), reachable)| {
                reachable.then_some((section, refs.keep))
            })
            .collect::<Vec<_>>();

        tracing::debug!(sections = survivors.len(), "reachable sections");

        let mut merged = merge_sections(survivors, &mut sink)
            .with_compilation_id(output.id());

        groups::flatten_groups(&mut merged, self.registry, &mut sink);
        output.push_section(merged);

        for loc in self.options.cultures.apply(localizations) {
            output.add_localization(loc);
        }

        for ext in self.extensions.linkers() {
            ext.post_combine(&mut output);
        }

        tracing::info!(
            symbols = output.symbols().count(),
            localizations = output.localizations().len(),
            "linked"
        );

        sink.finish(output)
    }

    fn collect(
        unit: Intermediate,
        collection: &mut Collection,
        output: &mut Intermediate,
        sink: &mut StageSink,
    ) {
        let is_library = match unit.level() {
            IntermediateLevel::Compiled => false,
            IntermediateLevel::Library => true,
            level => {
                sink.emit(&LinkError::InvalidIntermediateLevel {
                    id: unit.id().into(),
                    level,
                });
                return;
            }
        };

        tracing::debug!(id = unit.id(), is_library, "collecting");

        let unit_id = unit.id().to_string();

        for source in unit.sources() {
            output.add_source(source.as_str());
        }

        let (sections, localizations, embedded) = unit.into_parts();

        for section in sections {
            // Sections without a compilation id belong to their unit.
            let section = match section.compilation_id() {
                Some(_) => section,
                None => section.with_compilation_id(unit_id.as_str()),
            };

            if is_library {
                if let Some(id) = section.compilation_id() {
                    collection.library_units.insert(id.to_string());
                }
            }

            collection.sections.push(section);
        }

        collection.localizations.extend(localizations);
        embedded
            .into_iter()
            .for_each(|file| output.add_embedded_file(file));
    }

    /// Look up every reference of every section.
    ///
    /// Errors are held per section since only the references of sections
    ///   that survive must resolve.
    fn resolve_references(
        &self,
        sections: &[Section],
        index: &SymbolIndex,
    ) -> (DiGraph<(), ()>, Vec<SectionRefs>) {
        let mut graph = DiGraph::with_capacity(sections.len(), 0);
        let nodes = sections
            .iter()
            .map(|_| graph.add_node(()))
            .collect::<Vec<_>>();

        let mut refs = Vec::with_capacity(sections.len());

        for (si, section) in sections.iter().enumerate() {
            let mut section_refs = SectionRefs::default();

            for reference in section.references() {
                let found = index.lookup(si, &reference.target());

                if !found.is_empty() {
                    for loc in found.iter().filter(|loc| loc.section != si) {
                        graph.update_edge(nodes[si], nodes[loc.section], ());
                    }

                    section_refs.keep.push(true);
                    continue;
                }

                let droppable = reference.kind == ReferenceKind::Optional
                    && self
                        .registry
                        .get(&reference.table)
                        .is_some_and(|def| def.permits_optional_references());

                if droppable {
                    tracing::trace!(reference = %reference.target(), "dropping optional reference");
                } else {
                    section_refs.unresolved.push(LinkError::UnresolvedReference {
                        span: reference.span.clone(),
                        from: reference.from.clone(),
                        table: reference.table.clone(),
                        id: reference.id.clone(),
                    });
                }

                section_refs.keep.push(!droppable);
            }

            refs.push(section_refs);
        }

        (graph, refs)
    }
}

/// Sections reachable from those for which `is_root` holds.
fn reachable_sections<F: Fn(&Section) -> bool>(
    graph: &DiGraph<(), ()>,
    sections: &[Section],
    is_root: F,
) -> Vec<bool> {
    let mut reachable = vec![false; sections.len()];
    let mut dfs = Dfs::empty(graph);

    for (si, _) in sections.iter().enumerate().filter(|(_, s)| is_root(s)) {
        dfs.move_to(NodeIndex::new(si));

        while let Some(index) = dfs.next(graph) {
            reachable[index.index()] = true;
        }
    }

    reachable
}

/// Merge surviving sections into one,
///   entry section first.
///
/// Each section is paired with whether each of its references is kept.
fn merge_sections(
    mut survivors: Vec<(Section, Vec<bool>)>,
    sink: &mut StageSink,
) -> Section {
    let mut entry: Option<usize> = None;

    for (si, (section, _)) in survivors.iter().enumerate() {
        if !section.ty().is_entry() {
            continue;
        }

        match entry {
            None => entry = Some(si),
            Some(first) => {
                let first = &survivors[first].0;

                sink.emit(&LinkError::MultipleEntrySections {
                    span: first_span(section),
                    first_span: first_span(first),
                    first: describe_section(first),
                    second: describe_section(section),
                });
            }
        }
    }

    if let Some(si) = entry {
        let entry = survivors.remove(si);
        survivors.insert(0, entry);
    }

    let mut merged = match entry {
        Some(_) => {
            let head = &survivors[0].0;
            Section::new(head.ty(), head.id().map(String::from))
        }
        None => Section::new(SectionType::Fragment, None),
    };

    for (mut section, keep) in survivors {
        let mut keep = keep.into_iter();
        section.retain_references(|_| keep.next().unwrap_or(true));

        let (symbols, references) = section.into_parts();
        merged.extend_symbols(symbols);
        merged.extend_references(references);
    }

    merged
}

fn first_span(section: &Section) -> Option<crate::span::Span> {
    section.symbols().first().and_then(|sym| sym.span().cloned())
}

fn describe_section(section: &Section) -> String {
    match section.id() {
        Some(id) => format!("{} {id}", section.ty()),
        None => section.ty().to_string(),
    }
}
