// Group flattening
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

//! Expansion of group membership into feature/component rows.
//!
//! The compiler records membership of a component in a feature or
//!   component group as a `WixGroup` row,
//!     and membership of a component group in a feature the same way.
//! Once all sections are merged,
//!   these rows form a graph from which every component reachable from a
//!   feature yields one `FeatureComponents` row.
//!
//! Groups may not contain themselves,
//!   directly or transitively.

use super::LinkError;
use crate::diagnose::StageSink;
use crate::ir::{Identifier, Section, Symbol};
use crate::schema::{tables, SchemaRegistry};
use crate::span::Span;
use fxhash::{FxHashMap, FxHashSet};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;

type GroupKey = (String, String);

struct GroupGraph {
    graph: DiGraph<GroupKey, ()>,
    nodes: FxHashMap<GroupKey, NodeIndex>,

    /// Span of the first row naming each node as a child,
    ///   or as a parent if it is never a child.
    spans: FxHashMap<NodeIndex, Option<Span>>,
}

impl GroupGraph {
    fn from_section(section: &Section) -> Self {
        let mut gg = Self {
            graph: DiGraph::new(),
            nodes: FxHashMap::default(),
            spans: FxHashMap::default(),
        };

        let rows = section
            .symbols()
            .iter()
            .filter(|sym| sym.table() == tables::GROUP);

        for row in rows {
            let text = |name| {
                row.field_named(name)
                    .and_then(|value| value.as_str())
                    .unwrap_or_default()
                    .to_string()
            };

            let parent = gg.node((text("ParentType"), text("ParentId")));
            let child = gg.node((text("ChildType"), text("ChildId")));

            gg.spans.entry(parent).or_insert_with(|| row.span().cloned());
            gg.spans.insert(child, row.span().cloned());
            gg.graph.update_edge(parent, child, ());
        }

        gg
    }

    fn node(&mut self, key: GroupKey) -> NodeIndex {
        match self.nodes.get(&key) {
            Some(index) => *index,
            None => {
                let index = self.graph.add_node(key.clone());
                self.nodes.insert(key, index);
                index
            }
        }
    }

    fn describe(&self, index: NodeIndex) -> String {
        let (ty, id) = &self.graph[index];
        format!("{ty}:{id}")
    }

    /// Report every group that contains itself.
    ///
    /// Returns whether any such loop was found.
    fn check_cycles(&self, sink: &mut StageSink) -> bool {
        let mut found = false;

        for scc in petgraph::algo::tarjan_scc(&self.graph) {
            if scc.len() == 1 && !self.graph.contains_edge(scc[0], scc[0]) {
                continue;
            }

            // Components are emitted in reverse topological order.
            let mut cycle = scc
                .iter()
                .rev()
                .map(|index| self.describe(*index))
                .collect::<Vec<_>>();
            cycle.push(cycle[0].clone());

            sink.emit(&LinkError::ReferenceLoop {
                span: self.spans.get(&scc[0]).cloned().flatten(),
                cycle,
            });

            found = true;
        }

        found
    }
}

/// Add a `FeatureComponents` row for each component reachable from each
///   feature through group membership.
pub fn flatten_groups(
    section: &mut Section,
    registry: &SchemaRegistry,
    sink: &mut StageSink,
) {
    let gg = GroupGraph::from_section(section);

    if gg.graph.node_count() == 0 || gg.check_cycles(sink) {
        return;
    }

    let def = registry
        .get(tables::FEATURE_COMPONENTS)
        .expect("internal error: missing core FeatureComponents definition")
        .clone();

    let mut existing = section
        .symbols()
        .iter()
        .filter(|sym| sym.table() == tables::FEATURE_COMPONENTS)
        .map(|sym| sym.id_str().to_string())
        .collect::<FxHashSet<_>>();

    let mut rows = Vec::new();

    for feature in gg.graph.node_indices() {
        let (ty, feature_id) = &gg.graph[feature];

        if ty != tables::FEATURE {
            continue;
        }

        let mut dfs = Dfs::new(&gg.graph, feature);

        while let Some(index) = dfs.next(&gg.graph) {
            let (ty, component_id) = &gg.graph[index];

            if ty != tables::COMPONENT {
                continue;
            }

            let id = format!("{feature_id}/{component_id}");

            if !existing.insert(id.clone()) {
                continue;
            }

            let span = gg.spans.get(&index).cloned().flatten();
            let mut row = Symbol::new(def.clone(), Identifier::private(id), span);
            row.set_named("Feature_", feature_id.as_str());
            row.set_named("Component_", component_id.as_str());

            rows.push(row);
        }
    }

    tracing::debug!(rows = rows.len(), "flattened feature groups");

    section.extend_symbols(rows);
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::diagnose::{MessageCode, Messaging};
    use crate::ir::SectionType;

    fn member(
        registry: &SchemaRegistry,
        section: &mut Section,
        parent: (&str, &str),
        child: (&str, &str),
    ) {
        let id = format!("{}/{}/{}/{}", parent.0, parent.1, child.0, child.1);
        let mut row = Symbol::new(
            registry.get(tables::GROUP).unwrap().clone(),
            Identifier::private(id),
            Some(Span::new("groups.wxs", 1)),
        );
        row.set_named("ParentType", parent.0);
        row.set_named("ParentId", parent.1);
        row.set_named("ChildType", child.0);
        row.set_named("ChildId", child.1);
        section.push_symbol(row);
    }

    fn feature_components(section: &Section) -> Vec<&str> {
        section
            .symbols()
            .iter()
            .filter(|sym| sym.table() == tables::FEATURE_COMPONENTS)
            .map(|sym| sym.id_str())
            .collect()
    }

    #[test]
    fn components_reached_through_nested_groups() {
        let registry = SchemaRegistry::with_core();
        let messaging = Messaging::default();
        let mut sink = StageSink::new(&messaging, "link");
        let mut section = Section::new(SectionType::Product, None);

        use tables::{COMPONENT as C, COMPONENT_GROUP as G, FEATURE as F};

        member(&registry, &mut section, (F, "Main"), (C, "Direct"));
        member(&registry, &mut section, (F, "Main"), (G, "Outer"));
        member(&registry, &mut section, (G, "Outer"), (G, "Inner"));
        member(&registry, &mut section, (G, "Inner"), (C, "Deep"));
        member(&registry, &mut section, (G, "Unused"), (C, "Orphan"));

        flatten_groups(&mut section, &registry, &mut sink);

        let mut found = feature_components(&section);
        found.sort();

        assert_eq!(0, sink.errors());
        assert_eq!(vec!["Main/Deep", "Main/Direct"], found);
    }

    #[test]
    fn group_loops_are_reported() {
        let registry = SchemaRegistry::with_core();
        let messaging = Messaging::default();
        let mut sink = StageSink::new(&messaging, "link");
        let mut section = Section::new(SectionType::Product, None);

        use tables::{COMPONENT_GROUP as G, FEATURE as F};

        member(&registry, &mut section, (F, "Main"), (G, "A"));
        member(&registry, &mut section, (G, "A"), (G, "B"));
        member(&registry, &mut section, (G, "B"), (G, "A"));

        flatten_groups(&mut section, &registry, &mut sink);

        assert_eq!(1, sink.errors());
        assert_eq!(Some(MessageCode(86)), messaging.last_error_code());
        assert!(feature_components(&section).is_empty());

        let text = messaging.messages()[0].text().to_string();
        assert!(text.contains("WixComponentGroup:A"), "{text}");
        assert!(text.contains("WixComponentGroup:B"), "{text}");
    }

    #[test]
    fn self_containing_group() {
        let registry = SchemaRegistry::with_core();
        let messaging = Messaging::default();
        let mut sink = StageSink::new(&messaging, "link");
        let mut section = Section::new(SectionType::Product, None);

        use tables::COMPONENT_GROUP as G;

        member(&registry, &mut section, (G, "A"), (G, "A"));

        flatten_groups(&mut section, &registry, &mut sink);

        assert_eq!(Some(MessageCode(86)), messaging.last_error_code());
    }
}
