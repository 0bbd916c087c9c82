// Compilation context
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

use super::{CompileError, ContextValues, Platform, Platforms};
use crate::diagnose::{Diagnostic, StageSink};
use crate::ext::{ExtensionRegistry, ParseOutcome};
use crate::global::SOURCE_NAMESPACE;
use crate::ir::{
    create_identifier, is_legal_identifier, Identifier, Intermediate,
    Reference, ReferenceKind, Section, SectionType, Symbol, SymbolKey,
};
use crate::schema::SchemaRegistry;
use crate::span::{Context, Span};
use fxhash::FxHashMap;
use roxmltree::Node;
use uuid::Uuid;

/// State of the compilation of a single source document.
///
/// This is also the interface through which
///   [`CompilerExtension`](crate::ext::CompilerExtension)s contribute
///   symbols and references.
pub struct CompileContext<'c> {
    registry: &'c SchemaRegistry,
    extensions: &'c ExtensionRegistry,
    sink: StageSink<'c>,
    intermediate: Intermediate,
    section: Option<usize>,
    compilation_id: String,
    platform: Platform,
    source: Context,
    defined: FxHashMap<SymbolKey, Option<Span>>,
}

impl<'c> CompileContext<'c> {
    pub(super) fn new(
        registry: &'c SchemaRegistry,
        extensions: &'c ExtensionRegistry,
        sink: StageSink<'c>,
        intermediate: Intermediate,
        platform: Platform,
        source: &str,
    ) -> Self {
        Self {
            registry,
            extensions,
            sink,
            intermediate,
            section: None,
            compilation_id: Uuid::new_v4().simple().to_string(),
            platform,
            source: source.into(),
            defined: Default::default(),
        }
    }

    pub(super) fn finish(mut self) -> (Intermediate, StageSink<'c>) {
        self.end_section();
        (self.intermediate, self.sink)
    }

    pub fn registry(&self) -> &'c SchemaRegistry {
        self.registry
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn intermediate_mut(&mut self) -> &mut Intermediate {
        &mut self.intermediate
    }

    /// Location of `node` in the source document.
    pub fn span(&self, node: Node) -> Span {
        let pos = node.document().text_pos_at(node.range().start);
        Span::new(self.source.clone(), pos.row)
    }

    pub fn emit<D: Diagnostic>(&mut self, diagnostic: D) {
        self.sink.emit(&diagnostic)
    }

    pub fn has_errors(&self) -> bool {
        self.sink.has_errors()
    }

    /// Begin a new section,
    ///   ending the current one.
    pub fn begin_section(&mut self, ty: SectionType, id: Option<String>) {
        self.end_section();

        self.intermediate.push_section(
            Section::new(ty, id).with_compilation_id(&self.compilation_id),
        );
        self.section = Some(self.intermediate.sections().len() - 1);
    }

    pub fn end_section(&mut self) {
        self.section = None;
    }

    /// Section currently receiving symbols.
    ///
    /// Core elements that produce symbols only appear within a section;
    ///   extensions must not produce symbols outside of one.
    pub fn section_mut(&mut self) -> &mut Section {
        let index = self.section.unwrap_or_else(|| {
            panic!("internal error: symbol produced outside of a section")
        });

        &mut self.intermediate.sections_mut()[index]
    }

    /// Add a symbol to the current section.
    ///
    /// A symbol whose `(table, id)` was already defined in this document
    ///   is reported as a duplicate unless its table permits duplicates.
    pub fn add_symbol(
        &mut self,
        table: &str,
        id: Identifier,
        span: Option<Span>,
    ) -> &mut Symbol {
        let def = self
            .registry
            .get(table)
            .unwrap_or_else(|| {
                panic!("internal error: no definition for table `{table}`")
            })
            .clone();

        if !def.allows_duplicates() {
            let key = SymbolKey::new(table, id.to_string());

            if let Some(first) = self.defined.get(&key).cloned() {
                self.emit(CompileError::DuplicateSymbol {
                    span: span.clone(),
                    first,
                    table: key.table,
                    id: key.id,
                });
            } else {
                self.defined.insert(key, span.clone());
            }
        }

        self.section_mut().push_symbol(Symbol::new(def, id, span))
    }

    /// Add a row of a table without an identifier column,
    ///   identified privately by its key fields.
    pub fn add_row<S: AsRef<str>>(
        &mut self,
        table: &str,
        keys: &[S],
        span: Option<Span>,
    ) -> &mut Symbol {
        let id = keys.iter().map(AsRef::as_ref).collect::<Vec<_>>().join("/");
        self.add_symbol(table, Identifier::private(id), span)
    }

    pub fn add_reference(&mut self, reference: Reference) {
        self.section_mut().push_reference(reference)
    }

    /// Reference that must resolve at link time but carries no data.
    pub fn add_simple_reference(
        &mut self,
        table: &str,
        id: &str,
        from: Option<SymbolKey>,
        span: Option<Span>,
    ) {
        let mut reference =
            Reference::new(table, id, ReferenceKind::Simple).at(span);
        reference.from = from;

        self.add_reference(reference)
    }

    /// Reference to the variant of the custom action `name` built for the
    ///   platform being compiled for.
    ///
    /// If that platform is not among `platforms`,
    ///   an error is reported and no reference is added.
    pub fn add_custom_action_reference(
        &mut self,
        name: &str,
        platforms: Platforms,
        span: Span,
    ) {
        let platform = self.platform;

        if !platforms.contains(platform) {
            self.emit(CompileError::UnsupportedPlatform {
                span,
                action: name.into(),
                platform: platform.as_str(),
            });
            return;
        }

        let id = format!("{name}_{}", platform.action_suffix());
        self.add_simple_reference("CustomAction", &id, None, Some(span));
    }

    /// Stable identifier generated from `args`.
    pub fn create_identifier(&self, prefix: &str, args: &[&str]) -> String {
        create_identifier(prefix, args)
    }

    /// Report attributes of `node` that are neither in `known` nor handled
    ///   by an extension.
    pub fn check_attributes(
        &mut self,
        node: Node,
        known: &[&str],
        values: &ContextValues,
    ) {
        let extensions = self.extensions;

        for attr in node.attributes() {
            match attr.namespace() {
                None | Some(SOURCE_NAMESPACE) => {
                    if !known.contains(&attr.name()) {
                        let span = self.span(node);
                        self.emit(CompileError::UnexpectedAttribute {
                            span,
                            element: element_name(node).into(),
                            attribute: attr.name().into(),
                        });
                    }
                }

                Some(ns) => {
                    let handled =
                        extensions.compilers_for(ns).any(|ext| {
                            ext.parse_attribute(self, node, attr.clone(), values)
                                != ParseOutcome::NotHandled
                        });

                    if !handled {
                        let span = self.span(node);
                        self.emit(CompileError::UnhandledExtensionAttribute {
                            span,
                            namespace: ns.into(),
                            element: element_name(node).into(),
                            attribute: attr.name().into(),
                        });
                    }
                }
            }
        }
    }

    /// Process each child element of `node`.
    ///
    /// Core elements are offered to `core`,
    ///   which returns `false` for elements not permitted beneath `node`;
    ///     elements of other namespaces are dispatched to extensions.
    pub fn each_child<'a, 'i, F>(
        &mut self,
        node: Node<'a, 'i>,
        values: &ContextValues,
        mut core: F,
    ) where
        F: FnMut(&mut Self, Node<'a, 'i>, &str) -> bool,
    {
        for child in node.children().filter(Node::is_element) {
            match child.tag_name().namespace() {
                Some(SOURCE_NAMESPACE) => {
                    if !core(self, child, child.tag_name().name()) {
                        self.unexpected_element(node, child);
                    }
                }
                Some(ns) => self.dispatch_element(ns, node, child, values),
                None => self.unexpected_element(node, child),
            }
        }
    }

    /// Offer an element to the extensions handling its namespace.
    pub fn dispatch_element(
        &mut self,
        namespace: &str,
        parent: Node,
        element: Node,
        values: &ContextValues,
    ) {
        let extensions = self.extensions;

        let handled = extensions.compilers_for(namespace).any(|ext| {
            ext.parse_element(self, parent, element, values)
                != ParseOutcome::NotHandled
        });

        if !handled {
            let span = self.span(element);
            self.emit(CompileError::UnhandledExtensionElement {
                span,
                namespace: namespace.into(),
                element: element_name(element).into(),
            });
        }
    }

    /// Offer a possible key path element to the extensions handling its
    ///   namespace.
    pub(super) fn dispatch_key_path_element(
        &mut self,
        namespace: &str,
        parent: Node,
        element: Node,
        values: &ContextValues,
    ) -> Option<super::ComponentKeyPath> {
        let extensions = self.extensions;

        for ext in extensions.compilers_for(namespace) {
            if let ParseOutcome::Handled(keypath) = ext
                .parse_possible_key_path_element(self, parent, element, values)
            {
                return keypath;
            }
        }

        let span = self.span(element);
        self.emit(CompileError::UnhandledExtensionElement {
            span,
            namespace: namespace.into(),
            element: element_name(element).into(),
        });

        None
    }

    pub fn unexpected_element(&mut self, parent: Node, element: Node) {
        let span = self.span(element);
        self.emit(CompileError::UnexpectedElement {
            span,
            parent: element_name(parent).into(),
            element: element_name(element).into(),
        });
    }

    /// Value of a required attribute,
    ///   reporting its absence.
    pub fn required_attr<'a>(
        &mut self,
        node: Node<'a, '_>,
        name: &'static str,
    ) -> Option<&'a str> {
        let value = node.attribute(name);

        if value.is_none() {
            let span = self.span(node);
            self.emit(CompileError::ExpectedAttribute {
                span,
                element: element_name(node).into(),
                attribute: name,
            });
        }

        value
    }

    /// Value of an attribute that must be a legal identifier.
    ///
    /// An illegal identifier is reported but still returned so that
    ///   compilation can continue.
    pub fn identifier_attr<'a>(
        &mut self,
        node: Node<'a, '_>,
        name: &str,
    ) -> Option<&'a str> {
        let value = node.attribute(name)?;

        if !is_legal_identifier(value) {
            let span = self.span(node);
            self.emit(CompileError::IllegalIdentifier {
                span,
                element: element_name(node).into(),
                attribute: name.into(),
                value: value.into(),
            });
        }

        Some(value)
    }

    pub fn required_identifier_attr<'a>(
        &mut self,
        node: Node<'a, '_>,
        name: &'static str,
    ) -> Option<&'a str> {
        self.required_attr(node, name)?;
        self.identifier_attr(node, name)
    }

    /// Value of a `yes`/`no` attribute.
    pub fn yes_no_attr(&mut self, node: Node, name: &str) -> Option<bool> {
        match node.attribute(name)? {
            "yes" => Some(true),
            "no" => Some(false),
            other => {
                self.illegal_value(node, name, other, "`yes` or `no`");
                None
            }
        }
    }

    /// Value of an integer attribute within `min..=max`.
    pub fn integer_attr(
        &mut self,
        node: Node,
        name: &str,
        min: i64,
        max: i64,
    ) -> Option<i64> {
        let value = node.attribute(name)?;

        match value.trim().parse::<i64>() {
            Ok(n) if (min..=max).contains(&n) => Some(n),
            _ => {
                let expected = format!("an integer from {min} to {max}");
                self.illegal_value(node, name, value, &expected);
                None
            }
        }
    }

    /// Value of an attribute restricted to one of `allowed`.
    pub fn enum_attr<'a>(
        &mut self,
        node: Node<'a, '_>,
        name: &str,
        allowed: &[&str],
    ) -> Option<&'a str> {
        let value = node.attribute(name)?;

        if allowed.contains(&value) {
            Some(value)
        } else {
            let expected = format!("one of {}", allowed.join(", "));
            self.illegal_value(node, name, value, &expected);
            None
        }
    }

    /// Value of a GUID attribute,
    ///   normalized to upper case within braces.
    ///
    /// If `generatable`,
    ///   `*` is returned as [`GuidValue::Generate`].
    pub fn guid_attr(
        &mut self,
        node: Node,
        name: &str,
        generatable: bool,
    ) -> Option<GuidValue> {
        let value = node.attribute(name)?;

        if value == "*" && generatable {
            return Some(GuidValue::Generate);
        }

        if value.is_empty() {
            return Some(GuidValue::Empty);
        }

        match Uuid::parse_str(value.trim_matches(|c| c == '{' || c == '}')) {
            Ok(uuid) => Some(GuidValue::Literal(format!(
                "{{{}}}",
                uuid.hyphenated().to_string().to_uppercase()
            ))),
            Err(_) => {
                let expected = if generatable {
                    "a GUID or `*`"
                } else {
                    "a GUID"
                };
                self.illegal_value(node, name, value, expected);
                None
            }
        }
    }

    pub fn illegal_value(
        &mut self,
        node: Node,
        name: &str,
        value: &str,
        expected: &str,
    ) {
        let span = self.span(node);
        self.emit(CompileError::IllegalAttributeValue {
            span,
            element: element_name(node).into(),
            attribute: name.into(),
            value: value.into(),
            expected: expected.into(),
        });
    }

    /// Report that none of `attributes` was provided.
    pub fn expected_one_of(
        &mut self,
        node: Node,
        attributes: Vec<&'static str>,
    ) {
        let span = self.span(node);
        self.emit(CompileError::ExpectedOneOf {
            span,
            element: element_name(node).into(),
            attributes,
        });
    }
}

/// Parsed value of a GUID attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuidValue {
    /// `*`: generate a stable GUID at bind time.
    Generate,

    /// The empty string.
    Empty,

    Literal(String),
}

pub(super) fn element_name<'a>(node: Node<'a, '_>) -> &'a str {
    node.tag_name().name()
}
