// Localization documents
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

//! Localization documents.
//!
//! A localization document provides the strings substituted for
//!   `!(loc.Id)` references,
//!     and localized sizes and text of dialogs and controls,
//!   for a single culture.
//!
//! ```xml
//! <WixLocalization xmlns="http://wixtoolset.org/schemas/v4/wxl"
//!                  Culture="en-US" Codepage="1252">
//!   <String Id="Welcome" Value="Welcome" />
//!   <UI Dialog="WelcomeDlg" Control="Title" Width="200" />
//! </WixLocalization>
//! ```

use super::CompileError;
use crate::diagnose::{Aborted, Messaging, StageSink};
use crate::global::LOCALIZATION_NAMESPACE;
use crate::ir::{LocString, Localization, LocalizedControl};
use crate::span::{Context, Span};
use roxmltree::{Document, Node};

struct LocParser<'m> {
    sink: StageSink<'m>,
    source: Context,
}

impl<'m> LocParser<'m> {
    fn span(&self, node: Node) -> Span {
        let pos = node.document().text_pos_at(node.range().start);
        Span::new(self.source.clone(), pos.row)
    }

    fn check_attributes(&mut self, node: Node, known: &[&str]) {
        for attr in node.attributes() {
            if attr.namespace().is_none() && !known.contains(&attr.name()) {
                let span = self.span(node);
                self.sink.emit(&CompileError::UnexpectedAttribute {
                    span,
                    element: node.tag_name().name().into(),
                    attribute: attr.name().into(),
                });
            }
        }
    }

    fn required<'a>(
        &mut self,
        node: Node<'a, '_>,
        name: &'static str,
    ) -> Option<&'a str> {
        let value = node.attribute(name);

        if value.is_none() {
            let span = self.span(node);
            self.sink.emit(&CompileError::ExpectedAttribute {
                span,
                element: node.tag_name().name().into(),
                attribute: name,
            });
        }

        value
    }

    fn illegal(&mut self, node: Node, name: &str, expected: &str) {
        let span = self.span(node);
        self.sink.emit(&CompileError::IllegalAttributeValue {
            span,
            element: node.tag_name().name().into(),
            attribute: name.into(),
            value: node.attribute(name).unwrap_or_default().into(),
            expected: expected.into(),
        });
    }

    fn integer(&mut self, node: Node, name: &str) -> Option<i64> {
        let value = node.attribute(name)?;

        match value.trim().parse::<i64>() {
            Ok(n) if n >= 0 => Some(n),
            _ => {
                self.illegal(node, name, "a non-negative integer");
                None
            }
        }
    }

    fn root(&mut self, root: Node) -> Option<Localization> {
        let tag = root.tag_name();

        if tag.name() != "WixLocalization"
            || tag.namespace() != Some(LOCALIZATION_NAMESPACE)
        {
            let span = self.span(root);
            self.sink.emit(&CompileError::InvalidRoot {
                span,
                expected: "WixLocalization",
                found: tag.name().into(),
            });
            return None;
        }

        self.check_attributes(root, &["Culture", "Codepage", "Language"]);

        let codepage = match root.attribute("Codepage") {
            None => None,
            Some(cp) => match cp.trim().parse::<u32>() {
                Ok(cp) => Some(cp),
                Err(_) => {
                    self.illegal(root, "Codepage", "a numeric codepage");
                    None
                }
            },
        };

        let culture = match root.attribute("Culture") {
            None | Some("neutral") => "",
            Some(culture) => culture,
        };

        let mut loc = Localization::new(culture, codepage);

        for child in root.children().filter(Node::is_element) {
            let in_ns = child.tag_name().namespace() == Some(LOCALIZATION_NAMESPACE);

            match child.tag_name().name() {
                "String" if in_ns => self.string(&mut loc, child),
                "UI" if in_ns => self.control(&mut loc, child),
                _ => {
                    let span = self.span(child);
                    self.sink.emit(&CompileError::UnexpectedElement {
                        span,
                        parent: tag.name().into(),
                        element: child.tag_name().name().into(),
                    });
                }
            }
        }

        Some(loc)
    }

    fn string(&mut self, loc: &mut Localization, node: Node) {
        self.check_attributes(node, &["Id", "Value", "Overridable"]);

        let span = self.span(node);
        let id = self.required(node, "Id");
        let value = node.attribute("Value").or_else(|| node.text());

        let overridable = match node.attribute("Overridable") {
            None | Some("no") => false,
            Some("yes") => true,
            Some(_) => {
                self.illegal(node, "Overridable", "`yes` or `no`");
                false
            }
        };

        let Some(id) = id else {
            return;
        };

        let string = LocString {
            value: value.unwrap_or_default().into(),
            overridable,
            span: Some(span.clone()),
        };

        if let Err(first) = loc.add_string(id, string) {
            self.sink.emit(&CompileError::DuplicateLocalizedString {
                span,
                first: first.span,
                culture: loc.culture().into(),
                id: id.into(),
            });
        }
    }

    fn control(&mut self, loc: &mut Localization, node: Node) {
        self.check_attributes(
            node,
            &["Dialog", "Control", "X", "Y", "Width", "Height", "Text"],
        );

        let span = self.span(node);
        let Some(dialog) = self.required(node, "Dialog") else {
            return;
        };

        let key = Localization::control_key(dialog, node.attribute("Control"));

        let control = LocalizedControl {
            x: self.integer(node, "X"),
            y: self.integer(node, "Y"),
            width: self.integer(node, "Width"),
            height: self.integer(node, "Height"),
            text: node
                .attribute("Text")
                .or_else(|| node.text().filter(|t| !t.trim().is_empty()))
                .map(String::from),
            span: Some(span.clone()),
        };

        if loc.add_control(key.clone(), control).is_err() {
            self.sink.emit(&CompileError::DuplicateLocalizedControl {
                span,
                culture: loc.culture().into(),
                key,
            });
        }
    }
}

/// Parse the localization document `text` read from `path`.
pub fn parse_localization(
    path: &str,
    text: &str,
    messaging: &Messaging,
) -> Result<Localization, Aborted> {
    let mut sink = StageSink::new(messaging, "localize");

    let doc = match Document::parse(text) {
        Ok(doc) => doc,
        Err(e) => {
            sink.emit(&CompileError::XmlSyntax {
                span: Span::new(path, e.pos().row),
                reason: e.to_string(),
            });
            return Err(sink.abort());
        }
    };

    let mut parser = LocParser {
        sink,
        source: path.into(),
    };

    match parser.root(doc.root_element()) {
        Some(loc) => {
            tracing::debug!(
                path,
                culture = loc.culture(),
                strings = loc.strings().len(),
                "parsed localization"
            );
            parser.sink.finish(loc)
        }
        None => Err(parser.sink.abort()),
    }
}
