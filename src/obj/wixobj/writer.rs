// wixobj writer
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

use super::{tag, Result};
use crate::global::{INTERMEDIATE_NAMESPACE, INTERMEDIATE_VERSION};
use crate::ir::{
    Deferred, FieldValue, Intermediate, Localization, Reference, Section,
    Symbol,
};
use crate::schema::SymbolDefinition;
use crate::span::{Context, Span};
use base64::{engine::general_purpose::STANDARD, Engine};
use fxhash::FxHashMap;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer as XmlWriter;
use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;

/// Write `intermediate` to `dest`.
pub fn write<W: Write>(intermediate: &Intermediate, dest: W) -> Result {
    WixobjWriter::new(dest).write(intermediate)?;
    Ok(())
}

/// Table of source files referenced by spans,
///   in order of first appearance.
#[derive(Debug, Default)]
struct FileTable {
    files: Vec<Context>,
    index: FxHashMap<Context, usize>,
}

impl FileTable {
    fn collect(intermediate: &Intermediate) -> Self {
        let mut table = Self::default();

        for section in intermediate.sections() {
            for symbol in section.symbols() {
                table.add(symbol.span());
            }

            for reference in section.references() {
                table.add(reference.span.as_ref());
            }
        }

        for loc in intermediate.localizations() {
            loc.strings().values().for_each(|s| table.add(s.span.as_ref()));
            loc.controls().values().for_each(|c| table.add(c.span.as_ref()));
        }

        table
    }

    fn add(&mut self, span: Option<&Span>) {
        if let Some(span) = span {
            let ctx = span.context();

            if !self.index.contains_key(ctx) {
                self.index.insert(ctx.clone(), self.files.len());
                self.files.push(ctx.clone());
            }
        }
    }

    /// Compact representation of `span` for a `loc` attribute.
    fn loc(&self, span: &Span) -> String {
        // Every span was collected before writing began.
        let index = self.index[span.context()];
        format!("{index}:{}", span.line())
    }
}

/// Responsible for writing `wixobj` files.
pub struct WixobjWriter<W: Write> {
    writer: XmlWriter<W>,
    files: FileTable,
}

impl<W: Write> WixobjWriter<W> {
    pub fn new(write: W) -> Self {
        Self {
            writer: XmlWriter::new_with_indent(write, b' ', 2),
            files: FileTable::default(),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    /// Write a complete object file.
    pub fn write(&mut self, intermediate: &Intermediate) -> Result<&mut Self> {
        self.files = FileTable::collect(intermediate);

        self.writer.write_event(Event::Decl(BytesDecl::new(
            "1.0",
            Some("utf-8"),
            None,
        )))?;

        let version = INTERMEDIATE_VERSION.to_string();

        self.write_element(
            "wixObject",
            &[
                ("version", version.as_str()),
                ("xmlns", INTERMEDIATE_NAMESPACE),
                ("id", intermediate.id()),
                ("level", intermediate.level().as_str()),
            ],
            |writer| {
                writer
                    .write_definitions(intermediate)?
                    .write_sources(intermediate)?
                    .write_files()?;

                for section in intermediate.sections() {
                    writer.write_section(section)?;
                }

                for loc in intermediate.localizations() {
                    writer.write_localization(loc)?;
                }

                writer.write_embedded(intermediate)
            },
        )?;

        self.writer.get_mut().flush()?;

        Ok(self)
    }

    /// Write an element with children produced by `callback`.
    fn write_element<F>(
        &mut self,
        name: &str,
        attrs: &[(&str, &str)],
        callback: F,
    ) -> Result<&mut Self>
    where
        F: FnOnce(&mut Self) -> Result<&mut Self>,
    {
        let mut start = BytesStart::new(name);
        start.extend_attributes(attrs.iter().copied());

        self.writer.write_event(Event::Start(start))?;
        (callback)(self)?;
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;

        Ok(self)
    }

    /// Write an element containing only text,
    ///   or an empty element if `text` is empty.
    fn write_text_element(
        &mut self,
        name: &str,
        attrs: &[(&str, &str)],
        text: &str,
    ) -> Result<&mut Self> {
        let mut start = BytesStart::new(name);
        start.extend_attributes(attrs.iter().copied());

        if text.is_empty() {
            self.writer.write_event(Event::Empty(start))?;
        } else {
            self.writer.write_event(Event::Start(start))?;
            self.writer.write_event(Event::Text(BytesText::new(text)))?;
            self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        }

        Ok(self)
    }

    fn write_empty(
        &mut self,
        name: &str,
        attrs: &[(&str, &str)],
    ) -> Result<&mut Self> {
        self.write_text_element(name, attrs, "")
    }

    fn write_definitions(
        &mut self,
        intermediate: &Intermediate,
    ) -> Result<&mut Self> {
        let defs = intermediate
            .symbols()
            .map(|sym| (sym.table(), sym.definition()))
            .collect::<BTreeMap<&str, &Arc<SymbolDefinition>>>();

        self.write_element("definitions", &[], |writer| {
            for def in defs.values() {
                let version = def.version().to_string();
                let fields = def.fields().len().to_string();

                let mut attrs = vec![
                    ("name", def.name()),
                    ("version", version.as_str()),
                    ("fields", fields.as_str()),
                ];
                attrs.extend(def.extension().map(|ext| ("extension", ext)));

                writer.write_empty("definition", &attrs)?;
            }

            Ok(writer)
        })
    }

    fn write_sources(
        &mut self,
        intermediate: &Intermediate,
    ) -> Result<&mut Self> {
        self.write_element("sources", &[], |writer| {
            for source in intermediate.sources() {
                writer.write_empty("source", &[("path", source.as_str())])?;
            }

            Ok(writer)
        })
    }

    fn write_files(&mut self) -> Result<&mut Self> {
        let files = std::mem::take(&mut self.files.files);

        let result = self.write_element("files", &[], |writer| {
            for file in &files {
                writer.write_empty("file", &[("path", file.as_str())])?;
            }

            Ok(writer)
        })
        .map(|_| ());

        self.files.files = files;
        result.map(|_| self)
    }

    fn write_section(&mut self, section: &Section) -> Result<&mut Self> {
        let mut attrs = vec![("type", section.ty().as_str())];
        attrs.extend(section.id().map(|id| ("id", id)));
        attrs.extend(section.compilation_id().map(|id| ("compilationId", id)));

        self.write_element("section", &attrs, |writer| {
            for symbol in section.symbols() {
                writer.write_symbol(symbol)?;
            }

            for reference in section.references() {
                writer.write_reference(reference)?;
            }

            Ok(writer)
        })
    }

    fn write_symbol(&mut self, symbol: &Symbol) -> Result<&mut Self> {
        let loc = symbol.span().map(|span| self.files.loc(span));

        let mut attrs = vec![
            ("table", symbol.table()),
            ("access", symbol.access().as_str()),
        ];
        attrs.extend(symbol.id().id().map(|id| ("id", id)));
        attrs.extend(loc.as_deref().map(|loc| ("loc", loc)));

        self.write_element("symbol", &attrs, |writer| {
            for value in symbol.fields() {
                writer.write_field(value)?;
            }

            Ok(writer)
        })
    }

    fn write_field(&mut self, value: &FieldValue) -> Result<&mut Self> {
        match value {
            FieldValue::Null => self.write_empty("f", &[]),
            FieldValue::Str(s) => {
                self.write_text_element("f", &[("t", tag::STR)], s)
            }
            FieldValue::Number(n) => self.write_text_element(
                "f",
                &[("t", tag::NUM)],
                &n.to_string(),
            ),
            FieldValue::Deferred(Deferred::Template(s)) => {
                self.write_text_element("f", &[("t", tag::TEMPLATE)], s)
            }
            FieldValue::Deferred(Deferred::SourcePath(s)) => {
                self.write_text_element("f", &[("t", tag::PATH)], s)
            }
            FieldValue::Deferred(Deferred::EmbeddedFile { uri, index }) => self
                .write_empty(
                    "f",
                    &[
                        ("t", tag::EMBED),
                        ("uri", uri.as_str()),
                        ("index", index.to_string().as_str()),
                    ],
                ),
            FieldValue::Deferred(Deferred::GeneratedId { prefix, args }) => self
                .write_element(
                    "f",
                    &[("t", tag::GENERATED_ID), ("prefix", prefix.as_str())],
                    |writer| writer.write_args(args),
                ),
            FieldValue::Deferred(Deferred::Guid { args }) => self
                .write_element("f", &[("t", tag::GUID)], |writer| {
                    writer.write_args(args)
                }),
        }
    }

    fn write_args(&mut self, args: &[String]) -> Result<&mut Self> {
        for arg in args {
            self.write_text_element("a", &[], arg)?;
        }

        Ok(self)
    }

    fn write_reference(&mut self, reference: &Reference) -> Result<&mut Self> {
        let loc = reference.span.as_ref().map(|span| self.files.loc(span));

        let mut attrs = vec![
            ("table", reference.table.as_str()),
            ("id", reference.id.as_str()),
            ("kind", reference.kind.as_str()),
        ];

        if let Some(from) = &reference.from {
            attrs.push(("fromTable", from.table.as_str()));
            attrs.push(("fromId", from.id.as_str()));
        }

        attrs.extend(loc.as_deref().map(|loc| ("loc", loc)));

        self.write_empty("ref", &attrs)
    }

    fn write_localization(&mut self, loc: &Localization) -> Result<&mut Self> {
        let codepage = loc.codepage().map(|c| c.to_string());

        let mut attrs = vec![("culture", loc.culture())];
        attrs.extend(codepage.as_deref().map(|c| ("codepage", c)));

        self.write_element("localization", &attrs, |writer| {
            for (id, string) in loc.strings() {
                let span = string.span.as_ref().map(|s| writer.files.loc(s));

                let mut attrs = vec![
                    ("id", id.as_str()),
                    ("overridable", yes_no(string.overridable)),
                ];
                attrs.extend(span.as_deref().map(|loc| ("loc", loc)));

                writer.write_text_element("string", &attrs, &string.value)?;
            }

            for (key, control) in loc.controls() {
                let span = control.span.as_ref().map(|s| writer.files.loc(s));
                let dims = [
                    ("x", control.x),
                    ("y", control.y),
                    ("width", control.width),
                    ("height", control.height),
                ]
                .map(|(name, value)| (name, value.map(|n| n.to_string())));

                let mut attrs = vec![("key", key.as_str())];
                attrs.extend(dims.iter().filter_map(|(name, value)| {
                    value.as_deref().map(|v| (*name, v))
                }));
                attrs.extend(control.text.as_deref().map(|t| ("text", t)));
                attrs.extend(span.as_deref().map(|loc| ("loc", loc)));

                writer.write_empty("control", &attrs)?;
            }

            Ok(writer)
        })
    }

    fn write_embedded(
        &mut self,
        intermediate: &Intermediate,
    ) -> Result<&mut Self> {
        for file in intermediate.embedded_files() {
            let index = file.index.to_string();

            self.write_text_element(
                "embedded",
                &[
                    ("uri", file.uri.as_str()),
                    ("index", index.as_str()),
                    ("name", file.name.as_str()),
                ],
                &STANDARD.encode(&file.data),
            )?;
        }

        Ok(self)
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
