// wixobj reader
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
use crate::global::{INTERMEDIATE_VERSION, MIN_INTERMEDIATE_VERSION};
use crate::ir::{
    AccessModifier, Deferred, EmbeddedFile, FieldValue, Identifier,
    Intermediate, IntermediateError, IntermediateLevel, LocString,
    Localization, LocalizedControl, Reference, ReferenceKind, Section,
    SectionType, Symbol, SymbolKey,
};
use crate::schema::{SchemaRegistry, SymbolDefinition};
use crate::span::{Context, Span};
use base64::{engine::general_purpose::STANDARD, Engine};
use fxhash::FxHashMap;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader as XmlReader;
use std::str::FromStr;
use std::sync::Arc;

/// Read an intermediate from the text of an object file.
pub fn read(src: &str, registry: &SchemaRegistry) -> Result<Intermediate> {
    WixobjReader::new(src, registry).read()
}

/// A structural node of an object file.
///
/// Whitespace between elements,
///   comments,
///   and processing instructions are not structural.
enum Node<'a> {
    Start(BytesStart<'a>),
    Empty(BytesStart<'a>),
    End,
    Eof,
}

fn corrupt<S: Into<String>>(reason: S) -> IntermediateError {
    IntermediateError::corrupt(reason)
}

fn unexpected<S: Into<String>>(reason: S) -> IntermediateError {
    IntermediateError::unexpected_format(reason)
}

fn name_of(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

/// Look up an attribute value.
fn attr(e: &BytesStart, name: &str) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(|e| corrupt(e.to_string()))?;

        if attr.key.as_ref() == name.as_bytes() {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }

    Ok(None)
}

fn required(e: &BytesStart, name: &str) -> Result<String> {
    attr(e, name)?.ok_or_else(|| {
        corrupt(format!(
            "element `{}` is missing attribute `{name}`",
            name_of(e)
        ))
    })
}

fn parse_attr<T: FromStr>(e: &BytesStart, name: &str) -> Result<Option<T>> {
    attr(e, name)?
        .map(|value| {
            value.parse().map_err(|_| {
                corrupt(format!(
                    "invalid value `{value}` for attribute `{name}` of `{}`",
                    name_of(e)
                ))
            })
        })
        .transpose()
}

fn parse_required<T: FromStr>(e: &BytesStart, name: &str) -> Result<T> {
    parse_attr(e, name)?.ok_or_else(|| {
        corrupt(format!(
            "element `{}` is missing attribute `{name}`",
            name_of(e)
        ))
    })
}

/// Reader of `wixobj` files.
///
/// See the [parent module](super) for the checks performed and the
///   errors produced.
pub struct WixobjReader<'a, 'r> {
    reader: XmlReader<&'a [u8]>,
    registry: &'r SchemaRegistry,

    /// Definitions declared by the file's header.
    definitions: FxHashMap<String, Arc<SymbolDefinition>>,

    /// Source file table,
    ///   indexed by `loc` attributes.
    files: Vec<Context>,
}

impl<'a, 'r> WixobjReader<'a, 'r> {
    pub fn new(src: &'a str, registry: &'r SchemaRegistry) -> Self {
        let mut reader = XmlReader::from_str(src);
        reader.trim_text(false);

        Self {
            reader,
            registry,
            definitions: FxHashMap::default(),
            files: Vec::new(),
        }
    }

    /// Read the entire object file.
    pub fn read(mut self) -> Result<Intermediate> {
        let root = match self.next_node()? {
            Node::Start(e) if e.name().as_ref() == b"wixObject" => e,
            Node::Empty(e) | Node::Start(e) => {
                return Err(unexpected(format!(
                    "expected root element `wixObject`, found `{}`",
                    name_of(&e)
                )))
            }
            Node::End | Node::Eof => {
                return Err(corrupt("missing root element"))
            }
        };

        // The version must be checked before anything else is interpreted.
        self.check_version(&root)?;

        let id = required(&root, "id")?;
        let level = attr(&root, "level")?
            .ok_or_else(|| corrupt("missing intermediate level"))?;
        let level = IntermediateLevel::from_str(&level).map_err(|level| {
            unexpected(format!("unknown intermediate level `{level}`"))
        })?;

        let mut intermediate = Intermediate::new(id, level);

        self.read_header()?;

        loop {
            match self.next_node()? {
                Node::Start(e) => match e.name().as_ref() {
                    b"sources" => self.read_sources(&mut intermediate)?,
                    b"files" => self.read_files()?,
                    b"section" => {
                        let section = self.read_section(&e)?;
                        intermediate.push_section(section);
                    }
                    b"localization" => {
                        let loc = self.read_localization(&e)?;
                        intermediate.add_localization(loc);
                    }
                    b"embedded" => {
                        let file = self.read_embedded(&e)?;
                        intermediate.add_embedded_file(file);
                    }
                    _ => return Err(Self::unexpected_element(&e)),
                },
                Node::Empty(e) => match e.name().as_ref() {
                    b"sources" | b"files" => (),
                    b"section" => {
                        intermediate.push_section(Self::section_header(&e)?);
                    }
                    b"localization" => {
                        intermediate.add_localization(Self::localization_header(&e)?);
                    }
                    b"embedded" => {
                        let file = self.embedded_file(&e, String::new())?;
                        intermediate.add_embedded_file(file);
                    }
                    _ => return Err(Self::unexpected_element(&e)),
                },
                Node::End => break,
                Node::Eof => return Err(corrupt("unexpected end of file")),
            }
        }

        match self.next_node()? {
            Node::Eof => Ok(intermediate),
            _ => Err(corrupt("unexpected content after root element")),
        }
    }

    fn check_version(&self, root: &BytesStart) -> Result<()> {
        let version = attr(root, "version")?
            .ok_or_else(|| unexpected("missing format version"))?;

        let version: u32 = version.parse().map_err(|_| {
            unexpected(format!("unrecognized format version `{version}`"))
        })?;

        if version > INTERMEDIATE_VERSION {
            Err(unexpected(format!(
                "format version {version} is newer than the supported \
                   version {INTERMEDIATE_VERSION}"
            )))
        } else if version < MIN_INTERMEDIATE_VERSION {
            Err(unexpected(format!(
                "format version {version} is older than the oldest \
                   supported version {MIN_INTERMEDIATE_VERSION}; \
                   the file must be rebuilt"
            )))
        } else {
            Ok(())
        }
    }

    fn unexpected_element(e: &BytesStart) -> IntermediateError {
        corrupt(format!("unexpected element `{}`", name_of(e)))
    }

    /// Produce the next structural node.
    fn next_node(&mut self) -> Result<Node<'a>> {
        loop {
            match self.reader.read_event()? {
                Event::Start(e) => return Ok(Node::Start(e)),
                Event::Empty(e) => return Ok(Node::Empty(e)),
                Event::End(_) => return Ok(Node::End),
                Event::Eof => return Ok(Node::Eof),
                Event::Text(t) if t.iter().all(u8::is_ascii_whitespace) => (),
                Event::Text(_) | Event::CData(_) => {
                    return Err(corrupt("unexpected text"))
                }
                Event::Decl(_)
                | Event::Comment(_)
                | Event::PI(_)
                | Event::DocType(_) => (),
            }
        }
    }

    /// Read the `definitions` header,
    ///   which must be the first child of the root.
    fn read_header(&mut self) -> Result<()> {
        match self.next_node()? {
            Node::Start(e) if e.name().as_ref() == b"definitions" => {
                self.read_definitions()
            }
            Node::Empty(e) if e.name().as_ref() == b"definitions" => Ok(()),
            _ => Err(corrupt("missing `definitions` header")),
        }
    }

    /// Read text content up to the end of the current element.
    fn read_text(&mut self) -> Result<String> {
        let mut text = String::new();

        loop {
            match self.reader.read_event()? {
                Event::Text(t) => text.push_str(&t.unescape()?),
                Event::CData(c) => text.push_str(
                    std::str::from_utf8(&c)
                        .map_err(|e| corrupt(e.to_string()))?,
                ),
                Event::Comment(_) => (),
                Event::End(_) => return Ok(text),
                Event::Eof => return Err(corrupt("unexpected end of file")),
                _ => return Err(corrupt("unexpected markup within text")),
            }
        }
    }

    fn read_definitions(&mut self) -> Result<()> {
        loop {
            match self.next_node()? {
                Node::Empty(e) if e.name().as_ref() == b"definition" => {
                    self.check_definition(&e)?
                }
                Node::End => return Ok(()),
                Node::Start(e) | Node::Empty(e) => {
                    return Err(Self::unexpected_element(&e))
                }
                Node::Eof => return Err(corrupt("unexpected end of file")),
            }
        }
    }

    /// Verify that a definition used by the file is compatible with the
    ///   registry.
    fn check_definition(&mut self, e: &BytesStart) -> Result<()> {
        let name = required(e, "name")?;
        let version: u32 = parse_required(e, "version")?;
        let fields: usize = parse_required(e, "fields")?;

        let def = self.registry.get(&name).ok_or_else(|| {
            let ext = attr(e, "extension").ok().flatten();

            unexpected(match ext {
                Some(ext) => format!(
                    "definition `{name}` of extension `{ext}` is unknown; \
                       is the extension missing?"
                ),
                None => format!("definition `{name}` is unknown"),
            })
        })?;

        if version > def.version() {
            return Err(unexpected(format!(
                "definition `{name}` version {version} is newer than the \
                   known version {}",
                def.version()
            )));
        }

        if fields != def.fields().len() {
            return Err(unexpected(format!(
                "definition `{name}` has {fields} field(s) but the known \
                   definition has {}",
                def.fields().len()
            )));
        }

        self.definitions.insert(name, def.clone());
        Ok(())
    }

    fn read_sources(&mut self, intermediate: &mut Intermediate) -> Result<()> {
        loop {
            match self.next_node()? {
                Node::Empty(e) if e.name().as_ref() == b"source" => {
                    intermediate.add_source(required(&e, "path")?)
                }
                Node::End => return Ok(()),
                Node::Start(e) | Node::Empty(e) => {
                    return Err(Self::unexpected_element(&e))
                }
                Node::Eof => return Err(corrupt("unexpected end of file")),
            }
        }
    }

    fn read_files(&mut self) -> Result<()> {
        loop {
            match self.next_node()? {
                Node::Empty(e) if e.name().as_ref() == b"file" => {
                    self.files.push(required(&e, "path")?.into())
                }
                Node::End => return Ok(()),
                Node::Start(e) | Node::Empty(e) => {
                    return Err(Self::unexpected_element(&e))
                }
                Node::Eof => return Err(corrupt("unexpected end of file")),
            }
        }
    }

    /// Decode a `loc` attribute into a span.
    fn span(&self, e: &BytesStart) -> Result<Option<Span>> {
        let Some(loc) = attr(e, "loc")? else {
            return Ok(None);
        };

        let (index, line) = loc
            .split_once(':')
            .and_then(|(i, l)| Some((i.parse::<usize>().ok()?, l.parse().ok()?)))
            .ok_or_else(|| corrupt(format!("invalid location `{loc}`")))?;

        let ctx = self.files.get(index).ok_or_else(|| {
            corrupt(format!("location `{loc}` references an unknown file"))
        })?;

        Ok(Some(Span::new(ctx.clone(), line)))
    }

    fn section_header(e: &BytesStart) -> Result<Section> {
        let ty = required(e, "type")?;
        let ty = SectionType::from_str(&ty)
            .map_err(|ty| corrupt(format!("unknown section type `{ty}`")))?;

        let section = Section::new(ty, attr(e, "id")?);

        Ok(match attr(e, "compilationId")? {
            Some(id) => section.with_compilation_id(id),
            None => section,
        })
    }

    fn read_section(&mut self, e: &BytesStart) -> Result<Section> {
        let mut section = Self::section_header(e)?;

        loop {
            match self.next_node()? {
                Node::Start(e) if e.name().as_ref() == b"symbol" => {
                    let symbol = self.read_symbol(&e, false)?;
                    section.push_symbol(symbol);
                }
                Node::Empty(e) if e.name().as_ref() == b"symbol" => {
                    let symbol = self.read_symbol(&e, true)?;
                    section.push_symbol(symbol);
                }
                Node::Empty(e) if e.name().as_ref() == b"ref" => {
                    section.push_reference(self.reference(&e)?);
                }
                Node::End => return Ok(section),
                Node::Start(e) | Node::Empty(e) => {
                    return Err(Self::unexpected_element(&e))
                }
                Node::Eof => return Err(corrupt("unexpected end of file")),
            }
        }
    }

    fn read_symbol(&mut self, e: &BytesStart, empty: bool) -> Result<Symbol> {
        let table = required(e, "table")?;

        // Only definitions declared in the header may be used;
        //   this is what allows compatibility to be checked up front.
        let def = self.definitions.get(&table).cloned().ok_or_else(|| {
            corrupt(format!(
                "symbol of table `{table}` has no definition in header"
            ))
        })?;

        let access = match attr(e, "access")? {
            Some(access) => AccessModifier::from_str(&access).map_err(|a| {
                corrupt(format!("unknown access modifier `{a}`"))
            })?,
            None => AccessModifier::default(),
        };

        let id = match attr(e, "id")? {
            Some(id) => Identifier::new(access, id),
            None => Identifier::INVALID,
        };

        let span = self.span(e)?;

        let mut fields = Vec::with_capacity(def.fields().len());
        if !empty {
            loop {
                match self.next_node()? {
                    Node::Start(f) if f.name().as_ref() == b"f" => {
                        fields.push(self.read_field(&f, false)?)
                    }
                    Node::Empty(f) if f.name().as_ref() == b"f" => {
                        fields.push(self.read_field(&f, true)?)
                    }
                    Node::End => break,
                    Node::Start(e) | Node::Empty(e) => {
                        return Err(Self::unexpected_element(&e))
                    }
                    Node::Eof => {
                        return Err(corrupt("unexpected end of file"))
                    }
                }
            }
        }

        Symbol::with_fields(def, id, span, fields).map_err(|fields| {
            corrupt(format!(
                "symbol of table `{table}` has {} field(s)",
                fields.len()
            ))
        })
    }

    fn read_field(&mut self, e: &BytesStart, empty: bool) -> Result<FieldValue> {
        let text = |reader: &mut Self| -> Result<String> {
            if empty {
                Ok(String::new())
            } else {
                reader.read_text()
            }
        };

        let Some(ty) = attr(e, "t")? else {
            return if empty {
                Ok(FieldValue::Null)
            } else {
                Err(corrupt("null field has content"))
            };
        };

        Ok(match ty.as_str() {
            tag::STR => FieldValue::Str(text(self)?),
            tag::NUM => {
                let n = text(self)?;
                FieldValue::Number(n.parse().map_err(|_| {
                    corrupt(format!("invalid numeric field `{n}`"))
                })?)
            }
            tag::TEMPLATE => FieldValue::Deferred(Deferred::Template(text(self)?)),
            tag::PATH => FieldValue::Deferred(Deferred::SourcePath(text(self)?)),
            tag::EMBED => {
                if !empty {
                    self.read_text()?;
                }

                FieldValue::Deferred(Deferred::EmbeddedFile {
                    uri: required(e, "uri")?,
                    index: parse_required(e, "index")?,
                })
            }
            tag::GENERATED_ID => FieldValue::Deferred(Deferred::GeneratedId {
                prefix: required(e, "prefix")?,
                args: self.read_args(empty)?,
            }),
            tag::GUID => FieldValue::Deferred(Deferred::Guid {
                args: self.read_args(empty)?,
            }),
            other => {
                return Err(corrupt(format!("unknown field type `{other}`")))
            }
        })
    }

    fn read_args(&mut self, empty: bool) -> Result<Vec<String>> {
        let mut args = Vec::new();

        if empty {
            return Ok(args);
        }

        loop {
            match self.next_node()? {
                Node::Start(e) if e.name().as_ref() == b"a" => {
                    args.push(self.read_text()?)
                }
                Node::Empty(e) if e.name().as_ref() == b"a" => {
                    args.push(String::new())
                }
                Node::End => return Ok(args),
                Node::Start(e) | Node::Empty(e) => {
                    return Err(Self::unexpected_element(&e))
                }
                Node::Eof => return Err(corrupt("unexpected end of file")),
            }
        }
    }

    fn reference(&self, e: &BytesStart) -> Result<Reference> {
        let kind = match attr(e, "kind")? {
            Some(kind) => ReferenceKind::from_str(&kind).map_err(|k| {
                corrupt(format!("unknown reference kind `{k}`"))
            })?,
            None => ReferenceKind::default(),
        };

        let reference =
            Reference::new(required(e, "table")?, required(e, "id")?, kind)
                .at(self.span(e)?);

        Ok(match (attr(e, "fromTable")?, attr(e, "fromId")?) {
            (Some(table), Some(id)) => {
                reference.from_symbol(SymbolKey::new(table, id))
            }
            (None, None) => reference,
            _ => return Err(corrupt("incomplete reference origin")),
        })
    }

    fn localization_header(e: &BytesStart) -> Result<Localization> {
        Ok(Localization::new(
            required(e, "culture")?,
            parse_attr(e, "codepage")?,
        ))
    }

    fn read_localization(&mut self, e: &BytesStart) -> Result<Localization> {
        let mut loc = Self::localization_header(e)?;

        loop {
            let (e, empty) = match self.next_node()? {
                Node::Start(e) => (e, false),
                Node::Empty(e) => (e, true),
                Node::End => return Ok(loc),
                Node::Eof => return Err(corrupt("unexpected end of file")),
            };

            match e.name().as_ref() {
                b"string" => {
                    let id = required(&e, "id")?;
                    let overridable = attr(&e, "overridable")?.as_deref()
                        == Some("yes");
                    let span = self.span(&e)?;
                    let value = if empty {
                        String::new()
                    } else {
                        self.read_text()?
                    };

                    loc.add_string(
                        id.clone(),
                        LocString {
                            value,
                            overridable,
                            span,
                        },
                    )
                    .map_err(|_| {
                        corrupt(format!("duplicate localized string `{id}`"))
                    })?;
                }
                b"control" if empty => {
                    let key = required(&e, "key")?;
                    let control = LocalizedControl {
                        x: parse_attr(&e, "x")?,
                        y: parse_attr(&e, "y")?,
                        width: parse_attr(&e, "width")?,
                        height: parse_attr(&e, "height")?,
                        text: attr(&e, "text")?,
                        span: self.span(&e)?,
                    };

                    loc.add_control(key.clone(), control).map_err(|_| {
                        corrupt(format!("duplicate localized control `{key}`"))
                    })?;
                }
                _ => return Err(Self::unexpected_element(&e)),
            }
        }
    }

    fn read_embedded(&mut self, e: &BytesStart) -> Result<EmbeddedFile> {
        let data = self.read_text()?;
        self.embedded_file(e, data)
    }

    fn embedded_file(&self, e: &BytesStart, data: String) -> Result<EmbeddedFile> {
        let data = STANDARD
            .decode(data.trim())
            .map_err(|e| corrupt(format!("invalid embedded file data: {e}")))?;

        Ok(EmbeddedFile {
            uri: required(e, "uri")?,
            index: parse_required(e, "index")?,
            name: required(e, "name")?,
            data,
        })
    }
}
