// Installer database table store
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

//! Transactional storage of installer database tables.
//!
//! The native installer database is an external collaborator;
//!   the binder needs only to import rows,
//!     query them back,
//!     and commit the result.
//! [`ArchiveTableStore`] provides those operations over a portable XML
//!   archive:
//!
//! ```xml
//! <wixDatabase xmlns="http://wixtoolset.org/schemas/v4/wixdb" codepage="1252">
//!   <table name="Property">
//!     <column name="Property" />
//!     <column name="Value" />
//!     <row><f>Manufacturer</f><f>Acme</f></row>
//!   </table>
//! </wixDatabase>
//! ```
//!
//! A `f` element without text is a null field.
//! Installer databases make no distinction between null and the empty
//!   string,
//!     and neither does the store.

use crate::global::DATABASE_NAMESPACE;
use crate::schema::SymbolDefinition;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer as XmlWriter;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Values of a single row,
///   in column order.
pub type Row = Vec<Option<String>>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Value of the named column of `row`.
    pub fn value<'a>(&self, row: &'a Row, column: &str) -> Option<&'a str> {
        let index = self.columns.iter().position(|c| c == column)?;
        row.get(index)?.as_deref()
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("malformed database: {0}")]
    Malformed(String),

    #[error("row of table `{table}` has {found} value(s) but {expected} column(s)")]
    Arity {
        table: String,
        expected: usize,
        found: usize,
    },

    #[error("table `{table}` is already defined with different columns")]
    ColumnMismatch { table: String },
}

/// Storage supporting import, query and commit of tables.
pub trait TableStore {
    /// Append `rows` to the table described by `def`,
    ///   creating it if necessary.
    fn import(&mut self, def: &SymbolDefinition, rows: Vec<Row>) -> Result<(), StoreError>;

    fn query(&self, table: &str) -> Option<&Table>;

    /// Make all imported rows durable.
    fn commit(&mut self) -> Result<(), StoreError>;
}

/// Table store persisted as an XML archive.
///
/// Nothing is written until [`TableStore::commit`],
///   which replaces the archive atomically.
#[derive(Debug)]
pub struct ArchiveTableStore {
    path: PathBuf,
    codepage: Option<u32>,
    tables: BTreeMap<String, Table>,
}

impl ArchiveTableStore {
    /// A new empty store to be committed to `path`.
    pub fn create<P: Into<PathBuf>>(path: P, codepage: Option<u32>) -> Self {
        Self {
            path: path.into(),
            codepage,
            tables: BTreeMap::new(),
        }
    }

    /// Open an existing archive.
    pub fn open<P: Into<PathBuf>>(path: P) -> Result<Self, StoreError> {
        let path = path.into();
        let src = fs::read_to_string(&path)?;

        let (codepage, tables) = read_archive(&src)?;

        Ok(Self {
            path,
            codepage,
            tables,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn codepage(&self) -> Option<u32> {
        self.codepage
    }

    pub fn tables(&self) -> impl Iterator<Item = (&str, &Table)> {
        self.tables.iter().map(|(name, table)| (name.as_str(), table))
    }
}

impl TableStore for ArchiveTableStore {
    fn import(&mut self, def: &SymbolDefinition, rows: Vec<Row>) -> Result<(), StoreError> {
        let columns = def.column_names().map(String::from).collect::<Vec<_>>();

        if let Some(row) = rows.iter().find(|row| row.len() != columns.len()) {
            return Err(StoreError::Arity {
                table: def.name().into(),
                expected: columns.len(),
                found: row.len(),
            });
        }

        let table = self
            .tables
            .entry(def.name().into())
            .or_insert_with(|| Table::new(columns.clone()));

        if table.columns != columns {
            return Err(StoreError::ColumnMismatch {
                table: def.name().into(),
            });
        }

        table.rows.extend(rows.into_iter().map(|row| {
            row.into_iter()
                .map(|value| value.filter(|v| !v.is_empty()))
                .collect()
        }));

        Ok(())
    }

    fn query(&self, table: &str) -> Option<&Table> {
        self.tables.get(table)
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        tracing::debug!(
            path = %self.path.display(),
            tables = self.tables.len(),
            "committing database"
        );

        crate::fs::persist_atomic(&self.path, |dest| {
            ArchiveWriter::new(dest).write(self.codepage, &self.tables)
        })
    }
}

type Result<T = (), E = StoreError> = std::result::Result<T, E>;

struct ArchiveWriter<W: Write> {
    writer: XmlWriter<W>,
}

impl<W: Write> ArchiveWriter<W> {
    fn new(write: W) -> Self {
        Self {
            writer: XmlWriter::new_with_indent(write, b' ', 2),
        }
    }

    fn write(&mut self, codepage: Option<u32>, tables: &BTreeMap<String, Table>) -> Result {
        self.writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

        let codepage = codepage.map(|c| c.to_string());
        let mut attrs = vec![("xmlns", DATABASE_NAMESPACE)];
        attrs.extend(codepage.as_deref().map(|c| ("codepage", c)));

        self.write_element("wixDatabase", &attrs, |writer| {
            for (name, table) in tables {
                writer.write_table(name, table)?;
            }

            Ok(())
        })?;

        self.writer.get_mut().flush()?;
        Ok(())
    }

    fn write_table(&mut self, name: &str, table: &Table) -> Result {
        self.write_element("table", &[("name", name)], |writer| {
            for column in &table.columns {
                writer.write_text_element("column", &[("name", column)], "")?;
            }

            for row in &table.rows {
                writer.write_element("row", &[], |writer| {
                    row.iter().try_for_each(|value| {
                        writer.write_text_element("f", &[], value.as_deref().unwrap_or_default())
                    })
                })?;
            }

            Ok(())
        })
    }

    fn write_element<F>(&mut self, name: &str, attrs: &[(&str, &str)], callback: F) -> Result
    where
        F: FnOnce(&mut Self) -> Result,
    {
        let mut start = BytesStart::new(name);
        start.extend_attributes(attrs.iter().copied());

        self.writer.write_event(Event::Start(start))?;
        callback(self)?;
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;

        Ok(())
    }

    fn write_text_element(&mut self, name: &str, attrs: &[(&str, &str)], text: &str) -> Result {
        let mut start = BytesStart::new(name);
        start.extend_attributes(attrs.iter().copied());

        if text.is_empty() {
            self.writer.write_event(Event::Empty(start))?;
        } else {
            self.writer.write_event(Event::Start(start))?;
            self.writer.write_event(Event::Text(BytesText::new(text)))?;
            self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        }

        Ok(())
    }
}

fn malformed<S: Into<String>>(reason: S) -> StoreError {
    StoreError::Malformed(reason.into())
}

fn read_archive(src: &str) -> Result<(Option<u32>, BTreeMap<String, Table>)> {
    let doc = roxmltree::Document::parse(src).map_err(|e| malformed(e.to_string()))?;
    let root = doc.root_element();

    if root.tag_name().name() != "wixDatabase"
        || root.tag_name().namespace() != Some(DATABASE_NAMESPACE)
    {
        return Err(malformed(format!(
            "unexpected root element `{}`",
            root.tag_name().name()
        )));
    }

    let codepage = root
        .attribute("codepage")
        .map(|c| {
            c.parse::<u32>()
                .map_err(|_| malformed(format!("invalid codepage `{c}`")))
        })
        .transpose()?;

    let mut tables = BTreeMap::new();

    for node in root.children().filter(|n| n.has_tag_name("table")) {
        let name = node
            .attribute("name")
            .ok_or_else(|| malformed("table without a name"))?;

        let mut table = Table::default();

        for child in node.children().filter(roxmltree::Node::is_element) {
            match child.tag_name().name() {
                "column" => table.columns.push(
                    child
                        .attribute("name")
                        .ok_or_else(|| malformed(format!("unnamed column in `{name}`")))?
                        .into(),
                ),
                "row" => {
                    let row = child
                        .children()
                        .filter(|f| f.has_tag_name("f"))
                        .map(|f| f.text().filter(|t| !t.is_empty()).map(String::from))
                        .collect::<Row>();

                    if row.len() != table.columns.len() {
                        return Err(StoreError::Arity {
                            table: name.into(),
                            expected: table.columns.len(),
                            found: row.len(),
                        });
                    }

                    table.rows.push(row);
                }
                other => {
                    return Err(malformed(format!("unexpected element `{other}` in `{name}`")))
                }
            }
        }

        tables.insert(name.to_string(), table);
    }

    Ok((codepage, tables))
}
