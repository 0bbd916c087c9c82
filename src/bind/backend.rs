// Built-in binder backends
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

//! Backends built into the toolset.

use super::database::{ArchiveTableStore, Row, StoreError, TableStore};
use super::delayed::BindVariables;
use super::{Backend, BackendContext, BindError, BindResult, FileTransfer, TransferKind};
use crate::diagnose::StageSink;
use crate::ir::{FieldValue, Intermediate, IntermediateError, Symbol};
use crate::schema::{tables, SymbolDefinition};
use fxhash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Validation rule covering field values and foreign keys.
///
/// Suppressing it skips those checks;
///   duplicate primary keys are always reported,
///     since no database can hold them.
pub const DATA_VALIDATION_ICE: &str = "ICE03";

/// Writes products and modules as installer databases.
///
/// Files are laid out uncompressed beside the database,
///   in the directory structure that they will be installed into.
#[derive(Debug, Clone, Copy, Default)]
pub struct DatabaseBackend;

/// Rows destined for a single table.
struct TableRows<'i> {
    def: Arc<SymbolDefinition>,
    rows: Vec<(&'i Symbol, Row)>,
}

impl Backend for DatabaseBackend {
    fn bind(&self, context: &BackendContext, sink: &mut StageSink, result: &mut BindResult) {
        let validate = !context
            .suppress_ices
            .iter()
            .any(|ice| ice.eq_ignore_ascii_case(DATA_VALIDATION_ICE));

        let tables = collect_rows(context.intermediate, validate, sink);

        if validate {
            check_foreign_keys(&tables, sink);
        }

        if sink.has_errors() {
            return;
        }

        let path = context.output_path;

        if let Err(e) = write_database(path, context.codepage, &tables) {
            sink.emit(&BindError::Io {
                action: "write",
                path: path.into(),
                reason: e.to_string(),
            });
            return;
        }

        result.outputs.push(path.into());

        let layout_root = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };

        add_file_transfers(context.intermediate, layout_root, result);
    }
}

fn write_database(
    path: &Path,
    codepage: Option<u32>,
    tables: &BTreeMap<&str, TableRows>,
) -> Result<(), StoreError> {
    create_parent(path)?;

    let mut store = ArchiveTableStore::create(path, codepage);

    for table in tables.values() {
        store.import(
            &table.def,
            table.rows.iter().map(|(_, row)| row.clone()).collect(),
        )?;
    }

    store.commit()
}

/// Materialize every real symbol as a row,
///   reporting those that cannot be written.
fn collect_rows<'i>(
    intermediate: &'i Intermediate,
    validate: bool,
    sink: &mut StageSink,
) -> BTreeMap<&'i str, TableRows<'i>> {
    let mut tables = BTreeMap::<&str, TableRows>::new();
    let mut keys = FxHashMap::<(&str, String), usize>::default();

    for sym in intermediate.symbols() {
        let def = sym.definition();

        if def.is_unreal() {
            continue;
        }

        if let Some(deferred) = sym.fields().iter().find_map(FieldValue::deferred) {
            sink.emit(&BindError::UnresolvedDeferred {
                span: sym.span().cloned(),
                table: sym.table().into(),
                id: sym.id_str().into(),
                what: deferred.to_string(),
            });
            continue;
        }

        if validate {
            for violation in def.validate(sym.fields()) {
                sink.emit(&BindError::Validation {
                    span: sym.span().cloned(),
                    table: sym.table().into(),
                    id: sym.id_str().into(),
                    violation: violation.to_string(),
                });
            }
        }

        let mut row = row_values(sym);

        if let Err(e) = fill_file_size(sym, &mut row) {
            sink.emit(&e);
        }

        let table = tables.entry(def.name()).or_insert_with(|| TableRows {
            def: def.clone(),
            rows: Vec::new(),
        });

        match keys.get(&(def.name(), primary_key(def, &row))) {
            Some(&index) => {
                let (first, first_row) = &table.rows[index];

                // identical rows of tables permitting duplicates collapse
                if def.allows_duplicates() && *first_row == row {
                    continue;
                }

                sink.emit(&BindError::DuplicatePrimaryKey {
                    span: sym.span().cloned(),
                    first: first.span().cloned(),
                    table: def.name().into(),
                    key: primary_key(def, &row),
                });
            }
            None => {
                keys.insert((def.name(), primary_key(def, &row)), table.rows.len());
                table.rows.push((sym, row));
            }
        }
    }

    tables
}

/// Values of the columns of the row for `sym`.
fn row_values(sym: &Symbol) -> Row {
    let id = sym
        .definition()
        .id_column()
        .map(|_| Some(sym.id_str().to_string()));

    id.into_iter()
        .chain(sym.fields().iter().map(FieldValue::literal))
        .collect()
}

/// Primary key of `row`,
///   being the identifier column followed by any fields declared part of
///   the key.
///
/// A table with neither is keyed by its entire row.
fn primary_key(def: &SymbolDefinition, row: &Row) -> String {
    let offset = usize::from(def.id_column().is_some());

    let mut columns = (0..offset)
        .chain(
            def.fields()
                .iter()
                .enumerate()
                .filter(|(_, f)| f.is_primary_key())
                .map(|(i, _)| i + offset),
        )
        .peekable();

    let values = match columns.peek() {
        Some(_) => columns.map(|i| &row[i]).collect::<Vec<_>>(),
        None => row.iter().collect(),
    };

    values
        .into_iter()
        .map(|v| v.as_deref().unwrap_or_default())
        .collect::<Vec<_>>()
        .join("/")
}

/// Size files whose size was not provided.
fn fill_file_size(sym: &Symbol, row: &mut Row) -> Result<(), BindError> {
    let def = sym.definition();

    if def.name() != tables::FILE {
        return Ok(());
    }

    let (Some(size), Some(source)) = (def.field_index("FileSize"), sym.field_named("Source"))
    else {
        return Ok(());
    };

    let column = size + usize::from(def.id_column().is_some());

    if let (true, Some(path)) = (row[column].is_none(), source.as_str()) {
        let meta = fs::metadata(path).map_err(|e| BindError::io("read", path, e))?;
        row[column] = Some(meta.len().to_string());
    }

    Ok(())
}

fn check_foreign_keys(tables: &BTreeMap<&str, TableRows>, sink: &mut StageSink) {
    let mut targets = FxHashMap::<(&str, usize), FxHashSet<&str>>::default();

    for (name, table) in tables {
        let offset = usize::from(table.def.id_column().is_some());

        for (i, field) in table.def.fields().iter().enumerate() {
            let Some(fk) = field.references() else {
                continue;
            };

            let known = targets
                .entry((fk.table.as_str(), fk.column))
                .or_insert_with(|| column_values(tables, &fk.table, fk.column));

            for (sym, row) in &table.rows {
                let Some(value) = row[i + offset].as_deref() else {
                    continue;
                };

                if !known.contains(value) {
                    sink.emit(&BindError::ForeignKey {
                        span: sym.span().cloned(),
                        table: name.to_string(),
                        id: sym.id_str().into(),
                        column: field.name().into(),
                        target: fk.table.clone(),
                        value: value.into(),
                    });
                }
            }
        }
    }
}

/// Values of the 1-indexed `column` of `table`.
fn column_values<'t>(
    tables: &'t BTreeMap<&str, TableRows>,
    table: &str,
    column: usize,
) -> FxHashSet<&'t str> {
    tables
        .get(table)
        .map(|t| {
            t.rows
                .iter()
                .filter_map(|(_, row)| row.get(column.checked_sub(1)?)?.as_deref())
                .collect()
        })
        .unwrap_or_default()
}

/// Lay out every file beneath `root` at its installed location.
fn add_file_transfers(intermediate: &Intermediate, root: &Path, result: &mut BindResult) {
    let vars = BindVariables::new(intermediate);

    let components = intermediate
        .symbols()
        .filter(|sym| sym.table() == tables::COMPONENT)
        .map(|sym| (sym.id_str(), sym))
        .collect::<FxHashMap<_, _>>();

    for file in intermediate.symbols().filter(|sym| sym.table() == tables::FILE) {
        let literal = |name: &str| file.field_named(name).and_then(FieldValue::literal);

        let (Some(source), Some(name)) = (literal("Source"), literal("FileName")) else {
            continue;
        };

        let directory = literal("Component_")
            .and_then(|c| components.get(c.as_str()))
            .and_then(|c| c.field_named("Directory_")?.literal())
            .and_then(|dir| vars.value("directoryPath", &dir))
            .unwrap_or_default();

        let mut destination = root.to_path_buf();
        destination.extend(directory.split('\\').filter(|part| !part.is_empty()));
        destination.push(name.rsplit('|').next().unwrap_or_default());

        result.content_files.push(PathBuf::from(&source));
        result.file_transfers.push(FileTransfer {
            source: source.into(),
            destination,
            kind: TransferKind::Copy,
            span: file.span().cloned(),
        });
    }
}

fn create_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir),
        _ => Ok(()),
    }
}

/// Writes the intermediate itself,
///   for libraries and outputs that are bound again later.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntermediateBackend;

impl Backend for IntermediateBackend {
    fn bind(&self, context: &BackendContext, sink: &mut StageSink, result: &mut BindResult) {
        let path = context.output_path;

        tracing::debug!(path = %path.display(), "writing intermediate");

        let saved = create_parent(path)
            .map_err(IntermediateError::from)
            .and_then(|_| context.intermediate.save(path));

        match saved {
            Ok(()) => result.outputs.push(path.into()),
            Err(e) => sink.emit(&BindError::Io {
                action: "write",
                path: path.into(),
                reason: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn primary_key_of_keyless_table_is_whole_row() {
        let def = SymbolDefinition::new("WixBundle", None, Vec::new());
        let row = vec![Some("1.0".to_string()), None];

        assert_eq!("1.0/", primary_key(&def, &row));
    }

    #[test]
    fn file_size_is_filled_from_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "12345").unwrap();

        let registry = crate::schema::SchemaRegistry::with_core();
        let mut sym = Symbol::new(
            registry.get(tables::FILE).unwrap().clone(),
            crate::ir::Identifier::public("A"),
            None,
        );
        sym.set_named("Source", path.to_string_lossy().into_owned());

        let mut row = row_values(&sym);
        fill_file_size(&sym, &mut row).unwrap();

        assert_eq!(Some("5"), row[3].as_deref());
    }
}
