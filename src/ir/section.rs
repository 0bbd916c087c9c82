// Sections and references
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

use super::{Symbol, SymbolKey};
use crate::span::Span;
use std::fmt::{self, Display};
use std::str::FromStr;

/// Kind of a [`Section`].
///
/// Every section other than a [`Fragment`](Self::Fragment) is an
///   _entry section_:
///     the root of a build that the linker starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SectionType {
    #[default]
    Fragment,
    Product,
    Module,
    Patch,
    PatchCreation,
    Bundle,
}

impl SectionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fragment => "fragment",
            Self::Product => "product",
            Self::Module => "module",
            Self::Patch => "patch",
            Self::PatchCreation => "patchCreation",
            Self::Bundle => "bundle",
        }
    }

    pub fn is_entry(self) -> bool {
        !matches!(self, Self::Fragment)
    }
}

impl FromStr for SectionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "fragment" => Self::Fragment,
            "product" => Self::Product,
            "module" => Self::Module,
            "patch" => Self::Patch,
            "patchCreation" => Self::PatchCreation,
            "bundle" => Self::Bundle,
            _ => return Err(s.into()),
        })
    }
}

impl Display for SectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the linker treats a [`Reference`] with no matching definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReferenceKind {
    /// The target must exist;
    ///   its absence is an unresolved reference error.
    #[default]
    Simple,

    /// The target is used if it exists.
    ///
    /// If it does not and its definition permits optional references,
    ///   the reference is dropped.
    /// Otherwise it is treated as [`Simple`](Self::Simple).
    Optional,
}

impl ReferenceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Optional => "optional",
        }
    }
}

impl FromStr for ReferenceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simple" => Ok(Self::Simple),
            "optional" => Ok(Self::Optional),
            _ => Err(s.into()),
        }
    }
}

/// A symbolic edge to a symbol identified by `(table, id)`.
///
/// The target may be in any section;
///   whether it exists is not known until link time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    /// Symbol from which the reference originates,
    ///   if any.
    pub from: Option<SymbolKey>,
    pub table: String,
    pub id: String,
    pub kind: ReferenceKind,
    pub span: Option<Span>,
}

impl Reference {
    pub fn new<T: Into<String>, I: Into<String>>(
        table: T,
        id: I,
        kind: ReferenceKind,
    ) -> Self {
        Self {
            from: None,
            table: table.into(),
            id: id.into(),
            kind,
            span: None,
        }
    }

    pub fn from_symbol(self, from: SymbolKey) -> Self {
        Self {
            from: Some(from),
            ..self
        }
    }

    pub fn at(self, span: Option<Span>) -> Self {
        Self { span, ..self }
    }

    pub fn target(&self) -> SymbolKey {
        SymbolKey::new(&self.table, &self.id)
    }
}

/// A linkable unit of authored content.
///
/// A section is included in a link as a whole:
///   if anything references any of its symbols,
///     all of its symbols are included.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Section {
    id: Option<String>,
    ty: SectionType,
    compilation_id: Option<String>,
    symbols: Vec<Symbol>,
    references: Vec<Reference>,
}

impl Section {
    pub fn new(ty: SectionType, id: Option<String>) -> Self {
        Self {
            id,
            ty,
            ..Default::default()
        }
    }

    /// Mark the compilation unit from which this section originated.
    pub fn with_compilation_id<S: Into<String>>(self, id: S) -> Self {
        Self {
            compilation_id: Some(id.into()),
            ..self
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn ty(&self) -> SectionType {
        self.ty
    }

    pub fn set_ty(&mut self, ty: SectionType) {
        self.ty = ty;
    }

    pub fn compilation_id(&self) -> Option<&str> {
        self.compilation_id.as_deref()
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn symbols_mut(&mut self) -> &mut [Symbol] {
        &mut self.symbols
    }

    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    pub fn push_symbol(&mut self, symbol: Symbol) -> &mut Symbol {
        self.symbols.push(symbol);

        let last = self.symbols.len() - 1;
        &mut self.symbols[last]
    }

    pub fn push_reference(&mut self, reference: Reference) {
        self.references.push(reference);
    }

    pub fn find_symbol(&self, table: &str, id: &str) -> Option<&Symbol> {
        self.symbols
            .iter()
            .find(|s| s.table() == table && s.id_str() == id)
    }

    /// Decompose into symbols and references.
    pub fn into_parts(self) -> (Vec<Symbol>, Vec<Reference>) {
        (self.symbols, self.references)
    }

    pub fn retain_references<F: FnMut(&Reference) -> bool>(&mut self, f: F) {
        self.references.retain(f);
    }

    pub fn extend_symbols<I: IntoIterator<Item = Symbol>>(&mut self, iter: I) {
        self.symbols.extend(iter);
    }

    pub fn extend_references<I: IntoIterator<Item = Reference>>(
        &mut self,
        iter: I,
    ) {
        self.references.extend(iter);
    }
}
