// Localization
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

use crate::span::Span;
use std::collections::btree_map::{BTreeMap, Entry};

/// A localized string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocString {
    pub value: String,

    /// Whether a later definition of the same string may replace this
    ///   one without error.
    pub overridable: bool,

    pub span: Option<Span>,
}

/// Localized position,
///   size,
///   and text of a dialog or a control within a dialog.
///
/// Only the attributes that are [`Some`] override those of the dialog or
///   control.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LocalizedControl {
    pub x: Option<i64>,
    pub y: Option<i64>,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub text: Option<String>,
    pub span: Option<Span>,
}

/// Localized strings and controls for a single culture.
///
/// The culture of the neutral localization is the empty string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Localization {
    culture: String,
    codepage: Option<u32>,
    strings: BTreeMap<String, LocString>,
    controls: BTreeMap<String, LocalizedControl>,
}

impl Localization {
    pub fn new<S: Into<String>>(culture: S, codepage: Option<u32>) -> Self {
        Self {
            culture: culture.into(),
            codepage,
            ..Default::default()
        }
    }

    /// Key of the localized control within a dialog,
    ///   or of the dialog itself if `control` is [`None`].
    pub fn control_key(dialog: &str, control: Option<&str>) -> String {
        match control {
            Some(control) => format!("{dialog}/{control}"),
            None => dialog.into(),
        }
    }

    pub fn culture(&self) -> &str {
        &self.culture
    }

    pub fn is_neutral(&self) -> bool {
        self.culture.is_empty()
    }

    pub fn codepage(&self) -> Option<u32> {
        self.codepage
    }

    pub fn strings(&self) -> &BTreeMap<String, LocString> {
        &self.strings
    }

    pub fn controls(&self) -> &BTreeMap<String, LocalizedControl> {
        &self.controls
    }

    pub fn string(&self, id: &str) -> Option<&LocString> {
        self.strings.get(id)
    }

    pub fn control(&self, key: &str) -> Option<&LocalizedControl> {
        self.controls.get(key)
    }

    /// Add a string.
    ///
    /// If a string with the same id exists and is not overridable,
    ///   the existing string is kept and returned as the error.
    pub fn add_string<S: Into<String>>(
        &mut self,
        id: S,
        string: LocString,
    ) -> Result<(), LocString> {
        match self.strings.entry(id.into()) {
            Entry::Occupied(e) if !e.get().overridable => Err(e.get().clone()),
            Entry::Occupied(mut e) => {
                e.insert(string);
                Ok(())
            }
            Entry::Vacant(e) => {
                e.insert(string);
                Ok(())
            }
        }
    }

    /// Add a localized control,
    ///   returning the existing localization on conflict.
    pub fn add_control(
        &mut self,
        key: String,
        control: LocalizedControl,
    ) -> Result<(), LocalizedControl> {
        match self.controls.entry(key) {
            Entry::Occupied(e) => Err(e.get().clone()),
            Entry::Vacant(e) => {
                e.insert(control);
                Ok(())
            }
        }
    }
}
