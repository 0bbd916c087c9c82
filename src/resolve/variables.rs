// Variable resolution
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

//! Substitution of `!(prefix.name)` placeholders.
//!
//! Recognized prefixes:
//!
//!   - `wix.NAME` or `wix.NAME=DEFAULT` names a variable defined by the
//!       user;
//!   - `loc.NAME` names a localized string; and
//!   - `bind.KIND.ID` names a value known only once binding has begun,
//!       so it is left in place and the text is reported as delayed.
//!
//! Placeholders with any other prefix,
//!   such as `!(bindpath.NAME)`,
//!   are left for others to interpret.
//! The sequence `!!(` produces a literal `!(`.

use super::ResolveError;
use crate::diagnose::StageSink;
use crate::ir::{LocString, Localization, LocalizedControl};
use crate::span::Span;
use fxhash::FxHashMap;
use std::collections::hash_map::Entry;

/// Result of resolving the placeholders of some text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub value: String,

    /// A default was used,
    ///   or an unknown variable was left in place.
    pub is_default: bool,

    /// Placeholders remain that only the binder can resolve.
    pub delayed: bool,
}

#[derive(Debug, Default)]
pub struct VariableResolver {
    variables: FxHashMap<String, String>,
    strings: FxHashMap<String, (String, LocString)>,
    controls: FxHashMap<String, (String, LocalizedControl)>,
    codepage: Option<u32>,
}

impl VariableResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define the variable `prefix.name`,
    ///   replacing any existing definition.
    ///
    /// Variables take precedence over localized strings of the same name.
    pub fn add_variable<S: Into<String>>(&mut self, prefix: &str, name: &str, value: S) {
        self.variables.insert(format!("{prefix}.{name}"), value.into());
    }

    /// Add localizations in order of preference.
    ///
    /// A string or control already provided by a preferred culture is
    ///   left alone.
    /// Within a single culture,
    ///   a later definition replaces an earlier one only if the earlier
    ///   one is overridable.
    pub fn add_localizations(&mut self, localizations: &[Localization], sink: &mut StageSink) {
        for loc in localizations {
            let culture = loc.culture();

            if self.codepage.is_none() {
                self.codepage = loc.codepage();
            }

            for (id, string) in loc.strings() {
                match self.strings.entry(id.clone()) {
                    Entry::Vacant(e) => {
                        e.insert((culture.into(), string.clone()));
                    }
                    Entry::Occupied(e) if e.get().0 != culture => (),
                    Entry::Occupied(mut e) if e.get().1.overridable => {
                        e.insert((culture.into(), string.clone()));
                    }
                    Entry::Occupied(e) => {
                        sink.emit(&ResolveError::DuplicateLocalizedString {
                            span: string.span.clone(),
                            first: e.get().1.span.clone(),
                            culture: culture.into(),
                            id: id.clone(),
                        });
                    }
                }
            }

            for (key, control) in loc.controls() {
                match self.controls.entry(key.clone()) {
                    Entry::Vacant(e) => {
                        e.insert((culture.into(), control.clone()));
                    }
                    Entry::Occupied(e) if e.get().0 != culture => (),
                    Entry::Occupied(e) => {
                        sink.emit(&ResolveError::DuplicateLocalizedControl {
                            span: control.span.clone(),
                            first: e.get().1.span.clone(),
                            culture: culture.into(),
                            key: key.clone(),
                        });
                    }
                }
            }
        }
    }

    /// Codepage of the most preferred localization declaring one.
    pub fn codepage(&self) -> Option<u32> {
        self.codepage
    }

    pub fn localized_control(&self, key: &str) -> Option<&LocalizedControl> {
        self.controls.get(key).map(|(_, control)| control)
    }

    pub fn localized_controls(&self) -> impl Iterator<Item = (&str, &LocalizedControl)> {
        self.controls
            .iter()
            .map(|(key, (_, control))| (key.as_str(), control))
    }

    /// Substitute the placeholders of `text`.
    ///
    /// With `localization_only`,
    ///   only `loc` placeholders are substituted.
    /// An unknown variable is an error if `error_on_unknown`;
    ///   otherwise it is left in place and the result is marked as a
    ///   default.
    pub fn resolve(
        &self,
        span: Option<&Span>,
        text: &str,
        localization_only: bool,
        error_on_unknown: bool,
    ) -> Result<Resolution, ResolveError> {
        let bad_syntax = |reason| ResolveError::BadSyntax {
            span: span.cloned(),
            text: text.into(),
            reason,
        };

        let mut out = String::with_capacity(text.len());
        let mut is_default = false;
        let mut delayed = false;
        let mut rest = text;

        while let Some(start) = rest.find("!(") {
            if start > 0 && rest.as_bytes()[start - 1] == b'!' {
                out.push_str(&rest[..start - 1]);
                out.push_str("!(");
                rest = &rest[start + 2..];
                continue;
            }

            out.push_str(&rest[..start]);

            let after = &rest[start + 2..];
            let end = after.find(')').ok_or_else(|| bad_syntax("unterminated placeholder"))?;
            let expr = &after[..end];
            let placeholder = &rest[start..start + end + 3];
            rest = &after[end + 1..];

            let Some((prefix, name)) = expr.split_once('.') else {
                return Err(bad_syntax("placeholder has no prefix"));
            };

            let (name, default) = match name.split_once('=') {
                Some((name, default)) => (name, Some(default)),
                None => (name, None),
            };

            if name.is_empty() {
                return Err(bad_syntax("placeholder has no name"));
            }

            let value = match prefix {
                "bind" => {
                    delayed = true;
                    None
                }
                "loc" => self.lookup(prefix, name).or_else(|| {
                    self.strings.get(name).map(|(_, s)| s.value.as_str())
                }),
                "wix" if !localization_only => self.lookup(prefix, name),
                _ => {
                    out.push_str(placeholder);
                    continue;
                }
            };

            match (value, default) {
                _ if prefix == "bind" => out.push_str(placeholder),
                (Some(value), _) => out.push_str(value),
                (None, Some(default)) => {
                    is_default = true;
                    out.push_str(default);
                }
                (None, None) if error_on_unknown => {
                    return Err(ResolveError::UnknownVariable {
                        span: span.cloned(),
                        name: format!("{prefix}.{name}"),
                    })
                }
                (None, None) => {
                    is_default = true;
                    out.push_str(placeholder);
                }
            }
        }

        out.push_str(rest);

        Ok(Resolution {
            value: out,
            is_default,
            delayed,
        })
    }

    fn lookup(&self, prefix: &str, name: &str) -> Option<&str> {
        self.variables
            .get(&format!("{prefix}.{name}"))
            .map(String::as_str)
    }
}
