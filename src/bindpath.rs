// Bind paths
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

//! Bind paths.
//!
//! A bind path is a directory searched for the source files named by
//!   symbols,
//!     such as the `Source` of a `File`.
//! Bind paths may be named,
//!   in which case they are searched only for sources beginning with
//!   `!(bindpath.NAME)`;
//!     unnamed bind paths are searched for all other relative sources,
//!       in the order in which they were added.
//!
//! Separate lists of bind paths are kept for each [`BindStage`] so that
//!   the target and updated images of a patch can be located
//!   independently of the image being built.

use std::fmt::{self, Display};
use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use std::str::FromStr;

/// Image that a file is being located for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BindStage {
    #[default]
    Normal,
    Target,
    Updated,
}

impl BindStage {
    fn index(self) -> usize {
        match self {
            Self::Normal => 0,
            Self::Target => 1,
            Self::Updated => 2,
        }
    }
}

impl Display for BindStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Normal => "normal",
            Self::Target => "target",
            Self::Updated => "updated",
        })
    }
}

/// A directory searched for source files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindPath {
    pub name: Option<String>,
    pub path: PathBuf,
}

impl BindPath {
    pub fn unnamed<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            name: None,
            path: path.into(),
        }
    }

    pub fn named<S: Into<String>, P: Into<PathBuf>>(name: S, path: P) -> Self {
        Self {
            name: Some(name.into()),
            path: path.into(),
        }
    }
}

/// Parse `NAME=PATH` or `PATH`.
///
/// A single character before `=` is taken to be part of the path
///   rather than a name.
impl FromStr for BindPath {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err("empty bind path".into());
        }

        match s.split_once('=') {
            Some((name, path)) if name.len() > 1 && !path.is_empty() => {
                Ok(Self::named(name, path))
            }
            Some((_, "")) => Err(format!("bind path `{s}` has no path")),
            _ => Ok(Self::unnamed(s)),
        }
    }
}

/// Prefix restricting a source to named bind paths.
const BINDPATH_PREFIX: &str = "!(bindpath.";

/// Bind paths for each [`BindStage`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindPaths([Vec<BindPath>; 3]);

impl BindPaths {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, stage: BindStage, path: BindPath) {
        self.0[stage.index()].push(path);
    }

    pub fn get(&self, stage: BindStage) -> &[BindPath] {
        &self.0[stage.index()]
    }

    /// Locate the file `source` for `stage`.
    ///
    /// Returns [`None`] if no existing file was found;
    ///   the caller may then consult other means of locating the file.
    pub fn resolve(&self, source: &str, stage: BindStage) -> Option<PathBuf> {
        if let Some((name, rest)) = split_bindpath_prefix(source) {
            let rest = normalize(rest);

            return self
                .get(stage)
                .iter()
                .filter(|bp| bp.name.as_deref() == Some(name))
                .map(|bp| bp.path.join(&rest))
                .find(|candidate| candidate.is_file());
        }

        let source = normalize(source);
        let path = Path::new(&source);

        if path.is_absolute() {
            return path.is_file().then(|| path.to_path_buf());
        }

        self.get(stage)
            .iter()
            .filter(|bp| bp.name.is_none())
            .map(|bp| bp.path.join(path))
            .chain(std::iter::once(path.to_path_buf()))
            .find(|candidate| candidate.is_file())
    }
}

/// Split `!(bindpath.NAME)rest` into `NAME` and `rest`.
fn split_bindpath_prefix(source: &str) -> Option<(&str, &str)> {
    let rest = source.strip_prefix(BINDPATH_PREFIX)?;
    let (name, rest) = rest.split_once(')')?;

    Some((name, rest.trim_start_matches(['\\', '/'])))
}

/// Use the separator of the host for both `/` and `\`.
fn normalize(source: &str) -> String {
    source
        .chars()
        .map(|c| match c {
            '/' | '\\' => MAIN_SEPARATOR,
            c => c,
        })
        .collect()
}
