// Filesystem helpers
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

//! Lightweight filesystem helpers.
//!
//! This includes only what the toolset needs:
//!
//!   - [`VisitOnce`] ensures that an input named more than once
//!       (perhaps by different relative paths)
//!       is processed only once; and
//!   - [`persist_atomic`] writes output such that a failure never leaves a
//!       partial file behind.

use fxhash::FxBuildHasher;
use std::collections::HashSet;
use std::hash::BuildHasher;
use std::io::{self, BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub trait Canonicalizer {
    fn canonicalize<P: AsRef<Path>>(path: P) -> io::Result<PathBuf>;
}

pub struct FsCanonicalizer;

impl Canonicalizer for FsCanonicalizer {
    fn canonicalize<P: AsRef<Path>>(path: P) -> io::Result<PathBuf> {
        std::fs::canonicalize(path)
    }
}

/// Recognizes each path only once.
///
/// The first time a path is [`visit`](VisitOnce::visit)ed,
///   its canonical form is returned;
///     every time thereafter,
///       [`None`] is returned.
/// A path that fails to canonicalize is not marked as visited.
pub struct VisitOnce<C, S = FxBuildHasher>
where
    C: Canonicalizer,
    S: BuildHasher,
{
    visited: HashSet<PathBuf, S>,
    _c: PhantomData<C>,
}

impl<C, S> VisitOnce<C, S>
where
    C: Canonicalizer,
    S: BuildHasher + Default,
{
    /// New set with no recorded paths.
    pub fn new() -> Self {
        Self {
            visited: Default::default(),
            _c: PhantomData,
        }
    }

    pub fn visit<P: AsRef<Path>>(
        &mut self,
        path: P,
    ) -> io::Result<Option<PathBuf>> {
        let cpath = C::canonicalize(path)?;

        if self.visited.contains(&cpath) {
            return Ok(None);
        }

        self.visited.insert(cpath.clone());
        Ok(Some(cpath))
    }

    /// Number of visited paths.
    pub fn visit_len(&self) -> usize {
        self.visited.len()
    }
}

impl<C, S> Default for VisitOnce<C, S>
where
    C: Canonicalizer,
    S: BuildHasher + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Write a file atomically.
///
/// `write` is given a buffered temporary file in the same directory as
///   `path`;
///     once it completes successfully,
///       the temporary file is renamed to `path`.
/// If `write` fails,
///   the temporary file is removed and `path` is untouched.
pub fn persist_atomic<F, E>(path: &Path, write: F) -> Result<(), E>
where
    F: FnOnce(&mut BufWriter<NamedTempFile>) -> Result<(), E>,
    E: From<io::Error>,
{
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let mut buf = BufWriter::new(NamedTempFile::new_in(dir)?);
    write(&mut buf)?;
    buf.flush()?;

    let tmp = buf.into_inner().map_err(|e| e.into_error())?;
    tmp.persist(path).map_err(|e| e.error)?;

    Ok(())
}
