// File layout
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

//! Placement of files that accompany bound output.

use super::{BindError, FileTransfer, TransferKind};
use crate::diagnose::{Aborted, Messaging, StageSink};
use crate::ext::ExtensionRegistry;
use std::fs;
use std::io;
use std::path::Path;

/// Carries out [`FileTransfer`]s on the local filesystem.
///
/// Binder extensions are given the first opportunity to compare,
///   copy,
///   or move each file.
pub struct FsLayout<'a> {
    extensions: &'a ExtensionRegistry,
}

impl<'a> FsLayout<'a> {
    pub fn new(extensions: &'a ExtensionRegistry) -> Self {
        Self { extensions }
    }

    pub fn execute(&self, transfers: &[FileTransfer], messaging: &Messaging) -> Result<(), Aborted> {
        let _span = tracing::info_span!("layout", transfers = transfers.len()).entered();
        let mut sink = StageSink::new(messaging, "layout");

        for transfer in transfers {
            if let Err(e) = self.transfer(transfer) {
                sink.emit(&BindError::io(
                    match transfer.kind {
                        TransferKind::Copy => "copy",
                        TransferKind::Move => "move",
                    },
                    &transfer.source,
                    e,
                ));
            }
        }

        sink.finish(())
    }

    fn transfer(&self, transfer: &FileTransfer) -> io::Result<()> {
        let FileTransfer {
            source,
            destination,
            kind,
            ..
        } = transfer;

        if source == destination {
            return Ok(());
        }

        if destination.exists() && self.unchanged(destination, source)? {
            tracing::trace!(destination = %destination.display(), "unchanged");
            return Ok(());
        }

        if let Some(dir) = destination.parent() {
            fs::create_dir_all(dir)?;
        }

        tracing::debug!(
            source = %source.display(),
            destination = %destination.display(),
            ?kind,
            "transferring"
        );

        match kind {
            TransferKind::Copy => self.copy(source, destination),
            TransferKind::Move => self.move_file(source, destination),
        }
    }

    /// Whether `target` already holds the content of `updated`.
    fn unchanged(&self, target: &Path, updated: &Path) -> io::Result<bool> {
        if let Some(same) = self
            .extensions
            .binders()
            .find_map(|ext| ext.compare_files(target, updated))
        {
            return Ok(same);
        }

        let (a, b) = (fs::metadata(target)?, fs::metadata(updated)?);

        Ok(a.len() == b.len() && fs::read(target)? == fs::read(updated)?)
    }

    fn copy(&self, source: &Path, destination: &Path) -> io::Result<()> {
        for ext in self.extensions.binders() {
            if ext.copy_file(source, destination)? {
                return Ok(());
            }
        }

        fs::copy(source, destination).map(|_| ())
    }

    fn move_file(&self, source: &Path, destination: &Path) -> io::Result<()> {
        for ext in self.extensions.binders() {
            if ext.move_file(source, destination)? {
                return Ok(());
            }
        }

        // rename fails across filesystems
        fs::rename(source, destination).or_else(|_| {
            fs::copy(source, destination)?;
            fs::remove_file(source)
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::diagnose::MessageCode;
    use crate::ext::{BinderExtension, Extension};
    use std::path::PathBuf;

    fn transfer(source: PathBuf, destination: PathBuf, kind: TransferKind) -> FileTransfer {
        FileTransfer {
            source,
            destination,
            kind,
            span: None,
        }
    }

    #[test]
    fn copies_and_moves_into_new_directories() {
        let dir = tempfile::tempdir().unwrap();
        let (a, b) = (dir.path().join("a.txt"), dir.path().join("b.txt"));
        fs::write(&a, "a").unwrap();
        fs::write(&b, "b").unwrap();

        let copied = dir.path().join("out/x/a.txt");
        let moved = dir.path().join("out/y/b.txt");

        let extensions = ExtensionRegistry::new();
        let messaging = Messaging::default();

        FsLayout::new(&extensions)
            .execute(
                &[
                    transfer(a.clone(), copied.clone(), TransferKind::Copy),
                    transfer(b.clone(), moved.clone(), TransferKind::Move),
                ],
                &messaging,
            )
            .unwrap();

        assert_eq!("a", fs::read_to_string(&copied).unwrap());
        assert_eq!("b", fs::read_to_string(&moved).unwrap());
        assert!(a.exists());
        assert!(!b.exists());
    }

    #[test]
    fn missing_source_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let extensions = ExtensionRegistry::new();
        let messaging = Messaging::default();

        let result = FsLayout::new(&extensions).execute(
            &[transfer(
                dir.path().join("gone.txt"),
                dir.path().join("out/gone.txt"),
                TransferKind::Copy,
            )],
            &messaging,
        );

        assert!(result.is_err());
        assert_eq!(Some(MessageCode(207)), messaging.last_error_code());
    }

    /// Treats every file as changed and writes its own content.
    struct Overwriting;

    impl Extension for Overwriting {
        fn name(&self) -> &str {
            "overwriting"
        }

        fn binder(&self) -> Option<&dyn BinderExtension> {
            Some(self)
        }
    }

    impl BinderExtension for Overwriting {
        fn compare_files(&self, _target: &Path, _updated: &Path) -> Option<bool> {
            Some(false)
        }

        fn copy_file(&self, _source: &Path, destination: &Path) -> io::Result<bool> {
            fs::write(destination, "from extension")?;
            Ok(true)
        }
    }

    #[test]
    fn extension_copies_first() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.txt");
        let destination = dir.path().join("b.txt");
        fs::write(&source, "same").unwrap();
        fs::write(&destination, "same").unwrap();

        let mut extensions = ExtensionRegistry::new();
        extensions.add(Box::new(Overwriting));

        FsLayout::new(&extensions)
            .execute(
                &[transfer(source, destination.clone(), TransferKind::Copy)],
                &Messaging::default(),
            )
            .unwrap();

        assert_eq!("from extension", fs::read_to_string(&destination).unwrap());
    }
}
