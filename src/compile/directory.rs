// Directory elements
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

use super::{component, CompileContext, ContextKey, ContextValues, Platform};
use crate::ext::{is_standard_directory, STANDARD_DIRECTORIES};
use crate::global::TARGETDIR;
use crate::ir::{Identifier, SymbolKey};
use crate::schema::tables;
use roxmltree::Node;

/// Compile the children of a directory,
///   which inherit `id` as their directory.
fn compile_directory_children(
    ctx: &mut CompileContext,
    node: Node,
    id: &str,
    values: &ContextValues,
) {
    let values = values.with(ContextKey::DirectoryId, id);

    ctx.each_child(node, &values, |ctx, child, name| {
        match name {
            "Directory" => compile_directory(ctx, child, &values),
            "Component" => component::compile_component(ctx, child, &values),
            _ => return false,
        }
        true
    });
}

pub(super) fn compile_directory(
    ctx: &mut CompileContext,
    node: Node,
    values: &ContextValues,
) {
    ctx.check_attributes(node, &["Id", "Name"], values);

    let span = ctx.span(node);
    let parent = values.get(ContextKey::DirectoryId);
    let id = ctx.identifier_attr(node, "Id");

    // The root and the standard folders are provided by the standard
    //   library and are only referenced here.
    if let Some(id) = id.filter(|&id| id == TARGETDIR || is_standard_directory(id))
    {
        if id == TARGETDIR {
            match node.attribute("Name") {
                None | Some("SourceDir") => (),
                Some(other) => {
                    ctx.illegal_value(node, "Name", other, "`SourceDir`")
                }
            }
        }

        ctx.add_simple_reference(tables::DIRECTORY, id, None, Some(span));
        compile_directory_children(ctx, node, id, values);
        return;
    }

    let Some(name) = ctx.required_attr(node, "Name") else {
        return;
    };

    let parent_id = parent.unwrap_or(TARGETDIR);
    let id = match id {
        Some(id) => id.to_string(),
        None => ctx.create_identifier("dir", &[parent_id, name]),
    };

    let sym =
        ctx.add_symbol(tables::DIRECTORY, Identifier::public(&id), Some(span.clone()));
    sym.set_named("Directory_Parent", parent_id);
    sym.set_named("DefaultDir", name);

    if parent.is_none() {
        ctx.add_simple_reference(
            tables::DIRECTORY,
            TARGETDIR,
            Some(SymbolKey::new(tables::DIRECTORY, &id)),
            Some(span),
        );
    }

    compile_directory_children(ctx, node, &id, values);
}

pub(super) fn compile_directory_ref(
    ctx: &mut CompileContext,
    node: Node,
    values: &ContextValues,
) {
    ctx.check_attributes(node, &["Id"], values);

    let span = ctx.span(node);

    if let Some(id) = ctx.required_identifier_attr(node, "Id") {
        ctx.add_simple_reference(tables::DIRECTORY, id, None, Some(span));
        compile_directory_children(ctx, node, id, values);
    }
}

/// Folder that a platform-neutral standard directory denotes on the
///   platform being compiled for.
fn standard_directory_for(id: &str, platform: Platform) -> Option<&'static str> {
    let (folder32, folder64) = match id {
        "ProgramFiles6432Folder" => ("ProgramFilesFolder", "ProgramFiles64Folder"),
        "CommonFiles6432Folder" => ("CommonFilesFolder", "CommonFiles64Folder"),
        "System6432Folder" => ("SystemFolder", "System64Folder"),
        _ => return STANDARD_DIRECTORIES.iter().copied().find(|&d| d == id),
    };

    Some(if platform.is_64bit() { folder64 } else { folder32 })
}

pub(super) fn compile_standard_directory(
    ctx: &mut CompileContext,
    node: Node,
    values: &ContextValues,
) {
    ctx.check_attributes(node, &["Id"], values);

    let span = ctx.span(node);
    let Some(given) = ctx.required_attr(node, "Id") else {
        return;
    };

    match standard_directory_for(given, ctx.platform()) {
        Some(id) => {
            ctx.add_simple_reference(tables::DIRECTORY, id, None, Some(span));
            compile_directory_children(ctx, node, id, values);
        }
        None => ctx.illegal_value(node, "Id", given, "a standard directory"),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn neutral_folders_follow_platform() {
        assert_eq!(
            Some("ProgramFilesFolder"),
            standard_directory_for("ProgramFiles6432Folder", Platform::X86)
        );
        assert_eq!(
            Some("ProgramFiles64Folder"),
            standard_directory_for("ProgramFiles6432Folder", Platform::Arm64)
        );
        assert_eq!(
            Some("System64Folder"),
            standard_directory_for("System6432Folder", Platform::X64)
        );
    }

    #[test]
    fn other_folders_are_unchanged() {
        assert_eq!(
            Some("TempFolder"),
            standard_directory_for("TempFolder", Platform::X64)
        );
        assert_eq!(None, standard_directory_for("INSTALLFOLDER", Platform::X64));
    }
}
