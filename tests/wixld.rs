// Tests for wixld
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

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

type Result<T = ()> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Compile `source` into `dir`,
///   producing the path of the object file.
fn compile(source: &str, dir: &Path) -> Result<PathBuf> {
    let dest = dir.join(Path::new(source).with_extension("wixobj").file_name().unwrap());

    Command::cargo_bin("wixc")?
        .arg("-d")
        .arg("Version=1.0.0")
        .arg(format!("tests/data/{source}"))
        .arg("-o")
        .arg(&dest)
        .assert()
        .success();

    Ok(dest)
}

#[test]
fn link_invalid_argument() -> Result {
    let mut cmd = Command::cargo_bin("wixld")?;
    cmd.arg("-q");
    cmd.assert()
        .failure()
        .code(exitcode::USAGE)
        .stderr(predicate::str::contains("Unrecognized option:"));

    Ok(())
}

#[test]
fn link_missing_input_file() -> Result {
    let mut cmd = Command::cargo_bin("wixld")?;
    cmd.arg("-o").arg("out.msi");
    cmd.assert()
        .failure()
        .code(exitcode::USAGE)
        .stderr(predicate::str::contains("INPUT"));

    Ok(())
}

#[test]
fn link_missing_output_file() -> Result {
    let mut cmd = Command::cargo_bin("wixld")?;
    cmd.arg("foobar.wixobj");
    cmd.assert()
        .failure()
        .code(exitcode::USAGE)
        .stderr(predicate::str::contains("-o"));

    Ok(())
}

#[test]
fn link_input_file_does_not_exist() -> Result {
    let out = tempfile::tempdir()?;

    let mut cmd = Command::cargo_bin("wixld")?;
    cmd.arg("tests/data/does-not-exist.wixobj");
    cmd.arg("-o").arg(out.path().join("out.msi"));
    cmd.assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("fatal: failed to link"));

    Ok(())
}

#[test]
fn link_invalid_input_file() -> Result {
    let out = tempfile::tempdir()?;

    let mut cmd = Command::cargo_bin("wixld")?;
    cmd.arg("tests/data/invalid.wixobj");
    cmd.arg("-o").arg(out.path().join("out.msi"));
    cmd.assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("fatal: failed to link"));

    assert!(!out.path().join("out.msi").exists());

    Ok(())
}

#[test]
fn link_unresolved_reference() -> Result {
    let dir = tempfile::tempdir()?;
    let obj = compile("unresolved.wxs", dir.path())?;

    let mut cmd = Command::cargo_bin("wixld")?;
    cmd.arg(obj);
    cmd.arg("-o").arg(dir.path().join("out.wixout"));
    cmd.assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("error[WIX0094]"))
        .stdout(predicate::str::contains("Missing"))
        .stdout(predicate::str::contains("last error WIX0094"));

    Ok(())
}

#[test]
fn build_product() -> Result {
    let dir = tempfile::tempdir()?;
    let obj = compile("product.wxs", dir.path())?;
    let out = dir.path().join("out");

    let mut cmd = Command::cargo_bin("wixld")?;
    cmd.arg(obj);
    cmd.arg("-l").arg("tests/data/en-US.wxl");
    cmd.arg("-b").arg("tests/data");
    cmd.arg("--intermediate-folder").arg(dir.path().join("obj"));
    cmd.arg("-o").arg(out.join("product.msi"));
    cmd.assert().success();

    let db = fs::read_to_string(out.join("product.msi"))?;
    assert!(db.contains("<wixDatabase"));
    assert!(db.contains("Sample Corp"));
    assert!(db.contains("Everything"));
    assert!(!db.contains("!(loc."));

    assert_eq!(
        "Read me first.\n",
        fs::read_to_string(
            out.join("ProgramFilesFolder")
                .join("Sample")
                .join("readme.txt")
        )?
    );

    Ok(())
}

#[test]
fn build_without_localization_fails() -> Result {
    let dir = tempfile::tempdir()?;
    let obj = compile("product.wxs", dir.path())?;

    let mut cmd = Command::cargo_bin("wixld")?;
    cmd.arg(obj);
    cmd.arg("-b").arg("tests/data");
    cmd.arg("-o").arg(dir.path().join("product.msi"));
    cmd.assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("error[WIX0100]"));

    Ok(())
}

#[test]
fn build_library_with_bound_files() -> Result {
    let dir = tempfile::tempdir()?;
    let obj = compile("product.wxs", dir.path())?;
    let lib = dir.path().join("sample.wixlib");

    let mut cmd = Command::cargo_bin("wixld")?;
    cmd.arg(obj);
    cmd.arg("--bindfiles");
    cmd.arg("-b").arg("tests/data");
    cmd.arg("-l").arg("tests/data/en-US.wxl");
    cmd.arg("-o").arg(&lib);
    cmd.assert().success();

    let text = fs::read_to_string(lib)?;
    assert!(text.contains(r#"level="library""#));
    assert!(text.contains("<embedded"));

    Ok(())
}

#[test]
fn duplicate_inputs_are_linked_once() -> Result {
    let dir = tempfile::tempdir()?;
    let obj = compile("product.wxs", dir.path())?;
    let again = dir.path().join(".").join("product.wixobj");

    let mut cmd = Command::cargo_bin("wixld")?;
    cmd.arg(&obj).arg(&again);
    cmd.arg("-l").arg("tests/data/en-US.wxl");
    cmd.arg("-b").arg("tests/data");
    cmd.arg("-o").arg(dir.path().join("product.msi"));
    cmd.assert().success();

    Ok(())
}
