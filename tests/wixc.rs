// Tests for wixc
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
use std::process::Command;

#[test]
fn compile_invalid_argument() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("wixc")?;
    cmd.arg("-q");
    cmd.assert()
        .failure()
        .code(exitcode::USAGE)
        .stderr(predicate::str::contains("Unrecognized option:"));

    Ok(())
}

#[test]
fn compile_missing_source() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("wixc")?;
    cmd.assert()
        .failure()
        .code(exitcode::USAGE)
        .stderr(predicate::str::contains("SOURCE"));

    Ok(())
}

#[test]
fn compile_invalid_platform() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("wixc")?;
    cmd.arg("-a").arg("sparc").arg("tests/data/product.wxs");
    cmd.assert().failure().code(exitcode::USAGE);

    Ok(())
}

#[test]
fn compile_source_does_not_exist() -> Result<(), Box<dyn std::error::Error>> {
    let out = tempfile::tempdir()?;

    let mut cmd = Command::cargo_bin("wixc")?;
    cmd.arg("tests/data/does-not-exist.wxs");
    cmd.arg("-o").arg(out.path().join("x.wixobj"));
    cmd.assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("unable to read"))
        .stdout(predicate::str::contains("fatal: failed to compile"));

    Ok(())
}

#[test]
fn compile_malformed_source() -> Result<(), Box<dyn std::error::Error>> {
    let out = tempfile::tempdir()?;

    let mut cmd = Command::cargo_bin("wixc")?;
    cmd.arg("tests/data/malformed.wxs");
    cmd.arg("-o").arg(out.path().join("malformed.wixobj"));
    cmd.assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("malformed XML"))
        .stdout(predicate::str::contains("tests/data/malformed.wxs"));

    assert!(!out.path().join("malformed.wixobj").exists());

    Ok(())
}

#[test]
fn compile_writes_object_file() -> Result<(), Box<dyn std::error::Error>> {
    let out = tempfile::tempdir()?;
    let dest = out.path().join("product.wixobj");

    let mut cmd = Command::cargo_bin("wixc")?;
    cmd.arg("-d").arg("Version=1.0.0");
    cmd.arg("tests/data/product.wxs");
    cmd.arg("-o").arg(&dest);
    cmd.assert().success();

    let obj = fs::read_to_string(dest)?;
    assert!(obj.contains("<wixObject"));
    assert!(obj.contains("1.0.0"));
    assert!(!obj.contains("$(var.Version)"));

    Ok(())
}

#[test]
fn compile_many_sources_into_directory() -> Result<(), Box<dyn std::error::Error>> {
    let out = tempfile::tempdir()?;

    let mut cmd = Command::cargo_bin("wixc")?;
    cmd.arg("tests/data/product.wxs");
    cmd.arg("tests/data/unresolved.wxs");
    cmd.arg("-o").arg(out.path());
    cmd.assert().success();

    assert!(out.path().join("product.wixobj").exists());
    assert!(out.path().join("unresolved.wixobj").exists());

    Ok(())
}
