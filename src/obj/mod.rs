// Object file construction and processing
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

//! Object file construction and processing.
//!
//! An _object file_ holds a persisted [`Intermediate`](crate::ir::Intermediate)
//!   so that it can be exchanged between invocations of the toolset.
//! The same format is used for compiler output (`.wixobj`),
//!   libraries (`.wixlib`),
//!   and linked or resolved output (`.wixout`);
//!     they are distinguished by the level recorded in the file.

pub mod wixobj;
