// Installer toolset in Rust
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

//! An installer toolset that turns declarative XML package sources into
//!   installer databases.
//!
//! The toolset is a series of lowering operations,
//!   each of which consumes the output of the one before it:
//!
//!   1. The [compiler](compile) turns each normalized source document
//!        into an [`Intermediate`](ir::Intermediate) of
//!        [`Section`](ir::Section)s;
//!   2. the [librarian](librarian) may bundle compiled intermediates into
//!        a reusable library;
//!   3. the [linker](ld) combines intermediates and libraries into a
//!        single intermediate with every reference resolved;
//!   4. the [resolver](resolve) substitutes variables and locates files,
//!        deferring what can only be known at bind time; and
//!   5. the [binder](bind) computes bind-time values and hands the result
//!        to a backend that writes the final output.
//!
//! Diagnostics from every stage accumulate in a shared
//!   [`Messaging`](diagnose::Messaging) sink;
//!     see [`pipeline`] for how the stages are sequenced.

pub mod global;

pub mod bind;
pub mod bindpath;
pub mod compile;
pub mod diagnose;
pub mod ext;
pub mod fs;
pub mod ir;
pub mod ld;
pub mod librarian;
pub mod obj;
pub mod pipeline;
pub mod resolve;
pub mod schema;
pub mod span;
