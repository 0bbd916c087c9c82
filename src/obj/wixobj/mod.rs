// wixobj object files
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

//! `wixobj` object files.
//!
//! An object file is an XML document whose root records the format
//!   version before anything else:
//!
//! ```xml
//! <wixObject version="4" id="..." level="compiled">
//!   <definitions>
//!     <definition name="Component" version="1" fields="5" />
//!   </definitions>
//!   <sources><source path="product.wxs" /></sources>
//!   <files><file path="product.wxs" /></files>
//!   <section type="product" compilationId="...">
//!     <symbol table="Component" id="Main" access="public" loc="0:12">
//!       <f t="guid"><a>INSTALLFOLDER</a><a>app.exe</a></f>
//!       <f t="s">INSTALLFOLDER</f>
//!       <f t="n">0</f>
//!       <f />
//!       <f t="s">App</f>
//!     </symbol>
//!     <ref table="File" id="App" kind="simple" loc="0:13" />
//!   </section>
//!   <localization culture="en-us" codepage="1252">
//!     <string id="Title" overridable="no" loc="1:3">Example</string>
//!   </localization>
//!   <embedded uri="..." index="0" name="app.exe">TVqQAAMA...</embedded>
//! </wixObject>
//! ```
//!
//! Fields are positional,
//!   in the order declared by their definition.
//! Source locations are compacted into the `files` table and referenced
//!   from `loc` attributes as `index:line`.
//!
//! The reader validates the version,
//!   then the level,
//!   then the `definitions` header against the
//!   [`SchemaRegistry`](crate::schema::SchemaRegistry),
//!     before decoding any symbol.
//! Failures of those checks produce
//!   [`IntermediateError::UnexpectedFileFormat`];
//!     anything else that is not well-formed produces
//!     [`IntermediateError::CorruptFile`].

mod reader;
mod writer;

pub use reader::{read, WixobjReader};
pub use writer::{write, WixobjWriter};

use crate::ir::IntermediateError;

pub type Result<T = ()> = std::result::Result<T, IntermediateError>;

/// Field value type markers.
mod tag {
    pub const STR: &str = "s";
    pub const NUM: &str = "n";
    pub const TEMPLATE: &str = "tpl";
    pub const PATH: &str = "path";
    pub const EMBED: &str = "embed";
    pub const GENERATED_ID: &str = "id";
    pub const GUID: &str = "guid";
}
