// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The report writer: renders the group store into a navigable,
//! incrementally-updated Markdown tree under the run directory.

mod group_doc;
mod index_doc;
mod writer;

pub use index_doc::RunStatus;
pub use writer::ReportWriter;
