// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Structured access to the wire format carried over trun's event channel.
//!
//! This crate is the single source of truth for the event shapes emitted by
//! adapters and native-stream parsers and consumed by the host orchestrator.
//! It intentionally has few dependencies so that it stays easy to embed
//! inside adapter payloads that ship in other ecosystems' package managers.
//!
//! Every event shares the envelope `{"eventType": ..., "payload": ...}`. New
//! optional fields may be added to any payload in the future; consumers must
//! ignore fields they don't recognize (`serde`'s default behavior already
//! gives us this for free as long as we don't add `deny_unknown_fields`).

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Millisecond-resolution duration, as emitted by every runner family.
pub type DurationMillis = u64;

/// The status of a single test case.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CaseStatus {
    Pass,
    Fail,
    Skip,
}

/// The status of a group, as reported over the wire.
///
/// `NoTests` is accepted only on `testGroupResult` events; it is a
/// Runner-Definition-only signal used by runners that can tell a subunit had
/// no tests at all (for example a Go package with no `_test.go` files).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GroupResultStatus {
    Pass,
    Fail,
    Skip,
    NoTests,
}

/// Which stdio stream a [`GroupOutputPayload`] chunk came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// An error attached to a failed test case or a group's setup failure.
#[derive(Clone, Debug, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<ErrorLocation>,
}

impl ErrorPayload {
    pub fn from_message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }
}

/// Source location referenced by an [`ErrorPayload`].
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorLocation {
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
}

/// Recursive or direct statistics carried on a `testGroupResult` event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub passed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub total: u64,
}

impl Totals {
    pub fn add(&mut self, status: CaseStatus) {
        self.total += 1;
        match status {
            CaseStatus::Pass => self.passed += 1,
            CaseStatus::Fail => self.failed += 1,
            CaseStatus::Skip => self.skipped += 1,
        }
    }
}

/// Arbitrary metadata accompanying a `testGroupDiscovered` event.
///
/// Kept as a raw JSON value: the set of useful metadata keys varies by
/// runner family (a Jest `describe` block has no analog of Go build tags),
/// and this crate should not need a release for every new key a Runner
/// Definition wants to attach.
pub type GroupMetadata = serde_json::Map<String, serde_json::Value>;

/// Payload of `testGroupDiscovered`.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDiscoveredPayload {
    pub group_name: SmolStr,
    pub parent_names: Vec<SmolStr>,
    #[serde(default)]
    pub metadata: GroupMetadata,
}

/// Payload of `testGroupStart`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupStartPayload {
    pub group_name: SmolStr,
    pub parent_names: Vec<SmolStr>,
}

/// Payload of `testGroupResult`.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupResultPayload {
    pub group_name: SmolStr,
    pub parent_names: Vec<SmolStr>,
    pub status: GroupResultStatus,
    pub duration: DurationMillis,
    #[serde(default)]
    pub totals: Totals,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup_failed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorPayload>,
}

/// Payload of `testCase`.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCasePayload {
    pub test_name: SmolStr,
    /// The first element is the file or top-level group this case belongs
    /// to; later elements are nested suite/describe names.
    pub parent_names: Vec<SmolStr>,
    pub status: CaseStatus,
    pub duration: DurationMillis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
}

/// Payload of `groupStdout` / `groupStderr`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupOutputPayload {
    pub group_name: SmolStr,
    pub parent_names: Vec<SmolStr>,
    pub chunk: String,
}

/// Payload of `collectionError`.
#[derive(Clone, Debug, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionErrorPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// One line of the event channel: `{"eventType": ..., "payload": ...}`.
///
/// `serde`'s internally-tagged representation is used so the wire format
/// matches the shape every adapter (regardless of host language) naturally
/// produces: a flat object with a discriminator field.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "eventType", content = "payload", rename_all = "camelCase")]
pub enum Event {
    TestGroupDiscovered(GroupDiscoveredPayload),
    TestGroupStart(GroupStartPayload),
    TestGroupResult(GroupResultPayload),
    TestCase(TestCasePayload),
    GroupStdout(GroupOutputPayload),
    GroupStderr(GroupOutputPayload),
    CollectionStart,
    CollectionFinish,
    CollectionError(CollectionErrorPayload),
    /// Legitimate end-of-stream marker. Must never be logged as an unknown
    /// or erroneous event type.
    RunComplete,
}

impl Event {
    /// Serializes this event as a single LF-terminated line suitable for a
    /// single atomic append to the event channel file.
    pub fn to_line(&self) -> serde_json::Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }

    /// Parses a single line from the event channel. The caller is
    /// responsible for stripping the trailing newline.
    pub fn from_line(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }
}
