// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Run ID generation.
//!
//! A [`RunId`] identifies one execution of the tool and doubles as the name
//! of its run directory. It's of the form
//! `<UTC timestamp YYYYMMDDThhmmss>-<adjective>-<character>`; uniqueness is
//! best-effort via the timestamp plus a random word pair, not a hard
//! guarantee (two runs started within the same second could in principle
//! collide, which is acceptable: the orchestrator creates the run directory
//! with `create_dir` and treats `AlreadyExists` as a signal to redraw the
//! word pair, see [`RunId::generate`]).

use chrono::Utc;
use rand::Rng;
use std::fmt;

const ADJECTIVES: &[&str] = &[
    "ancient", "blazing", "calm", "daring", "eager", "frosty", "gentle", "hasty", "idle",
    "jovial", "keen", "lively", "mellow", "nimble", "opal", "patient", "quiet", "restless",
    "stoic", "tidy", "urgent", "vivid", "wary", "xenial", "yellow", "zealous",
];

const CHARACTERS: &[&str] = &[
    "badger", "civet", "dingo", "egret", "falcon", "gibbon", "heron", "ibis", "jackal", "kite",
    "lemur", "marten", "newt", "otter", "panther", "quokka", "raven", "stoat", "tapir", "urchin",
    "vole", "weasel", "xerus", "yak", "zebu",
];

/// A unique-enough identifier for one run.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RunId(String);

impl RunId {
    /// Generates a new run ID using the current UTC time.
    pub fn generate() -> Self {
        Self::generate_with_rng(&mut rand::rng())
    }

    pub(crate) fn generate_with_rng(rng: &mut impl Rng) -> Self {
        let timestamp = Utc::now().format("%Y%m%dT%H%M%S");
        let adjective = ADJECTIVES[rng.random_range(0..ADJECTIVES.len())];
        let character = CHARACTERS[rng.random_range(0..CHARACTERS.len())];
        Self(format!("{timestamp}-{adjective}-{character}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
