#![allow(dead_code)]

use serde::{Deserialize, Serialize};
use tickbus::Signal;

/// Closed signal set used across the integration suites.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TestSignal {
    Keep { id: String, ts: u64, value: u32 },
    Drop { id: String, ts: u64 },
    Note { id: String, ts: u64, body: String },
}

impl Signal for TestSignal {
    fn kind(&self) -> &str {
        match self {
            TestSignal::Keep { .. } => "keep",
            TestSignal::Drop { .. } => "drop",
            TestSignal::Note { .. } => "note",
        }
    }

    fn id(&self) -> &str {
        match self {
            TestSignal::Keep { id, .. }
            | TestSignal::Drop { id, .. }
            | TestSignal::Note { id, .. } => id,
        }
    }

    fn ts(&self) -> u64 {
        match self {
            TestSignal::Keep { ts, .. }
            | TestSignal::Drop { ts, .. }
            | TestSignal::Note { ts, .. } => *ts,
        }
    }
}

pub fn keep(id: &str, ts: u64, value: u32) -> TestSignal {
    TestSignal::Keep {
        id: id.to_string(),
        ts,
        value,
    }
}

pub fn dropped(id: &str, ts: u64) -> TestSignal {
    TestSignal::Drop {
        id: id.to_string(),
        ts,
    }
}

pub fn note(id: &str, ts: u64, body: &str) -> TestSignal {
    TestSignal::Note {
        id: id.to_string(),
        ts,
        body: body.to_string(),
    }
}
