//! Test suites for the session continuity cache.

mod harness;
