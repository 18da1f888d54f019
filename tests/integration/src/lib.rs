//! Cross-crate integration tests for prompt-manager
//!
//! These exercise the complete flow: configuration, source load, full
//! reload, tool registration, invocation through the protocol server, and
//! hot reload.

#[cfg(test)]
mod common;
#[cfg(test)]
mod scenario_tests;
#[cfg(test)]
mod watch_tests;
