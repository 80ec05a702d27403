// Copyright 2026 Recon Contributors
// SPDX-License-Identifier: Apache-2.0

//! Recon runtime library — tactic orchestration and state-impact assessment
//! for live web sessions.
//!
//! This library crate exposes the core modules for integration testing.

#![allow(clippy::new_without_default)]

pub mod audit;
pub mod catalog;
pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod diff;
pub mod executor;
pub mod impact;
pub mod mission;
pub mod probes;
pub mod progress;
pub mod report;
pub mod session;
pub mod snapshot;
