// SPDX-License-Identifier: MIT

//! confluence-rs - concurrent fan-out/fan-in workflows over chat agents
//!
//! The crate is split into two layers:
//! - [adk] - agent development kit: the `Agent` and `Model` traits plus
//!   the OpenAI-compatible chat client
//! - [confluence] - the workflow engine (graph, builder, aggregation
//!   barrier, execution engine) and the HTTP server built on it

pub mod adk;
pub mod confluence;
