// SPDX-License-Identifier: MIT

//! Application layer: the workflow engine and the HTTP server around it

pub mod server;
pub mod workflow;
