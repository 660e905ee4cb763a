// SPDX-License-Identifier: MIT

//! Agent development kit - the capability layer under the workflow engine

pub mod agent;
pub mod error;
pub mod model;
