// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

pub mod analyze;

pub const CRATE_NAME: &str = "amend-cli";
