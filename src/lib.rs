// Copyright (c) The github-activity-stats Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Weekly GitHub commit-activity aggregation for a team dashboard.

pub mod cache;
pub mod commands;
pub mod config;
pub mod contributors;
pub mod dispatch;
pub mod github;
pub mod identity;
pub mod server;
pub mod stats;
pub mod week;
