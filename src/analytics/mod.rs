// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod engine;
pub mod metrics;
pub mod redaction;
pub mod reports;

pub use engine::{AggregateOptions, AggregateSummary, AggregationEngine, Window};
pub use redaction::{redact, RedactionPolicy};
pub use reports::{authorize, BreakdownSelector, ReportAssembler};
