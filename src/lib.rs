// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! HAR 1.2 capture of outbound HTTP calls.
//!
//! A [`HarExporter`] owns the archive. Each request gets an
//! [`Interceptor`](interceptor::Interceptor) that turns lifecycle events into
//! one entry, and [`TracingClient`] drives those events for requests it sends
//! itself. [`HarExporter::export`] writes the archive as JSON.

pub mod client;
pub mod config;
pub mod content;
pub mod exporter;
pub mod har;
pub mod helpers;
pub mod interceptor;
pub mod timing;

pub use client::TracingClient;
pub use exporter::HarExporter;

#[cfg(test)]
mod test_helpers;
