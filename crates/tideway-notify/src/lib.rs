// SPDX-FileCopyrightText: 2026 Tideway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification channel adapters for the Tideway inference pipeline.
//!
//! Two implementations of the [`NotificationChannel`] fan-out:
//! [`BroadcastChannel`] for an embedded relay (and tests), and
//! [`WebhookChannel`] for POSTing events to an external relay service.
//!
//! [`NotificationChannel`]: tideway_core::NotificationChannel

pub mod broadcast;
pub mod webhook;

pub use broadcast::BroadcastChannel;
pub use webhook::WebhookChannel;
