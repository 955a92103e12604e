//! Watches a marketplace collection for new sale listings and announces
//! each one exactly once through a Discord webhook.

pub mod api;
pub mod core;
pub mod monitoring;
pub mod notification;
