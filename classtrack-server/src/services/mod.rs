//! Business logic services

pub mod billing;
pub mod engine;
pub mod matching;
pub mod meet_client;
pub mod monitor;
pub mod reconciler;

pub use billing::BillingService;
pub use engine::DurationEngine;
pub use meet_client::{HttpMeetProvider, MeetProvider};
pub use monitor::MeetingMonitor;
pub use reconciler::Reconciler;
