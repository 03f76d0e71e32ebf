pub mod aggregation;
pub mod consent;
pub mod extraction;
pub mod locator;
pub mod message;
pub mod navigation;
pub mod parsing;
pub mod period;
pub mod policy;
pub mod watch_service;
