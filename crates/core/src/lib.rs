#![forbid(unsafe_code)]

pub mod analytics;
pub mod cohort;
pub mod curriculum;
pub mod error;
pub mod graph;
pub mod learner;
pub mod model;
pub mod quiz;
pub mod selector;
pub mod store;
pub mod time;
pub mod trajectory;

pub use time::Clock;
