#![allow(dead_code, unused_imports)]

pub mod builders;
pub mod recording_logger;
pub mod scripted_services;
pub mod strategies;

pub use builders::*;
pub use recording_logger::*;
pub use scripted_services::*;
pub use strategies::*;
