// Domain services

pub mod state_inferrer;

pub use state_inferrer::*;
