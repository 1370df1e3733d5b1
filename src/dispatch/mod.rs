pub mod service;

pub use service::{DispatchError, DispatchOutcome, DispatchService};
