pub mod transitions;

pub use transitions::{TransitionError, TransitionOutcome, TransitionResult, TransitionService};
