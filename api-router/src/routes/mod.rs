pub mod documents;
pub mod liveness;
pub mod prompt;
pub mod readiness;
pub mod sync;
pub mod upload;
