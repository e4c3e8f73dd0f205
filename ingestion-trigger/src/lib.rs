#![allow(clippy::missing_docs_in_private_items)]

pub mod event;
pub mod trigger;

pub use event::{idempotency_token, ChangeEvent, ChangeKind, ObjectChangeNotification};
pub use trigger::{IngestionTrigger, SyncOutcome, TriggerSource};
