pub mod record;
pub mod store;

pub use record::{TickOutcome, UsageRecord};
pub use store::UsageStore;
