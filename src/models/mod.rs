pub mod entry;
pub mod event;
pub mod profile;
pub mod queue;

pub use entry::{EntryStatus, QueueEntry};
pub use event::QueueEvent;
pub use profile::{Account, AccountKind, Company, Customer, Session};
pub use queue::Queue;
