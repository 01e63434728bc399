mod notify;
mod policy;
pub(crate) mod sql_builder;
mod table_io;

pub use notify::{LogNotifier, Notification, Notifier, RecordingNotifier};
pub use policy::{Operation, WriteDisposition, WritePolicy};
pub use table_io::{Outcome, Request, TableIo, WriteReport};
