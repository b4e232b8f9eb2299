mod execution;
mod record;

pub use execution::Execution;
pub use record::Record;
