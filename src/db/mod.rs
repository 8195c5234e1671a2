pub mod pool;
pub mod submissions;

pub use pool::create_pool;
pub use submissions::{NewSubmission, PgSubmissionStore, SubmissionStore};
