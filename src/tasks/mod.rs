pub mod body;
pub mod fake_work;

pub use body::body_from_args;
pub use fake_work::{dot_count, work_duration, FakeWork, WORK_UNIT};
