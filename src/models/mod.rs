pub mod job;
pub mod seen;
