pub mod convert;
pub mod error;
pub mod messages;
pub mod request_id;
pub mod types;
