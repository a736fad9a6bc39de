//! Custom Axum extractors.

pub mod user_id;

pub use user_id::{CallerId, USER_ID_HEADER};
