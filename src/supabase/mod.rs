//! Content store integration: raw wire types, the REST client, and the
//! normalized domain types consumers see.

pub mod api_types;
pub mod client;
pub mod types;
