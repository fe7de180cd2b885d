pub mod client;
pub mod link;
pub mod resultset;
pub mod types;

mod util;
