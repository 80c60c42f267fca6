pub mod message;
pub mod util;
