//! The three atomic protocol machines.

pub mod receiver;
pub mod sender;
pub mod subnet;

pub use receiver::Receiver;
pub use sender::Sender;
pub use subnet::{Subnet, SubnetParams};
