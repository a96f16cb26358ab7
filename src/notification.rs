mod email;
mod message;

pub use email::{Dispatch, Email};
pub use message::Message;

#[cfg(test)]
pub(crate) use email::tests::closed_port;
#[cfg(test)]
pub(crate) use message::tests::test_config;
