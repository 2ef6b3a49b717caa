//! Real-time notification channel: transport, session, dispatch, client.

pub mod client;
pub mod dispatch;
pub mod session;
pub mod transport;
