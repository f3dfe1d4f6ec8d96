//! Consumer service contract

use crate::Result;
use std::sync::Arc;
use types::Message;

/// A named consumer of dispatched messages.
///
/// `start` and `stop` must leave the service fully started or fully stopped;
/// `process_message` should return within microseconds and must drop the
/// message when the service is not running.
pub trait Service: Send + Sync {
    fn name(&self) -> &str;

    fn start(&self) -> Result<()>;

    fn stop(&self);

    fn is_running(&self) -> bool;

    fn process_message(&self, message: Arc<Message>);
}
