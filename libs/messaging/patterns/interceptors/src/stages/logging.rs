//! Audit trail stage

use crate::chain::Interceptor;
use crate::context::{keys, InterceptorContext, Verdict};
use tracing::trace;

/// Audit stage: records a one-line summary under `log`. Never rejects.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingInterceptor;

impl LoggingInterceptor {
    pub fn new() -> Self {
        Self
    }
}

impl Interceptor for LoggingInterceptor {
    fn name(&self) -> &'static str {
        "logging"
    }

    fn process(&self, context: &mut InterceptorContext) -> Verdict {
        let message = context.message();
        let summary = format!(
            "Processing message: Type={}, Seq={}, Client={}, Priority={}",
            u8::from(message.message_type()),
            message.sequence_number(),
            message.client_id(),
            u8::from(message.priority()),
        );
        trace!(
            msg_type = message.message_type().name(),
            seq = message.sequence_number(),
            client_id = message.client_id(),
            "{}",
            summary
        );
        context.set(keys::LOG, summary);
        Verdict::Accept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use types::{Message, Priority};

    #[test]
    fn test_summary_format() {
        let mut message = Message::heartbeat().with_priority(Priority::Critical).with_client_id(42);
        message.set_sequence_number(7);
        let mut ctx = InterceptorContext::new(Arc::new(message));

        assert_eq!(LoggingInterceptor.process(&mut ctx), Verdict::Accept);
        assert_eq!(
            ctx.get(keys::LOG),
            Some("Processing message: Type=6, Seq=7, Client=42, Priority=4")
        );
    }
}
