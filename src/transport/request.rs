//! Out-of-band requests as delivered by the transport.

use tokio::sync::oneshot;

use crate::error::ReplyError;

/// The answer to a request that wanted one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestReply {
    pub ok: bool,
    pub payload: Vec<u8>,
}

/// A typed, repliable control message.
///
/// Dropping an unanswered request is seen by the transport as a failure
/// reply.
#[derive(Debug)]
pub struct IncomingRequest {
    kind: String,
    want_reply: bool,
    payload: Vec<u8>,
    reply: Option<oneshot::Sender<RequestReply>>,
}

impl IncomingRequest {
    /// Build a request. The receiver is `Some` when `want_reply` is set.
    pub fn new(
        kind: impl Into<String>,
        want_reply: bool,
        payload: impl Into<Vec<u8>>,
    ) -> (Self, Option<oneshot::Receiver<RequestReply>>) {
        let (reply, rx) = if want_reply {
            let (tx, rx) = oneshot::channel();
            (Some(tx), Some(rx))
        } else {
            (None, None)
        };

        let request = Self {
            kind: kind.into(),
            want_reply,
            payload: payload.into(),
            reply,
        };
        (request, rx)
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn want_reply(&self) -> bool {
        self.want_reply
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Answer the request.
    ///
    /// A no-op when the sender did not ask for a reply. Only the first reply
    /// is delivered.
    pub fn reply(&mut self, ok: bool, payload: impl Into<Vec<u8>>) -> Result<(), ReplyError> {
        if !self.want_reply {
            return Ok(());
        }
        let tx = self.reply.take().ok_or(ReplyError::AlreadyReplied)?;
        tx.send(RequestReply {
            ok,
            payload: payload.into(),
        })
        .map_err(|_| ReplyError::Closed)
    }
}
