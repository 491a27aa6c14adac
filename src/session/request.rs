//! The request type handed to handlers.

use tokio::sync::mpsc;

use crate::error::ReplyError;
use crate::transport::IncomingRequest;

/// Stream of out-of-band requests for one session.
pub type Requests = mpsc::Receiver<Request>;

/// An out-of-band message addressed to a session, e.g. a `"shell"` request.
#[derive(Debug)]
pub struct Request {
    inner: IncomingRequest,
}

impl Request {
    /// Request type tag.
    pub fn kind(&self) -> &str {
        self.inner.kind()
    }

    pub fn want_reply(&self) -> bool {
        self.inner.want_reply()
    }

    pub fn payload(&self) -> &[u8] {
        self.inner.payload()
    }

    /// Accept or reject the request. Only the first call is delivered.
    pub fn reply(&mut self, ok: bool, payload: impl Into<Vec<u8>>) -> Result<(), ReplyError> {
        self.inner.reply(ok, payload)
    }

    /// Unwrap back into the transport's request type.
    pub fn into_inner(self) -> IncomingRequest {
        self.inner
    }
}

impl From<IncomingRequest> for Request {
    fn from(inner: IncomingRequest) -> Self {
        Self { inner }
    }
}
