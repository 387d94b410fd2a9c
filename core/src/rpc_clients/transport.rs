use alloy::{
    rpc::json_rpc::{RequestPacket, ResponsePacket},
    transports::{
        TransportError, TransportErrorKind, TransportFut, TransportResult,
        http::reqwest::{self, Url, header::HeaderMap},
    },
};
use std::task;
use tower::Service;
use tracing::{Instrument, debug, debug_span, trace};

/// JSON-RPC over HTTP on a shared reqwest client, adding a fixed set of
/// headers (API keys and the like) to every request.
#[derive(Clone, Debug)]
pub struct HeaderInjectingTransport {
    client: reqwest::Client,
    url: Url,
    headers: HeaderMap,
}

impl HeaderInjectingTransport {
    pub fn new(client: reqwest::Client, url: Url, headers: HeaderMap) -> Self {
        Self {
            client,
            url,
            headers,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn do_request(self, req: RequestPacket) -> TransportResult<ResponsePacket> {
        let resp = self
            .client
            .post(self.url)
            .headers(self.headers)
            .json(&req)
            .send()
            .await
            .map_err(TransportErrorKind::custom)?;

        let status = resp.status();
        debug!(?status, "received response from rpc node");

        let body = resp.bytes().await.map_err(TransportErrorKind::custom)?;
        trace!(body = ?String::from_utf8_lossy(&body), "rpc response body");

        if !status.is_success() {
            return Err(TransportErrorKind::http_error(
                status.as_u16(),
                String::from_utf8_lossy(&body).into_owned(),
            ));
        }

        serde_json::from_slice(&body)
            .map_err(|err| TransportError::deser_err(err, String::from_utf8_lossy(&body)))
    }
}

impl Service<RequestPacket> for HeaderInjectingTransport {
    type Response = ResponsePacket;
    type Error = TransportError;
    type Future = TransportFut<'static>;

    #[inline]
    fn poll_ready(&mut self, _cx: &mut task::Context<'_>) -> task::Poll<Result<(), Self::Error>> {
        task::Poll::Ready(Ok(()))
    }

    #[inline]
    fn call(&mut self, req: RequestPacket) -> Self::Future {
        let this = self.clone();
        let span = debug_span!("rpc_request", url = %this.url);
        Box::pin(this.do_request(req).instrument(span))
    }
}

/// Hands out transports that all share one connection pool.
#[derive(Clone, Debug)]
pub struct SharedClientTransportBuilder {
    shared_client: reqwest::Client,
}

impl SharedClientTransportBuilder {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            shared_client: client,
        }
    }

    pub fn with_headers(&self, url: Url, headers: HeaderMap) -> HeaderInjectingTransport {
        HeaderInjectingTransport::new(self.shared_client.clone(), url, headers)
    }
}
