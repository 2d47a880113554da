//! HTTP endpoint for the walk.
//!
//! A single listener accepts device connections and feeds every framed
//! request through one [`SessionState`]. The session survives connection
//! churn: a device is free to reconnect mid-walk, the state machine only
//! cares about message order.

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

use cwmp_model::DataModel;
use cwmp_rpc::{CwmpRequest, HttpCodec, HttpRequest, HttpResponse, parse_request, serialize_response};

use crate::error::{Result, WalkError};
use crate::session::SessionState;
use crate::walk::Step;

/// What one HTTP request did to the session.
enum Outcome {
    /// Send this response and keep going.
    Reply(HttpResponse),
    /// Send the termination status; the walk is complete.
    Finished,
    /// Send a fault and abort the walk.
    Fatal(WalkError),
}

/// Bind `addr` and run one walk session to completion.
///
/// # Errors
///
/// Fails on bind/accept I/O errors or any session-fatal protocol error.
pub async fn run(addr: SocketAddr) -> Result<DataModel> {
    let listener = TcpListener::bind(addr).await?;
    serve(listener).await
}

/// Run one walk session on an already-bound listener, returning the
/// accumulated data model once the device has been walked to completion.
///
/// # Errors
///
/// Fails on accept I/O errors or any session-fatal protocol error.
pub async fn serve(listener: TcpListener) -> Result<DataModel> {
    let local = listener.local_addr()?;
    info!("ACS listening on http://{local}");
    info!("Waiting for CWMP Inform...");

    let mut session = SessionState::new();

    loop {
        let (stream, peer) = listener.accept().await?;
        debug!("connection from {peer}");

        if let Some(model) = drive_connection(&mut session, stream).await? {
            return Ok(model);
        }
        debug!("connection from {peer} closed, session still open");
    }
}

/// Serve requests on one connection until it closes, the walk finishes, or
/// a fatal error is replied. Returns the model once the walk is complete.
async fn drive_connection(
    session: &mut SessionState,
    stream: TcpStream,
) -> Result<Option<DataModel>> {
    let mut framed = Framed::new(stream, HttpCodec::new());

    while let Some(frame) = framed.next().await {
        let request = match frame {
            Ok(request) => request,
            Err(err) => {
                let err = WalkError::from(err);
                warn!("dropping connection: {err}");
                session.fail();
                framed.send(HttpResponse::fault(err.to_string())).await?;
                return Err(err);
            }
        };

        match handle_request(session, &request) {
            Outcome::Reply(response) => {
                framed.send(response).await?;
            }
            Outcome::Finished => {
                framed.send(HttpResponse::no_content()).await?;
                info!("session terminated, data model walk complete");
                let finished = std::mem::take(session);
                return Ok(Some(finished.into_model()));
            }
            Outcome::Fatal(err) => {
                framed.send(HttpResponse::fault(err.to_string())).await?;
                return Err(err);
            }
        }
    }

    Ok(None)
}

/// Translate one HTTP request into a session transition.
fn handle_request(session: &mut SessionState, request: &HttpRequest) -> Outcome {
    if !request.is_post() {
        warn!("rejecting {} {}", request.method, request.path);
        return Outcome::Reply(HttpResponse::not_found(format!(
            "CWMP File Not Found: {}",
            request.path
        )));
    }

    let message = if request.body.is_empty() {
        CwmpRequest::Empty
    } else if request.has_xml_content_type() {
        let body = match request.body_utf8() {
            Ok(body) => body,
            Err(err) => {
                session.fail();
                return Outcome::Fatal(err.into());
            }
        };
        match parse_request(body) {
            Ok(message) => message,
            Err(err) => {
                session.fail();
                return Outcome::Fatal(err.into());
            }
        }
    } else {
        session.fail();
        return Outcome::Fatal(WalkError::Malformed(format!(
            "invalid Content-Type: {}",
            request.content_type.as_deref().unwrap_or("<none>")
        )));
    };

    match session.process(message) {
        Ok(Step::Reply(response)) => {
            debug!("replying with {}", response.kind());
            Outcome::Reply(HttpResponse::xml(serialize_response(&response)))
        }
        Ok(Step::Terminate) => Outcome::Finished,
        Err(err) => Outcome::Fatal(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn post(body: &str, content_type: Option<&str>) -> HttpRequest {
        HttpRequest {
            method: "POST".to_string(),
            path: "/".to_string(),
            content_type: content_type.map(str::to_string),
            body: Bytes::copy_from_slice(body.as_bytes()),
        }
    }

    #[test]
    fn test_get_is_rejected_without_aborting() {
        let mut session = SessionState::new();
        let request = HttpRequest {
            method: "GET".to_string(),
            path: "/favicon.ico".to_string(),
            content_type: None,
            body: Bytes::new(),
        };

        let Outcome::Reply(response) = handle_request(&mut session, &request) else {
            panic!("expected a reply");
        };
        assert_eq!(response.status, 404);
        assert!(response.body.contains("/favicon.ico"));
        assert!(session.device_id().is_none());
    }

    #[test]
    fn test_non_xml_content_type_is_fatal() {
        let mut session = SessionState::new();
        let request = post("{}", Some("application/json"));

        let Outcome::Fatal(err) = handle_request(&mut session, &request) else {
            panic!("expected a fatal outcome");
        };
        assert!(matches!(err, WalkError::Malformed(_)));
        assert!(err.to_string().contains("application/json"));
    }

    #[test]
    fn test_empty_post_before_inform_faults() {
        let mut session = SessionState::new();
        let request = post("", None);

        let Outcome::Fatal(err) = handle_request(&mut session, &request) else {
            panic!("expected a fatal outcome");
        };
        assert!(matches!(err, WalkError::ProtocolSequence(_)));
    }

    #[test]
    fn test_unparseable_xml_is_fatal() {
        let mut session = SessionState::new();
        let request = post("<not-soap/>", Some("text/xml"));

        let Outcome::Fatal(err) = handle_request(&mut session, &request) else {
            panic!("expected a fatal outcome");
        };
        assert!(matches!(err, WalkError::Malformed(_)));
    }
}
