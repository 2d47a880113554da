//! CWMP wire codec and transport framing for the cwmpwalk ACS.
//!
//! # Architecture
//!
//! - [`protocol`]: typed CWMP message shapes ([`CwmpRequest`],
//!   [`CwmpResponse`] and their payload structs)
//! - [`soap`]: SOAP/XML envelope parsing and serialization
//! - [`http`]: HTTP/1.1 request/response framing over a stream socket
//!
//! The split keeps the session state machine free of any XML or HTTP
//! detail: it consumes [`CwmpRequest`] values and produces [`CwmpResponse`]
//! values, and everything else happens here.

pub mod http;
pub mod protocol;
pub mod soap;

pub use http::{CodecError, HttpCodec, HttpRequest, HttpResponse};
pub use protocol::{CwmpRequest, CwmpResponse, DeviceId, Inform, ParameterInfo, ParameterValue};
pub use soap::{SoapError, parse_request, serialize_response};
