//! Typed CWMP message shapes.
//!
//! The ACS consumes three device-to-server messages (Inform, the two
//! discovery responses) plus the zero-length acknowledgement POST, and
//! produces a small fixed set of server-to-device messages. The XML
//! scaffolding around these shapes lives in [`crate::soap`]; the state
//! machine only ever sees these types.

/// Device identity announced by the Inform: `OUI` and `SerialNumber`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceId {
    pub oui: String,
    pub serial_number: String,
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.oui, self.serial_number)
    }
}

/// A `Name`/`Value` pair, as carried by Inform and
/// `GetParameterValuesResponse` parameter lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterValue {
    pub name: String,
    pub value: String,
}

/// A `Name`/`Writable` pair, as carried by `GetParameterNamesResponse`
/// parameter lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterInfo {
    pub name: String,
    pub writable: bool,
}

/// The Inform RPC opening a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inform {
    pub device_id: DeviceId,
    pub parameter_list: Vec<ParameterValue>,
    /// `cwmp:ID` header value, echoed back in the InformResponse.
    pub correlation_id: Option<String>,
}

/// An inbound device message, one per HTTP POST.
///
/// Repeated wire elements are always normalized to sequences by the codec;
/// a single `ParameterInfoStruct` and a list of them both arrive as a `Vec`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CwmpRequest {
    Inform(Inform),
    /// The zero-length POST the device sends after the InformResponse.
    Empty,
    GetParameterNamesResponse { parameter_list: Vec<ParameterInfo> },
    GetParameterValuesResponse { parameter_list: Vec<ParameterValue> },
}

impl CwmpRequest {
    /// Message name for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            CwmpRequest::Inform(_) => "Inform",
            CwmpRequest::Empty => "<EMPTY>",
            CwmpRequest::GetParameterNamesResponse { .. } => "GetParameterNamesResponse",
            CwmpRequest::GetParameterValuesResponse { .. } => "GetParameterValuesResponse",
        }
    }
}

/// An outbound server message, one per HTTP response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CwmpResponse {
    InformResponse {
        /// Correlation id from the Inform header, echoed with
        /// `mustUnderstand="1"` when present.
        correlation_id: Option<String>,
    },
    GetParameterNames {
        parameter_path: String,
        next_level: bool,
    },
    GetParameterValues {
        parameter_names: Vec<String>,
    },
}

impl CwmpResponse {
    #[must_use]
    pub fn inform_response(correlation_id: Option<String>) -> Self {
        CwmpResponse::InformResponse { correlation_id }
    }

    /// A name-discovery request scoped to `parameter_path`, asking for the
    /// immediate children only.
    #[must_use]
    pub fn get_parameter_names(parameter_path: impl Into<String>) -> Self {
        CwmpResponse::GetParameterNames {
            parameter_path: parameter_path.into(),
            next_level: true,
        }
    }

    #[must_use]
    pub fn get_parameter_values(parameter_names: Vec<String>) -> Self {
        CwmpResponse::GetParameterValues { parameter_names }
    }

    /// Message name for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            CwmpResponse::InformResponse { .. } => "InformResponse",
            CwmpResponse::GetParameterNames { .. } => "GetParameterNames",
            CwmpResponse::GetParameterValues { .. } => "GetParameterValues",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_id_display() {
        let id = DeviceId {
            oui: "001A2B".to_string(),
            serial_number: "SN123".to_string(),
        };
        assert_eq!(id.to_string(), "001A2B-SN123");
    }

    #[test]
    fn test_request_kind_names() {
        assert_eq!(CwmpRequest::Empty.kind(), "<EMPTY>");
        let gpn = CwmpRequest::GetParameterNamesResponse {
            parameter_list: vec![],
        };
        assert_eq!(gpn.kind(), "GetParameterNamesResponse");
    }

    #[test]
    fn test_get_parameter_names_requests_next_level_only() {
        let req = CwmpResponse::get_parameter_names("Device.");
        let CwmpResponse::GetParameterNames {
            parameter_path,
            next_level,
        } = req
        else {
            panic!("expected GetParameterNames");
        };
        assert_eq!(parameter_path, "Device.");
        assert!(next_level);
    }
}
