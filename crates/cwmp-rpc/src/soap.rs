//! SOAP envelope codec for CWMP messages.
//!
//! Inbound envelopes are parsed with `roxmltree` into the typed shapes in
//! [`crate::protocol`]; the handful of outbound envelopes the ACS produces
//! are serialized from fixed templates. Namespace handling accepts any of
//! the cwmp-1-0/1-1/1-2 URNs on inbound messages and emits cwmp-1-0.
//!
//! Normalization of repeated elements happens here: a single
//! `ParameterInfoStruct`/`ParameterValueStruct` and a sequence of them both
//! come out as a `Vec`, so the state machine never shape-checks.

use roxmltree::{Document, Node};

use crate::protocol::{
    CwmpRequest, CwmpResponse, DeviceId, Inform, ParameterInfo, ParameterValue,
};

const SOAP_ENV_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
const CWMP_NAMESPACES: [&str; 3] = [
    "urn:dslforum-org:cwmp-1-0",
    "urn:dslforum-org:cwmp-1-1",
    "urn:dslforum-org:cwmp-1-2",
];

/// Errors raised while decoding an inbound envelope.
#[derive(Debug, thiserror::Error)]
pub enum SoapError {
    /// Not well-formed XML.
    #[error("XML error: {0}")]
    Xml(#[from] roxmltree::Error),

    /// Well-formed XML with a required field missing or the wrong shape.
    #[error("malformed CWMP message: {0}")]
    Malformed(String),

    /// A body element that is not one of the recognized RPCs.
    #[error("unsupported CWMP RPC: {0}")]
    UnsupportedRpc(String),
}

fn is_cwmp(node: Node<'_, '_>) -> bool {
    node.tag_name()
        .namespace()
        .is_some_and(|ns| CWMP_NAMESPACES.contains(&ns))
}

fn element_child<'a>(node: Node<'a, 'a>, name: &str) -> Option<Node<'a, 'a>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

fn child_text(node: Node<'_, '_>, name: &str) -> Option<String> {
    element_child(node, name).map(|n| n.text().unwrap_or_default().to_string())
}

fn require_text(node: Node<'_, '_>, name: &str, context: &str) -> Result<String, SoapError> {
    child_text(node, name).ok_or_else(|| SoapError::Malformed(format!("{context} missing {name}")))
}

/// The Writable spellings treated as true; anything else is false.
fn writable_from_str(value: &str) -> bool {
    matches!(value, "true" | "True" | "1")
}

/// Decode a non-empty inbound POST body into a typed CWMP message.
///
/// # Errors
///
/// Returns [`SoapError::Xml`] for malformed XML, [`SoapError::Malformed`]
/// when the envelope or a required field is missing, and
/// [`SoapError::UnsupportedRpc`] for body elements other than Inform and
/// the two discovery responses.
pub fn parse_request(body: &str) -> Result<CwmpRequest, SoapError> {
    let document = Document::parse(body)?;
    let envelope = document.root_element();

    if envelope.tag_name().name() != "Envelope"
        || envelope.tag_name().namespace() != Some(SOAP_ENV_NS)
    {
        return Err(SoapError::Malformed(
            "expected a SOAP Envelope root element".to_string(),
        ));
    }

    let soap_body = envelope
        .children()
        .find(|n| n.is_element() && n.tag_name().name() == "Body")
        .ok_or_else(|| SoapError::Malformed("envelope has no SOAP Body".to_string()))?;

    let rpc = soap_body
        .children()
        .find(|n| n.is_element())
        .ok_or_else(|| SoapError::Malformed("SOAP Body is empty".to_string()))?;

    if !is_cwmp(rpc) {
        return Err(SoapError::UnsupportedRpc(rpc.tag_name().name().to_string()));
    }

    match rpc.tag_name().name() {
        "Inform" => parse_inform(envelope, rpc),
        "GetParameterNamesResponse" => Ok(CwmpRequest::GetParameterNamesResponse {
            parameter_list: parse_info_structs(rpc)?,
        }),
        "GetParameterValuesResponse" => Ok(CwmpRequest::GetParameterValuesResponse {
            parameter_list: parse_value_structs(rpc, "GetParameterValuesResponse")?,
        }),
        other => Err(SoapError::UnsupportedRpc(other.to_string())),
    }
}

fn parse_inform(envelope: Node<'_, '_>, rpc: Node<'_, '_>) -> Result<CwmpRequest, SoapError> {
    let device_id_node = element_child(rpc, "DeviceId")
        .ok_or_else(|| SoapError::Malformed("Inform missing DeviceId".to_string()))?;

    let device_id = DeviceId {
        oui: require_text(device_id_node, "OUI", "DeviceId")?,
        serial_number: require_text(device_id_node, "SerialNumber", "DeviceId")?,
    };

    let parameter_list = parse_value_structs(rpc, "Inform")?;
    let correlation_id = correlation_id(envelope);

    Ok(CwmpRequest::Inform(Inform {
        device_id,
        parameter_list,
        correlation_id,
    }))
}

/// `cwmp:ID` text from the SOAP Header, if the device supplied one.
fn correlation_id(envelope: Node<'_, '_>) -> Option<String> {
    let header = envelope
        .children()
        .find(|n| n.is_element() && n.tag_name().name() == "Header")?;
    header
        .children()
        .find(|n| n.is_element() && n.tag_name().name() == "ID" && is_cwmp(*n))
        .and_then(|n| n.text())
        .map(str::to_string)
}

fn parameter_list_node<'a>(rpc: Node<'a, 'a>, context: &str) -> Result<Node<'a, 'a>, SoapError> {
    element_child(rpc, "ParameterList")
        .ok_or_else(|| SoapError::Malformed(format!("{context} missing ParameterList")))
}

fn parse_value_structs(
    rpc: Node<'_, '_>,
    context: &str,
) -> Result<Vec<ParameterValue>, SoapError> {
    let list = parameter_list_node(rpc, context)?;
    list.children()
        .filter(|n| n.is_element() && n.tag_name().name() == "ParameterValueStruct")
        .map(|item| {
            Ok(ParameterValue {
                name: require_text(item, "Name", "ParameterValueStruct")?,
                value: require_text(item, "Value", "ParameterValueStruct")?,
            })
        })
        .collect()
}

fn parse_info_structs(rpc: Node<'_, '_>) -> Result<Vec<ParameterInfo>, SoapError> {
    let list = parameter_list_node(rpc, "GetParameterNamesResponse")?;
    list.children()
        .filter(|n| n.is_element() && n.tag_name().name() == "ParameterInfoStruct")
        .map(|item| {
            let writable = require_text(item, "Writable", "ParameterInfoStruct")?;
            Ok(ParameterInfo {
                name: require_text(item, "Name", "ParameterInfoStruct")?,
                writable: writable_from_str(&writable),
            })
        })
        .collect()
}

fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Serialize an outbound message into its SOAP envelope.
#[must_use]
pub fn serialize_response(response: &CwmpResponse) -> String {
    match response {
        CwmpResponse::InformResponse { correlation_id } => {
            serialize_inform_response(correlation_id.as_deref())
        }
        CwmpResponse::GetParameterNames {
            parameter_path,
            next_level,
        } => serialize_get_parameter_names(parameter_path, *next_level),
        CwmpResponse::GetParameterValues { parameter_names } => {
            serialize_get_parameter_values(parameter_names)
        }
    }
}

fn serialize_inform_response(correlation_id: Option<&str>) -> String {
    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<soapenv:Envelope xmlns:soapenv=\"http://schemas.xmlsoap.org/soap/envelope/\"\n");
    xml.push_str("                  xmlns:cwmp=\"urn:dslforum-org:cwmp-1-0\">\n");
    xml.push_str(" <soapenv:Header>\n");
    if let Some(id) = correlation_id {
        xml.push_str(&format!(
            "  <cwmp:ID soapenv:mustUnderstand=\"1\">{}</cwmp:ID>\n",
            escape_xml(id)
        ));
    }
    xml.push_str(" </soapenv:Header>\n");
    xml.push_str(" <soapenv:Body>\n");
    xml.push_str("  <cwmp:InformResponse>\n");
    xml.push_str("   <MaxEnvelopes>1</MaxEnvelopes>\n");
    xml.push_str("  </cwmp:InformResponse>\n");
    xml.push_str(" </soapenv:Body>\n");
    xml.push_str("</soapenv:Envelope>\n");
    xml
}

fn serialize_get_parameter_names(parameter_path: &str, next_level: bool) -> String {
    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<soapenv:Envelope xmlns:soapenv=\"http://schemas.xmlsoap.org/soap/envelope/\"\n");
    xml.push_str("                  xmlns:cwmp=\"urn:dslforum-org:cwmp-1-0\">\n");
    xml.push_str(" <soapenv:Header>\n");
    xml.push_str(" </soapenv:Header>\n");
    xml.push_str(" <soapenv:Body>\n");
    xml.push_str("  <cwmp:GetParameterNames>\n");
    xml.push_str(&format!(
        "   <ParameterPath>{}</ParameterPath>\n",
        escape_xml(parameter_path)
    ));
    xml.push_str(&format!(
        "   <NextLevel>{}</NextLevel>\n",
        u8::from(next_level)
    ));
    xml.push_str("  </cwmp:GetParameterNames>\n");
    xml.push_str(" </soapenv:Body>\n");
    xml.push_str("</soapenv:Envelope>\n");
    xml
}

fn serialize_get_parameter_values(parameter_names: &[String]) -> String {
    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<soapenv:Envelope xmlns:soapenv=\"http://schemas.xmlsoap.org/soap/envelope/\"\n");
    xml.push_str("                  xmlns:soapenc=\"http://schemas.xmlsoap.org/soap/encoding/\"\n");
    xml.push_str("                  xmlns:xsd=\"http://www.w3.org/2001/XMLSchema\"\n");
    xml.push_str("                  xmlns:cwmp=\"urn:dslforum-org:cwmp-1-0\">\n");
    xml.push_str(" <soapenv:Header>\n");
    xml.push_str(" </soapenv:Header>\n");
    xml.push_str(" <soapenv:Body>\n");
    xml.push_str("  <cwmp:GetParameterValues>\n");
    xml.push_str(&format!(
        "   <ParameterNames soapenc:arrayType=\"xsd:string[{}]\">\n",
        parameter_names.len()
    ));
    for name in parameter_names {
        xml.push_str(&format!("    <string>{}</string>\n", escape_xml(name)));
    }
    xml.push_str("   </ParameterNames>\n");
    xml.push_str("  </cwmp:GetParameterValues>\n");
    xml.push_str(" </soapenv:Body>\n");
    xml.push_str("</soapenv:Envelope>\n");
    xml
}
