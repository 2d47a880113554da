//! The session state machine driving the data model walk.
//!
//! Each inbound CWMP message produces exactly one [`Step`]: either a reply
//! to send back to the device, or the termination signal. The namespace is
//! expanded breadth-first over a FIFO queue of objects awaiting name
//! discovery, with one deliberate wrinkle: when a name-discovery round
//! reports both parameters and sub-objects, the parameters' values are
//! fetched before any queued sibling is visited, and queued siblings are
//! visited before the just-named object's own children.

use cwmp_model::{ItemKind, Object, Parameter};
use cwmp_rpc::protocol::{CwmpRequest, CwmpResponse, Inform, ParameterInfo, ParameterValue};
use tracing::{debug, info, warn};

use crate::error::{Result, WalkError};
use crate::session::{SessionPhase, SessionState};

/// The single outbound action produced by one state-machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Send this CWMP message and keep the session open.
    Reply(CwmpResponse),
    /// Send the "no more requests" status and stop accepting requests.
    Terminate,
}

impl SessionState {
    /// Consume one inbound message and decide the next outbound step.
    ///
    /// # Errors
    ///
    /// Any [`WalkError`] is session-fatal: the session is marked failed and
    /// the caller is expected to reply with a fault and stop.
    pub fn process(&mut self, message: CwmpRequest) -> Result<Step> {
        debug!("processing inbound {}", message.kind());

        let step = match message {
            CwmpRequest::Inform(inform) => self.handle_inform(inform),
            CwmpRequest::Empty => self.handle_empty_ack(),
            CwmpRequest::GetParameterNamesResponse { parameter_list } => {
                self.handle_names_response(parameter_list)
            }
            CwmpRequest::GetParameterValuesResponse { parameter_list } => {
                self.handle_values_response(parameter_list)
            }
        };

        if let Err(ref err) = step {
            warn!("session aborted: {err}");
            self.fail();
        }
        step
    }

    /// Record the device identity and root namespace, acknowledge the
    /// Inform.
    fn handle_inform(&mut self, inform: Inform) -> Result<Step> {
        if let Some(existing) = self.device_id() {
            return Err(WalkError::ProtocolSequence(format!(
                "already processing device {existing}"
            )));
        }

        let device_id = inform.device_id.to_string();
        info!("CWMP Inform from {device_id}");

        // The root namespace comes from the first dotted segment of the
        // SoftwareVersion parameter's name, e.g. `Device` or
        // `InternetGatewayDevice`.
        for parameter in &inform.parameter_list {
            if parameter.name.contains("SoftwareVersion") {
                let root = parameter
                    .name
                    .split('.')
                    .next()
                    .unwrap_or_default()
                    .to_string();
                info!("device {device_id} implements the {root} root data model");
                self.set_root_namespace(root);
            }
        }

        self.set_device_id(device_id);
        self.set_phase(SessionPhase::AwaitingEmptyAck);
        Ok(Step::Reply(CwmpResponse::inform_response(
            inform.correlation_id,
        )))
    }

    /// The device's empty POST after the InformResponse: start the walk at
    /// the root object.
    fn handle_empty_ack(&mut self) -> Result<Step> {
        if self.device_id().is_none() || *self.phase() != SessionPhase::AwaitingEmptyAck {
            return Err(WalkError::ProtocolSequence(
                "invalid empty POST received".to_string(),
            ));
        }

        let Some(root) = self.root_namespace() else {
            return Err(WalkError::ProtocolSequence(
                "no root namespace learned from the Inform".to_string(),
            ));
        };

        let root_object = Object::new(format!("{root}."), false);
        Ok(Step::Reply(self.request_names(root_object)))
    }

    /// A name-discovery response for the in-flight target: classify the
    /// entries, record the object, and pick the next request by priority:
    /// values for its parameters first, then descending into discovered
    /// sub-objects, then the pending queue, then termination.
    fn handle_names_response(&mut self, parameter_list: Vec<ParameterInfo>) -> Result<Step> {
        if self.device_id().is_none() {
            return Err(WalkError::ProtocolSequence(
                "name-discovery response with no device identity".to_string(),
            ));
        }
        let SessionPhase::AwaitingNameDiscovery { mut target } = self.take_phase() else {
            return Err(WalkError::ProtocolSequence(
                "unexpected GetParameterNamesResponse".to_string(),
            ));
        };

        let mut sub_objects = Vec::new();
        let mut value_names = Vec::new();
        for info in parameter_list {
            match ItemKind::of(&info.name) {
                ItemKind::Object => {
                    info!("- sub-object: {}", info.name);
                    sub_objects.push(Object::new(info.name, info.writable));
                }
                ItemKind::Parameter => {
                    info!("- parameter: {}", info.name);
                    target.add_parameter(Parameter::new(info.name.clone(), info.writable));
                    value_names.push(info.name);
                }
            }
        }

        let target_path = target.path().to_string();
        let index = self.add_object(target);

        if !value_names.is_empty() {
            self.queue_pending(sub_objects);
            info!(
                "requesting values for {} parameters under [{target_path}]",
                value_names.len()
            );
            self.set_phase(SessionPhase::AwaitingValueDiscovery {
                object: index,
                names: value_names.clone(),
            });
            Ok(Step::Reply(CwmpResponse::get_parameter_values(value_names)))
        } else if !sub_objects.is_empty() {
            let mut rest = sub_objects;
            let next = rest.remove(0);
            self.queue_pending(rest);
            Ok(Step::Reply(self.request_names(next)))
        } else if let Some(next) = self.pop_pending() {
            warn!("object [{target_path}] has no parameters or sub-objects, proceeding");
            Ok(Step::Reply(self.request_names(next)))
        } else {
            info!("nothing left to explore, session complete");
            self.set_phase(SessionPhase::Terminated);
            Ok(Step::Terminate)
        }
    }

    /// A value-discovery response: set each reported value on the in-flight
    /// object's parameters, then resume name discovery from the pending
    /// queue or terminate.
    fn handle_values_response(&mut self, parameter_list: Vec<ParameterValue>) -> Result<Step> {
        if self.device_id().is_none() {
            return Err(WalkError::ProtocolSequence(
                "value-discovery response with no device identity".to_string(),
            ));
        }
        let SessionPhase::AwaitingValueDiscovery { object, names: _ } = self.take_phase() else {
            return Err(WalkError::ProtocolSequence(
                "unexpected GetParameterValuesResponse".to_string(),
            ));
        };

        {
            let target = self.object_mut(object).ok_or_else(|| {
                WalkError::Lookup(format!("no model object at index {object}"))
            })?;
            for reported in parameter_list {
                debug!("- {} = {}", reported.name, reported.value);
                target.parameter_mut(&reported.name)?.set_value(reported.value);
            }
        }

        if let Some(next) = self.pop_pending() {
            Ok(Step::Reply(self.request_names(next)))
        } else {
            info!("nothing left to explore, session complete");
            self.set_phase(SessionPhase::Terminated);
            Ok(Step::Terminate)
        }
    }

    /// Make `target` the in-flight name-discovery target and build the
    /// request for its immediate children.
    fn request_names(&mut self, target: Object) -> CwmpResponse {
        info!("requesting names under [{}]", target.path());
        let response = CwmpResponse::get_parameter_names(target.path());
        self.set_phase(SessionPhase::AwaitingNameDiscovery { target });
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cwmp_rpc::protocol::DeviceId;

    fn inform() -> CwmpRequest {
        CwmpRequest::Inform(Inform {
            device_id: DeviceId {
                oui: "001A2B".to_string(),
                serial_number: "SN123".to_string(),
            },
            parameter_list: vec![ParameterValue {
                name: "Device.DeviceInfo.SoftwareVersion".to_string(),
                value: "1.2.3".to_string(),
            }],
            correlation_id: Some("77".to_string()),
        })
    }

    fn names_response(entries: &[(&str, bool)]) -> CwmpRequest {
        CwmpRequest::GetParameterNamesResponse {
            parameter_list: entries
                .iter()
                .map(|(name, writable)| ParameterInfo {
                    name: (*name).to_string(),
                    writable: *writable,
                })
                .collect(),
        }
    }

    fn values_response(entries: &[(&str, &str)]) -> CwmpRequest {
        CwmpRequest::GetParameterValuesResponse {
            parameter_list: entries
                .iter()
                .map(|(name, value)| ParameterValue {
                    name: (*name).to_string(),
                    value: (*value).to_string(),
                })
                .collect(),
        }
    }

    fn expect_gpn(step: &Step) -> &str {
        let Step::Reply(CwmpResponse::GetParameterNames {
            parameter_path,
            next_level,
        }) = step
        else {
            panic!("expected GetParameterNames, got {step:?}");
        };
        assert!(*next_level);
        parameter_path
    }

    fn session_after_inform() -> SessionState {
        let mut session = SessionState::new();
        session.process(inform()).unwrap();
        session
    }

    #[test]
    fn test_inform_records_identity_and_namespace() {
        let mut session = SessionState::new();
        let step = session.process(inform()).unwrap();

        assert_eq!(session.device_id(), Some("001A2B-SN123"));
        assert_eq!(session.root_namespace(), Some("Device"));
        assert_eq!(*session.phase(), SessionPhase::AwaitingEmptyAck);
        assert_eq!(
            step,
            Step::Reply(CwmpResponse::inform_response(Some("77".to_string())))
        );
    }

    #[test]
    fn test_double_inform_is_fatal() {
        let mut session = session_after_inform();
        let err = session.process(inform()).unwrap_err();

        assert!(matches!(err, WalkError::ProtocolSequence(_)));
        assert!(err.to_string().contains("001A2B-SN123"));
        assert_eq!(*session.phase(), SessionPhase::Failed);
    }

    #[test]
    fn test_empty_post_before_inform_is_fatal() {
        let mut session = SessionState::new();
        let err = session.process(CwmpRequest::Empty).unwrap_err();
        assert!(matches!(err, WalkError::ProtocolSequence(_)));
    }

    #[test]
    fn test_empty_post_starts_root_name_discovery() {
        let mut session = session_after_inform();
        let step = session.process(CwmpRequest::Empty).unwrap();

        assert_eq!(expect_gpn(&step), "Device.");
        assert!(matches!(
            session.phase(),
            SessionPhase::AwaitingNameDiscovery { target } if target.path() == "Device."
        ));
    }

    #[test]
    fn test_empty_post_during_discovery_is_fatal() {
        let mut session = session_after_inform();
        session.process(CwmpRequest::Empty).unwrap();
        let err = session.process(CwmpRequest::Empty).unwrap_err();
        assert!(matches!(err, WalkError::ProtocolSequence(_)));
    }

    #[test]
    fn test_empty_post_without_root_namespace_is_fatal() {
        let mut session = SessionState::new();
        session
            .process(CwmpRequest::Inform(Inform {
                device_id: DeviceId {
                    oui: "001A2B".to_string(),
                    serial_number: "SN123".to_string(),
                },
                parameter_list: vec![],
                correlation_id: None,
            }))
            .unwrap();

        let err = session.process(CwmpRequest::Empty).unwrap_err();
        assert!(err.to_string().contains("root namespace"));
    }

    #[test]
    fn test_parameters_take_priority_over_sub_objects() {
        let mut session = session_after_inform();
        session.process(CwmpRequest::Empty).unwrap();

        let step = session
            .process(names_response(&[
                ("Device.WiFi.", false),
                ("Device.Uptime", false),
            ]))
            .unwrap();

        // The root object is recorded with its parameter attached.
        assert!(session.model().contains_path("Device."));
        let root = session.model().objects().next().unwrap();
        assert!(root.parameter("Device.Uptime").is_some());

        // Values are requested before the queued sub-object is visited.
        assert_eq!(
            step,
            Step::Reply(CwmpResponse::get_parameter_values(vec![
                "Device.Uptime".to_string()
            ]))
        );
        assert_eq!(session.pending_len(), 1);
    }

    #[test]
    fn test_values_response_sets_value_and_resumes_queue() {
        let mut session = session_after_inform();
        session.process(CwmpRequest::Empty).unwrap();
        session
            .process(names_response(&[
                ("Device.WiFi.", false),
                ("Device.Uptime", false),
            ]))
            .unwrap();

        let step = session
            .process(values_response(&[("Device.Uptime", "3600")]))
            .unwrap();

        let root = session.model().objects().next().unwrap();
        assert_eq!(
            root.parameter("Device.Uptime").unwrap().value(),
            Some("3600")
        );
        assert_eq!(expect_gpn(&step), "Device.WiFi.");
    }

    #[test]
    fn test_empty_final_response_terminates() {
        let mut session = session_after_inform();
        session.process(CwmpRequest::Empty).unwrap();
        session
            .process(names_response(&[
                ("Device.WiFi.", false),
                ("Device.Uptime", false),
            ]))
            .unwrap();
        session
            .process(values_response(&[("Device.Uptime", "3600")]))
            .unwrap();

        let step = session.process(names_response(&[])).unwrap();

        assert_eq!(step, Step::Terminate);
        assert!(session.is_terminated());
        assert!(session.model().contains_path("Device.WiFi."));
        assert_eq!(session.model().len(), 2);
    }

    #[test]
    fn test_sub_objects_only_descends_into_first() {
        let mut session = session_after_inform();
        session.process(CwmpRequest::Empty).unwrap();

        let step = session
            .process(names_response(&[
                ("Device.WiFi.", false),
                ("Device.IP.", false),
            ]))
            .unwrap();

        assert_eq!(expect_gpn(&step), "Device.WiFi.");
        assert_eq!(session.pending_len(), 1);
    }

    #[test]
    fn test_object_with_nothing_proceeds_from_queue() {
        let mut session = session_after_inform();
        session.process(CwmpRequest::Empty).unwrap();
        session
            .process(names_response(&[
                ("Device.WiFi.", false),
                ("Device.IP.", false),
            ]))
            .unwrap();

        // Device.WiFi. turns out empty; the queued Device.IP. is next.
        let step = session.process(names_response(&[])).unwrap();
        assert_eq!(expect_gpn(&step), "Device.IP.");
        assert!(session.model().contains_path("Device.WiFi."));
    }

    #[test]
    fn test_names_response_in_wrong_phase_is_fatal() {
        let mut session = session_after_inform();
        let err = session.process(names_response(&[])).unwrap_err();
        assert!(matches!(err, WalkError::ProtocolSequence(_)));
        assert_eq!(*session.phase(), SessionPhase::Failed);
    }

    #[test]
    fn test_names_response_without_identity_is_fatal() {
        let mut session = SessionState::new();
        let err = session.process(names_response(&[])).unwrap_err();
        assert!(matches!(err, WalkError::ProtocolSequence(_)));
    }

    #[test]
    fn test_values_response_for_unknown_parameter_is_lookup_error() {
        let mut session = session_after_inform();
        session.process(CwmpRequest::Empty).unwrap();
        session
            .process(names_response(&[("Device.Uptime", false)]))
            .unwrap();

        let err = session
            .process(values_response(&[("Device.Secret", "x")]))
            .unwrap_err();

        assert!(matches!(err, WalkError::Lookup(_)));
        assert!(err.to_string().contains("Device.Secret"));
        assert_eq!(*session.phase(), SessionPhase::Failed);
    }

    #[test]
    fn test_repeated_value_overwrites() {
        let mut session = session_after_inform();
        session.process(CwmpRequest::Empty).unwrap();
        session
            .process(names_response(&[("Device.Uptime", false)]))
            .unwrap();

        session
            .process(values_response(&[
                ("Device.Uptime", "3600"),
                ("Device.Uptime", "3700"),
            ]))
            .unwrap();

        let root = session.model().objects().next().unwrap();
        assert_eq!(
            root.parameter("Device.Uptime").unwrap().value(),
            Some("3700")
        );
    }

    #[test]
    fn test_writable_flag_carried_onto_model() {
        let mut session = session_after_inform();
        session.process(CwmpRequest::Empty).unwrap();
        session
            .process(names_response(&[
                ("Device.ManagementServer.", true),
                ("Device.RebootCount", true),
            ]))
            .unwrap();

        let root = session.model().objects().next().unwrap();
        assert!(root.parameter("Device.RebootCount").unwrap().writable());
    }
}
