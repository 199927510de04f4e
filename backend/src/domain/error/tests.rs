//! Tests for error payload construction and serialisation.

use super::*;
use rstest::{fixture, rstest};
use serde_json::json;

#[fixture]
fn not_found_with_details() -> Error {
    Error::not_found("stop 7 not found").with_details(json!({ "stopId": 7 }))
}

#[rstest]
#[case(Error::invalid_request("bad"), ErrorCode::InvalidRequest)]
#[case(Error::not_found("missing"), ErrorCode::NotFound)]
#[case(Error::service_unavailable("down"), ErrorCode::ServiceUnavailable)]
#[case(Error::internal("boom"), ErrorCode::InternalError)]
fn constructors_set_codes(#[case] error: Error, #[case] expected: ErrorCode) {
    assert_eq!(error.code(), expected);
}

#[rstest]
fn try_new_rejects_empty_messages() {
    let result = Error::try_new(ErrorCode::InvalidRequest, "   ");
    assert!(matches!(result, Err(ErrorValidationError::EmptyMessage)));
}

#[rstest]
fn new_substitutes_default_message_for_blank_input() {
    let error = Error::new(ErrorCode::NotFound, "  ");
    assert_eq!(error.message(), "resource not found");
}

#[rstest]
fn serialises_code_in_snake_case(not_found_with_details: Error) {
    let value = serde_json::to_value(&not_found_with_details).expect("serialise");
    assert_eq!(
        value,
        json!({
            "code": "not_found",
            "message": "stop 7 not found",
            "details": { "stopId": 7 },
        })
    );
}

#[rstest]
fn omits_absent_details() {
    let value = serde_json::to_value(Error::service_unavailable("no data")).expect("serialise");
    assert!(value.get("details").is_none());
    assert_eq!(value["code"], "service_unavailable");
}

#[rstest]
fn deserialisation_enforces_message_invariant() {
    let payload = json!({ "code": "internal_error", "message": " " });
    let result = serde_json::from_value::<Error>(payload);
    assert!(result.is_err(), "blank messages must be rejected");
}

#[rstest]
fn round_trips_through_json(not_found_with_details: Error) {
    let encoded = serde_json::to_string(&not_found_with_details).expect("serialise");
    let decoded: Error = serde_json::from_str(&encoded).expect("deserialise");
    assert_eq!(decoded, not_found_with_details);
}
