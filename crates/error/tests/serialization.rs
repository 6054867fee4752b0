use serde_json::Value;
use tessera_error::{Error, ErrorCode};

#[test]
fn test_report_serialization() {
    let error = Error::UnknownField {
        field: "frist_name".to_string(),
        suggestion: Some("first_name".to_string()),
    };

    let json = error.report().to_json();
    let v: Value = serde_json::from_str(&json).expect("valid json");

    assert_eq!(v["code"], "TESSERA-1002");
    assert_eq!(
        v["message"],
        "unknown field `frist_name` (did you mean `first_name`?)"
    );
    assert_eq!(v["hint"], "Did you mean 'first_name'?");
}

#[test]
fn test_report_omits_missing_hint() {
    let json = Error::InsertZeroRow.report().to_json();
    let v: Value = serde_json::from_str(&json).expect("valid json");

    assert_eq!(v["code"], "TESSERA-2004");
    assert!(v.get("hint").is_none());
}

#[test]
fn test_error_code_round_trip() {
    let code: ErrorCode = "TESSERA-3004".to_string().try_into().unwrap();
    assert_eq!(code, ErrorCode::NoDestination);

    let json = serde_json::to_string(&ErrorCode::TxDone).unwrap();
    assert_eq!(json, "\"TESSERA-4002\"");
    let back: ErrorCode = serde_json::from_str(&json).unwrap();
    assert_eq!(back, ErrorCode::TxDone);
}
