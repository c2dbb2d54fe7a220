use super::*;
use chrono::TimeZone;
use serde_json::json;

#[test]
fn test_parse_upstream_record() {
    let record: Record = serde_json::from_value(json!({
        "equipmentnumber": 10500702,
        "type": "ELEVATOR",
        "description": "zu Gleis 1/2",
        "geocoordX": 13.3689,
        "geocoordY": 52.5251,
        "state": "ACTIVE",
        "stationnumber": 1071
    }))
    .unwrap();

    assert_eq!(record.id, 10500702);
    assert_eq!(record.kind, "ELEVATOR");
    assert_eq!(record.description.as_deref(), Some("zu Gleis 1/2"));
    assert_eq!(record.location.x, Some(13.3689));
    assert_eq!(record.location.y, Some(52.5251));
    assert_eq!(record.state, FacilityState::Active);
    assert_eq!(record.group_id, 1071);
    assert_eq!(record.observed_at, None);
}

#[test]
fn test_parse_record_with_missing_optional_fields() {
    let record: Record = serde_json::from_value(json!({
        "equipmentnumber": 7,
        "type": "ESCALATOR",
        "description": null,
        "state": "INACTIVE",
        "stationnumber": 3,
        "stateExplanation": "not available"
    }))
    .unwrap();

    assert_eq!(record.description, None);
    assert_eq!(record.location, Location::default());
    assert_eq!(record.state, FacilityState::Inactive);
}

#[test]
fn test_unrecognised_state_reads_as_unknown() {
    let record: Record = serde_json::from_value(json!({
        "equipmentnumber": 7,
        "type": "ELEVATOR",
        "state": "MAINTENANCE",
        "stationnumber": 3
    }))
    .unwrap();

    assert_eq!(record.state, FacilityState::Unknown);
}

#[test]
fn test_serialize_uses_wire_names_and_millisecond_timestamp() {
    let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
    let record = Record {
        id: 7,
        kind: "ELEVATOR".to_string(),
        description: Some("Example".to_string()),
        location: Location {
            x: Some(1.5),
            y: Some(2.5),
        },
        state: FacilityState::Inactive,
        group_id: 42,
        observed_at: None,
    }
    .observed(at);

    let value = serde_json::to_value(&record).unwrap();
    assert_eq!(
        value,
        json!({
            "equipmentnumber": 7,
            "type": "ELEVATOR",
            "description": "Example",
            "geocoordX": 1.5,
            "geocoordY": 2.5,
            "state": "INACTIVE",
            "stationnumber": 42,
            "timestamp": 1_700_000_000_123i64
        })
    );
}

#[test]
fn test_unobserved_record_omits_timestamp() {
    let record = Record {
        id: 1,
        kind: "ELEVATOR".to_string(),
        description: None,
        location: Location::default(),
        state: FacilityState::Unknown,
        group_id: 1,
        observed_at: None,
    };

    let value = serde_json::to_value(&record).unwrap();
    assert!(value.get("timestamp").is_none());
    assert_eq!(value["state"], json!("UNKNOWN"));
}

#[test]
fn test_whole_coordinates_serialize_as_integers() {
    let record = Record {
        id: 0,
        kind: "ELEVATOR".to_string(),
        description: None,
        location: Location {
            x: Some(0.0),
            y: Some(-12.0),
        },
        state: FacilityState::Active,
        group_id: 0,
        observed_at: None,
    };

    let text = serde_json::to_string(&record).unwrap();
    assert!(text.contains(r#""geocoordX":0,"#));
    assert!(text.contains(r#""geocoordY":-12,"#));

    let parsed: Record = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed.location, record.location);
}
