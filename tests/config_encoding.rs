use midi_configurator_lib::config::{encode, ButtonRecord, DEFAULT_COLOR};
use midi_configurator_lib::serial::{DeviceMessage, SwitchWireEntry};

fn scenario_records() -> Vec<ButtonRecord> {
    vec![
        ButtonRecord::mapped(1, "Distortion", 127).with_color("red", true),
        ButtonRecord::mapped(2, "Chorus", 100).with_color("#ff5733", false),
        ButtonRecord::unmapped(3),
        ButtonRecord::unmapped(4).with_color("blue", true),
        ButtonRecord::unmapped(5),
        ButtonRecord::mapped(6, "Mute", 103),
    ]
}

#[test]
fn scenario_switches() {
    let config = encode(&scenario_records());

    assert_eq!(
        config.switches[0],
        SwitchWireEntry {
            id: 0,
            name: "Distortion".to_string(),
            channel: 1,
            cc: 127,
            value: 127,
            enabled: true,
            color: "#dc3545".to_string(),
        }
    );
    assert_eq!(config.switches[1].color, "#ff5733");
    assert!(!config.switches[2].enabled);
    assert_eq!(config.switches[2].color, DEFAULT_COLOR);
    assert_eq!(config.switches[2].name, "Inactive_3");
    assert_eq!(config.switches[3].color, "#007bff");
    assert!(config.switches[5].enabled);
    assert_eq!(config.switches[5].color, DEFAULT_COLOR);
}

#[test]
fn order_of_input_does_not_matter() {
    let records = scenario_records();
    let expected = encode(&records);

    let mut reversed = records.clone();
    reversed.reverse();
    let mut rotated = records.clone();
    rotated.rotate_left(2);
    let mut interleaved = records.clone();
    interleaved.swap(0, 5);
    interleaved.swap(1, 3);

    for permutation in [reversed, rotated, interleaved] {
        let config = encode(&permutation);
        assert_eq!(config, expected);
        let ids: Vec<u8> = config.switches.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4, 5]);
    }
}

#[test]
fn enabled_flag_tracks_command_name() {
    let records = scenario_records();
    let config = encode(&records);

    for record in &records {
        let switch = &config.switches[record.button_number as usize - 1];
        assert_eq!(switch.enabled, record.command_name.is_some());
    }
}

#[test]
fn serialized_line_is_stable_and_compact() {
    let first = DeviceMessage::from(encode(&scenario_records())).to_line().unwrap();
    let second = DeviceMessage::from(encode(&scenario_records())).to_line().unwrap();
    assert_eq!(first, second);

    let text = String::from_utf8(first).unwrap();
    assert!(text.ends_with("}\n"));
    assert_eq!(text.matches('\n').count(), 1);
    assert!(text.starts_with(
        "{\"type\":\"set_config\",\"switches\":[{\"id\":0,\"name\":\"Distortion\",\"channel\":1,\"cc\":127,\"value\":127,\"enabled\":true,\"color\":\"#dc3545\"},"
    ));
    assert!(!text.contains(": "));
    assert!(!text.contains(", "));

    let parsed: serde_json::Value = serde_json::from_str(text.trim_end()).unwrap();
    let keys: Vec<&String> = parsed.as_object().unwrap().keys().collect();
    assert_eq!(keys.len(), 2);
    assert_eq!(parsed["switches"].as_array().unwrap().len(), 6);
}

#[test]
fn wire_message_decodes_back() {
    let line = DeviceMessage::from(encode(&scenario_records())).to_line().unwrap();
    let decoded: DeviceMessage = serde_json::from_slice(&line).unwrap();
    assert_eq!(decoded, DeviceMessage::SetConfig(encode(&scenario_records())));
}
