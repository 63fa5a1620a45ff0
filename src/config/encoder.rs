use super::color::resolve_color;
use super::ButtonRecord;
use crate::serial::protocol::{SwitchWireEntry, WireConfigMessage, MIDI_CHANNEL, SWITCH_COUNT};

/// Build the device configuration from the stored button records.
///
/// Always yields six switches ordered by id. Buttons without a record, or
/// records outside 1..=6, are encoded as disabled placeholders.
pub fn encode(records: &[ButtonRecord]) -> WireConfigMessage {
    let mut slots: [Option<&ButtonRecord>; SWITCH_COUNT] = [None; SWITCH_COUNT];

    for record in records {
        let number = record.button_number as usize;
        if !(1..=SWITCH_COUNT).contains(&number) {
            log::warn!("Ignoring record for unknown button {}", record.button_number);
            continue;
        }
        if slots[number - 1].is_some() {
            log::warn!("Duplicate record for button {}, keeping the first", record.button_number);
            continue;
        }
        slots[number - 1] = Some(record);
    }

    let switches: Vec<SwitchWireEntry> = slots
        .iter()
        .enumerate()
        .map(|(index, slot)| match slot {
            Some(record) => switch_entry(index as u8, record),
            None => switch_entry(index as u8, &ButtonRecord::unmapped(index as u8 + 1)),
        })
        .collect();

    let enabled = switches.iter().filter(|s| s.enabled).count();
    log::debug!("Encoded configuration with {} of {} switches enabled", enabled, SWITCH_COUNT);

    WireConfigMessage { switches }
}

fn switch_entry(id: u8, record: &ButtonRecord) -> SwitchWireEntry {
    let value = record.command_value.unwrap_or(0);

    SwitchWireEntry {
        id,
        name: record
            .command_name
            .clone()
            .unwrap_or_else(|| placeholder_name(record.button_number)),
        channel: MIDI_CHANNEL,
        cc: value,
        value,
        enabled: record.is_mapped(),
        color: resolve_color(record.color.as_deref(), record.is_preset_color),
    }
}

fn placeholder_name(button_number: u8) -> String {
    format!("Inactive_{}", button_number)
}
