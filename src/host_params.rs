//! Host parameter IDs (`slot3_mix`, `slot1_param4`, `master_out`, ...).

use crate::Error;
use hexfx_core::NUM_SLOTS;
use std::fmt;
use std::str::FromStr;

/// A typed host parameter. Slot and parameter indices are 0-based; the
/// string form is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostParam {
    SlotEngine(usize),
    SlotMix(usize),
    SlotBypass(usize),
    SlotParam { slot: usize, index: usize },
    MasterIn,
    MasterOut,
    MasterMix,
}

impl HostParam {
    pub fn parse(id: &str) -> Result<Self, Error> {
        id.parse()
    }

    /// Slot addressed by this parameter, if any.
    pub fn slot(&self) -> Option<usize> {
        match *self {
            Self::SlotEngine(slot)
            | Self::SlotMix(slot)
            | Self::SlotBypass(slot)
            | Self::SlotParam { slot, .. } => Some(slot),
            Self::MasterIn | Self::MasterOut | Self::MasterMix => None,
        }
    }
}

impl FromStr for HostParam {
    type Err = Error;

    fn from_str(id: &str) -> Result<Self, Error> {
        let unknown = || Error::UnknownHostParam(id.to_string());
        match id {
            "master_in" => return Ok(Self::MasterIn),
            "master_out" => return Ok(Self::MasterOut),
            "master_mix" => return Ok(Self::MasterMix),
            _ => {}
        }

        let rest = id.strip_prefix("slot").ok_or_else(unknown)?;
        let (number, field) = rest.split_once('_').ok_or_else(unknown)?;
        let slot = parse_one_based(number)
            .filter(|&s| s < NUM_SLOTS)
            .ok_or_else(unknown)?;

        match field {
            "engine" => Ok(Self::SlotEngine(slot)),
            "mix" => Ok(Self::SlotMix(slot)),
            "bypass" => Ok(Self::SlotBypass(slot)),
            _ => {
                let index = field
                    .strip_prefix("param")
                    .and_then(parse_one_based)
                    .ok_or_else(unknown)?;
                Ok(Self::SlotParam { slot, index })
            }
        }
    }
}

/// Digits only, no sign or leading zero, at least 1.
fn parse_one_based(text: &str) -> Option<usize> {
    if text.is_empty() || text.starts_with('0') || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse::<usize>().ok().map(|n| n - 1)
}

impl fmt::Display for HostParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::SlotEngine(slot) => write!(f, "slot{}_engine", slot + 1),
            Self::SlotMix(slot) => write!(f, "slot{}_mix", slot + 1),
            Self::SlotBypass(slot) => write!(f, "slot{}_bypass", slot + 1),
            Self::SlotParam { slot, index } => write!(f, "slot{}_param{}", slot + 1, index + 1),
            Self::MasterIn => f.write_str("master_in"),
            Self::MasterOut => f.write_str("master_out"),
            Self::MasterMix => f.write_str("master_mix"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_slot_fields() {
        assert_eq!(HostParam::parse("slot1_engine").unwrap(), HostParam::SlotEngine(0));
        assert_eq!(HostParam::parse("slot6_mix").unwrap(), HostParam::SlotMix(5));
        assert_eq!(HostParam::parse("slot3_bypass").unwrap(), HostParam::SlotBypass(2));
        assert_eq!(
            HostParam::parse("slot3_param12").unwrap(),
            HostParam::SlotParam { slot: 2, index: 11 }
        );
        assert_eq!(HostParam::parse("master_out").unwrap(), HostParam::MasterOut);
    }

    #[test]
    fn test_rejects_malformed_ids() {
        for id in [
            "slot0_mix",
            "slot7_mix",
            "slot1_param0",
            "slot1_param",
            "slot01_mix",
            "slot1_gain",
            "slot+1_mix",
            "master",
            "",
        ] {
            assert!(
                matches!(HostParam::parse(id), Err(Error::UnknownHostParam(_))),
                "{id} should be rejected"
            );
        }
    }

    #[test]
    fn test_display_round_trips() {
        for id in ["slot2_engine", "slot5_param3", "master_in", "master_mix"] {
            assert_eq!(HostParam::parse(id).unwrap().to_string(), id);
        }
    }
}
