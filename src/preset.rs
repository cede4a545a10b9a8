//! Preset documents: a `presets` array of six-slot snapshots.

use crate::error::PresetError;
use crate::Result;
use hexfx_core::{EngineId, NUM_SLOTS};
use serde::{Deserialize, Serialize};

/// One slot entry of a preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotPreset {
    pub slot: usize,
    /// Engine ID. Kept wide so out-of-range values survive parsing.
    #[serde(rename = "type")]
    pub engine: i64,
    #[serde(default = "default_mix")]
    pub mix: f32,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default, alias = "params")]
    pub parameters: Vec<f32>,
}

fn default_mix() -> f32 {
    1.0
}

fn default_active() -> bool {
    true
}

impl SlotPreset {
    pub fn new(slot: usize, engine: EngineId) -> Self {
        Self {
            slot,
            engine: engine.0 as i64,
            mix: 1.0,
            active: true,
            parameters: Vec::new(),
        }
    }

    pub fn with_mix(mut self, mix: f32) -> Self {
        self.mix = mix;
        self
    }

    pub fn with_parameters(mut self, parameters: impl Into<Vec<f32>>) -> Self {
        self.parameters = parameters.into();
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// The engine ID if it is in range.
    pub fn engine_id(&self) -> Option<EngineId> {
        u16::try_from(self.engine)
            .ok()
            .and_then(|id| EngineId::new(id).ok())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub subcategory: String,
    #[serde(default, alias = "engines")]
    pub slots: Vec<SlotPreset>,
}

impl Preset {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: String::new(),
            subcategory: String::new(),
            slots: Vec::new(),
        }
    }

    pub fn with_slot(mut self, slot: SlotPreset) -> Self {
        self.slots.push(slot);
        self
    }

    /// Check slot indices only: the part a lenient load cannot repair.
    pub fn validate_structure(&self) -> std::result::Result<(), PresetError> {
        let mut seen = [false; NUM_SLOTS];
        for entry in &self.slots {
            let seen_slot = seen
                .get_mut(entry.slot)
                .ok_or_else(|| PresetError::SlotOutOfRange {
                    preset: self.id.clone(),
                    slot: entry.slot,
                })?;
            if *seen_slot {
                return Err(PresetError::DuplicateSlot {
                    preset: self.id.clone(),
                    slot: entry.slot,
                });
            }
            *seen_slot = true;
        }
        Ok(())
    }

    /// Strict validation: structure, engine range and every value in [0, 1].
    pub fn validate(&self) -> std::result::Result<(), PresetError> {
        self.validate_structure()?;
        for entry in &self.slots {
            if entry.engine_id().is_none() {
                return Err(PresetError::EngineOutOfRange {
                    preset: self.id.clone(),
                    engine: entry.engine,
                });
            }
            if !(0.0..=1.0).contains(&entry.mix) {
                return Err(PresetError::MixOutOfRange {
                    preset: self.id.clone(),
                    slot: entry.slot,
                    value: entry.mix,
                });
            }
            if let Some((index, &value)) = entry
                .parameters
                .iter()
                .enumerate()
                .find(|(_, v)| !(0.0..=1.0).contains(*v))
            {
                return Err(PresetError::ParameterOutOfRange {
                    preset: self.id.clone(),
                    slot: entry.slot,
                    index,
                    value,
                });
            }
        }
        Ok(())
    }

    /// Entry for `slot`, if the preset names it.
    pub fn slot(&self, slot: usize) -> Option<&SlotPreset> {
        self.slots.iter().find(|entry| entry.slot == slot)
    }
}

/// A preset file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PresetBank {
    pub presets: Vec<Preset>,
}

impl PresetBank {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn get(&self, id: &str) -> Option<&Preset> {
        self.presets.iter().find(|p| p.id == id)
    }

    pub fn find(&self, id: &str) -> std::result::Result<&Preset, PresetError> {
        self.get(id)
            .ok_or_else(|| PresetError::NotFound(id.to_string()))
    }

    /// Strictly validate every preset.
    pub fn validate(&self) -> std::result::Result<(), PresetError> {
        self.presets.iter().try_for_each(Preset::validate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    const BANK: &str = r#"{
        "presets": [
            {
                "id": "trem-01",
                "name": "Slow Pulse",
                "category": "Modulation",
                "subcategory": "Tremolo",
                "slots": [
                    { "slot": 0, "type": 29, "mix": 1.0, "active": true,
                      "parameters": [0.25, 0.5, 0.0, 0.0, 1.0] }
                ]
            },
            {
                "id": "legacy",
                "name": "Old Format",
                "engines": [
                    { "slot": 2, "type": 48, "params": [0.6] }
                ]
            }
        ]
    }"#;

    #[test]
    fn test_parse_bank_with_aliases() {
        let bank = PresetBank::from_json(BANK).unwrap();
        assert_eq!(bank.presets.len(), 2);

        let trem = bank.find("trem-01").unwrap();
        assert_eq!(trem.slots[0].engine_id(), Some(EngineId(29)));
        assert_eq!(trem.slots[0].parameters, vec![0.25, 0.5, 0.0, 0.0, 1.0]);

        let legacy = bank.find("legacy").unwrap();
        let entry = legacy.slot(2).unwrap();
        assert_eq!(entry.parameters, vec![0.6]);
        assert_eq!(entry.mix, 1.0);
        assert!(entry.active);
        assert!(bank.validate().is_ok());
    }

    #[test]
    fn test_malformed_json_is_rejected() {
        assert!(matches!(
            PresetBank::from_json("{\"presets\": [ {\"id\": 3 } ]"),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn test_strict_validation() {
        let dup = Preset::new("dup", "Dup")
            .with_slot(SlotPreset::new(1, EngineId(29)))
            .with_slot(SlotPreset::new(1, EngineId(31)));
        assert!(matches!(dup.validate(), Err(PresetError::DuplicateSlot { slot: 1, .. })));

        let far = Preset::new("far", "Far").with_slot(SlotPreset::new(6, EngineId(29)));
        assert!(matches!(far.validate(), Err(PresetError::SlotOutOfRange { slot: 6, .. })));

        let mut bad_engine = SlotPreset::new(0, EngineId(0));
        bad_engine.engine = 57;
        let bad = Preset::new("bad", "Bad").with_slot(bad_engine);
        assert!(matches!(bad.validate(), Err(PresetError::EngineOutOfRange { engine: 57, .. })));
        assert!(bad.validate_structure().is_ok());

        let loud = Preset::new("loud", "Loud")
            .with_slot(SlotPreset::new(0, EngineId(29)).with_parameters([0.5f32, 1.5]));
        assert!(matches!(
            loud.validate(),
            Err(PresetError::ParameterOutOfRange { index: 1, .. })
        ));
    }

    #[test]
    fn test_missing_preset() {
        let bank = PresetBank::default();
        assert_eq!(bank.find("nope"), Err(PresetError::NotFound("nope".into())));
    }

    #[test]
    fn test_serialize_uses_wire_names() {
        let bank = PresetBank {
            presets: vec![Preset::new("p", "P").with_slot(SlotPreset::new(0, EngineId(54)))],
        };
        let json = bank.to_json().unwrap();
        assert!(json.contains("\"type\": 54"));
        assert!(json.contains("\"parameters\""));
        assert_eq!(PresetBank::from_json(&json).unwrap(), bank);
    }
}
