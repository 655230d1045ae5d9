//! Voice catalog for the Kokoro American-English model.

use std::fmt;

use crate::error::{Result, SynthesisError};

/// Voice used when nothing else is configured.
pub const DEFAULT_VOICE: &str = "af_heart";

const FEMALE_VOICES: &[&str] = &[
    "af_heart",
    "af_alloy",
    "af_aoede",
    "af_bella",
    "af_jessica",
    "af_kore",
    "af_nicole",
    "af_nova",
    "af_river",
    "af_sarah",
    "af_sky",
];

const MALE_VOICES: &[&str] = &[
    "am_adam",
    "am_echo",
    "am_eric",
    "am_fenrir",
    "am_liam",
    "am_michael",
    "am_onyx",
    "am_puck",
    "am_santa",
];

/// Voice grouping shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceCategory {
    Female,
    Male,
}

impl VoiceCategory {
    pub const ALL: [VoiceCategory; 2] = [VoiceCategory::Female, VoiceCategory::Male];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Female => "Female Voices",
            Self::Male => "Male Voices",
        }
    }

    /// Voice identifiers in this category, in display order.
    pub fn voices(&self) -> &'static [&'static str] {
        match self {
            Self::Female => FEMALE_VOICES,
            Self::Male => MALE_VOICES,
        }
    }
}

/// A voice identifier known to be in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Voice {
    id: &'static str,
    category: VoiceCategory,
}

impl Voice {
    /// Look up a voice identifier, rejecting anything outside the catalog.
    pub fn parse(id: &str) -> Result<Self> {
        let id = id.trim();
        for category in VoiceCategory::ALL {
            if let Some(found) = category.voices().iter().find(|v| **v == id) {
                return Ok(Self {
                    id: found,
                    category,
                });
            }
        }
        Err(SynthesisError::UnsupportedVoice(id.to_string()))
    }

    pub fn id(&self) -> &'static str {
        self.id
    }

    pub fn category(&self) -> VoiceCategory {
        self.category
    }

    /// Every voice in the catalog.
    pub fn all() -> impl Iterator<Item = Voice> {
        VoiceCategory::ALL.into_iter().flat_map(|category| {
            category
                .voices()
                .iter()
                .map(move |id| Voice { id, category })
        })
    }
}

impl Default for Voice {
    fn default() -> Self {
        Self {
            id: FEMALE_VOICES[0],
            category: VoiceCategory::Female,
        }
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id)
    }
}
