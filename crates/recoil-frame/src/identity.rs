use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{check_len, Result};

const MODEL_CODE: usize = 10;

/// Hardware family of a tagger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaggerType {
    #[default]
    Pistol,
    Rifle,
}

impl TaggerType {
    /// Map the identity record's model code.
    pub fn from_model_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(TaggerType::Rifle),
            2 => Some(TaggerType::Pistol),
            _ => None,
        }
    }

    pub fn model_code(self) -> u8 {
        match self {
            TaggerType::Rifle => 1,
            TaggerType::Pistol => 2,
        }
    }

    /// Retail model name.
    pub fn model_name(self) -> &'static str {
        match self {
            TaggerType::Rifle => "SR-12 Rogue Rifle",
            TaggerType::Pistol => "RK-45 Spitfire Pistol",
        }
    }
}

/// Identity resolved once per connection from the identity characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TaggerIdentity {
    pub tagger_type: TaggerType,
    /// Raw model code as reported by the device.
    pub model_code: u8,
}

impl TaggerIdentity {
    pub fn new(tagger_type: TaggerType) -> Self {
        Self {
            tagger_type,
            model_code: tagger_type.model_code(),
        }
    }

    /// Decode the 20-byte identity record.
    ///
    /// Unknown model codes fall back to [`TaggerType::Pistol`].
    pub fn decode(data: &[u8]) -> Result<Self> {
        let raw = check_len(data)?;
        let model_code = raw[MODEL_CODE];
        let tagger_type = TaggerType::from_model_code(model_code).unwrap_or_else(|| {
            warn!(model_code, "unknown tagger model code, assuming pistol");
            TaggerType::default()
        });
        Ok(Self {
            tagger_type,
            model_code,
        })
    }

    /// True when the model code mapped to a known tagger type.
    pub fn is_known_model(&self) -> bool {
        TaggerType::from_model_code(self.model_code).is_some()
    }
}
