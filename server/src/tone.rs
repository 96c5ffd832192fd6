//! Tone profiles.
//!
//! The set of tones is closed: callers pick one by name and never supply
//! instruction text themselves. Adding a tone means adding a variant here
//! together with its instruction fragment.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Tone {
    #[default]
    Professional,
    Creative,
    Bold,
}

impl Tone {
    pub const ALL: [Tone; 3] = [Tone::Professional, Tone::Creative, Tone::Bold];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "professional" => Some(Tone::Professional),
            "creative" => Some(Tone::Creative),
            "bold" => Some(Tone::Bold),
            _ => None,
        }
    }

    /// Resolve a requested tone, falling back to professional for anything
    /// unknown or missing.
    pub fn resolve(name: Option<&str>) -> Self {
        name.and_then(Self::from_name).unwrap_or_default()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tone::Professional => "professional",
            Tone::Creative => "creative",
            Tone::Bold => "bold",
        }
    }

    /// Instruction fragment inserted into the system prompt
    pub fn instruction(self) -> &'static str {
        match self {
            Tone::Professional => {
                "Tone: polished, authoritative, data-driven. Use industry language. Keep it formal yet warm."
            }
            Tone::Creative => {
                "Tone: storytelling, vivid, unexpected angles. Use a narrative arc. Surprise the reader with your opening."
            }
            Tone::Bold => {
                "Tone: high energy, direct, conviction-driven. Short punchy sentences. Use power words. Make bold claims backed by the content."
            }
        }
    }
}
