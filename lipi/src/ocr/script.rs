use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use crate::error::LipiError;

/// Writing system declared by the caller for one extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Script {
    Hindi,
    Marathi,
    Tamil,
    Malayalam,
    Kannada,
    Telugu,
    Bengali,
    Odia,
    Punjabi,
    Gujarati,
    /// Latin text, or a script without a dedicated entry.
    Generic,
}

impl Script {
    pub const ALL: [Script; 11] = [
        Script::Hindi,
        Script::Marathi,
        Script::Tamil,
        Script::Malayalam,
        Script::Kannada,
        Script::Telugu,
        Script::Bengali,
        Script::Odia,
        Script::Punjabi,
        Script::Gujarati,
        Script::Generic,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Script::Hindi => "Hindi",
            Script::Marathi => "Marathi",
            Script::Tamil => "Tamil",
            Script::Malayalam => "Malayalam",
            Script::Kannada => "Kannada",
            Script::Telugu => "Telugu",
            Script::Bengali => "Bengali",
            Script::Odia => "Odia",
            Script::Punjabi => "Punjabi",
            Script::Gujarati => "Gujarati",
            Script::Generic => "Generic",
        }
    }

    /// Unicode block holding the script's letters. `None` for `Generic`.
    pub fn unicode_block(self) -> Option<RangeInclusive<char>> {
        match self {
            Script::Hindi | Script::Marathi => Some('\u{0900}'..='\u{097F}'),
            Script::Bengali => Some('\u{0980}'..='\u{09FF}'),
            Script::Punjabi => Some('\u{0A00}'..='\u{0A7F}'),
            Script::Gujarati => Some('\u{0A80}'..='\u{0AFF}'),
            Script::Odia => Some('\u{0B00}'..='\u{0B7F}'),
            Script::Tamil => Some('\u{0B80}'..='\u{0BFF}'),
            Script::Telugu => Some('\u{0C00}'..='\u{0C7F}'),
            Script::Kannada => Some('\u{0C80}'..='\u{0CFF}'),
            Script::Malayalam => Some('\u{0D00}'..='\u{0D7F}'),
            Script::Generic => None,
        }
    }

    pub fn is_latin(self) -> bool {
        matches!(self, Script::Generic)
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Script {
    type Err = LipiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let script = match s.trim().to_lowercase().as_str() {
            "hindi" => Script::Hindi,
            "marathi" => Script::Marathi,
            "tamil" => Script::Tamil,
            "malayalam" => Script::Malayalam,
            "kannada" => Script::Kannada,
            "telugu" => Script::Telugu,
            "bengali" | "bangla" => Script::Bengali,
            "odia" | "oriya" => Script::Odia,
            "punjabi" | "gurmukhi" => Script::Punjabi,
            "gujarati" => Script::Gujarati,
            "generic" | "english" | "latin" => Script::Generic,
            _ => return Err(LipiError::UnsupportedScript(s.to_string())),
        };
        Ok(script)
    }
}
