use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// What a zap carries.
///
/// The wire form is upper case (`"IMAGE"`, `"PDF"`, ...). Parsing is
/// case-insensitive and accepts the generic-file aliases used by older
/// clients.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ContentKind {
    Image,
    Pdf,
    Video,
    Audio,
    Document,
    #[serde(alias = "GENERIC_FILE", alias = "GENERIC-FILE")]
    File,
    Url,
    Text,
}

impl ContentKind {
    pub const ALL: [ContentKind; 8] = [
        Self::Image,
        Self::Pdf,
        Self::Video,
        Self::Audio,
        Self::Document,
        Self::File,
        Self::Url,
        Self::Text,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "IMAGE",
            Self::Pdf => "PDF",
            Self::Video => "VIDEO",
            Self::Audio => "AUDIO",
            Self::Document => "DOCUMENT",
            Self::File => "FILE",
            Self::Url => "URL",
            Self::Text => "TEXT",
        }
    }
}

impl FromStr for ContentKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        match upper.as_str() {
            "IMAGE" => Ok(Self::Image),
            "PDF" => Ok(Self::Pdf),
            "VIDEO" => Ok(Self::Video),
            "AUDIO" => Ok(Self::Audio),
            "DOCUMENT" => Ok(Self::Document),
            "FILE" | "GENERIC_FILE" | "GENERIC-FILE" => Ok(Self::File),
            "URL" => Ok(Self::Url),
            "TEXT" => Ok(Self::Text),
            _ => Err(TypeError::UnknownKind(s.to_string())),
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
