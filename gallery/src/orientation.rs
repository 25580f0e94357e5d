use api_client::MediaFile;
use serde::{Deserialize, Serialize};

/// Width/height ratios below this are portrait.
pub const PORTRAIT_BELOW: f64 = 0.9;
/// Width/height ratios above this are landscape.
pub const LANDSCAPE_ABOVE: f64 = 1.1;

const PORTRAIT_WORDS: [&str; 4] = ["portrait", "vertical", "selfie", "story"];
const LANDSCAPE_WORDS: [&str; 5] = ["landscape", "panorama", "pano", "horizontal", "wide"];
const SQUARE_WORDS: [&str; 1] = ["square"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
    Square,
}

impl Orientation {
    pub const ALL: [Orientation; 3] = [
        Orientation::Portrait,
        Orientation::Landscape,
        Orientation::Square,
    ];

    pub fn from_dimensions(width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        let ratio = width as f64 / height as f64;
        Some(if ratio < PORTRAIT_BELOW {
            Orientation::Portrait
        } else if ratio > LANDSCAPE_ABOVE {
            Orientation::Landscape
        } else {
            Orientation::Square
        })
    }

    /// Last-resort guess from keywords in a file name.
    pub fn guess_from_name(name: &str) -> Option<Self> {
        let name = name.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| name.contains(w));
        if has(&PORTRAIT_WORDS) {
            Some(Orientation::Portrait)
        } else if has(&LANDSCAPE_WORDS) {
            Some(Orientation::Landscape)
        } else if has(&SQUARE_WORDS) {
            Some(Orientation::Square)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Orientation::Portrait => "Portrait",
            Orientation::Landscape => "Landscape",
            Orientation::Square => "Square",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for Orientation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "portrait" => Ok(Orientation::Portrait),
            "landscape" => Ok(Orientation::Landscape),
            "square" => Ok(Orientation::Square),
            other => Err(format!("unknown orientation: {}", other)),
        }
    }
}

/// Where an orientation came from, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrientationSource {
    Metadata,
    Measured,
    FilenameGuess,
    Default,
}

/// Provider dimensions, then measured dimensions, then the file name.
/// Falls back to landscape until a measurement arrives.
pub fn resolve(file: &MediaFile, measured: Option<(u32, u32)>) -> (Orientation, OrientationSource) {
    if let Some(o) = file
        .dimensions()
        .and_then(|(w, h)| Orientation::from_dimensions(w, h))
    {
        return (o, OrientationSource::Metadata);
    }
    if let Some(o) = measured.and_then(|(w, h)| Orientation::from_dimensions(w, h)) {
        return (o, OrientationSource::Measured);
    }
    if let Some(o) = Orientation::guess_from_name(&file.name) {
        return (o, OrientationSource::FilenameGuess);
    }
    (Orientation::Landscape, OrientationSource::Default)
}
