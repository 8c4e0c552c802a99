use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// The classifier's output classes, in class-index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Genre {
    Rock,
    Pop,
    Metal,
    Edm,
    HipHop,
    Classical,
    VideoGameMusic,
    RnB,
}

pub const GENRE_COUNT: usize = 8;

impl Genre {
    pub const ALL: [Genre; GENRE_COUNT] = [
        Genre::Rock,
        Genre::Pop,
        Genre::Metal,
        Genre::Edm,
        Genre::HipHop,
        Genre::Classical,
        Genre::VideoGameMusic,
        Genre::RnB,
    ];

    /// Maps any class index the model may produce onto a label, clamping
    /// out-of-range (including negative) indices to the nearest end.
    pub fn from_class_index(index: i64) -> Genre {
        let clamped = index.clamp(0, GENRE_COUNT as i64 - 1);
        Genre::ALL[clamped as usize]
    }

    pub fn class_index(&self) -> usize {
        *self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Genre::Rock => "Rock",
            Genre::Pop => "Pop",
            Genre::Metal => "Metal",
            Genre::Edm => "EDM",
            Genre::HipHop => "Hip hop",
            Genre::Classical => "Classical",
            Genre::VideoGameMusic => "Video game music",
            Genre::RnB => "R&B",
        }
    }

    pub fn composition_prompt(&self) -> &'static str {
        match self {
            Genre::Classical => {
                "Compose a serene classical piano piece reminiscent of a peaceful afternoon in a garden."
            }
            Genre::Edm => {
                "Create an upbeat and energetic electronic dance track suitable for a vibrant festival atmosphere."
            }
            Genre::HipHop => {
                "Generate a laid-back hip hop beat with a smooth rhythm and catchy bassline."
            }
            Genre::Metal => {
                "Produce a high-intensity metal track with fast guitar riffs and powerful drum beats."
            }
            Genre::Pop => {
                "Compose a catchy pop melody with an uplifting vibe and a memorable chorus."
            }
            Genre::RnB => {
                "Create a soulful R&B track with a slow groove and emotional vocal harmonies."
            }
            Genre::Rock => {
                "Generate a classic rock anthem with strong guitar chords and a steady, driving beat."
            }
            Genre::VideoGameMusic => {
                "Compose an adventurous theme suitable for an action-packed video game level."
            }
        }
    }

    /// Genre tag sent alongside the composition prompt.
    pub fn composition_tag(&self) -> String {
        match self {
            Genre::VideoGameMusic => "electronic".to_string(),
            other => other.as_str().to_lowercase(),
        }
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Genre {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Genre::ALL
            .iter()
            .find(|genre| genre.as_str().eq_ignore_ascii_case(wanted))
            .copied()
            .ok_or_else(|| format!("Unknown genre: {}", s))
    }
}

impl Serialize for Genre {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
