use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Number, Value};
use thiserror::Error;

use super::features::try_coerce;

#[derive(Debug, Error, PartialEq)]
pub enum ProfileError {
    #[error("Profile document must be a JSON object")]
    NotAMapping,

    #[error("Mood field {field} must be between {min} and {max}, got {value}")]
    MoodOutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
}

/// A single loosely-typed answer from a profile document.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl ProfileValue {
    /// Nulls, arrays and objects carry no usable answer.
    pub fn from_json(value: &Value) -> Option<ProfileValue> {
        match value {
            Value::Bool(b) => Some(ProfileValue::Bool(*b)),
            Value::Number(n) => n.as_f64().map(ProfileValue::Number),
            Value::String(s) => Some(ProfileValue::Text(s.clone())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            ProfileValue::Bool(b) => Value::Bool(*b),
            ProfileValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
                    Value::Number(Number::from(*n as i64))
                } else {
                    Number::from_f64(*n)
                        .map(Value::Number)
                        .unwrap_or(Value::Null)
                }
            }
            ProfileValue::Text(s) => Value::String(s.clone()),
        }
    }
}

impl From<&str> for ProfileValue {
    fn from(value: &str) -> Self {
        ProfileValue::Text(value.to_string())
    }
}

impl From<f64> for ProfileValue {
    fn from(value: f64) -> Self {
        ProfileValue::Number(value)
    }
}

impl From<bool> for ProfileValue {
    fn from(value: bool) -> Self {
        ProfileValue::Bool(value)
    }
}

/// Genres the listening-frequency questionnaire asks about, in feature order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenedGenre {
    Classical,
    Edm,
    Folk,
    Gospel,
    HipHop,
    Jazz,
    KPop,
    Metal,
    Pop,
    RnB,
    Rock,
    VideoGameMusic,
}

impl ListenedGenre {
    pub const ALL: [ListenedGenre; 12] = [
        ListenedGenre::Classical,
        ListenedGenre::Edm,
        ListenedGenre::Folk,
        ListenedGenre::Gospel,
        ListenedGenre::HipHop,
        ListenedGenre::Jazz,
        ListenedGenre::KPop,
        ListenedGenre::Metal,
        ListenedGenre::Pop,
        ListenedGenre::RnB,
        ListenedGenre::Rock,
        ListenedGenre::VideoGameMusic,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn label(&self) -> &'static str {
        match self {
            ListenedGenre::Classical => "Classical",
            ListenedGenre::Edm => "EDM",
            ListenedGenre::Folk => "Folk",
            ListenedGenre::Gospel => "Gospel",
            ListenedGenre::HipHop => "Hip hop",
            ListenedGenre::Jazz => "Jazz",
            ListenedGenre::KPop => "K pop",
            ListenedGenre::Metal => "Metal",
            ListenedGenre::Pop => "Pop",
            ListenedGenre::RnB => "R&B",
            ListenedGenre::Rock => "Rock",
            ListenedGenre::VideoGameMusic => "Video game music",
        }
    }

    /// Underscore keys, canonical one first.
    pub fn underscore_keys(&self) -> &'static [&'static str] {
        match self {
            ListenedGenre::Classical => &["Frequency_Classical"],
            ListenedGenre::Edm => &["Frequency_EDM"],
            ListenedGenre::Folk => &["Frequency_Folk"],
            ListenedGenre::Gospel => &["Frequency_Gospel"],
            ListenedGenre::HipHop => &["Frequency_HipHop", "Frequency_Hip_hop"],
            ListenedGenre::Jazz => &["Frequency_Jazz"],
            ListenedGenre::KPop => &["Frequency_KPop", "Frequency_K_pop"],
            ListenedGenre::Metal => &["Frequency_Metal"],
            ListenedGenre::Pop => &["Frequency_Pop"],
            ListenedGenre::RnB => &["Frequency_RnB", "Frequency_R&B"],
            ListenedGenre::Rock => &["Frequency_Rock"],
            ListenedGenre::VideoGameMusic => &["Frequency_VGM", "Frequency_Video_game_music"],
        }
    }

    pub fn bracket_key(&self) -> String {
        format!("Frequency [{}]", self.label())
    }
}

/// Both spellings a document may use for one genre's listening frequency.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrequencyReport {
    pub underscore: Option<ProfileValue>,
    pub bracket: Option<ProfileValue>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenreFrequencies([FrequencyReport; 12]);

impl GenreFrequencies {
    pub fn get(&self, genre: ListenedGenre) -> &FrequencyReport {
        &self.0[genre.index()]
    }

    pub fn get_mut(&mut self, genre: ListenedGenre) -> &mut FrequencyReport {
        &mut self.0[genre.index()]
    }
}

/// A user's questionnaire answers. Every field is optional: documents come
/// from forms, imports and older app versions with no canonical shape.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct UserProfile {
    pub age: Option<ProfileValue>,
    pub hours_per_day: Option<ProfileValue>,
    pub while_working: Option<ProfileValue>,
    pub instrumentalist: Option<ProfileValue>,
    pub composer: Option<ProfileValue>,
    pub exploratory: Option<ProfileValue>,
    pub foreign_languages: Option<ProfileValue>,
    pub bpm: Option<ProfileValue>,
    pub frequencies: GenreFrequencies,
    pub anxiety: Option<ProfileValue>,
    pub depression: Option<ProfileValue>,
    pub insomnia: Option<ProfileValue>,
    pub ocd: Option<ProfileValue>,
    pub music_effects: Option<ProfileValue>,
    pub last_mood_update: Option<String>,
}

const AGE_KEYS: &[&str] = &["Age"];
const HOURS_KEYS: &[&str] = &["Hours per day", "Hours_per_day"];
const WHILE_WORKING_KEYS: &[&str] = &["While working", "While_working"];
const INSTRUMENTALIST_KEYS: &[&str] = &["Instrumentalist"];
const COMPOSER_KEYS: &[&str] = &["Composer"];
const EXPLORATORY_KEYS: &[&str] = &["Exploratory"];
const FOREIGN_LANGUAGES_KEYS: &[&str] = &["Foreign languages", "Foreign_languages"];
const BPM_KEYS: &[&str] = &["BPM"];
const ANXIETY_KEYS: &[&str] = &["Anxiety"];
const DEPRESSION_KEYS: &[&str] = &["Depression"];
const INSOMNIA_KEYS: &[&str] = &["Insomnia"];
const OCD_KEYS: &[&str] = &["OCD"];
const MUSIC_EFFECTS_KEYS: &[&str] = &["Music effects", "MusicEffects", "Music_effects"];
const LAST_MOOD_UPDATE_KEY: &str = "last_mood_update";

fn is_readable(value: &ProfileValue) -> bool {
    try_coerce(value).is_some()
}

fn is_readable_music_effect(value: &ProfileValue) -> bool {
    matches!(value, ProfileValue::Text(text) if text.trim().eq_ignore_ascii_case("improve"))
        || is_readable(value)
}

/// First spelling whose value reads as a number. When none does, the first
/// scalar is kept so it still round-trips through the document.
fn lookup<'a, I>(
    map: &Map<String, Value>,
    keys: I,
    readable: fn(&ProfileValue) -> bool,
) -> Option<ProfileValue>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut first_scalar = None;
    for value in keys
        .into_iter()
        .filter_map(|key| map.get(key).and_then(ProfileValue::from_json))
    {
        if readable(&value) {
            return Some(value);
        }
        first_scalar.get_or_insert(value);
    }
    first_scalar
}

impl UserProfile {
    pub fn from_document(document: &Value) -> Result<UserProfile, ProfileError> {
        let map = document.as_object().ok_or(ProfileError::NotAMapping)?;
        let field = |keys: &[&str]| lookup(map, keys.iter().copied(), is_readable);

        let mut frequencies = GenreFrequencies::default();
        for genre in ListenedGenre::ALL {
            let report = frequencies.get_mut(genre);
            report.underscore = lookup(map, genre.underscore_keys().iter().copied(), is_readable);
            report.bracket = lookup(map, [genre.bracket_key().as_str()], is_readable);
        }

        Ok(UserProfile {
            age: field(AGE_KEYS),
            hours_per_day: field(HOURS_KEYS),
            while_working: field(WHILE_WORKING_KEYS),
            instrumentalist: field(INSTRUMENTALIST_KEYS),
            composer: field(COMPOSER_KEYS),
            exploratory: field(EXPLORATORY_KEYS),
            foreign_languages: field(FOREIGN_LANGUAGES_KEYS),
            bpm: field(BPM_KEYS),
            frequencies,
            anxiety: field(ANXIETY_KEYS),
            depression: field(DEPRESSION_KEYS),
            insomnia: field(INSOMNIA_KEYS),
            ocd: field(OCD_KEYS),
            music_effects: lookup(
                map,
                MUSIC_EFFECTS_KEYS.iter().copied(),
                is_readable_music_effect,
            ),
            last_mood_update: map
                .get(LAST_MOOD_UPDATE_KEY)
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }

    /// Writes the profile back using canonical key names only.
    pub fn to_document(&self) -> Value {
        let mut map = Map::new();
        let mut put = |key: &str, value: &Option<ProfileValue>| {
            if let Some(value) = value {
                map.insert(key.to_string(), value.to_json());
            }
        };

        put(AGE_KEYS[0], &self.age);
        put(HOURS_KEYS[0], &self.hours_per_day);
        put(WHILE_WORKING_KEYS[0], &self.while_working);
        put(INSTRUMENTALIST_KEYS[0], &self.instrumentalist);
        put(COMPOSER_KEYS[0], &self.composer);
        put(EXPLORATORY_KEYS[0], &self.exploratory);
        put(FOREIGN_LANGUAGES_KEYS[0], &self.foreign_languages);
        put(BPM_KEYS[0], &self.bpm);
        for genre in ListenedGenre::ALL {
            let report = self.frequencies.get(genre);
            put(genre.underscore_keys()[0], &report.underscore);
            put(&genre.bracket_key(), &report.bracket);
        }
        put(ANXIETY_KEYS[0], &self.anxiety);
        put(DEPRESSION_KEYS[0], &self.depression);
        put(INSOMNIA_KEYS[0], &self.insomnia);
        put(OCD_KEYS[0], &self.ocd);
        put(MUSIC_EFFECTS_KEYS[0], &self.music_effects);

        if let Some(last_mood_update) = &self.last_mood_update {
            map.insert(
                LAST_MOOD_UPDATE_KEY.to_string(),
                Value::String(last_mood_update.clone()),
            );
        }
        Value::Object(map)
    }

    /// Overwrites the mood-tracking answers and stamps the update time.
    pub fn apply_mood(&mut self, mood: &MoodReport, now: DateTime<Utc>) {
        self.exploratory = Some(ProfileValue::Number(if mood.exploratory { 1.0 } else { 0.0 }));
        self.anxiety = Some(ProfileValue::Number(mood.anxiety as f64));
        self.depression = Some(ProfileValue::Number(mood.depression as f64));
        self.insomnia = Some(ProfileValue::Number(mood.insomnia as f64));
        self.ocd = Some(ProfileValue::Number(mood.ocd as f64));
        self.last_mood_update = Some(now.to_rfc3339());
    }
}

impl TryFrom<Value> for UserProfile {
    type Error = ProfileError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        UserProfile::from_document(&value)
    }
}

impl From<UserProfile> for Value {
    fn from(profile: UserProfile) -> Self {
        profile.to_document()
    }
}

pub const MOOD_SCALE_MIN: i64 = 1;
pub const MOOD_SCALE_MAX: i64 = 10;

/// Body of the mood-tracking form.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MoodReport {
    #[serde(default)]
    pub exploratory: bool,
    pub anxiety: i64,
    pub depression: i64,
    pub insomnia: i64,
    pub ocd: i64,
}

impl MoodReport {
    pub fn validate(&self) -> Result<(), ProfileError> {
        let scales = [
            ("anxiety", self.anxiety),
            ("depression", self.depression),
            ("insomnia", self.insomnia),
            ("ocd", self.ocd),
        ];
        for (field, value) in scales {
            if !(MOOD_SCALE_MIN..=MOOD_SCALE_MAX).contains(&value) {
                return Err(ProfileError::MoodOutOfRange {
                    field,
                    value,
                    min: MOOD_SCALE_MIN,
                    max: MOOD_SCALE_MAX,
                });
            }
        }
        Ok(())
    }
}
