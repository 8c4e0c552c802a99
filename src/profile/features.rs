//! Feature Normalizer: turns a profile into the fixed 25-slot vector the
//! genre classifier was trained on.
//!
//! Normalization never fails on a field. Anything missing or unreadable is
//! replaced with the slot's default.

use super::profile_models::{ListenedGenre, ProfileError, ProfileValue, UserProfile};
use serde::Serialize;
use serde_json::Value;
use std::ops::Index;

pub const FEATURE_COUNT: usize = 25;

const DEFAULT_AGE: f64 = 25.0;
const DEFAULT_HOURS_PER_DAY: f64 = 2.0;
const DEFAULT_BPM: f64 = 120.0;
const DEFAULT_FREQUENCY: f64 = 2.0;
const DEFAULT_MOOD_SCALE: f64 = 5.0;
const DEFAULT_FLAG: f64 = 0.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureSlot {
    Age,
    HoursPerDay,
    WhileWorking,
    Instrumentalist,
    Composer,
    Exploratory,
    ForeignLanguages,
    Bpm,
    FrequencyClassical,
    FrequencyEdm,
    FrequencyFolk,
    FrequencyGospel,
    FrequencyHipHop,
    FrequencyJazz,
    FrequencyKPop,
    FrequencyMetal,
    FrequencyPop,
    FrequencyRnB,
    FrequencyRock,
    FrequencyVideoGameMusic,
    Anxiety,
    Depression,
    Insomnia,
    Ocd,
    MusicEffect,
}

impl FeatureSlot {
    pub const ALL: [FeatureSlot; FEATURE_COUNT] = [
        FeatureSlot::Age,
        FeatureSlot::HoursPerDay,
        FeatureSlot::WhileWorking,
        FeatureSlot::Instrumentalist,
        FeatureSlot::Composer,
        FeatureSlot::Exploratory,
        FeatureSlot::ForeignLanguages,
        FeatureSlot::Bpm,
        FeatureSlot::FrequencyClassical,
        FeatureSlot::FrequencyEdm,
        FeatureSlot::FrequencyFolk,
        FeatureSlot::FrequencyGospel,
        FeatureSlot::FrequencyHipHop,
        FeatureSlot::FrequencyJazz,
        FeatureSlot::FrequencyKPop,
        FeatureSlot::FrequencyMetal,
        FeatureSlot::FrequencyPop,
        FeatureSlot::FrequencyRnB,
        FeatureSlot::FrequencyRock,
        FeatureSlot::FrequencyVideoGameMusic,
        FeatureSlot::Anxiety,
        FeatureSlot::Depression,
        FeatureSlot::Insomnia,
        FeatureSlot::Ocd,
        FeatureSlot::MusicEffect,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn name(&self) -> &'static str {
        match self {
            FeatureSlot::Age => "age",
            FeatureSlot::HoursPerDay => "hours_per_day",
            FeatureSlot::WhileWorking => "while_working",
            FeatureSlot::Instrumentalist => "instrumentalist",
            FeatureSlot::Composer => "composer",
            FeatureSlot::Exploratory => "exploratory",
            FeatureSlot::ForeignLanguages => "foreign_languages",
            FeatureSlot::Bpm => "bpm",
            FeatureSlot::FrequencyClassical => "frequency_classical",
            FeatureSlot::FrequencyEdm => "frequency_edm",
            FeatureSlot::FrequencyFolk => "frequency_folk",
            FeatureSlot::FrequencyGospel => "frequency_gospel",
            FeatureSlot::FrequencyHipHop => "frequency_hip_hop",
            FeatureSlot::FrequencyJazz => "frequency_jazz",
            FeatureSlot::FrequencyKPop => "frequency_k_pop",
            FeatureSlot::FrequencyMetal => "frequency_metal",
            FeatureSlot::FrequencyPop => "frequency_pop",
            FeatureSlot::FrequencyRnB => "frequency_rnb",
            FeatureSlot::FrequencyRock => "frequency_rock",
            FeatureSlot::FrequencyVideoGameMusic => "frequency_video_game_music",
            FeatureSlot::Anxiety => "anxiety",
            FeatureSlot::Depression => "depression",
            FeatureSlot::Insomnia => "insomnia",
            FeatureSlot::Ocd => "ocd",
            FeatureSlot::MusicEffect => "music_effect",
        }
    }

    fn frequency(genre: ListenedGenre) -> FeatureSlot {
        FeatureSlot::ALL[FeatureSlot::FrequencyClassical.index() + genre.index()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn new(values: [f64; FEATURE_COUNT]) -> Self {
        FeatureVector(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn named(&self) -> Vec<(&'static str, f64)> {
        FeatureSlot::ALL
            .iter()
            .map(|slot| (slot.name(), self[*slot]))
            .collect()
    }
}

impl Index<FeatureSlot> for FeatureVector {
    type Output = f64;

    fn index(&self, slot: FeatureSlot) -> &f64 {
        &self.0[slot.index()]
    }
}

fn frequency_label(text: &str) -> Option<f64> {
    match text.to_lowercase().as_str() {
        "never" => Some(0.0),
        "rarely" => Some(1.0),
        "sometimes" => Some(2.0),
        "very frequently" => Some(3.0),
        _ => None,
    }
}

/// Reads a value as a number, or None when it carries no usable number.
pub fn try_coerce(value: &ProfileValue) -> Option<f64> {
    match value {
        ProfileValue::Number(n) => Some(*n).filter(|n| n.is_finite()),
        ProfileValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        ProfileValue::Text(text) => {
            let text = text.trim();
            if let Some(number) = text.parse::<f64>().ok().filter(|n| n.is_finite()) {
                return Some(number);
            }
            match text.to_lowercase().as_str() {
                "yes" => Some(1.0),
                "no" => Some(0.0),
                _ => frequency_label(text),
            }
        }
    }
}

pub fn coerce(value: Option<&ProfileValue>, default: f64) -> f64 {
    value.and_then(try_coerce).unwrap_or(default)
}

fn flag(value: Option<&ProfileValue>) -> f64 {
    if coerce(value, DEFAULT_FLAG) != 0.0 {
        1.0
    } else {
        0.0
    }
}

fn music_effect(value: Option<&ProfileValue>) -> f64 {
    match value {
        Some(ProfileValue::Text(text)) if text.trim().eq_ignore_ascii_case("improve") => 1.0,
        other => flag(other),
    }
}

fn frequency(profile: &UserProfile, genre: ListenedGenre) -> f64 {
    let report = profile.frequencies.get(genre);
    report
        .underscore
        .as_ref()
        .and_then(try_coerce)
        .or_else(|| report.bracket.as_ref().and_then(try_coerce))
        .unwrap_or(DEFAULT_FREQUENCY)
}

pub fn normalize(profile: &UserProfile) -> FeatureVector {
    let mut values = [0.0; FEATURE_COUNT];
    let mut set = |slot: FeatureSlot, value: f64| values[slot.index()] = value;

    set(FeatureSlot::Age, coerce(profile.age.as_ref(), DEFAULT_AGE));
    set(
        FeatureSlot::HoursPerDay,
        coerce(profile.hours_per_day.as_ref(), DEFAULT_HOURS_PER_DAY),
    );
    set(FeatureSlot::WhileWorking, flag(profile.while_working.as_ref()));
    set(
        FeatureSlot::Instrumentalist,
        flag(profile.instrumentalist.as_ref()),
    );
    set(FeatureSlot::Composer, flag(profile.composer.as_ref()));
    set(FeatureSlot::Exploratory, flag(profile.exploratory.as_ref()));
    set(
        FeatureSlot::ForeignLanguages,
        flag(profile.foreign_languages.as_ref()),
    );
    set(FeatureSlot::Bpm, coerce(profile.bpm.as_ref(), DEFAULT_BPM));
    for genre in ListenedGenre::ALL {
        set(FeatureSlot::frequency(genre), frequency(profile, genre));
    }
    set(
        FeatureSlot::Anxiety,
        coerce(profile.anxiety.as_ref(), DEFAULT_MOOD_SCALE),
    );
    set(
        FeatureSlot::Depression,
        coerce(profile.depression.as_ref(), DEFAULT_MOOD_SCALE),
    );
    set(
        FeatureSlot::Insomnia,
        coerce(profile.insomnia.as_ref(), DEFAULT_MOOD_SCALE),
    );
    set(
        FeatureSlot::Ocd,
        coerce(profile.ocd.as_ref(), DEFAULT_MOOD_SCALE),
    );
    set(
        FeatureSlot::MusicEffect,
        music_effect(profile.music_effects.as_ref()),
    );

    FeatureVector(values)
}

pub fn normalize_document(document: &Value) -> Result<FeatureVector, ProfileError> {
    UserProfile::from_document(document).map(|profile| normalize(&profile))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn features(document: Value) -> FeatureVector {
        normalize_document(&document).unwrap()
    }

    #[test]
    fn empty_profile_gets_all_defaults() {
        let vector = features(json!({}));

        assert_eq!(vector.as_slice().len(), FEATURE_COUNT);
        assert_eq!(vector[FeatureSlot::Age], 25.0);
        assert_eq!(vector[FeatureSlot::HoursPerDay], 2.0);
        assert_eq!(vector[FeatureSlot::Bpm], 120.0);
        for slot in &FeatureSlot::ALL[FeatureSlot::FrequencyClassical.index()
            ..=FeatureSlot::FrequencyVideoGameMusic.index()]
        {
            assert_eq!(vector[*slot], 2.0, "{}", slot.name());
        }
        for slot in [
            FeatureSlot::Anxiety,
            FeatureSlot::Depression,
            FeatureSlot::Insomnia,
            FeatureSlot::Ocd,
        ] {
            assert_eq!(vector[slot], 5.0);
        }
        for slot in [
            FeatureSlot::WhileWorking,
            FeatureSlot::Instrumentalist,
            FeatureSlot::Composer,
            FeatureSlot::Exploratory,
            FeatureSlot::ForeignLanguages,
            FeatureSlot::MusicEffect,
        ] {
            assert_eq!(vector[slot], 0.0);
        }
    }

    #[test]
    fn slots_follow_declared_order() {
        for (position, slot) in FeatureSlot::ALL.iter().enumerate() {
            assert_eq!(slot.index(), position);
        }
        assert_eq!(FeatureSlot::ALL[8], FeatureSlot::FrequencyClassical);
        assert_eq!(FeatureSlot::ALL[19], FeatureSlot::FrequencyVideoGameMusic);
        assert_eq!(FeatureSlot::ALL[24], FeatureSlot::MusicEffect);
    }

    #[test]
    fn every_field_lands_in_its_own_slot() {
        let vector = features(json!({
            "Age": 31,
            "Hours per day": 4.5,
            "BPM": 97,
            "Frequency [Classical]": 10,
            "Frequency [EDM]": 11,
            "Frequency [Folk]": 12,
            "Frequency [Gospel]": 13,
            "Frequency [Hip hop]": 14,
            "Frequency [Jazz]": 15,
            "Frequency [K pop]": 16,
            "Frequency [Metal]": 17,
            "Frequency [Pop]": 18,
            "Frequency [R&B]": 19,
            "Frequency [Rock]": 20,
            "Frequency [Video game music]": 21,
            "Anxiety": 6,
            "Depression": 7,
            "Insomnia": 8,
            "OCD": 9,
        }));

        #[rustfmt::skip]
        let expected = [
            31.0, 4.5, 0.0, 0.0, 0.0, 0.0, 0.0, 97.0,
            10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0, 17.0, 18.0, 19.0, 20.0, 21.0,
            6.0, 7.0, 8.0, 9.0, 0.0,
        ];
        assert_eq!(vector.as_slice(), &expected[..]);
    }

    #[test]
    fn each_flag_sets_only_its_slot() {
        let flags = [
            ("While working", FeatureSlot::WhileWorking),
            ("Instrumentalist", FeatureSlot::Instrumentalist),
            ("Composer", FeatureSlot::Composer),
            ("Exploratory", FeatureSlot::Exploratory),
            ("Foreign languages", FeatureSlot::ForeignLanguages),
            ("Music effects", FeatureSlot::MusicEffect),
        ];

        for (key, slot) in flags {
            let vector = features(json!({ key: "Yes" }));
            let baseline = features(json!({}));
            for other in FeatureSlot::ALL {
                let expected = if other == slot { 1.0 } else { baseline[other] };
                assert_eq!(vector[other], expected, "{} -> {}", key, other.name());
            }
        }
    }

    #[test]
    fn readable_alias_wins_over_blank_spelling() {
        let vector = features(json!({"Hours per day": "", "Hours_per_day": 4}));
        assert_eq!(vector[FeatureSlot::HoursPerDay], 4.0);
    }

    #[test]
    fn questionnaire_example() {
        let vector = features(json!({
            "Age": 30,
            "Hours per day": 3,
            "While working": "Yes",
            "Frequency [Rock]": "Very frequently",
        }));

        assert_eq!(vector[FeatureSlot::Age], 30.0);
        assert_eq!(vector[FeatureSlot::HoursPerDay], 3.0);
        assert_eq!(vector[FeatureSlot::WhileWorking], 1.0);
        assert_eq!(vector[FeatureSlot::FrequencyRock], 3.0);
        assert_eq!(vector[FeatureSlot::FrequencyPop], 2.0);
    }

    #[test]
    fn frequency_labels_are_ordered() {
        let labels = ["Never", "Rarely", "Sometimes", "Very frequently"];
        let encoded: Vec<f64> = labels
            .iter()
            .map(|label| features(json!({ "Frequency [Jazz]": label }))[FeatureSlot::FrequencyJazz])
            .collect();

        assert_eq!(encoded, vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(
            features(json!({"Frequency [Jazz]": "VERY FREQUENTLY"}))[FeatureSlot::FrequencyJazz],
            3.0
        );
    }

    #[test]
    fn underscore_frequency_wins_over_bracket() {
        let vector = features(json!({
            "Frequency_Metal": "Never",
            "Frequency [Metal]": "Very frequently",
        }));
        assert_eq!(vector[FeatureSlot::FrequencyMetal], 0.0);
    }

    #[test]
    fn unreadable_underscore_frequency_falls_back_to_bracket() {
        let vector = features(json!({
            "Frequency_EDM": "loads",
            "Frequency [EDM]": "Rarely",
            "Frequency_RnB": "whatever",
        }));
        assert_eq!(vector[FeatureSlot::FrequencyEdm], 1.0);
        assert_eq!(vector[FeatureSlot::FrequencyRnB], 2.0);
    }

    #[test]
    fn numeric_text_and_garbage() {
        let vector = features(json!({
            "Age": " 19 ",
            "BPM": "fast",
            "Hours per day": "1.5",
            "Anxiety": "no",
        }));

        assert_eq!(vector[FeatureSlot::Age], 19.0);
        assert_eq!(vector[FeatureSlot::Bpm], 120.0);
        assert_eq!(vector[FeatureSlot::HoursPerDay], 1.5);
        assert_eq!(vector[FeatureSlot::Anxiety], 0.0);
    }

    #[test]
    fn non_finite_text_uses_default() {
        let vector = features(json!({"BPM": "NaN", "Age": "inf"}));
        assert_eq!(vector[FeatureSlot::Bpm], 120.0);
        assert_eq!(vector[FeatureSlot::Age], 25.0);
    }

    #[test]
    fn flags_reduce_to_zero_or_one() {
        let vector = features(json!({
            "While working": true,
            "Instrumentalist": 4,
            "Composer": "No",
            "Exploratory": "maybe",
            "Foreign languages": false,
        }));

        assert_eq!(vector[FeatureSlot::WhileWorking], 1.0);
        assert_eq!(vector[FeatureSlot::Instrumentalist], 1.0);
        assert_eq!(vector[FeatureSlot::Composer], 0.0);
        assert_eq!(vector[FeatureSlot::Exploratory], 0.0);
        assert_eq!(vector[FeatureSlot::ForeignLanguages], 0.0);
    }

    #[test]
    fn music_effect_improve_only() {
        for (answer, expected) in [
            (json!("Improve"), 1.0),
            (json!("improve"), 1.0),
            (json!("No effect"), 0.0),
            (json!("Worsen"), 0.0),
            (json!(1), 1.0),
        ] {
            let vector = features(json!({ "Music effects": answer }));
            assert_eq!(vector[FeatureSlot::MusicEffect], expected);
        }
    }

    #[test]
    fn rejects_non_mapping() {
        assert_eq!(
            normalize_document(&json!(null)),
            Err(ProfileError::NotAMapping)
        );
    }

    #[test]
    fn named_features_cover_every_slot() {
        let named = features(json!({"Age": 50})).named();
        assert_eq!(named.len(), FEATURE_COUNT);
        assert_eq!(named[0], ("age", 50.0));
        assert_eq!(named[24].0, "music_effect");
    }
}
