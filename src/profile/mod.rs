mod features;
mod profile_models;
mod profile_store;
mod sqlite_profile_store;

pub use features::{
    coerce, normalize, normalize_document, try_coerce, FeatureSlot, FeatureVector, FEATURE_COUNT,
};
pub use profile_models::{
    FrequencyReport, GenreFrequencies, ListenedGenre, MoodReport, ProfileError, ProfileValue,
    UserProfile, MOOD_SCALE_MAX, MOOD_SCALE_MIN,
};
pub use profile_store::ProfileStore;
pub use sqlite_profile_store::SqliteProfileStore;
