// storage/profile.rs
//! Upload profiles

use serde::Deserialize;

const MIB: u64 = 1024 * 1024;

const BASE_TYPES: &[&str] = &["audio/mpeg", "audio/wav", "audio/mp3"];
const EXTENDED_TYPES: &[&str] = &["audio/mpeg", "audio/wav", "audio/mp3", "audio/x-m4a"];

/// # Selects which MIME types are accepted and how large an upload may be
///
/// * `Base`        - MP3 and WAV, up to 50 MiB
/// * `Extended`    - MP3, WAV, and M4A, up to 150 MiB
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum UploadProfile {
    #[default]
    Base,
    Extended,
}

impl UploadProfile {
    pub const fn allowed_types(self) -> &'static [&'static str] {
        match self {
            | Self::Base => BASE_TYPES,
            | Self::Extended => EXTENDED_TYPES,
        }
    }

    pub const fn default_max_size(self) -> u64 {
        match self {
            | Self::Base => 50 * MIB,
            | Self::Extended => 150 * MIB,
        }
    }

    /// Human readable list used in rejection messages
    pub const fn type_hint(self) -> &'static str {
        match self {
            | Self::Base => "MP3/WAV",
            | Self::Extended => "MP3/WAV/M4A",
        }
    }

    /// # Checks a declared content type against the allow-list
    ///
    /// Parameters such as `; charset=...` are ignored, and the comparison is case insensitive.
    pub fn allows(self, content_type: &str) -> bool {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim();

        self.allowed_types()
            .iter()
            .any(|t| t.eq_ignore_ascii_case(essence))
    }
}

#[cfg(test)]
mod test {
    use super::UploadProfile;

    #[test]
    fn base_rejects_m4a() {
        assert!(UploadProfile::Base.allows("audio/mpeg"));
        assert!(UploadProfile::Base.allows("audio/mp3"));
        assert!(UploadProfile::Base.allows("audio/wav"));
        assert!(!UploadProfile::Base.allows("audio/x-m4a"));
        assert!(!UploadProfile::Base.allows("image/png"));
    }

    #[test]
    fn extended_accepts_m4a() {
        assert!(UploadProfile::Extended.allows("audio/x-m4a"));
        assert!(UploadProfile::Extended.allows("audio/mpeg"));
    }

    #[test]
    fn parameters_are_ignored() {
        assert!(UploadProfile::Base.allows("Audio/MPEG; foo=bar"));
        assert!(!UploadProfile::Base.allows(""));
    }

    #[test]
    fn ceilings() {
        assert_eq!(UploadProfile::Base.default_max_size(), 50 * 1024 * 1024);
        assert_eq!(UploadProfile::Extended.default_max_size(), 150 * 1024 * 1024);
    }

    #[test]
    fn deserializes_lowercase() {
        #[derive(serde::Deserialize)]
        struct Wrapper {
            profile: UploadProfile,
        }

        let w: Wrapper = toml::from_str("profile = \"extended\"").unwrap();
        assert_eq!(w.profile, UploadProfile::Extended);
    }
}
