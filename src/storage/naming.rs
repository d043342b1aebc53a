// storage/naming.rs
//! Filename generation and inspection

use std::time::{
    SystemTime,
    UNIX_EPOCH,
};

use rand::Rng;

/// Extensions returned by listings, compared case insensitively
pub const LISTED_EXTENSIONS: &[&str] = &["mp3", "wav"];

const MAX_SUFFIX: u32 = 1_000_000_000;

/// # Returns the extension of an uploaded file's original name, including the dot
///
/// Only the last path component is considered. Names without a dot, names with a single leading
/// dot and nothing else (`.bashrc`), and `..` have no extension. Case is preserved.
pub fn extname(original: &str) -> &str {
    let base = original.rsplit(['/', '\\']).next().unwrap_or(original);

    match base.rfind('.') {
        | Some(0) | None => "",
        | Some(_) if base == ".." => "",
        | Some(i) => &base[i..],
    }
}

/// # Generates a storage name for an upload
///
/// The name is `<unix millis>-<random 0..=1e9><ext>`.
pub fn generate_filename(ext: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let suffix = rand::rng().random_range(0..=MAX_SUFFIX);

    format!("{millis}-{suffix}{ext}")
}

/// # Checks whether a stored filename should appear in listings
pub fn is_listed_audio(filename: &str) -> bool {
    let ext = extname(filename);
    let Some(ext) = ext.strip_prefix('.') else {
        return false;
    };

    LISTED_EXTENSIONS
        .iter()
        .any(|l| l.eq_ignore_ascii_case(ext))
}

/// # Checks whether a requested name maps to a single visible file in the storage directory
///
/// Rejects separators, parent references, NUL, and dotfiles.
pub fn is_plain_filename(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\', '\0'])
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn extname_basic() {
        assert_eq!(extname("song.mp3"), ".mp3");
        assert_eq!(extname("Song.MP3"), ".MP3");
        assert_eq!(extname("archive.tar.wav"), ".wav");
        assert_eq!(extname("README"), "");
        assert_eq!(extname("trailing."), ".");
    }

    #[test]
    fn extname_dotfiles() {
        assert_eq!(extname(".hidden"), "");
        assert_eq!(extname(".."), "");
        assert_eq!(extname(".hidden.wav"), ".wav");
        assert_eq!(extname("..mp3"), ".mp3");
        assert_eq!(extname("..a"), ".a");
        assert_eq!(extname("..."), ".");
        assert_eq!(extname("dir/.."), "");
    }

    #[test]
    fn extname_ignores_directories() {
        assert_eq!(extname("some.dir/track"), "");
        assert_eq!(extname("C:\\music.d\\track.wav"), ".wav");
    }

    #[test]
    fn generated_names_keep_extension() {
        let name = generate_filename(".Wav");
        assert!(name.ends_with(".Wav"));

        let (millis, rest) = name.split_once('-').unwrap();
        assert!(millis.parse::<u128>().is_ok());
        let suffix = rest.strip_suffix(".Wav").unwrap();
        assert!(suffix.parse::<u32>().unwrap() <= MAX_SUFFIX);
    }

    #[test]
    fn generated_names_differ() {
        let a = generate_filename(".mp3");
        let b = generate_filename(".mp3");
        // Astronomically unlikely to collide within the same millisecond
        assert_ne!(a, b);
    }

    #[test]
    fn listing_filter() {
        assert!(is_listed_audio("1-2.mp3"));
        assert!(is_listed_audio("1-2.WAV"));
        assert!(!is_listed_audio("1-2.m4a"));
        assert!(!is_listed_audio("notes.txt"));
        assert!(!is_listed_audio("mp3"));
    }

    #[test]
    fn plain_filenames() {
        assert!(is_plain_filename("1-2.mp3"));
        assert!(!is_plain_filename(""));
        assert!(!is_plain_filename(".."));
        assert!(!is_plain_filename("../secret"));
        assert!(!is_plain_filename("a/b.mp3"));
        assert!(!is_plain_filename("a\\b.mp3"));
        assert!(!is_plain_filename(".env"));
    }
}
