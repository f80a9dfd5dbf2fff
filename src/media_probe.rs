//! Advisory duration reader backed by `lofty`.

use std::path::Path;

use lofty::file::AudioFile;
use lofty::read_from_path;

/// Reads the duration of a media file as a `m:ss` display string.
///
/// Returns `None` when the file is missing or unreadable; the cached value
/// already stored on the song stays in place in that case.
pub fn probe_duration(path: &Path) -> Option<String> {
    let tagged_file = read_from_path(path).ok()?;
    let seconds = tagged_file.properties().duration().as_secs();
    Some(format_duration(seconds))
}

/// Formats whole seconds as `m:ss`.
pub fn format_duration(total_seconds: u64) -> String {
    format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::{format_duration, probe_duration};
    use std::path::Path;

    #[test]
    fn test_format_duration_pads_seconds() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(7), "0:07");
        assert_eq!(format_duration(187), "3:07");
        assert_eq!(format_duration(3600), "60:00");
    }

    #[test]
    fn test_probe_duration_of_unreadable_file_is_none() {
        assert_eq!(probe_duration(Path::new("/nonexistent/track.flac")), None);
    }
}
