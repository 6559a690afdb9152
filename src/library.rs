use std::path::{Path, PathBuf};

use lofty::prelude::*;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

/// An importable audio file entry.
///
/// Identity is `path`: the track list never holds two entries with the same
/// path. `name` is the display name chosen at import time and `key` mirrors a
/// "Play track" accelerator currently bound to this track, kept so the
/// persisted document round-trips it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub path: PathBuf,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

fn is_audio_file(path: &Path) -> bool {
    mime_guess::from_path(path)
        .first()
        .map(|m| m.type_() == mime_guess::mime::AUDIO)
        .unwrap_or(false)
}

/// Pick a display name for an imported file: tag title when one is readable
/// and non-empty, file stem otherwise.
fn display_name(path: &Path) -> String {
    if let Ok(tagged) = lofty::read_from_path(path) {
        if let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) {
            if let Some(title) = tag.title() {
                let title = title.trim();
                if !title.is_empty() {
                    return title.to_string();
                }
            }
        }
    }

    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("UNKNOWN")
        .to_string()
}

fn track_from_file(path: &Path) -> Track {
    Track {
        path: path.to_path_buf(),
        name: display_name(path),
        key: None,
    }
}

/// Expand a set of dropped/picked paths into tracks.
///
/// Plain files are taken as-is when they look like audio; directories are
/// scanned recursively in file-name order. Non-audio entries are skipped
/// silently. Deduplication against the existing track list happens in the
/// player, not here.
pub fn import(paths: &[PathBuf]) -> Vec<Track> {
    let mut tracks: Vec<Track> = Vec::new();
    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter()
                .filter_map(Result::ok)
            {
                let p = entry.path();
                if p.is_file() && is_audio_file(p) {
                    tracks.push(track_from_file(p));
                }
            }
        } else if path.is_file() && is_audio_file(path) {
            tracks.push(track_from_file(path));
        }
    }
    tracks
}
