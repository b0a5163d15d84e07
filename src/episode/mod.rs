use regex::Regex;
use std::ffi::OsStr;
use std::path::Path;

/// Returns capture group 1 of the first match of `re` in `name`.
///
/// A match without group 1, or with an empty group 1, counts as no match.
pub fn extract_episode<'a>(re: &Regex, name: &'a str) -> Option<&'a str> {
    re.captures(name)?
        .get(1)
        .map(|m| m.as_str())
        .filter(|episode| !episode.is_empty())
}

/// Like `extract_episode`, but matches against the file name of `path`.
///
/// The directories in `path` are ignored on purpose, so a directory such as `E01-pack/` does not
/// give every file inside it the same episode.
pub fn extract_episode_from_path<'a>(re: &Regex, path: &'a Path) -> Option<&'a str> {
    let file_name = path.file_name().and_then(OsStr::to_str)?;
    extract_episode(re, file_name)
}
