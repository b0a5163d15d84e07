use console::Style;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::Config;
use crate::episode;
use crate::fs::{self, CollectFilesError, Filesystem};

/// Episode key to subtitle path. When several subtitles share a key, the last one indexed wins.
pub type SubtitleIndex = HashMap<String, PathBuf>;

#[derive(Clone, Debug, PartialEq)]
pub struct PlanEntry {
    pub video: PathBuf,
    pub target: PathBuf,
    pub subtitle: PathBuf,
}

#[derive(Debug, PartialEq)]
pub enum VideoOutcome {
    SkippedNoEpisode,
    SkippedNoSubtitle,
    Planned(PlanEntry),
    Renamed {
        entry: PlanEntry,
        rename_ok: bool,
        copy_ok: bool,
    },
}

#[derive(Debug, PartialEq)]
pub enum RunSummary {
    NoVideos,
    NoSubtitles,
    Completed { renamed: usize },
}

#[derive(Debug, Error)]
#[error("Find {kind} files: {source}")]
pub struct DiscoveryError {
    kind: &'static str,
    source: CollectFilesError,
}

fn skipped() -> Style {
    Style::new().red()
}

fn warning() -> Style {
    Style::new().yellow()
}

pub fn build_subtitle_index(subtitles: &[PathBuf], re: &Regex) -> SubtitleIndex {
    let mut index = SubtitleIndex::new();
    for subtitle in subtitles {
        let Some(episode) = episode::extract_episode_from_path(re, subtitle) else {
            println!(
                "  {} Ignoring subtitle file '{}' (does not match regex).",
                skipped().apply_to("[X]"),
                subtitle.display()
            );
            continue;
        };
        index.insert(episode.to_owned(), subtitle.clone());
    }
    index
}

/// Name for a video renamed after `subtitle`.
///
/// Note that this trims every trailing character found in `.{sub_ext}` rather than removing the
/// extension as a suffix, so `Best.srt` becomes `Be` and `Class.ass` becomes `Cl` before the
/// video extension is appended. Existing users depend on the resulting names.
pub fn target_file_name(subtitle: &Path, sub_ext: &str, vid_ext: &str) -> String {
    let name = subtitle
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default();
    let cutset = format!(".{sub_ext}");
    let stem = name.trim_end_matches(|c: char| cutset.contains(c));
    format!("{stem}.{vid_ext}")
}

pub fn process_video(
    video: &Path,
    config: &Config,
    index: &SubtitleIndex,
    filesystem: &dyn Filesystem,
) -> VideoOutcome {
    let Some(episode) = episode::extract_episode_from_path(&config.vid_regex, video) else {
        println!(
            "  {} '{}' -> Skipping (episode not found matching regex).",
            skipped().apply_to("[X]"),
            video.display()
        );
        return VideoOutcome::SkippedNoEpisode;
    };

    let Some(subtitle) = index.get(episode) else {
        println!(
            "  {} '{}' -> No subtitle file found. Skipping.",
            skipped().apply_to("[X]"),
            video.display()
        );
        return VideoOutcome::SkippedNoSubtitle;
    };

    let entry = PlanEntry {
        video: video.to_path_buf(),
        target: fs::join_clean(
            &config.vid_path,
            target_file_name(subtitle, &config.sub_ext, &config.vid_ext),
        ),
        subtitle: subtitle.clone(),
    };
    println!(
        "  {} '{}' -> '{}'",
        Style::new().green().apply_to("[*]"),
        entry.video.display(),
        Style::new().cyan().apply_to(entry.target.display())
    );

    if !config.write {
        return VideoOutcome::Planned(entry);
    }

    // TODO: Decide whether a failed rename should skip copying the subtitle.
    let rename_ok = match filesystem.rename(&entry.video, &entry.target) {
        Ok(()) => true,
        Err(err) => {
            println!(
                "  {} Rename '{}' to '{}': {}",
                warning().apply_to("[!]"),
                entry.video.display(),
                entry.target.display(),
                err
            );
            false
        }
    };

    let copy_target = fs::join_clean(
        &config.vid_path,
        entry.subtitle.file_name().unwrap_or_default(),
    );
    let copy_ok = match filesystem.copy_file(&entry.subtitle, &copy_target) {
        Ok(()) => true,
        Err(err) => {
            println!(
                "  {} Copy subtitle '{}' to '{}': {}",
                warning().apply_to("[!]"),
                entry.subtitle.display(),
                copy_target.display(),
                err
            );
            false
        }
    };

    VideoOutcome::Renamed {
        entry,
        rename_ok,
        copy_ok,
    }
}

/// Processes `videos` in order. A video counts as renamed once a rename was attempted, whether or
/// not the rename and the subtitle copy succeeded.
pub fn process_videos(
    videos: &[PathBuf],
    config: &Config,
    index: &SubtitleIndex,
    filesystem: &dyn Filesystem,
) -> (Vec<VideoOutcome>, usize) {
    let outcomes: Vec<_> = videos
        .iter()
        .map(|video| process_video(video, config, index, filesystem))
        .collect();
    let renamed = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, VideoOutcome::Renamed { .. }))
        .count();
    (outcomes, renamed)
}

/// Discovers subtitles and videos, then renames every video with a matching subtitle.
pub fn run(config: &Config, filesystem: &dyn Filesystem) -> Result<RunSummary, DiscoveryError> {
    let subtitles =
        fs::collect_files(&config.sub_path, &config.sub_ext).map_err(|source| DiscoveryError {
            kind: "subtitle",
            source,
        })?;
    let videos =
        fs::collect_files(&config.vid_path, &config.vid_ext).map_err(|source| DiscoveryError {
            kind: "video",
            source,
        })?;

    println!(
        "Found total {} video files (*.{}) and {} subtitle files (*.{}).",
        videos.len(),
        config.vid_ext,
        subtitles.len(),
        config.sub_ext
    );
    if videos.is_empty() {
        println!("No video files found. Aborting.");
        return Ok(RunSummary::NoVideos);
    }

    let index = build_subtitle_index(&subtitles, &config.sub_regex);
    if index.is_empty() {
        println!("No subtitles matching regex found. Aborting.");
        return Ok(RunSummary::NoSubtitles);
    }

    let (_outcomes, renamed) = process_videos(&videos, config, &index, filesystem);

    println!();
    match renamed {
        0 => println!("No files renamed."),
        n => println!("{n} files renamed."),
    }
    Ok(RunSummary::Completed { renamed })
}
