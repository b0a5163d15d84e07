mod config;
mod episode;
mod fs;
mod rename;

use clap::Parser;
use std::path::PathBuf;

use config::{Config, ConfigError, RawConfig};

const EXAMPLES: &str = "\
Examples:
  (show renames without actually renaming)
  vsrename --vext=mkv --subregex='x([0-9]+)' --vidregex='E([0-9]+)'

  (show renames and actually rename)
  vsrename --vext=mkv --subregex='x([0-9]+)' --vidregex='E([0-9]+)' -w";

/// Renames video files after the subtitle files of the same episode.
#[derive(Parser)]
#[command(name = "vsrename", after_help = EXAMPLES)]
struct Args {
    /// The extension of the subtitle files (e.g. 'srt') [default: srt]
    #[arg(long, visible_alias = "sext")]
    subext: Option<String>,

    /// The extension of the video files (e.g. 'mp4') [default: mkv]
    #[arg(long, visible_alias = "vext")]
    vidext: Option<String>,

    /// The regex to identify the episode of each subtitle file (as a regex group) [default: x([0-9]+)]
    #[arg(long)]
    subregex: Option<String>,

    /// The regex to identify the episode of each video file (as a regex group) [default: E([0-9]+)]
    #[arg(long)]
    vidregex: Option<String>,

    /// The directory of the video files, which also receives the renamed videos and copied
    /// subtitles [default: .]
    #[arg(long)]
    vidpath: Option<PathBuf>,

    /// The directory of the subtitle files [default: ./subs]
    #[arg(long)]
    subpath: Option<PathBuf>,

    /// Actually perform the rename. Without this, only prints out what would be done.
    #[arg(short, long)]
    write: bool,

    /// TOML file with defaults for any of the options above.
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Args {
    fn to_raw_config(&self) -> RawConfig {
        RawConfig {
            subext: self.subext.clone(),
            vidext: self.vidext.clone(),
            subregex: self.subregex.clone(),
            vidregex: self.vidregex.clone(),
            subpath: self.subpath.clone(),
            vidpath: self.vidpath.clone(),
            write: self.write.then_some(true),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let file_config = match &args.config {
        Some(path) => config::load_file(path)?,
        None => RawConfig::default(),
    };

    let config = match Config::try_from(args.to_raw_config().or(file_config)) {
        Ok(config) => config,
        Err(err @ ConfigError::MissingRegex) => {
            println!("{err}");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    if let Err(err) = rename::run(&config, fs::new_instance().as_ref()) {
        println!("{err}");
    }

    Ok(())
}
