//! Info subcommand - report basic facts about an audio file.

use eyre::{Result, WrapErr};
use std::path::PathBuf;
use urbs_classify::audio::{AudioDecoder, AudioInfo, SymphoniaDecoder};

/// CLI arguments for audio info.
#[derive(clap::Args, Debug)]
pub struct Args {
    /// Path to input audio file (wav, mp3, flac, ogg)
    pub path: PathBuf,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug)]
pub struct Config {
    pub path: PathBuf,
    pub json: bool,
}

impl TryFrom<Args> for Config {
    type Error = eyre::Error;

    fn try_from(args: Args) -> Result<Self> {
        Ok(Self {
            path: args.path,
            json: args.json,
        })
    }
}

pub fn execute(config: Config) -> Result<()> {
    let info = SymphoniaDecoder
        .decode_file(&config.path)
        .wrap_err_with(|| format!("failed to load audio: {:?}", config.path.display()))?
        .info();

    tracing::debug!(?info, "audio info");

    if config.json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        print!("{}", format_info(&info));
    }

    Ok(())
}

fn format_info(info: &AudioInfo) -> String {
    format!(
        "duration:    {:.3}s\nsample rate: {} Hz\nchannels:    {}\n",
        info.duration, info.sample_rate, info.channels
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_info() {
        let info = AudioInfo {
            duration: 4.0,
            sample_rate: 44100,
            channels: 2,
        };

        assert_eq!(
            format_info(&info),
            "duration:    4.000s\nsample rate: 44100 Hz\nchannels:    2\n"
        );
    }
}
