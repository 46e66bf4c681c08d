use anyhow::{Context, Result};
use histeq_core::pipeline::config::PipelineConfig;

use crate::Cli;

/// Build the run configuration: the TOML file if given, else defaults, with
/// every explicit flag taking precedence.
pub fn resolve(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = if let Some(ref path) = cli.config {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Invalid pipeline config {}", path.display()))?
    } else {
        PipelineConfig::default()
    };

    if let Some(ref file) = cli.file {
        config.input = file.clone();
    }
    if let Some(ref output) = cli.output {
        config.output = Some(output.clone());
    }
    if let Some(bins) = cli.bins {
        config.num_bins = bins;
    }
    if let Some(platform) = cli.platform {
        config.device.platform = platform;
    }
    if let Some(device) = cli.device {
        config.device.device = device;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use clap::Parser;

    use super::*;

    #[test]
    fn defaults_without_flags() {
        let cli = Cli::try_parse_from(["histeq"]).unwrap();
        let config = resolve(&cli).unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn short_flags_fill_config() {
        let cli = Cli::try_parse_from([
            "histeq", "-p", "1", "-d", "2", "-f", "moon.ppm", "-b", "64", "-o", "out.png",
        ])
        .unwrap();
        let config = resolve(&cli).unwrap();
        assert_eq!(config.device.platform, 1);
        assert_eq!(config.device.device, 2);
        assert_eq!(config.input, PathBuf::from("moon.ppm"));
        assert_eq!(config.num_bins, 64);
        assert_eq!(config.output, Some(PathBuf::from("out.png")));
    }

    #[test]
    fn unknown_flags_are_ignored() {
        let cli = Cli::try_parse_from(["histeq", "-b", "16", "-z"]).unwrap();
        assert_eq!(cli.bins, Some(16));
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("histeq.toml");
        std::fs::write(&path, "input = \"a.png\"\nnum_bins = 32\n").unwrap();

        let path_arg = path.to_string_lossy().into_owned();
        let cli = Cli::try_parse_from(["histeq", "-c", path_arg.as_str(), "-b", "8"]).unwrap();
        let config = resolve(&cli).unwrap();
        assert_eq!(config.input, PathBuf::from("a.png"));
        assert_eq!(config.num_bins, 8);
    }

    #[test]
    fn rejects_zero_bins() {
        let cli = Cli::try_parse_from(["histeq", "-b", "0"]).unwrap();
        assert!(resolve(&cli).is_err());
    }
}
