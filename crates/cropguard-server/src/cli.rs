//! Command-line interface

use clap::Parser;
use cropguard_classifiers::DeviceSpec;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "cropguard-server")]
#[command(about = "CropGuard crop disease diagnosis server", long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "CROPGUARD_CONFIG", default_value = "config.yaml")]
    pub config: PathBuf,

    /// Model weights file (searched before the standard layouts)
    #[arg(short, long, env = "CROPGUARD_WEIGHTS")]
    pub weights: Option<PathBuf>,

    /// Class-index JSON file (searched before the standard layouts)
    #[arg(long, env = "CROPGUARD_CLASS_INDEX")]
    pub class_index: Option<PathBuf>,

    /// Inference device: auto, cpu, cuda[:N] or metal[:N]
    #[arg(short, long, env = "CROPGUARD_DEVICE")]
    pub device: Option<DeviceSpec>,

    /// Listen address
    #[arg(short = 'l', long, env = "CROPGUARD_LISTEN", default_value = "0.0.0.0")]
    pub listen: String,

    /// Listen port
    #[arg(short = 'P', long, env = "CROPGUARD_PORT", default_value = "8000")]
    pub port: u16,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["cropguard-server"]).unwrap();
        assert_eq!(cli.port, 8000);
        assert_eq!(cli.listen, "0.0.0.0");
        assert!(cli.device.is_none());
        assert!(!cli.json_logs);
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::try_parse_from([
            "cropguard-server",
            "--weights",
            "/models/best_model.pth",
            "--class-index",
            "/models/class_indices.json",
            "--device",
            "cuda:1",
            "-P",
            "9000",
            "--verbose",
        ])
        .unwrap();

        assert_eq!(cli.weights, Some(PathBuf::from("/models/best_model.pth")));
        assert_eq!(cli.device, Some(DeviceSpec::Cuda { index: Some(1) }));
        assert_eq!(cli.port, 9000);
        assert!(cli.verbose);
    }

    #[test]
    fn test_bad_device_rejected() {
        assert!(Cli::try_parse_from(["cropguard-server", "--device", "tpu"]).is_err());
    }
}
