//! Command-line interface

use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Ammeter Tester - sample ammeters over TCP, analyze the readings and rank the devices
#[derive(Parser, Debug, Clone)]
#[command(name = "amt")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (JSON)
    #[arg(long, env = "AMMETER_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Device type to test (can be used multiple times; default: every configured device)
    #[arg(short, long = "device", action = ArgAction::Append, value_name = "TYPE")]
    pub devices: Vec<String>,

    /// Number of samples per run
    #[arg(short, long, value_parser = parse_count)]
    pub count: Option<u32>,

    /// Sampling frequency in Hz
    #[arg(short, long, value_parser = parse_frequency)]
    pub frequency: Option<f64>,

    /// Do not write run reports to the archive
    #[arg(long)]
    pub no_save: bool,

    /// Force colored output
    #[arg(long)]
    pub color: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,

    /// List the configured devices and exit
    #[arg(long)]
    pub list_devices: bool,

    /// Describe the supported environment variables and exit
    #[arg(long)]
    pub help_env: bool,
}

impl Cli {
    /// Validate CLI arguments for conflicts and requirements
    pub fn validate(&self) -> Result<(), String> {
        if self.color && self.no_color {
            return Err("Cannot specify both --color and --no-color".to_string());
        }

        if let Some(device) = self.devices.iter().find(|d| d.trim().is_empty()) {
            return Err(format!("Invalid device type '{}': cannot be empty", device));
        }

        Ok(())
    }

    /// Check if colors should be enabled
    pub fn use_colors(&self) -> bool {
        if self.color {
            true
        } else if self.no_color {
            false
        } else {
            supports_color()
        }
    }

    /// Get configuration summary for display
    pub fn get_config_summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str("Command Line:\n");
        if let Some(ref path) = self.config {
            summary.push_str(&format!("  Config file: {}\n", path.display()));
        }
        if !self.devices.is_empty() {
            summary.push_str(&format!("  Devices: {}\n", self.devices.join(", ")));
        }
        if let Some(count) = self.count {
            summary.push_str(&format!("  Samples per run: {}\n", count));
        }
        if let Some(frequency) = self.frequency {
            summary.push_str(&format!("  Frequency: {} Hz\n", frequency));
        }
        summary.push_str(&format!("  Save results: {}\n", !self.no_save));
        summary.push_str(&format!("  Colored output: {}\n", self.use_colors()));
        summary.push_str(&format!("  Verbose mode: {}\n", self.verbose));
        summary.push_str(&format!("  Debug mode: {}\n", self.debug));

        summary
    }
}

fn parse_count(s: &str) -> Result<u32, String> {
    if s.starts_with('+') {
        return Err(format!("Invalid count: {}", s));
    }

    s.parse::<u32>()
        .map_err(|_| format!("Invalid count: {}", s))
        .and_then(|count| {
            if count == 0 {
                Err("Count must be greater than 0".to_string())
            } else {
                Ok(count)
            }
        })
}

fn parse_frequency(s: &str) -> Result<f64, String> {
    s.parse::<f64>()
        .map_err(|_| format!("Invalid frequency: {}", s))
        .and_then(|hz| {
            if !hz.is_finite() || hz <= 0.0 {
                Err("Frequency must be a positive number of Hz".to_string())
            } else if std::time::Duration::try_from_secs_f64(1.0 / hz).is_err() {
                Err(format!("Frequency {} Hz is too low to schedule", hz))
            } else {
                Ok(hz)
            }
        })
}

/// Check if the terminal supports color output
fn supports_color() -> bool {
    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    cfg!(unix)
}
