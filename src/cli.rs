use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "ferrite-signs", about = "Road sign classifier: dataset assembly, training and evaluation")]
pub struct Cli {
    /// level of logging details (into stderr), ignored when RUST_LOG is set
    #[arg(short, long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// assemble the training set, train a model, save it and score it on the test set
    Train {
        /// run configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,
    },
    /// score a saved model on the test set of a run configuration
    Evaluate {
        /// saved model (JSON)
        #[arg(short, long)]
        model: PathBuf,

        /// run configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
    Off,
}

impl LogLevel {
    pub fn filter(self) -> &'static str {
        match self {
            LogLevel::Error => "off,ferrite_signs=error",
            LogLevel::Warn => "off,ferrite_signs=warn",
            LogLevel::Info => "off,ferrite_signs=info",
            LogLevel::Debug => "off,ferrite_signs=debug",
            LogLevel::Trace => "off,ferrite_signs=trace",
            LogLevel::Off => "off",
        }
    }
}
