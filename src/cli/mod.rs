use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[value(alias = "google")]
    Gemini,
    #[value(name = "openai", alias = "open-ai")]
    OpenAI,
}

#[derive(Parser, Debug)]
#[command(name = "plantpal", version, about = "Identify plants from photos and chat about your gallery")]
pub struct Args {
    /// Directory holding the gallery and exchange artifacts.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// TOML config file (defaults to <data-dir>/config.toml when present).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, value_enum, global = true)]
    pub provider: Option<ProviderKind>,

    /// Model used for identification.
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Model used for chat.
    #[arg(long, global = true)]
    pub chat_model: Option<String>,

    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    #[arg(long, default_value_t = false, global = true)]
    pub save_request: bool,

    #[arg(long, default_value_t = false, global = true)]
    pub save_response: bool,

    #[arg(long, default_value_t = false, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Identify the plant in a photo and add it to the gallery.
    Identify {
        image: PathBuf,
    },
    /// List the gallery.
    #[command(alias = "list")]
    Gallery,
    /// Show one plant in full.
    Show {
        index: usize,
        /// Write the stored photo to this path.
        #[arg(long)]
        save_image: Option<PathBuf>,
    },
    /// Remove a plant from the gallery.
    Delete {
        index: usize,
        #[arg(long, short = 'y', default_value_t = false)]
        yes: bool,
    },
    /// Ask questions about the plants in your gallery.
    Chat,
    /// Print the gallery whenever another process changes it.
    Watch,
}
