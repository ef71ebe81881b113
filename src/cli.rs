use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::events::Event;
use crate::pricing::Tier;

#[derive(Parser, Debug)]
#[command(
    name = "undercut-helper",
    version,
    about = "Reads marketplace prices from the screen and pastes an undercut"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Settings file (default: next to the executable)")]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Windowed form (default)
    Gui,
    /// Console loop driven by global hotkeys
    Headless,
    /// Run a single action and exit
    Once {
        #[command(subcommand)]
        action: Action,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Read a lot, undercut it and paste
    Read { tier: Tier },
    /// Read all lots and paste the recommended one
    Optimize,
    /// Print every lot's reading and undercut
    Print,
    /// Center the lot's capture box on the pointer
    Calibrate { tier: Tier },
    /// Print the pointer position
    Pointer,
}

impl Action {
    pub fn event(self) -> Event {
        match self {
            Action::Read { tier } => Event::ReadPaste(tier),
            Action::Optimize => Event::Optimize,
            Action::Print => Event::PrintAll,
            Action::Calibrate { tier } => Event::Calibrate(tier),
            Action::Pointer => Event::ShowPointer,
        }
    }
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Gui)
    }

    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(crate::paths::get_config_path)
    }
}
