//! CLI argument definitions for Quartermaster.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::models::SettingType;

/// Version string with build metadata, for `qm --version`.
pub const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("QM_GIT_COMMIT"),
    " ",
    env!("QM_BUILD_TIMESTAMP"),
    ")"
);

/// Quartermaster - typed, categorized configuration settings.
///
/// Settings are created with `qm set` (or `qm add`), read with `qm get`,
/// and removed with `qm forget`.
#[derive(Parser, Debug)]
#[command(name = "qm")]
#[command(author, version, long_version = LONG_VERSION, about = "A CLI tool for managing typed, categorized configuration settings", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Settings store location (`:memory:` for a throwaway store).
    /// Can also be set via QM_STORE environment variable.
    #[arg(long, global = true, value_name = "PATH")]
    pub store: Option<PathBuf>,

    /// Reject input that does not fit a setting's type instead of storing
    /// a fallback value (0, false, null)
    #[arg(long, global = true)]
    pub strict: bool,

    /// Config file to read preferences from.
    /// Can also be set via QM_CONFIG environment variable.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

fn parse_setting_type(s: &str) -> Result<SettingType, String> {
    s.parse::<SettingType>().map_err(|e| e.to_string())
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the value of a setting
    Get {
        /// Setting key
        key: String,

        /// Value to print when the setting does not exist
        #[arg(long, short = 'd', allow_hyphen_values = true)]
        default: Option<String>,
    },

    /// Create or update a setting
    ///
    /// An existing setting keeps its type and category; the new value is
    /// decoded through the stored type.
    Set {
        /// Setting key
        key: String,

        /// Raw value (decoded through the setting's type)
        #[arg(allow_hyphen_values = true)]
        value: String,

        /// Category for a new setting
        #[arg(long, short = 'c')]
        category: Option<String>,

        /// Type for a new setting: string, integer, boolean or json
        #[arg(long = "type", short = 't', value_parser = parse_setting_type)]
        setting_type: Option<SettingType>,
    },

    /// Create a new setting (fails if it already exists)
    Add {
        /// Setting key
        key: String,

        /// Raw value (decoded through the setting's type)
        #[arg(allow_hyphen_values = true)]
        value: String,

        /// Category for the setting
        #[arg(long, short = 'c')]
        category: Option<String>,

        /// Type: string, integer, boolean or json
        #[arg(long = "type", short = 't', value_parser = parse_setting_type)]
        setting_type: Option<SettingType>,
    },

    /// Change the value of an existing setting (fails if it does not exist)
    Change {
        /// Setting key
        key: String,

        /// Raw value (decoded through the setting's type)
        #[arg(allow_hyphen_values = true)]
        value: String,
    },

    /// Check whether a setting exists (exit status 1 if not)
    Has {
        /// Setting key
        key: String,
    },

    /// List settings
    List {
        /// Only list settings in this category
        #[arg(long, short = 'c', conflicts_with = "uncategorized")]
        category: Option<String>,

        /// Only list settings without a category
        #[arg(long)]
        uncategorized: bool,
    },

    /// List categories with their setting counts
    Categories,

    /// Delete a setting (asks for confirmation)
    Forget {
        /// Setting key
        key: String,

        /// Skip the confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
    },

    /// Export all settings as a JSON document
    Export {
        /// Output file (use '-' or omit for stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Import settings from a JSON document produced by `qm export`
    Import {
        /// Input file (use '-' for stdin)
        input: String,

        /// Replace settings that already exist
        #[arg(long)]
        overwrite: bool,
    },

    /// Preference management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show resolved preferences and where each came from
    Show,

    /// Write a config file with the current preferences
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        // This will panic if the CLI is misconfigured
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_set_with_type() {
        let cli = Cli::try_parse_from(["qm", "set", "mail.port", "25", "-t", "int", "-c", "mail"])
            .unwrap();
        match cli.command {
            Commands::Set {
                key,
                value,
                category,
                setting_type,
            } => {
                assert_eq!(key, "mail.port");
                assert_eq!(value, "25");
                assert_eq!(category.as_deref(), Some("mail"));
                assert_eq!(setting_type, Some(SettingType::Integer));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_negative_value() {
        let cli = Cli::try_parse_from(["qm", "change", "offset", "-5"]).unwrap();
        assert!(matches!(cli.command, Commands::Change { ref value, .. } if value == "-5"));
    }

    #[test]
    fn test_parse_rejects_unknown_type() {
        let err = Cli::try_parse_from(["qm", "set", "k", "v", "--type", "float"]).unwrap_err();
        assert!(err.to_string().contains("Unknown setting type"));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["qm", "list", "-H", "--store", ":memory:", "--strict"])
            .unwrap();
        assert!(cli.human_readable);
        assert!(cli.strict);
        assert_eq!(cli.store, Some(PathBuf::from(":memory:")));
    }

    #[test]
    fn test_list_filters_conflict() {
        assert!(Cli::try_parse_from(["qm", "list", "-c", "mail", "--uncategorized"]).is_err());
    }
}
