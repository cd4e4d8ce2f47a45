use crate::core::format::Format;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "flatstore")]
#[command(about = "Inspect, convert and edit flat record files (json, xml, binary, text)")]
pub struct CliConfig {
    /// TOML configuration file supplying the default data file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Which record model a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Model {
    Product,
    Person,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print every record in a file
    Show {
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long)]
        format: Option<Format>,
        #[arg(long, value_enum, default_value = "product")]
        model: Model,
    },

    /// Rewrite a file in another format
    Convert {
        #[arg(long)]
        from: PathBuf,
        #[arg(long)]
        to: PathBuf,
        #[arg(long)]
        from_format: Option<Format>,
        #[arg(long)]
        to_format: Option<Format>,
        #[arg(long, value_enum, default_value = "product")]
        model: Model,
        /// Replace the target file if it already exists
        #[arg(long)]
        force: bool,
    },

    /// Append a product to a file, creating the file when missing
    AddProduct {
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long)]
        format: Option<Format>,
        #[arg(long)]
        code: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        manufacturer: String,
        #[arg(long)]
        price: f64,
        #[arg(long)]
        quantity: i64,
    },

    /// Print the total value of all product batches in a file
    Total {
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long)]
        format: Option<Format>,
    },

    /// Move every student without a hostel room into one and save the file
    Settle {
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long)]
        format: Option<Format>,
    },

    /// Let the musician at `index` practice and save the file
    Practice {
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long)]
        format: Option<Format>,
        index: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_convert() {
        let cli = CliConfig::try_parse_from([
            "flatstore",
            "convert",
            "--from",
            "a.json",
            "--to",
            "b.txt",
            "--model",
            "person",
        ])
        .unwrap();
        match cli.command {
            Command::Convert { from, model, force, .. } => {
                assert_eq!(from, PathBuf::from("a.json"));
                assert_eq!(model, Model::Person);
                assert!(!force);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_format_flag() {
        let cli =
            CliConfig::try_parse_from(["flatstore", "-v", "total", "--format", "binary"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Command::Total {
                format: Some(Format::Binary),
                ..
            }
        ));
    }

    #[test]
    fn test_parse_practice() {
        let cli = CliConfig::try_parse_from(["flatstore", "practice", "--file", "people.bin", "2"])
            .unwrap();
        match cli.command {
            Command::Practice { file, index, .. } => {
                assert_eq!(file, Some(PathBuf::from("people.bin")));
                assert_eq!(index, 2);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
