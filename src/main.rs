use anyhow::Context;
use clap::Parser;
use flatstore::config::{Command, Model};
use flatstore::utils::error::ErrorSeverity;
use flatstore::utils::{logger, validation::Validate};
use flatstore::{
    CliConfig, Entity, EntityService, Format, Person, Product, Result, StoreConfig, StoreError,
};
use std::fmt::Display;
use std::path::{Path, PathBuf};

fn main() {
    let cli = CliConfig::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {:#}", e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    let verbose = cli.verbose || config.as_ref().is_some_and(|c| c.logging.verbose);
    if cli.json_logs || config.as_ref().is_some_and(|c| c.logging.json) {
        logger::init_json_logger(verbose);
    } else {
        logger::init_cli_logger(verbose);
    }
    tracing::debug!("CLI config: {:?}", cli);

    if let Some(config) = &config {
        if let Err(e) = config.validate() {
            tracing::error!("Configuration validation failed: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    }

    if let Err(e) = run(cli.command, config.as_ref()) {
        tracing::error!(
            "{} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Option<StoreConfig>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let config = StoreConfig::from_file(path)
        .with_context(|| format!("Failed to load config file '{}'", path.display()))?;
    Ok(Some(config))
}

/// Picks the data file and format from flags first, then the config file.
fn target(
    file: Option<PathBuf>,
    format: Option<Format>,
    config: Option<&StoreConfig>,
) -> Result<(PathBuf, Format)> {
    let path = match (file, config) {
        (Some(file), _) => file,
        (None, Some(config)) => config.path(),
        (None, None) => {
            return Err(StoreError::Config {
                message: "no data file given; pass --file or --config".to_string(),
            })
        }
    };

    let format = match format {
        Some(format) => format,
        None => match (Format::from_path(&path), config) {
            (Some(format), _) => format,
            (None, Some(config)) => config.format()?,
            (None, None) => {
                return Err(StoreError::InvalidConfigValue {
                    field: "format".to_string(),
                    value: path.display().to_string(),
                    reason: "cannot infer format from extension; pass --format".to_string(),
                })
            }
        },
    };

    Ok((path, format))
}

fn open<E: Entity + Validate>(
    path: PathBuf,
    format: Format,
    config: Option<&StoreConfig>,
) -> Result<EntityService<E>> {
    EntityService::open(format, path, config)
}

fn show<E: Entity + Validate + Display>(
    path: PathBuf,
    format: Format,
    config: Option<&StoreConfig>,
) -> Result<()> {
    let mut service = open::<E>(path, format, config)?;
    service.load()?;
    if service.is_empty() {
        println!("(no records)");
    }
    for (i, item) in service.items().iter().enumerate() {
        println!("{}. {}", i + 1, item);
    }
    Ok(())
}

fn convert<E: Entity + Validate>(
    from: (PathBuf, Format),
    to: (PathBuf, Format),
    force: bool,
    config: Option<&StoreConfig>,
) -> Result<()> {
    if !force && to.0.exists() {
        return Err(StoreError::Config {
            message: format!("{} already exists; pass --force to overwrite", to.0.display()),
        });
    }

    let mut service = open::<E>(from.0, from.1, config)?;
    let count = service.load()?;
    if !service.repoint(to.1, &to.0) {
        return Err(StoreError::Locked);
    }
    service.save()?;
    println!(
        "✅ Converted {} records to {} ({})",
        count,
        to.0.display(),
        to.1
    );
    Ok(())
}

fn run(command: Command, config: Option<&StoreConfig>) -> Result<()> {
    match command {
        Command::Show {
            file,
            format,
            model,
        } => {
            let (path, format) = target(file, format, config)?;
            match model {
                Model::Product => show::<Product>(path, format, config),
                Model::Person => show::<Person>(path, format, config),
            }
        }
        Command::Convert {
            from,
            to,
            from_format,
            to_format,
            model,
            force,
        } => {
            let from = target(Some(from), from_format, config)?;
            let to = target(Some(to), to_format, config)?;
            match model {
                Model::Product => convert::<Product>(from, to, force, config),
                Model::Person => convert::<Person>(from, to, force, config),
            }
        }
        Command::AddProduct {
            file,
            format,
            code,
            name,
            manufacturer,
            price,
            quantity,
        } => {
            let (path, format) = target(file, format, config)?;
            let mut service = open::<Product>(path, format, config)?;
            if service.file_exists() {
                service.load()?;
            }
            service.add(Product::new(code, name, manufacturer, price, quantity))?;
            let count = service.save()?;
            println!(
                "✅ Saved {} products to {}",
                count,
                service.path().display()
            );
            Ok(())
        }
        Command::Total { file, format } => {
            let (path, format) = target(file, format, config)?;
            let mut service = open::<Product>(path, format, config)?;
            service.load()?;
            println!("Total stock value: {:.2}", service.total_stock_value());
            Ok(())
        }
        Command::Settle { file, format } => {
            let (path, format) = target(file, format, config)?;
            let mut service = open::<Person>(path, format, config)?;
            service.load()?;
            let settled = service.settle_students_in_hostel();
            for i in &settled {
                if let Some(person) = service.get(*i) {
                    println!("🏠 {}", person);
                }
            }
            service.save()?;
            println!("✅ Settled {} students", settled.len());
            Ok(())
        }
        Command::Practice {
            file,
            format,
            index,
        } => {
            let (path, format) = target(file, format, config)?;
            let mut service = open::<Person>(path, format, config)?;
            service.load()?;
            if !service.practice_music(index)? {
                return Err(StoreError::Validation {
                    field: "index".to_string(),
                    value: index.to_string(),
                    reason: format!("only {} people in the file", service.len()),
                });
            }
            service.save()?;
            if let Some(person) = service.get(index) {
                println!("🎵 {}", person);
            }
            Ok(())
        }
    }
}
