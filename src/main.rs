//! Thing Factory CLI
//!
//! Usage:
//!   thing-factory [OPTIONS] <FILES>...
//!
//! Options:
//!   -c, --config <FILE>   Factory configuration (TOML format)
//!   -e, --entity <NAME>   Instantiate an entity and print it (repeatable)
//!   -g, --group <NAME>    Instantiate a group and print its members (repeatable)
//!   -l, --list            List registered things with their kind and batch
//!   -d, --debug...        Raise log verbosity (-d info, -dd debug, -ddd trace)
//!   -h, --help            Print help

use std::path::PathBuf;

use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use thing_factory::{render_entity, FactoryConfig, LoadError, ThingFactory, ThingReference};

#[derive(Parser)]
#[command(name = "thing-factory")]
#[command(about = "Resolve thing definitions into entities")]
struct Cli {
    /// Definition files, each loaded as its own batch
    #[arg(required = true)]
    files: Vec<String>,

    /// Factory configuration (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Entity to instantiate
    #[arg(short, long = "entity", value_name = "NAME")]
    entities: Vec<String>,

    /// Group to instantiate
    #[arg(short, long = "group", value_name = "NAME")]
    groups: Vec<String>,

    /// List registered things
    #[arg(short, long)]
    list: bool,

    /// Raise log verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    debug: u8,
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.debug);

    let config = match &cli.config {
        Some(path) => match FactoryConfig::from_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => FactoryConfig::default(),
    };

    let mut factory = ThingFactory::new(&config);
    let mut failed = false;

    for file in &cli.files {
        if let Err(e) = factory.load_file(file) {
            eprintln!("Error loading '{}': {}", file, e);
            if let LoadError::Parse { text, errors, .. } = &e {
                for error in errors {
                    eprintln!("{}", error.format(text, file));
                }
            }
            failed = true;
        }
    }

    if cli.list {
        print_registry(&factory);
    }

    for name in &cli.entities {
        match factory.instantiate_entity(name) {
            Ok(Some(entity)) => print!("{}", render_entity(entity.as_ref())),
            Ok(None) => {
                eprintln!("Entity '{}' could not be instantiated", name);
                failed = true;
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                failed = true;
            }
        }
    }

    for name in &cli.groups {
        match factory.instantiate_group(name) {
            Ok(Some(members)) => {
                println!("group {} ({} members)", name, members.len());
                for member in &members {
                    print!("{}", render_entity(member.as_ref()));
                }
            }
            Ok(None) => {
                eprintln!("Group '{}' could not be instantiated", name);
                failed = true;
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                failed = true;
            }
        }
    }

    for missing in factory.take_missing_references() {
        eprintln!(
            "warning: {} references missing entity '{}' via '{}'",
            missing.from.as_deref().unwrap_or("<anonymous>"),
            missing.target,
            missing.key
        );
    }

    if failed {
        std::process::exit(1);
    }
}

fn print_registry(factory: &ThingFactory) {
    let registry = factory.registry();
    let mut names: Vec<&str> = registry.names().collect();
    names.sort_unstable();
    for name in names {
        match registry.get(name) {
            Some(ThingReference::Definition(def)) => {
                println!("{}\t{}\t{}", name, def.kind, def.batch);
            }
            Some(ThingReference::EntityOverride(_)) => println!("{}\tentity override", name),
            Some(ThingReference::GroupOverride(_)) => println!("{}\tgroup override", name),
            None => {}
        }
    }
}

fn setup_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    // RUST_LOG wins over the -d flags when set
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .with_filter(filter);

    tracing_subscriber::registry().with(fmt_layer).init();
}
