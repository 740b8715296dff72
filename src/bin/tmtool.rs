use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};

use transmem::{config, TmConfig, TmStore};

macro_rules! die {
    ($result:expr, $($arg:tt)*) => {
        $result.unwrap_or_else(|e| {
            eprintln!($($arg)*, e);
            process::exit(1);
        })
    };
}

#[derive(Parser)]
#[command(name = "tmtool", about = "Translation memory maintenance tool")]
struct Cli {
    /// Custom config TOML (default: built-in config)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record a (source, translation) pair
    Store {
        /// Store directory
        db: PathBuf,
        /// Source string
        source: String,
        /// Its translation
        translation: String,
    },
    /// Look up translations for a query, approximately if needed
    Lookup {
        /// Store directory
        db: PathBuf,
        /// Query string
        query: String,
        /// Maximum number of query words that may be ignored
        #[arg(long, default_value = "2")]
        max_omits: u32,
        /// Maximum sentence length difference
        #[arg(long, default_value = "2")]
        max_delta: u32,
    },
    /// Export the whole memory as XML
    Dump {
        /// Store directory
        db: PathBuf,
    },
    /// Show store statistics
    Info {
        /// Store directory
        db: PathBuf,
    },
    /// Print the built-in config TOML
    ConfigExport,
}

fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            let text = die!(std::fs::read_to_string(path), "Error reading config: {}");
            die!(TmConfig::from_toml_str(&text), "Error in config: {}")
        }
        None => TmConfig::default(),
    };

    match cli.command {
        Command::Store {
            db,
            source,
            translation,
        } => store(&db, config, &source, &translation),
        Command::Lookup {
            db,
            query,
            max_omits,
            max_delta,
        } => lookup(&db, config, &query, max_omits, max_delta),
        Command::Dump { db } => dump(&db, config),
        Command::Info { db } => info(&db, config),
        Command::ConfigExport => print!("{}", config::default_toml()),
    }
}

fn open(db: &Path, config: TmConfig) -> TmStore {
    die!(TmStore::open(db, config), "Error opening store: {}")
}

fn store(db: &Path, config: TmConfig, source: &str, translation: &str) {
    let mut tm = open(db, config);
    die!(tm.store(source, translation), "Error storing pair: {}");
    die!(tm.save(), "Error saving store: {}");
    eprintln!("Stored ({} entries total)", tm.len());
}

fn lookup(db: &Path, config: TmConfig, query: &str, max_omits: u32, max_delta: u32) {
    let tm = open(db, config);
    let results = tm.lookup(query, max_omits, max_delta);
    if results.is_empty() {
        eprintln!("No suggestions");
        process::exit(1);
    }
    for suggestion in results {
        for translation in &suggestion.translations {
            println!("{:>3}%  {translation}", suggestion.exactness);
        }
    }
}

fn dump(db: &Path, config: TmConfig) {
    let tm = open(db, config);
    println!(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    println!("<translation-memory>");
    for (source, translations) in tm.enumerate() {
        println!(r#"  <string source="{}">"#, xml_escape(source));
        for translation in translations {
            println!(
                "    <translation>{}</translation>",
                xml_escape(translation)
            );
        }
        println!("  </string>");
    }
    println!("</translation-memory>");
}

fn info(db: &Path, config: TmConfig) {
    let tm = open(db, config);
    println!("Store directory:    {}", db.display());
    println!("Source strings:     {}", tm.len());
    println!("Pending WAL frames: {}", tm.pending_wal_frames());
}

fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
