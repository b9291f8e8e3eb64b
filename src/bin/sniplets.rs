//! Sniplets CLI Binary
//!
//! Command-line inspection of stored sniplet documents. The browser shell is
//! the primary consumer of the library; this binary exercises the same
//! surface for scripting and debugging.

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use sniplets::config::{ConfigLoader, CoreConfig};
use sniplets::interchange::{export_clippings, import_clippings, ClippingsFile};
use sniplets::logging::init_logging;
use sniplets::space::{SortKey, SortOptions, Space};
use sniplets::storage::FileStorage;
use sniplets::template::ProcessContext;
use sniplets::tree::TreeItem;
use sniplets::types::Seq;
use std::path::PathBuf;
use std::process;

/// Sniplets - tree-structured snippet storage with template processing
#[derive(Parser)]
#[command(name = "sniplets")]
#[command(about = "Inspect and process stored sniplet documents")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Storage directory holding space documents
    #[arg(long, default_value = ".sniplets")]
    store: PathBuf,

    /// Configuration file path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Space name (storage key)
    #[arg(long, default_value = "personal")]
    space: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the document tree
    Show,
    /// Process one sniplet and print the result as JSON
    Process {
        /// Path to the sniplet, as slash-separated seq values (e.g. 2/1/3)
        path: String,
    },
    /// Sort a folder's children, restoring dense numbering
    Sort {
        /// Folder path as slash-separated seq values (empty = root)
        #[arg(default_value = "")]
        path: String,
        /// Sort by name instead of stored order
        #[arg(long)]
        by_name: bool,
        /// Reverse the comparison
        #[arg(long)]
        reverse: bool,
        /// Sort every folder in the subtree
        #[arg(long)]
        recursive: bool,
    },
    /// Export the space in clippings interchange format
    Export,
    /// Import a clippings interchange file into the space
    Import {
        /// Interchange file to read
        file: PathBuf,
    },
}

fn parse_path(input: &str) -> anyhow::Result<Vec<Seq>> {
    input
        .split('/')
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<Seq>()
                .with_context(|| format!("invalid path segment: {}", part))
        })
        .collect()
}

fn print_tree(items: &[TreeItem], depth: usize) {
    for item in items {
        let indent = "  ".repeat(depth);
        match item {
            TreeItem::Folder(folder) => {
                println!("{}{}. {}/", indent, folder.seq, folder.name);
                print_tree(&folder.children, depth + 1);
            }
            TreeItem::Sniplet(sniplet) => {
                println!("{}{}. {}", indent, sniplet.seq, sniplet.name);
            }
        }
    }
}

async fn run(cli: Cli, config: CoreConfig) -> anyhow::Result<()> {
    let storage = FileStorage::new(&cli.store);

    match cli.command {
        Commands::Show => {
            let space = Space::load(&cli.space, false, &storage)
                .await?
                .ok_or_else(|| anyhow!("space '{}' not found", cli.space))?;
            let children = space
                .data
                .children
                .live()
                .ok_or_else(|| anyhow!("document is still packed"))?;
            print_tree(children, 0);
        }
        Commands::Process { path } => {
            let mut space = Space::load(&cli.space, false, &storage)
                .await?
                .ok_or_else(|| anyhow!("space '{}' not found", cli.space))?;
            let path = parse_path(&path)?;
            let (seq, folder_path) = path
                .split_last()
                .ok_or_else(|| anyhow!("path must address a sniplet"))?;
            let ctx = ProcessContext {
                locale: config.locale.clone(),
                ..ProcessContext::default()
            };
            let result = space
                .get_processed_sniplet(*seq, folder_path, &ctx)
                .await
                .ok_or_else(|| anyhow!("no sniplet at that path"))?;
            // deltas commit only after the pass and the save both succeed
            space.commit_counter_deltas(&result.counter_deltas);
            space.save(&storage, &config).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Sort {
            path,
            by_name,
            reverse,
            recursive,
        } => {
            let mut space = Space::load(&cli.space, false, &storage)
                .await?
                .ok_or_else(|| anyhow!("space '{}' not found", cli.space))?;
            let options = SortOptions {
                key: if by_name { SortKey::Name } else { SortKey::Seq },
                reverse,
                recursive,
                path: parse_path(&path)?,
                ..SortOptions::with_defaults(&config)
            };
            if !space.sort(&options) {
                return Err(anyhow!("no folder at that path"));
            }
            space.save(&storage, &config).await?;
            println!("sorted");
        }
        Commands::Export => {
            let space = Space::load(&cli.space, false, &storage)
                .await?
                .ok_or_else(|| anyhow!("space '{}' not found", cli.space))?;
            let file = export_clippings(&space.data, "Sniplets")
                .ok_or_else(|| anyhow!("document is still packed"))?;
            println!("{}", serde_json::to_string_pretty(&file)?);
        }
        Commands::Import { file } => {
            let payload = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let parsed: ClippingsFile = serde_json::from_str(&payload)?;
            let mut space = Space::load(&cli.space, false, &storage)
                .await?
                .unwrap_or_else(|| Space::new(&cli.space, false));
            let items = import_clippings(&parsed);
            for item in items {
                space.add_item(item, &[]);
            }
            space.save(&storage, &config).await?;
            println!("imported {} top-level items", parsed.items.len());
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ConfigLoader::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            process::exit(1);
        }
    };
    if let Err(e) = init_logging(&config.logging) {
        eprintln!("Error initializing logging: {}", e);
        process::exit(1);
    }

    if let Err(e) = run(cli, config).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
