//! wdl-bundler CLI
//!
//! Parse WDL documents, list their imports, and pack them into portable
//! bundles.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use wdl_bundler::{
    analyze_dependencies_from_file, bundle, config, create_bundle, extract_bundle, parse,
    read_manifest, BundleOptions, WdlError,
};

#[derive(Parser)]
#[command(name = "wdl-bundler")]
#[command(about = "Parse, analyze and bundle WDL workflows")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a WDL file and print its document as JSON
    Parse {
        file: PathBuf,
    },

    /// Print the imports of a WDL file, dependencies first
    Deps {
        file: PathBuf,
    },

    /// Bundle a workflow and all of its imports into a ZIP archive
    Bundle {
        /// Main workflow file
        file: PathBuf,

        /// Archive to write
        #[arg(short, long)]
        output: PathBuf,

        /// TOML file with bundle options
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Store files by name only instead of keeping their directories
        #[arg(long)]
        flatten: bool,

        /// Rewrite imports to point at the bundled files
        #[arg(long)]
        flatten_imports: bool,

        /// Leave out manifest.json
        #[arg(long)]
        no_metadata: bool,
    },

    /// Extract a bundle into a directory
    Extract {
        archive: PathBuf,

        /// Destination directory
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Show the manifest and entries of a bundle
    Inspect {
        archive: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli.command) {
        report(&err);
        process::exit(1);
    }
}

fn report(err: &anyhow::Error) {
    eprintln!("Error: {:#}", err);
    if let Some(WdlError::Syntax { uri, diagnostics }) = err.downcast_ref::<WdlError>() {
        for diagnostic in diagnostics {
            eprintln!("  {}:{}", uri, diagnostic);
        }
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Parse { file } => {
            let doc = parse(&file)?;
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
        Commands::Deps { file } => {
            let graph = analyze_dependencies_from_file(&file)?;
            for path in &graph.imports {
                println!("{}", path.display());
            }
        }
        Commands::Bundle {
            file,
            output,
            config: config_path,
            flatten,
            flatten_imports,
            no_metadata,
        } => {
            let mut options = match &config_path {
                Some(path) => config::load_options(path)?,
                None => BundleOptions::default(),
            };
            if flatten {
                options.preserve_directory_structure = false;
            }
            if flatten_imports {
                options.flatten_imports = true;
            }
            if no_metadata {
                options.include_metadata = false;
            }

            let bundle = create_bundle(&file, &output, options)
                .with_context(|| format!("cannot bundle {}", file.display()))?;
            println!(
                "{} -> {} ({} files)",
                bundle.main_workflow,
                output.display(),
                bundle.files.len()
            );
        }
        Commands::Extract { archive, output } => {
            let written = extract_bundle(&archive, &output)?;
            for path in written {
                println!("{}", path.display());
            }
        }
        Commands::Inspect { archive } => {
            match read_manifest(&archive)? {
                Some(manifest) => println!("{}", serde_json::to_string_pretty(&manifest)?),
                None => println!("(no {})", bundle::MANIFEST_NAME),
            }
            for entry in bundle::list_entries(&archive)? {
                println!("  {}", entry);
            }
        }
    }
    Ok(())
}
