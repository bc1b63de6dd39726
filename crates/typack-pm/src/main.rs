//! Typack CLI

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use typack_pm::commands::bundle::{bundle_project, BundleOptions};
use typack_pm::commands::init::init_project;
use typack_pm::commands::tree::render_tree;
use typack_pm::resolve::{build_tree, TreeOptions};

#[derive(Parser)]
#[command(name = "typack")]
#[command(about = "Package manager and bundler for TypeScript declaration packages", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a typack.json in the target directory
    Init {
        /// Package name (defaults to the directory name)
        #[arg(long)]
        name: Option<String>,

        /// Target directory
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
    /// Print the resolved dependency tree
    Tree {
        /// Skip devDependencies
        #[arg(long)]
        production: bool,

        /// Project directory
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
    /// Compile the dependency tree into flat declaration scripts
    Bundle {
        /// Module name for the bundled output (defaults to the manifest name)
        #[arg(long)]
        name: Option<String>,

        /// Compile the root as ambient (no module wrapper)
        #[arg(long)]
        ambient: bool,

        /// Skip devDependencies
        #[arg(long)]
        production: bool,

        /// Write the default-variant output here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,

        /// Write the browser-variant output here
        #[arg(long)]
        browser_out: Option<PathBuf>,

        /// Project directory
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { name, dir } => {
            init_project(&dir, name.as_deref())?;
        }
        Commands::Tree { production, dir } => {
            let manifest_path = dir.join("typack.json");
            let tree = build_tree(&manifest_path, &TreeOptions { production })?;
            print!("{}", render_tree(&tree.graph, tree.root, &tree.name));
        }
        Commands::Bundle {
            name,
            ambient,
            production,
            out,
            browser_out,
            dir,
        } => {
            bundle_project(
                &dir,
                &BundleOptions {
                    name,
                    ambient,
                    production,
                    out,
                    browser_out,
                },
            )?;
        }
    }

    Ok(())
}
