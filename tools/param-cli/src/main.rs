//! param - Param file editor
//!
//! Inspects and edits Param tabular binary files using a TOML schema.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use param_format::{EmptySchema, Schema};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use param_cli::hex_text::to_hex_text;
use param_cli::session::verify_round_trip;
use param_cli::{EditorConfig, Session, report, schema_file};

#[derive(Parser)]
#[command(name = "param")]
#[command(about = "Param file editor")]
#[command(version)]
struct Cli {
    /// Schema file (overrides param.toml)
    #[arg(long, global = true)]
    schema: Option<PathBuf>,

    /// Editor config (default: ./param.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show header and section summary
    Info {
        /// Param file
        file: PathBuf,
    },

    /// Print sections, entries or fields
    Dump {
        /// Param file
        file: PathBuf,

        /// Only this section
        #[arg(long)]
        section: Option<usize>,

        /// Only this entry of --section
        #[arg(long, requires = "section")]
        entry: Option<usize>,
    },

    /// Print an entry's raw bytes as hex
    Hex {
        /// Param file
        file: PathBuf,

        #[arg(long)]
        section: usize,

        #[arg(long)]
        entry: usize,
    },

    /// Replace an entry's raw bytes with hex text
    Paste {
        /// Param file
        file: PathBuf,

        #[arg(long)]
        section: usize,

        #[arg(long)]
        entry: usize,

        /// Hex bytes, whitespace ignored; length must equal the entry size
        hex: String,

        #[command(flatten)]
        save: SaveArgs,
    },

    /// Set one field of an entry
    Set {
        /// Param file
        file: PathBuf,

        #[arg(long)]
        section: usize,

        #[arg(long)]
        entry: usize,

        /// Field name from the schema
        #[arg(long)]
        field: String,

        /// New value (enum label, number, true/false, #RRGGBBAA, text or hex)
        #[arg(allow_hyphen_values = true)]
        value: String,

        #[command(flatten)]
        save: SaveArgs,
    },

    /// Append a zero-filled section
    AddSection {
        /// Param file
        file: PathBuf,

        #[arg(long)]
        entry_size: u32,

        #[arg(long, default_value_t = 0)]
        entry_count: u32,

        #[command(flatten)]
        save: SaveArgs,
    },

    /// Append a zero-filled entry to a section
    AddEntry {
        /// Param file
        file: PathBuf,

        #[arg(long)]
        section: usize,

        #[command(flatten)]
        save: SaveArgs,
    },

    /// Remove an entry; later entries shift down
    RemoveEntry {
        /// Param file
        file: PathBuf,

        #[arg(long)]
        section: usize,

        #[arg(long)]
        entry: usize,

        #[command(flatten)]
        save: SaveArgs,
    },

    /// Remove a section; later sections shift down
    RemoveSection {
        /// Param file
        file: PathBuf,

        #[arg(long)]
        section: usize,

        #[command(flatten)]
        save: SaveArgs,
    },

    /// Check that the file re-encodes to identical bytes
    Verify {
        /// Param file
        file: PathBuf,
    },
}

#[derive(Args)]
struct SaveArgs {
    /// Write here instead of overwriting the input
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Skip the .bak copy when overwriting the input
    #[arg(long)]
    no_backup: bool,
}

/// Schema and config shared by every command
struct Editor {
    schema: Arc<dyn Schema>,
    config: EditorConfig,
}

impl Editor {
    fn open(&self, file: &Path) -> Result<Session> {
        Session::open(file, Arc::clone(&self.schema))
    }

    /// Open, apply `edit`, save
    fn edit(
        &self,
        file: &Path,
        save: &SaveArgs,
        edit: impl FnOnce(&mut Session) -> Result<()>,
    ) -> Result<()> {
        let mut session = self.open(file)?;
        edit(&mut session)?;
        let backup = self.config.save.backup && !save.no_backup;
        let written = session.save(save.output.as_deref(), backup)?;
        tracing::info!("Saved {}", written.display());
        Ok(())
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    let cwd = std::env::current_dir().context("Failed to read working directory")?;
    let config = EditorConfig::discover(cli.config.as_deref(), &cwd)?;
    let schema: Arc<dyn Schema> = match config.schema_path(cli.schema.as_deref()) {
        Some(path) => Arc::new(schema_file::load_schema(&path)?),
        None => {
            tracing::info!("No schema configured, entries are shown as raw bytes");
            Arc::new(EmptySchema)
        }
    };
    let ctx = Editor { schema, config };

    match cli.command {
        Commands::Info { file } => {
            let session = ctx.open(&file)?;
            println!("{}", report::describe_param(session.param()));
        }

        Commands::Dump {
            file,
            section,
            entry,
        } => {
            let session = ctx.open(&file)?;
            println!("{}", report::dump(session.param(), section, entry)?);
        }

        Commands::Hex {
            file,
            section,
            entry,
        } => {
            let session = ctx.open(&file)?;
            let entry = session.entry(section, entry)?;
            println!(
                "{}",
                to_hex_text(entry.raw_bytes(), ctx.config.display.hex_columns)
            );
        }

        Commands::Paste {
            file,
            section,
            entry,
            hex,
            save,
        } => {
            tracing::info!("Pasting into {:?} section {} entry {}", file, section, entry);
            ctx.edit(&file, &save, |s| s.paste(section, entry, &hex))?;
        }

        Commands::Set {
            file,
            section,
            entry,
            field,
            value,
            save,
        } => {
            tracing::info!("Setting {} = {} in {:?}", field, value, file);
            ctx.edit(&file, &save, |s| s.set_field(section, entry, &field, &value))?;
        }

        Commands::AddSection {
            file,
            entry_size,
            entry_count,
            save,
        } => {
            ctx.edit(&file, &save, |s| {
                let index = s.add_section(entry_size, entry_count)?;
                tracing::info!(
                    "Added section {} ({} entries x {} bytes)",
                    index,
                    entry_count,
                    entry_size
                );
                Ok(())
            })?;
        }

        Commands::AddEntry {
            file,
            section,
            save,
        } => {
            ctx.edit(&file, &save, |s| {
                let index = s.add_entry(section)?;
                tracing::info!("Added entry {} to section {}", index, section);
                Ok(())
            })?;
        }

        Commands::RemoveEntry {
            file,
            section,
            entry,
            save,
        } => {
            tracing::info!("Removing entry {} from section {}", entry, section);
            ctx.edit(&file, &save, |s| s.remove_entry(section, entry))?;
        }

        Commands::RemoveSection {
            file,
            section,
            save,
        } => {
            tracing::info!("Removing section {}", section);
            ctx.edit(&file, &save, |s| s.remove_section(section))?;
        }

        Commands::Verify { file } => {
            tracing::info!("Verifying {:?}", file);
            let len = verify_round_trip(&file, Arc::clone(&ctx.schema))?;
            println!("OK: {} bytes re-encode identically", len);
        }
    }

    Ok(())
}
