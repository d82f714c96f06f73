use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use sealbox::batch::Batch;
use sealbox::cli::{finish, read_inputs};
use sealbox::crypto::DEFAULT_ITERATIONS;
use sealbox::metadata::FileMetadata;
use sealbox::{Envelope, ProcessorOptions, HEADER_LEN};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

#[derive(Parser)]
#[command(name = "sealbox", about = "Password-based file encryption (AES-256-GCM, PBKDF2-SHA256)")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CryptoArgs {
    /// Password; prompted for on the terminal when absent
    #[arg(short, long, env = "SEALBOX_PASSWORD", hide_env_values = true)]
    password: Option<String>,
    /// PBKDF2 iteration count (must match between encrypt and decrypt)
    #[arg(long, env = "SEALBOX_ITERATIONS", default_value_t = DEFAULT_ITERATIONS)]
    iterations: u32,
    /// Output directory
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,
    /// Keep going after a file fails instead of stopping the batch
    #[arg(long)]
    continue_on_error: bool,
    /// Replace output files that already exist
    #[arg(short, long)]
    force: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt one or more files into <name>.enc containers
    Encrypt {
        #[command(flatten)]
        args: CryptoArgs,
        /// MIME type recorded for every input (guessed per file from its extension by default)
        #[arg(short = 't', long = "type")]
        content_type: Option<String>,
        #[arg(required = true, num_args = 1..)]
        input: Vec<PathBuf>,
    },
    /// Decrypt one or more .enc containers
    Decrypt {
        #[command(flatten)]
        args: CryptoArgs,
        /// Accept inputs without the .enc suffix (output becomes decrypted_<name>)
        #[arg(long)]
        any_name: bool,
        #[arg(required = true, num_args = 1..)]
        input: Vec<PathBuf>,
    },
    /// Show a container's header without decrypting it
    Inspect {
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {

        // ── Encrypt ──────────────────────────────────────────────────────────
        Commands::Encrypt { args, content_type, input } => {
            let opts = ProcessorOptions { iterations: args.iterations, ..Default::default() };
            opts.validate()?;
            let items = read_inputs(&input, content_type.as_deref())?;
            let password = obtain_password(args.password, true)?;
            let outcomes = batch(opts, args.continue_on_error, items.len())
                .encrypt(&password, &items);
            finish(&outcomes, &args.output_dir, args.force, "encrypted")?;
        }

        // ── Decrypt ──────────────────────────────────────────────────────────
        Commands::Decrypt { args, any_name, input } => {
            let opts = ProcessorOptions {
                iterations:               args.iterations,
                require_container_suffix: !any_name,
            };
            opts.validate()?;
            let items = read_inputs(&input, None)?;
            let password = obtain_password(args.password, false)?;
            let outcomes = batch(opts, args.continue_on_error, items.len())
                .decrypt(&password, &items);
            finish(&outcomes, &args.output_dir, args.force, "decrypted")?;
        }

        // ── Inspect ──────────────────────────────────────────────────────────
        Commands::Inspect { input } => {
            let bytes = std::fs::read(&input)
                .with_context(|| format!("reading {}", input.display()))?;
            let env = Envelope::decode(&bytes)
                .with_context(|| format!("{} is not a valid encrypted file", input.display()))?;

            println!("── Envelope ─────────────────────────────────────────────");
            println!("  Path           {}", input.display());
            println!("  Total size     {} B", bytes.len());
            println!("  Salt           {}", hex::encode(env.salt));
            println!("  Nonce          {}", hex::encode(env.nonce));
            println!("  Header         {} B", HEADER_LEN);
            println!("  Metadata       {} B (unauthenticated until decrypted)", env.metadata.len());
            match FileMetadata::from_bytes(&env.metadata) {
                Ok(meta) => {
                    println!("    version      {}", meta.version);
                    println!("    extension    {}", meta.ext);
                    println!("    type         {}", meta.content_type);
                    println!("    size         {} B", meta.size);
                }
                Err(e) => println!("    unreadable   {e}"),
            }
            println!("  Ciphertext     {} B (incl. 16 B tag)", env.ciphertext.len());
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn obtain_password(given: Option<String>, confirm: bool) -> Result<Zeroizing<String>> {
    if let Some(pwd) = given {
        return Ok(Zeroizing::new(pwd));
    }
    let first = Zeroizing::new(rpassword::prompt_password("Password: ")?);
    if confirm && !first.is_empty() {
        let second = Zeroizing::new(rpassword::prompt_password("Confirm password: ")?);
        if *first != *second {
            bail!("passwords did not match");
        }
    }
    Ok(first)
}

fn batch(opts: ProcessorOptions, continue_on_error: bool, total: usize) -> Batch {
    let batch = Batch::new(opts).halt_on_error(!continue_on_error);
    if total > 1 {
        batch.on_progress(|done, total| eprintln!("  [{done}/{total}]"))
    } else {
        batch
    }
}
