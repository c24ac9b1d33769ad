//! keystamp operator tool
//!
//! Generates signing keys, issues device-bound license tokens and verifies
//! them against a public key.
//!
//! Usage:
//!   keystamp keygen --out-dir keys
//!   keystamp issue --private-key keys/keystamp.key.pem --fingerprint ABC123 --days 365 --feature pro
//!   keystamp verify --public-key keys/keystamp.pub.pem --file license.lic

use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use keystamp_license::{
    Ed25519Backend, FsLicenseStore, HostFingerprint, LicenseError, LicenseManager,
    LicensePayload, StaticFingerprint, DEFAULT_LICENSE_DIR,
};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

#[derive(Parser, Debug)]
#[command(name = "keystamp")]
#[command(about = "Issue and verify machine-bound license tokens")]
struct Cli {
    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate an Ed25519 key pair as PEM files
    Keygen {
        /// Directory to write the key files into
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,

        /// Base name for the key files
        #[arg(long, default_value = "keystamp")]
        name: String,
    },

    /// Print the fingerprint of this machine
    Fingerprint,

    /// Sign a new license token
    Issue(IssueArgs),

    /// Verify a license token
    Verify(VerifyArgs),
}

#[derive(Args, Debug)]
struct IssueArgs {
    /// PKCS#8 PEM private key
    #[arg(long)]
    private_key: PathBuf,

    /// Fingerprint of the machine to bind to
    #[arg(long)]
    fingerprint: String,

    /// Validity in days starting now
    #[arg(long, conflicts_with_all = ["start", "end"])]
    days: Option<u32>,

    /// Window start, ms since epoch
    #[arg(long, requires = "end")]
    start: Option<i64>,

    /// Window end, ms since epoch
    #[arg(long, requires = "start")]
    end: Option<i64>,

    /// Granted feature (repeatable)
    #[arg(long = "feature")]
    features: Vec<String>,

    /// Write the token to this file name in the license directory
    #[arg(long)]
    output: Option<String>,

    /// License directory
    #[arg(long, env = "KEYSTAMP_LICENSE_DIR", default_value = DEFAULT_LICENSE_DIR)]
    license_dir: PathBuf,
}

#[derive(Args, Debug)]
struct VerifyArgs {
    /// SPKI PEM public key
    #[arg(long)]
    public_key: PathBuf,

    /// Token given inline
    #[arg(long, conflicts_with = "file")]
    token: Option<String>,

    /// License file name in the license directory
    #[arg(long)]
    file: Option<String>,

    /// License directory
    #[arg(long, env = "KEYSTAMP_LICENSE_DIR", default_value = DEFAULT_LICENSE_DIR)]
    license_dir: PathBuf,

    /// Fingerprint to check against (defaults to this machine)
    #[arg(long)]
    fingerprint: Option<String>,

    /// Instant to verify at, ms since epoch (defaults to now)
    #[arg(long)]
    at: Option<i64>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    match run(cli.command) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<ExitCode> {
    match command {
        Command::Keygen { out_dir, name } => keygen(&out_dir, &name)?,
        Command::Fingerprint => println!("{}", HostFingerprint::generate()),
        Command::Issue(args) => issue(args)?,
        Command::Verify(args) => return verify(args),
    }
    Ok(ExitCode::SUCCESS)
}

fn keygen(out_dir: &Path, name: &str) -> Result<()> {
    let pair = Ed25519Backend::generate_keypair_pem().context("Failed to generate key pair")?;
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let private_path = out_dir.join(format!("{name}.key.pem"));
    let public_path = out_dir.join(format!("{name}.pub.pem"));
    fs::write(&private_path, &pair.private_pem)
        .with_context(|| format!("Failed to write {}", private_path.display()))?;
    fs::write(&public_path, &pair.public_pem)
        .with_context(|| format!("Failed to write {}", public_path.display()))?;

    info!(private = %private_path.display(), public = %public_path.display(), "Key pair written");
    Ok(())
}

fn issue(args: IssueArgs) -> Result<()> {
    let (valid_start, valid_end) = window(&args)?;
    let payload = args
        .features
        .iter()
        .fold(LicensePayload::new(&args.fingerprint, valid_start, valid_end), |p, f| {
            p.with_feature(f)
        });

    let manager = LicenseManager::new(
        StaticFingerprint::new(&args.fingerprint),
        FsLicenseStore::new(&args.license_dir),
    );
    manager
        .load_private_key_file(&args.private_key)
        .with_context(|| format!("Failed to load {}", args.private_key.display()))?;

    let token = manager.issue(&payload).context("Failed to issue license")?;
    match args.output {
        Some(name) => manager.save_license(&name, &token)?,
        None => println!("{token}"),
    }
    Ok(())
}

fn window(args: &IssueArgs) -> Result<(i64, i64)> {
    match (args.days, args.start, args.end) {
        (Some(days), None, None) => {
            let start = chrono::Utc::now().timestamp_millis();
            Ok((start, start + i64::from(days) * MILLIS_PER_DAY))
        }
        (None, Some(start), Some(end)) => Ok((start, end)),
        _ => bail!("specify either --days or both --start and --end"),
    }
}

fn verify(args: VerifyArgs) -> Result<ExitCode> {
    let manager = LicenseManager::new(HostFingerprint, FsLicenseStore::new(&args.license_dir));
    manager
        .load_public_key_file(&args.public_key)
        .with_context(|| format!("Failed to load {}", args.public_key.display()))?;

    let fingerprint = args
        .fingerprint
        .unwrap_or_else(|| manager.current_fingerprint());
    let now = args
        .at
        .unwrap_or_else(|| chrono::Utc::now().timestamp_millis());

    let outcome = match (args.token, args.file) {
        (Some(token), _) => manager.verify(&token, &fingerprint, now).map_err(LicenseError::from),
        (None, Some(name)) => manager.load_and_verify_at(&name, &fingerprint, now),
        (None, None) => bail!("specify --token or --file"),
    };

    match outcome {
        Ok(payload) => {
            println!("{}", serde_json::to_string_pretty(&payload)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(LicenseError::Rejected(rejection)) => {
            eprintln!("rejected ({}): {rejection}", rejection.kind());
            Ok(ExitCode::from(1))
        }
        Err(e) => Err(e).context("Failed to read license"),
    }
}
