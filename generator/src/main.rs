// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pqkat: known-answer-test generator for the hybrid post-quantum handshake
//
// Runs one Alice/Bob handshake (Kyber-1024 KEM, Dilithium5 or SPHINCS+
// confirmation signatures, HKDF-SHA3-512) and writes every public artifact
// to a hex log sealed with a SHA3-512 integrity line.

use std::fs::{self, File, OpenOptions};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use pqkat_common::kdf::{SALT_LEN, SESSION_KEY_LEN};
use pqkat_common::kem::{KEM_CT_LEN, KEM_PK_LEN, KEM_SK_LEN, SHARED_SECRET_LEN};
use pqkat_common::{
    generate_kat, verify_kat, Handshake, KatConfig, Kem, Kyber1024, SignatureAlgorithm,
    SignatureScheme,
};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "pqkat", about = "Hybrid Kyber-1024 + Dilithium5 handshake KAT generator")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Run one handshake and write a sealed KAT log
    Generate(GenerateArgs),
    /// Check the integrity line and verification results of a KAT log
    Verify {
        /// Path to the log file
        path: PathBuf,
    },
    /// Print algorithm parameters
    Info,
}

#[derive(ClapArgs, Default)]
struct GenerateArgs {
    /// Output directory (env: PQKAT_OUTPUT_DIR, default: kat_logs)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Log file name (env: PQKAT_FILE_NAME)
    #[arg(long)]
    file_name: Option<String>,

    /// Confirmation signature scheme: dilithium5 or sphincs (env: PQKAT_SIGNATURE)
    #[arg(long)]
    signature: Option<SignatureAlgorithm>,

    /// Replace an existing log file (env: PQKAT_OVERWRITE)
    #[arg(long)]
    overwrite: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.json);

    match args.command {
        Command::Generate(opts) => {
            let config = resolve_config(KatConfig::from_env()?, opts)?;
            let (path, digest) = write_kat(&config)?;
            println!("KAT written to {}", path.display());
            println!("sha3_512 = {digest}");
            Ok(())
        }
        Command::Verify { path } => {
            let log = fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
            let digest = verify_kat(&log)
                .with_context(|| format!("{} failed verification", path.display()))?;
            info!(path = %path.display(), "KAT log verified");
            println!("OK {}", hex::encode(digest));
            Ok(())
        }
        Command::Info => {
            info_banner();
            Ok(())
        }
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Apply CLI flags on top of the environment-derived config.
fn resolve_config(mut config: KatConfig, args: GenerateArgs) -> anyhow::Result<KatConfig> {
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }
    if let Some(name) = args.file_name {
        config.file_name = name;
    }
    if let Some(sig) = args.signature {
        config.signature = sig;
    }
    config.overwrite |= args.overwrite;
    config.validate()?;
    Ok(config)
}

/// Run one handshake and write its log. Returns the path and hex digest.
///
/// Without `overwrite` the log is created in place and exclusively. With
/// `overwrite` the run is staged in a sibling `.tmp` file that replaces the
/// existing log only once the run is sealed, so a rejected run never destroys
/// a previous KAT.
fn write_kat(config: &KatConfig) -> anyhow::Result<(PathBuf, String)> {
    let kem = Kyber1024;
    write_handshake(config, Handshake::new(&kem, config.signature.scheme()))
}

fn write_handshake<K, S>(
    config: &KatConfig,
    handshake: Handshake<'_, K, S>,
) -> anyhow::Result<(PathBuf, String)>
where
    K: Kem + ?Sized,
    S: SignatureScheme + ?Sized,
{
    fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("creating {}", config.output_dir.display()))?;
    let path = config.output_path();
    let staging = config.overwrite.then(|| staging_path(&path));
    let target = staging.as_deref().unwrap_or(&path);
    let file = open_log(target)?;

    info!(
        path = %path.display(),
        signature = %config.signature,
        staged = staging.is_some(),
        "generating KAT"
    );

    let report = match generate_kat(handshake, BufWriter::new(file)) {
        Ok(report) => report,
        Err(e) => {
            if let Some(tmp) = &staging {
                let _ = fs::remove_file(tmp);
            }
            error!(
                path = %target.display(),
                error = %e,
                "KAT run failed; log has no integrity line and is invalid"
            );
            return Err(e).with_context(|| format!("generating {}", path.display()));
        }
    };

    let digest = report.digest_hex();
    if let Some(tmp) = &staging {
        let file = report
            .sink
            .into_inner()
            .map_err(|e| e.into_error())
            .with_context(|| format!("flushing {}", tmp.display()))?;
        file.sync_all()
            .with_context(|| format!("syncing {}", tmp.display()))?;
        drop(file);
        fs::rename(tmp, &path)
            .with_context(|| format!("replacing {}", path.display()))?;
    }
    Ok((path, digest))
}

/// Sibling file a replacing run is written to before it is renamed over the
/// existing log.
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Create the file exclusively so concurrent runs never share it.
fn open_log(path: &Path) -> anyhow::Result<File> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .with_context(|| format!("creating {} (exists? pass --overwrite)", path.display()))
}

fn info_banner() {
    println!("Hybrid Post-Quantum Handshake (KAT generator)");
    println!("=============================================");
    println!();
    println!("KEM:        {}", Kyber1024.name());
    println!("            pk {KEM_PK_LEN} / sk {KEM_SK_LEN} / ct {KEM_CT_LEN} / ss {SHARED_SECRET_LEN} bytes");
    for alg in [SignatureAlgorithm::Dilithium5, SignatureAlgorithm::Sphincs] {
        println!("Signature:  {} (--signature {alg})", alg.scheme().name());
    }
    println!("KDF:        HKDF-SHA3-512, {SESSION_KEY_LEN}-byte session key");
    println!("Salt:       {SALT_LEN} bytes, fresh per run");
    println!("Transcript: SHA3-512(alice_kem_pk || bob_kem_pk || ciphertext || salt)");
    println!("Integrity:  SHA3-512 over the log, written only for accepted runs");
}
