//! Dev tasks for the meshgate workspace, run as `cargo xtask <command>`.
//!
//! The fuzz harnesses live in their own workspace under `fuzz/`, so a plain
//! `cargo test --workspace` at the root never reaches them; `cargo xtask
//! test` covers both.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use xshell::{cmd, Shell};

#[derive(Parser)]
#[command(name = "xtask", about = "meshgate dev tasks")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the workspace tests plus the fuzz harnesses' scripted cases
    Test,
    /// Fuzz one target with bolero, or smoke-test all of them
    Fuzz {
        /// One of: mutex_gate, mailbox, frame_codec
        target: Option<String>,
    },
    /// Clippy over both workspaces, warnings denied
    Clippy,
    /// Check formatting
    Fmt {
        /// Rewrite files instead of just checking
        #[arg(long)]
        fix: bool,
    },
}

const FUZZ_TARGETS: &[(&str, &str)] = &[
    ("mutex_gate", "semaphore interleavings against the gate model"),
    ("mailbox", "publish/poll sequences against the slot model"),
    ("frame_codec", "the real decoder over arbitrary bytes"),
];

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("xtask: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let sh = Shell::new()?;
    sh.change_dir(workspace_root()?);

    match cli.command {
        Commands::Test => {
            if cmd!(sh, "cargo nextest --version").quiet().run().is_ok() {
                cmd!(sh, "cargo nextest run --workspace").run()?;
            } else {
                cmd!(sh, "cargo test --workspace").run()?;
            }
            let _fuzz = sh.push_dir("fuzz");
            cmd!(sh, "cargo test").run()?;
        }
        Commands::Fuzz { target } => {
            let _fuzz = sh.push_dir("fuzz");
            match target {
                Some(t) => {
                    if !FUZZ_TARGETS.iter().any(|(name, _)| *name == t) {
                        eprintln!("unknown target {t:?}; pick one of:");
                        print_targets();
                        return Err("unknown fuzz target".into());
                    }
                    if cmd!(sh, "cargo bolero --version").quiet().run().is_err() {
                        return Err(
                            "cargo-bolero is not installed (cargo install cargo-bolero)".into()
                        );
                    }
                    cmd!(sh, "cargo bolero test {t}").run()?;
                }
                None => {
                    println!("no target given; running each harness's scripted cases instead.");
                    print_targets();
                    cmd!(sh, "cargo test").run()?;
                }
            }
        }
        Commands::Clippy => {
            cmd!(sh, "cargo clippy --workspace --all-targets -- -D warnings").run()?;
            let _fuzz = sh.push_dir("fuzz");
            cmd!(sh, "cargo clippy --all-targets -- -D warnings").run()?;
        }
        Commands::Fmt { fix } => {
            if fix {
                cmd!(sh, "cargo fmt --all").run()?;
            } else {
                cmd!(sh, "cargo fmt --all -- --check").run()?;
            }
        }
    }

    Ok(())
}

fn workspace_root() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let manifest = PathBuf::from(std::env::var("CARGO_MANIFEST_DIR")?);
    Ok(manifest
        .parent()
        .ok_or("xtask manifest has no parent directory")?
        .to_path_buf())
}

fn print_targets() {
    for (name, what) in FUZZ_TARGETS {
        println!("  {name:<12} {what}");
    }
}
