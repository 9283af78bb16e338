use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use strata_cli::{commands, mount_all, registry, CliError, MountTable};

/// Strata - browse mounted Strata filesystems
#[derive(Parser, Debug)]
#[command(name = "strata")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Mount table (JSON). Defaults to <config dir>/strata/mounts.json
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Extra mount as PATH=SPEC (ram, ram:BUDGET, jifs, ftp://..., cdrom:IMAGE)
    #[arg(long = "mount", global = true, value_name = "PATH=SPEC")]
    mounts: Vec<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List a directory
    Ls {
        #[arg(default_value = "/")]
        path: String,

        /// Show type, length and modification time
        #[arg(short, long)]
        long: bool,
    },
    /// Print a file
    Cat { path: String },
    /// Print a directory tree
    Tree {
        #[arg(default_value = "/")]
        path: String,
    },
    /// Show space per mount
    Df,
    /// CD-ROM driver tools
    Cdrom {
        #[command(subcommand)]
        command: CdromCommand,
    },
}

#[derive(Subcommand, Debug)]
enum CdromCommand {
    /// Start the emulated drive on an image and report what it sees
    Info { image: PathBuf },
}

fn run(args: Args) -> Result<(), CliError> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    if let Command::Cdrom {
        command: CdromCommand::Info { image },
    } = &args.command
    {
        return commands::cdrom_info(image, &mut out);
    }

    let table = MountTable::resolve(args.config.as_deref(), &args.mounts)?;
    let ns = mount_all(&registry(), &table)?;
    let result = match &args.command {
        Command::Ls { path, long } => commands::ls(&ns, path, *long, &mut out),
        Command::Cat { path } => commands::cat(&ns, path, &mut out),
        Command::Tree { path } => commands::tree(&ns, path, &mut out),
        Command::Df => commands::df(&ns, &mut out),
        Command::Cdrom { .. } => Ok(()),
    };
    out.flush()?;
    ns.close_all()?;
    result
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
