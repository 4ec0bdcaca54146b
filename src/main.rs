use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use log::error;

use farc::{AddOutcome, Archive, Report};

mod cli;
use crate::cli::Cli;
use crate::cli::Commands;
use crate::cli::Config;

fn print_report(verb: &str, archive: &Path, report: &Report) {
    println!(
        "{} file(s) {} '{}'.",
        report.processed,
        verb,
        archive.display()
    );
    for skipped in &report.skipped {
        println!("\tskipped {}: {}", skipped.name, skipped.error);
    }
}

fn run(command: &Commands, config: &Config) -> farc::Result<()> {
    match command {
        Commands::Pack { archive, src_dir } => {
            let walker = config.walk_options().walk(src_dir)?;
            let report = Archive::create(archive)?
                .with_buffer_size(config.buffer_size)
                .pack_walk(walker)?;
            print_report("packed into archive", archive, &report);
        }
        Commands::Unpack { archive, dest_dir } => {
            let report = Archive::open_read(archive)?
                .with_buffer_size(config.buffer_size)
                .unpack_to(dest_dir)?;
            print_report("unpacked from archive", archive, &report);
        }
        Commands::Add { archive, file } => {
            let outcome = Archive::open(archive)?
                .with_buffer_size(config.buffer_size)
                .add_file(file)?;
            match outcome {
                AddOutcome::Added => println!(
                    "File '{}' added to archive '{}'.",
                    file.display(),
                    archive.display()
                ),
                AddOutcome::AlreadyPresent => println!(
                    "File '{}' already exists in archive '{}'.",
                    file.display(),
                    archive.display()
                ),
            }
        }
        Commands::Del { archive, name } => {
            farc::delete(archive, name)?;
            println!(
                "File '{}' deleted from archive '{}'.",
                name.to_string_lossy(),
                archive.display()
            );
        }
        Commands::List { archive } => {
            let listing = farc::list(archive)?;
            for member in &listing {
                println!("{}\t{}", member.name, member.size);
            }
            println!(
                "Total files in archive '{}': {}",
                archive.display(),
                listing.len()
            );
        }
    }
    Ok(())
}

fn archive_of(command: &Commands) -> &Path {
    match command {
        Commands::Pack { archive, .. }
        | Commands::Unpack { archive, .. }
        | Commands::Add { archive, .. }
        | Commands::Del { archive, .. }
        | Commands::List { archive } => archive.as_path(),
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Parse the cli
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(&cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("archive '{}': {}", archive_of(&cli.command).display(), e);
            ExitCode::FAILURE
        }
    }
}
