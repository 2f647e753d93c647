//! # occ
//!
//! The command-line entrypoint tying the parser, binder, IR lowering engine, and build driver
//! into a single application.

mod cli;

use std::fs;
use std::path::Path;

use cli::*;
use log::{error, info};
use occ::build::{BuildResult, BuildSystem};
use occ::project::Project;

fn main() {
    let args = Cli::init();
    simple_logger::init_with_level(log::Level::from(&args.verbosity)).unwrap();

    let exit_code = match args.command {
        Commands::Create(create_args) => run_create(&create_args),
        Commands::Build(build_args) => run_build(&build_args),
        Commands::Clean => run_clean(),
    };
    std::process::exit(exit_code);
}

fn run_create(args: &CreateArgs) -> i32 {
    let dir = Path::new(&args.name);
    if let Err(e) = fs::create_dir_all(dir.join("src")) {
        error!("failed to create project directory: {e}");
        return 1;
    }
    let project = Project::new(&args.name);
    match project.to_toml() {
        Ok(toml) => {
            if let Err(e) = fs::write(dir.join(".ocproj"), toml) {
                error!("failed to write .ocproj: {e}");
                return 1;
            }
        }
        Err(e) => {
            error!("{e}");
            return 1;
        }
    }
    info!("created project '{}'", args.name);
    0
}

fn run_build(args: &BuildArgs) -> i32 {
    let project_file = args.project_dir.join(".ocproj");
    let project_name = match Project::load_from_file(&project_file) {
        Ok(project) => project.project.name,
        Err(e) => {
            error!("{e}");
            return 1;
        }
    };

    let system = match BuildSystem::discover(&args.project_dir) {
        Ok(system) => system,
        Err(e) => {
            error!("{e}");
            return 1;
        }
    };

    let threads = args.threads.unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4));
    let summary = match system.run_build(&project_name, threads, &args.project_dir) {
        Ok(summary) => summary,
        Err(e) => {
            error!("{e}");
            return 1;
        }
    };

    for result in &summary.results {
        if let BuildResult::Failure(file_error) = result {
            error!("{file_error}");
        }
    }

    if let Some(link_error) = &summary.link_error {
        error!("{link_error}");
    } else if let Some(binary) = &summary.linked_binary {
        info!("linked '{}'", binary.display());
    }

    if summary.is_fully_successful() {
        0
    } else {
        -1
    }
}

fn run_clean() -> i32 {
    for dir in ["obj", "bin"] {
        if Path::new(dir).exists() {
            if let Err(e) = fs::remove_dir_all(dir) {
                error!("failed to remove '{dir}': {e}");
                return 1;
            }
        }
    }
    info!("cleaned build outputs");
    0
}
