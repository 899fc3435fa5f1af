use std::{path::PathBuf, process::ExitCode};

use tracing_subscriber::EnvFilter;

use keeper::{
    cli::{Cli, Commands, parse_args},
    config::load_manifest,
    error::SupervisorError,
    pidfile::PidFile,
    process::{ChildSpec, CommandWorker},
    supervisor::Supervisor,
};

fn main() -> ExitCode {
    let args = parse_args();
    init_logging(&args);

    match execute(args.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(err.exit_code() as u8)
        }
    }
}

fn init_logging(args: &Cli) {
    let filter = if let Some(level) = args.log_level {
        EnvFilter::new(level.as_str())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn execute(command: Commands) -> Result<(), SupervisorError> {
    match command {
        Commands::Run {
            config,
            daemonize,
            pid_file,
        } => build_supervisor(&config, daemonize, pid_file)?.run(),
        Commands::Restart {
            config,
            daemonize,
            force,
            pid_file,
        } => build_supervisor(&config, daemonize, pid_file)?.restart(force),
        Commands::Stop { pid_file } => Supervisor::new(pid_file_at(pid_file)).stop(),
    }
}

/// Loads the manifest up front (before any daemonization changes the working
/// directory) and defers worker registration to the prepare phase.
fn build_supervisor(
    config: &str,
    daemonize: bool,
    pid_file: Option<String>,
) -> Result<Supervisor, SupervisorError> {
    let manifest = load_manifest(&resolve_path(config))?;

    let mut supervisor = Supervisor::new(pid_file_at(pid_file));
    supervisor.set_daemon(daemonize);
    supervisor.on_preparing(move |sup| {
        for (name, worker) in manifest.workers {
            sup.register_child_process(
                ChildSpec::new(name, CommandWorker::new(worker.command))
                    .respawn(worker.respawn),
            )?;
        }
        Ok(())
    });

    Ok(supervisor)
}

fn pid_file_at(path: Option<String>) -> PidFile {
    match path {
        Some(path) => PidFile::new(resolve_path(&path)),
        None => PidFile::new(PidFile::default_path()),
    }
}

/// Absolutizes a path so it survives the daemonizer's chdir to `/`.
fn resolve_path(path: &str) -> PathBuf {
    let candidate = PathBuf::from(path);
    if candidate.is_absolute() {
        return candidate;
    }

    match std::env::current_dir() {
        Ok(cwd) => cwd.join(&candidate),
        Err(_) => candidate,
    }
}
