use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

use anstream::{eprintln, print, println};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use venvkit::{
    ListFormat, OutputMode, PipListFormat, RunOptions, VenvSpec, VirtualEnv,
};
use wheel_filename::WheelFilename;

#[derive(Parser, Debug)]
#[command(name = "venvkit", about = "Manage a local Python virtual environment")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create (or reuse) a virtual environment.
    Venv {
        path: Option<PathBuf>,
        #[arg(long)]
        overwrite: bool,
        #[arg(long)]
        system_site_packages: bool,
    },
    /// Create a fresh environment and install the dependencies declared in
    /// `pyproject.toml`.
    Sync {
        #[arg(long)]
        system_site_packages: bool,
    },
    /// List the packages installed in the environment.
    Freeze {
        #[arg(long, value_enum, default_value = "freeze")]
        format: FormatArg,
        #[arg(long, default_value = "venv")]
        venv: PathBuf,
    },
    /// Run a program from the environment's scripts directory.
    Run {
        program: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        arguments: Vec<String>,
        #[arg(long, default_value = "venv")]
        venv: PathBuf,
    },
    /// Check whether a wheel can run on this environment's interpreter and
    /// platform.
    Compatible {
        wheel: String,
        #[arg(long, default_value = "venv")]
        venv: PathBuf,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum FormatArg {
    Freeze,
    Columns,
    Json,
}

impl From<FormatArg> for ListFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Freeze => Self::Freeze,
            FormatArg::Columns => Self::List(PipListFormat::Columns),
            FormatArg::Json => Self::List(PipListFormat::Json),
        }
    }
}

fn run() -> Result<(), venvkit::Error> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Venv {
            path,
            overwrite,
            system_site_packages,
        } => {
            let spec = VenvSpec::at(path.unwrap_or_else(|| PathBuf::from("venv")))
                .overwrite(overwrite)
                .system_site_packages(system_site_packages);
            let venv = VirtualEnv::new(spec)?;
            println!("{venv}");
        }
        Commands::Sync {
            system_site_packages,
        } => {
            let cwd = std::env::current_dir()?;
            let (venv, _) = venvkit::sync_project(&cwd, system_site_packages)?;
            println!("{venv}");
        }
        Commands::Freeze { format, venv } => {
            let venv = VirtualEnv::new(VenvSpec::at(venv))?;
            print!("{}", venv.freeze(format.into())?);
        }
        Commands::Run {
            program,
            arguments,
            venv,
        } => {
            let venv = VirtualEnv::new(VenvSpec::at(venv))?;
            venv.run(
                &program,
                arguments,
                RunOptions {
                    output: OutputMode::Inherit,
                    ..RunOptions::default()
                },
            )?;
        }
        Commands::Compatible { wheel, venv } => {
            let wheel: WheelFilename = wheel.parse()?;
            let venv = VirtualEnv::new(VenvSpec::at(venv))?;
            if wheel.is_compatible(venv.supported_tags()?) {
                println!("{wheel}: compatible");
            } else {
                println!("{wheel}: incompatible");
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    if let Err(err) = run() {
        eprintln!("venvkit failed");
        let mut last_error: Option<&(dyn Error + 'static)> = Some(&err);
        while let Some(err) = last_error {
            eprintln!("  Caused by: {err}");
            last_error = err.source();
        }
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
