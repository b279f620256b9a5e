//! amp - provisioning CLI for the music-ai serving backend.
//!
//! This binary takes a backend checkout from "cloned" to "serving":
//! it builds the Python environment, assembles the container image,
//! and pre-fetches model weights.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

// Use modules from the library crate
use amp_cli::commands::{self, AppContext};
use amp_core::logging::{init_tracing, LogLevel};

/// amp - music-ai backend provisioner
#[derive(Parser)]
#[command(name = "amp")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Project directory (default: current directory)
    #[arg(long, global = true)]
    project: Option<PathBuf>,

    /// Settings file (default: <project>/.amp/settings.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build or refresh the managed virtual environment
    Setup {
        /// Dependency manifest (default: from settings)
        #[arg(long)]
        manifest: Option<PathBuf>,

        /// Virtual environment directory (default: from settings)
        #[arg(long)]
        venv: Option<PathBuf>,

        /// Python interpreter to bootstrap from (default: discovered on PATH)
        #[arg(long)]
        python: Option<PathBuf>,

        /// Hardware profile selecting the torch package index
        #[arg(long, value_parser = ["cpu", "cu121"])]
        hardware: Option<String>,

        /// Extra package index URL (overrides --hardware)
        #[arg(long)]
        index_url: Option<String>,

        /// Rebuild even if the environment already matches the manifest
        #[arg(long)]
        force: bool,
    },

    /// Assemble the serving container image
    Image {
        #[command(subcommand)]
        command: ImageCommands,
    },

    /// Manage model weights
    Weights {
        #[command(subcommand)]
        command: WeightsCommands,
    },

    /// Check host tooling and project state
    Doctor,
}

#[derive(Subcommand)]
enum ImageCommands {
    /// Render the Dockerfile without invoking docker
    Plan {
        /// Write the Dockerfile here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Assemble the Dockerfile and run `docker build`
    Build {
        /// Image tag (default: from settings)
        #[arg(short, long)]
        tag: Option<String>,

        /// Build context directory (default: project directory)
        #[arg(long)]
        context: Option<PathBuf>,

        /// Leave the generated Dockerfile in the build context
        #[arg(long)]
        keep_dockerfile: bool,
    },
}

#[derive(Subcommand)]
enum WeightsCommands {
    /// Download model checkpoints through the managed environment
    Fetch {
        /// Model name
        #[arg(short, long, default_value = amp_core::weights::DEFAULT_MODEL)]
        model: String,

        /// Torch cache directory override
        #[arg(long)]
        cache: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(LogLevel::Warn);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {}", colored::Colorize::red("error"), e);
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let app = AppContext::load(cli.project.as_deref(), cli.config.as_deref())?;

    match cli.command {
        Commands::Setup {
            manifest,
            venv,
            python,
            hardware,
            index_url,
            force,
        } => commands::setup::run(&app, manifest, venv, python, hardware, index_url, force),
        Commands::Image { command } => match command {
            ImageCommands::Plan { out } => commands::image::plan(&app, out),
            ImageCommands::Build {
                tag,
                context,
                keep_dockerfile,
            } => commands::image::build(&app, tag, context, keep_dockerfile),
        },
        Commands::Weights { command } => match command {
            WeightsCommands::Fetch { model, cache } => commands::weights::fetch(&app, model, cache),
        },
        Commands::Doctor => commands::doctor::run(&app),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_setup() {
        let cli = Cli::try_parse_from([
            "amp",
            "setup",
            "--hardware",
            "cpu",
            "--force",
        ])
        .unwrap();
        match cli.command {
            Commands::Setup {
                hardware,
                force,
                index_url,
                ..
            } => {
                assert_eq!(hardware.as_deref(), Some("cpu"));
                assert!(force);
                assert!(index_url.is_none());
            }
            _ => panic!("expected setup command"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_hardware() {
        assert!(Cli::try_parse_from(["amp", "setup", "--hardware", "tpu"]).is_err());
    }

    #[test]
    fn test_cli_parses_image_plan() {
        let cli = Cli::try_parse_from(["amp", "image", "plan", "--out", "Dockerfile"]).unwrap();
        match cli.command {
            Commands::Image {
                command: ImageCommands::Plan { out },
            } => assert_eq!(out, Some(PathBuf::from("Dockerfile"))),
            _ => panic!("expected image plan command"),
        }
    }

    #[test]
    fn test_cli_parses_image_build() {
        let cli = Cli::try_parse_from([
            "amp",
            "image",
            "build",
            "--tag",
            "backend:dev",
            "--keep-dockerfile",
        ])
        .unwrap();
        match cli.command {
            Commands::Image {
                command:
                    ImageCommands::Build {
                        tag,
                        keep_dockerfile,
                        ..
                    },
            } => {
                assert_eq!(tag.as_deref(), Some("backend:dev"));
                assert!(keep_dockerfile);
            }
            _ => panic!("expected image build command"),
        }
    }

    #[test]
    fn test_cli_parses_weights_fetch_with_default_model() {
        let cli = Cli::try_parse_from(["amp", "weights", "fetch"]).unwrap();
        match cli.command {
            Commands::Weights {
                command: WeightsCommands::Fetch { model, cache },
            } => {
                assert_eq!(model, "htdemucs");
                assert!(cache.is_none());
            }
            _ => panic!("expected weights fetch command"),
        }
    }

    #[test]
    fn test_cli_parses_global_project_flag() {
        let cli = Cli::try_parse_from(["amp", "doctor", "--project", "/srv/backend"]).unwrap();
        assert_eq!(cli.project, Some(PathBuf::from("/srv/backend")));
        match cli.command {
            Commands::Doctor => {}
            _ => panic!("expected doctor command"),
        }
    }
}
