// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses the command line in two phases:
//
//   1. lenient clap pass that only reads --model-type, then a
//      registry lookup (UnknownModelType here, before anything
//      else happens)
//   2. merge that variant's flags into the command and parse
//      everything with clap
//
// All real work is delegated to Layer 2 (application).

pub mod commands;

use anyhow::{bail, Result};
use clap::{Command, CommandFactory, FromArgMatches, Parser};
use std::ffi::OsString;

use crate::application::train_use_case::{TrainConfig, TrainUseCase};
use crate::domain::checkpoint::FAILURE_SNAPSHOT_STEM;
use crate::ml::{
    factory::{ModelHyperparameters, ModelKind, MODEL_REGISTRY},
    trainer::RunState,
};
use commands::TrainArgs;

#[derive(Parser, Debug)]
#[command(
    name = "nmt-train",
    version = "0.1.0",
    about = "Train a sequence-to-sequence translation model on a parallel corpus."
)]
pub struct Cli {
    #[command(flatten)]
    pub train: TrainArgs,
}

impl Cli {
    pub fn parse_two_phase<I, T>(args: I) -> Result<(Cli, ModelHyperparameters)>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let args: Vec<OsString> = args.into_iter().map(Into::into).collect();

        let Some(name) = probe_model_type(&args) else {
            // let clap produce the usual "required argument" / --help output
            Cli::command().try_get_matches_from(&args)?;
            bail!("--model-type is required");
        };
        let kind = ModelKind::from_name(&name)?;

        let matches = kind.declare_schema(Cli::command()).try_get_matches_from(&args)?;
        let cli     = Cli::from_arg_matches(&matches)?;
        let hyper   = kind.parse_hyperparameters(&matches)?;
        Ok((cli, hyper))
    }

    pub fn run(self, hyper: ModelHyperparameters) -> Result<()> {
        let config: TrainConfig = (self.train, hyper).into();
        tracing::info!("Starting {} training", config.model.kind().name());

        let use_case = TrainUseCase::new(config);
        let report   = use_case.execute()?;

        match report.state {
            RunState::Completed => {
                println!("Training complete. {} checkpoints saved.", report.checkpoints.len());
                Ok(())
            }
            RunState::NaNAborted => bail!(
                "Training aborted on NaN loss at epoch {}, iteration {}. Failure snapshot: '{}'",
                report.metrics.epoch,
                report.metrics.iteration,
                use_case
                    .checkpoint_manager()
                    .file_path(FAILURE_SNAPSHOT_STEM)
                    .display(),
            ),
            RunState::Running => bail!("Training loop stopped before reaching a terminal state"),
        }
    }
}

/// `--model-type` as clap reads it, ignoring every other error.
fn probe_model_type(args: &[OsString]) -> Option<String> {
    probe_command()
        .try_get_matches_from(args)
        .ok()?
        .get_one::<String>("model_type")
        .cloned()
}

/// The base command plus the flags of every registered variant, so
/// variant flags placed before --model-type do not end the lenient pass.
fn probe_command() -> Command {
    let mut cmd = Cli::command().ignore_errors(true);
    for kind in MODEL_REGISTRY {
        let variant = kind.declare_schema(Command::new("variant"));
        for arg in variant.get_arguments() {
            if cmd.get_arguments().all(|a| a.get_id() != arg.get_id()) {
                cmd = cmd.arg(arg.clone());
            }
        }
    }
    cmd
}
