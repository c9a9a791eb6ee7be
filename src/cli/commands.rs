//! Command dispatch: maps parsed arguments onto the org chart service

use std::io;

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::application::services::{LoadOutcome, Outcome};
use crate::application::ApplicationError;
use crate::cli::args::{Cli, Commands, ConfigCommands, PoolCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::cli::render::ToTermTree;
use crate::config::{global_config_path, Settings};
use crate::domain::DropTarget;
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::traits::{FileSystem, RealFileSystem};
use crate::infrastructure::InfraError;

/// Run the selected command.
pub async fn execute_command(cli: &Cli) -> CliResult<()> {
    let Some(command) = &cli.command else {
        return Err(CliError::Usage(
            "no command given, see `orgview --help`".to_string(),
        ));
    };

    match command {
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        Commands::Config { command } => {
            let settings = Settings::load(cli.config.as_deref())?;
            execute_config(command, &settings)
        }
        _ => {
            let settings = Settings::load(cli.config.as_deref())?;
            let container = ServiceContainer::new(settings);
            execute_chart(command, &container).await
        }
    }
}

async fn execute_chart(command: &Commands, container: &ServiceContainer) -> CliResult<()> {
    let service = &container.org_chart;
    service.initialize();

    match command {
        Commands::Show { json } => show(container, *json),
        Commands::Add { parent, name, role } => {
            let id = service.add_node(parent, name, role.as_deref())?;
            output::action("Added", &id);
            Ok(())
        }
        Commands::Rename { id, name } => {
            let outcome = service.rename_node(id, name)?;
            report_outcome(outcome, &format!("{id} renamed to {name}"));
            Ok(())
        }
        Commands::Role { id, role } => {
            let outcome = service.set_role(id, role.as_deref())?;
            let msg = match role {
                Some(role) => format!("{id} is now {role}"),
                None => format!("role of {id} cleared"),
            };
            report_outcome(outcome, &msg);
            Ok(())
        }
        Commands::Delete { id } => {
            let removed = service.delete_node(id)?;
            output::action(
                "Deleted",
                &format!("{} ({} people)", removed.name, removed.count()),
            );
            if container.settings.pool.return_deleted {
                output::detail(&format!("{} moved to the unassigned list", removed.name));
            }
            Ok(())
        }
        Commands::Move { id, target, before } => {
            let drop_target = if *before {
                DropTarget::Before(target.as_str().into())
            } else {
                DropTarget::Child(target.as_str().into())
            };
            let outcome = service.move_node(id, &drop_target)?;
            let place = if *before { "before" } else { "under" };
            report_outcome(outcome, &format!("{id} moved {place} {target}"));
            Ok(())
        }
        Commands::Expand { id } => {
            match service.load_children(id).await? {
                LoadOutcome::Installed(n) => {
                    output::action("Loaded", &format!("{n} reports of {id}"))
                }
                LoadOutcome::Discarded => output::warning(&format!(
                    "reports of {id} changed meanwhile, fetched data dropped"
                )),
                LoadOutcome::AlreadyLoaded => {
                    output::info(&format!("reports of {id} already loaded"))
                }
                LoadOutcome::InFlight => output::info(&format!("reports of {id} are loading")),
            }
            Ok(())
        }
        Commands::Pool { command } => match command {
            PoolCommands::List => {
                let chart = service.snapshot()?;
                output::header("Unassigned");
                for person in chart.unassigned() {
                    output::detail(&format!("{} [{}]", person.name, person.id));
                }
                Ok(())
            }
            PoolCommands::Add { name } => {
                let id = service.add_unassigned(name)?;
                output::action("Added", &id);
                Ok(())
            }
        },
        Commands::Reset => {
            service.reset()?;
            output::success("chart reset to default");
            Ok(())
        }
        Commands::Config { .. } | Commands::Completion { .. } => Err(CliError::Usage(
            "command does not operate on the chart".to_string(),
        )),
    }
}

#[instrument(level = "debug", skip(container))]
fn show(container: &ServiceContainer, json: bool) -> CliResult<()> {
    let chart = container.org_chart.snapshot()?;

    if json {
        let text = serde_json::to_string_pretty(&chart.to_record()).map_err(|e| {
            ApplicationError::Serialization {
                context: "encode chart".to_string(),
                source: e,
            }
        })?;
        output::info(&text);
        return Ok(());
    }

    output::info(&chart.tree().to_term_tree());
    if !chart.unassigned().is_empty() {
        output::header("Unassigned");
        for person in chart.unassigned() {
            output::detail(&format!("{} [{}]", person.name, person.id));
        }
    }
    Ok(())
}

fn report_outcome(outcome: Outcome, msg: &str) {
    match outcome {
        Outcome::Changed => output::success(msg),
        Outcome::Unchanged => output::info("nothing to change"),
    }
}

fn execute_config(command: &ConfigCommands, settings: &Settings) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            output::info(&settings.to_toml()?);
            Ok(())
        }
        ConfigCommands::Path => {
            match global_config_path() {
                Some(path) => {
                    let state = if path.exists() { "" } else { " (not found)" };
                    output::action("Global", &format!("{}{}", path.display(), state));
                }
                None => output::warning("no config directory on this platform"),
            }
            output::action("Record", &settings.record_path().display());
            Ok(())
        }
        ConfigCommands::Init { global } => {
            if !*global {
                output::info(&Settings::template());
                return Ok(());
            }
            let path = global_config_path().ok_or_else(|| {
                CliError::Usage("no config directory on this platform".to_string())
            })?;
            let fs = RealFileSystem;
            if fs.exists(&path) {
                return Err(CliError::Usage(format!(
                    "config already exists: {}",
                    path.display()
                )));
            }
            debug!("writing config template to {}", path.display());
            fs.ensure_parent(&path)
                .and_then(|()| fs.write(&path, &Settings::template()))
                .map_err(|e| InfraError::io(format!("write {}", path.display()), e))?;
            output::action("Created", &path.display());
            Ok(())
        }
    }
}
