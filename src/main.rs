use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use modelops::facade::{POLYGON_TABLE, Workspace};
use modelops::import::{ImportFolders, ImportPlan, JsonRowsImporter};
use modelops::jobs::{CommandRunner, JobOrchestrator, LocalAgent};
use modelops::rows::RecordingExecutor;
use modelops::{ObjectId, ObjectKind, PipelineConfig, report, telemetry};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_CONFIG_FILE: &str = "pipeline_config.json";

#[derive(Parser)]
#[command(name = "modelops")]
#[command(about = "Maintenance workflows for a model database snapshot")]
struct Cli {
    /// Pipeline config (defaults to ./pipeline_config.json when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Model snapshot, overriding the config's model_path
    #[arg(long, global = true)]
    model: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List objects with their paths
    List {
        /// Kind code (MODG, NNET, RUN, SIM, GEOM); all kinds when omitted
        #[arg(long)]
        kind: Option<String>,
    },
    EnsureGroup {
        name: String,
    },
    /// Copy a network into a group, renaming on collision
    CopyNetwork {
        #[arg(long)]
        source_group: Option<String>,
        #[arg(long)]
        network: Option<String>,
        #[arg(long)]
        dest_group: Option<String>,
    },
    /// Create a run shaped like an existing one
    CreateRun {
        source_group: String,
        source_run: String,
        #[arg(long)]
        dest_group: Option<String>,
        #[arg(long)]
        name: Option<String>,
    },
    /// Insert a square test polygon anchored on the network's first node
    InsertPolygon {
        group: String,
        network: String,
        #[arg(long, default_value = "cluster_test_1")]
        polygon_id: String,
        #[arg(long, default_value_t = 20.0)]
        half_size: f64,
    },
    DeleteRows {
        group: String,
        network: String,
        #[arg(long, default_value = POLYGON_TABLE)]
        table: String,
    },
    /// Run an import plan of pre-converted JSON row sources
    Import {
        group: String,
        network: String,
        plan: PathBuf,
        #[arg(long)]
        shp: PathBuf,
        #[arg(long)]
        csv: PathBuf,
        #[arg(long)]
        cfg: PathBuf,
        /// Write the import report here as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Run every simulation of a run with the configured simulator command
    LaunchRun {
        run_id: u64,
        /// Overrides job_timeout_secs
        #[arg(long)]
        timeout_secs: Option<u64>,
        /// Write per-sim statuses here as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Copy the source network into the clusters group and, when a source run
    /// is given, create and launch a run for it (requires run_simulations)
    Pipeline {
        #[arg(long)]
        source_run: Option<String>,
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

fn load_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            PipelineConfig::load(Path::new(DEFAULT_CONFIG_FILE))?
        }
        None => PipelineConfig::default(),
    };
    if let Some(model) = &cli.model {
        config.model_path = model.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init();
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let workspace = Workspace::open(config, Arc::new(RecordingExecutor::new()))
        .context("opening model snapshot")?;

    match cli.command {
        Command::List { kind } => list(&workspace, kind.as_deref()).await,
        Command::EnsureGroup { name } => {
            let group = workspace.store().ensure_group(&name).await?;
            println!("{} (ID {})", group.name, group.id);
            Ok(())
        }
        Command::CopyNetwork {
            source_group,
            network,
            dest_group,
        } => {
            let config = workspace.config();
            let copy = workspace
                .copy_network_to_group(
                    source_group.as_deref().unwrap_or(&config.source_group_name),
                    network.as_deref().unwrap_or(&config.source_network_name),
                    dest_group.as_deref().unwrap_or(&config.clusters_group_name),
                )
                .await?;
            println!("{} (ID {})", workspace.store().path_of(&copy).await?, copy.id);
            Ok(())
        }
        Command::CreateRun {
            source_group,
            source_run,
            dest_group,
            name,
        } => {
            let dest_group = dest_group.unwrap_or_else(|| workspace.config().clusters_group_name.clone());
            let run = workspace
                .create_run_from(&source_group, &source_run, &dest_group, name.as_deref())
                .await?;
            println!("Created run '{}' (Run ID {})", run.name, run.id);
            Ok(())
        }
        Command::InsertPolygon {
            group,
            network,
            polygon_id,
            half_size,
        } => {
            let network = workspace.network_in_group(&group, &network).await?;
            let row = workspace
                .insert_anchored_square(&network, &polygon_id, half_size)
                .await?;
            println!("Inserted polygon '{}' ({})", polygon_id, row.id);
            Ok(())
        }
        Command::DeleteRows {
            group,
            network,
            table,
        } => {
            let network = workspace.network_in_group(&group, &network).await?;
            let deleted = workspace.delete_rows(&network, &table).await?;
            println!("Deleted {} rows from {}", deleted, table);
            Ok(())
        }
        Command::Import {
            group,
            network,
            plan,
            shp,
            csv,
            cfg,
            report: report_path,
        } => {
            let target = workspace.network_in_group(&group, &network).await?;
            let plan = ImportPlan::load(&plan)?.resolve(&ImportFolders { shp, csv, cfg })?;
            let runner = workspace.import_runner(Arc::new(JsonRowsImporter));
            let outcome = runner.run_plan(&plan.steps, &target).await?;

            for step in &outcome.succeeded {
                println!("   imported {}", step);
            }
            for failed in &outcome.failed {
                println!("   FAILED {}: {}", failed.step, failed.error);
            }
            if let Some(path) = report_path {
                report::write_json(&path, &outcome)?;
            }
            if !outcome.is_clean() {
                bail!("{} of {} import steps failed", outcome.failed.len(), outcome.total());
            }
            Ok(())
        }
        Command::LaunchRun {
            run_id,
            timeout_secs,
            report: report_path,
        } => {
            let jobs = orchestrator(&workspace).await?;
            let timeout = timeout_secs
                .map(Duration::from_secs)
                .unwrap_or_else(|| workspace.config().job_timeout_duration());
            let result = workspace.launch_run(ObjectId(run_id), &jobs, timeout).await?;

            for (sim_id, status) in &result.per_job {
                println!("   sim {}: {}", sim_id.as_u64(), status);
            }
            if let Some(path) = report_path {
                report::write_json(&path, &result)?;
            }
            if !result.all_succeeded {
                bail!("run {} did not fully succeed", run_id);
            }
            Ok(())
        }
        Command::Pipeline {
            source_run,
            report: report_path,
        } => {
            let jobs = if workspace.config().simulator_command.is_empty() {
                None
            } else {
                Some(orchestrator(&workspace).await?)
            };
            let setup = workspace
                .prepare_clusters(source_run.as_deref(), jobs.as_ref())
                .await?;

            if let Some(network) = &setup.network {
                println!("Network: {}", workspace.store().path_of(network).await?);
            }
            if let Some(run) = &setup.run {
                println!("Run: '{}' (Run ID {})", run.name, run.id.as_u64());
            }
            if let Some(path) = report_path {
                report::write_json(&path, &setup)?;
            }
            match &setup.jobs {
                Some(result) if !result.all_succeeded => bail!("cluster run did not fully succeed"),
                _ => Ok(()),
            }
        }
    }
}

async fn orchestrator(workspace: &Workspace) -> Result<JobOrchestrator> {
    let runner = CommandRunner::from_command_line(&workspace.config().simulator_command)
        .context("simulator_command is not configured")?;
    let agent = Arc::new(LocalAgent::new(Arc::new(runner)));
    Ok(workspace.job_orchestrator(agent).await?)
}

async fn list(workspace: &Workspace, kind: Option<&str>) -> Result<()> {
    let kinds = match kind {
        Some(code) => match ObjectKind::from_code(code) {
            Some(kind) => vec![kind],
            None => bail!("unknown kind code '{}'", code),
        },
        None => ObjectKind::ALL.to_vec(),
    };

    for kind in kinds {
        for object in workspace.store().collection(kind).await? {
            println!(
                "{:>6}  {:<14} {}",
                object.id.as_u64(),
                kind.type_name(),
                workspace.store().path_of(&object).await?
            );
        }
    }
    Ok(())
}
