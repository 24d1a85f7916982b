//! AgentAccess CLI: entry point.

use std::path::PathBuf;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use agent_access::{
    BatchUnit, CancelToken, ComparisonAnalyzer, Engine, ProfileRegistry, RuleRegistry, Task,
    TaskCatalog,
};
use agent_access_cli::config::{build_renderer, read_url_list, resolve_engine_config};
use agent_access_cli::output;
use agent_access_cli::{EngineOverrides, RendererKind};

#[derive(Parser)]
#[command(
    name = "agent-access",
    about = "Score how accessible a web page is to automated agents of differing capability",
    version
)]
struct Cli {
    /// Print results as JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    /// Rendering backend.
    #[arg(long, value_enum, default_value_t = RendererKind::Http, global = true)]
    renderer: RendererKind,

    /// Evaluate a saved HTML file instead of fetching each URL.
    #[arg(long, global = true)]
    html: Option<PathBuf>,

    /// Hard per-pipeline timeout in milliseconds.
    /// Also reads AGENT_ACCESS_TIMEOUT_MS.
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Ceiling on the post-load settle wait in milliseconds.
    /// Also reads AGENT_ACCESS_SETTLE_CEILING_MS.
    #[arg(long, global = true)]
    settle_ceiling_ms: Option<u64>,

    /// Overall score (0-100) a report needs to pass.
    /// Also reads AGENT_ACCESS_PASS_THRESHOLD.
    #[arg(long, global = true)]
    threshold: Option<u8>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate one URL under one capability profile.
    Evaluate {
        url: String,

        /// Capability profile id.
        #[arg(short, long, default_value = "basic")]
        profile: String,

        /// Run task probes: all of them with no value, or a comma-separated list.
        #[arg(long, value_delimiter = ',', num_args = 0..)]
        tasks: Option<Vec<String>>,
    },

    /// Evaluate one URL under several profiles and compare the outcomes.
    Compare {
        url: String,

        /// Comma-separated profile ids.
        #[arg(long, value_delimiter = ',', default_value = "basic,intermediate,advanced,crawler")]
        profiles: Vec<String>,

        /// Comma-separated task names (default: every task).
        #[arg(long, value_delimiter = ',')]
        tasks: Option<Vec<String>>,
    },

    /// Evaluate many URLs in parallel. Ctrl-C stops issuing new pipelines.
    Batch {
        urls: Vec<String>,

        /// Read additional URLs from a file, one per line.
        #[arg(long)]
        from_file: Option<PathBuf>,

        /// Comma-separated profile ids; every URL runs under each.
        #[arg(short, long, value_delimiter = ',', default_value = "basic")]
        profile: Vec<String>,

        /// Pipelines in flight at once.
        /// Also reads AGENT_ACCESS_CONCURRENCY.
        #[arg(long)]
        concurrency: Option<usize>,

        /// Run task probes: all of them with no value, or a comma-separated list.
        #[arg(long, value_delimiter = ',', num_args = 0..)]
        tasks: Option<Vec<String>>,
    },

    /// List capability profiles.
    Profiles,

    /// List rule checks and their weights.
    Rules,

    /// List task probes.
    Tasks,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   agent-access completions bash > ~/.local/share/bash-completion/completions/agent-access
    ///   agent-access completions zsh > ~/.zfunc/_agent-access
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

/// Resolve `--tasks`: `None` runs nothing, an empty list runs every task.
fn select_tasks(catalog: &TaskCatalog, names: Option<&[String]>) -> anyhow::Result<Vec<Task>> {
    match names {
        None => Ok(Vec::new()),
        Some([]) => Ok(catalog.tasks().to_vec()),
        Some(names) => {
            let names: Vec<&str> = names.iter().map(String::as_str).collect();
            Ok(catalog.select(&names)?)
        }
    }
}

impl Cli {
    fn overrides(&self, concurrency: Option<usize>) -> EngineOverrides {
        EngineOverrides {
            timeout_ms: self.timeout_ms,
            settle_ceiling_ms: self.settle_ceiling_ms,
            threshold: self.threshold,
            concurrency,
        }
    }

    async fn engine(&self, urls: &[String], concurrency: Option<usize>) -> anyhow::Result<Engine> {
        let config = resolve_engine_config(&self.overrides(concurrency))?;
        let renderer = build_renderer(self.renderer, self.html.as_deref(), urls, &config).await?;
        tracing::debug!("renderer: {}", renderer.name());
        Ok(Engine::new(renderer, config)?)
    }

    fn print<T: serde::Serialize>(
        &self,
        value: &T,
        text: impl FnOnce(&T) -> String,
    ) -> anyhow::Result<()> {
        if self.json {
            println!("{}", output::to_json(value)?);
        } else {
            print!("{}", text(value));
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let catalog = TaskCatalog::standard()?;

    match &cli.command {
        Commands::Evaluate {
            url,
            profile,
            tasks,
        } => {
            let tasks = select_tasks(&catalog, tasks.as_deref())?;
            let engine = cli.engine(std::slice::from_ref(url), None).await?;
            let outcome = engine
                .evaluate(url, profile, &tasks)
                .await
                .with_context(|| format!("cannot evaluate {url}"))?;
            cli.print(&outcome, output::format_outcome)?;
        }

        Commands::Compare {
            url,
            profiles,
            tasks,
        } => {
            let tasks = match tasks {
                Some(names) if !names.is_empty() => {
                    select_tasks(&catalog, Some(names.as_slice()))?
                }
                _ => catalog.tasks().to_vec(),
            };
            let engine = cli.engine(std::slice::from_ref(url), None).await?;
            let ids: Vec<&str> = profiles.iter().map(String::as_str).collect();
            let comparison = ComparisonAnalyzer::new(engine)
                .compare(url, &ids, &tasks)
                .await
                .with_context(|| format!("cannot compare {url}"))?;
            cli.print(&comparison, output::format_comparison)?;
        }

        Commands::Batch {
            urls,
            from_file,
            profile,
            concurrency,
            tasks,
        } => {
            let mut all_urls = urls.clone();
            if let Some(path) = from_file {
                all_urls.extend(read_url_list(path)?);
            }
            if all_urls.is_empty() {
                anyhow::bail!("no URLs given; pass them as arguments or with --from-file");
            }

            let tasks = select_tasks(&catalog, tasks.as_deref())?;
            let engine = cli.engine(&all_urls, *concurrency).await?;
            let units: Vec<BatchUnit> = all_urls
                .iter()
                .flat_map(|u| profile.iter().map(move |p| BatchUnit::new(u.as_str(), p.as_str())))
                .collect();

            let cancel = CancelToken::new();
            let on_signal = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("interrupt received; finishing in-flight pipelines");
                    on_signal.cancel();
                }
            });

            let limit = engine.config().concurrency;
            let batch = engine.run_batch(&units, &tasks, limit, &cancel).await;
            cli.print(&batch, output::format_batch)?;
        }

        Commands::Profiles => {
            let profiles = ProfileRegistry::standard();
            if cli.json {
                let list: Vec<_> = profiles.iter().collect();
                println!("{}", output::to_json(&list)?);
            } else {
                print!("{}", output::format_profiles(&profiles));
            }
        }

        Commands::Rules => {
            let rules = RuleRegistry::standard();
            if cli.json {
                let list: Vec<_> = rules
                    .iter()
                    .map(|wc| {
                        serde_json::json!({
                            "requirementId": wc.check.requirement_id(),
                            "name": wc.check.name(),
                            "weight": wc.weight,
                            "description": wc.check.description(),
                        })
                    })
                    .collect();
                println!("{}", output::to_json(&list)?);
            } else {
                print!("{}", output::format_rules(&rules));
            }
        }

        Commands::Tasks => {
            if cli.json {
                let list: Vec<_> = catalog
                    .iter()
                    .map(|t| {
                        serde_json::json!({
                            "name": t.name,
                            "description": t.description,
                            "selectors": t.selectors,
                            "textPatterns": t
                                .text_patterns
                                .iter()
                                .map(|p| p.as_str())
                                .collect::<Vec<_>>(),
                        })
                    })
                    .collect();
                println!("{}", output::to_json(&list)?);
            } else {
                print!("{}", output::format_tasks(&catalog));
            }
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(*shell, &mut cmd, "agent-access", &mut std::io::stdout());
        }
    }

    Ok(())
}
