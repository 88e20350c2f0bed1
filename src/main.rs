use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use git_release::cli::{report_setup_failure, PipelineOptions, ReleasePipeline};
use git_release::config::{self, Config, Secrets};
use git_release::git::{Git2Repository, Repository};
use git_release::hosting::{parse_repository_slug, GitHubHost, ReleaseHost, UnavailableHost};
use git_release::notify;
use git_release::reasoning::{DisabledReasoning, HttpReasoningService, ReasoningService};
use git_release::stages::CommandStageRunner;
use git_release::ui;

#[derive(clap::Parser)]
#[command(
    name = "git-release",
    version,
    about = "Gate, version, tag and publish releases from conventional commits"
)]
struct Args {
    #[arg(short, long, help = "Custom configuration file path")]
    config: Option<PathBuf>,

    #[arg(short, long, help = "Repository directory (overrides repository.path)")]
    repo: Option<PathBuf>,

    #[arg(long, help = "Decide and report without tagging, pushing or publishing")]
    dry_run: bool,

    #[arg(long, help = "Skip the build, lint and security stages")]
    skip_stages: bool,

    #[arg(short, long, help = "Enable debug logging")]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

fn hosting_slug(config: &Config, repo: &dyn Repository) -> Result<String> {
    if let Some(slug) = &config.hosting.repository {
        return Ok(slug.clone());
    }
    let url = repo
        .remote_url(&config.repository.remote)?
        .ok_or_else(|| anyhow!("Remote '{}' has no URL", config.repository.remote))?;
    parse_repository_slug(&url).ok_or_else(|| {
        anyhow!(
            "Cannot derive owner/name from '{}'; set hosting.repository in the config",
            url
        )
    })
}

/// Everything a run needs besides the notification sink
struct Collaborators {
    repo: Git2Repository,
    reasoning: Box<dyn ReasoningService>,
    host: Box<dyn ReleaseHost>,
}

fn setup(config: &Config, secrets: &Secrets, dry_run: bool) -> Result<Collaborators> {
    let repo = Git2Repository::open(&config.repository.path)
        .with_context(|| {
            format!(
                "Cannot open repository at {}",
                config.repository.path.display()
            )
        })?
        .with_token(secrets.hosting_token.clone());

    let reasoning: Box<dyn ReasoningService> = if config.reasoning.enabled {
        Box::new(
            HttpReasoningService::new(&config.reasoning, secrets.reasoning_api_key.clone())
                .context("Cannot set up the reasoning service")?,
        )
    } else {
        Box::new(DisabledReasoning)
    };

    let host: Box<dyn ReleaseHost> = match hosting_slug(config, &repo) {
        Ok(slug) => Box::new(
            GitHubHost::new(
                &config.hosting,
                slug,
                secrets.hosting_token.clone().unwrap_or_default(),
            )
            .context("Cannot set up the hosting client")?,
        ),
        Err(e) if dry_run => {
            warn!(error = %e, "hosting not configured; continuing dry run without it");
            Box::new(UnavailableHost::new(e.to_string()))
        }
        Err(e) => return Err(e),
    };

    Ok(Collaborators {
        repo,
        reasoning,
        host,
    })
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config =
        config::load_config(args.config.as_deref()).context("Error loading config")?;
    if let Some(path) = args.repo {
        config.repository.path = path;
    }
    let secrets = Secrets::from_env(&config);
    let options = PipelineOptions {
        dry_run: args.dry_run,
        skip_stages: args.skip_stages,
    };

    let (sink, sink_warning) = notify::sink_for(&config.notify, secrets.webhook_url.as_deref());

    let mut report = match setup(&config, &secrets, options.dry_run) {
        Ok(collaborators) => {
            let root = collaborators
                .repo
                .workdir()
                .unwrap_or_else(|| config.repository.path.clone());
            let stages = CommandStageRunner::new(root);

            ReleasePipeline {
                config: &config,
                secrets: &secrets,
                repo: &collaborators.repo,
                host: collaborators.host.as_ref(),
                reasoning: collaborators.reasoning.as_ref(),
                stages: &stages,
                sink: sink.as_ref(),
                options,
            }
            .run()
        }
        Err(e) => report_setup_failure(sink.as_ref(), format!("{:#}", e), options),
    };
    if let Some(warning) = sink_warning {
        report.warnings.push(warning.to_string());
    }

    ui::display_run_report(&report);

    let code = report.outcome.exit_code();
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
