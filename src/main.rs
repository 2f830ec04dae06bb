//! mandelband CLI entry point

use anyhow::{Context, Result};
use log::info;
use mandelband::config::cli::{Cli, ExecutionMode};
use mandelband::config::{cli_convert, validator, Config};
use mandelband::coordinator::{render_samples, Assembled, RenderJob};
use mandelband::distributed::{self, DistributedCoordinator, NodeService};
use mandelband::fractal::color::SmoothGradient;
use mandelband::output::{json, ppm, text};
use mandelband::util::runtime::block_on_run;

fn main() -> Result<()> {
    let cli = Cli::parse_args();
    cli.validate()?;

    match cli.mode {
        ExecutionMode::Standalone => {
            let config = load_config(&cli)?;
            run_standalone(config)
        }
        ExecutionMode::Service => {
            init_logging(cli.debug);
            run_service(cli)
        }
        ExecutionMode::Coordinator => {
            let config = load_config(&cli)?;
            run_coordinator(&cli, config)
        }
    }
}

/// `info` by default, `debug` with --debug; RUST_LOG overrides both
fn init_logging(debug: bool) {
    let default_filter = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .init();
}

/// Merge the config file with the CLI, then start logging from the result
fn load_config(cli: &Cli) -> Result<Config> {
    let config = cli_convert::build_config(cli)?;
    init_logging(config.runtime.debug);
    Ok(config)
}

/// Run in standalone mode (all worker units in this process)
fn run_standalone(config: Config) -> Result<()> {
    validator::validate_config(&config).context("Configuration validation failed")?;

    text::print_configuration(&config, "standalone");
    if config.runtime.dry_run {
        println!();
        println!("Dry run mode - configuration validated successfully");
        return Ok(());
    }
    println!();

    let job = RenderJob::from_config(&config);
    let assembled = block_on_run(render_samples(&job))?;

    finish_run(&config, "standalone", assembled)
}

/// Run in service mode (worker node)
fn run_service(cli: Cli) -> Result<()> {
    block_on_run(async {
        let service = NodeService::bind(cli.listen.as_str(), cli.threads)
            .await
            .with_context(|| format!("Failed to start worker service on {}", cli.listen))?;

        service.run().await
    })
}

/// Run in coordinator mode (bands rendered by worker services)
fn run_coordinator(cli: &Cli, mut config: Config) -> Result<()> {
    let worker_addrs = if let Some(ref host_list) = cli.host_list {
        distributed::parse_host_list(host_list, cli.worker_port)
    } else if let Some(ref clients_file) = cli.clients_file {
        distributed::read_clients_file(clients_file, cli.worker_port)?
    } else {
        anyhow::bail!("Coordinator mode requires --host-list or --clients-file");
    };
    if worker_addrs.is_empty() {
        anyhow::bail!("Worker list is empty");
    }

    config.workers.count = worker_addrs.len();
    validator::validate_config(&config).context("Configuration validation failed")?;

    text::print_configuration(&config, "coordinator");
    println!("  Worker services:");
    for (worker_id, addr) in worker_addrs.iter().enumerate() {
        println!("    {}: {}", worker_id, addr);
    }
    let coordinator = DistributedCoordinator::new(RenderJob::from_config(&config), worker_addrs)
        .context("Configuration validation failed")?;
    if config.runtime.dry_run {
        println!();
        println!("Dry run mode - configuration validated successfully");
        return Ok(());
    }
    println!();

    let assembled = block_on_run(coordinator.run())?;

    finish_run(&config, "coordinator", assembled)
}

/// Color, write the image and report
fn finish_run(config: &Config, mode: &str, assembled: Assembled) -> Result<()> {
    let color_depth = u8::try_from(config.render.color_depth)
        .context("color_depth must fit in one byte")?;
    let policy = SmoothGradient::new(config.render.gradient, config.render.max_iteration, color_depth);

    let image = assembled.colorize(&policy);
    ppm::save_ppm(&config.output.path, &image, color_depth)?;
    info!("Wrote {} to {}", config.image, config.output.path.display());

    text::print_results(&assembled.summary, &config.output.path);

    if let Some(ref json_path) = config.output.json_output {
        let report = json::RenderReport::new(config, mode, &assembled.summary);
        json::write_json_output(json_path, &report)?;
        info!("Wrote JSON report to {}", json_path.display());
    }

    Ok(())
}
