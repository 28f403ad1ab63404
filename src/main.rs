use anyhow::{Context, Result};
use clap::Parser;
use colored::{Color, Colorize};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use devmate::cli::{Cli, Commands, UpArgs, VERSION_WITH_BUILD};
use devmate::core::dockerfile::{exposed_ports, host_ports, plan_port_mappings};
use devmate::core::git::{clone_repo, repo_name};
use devmate::core::health::project_health;
use devmate::core::http_health::{build_url, check_health};
use devmate::core::net::check_host_port;
use devmate::core::project::{
    detect_configuration, find_compose_file, resolve_project_dir, ConfigType, DOCKERFILE,
};
use devmate::core::report::REPORT_TITLE;
use devmate::core::tools::{locate, REQUIRED_TOOLS};
use devmate::core::{DockerManager, HealthReport, HealthStatus};
use devmate::utils::{
    default_container_name, default_image_name, join_location, logging, AppConfig, Cell, Table,
};
use devmate::DevmateError;

/// Retries for each published port after a Dockerfile container starts
const CONTAINER_HEALTH_RETRIES: u32 = 5;

/// Grace period before probing a freshly started container
const CONTAINER_STARTUP_WAIT: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.debug, cli.log_json);

    let config = AppConfig::load()?;
    debug!(?config, "Loaded configuration");

    match cli.command {
        Commands::Version => {
            println!("devmate {}", VERSION_WITH_BUILD);
        }
        Commands::About => {
            handle_about();
        }
        Commands::Init { verbose } => {
            handle_init(verbose, &config).await?;
        }
        Commands::Health {
            url,
            path,
            port,
            max_retries,
            timeout,
            delay,
        } => {
            let max_retries = max_retries.unwrap_or(config.health.max_retries);
            let timeout = timeout.map(Duration::from_secs).unwrap_or(config.health.timeout);
            let delay = delay.map(Duration::from_secs).unwrap_or(config.health.delay);
            handle_health(&url, port, &path, max_retries, timeout, delay).await?;
        }
        Commands::Clone { url, dir } => {
            handle_clone(&url, dir).await?;
        }
        Commands::Up(args) => {
            handle_up(args, &config).await?;
        }
        Commands::Deploy {
            repo_url,
            name,
            branch,
            ports,
            force,
            location,
        } => {
            handle_deploy(&repo_url, name, branch, ports, force, &location, &config).await?;
        }
        Commands::Logs {
            path,
            tail,
            follow,
            container,
        } => {
            handle_logs(&path, tail, follow, container, &config).await?;
        }
        Commands::Status { path, file, json } => {
            handle_status(&path, file.as_deref(), json, &config).await?;
        }
    }

    Ok(())
}

fn handle_about() {
    println!("{}", "devmate".bold());
    println!("Your friendly local development companion.\n");
    println!("Brings up Docker Compose and Dockerfile projects and reports the");
    println!("health of every service, whether its ports are published or not.");
    println!("\nVersion: {}", VERSION_WITH_BUILD);
}

async fn handle_init(verbose: bool, config: &AppConfig) -> Result<()> {
    println!("Checking required tools...\n");

    let mut installed = Table::new("Installed", &["Tool", "Location"]);
    let mut missing = Table::new("Missing", &["Tool", "How to install"]);

    for tool in REQUIRED_TOOLS {
        match locate(tool) {
            Some(path) => installed.add_row(vec![
                Cell::colored(tool.display_name, Color::Green),
                Cell::plain(path.display().to_string()),
            ]),
            None => missing.add_row(vec![
                Cell::colored(tool.display_name, Color::Red),
                Cell::plain(tool.install_hint),
            ]),
        }
    }

    if !installed.is_empty() {
        installed.print();
        println!();
    }

    if !missing.is_empty() {
        missing.print();
        println!();
    }

    if verbose {
        let daemon = match DockerManager::new(config.exec_timeout) {
            Ok(docker) => docker.check_docker().await,
            Err(e) => {
                debug!(error = %e, "Docker client could not be created");
                false
            }
        };
        if daemon {
            println!("{} Docker daemon is reachable", "✓".green());
        } else {
            println!("{} Docker daemon is not reachable", "✗".red());
        }

        match AppConfig::config_path() {
            Ok(path) => println!("Config file: {}", path.display()),
            Err(e) => println!("Config file: unavailable ({})", e),
        }
    }

    if missing.is_empty() {
        println!("{}", "All required tools are installed.".green());
    } else {
        println!("{}", "Some tools are missing. Install them and run init again.".yellow());
    }

    Ok(())
}

async fn handle_health(
    url: &str,
    port: Option<u16>,
    path: &str,
    max_retries: u32,
    timeout: Duration,
    delay: Duration,
) -> Result<()> {
    let target = build_url(url, port, path);

    let pb = ProgressBar::new(max_retries.max(1) as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner} {msg} [{bar:20}] {pos}/{len}")
            .context("Invalid progress bar template")?,
    );
    pb.enable_steady_tick(Duration::from_millis(120));

    let result = check_health(&target, max_retries, timeout, delay, Some(&pb)).await;
    pb.finish_and_clear();

    println!("{}", serde_json::to_string_pretty(&result)?);

    if result.success {
        println!("{} {}", "✓".green(), target);
    } else {
        println!("{} {}", "✗".red(), target);
    }

    Ok(())
}

async fn handle_clone(url: &str, dir: Option<PathBuf>) -> Result<()> {
    let dir = match dir {
        Some(dir) => dir,
        None => PathBuf::from(repo_name(url)?),
    };

    println!("Cloning {} into {}...", url, dir.display());
    clone_repo(url, &dir, None).await?;
    println!("{} Repository cloned to {}", "✓".green(), dir.display());

    Ok(())
}

async fn handle_up(args: UpArgs, config: &AppConfig) -> Result<()> {
    let dir = resolve_project_dir(&args.path)?;

    // An explicit compose file name wins over detection
    let config_type = match args.file {
        Some(_) => ConfigType::Compose,
        None => detect_configuration(&dir)?,
    };

    match config_type {
        ConfigType::Compose => {
            let compose_file = find_compose_file(&dir, args.file.as_deref())?;
            let pull = args.pull.unwrap_or(config.pull);
            let docker = DockerManager::new(config.exec_timeout)?;

            info!(dir = %dir.display(), file = %compose_file.display(), %pull, "Bringing up compose project");
            println!("Starting services from {}...", compose_file.display());
            docker.compose_up(&dir, &compose_file, pull, args.force).await?;
            println!("{} Services started\n", "✓".green());

            let report = project_health(&docker, &dir, &compose_file, config.probe_timeout).await?;
            print_health_report(&report);
        }
        ConfigType::Dockerfile => {
            up_dockerfile(&dir, &args.ports, args.force, config).await?;
        }
        ConfigType::None => {
            return Err(DevmateError::ConfigurationAbsent(dir).into());
        }
    }

    Ok(())
}

async fn up_dockerfile(dir: &Path, ports: &[String], force: bool, config: &AppConfig) -> Result<()> {
    let dockerfile = dir.join(DOCKERFILE);
    if !dockerfile.exists() {
        return Err(DevmateError::DockerfileMissing(dir.to_path_buf()).into());
    }

    let exposed = exposed_ports(&dockerfile)?;
    let plan = plan_port_mappings(&exposed, ports);

    for warning in &plan.warnings {
        println!("{} {}", "Warning:".yellow(), warning);
    }
    if !plan.added.is_empty() {
        println!("Mapping exposed ports: {}", plan.added.join(", "));
    } else if ports.is_empty() && !plan.mappings.is_empty() {
        println!("Auto-mapping exposed ports: {}", plan.mappings.join(", "));
    }

    let docker = DockerManager::new(config.exec_timeout)?;
    let image = default_image_name(dir);
    let name = default_container_name(&image);

    println!("Building image {}...", image);
    docker.build_image(dir, &image).await?;

    if docker.container_exists(&name).await? {
        if !force {
            return Err(DevmateError::ContainerExists(name).into());
        }
        println!("Removing existing container {}...", name);
        docker.remove_container(&name).await?;
    }

    println!("Starting container {}...", name);
    let id = docker.run_container(&image, &name, &plan.mappings).await?;
    info!(container = %name, id = %id, "Container started");
    println!("{} Container {} started\n", "✓".green(), name);

    let published = host_ports(&plan.mappings);
    if published.is_empty() {
        println!("No ports published, skipping health checks.");
        return Ok(());
    }

    tokio::time::sleep(CONTAINER_STARTUP_WAIT).await;

    let mut table = Table::new("Container Health Report", &["Port", "Status", "Message"]);
    for port in published {
        let url = format!("http://localhost:{}", port);
        let result = check_health(
            &url,
            CONTAINER_HEALTH_RETRIES,
            config.health.timeout,
            config.health.delay,
            None,
        )
        .await;

        let (status, color, message) = if result.success {
            ("UP", Color::Green, result.message)
        } else if check_host_port("localhost", port, config.probe_timeout).await {
            ("UP (TCP)", Color::Green, format!("Port open, HTTP check failed: {}", result.message))
        } else {
            ("DOWN", Color::Red, result.message)
        };

        table.add_row(vec![
            Cell::plain(port.to_string()),
            Cell::colored(status, color),
            Cell::plain(message),
        ]);
    }
    table.print();

    Ok(())
}

async fn handle_deploy(
    repo_url: &str,
    name: Option<String>,
    branch: Option<String>,
    ports: Vec<String>,
    force: bool,
    location: &Path,
    config: &AppConfig,
) -> Result<()> {
    let folder = match name {
        Some(name) => name,
        None => repo_name(repo_url)?,
    };
    let clone_dir = std::env::current_dir()
        .context("Failed to read current directory")?
        .join(folder);

    println!("Cloning {} into {}...", repo_url, clone_dir.display());
    clone_repo(repo_url, &clone_dir, branch.as_deref()).await?;
    println!("{} Repository cloned\n", "✓".green());

    let args = UpArgs {
        path: join_location(&clone_dir, location),
        file: None,
        ports,
        pull: None,
        force,
    };
    handle_up(args, config).await
}

async fn handle_logs(
    path: &Path,
    tail: usize,
    follow: bool,
    container: Option<String>,
    config: &AppConfig,
) -> Result<()> {
    let docker = DockerManager::new(config.exec_timeout)?;

    if let Some(container) = container {
        return docker.container_logs(&container, tail, follow).await;
    }

    let dir = resolve_project_dir(path)?;
    match detect_configuration(&dir)? {
        ConfigType::Compose => docker.compose_logs(&dir, tail, follow).await,
        ConfigType::Dockerfile => {
            let name = default_container_name(&default_image_name(&dir));
            docker.container_logs(&name, tail, follow).await
        }
        ConfigType::None => Err(DevmateError::ConfigurationAbsent(dir).into()),
    }
}

async fn handle_status(path: &Path, file: Option<&str>, json: bool, config: &AppConfig) -> Result<()> {
    let dir = resolve_project_dir(path)?;
    let compose_file = find_compose_file(&dir, file)?;
    let docker = DockerManager::new(config.exec_timeout)?;

    let report = project_health(&docker, &dir, &compose_file, config.probe_timeout).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_health_report(&report);
    }

    Ok(())
}

fn status_color(status: HealthStatus) -> Color {
    match status {
        HealthStatus::Up => Color::Green,
        HealthStatus::Skipped => Color::Yellow,
        HealthStatus::Down | HealthStatus::Unknown => Color::Red,
    }
}

fn print_health_report(report: &HealthReport) {
    if report.is_empty() {
        println!("No services defined.");
        return;
    }

    let mut table = Table::new(REPORT_TITLE, &["Service", "Type", "Status", "Details"]);
    for entry in &report.entries {
        table.add_row(vec![
            Cell::plain(entry.name.as_str()),
            Cell::plain(entry.strategy.as_str()),
            Cell::colored(entry.status.as_str(), status_color(entry.status)),
            Cell::plain(entry.details.as_str()),
        ]);
    }
    table.print();

    println!(
        "\n{} up, {} down, {} unknown, {} skipped (checked at {})",
        report.count(HealthStatus::Up),
        report.count(HealthStatus::Down),
        report.count(HealthStatus::Unknown),
        report.count(HealthStatus::Skipped),
        report.generated_at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S"),
    );

    if report.all_up() {
        println!("{}", "All services are up.".green());
    }
}
