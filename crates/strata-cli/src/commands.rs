use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use strata_commits::{CommitService, InMemoryCommitService};
use strata_fileset::Storage;
use strata_gateway::{BucketRole, GatewayConfig, GatewayServer, WorkerDriver};
use strata_store::InMemoryChunkStore;

use crate::cli::*;
use crate::seed::{apply_seeds, parse_seeds, SeedConfig};

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args),
        Command::CheckConfig(args) => cmd_check_config(args),
    }
}

fn load(path: &Path) -> anyhow::Result<(GatewayConfig, Vec<SeedConfig>)> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let config = GatewayConfig::from_toml_str(&contents)
        .with_context(|| format!("loading {}", path.display()))?;
    let seeds = parse_seeds(&contents)?;
    Ok((config, seeds))
}

/// An in-memory commit service with the seeds applied, and a driver over it.
fn build_driver(config: &GatewayConfig, seeds: &[SeedConfig]) -> anyhow::Result<WorkerDriver> {
    let storage = Storage::new(Arc::new(InMemoryChunkStore::new()), config.chunking);
    let service: Arc<dyn CommitService> = Arc::new(InMemoryCommitService::new(storage));
    apply_seeds(service.as_ref(), seeds)?;
    let driver = WorkerDriver::from_config(service, config).context("binding buckets")?;
    Ok(driver)
}

fn cmd_check_config(args: CheckConfigArgs) -> anyhow::Result<()> {
    let (config, seeds) = load(&args.config)?;
    println!("{} {} is valid", "✓".green().bold(), args.config.display());
    println!("  Listen: {}", config.bind_addr.to_string().bold());
    println!(
        "  Chunking: {} / {} / {} bytes",
        config.chunking.min_size, config.chunking.avg_size, config.chunking.max_size
    );

    let driver = build_driver(&config, &seeds)?;
    for bucket in driver.list_buckets() {
        let role = match bucket.role {
            BucketRole::Input => "input".cyan(),
            BucketRole::Output => "output".yellow(),
        };
        println!(
            "  {} {} -> {}@{}",
            role,
            bucket.name.bold(),
            bucket.repo,
            bucket.commit.short_id().dimmed()
        );
    }
    if !seeds.is_empty() {
        println!("  Seeds: {}", seeds.len());
    }
    Ok(())
}

fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let (mut config, seeds) = load(&args.config)?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    let driver = build_driver(&config, &seeds)?;
    println!(
        "Strata gateway on {} ({} buckets)",
        config.bind_addr.to_string().bold(),
        driver.list_buckets().len()
    );

    let runtime = tokio::runtime::Runtime::new().context("starting runtime")?;
    runtime.block_on(async move {
        let server = GatewayServer::new(config, driver);
        server
            .serve_with_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use strata_fileset::CancellationToken;

    const CONFIG: &str = r#"
[chunking]
min_size = 64
avg_size = 256
max_size = 1024

[[inputs]]
name = "in1"
repo = "inputs"
commit = "master"

[output]
name = "out"
repo = "outputs"
commit = "master"

[[seed]]
repo = "inputs"
files = { "file" = "foo" }

[[seed]]
repo = "outputs"
finish = false
"#;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn load_and_bind_seeded_buckets() {
        let file = write_config(CONFIG);
        let (config, seeds) = load(file.path()).unwrap();
        assert_eq!(seeds.len(), 2);
        let driver = build_driver(&config, &seeds).unwrap();

        let info = driver
            .stat_object("in1", "file", &CancellationToken::new())
            .unwrap();
        assert_eq!(info.size, 3);
        assert!(driver.bucket("out").unwrap().is_output());
    }

    #[test]
    fn check_config_command() {
        let file = write_config(CONFIG);
        cmd_check_config(CheckConfigArgs {
            config: file.path().to_path_buf(),
        })
        .unwrap();
    }

    #[test]
    fn unbound_bucket_fails_check() {
        let file = write_config("[[inputs]]\nname = \"in1\"\nrepo = \"missing\"\ncommit = \"master\"\n");
        let err = cmd_check_config(CheckConfigArgs {
            config: file.path().to_path_buf(),
        })
        .unwrap_err();
        assert!(format!("{err:#}").contains("missing"));
    }

    #[test]
    fn missing_file() {
        assert!(load(Path::new("/nonexistent/strata.toml")).is_err());
    }
}
