use clap::{Parser, Subcommand};
use env_logger::{Builder, Target};
use image_profiles::cache::ProfileCache;
use image_profiles::config::{self, ProfilesConfig};
use image_profiles::fetch::{FetchError, HttpFetcher};
use image_profiles::imaging::FilterRegistry;
use image_profiles::output;
use image_profiles::resolver::{ImageProfileManager, Resolution};
use image_profiles::storage::FileSystemStorage;
use image_profiles::types::{ContentItem, FilterRecord};
use log::{LevelFilter, info, warn};
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "image-profiles")]
#[command(about = "Resolve image profile URLs, processing images on demand")]
#[command(long_about = "\
Resolve image profile URLs, processing images on demand

A profile is an ordered list of filters (resize, crop, format conversion)
applied to a source image. Resolving a source through a profile returns the
public URL of the processed image, running the filters only when no fresh
output exists yet.

Storage layout:

  .image-profiles-cache.json       # Filename cache (safe to delete)
  media/                           # storage.root, served at storage.public_url
  ├── img/photo.jpg                # Source image
  └── _Profiles/                   # storage.profiles_folder
      └── <profile hash>/
          └── <filter chain hash>/
              └── <source folder hash>/
                  └── photo.jpg    # Processed output

Sources can be public storage URLs (/media/img/photo.jpg), absolute http(s)
URLs, or app-relative paths (~/img/photo.jpg) resolved against
remote.base_url.

Run 'image-profiles gen-config' to generate a documented image-profiles.toml.")]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = config::CONFIG_FILE_NAME, global = true)]
    config: PathBuf,

    /// Log cache decisions and pipeline steps
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve source paths through a profile
    Resolve {
        /// Source paths or URLs
        #[arg(required = true)]
        paths: Vec<String>,

        /// Profile name (namespaces the output when --filter is given)
        #[arg(long)]
        profile: String,

        /// Filter to run instead of the profile's filters, in order
        #[arg(long = "filter", value_name = "CATEGORY/TYPE[:STATE]")]
        filters: Vec<FilterRecord>,

        /// Content item the sources belong to, as JSON
        #[arg(long)]
        content: Option<String>,
    },
    /// List configured profiles and available filters
    Profiles,
    /// Delete all outputs of a profile
    Purge {
        /// Profile name
        name: String,
    },
    /// Print a stock image-profiles.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    match cli.command {
        Command::Resolve {
            paths,
            profile,
            filters,
            content,
        } => {
            let config = config::load_config(&cli.config)?;
            let content = content
                .as_deref()
                .map(serde_json::from_str::<ContentItem>)
                .transpose()?;
            let filters: Vec<FilterRecord> = filters
                .into_iter()
                .enumerate()
                .map(|(i, mut f)| {
                    f.position = i as i32;
                    f
                })
                .collect();

            init_thread_pool(&config.processing);
            let manifest_path = config.manifest_path();
            let cache = Arc::new(ProfileCache::load(&manifest_path));
            let manager = build_manager(&config, cache.clone())?;

            let results: Vec<(String, Resolution)> = paths
                .par_iter()
                .map(|path| {
                    let resolution =
                        manager.get_image_profile_url(path, &profile, content.as_ref(), &filters);
                    (path.clone(), resolution)
                })
                .collect();

            cache.save(&manifest_path)?;
            output::print_resolutions(&results, manager.stats());
        }
        Command::Profiles => {
            let config = config::load_config(&cli.config)?;
            output::print_profiles(&config.to_profile_store(), &FilterRegistry::with_builtin());
        }
        Command::Purge { name } => {
            let config = config::load_config(&cli.config)?;
            if !config.profiles.contains_key(&name) {
                warn!("Profile {} is not configured; purging its folder anyway", name);
            }
            let manifest_path = config.manifest_path();
            let cache = Arc::new(ProfileCache::load(&manifest_path));
            let manager = build_manager(&config, cache.clone())?;
            let removed = manager.purge_profile(&name)?;
            cache.save(&manifest_path)?;
            println!("{}", output::format_purge(&name, removed));
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// `RUST_LOG` overrides the level chosen by `--verbose`.
fn init_logger(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    Builder::new()
        .filter(None, level)
        .filter(Some("reqwest"), LevelFilter::Warn)
        .parse_default_env()
        .format_timestamp(None)
        .target(Target::Stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
    info!("Using {} worker thread(s)", threads);
}

fn build_manager(
    config: &ProfilesConfig,
    cache: Arc<ProfileCache>,
) -> Result<ImageProfileManager, FetchError> {
    let storage = Arc::new(FileSystemStorage::new(
        &config.storage.root,
        &config.storage.public_url,
    ));
    let fetcher = HttpFetcher::new(config.remote.timeout())?;
    let mut manager =
        ImageProfileManager::new(storage, cache, Arc::new(config.to_profile_store()))
            .with_fetcher(fetcher)
            .with_profiles_folder(&config.storage.profiles_folder);
    if let Some(base_url) = config.base_url() {
        manager = manager.with_base_url(base_url);
    }
    Ok(manager)
}
