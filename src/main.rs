use std::path::Path;
use std::process::ExitCode;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tracing::info;

use folio::config::Config;
use folio::format::format_bytes;
use folio::preview::{PreviewContent, PreviewDispatcher, PreviewState};
use folio::processing::{run_action, ProcessingAction};
use folio::store::{HttpStore, ProgressFn, SharedStore, UploadProgress};
use folio::tree::find_by_path;
use folio::{Explorer, FolioError, NotificationCenter, Result, StagingList, TreeSynchronizer, UploadPipeline};

const USAGE: &str = "usage: folio <command>

commands:
  tree                      print the whole tree
  usage                     print storage usage
  search <query>            search files by name
  mkdir <parent> <name>     create a folder
  rm <id>                   delete a file or folder
  upload <dest> <paths...>  upload files and directories
  preview <path>            preview a file
  process <path> <job>      run a processing job (createorg, ingestes, ingestbar)";

#[tokio::main]
async fn main() -> ExitCode {
    // Load configuration
    let config = match Config::load_with_env("folio.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load folio.toml: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = folio::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        folio::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = config.validate() {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        eprintln!("{USAGE}");
        return ExitCode::FAILURE;
    }

    match run(&config, &args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(FolioError::Validation(msg)) if msg == USAGE => {
            eprintln!("{USAGE}");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("{}", e.user_message(&e.to_string()));
            ExitCode::FAILURE
        }
    }
}

fn usage_error() -> FolioError {
    FolioError::Validation(USAGE.to_string())
}

async fn run(config: &Config, args: &[String]) -> Result<()> {
    let store: SharedStore = Arc::new(HttpStore::new(&config.store)?);
    let notifications = NotificationCenter::new();
    let sync = Arc::new(TreeSynchronizer::new(store.clone(), notifications.clone()));
    info!(base_url = %config.store.base_url, command = %args[0], "folio starting");

    match (args[0].as_str(), &args[1..]) {
        ("tree", []) => {
            let mut explorer = Explorer::new(sync);
            explorer.refresh().await?;
            explorer.expand_all();
            for row in explorer.visible_rows() {
                println!("{row}");
            }
        }
        ("usage", []) => {
            let usage = sync.storage_usage().await?;
            let size = format_bytes(usage.total_size);
            println!(
                "{} in {} file(s)",
                if size.is_empty() { "0 B".to_string() } else { size },
                usage.file_count
            );
        }
        ("search", [query]) => {
            for record in sync.search(query).await? {
                println!("{}\t{}/{}", record.id, record.folder_path.trim_end_matches('/'), record.original_filename);
            }
        }
        ("mkdir", [parent, name]) => sync.create_folder(parent, name).await?,
        ("rm", [id]) => sync.delete_one(id).await?,
        ("upload", [dest, paths @ ..]) if !paths.is_empty() => {
            let mut staging = StagingList::new(&config.upload, notifications.clone());
            for path in paths {
                let path = Path::new(path);
                let report = if path.is_dir() {
                    staging.add_directory(path)?
                } else {
                    staging.add_files([path])?
                };
                if report.ignored > 0 {
                    info!(path = %path.display(), ignored = report.ignored, "skipped ignored entries");
                }
            }

            let last = Arc::new(AtomicU8::new(u8::MAX));
            let progress: ProgressFn = Arc::new(move |p: UploadProgress| {
                let percent = p.percent();
                if last.swap(percent, Ordering::Relaxed) != percent {
                    eprint!("\ruploading... {percent:>3}%");
                }
            });
            let pipeline = UploadPipeline::new(store, notifications);
            let summary = pipeline.commit(&mut staging, Some(dest.as_str()), progress).await?;
            eprintln!();
            println!(
                "uploaded {} file(s) to {}",
                summary.files, summary.destination
            );
            sync.refresh().await?;
        }
        ("preview", [path]) => {
            sync.refresh().await?;
            let tree = sync.snapshot().await;
            let node = find_by_path(&tree, path)
                .ok_or_else(|| FolioError::NotFound(path.to_string()))?;

            let dispatcher = PreviewDispatcher::new(store, config.preview.clone());
            if let Some(fetch) = dispatcher.select(node) {
                fetch
                    .await
                    .map_err(|e| FolioError::Io(std::io::Error::other(e)))?;
            }
            print_preview(dispatcher.state());
        }
        ("process", [path, job]) => {
            let action = ProcessingAction::parse(job).ok_or_else(usage_error)?;
            sync.refresh().await?;
            let tree = sync.snapshot().await;
            let node = find_by_path(&tree, path)
                .ok_or_else(|| FolioError::NotFound(path.to_string()))?;
            let message = run_action(&store, &notifications, node, action).await?;
            println!("{message}");
        }
        _ => return Err(usage_error()),
    }
    Ok(())
}

fn print_preview(state: PreviewState) {
    match state {
        PreviewState::Loading { url: Some(url), kind, .. } => println!("{kind}: {url}"),
        PreviewState::Rendered { content, .. } => match content {
            PreviewContent::Table(table) => {
                println!("{}", table.header.join("\t"));
                for row in &table.rows {
                    println!("{}", row.join("\t"));
                }
                if let Some(notice) = table.notice() {
                    println!("{notice}");
                }
            }
            PreviewContent::Json(json) => println!("{}", json.text),
            PreviewContent::Image { url } | PreviewContent::Pdf { url } => println!("{url}"),
            PreviewContent::Unsupported => println!("No preview available for this file type."),
        },
        PreviewState::Failed { message, .. } => eprintln!("{message}"),
        PreviewState::Idle | PreviewState::Loading { .. } => {}
    }
}
