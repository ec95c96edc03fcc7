use crate::args::{Command, ConvertArgs, SearchArgs};
use crate::config::AppConfig;
use crate::config::limits::{MAX_MARKETPLACE_PAGE_SIZE, MIN_MARKETPLACE_PAGE_SIZE};
use crate::error::{AppError, AppResult};
use converter::download::DownloadProgress;
use converter::marketplace::{MarketplaceClient, MarketplaceExtension};
use converter::{ConversionEvent, ConversionRequest, ConversionState, Converter, PackageSource};
use tokio_util::sync::CancellationToken;

pub async fn run(command: Command, config: &AppConfig) -> AppResult<()> {
    match command {
        Command::Convert(args) => convert(args, config).await,
        Command::Search(args) => search(args, config).await,
    }
}

async fn convert(args: ConvertArgs, config: &AppConfig) -> AppResult<()> {
    let mut settings = config.converter_settings();
    if let Some(output) = args.output {
        settings.output_dir = output;
    }
    let converter = Converter::new(settings)?;

    let source = match (args.url, args.file) {
        (Some(url), _) => PackageSource::Remote {
            url,
            store: args.store,
        },
        (None, Some(path)) => PackageSource::Local {
            path,
            store: args.store,
        },
        (None, None) => {
            return Err(AppError::Conversion(
                "Either --url or --file is required.".to_string(),
            ));
        }
    };
    let request = ConversionRequest {
        source,
        display_name: args.name,
    };

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("Interrupted, cancelling conversion");
                cancel.cancel();
            }
        })
    };

    let (sender, receiver) = flume::unbounded::<ConversionEvent>();
    let printer = tokio::spawn(async move {
        let mut last_percent = None;
        while let Ok(event) = receiver.recv_async().await {
            match event {
                ConversionEvent::StateChanged(state) => println!("{}", describe_state(&state)),
                ConversionEvent::DownloadProgress(progress) => {
                    // One line per whole percent, or per event without a known size.
                    let percent = progress.percent();
                    if percent.is_some() && percent == last_percent {
                        continue;
                    }
                    last_percent = percent;
                    println!("  {}", format_progress(&progress));
                }
            }
        }
    });

    let result = converter.convert(request, Some(sender), &cancel).await;
    ctrl_c.abort();
    // The sender was moved into the conversion and is dropped by now.
    if let Err(e) = printer.await {
        log::warn!("Progress printer stopped abnormally: {e}");
    }

    let outcome = result?;
    println!("Scheme '{}' written to {}", outcome.scheme_id, outcome.bundle.directory.display());
    Ok(())
}

async fn search(args: SearchArgs, config: &AppConfig) -> AppResult<()> {
    let page_size = args
        .page_size
        .unwrap_or_else(|| config.marketplace().page_size());
    if !(MIN_MARKETPLACE_PAGE_SIZE..=MAX_MARKETPLACE_PAGE_SIZE).contains(&page_size) {
        return Err(AppError::Config(format!(
            "--page-size must be between {MIN_MARKETPLACE_PAGE_SIZE} and {MAX_MARKETPLACE_PAGE_SIZE}"
        )));
    }

    let client = MarketplaceClient::new(&config.http().settings())?;
    let extensions = client.search(&args.query, args.page, page_size).await?;
    if extensions.is_empty() {
        println!("No themes found for '{}'.", args.query);
        return Ok(());
    }
    for extension in &extensions {
        println!("{}", format_extension(extension));
    }
    Ok(())
}

pub fn describe_state(state: &ConversionState) -> String {
    match state {
        ConversionState::Downloading => "Downloading package...".to_string(),
        ConversionState::Extracting => "Extracting archive...".to_string(),
        ConversionState::Locating => "Looking for the theme definition...".to_string(),
        ConversionState::Parsing => "Parsing theme...".to_string(),
        ConversionState::Normalizing => "Mapping colors...".to_string(),
        ConversionState::Emitting => "Writing scheme...".to_string(),
        ConversionState::Done => "Done.".to_string(),
        ConversionState::Failed { stage, reason } => format!("Failed during {stage}: {reason}"),
    }
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

pub fn format_progress(progress: &DownloadProgress) -> String {
    match (progress.total, progress.percent()) {
        (Some(total), Some(percent)) => format!(
            "{percent:>3}% ({} of {})",
            format_bytes(progress.received),
            format_bytes(total)
        ),
        _ => format!("{} received", format_bytes(progress.received)),
    }
}

pub fn format_extension(extension: &MarketplaceExtension) -> String {
    let verified = if extension.domain_verified { " ✓" } else { "" };
    let mut line = format!(
        "{} by {}{verified}  ({} installs, rating {:.1})",
        extension.name, extension.publisher, extension.downloads, extension.rating
    );
    if !extension.description.is_empty() {
        line.push_str(&format!("\n    {}", extension.description));
    }
    if let Some(url) = &extension.download_url {
        line.push_str(&format!("\n    {url}"));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use converter::FailureStage;

    #[test]
    fn test_format_bytes_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.5 KiB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MiB");
    }

    #[test]
    fn test_format_progress_with_and_without_total() {
        let known = DownloadProgress {
            received: 512,
            total: Some(1024),
        };
        let unknown = DownloadProgress {
            received: 2048,
            total: None,
        };

        assert_eq!(format_progress(&known), " 50% (512 B of 1.0 KiB)");
        assert_eq!(format_progress(&unknown), "2.0 KiB received");
    }

    #[test]
    fn test_failed_state_names_stage() {
        let state = ConversionState::Failed {
            stage: FailureStage::Parse,
            reason: "unexpected end of input".to_string(),
        };

        assert_eq!(
            describe_state(&state),
            "Failed during parse: unexpected end of input"
        );
    }

    #[test]
    fn test_format_extension_lists_download_url() {
        let extension = MarketplaceExtension {
            name: "Night Owl".to_string(),
            publisher: "sdras".to_string(),
            publisher_domain: None,
            domain_verified: false,
            description: "A theme for night owls".to_string(),
            downloads: 1200,
            rating: 4.5,
            icon_url: None,
            download_url: Some("https://example.invalid/night-owl.vsix".to_string()),
        };

        let line = format_extension(&extension);

        assert!(line.starts_with("Night Owl by sdras  (1200 installs, rating 4.5)"));
        assert!(line.ends_with("https://example.invalid/night-owl.vsix"));
    }
}
