//! 筛查命令行程序

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use screener_admin::{init_logging, ConfigManager, ScreenerConfig};
use screener_core::{ScreenerError, ScreeningResult};
use screener_pipeline::{ImageSource, LocalFileSource, RoboflowClient, ScreeningSession};
use screener_storage::{FileStore, HistoryStore, KeyValueStore, OnboardingFlag};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// 筛查命令行参数
#[derive(Parser, Debug)]
#[command(name = "screener")]
#[command(about = "Diabetic retinopathy screening from retinal photos")]
struct Args {
    /// 配置文件路径
    #[arg(short, long, default_value = "screener.toml")]
    config: String,

    /// 日志级别（覆盖配置文件）
    #[arg(short, long)]
    log_level: Option<String>,

    /// 数据目录（覆盖配置文件）
    #[arg(short, long)]
    data_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 分析一张视网膜照片
    Analyze {
        /// 影像文件路径
        image: PathBuf,

        /// 分析完成后保存到历史
        #[arg(long)]
        save: bool,
    },
    /// 查看筛查历史
    History {
        /// 只显示统计信息
        #[arg(long)]
        summary: bool,

        /// 以 JSON 输出
        #[arg(long)]
        json: bool,
    },
    /// 查看或完成首次使用引导
    Onboarding {
        #[arg(long)]
        complete: bool,
    },
    /// 写出默认配置文件
    InitConfig {
        #[arg(default_value = "screener.toml")]
        path: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Command::InitConfig { path } = &args.command {
        ConfigManager::write_default(path).await?;
        println!("Wrote default configuration to {}", path);
        return Ok(());
    }

    let manager = ConfigManager::new(Some(&args.config))?;
    let mut config = manager.get_config().await;
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    if let Some(data_dir) = &args.data_dir {
        config.storage.data_dir = data_dir.clone();
    }

    init_logging(&config.logging)?;
    info!("Data directory: {}", config.storage.data_dir);

    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(config.storage.data_path()));

    match args.command {
        Command::Analyze { image, save } => analyze(&config, store, image, save).await,
        Command::History { summary, json } => history(store, summary, json).await,
        Command::Onboarding { complete } => onboarding(store, complete).await,
        Command::InitConfig { .. } => Ok(()),
    }
}

async fn analyze(
    config: &ScreenerConfig,
    store: Arc<dyn KeyValueStore>,
    image: PathBuf,
    save: bool,
) -> Result<()> {
    let classifier = RoboflowClient::new(
        &config.classifier.endpoint,
        &config.classifier.api_key,
        config.classifier.timeout(),
    )?;

    let handle = LocalFileSource::new(image).acquire().await?;
    let mut session = ScreeningSession::new(Arc::new(classifier)).with_progress(|state| {
        if let Some(message) = state.progress_message() {
            println!("{}", message);
        }
    });

    let result = match session.run(handle).await {
        Ok(result) => result,
        Err(e) => return Err(report_failure(e)),
    };

    print_result(&result);

    if save {
        let history = HistoryStore::new(store);
        session
            .save(&history)
            .await
            .context("Failed to save result")?;
        println!("Saved to history ({})", result.id);
    }
    Ok(())
}

fn report_failure(err: ScreenerError) -> anyhow::Error {
    error!("Analysis failed: {}", err);
    eprintln!("{}", err.user_message());
    if err.is_retryable() {
        eprintln!("Run the same command again to try again.");
    }
    err.into()
}

fn print_result(result: &ScreeningResult) {
    println!();
    println!("Severity:   {}", result.severity);
    println!("Confidence: {}%", result.confidence);
    println!("Date:       {}", result.date.to_rfc3339());

    match result.severity.level() {
        Some(level) if level.is_urgent() => {
            println!("Urgent: consult an ophthalmologist as soon as possible.")
        }
        Some(level) if level.requires_referral() => {
            println!("Consult an ophthalmologist for a follow-up examination.")
        }
        Some(_) => println!("No signs of diabetic retinopathy detected."),
        None => println!("The classifier returned an unrecognized label."),
    }
}

async fn history(store: Arc<dyn KeyValueStore>, summary: bool, json: bool) -> Result<()> {
    let history = HistoryStore::new(store).load_or_empty().await;

    if summary {
        let stats = history.summary();
        if json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
            return Ok(());
        }
        println!("Total screenings: {}", stats.total);
        for (level, count) in &stats.by_severity {
            println!("  {:<17} {}", level.label(), count);
        }
        if stats.unmapped > 0 {
            println!("  {:<17} {}", "Unrecognized", stats.unmapped);
        }
        println!("Needing referral: {}", stats.referrals);
        return Ok(());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&history)?);
        return Ok(());
    }

    if history.is_empty() {
        println!("No screenings saved yet.");
        return Ok(());
    }

    for group in history.group_by_month() {
        println!("{}", group.label);
        for entry in &group.entries {
            println!(
                "  {}  {:<17} {}% confidence",
                entry.date.format("%b %-d, %Y"),
                entry.severity.label(),
                entry.confidence
            );
        }
    }
    Ok(())
}

async fn onboarding(store: Arc<dyn KeyValueStore>, complete: bool) -> Result<()> {
    let flag = OnboardingFlag::new(store);
    if complete {
        flag.mark_complete().await?;
    }
    let done = flag.is_complete().await?;
    println!("Onboarding {}", if done { "complete" } else { "not completed" });
    Ok(())
}
