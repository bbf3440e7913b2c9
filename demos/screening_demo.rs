//! 筛查流程演示程序
//!
//! 使用模拟分类器走完整个筛查流程：采集、编码、分类、归一化、保存和历史浏览

use screener_pipeline::{ImageSource, LocalFileSource, MockClassifier, ScreeningSession};
use screener_storage::{HistoryStore, KeyValueStore, MemoryStore};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt::init();

    println!("🚀 DR 筛查流程演示\n");

    // 1. 准备一张本地影像
    let dir = tempfile::tempdir()?;
    let image_path = dir.path().join("fundus.jpg");
    tokio::fs::write(&image_path, [0xFFu8, 0xD8, 0xFF, 0xE0, 0x00, 0x10]).await?;
    let handle = LocalFileSource::new(&image_path).acquire().await?;
    println!("✅ 已采集影像: {}", handle);

    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let history = HistoryStore::new(store);

    // 2. 依次模拟几种分类结果
    let responses = [
        ("No_DR", 0.912),
        ("Mild", 0.623),
        ("Proliferate_DR", 0.8755),
        ("Unknown_Class", 0.41),
    ];

    for (label, confidence) in responses {
        let classifier = Arc::new(MockClassifier::responding(label, confidence));
        let mut session = ScreeningSession::new(classifier).with_progress(|state| {
            if let Some(message) = state.progress_message() {
                println!("   ⏳ {}", message);
            }
        });

        let result = session.run(handle.clone()).await?;
        println!(
            "📋 {} -> {} ({}%)",
            label, result.severity, result.confidence
        );
        session.save(&history).await?;
    }

    // 3. 分类服务失败后重试
    println!("\n🔁 失败与重试:");
    let failing = Arc::new(MockClassifier::failing("service unavailable"));
    let mut session = ScreeningSession::new(failing.clone());
    if let Err(e) = session.run(handle.clone()).await {
        println!("   ❌ {} (状态: {})", e.user_message(), session.state());
    }
    if session.retry().await.is_err() {
        println!("   ❌ 重试仍然失败，共调用分类服务 {} 次", failing.calls());
    }
    println!("   ℹ️ 当前状态: {}，可再次重试", session.state());

    // 4. 浏览历史
    let saved = history.load().await?;
    println!("\n📚 历史记录 ({} 条):", saved.len());
    for group in saved.group_by_month() {
        println!("   {}", group.label);
        for entry in &group.entries {
            println!("   - {} {} {}%", entry.id, entry.severity, entry.confidence);
        }
    }

    let summary = saved.summary();
    println!("\n📊 统计:");
    println!("   总数: {}", summary.total);
    for (level, count) in &summary.by_severity {
        println!("   {}: {}", level, count);
    }
    println!("   未识别标签: {}", summary.unmapped);
    println!("   需要转诊: {}", summary.referrals);

    // 5. 分享最近一次结果
    if let Some(latest) = saved.latest() {
        println!("\n📤 分享内容:\n{}", latest.share_message());
    }

    println!("\n🎉 演示完成");
    Ok(())
}
