//! 认证与本地资料演示程序
//!
//! 展示注册、登录、错误提示映射、资料更新、本地资料缓存和首次使用引导标记

use screener_auth::{AuthService, InMemoryAuthProvider};
use screener_core::{LocalProfile, ProfileUpdate, ScreenerError};
use screener_storage::{KeyValueStore, MemoryStore, OnboardingFlag, ProfileCache};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    println!("🚀 DR 筛查认证演示\n");

    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());

    // 1. 首次启动引导
    let onboarding = OnboardingFlag::new(store.clone());
    println!("👋 已完成引导: {}", onboarding.is_complete().await?);
    onboarding.mark_complete().await?;
    println!("✅ 引导完成: {}", onboarding.is_complete().await?);

    // 2. 注册与登录
    let provider = Arc::new(InMemoryAuthProvider::new());
    let auth = AuthService::new(provider.clone());

    let user = auth
        .sign_up("doctor@clinic.org", "retina2024", "Dr. Amina")
        .await?;
    println!("\n👤 注册成功: {} ({})", user.display_name, user.uid);

    auth.sign_out().await?;
    let user = auth.sign_in("doctor@clinic.org", "retina2024").await?;
    println!("🔑 登录成功: {}", user.email);

    // 3. 错误提示
    println!("\n⚠️ 错误提示:");
    let attempts = [
        ("doctor@clinic.org", "wrong-password"),
        ("nobody@clinic.org", "retina2024"),
        ("not-an-email", "retina2024"),
        ("doctor@clinic.org", ""),
    ];
    for (email, password) in attempts {
        if let Err(e) = auth.sign_in(email, password).await {
            if let ScreenerError::Auth { code, .. } = &e {
                println!("   {} -> {}", code, e.user_message());
            }
        }
    }

    // 4. 更新资料
    auth.update_profile(
        &user.uid,
        ProfileUpdate {
            specialty: Some("Ophthalmology".to_string()),
            phone: Some("+254 700 000 000".to_string()),
            ..Default::default()
        },
    )
    .await?;

    if let Some(profile) = auth.get_profile(&user.uid).await? {
        println!(
            "\n🩺 资料: {} / {} / {}",
            profile.display_name,
            profile.specialty.as_deref().unwrap_or("-"),
            profile.phone.as_deref().unwrap_or("-")
        );

        // 5. 缓存到本地
        let cache = ProfileCache::new(store.clone());
        cache
            .save(&LocalProfile {
                name: profile.display_name.clone(),
                email: profile.email.clone(),
                phone: profile.phone.clone().unwrap_or_default(),
                specialty: profile.specialty.clone().unwrap_or_default(),
            })
            .await?;
        println!("💾 本地资料缓存: {:?}", cache.load().await?);
    }

    // 6. 重置密码
    auth.reset_password("doctor@clinic.org").await?;
    println!(
        "\n📧 已发送重置邮件: {:?}",
        provider.password_reset_requests().await
    );

    auth.sign_out().await?;
    println!("👋 已退出登录");
    Ok(())
}
