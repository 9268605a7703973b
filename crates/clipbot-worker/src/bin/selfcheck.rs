use std::path::Path;
use std::process::Command;

use clipbot_worker::BotConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    ensure_env_present(&["TELEGRAM_BOT_TOKEN"])?;
    let config = BotConfig::from_env()?;

    println!(
        "clipbot-selfcheck: starting with work_dir={}",
        config.work_dir.display()
    );
    ensure_workdir(&config.work_dir).await?;
    ensure_tool("ffmpeg", "-version")?;
    ensure_tool("ffprobe", "-version")?;
    ensure_tool("yt-dlp", "--version")?;

    println!("clipbot-selfcheck: ok");
    Ok(())
}

async fn ensure_workdir<P: AsRef<Path>>(path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    tokio::fs::create_dir_all(path).await?;
    let probe = tempfile::tempdir_in(path)?;
    probe.close()?;
    Ok(())
}

fn ensure_tool(name: &str, version_flag: &str) -> anyhow::Result<()> {
    let output = Command::new(name)
        .arg(version_flag)
        .output()
        .map_err(|e| anyhow::anyhow!("{} not available: {}", name, e))?;

    if !output.status.success() {
        return Err(anyhow::anyhow!(
            "{} {} failed: {:?}",
            name,
            version_flag,
            output.status
        ));
    }
    Ok(())
}

fn ensure_env_present(vars: &[&str]) -> anyhow::Result<()> {
    for var in vars {
        if std::env::var(var).is_err() {
            return Err(anyhow::anyhow!("missing required env var {}", var));
        }
    }
    Ok(())
}
