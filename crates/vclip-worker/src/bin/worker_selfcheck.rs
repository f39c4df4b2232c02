use std::path::Path;
use std::process::Command;

use vclip_worker::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = WorkerConfig::from_env();

    println!(
        "worker-selfcheck: starting with work_dir={}",
        config.work_dir
    );
    ensure_workdir(&config.work_dir).await?;
    ensure_ffmpeg()?;
    ensure_redis_configured()?;

    println!("worker-selfcheck: ok");
    Ok(())
}

async fn ensure_workdir<P: AsRef<Path>>(path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    tokio::fs::create_dir_all(path).await?;
    Ok(())
}

fn ensure_ffmpeg() -> anyhow::Result<()> {
    let output = Command::new("ffmpeg")
        .arg("-version")
        .output()
        .map_err(|e| anyhow::anyhow!("ffmpeg not available: {}", e))?;

    if !output.status.success() {
        return Err(anyhow::anyhow!(
            "ffmpeg -version failed: {:?}",
            output.status
        ));
    }
    Ok(())
}

/// Redis can be configured either as a full `REDIS_URL`, or as discrete
/// `REDIS_HOST`/`REDIS_PORT`/`REDIS_PASSWORD` parts; either is sufficient.
fn ensure_redis_configured() -> anyhow::Result<()> {
    if std::env::var("REDIS_URL").is_ok() || std::env::var("REDIS_HOST").is_ok() {
        return Ok(());
    }
    Err(anyhow::anyhow!(
        "missing Redis configuration: set REDIS_URL or REDIS_HOST"
    ))
}
