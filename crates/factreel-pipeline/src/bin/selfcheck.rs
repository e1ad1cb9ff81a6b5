use std::path::Path;

use factreel_media::{check_ffmpeg, check_ffprobe, FontBook};
use factreel_models::FontRole;
use factreel_pipeline::PipelineConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let config = PipelineConfig::from_env();

    println!(
        "factreel-selfcheck: starting with work_dir={}",
        config.work_dir.display()
    );
    ensure_workdir(&config.work_dir).await?;
    check_ffmpeg().map_err(|e| anyhow::anyhow!("ffmpeg not available: {}", e))?;
    check_ffprobe().map_err(|e| anyhow::anyhow!("ffprobe not available: {}", e))?;
    ensure_fonts(&FontBook::load(&config.fonts))?;

    println!("factreel-selfcheck: ok");
    Ok(())
}

async fn ensure_workdir<P: AsRef<Path>>(path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    tokio::fs::create_dir_all(path).await?;

    let probe = path.join(".selfcheck");
    tokio::fs::write(&probe, b"ok")
        .await
        .map_err(|e| anyhow::anyhow!("work dir {} not writable: {}", path.display(), e))?;
    tokio::fs::remove_file(&probe).await?;
    Ok(())
}

fn ensure_fonts(fonts: &FontBook) -> anyhow::Result<()> {
    if fonts.measure("FACTREEL", FontRole::Title) <= 0.0 {
        return Err(anyhow::anyhow!("title text measured zero width"));
    }
    println!("factreel-selfcheck: {} font faces", fonts.face_count());
    Ok(())
}
