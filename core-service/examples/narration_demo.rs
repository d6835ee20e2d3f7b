//! Plays the welcome narration from a local asset directory and prints the
//! caption as words are revealed.
//!
//! ```text
//! cargo run -p core-service --example narration_demo -- path/to/site
//! ```
//!
//! The directory must contain `public/audio-1.wav`.

use core_runtime::logging::LoggingConfig;
use core_service::{bootstrap, init_core_logging, CoreConfig, SpeakOutcome};

#[tokio::main]
async fn main() -> core_service::Result<()> {
    let root = std::env::args().nth(1).unwrap_or_else(|| ".".to_string());
    let config = CoreConfig::builder()
        .asset_root(root)
        .enable_preload(true)
        .build()?;
    init_core_logging(&config, LoggingConfig::default())?;

    let core = bootstrap(config).await?;
    let mut state = core.narrator().subscribe();

    match core.welcome().await {
        SpeakOutcome::Started(session) => println!("session {session}"),
        other => {
            println!("narration did not start: {other:?}");
            core.shutdown();
            return Ok(());
        }
    }

    let mut last = String::new();
    while state.changed().await.is_ok() {
        let snapshot = state.borrow_and_update().clone();
        let caption = snapshot.caption().text();
        if caption != last {
            println!("[{:>5.2}s] {}", snapshot.current_time, caption);
            last = caption;
        }
        if !snapshot.is_speaking {
            break;
        }
    }

    core.shutdown();
    Ok(())
}
