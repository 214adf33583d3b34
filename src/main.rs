//! Application entry point — meeting-stream console client.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Create [`tokio`] runtime (multi-thread, 2 workers).
//! 4. Start a [`MeetingSession`] (transport → playback → capture).
//! 5. Run the console loop — reprints the transcript when it changes,
//!    until Ctrl-C or the server drops the link.
//! 6. Ordered stop: capture, playback, transport.
//!
//! The session holds cpal streams and is not `Send`, so it stays on the
//! main thread; the runtime drives it through `block_on`.

use std::time::Duration;

use anyhow::Context;
use meeting_stream::config::AppConfig;
use meeting_stream::session::MeetingSession;
use meeting_stream::transcript::TranscriptLine;

// ---------------------------------------------------------------------------
// Transcript printing
// ---------------------------------------------------------------------------

/// Format the transcript for a terminal, emphasised spans in bold markers.
fn format_transcript(lines: &[TranscriptLine]) -> String {
    let mut out = String::new();
    for line in lines {
        out.push_str("  ");
        for span in &line.spans {
            if span.emphasized {
                out.push_str("**");
                out.push_str(&span.text);
                out.push_str("**");
            } else {
                out.push_str(&span.text);
            }
        }
        out.push('\n');
    }
    out
}

// ---------------------------------------------------------------------------
// Console loop
// ---------------------------------------------------------------------------

/// Poll the view and reprint on change until Ctrl-C or disconnect.
///
/// On disconnect the session performs its own ordered release; the final
/// `stop()` in `main` is then a no-op.
async fn run_console(meeting: &mut MeetingSession) {
    let view = meeting.view();
    let mut last_printed = String::new();
    let mut ticker = tokio::time::interval(Duration::from_millis(250));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                log::info!("Ctrl-C received, shutting down");
                break;
            }
            _ = meeting.run_until_disconnected() => {
                let message = view
                    .lock()
                    .unwrap()
                    .error_message
                    .clone()
                    .unwrap_or_else(|| "disconnected".into());
                eprintln!("connection lost: {message}");
                break;
            }
            _ = ticker.tick() => {
                let rendered = format_transcript(&view.lock().unwrap().transcript);
                if rendered != last_printed {
                    println!("--- transcript ---");
                    print!("{rendered}");
                    last_printed = rendered;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("meeting-stream starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });
    log::info!(
        "server {} | wire {} Hz / {} ms frames | prebuffer {} s",
        config.transport.url,
        config.audio.wire_sample_rate,
        config.audio.frame_ms,
        config.audio.prebuffer_secs
    );

    // 3. Tokio runtime (2 workers — transport tasks + event loop)
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    // 4. Session — stays on the main thread (cpal streams are not Send)
    let mut meeting = MeetingSession::new(config);
    rt.block_on(meeting.start())
        .context("failed to start meeting session")?;
    println!("streaming — press Ctrl-C to stop");

    // 5. Console loop
    rt.block_on(run_console(&mut meeting));

    // 6. Ordered stop (no-op if the disconnect path already ran it)
    rt.block_on(meeting.stop());
    log::info!("meeting-stream exited cleanly");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
