//! Console Verification Demo
//!
//! Runs the full identity check from a terminal: liveness against the
//! configured service, then ID card submission.
//!
//! ```text
//! cargo run -p verifydlp --example verify_console -- <id-card> [frame-image...]
//! ```
//!
//! With frame images the camera is replaced by a looping image sequence;
//! otherwise the build's default camera backend is used. Set
//! `VERIFYDLP_SERVICE_URL` to target another service.

use anyhow::{bail, Context};
use std::io;
use tokio::sync::broadcast::error::TryRecvError;
use verifydlp::{
    init_logging, ConsoleRenderer, FlowEvent, IdentityDocument, ImageSequenceCamera, Presenter,
    UserIntent, VerificationFlow, VerificationPhase, VerifyConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let Some(card_path) = args.next() else {
        bail!("usage: verify_console <id-card> [frame-image...]");
    };
    let frames: Vec<String> = args.collect();

    let config = VerifyConfig::from_env();
    init_logging(&config.logging);

    println!("🪪 Verify-dlp Console Demo");
    println!("==========================");
    println!("Service: {}", config.service.base_url);

    let mut builder = VerificationFlow::builder().config(config);
    if !frames.is_empty() {
        println!("Camera:  {} still image(s)", frames.len());
        builder = builder.camera(Box::new(ImageSequenceCamera::new(frames)));
    }
    let mut flow = builder.build().context("building verification flow")?;
    let mut events = flow.subscribe();
    let mut renderer = ConsoleRenderer::new(io::stdout());

    renderer.render(&flow.view())?;

    // Liveness
    flow.dispatch(UserIntent::Start).await;
    while flow.phase().is_capturing() {
        if !flow.next_step().await {
            break;
        }
        show_events(&mut events, &mut renderer, &flow)?;
    }
    show_events(&mut events, &mut renderer, &flow)?;

    if flow.phase() != VerificationPhase::Upload {
        println!("\n❌ Liveness did not pass");
        return Ok(());
    }

    // Document
    let card = IdentityDocument::from_path(&card_path)
        .await
        .with_context(|| format!("reading ID card {}", card_path))?;
    flow.dispatch(UserIntent::ChooseDocument(card)).await;
    flow.dispatch(UserIntent::Submit).await;
    show_events(&mut events, &mut renderer, &flow)?;

    match flow.phase() {
        VerificationPhase::Success => println!("\n✨ Verification complete!"),
        phase => println!("\n❌ Verification ended in {}", phase),
    }
    Ok(())
}

/// Print queued notices and re-render on every phase or progress change
fn show_events(
    events: &mut tokio::sync::broadcast::Receiver<FlowEvent>,
    renderer: &mut ConsoleRenderer<io::Stdout>,
    flow: &VerificationFlow,
) -> anyhow::Result<()> {
    let mut dirty = false;
    loop {
        match events.try_recv() {
            Ok(FlowEvent::Notice { title, description }) => {
                renderer.notice(&title, description.as_deref())?;
            }
            Ok(_) => dirty = true,
            Err(TryRecvError::Lagged(_)) => dirty = true,
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
        }
    }
    if dirty {
        renderer.render(&flow.view())?;
    }
    Ok(())
}
