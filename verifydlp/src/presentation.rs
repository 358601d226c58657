//! Presentation layer
//!
//! Presenters only read `FlowView` snapshots and hand `UserIntent`s back to
//! the flow; they never touch the camera or the connection.

use crate::flow::FlowView;
use crate::phase::VerificationPhase;
use crate::submitter::IdentityDocument;
use std::io::{self, Write};

/// Actions a user can take
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserIntent {
    /// Begin camera capture and liveness
    Start,
    /// Pick the ID document to submit
    ChooseDocument(IdentityDocument),
    /// Submit the chosen document
    Submit,
    /// Discard the attempt and start over
    Retry,
}

/// Renders the flow for a user
pub trait Presenter {
    /// Draw the current state
    fn render(&mut self, view: &FlowView) -> io::Result<()>;
}

/// Plain-text card renderer
#[derive(Debug)]
pub struct ConsoleRenderer<W: Write> {
    out: W,
}

impl<W: Write> ConsoleRenderer<W> {
    /// Renderer writing to `out`
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Recover the writer
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Print a transient notice
    pub fn notice(&mut self, title: &str, description: Option<&str>) -> io::Result<()> {
        match description {
            Some(description) => writeln!(self.out, "* {} {}", title, description),
            None => writeln!(self.out, "* {}", title),
        }
    }
}

impl<W: Write> Presenter for ConsoleRenderer<W> {
    fn render(&mut self, view: &FlowView) -> io::Result<()> {
        match view.phase {
            VerificationPhase::Camera => {
                writeln!(self.out, "[camera] Identity verification")?;
                writeln!(self.out, "  Look at the camera and start the liveness check.")?;
            }
            VerificationPhase::Liveness => {
                writeln!(self.out, "[liveness] Keep your face in frame")?;
                writeln!(
                    self.out,
                    "  {} real frames ({}%)",
                    view.progress.fraction(),
                    view.progress.percent()
                )?;
            }
            VerificationPhase::Upload => {
                writeln!(self.out, "[upload] Liveness passed")?;
                match &view.document_name {
                    Some(name) => writeln!(self.out, "  Selected: {} (ready to submit)", name)?,
                    None => writeln!(self.out, "  Choose a photo of your ID card.")?,
                }
            }
            VerificationPhase::Verifying => {
                writeln!(self.out, "[verifying] Checking your document...")?;
            }
            VerificationPhase::Success => {
                writeln!(self.out, "[success] Identity verified")?;
                if let Some(outcome) = &view.outcome {
                    writeln!(self.out, "  Result:   {}", outcome.recognito_result)?;
                    writeln!(
                        self.out,
                        "  Duration: {:.1}s",
                        outcome.performance.total_duration
                    )?;
                    writeln!(self.out, "  Session:  {}", short_session(&outcome.session_id))?;
                }
            }
            VerificationPhase::Error => {
                writeln!(self.out, "[error] Verification failed")?;
                if let Some(message) = &view.error {
                    writeln!(self.out, "  {}", message)?;
                }
                writeln!(self.out, "  Retry to start over.")?;
            }
        }
        self.out.flush()
    }
}

fn short_session(session_id: &str) -> String {
    let prefix: String = session_id.chars().take(12).collect();
    format!("{}...", prefix)
}
