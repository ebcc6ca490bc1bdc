//! Session orchestration for pdfchat.
//!
//! Drives the upload -> chat lifecycle: validates user requests, runs the
//! remote calls, simulates upload progress, and reveals answers with a
//! typewriter effect.

pub mod controller;
pub mod progress;
pub mod state;
pub mod transcript;
pub mod typewriter;

pub use controller::{Command, Event, SessionController, SessionHandle};
pub use progress::{ProgressSettings, ProgressSimulator};
pub use state::{Mode, QueryState, Question, Session, SessionView, UploadState, ViewTurn};
pub use transcript::{ProjectedTurn, Transcript};
pub use typewriter::{Reveal, Typewriter};
