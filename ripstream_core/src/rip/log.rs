/*!
# Rip Stream: Log
*/

use crate::{
	TrackOutcome,
	Track,
};
use dactyl::NiceElapsed;
use std::{
	io::Write,
	time::Instant,
};
use utc2k::FmtUtc2k;



/// # Super Basic Log.
///
/// This holds the log-worthy details from a run, printing them out en masse
/// at the end.
///
/// Doing it this way, versus printing each line in realtime, keeps the log
/// from getting tangled up with the progress bar.
pub(super) struct RunLog {
	start: Option<Instant>,
	events: Vec<RunLogEntry>,
}

impl Drop for RunLog {
	/// # Final Print Maybe.
	fn drop(&mut self) { self.flush(); }
}

impl RunLog {
	/// # New Instance.
	pub(super) const fn new() -> Self {
		Self {
			start: None,
			events: Vec::new(),
		}
	}

	/// # Start.
	///
	/// Logging doesn't happen until this is called.
	pub(super) fn start(&mut self) {
		self.flush();
		self.events.truncate(0);
		self.start.replace(Instant::now());
	}

	/// # Add Event.
	pub(super) fn add(&mut self, idx: usize, track: &Track, kind: RunLogKind) {
		if self.start.is_some() {
			self.events.push(RunLogEntry {
				time: FmtUtc2k::now(),
				idx,
				uri: track.uri().to_owned(),
				kind,
			});
		}
	}

	/// # Add Outcome.
	pub(super) fn add_outcome(&mut self, idx: usize, track: &Track, outcome: &TrackOutcome) {
		let kind = match outcome {
			TrackOutcome::Done(_, None) => RunLogKind::Ripped,
			TrackOutcome::Done(_, Some(code)) => RunLogKind::EncoderExit(*code),
			TrackOutcome::Existing(_) => RunLogKind::Existing,
			TrackOutcome::Skipped => RunLogKind::Skipped,
			TrackOutcome::Aborted => RunLogKind::Aborted,
			TrackOutcome::Failed(e) => RunLogKind::Failed(e.to_string()),
		};
		self.add(idx, track, kind);
	}

	/// # Flush.
	pub(super) fn flush(&mut self) {
		// Header.
		let Some(start) = self.start.take() else { return; };
		let writer = std::io::stdout();
		let mut handle = writer.lock();
		let _res = writeln!(
			&mut handle,
			r"##
## Run Time: {}
## Events:   {}
##",
			NiceElapsed::from(start),
			self.events.len(),
		);

		for e in self.events.drain(..) {
			let _res = writeln!(
				&mut handle,
				"[{}]  {:03}  {:<10}  {}{}",
				e.time,
				e.idx + 1,
				e.kind.as_str(),
				e.uri,
				e.kind.detail(),
			);
		}

		// Write it!
		let _res = handle.flush();
	}
}



/// # Log Entry.
struct RunLogEntry {
	time: FmtUtc2k,
	idx: usize,
	uri: String,
	kind: RunLogKind,
}



#[derive(Debug, Clone, Eq, PartialEq)]
/// # Event Kind.
pub(super) enum RunLogKind {
	Aborted,
	EncoderExit(i32),
	Existing,
	Failed(String),
	Partial,
	Retry,
	Ripped,
	Skipped,
}

impl RunLogKind {
	/// # As Str.
	const fn as_str(&self) -> &'static str {
		match self {
			Self::Aborted => "ABORTED",
			Self::EncoderExit(_) => "WARNING",
			Self::Existing => "EXISTS",
			Self::Failed(_) => "FAILED",
			Self::Partial => "PARTIAL",
			Self::Retry => "RETRY",
			Self::Ripped => "RIPPED",
			Self::Skipped => "SKIPPED",
		}
	}

	/// # Extra Detail.
	fn detail(&self) -> String {
		match self {
			Self::EncoderExit(n) => format!("  (encoder exit {n})"),
			Self::Failed(e) => format!("  ({e})"),
			_ => String::new(),
		}
	}
}
