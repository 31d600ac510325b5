/*!
# Rip Stream: Track States
*/

use crate::RipStreamError;
use std::path::{
	Path,
	PathBuf,
};



#[derive(Debug, Clone, Copy, Default, Eq, Hash, PartialEq)]
/// # Track State.
///
/// Each track moves forward through these, one way only:
///
/// ```text
/// Idle → Loading → Playing → Draining → Finalizing → Done
/// ```
///
/// Any of the middle states can also drop out to `Skipped`, `Aborted`, or
/// `Failed`. An `Idle` track whose output already exists goes straight to
/// `Done`.
pub enum TrackState {
	#[default]
	/// # Waiting.
	Idle,

	/// # Waiting on the Session.
	Loading,

	/// # Sink Open, Playback Requested.
	Playing,

	/// # Pulling Frames.
	Draining,

	/// # Closing the Sink.
	Finalizing,

	/// # Finished.
	Done,

	/// # Skipped Mid-Rip.
	Skipped,

	/// # Run Aborted Mid-Rip.
	Aborted,

	/// # Errored Out.
	Failed,
}

impl TrackState {
	#[must_use]
	/// # As Str.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Idle => "idle",
			Self::Loading => "loading",
			Self::Playing => "playing",
			Self::Draining => "draining",
			Self::Finalizing => "finalizing",
			Self::Done => "done",
			Self::Skipped => "skipped",
			Self::Aborted => "aborted",
			Self::Failed => "failed",
		}
	}

	#[must_use]
	/// # Is Terminal?
	pub const fn is_terminal(self) -> bool {
		matches!(self, Self::Done | Self::Skipped | Self::Aborted | Self::Failed)
	}

	#[must_use]
	/// # Can Transition?
	///
	/// Returns `true` if moving from `self` to `next` is allowed. Terminal
	/// states may only go back to `Idle` (i.e. the next track).
	pub const fn can_transition(self, next: Self) -> bool {
		match (self, next) {
			(Self::Idle, Self::Loading | Self::Done | Self::Aborted | Self::Failed) |
			(Self::Loading, Self::Playing) |
			(Self::Playing, Self::Draining) |
			(Self::Draining, Self::Finalizing) |
			(Self::Finalizing, Self::Done) |
			(
				Self::Loading | Self::Playing | Self::Draining,
				Self::Skipped | Self::Aborted | Self::Failed,
			) |
			(Self::Finalizing, Self::Failed) => true,
			(a, Self::Idle) => a.is_terminal() || matches!(a, Self::Idle),
			_ => false,
		}
	}
}



#[derive(Debug, Clone, Eq, PartialEq)]
/// # Track Outcome.
///
/// How things turned out for a single track.
pub enum TrackOutcome {
	/// # Ripped.
	///
	/// This includes the encoder's exit code when it was non-zero.
	Done(PathBuf, Option<i32>),

	/// # Already Ripped.
	///
	/// A complete file was already there, so nothing was done.
	Existing(PathBuf),

	/// # Skipped Mid-Rip.
	Skipped,

	/// # Aborted Mid-Rip.
	Aborted,

	/// # Failed.
	Failed(RipStreamError),
}

impl TrackOutcome {
	#[must_use]
	/// # Final State.
	pub const fn state(&self) -> TrackState {
		match self {
			Self::Done(..) | Self::Existing(_) => TrackState::Done,
			Self::Skipped => TrackState::Skipped,
			Self::Aborted => TrackState::Aborted,
			Self::Failed(_) => TrackState::Failed,
		}
	}

	#[must_use]
	/// # Output Path.
	///
	/// Return the path of the ripped file, if any.
	pub fn path(&self) -> Option<&Path> {
		match self {
			Self::Done(p, _) | Self::Existing(p) => Some(p),
			_ => None,
		}
	}

	#[must_use]
	/// # Is Success?
	pub const fn is_success(&self) -> bool {
		matches!(self, Self::Done(..) | Self::Existing(_))
	}

	#[must_use]
	/// # Error.
	///
	/// Return the error equivalent of an unsuccessful outcome.
	pub fn error(&self) -> Option<RipStreamError> {
		match self {
			Self::Done(..) | Self::Existing(_) => None,
			Self::Skipped => Some(RipStreamError::UserSkip),
			Self::Aborted => Some(RipStreamError::Killed),
			Self::Failed(e) => Some(e.clone()),
		}
	}
}



#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn t_happy_path() {
		let path = [
			TrackState::Idle,
			TrackState::Loading,
			TrackState::Playing,
			TrackState::Draining,
			TrackState::Finalizing,
			TrackState::Done,
			TrackState::Idle,
		];
		for pair in path.windows(2) {
			assert!(
				pair[0].can_transition(pair[1]),
				"{} → {} should be allowed.",
				pair[0].as_str(),
				pair[1].as_str(),
			);
		}
	}

	#[test]
	fn t_no_backsies() {
		assert!(! TrackState::Draining.can_transition(TrackState::Playing));
		assert!(! TrackState::Idle.can_transition(TrackState::Draining));
		assert!(! TrackState::Done.can_transition(TrackState::Failed));
		assert!(! TrackState::Finalizing.can_transition(TrackState::Skipped));
		assert!(TrackState::Failed.can_transition(TrackState::Idle));
		assert!(! TrackState::Playing.can_transition(TrackState::Idle));
	}

	#[test]
	fn t_outcome() {
		let done = TrackOutcome::Done(PathBuf::from("a.mp3"), None);
		assert_eq!(done.state(), TrackState::Done);
		assert!(done.is_success());
		assert_eq!(done.path(), Some(Path::new("a.mp3")));
		assert!(done.error().is_none());

		let failed = TrackOutcome::Failed(RipStreamError::StallTimeout);
		assert_eq!(failed.state(), TrackState::Failed);
		assert!(! failed.is_success());
		assert_eq!(failed.error(), Some(RipStreamError::StallTimeout));
		assert_eq!(TrackOutcome::Skipped.error(), Some(RipStreamError::UserSkip));
	}
}
