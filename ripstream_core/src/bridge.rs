/*!
# Rip Stream: Session Event Bridge

The session calls these from its own dispatch thread. None of them block: the
worst any of them does is flip an atomic or push onto a bounded queue.
*/

use crate::{
	Frame,
	FrameQueue,
	RipOptions,
	Signals,
};
use fyi_msg::Msg;
use std::{
	fmt,
	sync::Arc,
};



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Audio Format.
///
/// The format of a delivery. Samples are always signed 16-bit little-endian.
pub struct AudioFormat {
	sample_rate: u32,
	channels: u16,
}

impl AudioFormat {
	#[must_use]
	/// # New.
	pub const fn new(sample_rate: u32, channels: u16) -> Self {
		Self { sample_rate, channels }
	}

	#[must_use]
	/// # Sample Rate.
	pub const fn sample_rate(self) -> u32 { self.sample_rate }

	#[must_use]
	/// # Channels.
	pub const fn channels(self) -> u16 { self.channels }
}



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Connection State.
pub enum ConnectionState {
	/// # Logged In.
	LoggedIn,

	/// # Logged Out.
	LoggedOut,

	/// # Temporarily Disconnected.
	Disconnected,

	/// # Offline.
	Offline,
}



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Login Error.
pub enum LoginError {
	/// # Bad Credentials.
	BadCredentials,

	/// # Client Too Old.
	ClientTooOld,

	/// # Account Banned.
	Banned,

	/// # Premium Required.
	NeedsPremium,

	/// # Temporary Failure.
	Transient,

	/// # Permanent Failure.
	Permanent,

	/// # Server Unreachable.
	Unreachable,

	/// # Something Else.
	Other(i32),
}

impl fmt::Display for LoginError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::BadCredentials => f.write_str("BAD_USERNAME_OR_PASSWORD"),
			Self::ClientTooOld => f.write_str("CLIENT_TOO_OLD"),
			Self::Banned => f.write_str("USER_BANNED"),
			Self::NeedsPremium => f.write_str("USER_NEEDS_PREMIUM"),
			Self::Transient => f.write_str("OTHER_TRANSIENT"),
			Self::Permanent => f.write_str("OTHER_PERMANENT"),
			Self::Unreachable => f.write_str("UNABLE_TO_CONTACT_SERVER"),
			Self::Other(n) => write!(f, "UNKNOWN_ERROR_CODE: {n}"),
		}
	}
}



#[derive(Debug)]
/// # Shared State.
struct Shared {
	queue: FrameQueue,
	signals: Signals,
	resume: bool,
}

#[derive(Debug, Clone)]
/// # Session Events.
///
/// This is the ripper's shared state (the frame queue and the control
/// signals) wrapped up with the callbacks a session uses to feed it.
///
/// It is cheap to clone; the session gets one copy, the [`Ripper`](crate::Ripper)
/// another, and they both see the same queue and latches.
pub struct SessionEvents(Arc<Shared>);

impl SessionEvents {
	#[must_use]
	/// # New.
	///
	/// The queue capacity and play-token policy are pulled from the options.
	pub fn new(opts: &RipOptions) -> Self {
		Self(Arc::new(Shared {
			queue: FrameQueue::new(usize::try_from(opts.queue()).unwrap_or(usize::MAX)),
			signals: Signals::new(),
			resume: opts.play_token_resume().is_some(),
		}))
	}

	#[must_use]
	/// # Frame Queue.
	pub fn queue(&self) -> &FrameQueue { &self.0.queue }

	#[must_use]
	/// # Control Signals.
	pub fn signals(&self) -> &Signals { &self.0.signals }
}

/// ## Callbacks.
impl SessionEvents {
	/// # Connection State Changed.
	///
	/// A logout that happens mid-run, expected or not, halts the run.
	pub fn on_connection_state_changed(&self, state: ConnectionState) {
		let signals = self.signals();
		match state {
			ConnectionState::LoggedIn => {
				signals.set_logged_in();
				signals.clear_logged_out();
			},
			ConnectionState::LoggedOut => {
				signals.clear_logged_in();
				signals.clear_keep_going();
				signals.set_logged_out();
			},
			ConnectionState::Disconnected | ConnectionState::Offline => {},
		}
	}

	/// # Logged In (or Not).
	///
	/// Report the outcome of a login attempt.
	pub fn on_logged_in(&self, res: Result<&str, LoginError>) {
		match res {
			Ok(name) => {
				Msg::custom("Session", 199, &format!("Logged in as {name}.")).eprint();
			},
			Err(e) => {
				Msg::error(format!("Login failed: {e}")).eprint();
				self.signals().clear_logged_in();
			},
		}
		self.signals().set_login_done();
	}

	/// # End of Track.
	///
	/// The session has delivered everything it has for the current track.
	///
	/// This raises the end-of-track latch and, with it, stops playback: the
	/// ripper pauses the session as soon as it sees the latch, then drains
	/// whatever is still in the queue before finalizing the track.
	pub fn on_end_of_track(&self) { self.signals().set_end_of_track(); }

	#[must_use]
	/// # Music Delivery.
	///
	/// Queue up a delivery, returning the number of frames accepted. The
	/// session should hold back and retry when this returns zero.
	///
	/// The encoders are all told to expect 44.1 kHz stereo, so anything else
	/// is refused outright. (A session stuck on some other format will
	/// eventually stall the track out.)
	///
	/// This never blocks.
	pub fn on_music_delivery(&self, format: AudioFormat, data: &[u8], frames: u32)
	-> u32 {
		if
			frames == 0 ||
			data.is_empty() ||
			format.channels() != crate::CHANNELS ||
			format.sample_rate() != crate::SAMPLE_RATE
		{
			return 0;
		}

		let frame = Frame::new(format.sample_rate(), data.to_vec(), frames);
		if self.queue().enqueue(frame) { frames }
		else { 0 }
	}

	/// # Play Token Lost.
	///
	/// The account started playing somewhere else. If a resume time was
	/// configured, the current track is skipped and retried later; otherwise
	/// the whole run is aborted.
	pub fn on_play_token_lost(&self) {
		let signals = self.signals();
		if self.0.resume {
			Msg::error("Play token lost; waiting to resume…").eprint();
			signals.set_play_token_resume();
			signals.set_skip();
		}
		else {
			Msg::error("Play token lost; aborting…").eprint();
			signals.abort_rip();
		}
	}
}
