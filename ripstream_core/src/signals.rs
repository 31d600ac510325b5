/*!
# Rip Stream: Control Signals
*/

use crate::SessionEvents;
use std::{
	sync::{
		Arc,
		atomic::{
			AtomicBool,
			Ordering::{
				Acquire,
				Release,
			},
		},
	},
	time::{
		Duration,
		Instant,
	},
};



/// # Double-Press Window.
///
/// A second CTRL-C within this long of the first kills the run.
const INTERRUPT_WINDOW: Duration = Duration::from_secs(2);



#[derive(Debug, Clone)]
/// # Kill Switch.
///
/// This is a short-circuit for long-running operations across multiple
/// threads.
///
/// The main program's CTRL-C intercept sets the value; the ripper promotes it
/// to a proper abort the next time it checks in, allowing everything to tidy
/// up before dying.
pub struct KillSwitch(Arc<AtomicBool>);

impl Default for KillSwitch {
	#[inline]
	fn default() -> Self { Self(Arc::new(AtomicBool::new(false))) }
}

impl From<Arc<AtomicBool>> for KillSwitch {
	#[inline]
	fn from(src: Arc<AtomicBool>) -> Self { Self(src) }
}

impl KillSwitch {
	#[must_use]
	/// # Dead?
	pub fn killed(&self) -> bool { self.0.load(Acquire) }

	/// # Kill.
	pub fn kill(&self) { self.0.store(true, Release); }
}



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Interrupt Action.
pub enum InterruptAction {
	/// # Skip the Current Track.
	Skip,

	/// # Kill Everything.
	Kill,
}

#[derive(Debug)]
/// # CTRL-C Interrupt.
///
/// This decides what a CTRL-C means. Once a run is underway, the first press
/// skips the current track; a second press within a couple seconds kills the
/// whole run, as does any press before the run gets going.
///
/// Kills are raised as aborts straight away so that anything waiting on the
/// signals (like the stop/resume scheduler) notices.
pub struct Interrupt {
	events: SessionEvents,
	killed: KillSwitch,
	last: Option<Instant>,
}

impl Interrupt {
	#[must_use]
	/// # New.
	pub const fn new(events: SessionEvents, killed: KillSwitch) -> Self {
		Self { events, killed, last: None }
	}

	/// # Press.
	///
	/// Handle a CTRL-C, returning what was done about it.
	pub fn press(&mut self) -> InterruptAction { self.press_at(Instant::now()) }

	/// # Press (At).
	fn press_at(&mut self, now: Instant) -> InterruptAction {
		let signals = self.events.signals();
		let again = self.last.replace(now)
			.map_or(false, |last| now.saturating_duration_since(last) < INTERRUPT_WINDOW);

		if again || signals.abort() || ! signals.keep_going() {
			self.killed.kill();
			signals.abort_rip();
			InterruptAction::Kill
		}
		else {
			signals.set_skip();
			InterruptAction::Skip
		}
	}
}



macro_rules! latch {
	($field:ident, $set:ident, $clear:ident, $title:literal) => (
		#[must_use]
		#[doc = concat!("# ", $title, "?")]
		pub fn $field(&self) -> bool { self.$field.load(Acquire) }

		#[doc = concat!("# Set ", $title, ".")]
		pub fn $set(&self) { self.$field.store(true, Release); }

		#[doc = concat!("# Clear ", $title, ".")]
		pub fn $clear(&self) { self.$field.store(false, Release); }
	);
}



#[derive(Debug, Default)]
/// # Control Signals.
///
/// These are the latches the session callbacks and the ripping loop use to
/// talk to one another. Each is raised by one side and lowered by the side
/// that consumes it.
///
/// | Latch | Raised By | Cleared By |
/// | ----- | --------- | ---------- |
/// | `end_of_track` | Session | Ripper, after finishing/skipping a track. |
/// | `abort` | Session, Ripper, CTRL-C | Never. |
/// | `skip` | Session, User | Ripper, before each track. |
/// | `play_token_resume` | Session | Scheduler, after the resume wait. |
/// | `ripping` | Ripper | Ripper. |
///
/// The connection latches (`logged_in`, `logged_out`, `keep_going`) are
/// maintained by the session's connection-state callback.
pub struct Signals {
	end_of_track: AtomicBool,
	abort: AtomicBool,
	skip: AtomicBool,
	play_token_resume: AtomicBool,
	ripping: AtomicBool,
	logged_in: AtomicBool,
	logged_out: AtomicBool,
	keep_going: AtomicBool,
	login_done: AtomicBool,
}

impl Signals {
	#[must_use]
	/// # New.
	///
	/// Everything starts lowered except `logged_out`.
	pub fn new() -> Self {
		let out = Self::default();
		out.set_logged_out();
		out
	}

	latch!(end_of_track, set_end_of_track, clear_end_of_track, "End of Track");
	latch!(abort, set_abort, clear_abort, "Abort");
	latch!(skip, set_skip, clear_skip, "Skip");
	latch!(play_token_resume, set_play_token_resume, clear_play_token_resume, "Play Token Resume");
	latch!(ripping, set_ripping, clear_ripping, "Ripping");
	latch!(logged_in, set_logged_in, clear_logged_in, "Logged In");
	latch!(logged_out, set_logged_out, clear_logged_out, "Logged Out");
	latch!(keep_going, set_keep_going, clear_keep_going, "Continue");
	latch!(login_done, set_login_done, clear_login_done, "Login Attempt Finished");

	#[must_use]
	/// # Cancelled?
	///
	/// Returns `true` if the current track should stop, either because of a
	/// skip or an abort.
	pub fn cancelled(&self) -> bool { self.abort() || self.skip() }

	/// # Abort Rip.
	///
	/// Stop ripping, and stop everything else too.
	pub fn abort_rip(&self) {
		self.clear_ripping();
		self.set_abort();
	}
}



#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn t_killswitch() {
		let flag = Arc::new(AtomicBool::new(false));
		let killed = KillSwitch::from(Arc::clone(&flag));
		assert!(! killed.killed());
		flag.store(true, Release);
		assert!(killed.killed(), "The kill switch should follow its flag.");

		let killed = KillSwitch::default();
		let other = killed.clone();
		other.kill();
		assert!(killed.killed(), "Clones should share state.");
	}

	#[test]
	fn t_interrupt() {
		let events = SessionEvents::new(&crate::RipOptions::default());
		let killed = KillSwitch::default();
		let mut interrupt = Interrupt::new(events.clone(), killed.clone());
		let now = Instant::now();

		// Nothing is running yet, so this is fatal.
		assert_eq!(interrupt.press_at(now), InterruptAction::Kill);
		assert!(killed.killed());
		assert!(events.signals().abort(), "Kills should raise the abort latch.");
		assert!(! events.signals().skip());

		// Mid-run, the first press skips.
		let events = SessionEvents::new(&crate::RipOptions::default());
		let killed = KillSwitch::default();
		let mut interrupt = Interrupt::new(events.clone(), killed.clone());
		events.signals().set_keep_going();
		assert_eq!(interrupt.press_at(now), InterruptAction::Skip);
		assert!(events.signals().skip(), "The track should be skipped.");
		assert!(! killed.killed(), "One press shouldn't kill anything.");

		// As does one well after that.
		events.signals().clear_skip();
		let later = now + Duration::from_secs(5);
		assert_eq!(interrupt.press_at(later), InterruptAction::Skip);
		assert!(events.signals().skip());
		assert!(! killed.killed());

		// But two in quick succession kill.
		assert_eq!(
			interrupt.press_at(later + Duration::from_millis(500)),
			InterruptAction::Kill,
		);
		assert!(killed.killed(), "A double press should kill the run.");
		assert!(events.signals().abort());
	}

	#[test]
	fn t_latches() {
		macro_rules! t_latch {
			($get:ident, $set:ident, $clear:ident) => (
				let signals = Signals::default();
				for _ in 0..2 {
					assert!(! signals.$get(), concat!(stringify!($get), " should be lowered."));
					signals.$set();
					assert!(signals.$get(), concat!(stringify!($get), " should be raised."));
					signals.$clear();
				}
			);
		}

		t_latch!(end_of_track, set_end_of_track, clear_end_of_track);
		t_latch!(abort, set_abort, clear_abort);
		t_latch!(skip, set_skip, clear_skip);
		t_latch!(play_token_resume, set_play_token_resume, clear_play_token_resume);
		t_latch!(ripping, set_ripping, clear_ripping);
		t_latch!(logged_in, set_logged_in, clear_logged_in);
		t_latch!(logged_out, set_logged_out, clear_logged_out);
		t_latch!(keep_going, set_keep_going, clear_keep_going);
	}

	#[test]
	fn t_new() {
		let signals = Signals::new();
		assert!(signals.logged_out(), "New signals start logged out.");
		assert!(! signals.logged_in());
		assert!(! signals.cancelled());

		signals.set_ripping();
		signals.abort_rip();
		assert!(signals.abort());
		assert!(! signals.ripping(), "Aborting should stop the ripping.");
		assert!(signals.cancelled());
	}
}
