/*!
# Rip Stream: Ripping
*/

mod log;
pub(super) mod opts;
pub(super) mod partial;
pub(super) mod state;

use crate::{
	EncoderSink,
	expected_size,
	Frame,
	is_partial,
	KillSwitch,
	NoTags,
	PostActions,
	Resolver,
	RipOptions,
	RipStreamError,
	SAMPLE_RATE,
	Session,
	SessionEvents,
	StopScheduler,
	Tagger,
	Track,
	TrackOutcome,
	TrackState,
};
use dactyl::{
	NiceElapsed,
	NiceU64,
	traits::NiceInflection,
};
use fyi_msg::{
	Msg,
	Progless,
};
use log::{
	RunLog,
	RunLogKind,
};
use std::{
	fmt,
	path::{
		Path,
		PathBuf,
	},
	process::ExitStatus,
	time::{
		Duration,
		Instant,
	},
};



/// # Login Poll Interval.
const LOGIN_POLL: Duration = Duration::from_millis(10);



/// # Rip Manager.
///
/// This owns the session and coordinates everything else: the scheduler,
/// the frame queue, the encoder sinks, and the end-of-run bookkeeping.
///
/// Tracks are ripped one at a time, in order, on the calling thread; the
/// session delivers audio from its own.
pub struct Ripper<'a, S> {
	session: S,
	events: SessionEvents,
	opts: RipOptions,
	dir: PathBuf,
	tagger: &'a dyn Tagger,
	progress: &'a Progless,
	killed: KillSwitch,
	scheduler: StopScheduler,
	post: PostActions,
	log: RunLog,
	state: TrackState,
}

impl<S> fmt::Debug for Ripper<'_, S> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Ripper")
			.field("opts", &self.opts)
			.field("dir", &self.dir)
			.field("state", &self.state)
			.finish_non_exhaustive()
	}
}

impl<'a, S: Session> Ripper<'a, S> {
	#[must_use]
	/// # New.
	///
	/// The `events` should be the same (cloned) instance the session was
	/// built with.
	pub fn new(session: S, events: SessionEvents, opts: RipOptions, progress: &'a Progless)
	-> Self {
		Self {
			session,
			events,
			opts,
			dir: PathBuf::from("."),
			tagger: &NoTags,
			progress,
			killed: KillSwitch::default(),
			scheduler: StopScheduler::new(
				opts.stop_after(),
				opts.resume_after(),
				opts.play_token_resume(),
			),
			post: PostActions::default(),
			log: RunLog::new(),
			state: TrackState::Idle,
		}
	}

	#[must_use]
	/// # With Output Directory.
	pub fn with_dir<P: Into<PathBuf>>(self, dir: P) -> Self {
		Self {
			dir: dir.into(),
			..self
		}
	}

	#[must_use]
	/// # With Kill Switch.
	pub fn with_killswitch(self, killed: KillSwitch) -> Self {
		Self {
			killed,
			..self
		}
	}

	#[must_use]
	/// # With Post Actions.
	pub fn with_post(self, post: PostActions) -> Self {
		Self {
			post,
			..self
		}
	}

	#[must_use]
	/// # With Tagger.
	pub fn with_tagger(self, tagger: &'a dyn Tagger) -> Self {
		Self {
			tagger,
			..self
		}
	}

	#[must_use]
	/// # Current State.
	pub const fn state(&self) -> TrackState { self.state }

	#[must_use]
	/// # Post Actions.
	pub const fn post(&self) -> &PostActions { &self.post }
}

impl<S: Session> Ripper<'_, S> {
	/// # Log In.
	///
	/// Ask the session to log in and wait (up to the load timeout) for it to
	/// report back.
	///
	/// ## Errors
	///
	/// Returns an error if the session refuses or the login doesn't take.
	pub fn login(&mut self) -> Result<(), RipStreamError> {
		self.events.signals().clear_login_done();
		self.session.login()?;

		let start = Instant::now();
		let signals = self.events.signals();
		while ! signals.login_done() && ! signals.logged_in() {
			if self.killed.killed() || self.opts.load_timeout() <= start.elapsed() {
				break;
			}
			std::thread::sleep(LOGIN_POLL);
		}

		if signals.logged_in() {
			signals.set_keep_going();
			Ok(())
		}
		else { Err(RipStreamError::Login) }
	}

	/// # Rip!
	///
	/// Log in, resolve each URI into tracks, and rip them all, one after
	/// another.
	///
	/// Per-track failures are logged and the run moves on; only an abort (or
	/// logout) ends things early. Either way, the session is logged out and
	/// the post actions run before this returns.
	///
	/// ## Errors
	///
	/// Returns an error if login fails or there is nothing to rip.
	pub fn rip<R: Resolver>(&mut self, uris: &[String], resolver: &mut R)
	-> Result<RipReport, RipStreamError> {
		if uris.is_empty() { return Err(RipStreamError::Noop); }
		if self.opts.verbose() { self.log.start(); }

		let res = self.login().and_then(|()| self.rip_uris(uris, resolver));
		self.cleanup();
		res
	}

	/// # Rip URIs.
	fn rip_uris<R: Resolver>(&mut self, uris: &[String], resolver: &mut R)
	-> Result<RipReport, RipStreamError> {
		// Resolve everything up front.
		let mut tracks = Vec::new();
		for uri in uris {
			if self.halted() { break; }
			match resolver.resolve(uri) {
				Ok(v) => { tracks.extend(v); },
				Err(e) => {
					Msg::warning(format!("Unable to resolve {uri}: {e}")).eprint();
				},
			}
		}
		if tracks.is_empty() { return Err(RipStreamError::Noop); }
		self.print_total(&tracks);

		let mut report = RipReport::default();
		let mut idx = 0;
		while let Some(track) = tracks.get(idx) {
			let Some(outcome) = self.rip_track(idx, track) else { break; };

			// A lost play token gets another go once the scheduler has waited
			// it out.
			if
				matches!(outcome, TrackOutcome::Skipped) &&
				self.events.signals().play_token_resume()
			{
				self.log.add(idx, track, RunLogKind::Retry);
				continue;
			}

			self.log.add_outcome(idx, track, &outcome);
			match &outcome {
				TrackOutcome::Done(path, _) => { self.post.log_success(track, path); },
				TrackOutcome::Existing(path) => { self.post.log_existing(track, path); },
				_ => { self.post.log_failure(track); },
			}

			let abort = matches!(outcome, TrackOutcome::Aborted);
			report.push(track.uri(), outcome);
			if abort { break; }
			idx += 1;
		}

		report.aborted = self.events.signals().abort();
		Ok(report)
	}

	/// # Rip Track.
	///
	/// Returns `None` if the run was halted before the track got started.
	fn rip_track(&mut self, idx: usize, track: &Track) -> Option<TrackOutcome> {
		self.transition(TrackState::Idle);
		self.scheduler.check(self.events.signals());
		self.events.signals().clear_skip();
		if self.halted() { return None; }

		// Leave complete files alone.
		let dst = self.dst(track);
		if ! self.opts.overwrite() && dst.exists() {
			if is_partial(&dst, track, &self.opts) {
				Msg::warning(format!("Overwriting partial file {}.", dst.display())).eprint();
				self.log.add(idx, track, RunLogKind::Partial);
			}
			else {
				Msg::custom("Skipped", 11, &format!("{} already exists.", dst.display()))
					.eprint();
				self.transition(TrackState::Done);
				return Some(TrackOutcome::Existing(dst));
			}
		}

		let outcome = match self.try_rip(idx, track, &dst) {
			Ok(o) => o,
			Err(e) => {
				self.pause();
				self.events.signals().clear_ripping();
				Msg::error(format!("{}: {e}", track.uri())).eprint();
				self.transition(TrackState::Failed);
				TrackOutcome::Failed(e)
			},
		};

		self.progress.finish();
		Some(outcome)
	}

	/// # Try Rip.
	///
	/// This is the meat of the track state machine. Errors are dealt with by
	/// the caller, but any open sink is discarded before they bubble up.
	fn try_rip(&mut self, idx: usize, track: &Track, dst: &Path)
	-> Result<TrackOutcome, RipStreamError> {
		// Load.
		self.transition(TrackState::Loading);
		set_progress_title(self.progress, idx, "Loading…");
		let availability = self.session.load(track, self.opts.load_timeout())?;
		if ! availability.is_available() || track.is_local() {
			return Err(RipStreamError::TrackUnavailable);
		}

		// Play and drain.
		let mut rip = self.prepare(idx, track, dst)?;
		self.transition(TrackState::Playing);
		if let Err(e) = self.play_and_drain(&mut rip) {
			self.pause();
			rip.discard();
			return Err(e);
		}

		// Aborted?
		if self.events.signals().abort() {
			self.pause();
			self.events.signals().set_end_of_track();
			rip.discard();
			self.events.signals().clear_ripping();
			Msg::warning(format!("Aborted {}.", track.uri())).eprint();
			self.transition(TrackState::Aborted);
			return Ok(TrackOutcome::Aborted);
		}

		// Skipped?
		if self.events.signals().skip() {
			self.pause();
			rip.discard();
			let signals = self.events.signals();
			signals.clear_end_of_track();
			signals.clear_ripping();
			if ! signals.play_token_resume() {
				Msg::warning(format!("Skipped {}.", track.uri())).eprint();
			}
			self.transition(TrackState::Skipped);
			return Ok(TrackOutcome::Skipped);
		}

		// Finish up!
		self.events.signals().clear_end_of_track();
		self.transition(TrackState::Finalizing);
		set_progress_title(self.progress, idx, "Finalizing…");
		let code = self.finish(idx, track, dst, rip)?;
		self.transition(TrackState::Done);
		Ok(TrackOutcome::Done(dst.to_path_buf(), code))
	}

	/// # Prepare.
	///
	/// Toss out any stale frames left over from a previous track, open the
	/// sink, and raise the ripping latch.
	fn prepare(&mut self, idx: usize, track: &Track, dst: &Path)
	-> Result<RipSession, RipStreamError> {
		let stale = self.events.queue().clear();
		if stale != 0 {
			Msg::warning(format!(
				"Discarded {} from a previous track.",
				stale.nice_inflect("stale frame", "stale frames"),
			)).eprint();
		}
		self.events.signals().clear_end_of_track();

		let sink = EncoderSink::open(dst, &self.opts)?;
		self.events.signals().set_ripping();

		let _res = self.progress.reset(expected_frames(track));
		set_progress_title(self.progress, idx, "Ripping…");
		Ok(RipSession::new(sink))
	}

	/// # Play and Drain.
	fn play_and_drain(&mut self, rip: &mut RipSession) -> Result<(), RipStreamError> {
		self.session.play(true)?;
		self.transition(TrackState::Draining);
		self.drain(rip)
	}

	/// # Drain.
	///
	/// Pull frames off the queue and into the sink until the session says the
	/// track is over and the queue has been emptied, or something cancels the
	/// rip.
	///
	/// Playback is paused as soon as the end of the track is signaled; the
	/// leftovers are still written.
	///
	/// ## Errors
	///
	/// This will return an error if the sink can't be written to, or if too
	/// many back-to-back dequeues come up empty.
	fn drain(&mut self, rip: &mut RipSession) -> Result<(), RipStreamError> {
		let events = self.events.clone();
		let signals = events.signals();
		let queue = events.queue();
		let timeout = self.opts.timeout();
		let mut stall = StallWatch::new(self.opts.stall());
		let mut stopped = false;

		loop {
			if signals.end_of_track() {
				if ! stopped {
					self.pause();
					stopped = true;
				}
				if queue.is_empty() { break; }
			}
			if self.cancelled() { break; }

			let Some(frame) = queue.dequeue(timeout) else {
				if stall.miss() { return Err(RipStreamError::StallTimeout); }
				continue;
			};
			stall.hit();

			if self.cancelled() { break; }
			if signals.ripping() {
				rip.write(&frame)?;
				self.progress.increment_n(frame.frames());
			}
		}

		Ok(())
	}

	/// # Finish.
	///
	/// Close the sink and tag the result, returning the encoder's exit code
	/// if it was non-zero.
	fn finish(&mut self, idx: usize, track: &Track, dst: &Path, rip: RipSession)
	-> Result<Option<i32>, RipStreamError> {
		self.events.signals().clear_ripping();
		let (start, frames, bytes) = (rip.start, rip.frames, rip.bytes);
		let status = rip.close()?;

		// A grumpy encoder is worth mentioning, but the file stays.
		let code = status.filter(|s| ! s.success()).map(|s| s.code().unwrap_or(-1));
		if let Some(code) = code {
			Msg::warning(RipStreamError::EncoderExit(code).to_string()).eprint();
		}

		if let Err(e) = self.tagger.tag(dst, track, idx) {
			Msg::warning(format!("Unable to tag {}: {e}", dst.display())).eprint();
		}

		Msg::custom("Ripped", 10, &format!(
			"{} ({} frames, {} bytes) in {}.",
			dst.display(),
			NiceU64::from(frames),
			NiceU64::from(bytes),
			NiceElapsed::from(start),
		)).eprint();

		Ok(code)
	}
}

impl<S: Session> Ripper<'_, S> {
	/// # Transition.
	fn transition(&mut self, next: TrackState) {
		debug_assert!(
			self.state.can_transition(next),
			"Invalid track transition: {} → {}.",
			self.state.as_str(),
			next.as_str(),
		);
		self.state = next;
	}

	/// # Pause Playback.
	///
	/// Failures are ignored; there's nothing else to be done about them.
	fn pause(&mut self) { let _res = self.session.play(false); }

	/// # Cancelled?
	///
	/// Returns `true` if the current track should be abandoned. A pending
	/// CTRL-C is promoted to an abort here.
	fn cancelled(&self) -> bool {
		let signals = self.events.signals();
		if self.killed.killed() { signals.abort_rip(); }
		signals.cancelled()
	}

	/// # Halted?
	///
	/// Returns `true` if the run as a whole should stop.
	fn halted(&self) -> bool {
		let signals = self.events.signals();
		if self.killed.killed() { signals.abort_rip(); }
		signals.abort() || ! signals.keep_going()
	}

	/// # Destination.
	fn dst(&self, track: &Track) -> PathBuf {
		self.dir.join(format!("{}.{}", track.file_stem(), self.opts.format().extension()))
	}

	/// # Print Total.
	fn print_total(&self, tracks: &[Track]) {
		let total: u64 = tracks.iter()
			.filter(|t| ! t.is_local())
			.filter_map(|t| expected_size(t, &self.opts))
			.sum();

		if total == 0 {
			Msg::custom("Queued", 199, &tracks.len().nice_inflect("track", "tracks").to_string())
				.eprint();
		}
		else {
			Msg::custom("Queued", 199, &format!(
				"{} (about {} bytes).",
				tracks.len().nice_inflect("track", "tracks"),
				NiceU64::from(total),
			)).eprint();
		}
	}

	/// # Clean Up.
	///
	/// This always runs at the end, however the run went.
	fn cleanup(&mut self) {
		self.pause();
		let _res = self.events.queue().clear();
		self.session.logout();
		if let Err(e) = self.post.finish() { Msg::from(e).eprint(); }
		self.log.flush();
	}
}



#[derive(Debug, Clone, Copy)]
/// # Stall Watch.
///
/// This counts back-to-back empty dequeues; any delivery resets it.
struct StallWatch {
	limit: u16,
	misses: u16,
}

impl StallWatch {
	/// # New.
	const fn new(limit: u16) -> Self { Self { limit, misses: 0 } }

	/// # Miss.
	///
	/// Record an empty dequeue, returning `true` if that makes a stall.
	fn miss(&mut self) -> bool {
		self.misses = self.misses.saturating_add(1);
		self.limit <= self.misses
	}

	/// # Hit.
	fn hit(&mut self) { self.misses = 0; }
}



/// # Rip Session.
///
/// The open sink for the track currently being ripped, along with a few
/// running totals.
struct RipSession {
	sink: EncoderSink,
	start: Instant,
	frames: u64,
	bytes: u64,
}

impl RipSession {
	/// # New.
	fn new(sink: EncoderSink) -> Self {
		Self {
			sink,
			start: Instant::now(),
			frames: 0,
			bytes: 0,
		}
	}

	/// # Write.
	fn write(&mut self, frame: &Frame) -> Result<(), RipStreamError> {
		self.sink.write(frame)?;
		self.frames += u64::from(frame.frames());
		self.bytes += frame.len() as u64;
		Ok(())
	}

	/// # Close.
	///
	/// If the sink can't be closed cleanly, its files are removed.
	fn close(self) -> Result<Option<ExitStatus>, RipStreamError> {
		let files = self.sink.files().to_vec();
		self.sink.close().map_err(|e| {
			for file in files {
				if file.exists() { let _res = std::fs::remove_file(file); }
			}
			e
		})
	}

	/// # Discard.
	fn discard(self) { self.sink.discard(); }
}



#[derive(Debug, Clone, Default)]
/// # Rip Report.
///
/// The outcome of each track attempted during a run, in order.
pub struct RipReport {
	tracks: Vec<(String, TrackOutcome)>,
	aborted: bool,
}

impl RipReport {
	/// # Push.
	fn push(&mut self, uri: &str, outcome: TrackOutcome) {
		self.tracks.push((uri.to_owned(), outcome));
	}

	#[must_use]
	/// # Tracks.
	pub fn tracks(&self) -> &[(String, TrackOutcome)] { &self.tracks }

	#[must_use]
	/// # Length.
	pub fn len(&self) -> usize { self.tracks.len() }

	#[must_use]
	/// # Is Empty?
	pub fn is_empty(&self) -> bool { self.tracks.is_empty() }

	#[must_use]
	/// # Aborted?
	pub const fn aborted(&self) -> bool { self.aborted }

	#[must_use]
	/// # Ripped Count.
	pub fn ripped(&self) -> usize {
		self.tracks.iter().filter(|(_, o)| matches!(o, TrackOutcome::Done(..))).count()
	}

	#[must_use]
	/// # Failure Count.
	///
	/// This includes skipped and aborted tracks.
	pub fn failed(&self) -> usize {
		self.tracks.iter().filter(|(_, o)| ! o.is_success()).count()
	}
}



/// # Expected Frames.
///
/// This is just for the progress bar, so doesn't need to be exact.
fn expected_frames(track: &Track) -> u32 {
	let ms = u64::try_from(track.duration().as_millis()).unwrap_or(u64::MAX);
	let frames = ms.saturating_mul(u64::from(SAMPLE_RATE)).wrapping_div(1000);
	u32::try_from(frames).unwrap_or(u32::MAX).max(1)
}

/// # Set Progress Title.
fn set_progress_title(progress: &Progless, idx: usize, msg: &str) {
	progress.set_title(Some(Msg::custom(
		format!("Track {:02}", idx + 1).as_str(),
		199,
		msg,
	)));
}
