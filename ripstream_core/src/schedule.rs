/*!
# Rip Stream: Stop/Resume Scheduling
*/

use chrono::{
	DateTime,
	Days,
	Local,
	NaiveTime,
	TimeZone,
	Timelike,
};
use crate::{
	RipStreamError,
	Signals,
};
use fyi_msg::Msg;
use std::{
	fmt,
	str::FromStr,
	time::Duration,
};



/// # Poll Interval.
///
/// Waiting is done in coarse slices so an abort is noticed within a second.
const POLL: Duration = Duration::from_secs(1);



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Time of Day.
///
/// A local wall-clock `HH:MM`.
pub struct TimeOfDay(NaiveTime);

impl fmt::Display for TimeOfDay {
	#[inline]
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:02}:{:02}", self.0.hour(), self.0.minute())
	}
}

impl FromStr for TimeOfDay {
	type Err = RipStreamError;

	fn from_str(src: &str) -> Result<Self, Self::Err> {
		NaiveTime::parse_from_str(src.trim(), "%H:%M")
			.map(Self)
			.map_err(|_| RipStreamError::TimeOfDay(src.to_owned()))
	}
}

impl TimeOfDay {
	#[must_use]
	/// # New.
	///
	/// Returns `None` if the hour or minute is out of range.
	pub fn new(hour: u32, minute: u32) -> Option<Self> {
		NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
	}

	#[must_use]
	/// # Next Occurrence.
	///
	/// Return the first moment at this time of day strictly after `now`: later
	/// today, or else tomorrow.
	pub fn next_after(self, now: DateTime<Local>) -> DateTime<Local> {
		let today = now.date_naive().and_time(self.0);
		let naive =
			if now.naive_local() < today { today }
			else { today.checked_add_days(Days::new(1)).unwrap_or(today) };

		Local.from_local_datetime(&naive)
			.earliest()
			// Daylight savings gaps have no local equivalent; just wait an
			// extra hour.
			.or_else(|| Local.from_local_datetime(&(naive + chrono::Duration::hours(1))).earliest())
			.unwrap_or(now)
	}
}



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Resume Time.
///
/// Either a wall-clock time or a delay relative to when the wait begins.
pub enum ResumeAt {
	/// # At a Time of Day.
	At(TimeOfDay),

	/// # After a Delay.
	After(Duration),
}

impl fmt::Display for ResumeAt {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::At(t) => write!(f, "{t}"),
			Self::After(d) => write!(f, "{}s", d.as_secs()),
		}
	}
}

impl FromStr for ResumeAt {
	type Err = RipStreamError;

	/// # Parse.
	///
	/// Times look like `HH:MM`; delays are a number with an optional `s`, `m`,
	/// or `h` suffix, e.g. `90s`, `15m`, `2h`. A bare number is seconds.
	fn from_str(src: &str) -> Result<Self, Self::Err> {
		let src = src.trim();
		if src.contains(':') { return TimeOfDay::from_str(src).map(Self::At); }

		let (num, mul) = match src.as_bytes().last() {
			Some(b's' | b'S') => (&src[..src.len() - 1], 1),
			Some(b'm' | b'M') => (&src[..src.len() - 1], 60),
			Some(b'h' | b'H') => (&src[..src.len() - 1], 3600),
			_ => (src, 1),
		};

		num.trim().parse::<u64>().ok()
			.and_then(|n| n.checked_mul(mul))
			.map(|n| Self::After(Duration::from_secs(n)))
			.ok_or_else(|| RipStreamError::TimeOfDay(src.to_owned()))
	}
}

impl ResumeAt {
	#[must_use]
	/// # Resolve.
	///
	/// Turn the value into an actual timestamp relative to `now`.
	pub fn resolve(self, now: DateTime<Local>) -> DateTime<Local> {
		match self {
			Self::At(t) => t.next_after(now),
			Self::After(d) => chrono::Duration::from_std(d).ok()
				.and_then(|d| now.checked_add_signed(d))
				.unwrap_or(now),
		}
	}
}



#[derive(Debug, Clone, Copy, Default)]
/// # Stop/Resume Scheduler.
///
/// This is checked by the ripping loop before each track. It handles two
/// kinds of pauses:
///
/// * A `stop_after` time of day, after which ripping either aborts or, if
///   `resume_after` is set, sleeps until then;
/// * A lost play token, which sleeps until the `play_token_resume` time.
///
/// All waiting happens on the calling (ripping) thread.
pub struct StopScheduler {
	stop_after: Option<TimeOfDay>,
	resume_after: Option<TimeOfDay>,
	play_token_resume: Option<ResumeAt>,
	stop_time: Option<DateTime<Local>>,
}

impl StopScheduler {
	#[must_use]
	/// # New.
	pub const fn new(
		stop_after: Option<TimeOfDay>,
		resume_after: Option<TimeOfDay>,
		play_token_resume: Option<ResumeAt>,
	) -> Self {
		Self {
			stop_after,
			resume_after,
			play_token_resume,
			stop_time: None,
		}
	}

	#[must_use]
	/// # Stop Time.
	///
	/// Return the computed stop time, if any.
	pub const fn stop_time(&self) -> Option<DateTime<Local>> { self.stop_time }

	/// # Check.
	///
	/// Pause or abort as needed. Returns `true` if any waiting happened.
	pub fn check(&mut self, signals: &Signals) -> bool {
		self.check_at(Local::now(), signals)
	}

	/// # Check (at a Specific Time).
	fn check_at(&mut self, now: DateTime<Local>, signals: &Signals) -> bool {
		let mut waited = false;

		if let Some(stop_after) = self.stop_after {
			let stop_time = *self.stop_time.get_or_insert_with(|| {
				let out = stop_after.next_after(now);
				Msg::custom("Schedule", 11, &format!(
					"Ripping will stop after {}.",
					out.format("%H:%M"),
				)).eprint();
				out
			});

			if stop_time <= now {
				Msg::custom("Schedule", 11, &format!(
					"The stop time of {} has been reached.",
					stop_time.format("%H:%M"),
				)).eprint();

				if let Some(resume) = self.resume_after {
					let resume = resume.next_after(now);
					Msg::custom("Schedule", 11, &format!(
						"Ripping will resume at {}.",
						resume.format("%H:%M"),
					)).eprint();
					wait_until(resume, signals);
					waited = true;

					// Recalculate next time.
					self.stop_time = None;
				}
				else { signals.set_abort(); }
			}
		}

		// The play token has to be considered separately.
		if signals.play_token_resume() {
			if let Some(resume) = self.play_token_resume {
				let resume = resume.resolve(now);
				Msg::custom("Schedule", 11, &format!(
					"Ripping will resume at {}.",
					resume.format("%H:%M:%S"),
				)).eprint();
				wait_until(resume, signals);
				waited = true;
			}
			signals.clear_play_token_resume();
		}

		waited
	}
}



/// # Wait Until.
///
/// Sleep until `when`, or until an abort is requested, whichever comes first.
fn wait_until(when: DateTime<Local>, signals: &Signals) {
	while ! signals.abort() {
		let Ok(remaining) = (when - Local::now()).to_std() else { break; };
		if remaining.is_zero() { break; }
		std::thread::sleep(remaining.min(POLL));
	}
}



#[cfg(test)]
mod test {
	use super::*;
	use std::time::Instant;

	#[test]
	fn t_time_of_day() {
		let t: TimeOfDay = "07:05".parse().expect("Failed to parse 07:05.");
		assert_eq!(t, TimeOfDay::new(7, 5).expect("Invalid time."));
		assert_eq!(t.to_string(), "07:05");

		for bad in ["", "7", "25:00", "12:60", "noon"] {
			assert!(bad.parse::<TimeOfDay>().is_err(), "{bad:?} should not parse.");
		}
	}

	#[test]
	fn t_next_after() {
		let now = Local::now();
		let in_a_minute = now + chrono::Duration::minutes(2);
		let t = TimeOfDay::new(in_a_minute.hour(), in_a_minute.minute())
			.expect("Invalid time.");
		let next = t.next_after(now);
		assert!(now < next, "The next occurrence must be in the future.");
		assert!(next - now <= chrono::Duration::days(1), "The next occurrence is too far away.");

		// The current minute has already started, so it must roll over.
		let t = TimeOfDay::new(now.hour(), now.minute()).expect("Invalid time.");
		let next = t.next_after(now);
		assert!(chrono::Duration::hours(22) < next - now, "Expected tomorrow.");
	}

	#[test]
	fn t_resume_at() {
		for (raw, expected) in [
			("30", Duration::from_secs(30)),
			("90s", Duration::from_secs(90)),
			("15m", Duration::from_secs(900)),
			("2h", Duration::from_secs(7200)),
		] {
			assert_eq!(
				raw.parse::<ResumeAt>(),
				Ok(ResumeAt::After(expected)),
				"Failed to parse {raw:?}.",
			);
		}

		assert_eq!(
			"23:15".parse::<ResumeAt>(),
			Ok(ResumeAt::At(TimeOfDay::new(23, 15).expect("Invalid time."))),
		);

		for bad in ["", "m", "-5s", "soon"] {
			assert!(bad.parse::<ResumeAt>().is_err(), "{bad:?} should not parse.");
		}

		let now = Local::now();
		assert_eq!(
			ResumeAt::After(Duration::from_secs(60)).resolve(now),
			now + chrono::Duration::seconds(60),
		);
	}

	#[test]
	fn t_stop_abort() {
		let signals = Signals::new();
		let now = Local::now();
		let t = TimeOfDay::new(now.hour(), now.minute()).expect("Invalid time.");
		let mut sched = StopScheduler::new(Some(t), None, None);

		// The first check schedules things but doesn't trigger.
		assert!(! sched.check_at(now, &signals));
		assert!(! signals.abort());
		let stop = sched.stop_time().expect("Missing stop time.");

		// Jump past the stop time.
		let later = stop + chrono::Duration::seconds(1);
		assert!(! sched.check_at(later, &signals));
		assert!(signals.abort(), "Passing the stop time should abort.");
	}

	#[test]
	fn t_stop_resume() {
		let signals = Signals::new();
		let now = Local::now();
		let t = TimeOfDay::new(now.hour(), now.minute()).expect("Invalid time.");
		let mut sched = StopScheduler::new(Some(t), Some(t), None);
		assert!(! sched.check_at(now, &signals));
		let stop = sched.stop_time().expect("Missing stop time.");

		// An abort short-circuits the (day-long) resume wait.
		signals.set_abort();
		let start = Instant::now();
		assert!(sched.check_at(stop + chrono::Duration::seconds(1), &signals));
		assert!(start.elapsed() < Duration::from_secs(5), "The wait should have been cut short.");
		assert!(sched.stop_time().is_none(), "The stop window should reset after resuming.");
	}

	#[test]
	fn t_play_token() {
		let signals = Signals::new();
		let mut sched = StopScheduler::new(None, None, Some(ResumeAt::After(Duration::ZERO)));

		// Nothing to do.
		assert!(! sched.check(&signals));

		// Now wait (for nothing).
		signals.set_play_token_resume();
		assert!(sched.check(&signals));
		assert!(! signals.play_token_resume(), "The latch should be cleared.");
		assert!(! signals.abort());

		// Without a resume time, the latch just gets cleared.
		let mut sched = StopScheduler::default();
		signals.set_play_token_resume();
		assert!(! sched.check(&signals));
		assert!(! signals.play_token_resume());
	}
}
