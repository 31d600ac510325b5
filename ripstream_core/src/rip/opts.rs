/*!
# Rip Stream: Ripping Options
*/

use crate::{
	OutputFormat,
	ResumeAt,
	TimeOfDay,
};
use std::time::Duration;



/// # FLAG: Constant Bitrate.
const FLAG_CBR: u8 =       0b0000_0001;

/// # FLAG: Overwrite Existing Files.
const FLAG_OVERWRITE: u8 = 0b0000_0010;

/// # FLAG: Extra PCM Copy.
const FLAG_PLUS_PCM: u8 =  0b0000_0100;

/// # FLAG: Extra WAV Copy.
const FLAG_PLUS_WAV: u8 =  0b0000_1000;

/// # FLAG: Verbose Logging.
const FLAG_VERBOSE: u8 =   0b0001_0000;

/// # FLAG: Default.
const FLAG_DEFAULT: u8 = 0;

/// # Minimum Bitrate (kb/s).
const BITRATE_MIN: u16 = 8;

/// # Maximum Bitrate (kb/s).
const BITRATE_MAX: u16 = 640;

/// # Maximum Compression Level.
const COMP_MAX: u8 = 10;

/// # Default Queue Capacity.
const QUEUE_DEFAULT: u32 = 2048;

/// # Default Stall Limit.
const STALL_DEFAULT: u16 = 60;

/// # Minimum Dequeue Timeout.
const TIMEOUT_MIN: Duration = Duration::from_millis(1);



#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
/// # Partial File Check.
///
/// This determines how much scrutiny an existing output file receives before
/// it is considered complete (and skipped).
pub enum PartialCheck {
	/// # Never Partial.
	None,

	/// # Empty-ish Files Only.
	Weak,

	#[default]
	/// # Compare Against the Expected Size.
	///
	/// When the expected size can't be predicted, this falls back to `Weak`.
	Strict,
}

impl PartialCheck {
	#[must_use]
	/// # From Str.
	pub fn from_str(src: &str) -> Option<Self> {
		match src.trim() {
			"none" => Some(Self::None),
			"weak" => Some(Self::Weak),
			"strict" => Some(Self::Strict),
			_ => None,
		}
	}

	#[must_use]
	/// # As Str.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::None => "none",
			Self::Weak => "weak",
			Self::Strict => "strict",
		}
	}
}



#[derive(Debug, Clone, Copy)]
/// # Rip Options.
///
/// This struct holds the rip-related options: output format, encoder
/// settings, scheduling, and the pipeline's tuning knobs.
///
/// Options are set using builder-style methods, like:
///
/// ```
/// use ripstream_core::{OutputFormat, RipOptions};
///
/// let opts = RipOptions::default()
///     .with_format(OutputFormat::Ogg)
///     .with_cbr(true)
///     .with_bitrate(192);
///
/// assert_eq!(opts.format(), OutputFormat::Ogg);
/// assert_eq!(opts.bitrate(), 192);
/// assert!(opts.cbr());
/// ```
///
/// Once built, the options never change over the course of a run.
pub struct RipOptions {
	format: OutputFormat,
	bitrate: u16,
	vbr: u16,
	comp: u8,
	stereo_mode: Option<char>,
	partial: PartialCheck,
	stop_after: Option<TimeOfDay>,
	resume_after: Option<TimeOfDay>,
	play_token_resume: Option<ResumeAt>,
	queue: u32,
	timeout: Duration,
	stall: u16,
	load_timeout: Duration,
	flags: u8,
}

impl Default for RipOptions {
	fn default() -> Self {
		Self {
			format: OutputFormat::default(),
			bitrate: 320,
			vbr: 0,
			comp: COMP_MAX,
			stereo_mode: None,
			partial: PartialCheck::default(),
			stop_after: None,
			resume_after: None,
			play_token_resume: None,
			queue: QUEUE_DEFAULT,
			timeout: Duration::from_secs(1),
			stall: STALL_DEFAULT,
			load_timeout: Duration::from_secs(10),
			flags: FLAG_DEFAULT,
		}
	}
}

macro_rules! with_flag {
	($fn:ident, $flag:ident, $($doc:literal),+ $(,)?) => (
		#[must_use]
		$(
			#[doc = $doc]
		)+
		pub const fn $fn(self, v: bool) -> Self {
			let flags =
				if v { self.flags | $flag }
				else { self.flags & ! $flag };

			Self {
				flags,
				..self
			}
		}
	)
}

/// ## Setters.
impl RipOptions {
	#[must_use]
	/// # Bitrate.
	///
	/// The constant bitrate to encode lossy formats at, in kb/s. This is also
	/// used to estimate file sizes when checking for partial files.
	///
	/// Values are capped to `8..=640`, with a default of `320`.
	pub const fn with_bitrate(self, mut bitrate: u16) -> Self {
		if bitrate < BITRATE_MIN { bitrate = BITRATE_MIN; }
		else if BITRATE_MAX < bitrate { bitrate = BITRATE_MAX; }
		Self {
			bitrate,
			..self
		}
	}

	with_flag!(
		with_cbr,
		FLAG_CBR,
		"# Constant Bitrate.",
		"",
		"When `true`, lossy formats are encoded at the constant bitrate set by",
		"`with_bitrate`. When `false`, the VBR quality is used instead.",
		"",
		"The default is `false`.",
	);

	#[must_use]
	/// # Compression Level.
	///
	/// This is passed to the flac and opus encoders. Flac tops out at eight, so
	/// will receive the lesser of the two.
	///
	/// Values are capped to `0..=10`, with a default of `10`.
	pub const fn with_comp(self, mut comp: u8) -> Self {
		if COMP_MAX < comp { comp = COMP_MAX; }
		Self {
			comp,
			..self
		}
	}

	#[must_use]
	/// # Output Format.
	pub const fn with_format(self, format: OutputFormat) -> Self {
		Self {
			format,
			..self
		}
	}

	#[must_use]
	/// # Load Timeout.
	///
	/// How long to wait for the session to load each track.
	///
	/// The default is ten seconds.
	pub const fn with_load_timeout(self, load_timeout: Duration) -> Self {
		Self {
			load_timeout,
			..self
		}
	}

	with_flag!(
		with_overwrite,
		FLAG_OVERWRITE,
		"# Overwrite Existing Files.",
		"",
		"When `true`, tracks are ripped even if their output file already exists.",
		"When `false`, complete files are left alone and their tracks skipped.",
		"",
		"The default is `false`.",
	);

	#[must_use]
	/// # Partial Check.
	pub const fn with_partial_check(self, partial: PartialCheck) -> Self {
		Self {
			partial,
			..self
		}
	}

	#[must_use]
	/// # Play Token Resume.
	///
	/// If the session's play token is lost (i.e. the account started playing
	/// somewhere else), wait until this time and retry the track, rather than
	/// aborting the run.
	pub const fn with_play_token_resume(self, play_token_resume: Option<ResumeAt>) -> Self {
		Self {
			play_token_resume,
			..self
		}
	}

	with_flag!(
		with_plus_pcm,
		FLAG_PLUS_PCM,
		"# Also Save Raw PCM.",
		"",
		"When `true`, a `.pcm` copy is written alongside the main output.",
		"",
		"The default is `false`.",
	);

	with_flag!(
		with_plus_wav,
		FLAG_PLUS_WAV,
		"# Also Save WAV.",
		"",
		"When `true`, a `.wav` copy is written alongside the main output.",
		"",
		"The default is `false`.",
	);

	#[must_use]
	/// # Queue Capacity.
	///
	/// The maximum number of delivered-but-unripped frames to hold. Frames
	/// delivered while the queue is full are dropped.
	///
	/// The minimum is `1`; the default is `2048`.
	pub const fn with_queue(self, mut queue: u32) -> Self {
		if queue == 0 { queue = 1; }
		Self {
			queue,
			..self
		}
	}

	#[must_use]
	/// # Resume After.
	///
	/// Resume ripping at this time of day after a `stop_after` stop. Without
	/// it, reaching the stop time aborts the run.
	pub const fn with_resume_after(self, resume_after: Option<TimeOfDay>) -> Self {
		Self {
			resume_after,
			..self
		}
	}

	#[must_use]
	/// # Stall Limit.
	///
	/// Give up on a track after this many back-to-back dequeue timeouts
	/// without an end-of-track.
	///
	/// The minimum is `1`; the default is `60`.
	pub const fn with_stall(self, mut stall: u16) -> Self {
		if stall == 0 { stall = 1; }
		Self {
			stall,
			..self
		}
	}

	#[must_use]
	/// # Stereo Mode.
	///
	/// This is passed through to lame when encoding MP3s. Only `j`, `s`, `f`,
	/// `d`, and `m` are accepted; anything else clears the setting.
	pub const fn with_stereo_mode(self, mode: Option<char>) -> Self {
		let stereo_mode = match mode {
			Some(c @ ('j' | 's' | 'f' | 'd' | 'm')) => Some(c),
			_ => None,
		};
		Self {
			stereo_mode,
			..self
		}
	}

	#[must_use]
	/// # Stop After.
	///
	/// Stop ripping once this time of day is reached.
	pub const fn with_stop_after(self, stop_after: Option<TimeOfDay>) -> Self {
		Self {
			stop_after,
			..self
		}
	}

	#[must_use]
	/// # Dequeue Timeout.
	///
	/// How long the ripping loop waits for each frame. Together with the stall
	/// limit, this determines how long a silent session is tolerated.
	///
	/// The default is one second.
	pub const fn with_timeout(self, mut timeout: Duration) -> Self {
		if timeout.as_nanos() < TIMEOUT_MIN.as_nanos() { timeout = TIMEOUT_MIN; }
		Self {
			timeout,
			..self
		}
	}

	with_flag!(
		with_verbose,
		FLAG_VERBOSE,
		"# Verbose.",
		"",
		"When `true`, a timestamped event log is printed to STDOUT at the end",
		"of the run.",
		"",
		"The default is `false`.",
	);

	#[must_use]
	/// # VBR Quality.
	///
	/// The quality setting passed to the encoder when not in CBR mode. What
	/// the number means varies by encoder.
	pub const fn with_vbr(self, vbr: u16) -> Self {
		Self {
			vbr,
			..self
		}
	}
}



macro_rules! get_flag {
	($fn:ident, $flag:ident, $title:literal) => (
		#[must_use]
		#[doc = concat!("# ", $title, "?")]
		pub const fn $fn(&self) -> bool { $flag == self.flags & $flag }
	);
}

/// # Getters.
impl RipOptions {
	get_flag!(cbr, FLAG_CBR, "Constant Bitrate");
	get_flag!(overwrite, FLAG_OVERWRITE, "Overwrite Existing Files");
	get_flag!(plus_pcm, FLAG_PLUS_PCM, "Also Save Raw PCM");
	get_flag!(plus_wav, FLAG_PLUS_WAV, "Also Save WAV");
	get_flag!(verbose, FLAG_VERBOSE, "Verbose");

	#[must_use]
	/// # Bitrate.
	pub const fn bitrate(&self) -> u16 { self.bitrate }

	#[must_use]
	/// # Compression Level.
	pub const fn comp(&self) -> u8 { self.comp }

	#[must_use]
	/// # Output Format.
	pub const fn format(&self) -> OutputFormat { self.format }

	#[must_use]
	/// # Load Timeout.
	pub const fn load_timeout(&self) -> Duration { self.load_timeout }

	#[must_use]
	/// # Partial Check.
	pub const fn partial_check(&self) -> PartialCheck { self.partial }

	#[must_use]
	/// # Play Token Resume.
	pub const fn play_token_resume(&self) -> Option<ResumeAt> { self.play_token_resume }

	#[must_use]
	/// # Queue Capacity.
	pub const fn queue(&self) -> u32 { self.queue }

	#[must_use]
	/// # Resume After.
	pub const fn resume_after(&self) -> Option<TimeOfDay> { self.resume_after }

	#[must_use]
	/// # Stall Limit.
	pub const fn stall(&self) -> u16 { self.stall }

	#[must_use]
	/// # Stereo Mode.
	pub const fn stereo_mode(&self) -> Option<char> { self.stereo_mode }

	#[must_use]
	/// # Stop After.
	pub const fn stop_after(&self) -> Option<TimeOfDay> { self.stop_after }

	#[must_use]
	/// # Dequeue Timeout.
	pub const fn timeout(&self) -> Duration { self.timeout }

	#[must_use]
	/// # VBR Quality.
	pub const fn vbr(&self) -> u16 { self.vbr }
}
