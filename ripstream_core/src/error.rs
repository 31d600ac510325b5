/*!
# Rip Stream: Errors
*/

use fyi_msg::Msg;
use std::{
	error::Error,
	fmt,
};



#[cfg(feature = "bin")]
/// # Help Text.
const HELP: &str = concat!(r"
Rip Stream v", env!("CARGO_PKG_VERSION"), r"
Stream tracks from a session and encode them on the fly.

USAGE:
    ripstream [OPTIONS] <URI(s)>...

OUTPUT:
    -d, --directory <PATH>
                      Save the ripped tracks to this directory.
                      [default: the current working directory]
    -f, --format <FMT>
                      The output format: aac, aiff, alac.m4a, flac, m4a, mp3,
                      ogg, opus, pcm, or wav. [default: mp3]
        --overwrite   Re-rip tracks even if a complete file already exists.
        --partial-check <MODE>
                      How hard to look at existing files before deciding they
                      are complete: none, weak, or strict. [default: strict]
        --plus-pcm    Save a raw PCM copy alongside the encoded file.
        --plus-wav    Save a WAV copy alongside the encoded file.

ENCODING:
    -b, --bitrate <KBPS>
                      The CBR bitrate, in kb/s. [default: 320]
        --cbr         Encode lossy formats at a constant bitrate.
        --comp <NUM>  The compression level for flac and opus. [default: 10]
        --stereo-mode <MODE>
                      Pass a stereo mode through to lame (j, s, f, d, m).
        --vbr <NUM>   The VBR quality for lossy formats. [default: 0]

SCHEDULING:
        --play-token-resume <WHEN>
                      If playback is taken over by another device, wait and
                      then retry rather than aborting. The value is either a
                      time of day (HH:MM) or a delay (90s, 15m, 2h).
        --resume-after <HH:MM>
                      After a --stop-after stop, resume ripping at this time.
        --stop-after <HH:MM>
                      Stop ripping once this time of day is reached.

TUNING:
        --queue <NUM> The number of delivered frames to buffer.
                      [default: 2048]
        --stall <NUM> Give up on a track after this many seconds without any
                      audio. [default: 60]
        --timeout <SECS>
                      How long to wait for a track to load. [default: 10]

LOGGING:
        --fail-log <PATH>
                      Write the URIs of any failed tracks to this file.
        --playlist-m3u <PATH>
                      Write an M3U playlist of the ripped files to this path.

MISCELLANEOUS:
    -h, --help        Print help information to STDOUT and exit.
    -v, --verbose     Print a timestamped event log to STDOUT at the end of
                      the run.
    -V, --version     Print version information to STDOUT and exit.

EARLY EXIT:
    Press CTRL+C to abort. The track being ripped is discarded, and the failure
    log and summary are still written.
");



#[derive(Debug, Clone, Eq, PartialEq)]
/// # Errors.
pub enum RipStreamError {
	/// # Encoder spawn or pipe failure.
	Encoder(String),

	/// # Encoder exited with an error.
	EncoderExit(i32),

	/// # User Abort.
	Killed,

	/// # Login failed.
	Login,

	/// # Noop.
	Noop,

	/// # Unable to read a file.
	Read(String),

	/// # Session failure.
	Session(String),

	/// # Stalled delivery.
	StallTimeout,

	/// # Invalid time.
	TimeOfDay(String),

	/// # Track not available.
	TrackUnavailable,

	/// # Skipped by the user.
	UserSkip,

	/// # Writing to disk.
	Write(String),

	#[cfg(feature = "bin")]
	/// # Invalid CLI arg.
	CliArg(String),

	#[cfg(feature = "bin")]
	/// # CLI Parsing failure.
	CliParse(&'static str),

	#[cfg(feature = "bin")]
	/// # Print Help (Not an Error).
	PrintHelp,

	#[cfg(feature = "bin")]
	/// # Print Version (Not an Error).
	PrintVersion,
}

impl Error for RipStreamError {}

impl From<RipStreamError> for Msg {
	#[inline]
	fn from(src: RipStreamError) -> Self { Self::error(src.to_string()) }
}

impl fmt::Display for RipStreamError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Encoder(s) => write!(f, "Encoder failure: {s}."),
			Self::EncoderExit(n) => write!(f, "The encoder exited with error code {n}."),
			Self::Killed => f.write_str("User abort."),
			Self::Login => f.write_str("Unable to log in."),
			Self::Noop => f.write_str("There's nothing to do!"),
			Self::Read(s) => write!(f, "Unable to read {s}."),
			Self::Session(s) => write!(f, "Session error: {s}."),
			Self::StallTimeout => f.write_str("Timeout while ripping track."),
			Self::TimeOfDay(s) => write!(f, "Invalid time {s:?}; expected HH:MM."),
			Self::TrackUnavailable => f.write_str("Track is not available."),
			Self::UserSkip => f.write_str("User skipped track."),
			Self::Write(s) => write!(f, "Unable to write to {s}."),

			#[cfg(feature = "bin")]
			Self::CliArg(s) => write!(f, "Invalid CLI option: {s}"),

			#[cfg(feature = "bin")]
			Self::CliParse(s) => write!(f, "Unable to parse {s}."),

			#[cfg(feature = "bin")]
			Self::PrintHelp => f.write_str(HELP),

			#[cfg(feature = "bin")]
			Self::PrintVersion => f.write_str(concat!("Rip Stream v", env!("CARGO_PKG_VERSION"))),
		}
	}
}
