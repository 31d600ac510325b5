/*!
# Rip Stream: Output Formats
*/

use crate::RipOptions;
use std::{
	ffi::OsString,
	path::Path,
};



/// # Argument Builder.
///
/// Given the options and the destination, return the full encoder command,
/// program name first.
type ArgvFn = fn(&RipOptions, &Path) -> Vec<OsString>;



#[derive(Debug, Clone, Copy, Default, Eq, Hash, PartialEq)]
/// # Output Format.
pub enum OutputFormat {
	/// # AAC (faac).
	Aac,

	/// # AIFF (sox).
	Aiff,

	/// # ALAC in M4A (avconv).
	AlacM4a,

	/// # FLAC (flac).
	Flac,

	/// # AAC in M4A (fdkaac).
	M4a,

	#[default]
	/// # MP3 (lame).
	Mp3,

	/// # Ogg Vorbis (oggenc).
	Ogg,

	/// # Opus (opusenc).
	Opus,

	/// # Raw PCM.
	Pcm,

	/// # WAV.
	Wav,
}

impl OutputFormat {
	/// # All Formats.
	pub const ALL: [Self; 10] = [
		Self::Aac, Self::Aiff, Self::AlacM4a, Self::Flac, Self::M4a,
		Self::Mp3, Self::Ogg, Self::Opus, Self::Pcm, Self::Wav,
	];

	#[must_use]
	/// # From Str.
	pub fn from_str(src: &str) -> Option<Self> {
		let src = src.trim();
		Self::ALL.into_iter().find(|f| f.as_str().eq_ignore_ascii_case(src))
	}

	#[must_use]
	/// # As Str.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Aac => "aac",
			Self::Aiff => "aiff",
			Self::AlacM4a => "alac.m4a",
			Self::Flac => "flac",
			Self::M4a => "m4a",
			Self::Mp3 => "mp3",
			Self::Ogg => "ogg",
			Self::Opus => "opus",
			Self::Pcm => "pcm",
			Self::Wav => "wav",
		}
	}

	#[must_use]
	/// # File Extension.
	pub const fn extension(self) -> &'static str {
		match self {
			Self::AlacM4a => "m4a",
			_ => self.as_str(),
		}
	}

	#[must_use]
	/// # Is Lossy?
	pub const fn is_lossy(self) -> bool {
		matches!(self, Self::Aac | Self::M4a | Self::Mp3 | Self::Ogg | Self::Opus)
	}

	#[must_use]
	/// # Raw Byte Rate.
	///
	/// Formats that store the PCM untouched grow at a fixed rate, so their
	/// final size can be predicted exactly.
	pub const fn raw_byte_rate(self) -> Option<u32> {
		match self {
			Self::Aiff | Self::Pcm | Self::Wav => Some(crate::BYTES_PER_SECOND),
			_ => None,
		}
	}

	#[must_use]
	/// # Discard Encoder Output?
	///
	/// Some encoders are chatty no matter what.
	pub const fn quiet_stdio(self) -> bool { matches!(self, Self::Aac) }

	#[must_use]
	/// # Encoder Command.
	///
	/// Return the encoder command line for the format, or `None` if the format
	/// is written directly rather than piped through an encoder.
	pub fn encoder_argv(self, opts: &RipOptions, dst: &Path) -> Option<Vec<OsString>> {
		self.argv_fn().map(|cb| cb(opts, dst))
	}

	/// # Argument Builder.
	const fn argv_fn(self) -> Option<ArgvFn> {
		match self {
			Self::Aac => Some(argv_aac),
			Self::Aiff => Some(argv_aiff),
			Self::AlacM4a => Some(argv_alac),
			Self::Flac => Some(argv_flac),
			Self::M4a => Some(argv_m4a),
			Self::Mp3 => Some(argv_mp3),
			Self::Ogg => Some(argv_ogg),
			Self::Opus => Some(argv_opus),
			Self::Pcm | Self::Wav => None,
		}
	}
}



/// # Argv Helper.
///
/// Glue string-ish things and a trailing path together.
macro_rules! argv {
	($($v:expr),+ $(,)?) => (
		vec![$(OsString::from($v)),+]
	);
}

/// # AAC (faac).
fn argv_aac(opts: &RipOptions, dst: &Path) -> Vec<OsString> {
	let (k, v) =
		if opts.cbr() { ("-b", opts.bitrate()) }
		else { ("-q", opts.vbr()) };
	argv!["faac", "-P", "-X", k, v.to_string(), "-o", dst, "-"]
}

/// # AIFF (sox).
fn argv_aiff(_opts: &RipOptions, dst: &Path) -> Vec<OsString> {
	argv![
		"sox", "-q",
		"--endian", "little",
		"--channels", "2",
		"--bits", "16",
		"--rate", "44100",
		"--encoding", "signed-integer",
		"-t", "raw", "-",
		dst,
	]
}

/// # ALAC (avconv).
fn argv_alac(_opts: &RipOptions, dst: &Path) -> Vec<OsString> {
	argv![
		"avconv", "-nostats", "-loglevel", "0",
		"-f", "s16le", "-ar", "44100", "-ac", "2", "-channel_layout", "stereo",
		"-i", "-",
		"-acodec", "alac",
		dst,
	]
}

/// # FLAC (flac).
fn argv_flac(opts: &RipOptions, dst: &Path) -> Vec<OsString> {
	argv![
		"flac", "-f",
		format!("-{}", opts.comp().min(8)),
		"--silent",
		"--endian", "little",
		"--channels", "2",
		"--bps", "16",
		"--sample-rate", "44100",
		"--sign", "signed",
		"-o", dst,
		"-",
	]
}

/// # M4A (fdkaac).
fn argv_m4a(opts: &RipOptions, dst: &Path) -> Vec<OsString> {
	let (k, v) =
		if opts.cbr() { ("-b", opts.bitrate()) }
		else { ("-m", opts.vbr()) };
	argv!["fdkaac", "-S", "-R", k, v.to_string(), "-o", dst, "-"]
}

/// # MP3 (lame).
fn argv_mp3(opts: &RipOptions, dst: &Path) -> Vec<OsString> {
	let mut out = argv!["lame", "--silent"];
	if let Some(mode) = opts.stereo_mode() {
		out.extend(argv!["-m", mode.to_string()]);
	}
	if opts.cbr() {
		out.extend(argv!["--cbr", "-b", opts.bitrate().to_string()]);
	}
	else {
		out.extend(argv!["-V", opts.vbr().to_string()]);
	}
	out.extend(argv!["-h", "-r", "-", dst]);
	out
}

/// # Ogg Vorbis (oggenc).
fn argv_ogg(opts: &RipOptions, dst: &Path) -> Vec<OsString> {
	let (k, v) =
		if opts.cbr() { ("-b", opts.bitrate()) }
		else { ("-q", opts.vbr()) };
	argv!["oggenc", "--quiet", "--raw", k, v.to_string(), "-o", dst, "-"]
}

/// # Opus (opusenc).
///
/// Opus is efficient enough that half the nominal bitrate is about the same
/// quality.
fn argv_opus(opts: &RipOptions, dst: &Path) -> Vec<OsString> {
	let (mode, rate) =
		if opts.cbr() { ("--cvbr", opts.bitrate().wrapping_div(2)) }
		else { ("--vbr", opts.vbr()) };
	argv![
		"opusenc", "--quiet",
		"--comp", opts.comp().to_string(),
		mode,
		"--bitrate", rate.to_string(),
		"--raw", "--raw-rate", "44100",
		"-",
		dst,
	]
}



#[cfg(test)]
mod test {
	use super::*;

	/// # Stringify an Argv.
	fn joined(argv: &[OsString]) -> String {
		argv.iter()
			.map(|v| v.to_string_lossy().into_owned())
			.collect::<Vec<_>>()
			.join(" ")
	}

	#[test]
	fn t_from_str() {
		for f in OutputFormat::ALL {
			assert_eq!(OutputFormat::from_str(f.as_str()), Some(f));
		}
		assert_eq!(OutputFormat::from_str(" FLAC "), Some(OutputFormat::Flac));
		assert!(OutputFormat::from_str("wma").is_none());
		assert_eq!(OutputFormat::AlacM4a.extension(), "m4a");
	}

	#[test]
	fn t_no_encoder() {
		let opts = RipOptions::default();
		let dst = Path::new("/tmp/out.wav");
		assert!(OutputFormat::Wav.encoder_argv(&opts, dst).is_none());
		assert!(OutputFormat::Pcm.encoder_argv(&opts, dst).is_none());
		for f in OutputFormat::ALL {
			if ! matches!(f, OutputFormat::Wav | OutputFormat::Pcm) {
				let argv = f.encoder_argv(&opts, dst).expect("Missing encoder.");
				assert!(
					argv.iter().any(|v| v == dst.as_os_str()),
					"{} never mentions its destination.", f.as_str(),
				);
			}
		}
	}

	#[test]
	fn t_mp3() {
		let dst = Path::new("out.mp3");
		let opts = RipOptions::default().with_cbr(true).with_bitrate(320);
		assert_eq!(
			joined(&OutputFormat::Mp3.encoder_argv(&opts, dst).expect("Missing encoder.")),
			"lame --silent --cbr -b 320 -h -r - out.mp3",
		);

		let opts = opts.with_cbr(false).with_vbr(2).with_stereo_mode(Some('j'));
		assert_eq!(
			joined(&OutputFormat::Mp3.encoder_argv(&opts, dst).expect("Missing encoder.")),
			"lame --silent -m j -V 2 -h -r - out.mp3",
		);
	}

	#[test]
	fn t_flac() {
		let dst = Path::new("out.flac");
		let argv = OutputFormat::Flac.encoder_argv(&RipOptions::default(), dst)
			.expect("Missing encoder.");
		assert_eq!(argv[0], "flac");
		assert!(argv.iter().any(|v| v == "-8"), "Compression should be capped at 8.");

		let opts = RipOptions::default().with_comp(5);
		let argv = OutputFormat::Flac.encoder_argv(&opts, dst).expect("Missing encoder.");
		assert!(argv.iter().any(|v| v == "-5"));
	}

	#[test]
	fn t_opus() {
		let dst = Path::new("out.opus");
		let opts = RipOptions::default().with_cbr(true).with_bitrate(320);
		let argv = joined(&OutputFormat::Opus.encoder_argv(&opts, dst).expect("Missing encoder."));
		assert!(argv.contains("--cvbr --bitrate 160"), "Unexpected opus argv: {argv}");
	}
}
