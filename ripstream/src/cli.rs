/*!
# Rip Stream: CLI
*/

use argyle::Argument;
use dactyl::traits::BytesToUnsigned;
use ripstream_core::{
	OutputFormat,
	PartialCheck,
	ResumeAt,
	RipOptions,
	RipStreamError,
	TimeOfDay,
};
use std::{
	ffi::OsString,
	path::PathBuf,
	str::FromStr,
	time::Duration,
};



/// # Options Return Type.
///
/// The options, output directory, failure log, playlist, and URIs.
pub(super) type Parsed = (
	RipOptions,
	PathBuf,
	Option<PathBuf>,
	Option<PathBuf>,
	Vec<String>,
);



/// # Parse Options.
pub(super) fn parse() -> Result<Parsed, RipStreamError> {
	let args = argyle::args()
		.with_keywords(include!(concat!(env!("OUT_DIR"), "/argyle.rs")));

	let mut opts = RipOptions::default();
	let mut dir = None;
	let mut fail_log = None;
	let mut playlist = None;
	let mut uris = Vec::new();
	for arg in args {
		match arg {
			Argument::Key("--cbr") => { opts = opts.with_cbr(true); },
			Argument::Key("-h" | "--help") => return Err(RipStreamError::PrintHelp),
			Argument::Key("--overwrite") => { opts = opts.with_overwrite(true); },
			Argument::Key("--plus-pcm") => { opts = opts.with_plus_pcm(true); },
			Argument::Key("--plus-wav") => { opts = opts.with_plus_wav(true); },
			Argument::Key("-v" | "--verbose") => { opts = opts.with_verbose(true); },
			Argument::Key("-V" | "--version") => return Err(RipStreamError::PrintVersion),

			Argument::KeyWithValue("-b" | "--bitrate", s) => {
				let s = u16::btou(s.trim().as_bytes())
					.ok_or(RipStreamError::CliParse("-b/--bitrate"))?;
				opts = opts.with_bitrate(s);
			},
			Argument::KeyWithValue("--comp", s) => {
				let s = u8::btou(s.trim().as_bytes())
					.ok_or(RipStreamError::CliParse("--comp"))?;
				opts = opts.with_comp(s);
			},
			Argument::KeyWithValue("-d" | "--dir" | "--directory", s) => {
				dir.replace(PathBuf::from(s));
			},
			Argument::KeyWithValue("--fail-log", s) => { fail_log.replace(PathBuf::from(s)); },
			Argument::KeyWithValue("-f" | "--format", s) => {
				let s = OutputFormat::from_str(&s)
					.ok_or(RipStreamError::CliParse("-f/--format"))?;
				opts = opts.with_format(s);
			},
			Argument::KeyWithValue("--partial-check", s) => {
				let s = PartialCheck::from_str(&s)
					.ok_or(RipStreamError::CliParse("--partial-check"))?;
				opts = opts.with_partial_check(s);
			},
			Argument::KeyWithValue("--play-token-resume", s) => {
				let s = ResumeAt::from_str(&s)
					.map_err(|_| RipStreamError::CliParse("--play-token-resume"))?;
				opts = opts.with_play_token_resume(Some(s));
			},
			Argument::KeyWithValue("--playlist-m3u", s) => { playlist.replace(PathBuf::from(s)); },
			Argument::KeyWithValue("--queue", s) => {
				let s = u32::btou(s.trim().as_bytes())
					.ok_or(RipStreamError::CliParse("--queue"))?;
				opts = opts.with_queue(s);
			},
			Argument::KeyWithValue("--resume-after", s) => {
				let s = TimeOfDay::from_str(&s)
					.map_err(|_| RipStreamError::CliParse("--resume-after"))?;
				opts = opts.with_resume_after(Some(s));
			},
			Argument::KeyWithValue("--stall", s) => {
				let s = u16::btou(s.trim().as_bytes())
					.ok_or(RipStreamError::CliParse("--stall"))?;
				opts = opts.with_stall(s);
			},
			Argument::KeyWithValue("--stereo-mode", s) => {
				opts = opts.with_stereo_mode(Some(parse_stereo_mode(&s)?));
			},
			Argument::KeyWithValue("--stop-after", s) => {
				let s = TimeOfDay::from_str(&s)
					.map_err(|_| RipStreamError::CliParse("--stop-after"))?;
				opts = opts.with_stop_after(Some(s));
			},
			Argument::KeyWithValue("--timeout", s) => {
				let s = u64::btou(s.trim().as_bytes())
					.ok_or(RipStreamError::CliParse("--timeout"))?;
				opts = opts.with_load_timeout(Duration::from_secs(s.max(1)));
			},
			Argument::KeyWithValue("--vbr", s) => {
				let s = u16::btou(s.trim().as_bytes())
					.ok_or(RipStreamError::CliParse("--vbr"))?;
				opts = opts.with_vbr(s);
			},

			// Anything else is a URI.
			Argument::Other(s) => { push_uri(&mut uris, s)?; },
			Argument::InvalidUtf8(s) => {
				return Err(RipStreamError::CliArg(s.to_string_lossy().into_owned()));
			},
			Argument::End(v) => {
				for s in v { push_uri(&mut uris, os_uri(s)?)?; }
			},

			_ => {},
		}
	}

	// Resume-after without stop-after doesn't mean anything.
	if opts.resume_after().is_some() && opts.stop_after().is_none() {
		return Err(RipStreamError::CliArg("--resume-after requires --stop-after".to_owned()));
	}

	if uris.is_empty() { return Err(RipStreamError::Noop); }

	let dir = match dir {
		Some(d) => d,
		None => std::env::current_dir()
			.map_err(|_| RipStreamError::CliParse("-d/--directory"))?,
	};

	Ok((opts, dir, fail_log, playlist, uris))
}



/// # Push URI.
///
/// Stray options are more likely typos than files, so are rejected.
fn push_uri(uris: &mut Vec<String>, uri: String) -> Result<(), RipStreamError> {
	let trimmed = uri.trim();
	if trimmed.starts_with('-') { return Err(RipStreamError::CliArg(uri)); }
	if ! trimmed.is_empty() && ! uris.iter().any(|u| u == trimmed) {
		uris.push(trimmed.to_owned());
	}
	Ok(())
}

/// # OS URI.
///
/// Arguments after the `--` terminator come through raw; they still need to
/// be valid UTF-8.
fn os_uri(src: OsString) -> Result<String, RipStreamError> {
	src.into_string()
		.map_err(|s| RipStreamError::CliArg(s.to_string_lossy().into_owned()))
}

/// # Parse Stereo Mode.
fn parse_stereo_mode(src: &str) -> Result<char, RipStreamError> {
	let mut chars = src.trim().chars();
	match (chars.next(), chars.next()) {
		(Some(c @ ('j' | 's' | 'f' | 'd' | 'm')), None) => Ok(c),
		_ => Err(RipStreamError::CliParse("--stereo-mode")),
	}
}



#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn t_stereo_mode() {
		for c in ['j', 's', 'f', 'd', 'm'] {
			assert_eq!(parse_stereo_mode(&c.to_string()), Ok(c));
		}
		assert!(parse_stereo_mode("x").is_err());
		assert!(parse_stereo_mode("js").is_err());
		assert!(parse_stereo_mode("").is_err());
	}

	#[test]
	fn t_push_uri() {
		let mut uris = Vec::new();
		push_uri(&mut uris, " a.wav ".to_owned()).expect("Push failed.");
		push_uri(&mut uris, "a.wav".to_owned()).expect("Push failed.");
		push_uri(&mut uris, String::new()).expect("Push failed.");
		assert_eq!(uris, ["a.wav"], "Duplicates and blanks should be ignored.");
		assert!(push_uri(&mut uris, "--nope".to_owned()).is_err());
	}

	#[test]
	fn t_os_uri() {
		assert_eq!(os_uri(OsString::from("b.wav")), Ok("b.wav".to_owned()));

		#[cfg(unix)]
		{
			use std::os::unix::ffi::OsStringExt;
			let bad = OsString::from_vec(vec![b'a', 0xFF, b'.', b'w', b'a', b'v']);
			assert!(
				matches!(os_uri(bad), Err(RipStreamError::CliArg(_))),
				"Invalid UTF-8 should be rejected.",
			);
		}
	}
}
