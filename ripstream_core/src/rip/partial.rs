/*!
# Rip Stream: Partial Files

A crash or abort mid-rip leaves a truncated file behind. These helpers spot
them so they can be re-ripped rather than mistaken for finished work.
*/

use crate::{
	OutputFormat,
	PartialCheck,
	RipOptions,
	Track,
};
use std::path::Path;



/// # Weak Threshold.
///
/// Files smaller than this are always considered partial (unless checking is
/// disabled).
const WEAK_MIN: u64 = 512;

/// # Tolerance (Numerator).
///
/// A file is complete if it is at least 9/10ths of the expected size.
const TOLERANCE_NUM: u64 = 9;

/// # Tolerance (Denominator).
const TOLERANCE_DEN: u64 = 10;



/// # Expected Size.
///
/// Estimate the final size of a track's output file, in bytes. This is only
/// possible for uncompressed formats and constant-bitrate lossy formats; for
/// everything else, `None` is returned.
pub(crate) fn expected_size(track: &Track, opts: &RipOptions) -> Option<u64> {
	let ms = u64::try_from(track.duration().as_millis()).ok()?;
	let format = opts.format();

	// Uncompressed audio is easy.
	if let Some(rate) = format.raw_byte_rate() {
		return u64::from(rate).checked_mul(ms).map(|v| v.wrapping_div(1000));
	}

	// Lossy CBR can be ballparked.
	if format.is_lossy() && opts.cbr() {
		let kbps =
			if matches!(format, OutputFormat::Opus) { opts.bitrate().wrapping_div(2) }
			else { opts.bitrate() };

		// kb/s × ms ÷ 8 = bytes.
		return u64::from(kbps).checked_mul(ms).map(|v| v.wrapping_div(8));
	}

	None
}

/// # Is Partial?
///
/// Returns `true` if the existing file at `path` looks like an interrupted
/// rip of `track`.
///
/// Unreadable files are treated as partial; better to redo the work than
/// trust something we can't even stat.
pub(crate) fn is_partial(path: &Path, track: &Track, opts: &RipOptions) -> bool {
	let check = opts.partial_check();
	if matches!(check, PartialCheck::None) { return false; }

	let Ok(size) = std::fs::metadata(path).map(|m| m.len()) else { return true; };
	match (check, expected_size(track, opts)) {
		(PartialCheck::Strict, Some(expected)) =>
			size.saturating_mul(TOLERANCE_DEN) < expected.saturating_mul(TOLERANCE_NUM),
		_ => size < WEAK_MIN,
	}
}



#[cfg(test)]
mod test {
	use super::*;
	use std::{
		fs::File,
		time::Duration,
	};

	/// # Sparse File.
	fn sparse(path: &Path, len: u64) {
		File::create(path)
			.and_then(|f| f.set_len(len))
			.expect("Unable to create test file.");
	}

	#[test]
	fn t_expected_size() {
		let track = Track::new("x:1", "Song", Duration::from_secs(200));

		// 320 kb/s for 200 seconds.
		let opts = RipOptions::default()
			.with_format(OutputFormat::Mp3)
			.with_cbr(true)
			.with_bitrate(320);
		assert_eq!(expected_size(&track, &opts), Some(8_000_000));

		// Opus gets half.
		let opts = opts.with_format(OutputFormat::Opus);
		assert_eq!(expected_size(&track, &opts), Some(4_000_000));

		// VBR can't be predicted.
		let opts = opts.with_format(OutputFormat::Mp3).with_cbr(false);
		assert_eq!(expected_size(&track, &opts), None);

		// Nor can FLAC.
		let opts = opts.with_format(OutputFormat::Flac).with_cbr(true);
		assert_eq!(expected_size(&track, &opts), None);

		// PCM is exact.
		let opts = opts.with_format(OutputFormat::Pcm);
		assert_eq!(expected_size(&track, &opts), Some(200 * 176_400));
	}

	#[test]
	fn t_is_partial() {
		let dir = tempfile::tempdir().expect("Tempdir failed.");
		let path = dir.path().join("song.mp3");
		let track = Track::new("x:1", "Song", Duration::from_secs(200));
		let opts = RipOptions::default()
			.with_format(OutputFormat::Mp3)
			.with_cbr(true)
			.with_bitrate(320);

		// Within tolerance.
		sparse(&path, 7_500_000);
		assert!(! is_partial(&path, &track, &opts), "7.5MB should be close enough.");

		// Too small.
		sparse(&path, 5_000_000);
		assert!(is_partial(&path, &track, &opts), "5MB should be partial.");

		// Weak only cares about tiny files.
		let weak = opts.with_partial_check(PartialCheck::Weak);
		assert!(! is_partial(&path, &track, &weak));
		sparse(&path, 100);
		assert!(is_partial(&path, &track, &weak));

		// None never cares.
		let none = opts.with_partial_check(PartialCheck::None);
		assert!(! is_partial(&path, &track, &none));

		// Strict falls back to weak for VBR.
		let vbr = opts.with_cbr(false);
		assert!(is_partial(&path, &track, &vbr));
		sparse(&path, 1000);
		assert!(! is_partial(&path, &track, &vbr));

		// Missing files are partial.
		assert!(is_partial(&dir.path().join("nope.mp3"), &track, &opts));
	}
}
