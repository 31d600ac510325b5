/*!
# Rip Stream: Build
*/

use argyle::KeyWordsBuilder;
use std::path::PathBuf;



/// # Set Up CLI Arguments.
fn main() {
	println!("cargo:rerun-if-env-changed=CARGO_PKG_VERSION");

	let mut builder = KeyWordsBuilder::default();
	builder.push_keys([
		"--cbr",
		"-h", "--help",
		"--overwrite",
		"--plus-pcm",
		"--plus-wav",
		"-v", "--verbose",
		"-V", "--version",
	]);
	builder.push_keys_with_values([
		"-b", "--bitrate",
		"--comp",
		"-d", "--dir", "--directory",
		"--fail-log",
		"-f", "--format",
		"--partial-check",
		"--play-token-resume",
		"--playlist-m3u",
		"--queue",
		"--resume-after",
		"--stall",
		"--stereo-mode",
		"--stop-after",
		"--timeout",
		"--vbr",
	]);
	builder.save(out_path("argyle.rs"));
}

/// # Output Path.
///
/// Append the sub-path to OUT_DIR and return it.
fn out_path(stub: &str) -> PathBuf {
	std::fs::canonicalize(std::env::var("OUT_DIR").expect("Missing OUT_DIR."))
		.expect("Missing OUT_DIR.")
		.join(stub)
}
