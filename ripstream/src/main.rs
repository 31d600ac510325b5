/*!
# Rip Stream
*/

#![forbid(unsafe_code)]

#![deny(
	clippy::correctness,
	unreachable_pub,
)]

#![warn(
	clippy::complexity,
	clippy::nursery,
	clippy::pedantic,
	clippy::perf,
	clippy::style,

	clippy::clone_on_ref_ptr,
	clippy::create_dir,
	clippy::filetype_is_file,
	clippy::format_push_string,
	clippy::get_unwrap,
	clippy::impl_trait_in_params,
	clippy::missing_assert_message,
	clippy::missing_docs_in_private_items,
	clippy::needless_raw_strings,
	clippy::panic_in_result_fn,
	clippy::str_to_string,
	clippy::string_to_string,
	clippy::todo,
	clippy::unneeded_field_pattern,
	clippy::unseparated_literal_suffix,
	clippy::unwrap_in_result,

	macro_use_extern_crate,
	missing_copy_implementations,
	missing_docs,
	non_ascii_idents,
	trivial_casts,
	trivial_numeric_casts,
	unused_crate_dependencies,
	unused_extern_crates,
	unused_import_braces,
)]

#![allow(clippy::redundant_pub_crate)]



mod cli;

use dactyl::NiceU16;
use fyi_msg::{
	Msg,
	Progless,
};
use oxford_join::OxfordJoin;
use ripstream_core::{
	Interrupt,
	InterruptAction,
	KillSwitch,
	LocalResolver,
	LocalSession,
	PostActions,
	Ripper,
	RipOptions,
	RipStreamError,
	SessionEvents,
};
use std::{
	borrow::Cow,
	path::Path,
	process::ExitCode,
};
use utc2k::FmtUtc2k;



/// # Main.
///
/// This lets us bubble up startup errors so they can be pretty-printed.
fn main() -> ExitCode {
	match main__() {
		Ok(()) => ExitCode::SUCCESS,
		Err(e @ (RipStreamError::PrintHelp | RipStreamError::PrintVersion)) => {
			println!("{e}");
			ExitCode::SUCCESS
		},
		Err(e) => {
			Msg::from(e).eprint();
			ExitCode::FAILURE
		},
	}
}

#[inline]
/// # Actual Main.
///
/// This does all the stuff.
fn main__() -> Result<(), RipStreamError> {
	let (opts, dir, fail_log, playlist, uris) = cli::parse()?;

	// Make sure the destination exists.
	std::fs::create_dir_all(&dir)
		.map_err(|_| RipStreamError::Write(dir.to_string_lossy().into_owned()))?;

	// Set up progress and the CTRL-C intercept. One press skips the current
	// track, two kill the run.
	let events = SessionEvents::new(&opts);
	let killed = KillSwitch::default();
	let mut interrupt = Interrupt::new(events.clone(), killed.clone());
	ctrlc::set_handler(move || {
		if InterruptAction::Skip == interrupt.press() {
			Msg::warning("Skipping the current track; press CTRL-C again to abort.")
				.eprint();
		}
	})
		.map_err(|e| RipStreamError::Session(e.to_string()))?;
	let progress = Progless::default();

	rip_summary(&opts, &dir, &uris);
	if opts.verbose() { log_header(&opts, &uris); }

	// Rip and rip and rip!
	let session = LocalSession::new(events.clone());
	let post = PostActions::default()
		.with_fail_log(fail_log)
		.with_playlist(playlist);
	let mut ripper = Ripper::new(session, events, opts, &progress)
		.with_dir(dir)
		.with_killswitch(killed.clone())
		.with_post(post);
	let report = ripper.rip(&uris, &mut LocalResolver)?;

	if killed.killed() || report.aborted() { Err(RipStreamError::Killed) }
	else { Ok(()) }
}

/// # Log Header.
///
/// Print a few basic setup details for the log. Only applies when -v/--verbose
/// is set.
fn log_header(opts: &RipOptions, uris: &[String]) {
	use std::io::Write;

	let writer = std::io::stdout();
	let mut handle = writer.lock();

	let _res = writeln!(
		&mut handle,
		concat!("#####
## Rip Stream v", env!("CARGO_PKG_VERSION"), "
## Format: {}
## Date:   {}
##
## Each event line is made up of the following fields, separated by two
## spaces:
##   * Timestamp (UTC)
##   * Track Index  [3 digits]
##   * Event        (RIPPED, EXISTS, PARTIAL, RETRY, SKIPPED, ABORTED,
##                   FAILED, WARNING)
##   * Track URI, plus any details
#####"),
		opts.format().as_str(),
		FmtUtc2k::now(),
	);
	for uri in uris {
		let _res = writeln!(&mut handle, "## Source: {uri}");
	}

	let _res = handle.flush();
}

/// # Rip Summary.
///
/// Summarize the chosen settings before proceeding.
fn rip_summary(opts: &RipOptions, dir: &Path, uris: &[String]) {
	let format = opts.format();

	let mut extras = Vec::new();
	if opts.plus_wav() && ! matches!(format, ripstream_core::OutputFormat::Wav) {
		extras.push("wav");
	}
	if opts.plus_pcm() && ! matches!(format, ripstream_core::OutputFormat::Pcm) {
		extras.push("pcm");
	}
	let nice_format =
		if extras.is_empty() { Cow::Borrowed(format.as_str()) }
		else { Cow::Owned(format!("{} (+ {})", format.as_str(), extras.oxford_and())) };

	let nice_quality: Cow<str> =
		if ! format.is_lossy() { Cow::Borrowed("Lossless") }
		else if opts.cbr() { Cow::Owned(format!("CBR {} kb/s", NiceU16::from(opts.bitrate()))) }
		else { Cow::Owned(format!("VBR {}", opts.vbr())) };

	let nice_schedule: Cow<str> = match (opts.stop_after(), opts.resume_after()) {
		(Some(a), Some(b)) => Cow::Owned(format!("Stop {a}, Resume {b}")),
		(Some(a), None) => Cow::Owned(format!("Stop {a}")),
		_ => Cow::Borrowed("None"),
	};
	let nice_token: Cow<str> = opts.play_token_resume().map_or(
		Cow::Borrowed("Abort"),
		|r| Cow::Owned(format!("Resume {r}")),
	);

	let set = [
		("Sources:", Cow::Owned(uris.len().to_string()), true),
		("Format:", nice_format, true),
		("Quality:", nice_quality, true),
		("Overwrite:", Cow::Borrowed(if opts.overwrite() { "Yes" } else { "No" }), true),
		("Partial Check:", Cow::Borrowed(opts.partial_check().as_str()), true),
		("Schedule:", nice_schedule, opts.stop_after().is_some()),
		("Token Lost:", nice_token, true),
		("Destination:", Cow::Owned(dir.to_string_lossy().into_owned()), true),
	];
	let max_label = set.iter().map(|(k, _, _)| k.len()).max().unwrap_or(0);

	Msg::custom("Rip Stream", 199, "Settings").eprint();
	for (k, v, enabled) in set {
		if enabled { eprintln!("  {k:max_label$} \x1b[1m{v}\x1b[0m"); }
	}
	eprintln!();
}
