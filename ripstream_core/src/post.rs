/*!
# Rip Stream: Post Actions
*/

use crate::{
	RipStreamError,
	Track,
};
use dactyl::{
	NiceElapsed,
	traits::NiceInflection,
};
use fyi_msg::Msg;
use std::{
	fs::File,
	io::{
		BufWriter,
		Write,
	},
	path::{
		Path,
		PathBuf,
	},
	time::Instant,
};



#[derive(Debug)]
/// # Post Actions.
///
/// This keeps track of what was ripped and what wasn't over the course of a
/// run, and takes care of the end-of-run bookkeeping: the failure log, the
/// M3U playlist, and the summary.
pub struct PostActions {
	start: Instant,
	fail_log: Option<PathBuf>,
	playlist: Option<PathBuf>,
	ripped: Vec<PlaylistEntry>,
	existing: usize,
	failed: Vec<String>,
}

impl Default for PostActions {
	fn default() -> Self {
		Self {
			start: Instant::now(),
			fail_log: None,
			playlist: None,
			ripped: Vec::new(),
			existing: 0,
			failed: Vec::new(),
		}
	}
}

impl PostActions {
	#[must_use]
	/// # With Failure Log.
	///
	/// Write the URIs of any failed tracks to this file at the end of the
	/// run, one per line.
	pub fn with_fail_log<P: Into<PathBuf>>(self, path: Option<P>) -> Self {
		Self {
			fail_log: path.map(Into::into),
			..self
		}
	}

	#[must_use]
	/// # With M3U Playlist.
	///
	/// Write an extended M3U playlist of the ripped files to this path at the
	/// end of the run.
	pub fn with_playlist<P: Into<PathBuf>>(self, path: Option<P>) -> Self {
		Self {
			playlist: path.map(Into::into),
			..self
		}
	}

	/// # Log Success.
	pub fn log_success(&mut self, track: &Track, path: &Path) {
		self.ripped.push(PlaylistEntry::new(track, path));
	}

	/// # Log Existing.
	///
	/// Already-ripped files still belong in the playlist.
	pub fn log_existing(&mut self, track: &Track, path: &Path) {
		self.existing += 1;
		self.log_success(track, path);
	}

	/// # Log Failure.
	pub fn log_failure(&mut self, track: &Track) {
		self.failed.push(track.uri().to_owned());
	}

	#[must_use]
	/// # Failed URIs.
	pub fn failed(&self) -> &[String] { &self.failed }

	#[must_use]
	/// # Ripped Count.
	///
	/// This does not include tracks that were already ripped.
	pub fn ripped(&self) -> usize { self.ripped.len() - self.existing }

	#[must_use]
	/// # Existing Count.
	pub const fn existing(&self) -> usize { self.existing }

	/// # Finish.
	///
	/// Write out the failure log and playlist, if either was requested, and
	/// print a summary.
	///
	/// ## Errors
	///
	/// Returns an error if either file cannot be written.
	pub fn finish(&self) -> Result<(), RipStreamError> {
		let res = self.write_fail_log().and(self.write_playlist());
		self.print_summary();
		res
	}

	/// # Write Failure Log.
	fn write_fail_log(&self) -> Result<(), RipStreamError> {
		let Some(path) = self.fail_log.as_deref() else { return Ok(()); };
		if self.failed.is_empty() {
			// Don't leave a stale log from a previous run lying around.
			if path.exists() { let _res = std::fs::remove_file(path); }
			return Ok(());
		}

		write_lines(path, self.failed.iter().map(String::as_str))
	}

	/// # Write Playlist.
	fn write_playlist(&self) -> Result<(), RipStreamError> {
		let Some(path) = self.playlist.as_deref() else { return Ok(()); };
		if self.ripped.is_empty() { return Ok(()); }

		let lines = std::iter::once("#EXTM3U".to_owned())
			.chain(self.ripped.iter().flat_map(|e| [e.extinf(), e.path_string()]))
			.collect::<Vec<String>>();
		write_lines(path, lines.iter().map(String::as_str))
	}

	/// # Print Summary.
	fn print_summary(&self) {
		let ripped = self.ripped();
		let failed = self.failed.len();

		Msg::custom("Summary", 199, &format!(
			"{} ripped, {} skipped, {} failed, in {}.",
			ripped.nice_inflect("track", "tracks"),
			self.existing,
			failed,
			NiceElapsed::from(self.start),
		))
			.with_newline(true)
			.eprint();

		if 0 != failed {
			for uri in &self.failed {
				Msg::custom("Failed", 9, uri).eprint();
			}
		}
	}
}



#[derive(Debug, Clone)]
/// # Playlist Entry.
struct PlaylistEntry {
	secs: u64,
	title: String,
	path: PathBuf,
}

impl PlaylistEntry {
	/// # New.
	fn new(track: &Track, path: &Path) -> Self {
		let title =
			if track.artist().is_empty() { track.name().to_owned() }
			else { format!("{} - {}", track.artist(), track.name()) };

		Self {
			secs: track.duration().as_secs(),
			title,
			path: path.to_path_buf(),
		}
	}

	/// # EXTINF Line.
	fn extinf(&self) -> String { format!("#EXTINF:{},{}", self.secs, self.title) }

	/// # Path Line.
	fn path_string(&self) -> String { self.path.to_string_lossy().into_owned() }
}



/// # Write Lines.
fn write_lines<'a, I>(path: &Path, lines: I) -> Result<(), RipStreamError>
where I: Iterator<Item=&'a str> {
	let err = || RipStreamError::Write(path.to_string_lossy().into_owned());
	let mut out = File::create(path).map(BufWriter::new).map_err(|_| err())?;
	for line in lines {
		writeln!(&mut out, "{line}").map_err(|_| err())?;
	}
	out.flush().map_err(|_| err())
}



#[cfg(test)]
mod test {
	use super::*;
	use std::time::Duration;

	#[test]
	fn t_fail_log() {
		let dir = tempfile::tempdir().expect("Tempdir failed.");
		let log = dir.path().join("failed.txt");

		let mut post = PostActions::default().with_fail_log(Some(&log));
		post.log_failure(&Track::new("x:1", "One", Duration::from_secs(1)));
		post.log_failure(&Track::new("x:2", "Two", Duration::from_secs(1)));
		assert_eq!(post.failed(), ["x:1", "x:2"]);

		post.finish().expect("Finish failed.");
		let raw = std::fs::read_to_string(&log).expect("Missing failure log.");
		assert_eq!(raw, "x:1\nx:2\n");

		// A clean run removes it.
		let post = PostActions::default().with_fail_log(Some(&log));
		post.finish().expect("Finish failed.");
		assert!(! log.exists(), "The stale log should have been removed.");
	}

	#[test]
	fn t_playlist() {
		let dir = tempfile::tempdir().expect("Tempdir failed.");
		let m3u = dir.path().join("list.m3u");

		let mut post = PostActions::default().with_playlist(Some(&m3u));
		post.log_success(
			&Track::new("x:1", "One", Duration::from_secs(61)).with_artist("Band"),
			Path::new("/music/Band - One.mp3"),
		);
		post.log_existing(
			&Track::new("x:2", "Two", Duration::from_secs(5)),
			Path::new("/music/Two.mp3"),
		);
		assert_eq!(post.ripped(), 1);
		assert_eq!(post.existing(), 1);

		post.finish().expect("Finish failed.");
		let raw = std::fs::read_to_string(&m3u).expect("Missing playlist.");
		assert_eq!(
			raw,
			"#EXTM3U\n#EXTINF:61,Band - One\n/music/Band - One.mp3\n#EXTINF:5,Two\n/music/Two.mp3\n",
		);
	}

	#[test]
	fn t_empty_playlist() {
		let dir = tempfile::tempdir().expect("Tempdir failed.");
		let m3u = dir.path().join("list.m3u");
		PostActions::default().with_playlist(Some(&m3u)).finish().expect("Finish failed.");
		assert!(! m3u.exists(), "Empty playlists shouldn't be written.");
	}
}
