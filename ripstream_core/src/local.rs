/*!
# Rip Stream: Local Session

A [`Session`] backed by WAV files on disk, plus a [`Resolver`] that finds
them. Audio is delivered from a dispatch thread in real chunks, through the
very same callbacks a remote session would use.
*/

use crate::{
	AudioFormat,
	Availability,
	ConnectionState,
	Resolver,
	RipStreamError,
	Session,
	SessionEvents,
	Track,
	WAVE_SPEC,
};
use hound::WavReader;
use std::{
	ffi::OsStr,
	path::{
		Path,
		PathBuf,
	},
	sync::{
		Arc,
		atomic::{
			AtomicBool,
			AtomicU32,
			Ordering::{
				Acquire,
				Release,
			},
		},
	},
	thread::JoinHandle,
	time::Duration,
};



/// # Frames Per Delivery.
const CHUNK: u32 = 2048;

/// # Backpressure Pause.
const RETRY: Duration = Duration::from_millis(5);



#[derive(Debug, Clone, Copy, Default)]
/// # Local Resolver.
///
/// URIs are paths (optionally prefixed with `file://`) to:
/// * A single WAV file;
/// * A directory, meaning all the WAV files directly inside it, sorted;
/// * An M3U playlist, one path per line, relative to the playlist.
pub struct LocalResolver;

impl Resolver for LocalResolver {
	fn resolve(&mut self, uri: &str) -> Result<Vec<Track>, RipStreamError> {
		let path = Path::new(uri.strip_prefix("file://").unwrap_or(uri));

		let paths =
			if path.is_dir() { dir_paths(path)? }
			else if has_ext(path, "m3u") || has_ext(path, "m3u8") { m3u_paths(path)? }
			else if path.is_file() { vec![path.to_path_buf()] }
			else { return Err(RipStreamError::Read(uri.to_owned())); };

		Ok(
			paths.iter()
				.enumerate()
				.map(|(k, p)| path_track(p, u16::try_from(k + 1).unwrap_or(u16::MAX)))
				.collect()
		)
	}
}

/// # Directory WAVs.
fn dir_paths(dir: &Path) -> Result<Vec<PathBuf>, RipStreamError> {
	let mut out: Vec<PathBuf> = std::fs::read_dir(dir)
		.map_err(|_| RipStreamError::Read(dir.to_string_lossy().into_owned()))?
		.filter_map(|e| e.ok().map(|e| e.path()))
		.filter(|p| p.is_file() && has_ext(p, "wav"))
		.collect();
	out.sort_unstable();
	Ok(out)
}

/// # Playlist Entries.
fn m3u_paths(file: &Path) -> Result<Vec<PathBuf>, RipStreamError> {
	let raw = std::fs::read_to_string(file)
		.map_err(|_| RipStreamError::Read(file.to_string_lossy().into_owned()))?;
	let parent = file.parent().unwrap_or_else(|| Path::new("."));

	Ok(
		raw.lines()
			.map(str::trim)
			.filter(|l| ! l.is_empty() && ! l.starts_with('#'))
			.map(|l| parent.join(l))
			.collect()
	)
}

/// # Path to Track.
///
/// The duration comes from the WAV header, if it can be read; the name and
/// artist come from the file stem, split on the first `" - "`.
fn path_track(path: &Path, number: u16) -> Track {
	let duration = WavReader::open(path).map_or(Duration::ZERO, |r| {
		let rate = u64::from(r.spec().sample_rate.max(1));
		Duration::from_millis((u64::from(r.duration()) * 1000).wrapping_div(rate))
	});

	let stem = path.file_stem().map_or_else(String::new, |s| s.to_string_lossy().into_owned());
	let track = match stem.split_once(" - ") {
		Some((artist, name)) => Track::new(path.to_string_lossy(), name.trim(), duration)
			.with_artist(artist.trim()),
		None => Track::new(path.to_string_lossy(), stem.trim(), duration),
	};
	track.with_number(1, number)
}

/// # Has Extension?
fn has_ext(path: &Path, ext: &str) -> bool {
	path.extension().map_or(false, |e| e.eq_ignore_ascii_case(OsStr::new(ext)))
}



#[derive(Debug)]
/// # Local Session.
///
/// This plays 16-bit stereo 44.1 kHz WAV files as if they were being streamed.
/// Anything else is reported as unavailable.
pub struct LocalSession {
	events: SessionEvents,
	loaded: Option<PathBuf>,
	position: Arc<AtomicU32>,
	stop: Arc<AtomicBool>,
	handle: Option<JoinHandle<()>>,
}

impl Drop for LocalSession {
	fn drop(&mut self) { self.halt(); }
}

impl LocalSession {
	#[must_use]
	/// # New.
	pub fn new(events: SessionEvents) -> Self {
		Self {
			events,
			loaded: None,
			position: Arc::new(AtomicU32::new(0)),
			stop: Arc::new(AtomicBool::new(false)),
			handle: None,
		}
	}

	/// # Halt Delivery.
	fn halt(&mut self) {
		self.stop.store(true, Release);
		if let Some(handle) = self.handle.take() { let _res = handle.join(); }
		self.stop.store(false, Release);
	}
}

impl Session for LocalSession {
	fn login(&mut self) -> Result<(), RipStreamError> {
		self.events.on_connection_state_changed(ConnectionState::LoggedIn);
		self.events.on_logged_in(Ok("local"));
		Ok(())
	}

	fn logout(&mut self) {
		self.halt();
		self.loaded = None;
		self.events.on_connection_state_changed(ConnectionState::LoggedOut);
	}

	fn load(&mut self, track: &Track, _timeout: Duration)
	-> Result<Availability, RipStreamError> {
		self.halt();
		self.loaded = None;
		self.position.store(0, Release);

		if track.is_local() { return Ok(Availability::Local); }

		let path = PathBuf::from(track.uri());
		match WavReader::open(&path) {
			Ok(r) if r.spec() == WAVE_SPEC => {
				self.loaded.replace(path);
				Ok(Availability::Available)
			},
			_ => Ok(Availability::Unavailable),
		}
	}

	fn play(&mut self, play: bool) -> Result<(), RipStreamError> {
		if ! play {
			self.halt();
			return Ok(());
		}

		// Already playing?
		if self.handle.as_ref().map_or(false, |h| ! h.is_finished()) { return Ok(()); }
		self.halt();

		let path = self.loaded.clone()
			.ok_or_else(|| RipStreamError::Session("nothing has been loaded".to_owned()))?;
		let events = self.events.clone();
		let position = Arc::clone(&self.position);
		let stop = Arc::clone(&self.stop);
		self.handle.replace(std::thread::spawn(move || {
			dispatch(&path, &events, &position, &stop);
		}));

		Ok(())
	}
}



/// # Dispatch.
///
/// Deliver the file from the current position onward, chunk by chunk,
/// backing off whenever the queue is full. Once everything has been
/// accepted, delivery stops and the end of the track is announced.
fn dispatch(path: &Path, events: &SessionEvents, position: &AtomicU32, stop: &AtomicBool) {
	let Ok(mut reader) = WavReader::open(path) else { return; };
	if reader.seek(position.load(Acquire)).is_err() { return; }

	let format = AudioFormat::new(reader.spec().sample_rate, reader.spec().channels);
	let mut samples = reader.samples::<i16>();
	let mut buf = Vec::with_capacity(CHUNK as usize * 4);
	loop {
		buf.truncate(0);
		let mut frames = 0;
		while frames < CHUNK {
			let (Some(Ok(l)), Some(Ok(r))) = (samples.next(), samples.next()) else { break; };
			buf.extend_from_slice(&l.to_le_bytes());
			buf.extend_from_slice(&r.to_le_bytes());
			frames += 1;
		}
		if frames == 0 { break; }

		loop {
			if stop.load(Acquire) { return; }
			if events.queue().is_full() {
				std::thread::sleep(RETRY);
				continue;
			}
			if events.on_music_delivery(format, &buf, frames) != 0 { break; }
			std::thread::sleep(RETRY);
		}
		position.fetch_add(frames, Release);
	}

	events.on_end_of_track();
}
