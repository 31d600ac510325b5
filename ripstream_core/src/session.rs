/*!
# Rip Stream: Session Collaborators

The ripper doesn't know or care where its audio comes from. Anything that can
load a track, start/stop delivery, and push frames through the
[`SessionEvents`](crate::SessionEvents) callbacks will do.
*/

use crate::RipStreamError;
use std::{
	path::Path,
	time::Duration,
};



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Track Availability.
///
/// This is what a session reports after loading a track.
pub enum Availability {
	/// # Playable.
	Available,

	/// # Not Playable.
	Unavailable,

	/// # Local-Only.
	///
	/// The track only exists on someone's computer.
	Local,
}

impl Availability {
	#[must_use]
	/// # Is Available?
	pub const fn is_available(self) -> bool { matches!(self, Self::Available) }
}



#[derive(Debug, Clone, Eq, PartialEq)]
/// # Track.
///
/// Read-only track metadata, as supplied by a [`Resolver`].
pub struct Track {
	uri: String,
	name: String,
	artist: String,
	album: String,
	duration: Duration,
	disc: u16,
	number: u16,
	local: bool,
}

impl Track {
	#[must_use]
	/// # New.
	pub fn new<U, N>(uri: U, name: N, duration: Duration) -> Self
	where U: Into<String>, N: Into<String> {
		Self {
			uri: uri.into(),
			name: name.into(),
			artist: String::new(),
			album: String::new(),
			duration,
			disc: 1,
			number: 0,
			local: false,
		}
	}

	#[must_use]
	/// # With Album.
	pub fn with_album<S: Into<String>>(self, album: S) -> Self {
		Self { album: album.into(), ..self }
	}

	#[must_use]
	/// # With Artist.
	pub fn with_artist<S: Into<String>>(self, artist: S) -> Self {
		Self { artist: artist.into(), ..self }
	}

	#[must_use]
	/// # With Local Flag.
	pub fn with_local(self, local: bool) -> Self { Self { local, ..self } }

	#[must_use]
	/// # With Disc/Track Number.
	pub fn with_number(self, disc: u16, number: u16) -> Self {
		Self { disc, number, ..self }
	}
}

impl Track {
	#[must_use]
	/// # URI.
	pub fn uri(&self) -> &str { &self.uri }

	#[must_use]
	/// # Name.
	pub fn name(&self) -> &str { &self.name }

	#[must_use]
	/// # Artist.
	pub fn artist(&self) -> &str { &self.artist }

	#[must_use]
	/// # Album.
	pub fn album(&self) -> &str { &self.album }

	#[must_use]
	/// # Duration.
	pub const fn duration(&self) -> Duration { self.duration }

	#[must_use]
	/// # Disc Number.
	pub const fn disc(&self) -> u16 { self.disc }

	#[must_use]
	/// # Track Number.
	pub const fn number(&self) -> u16 { self.number }

	#[must_use]
	/// # Local-Only?
	pub const fn is_local(&self) -> bool { self.local }

	#[must_use]
	/// # File Stem.
	///
	/// Return a filesystem-safe `Artist - Name` (or just `Name`) to use as the
	/// output file name.
	pub fn file_stem(&self) -> String {
		let raw =
			if self.artist.is_empty() { self.name.clone() }
			else { format!("{} - {}", self.artist, self.name) };

		let out: String = raw.chars()
			.map(|c| match c {
				'/' | '\\' | ':' | '"' | '*' | '?' | '<' | '>' | '|' => '_',
				c if c.is_control() => '_',
				c => c,
			})
			.collect();

		let out = out.trim().trim_start_matches('.');
		if out.is_empty() { "track".to_owned() }
		else { out.to_owned() }
	}
}



/// # Streaming Session.
///
/// This is the remote end: it loads tracks, and, once told to play, delivers
/// audio through the [`SessionEvents`](crate::SessionEvents) it was built
/// with, from its own thread.
pub trait Session {
	/// # Log In.
	///
	/// Start logging in. The outcome is reported through the connection-state
	/// and logged-in callbacks.
	///
	/// ## Errors
	///
	/// Return an error if the attempt couldn't even be started.
	fn login(&mut self) -> Result<(), RipStreamError>;

	/// # Log Out.
	fn logout(&mut self);

	/// # Load Track.
	///
	/// Load a track for playback, waiting no longer than `timeout`.
	///
	/// ## Errors
	///
	/// Any session-level failure should be returned as an error; the ripper
	/// will skip to the next track.
	fn load(&mut self, track: &Track, timeout: Duration)
	-> Result<Availability, RipStreamError>;

	/// # Play/Pause.
	///
	/// Start (`true`) or stop (`false`) delivery of the loaded track.
	///
	/// ## Errors
	///
	/// As with `load`, errors are contained to the current track.
	fn play(&mut self, play: bool) -> Result<(), RipStreamError>;
}

/// # Track Resolver.
///
/// Turn a URI (playlist, album, whatever) into a list of tracks.
pub trait Resolver {
	/// # Resolve.
	///
	/// ## Errors
	///
	/// Return an error if the URI can't be resolved.
	fn resolve(&mut self, uri: &str) -> Result<Vec<Track>, RipStreamError>;
}

/// # Tagger.
///
/// Write metadata to a finished file. This is called once for each track that
/// is successfully ripped; errors are printed but otherwise ignored.
pub trait Tagger {
	/// # Tag.
	///
	/// ## Errors
	///
	/// Return an error if tagging fails.
	fn tag(&self, path: &Path, track: &Track, idx: usize) -> Result<(), RipStreamError>;
}

#[derive(Debug, Clone, Copy, Default)]
/// # No Tags.
///
/// A tagger that doesn't.
pub struct NoTags;

impl Tagger for NoTags {
	#[inline]
	fn tag(&self, _path: &Path, _track: &Track, _idx: usize) -> Result<(), RipStreamError> {
		Ok(())
	}
}



#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn t_file_stem() {
		let track = Track::new("x:1", "Song", Duration::from_secs(1));
		assert_eq!(track.file_stem(), "Song");

		let track = track.with_artist("AC/DC");
		assert_eq!(track.file_stem(), "AC_DC - Song");

		let track = Track::new("x:2", "  ..Why? ", Duration::ZERO);
		assert_eq!(track.file_stem(), "Why_");

		let track = Track::new("x:3", "", Duration::ZERO);
		assert_eq!(track.file_stem(), "track", "Empty names need a fallback.");
	}

	#[test]
	fn t_availability() {
		assert!(Availability::Available.is_available());
		assert!(! Availability::Unavailable.is_available());
		assert!(! Availability::Local.is_available());
	}
}
