/*!
# Rip Stream: Encoder Sink
*/

pub(super) mod format;

use crate::{
	Frame,
	RipOptions,
	RipStreamError,
	OutputFormat,
	WAVE_SPEC,
};
use hound::WavWriter;
use std::{
	ffi::OsString,
	fmt,
	fs::File,
	io::{
		BufWriter,
		Write,
	},
	path::{
		Path,
		PathBuf,
	},
	process::{
		Child,
		ChildStdin,
		Command,
		ExitStatus,
		Stdio,
	},
};



/// # WAV Writer.
type Wav = WavWriter<BufWriter<File>>;



#[derive(Default)]
/// # Encoder Sink.
///
/// This is wherever the ripped audio ends up: the input pipe of an encoder
/// subprocess, a WAV writer, a raw PCM writer, or some combination of the
/// three. Each frame is written to every open writer.
///
/// A sink must be finished with either [`EncoderSink::close`], keeping the
/// output, or [`EncoderSink::discard`], deleting it.
pub struct EncoderSink {
	child: Option<Child>,
	pipe: Option<ChildStdin>,
	wav: Option<Wav>,
	pcm: Option<BufWriter<File>>,
	files: Vec<PathBuf>,
}

impl fmt::Debug for EncoderSink {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("EncoderSink")
			.field("child", &self.child)
			.field("pcm", &self.pcm)
			.field("files", &self.files)
			.finish_non_exhaustive()
	}
}

impl Drop for EncoderSink {
	/// # Reap the Encoder.
	///
	/// Closing the pipe lets the encoder exit on its own; this just makes sure
	/// we don't leave a zombie behind if neither close nor discard was called.
	fn drop(&mut self) {
		drop(self.pipe.take());
		if let Some(mut child) = self.child.take() { let _res = child.wait(); }
	}
}

impl EncoderSink {
	/// # Open.
	///
	/// Open whatever writers are needed for `dst` given the output format and
	/// side-output options.
	///
	/// ## Errors
	///
	/// This will return an error if the encoder can't be spawned or any of the
	/// files can't be created. Anything that was opened before the failure is
	/// cleaned up.
	pub fn open(dst: &Path, opts: &RipOptions) -> Result<Self, RipStreamError> {
		let mut out = Self::default();
		match out.open_all(dst, opts) {
			Ok(()) => Ok(out),
			Err(e) => {
				out.discard();
				Err(e)
			},
		}
	}

	/// # Open Everything.
	fn open_all(&mut self, dst: &Path, opts: &RipOptions) -> Result<(), RipStreamError> {
		let format = opts.format();

		// WAV, either as the main output or a side dish.
		if matches!(format, OutputFormat::Wav) { self.open_wav(dst.to_path_buf())?; }
		else if opts.plus_wav() { self.open_wav(dst.with_extension("wav"))?; }

		// Same for PCM.
		if matches!(format, OutputFormat::Pcm) { self.open_pcm(dst.to_path_buf())?; }
		else if opts.plus_pcm() { self.open_pcm(dst.with_extension("pcm"))?; }

		// And the encoder, if any.
		let argv = format.encoder_argv(opts, dst);
		#[cfg(test)]
		let argv = test::encoder_override(dst).or(argv);
		if let Some(argv) = argv {
			self.files.push(dst.to_path_buf());
			self.spawn(&argv, format.quiet_stdio())?;
		}

		Ok(())
	}

	/// # Open WAV Writer.
	fn open_wav(&mut self, dst: PathBuf) -> Result<(), RipStreamError> {
		let wav = WavWriter::create(&dst, WAVE_SPEC)
			.map_err(|_| RipStreamError::Write(dst.to_string_lossy().into_owned()))?;
		self.files.push(dst);
		self.wav.replace(wav);
		Ok(())
	}

	/// # Open PCM Writer.
	fn open_pcm(&mut self, dst: PathBuf) -> Result<(), RipStreamError> {
		let file = File::create(&dst)
			.map_err(|_| RipStreamError::Write(dst.to_string_lossy().into_owned()))?;
		self.files.push(dst);
		self.pcm.replace(BufWriter::new(file));
		Ok(())
	}

	/// # Spawn Encoder.
	///
	/// The first entry is the program; the rest are its arguments.
	fn spawn(&mut self, argv: &[OsString], quiet: bool) -> Result<(), RipStreamError> {
		let (prog, args) = argv.split_first()
			.ok_or_else(|| RipStreamError::Encoder("empty command".to_owned()))?;

		let mut cmd = Command::new(prog);
		cmd.args(args).stdin(Stdio::piped());
		if quiet { cmd.stdout(Stdio::null()).stderr(Stdio::null()); }

		let mut child = cmd.spawn().map_err(|e| RipStreamError::Encoder(format!(
			"unable to run {} ({e})",
			prog.to_string_lossy(),
		)))?;
		let pipe = child.stdin.take();
		self.child.replace(child);
		self.pipe = Some(pipe.ok_or_else(|| RipStreamError::Encoder("missing stdin".to_owned()))?);
		Ok(())
	}
}

impl EncoderSink {
	#[must_use]
	/// # Files.
	///
	/// Return the paths of all the files this sink is writing to.
	pub fn files(&self) -> &[PathBuf] { &self.files }

	#[must_use]
	/// # Has Encoder?
	pub const fn has_encoder(&self) -> bool { self.child.is_some() }

	#[must_use]
	/// # Writer Count.
	pub fn writers(&self) -> usize {
		usize::from(self.pipe.is_some()) +
		usize::from(self.wav.is_some()) +
		usize::from(self.pcm.is_some())
	}

	/// # Write Frame.
	///
	/// Send the frame's bytes to each open writer in turn, the encoder first.
	///
	/// ## Errors
	///
	/// Returns the first error encountered, if any.
	pub fn write(&mut self, frame: &Frame) -> Result<(), RipStreamError> {
		let data = frame.data();
		if let Some(pipe) = self.pipe.as_mut() { write_pipe(pipe, data)?; }
		if let Some(wav) = self.wav.as_mut() { write_wav(wav, data)?; }
		if let Some(pcm) = self.pcm.as_mut() { write_pcm(pcm, data)?; }
		Ok(())
	}

	/// # Close.
	///
	/// Flush and close every writer, then wait for the encoder (if any) to
	/// exit, returning its status.
	///
	/// A non-zero exit isn't treated as an error here; the caller decides what
	/// to make of it.
	///
	/// ## Errors
	///
	/// Returns an error if any of the writers fail to flush or close, or the
	/// encoder can't be waited on.
	pub fn close(mut self) -> Result<Option<ExitStatus>, RipStreamError> {
		let mut res = Ok(());

		// Closing the pipe is the encoder's cue to finish up.
		if let Some(mut pipe) = self.pipe.take() {
			if pipe.flush().is_err() {
				res = Err(RipStreamError::Encoder("unable to flush the pipe".to_owned()));
			}
		}

		if let Some(wav) = self.wav.take() {
			if wav.finalize().is_err() && res.is_ok() {
				res = Err(RipStreamError::Write(self.file_name("wav")));
			}
		}

		// Raw PCM needs to actually hit the disk.
		if let Some(mut pcm) = self.pcm.take() {
			if
				(pcm.flush().is_err() || pcm.get_ref().sync_all().is_err()) &&
				res.is_ok()
			{
				res = Err(RipStreamError::Write(self.file_name("pcm")));
			}
		}

		let status = match self.child.take() {
			Some(mut child) => Some(child.wait().map_err(|e| RipStreamError::Encoder(e.to_string()))?),
			None => None,
		};

		res.map(|()| status)
	}

	/// # Discard.
	///
	/// Abandon the output: stop the encoder, close the writers, and delete
	/// every file this sink created.
	pub fn discard(mut self) {
		drop(self.pipe.take());
		if let Some(mut child) = self.child.take() {
			let _res = child.kill();
			let _res = child.wait();
		}
		drop(self.wav.take());
		drop(self.pcm.take());

		for file in self.files.drain(..) {
			if file.exists() { let _res = std::fs::remove_file(file); }
		}
	}

	/// # File Name (for Errors).
	fn file_name(&self, ext: &str) -> String {
		self.files.iter()
			.find(|p| p.extension().map_or(false, |e| e.eq_ignore_ascii_case(ext)))
			.map_or_else(|| ext.to_owned(), |p| p.to_string_lossy().into_owned())
	}
}



/// # Write to Pipe.
fn write_pipe(pipe: &mut ChildStdin, data: &[u8]) -> Result<(), RipStreamError> {
	pipe.write_all(data)
		.map_err(|e| RipStreamError::Encoder(format!("broken pipe ({e})")))
}

/// # Write to WAV.
fn write_wav(wav: &mut Wav, data: &[u8]) -> Result<(), RipStreamError> {
	for pair in data.chunks_exact(2) {
		wav.write_sample(i16::from_le_bytes([pair[0], pair[1]]))
			.map_err(|_| RipStreamError::Write("wav".to_owned()))?;
	}
	Ok(())
}

/// # Write to PCM.
fn write_pcm(pcm: &mut BufWriter<File>, data: &[u8]) -> Result<(), RipStreamError> {
	pcm.write_all(data).map_err(|_| RipStreamError::Write("pcm".to_owned()))
}



#[cfg(test)]
pub(crate) mod test {
	use super::*;
	use crate::BYTES_PER_FRAME;
	use std::cell::Cell;

	/// # Encoder Command Builder.
	pub(crate) type EncoderFn = fn(&Path) -> Vec<OsString>;

	thread_local! {
		/// # Encoder Override.
		///
		/// When set, sinks opened on this thread run this command instead of
		/// the format's real encoder.
		static ENCODER: Cell<Option<EncoderFn>> = const { Cell::new(None) };
	}

	/// # Set Encoder Override.
	pub(crate) fn set_encoder_override(cb: Option<EncoderFn>) { ENCODER.with(|c| c.set(cb)); }

	/// # Encoder Override.
	pub(super) fn encoder_override(dst: &Path) -> Option<Vec<OsString>> {
		ENCODER.with(Cell::get).map(|cb| cb(dst))
	}

	/// # Shell Command.
	pub(crate) fn sh(script: String) -> Vec<OsString> {
		vec![OsString::from("sh"), OsString::from("-c"), OsString::from(script)]
	}

	/// # Test Frame.
	fn frame(n: u8, frames: u32) -> Frame {
		Frame::new(44_100, vec![n; (frames * BYTES_PER_FRAME) as usize], frames)
	}

	#[test]
	fn t_wav_pcm() {
		let dir = tempfile::tempdir().expect("Tempdir failed.");
		let dst = dir.path().join("song.wav");
		let opts = RipOptions::default()
			.with_format(OutputFormat::Wav)
			.with_plus_pcm(true);

		let mut sink = EncoderSink::open(&dst, &opts).expect("Failed to open sink.");
		assert!(! sink.has_encoder(), "WAV doesn't need an encoder.");
		assert_eq!(sink.writers(), 2);
		assert_eq!(sink.files().len(), 2);

		for n in 0..10 {
			sink.write(&frame(n, 100)).expect("Write failed.");
		}
		let status = sink.close().expect("Close failed.");
		assert!(status.is_none(), "There was no encoder to exit.");

		// The PCM should be exactly what we wrote.
		let pcm = std::fs::read(dst.with_extension("pcm")).expect("Missing PCM.");
		assert_eq!(pcm.len(), 10 * 100 * BYTES_PER_FRAME as usize);
		for (n, chunk) in pcm.chunks_exact(400).enumerate() {
			assert!(chunk.iter().all(|&b| usize::from(b) == n), "PCM frames out of order.");
		}

		// The WAV should have the same number of frames.
		let reader = hound::WavReader::open(&dst).expect("Unable to open WAV.");
		assert_eq!(reader.spec(), WAVE_SPEC);
		assert_eq!(reader.duration(), 1000);
	}

	#[test]
	fn t_discard() {
		let dir = tempfile::tempdir().expect("Tempdir failed.");
		let dst = dir.path().join("song.pcm");
		let opts = RipOptions::default()
			.with_format(OutputFormat::Pcm)
			.with_plus_wav(true);

		let mut sink = EncoderSink::open(&dst, &opts).expect("Failed to open sink.");
		sink.write(&frame(1, 10)).expect("Write failed.");
		assert!(dst.exists());
		assert!(dst.with_extension("wav").exists());

		sink.discard();
		assert!(! dst.exists(), "The PCM should have been deleted.");
		assert!(! dst.with_extension("wav").exists(), "The WAV should have been deleted.");
	}

	#[test]
	fn t_open_fail() {
		let dir = tempfile::tempdir().expect("Tempdir failed.");
		let dst = dir.path().join("missing").join("song.wav");
		let opts = RipOptions::default().with_format(OutputFormat::Wav);
		assert!(matches!(
			EncoderSink::open(&dst, &opts),
			Err(RipStreamError::Write(_)),
		));
	}

	#[cfg(unix)]
	#[test]
	fn t_encoder_pipe() {
		let dir = tempfile::tempdir().expect("Tempdir failed.");
		let dst = dir.path().join("song.raw");

		let mut sink = EncoderSink::default();
		let script = format!("cat > '{}'", dst.display());
		sink.spawn(&[OsString::from("sh"), OsString::from("-c"), OsString::from(script)], false)
			.expect("Unable to spawn sh.");
		sink.files.push(dst.clone());
		assert!(sink.has_encoder());

		for n in 0..5 { sink.write(&frame(n, 4)).expect("Write failed."); }
		let status = sink.close().expect("Close failed.").expect("Missing status.");
		assert!(status.success(), "cat should have exited cleanly.");
		assert_eq!(std::fs::read(&dst).expect("Missing output.").len(), 5 * 16);
	}

	#[cfg(unix)]
	#[test]
	fn t_encoder_exit() {
		let mut sink = EncoderSink::default();
		sink.spawn(
			&[OsString::from("sh"), OsString::from("-c"), OsString::from("cat > /dev/null; exit 3")],
			true,
		).expect("Unable to spawn sh.");
		sink.write(&frame(0, 4)).expect("Write failed.");
		let status = sink.close().expect("Close failed.").expect("Missing status.");
		assert_eq!(status.code(), Some(3));
	}

	#[cfg(unix)]
	#[test]
	fn t_all_writers() {
		let dir = tempfile::tempdir().expect("Tempdir failed.");
		let dst = dir.path().join("song.mp3");
		let opts = RipOptions::default()
			.with_format(OutputFormat::Mp3)
			.with_plus_wav(true)
			.with_plus_pcm(true);

		fn cat(dst: &Path) -> Vec<OsString> { sh(format!("cat > '{}'", dst.display())) }

		set_encoder_override(Some(cat));
		let sink = EncoderSink::open(&dst, &opts);
		set_encoder_override(None);
		let mut sink = sink.expect("Failed to open sink.");
		assert_eq!(sink.writers(), 3);
		assert_eq!(sink.files().len(), 3);

		for n in 0..50 { sink.write(&frame(n, 100)).expect("Write failed."); }
		let status = sink.close().expect("Close failed.").expect("Missing status.");
		assert!(status.success(), "cat should have exited cleanly.");

		// Every writer got every frame, in order.
		let len = 50 * 100 * BYTES_PER_FRAME as usize;
		let encoded = std::fs::read(&dst).expect("Missing encoder output.");
		let pcm = std::fs::read(dst.with_extension("pcm")).expect("Missing PCM.");
		assert_eq!(encoded.len(), len);
		assert_eq!(encoded, pcm, "The encoder and PCM should match.");
		for (n, chunk) in pcm.chunks_exact(400).enumerate() {
			assert!(chunk.iter().all(|&b| usize::from(b) == n), "Frames out of order.");
		}
		let reader = hound::WavReader::open(dst.with_extension("wav")).expect("Missing WAV.");
		assert_eq!(reader.duration(), 5000);
	}

	#[test]
	fn t_debug() {
		let dir = tempfile::tempdir().expect("Tempdir failed.");
		let dst = dir.path().join("song.wav");
		let opts = RipOptions::default().with_format(OutputFormat::Wav);
		let sink = EncoderSink::open(&dst, &opts).expect("Failed to open sink.");
		let dbg = format!("{sink:?}");
		assert!(dbg.starts_with("EncoderSink"), "Unexpected debug output: {dbg}");
		assert!(dbg.contains("song.wav"), "The files should be listed: {dbg}");
		sink.discard();
	}

	#[test]
	fn t_missing_encoder() {
		let mut sink = EncoderSink::default();
		let res = sink.spawn(&[OsString::from("ripstream-no-such-encoder")], true);
		assert!(matches!(res, Err(RipStreamError::Encoder(_))));
		assert!(! sink.has_encoder());
	}
}
