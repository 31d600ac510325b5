/*!
# Rip Stream: Library

This crate holds the real-time ripping pipeline: a streaming session pushes
decoded PCM frames through [`SessionEvents`], they pile up in a bounded
[`FrameQueue`], and the [`Ripper`] drains them one track at a time into an
[`EncoderSink`] (an encoder subprocess, and/or WAV/PCM writers).
*/

#![deny(unsafe_code)]

#![warn(
	clippy::filetype_is_file,
	clippy::integer_division,
	clippy::needless_borrow,
	clippy::nursery,
	clippy::pedantic,
	clippy::perf,
	clippy::suboptimal_flops,
	clippy::unneeded_field_pattern,
	macro_use_extern_crate,
	missing_copy_implementations,
	missing_debug_implementations,
	missing_docs,
	non_ascii_idents,
	trivial_casts,
	trivial_numeric_casts,
	unreachable_pub,
	unused_crate_dependencies,
	unused_extern_crates,
	unused_import_braces,
)]

#![allow(
	clippy::doc_markdown,
	clippy::module_name_repetitions,
	clippy::redundant_pub_crate,
)]

mod bridge;
mod error;
mod frame;
mod local;
mod post;
mod rip;
mod schedule;
mod session;
mod signals;
mod sink;

pub use bridge::{
	AudioFormat,
	ConnectionState,
	LoginError,
	SessionEvents,
};
pub use error::RipStreamError;
pub use frame::{
	Frame,
	FrameQueue,
};
pub use local::{
	LocalResolver,
	LocalSession,
};
pub use post::PostActions;
pub use rip::{
	opts::{
		PartialCheck,
		RipOptions,
	},
	Ripper,
	RipReport,
	state::{
		TrackOutcome,
		TrackState,
	},
};
pub(crate) use rip::partial::{
	expected_size,
	is_partial,
};
pub use schedule::{
	ResumeAt,
	StopScheduler,
	TimeOfDay,
};
pub use session::{
	Availability,
	NoTags,
	Resolver,
	Session,
	Tagger,
	Track,
};
pub use signals::{
	Interrupt,
	InterruptAction,
	KillSwitch,
	Signals,
};
pub use sink::{
	EncoderSink,
	format::OutputFormat,
};



/// # Sample Rate.
///
/// Every encoder is told to expect 44.1 kHz input.
pub const SAMPLE_RATE: u32 = 44_100;

/// # Channels.
pub const CHANNELS: u16 = 2;

/// # Bytes Per Frame.
///
/// One frame is one 16-bit sample for each of the two channels.
pub const BYTES_PER_FRAME: u32 = 4;

/// # Bytes Per Second.
///
/// This is the size of one second of raw PCM.
pub const BYTES_PER_SECOND: u32 = SAMPLE_RATE * BYTES_PER_FRAME;

/// # Wave Spec.
pub(crate) const WAVE_SPEC: hound::WavSpec = hound::WavSpec {
	channels: CHANNELS,
	sample_rate: SAMPLE_RATE,
	bits_per_sample: 16,
	sample_format: hound::SampleFormat::Int,
};
