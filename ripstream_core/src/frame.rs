/*!
# Rip Stream: Frames
*/

use crossbeam_channel::{
	Receiver,
	RecvTimeoutError,
	Sender,
	TrySendError,
};
use crate::BYTES_PER_FRAME;
use fyi_msg::Msg;
use std::time::Duration;



/// # Minimum Queue Capacity.
const QUEUE_MIN: usize = 1;



#[derive(Debug, Clone, Eq, PartialEq)]
/// # Audio Frame.
///
/// One delivery worth of decoded audio: interleaved, little-endian, signed
/// 16-bit stereo samples, along with the sample rate they were decoded at.
///
/// Frames are immutable once built; the queue owns them until the ripper
/// takes them back out.
pub struct Frame {
	sample_rate: u32,
	data: Vec<u8>,
	frames: u32,
}

impl Frame {
	#[must_use]
	/// # New.
	pub const fn new(sample_rate: u32, data: Vec<u8>, frames: u32) -> Self {
		Self { sample_rate, data, frames }
	}

	#[must_use]
	/// # Sample Rate.
	pub const fn sample_rate(&self) -> u32 { self.sample_rate }

	#[must_use]
	/// # Raw Bytes.
	pub fn data(&self) -> &[u8] { &self.data }

	#[must_use]
	/// # Frame Count.
	pub const fn frames(&self) -> u32 { self.frames }

	#[must_use]
	/// # Byte Length.
	pub fn len(&self) -> usize { self.data.len() }

	#[must_use]
	/// # Is Empty?
	pub fn is_empty(&self) -> bool { self.data.is_empty() }

	#[must_use]
	/// # Whole Frames?
	///
	/// Returns `true` if the byte length matches the frame count.
	pub fn is_consistent(&self) -> bool {
		u32::try_from(self.data.len()).ok()
			.and_then(|len| self.frames.checked_mul(BYTES_PER_FRAME).map(|v| v == len))
			.unwrap_or(false)
	}
}



#[derive(Debug, Clone)]
/// # Frame Queue.
///
/// This is the one and only hand-off point between the session's delivery
/// callback (the producer) and the ripping loop (the consumer).
///
/// The queue is bounded. Producers never block: if the queue is full, the
/// frame is dropped and a warning is printed. Consumers wait up to a given
/// timeout for each frame.
///
/// Both ends of the channel live here, so it can never disconnect.
pub struct FrameQueue {
	tx: Sender<Frame>,
	rx: Receiver<Frame>,
	capacity: usize,
}

impl FrameQueue {
	#[must_use]
	/// # New.
	///
	/// Capacity is clamped to at least one frame.
	pub fn new(capacity: usize) -> Self {
		let capacity = capacity.max(QUEUE_MIN);
		let (tx, rx) = crossbeam_channel::bounded(capacity);
		Self { tx, rx, capacity }
	}

	#[must_use]
	/// # Enqueue.
	///
	/// Push a frame onto the end of the queue, returning `true` if it was
	/// accepted.
	///
	/// If the queue is full, the frame is thrown away and `false` is
	/// returned. This never blocks.
	///
	/// Note: dropped frames mean dropped audio. The ripping loop will still
	/// finish the track, just with a gap in it.
	pub fn enqueue(&self, frame: Frame) -> bool {
		match self.tx.try_send(frame) {
			Ok(()) => true,
			Err(TrySendError::Full(_)) => {
				Msg::warning("The frame queue is full; dropped music data.").eprint();
				false
			},
			// We hold the receiver, so this can't happen.
			Err(TrySendError::Disconnected(_)) => false,
		}
	}

	#[must_use]
	/// # Dequeue.
	///
	/// Pop the oldest frame, waiting up to `timeout` for one to arrive.
	/// `None` is returned if the wait times out.
	pub fn dequeue(&self, timeout: Duration) -> Option<Frame> {
		match self.rx.recv_timeout(timeout) {
			Ok(frame) => Some(frame),
			Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
		}
	}

	/// # Clear.
	///
	/// Throw away everything currently in the queue, returning the number of
	/// frames discarded.
	pub fn clear(&self) -> usize { self.rx.try_iter().count() }

	#[must_use]
	/// # Capacity.
	pub const fn capacity(&self) -> usize { self.capacity }

	#[must_use]
	/// # Is Empty?
	pub fn is_empty(&self) -> bool { self.rx.is_empty() }

	#[must_use]
	/// # Is Full?
	pub fn is_full(&self) -> bool { self.rx.is_full() }

	#[must_use]
	/// # Length.
	pub fn len(&self) -> usize { self.rx.len() }
}
