//! Chunk buffer between the push source and the pacing cycle
//!
//! An ordered queue of byte chunks with a running total. The source adapter
//! appends arbitrarily sized chunks to the back; the pacing cycle extracts
//! exactly frame-sized slices from the front, reassembling across chunk
//! boundaries. The producer-appends-back / consumer-removes-front split is
//! the entire synchronization contract; both sides run on the same engine
//! lock, never concurrently.
//!
//! Invariants:
//! - `total_bytes == sum(chunk.len())` at all times
//! - extraction removes exactly the requested byte count and preserves
//!   chunk order; a partially consumed chunk keeps its remainder at the front
//! - a frame shorter than requested is only ever produced by
//!   `drain_remainder`, the deliberate final drain at end-of-stream

use std::collections::VecDeque;

use bytes::{Bytes, BytesMut};

/// Ordered byte-chunk queue with exact-size frame extraction
#[derive(Debug, Default)]
pub struct ChunkBuffer {
    chunks: VecDeque<Bytes>,
    total_bytes: u64,
}

impl ChunkBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk to the back of the queue
    ///
    /// Never fails; bounding growth is the overflow controller's job.
    /// Zero-length chunks are accepted and contribute nothing.
    pub fn append(&mut self, chunk: Bytes) {
        self.total_bytes += chunk.len() as u64;
        self.chunks.push_back(chunk);
    }

    /// Total buffered bytes
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn is_empty(&self) -> bool {
        self.total_bytes == 0
    }

    /// Number of chunks currently queued
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Extract exactly `frame_byte_length` bytes from the front
    ///
    /// Returns `None` when fewer bytes are buffered; the caller decides
    /// whether end-of-stream justifies draining a final short frame instead.
    /// Fully consumed chunks are discarded as the walk proceeds, so an
    /// emptied chunk can never strand mid-queue.
    pub fn extract_frame(&mut self, frame_byte_length: usize) -> Option<Bytes> {
        if self.total_bytes < frame_byte_length as u64 {
            return None;
        }

        let mut frame = BytesMut::with_capacity(frame_byte_length);
        while frame.len() < frame_byte_length {
            let need = frame_byte_length - frame.len();
            // total_bytes >= frame_byte_length guarantees a front chunk exists
            let front = self
                .chunks
                .front_mut()
                .expect("buffer total says bytes remain");
            if front.len() <= need {
                frame.extend_from_slice(&front[..]);
                self.chunks.pop_front();
            } else {
                frame.extend_from_slice(&front.split_to(need));
            }
        }

        self.total_bytes -= frame_byte_length as u64;
        Some(frame.freeze())
    }

    /// Drain whatever remains as one final short frame
    ///
    /// Used once per source, when the upstream has exhausted with less than a
    /// full frame buffered. Returns `None` on an empty buffer.
    pub fn drain_remainder(&mut self) -> Option<Bytes> {
        if self.total_bytes == 0 {
            self.chunks.clear();
            return None;
        }
        let mut remainder = BytesMut::with_capacity(self.total_bytes as usize);
        for chunk in self.chunks.drain(..) {
            remainder.extend_from_slice(&chunk);
        }
        self.total_bytes = 0;
        Some(remainder.freeze())
    }

    /// Discard all buffered data
    pub fn clear(&mut self) {
        self.chunks.clear();
        self.total_bytes = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk_of(len: usize, fill: u8) -> Bytes {
        Bytes::from(vec![fill; len])
    }

    #[test]
    fn test_append_tracks_total() {
        let mut buf = ChunkBuffer::new();
        buf.append(chunk_of(100, 1));
        buf.append(chunk_of(50, 2));
        buf.append(Bytes::new());
        assert_eq!(buf.total_bytes(), 150);
        assert_eq!(buf.chunk_count(), 3);
    }

    #[test]
    fn test_extract_exact_chunk_boundary() {
        let mut buf = ChunkBuffer::new();
        buf.append(chunk_of(100, 1));
        buf.append(chunk_of(100, 2));

        let frame = buf.extract_frame(100).unwrap();
        assert_eq!(frame.len(), 100);
        assert!(frame.iter().all(|&b| b == 1));
        assert_eq!(buf.total_bytes(), 100);
    }

    #[test]
    fn test_extract_spans_chunks_and_keeps_remainder_at_front() {
        let mut buf = ChunkBuffer::new();
        buf.append(chunk_of(60, 1));
        buf.append(chunk_of(60, 2));

        let frame = buf.extract_frame(100).unwrap();
        assert_eq!(frame.len(), 100);
        assert!(frame[..60].iter().all(|&b| b == 1));
        assert!(frame[60..].iter().all(|&b| b == 2));

        // 20 bytes of the second chunk remain at the front
        assert_eq!(buf.total_bytes(), 20);
        let rest = buf.extract_frame(20).unwrap();
        assert!(rest.iter().all(|&b| b == 2));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_extract_not_enough_leaves_buffer_intact() {
        let mut buf = ChunkBuffer::new();
        buf.append(chunk_of(99, 7));
        assert!(buf.extract_frame(100).is_none());
        assert_eq!(buf.total_bytes(), 99);
        assert_eq!(buf.chunk_count(), 1);
    }

    #[test]
    fn test_three_4000_byte_chunks_yield_one_9600_byte_frame() {
        let mut buf = ChunkBuffer::new();
        buf.append(chunk_of(4000, 1));
        buf.append(chunk_of(4000, 2));
        buf.append(chunk_of(4000, 3));

        let frame = buf.extract_frame(9600).unwrap();
        assert_eq!(frame.len(), 9600);
        assert_eq!(buf.total_bytes(), 2400);

        // Next full frame not available until more data arrives
        assert!(buf.extract_frame(9600).is_none());
    }

    #[test]
    fn test_order_preserved_across_many_misaligned_extractions() {
        let mut buf = ChunkBuffer::new();
        let mut expected = Vec::new();
        for (i, len) in [13usize, 250, 1, 512, 77, 300, 47].iter().enumerate() {
            let data: Vec<u8> = (0..*len).map(|j| (i * 31 + j) as u8).collect();
            expected.extend_from_slice(&data);
            buf.append(Bytes::from(data));
        }

        let mut collected = Vec::new();
        while let Some(frame) = buf.extract_frame(100) {
            assert_eq!(frame.len(), 100);
            collected.extend_from_slice(&frame);
        }
        collected.extend_from_slice(&buf.drain_remainder().unwrap_or_default());
        assert_eq!(collected, expected);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_empty_chunks_do_not_stall_extraction() {
        let mut buf = ChunkBuffer::new();
        buf.append(chunk_of(50, 1));
        buf.append(Bytes::new());
        buf.append(Bytes::new());
        buf.append(chunk_of(50, 2));

        let frame = buf.extract_frame(100).unwrap();
        assert_eq!(frame.len(), 100);
        assert!(buf.is_empty());
        assert_eq!(buf.chunk_count(), 0);
    }

    #[test]
    fn test_drain_remainder_concatenates_tail() {
        let mut buf = ChunkBuffer::new();
        buf.append(chunk_of(30, 1));
        buf.append(chunk_of(40, 2));

        let tail = buf.drain_remainder().unwrap();
        assert_eq!(tail.len(), 70);
        assert!(tail[..30].iter().all(|&b| b == 1));
        assert!(tail[30..].iter().all(|&b| b == 2));
        assert!(buf.is_empty());
        assert!(buf.drain_remainder().is_none());
    }

    #[test]
    fn test_clear() {
        let mut buf = ChunkBuffer::new();
        buf.append(chunk_of(500, 9));
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.chunk_count(), 0);
    }

    #[test]
    fn test_total_decreases_by_exactly_frame_length_regardless_of_alignment() {
        for chunk_len in [1usize, 3, 7, 64, 99, 100, 101, 1000] {
            let mut buf = ChunkBuffer::new();
            let mut pushed = 0u64;
            while pushed < 1000 {
                buf.append(chunk_of(chunk_len, 0));
                pushed += chunk_len as u64;
            }
            let before = buf.total_bytes();
            let frame = buf.extract_frame(100).unwrap();
            assert_eq!(frame.len(), 100);
            assert_eq!(buf.total_bytes(), before - 100);
        }
    }
}
