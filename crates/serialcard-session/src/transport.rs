use std::io::{self, ErrorKind, Read};
#[cfg(unix)]
use std::path::Path;

use serialcard_frame::{FrameAssembler, FrameError, FrameWriter, HEADER_SIZE, MAX_WIRE_SIZE};
use serialcard_link::LinkIo;
#[cfg(unix)]
use serialcard_link::SerialLink;
use tracing::{debug, error, warn};

use crate::config::TransportConfig;
use crate::error::{Result, SessionError};

/// Result of a successful exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The device answered; this many payload bytes were written to the output.
    Data(usize),
    /// Nothing became readable within the response timeout.
    ///
    /// The output holds a single `0x00` byte, so callers that only look at
    /// the reported length and bytes see a one-byte zero answer.
    Empty,
}

impl Outcome {
    /// Number of output bytes the caller should consume.
    pub fn output_len(&self) -> usize {
        match self {
            Outcome::Data(len) => *len,
            Outcome::Empty => 1,
        }
    }

    /// True for the timeout ("zero byte response") case.
    pub fn is_no_response(&self) -> bool {
        matches!(self, Outcome::Empty)
    }

    /// The reported part of `out`.
    pub fn response<'a>(&self, out: &'a [u8]) -> &'a [u8] {
        &out[..self.output_len()]
    }
}

/// Request/response transport over a reader link.
///
/// Owns the link while it is open. A failed read (end-of-stream, I/O error,
/// or a response that cannot be completed) closes the link; after that every
/// exchange fails with [`SessionError::NotOpen`] until a new transport is
/// opened.
pub struct Transport<L> {
    link: Option<L>,
    config: TransportConfig,
    writer: FrameWriter,
    scratch: Box<[u8]>,
}

#[cfg(unix)]
impl Transport<SerialLink> {
    /// Open the serial device at `path` and wrap it in a transport.
    pub fn open(path: impl AsRef<Path>, config: TransportConfig) -> Result<Self> {
        let link = SerialLink::open(path, &config.link)?;
        Ok(Self::new(link, config))
    }
}

impl<L: LinkIo> Transport<L> {
    /// Wrap an already open link.
    pub fn new(link: L, config: TransportConfig) -> Self {
        Self {
            link: Some(link),
            config,
            writer: FrameWriter::new(),
            scratch: vec![0u8; MAX_WIRE_SIZE].into_boxed_slice(),
        }
    }

    /// Send `request` as one frame and read the response into `out`.
    ///
    /// With `wait_for_response`, the link is first given up to the configured
    /// response timeout to become readable; if it doesn't, the exchange
    /// succeeds with [`Outcome::Empty`]. Without it, the read blocks.
    ///
    /// A response split across several reads is reassembled; continuation
    /// reads are never bounded by a timeout. The declared response length
    /// must fit in `out`.
    pub fn exchange(
        &mut self,
        request: &[u8],
        out: &mut [u8],
        wait_for_response: bool,
    ) -> Result<Outcome> {
        let link = self.link.as_mut().ok_or(SessionError::NotOpen)?;

        let written = self.writer.send(link, request).map_err(|err| {
            if let FrameError::ShortWrite { written, expected } = &err {
                error!(written, expected, "short write on link");
            }
            err
        })?;
        debug!(bytes = written, "wrote request frame");

        if !self.config.settle_delay.is_zero() {
            std::thread::sleep(self.config.settle_delay);
        }

        if wait_for_response {
            let timeout = self.config.response_timeout;
            let ready = link.poll_readable(timeout).map_err(|err| {
                error!(error = %err, "did not find any data");
                SessionError::WaitFailed(err)
            })?;
            if !ready {
                warn!(?timeout, "zero byte response");
                return empty_response(out);
            }
        }

        let received = match read_retrying(link, &mut self.scratch) {
            Ok(0) => {
                error!("no response, meaning eof, reader not usable anymore");
                self.close();
                return Err(SessionError::EndOfStream);
            }
            Ok(n) => n,
            Err(err) => {
                error!(error = %err, "response read failed, closing link");
                self.close();
                return Err(SessionError::Read(err));
            }
        };

        if received == 1 {
            debug!(code = self.scratch[0], "1 byte error response");
            return Err(SessionError::ErrorResponse(self.scratch[0]));
        }
        debug!(bytes = received, "got response bytes");

        // Past the header, a failure leaves part of the frame unread.
        match reassemble(link, &self.scratch[..received], out) {
            Ok(len) => Ok(Outcome::Data(len)),
            Err(err) => {
                error!(error = %err, "response incomplete, closing link");
                self.close();
                Err(err)
            }
        }
    }

    /// Release the link if it is open. Safe to call repeatedly.
    pub fn close(&mut self) {
        if self.link.take().is_some() {
            debug!("transport closed");
        }
    }

    /// True while the link is open.
    pub fn is_open(&self) -> bool {
        self.link.is_some()
    }

    /// Borrow the link, if open.
    pub fn link(&self) -> Option<&L> {
        self.link.as_ref()
    }

    /// Mutably borrow the link, if open.
    pub fn link_mut(&mut self) -> Option<&mut L> {
        self.link.as_mut()
    }

    /// Configuration this transport was opened with.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }
}

impl<L> std::fmt::Debug for Transport<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("open", &self.link.is_some())
            .field("config", &self.config)
            .finish()
    }
}

fn empty_response(out: &mut [u8]) -> Result<Outcome> {
    match out.first_mut() {
        Some(byte) => {
            *byte = 0;
            Ok(Outcome::Empty)
        }
        None => Err(FrameError::OutputTooSmall {
            declared: 1,
            capacity: 0,
        }
        .into()),
    }
}

/// Copy the first read into `out` and read the remainder of the frame.
fn reassemble<L: LinkIo>(link: &mut L, first: &[u8], out: &mut [u8]) -> Result<usize> {
    let mut assembler = FrameAssembler::begin(first, out.len()).map_err(|err| match err {
        FrameError::OutputTooSmall { declared, capacity } => {
            SessionError::ResponseTooLarge { declared, capacity }
        }
        other => other.into(),
    })?;
    let surplus = assembler.push(&first[HEADER_SIZE..], out);
    if surplus > 0 {
        warn!(
            surplus,
            declared = assembler.declared(),
            "discarding bytes beyond declared response length"
        );
    }

    while !assembler.is_complete() {
        debug!(
            filled = assembler.filled(),
            declared = assembler.declared(),
            "rereceive"
        );
        match read_retrying(link, assembler.unfilled(out)) {
            Ok(0) => {
                return Err(SessionError::Reassembly {
                    received: assembler.filled(),
                    declared: assembler.declared(),
                });
            }
            Ok(n) => assembler.advance(n),
            Err(source) => {
                return Err(SessionError::ReassemblyRead {
                    received: assembler.filled(),
                    declared: assembler.declared(),
                    source,
                });
            }
        }
    }

    Ok(assembler.declared())
}

fn read_retrying<R: Read>(src: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match src.read(buf) {
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io::Write;
    use std::time::Duration;

    use super::*;

    #[derive(Debug, Clone, Copy)]
    enum Readiness {
        Ready,
        Idle,
        Broken,
    }

    struct ScriptedLink {
        reads: VecDeque<io::Result<Vec<u8>>>,
        readiness: Readiness,
        polls: usize,
        read_sizes: Vec<usize>,
        written: Vec<u8>,
        write_limit: Option<usize>,
    }

    impl ScriptedLink {
        fn new(reads: Vec<io::Result<Vec<u8>>>) -> Self {
            Self {
                reads: reads.into(),
                readiness: Readiness::Ready,
                polls: 0,
                read_sizes: Vec::new(),
                written: Vec::new(),
                write_limit: None,
            }
        }

        fn replies(chunks: &[&[u8]]) -> Self {
            Self::new(chunks.iter().map(|c| Ok(c.to_vec())).collect())
        }
    }

    impl Read for ScriptedLink {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.read_sizes.push(buf.len());
            match self.reads.pop_front() {
                None => Ok(0),
                Some(Err(err)) => Err(err),
                Some(Ok(chunk)) => {
                    let n = chunk.len().min(buf.len());
                    buf[..n].copy_from_slice(&chunk[..n]);
                    if n < chunk.len() {
                        self.reads.push_front(Ok(chunk[n..].to_vec()));
                    }
                    Ok(n)
                }
            }
        }
    }

    impl Write for ScriptedLink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = self.write_limit.map_or(buf.len(), |limit| limit.min(buf.len()));
            self.written.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl LinkIo for ScriptedLink {
        fn poll_readable(&mut self, _timeout: Duration) -> io::Result<bool> {
            self.polls += 1;
            match self.readiness {
                Readiness::Ready => Ok(true),
                Readiness::Idle => Ok(false),
                Readiness::Broken => Err(io::Error::from(ErrorKind::InvalidInput)),
            }
        }
    }

    fn transport(link: ScriptedLink) -> Transport<ScriptedLink> {
        Transport::new(link, TransportConfig::default())
    }

    #[test]
    fn single_read_fast_path() {
        let mut t = transport(ScriptedLink::replies(&[&[0x00, 0x02, 0xAA, 0xBB]]));
        let mut out = [0u8; 16];

        let outcome = t.exchange(&[0x00, 0x02, 0xAA, 0xBB], &mut out, false).unwrap();

        assert_eq!(outcome, Outcome::Data(2));
        assert_eq!(outcome.response(&out), &[0xAA, 0xBB]);
        let link = t.link().unwrap();
        assert_eq!(link.written, vec![0x00, 0x04, 0x00, 0x02, 0xAA, 0xBB]);
        assert_eq!(link.polls, 0, "no readability wait without wait_for_response");
    }

    #[test]
    fn two_read_reassembly() {
        let mut t = transport(ScriptedLink::replies(&[
            &[0x00, 0x05, 0x01, 0x02],
            &[0x03, 0x04, 0x05],
        ]));
        let mut out = [0u8; 16];

        let outcome = t.exchange(&[0x80, 0x10], &mut out, false).unwrap();

        assert_eq!(outcome, Outcome::Data(5));
        assert_eq!(&out[..5], &[0x01, 0x02, 0x03, 0x04, 0x05]);
    }

    #[test]
    fn continuation_reads_are_bounded_by_remaining_length() {
        let mut t = transport(ScriptedLink::replies(&[
            &[0x00, 0x06, 0x10],
            &[0x11, 0x12],
            &[0x13, 0x14, 0x15, 0xEE, 0xEE],
        ]));
        let mut out = [0u8; 64];

        let outcome = t.exchange(&[0x01], &mut out, false).unwrap();

        assert_eq!(outcome, Outcome::Data(6));
        assert_eq!(&out[..6], &[0x10, 0x11, 0x12, 0x13, 0x14, 0x15]);
        assert_eq!(&out[6..8], &[0, 0], "nothing written past the declared length");
        let sizes = &t.link().unwrap().read_sizes;
        assert_eq!(&sizes[1..], &[5, 3]);
    }

    #[test]
    fn single_byte_is_error_response() {
        let mut t = transport(ScriptedLink::replies(&[&[0x00]]));
        let mut out = [0u8; 4];

        let err = t.exchange(&[0x01], &mut out, false).unwrap_err();

        assert!(matches!(err, SessionError::ErrorResponse(0x00)));
        assert!(!err.closes_link());
        assert!(t.is_open());
    }

    #[test]
    fn end_of_stream_closes_link() {
        let mut t = transport(ScriptedLink::new(Vec::new()));
        let mut out = [0u8; 4];

        let err = t.exchange(&[0x01], &mut out, false).unwrap_err();
        assert!(matches!(err, SessionError::EndOfStream));
        assert!(err.closes_link());
        assert!(!t.is_open());

        let err = t.exchange(&[0x01], &mut out, false).unwrap_err();
        assert!(matches!(err, SessionError::NotOpen));
    }

    #[test]
    fn read_error_closes_link() {
        let mut t = transport(ScriptedLink::new(vec![Err(io::Error::from(
            ErrorKind::BrokenPipe,
        ))]));
        let mut out = [0u8; 4];

        let err = t.exchange(&[0x01], &mut out, false).unwrap_err();
        assert!(matches!(err, SessionError::Read(ref e) if e.kind() == ErrorKind::BrokenPipe));
        assert!(!t.is_open());
    }

    #[test]
    fn interrupted_read_is_retried() {
        let mut t = transport(ScriptedLink::new(vec![
            Err(io::Error::from(ErrorKind::Interrupted)),
            Ok(vec![0x00, 0x02, 0x90, 0x00]),
        ]));
        let mut out = [0u8; 4];

        let outcome = t.exchange(&[0x01], &mut out, false).unwrap();
        assert_eq!(outcome, Outcome::Data(2));
    }

    #[test]
    fn reassembly_eof_closes_link() {
        let mut t = transport(ScriptedLink::replies(&[&[0x00, 0x05, 0x01, 0x02]]));
        let mut out = [0u8; 16];

        let err = t.exchange(&[0x01], &mut out, false).unwrap_err();

        assert!(matches!(
            err,
            SessionError::Reassembly {
                received: 2,
                declared: 5
            }
        ));
        assert!(err.closes_link());
        assert!(!t.is_open());
    }

    #[test]
    fn reassembly_read_error() {
        let mut t = transport(ScriptedLink::new(vec![
            Ok(vec![0x00, 0x03, 0x01]),
            Err(io::Error::from(ErrorKind::TimedOut)),
        ]));
        let mut out = [0u8; 16];

        let err = t.exchange(&[0x01], &mut out, false).unwrap_err();
        assert!(matches!(
            err,
            SessionError::ReassemblyRead {
                received: 1,
                declared: 3,
                ..
            }
        ));
        assert!(err.closes_link());
        assert!(!t.is_open());
    }

    #[test]
    fn timeout_reports_zero_byte_response() {
        let mut link = ScriptedLink::replies(&[&[0x00, 0x01, 0x01]]);
        link.readiness = Readiness::Idle;
        let mut t = transport(link);
        let mut out = [0xFFu8; 4];

        let outcome = t.exchange(&[0x01], &mut out, true).unwrap();

        assert_eq!(outcome, Outcome::Empty);
        assert!(outcome.is_no_response());
        assert_eq!(outcome.output_len(), 1);
        assert_eq!(outcome.response(&out), &[0x00]);
        assert_eq!(t.link().unwrap().polls, 1);
        assert!(t.link().unwrap().read_sizes.is_empty(), "no read after timeout");
    }

    #[test]
    fn timeout_needs_room_for_sentinel() {
        let mut link = ScriptedLink::new(Vec::new());
        link.readiness = Readiness::Idle;
        let mut t = transport(link);

        let err = t.exchange(&[0x01], &mut [], true).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Frame(FrameError::OutputTooSmall { capacity: 0, .. })
        ));
        assert!(!err.closes_link());
        assert!(t.is_open());
    }

    #[test]
    fn failed_wait_is_an_error() {
        let mut link = ScriptedLink::new(Vec::new());
        link.readiness = Readiness::Broken;
        let mut t = transport(link);
        let mut out = [0u8; 4];

        let err = t.exchange(&[0x01], &mut out, true).unwrap_err();
        assert!(matches!(err, SessionError::WaitFailed(_)));
        assert!(t.is_open());
    }

    #[test]
    fn wait_then_read_when_readable() {
        let mut t = transport(ScriptedLink::replies(&[&[0x00, 0x01, 0x01]]));
        let mut out = [0u8; 4];

        let outcome = t.exchange(&[0x01], &mut out, true).unwrap();
        assert_eq!(outcome, Outcome::Data(1));
        assert_eq!(out[0], 0x01);
    }

    #[test]
    fn declared_length_must_fit_output() {
        let mut t = transport(ScriptedLink::replies(&[&[0x00, 0x04, 1, 2, 3, 4]]));
        let mut out = [0u8; 2];

        let err = t.exchange(&[0x01], &mut out, false).unwrap_err();
        assert!(matches!(
            err,
            SessionError::ResponseTooLarge {
                declared: 4,
                capacity: 2
            }
        ));
        assert_eq!(out, [0, 0]);
        assert!(!t.is_open());
        let err = t.exchange(&[0x01], &mut [0u8; 8], false).unwrap_err();
        assert!(matches!(err, SessionError::NotOpen));
    }

    #[test]
    fn surplus_bytes_in_first_read_are_dropped() {
        let mut t = transport(ScriptedLink::replies(&[&[0x00, 0x01, 0x90, 0xFF, 0xFF]]));
        let mut out = [0u8; 4];

        let outcome = t.exchange(&[0x01], &mut out, false).unwrap();
        assert_eq!(outcome, Outcome::Data(1));
        assert_eq!(out, [0x90, 0, 0, 0]);
    }

    #[test]
    fn zero_length_response() {
        let mut t = transport(ScriptedLink::replies(&[&[0x00, 0x00]]));
        let mut out = [0u8; 4];

        let outcome = t.exchange(&[0x01], &mut out, false).unwrap();
        assert_eq!(outcome, Outcome::Data(0));
        assert!(outcome.response(&out).is_empty());
    }

    #[test]
    fn oversized_request_rejected_before_write() {
        let mut t = transport(ScriptedLink::new(Vec::new()));
        let request = vec![0u8; 65_536];
        let mut out = [0u8; 4];

        let err = t.exchange(&request, &mut out, false).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Frame(FrameError::PayloadTooLarge { .. })
        ));
        assert!(t.link().unwrap().written.is_empty());
        assert!(t.is_open());
    }

    #[test]
    fn short_write_fails_exchange() {
        let mut link = ScriptedLink::replies(&[&[0x00, 0x00]]);
        link.write_limit = Some(3);
        let mut t = transport(link);
        let mut out = [0u8; 4];

        let err = t.exchange(&[1, 2, 3, 4], &mut out, false).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Frame(FrameError::ShortWrite {
                written: 3,
                expected: 6
            })
        ));
        assert!(t.link().unwrap().read_sizes.is_empty());
    }

    #[test]
    fn close_is_idempotent() {
        let mut t = transport(ScriptedLink::new(Vec::new()));
        assert!(t.is_open());

        t.close();
        t.close();

        assert!(!t.is_open());
        assert!(t.link().is_none());
        let err = t.exchange(&[0x01], &mut [0u8; 2], false).unwrap_err();
        assert!(matches!(err, SessionError::NotOpen));
    }

    #[test]
    fn debug_does_not_dump_buffers() {
        let t = transport(ScriptedLink::new(Vec::new()));
        let text = format!("{t:?}");
        assert!(text.contains("open: true"));
        assert!(text.len() < 512);
    }
}
