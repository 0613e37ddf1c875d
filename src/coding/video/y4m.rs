//! YUV4MPEG2 (`.y4m`) frame source.
//!
//! A stream is a single header line followed by frames, each a `FRAME` line
//! and the raw planes. Only the luma plane is kept; chroma planes are
//! skipped according to the header's `C` tag.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use log::debug;
use ndarray::Array2;

use super::motion::Frame;
use crate::error::{Error, Result};

const MAGIC: &str = "YUV4MPEG2";
const FRAME_TAG: &str = "FRAME";

/// Largest frame, luma and chroma together, a header may declare.
pub const MAX_FRAME_BYTES: usize = 1 << 28;

/// Frame rate written by [`write_frames`].
pub const DEFAULT_FRAME_RATE: (u32, u32) = (25, 1);

/// Chroma subsampling layout of an 8-bit stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chroma {
    C420,
    C411,
    C422,
    C444,
    C444Alpha,
    Mono,
}

impl Chroma {
    fn parse(tag: &str) -> Result<Self> {
        match tag {
            "420" | "420jpeg" | "420paldv" | "420mpeg2" => Ok(Chroma::C420),
            "411" => Ok(Chroma::C411),
            "422" => Ok(Chroma::C422),
            "444" => Ok(Chroma::C444),
            "444alpha" => Ok(Chroma::C444Alpha),
            "mono" => Ok(Chroma::Mono),
            other => Err(Error::MalformedStream(format!(
                "unsupported colorspace C{}",
                other
            ))),
        }
    }

    /// Bytes following the luma plane in each frame, `None` on overflow.
    fn trailing_bytes(&self, width: usize, height: usize) -> Option<usize> {
        let (planes, plane) = match self {
            Chroma::C420 => (2, width.div_ceil(2).checked_mul(height.div_ceil(2))?),
            Chroma::C411 => (2, width.div_ceil(4).checked_mul(height)?),
            Chroma::C422 => (2, width.div_ceil(2).checked_mul(height)?),
            Chroma::C444 => (2, width.checked_mul(height)?),
            Chroma::C444Alpha => (3, width.checked_mul(height)?),
            Chroma::Mono => (0, 0),
        };
        plane.checked_mul(planes)
    }
}

/// Parsed stream header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Y4mHeader {
    pub width: usize,
    pub height: usize,
    pub chroma: Chroma,
    pub frame_rate: Option<(u32, u32)>,
}

impl Y4mHeader {
    /// Luma and trailing chroma byte counts of one frame.
    ///
    /// Fails when the sizes overflow or exceed [`MAX_FRAME_BYTES`].
    pub fn plane_sizes(&self) -> Result<(usize, usize)> {
        let luma = self.width.checked_mul(self.height);
        let chroma = self.chroma.trailing_bytes(self.width, self.height);
        match (luma, chroma) {
            (Some(luma), Some(chroma))
                if luma
                    .checked_add(chroma)
                    .is_some_and(|total| total <= MAX_FRAME_BYTES) =>
            {
                Ok((luma, chroma))
            }
            _ => Err(Error::MalformedStream(format!(
                "{}x{} frame exceeds {} bytes",
                self.width, self.height, MAX_FRAME_BYTES
            ))),
        }
    }

    fn parse(line: &str) -> Result<Self> {
        let mut tokens = line.split_ascii_whitespace();
        if tokens.next() != Some(MAGIC) {
            return Err(Error::MalformedStream(format!(
                "missing {} signature",
                MAGIC
            )));
        }

        let mut width = None;
        let mut height = None;
        let mut chroma = Chroma::C420;
        let mut frame_rate = None;
        for token in tokens {
            let mut chars = token.chars();
            let tag = chars.next();
            let value = chars.as_str();
            match tag {
                Some('W') => width = Some(parse_dimension(value, "width")?),
                Some('H') => height = Some(parse_dimension(value, "height")?),
                Some('C') => chroma = Chroma::parse(value)?,
                Some('F') => {
                    frame_rate = value
                        .split_once(':')
                        .and_then(|(n, d)| Some((n.parse().ok()?, d.parse().ok()?)));
                }
                // Interlacing, aspect ratio and extensions do not affect the layout.
                _ => {}
            }
        }

        let header = match (width, height) {
            (Some(width), Some(height)) => Self {
                width,
                height,
                chroma,
                frame_rate,
            },
            _ => {
                return Err(Error::MalformedStream(
                    "header must give both W and H".to_string(),
                ))
            }
        };
        header.plane_sizes()?;
        Ok(header)
    }
}

fn parse_dimension(value: &str, name: &str) -> Result<usize> {
    match value.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(Error::MalformedStream(format!("invalid {} {:?}", name, value))),
    }
}

/// Reads luma planes from a YUV4MPEG2 stream.
///
/// # Examples
///
/// ```rust
/// use coding_techniques::coding::video::y4m::Y4mReader;
///
/// let mut data = b"YUV4MPEG2 W2 H2 Cmono\nFRAME\n".to_vec();
/// data.extend_from_slice(&[1, 2, 3, 4]);
/// let mut reader = Y4mReader::new(&data[..]).unwrap();
/// let frame = reader.read_frame().unwrap().unwrap();
/// assert_eq!(frame[[1, 0]], 3);
/// assert!(reader.read_frame().unwrap().is_none());
/// ```
#[derive(Debug)]
pub struct Y4mReader<R> {
    reader: R,
    header: Y4mHeader,
}

impl Y4mReader<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::new(BufReader::new(file))
    }
}

impl<R: BufRead> Y4mReader<R> {
    pub fn new(mut reader: R) -> Result<Self> {
        let line = read_line(&mut reader)?
            .ok_or_else(|| Error::MalformedStream("empty stream".to_string()))?;
        let header = Y4mHeader::parse(&line)?;
        debug!("Opened y4m stream: {:?}", header);
        Ok(Self { reader, header })
    }

    pub fn header(&self) -> &Y4mHeader {
        &self.header
    }

    /// Reads the next frame's luma plane, or `None` at end of stream.
    pub fn read_frame(&mut self) -> Result<Option<Frame>> {
        let Some(line) = read_line(&mut self.reader)? else {
            return Ok(None);
        };
        if !line.starts_with(FRAME_TAG) {
            return Err(Error::MalformedStream(format!(
                "expected {} marker, found {:?}",
                FRAME_TAG, line
            )));
        }

        let (luma_bytes, chroma_bytes) = self.header.plane_sizes()?;
        let mut luma = vec![0u8; luma_bytes];
        self.reader
            .read_exact(&mut luma)
            .map_err(|err| truncated(err, "luma plane"))?;

        let trailing = chroma_bytes as u64;
        let skipped = io::copy(&mut (&mut self.reader).take(trailing), &mut io::sink())?;
        if skipped != trailing {
            return Err(Error::MalformedStream("truncated chroma planes".to_string()));
        }

        let shape = (self.header.height, self.header.width);
        Ok(Some(Array2::from_shape_vec(shape, luma)?))
    }
}

impl<R: BufRead> Iterator for Y4mReader<R> {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_frame().transpose()
    }
}

/// One header or frame line without its newline, `None` at end of stream.
fn read_line<R: BufRead>(reader: &mut R) -> Result<Option<String>> {
    let mut buf = Vec::new();
    if reader.read_until(b'\n', &mut buf)? == 0 {
        return Ok(None);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
    }
    String::from_utf8(buf)
        .map(Some)
        .map_err(|_| Error::MalformedStream("stream line is not valid UTF-8".to_string()))
}

fn truncated(err: io::Error, what: &str) -> Error {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        Error::MalformedStream(format!("truncated {}", what))
    } else {
        Error::Io(err)
    }
}

/// Writes frames as a 4:2:0 stream with neutral chroma.
///
/// All frames must share one shape.
pub fn write_frames<W: Write>(writer: W, frames: &[Frame]) -> Result<()> {
    let Some(first) = frames.first() else {
        return Err(Error::invalid_input("cannot write a stream with no frames"));
    };
    let (height, width) = first.dim();
    let mut writer = BufWriter::new(writer);
    writeln!(
        writer,
        "{} W{} H{} F{}:{} Ip A1:1 C420jpeg",
        MAGIC, width, height, DEFAULT_FRAME_RATE.0, DEFAULT_FRAME_RATE.1
    )?;

    let chroma_bytes = Chroma::C420
        .trailing_bytes(width, height)
        .ok_or_else(|| Error::invalid_input("frame shape overflows the chroma planes"))?;
    let chroma = vec![128u8; chroma_bytes];
    for frame in frames {
        if frame.dim() != (height, width) {
            return Err(Error::invalid_input(format!(
                "frame {:?} differs from stream shape {:?}",
                frame.dim(),
                (height, width)
            )));
        }
        writeln!(writer, "{}", FRAME_TAG)?;
        match frame.as_slice() {
            Some(plane) => writer.write_all(plane)?,
            None => writer.write_all(&frame.iter().copied().collect::<Vec<u8>>())?,
        }
        writer.write_all(&chroma)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes frames to a `.y4m` file.
pub fn save_frames<P: AsRef<Path>>(path: P, frames: &[Frame]) -> Result<()> {
    write_frames(File::create(path)?, frames)
}
