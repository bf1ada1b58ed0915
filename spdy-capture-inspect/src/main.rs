//! Offline SPDY capture inspector
//!
//! Replays one direction of a recorded SPDY connection through a
//! [`FrameReader`] and logs every frame, its decoded header block and the
//! role of each sub-stream.
//!
//! # Usage
//!
//! ```bash
//! # Replay a client->server capture in 4 KiB reads
//! cargo run --bin spdy-capture-inspect -- capture.bin
//!
//! # Small reads to exercise frames split across reads
//! cargo run --bin spdy-capture-inspect -- capture.bin --chunk 7
//!
//! # Server->client capture, reject frames over 64 KiB, log every frame header
//! cargo run --bin spdy-capture-inspect -- capture.bin --server --max-payload 65536 -v
//!
//! # Allow header blocks that inflate to 4 MiB
//! cargo run --bin spdy-capture-inspect -- capture.bin --max-header-block 4194304
//! ```

use std::path::PathBuf;

use anyhow::{Context, bail};
use spdy_capture_core::{
    Direction, Frame, FrameKind, FrameLimits, FrameReader, ResizeDecoder, StreamType, StreamTypes,
};

const DEFAULT_CHUNK_SIZE: usize = 4096;

const USAGE: &str = "usage: spdy-capture-inspect <capture-file> [--max-payload <bytes>] \
                     [--max-header-block <bytes>] [--chunk <bytes>] [--server] [-v]";

#[derive(Debug, Clone, PartialEq, Eq)]
struct Args {
    path: PathBuf,
    limits: FrameLimits,
    chunk_size: usize,
    direction: Direction,
    verbose: bool,
}

impl Args {
    fn parse(args: &[String]) -> anyhow::Result<Self> {
        let mut path = None;
        let mut max_payload = None;
        let mut max_header_block = None;
        let mut chunk_size = DEFAULT_CHUNK_SIZE;
        let mut direction = Direction::ClientToServer;
        let mut verbose = false;

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--max-payload" => max_payload = Some(flag_value(&mut iter, "--max-payload")?),
                "--max-header-block" => {
                    max_header_block = Some(flag_value(&mut iter, "--max-header-block")?);
                }
                "--chunk" => {
                    chunk_size = flag_value(&mut iter, "--chunk")?;
                    if chunk_size == 0 {
                        bail!("--chunk must be at least 1");
                    }
                }
                "--server" => direction = Direction::ServerToClient,
                "-v" | "--verbose" => verbose = true,
                flag if flag.starts_with('-') => bail!("unknown flag {flag}\n{USAGE}"),
                file if path.is_none() => path = Some(PathBuf::from(file)),
                extra => bail!("unexpected argument {extra}\n{USAGE}"),
            }
        }

        let Some(path) = path else {
            bail!("missing capture file\n{USAGE}");
        };

        let mut limits = max_payload.map_or_else(FrameLimits::default, FrameLimits::new);
        if let Some(max) = max_header_block {
            limits = limits.with_max_header_block_size(max);
        }

        Ok(Self {
            path,
            limits,
            chunk_size,
            direction,
            verbose,
        })
    }
}

fn flag_value<'a>(iter: &mut impl Iterator<Item = &'a String>, flag: &str) -> anyhow::Result<usize> {
    let value = iter
        .next()
        .with_context(|| format!("{flag} requires a value"))?;
    value
        .parse()
        .with_context(|| format!("invalid value for {flag}: {value}"))
}

/// Counters reported once the capture is exhausted.
#[derive(Debug, Default, PartialEq, Eq)]
struct Summary {
    control_frames: usize,
    data_frames: usize,
    header_blocks: usize,
    invalid_resizes: usize,
}

/// Per-capture state carried across frames.
#[derive(Debug, Default)]
struct Session {
    streams: StreamTypes,
    resize: ResizeDecoder,
    summary: Summary,
}

/// Feed `data` through `reader` in `chunk_size` reads, logging as frames
/// complete.
fn inspect(reader: &mut FrameReader, data: &[u8], chunk_size: usize) -> anyhow::Result<Summary> {
    let mut session = Session::default();

    for chunk in data.chunks(chunk_size) {
        reader.extend(chunk);
        while let Some(frame) = reader.next_frame()? {
            inspect_frame(reader, &mut session, &frame)?;
        }
    }

    if reader.buffered() > 0 {
        bail!(
            "capture ended with {} bytes of incomplete frame data",
            reader.buffered()
        );
    }

    Ok(session.summary)
}

fn inspect_frame(
    reader: &mut FrameReader,
    session: &mut Session,
    frame: &Frame,
) -> anyhow::Result<()> {
    let summary = &mut session.summary;
    match frame.kind() {
        FrameKind::Control { version, kind } => {
            summary.control_frames += 1;
            tracing::info!(
                kind = %kind,
                version,
                flags = frame.flags(),
                len = frame.payload().len(),
                "control frame"
            );

            let headers = reader
                .decode_headers(frame)
                .with_context(|| format!("decoding {kind} header block"))?;
            if let Some(headers) = headers {
                summary.header_blocks += 1;
                for (name, values) in headers.iter() {
                    for value in values {
                        tracing::info!(
                            name = %String::from_utf8_lossy(name),
                            value = %String::from_utf8_lossy(value),
                            "  header"
                        );
                    }
                }
                if let Some(stream_type) = session.streams.observe(frame, &headers) {
                    tracing::info!(stream_type = %stream_type, "  opens sub-stream");
                }
            }
        }
        FrameKind::Data { stream_id } => {
            summary.data_frames += 1;
            let stream_type = session.streams.get(stream_id);
            tracing::info!(
                stream_id,
                stream_type = stream_type.map_or("unknown", StreamType::as_str),
                fin = frame.is_fin(),
                len = frame.payload().len(),
                "data frame"
            );

            if stream_type == Some(&StreamType::Resize) {
                match session.resize.push(frame.payload()) {
                    Ok(sizes) => {
                        for size in sizes {
                            tracing::info!(
                                width = size.width,
                                height = size.height,
                                "  terminal resize"
                            );
                        }
                    }
                    Err(error) => {
                        summary.invalid_resizes += 1;
                        tracing::warn!(stream_id, %error, "  skipping resize message");
                    }
                }
            }
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let args = Args::parse(&args)?;

    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let data = std::fs::read(&args.path)
        .with_context(|| format!("reading {}", args.path.display()))?;
    tracing::info!(
        path = %args.path.display(),
        bytes = data.len(),
        direction = %args.direction,
        chunk = args.chunk_size,
        "inspecting capture"
    );

    let mut reader = FrameReader::with_limits(args.direction, args.limits);
    let summary = inspect(&mut reader, &data, args.chunk_size)?;

    tracing::info!(
        control_frames = summary.control_frames,
        data_frames = summary.data_frames,
        header_blocks = summary.header_blocks,
        invalid_resizes = summary.invalid_resizes,
        "capture complete"
    );
    Ok(())
}
