//! Frame decoders: where decoded payloads come from.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};

use super::{CameraError, DecodeEvent, FrameDecoder};

/// Prefix zbar puts in front of QR payloads unless run with `--raw`.
const ZBAR_QR_PREFIX: &str = "QR-Code:";

/// One payload per line, as printed by zbar tools.
pub struct LineDecoder<R> {
    reader: R,
    line: String,
}

impl<R> LineDecoder<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
        }
    }
}

#[async_trait]
impl<R> FrameDecoder for LineDecoder<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn next_event(&mut self) -> Option<DecodeEvent> {
        self.line.clear();
        match self.reader.read_line(&mut self.line).await {
            Ok(0) => None,
            Ok(_) => Some(DecodeEvent::Decoded(payload(&self.line).to_string())),
            Err(e) => Some(DecodeEvent::Failed(CameraError::Stream(e.to_string()))),
        }
    }
}

/// Strip the line ending and zbar's symbology prefix.
fn payload(line: &str) -> &str {
    let line = line.trim_end_matches(['\r', '\n']);
    line.strip_prefix(ZBAR_QR_PREFIX).unwrap_or(line)
}

/// A scanner program (e.g. `zbarcam --raw --nodisplay`) read over stdout.
///
/// The child is killed when the decoder is dropped, which is how closing
/// the panel releases the camera.
pub struct CommandDecoder {
    child: Child,
    lines: LineDecoder<BufReader<ChildStdout>>,
}

impl CommandDecoder {
    /// Start the scanner program.
    pub fn spawn(program: &str, args: &[String]) -> Result<Self, CameraError> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CameraError::Access(format!("failed to start {program}: {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CameraError::Access(format!("no output from {program}")))?;

        tracing::debug!(program, "scanner started");

        Ok(Self {
            child,
            lines: LineDecoder::new(BufReader::new(stdout)),
        })
    }
}

#[async_trait]
impl FrameDecoder for CommandDecoder {
    async fn next_event(&mut self) -> Option<DecodeEvent> {
        if let Some(event) = self.lines.next_event().await {
            return Some(event);
        }

        // Output closed: report a failing exit, otherwise a plain end of stream.
        match self.child.wait().await {
            Ok(status) if status.success() => None,
            Ok(status) => Some(DecodeEvent::Failed(CameraError::Exited(status.to_string()))),
            Err(e) => Some(DecodeEvent::Failed(CameraError::Stream(e.to_string()))),
        }
    }
}
