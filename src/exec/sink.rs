// src/exec/sink.rs

//! Shared output sink for the supervised child.
//!
//! Both stdout and stderr of the child are pumped into one writer. Each chunk
//! is tinted with a truecolor escape so child output stands apart from the
//! supervisor's own log lines.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

/// Colour used for child output.
pub const CHILD_OUTPUT_RGB: (u8, u8, u8) = (255, 219, 153);

pub const RESET_COLOR: &str = "\x1b[0m";

/// Clear the terminal and move the cursor home.
pub const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// Truecolor foreground escape sequence.
pub fn rgb(r: u8, g: u8, b: u8) -> String {
    format!("\x1b[38;2;{r};{g};{b}m")
}

type SharedWriter = Arc<Mutex<Box<dyn AsyncWrite + Send + Unpin>>>;

/// Cloneable handle to the single writer all child output goes through.
#[derive(Clone)]
pub struct OutputSink {
    writer: SharedWriter,
    color: Option<String>,
}

impl std::fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputSink")
            .field("colored", &self.color.is_some())
            .finish_non_exhaustive()
    }
}

impl OutputSink {
    /// Sink over the process stdout.
    pub fn stdout(colored: bool) -> Self {
        Self::from_writer(tokio::io::stdout(), colored)
    }

    /// Sink that throws everything away.
    pub fn discard() -> Self {
        Self::from_writer(tokio::io::sink(), false)
    }

    pub fn from_writer<W>(writer: W, colored: bool) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let (r, g, b) = CHILD_OUTPUT_RGB;
        Self {
            writer: Arc::new(Mutex::new(Box::new(writer))),
            color: colored.then(|| rgb(r, g, b)),
        }
    }

    /// Write one chunk of child output, tinted if colour is enabled.
    pub async fn write_chunk(&self, chunk: &[u8]) -> std::io::Result<()> {
        let mut writer = self.writer.lock().await;
        match &self.color {
            Some(color) => {
                writer.write_all(color.as_bytes()).await?;
                writer.write_all(chunk).await?;
                writer.write_all(RESET_COLOR.as_bytes()).await?;
            }
            None => writer.write_all(chunk).await?,
        }
        writer.flush().await
    }

    /// Write raw text (terminal control sequences) without tinting.
    pub async fn write_raw(&self, text: &str) -> std::io::Result<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(text.as_bytes()).await?;
        writer.flush().await
    }

    /// Copy `reader` into the sink until EOF.
    pub fn pump<R>(&self, mut reader: R, stream: &'static str) -> JoinHandle<()>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let sink = self.clone();
        tokio::spawn(async move {
            let mut buf = vec![0u8; 8 * 1024];
            loop {
                match reader.read(&mut buf).await {
                    Ok(0) => break,
                    Ok(n) => {
                        if let Err(err) = sink.write_chunk(&buf[..n]).await {
                            debug!(stream, error = %err, "output sink closed; stopping pump");
                            break;
                        }
                    }
                    Err(err) => {
                        debug!(stream, error = %err, "reading child output failed");
                        break;
                    }
                }
            }
        })
    }
}
