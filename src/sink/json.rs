//! JSON-lines sink: one `{"time": ..., "fields": {...}}` object per frame.

use crate::error::TeleinfoError;
use crate::sink::{FrameSink, TimestampedFrame};
use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};

pub struct JsonLinesSink<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        JsonLinesSink { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl JsonLinesSink<tokio::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> FrameSink for JsonLinesSink<W> {
    fn name(&self) -> &'static str {
        "json"
    }

    async fn write_frame(&mut self, frame: &TimestampedFrame) -> Result<(), TeleinfoError> {
        let mut line = serde_json::to_vec(frame)?;
        line.push(b'\n');
        self.writer.write_all(&line).await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), TeleinfoError> {
        self.writer.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::teleinfo::frame::{Field, Frame};

    #[tokio::test]
    async fn test_one_object_per_line() {
        let mut sink = JsonLinesSink::new(Vec::new());
        for iinst in [4i64, 5] {
            let frame: Frame = [Field::new("IINST", iinst), Field::new("PTEC", "HP..")]
                .into_iter()
                .collect();
            sink.write_frame(&TimestampedFrame::now(frame)).await.unwrap();
        }

        let out = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["fields"]["IINST"], 5);
        assert_eq!(lines[1]["fields"]["PTEC"], "HP..");
        assert!(lines[0]["time"].is_string());
    }
}
