//! Host update sink writing the image to a plain file

use log::{error, info, warn};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use super::UpdateSink;
use crate::error::UpdateError;

pub struct FileUpdateSink {
    image_path: String,
    target: PathBuf,
    writer: Option<BufWriter<File>>,
    written: u64,
}

impl FileUpdateSink {
    pub fn new(image_path: impl Into<String>, target: impl Into<PathBuf>) -> Self {
        Self {
            image_path: image_path.into(),
            target: target.into(),
            writer: None,
            written: 0,
        }
    }
}

impl UpdateSink for FileUpdateSink {
    fn accepts(&self, path: &str) -> bool {
        path == self.image_path
    }

    fn begin(&mut self) -> Result<(), UpdateError> {
        if self.writer.is_some() {
            return Err(UpdateError::Busy);
        }
        let file = File::create(&self.target)?;
        self.writer = Some(BufWriter::new(file));
        self.written = 0;
        info!("Update started, writing image to {}", self.target.display());
        Ok(())
    }

    fn write_chunk(&mut self, data: &[u8]) -> Result<(), UpdateError> {
        let writer = self.writer.as_mut().ok_or(UpdateError::NotStarted)?;
        writer
            .write_all(data)
            .map_err(|e| UpdateError::Write(e.to_string()))?;
        self.written += data.len() as u64;
        Ok(())
    }

    fn finalize(&mut self) {
        match self.writer.take() {
            Some(mut writer) => match writer.flush() {
                Ok(()) => info!(
                    "Update image committed: {} bytes to {}",
                    self.written,
                    self.target.display()
                ),
                Err(e) => error!("Failed to flush update image: {}", e),
            },
            None => warn!("Update finalize without an active update"),
        }
    }
}
