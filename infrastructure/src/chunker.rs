//! Positional sliding-window chunking of extracted report text.

use domain::errors::PipelineError;

#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Chunker {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, PipelineError> {
        if chunk_size == 0 || overlap >= chunk_size {
            return Err(PipelineError::Config(format!(
                "chunk overlap ({overlap}) must be smaller than chunk size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn step(&self) -> usize {
        self.chunk_size - self.overlap
    }

    /// Windows of `chunk_size` characters starting every `step()` characters.
    ///
    /// A window starts at every offset below the text length, so the tail may produce
    /// short chunks that lie entirely inside their predecessor. Offsets count chars, not
    /// bytes, so a multi-byte character is never split.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let bounds: Vec<usize> = text
            .char_indices()
            .map(|(offset, _)| offset)
            .chain(std::iter::once(text.len()))
            .collect();
        let char_len = bounds.len() - 1;

        (0..char_len)
            .step_by(self.step())
            .map(|start| {
                let end = (start + self.chunk_size).min(char_len);
                text[bounds[start]..bounds[end]].to_string()
            })
            .collect()
    }
}
