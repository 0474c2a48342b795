use crate::error::Result;
use serde::Serialize;
use std::io::Write;

/// Writes one JSON document per line.
pub struct JsonLinesWriter<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn write<T: Serialize>(&mut self, value: &T) -> Result<()> {
        serde_json::to_writer(&mut self.writer, value)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::redemption::ResultView;

    #[test]
    fn test_writes_one_document_per_line() {
        let mut writer = JsonLinesWriter::new(Vec::new());
        writer.write(&ResultView::from_navigation(None)).unwrap();
        writer.write(&serde_json::json!({"n": 1})).unwrap();

        let text = String::from_utf8(writer.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"view\":\"no_data\""));
        assert_eq!(lines[1], "{\"n\":1}");
    }
}
