use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

/// Writes each line to a console stream and, when a path was given, to a
/// file as well. The file is created lazily on the first write so an
/// untouched writer leaves nothing behind.
///
/// The first write failure is kept so callers that cannot propagate from a
/// per-line sink can still surface it once the run is over.
pub struct TeeWriter<W: Write> {
    console: W,
    file_path: Option<PathBuf>,
    file: Option<BufWriter<File>>,
    error: Option<io::Error>,
}

impl<W: Write> TeeWriter<W> {
    pub fn new(console: W, file_path: Option<PathBuf>) -> Self {
        Self {
            console,
            file_path,
            file: None,
            error: None,
        }
    }

    pub fn write_line(&mut self, line: &str) -> io::Result<()> {
        if let Err(error) = writeln!(self.console, "{line}") {
            return Err(self.record(error));
        }
        if let Err(error) = self.write_file_line(line) {
            // File output is done for; later lines go to the console only.
            self.file_path = None;
            self.file = None;
            return Err(self.record(error));
        }
        Ok(())
    }

    fn write_file_line(&mut self, line: &str) -> io::Result<()> {
        let Some(path) = &self.file_path else {
            return Ok(());
        };
        if self.file.is_none() {
            self.file = Some(BufWriter::new(File::create(path)?));
        }
        if let Some(file) = &mut self.file {
            writeln!(file, "{line}")?;
        }
        Ok(())
    }

    fn record(&mut self, error: io::Error) -> io::Error {
        if self.error.is_none() {
            self.error = Some(io::Error::new(error.kind(), error.to_string()));
        }
        error
    }

    /// The first write failure seen, if any. Taking it resets the record.
    pub fn take_error(&mut self) -> Option<io::Error> {
        self.error.take()
    }

    /// True once at least one line went to the file.
    pub fn has_written_file(&self) -> bool {
        self.file.is_some()
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.console.flush()?;
        if let Some(file) = &mut self.file {
            file.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn tees_lines_to_console_and_file() {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join("out.txt");
        let mut console = Vec::new();

        {
            let mut writer = TeeWriter::new(&mut console, Some(path.clone()));
            writer.write_line("first").expect("write");
            writer.write_line("second").expect("write");
            writer.flush().expect("flush");
            assert!(writer.has_written_file());
        }

        assert_eq!(String::from_utf8_lossy(&console), "first\nsecond\n");
        assert_eq!(
            std::fs::read_to_string(&path).expect("read"),
            "first\nsecond\n"
        );
    }

    #[test]
    fn file_is_only_created_on_first_write() {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join("never.txt");

        let writer = TeeWriter::new(Vec::new(), Some(path.clone()));
        assert!(!writer.has_written_file());
        assert!(!path.exists());
    }

    #[test]
    fn failed_file_writes_are_recorded_and_reported() {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join("no-such-dir").join("out.txt");
        let mut console = Vec::new();

        let mut writer = TeeWriter::new(&mut console, Some(path));
        assert!(writer.write_line("lost").is_err());
        assert!(!writer.has_written_file());
        assert!(writer.flush().is_ok());

        // Later lines keep flowing to the console.
        writer.write_line("kept").expect("console write");

        let error = writer.take_error().expect("recorded error");
        assert_eq!(error.kind(), io::ErrorKind::NotFound);
        assert!(writer.take_error().is_none());
        drop(writer);
        assert_eq!(String::from_utf8_lossy(&console), "lost\nkept\n");
    }

    #[test]
    fn console_only_when_no_path_given() {
        let mut console = Vec::new();
        let mut writer = TeeWriter::new(&mut console, None);
        writer.write_line("hello").expect("write");
        assert!(!writer.has_written_file());
        assert_eq!(String::from_utf8_lossy(&console), "hello\n");
    }
}
