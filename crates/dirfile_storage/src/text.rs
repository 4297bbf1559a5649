//! ASCII text data files.

use crate::encoding::{AccessMode, EncodedFile, Encoding, EncodingKind};
use crate::error::{StorageError, StorageResult};
use dirfile_types::{DataType, Scalar};
use std::fs;
use std::path::{Path, PathBuf};

/// Suffix of text-encoded data files.
pub const TEXT_SUFFIX: &str = ".txt";

/// The text encoding: one sample per line, complex samples as `re;im`.
///
/// The whole file is loaded on open. Writes modify the in-memory copy and
/// the file is rewritten (temp file + rename) on flush or close.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextEncoding;

impl Encoding for TextEncoding {
    fn kind(&self) -> EncodingKind {
        EncodingKind::Text
    }

    fn suffix(&self) -> &'static str {
        TEXT_SUFFIX
    }

    fn open(
        &self,
        base: &Path,
        mode: AccessMode,
        create: bool,
    ) -> StorageResult<Box<dyn EncodedFile>> {
        let path = self.data_path(base);
        let lines = match fs::read_to_string(&path) {
            Ok(text) => text
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_owned)
                .collect(),
            Err(e)
                if e.kind() == std::io::ErrorKind::NotFound && create && mode.is_writable() =>
            {
                fs::write(&path, "")?;
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Box::new(TextFile {
            path,
            lines,
            pos: 0,
            dirty: false,
            writable: mode.is_writable(),
        }))
    }
}

/// An open text data file.
#[derive(Debug)]
pub struct TextFile {
    path: PathBuf,
    lines: Vec<String>,
    pos: usize,
    dirty: bool,
    writable: bool,
}

impl TextFile {
    fn parse(&self, line: &str, index: usize) -> StorageResult<Scalar> {
        let bad = || {
            StorageError::Corrupted(format!(
                "{}: line {}: cannot parse {line:?}",
                self.path.display(),
                index + 1
            ))
        };

        if let Some((re, im)) = line.split_once(';') {
            let re = re.trim().parse::<f64>().map_err(|_| bad())?;
            let im = im.trim().parse::<f64>().map_err(|_| bad())?;
            return Ok(Scalar::Complex(re, im));
        }
        if let Ok(v) = line.parse::<i128>() {
            return Ok(Scalar::Int(v));
        }
        line.parse::<f64>().map(Scalar::Float).map_err(|_| bad())
    }

    fn format(value: Scalar) -> String {
        match value {
            Scalar::Int(v) => v.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Complex(re, im) => format!("{re};{im}"),
        }
    }
}

impl EncodedFile for TextFile {
    fn encoding_name(&self) -> &'static str {
        EncodingKind::Text.name()
    }

    fn byte_oriented(&self) -> bool {
        false
    }

    fn seek(&mut self, sample: u64, _ty: DataType, _writing: bool) -> StorageResult<()> {
        self.pos = usize::try_from(sample).map_err(|_| StorageError::out_of_range(sample))?;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8], ty: DataType, count: usize) -> StorageResult<usize> {
        let size = ty.size();
        let end = self.pos.saturating_add(count).min(self.lines.len());
        let mut n = 0;
        for (index, chunk) in (self.pos..end).zip(buf.chunks_exact_mut(size)) {
            self.parse(&self.lines[index], index)?.write(ty, chunk);
            n += 1;
        }
        self.pos += n;
        Ok(n)
    }

    fn write(&mut self, buf: &[u8], ty: DataType, count: usize) -> StorageResult<usize> {
        if !self.writable {
            return Err(StorageError::ReadOnly {
                path: self.path.display().to_string(),
            });
        }
        if self.lines.len() < self.pos {
            self.lines.resize(self.pos, "0".to_owned());
        }

        let mut n = 0;
        for chunk in buf.chunks_exact(ty.size()).take(count) {
            let line = Self::format(Scalar::read(chunk, ty));
            match self.lines.get_mut(self.pos) {
                Some(slot) => *slot = line,
                None => self.lines.push(line),
            }
            self.pos += 1;
            n += 1;
        }
        self.dirty |= n > 0;
        Ok(n)
    }

    fn size(&mut self, _ty: DataType) -> StorageResult<u64> {
        Ok(self.lines.len() as u64)
    }

    fn flush(&mut self) -> StorageResult<()> {
        if !self.dirty {
            return Ok(());
        }
        let mut tmp = self.path.as_os_str().to_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let mut text = self.lines.join("\n");
        text.push('\n');
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &self.path)?;
        self.dirty = false;
        Ok(())
    }
}
