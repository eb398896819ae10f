use std::io::{self, Write};

use crate::error::{CoreError, Result};
use crate::key::ValidatedKey;
use crate::record::encode_record;
use crate::traits::KeySink;

/// Writes keys to a [`KeySink`] in encounter order and keeps count, so a
/// failed write can report how much output is usable.
#[derive(Debug)]
pub struct Emitter<S> {
    sink: S,
    written: usize,
}

impl<S: KeySink> Emitter<S> {
    pub fn new(sink: S) -> Self {
        Self { sink, written: 0 }
    }

    pub fn emit(&mut self, key: &ValidatedKey) -> Result<()> {
        self.sink
            .write_key(self.written, key)
            .map_err(|source| self.unwritable(source))?;
        self.written += 1;
        Ok(())
    }

    /// Flushes the sink and returns it with the number of records written.
    pub fn finish(mut self) -> Result<(S, usize)> {
        self.sink.flush().map_err(|source| self.unwritable(source))?;
        Ok((self.sink, self.written))
    }

    #[inline]
    #[must_use]
    pub fn written(&self) -> usize {
        self.written
    }

    fn unwritable(&self, source: io::Error) -> CoreError {
        CoreError::OutputUnwritable {
            written: self.written,
            source,
        }
    }
}

/// Batch mode: every key as a fixed-layout record on one stream.
///
/// Each record is flushed before `write_key` returns, so a buffered writer
/// never holds a record the emitter has already counted.
#[derive(Debug)]
pub struct BatchSink<W> {
    writer: W,
    scratch: Vec<u8>,
}

impl<W: Write> BatchSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            scratch: Vec::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> KeySink for BatchSink<W> {
    fn write_key(&mut self, _index: usize, key: &ValidatedKey) -> io::Result<()> {
        self.scratch.clear();
        encode_record(key, &mut self.scratch);
        self.writer.write_all(&self.scratch)?;
        self.writer.flush()
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::io::BufWriter;
    use std::rc::Rc;

    use crate::encryption::EncryptionType;
    use crate::key::CandidateKey;
    use crate::record::{decode_records, RECORD_HEADER_LEN};
    use crate::validation::PlausibilityFilter;

    fn key(offset: u64) -> ValidatedKey {
        PlausibilityFilter::default()
            .check(CandidateKey::new(offset, vec![0x5A; 32], EncryptionType::Unknown, 32))
            .unwrap()
    }

    /// Accepts `capacity` bytes, then fails every write. The landed bytes
    /// stay readable through the shared handle.
    struct FullDisk {
        capacity: usize,
        data: Rc<RefCell<Vec<u8>>>,
    }

    impl FullDisk {
        fn new(capacity: usize) -> (Self, Rc<RefCell<Vec<u8>>>) {
            let data = Rc::new(RefCell::new(Vec::new()));
            let disk = Self {
                capacity,
                data: Rc::clone(&data),
            };
            (disk, data)
        }
    }

    impl Write for FullDisk {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let mut data = self.data.borrow_mut();
            if data.len() + buf.len() > self.capacity {
                return Err(io::Error::new(io::ErrorKind::StorageFull, "no space left"));
            }
            data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn batch_sink_writes_records_in_order() {
        let mut emitter = Emitter::new(BatchSink::new(Vec::new()));
        for offset in [100, 50, 300] {
            emitter.emit(&key(offset)).unwrap();
        }
        let (sink, written) = emitter.finish().unwrap();
        assert_eq!(written, 3);

        let offsets: Vec<_> = decode_records(&sink.into_inner())
            .unwrap()
            .iter()
            .map(|r| r.offset)
            .collect();
        assert_eq!(offsets, vec![100, 50, 300]);
    }

    #[test]
    fn failure_reports_records_written_before_it() {
        let (disk, _) = FullDisk::new(2 * (RECORD_HEADER_LEN + 32));
        let mut emitter = Emitter::new(BatchSink::new(disk));
        emitter.emit(&key(1)).unwrap();
        emitter.emit(&key(2)).unwrap();

        let err = emitter.emit(&key(3)).unwrap_err();
        assert_eq!(err.records_written(), Some(2));
        assert!(matches!(err, CoreError::OutputUnwritable { written: 2, .. }));
    }

    #[test]
    fn buffered_writer_counts_only_landed_records() {
        let record_len = RECORD_HEADER_LEN + 32;
        let (disk, landed) = FullDisk::new(record_len + record_len / 2);
        let mut emitter = Emitter::new(BatchSink::new(BufWriter::new(disk)));

        emitter.emit(&key(1)).unwrap();
        assert_eq!(landed.borrow().len(), record_len);

        let err = emitter.emit(&key(2)).unwrap_err();
        assert_eq!(err.records_written(), Some(1));

        drop(emitter);
        let records = decode_records(&landed.borrow()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].offset, 1);
    }

    #[test]
    fn vec_sink_collects_keys() {
        let mut emitter = Emitter::new(Vec::new());
        emitter.emit(&key(7)).unwrap();
        let (keys, written) = emitter.finish().unwrap();
        assert_eq!(written, 1);
        assert_eq!(keys[0].offset(), 7);
    }
}
