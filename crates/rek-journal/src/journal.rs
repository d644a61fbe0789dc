use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::{JournalError, Result};

/// Flush/sync strategy for the journal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    /// `fsync` after every append (safest, highest latency).
    EveryWrite,
    /// Flush to the OS and rely on page-cache write-back.
    #[default]
    OsDefault,
}

/// Configuration for the journal.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalConfig {
    pub sync_mode: SyncMode,
}

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: u64 = 8;

/// Records read back from a journal file.
#[derive(Debug)]
pub struct Recovered<R> {
    pub records: Vec<R>,
    /// Length of the intact prefix of the file.
    pub valid_len: u64,
    /// `true` when a torn final frame was found past `valid_len`.
    pub discarded_tail: bool,
}

/// Where frames go. Frames are written unbuffered, so after a failed write
/// every byte of it is either in the file or nowhere.
trait FrameSink: Send {
    fn put(&mut self, frame: &[u8]) -> io::Result<()>;

    fn sync(&mut self) -> io::Result<()>;

    fn truncate(&mut self, len: u64) -> io::Result<()>;
}

impl FrameSink for File {
    fn put(&mut self, frame: &[u8]) -> io::Result<()> {
        self.write_all(frame)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

struct JournalWriter {
    sink: Box<dyn FrameSink>,
    offset: u64,
    /// Set when a failed frame could not be cut off; the file tail is unknown.
    broken: bool,
}

impl JournalWriter {
    fn write(&mut self, frame: &[u8], sync: bool) -> io::Result<()> {
        self.sink.put(frame)?;
        if sync {
            self.sink.sync()?;
        }
        Ok(())
    }

    /// Cut the file back to `offset` after a failed append.
    fn rollback(&mut self, offset: u64) {
        match self.sink.truncate(offset) {
            Ok(()) => self.offset = offset,
            Err(e) => {
                error!(offset, error = %e, "journal rollback failed; refusing further appends");
                self.broken = true;
            }
        }
    }
}

/// Append-only, crash-recoverable journal of serialized records.
///
/// On-disk format, repeated once per record:
/// ```text
/// [4 bytes: payload length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (bincode-serialized record)]
/// ```
pub struct Journal {
    path: PathBuf,
    writer: Mutex<JournalWriter>,
    config: JournalConfig,
}

impl Journal {
    /// Open (or create) the journal at `path` and read back its records.
    ///
    /// A torn final frame is cut off the file so later appends start on a
    /// clean frame boundary.
    pub fn open<R: DeserializeOwned>(
        path: &Path,
        config: JournalConfig,
    ) -> Result<(Self, Recovered<R>)> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let recovered = scan::<R>(path)?;
        if recovered.discarded_tail {
            warn!(
                path = %path.display(),
                valid_len = recovered.valid_len,
                "torn journal tail discarded"
            );
            file.set_len(recovered.valid_len)?;
            file.sync_all()?;
        }

        let journal = Self::with_sink(path, Box::new(file), recovered.valid_len, config);
        debug!(records = recovered.records.len(), "journal opened");
        Ok((journal, recovered))
    }

    fn with_sink(
        path: &Path,
        sink: Box<dyn FrameSink>,
        offset: u64,
        config: JournalConfig,
    ) -> Self {
        Self {
            path: path.to_path_buf(),
            writer: Mutex::new(JournalWriter {
                sink,
                offset,
                broken: false,
            }),
            config,
        }
    }

    /// Append one record as a single frame. Returns the frame's byte offset.
    ///
    /// If the write fails part-way the file is cut back to the frame start,
    /// so a failed append leaves no trace. If even that fails the journal
    /// rejects every later append with [`JournalError::Broken`]; reopening
    /// it discards the torn frame.
    pub fn append<R: Serialize>(&self, record: &R) -> Result<u64> {
        let payload =
            bincode::serialize(record).map_err(|e| JournalError::Serialization(e.to_string()))?;
        let length = u32::try_from(payload.len())
            .map_err(|_| JournalError::Serialization("record exceeds 4 GiB".into()))?;
        let crc = crc32fast::hash(&payload);

        let mut frame = Vec::with_capacity(HEADER_SIZE as usize + payload.len());
        frame.extend_from_slice(&length.to_le_bytes());
        frame.extend_from_slice(&crc.to_le_bytes());
        frame.extend_from_slice(&payload);

        let mut w = self.writer.lock().map_err(|_| JournalError::Poisoned)?;
        if w.broken {
            return Err(JournalError::Broken { offset: w.offset });
        }
        let entry_offset = w.offset;

        if let Err(e) = w.write(&frame, self.config.sync_mode == SyncMode::EveryWrite) {
            warn!(offset = entry_offset, error = %e, "journal append failed; rolling back frame");
            w.rollback(entry_offset);
            return Err(e.into());
        }

        w.offset += HEADER_SIZE + payload.len() as u64;
        debug!(offset = entry_offset, len = payload.len(), "journal append");
        Ok(entry_offset)
    }

    /// Read every intact record currently in the journal.
    pub fn recover<R: DeserializeOwned>(&self) -> Result<Recovered<R>> {
        scan(&self.path)
    }

    /// Current write offset.
    pub fn offset(&self) -> Result<u64> {
        Ok(self.writer.lock().map_err(|_| JournalError::Poisoned)?.offset)
    }

    /// Path to the journal file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn scan<R: DeserializeOwned>(path: &Path) -> Result<Recovered<R>> {
    let mut file = BufReader::new(File::open(path)?);
    let file_len = file.get_ref().metadata()?.len();
    let mut records = Vec::new();
    let mut offset: u64 = 0;

    while offset < file_len {
        if offset + HEADER_SIZE > file_len {
            break;
        }

        let mut header = [0u8; HEADER_SIZE as usize];
        file.read_exact(&mut header)?;
        let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        let expected = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

        let frame_end = offset + HEADER_SIZE + u64::from(length);
        if frame_end > file_len {
            break;
        }
        if length == 0 {
            return Err(JournalError::Undecodable {
                offset,
                reason: "zero-length frame".into(),
            });
        }

        let mut payload = vec![0u8; length as usize];
        file.read_exact(&mut payload)?;

        let actual = crc32fast::hash(&payload);
        if actual != expected {
            if frame_end == file_len {
                break;
            }
            return Err(JournalError::CrcMismatch {
                offset,
                expected,
                actual,
            });
        }

        let record = bincode::deserialize::<R>(&payload).map_err(|e| {
            JournalError::Undecodable {
                offset,
                reason: e.to_string(),
            }
        })?;
        records.push(record);
        offset = frame_end;
    }

    debug!(recovered = records.len(), valid_len = offset, "journal scan complete");
    Ok(Recovered {
        records,
        valid_len: offset,
        discarded_tail: offset < file_len,
    })
}

#[cfg(test)]
mod tests {
    use std::io::{Seek, SeekFrom};

    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    enum TestRecord {
        Moved { key: u64, delta: i64 },
        Note(String),
    }

    fn moved(key: u64, delta: i64) -> TestRecord {
        TestRecord::Moved { key, delta }
    }

    #[test]
    fn append_and_reopen_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.journal");

        {
            let (journal, recovered) =
                Journal::open::<TestRecord>(&path, JournalConfig::default()).unwrap();
            assert!(recovered.records.is_empty());
            journal.append(&moved(1, 5000)).unwrap();
            journal.append(&TestRecord::Note("opening".into())).unwrap();
            journal.append(&moved(1, -20)).unwrap();
        }

        let (_, recovered) = Journal::open::<TestRecord>(&path, JournalConfig::default()).unwrap();
        assert_eq!(
            recovered.records,
            vec![
                moved(1, 5000),
                TestRecord::Note("opening".into()),
                moved(1, -20)
            ]
        );
        assert!(!recovered.discarded_tail);
    }

    #[test]
    fn append_returns_increasing_offsets() {
        let dir = tempfile::tempdir().unwrap();
        let (journal, _) =
            Journal::open::<TestRecord>(&dir.path().join("j"), JournalConfig::default()).unwrap();

        let a = journal.append(&moved(1, 1)).unwrap();
        let b = journal.append(&moved(2, 2)).unwrap();
        assert_eq!(a, 0);
        assert!(b > a);
        assert_eq!(journal.offset().unwrap(), journal.recover::<TestRecord>().unwrap().valid_len);
    }

    #[test]
    fn torn_tail_is_discarded_and_cut() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tail.journal");
        let total = {
            let (journal, _) = Journal::open::<TestRecord>(&path, JournalConfig::default()).unwrap();
            journal.append(&moved(1, 10)).unwrap();
            journal.append(&moved(2, 20)).unwrap();
            journal.offset().unwrap()
        };

        OpenOptions::new()
            .write(true)
            .open(&path)
            .unwrap()
            .set_len(total - 3)
            .unwrap();

        let (journal, recovered) =
            Journal::open::<TestRecord>(&path, JournalConfig::default()).unwrap();
        assert_eq!(recovered.records, vec![moved(1, 10)]);
        assert!(recovered.discarded_tail);

        // New appends land right after the last intact frame.
        journal.append(&moved(3, 30)).unwrap();
        let again = journal.recover::<TestRecord>().unwrap();
        assert_eq!(again.records, vec![moved(1, 10), moved(3, 30)]);
        assert!(!again.discarded_tail);
    }

    #[test]
    fn corrupted_middle_frame_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.journal");
        {
            let (journal, _) = Journal::open::<TestRecord>(&path, JournalConfig::default()).unwrap();
            journal.append(&moved(1, 10)).unwrap();
            journal.append(&moved(2, 20)).unwrap();
        }

        {
            let mut file = OpenOptions::new().read(true).write(true).open(&path).unwrap();
            file.seek(SeekFrom::Start(HEADER_SIZE)).unwrap();
            let mut buf = [0u8; 1];
            file.read_exact(&mut buf).unwrap();
            buf[0] ^= 0xFF;
            file.seek(SeekFrom::Start(HEADER_SIZE)).unwrap();
            file.write_all(&buf).unwrap();
            file.sync_all().unwrap();
        }

        let err = Journal::open::<TestRecord>(&path, JournalConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, JournalError::CrcMismatch { offset: 0, .. }));
    }

    #[test]
    fn corrupted_last_frame_counts_as_torn() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("last.journal");
        let second = {
            let (journal, _) = Journal::open::<TestRecord>(&path, JournalConfig::default()).unwrap();
            journal.append(&moved(1, 10)).unwrap();
            journal.append(&moved(2, 20)).unwrap()
        };

        {
            let mut file = OpenOptions::new().read(true).write(true).open(&path).unwrap();
            file.seek(SeekFrom::Start(second + HEADER_SIZE)).unwrap();
            file.write_all(&[0xAB]).unwrap();
        }

        let (_, recovered) = Journal::open::<TestRecord>(&path, JournalConfig::default()).unwrap();
        assert_eq!(recovered.records, vec![moved(1, 10)]);
        assert!(recovered.discarded_tail);
    }

    #[test]
    fn sync_every_write_mode() {
        let dir = tempfile::tempdir().unwrap();
        let config = JournalConfig {
            sync_mode: SyncMode::EveryWrite,
        };
        let (journal, _) = Journal::open::<TestRecord>(&dir.path().join("sync"), config).unwrap();
        journal.append(&moved(1, 1)).unwrap();
        assert_eq!(journal.recover::<TestRecord>().unwrap().records.len(), 1);
    }

    #[test]
    fn open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/data/ledger.journal");
        let (journal, _) = Journal::open::<TestRecord>(&path, JournalConfig::default()).unwrap();
        assert!(journal.path().exists());
    }

    /// File sink that writes half of its `fail_at`-th frame, then reports a
    /// full disk.
    struct FullDisk {
        file: File,
        puts: usize,
        fail_at: usize,
        truncate_fails: bool,
    }

    impl FrameSink for FullDisk {
        fn put(&mut self, frame: &[u8]) -> io::Result<()> {
            let call = self.puts;
            self.puts += 1;
            if call == self.fail_at {
                self.file.write_all(&frame[..frame.len() / 2])?;
                return Err(io::Error::new(io::ErrorKind::Other, "no space left on device"));
            }
            self.file.write_all(frame)
        }

        fn sync(&mut self) -> io::Result<()> {
            self.file.sync_data()
        }

        fn truncate(&mut self, len: u64) -> io::Result<()> {
            if self.truncate_fails {
                return Err(io::Error::new(io::ErrorKind::Other, "read-only file system"));
            }
            self.file.set_len(len)
        }
    }

    fn full_disk_journal(path: &Path, fail_at: usize, truncate_fails: bool) -> Journal {
        let file = OpenOptions::new().create(true).append(true).open(path).unwrap();
        let sink = FullDisk {
            file,
            puts: 0,
            fail_at,
            truncate_fails,
        };
        Journal::with_sink(path, Box::new(sink), 0, JournalConfig::default())
    }

    #[test]
    fn failed_append_leaves_no_trace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("full.journal");
        let journal = full_disk_journal(&path, 1, false);

        journal.append(&moved(1, 10)).unwrap();
        let err = journal.append(&moved(2, 20)).unwrap_err();
        assert!(matches!(err, JournalError::Io(_)));
        journal.append(&moved(3, 30)).unwrap();
        assert_eq!(journal.offset().unwrap(), journal.recover::<TestRecord>().unwrap().valid_len);
        drop(journal);

        let (_, recovered) = Journal::open::<TestRecord>(&path, JournalConfig::default()).unwrap();
        assert_eq!(recovered.records, vec![moved(1, 10), moved(3, 30)]);
        assert!(!recovered.discarded_tail);
    }

    #[test]
    fn failed_rollback_refuses_later_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stuck.journal");
        let journal = full_disk_journal(&path, 1, true);

        journal.append(&moved(1, 10)).unwrap();
        assert!(journal.append(&moved(2, 20)).is_err());
        let err = journal.append(&moved(3, 30)).unwrap_err();
        assert!(matches!(err, JournalError::Broken { .. }));
        drop(journal);

        let (_, recovered) = Journal::open::<TestRecord>(&path, JournalConfig::default()).unwrap();
        assert_eq!(recovered.records, vec![moved(1, 10)]);
        assert!(recovered.discarded_tail);
    }
}
