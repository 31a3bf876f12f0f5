//! Directory listing generator
//!
//! Renders entries as fixed-column `ls -l` style lines that FTP clients parse
//! positionally. A listing is produced a page at a time so that one call never
//! does more than `entries_per_page` filesystem reads. The root directory is
//! synthetic: it contains one directory per mounted volume.

use chrono::{Datelike, NaiveDate, NaiveDateTime, TimeDelta, Timelike};
use log::{debug, warn};

use crate::clock::Clock;
use crate::error::FsError;
use crate::storage::filesystem::{FileInfo, Filesystem};
use crate::storage::resource::OpenResource;
use crate::transfer::{Chunk, Progress};

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Entries older than this show the year instead of the time of day.
const RECENT_WINDOW_DAYS: i64 = 180;

/// Volumes carry no timestamp of their own; they are all dated 2015-01-01.
fn volume_timestamp() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2015, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

enum Stamp {
    Clock(u8, u8),
    Year(u16),
}

fn stamp_for(modified: Option<NaiveDateTime>, year: u16, hour: u8, minute: u8, now: NaiveDateTime) -> Stamp {
    let recent = modified
        .map(|t| {
            let age = now.signed_duration_since(t);
            age >= TimeDelta::zero() && age <= TimeDelta::days(RECENT_WINDOW_DAYS)
        })
        .unwrap_or(false);

    if recent {
        Stamp::Clock(hour, minute)
    } else {
        Stamp::Year(year)
    }
}

fn render_line(is_dir: bool, size: u64, month: u8, day: u8, stamp: Stamp, name: &str) -> String {
    let kind = if is_dir { 'd' } else { '-' };
    let month = MONTHS[(month.max(1) as usize - 1).min(11)];
    let day = day.max(1);
    match stamp {
        Stamp::Year(year) => format!(
            "{kind}rw-rw-r--   1 root  root {size:>9} {month} {day:>2} {year:>5} {name}\r\n"
        ),
        Stamp::Clock(hour, minute) => format!(
            "{kind}rw-rw-r--   1 root  root {size:>9} {month} {day:>2} {hour:02}:{minute:02} {name}\r\n"
        ),
    }
}

/// One line for a real directory entry, judged recent or old against `now`.
pub fn format_entry(info: &FileInfo, now: NaiveDateTime) -> String {
    let ts = info.modified;
    let stamp = stamp_for(ts.to_datetime(), ts.year(), ts.hour(), ts.minute(), now);
    render_line(
        info.is_directory,
        info.size,
        ts.month(),
        ts.day(),
        stamp,
        &info.name,
    )
}

/// One line for a mounted volume in the synthetic root listing.
pub fn format_volume(name: &str, now: NaiveDateTime) -> String {
    let ts = volume_timestamp();
    let stamp = stamp_for(
        Some(ts),
        ts.year() as u16,
        ts.hour() as u8,
        ts.minute() as u8,
        now,
    );
    render_line(true, 0, ts.month() as u8, ts.day() as u8, stamp, name)
}

/// Cursor over a listing in progress
#[derive(Debug)]
pub struct DirectoryListing {
    root: bool,
    volume_cursor: usize,
    pending: Option<String>,
    per_page: usize,
}

impl DirectoryListing {
    pub fn new(per_page: usize) -> Self {
        Self {
            root: false,
            volume_cursor: 0,
            pending: None,
            per_page,
        }
    }

    pub fn reset(&mut self) {
        self.root = false;
        self.volume_cursor = 0;
        self.pending = None;
    }

    /// Prepares a listing of `path`. The root is synthesized; any other path
    /// is opened as a directory and recorded in `resource`.
    pub fn open<F: Filesystem>(
        &mut self,
        fs: &mut F,
        resource: &mut OpenResource,
        path: &str,
    ) -> Result<(), FsError> {
        self.reset();
        if path == "/" {
            self.root = true;
            return Ok(());
        }

        let dir = fs.open_dir(path)?;
        *resource = OpenResource::Directory(dir);
        Ok(())
    }

    /// Fills `buf` with up to `per_page` lines. Returns `Complete` once the
    /// enumeration is exhausted, at which point the directory is closed.
    pub fn next_page<F: Filesystem, C: Clock>(
        &mut self,
        fs: &mut F,
        clock: &C,
        resource: &mut OpenResource,
        buf: &mut [u8],
    ) -> Chunk {
        let mut len = 0;
        let mut count = 0;
        let mut exhausted = false;

        if let Some(line) = self.pending.take() {
            len = copy_line(buf, 0, &line);
            count += 1;
        }

        while count < self.per_page {
            let line = if self.root {
                match fs.volumes().get(self.volume_cursor) {
                    Some(name) => {
                        self.volume_cursor += 1;
                        format_volume(name, clock.now())
                    }
                    None => {
                        exhausted = true;
                        break;
                    }
                }
            } else {
                let Some(dir) = resource.directory() else {
                    exhausted = true;
                    break;
                };
                match fs.read_dir(dir) {
                    Ok(Some(info)) if info.name == "." || info.name == ".." => continue,
                    Ok(Some(info)) => format_entry(&info, clock.now()),
                    Ok(None) => {
                        exhausted = true;
                        break;
                    }
                    Err(e) => {
                        warn!("Directory enumeration stopped: {}", e);
                        exhausted = true;
                        break;
                    }
                }
            };

            if len > 0 && len + line.len() > buf.len() {
                self.pending = Some(line);
                break;
            }
            len += copy_line(buf, len, &line);
            count += 1;
        }

        if exhausted {
            debug!("Listing finished");
            resource.close(fs);
            self.reset();
            Chunk::new(len, Progress::Complete)
        } else {
            Chunk::new(len, Progress::Continue)
        }
    }
}

/// Copies `line` at `offset`, cutting it short (but keeping the line break)
/// if it is longer than the whole buffer.
fn copy_line(buf: &mut [u8], offset: usize, line: &str) -> usize {
    let bytes = line.as_bytes();
    let room = buf.len() - offset;
    if bytes.len() <= room {
        buf[offset..offset + bytes.len()].copy_from_slice(bytes);
        return bytes.len();
    }

    let keep = room.saturating_sub(2);
    buf[offset..offset + keep].copy_from_slice(&bytes[..keep]);
    buf[offset + keep..offset + room].copy_from_slice(&b"\r\n"[..room - keep]);
    room
}
