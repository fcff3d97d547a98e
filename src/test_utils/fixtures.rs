//! Test fixtures: zip archives and patch listing pages.

use chrono::{Datelike, Timelike};
use std::io::{Cursor, Write};
use std::path::Path;
use zip::write::FullFileOptions;

use crate::core::Timestamp;

enum Entry {
    Dir(String),
    File(String, Vec<u8>),
}

/// Header ID of the Info-ZIP extended-timestamp extra field.
const EXTENDED_TIMESTAMP_ID: u16 = 0x5455;

/// Builds an in-memory zip archive entry by entry.
///
/// Times are given in the patch listing format (`YYYY-MM-DD HH:MM`) and are
/// stored as the entries' DOS modification time. [`file_with_utc`](Self::file_with_utc)
/// also writes an extended-timestamp field, the way Info-ZIP and 7-Zip do.
#[derive(Default)]
pub struct ZipFixture {
    entries: Vec<(Entry, zip::DateTime, Option<u32>)>,
}

/// Convert a listing-format time into a zip entry time.
pub fn zip_time(listing: &str) -> zip::DateTime {
    let ts = Timestamp::parse_listing(listing).expect("fixture time must be YYYY-MM-DD HH:MM");
    let dt = ts.as_datetime();
    zip::DateTime::from_date_and_time(
        u16::try_from(dt.year()).expect("fixture year out of range"),
        dt.month() as u8,
        dt.day() as u8,
        dt.hour() as u8,
        dt.minute() as u8,
        0,
    )
    .expect("fixture time outside the zip range")
}

impl ZipFixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a directory entry; `name` should end in `/`.
    pub fn dir(mut self, name: &str) -> Self {
        self.entries.push((Entry::Dir(name.to_string()), zip_time("1980-01-01 00:00"), None));
        self
    }

    pub fn file(mut self, name: &str, content: &[u8], modified: &str) -> Self {
        self.entries.push((Entry::File(name.to_string(), content.to_vec()), zip_time(modified), None));
        self
    }

    /// Add a file whose DOS time is the archiver's local `dos_local` and whose
    /// extended timestamp is the real instant `utc`.
    pub fn file_with_utc(mut self, name: &str, content: &[u8], dos_local: &str, utc: &str) -> Self {
        let instant = Timestamp::parse_listing(utc).expect("fixture time must be YYYY-MM-DD HH:MM");
        let secs = u32::try_from(instant.as_datetime().timestamp()).expect("fixture time out of range");
        self.entries
            .push((Entry::File(name.to_string(), content.to_vec()), zip_time(dos_local), Some(secs)));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (entry, time, utc) in self.entries {
            let mut options = FullFileOptions::default().last_modified_time(time);
            if let Some(secs) = utc {
                let mut field = vec![0x01];
                field.extend_from_slice(&secs.to_le_bytes());
                options
                    .add_extra_data(EXTENDED_TIMESTAMP_ID, field, false)
                    .expect("add extended timestamp");
            }
            match entry {
                Entry::Dir(name) => writer.add_directory(name, options).expect("add directory"),
                Entry::File(name, content) => {
                    writer.start_file(name, options).expect("start file");
                    writer.write_all(&content).expect("write file content");
                }
            }
        }
        writer.finish().expect("finish archive").into_inner()
    }

    /// Build the archive and write it to `path`.
    pub fn write_to(self, path: &Path) {
        std::fs::write(path, self.build()).expect("write archive fixture");
    }
}

/// An Apache-style directory listing that publishes `archive_name` at `published`.
pub fn listing_page(archive_name: &str, published: &str) -> String {
    format!(
        r#"<html><head><title>Index of /patches</title></head><body>
<h1>Index of /patches</h1>
<table>
<tr><th>Name</th><th>Last modified</th><th>Size</th></tr>
<tr><td><a href="../">Parent Directory</a></td><td>&nbsp;</td><td>-</td></tr>
<tr><td><a href="Older_Patch.zip">Older_Patch.zip</a></td><td>2019-01-01 00:00  </td><td>1.0M</td></tr>
<tr><td><a href="{archive_name}">{archive_name}</a></td><td>{published}  </td><td>12M</td></tr>
</table>
</body></html>"#
    )
}
