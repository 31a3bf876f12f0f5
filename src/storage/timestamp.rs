//! Packed modification timestamps
//!
//! The filesystem reports dates and times in the FAT layout:
//! date = `yyyyyyy mmmm ddddd` (years since 1980), time = `hhhhh mmmmmm sssss`
//! (seconds in 2-second units).

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

const FAT_EPOCH_YEAR: u16 = 1980;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FatTimestamp {
    pub date: u16,
    pub time: u16,
}

impl FatTimestamp {
    pub fn new(date: u16, time: u16) -> Self {
        Self { date, time }
    }

    /// Packs a calendar time. Years before 1980 clamp to 1980 and the seconds
    /// lose their low bit.
    pub fn from_datetime(dt: &NaiveDateTime) -> Self {
        let year = (dt.year().clamp(FAT_EPOCH_YEAR as i32, FAT_EPOCH_YEAR as i32 + 127) as u16)
            - FAT_EPOCH_YEAR;
        let date = (year << 9) | ((dt.month() as u16) << 5) | dt.day() as u16;
        let time =
            ((dt.hour() as u16) << 11) | ((dt.minute() as u16) << 5) | (dt.second() as u16 / 2);
        Self { date, time }
    }

    pub fn year(&self) -> u16 {
        FAT_EPOCH_YEAR + ((self.date >> 9) & 0x7f)
    }

    pub fn month(&self) -> u8 {
        ((self.date >> 5) & 0x0f) as u8
    }

    pub fn day(&self) -> u8 {
        (self.date & 0x1f) as u8
    }

    pub fn hour(&self) -> u8 {
        ((self.time >> 11) & 0x1f) as u8
    }

    pub fn minute(&self) -> u8 {
        ((self.time >> 5) & 0x3f) as u8
    }

    pub fn second(&self) -> u8 {
        2 * (self.time & 0x1f) as u8
    }

    /// Calendar time, or `None` if the packed fields are out of range.
    pub fn to_datetime(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.year() as i32, self.month() as u32, self.day() as u32)?
            .and_hms_opt(
                self.hour() as u32,
                self.minute() as u32,
                self.second() as u32,
            )
    }

    /// `YYYYMMDDHHMMSS` as used by the MDTM reply.
    pub fn mdtm(&self) -> String {
        format!(
            "{}{:02}{:02}{:02}{:02}{:02}",
            self.year(),
            self.month(),
            self.day(),
            self.hour(),
            self.minute(),
            self.second()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpacks_fields() {
        // 2015-03-14 09:26:52
        let ts = FatTimestamp::new((35 << 9) | (3 << 5) | 14, (9 << 11) | (26 << 5) | 26);
        assert_eq!(ts.year(), 2015);
        assert_eq!(ts.month(), 3);
        assert_eq!(ts.day(), 14);
        assert_eq!(ts.hour(), 9);
        assert_eq!(ts.minute(), 26);
        assert_eq!(ts.second(), 52);
        assert_eq!(ts.mdtm(), "20150314092652");
    }

    #[test]
    fn packs_from_datetime() {
        let dt = NaiveDate::from_ymd_opt(2023, 12, 31)
            .unwrap()
            .and_hms_opt(23, 59, 59)
            .unwrap();
        let ts = FatTimestamp::from_datetime(&dt);
        assert_eq!(ts.mdtm(), "20231231235958");
    }

    #[test]
    fn invalid_fields_have_no_datetime() {
        assert_eq!(FatTimestamp::new(0, 0).to_datetime(), None);
    }
}
