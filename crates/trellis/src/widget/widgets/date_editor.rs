//! Section-based date/time editor.
//!
//! The editor splits a date-time value into sections (year, month, day,
//! hour, minute). Left/Right moves between sections; Up/Down adjusts the
//! active section. Day, month, hour and minute wrap around; the year is
//! clamped to a sane range; the day is re-clamped whenever the month or
//! year changes so the value is always a real calendar date.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

use crate::widget::events::Direction;
use crate::widget::item::InternalTraverse;

use super::date_field::DateTimeMode;

/// Lowest selectable year.
const MIN_YEAR: i32 = 1900;
/// Highest selectable year.
const MAX_YEAR: i32 = 2100;

/// One editable section of the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditSection {
    Year,
    Month,
    Day,
    Hour,
    Minute,
}

impl EditSection {
    fn for_mode(mode: DateTimeMode) -> &'static [EditSection] {
        match mode {
            DateTimeMode::Date => &[Self::Year, Self::Month, Self::Day],
            DateTimeMode::Time => &[Self::Hour, Self::Minute],
            DateTimeMode::DateTime => {
                &[Self::Year, Self::Month, Self::Day, Self::Hour, Self::Minute]
            }
        }
    }
}

/// In-progress edit of a date-time value.
#[derive(Debug)]
pub struct DateEditor {
    sections: &'static [EditSection],
    active: usize,
    value: NaiveDateTime,
}

impl DateEditor {
    /// Start editing `seed` with the sections of `mode`.
    pub fn new(mode: DateTimeMode, seed: NaiveDateTime) -> Self {
        Self {
            sections: EditSection::for_mode(mode),
            active: 0,
            value: seed,
        }
    }

    /// The section the cursor sits on.
    #[inline]
    pub fn active_section(&self) -> EditSection {
        self.sections[self.active]
    }

    /// The sections of this editor, in display order.
    #[inline]
    pub fn sections(&self) -> &[EditSection] {
        self.sections
    }

    /// Index of the active section within [`sections`](Self::sections).
    #[inline]
    pub fn active_index(&self) -> usize {
        self.active
    }

    /// The value as edited so far.
    #[inline]
    pub fn value(&self) -> NaiveDateTime {
        self.value
    }

    /// Move the section cursor; exits at either end.
    pub fn move_section(&mut self, dir: Direction) -> InternalTraverse {
        match dir {
            Direction::Left => {
                if self.active == 0 {
                    return InternalTraverse::Exit;
                }
                self.active -= 1;
            }
            Direction::Right => {
                if self.active + 1 >= self.sections.len() {
                    return InternalTraverse::Exit;
                }
                self.active += 1;
            }
            Direction::Up | Direction::Down => return InternalTraverse::Exit,
        }
        InternalTraverse::Consumed
    }

    /// Step the active section up.
    pub fn increment(&mut self) {
        self.step(1);
    }

    /// Step the active section down.
    pub fn decrement(&mut self) {
        self.step(-1);
    }

    fn step(&mut self, delta: i32) {
        let date = self.value.date();
        let time = self.value.time();

        let (mut year, mut month, mut day) = (date.year(), date.month() as i32, date.day() as i32);
        let (mut hour, mut minute) = (time.hour() as i32, time.minute() as i32);

        match self.active_section() {
            EditSection::Year => year = (year + delta).clamp(MIN_YEAR, MAX_YEAR),
            EditSection::Month => month = wrap(month + delta, 1, 12),
            EditSection::Day => {
                let last = days_in_month(year, month as u32) as i32;
                day = wrap(day + delta, 1, last);
            }
            EditSection::Hour => hour = wrap(hour + delta, 0, 23),
            EditSection::Minute => minute = wrap(minute + delta, 0, 59),
        }

        // Changing year or month can orphan the day (e.g. Jan 31 -> Feb).
        day = day.min(days_in_month(year, month as u32) as i32);

        if let Some(rebuilt) = NaiveDate::from_ymd_opt(year, month as u32, day as u32)
            .and_then(|d| d.and_hms_opt(hour as u32, minute as u32, 0))
        {
            self.value = rebuilt;
        } else {
            tracing::warn!(
                target: trellis_core::logging::targets::FORM,
                year, month, day, hour, minute,
                "date editor produced an impossible value; keeping previous"
            );
        }
    }
}

/// Wrap `v` into the inclusive range `[lo, hi]`.
fn wrap(v: i32, lo: i32, hi: i32) -> i32 {
    let span = hi - lo + 1;
    lo + (v - lo).rem_euclid(span)
}

/// Number of days in the given month.
fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    match NaiveDate::from_ymd_opt(next_year, next_month, 1).and_then(|d| d.pred_opt()) {
        Some(last) => last.day(),
        None => 31,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_sections_per_mode() {
        let date = DateEditor::new(DateTimeMode::Date, seed(2026, 8, 6, 0, 0));
        assert_eq!(date.sections().len(), 3);
        let time = DateEditor::new(DateTimeMode::Time, seed(2026, 8, 6, 10, 30));
        assert_eq!(time.sections().len(), 2);
        let both = DateEditor::new(DateTimeMode::DateTime, seed(2026, 8, 6, 10, 30));
        assert_eq!(both.sections().len(), 5);
    }

    #[test]
    fn test_section_cursor_exits_at_ends() {
        let mut editor = DateEditor::new(DateTimeMode::Date, seed(2026, 8, 6, 0, 0));
        assert_eq!(editor.move_section(Direction::Left), InternalTraverse::Exit);
        assert_eq!(
            editor.move_section(Direction::Right),
            InternalTraverse::Consumed
        );
        assert_eq!(
            editor.move_section(Direction::Right),
            InternalTraverse::Consumed
        );
        assert_eq!(editor.active_section(), EditSection::Day);
        assert_eq!(editor.move_section(Direction::Right), InternalTraverse::Exit);
    }

    #[test]
    fn test_month_step_reclamps_day() {
        // Jan 31 stepped into February lands on Feb 28.
        let mut editor = DateEditor::new(DateTimeMode::Date, seed(2026, 1, 31, 0, 0));
        editor.move_section(Direction::Right);
        assert_eq!(editor.active_section(), EditSection::Month);
        editor.increment();
        assert_eq!(editor.value().date(), NaiveDate::from_ymd_opt(2026, 2, 28).unwrap());
    }

    #[test]
    fn test_month_and_day_wrap() {
        let mut editor = DateEditor::new(DateTimeMode::Date, seed(2026, 12, 15, 0, 0));
        editor.move_section(Direction::Right);
        editor.increment();
        assert_eq!(editor.value().date().month(), 1);

        let mut editor = DateEditor::new(DateTimeMode::Date, seed(2026, 6, 30, 0, 0));
        editor.move_section(Direction::Right);
        editor.move_section(Direction::Right);
        assert_eq!(editor.active_section(), EditSection::Day);
        editor.increment();
        assert_eq!(editor.value().date().day(), 1);
    }

    #[test]
    fn test_time_wraps() {
        let mut editor = DateEditor::new(DateTimeMode::Time, seed(2026, 8, 6, 23, 59));
        editor.increment();
        assert_eq!(editor.value().time().hour(), 0);

        editor.move_section(Direction::Right);
        editor.increment();
        assert_eq!(editor.value().time().minute(), 0);
    }

    #[test]
    fn test_year_clamps() {
        let mut editor = DateEditor::new(DateTimeMode::Date, seed(MAX_YEAR, 6, 15, 0, 0));
        editor.increment();
        assert_eq!(editor.value().date().year(), MAX_YEAR);
        let mut editor = DateEditor::new(DateTimeMode::Date, seed(MIN_YEAR, 6, 15, 0, 0));
        editor.decrement();
        assert_eq!(editor.value().date().year(), MIN_YEAR);
    }

    #[test]
    fn test_leap_february() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2026, 2), 28);
    }
}
