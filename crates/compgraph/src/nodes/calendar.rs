//! Business-day calendars bound at the `calendar` namespace

use chrono::{Datelike, Duration, NaiveDate};
use serde::Deserialize;
use std::collections::BTreeSet;

use crate::error::NodeError;
use crate::node::{Factory, Node, NodeCore, Requires};

/// Capability of the node bound at the `calendar` namespace
pub trait BusinessCalendar: Send + Sync {
    fn is_business_day(&self, date: NaiveDate) -> bool;

    /// Move `days` business days from `date`.
    ///
    /// A non-business start date first rolls to the nearest business day in
    /// the direction of travel; that roll counts as one step unless `days`
    /// is zero.
    ///
    /// `None` when the result falls outside the representable date range.
    fn add_business_days(&self, date: NaiveDate, days: i64) -> Option<NaiveDate>;

    /// Business days in `start..=end`
    fn business_days(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate>;
}

const WEEKDAYS: [&str; 7] = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"];

/// Parse a weekmask: either day names (`"Mon Tue Wed Thu Fri"`) or seven
/// binary digits starting Monday (`"1111100"`).
pub fn parse_weekmask(mask: &str) -> Result<[bool; 7], NodeError> {
    let mask = mask.trim();
    let mut days = [false; 7];

    if mask.len() == 7 && mask.chars().all(|c| c == '0' || c == '1') {
        for (day, c) in days.iter_mut().zip(mask.chars()) {
            *day = c == '1';
        }
    } else {
        for name in mask.split_whitespace() {
            let name = name.to_ascii_lowercase();
            let index = WEEKDAYS
                .iter()
                .position(|day| name.starts_with(day))
                .ok_or_else(|| NodeError::Config(format!("Unknown weekday '{}'", name)))?;
            days[index] = true;
        }
    }

    if !days.iter().any(|d| *d) {
        return Err(NodeError::Config(format!(
            "Weekmask '{}' has no business days",
            mask
        )));
    }
    Ok(days)
}

fn default_weekmask() -> String {
    "Mon Tue Wed Thu Fri".to_string()
}

/// Configuration shared by the calendar node types
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CalendarConfig {
    #[serde(default = "default_weekmask")]
    pub weekmask: String,

    /// Dates that are never business days
    #[serde(default)]
    pub holidays: Vec<NaiveDate>,
}

/// Calendar driven by a weekmask and an explicit holiday list.
///
/// Registered under three locators: `CustomCalendar` as configured,
/// `AllDaysCalendar` presetting every day of the week and
/// `AllWeekDaysCalendar` presetting Monday to Friday.
#[derive(Debug)]
pub struct CustomCalendar {
    core: NodeCore,
    weekmask: [bool; 7],
    holidays: BTreeSet<NaiveDate>,
}

impl CustomCalendar {
    /// Next business day in `direction`, if one exists before the range ends
    fn step(&self, date: NaiveDate, direction: i64) -> Option<NaiveDate> {
        let offset = Duration::days(direction);
        let mut date = date.checked_add_signed(offset)?;
        while !self.is_business_day(date) {
            date = date.checked_add_signed(offset)?;
        }
        Some(date)
    }

    pub fn holidays(&self) -> impl Iterator<Item = &NaiveDate> {
        self.holidays.iter()
    }
}

impl BusinessCalendar for CustomCalendar {
    fn is_business_day(&self, date: NaiveDate) -> bool {
        self.weekmask[date.weekday().num_days_from_monday() as usize]
            && !self.holidays.contains(&date)
    }

    fn add_business_days(&self, date: NaiveDate, days: i64) -> Option<NaiveDate> {
        let direction = if days < 0 { -1 } else { 1 };
        let mut remaining = days.unsigned_abs();

        // Every step moves at least one day
        let span = NaiveDate::MAX.signed_duration_since(NaiveDate::MIN).num_days();
        if remaining > span.unsigned_abs() {
            return None;
        }

        let mut date = date;
        if !self.is_business_day(date) {
            date = self.step(date, direction)?;
            remaining = remaining.saturating_sub(1);
        }
        for _ in 0..remaining {
            date = self.step(date, direction)?;
        }
        Some(date)
    }

    fn business_days(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        if start > end {
            return Vec::new();
        }
        start
            .iter_days()
            .take_while(|date| *date <= end)
            .filter(|date| self.is_business_day(*date))
            .collect()
    }
}

#[async_trait::async_trait]
impl Node for CustomCalendar {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    async fn setup(&self) -> Result<(), NodeError> {
        let days: Vec<&str> = WEEKDAYS
            .iter()
            .zip(self.weekmask)
            .filter_map(|(name, on)| on.then_some(*name))
            .collect();
        self.log()?.debug(format!(
            "Business days: {}; {} holiday(s)",
            days.join(" "),
            self.holidays.len()
        ));
        Ok(())
    }
}

impl Factory for CustomCalendar {
    const NAMESPACE: &'static str = "calendar";
    type Config = CalendarConfig;

    fn requires() -> Requires {
        Requires::logged()
    }

    fn new(config: CalendarConfig) -> Result<Self, NodeError> {
        Ok(Self {
            core: NodeCore::new(),
            weekmask: parse_weekmask(&config.weekmask)?,
            holidays: config.holidays.into_iter().collect(),
        })
    }
}
