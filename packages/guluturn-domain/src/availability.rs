use time::{OffsetDateTime, UtcOffset, Weekday};
use tracing::debug;

use crate::{
	Error, Result,
	models::{BusinessHours, Restaurant, RestaurantRef},
	tags::USER_REPORT_CLOSED,
};

const MINUTES_PER_DAY: u32 = 24 * 60;

pub trait Clock: Send + Sync {
	fn now_utc(&self) -> OffsetDateTime;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;
impl Clock for SystemClock {
	fn now_utc(&self) -> OffsetDateTime {
		OffsetDateTime::now_utc()
	}
}

/// Weekday and minutes since midnight at the reference offset.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LocalMoment {
	pub weekday: Weekday,
	pub minutes: u32,
}
impl LocalMoment {
	pub fn new(now_utc: OffsetDateTime, offset: UtcOffset) -> Self {
		let local = now_utc.to_offset(offset);

		Self {
			weekday: local.weekday(),
			minutes: u32::from(local.hour()) * 60 + u32::from(local.minute()),
		}
	}
}

/// Drops preferred restaurants the user reported closed, when they are indeed closed now.
#[derive(Clone, Copy, Debug)]
pub struct AvailabilityFilter {
	offset: UtcOffset,
}
impl AvailabilityFilter {
	pub fn new(offset: UtcOffset) -> Self {
		Self { offset }
	}

	pub fn from_config(cfg: &guluturn_config::Availability) -> Result<Self> {
		let seconds = cfg.utc_offset_minutes.checked_mul(60).ok_or_else(|| Error::InvalidConfig {
			message: format!(
				"Availability UTC offset of {} minutes is out of range.",
				cfg.utc_offset_minutes
			),
		})?;
		let offset = UtcOffset::from_whole_seconds(seconds).map_err(|err| Error::InvalidConfig {
			message: format!("Invalid availability UTC offset: {err}."),
		})?;

		Ok(Self::new(offset))
	}

	pub fn is_active<'a, I>(tags: I) -> bool
	where
		I: IntoIterator<Item = &'a str>,
	{
		tags.into_iter().any(|tag| tag == USER_REPORT_CLOSED)
	}

	pub fn apply<'a, I>(
		&self,
		tags: I,
		preferred_names: &[String],
		pool: &[RestaurantRef],
		now_utc: OffsetDateTime,
	) -> Vec<RestaurantRef>
	where
		I: IntoIterator<Item = &'a str>,
	{
		if !Self::is_active(tags) || preferred_names.is_empty() {
			return pool.to_vec();
		}

		let moment = LocalMoment::new(now_utc, self.offset);
		let kept: Vec<RestaurantRef> = pool
			.iter()
			.filter(|restaurant| {
				let named = preferred_names.iter().any(|name| restaurant.name_matches(name));

				!named || is_open_at(restaurant, moment)
			})
			.cloned()
			.collect();

		debug!(
			weekday = %moment.weekday,
			minutes = moment.minutes,
			excluded = pool.len() - kept.len(),
			"Availability pre-filter applied."
		);

		kept
	}
}

pub fn is_open_at(restaurant: &Restaurant, moment: LocalMoment) -> bool {
	restaurant.hours_on(moment.weekday).is_some_and(|hours| is_open(hours, moment.minutes))
}

/// A window whose close precedes its open runs past midnight. Equal bounds mean open all day.
pub fn is_open(hours: &BusinessHours, minutes: u32) -> bool {
	let (Some(open), Some(close)) = (
		hours.open.as_deref().and_then(parse_hhmm),
		hours.close.as_deref().and_then(parse_hhmm),
	) else {
		return false;
	};

	if open == close {
		true
	} else if open < close {
		(open..=close).contains(&minutes)
	} else {
		minutes >= open || minutes <= close
	}
}

/// Parses `HH:MM` into minutes since midnight. `24:00` is accepted as end of day.
pub fn parse_hhmm(raw: &str) -> Option<u32> {
	let (hour, minute) = raw.trim().split_once(':')?;
	let hour: u32 = hour.parse().ok()?;
	let minute: u32 = minute.parse().ok()?;

	if minute >= 60 {
		return None;
	}

	let total = hour * 60 + minute;

	(total <= MINUTES_PER_DAY).then_some(total)
}
