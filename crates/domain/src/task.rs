//! Tasks: time-triggered action invocations.
//!
//! A [`RecurringTask`] runs an action on a calendar [`Schedule`] forever.
//! A [`DelayedTask`] runs an action once, `delay_minutes` after it was
//! created, and retries a bounded number of times on failure.

use serde::{Deserialize, Serialize};

use crate::error::{SmartHomeError, ValidationError};
use crate::id::{ActionId, ControllerId, DelayedTaskId, JobId, RecurringTaskId};
use crate::time::Timestamp;

/// Longest accepted delay for a [`DelayedTask`], in minutes.
pub const MAX_DELAY_MINUTES: u32 = 240;

const WEEKDAYS: [&str; 7] = ["MON", "TUE", "WED", "THU", "FRI", "SAT", "SUN"];

/// Flat discriminant of a [`Schedule`], as found in API payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleKind {
    Daily,
    Weekly,
    Monthly,
}

impl ScheduleKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

/// When a recurring task fires, in UTC.
///
/// Monthly schedules are pinned to a day of the month only; they carry no
/// weekday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Schedule {
    Daily {
        minute: u8,
        hour: u8,
    },
    Weekly {
        minute: u8,
        hour: u8,
        /// `0` is Monday, `6` is Sunday.
        weekday: u8,
    },
    Monthly {
        minute: u8,
        hour: u8,
        month_day: u8,
    },
}

impl Schedule {
    /// Assemble a schedule from flat request fields.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingScheduleField`] when the kind needs a
    /// field that is absent, [`ValidationError::UnexpectedScheduleField`] when
    /// a field does not apply to the kind, and range errors from
    /// [`Schedule::validate`].
    pub fn from_parts(
        kind: ScheduleKind,
        minute: u8,
        hour: u8,
        weekday: Option<u8>,
        month_day: Option<u8>,
    ) -> Result<Self, SmartHomeError> {
        let unexpected = |field| ValidationError::UnexpectedScheduleField {
            kind: kind.as_str(),
            field,
        };
        let missing = |field| ValidationError::MissingScheduleField {
            kind: kind.as_str(),
            field,
        };

        let schedule = match (kind, weekday, month_day) {
            (_, _, Some(_)) if kind != ScheduleKind::Monthly => {
                return Err(unexpected("month_day").into());
            }
            (ScheduleKind::Daily | ScheduleKind::Monthly, Some(_), _) => {
                return Err(unexpected("weekday").into());
            }
            (ScheduleKind::Daily, None, None) => Self::Daily { minute, hour },
            (ScheduleKind::Weekly, Some(weekday), None) => Self::Weekly {
                minute,
                hour,
                weekday,
            },
            (ScheduleKind::Weekly, None, _) => return Err(missing("weekday").into()),
            (ScheduleKind::Monthly, None, Some(month_day)) => Self::Monthly {
                minute,
                hour,
                month_day,
            },
            (ScheduleKind::Monthly, None, None) => return Err(missing("month_day").into()),
            (ScheduleKind::Daily, None, Some(_)) | (ScheduleKind::Weekly, Some(_), Some(_)) => {
                return Err(unexpected("month_day").into());
            }
        };
        schedule.validate()?;
        Ok(schedule)
    }

    #[must_use]
    pub fn kind(&self) -> ScheduleKind {
        match self {
            Self::Daily { .. } => ScheduleKind::Daily,
            Self::Weekly { .. } => ScheduleKind::Weekly,
            Self::Monthly { .. } => ScheduleKind::Monthly,
        }
    }

    /// Check field ranges.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::Validation`] for an out-of-range minute,
    /// hour, weekday or month day.
    pub fn validate(&self) -> Result<(), SmartHomeError> {
        let (minute, hour) = self.time_of_day();
        if minute > 59 {
            return Err(ValidationError::InvalidMinute(minute).into());
        }
        if hour > 23 {
            return Err(ValidationError::InvalidHour(hour).into());
        }
        match *self {
            Self::Weekly { weekday, .. } if usize::from(weekday) >= WEEKDAYS.len() => {
                Err(ValidationError::InvalidWeekday(weekday).into())
            }
            Self::Monthly { month_day, .. } if !(1..=31).contains(&month_day) => {
                Err(ValidationError::InvalidMonthDay(month_day).into())
            }
            _ => Ok(()),
        }
    }

    /// Six-field cron expression (`sec min hour day-of-month month day-of-week`).
    #[must_use]
    pub fn cron_expression(&self) -> String {
        match *self {
            Self::Daily { minute, hour } => format!("0 {minute} {hour} * * *"),
            Self::Weekly {
                minute,
                hour,
                weekday,
            } => {
                let day = WEEKDAYS
                    .get(usize::from(weekday))
                    .copied()
                    .unwrap_or("*");
                format!("0 {minute} {hour} * * {day}")
            }
            Self::Monthly {
                minute,
                hour,
                month_day,
            } => format!("0 {minute} {hour} {month_day} * *"),
        }
    }

    fn time_of_day(&self) -> (u8, u8) {
        match *self {
            Self::Daily { minute, hour }
            | Self::Weekly { minute, hour, .. }
            | Self::Monthly { minute, hour, .. } => (minute, hour),
        }
    }
}

/// Calendar-scheduled repeating invocation of an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringTask {
    pub id: RecurringTaskId,
    pub controller_id: ControllerId,
    pub action_id: ActionId,
    pub schedule: Schedule,
    /// Job currently registered with the scheduler, if any.
    pub job_id: Option<JobId>,
}

impl RecurringTask {
    #[must_use]
    pub fn new(controller_id: ControllerId, action_id: ActionId, schedule: Schedule) -> Self {
        Self {
            id: RecurringTaskId::new(),
            controller_id,
            action_id,
            schedule,
            job_id: None,
        }
    }
}

/// Lifecycle of a [`DelayedTask`]. Only `Active` tasks are ever scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelayedTaskState {
    Active,
    /// The action succeeded.
    Done,
    /// The retry ceiling was reached without a success.
    Exhausted,
}

/// One-off invocation of an action, `delay_minutes` after `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayedTask {
    pub id: DelayedTaskId,
    pub controller_id: ControllerId,
    pub action_id: ActionId,
    pub delay_minutes: u32,
    pub state: DelayedTaskState,
    /// Failed attempts so far.
    pub retry_count: u32,
    pub job_id: Option<JobId>,
    pub created_at: Timestamp,
}

impl DelayedTask {
    /// Create an active task.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidDelay`] unless
    /// `1 <= delay_minutes <= MAX_DELAY_MINUTES`.
    pub fn new(
        controller_id: ControllerId,
        action_id: ActionId,
        delay_minutes: u32,
        created_at: Timestamp,
    ) -> Result<Self, SmartHomeError> {
        if !(1..=MAX_DELAY_MINUTES).contains(&delay_minutes) {
            return Err(ValidationError::InvalidDelay(delay_minutes).into());
        }
        Ok(Self {
            id: DelayedTaskId::new(),
            controller_id,
            action_id,
            delay_minutes,
            state: DelayedTaskState::Active,
            retry_count: 0,
            job_id: None,
            created_at,
        })
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == DelayedTaskState::Active
    }

    /// Originally planned fire time.
    #[must_use]
    pub fn due_at(&self) -> Timestamp {
        self.created_at + chrono::TimeDelta::minutes(i64::from(self.delay_minutes))
    }

    /// Fire time when (re)registering the task at `now`.
    ///
    /// A due time that passed less than `grace` ago is kept; an older one is
    /// moved to `now + grace` instead of firing arbitrarily late.
    #[must_use]
    pub fn resume_at(&self, now: Timestamp, grace: chrono::TimeDelta) -> Timestamp {
        let due = self.due_at();
        if now - due <= grace { due } else { now + grace }
    }

    #[must_use]
    pub fn has_exhausted(&self, retry_threshold: u32) -> bool {
        self.retry_count >= retry_threshold
    }

    pub fn mark_done(&mut self) {
        self.state = DelayedTaskState::Done;
        self.job_id = None;
    }

    pub fn mark_exhausted(&mut self) {
        self.state = DelayedTaskState::Exhausted;
        self.job_id = None;
    }

    /// Count a failed attempt and attach the job that will retry it.
    pub fn record_failure(&mut self, retry_job: JobId) {
        self.retry_count += 1;
        self.job_id = Some(retry_job);
    }
}
