//! Questions that span more than one aggregate.
//!
//! Every answer is computed by replaying streams found through the store's
//! type index. Nothing is cached between calls.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use tracing::debug;

use stela_aspirations::Aspiration;
use stela_core::{Aggregate, AggregateId, DomainError};
use stela_events::Event;
use stela_habits::{Activity, Habit};
use stela_journal::StelaMessage;
use stela_projects::Project;

use crate::event_store::EventStore;
use crate::runtime::{RuntimeError, rehydrate};

/// Cross-entity read helper over any event store.
#[derive(Debug, Clone)]
pub struct TrackerQueries<S> {
    store: S,
}

impl<S> TrackerQueries<S>
where
    S: EventStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Replay one aggregate. Returns `None` for a stream with no events.
    pub fn load<A>(&self, aggregate_id: AggregateId) -> Result<Option<A>, RuntimeError>
    where
        A: Aggregate,
        A::Event: Event,
    {
        let history = self.store.load_stream(aggregate_id)?;
        if history.is_empty() {
            return Ok(None);
        }
        rehydrate::<A>(aggregate_id, &history).map(Some)
    }

    /// Replay every aggregate of `A`'s type, in stream creation order.
    pub fn load_all<A>(&self) -> Result<Vec<A>, RuntimeError>
    where
        A: Aggregate,
        A::Event: Event,
    {
        let ids = self.store.aggregate_ids(A::AGGREGATE_TYPE)?;
        debug!(aggregate_type = %A::AGGREGATE_TYPE, streams = ids.len(), "replaying all streams");

        ids.into_iter()
            .map(|id| {
                let history = self.store.load_stream(id)?;
                rehydrate::<A>(id, &history)
            })
            .collect()
    }

    /// Non-archived habits linked to `aspiration_id`.
    pub fn habits_for_aspiration(&self, aspiration_id: AggregateId) -> Result<Vec<Habit>, RuntimeError> {
        Ok(self
            .load_all::<Habit>()?
            .into_iter()
            .filter(|h| h.aspiration_id() == Some(aspiration_id) && !h.is_archived())
            .collect())
    }

    /// Non-archived aspirations.
    pub fn active_aspirations(&self) -> Result<Vec<Aspiration>, RuntimeError> {
        Ok(self
            .load_all::<Aspiration>()?
            .into_iter()
            .filter(|a| !a.is_archived())
            .collect())
    }

    /// Sessions logged against `habit_id`, oldest first.
    pub fn activities_for_habit(&self, habit_id: AggregateId) -> Result<Vec<Activity>, RuntimeError> {
        let mut activities: Vec<Activity> = self
            .load_all::<Activity>()?
            .into_iter()
            .filter(|a| a.habit_id() == Some(habit_id))
            .collect();
        activities.sort_by_key(|a| a.logged_at());
        Ok(activities)
    }

    /// Sessions across all habits logged in `[from, to)`, oldest first.
    pub fn activities_logged_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Activity>, RuntimeError> {
        let mut activities: Vec<Activity> = self
            .load_all::<Activity>()?
            .into_iter()
            .filter(|a| a.logged_at().is_some_and(|at| at >= from && at < to))
            .collect();
        activities.sort_by_key(|a| a.logged_at());
        Ok(activities)
    }

    /// Completed sessions across all habits in a calendar month (UTC).
    pub fn completed_sessions_in_month(&self, year: i32, month: u32) -> Result<usize, RuntimeError> {
        let (from, to) = month_bounds(year, month)?;
        Ok(self
            .activities_logged_between(from, to)?
            .iter()
            .filter(|a| a.is_completed())
            .count())
    }

    /// The newest message for `day` that has not been dismissed.
    pub fn live_stela_message(&self, day: NaiveDate) -> Result<Option<StelaMessage>, RuntimeError> {
        Ok(self
            .load_all::<StelaMessage>()?
            .into_iter()
            .filter(|m| m.day() == Some(day) && !m.is_dismissed())
            .max_by_key(|m| m.created_at()))
    }

    /// Number of stored events per event name.
    pub fn count_events_by_type(&self) -> Result<BTreeMap<String, usize>, RuntimeError> {
        let mut counts = BTreeMap::new();
        for event in self.store.all_events()? {
            *counts.entry(event.event_type).or_insert(0) += 1;
        }
        Ok(counts)
    }

    /// Projects that are not archived.
    pub fn active_projects(&self) -> Result<Vec<Project>, RuntimeError> {
        Ok(self
            .load_all::<Project>()?
            .into_iter()
            .filter(|p| !p.is_archived())
            .collect())
    }

    /// Percent of a project's phases that are complete.
    pub fn project_completion(&self, project_id: AggregateId) -> Result<u8, RuntimeError> {
        let project = self
            .load::<Project>(project_id)?
            .ok_or(RuntimeError::Domain(DomainError::NotFound))?;
        Ok(project.completion_percent())
    }
}

fn month_bounds(year: i32, month: u32) -> Result<(DateTime<Utc>, DateTime<Utc>), DomainError> {
    let invalid = || DomainError::validation(format!("invalid month {year}-{month}"));

    let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(invalid)?;

    let midnight = |d: NaiveDate| Utc.from_utc_datetime(&d.and_time(chrono::NaiveTime::MIN));
    Ok((midnight(start), midnight(next)))
}
