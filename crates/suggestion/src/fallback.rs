//! Static fallback suggestions
//!
//! Served whenever the AI path is unavailable or fails. Selection is
//! filter → Fisher–Yates shuffle → take three, so repeated requests for the
//! same slot still vary.

use std::sync::LazyLock;

use rand::seq::SliceRandom;
use serde::Deserialize;
use tracing::warn;

use crate::types::{AgeGroup, Category, Situation, Suggestion, SuggestionRequest, new_id};

/// One fallback table entry. `age_groups` empty means "any audience".
#[derive(Debug, Deserialize)]
struct FallbackEntry {
    title: String,
    description: String,
    category: Category,
    situations: Vec<Situation>,
    durations: Vec<u32>,
    steps: Vec<String>,
    #[serde(default)]
    age_groups: Vec<AgeGroup>,
}

static GENERAL: LazyLock<Vec<FallbackEntry>> = LazyLock::new(|| {
    serde_json::from_str(include_str!("../data/suggestions.json"))
        .expect("embedded suggestion table is valid JSON")
});

static JOB_HUNTING: LazyLock<Vec<FallbackEntry>> = LazyLock::new(|| {
    serde_json::from_str(include_str!("../data/job_hunting.json"))
        .expect("embedded job-hunting suggestion table is valid JSON")
});

/// Pick three fallback suggestions for the request.
///
/// Job seekers and career changers draw from the dedicated job-hunting table;
/// everyone else draws from the general table. Fewer than three matches is a
/// content gap worth logging, not an error — whatever matched is returned.
pub fn fallback_suggestions(request: &SuggestionRequest) -> Vec<Suggestion> {
    let job_hunting = request.age_group.is_some_and(|g| g.is_job_hunting());
    let table: &Vec<FallbackEntry> = if job_hunting { &*JOB_HUNTING } else { &*GENERAL };

    let minutes = request.duration.minutes();
    let mut candidates: Vec<&FallbackEntry> = table
        .iter()
        .filter(|e| e.situations.contains(&request.situation) && e.durations.contains(&minutes))
        .filter(|e| {
            e.age_groups.is_empty()
                || request.age_group.is_some_and(|g| e.age_groups.contains(&g))
        })
        .collect();

    if candidates.len() < 3 {
        warn!(
            situation = request.situation.as_str(),
            minutes,
            available = candidates.len(),
            "limited fallback suggestions for this slot"
        );
    }

    candidates.shuffle(&mut rand::rng());

    candidates
        .into_iter()
        .take(3)
        .map(|e| Suggestion {
            id: new_id(),
            title: e.title.clone(),
            description: e.description.clone(),
            duration: minutes,
            category: e.category,
            steps: e.steps.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BreakDuration;

    fn request(
        situation: Situation,
        duration: BreakDuration,
        age_group: Option<AgeGroup>,
    ) -> SuggestionRequest {
        SuggestionRequest {
            situation,
            duration,
            age_group,
            location: "Tokyo".to_string(),
        }
    }

    const ALL_SITUATIONS: [Situation; 7] = [
        Situation::Workplace,
        Situation::Home,
        Situation::Outside,
        Situation::Studying,
        Situation::School,
        Situation::Commuting,
        Situation::JobHunting,
    ];

    const ALL_DURATIONS: [BreakDuration; 3] = [
        BreakDuration::Short,
        BreakDuration::Medium,
        BreakDuration::Long,
    ];

    #[test]
    fn every_slot_yields_three_suggestions() {
        for situation in ALL_SITUATIONS {
            for duration in ALL_DURATIONS {
                let result = fallback_suggestions(&request(situation, duration, None));
                assert_eq!(
                    result.len(),
                    3,
                    "slot {:?}/{} must have at least 3 table entries",
                    situation,
                    duration.minutes()
                );
            }
        }
    }

    #[test]
    fn every_job_hunting_slot_yields_three_suggestions() {
        for situation in ALL_SITUATIONS {
            for duration in ALL_DURATIONS {
                let result = fallback_suggestions(&request(
                    situation,
                    duration,
                    Some(AgeGroup::JobSeeker),
                ));
                assert_eq!(
                    result.len(),
                    3,
                    "job-hunting slot {:?}/{} must have at least 3 table entries",
                    situation,
                    duration.minutes()
                );
            }
        }
    }

    #[test]
    fn suggestions_carry_the_requested_duration() {
        let result =
            fallback_suggestions(&request(Situation::Workplace, BreakDuration::Medium, None));
        assert!(result.iter().all(|s| s.duration == 15));
    }

    #[test]
    fn job_seekers_draw_from_the_job_hunting_table() {
        let job_titles: Vec<&str> = JOB_HUNTING.iter().map(|e| e.title.as_str()).collect();
        let result = fallback_suggestions(&request(
            Situation::Home,
            BreakDuration::Short,
            Some(AgeGroup::JobSeeker),
        ));
        assert!(
            result.iter().all(|s| job_titles.contains(&s.title.as_str())),
            "job seekers must only see job-hunting entries"
        );
    }

    #[test]
    fn other_age_groups_draw_from_the_general_table() {
        let general_titles: Vec<&str> = GENERAL.iter().map(|e| e.title.as_str()).collect();
        let result = fallback_suggestions(&request(
            Situation::School,
            BreakDuration::Short,
            Some(AgeGroup::Student),
        ));
        assert!(
            result
                .iter()
                .all(|s| general_titles.contains(&s.title.as_str()))
        );
    }

    #[test]
    fn ids_are_unique_across_calls() {
        let req = request(Situation::Home, BreakDuration::Short, None);
        let first = fallback_suggestions(&req);
        let second = fallback_suggestions(&req);

        let mut ids: Vec<&str> = first
            .iter()
            .chain(second.iter())
            .map(|s| s.id.as_str())
            .collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 6);
    }

    #[test]
    fn entries_have_steps() {
        let result = fallback_suggestions(&request(Situation::Outside, BreakDuration::Long, None));
        assert!(result.iter().all(|s| !s.steps.is_empty()));
    }

    #[test]
    fn tables_parse_and_are_nonempty() {
        assert!(!GENERAL.is_empty());
        assert!(!JOB_HUNTING.is_empty());
    }
}
