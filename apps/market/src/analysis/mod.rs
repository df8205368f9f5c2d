//! Turns per-posting skill extractions into a ranked `MarketProfile`.
//!
//! Everything here is pure and deterministic: the same extractions always
//! produce the same ranking. Ties on occurrence count break by the order in
//! which skills were first seen while counting.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use tracing::debug;

use crate::models::market::{CategoryGroup, ExtractedSkill, MarketProfile, SkillAggregate};
use crate::vocabulary::categories::order_categories;

pub mod thresholds;

use thresholds::min_prevalence;

pub const NO_JOBS_ADVISORY: &str = "No jobs found for this search";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregationOptions {
    pub top_n: usize,
    pub balanced: bool,
    /// Phase 1 guarantee per present category.
    pub min_per_category: usize,
    /// Hard cap per category in the balanced and grouped views.
    pub max_per_category: usize,
}

impl Default for AggregationOptions {
    fn default() -> Self {
        Self {
            top_n: 30,
            balanced: true,
            min_per_category: 2,
            max_per_category: 5,
        }
    }
}

/// Builds the ranked profile.
///
/// `total_postings` is the number of postings that were analyzed, which may
/// exceed `extractions.len()` only if the caller dropped empty slots.
pub fn aggregate(
    query: &str,
    normalized_location: &str,
    extractions: &[Vec<ExtractedSkill>],
    total_postings: u32,
    options: &AggregationOptions,
) -> MarketProfile {
    if total_postings == 0 {
        return empty_profile(query, normalized_location);
    }

    let counted = count_skills(extractions, total_postings);
    let distinct = counted.len();

    let ranked_skills = if options.balanced {
        select_balanced(counted, total_postings, options)
    } else {
        let mut all = counted;
        sort_by_rank(&mut all);
        all.truncate(options.top_n);
        all
    };

    debug!(
        "Aggregated {} postings: {} distinct skills, {} ranked (balanced={})",
        total_postings,
        distinct,
        ranked_skills.len(),
        options.balanced
    );

    MarketProfile {
        query: query.to_string(),
        normalized_location: normalized_location.to_string(),
        total_postings_analyzed: total_postings,
        ranked_skills,
        skills_by_category: None,
        advisory_message: None,
        source_provider: None,
        generated_at: Utc::now(),
    }
}

/// Builds the category-grouped profile.
///
/// Same thresholds as the balanced view; each category keeps at most
/// `max_per_category` skills. `ranked_skills` carries the union of the groups
/// in rank order.
pub fn aggregate_by_category(
    query: &str,
    normalized_location: &str,
    extractions: &[Vec<ExtractedSkill>],
    total_postings: u32,
    options: &AggregationOptions,
) -> MarketProfile {
    if total_postings == 0 {
        let mut profile = empty_profile(query, normalized_location);
        profile.skills_by_category = Some(Vec::new());
        return profile;
    }

    let mut qualifying = qualifying_skills(count_skills(extractions, total_postings), total_postings);
    sort_by_rank(&mut qualifying);

    let mut by_category: HashMap<&str, Vec<SkillAggregate>> = HashMap::new();
    for skill in &qualifying {
        let bucket = by_category.entry(skill.category.as_str()).or_default();
        if bucket.len() < options.max_per_category {
            bucket.push(skill.clone());
        }
    }

    let groups: Vec<CategoryGroup> = order_categories(&categories_by_first_seen(&qualifying))
        .into_iter()
        .filter_map(|category| {
            let skills = by_category.remove(category)?;
            (!skills.is_empty()).then(|| CategoryGroup {
                category: category.to_string(),
                skills,
            })
        })
        .collect();

    let mut ranked_skills: Vec<SkillAggregate> =
        groups.iter().flat_map(|g| g.skills.iter().cloned()).collect();
    sort_by_rank(&mut ranked_skills);

    debug!(
        "Grouped {} postings into {} categories ({} skills)",
        total_postings,
        groups.len(),
        ranked_skills.len()
    );

    MarketProfile {
        query: query.to_string(),
        normalized_location: normalized_location.to_string(),
        total_postings_analyzed: total_postings,
        ranked_skills,
        skills_by_category: Some(groups),
        advisory_message: None,
        source_provider: None,
        generated_at: Utc::now(),
    }
}

/// The zero-result profile returned when nothing was analyzed.
pub fn empty_profile(query: &str, normalized_location: &str) -> MarketProfile {
    MarketProfile {
        query: query.to_string(),
        normalized_location: normalized_location.to_string(),
        total_postings_analyzed: 0,
        ranked_skills: Vec::new(),
        skills_by_category: None,
        advisory_message: Some(NO_JOBS_ADVISORY.to_string()),
        source_provider: None,
        generated_at: Utc::now(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Counting
// ────────────────────────────────────────────────────────────────────────────

/// Distinct-posting occurrence counts, in first-seen order.
///
/// A skill listed twice for the same posting counts once. The category is the
/// one carried by the skill's first occurrence.
pub fn count_skills(extractions: &[Vec<ExtractedSkill>], total_postings: u32) -> Vec<SkillAggregate> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counted: Vec<SkillAggregate> = Vec::new();

    for posting in extractions {
        let mut seen_here = HashSet::new();
        for skill in posting {
            if !seen_here.insert(skill.name.as_str()) {
                continue;
            }
            match index.get(skill.name.as_str()) {
                Some(&i) => counted[i].occurrence_count += 1,
                None => {
                    index.insert(skill.name.as_str(), counted.len());
                    counted.push(SkillAggregate {
                        name: skill.name.clone(),
                        category: skill.category.clone(),
                        occurrence_count: 1,
                        prevalence: 0.0,
                        first_seen: counted.len(),
                    });
                }
            }
        }
    }

    for skill in &mut counted {
        skill.prevalence = prevalence(skill.occurrence_count, total_postings);
    }
    counted
}

/// `count / total × 100`, one decimal place, clamped to 100.
pub fn prevalence(count: u32, total_postings: u32) -> f64 {
    if total_postings == 0 {
        return 0.0;
    }
    let pct = f64::from(count) / f64::from(total_postings) * 100.0;
    ((pct * 10.0).round() / 10.0).min(100.0)
}

/// Occurrence count descending, first-seen ascending.
fn sort_by_rank(skills: &mut [SkillAggregate]) {
    skills.sort_by(|a, b| {
        b.occurrence_count
            .cmp(&a.occurrence_count)
            .then(a.first_seen.cmp(&b.first_seen))
    });
}

/// Distinct categories, ordered by the earliest `first_seen` among their skills.
fn categories_by_first_seen(skills: &[SkillAggregate]) -> Vec<&str> {
    let mut earliest: Vec<(&str, usize)> = Vec::new();
    for skill in skills {
        match earliest.iter_mut().find(|(c, _)| *c == skill.category) {
            Some(entry) => entry.1 = entry.1.min(skill.first_seen),
            None => earliest.push((skill.category.as_str(), skill.first_seen)),
        }
    }
    earliest.sort_by_key(|&(_, first)| first);
    earliest.into_iter().map(|(category, _)| category).collect()
}

fn qualifying_skills(counted: Vec<SkillAggregate>, total_postings: u32) -> Vec<SkillAggregate> {
    counted
        .into_iter()
        .filter(|s| s.prevalence >= min_prevalence(total_postings, &s.category))
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Balancing
// ────────────────────────────────────────────────────────────────────────────

/// Two-phase diverse selection.
///
/// Phase 1 walks categories in priority order and admits each one's best
/// `min_per_category` skills. Phase 2 fills the remaining slots by count from
/// whatever is left, skipping categories already at `max_per_category`.
fn select_balanced(
    counted: Vec<SkillAggregate>,
    total_postings: u32,
    options: &AggregationOptions,
) -> Vec<SkillAggregate> {
    let mut pool = qualifying_skills(counted, total_postings);
    sort_by_rank(&mut pool);

    let guaranteed = options.min_per_category.min(options.max_per_category);
    let mut admitted = vec![false; pool.len()];
    let mut per_category: HashMap<&str, usize> = HashMap::new();
    let mut selected: Vec<usize> = Vec::new();

    // Phase 1
    'categories: for category in order_categories(&categories_by_first_seen(&pool)) {
        for (i, skill) in pool.iter().enumerate() {
            if selected.len() >= options.top_n {
                break 'categories;
            }
            if skill.category != category {
                continue;
            }
            let taken = per_category.entry(category).or_insert(0);
            if *taken >= guaranteed {
                break;
            }
            *taken += 1;
            admitted[i] = true;
            selected.push(i);
        }
    }

    // Phase 2
    for (i, skill) in pool.iter().enumerate() {
        if selected.len() >= options.top_n {
            break;
        }
        if admitted[i] {
            continue;
        }
        let taken = per_category.entry(skill.category.as_str()).or_insert(0);
        if *taken >= options.max_per_category {
            continue;
        }
        *taken += 1;
        admitted[i] = true;
        selected.push(i);
    }

    let mut ranked: Vec<SkillAggregate> = pool
        .into_iter()
        .zip(admitted)
        .filter_map(|(skill, keep)| keep.then_some(skill))
        .collect();
    sort_by_rank(&mut ranked);
    ranked
}
