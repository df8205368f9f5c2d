//! Category priority order and tiers used by balancing and the grouped view.

/// Fixed display and diversity order for skill categories.
pub const CATEGORY_ORDER: &[&str] = &[
    "programming_languages",
    "backend_frameworks",
    "frontend_frameworks",
    "databases",
    "cloud_platforms",
    "devops_tools",
    "ai_ml",
    "api_technologies",
    "testing",
    "version_control",
    "mobile_development",
    "methodologies",
    "security",
    "monitoring_observability",
    "operating_systems",
    "networking",
    "message_queues_streaming",
    "build_tools",
    "ide_editors",
    "project_management",
    "collaboration_tools",
    "certifications",
    "soft_skills",
    "cms_ecommerce",
    "game_development",
    "embedded_iot",
    "blockchain_web3",
    "low_code_no_code",
];

pub const HIGH_PRIORITY_CATEGORIES: &[&str] = &[
    "programming_languages",
    "backend_frameworks",
    "frontend_frameworks",
    "databases",
    "cloud_platforms",
    "devops_tools",
    "ai_ml",
];

pub const LOW_PRIORITY_CATEGORIES: &[&str] = &[
    "methodologies",
    "operating_systems",
    "ide_editors",
    "project_management",
    "collaboration_tools",
    "certifications",
    "soft_skills",
    "low_code_no_code",
];

/// How much top-line relevance a category is expected to carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriorityTier {
    High,
    Normal,
    Low,
}

impl PriorityTier {
    /// Categories outside `CATEGORY_ORDER` are treated as low priority.
    pub fn of(category: &str) -> Self {
        if HIGH_PRIORITY_CATEGORIES.contains(&category) {
            PriorityTier::High
        } else if LOW_PRIORITY_CATEGORIES.contains(&category) {
            PriorityTier::Low
        } else if CATEGORY_ORDER.contains(&category) {
            PriorityTier::Normal
        } else {
            PriorityTier::Low
        }
    }
}

/// Position of `category` in the priority order, `None` for unlisted categories.
pub fn priority_rank(category: &str) -> Option<usize> {
    CATEGORY_ORDER.iter().position(|c| *c == category)
}

/// Orders `categories` by priority, appending unlisted ones in the order given.
///
/// `categories` is expected in first-seen order and without duplicates.
pub fn order_categories<'a>(categories: &[&'a str]) -> Vec<&'a str> {
    let mut listed: Vec<&'a str> = categories
        .iter()
        .copied()
        .filter(|c| priority_rank(c).is_some())
        .collect();
    listed.sort_by_key(|c| priority_rank(c));

    let unlisted = categories
        .iter()
        .copied()
        .filter(|c| priority_rank(c).is_none());

    listed.extend(unlisted);
    listed
}
