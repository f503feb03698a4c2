use crate::engine::{BlockingCategory, Guidance, GuidanceStore};
use rand::seq::SliceRandom;

const BUILT_IN: &[(BlockingCategory, &str)] = &[
    (
        BlockingCategory::ExplicitContent,
        "Take a breath and step away from the screen for a minute.",
    ),
    (
        BlockingCategory::ExplicitContent,
        "Urges pass. Try a short walk or a glass of water first.",
    ),
    (
        BlockingCategory::AdultEntertainment,
        "This site was blocked. Consider calling a friend instead.",
    ),
    (
        BlockingCategory::Gambling,
        "The house always wins. Your money is better spent elsewhere.",
    ),
    (
        BlockingCategory::Gambling,
        "Set this moment aside and note what prompted the visit.",
    ),
    (
        BlockingCategory::DatingSites,
        "This site is on your block-list. Revisit why you added it.",
    ),
    (
        BlockingCategory::InappropriateImagery,
        "Images on this page were judged inappropriate.",
    ),
    (
        BlockingCategory::SuspiciousContent,
        "This address looked suspicious, so it was blocked to be safe.",
    ),
];

/// Fixed english guidance table, used when no guidance database is present.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticGuidance;

impl StaticGuidance {
    pub fn new() -> Self {
        Self
    }

    pub fn all_for(&self, category: BlockingCategory) -> Vec<Guidance> {
        BUILT_IN
            .iter()
            .filter(|(c, _)| *c == category)
            .map(|(c, text)| to_guidance(*c, text))
            .collect()
    }
}

fn to_guidance(category: BlockingCategory, text: &str) -> Guidance {
    Guidance {
        category,
        locale: "en".to_string(),
        text: text.to_string(),
        reference: category.guidance_ref().to_string(),
    }
}

impl GuidanceStore for StaticGuidance {
    fn random_guidance_for(&self, category: BlockingCategory) -> Option<Guidance> {
        let candidates: Vec<&(BlockingCategory, &str)> =
            BUILT_IN.iter().filter(|(c, _)| *c == category).collect();
        candidates
            .choose(&mut rand::thread_rng())
            .map(|(c, text)| to_guidance(*c, text))
    }
}
