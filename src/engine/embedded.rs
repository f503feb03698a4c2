//! Static fallback list consulted when the persisted block-list is unreachable.
//!
//! Known domains are shipped as 32-bit fingerprints rather than raw strings.

use super::category::BlockingCategory;
use super::hash::fingerprint32;
use super::normalize::NormalizedAddress;
use rustc_hash::FxHashMap;
use std::sync::LazyLock;

pub const DOMAIN_CONFIDENCE: f32 = 0.9;
pub const PATTERN_CONFIDENCE: f32 = 0.8;
pub const PATH_CONFIDENCE: f32 = 0.7;
pub const QUERY_CONFIDENCE: f32 = 0.6;

const EXPLICIT_FINGERPRINTS: &[u32] = &[
    0x39a2_9dd8,
    0xccc0_2064,
    0x3ebc_814c,
    0x8193_35bc,
    0xc56d_eb2d,
    0x974f_c5d2,
    0xd4fe_74d7,
    0x6ef8_6adf,
];

const ADULT_FINGERPRINTS: &[u32] = &[0x2414_ad96, 0xbd47_58c1, 0x4008_0d40, 0x86f0_5857];

const GAMBLING_FINGERPRINTS: &[u32] = &[0x513a_1187, 0x4917_d77c, 0x31e3_a41b, 0xd1cd_fb77];

const DATING_FINGERPRINTS: &[u32] = &[0x07eb_e424, 0x3da0_9568, 0x0da4_fbe1];

const DOMAIN_PATTERNS: &[(&str, BlockingCategory)] = &[
    ("porn", BlockingCategory::ExplicitContent),
    ("xxx", BlockingCategory::ExplicitContent),
    ("hentai", BlockingCategory::ExplicitContent),
    ("camgirl", BlockingCategory::AdultEntertainment),
    ("escort", BlockingCategory::AdultEntertainment),
    ("casino", BlockingCategory::Gambling),
    ("betting", BlockingCategory::Gambling),
    ("hookup", BlockingCategory::DatingSites),
];

const SUSPICIOUS_PATHS: &[(&str, BlockingCategory)] = &[
    ("/porn", BlockingCategory::ExplicitContent),
    ("/xxx", BlockingCategory::ExplicitContent),
    ("/nsfw", BlockingCategory::ExplicitContent),
    ("/adult", BlockingCategory::AdultEntertainment),
    ("/nude", BlockingCategory::InappropriateImagery),
    ("/casino", BlockingCategory::Gambling),
];

const SUSPICIOUS_QUERY_PARAMS: &[(&str, BlockingCategory)] = &[
    ("nsfw=1", BlockingCategory::ExplicitContent),
    ("nsfw=true", BlockingCategory::ExplicitContent),
    ("adult=1", BlockingCategory::AdultEntertainment),
    ("safe=off", BlockingCategory::SuspiciousContent),
    ("safesearch=off", BlockingCategory::SuspiciousContent),
];

#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedMatch {
    pub category: BlockingCategory,
    pub confidence: f32,
    pub matched: String,
    pub reason: &'static str,
}

#[derive(Debug)]
pub struct EmbeddedList {
    domains: FxHashMap<u32, BlockingCategory>,
}

static EMBEDDED: LazyLock<EmbeddedList> = LazyLock::new(EmbeddedList::build);

impl EmbeddedList {
    pub fn get() -> &'static EmbeddedList {
        &EMBEDDED
    }

    fn build() -> Self {
        let mut domains = FxHashMap::default();
        let groups = [
            (EXPLICIT_FINGERPRINTS, BlockingCategory::ExplicitContent),
            (ADULT_FINGERPRINTS, BlockingCategory::AdultEntertainment),
            (GAMBLING_FINGERPRINTS, BlockingCategory::Gambling),
            (DATING_FINGERPRINTS, BlockingCategory::DatingSites),
        ];
        for (fingerprints, category) in groups {
            for &fp in fingerprints {
                domains.insert(fp, category);
            }
        }
        Self { domains }
    }

    /// Sub-checks run in confidence order: domain, pattern, path, query.
    pub fn check(&self, address: &NormalizedAddress) -> Option<EmbeddedMatch> {
        if let Some(m) = self.check_domain(&address.domain) {
            return Some(m);
        }

        if let Some((pattern, category)) = DOMAIN_PATTERNS
            .iter()
            .find(|(pattern, _)| address.domain.contains(pattern))
        {
            return Some(EmbeddedMatch {
                category: *category,
                confidence: PATTERN_CONFIDENCE,
                matched: pattern.to_string(),
                reason: "embedded domain pattern",
            });
        }

        let path = address.path.to_lowercase();
        if let Some((segment, category)) = SUSPICIOUS_PATHS
            .iter()
            .find(|(segment, _)| path.contains(segment))
        {
            return Some(EmbeddedMatch {
                category: *category,
                confidence: PATH_CONFIDENCE,
                matched: segment.to_string(),
                reason: "embedded suspicious path",
            });
        }

        let query = address.query.to_lowercase();
        let params: Vec<&str> = query.split('&').collect();
        SUSPICIOUS_QUERY_PARAMS
            .iter()
            .find(|(param, _)| params.contains(param))
            .map(|(param, category)| EmbeddedMatch {
                category: *category,
                confidence: QUERY_CONFIDENCE,
                matched: param.to_string(),
                reason: "embedded suspicious query parameter",
            })
    }

    // Walks parent domains so subdomains of a listed site match too.
    fn check_domain(&self, domain: &str) -> Option<EmbeddedMatch> {
        let mut part = domain;
        loop {
            if let Some(&category) = self.domains.get(&fingerprint32(part)) {
                return Some(EmbeddedMatch {
                    category,
                    confidence: DOMAIN_CONFIDENCE,
                    matched: part.to_string(),
                    reason: "embedded domain list",
                });
            }

            match part.find('.') {
                Some(idx) => {
                    part = &part[idx + 1..];
                    if part.is_empty() {
                        break;
                    }
                }
                None => break,
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}
