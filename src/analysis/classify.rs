//! Application classification profiles.
//!
//! A profile bundles the thresholds and scoring weights that suit one kind of
//! app: a game is judged on sustained frame rate, a reader app mostly idles on
//! static pages. [`ProfileRegistry::classify`] maps a label (package name, file
//! name, ...) to a profile by lowercase substring match against each profile's
//! keywords, in declaration order, falling back to the default profile.
//!
//! Matching is plain substring containment, so a label that happens to contain
//! an unrelated keyword is classified by that keyword.

use crate::error::{AppResult, PerfError};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Id of the fallback profile.
pub const DEFAULT_PROFILE_ID: &str = "default";

/// Limits a recording is judged against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Average FPS below this is "too low".
    pub min_fps: f64,
    /// Average FPS below this (and at least `min_fps`) is "mediocre".
    pub warn_fps: f64,
    /// Average CPU % above this is "high".
    pub max_cpu_pct: f64,
    /// Peak memory above this is "high".
    pub max_mem_mb: f64,
    /// Acceptable jank rate in percent.
    pub jank_rate_pct: f64,
    /// Average CPU % below which a low-FPS recording counts as a static page.
    pub static_cpu_pct: f64,
}

/// Per-point score deductions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    /// Per FPS below 60.
    pub fps: f64,
    /// Per jank-rate percent.
    pub jank: f64,
    /// Per CPU percent above the limit.
    pub cpu: f64,
}

/// A named bundle of keywords, thresholds and weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationProfile {
    /// Stable id used for overrides.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Lowercase substrings that select this profile.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Judgement limits.
    pub thresholds: Thresholds,
    /// Score deductions.
    pub weights: ScoreWeights,
}

impl ClassificationProfile {
    /// Whether any keyword occurs in the already-lowercased label.
    fn matches(&self, label_lower: &str) -> bool {
        self.keywords
            .iter()
            .any(|k| !k.is_empty() && label_lower.contains(&k.to_lowercase()))
    }

    /// Whether this is the fallback profile.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.id == DEFAULT_PROFILE_ID
    }
}

fn profile(
    id: &str,
    name: &str,
    keywords: &[&str],
    thresholds: Thresholds,
    weights: ScoreWeights,
) -> ClassificationProfile {
    ClassificationProfile {
        id: id.to_string(),
        name: name.to_string(),
        keywords: keywords.iter().map(|k| (*k).to_string()).collect(),
        thresholds,
        weights,
    }
}

/// The fallback profile: general-purpose apps.
#[must_use]
pub fn default_profile() -> ClassificationProfile {
    profile(
        DEFAULT_PROFILE_ID,
        "General",
        &[],
        Thresholds {
            min_fps: 24.0,
            warn_fps: 45.0,
            max_cpu_pct: 60.0,
            max_mem_mb: 800.0,
            jank_rate_pct: 5.0,
            static_cpu_pct: 50.0,
        },
        ScoreWeights {
            fps: 0.8,
            jank: 2.0,
            cpu: 0.5,
        },
    )
}

/// Built-in non-default profiles, in evaluation order.
#[must_use]
pub fn builtin_profiles() -> Vec<ClassificationProfile> {
    vec![
        profile(
            "game",
            "Game",
            &[
                "game", "tmgp", "unity", "unreal", "mihoyo", "hoyoverse", "netease", "supercell",
                "pubg", "genshin", "minecraft", "roblox",
            ],
            Thresholds {
                min_fps: 30.0,
                warn_fps: 55.0,
                max_cpu_pct: 80.0,
                max_mem_mb: 2048.0,
                jank_rate_pct: 3.0,
                static_cpu_pct: 30.0,
            },
            ScoreWeights {
                fps: 1.2,
                jank: 3.0,
                cpu: 0.4,
            },
        ),
        profile(
            "video",
            "Video & Streaming",
            &[
                "video", "player", "youtube", "netflix", "bilibili", "douyin", "tiktok",
                "kuaishou", "iqiyi", "youku", "twitch", "stream",
            ],
            Thresholds {
                min_fps: 24.0,
                warn_fps: 30.0,
                max_cpu_pct: 50.0,
                max_mem_mb: 1024.0,
                jank_rate_pct: 5.0,
                static_cpu_pct: 40.0,
            },
            ScoreWeights {
                fps: 0.6,
                jank: 2.0,
                cpu: 0.6,
            },
        ),
        profile(
            "social",
            "Social & Messaging",
            &[
                "wechat", "tencent.mm", "whatsapp", "telegram", "instagram", "facebook",
                "twitter", "weibo", "snapchat", "discord", "line",
            ],
            Thresholds {
                min_fps: 24.0,
                warn_fps: 50.0,
                max_cpu_pct: 40.0,
                max_mem_mb: 600.0,
                jank_rate_pct: 4.0,
                static_cpu_pct: 25.0,
            },
            ScoreWeights {
                fps: 0.8,
                jank: 2.5,
                cpu: 0.6,
            },
        ),
        profile(
            "shopping",
            "Shopping",
            &[
                "taobao", "tmall", "jingdong", "pinduoduo", "amazon", "shop", "mall", "ebay",
                "aliexpress",
            ],
            Thresholds {
                min_fps: 24.0,
                warn_fps: 50.0,
                max_cpu_pct: 50.0,
                max_mem_mb: 700.0,
                jank_rate_pct: 4.0,
                static_cpu_pct: 30.0,
            },
            ScoreWeights {
                fps: 0.8,
                jank: 2.5,
                cpu: 0.5,
            },
        ),
        profile(
            "reading",
            "Reading & News",
            &["reader", "book", "novel", "news", "kindle", "zhihu", "toutiao"],
            Thresholds {
                min_fps: 20.0,
                warn_fps: 40.0,
                max_cpu_pct: 35.0,
                max_mem_mb: 500.0,
                jank_rate_pct: 6.0,
                static_cpu_pct: 40.0,
            },
            ScoreWeights {
                fps: 0.5,
                jank: 1.5,
                cpu: 0.6,
            },
        ),
    ]
}

static BUILTIN: Lazy<ProfileRegistry> = Lazy::new(|| ProfileRegistry {
    profiles: builtin_profiles(),
    default: default_profile(),
});

/// Ordered profile list with an explicit fallback.
#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    profiles: Vec<ClassificationProfile>,
    default: ClassificationProfile,
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::builtin().clone()
    }
}

impl ProfileRegistry {
    /// Process-wide built-in registry.
    #[must_use]
    pub fn builtin() -> &'static ProfileRegistry {
        &BUILTIN
    }

    /// Built-in profiles followed by `extra`, in that evaluation order.
    ///
    /// Extra profiles reusing a built-in id or the default id are ignored.
    #[must_use]
    pub fn with_extra(extra: impl IntoIterator<Item = ClassificationProfile>) -> Self {
        let mut registry = Self::default();
        for p in extra {
            if p.is_default() || registry.profiles.iter().any(|q| q.id == p.id) {
                tracing::warn!(profile = %p.id, "Ignoring duplicate classification profile");
                continue;
            }
            registry.profiles.push(p);
        }
        registry
    }

    /// Pick the profile for `label`.
    ///
    /// The label is trimmed and lowercased, then each non-default profile is
    /// tried in order for a keyword contained in it. A blank label (empty or
    /// whitespace only) gets the default profile.
    #[must_use]
    pub fn classify(&self, label: &str) -> &ClassificationProfile {
        let label = label.trim().to_lowercase();
        if label.is_empty() {
            return &self.default;
        }
        self.profiles
            .iter()
            .find(|p| p.matches(&label))
            .unwrap_or(&self.default)
    }

    /// Look a profile up by id, including the default.
    pub fn get(&self, id: &str) -> AppResult<&ClassificationProfile> {
        if id == DEFAULT_PROFILE_ID {
            return Ok(&self.default);
        }
        self.profiles
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| PerfError::UnknownProfile(id.to_string()))
    }

    /// The fallback profile.
    #[must_use]
    pub fn default_profile(&self) -> &ClassificationProfile {
        &self.default
    }

    /// Non-default profiles in evaluation order, then the default.
    pub fn iter(&self) -> impl Iterator<Item = &ClassificationProfile> {
        self.profiles.iter().chain(std::iter::once(&self.default))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_label_falls_back_to_default() {
        let registry = ProfileRegistry::builtin();
        assert!(registry.classify("com.unknown.demoapp").is_default());
        assert!(registry.classify("").is_default());
        assert!(registry.classify("   ").is_default());
    }

    #[test]
    fn test_match_is_case_insensitive_substring() {
        let registry = ProfileRegistry::builtin();
        assert_eq!(registry.classify("com.tencent.tmgp.sgame").id, "game");
        assert_eq!(registry.classify("1718000000000_TV.Bilibili.Android.csv").id, "video");
        assert_eq!(registry.classify("com.tencent.mm").id, "social");
    }

    #[test]
    fn test_first_declared_profile_wins() {
        // "game" and "video" both match; game is declared first.
        let registry = ProfileRegistry::builtin();
        assert_eq!(registry.classify("com.example.gamevideo").id, "game");
    }

    #[test]
    fn test_substring_match_can_misclassify() {
        // "line" is a social keyword and also a substring of "offline".
        let registry = ProfileRegistry::builtin();
        assert_eq!(registry.classify("com.example.offlinemaps").id, "social");
    }

    #[test]
    fn test_get_by_id() {
        let registry = ProfileRegistry::builtin();
        assert_eq!(registry.get("reading").unwrap().name, "Reading & News");
        assert!(registry.get(DEFAULT_PROFILE_ID).unwrap().is_default());
        assert!(matches!(
            registry.get("racing"),
            Err(PerfError::UnknownProfile(_))
        ));
    }

    #[test]
    fn test_extra_profiles_follow_builtins() {
        let mut maps = default_profile();
        maps.id = "maps".into();
        maps.name = "Navigation".into();
        maps.keywords = vec!["amap".into(), "navi".into()];

        let mut dup = default_profile();
        dup.id = "game".into();
        dup.keywords = vec!["navi".into()];

        let registry = ProfileRegistry::with_extra([maps, dup]);
        assert_eq!(registry.classify("com.autonavi.minimap").id, "maps");
        assert_eq!(registry.iter().count(), builtin_profiles().len() + 2);
        assert!(registry.iter().last().unwrap().is_default());
    }
}
