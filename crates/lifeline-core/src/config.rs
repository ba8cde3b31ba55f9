//! Configuration loading and typed config structures for the Lifeline engine.
//!
//! The canonical configuration lives in `lifeline-config.yaml` at the project
//! root. Every section is optional; missing fields fall back to the defaults
//! below. One [`EngineConfig`] is built at startup and handed to each
//! component at construction.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::NaiveDate;
use lifeline_store::StoreConfig;
use lifeline_types::LifePhase;
use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value is out of range or inconsistent with another value.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

fn invalid(reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        reason: reason.into(),
    }
}

/// Top-level engine configuration.
///
/// Mirrors the structure of `lifeline-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EngineConfig {
    /// Age and calendar pacing.
    #[serde(default)]
    pub pacing: PacingConfig,

    /// Digest and tech-epoch cadence.
    #[serde(default)]
    pub cadence: CadenceConfig,

    /// Reader comment scoring.
    #[serde(default)]
    pub comments: CommentConfig,

    /// One-time life events.
    #[serde(default)]
    pub plot: PlotConfig,

    /// Story shape (posts per tick, windows, limits, phase profiles).
    #[serde(default)]
    pub story: StoryConfig,

    /// Text generator selection and limits.
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// State document location and backup retention.
    #[serde(default)]
    pub store: StoreConfig,

    /// Tick scheduling for the engine binary.
    #[serde(default)]
    pub driver: DriverConfig,

    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `LIFELINE_DATA_DIR` overrides `store.data_dir`
    /// - `LIFELINE_GENERATOR_MODE` overrides `generator.mode`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yml::from_str(&contents)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string. No environment overrides are
    /// applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `LIFELINE_GENERATOR_MODE` holds
    /// an unknown mode.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the generator mode is unknown.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("LIFELINE_DATA_DIR") {
            self.store.data_dir = PathBuf::from(dir);
        }
        if let Some(mode) = lookup("LIFELINE_GENERATOR_MODE") {
            self.generator.mode = mode.parse()?;
        }
        Ok(())
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.pacing;
        if p.posts_per_year == 0 {
            return Err(invalid("pacing.posts_per_year must be at least 1"));
        }
        if !p.start_age.is_finite() || !p.end_age.is_finite() || p.start_age >= p.end_age {
            return Err(invalid("pacing.start_age must be below pacing.end_age"));
        }
        p.phase_brackets.validate()?;

        let c = &self.cadence;
        if c.digest_interval == 0 {
            return Err(invalid("cadence.digest_interval must be at least 1"));
        }
        if c.epoch_years == 0 {
            return Err(invalid("cadence.epoch_years must be at least 1"));
        }
        if let Some(origin) = c.epoch_origin_age {
            if !origin.is_finite() || origin > p.start_age {
                return Err(invalid(
                    "cadence.epoch_origin_age must not be later than pacing.start_age",
                ));
            }
        }
        if !c.tech_growth_rate.is_finite() || c.tech_growth_rate < 0.0 {
            return Err(invalid("cadence.tech_growth_rate must be non-negative"));
        }

        if self.comments.top_k == 0 {
            return Err(invalid("comments.top_k must be at least 1"));
        }

        let s = &self.story;
        if s.posts_per_tick == 0 {
            return Err(invalid("story.posts_per_tick must be at least 1"));
        }
        if s.max_post_chars == 0 {
            return Err(invalid("story.max_post_chars must be at least 1"));
        }
        let needed = u64::from(c.digest_interval).saturating_add(u64::from(s.posts_per_tick));
        if u64::try_from(s.recent_post_window).unwrap_or(u64::MAX) < needed {
            return Err(invalid(
                "story.recent_post_window must hold at least digest_interval + posts_per_tick posts",
            ));
        }

        if self.generator.timeout_secs == 0 {
            return Err(invalid("generator.timeout_secs must be at least 1"));
        }
        if self.store.backup_retention == 0 {
            return Err(invalid("store.backup_retention must be at least 1"));
        }

        let d = &self.driver;
        if d.min_interval_secs == 0 || d.min_interval_secs > d.max_interval_secs {
            return Err(invalid(
                "driver.min_interval_secs must be positive and not exceed driver.max_interval_secs",
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Pacing
// =============================================================================

/// How story time relates to the post counter.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PacingConfig {
    /// Posts that make up one simulated year.
    #[serde(default = "default_posts_per_year")]
    pub posts_per_year: u64,

    /// Protagonist age at post zero.
    #[serde(default = "default_start_age")]
    pub start_age: f64,

    /// Age at which the story ends.
    #[serde(default = "default_end_age")]
    pub end_age: f64,

    /// Story-calendar date of post zero.
    #[serde(default = "default_start_date")]
    pub start_date: NaiveDate,

    /// Ages at which each life phase begins.
    #[serde(default)]
    pub phase_brackets: PhaseBrackets,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            posts_per_year: default_posts_per_year(),
            start_age: default_start_age(),
            end_age: default_end_age(),
            start_date: default_start_date(),
            phase_brackets: PhaseBrackets::default(),
        }
    }
}

/// Lower age bound of every phase after [`LifePhase::EarlyCareer`].
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PhaseBrackets {
    /// First age of [`LifePhase::GrowthPhase`].
    #[serde(default = "default_growth_from")]
    pub growth_from: f64,
    /// First age of [`LifePhase::PeakPhase`].
    #[serde(default = "default_peak_from")]
    pub peak_from: f64,
    /// First age of [`LifePhase::MaturePhase`].
    #[serde(default = "default_mature_from")]
    pub mature_from: f64,
    /// First age of [`LifePhase::WisdomPhase`].
    #[serde(default = "default_wisdom_from")]
    pub wisdom_from: f64,
}

impl PhaseBrackets {
    /// Brackets must be finite and strictly increasing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] otherwise.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let bounds = [
            self.growth_from,
            self.peak_from,
            self.mature_from,
            self.wisdom_from,
        ];
        if bounds.iter().any(|b| !b.is_finite()) {
            return Err(invalid("pacing.phase_brackets must be finite"));
        }
        if bounds.windows(2).any(|w| matches!(w, [a, b] if a >= b)) {
            return Err(invalid("pacing.phase_brackets must be strictly increasing"));
        }
        Ok(())
    }
}

impl Default for PhaseBrackets {
    fn default() -> Self {
        Self {
            growth_from: default_growth_from(),
            peak_from: default_peak_from(),
            mature_from: default_mature_from(),
            wisdom_from: default_wisdom_from(),
        }
    }
}

// =============================================================================
// Cadence
// =============================================================================

/// Digest and tech-epoch trigger tunables.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CadenceConfig {
    /// Posts between interval-driven digests.
    #[serde(default = "default_digest_interval")]
    pub digest_interval: u32,

    /// Significant posts in the trailing window that force an early digest.
    #[serde(default = "default_significant_event_threshold")]
    pub significant_event_threshold: u32,

    /// Case-insensitive substrings that mark a post as significant.
    #[serde(default = "default_significant_keywords")]
    pub significant_keywords: Vec<String>,

    /// Post count at which the first digest is forced (0 disables).
    #[serde(default)]
    pub bootstrap_digest_posts: u64,

    /// Simulated years covered by each tech epoch.
    #[serde(default = "default_epoch_years")]
    pub epoch_years: u32,

    /// Age of the first epoch boundary. Defaults to `pacing.start_age`.
    #[serde(default)]
    pub epoch_origin_age: Option<f64>,

    /// Posts before an epoch boundary at which the next epoch is requested.
    #[serde(default = "default_update_threshold")]
    pub update_threshold: u64,

    /// Yearly growth of the technology acceleration factor.
    #[serde(default = "default_tech_growth_rate")]
    pub tech_growth_rate: f64,
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            digest_interval: default_digest_interval(),
            significant_event_threshold: default_significant_event_threshold(),
            significant_keywords: default_significant_keywords(),
            bootstrap_digest_posts: 0,
            epoch_years: default_epoch_years(),
            epoch_origin_age: None,
            update_threshold: default_update_threshold(),
            tech_growth_rate: default_tech_growth_rate(),
        }
    }
}

// =============================================================================
// Comments
// =============================================================================

/// Vocabulary and limits for comment relevance scoring.
///
/// Terms made only of ASCII letters match whole words; any other term
/// matches as a substring. All matching is case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommentConfig {
    /// Number of ranked comments surfaced to the generator.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Upper bound of the type bonus.
    #[serde(default = "default_type_bonus_cap")]
    pub type_bonus_cap: u32,

    /// Handles stripped from comment text (e.g. `@lifeline`).
    #[serde(default)]
    pub self_mentions: Vec<String>,

    /// Markers of an imperative request.
    #[serde(default = "default_high_markers")]
    pub high_impact_markers: Vec<String>,

    /// Markers of a plain suggestion.
    #[serde(default = "default_medium_markers")]
    pub medium_impact_markers: Vec<String>,

    /// Markers of a tentative suggestion.
    #[serde(default = "default_low_markers")]
    pub low_impact_markers: Vec<String>,

    /// Negation or stop markers.
    #[serde(default = "default_negative_markers")]
    pub negative_markers: Vec<String>,

    /// Action or agreement markers.
    #[serde(default = "default_positive_markers")]
    pub positive_markers: Vec<String>,

    /// Technology topic family.
    #[serde(default = "default_technical_terms")]
    pub technical_terms: Vec<String>,

    /// Relationship topic family.
    #[serde(default = "default_relationship_terms")]
    pub relationship_terms: Vec<String>,

    /// Career topic family.
    #[serde(default = "default_career_terms")]
    pub career_terms: Vec<String>,

    /// Life-event topic family.
    #[serde(default = "default_life_event_terms")]
    pub life_event_terms: Vec<String>,

    /// Domain vocabulary extracted as keywords.
    #[serde(default = "default_vocabulary")]
    pub vocabulary: Vec<String>,
}

impl Default for CommentConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            type_bonus_cap: default_type_bonus_cap(),
            self_mentions: Vec::new(),
            high_impact_markers: default_high_markers(),
            medium_impact_markers: default_medium_markers(),
            low_impact_markers: default_low_markers(),
            negative_markers: default_negative_markers(),
            positive_markers: default_positive_markers(),
            technical_terms: default_technical_terms(),
            relationship_terms: default_relationship_terms(),
            career_terms: default_career_terms(),
            life_event_terms: default_life_event_terms(),
            vocabulary: default_vocabulary(),
        }
    }
}

// =============================================================================
// Plot
// =============================================================================

/// Age-triggered one-time life events.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlotConfig {
    /// Triggers, checked after every batch of posts.
    #[serde(default = "default_plot_triggers")]
    pub triggers: Vec<PlotTrigger>,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            triggers: default_plot_triggers(),
        }
    }
}

/// A plot point that fires once the protagonist reaches `at_age`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlotTrigger {
    /// Plot point kind, the deduplication key.
    pub kind: String,
    /// Title handed to the generator.
    pub title: String,
    /// Description handed to the generator.
    #[serde(default)]
    pub description: String,
    /// Age at which the event happens.
    pub at_age: f64,
    /// Character introduced by the event, if any.
    #[serde(default)]
    pub relationship: Option<RelationshipSeed>,
}

/// A character introduced by a plot trigger.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RelationshipSeed {
    /// Role of the character, unique across the story.
    pub role: String,
    /// Display name.
    pub name: String,
}

// =============================================================================
// Story
// =============================================================================

/// Shape of the generated story.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoryConfig {
    /// Protagonist name used in prompts.
    #[serde(default = "default_protagonist")]
    pub protagonist: String,

    /// Posts requested per tick.
    #[serde(default = "default_posts_per_tick")]
    pub posts_per_tick: u32,

    /// Recent posts kept in the state document.
    #[serde(default = "default_recent_post_window")]
    pub recent_post_window: usize,

    /// Character limit applied to generated posts.
    #[serde(default = "default_max_post_chars")]
    pub max_post_chars: usize,

    /// Narrative guidance for each life phase.
    #[serde(default = "default_phase_profiles")]
    pub phase_profiles: BTreeMap<LifePhase, String>,
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self {
            protagonist: default_protagonist(),
            posts_per_tick: default_posts_per_tick(),
            recent_post_window: default_recent_post_window(),
            max_post_chars: default_max_post_chars(),
            phase_profiles: default_phase_profiles(),
        }
    }
}

// =============================================================================
// Generator
// =============================================================================

/// Which text generator produces story content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorMode {
    /// Local template generator, no network access.
    #[default]
    Template,
    /// Live LLM backends.
    Llm,
}

impl FromStr for GeneratorMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "template" => Ok(Self::Template),
            "llm" => Ok(Self::Llm),
            other => Err(invalid(format!("unknown generator mode '{other}'"))),
        }
    }
}

/// Generator selection and limits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GeneratorConfig {
    /// Local templates or live LLM.
    #[serde(default)]
    pub mode: GeneratorMode,

    /// Upper bound for one generator call, in seconds.
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,

    /// Use the template generator when the configured one fails.
    #[serde(default = "default_true")]
    pub fallback_to_template: bool,

    /// Directory holding the prompt templates.
    #[serde(default = "default_templates_dir")]
    pub templates_dir: PathBuf,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            mode: GeneratorMode::default(),
            timeout_secs: default_generation_timeout_secs(),
            fallback_to_template: true,
            templates_dir: default_templates_dir(),
        }
    }
}

// =============================================================================
// Driver and logging
// =============================================================================

/// Tick scheduling for the engine binary.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DriverConfig {
    /// Shortest wait between ticks, in seconds.
    #[serde(default = "default_min_interval_secs")]
    pub min_interval_secs: u64,

    /// Longest wait between ticks, in seconds. Also caps retry backoff.
    #[serde(default = "default_max_interval_secs")]
    pub max_interval_secs: u64,

    /// First retry delay after a paused tick, in seconds.
    #[serde(default = "default_retry_base_secs")]
    pub retry_base_secs: u64,

    /// Stop after this many ticks (unbounded when absent).
    #[serde(default)]
    pub max_ticks: Option<u64>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            min_interval_secs: default_min_interval_secs(),
            max_interval_secs: default_max_interval_secs(),
            retry_base_secs: default_retry_base_secs(),
            max_ticks: None,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// =============================================================================
// Defaults
// =============================================================================

const fn default_posts_per_year() -> u64 {
    48
}

const fn default_start_age() -> f64 {
    22.0
}

const fn default_end_age() -> f64 {
    72.0
}

fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_default()
}

const fn default_growth_from() -> f64 {
    32.0
}

const fn default_peak_from() -> f64 {
    42.0
}

const fn default_mature_from() -> f64 {
    52.0
}

const fn default_wisdom_from() -> f64 {
    62.0
}

const fn default_digest_interval() -> u32 {
    12
}

const fn default_significant_event_threshold() -> u32 {
    3
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}

fn default_significant_keywords() -> Vec<String> {
    to_strings(&[
        "breakthrough",
        "milestone",
        "launch",
        "partnership",
        "promotion",
        "funding",
        "acquisition",
        "award",
        "wedding",
        "married",
        "born",
        "graduat",
        "moved to",
        "founded",
    ])
}

const fn default_epoch_years() -> u32 {
    5
}

const fn default_update_threshold() -> u64 {
    48
}

const fn default_tech_growth_rate() -> f64 {
    0.05
}

const fn default_top_k() -> usize {
    3
}

const fn default_type_bonus_cap() -> u32 {
    6
}

fn default_high_markers() -> Vec<String> {
    to_strings(&["must", "have to", "need to", "必须", "强烈建议", "一定要"])
}

fn default_medium_markers() -> Vec<String> {
    to_strings(&["suggest", "should", "recommend", "建议", "应该"])
}

fn default_low_markers() -> Vec<String> {
    to_strings(&["maybe", "perhaps", "might", "或许", "也许", "可能"])
}

fn default_negative_markers() -> Vec<String> {
    to_strings(&["don't", "dont", "stop", "never", "not", "no", "不要", "别再", "停止"])
}

fn default_positive_markers() -> Vec<String> {
    to_strings(&[
        "try", "add", "go", "yes", "agree", "love it", "more", "let's", "支持", "加油", "同意", "试试",
    ])
}

fn default_technical_terms() -> Vec<String> {
    to_strings(&[
        "ai", "research", "tech", "technology", "code", "engineering", "robot", "quantum",
        "blockchain", "技术", "研究", "人工智能",
    ])
}

fn default_relationship_terms() -> Vec<String> {
    to_strings(&[
        "love", "family", "friend", "friends", "partner", "date", "dating", "marry", "kids", "恋爱",
        "家庭", "朋友",
    ])
}

fn default_career_terms() -> Vec<String> {
    to_strings(&[
        "work", "job", "career", "startup", "company", "project", "promotion", "boss", "工作",
        "创业", "公司", "项目",
    ])
}

fn default_life_event_terms() -> Vec<String> {
    to_strings(&[
        "change", "move", "travel", "adventure", "wedding", "baby", "trip", "relocate", "改变",
        "旅行", "冒险", "搬家",
    ])
}

fn default_vocabulary() -> Vec<String> {
    to_strings(&[
        "AI", "research", "project", "love", "family", "friend", "work", "startup", "company",
        "change", "adventure", "travel",
    ])
}

fn default_plot_triggers() -> Vec<PlotTrigger> {
    fn trigger(
        kind: &str,
        title: &str,
        description: &str,
        at_age: f64,
        relationship: Option<(&str, &str)>,
    ) -> PlotTrigger {
        PlotTrigger {
            kind: kind.to_owned(),
            title: title.to_owned(),
            description: description.to_owned(),
            at_age,
            relationship: relationship.map(|(role, name)| RelationshipSeed {
                role: role.to_owned(),
                name: name.to_owned(),
            }),
        }
    }

    vec![
        trigger(
            "relocation",
            "Moves to a new tech hub",
            "Leaves home for a city with a bigger tech scene.",
            25.0,
            None,
        ),
        trigger(
            "partner",
            "Meets a long-term partner",
            "A chance meeting turns into a lasting relationship.",
            28.0,
            Some(("partner", "Maya")),
        ),
        trigger(
            "marriage",
            "Gets married",
            "Partnership becomes marriage.",
            31.0,
            None,
        ),
        trigger(
            "first_child",
            "First child is born",
            "Parenthood begins and reshapes priorities.",
            34.0,
            Some(("child", "Leo")),
        ),
        trigger(
            "founding",
            "Founds a company",
            "Turns years of side projects into a company.",
            37.0,
            Some(("cofounder", "Sam")),
        ),
        trigger(
            "mentorship",
            "Takes on a protege",
            "Starts mentoring the next generation of builders.",
            48.0,
            Some(("mentee", "Ava")),
        ),
        trigger(
            "succession",
            "Hands over the company",
            "Steps back from daily leadership.",
            60.0,
            None,
        ),
        trigger(
            "grandchild",
            "Becomes a grandparent",
            "A new generation joins the family.",
            64.0,
            Some(("grandchild", "Nora")),
        ),
    ]
}

fn default_protagonist() -> String {
    "Xavier".to_owned()
}

const fn default_posts_per_tick() -> u32 {
    1
}

const fn default_recent_post_window() -> usize {
    50
}

const fn default_max_post_chars() -> usize {
    280
}

fn default_phase_profiles() -> BTreeMap<LifePhase, String> {
    let mut m = BTreeMap::new();
    m.insert(
        LifePhase::EarlyCareer,
        "Early career: practical tech skills, dating and city life, first professional network, \
         curious about what technology can do right now."
            .to_owned(),
    );
    m.insert(
        LifePhase::GrowthPhase,
        "Growth and foundations: deeper expertise, partnership and family, communities that \
         last, starting to think about technology's social impact."
            .to_owned(),
    );
    m.insert(
        LifePhase::PeakPhase,
        "Leadership: pioneering work while raising a family, a tech-aware household, early \
         musings about where technology is heading."
            .to_owned(),
    );
    m.insert(
        LifePhase::MaturePhase,
        "Legacy and mentorship: shaping the industry, supporting grown children, mentoring the \
         next generation, weighing the ethics of technology."
            .to_owned(),
    );
    m.insert(
        LifePhase::WisdomPhase,
        "Wisdom and succession: advisory roles, grandparenthood, bridging generations, deep \
         reflection on technology and humanity."
            .to_owned(),
    );
    m
}

const fn default_generation_timeout_secs() -> u64 {
    60
}

const fn default_true() -> bool {
    true
}

fn default_templates_dir() -> PathBuf {
    PathBuf::from("templates")
}

const fn default_min_interval_secs() -> u64 {
    3600
}

const fn default_max_interval_secs() -> u64 {
    7200
}

const fn default_retry_base_secs() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pacing.posts_per_year, 48);
        assert_eq!(config.cadence.digest_interval, 12);
        assert_eq!(config.cadence.bootstrap_digest_posts, 0);
        assert_eq!(config.comments.top_k, 3);
        assert_eq!(config.story.max_post_chars, 280);
        assert_eq!(config.story.phase_profiles.len(), LifePhase::ALL.len());
    }

    #[test]
    fn parse_minimal_yaml() {
        let yaml = "pacing:\n  posts_per_year: 24\ncadence:\n  digest_interval: 6\n";
        let config = EngineConfig::parse(yaml);
        assert!(config.is_ok(), "{config:?}");
        let config = config.ok().unwrap_or_default();

        assert_eq!(config.pacing.posts_per_year, 24);
        assert_eq!(config.cadence.digest_interval, 6);
        // Everything else uses defaults
        assert_eq!(config.store.backup_retention, 10);
        assert_eq!(config.generator.mode, GeneratorMode::Template);
    }

    #[test]
    fn parse_empty_yaml() {
        assert!(EngineConfig::parse("").is_ok());
    }

    #[test]
    fn parse_phase_profiles_and_triggers() {
        let yaml = r#"
story:
  phase_profiles:
    early_career: "just starting out"
plot:
  triggers:
    - kind: first_job
      title: "Lands a first job"
      at_age: 22.5
      relationship:
        role: boss
        name: Dana
"#;
        let config = EngineConfig::parse(yaml).ok().unwrap_or_default();
        assert_eq!(
            config.story.phase_profiles.get(&LifePhase::EarlyCareer).map(String::as_str),
            Some("just starting out")
        );
        assert_eq!(config.plot.triggers.len(), 1);
        assert_eq!(
            config.plot.triggers.first().and_then(|t| t.relationship.clone()).map(|r| r.role),
            Some("boss".to_owned())
        );
    }

    #[test]
    fn rejects_non_increasing_brackets() {
        let yaml = "pacing:\n  phase_brackets:\n    growth_from: 40\n    peak_from: 40\n";
        assert!(matches!(
            EngineConfig::parse(yaml),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn rejects_inverted_age_range() {
        let yaml = "pacing:\n  start_age: 80\n  end_age: 70\n";
        assert!(EngineConfig::parse(yaml).is_err());
    }

    #[test]
    fn rejects_window_smaller_than_digest_interval() {
        let yaml = "story:\n  recent_post_window: 5\n";
        assert!(EngineConfig::parse(yaml).is_err());
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = EngineConfig::default();
        let result = config.apply_overrides(|key| match key {
            "LIFELINE_DATA_DIR" => Some("/tmp/lifeline-dev".to_owned()),
            "LIFELINE_GENERATOR_MODE" => Some("LLM".to_owned()),
            _ => None,
        });
        assert!(result.is_ok());
        assert_eq!(config.store.data_dir, PathBuf::from("/tmp/lifeline-dev"));
        assert_eq!(config.generator.mode, GeneratorMode::Llm);
    }

    #[test]
    fn unknown_generator_mode_is_rejected() {
        let mut config = EngineConfig::default();
        let result = config.apply_overrides(|key| {
            (key == "LIFELINE_GENERATOR_MODE").then(|| "magic".to_owned())
        });
        assert!(result.is_err());
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("lifeline-config.yaml");
        if path.exists() {
            let config = EngineConfig::from_file(&path);
            assert!(config.is_ok(), "Failed to load project config: {config:?}");
        }
    }
}
