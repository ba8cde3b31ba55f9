//! Reader comment relevance scoring.
//!
//! Comments are classified with fixed, configurable vocabularies and ranked
//! by a deterministic score. Only the top few reach the generator, so
//! reader steering stays focused on the strongest signals.

use std::cmp::Reverse;
use std::collections::BTreeSet;

use lifeline_types::{CommentAnalysis, CommentTag, Impact, Mood, RawComment};

use crate::config::CommentConfig;

/// Comments longer than this many characters earn the full length bonus.
const LONG_COMMENT_CHARS: usize = 50;

/// Comments longer than this many characters earn a partial length bonus.
const MEDIUM_COMMENT_CHARS: usize = 20;

/// Cap on the keyword component of the score.
const KEYWORD_BONUS_CAP: u32 = 3;

/// Scores and ranks reader comments.
#[derive(Debug, Clone)]
pub struct CommentRelevanceScorer {
    top_k: usize,
    type_bonus_cap: u32,
    self_mentions: Vec<String>,
    high: Vec<Term>,
    medium: Vec<Term>,
    low: Vec<Term>,
    negative: Vec<Term>,
    positive: Vec<Term>,
    families: Vec<(CommentTag, Vec<Term>)>,
    vocabulary: Vec<(String, Term)>,
}

impl CommentRelevanceScorer {
    /// Build a scorer from configuration.
    pub fn new(config: &CommentConfig) -> Self {
        Self {
            top_k: config.top_k,
            type_bonus_cap: config.type_bonus_cap,
            self_mentions: config
                .self_mentions
                .iter()
                .map(|m| m.to_lowercase())
                .collect(),
            high: terms(&config.high_impact_markers),
            medium: terms(&config.medium_impact_markers),
            low: terms(&config.low_impact_markers),
            negative: terms(&config.negative_markers),
            positive: terms(&config.positive_markers),
            families: vec![
                (CommentTag::Technical, terms(&config.technical_terms)),
                (CommentTag::Relationship, terms(&config.relationship_terms)),
                (CommentTag::Career, terms(&config.career_terms)),
                (CommentTag::LifeEvent, terms(&config.life_event_terms)),
            ],
            vocabulary: config
                .vocabulary
                .iter()
                .filter(|v| !v.trim().is_empty())
                .map(|v| (v.clone(), Term::new(v)))
                .collect(),
        }
    }

    /// Score every comment and return the `top_k` most relevant, highest
    /// first. Ties keep their input order.
    pub fn rank(&self, comments: &[RawComment]) -> Vec<CommentAnalysis> {
        let mut analyses: Vec<CommentAnalysis> =
            comments.iter().filter_map(|c| self.analyze(c)).collect();
        analyses.sort_by_key(|a| Reverse(a.relevance_score));
        analyses.truncate(self.top_k);
        analyses
    }

    /// Classify and score one comment. Comments that are empty once
    /// self-mentions are stripped yield `None`.
    pub fn analyze(&self, comment: &RawComment) -> Option<CommentAnalysis> {
        let content = self.strip_mentions(&comment.content);
        if content.is_empty() {
            return None;
        }
        let lowered = content.to_lowercase();

        let impact = if any_match(&self.high, &lowered) {
            Impact::High
        } else if any_match(&self.medium, &lowered) {
            Impact::Medium
        } else if any_match(&self.low, &lowered) {
            Impact::Low
        } else {
            Impact::Medium
        };

        let mut types: BTreeSet<CommentTag> = self
            .families
            .iter()
            .filter(|(_, family)| any_match(family, &lowered))
            .map(|(tag, _)| *tag)
            .collect();
        if types.is_empty() {
            types.insert(CommentTag::General);
        }

        let keywords: BTreeSet<String> = self
            .vocabulary
            .iter()
            .filter(|(_, term)| term.matches(&lowered))
            .map(|(word, _)| word.clone())
            .collect();

        let mood = if any_match(&self.negative, &lowered) {
            Mood::Negative
        } else if any_match(&self.positive, &lowered) {
            Mood::Positive
        } else {
            Mood::Neutral
        };

        let relevance_score = self.score(impact, &types, keywords.len(), &content, mood);

        Some(CommentAnalysis {
            content,
            author: comment.author.clone(),
            impact,
            types,
            keywords,
            mood,
            relevance_score,
        })
    }

    fn score(
        &self,
        impact: Impact,
        types: &BTreeSet<CommentTag>,
        keyword_count: usize,
        content: &str,
        mood: Mood,
    ) -> u32 {
        let typed = types.iter().filter(|t| t.is_scored()).count();
        let type_bonus = u32::try_from(typed)
            .unwrap_or(u32::MAX)
            .saturating_mul(2)
            .min(self.type_bonus_cap);
        let keyword_bonus = u32::try_from(keyword_count)
            .unwrap_or(u32::MAX)
            .min(KEYWORD_BONUS_CAP);
        let chars = content.chars().count();
        let length_bonus = if chars > LONG_COMMENT_CHARS {
            2
        } else if chars > MEDIUM_COMMENT_CHARS {
            1
        } else {
            0
        };
        let mood_bonus = u32::from(mood != Mood::Neutral);

        impact
            .weight()
            .saturating_add(type_bonus)
            .saturating_add(keyword_bonus)
            .saturating_add(length_bonus)
            .saturating_add(mood_bonus)
    }

    /// Drop tokens that mention the story account, then normalise spacing.
    fn strip_mentions(&self, content: &str) -> String {
        content
            .split_whitespace()
            .filter(|token| {
                let bare = token
                    .trim_end_matches(|c: char| c.is_ascii_punctuation() && c != '_')
                    .to_lowercase();
                !self.self_mentions.iter().any(|m| *m == bare)
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A lowercased vocabulary term and how it matches.
#[derive(Debug, Clone)]
struct Term {
    text: String,
    whole_word: bool,
}

impl Term {
    fn new(raw: &str) -> Self {
        let text = raw.trim().to_lowercase();
        let whole_word = text
            .chars()
            .all(|c| c.is_ascii_alphabetic() || c == ' ' || c == '\'');
        Self { text, whole_word }
    }

    /// Match against already-lowercased text.
    fn matches(&self, haystack: &str) -> bool {
        if self.text.is_empty() {
            return false;
        }
        if !self.whole_word {
            return haystack.contains(self.text.as_str());
        }
        haystack.match_indices(self.text.as_str()).any(|(start, m)| {
            let before = haystack.get(..start).and_then(|s| s.chars().next_back());
            let after = haystack
                .get(start.saturating_add(m.len())..)
                .and_then(|s| s.chars().next());
            !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
        })
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn terms(raw: &[String]) -> Vec<Term> {
    raw.iter()
        .map(|r| Term::new(r))
        .filter(|t| !t.text.is_empty())
        .collect()
}

fn any_match(terms: &[Term], haystack: &str) -> bool {
    terms.iter().any(|t| t.matches(haystack))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn comment(content: &str) -> RawComment {
        RawComment {
            content: content.to_owned(),
            author: "reader".to_owned(),
            created_at: Utc::now(),
        }
    }

    fn scorer() -> CommentRelevanceScorer {
        CommentRelevanceScorer::new(&CommentConfig {
            self_mentions: vec!["@lifeline".to_owned()],
            ..CommentConfig::default()
        })
    }

    #[test]
    fn imperative_technical_comment_outranks_tentative_one() {
        let s = scorer();
        let ranked = s.rank(&[
            comment("maybe try something"),
            comment("必须 add more AI research details"),
        ]);
        assert_eq!(ranked.len(), 2);

        let top = ranked.first().map(|a| a.content.as_str());
        assert_eq!(top, Some("必须 add more AI research details"));

        let strong = s.analyze(&comment("必须 add more AI research details")).unwrap();
        assert_eq!(strong.impact, Impact::High);
        assert!(strong.types.contains(&CommentTag::Technical));

        let weak = s.analyze(&comment("maybe try something")).unwrap();
        assert_eq!(weak.impact, Impact::Low);
        assert_eq!(weak.types, BTreeSet::from([CommentTag::General]));
    }

    #[test]
    fn score_components_add_up() {
        let s = scorer();
        let a = s.analyze(&comment("必须 add more AI research details"));
        // high 3 + technical 2 + keywords {AI, research} 2 + 31 chars 1 + positive 1
        assert_eq!(a.map(|a| a.relevance_score), Some(9));

        let b = s.analyze(&comment("maybe try something"));
        // low 1 + no types 0 + no keywords 0 + 19 chars 0 + positive 1
        assert_eq!(b.map(|b| b.relevance_score), Some(2));
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let s = scorer();
        // 21 CJK characters: 63 bytes, but only a partial length bonus.
        let text = "这是一个很长的评论内容用来测试字符计数功能";
        assert_eq!(text.chars().count(), 21);
        let a = s.analyze(&comment(text));
        // medium 2 + length 1
        assert_eq!(a.map(|a| a.relevance_score), Some(3));
    }

    #[test]
    fn ascii_terms_match_whole_words_only() {
        let s = scorer();
        let a = s.analyze(&comment("I said hi"));
        // "ai" must not match inside "said".
        assert!(a.is_some_and(|a| !a.keywords.contains("AI")
            && !a.types.contains(&CommentTag::Technical)));
    }

    #[test]
    fn self_mentions_are_stripped() {
        let s = scorer();
        let a = s.analyze(&comment("@LifeLine, go travel more"));
        assert_eq!(a.map(|a| a.content), Some("go travel more".to_owned()));
        assert!(s.analyze(&comment("@lifeline")).is_none());
    }

    #[test]
    fn negation_wins_over_agreement() {
        let s = scorer();
        let a = s.analyze(&comment("please stop, don't go there"));
        assert_eq!(a.map(|a| a.mood), Some(Mood::Negative));
    }

    #[test]
    fn cjk_negation_needs_the_whole_phrase() {
        let s = scorer();
        let praise = s.analyze(&comment("特别喜欢这个故事"));
        assert_eq!(praise.map(|a| a.mood), Some(Mood::Neutral));
        let warning = s.analyze(&comment("别再熬夜了"));
        assert_eq!(warning.map(|a| a.mood), Some(Mood::Negative));
    }

    #[test]
    fn type_bonus_is_capped() {
        let s = CommentRelevanceScorer::new(&CommentConfig {
            type_bonus_cap: 4,
            ..CommentConfig::default()
        });
        // technical, relationship, career, life event
        let a = s.analyze(&comment("ai family startup travel")).unwrap();
        assert_eq!(a.types.len(), 4);
        // medium 2 + capped types 4 + keywords 3 + 24 chars 1 + neutral 0
        assert_eq!(a.relevance_score, 10);
    }

    #[test]
    fn ranking_is_deterministic_and_stable() {
        let s = scorer();
        let input = vec![
            comment("first equal"),
            comment("second equal"),
            comment("must build a startup with family and friends around"),
            comment("third equal"),
            comment("fourth equal"),
        ];
        let a = s.rank(&input);
        let b = s.rank(&input);
        assert_eq!(a, b);
        assert_eq!(a.len(), 3);
        let order: Vec<&str> = a.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(
            order,
            vec![
                "must build a startup with family and friends around",
                "first equal",
                "second equal"
            ]
        );
    }
}
